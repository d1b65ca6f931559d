//! Shared constants for Verigate components.

/// Default verification service base URL
pub const DEFAULT_SERVICE_URL: &str = "https://api.verigate.dev";

/// Default help/trust page shown in failure notices
pub const DEFAULT_HELP_URL: &str = "https://verigate.dev/";

/// Verification submission timeout in milliseconds (abort after this)
pub const VERIFY_TIMEOUT_MS: u64 = 8_000;

/// Connect timeout for service requests in milliseconds
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default cap on the behavioral event log (bounds payload size)
pub const DEFAULT_MAX_EVENTS: usize = 150;

/// Minimum gap between accepted pointer-move samples (timing-only variant)
pub const POINTER_THROTTLE_MS: u64 = 100;

/// Minimum gap between accepted pointer-move samples (coordinate variant)
pub const POINTER_THROTTLE_COORD_MS: u64 = 30;

/// Iteration budget for the proof-of-work search.
///
/// Covers difficulty <= 5 with overwhelming probability; exhaustion is a
/// reported failure, never a hang. A hostile difficulty cannot pin the
/// worker indefinitely.
pub const DEFAULT_SEARCH_BUDGET: u64 = 1 << 24;

/// Prefix for the transient storage-probe sentinel key
pub const STORAGE_PROBE_PREFIX: &str = "verigate_storage_probe";

/// Permission names queried by the richer fingerprint variant.
/// States are read, never requested.
pub const PERMISSION_NAMES: &[&str] = &[
    "geolocation",
    "notifications",
    "camera",
    "microphone",
    "persistent-storage",
];

/// Service endpoint paths
pub mod endpoints {
    /// Token issue: GET {base}/api/v1/token -> { token }
    pub const TOKEN: &str = "/api/v1/token";

    /// Evidence submission: POST {base}/api/v1/verify
    pub const VERIFY: &str = "/api/v1/verify";

    /// Proof-of-work challenge: GET {base}/api/v1/get-pow
    pub const GET_POW: &str = "/api/v1/get-pow";
}

/// Hidden form field names consumed by the relying server
pub mod form_fields {
    /// Challenge identifier field
    pub const POW_ID: &str = "pow_id";

    /// Solved nonce field
    pub const POW_NONCE: &str = "pow_nonce";
}
