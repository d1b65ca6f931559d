//! Verification service client.
//!
//! Three JSON endpoints (token, proof-of-work challenge, evidence
//! submission). The scoring logic behind them is opaque: only status codes
//! and the optional diagnostic body matter here.

use std::time::Duration;

use serde::Deserialize;

use verigate_common::constants::{CONNECT_TIMEOUT_MS, VERIFY_TIMEOUT_MS, endpoints};
use verigate_common::{Challenge, FailureNotice, SensorError, VerificationPayload};

/// Service seam for the controller and form gate. The HTTP client is the
/// production implementation; tests script their own.
#[allow(async_fn_in_trait)]
pub trait VerificationService {
    /// `GET /token`. The server may set an opaque session cookie.
    async fn fetch_token(&self) -> Result<String, SensorError>;

    /// `GET /get-pow`, stamped with the form's action path.
    async fn fetch_challenge(&self, context_path: &str) -> Result<Challenge, SensorError>;

    /// `POST /verify`. `Ok` if and only if the service answered 2xx.
    async fn submit(&self, payload: &VerificationPayload) -> Result<(), SensorError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Rejection diagnostics arrive either nested under `detail` or flat.
#[derive(Debug, Default, Deserialize)]
struct VerdictBody {
    #[serde(default)]
    detail: Option<VerdictDetail>,
    #[serde(default)]
    sky_id: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VerdictDetail {
    #[serde(default)]
    sky_id: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl VerdictBody {
    fn into_notice(self) -> FailureNotice {
        match self.detail {
            Some(detail) => FailureNotice {
                sky_id: detail.sky_id,
                score: detail.score,
            },
            None => FailureNotice {
                sky_id: self.sky_id,
                score: self.score,
            },
        }
    }
}

/// HTTP client for the verification service.
///
/// Requests share one connection pool and cookie store; every call is
/// bounded by the 8-second submission timeout.
pub struct HttpVerificationService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpVerificationService {
    pub fn new(base_url: &str) -> Result<Self, SensorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(VERIFY_TIMEOUT_MS))
            .connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
            .cookie_store(true)
            .build()
            .map_err(|e| SensorError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn request_error(context: &str, e: reqwest::Error) -> SensorError {
    if e.is_timeout() {
        SensorError::Timeout(format!("{context}: {e}"))
    } else {
        SensorError::Transport(format!("{context}: {e}"))
    }
}

impl VerificationService for HttpVerificationService {
    async fn fetch_token(&self) -> Result<String, SensorError> {
        let response = self
            .http_client
            .get(self.url(endpoints::TOKEN))
            .send()
            .await
            .map_err(|e| SensorError::TokenAcquisition(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SensorError::TokenAcquisition(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SensorError::TokenAcquisition(format!("token body: {e}")))?;

        Ok(body.token)
    }

    async fn fetch_challenge(&self, context_path: &str) -> Result<Challenge, SensorError> {
        let response = self
            .http_client
            .get(self.url(endpoints::GET_POW))
            .send()
            .await
            .map_err(|e| request_error("challenge fetch", e))?;

        if !response.status().is_success() {
            return Err(SensorError::Transport(format!(
                "challenge endpoint returned {}",
                response.status()
            )));
        }

        let mut challenge: Challenge = response
            .json()
            .await
            .map_err(|e| SensorError::Transport(format!("challenge body: {e}")))?;
        challenge.context_path = context_path.to_string();

        tracing::debug!(
            challenge_id = %challenge.challenge_id,
            difficulty = challenge.difficulty,
            "challenge received"
        );

        Ok(challenge)
    }

    async fn submit(&self, payload: &VerificationPayload) -> Result<(), SensorError> {
        let response = self
            .http_client
            .post(self.url(endpoints::VERIFY))
            .json(payload)
            .send()
            .await
            .map_err(|e| request_error("verification submit", e))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "verification accepted");
            return Ok(());
        }

        // Diagnostics are best-effort: an unreadable body still rejects.
        let notice = response
            .json::<VerdictBody>()
            .await
            .map(VerdictBody::into_notice)
            .unwrap_or_default();

        tracing::debug!(status = %status, %notice, "verification rejected");
        Err(SensorError::Rejected(notice))
    }
}
