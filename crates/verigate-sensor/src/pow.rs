//! Proof-of-work challenge solver.
//!
//! Deterministic brute force: the first nonce whose SHA-256 digest of
//! `"{seed}:{path}:{nonce}"` hex-encodes with `difficulty` leading zero
//! characters. The search is budget-bounded — a hostile or misconfigured
//! difficulty exhausts the budget and reports failure instead of pinning
//! a worker forever.

use sha2::{Digest, Sha256};

use verigate_common::constants::DEFAULT_SEARCH_BUDGET;
use verigate_common::{Challenge, ChallengeSolution, SensorError};

/// Search for the smallest satisfying nonce, up to `budget` candidates.
///
/// Synchronous and CPU-bound; callers on an async runtime use
/// [`solve_detached`].
pub fn solve(challenge: &Challenge, budget: u64) -> Result<u64, SensorError> {
    let prefix = "0".repeat(challenge.difficulty as usize);
    let message_head = format!("{}:{}:", challenge.seed_data, challenge.context_path);

    let mut message = String::with_capacity(message_head.len() + 20);
    for nonce in 0..budget.max(1) {
        message.clear();
        message.push_str(&message_head);
        message.push_str(&nonce.to_string());

        let digest = Sha256::digest(message.as_bytes());
        if hex::encode(digest).starts_with(&prefix) {
            return Ok(nonce);
        }
    }

    Err(SensorError::ChallengeSearch(format!(
        "no nonce within budget of {} candidates (difficulty {})",
        budget, challenge.difficulty
    )))
}

/// Run the search on a dedicated blocking worker.
///
/// One worker per challenge; it receives the challenge, computes to
/// completion, delivers the nonce, and is torn down. A worker panic is
/// converted into a `ChallengeSearch` failure for the attempt.
pub async fn solve_detached(challenge: Challenge, budget: u64) -> Result<u64, SensorError> {
    tokio::task::spawn_blocking(move || solve(&challenge, budget))
        .await
        .map_err(|e| SensorError::ChallengeSearch(format!("solver worker died: {e}")))?
}

/// Solve with the default budget and pair the nonce with its challenge id.
pub async fn solve_to_solution(challenge: Challenge) -> Result<ChallengeSolution, SensorError> {
    let challenge_id = challenge.challenge_id.clone();
    let nonce = solve_detached(challenge, DEFAULT_SEARCH_BUDGET).await?;
    Ok(ChallengeSolution {
        challenge_id,
        nonce,
    })
}

/// Re-verify a proof the way the relying server does.
pub fn proof_is_valid(challenge: &Challenge, nonce: u64) -> bool {
    let message = format!(
        "{}:{}:{}",
        challenge.seed_data, challenge.context_path, nonce
    );
    let digest = hex::encode(Sha256::digest(message.as_bytes()));
    digest.starts_with(&"0".repeat(challenge.difficulty as usize))
}
