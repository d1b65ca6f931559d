//! Submission gating for protected forms.
//!
//! Two enforcement strategies. Challenge attachment: hold the submit,
//! solve a proof-of-work, attach it, and re-submit once (a one-shot marker
//! lets the re-entrant submit through). Verdict gate: block outright until
//! the controller is `Verified`, then release through the native
//! submission path so the interceptor never sees its own release.

use serde::Deserialize;

use verigate_common::constants::form_fields;
use verigate_common::{ChallengeSolution, SensorError};

use crate::controller::VerifyState;
use crate::host::FormHost;
use crate::pow;
use crate::service::VerificationService;

/// Message shown when proof attachment fails; the user may retry.
const SOLVE_FAILED_MESSAGE: &str = "Security check failed. Please try again.";

/// Messages for verdict-gate refusals.
const NOT_VERIFIED_MESSAGE: &str = "Please verify you are human.";
const VERIFY_FAILED_MESSAGE: &str = "Verification failed.";

/// Enforcement strategy, selected per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStrategy {
    /// Solve and attach a proof-of-work pair, then re-submit
    Challenge,
    /// Hold submission until the controller reaches `Verified`
    #[default]
    Verdict,
}

/// What the interceptor did with a submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Passed through unmodified (marked re-entrant submit, or verdict ok)
    Released,
    /// Proof attached and the form programmatically re-submitted
    Resubmitted,
    /// Submission refused; the user must act before retrying
    Blocked,
}

/// Intercepts native submits on opted-in forms.
pub struct FormGate<S> {
    service: S,
    search_budget: u64,
}

impl<S: VerificationService> FormGate<S> {
    pub fn new(service: S, search_budget: u64) -> Self {
        Self {
            service,
            search_budget,
        }
    }

    /// Challenge-attachment interception.
    ///
    /// The one-shot marker makes re-submission idempotent: a marked form
    /// passes through unmodified, so programmatic re-submit cannot loop.
    pub async fn intercept_with_challenge<F: FormHost>(&self, form: &F) -> GateDecision {
        if form.is_marked() {
            return GateDecision::Released;
        }

        form.set_submit_enabled(false);

        match self.attach_proof(form).await {
            Ok(solution) => {
                tracing::debug!(
                    challenge_id = %solution.challenge_id,
                    nonce = solution.nonce,
                    "proof attached, re-submitting"
                );
                form.mark();
                form.request_submit();
                GateDecision::Resubmitted
            }
            Err(e) => {
                tracing::warn!(error = %e, "proof attachment failed");
                // Restore the button so the user can retry.
                form.set_submit_enabled(true);
                form.show_error(SOLVE_FAILED_MESSAGE);
                GateDecision::Blocked
            }
        }
    }

    async fn attach_proof<F: FormHost>(&self, form: &F) -> Result<ChallengeSolution, SensorError> {
        let challenge = self.service.fetch_challenge(&form.action_path()).await?;
        let challenge_id = challenge.challenge_id.clone();
        let nonce = pow::solve_detached(challenge, self.search_budget).await?;

        form.set_hidden_field(form_fields::POW_ID, &challenge_id);
        form.set_hidden_field(form_fields::POW_NONCE, &nonce.to_string());

        Ok(ChallengeSolution {
            challenge_id,
            nonce,
        })
    }

    /// Verdict-gate interception: release if and only if the associated
    /// controller reached `Verified`. The release calls the underlying
    /// submission path directly rather than re-dispatching a synthetic
    /// submit, so it cannot be intercepted twice.
    pub fn intercept_with_verdict<F: FormHost>(&self, form: &F, state: VerifyState) -> GateDecision {
        if state == VerifyState::Verified {
            form.submit_native();
            return GateDecision::Released;
        }

        let message = if state == VerifyState::Failed {
            VERIFY_FAILED_MESSAGE
        } else {
            NOT_VERIFIED_MESSAGE
        };
        form.show_error(message);
        GateDecision::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedForm;
    use crate::pow::proof_is_valid;
    use verigate_common::constants::DEFAULT_SEARCH_BUDGET;
    use verigate_common::{Challenge, VerificationPayload};

    struct ChallengeService {
        difficulty: u32,
        fail: bool,
    }

    impl VerificationService for ChallengeService {
        async fn fetch_token(&self) -> Result<String, SensorError> {
            unimplemented!("gate flow never fetches tokens")
        }

        async fn fetch_challenge(&self, context_path: &str) -> Result<Challenge, SensorError> {
            if self.fail {
                return Err(SensorError::Transport(
                    "challenge endpoint returned 503".to_string(),
                ));
            }
            Ok(Challenge {
                challenge_id: "c1".to_string(),
                seed_data: "abc".to_string(),
                difficulty: self.difficulty,
                context_path: context_path.to_string(),
            })
        }

        async fn submit(&self, _payload: &VerificationPayload) -> Result<(), SensorError> {
            unimplemented!("gate flow never submits evidence")
        }
    }

    fn gate(difficulty: u32) -> FormGate<ChallengeService> {
        FormGate::new(
            ChallengeService {
                difficulty,
                fail: false,
            },
            DEFAULT_SEARCH_BUDGET,
        )
    }

    #[tokio::test]
    async fn attaches_proof_and_resubmits_once() {
        let form = SimulatedForm::new("/login");
        let gate = gate(2);

        let decision = gate.intercept_with_challenge(&form).await;
        assert_eq!(decision, GateDecision::Resubmitted);
        assert!(form.is_marked());
        assert_eq!(form.submit_requests(), 1);

        assert_eq!(form.hidden_field(form_fields::POW_ID).as_deref(), Some("c1"));
        let nonce: u64 = form
            .hidden_field(form_fields::POW_NONCE)
            .expect("nonce attached")
            .parse()
            .unwrap();

        let challenge = Challenge {
            challenge_id: "c1".to_string(),
            seed_data: "abc".to_string(),
            difficulty: 2,
            context_path: "/login".to_string(),
        };
        assert!(proof_is_valid(&challenge, nonce));
        // First-match property: nothing smaller satisfies the predicate.
        for smaller in 0..nonce {
            assert!(!proof_is_valid(&challenge, smaller));
        }
    }

    #[tokio::test]
    async fn reentrant_submit_passes_through_unmodified() {
        let form = SimulatedForm::new("/login");
        let gate = gate(1);

        gate.intercept_with_challenge(&form).await;
        let fields_before = form.hidden_field(form_fields::POW_NONCE);

        let decision = gate.intercept_with_challenge(&form).await;
        assert_eq!(decision, GateDecision::Released);
        // No second solve, no second programmatic submit.
        assert_eq!(form.submit_requests(), 1);
        assert_eq!(form.hidden_field(form_fields::POW_NONCE), fields_before);
    }

    #[tokio::test]
    async fn challenge_failure_restores_button_and_blocks() {
        let form = SimulatedForm::new("/login");
        let gate = FormGate::new(
            ChallengeService {
                difficulty: 1,
                fail: true,
            },
            DEFAULT_SEARCH_BUDGET,
        );

        let decision = gate.intercept_with_challenge(&form).await;
        assert_eq!(decision, GateDecision::Blocked);
        assert!(!form.is_marked());
        assert!(form.submit_enabled());
        assert_eq!(form.errors().len(), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_blocks_instead_of_hanging() {
        let form = SimulatedForm::new("/login");
        let gate = FormGate::new(
            ChallengeService {
                difficulty: 64,
                fail: false,
            },
            // Tiny budget: unsatisfiable difficulty fails fast.
            1_000,
        );

        let decision = gate.intercept_with_challenge(&form).await;
        assert_eq!(decision, GateDecision::Blocked);
        assert!(form.hidden_field(form_fields::POW_NONCE).is_none());
    }

    #[tokio::test]
    async fn verdict_gate_blocks_until_verified() {
        let form = SimulatedForm::new("/login");
        let gate = gate(1);

        for state in [
            VerifyState::Idle,
            VerifyState::Checking,
            VerifyState::Verifying,
            VerifyState::Failed,
        ] {
            assert_eq!(
                gate.intercept_with_verdict(&form, state),
                GateDecision::Blocked
            );
        }
        assert_eq!(form.native_submits(), 0);
        assert_eq!(form.errors().len(), 4);
    }

    #[tokio::test]
    async fn verdict_gate_releases_through_native_path() {
        let form = SimulatedForm::new("/login");
        let gate = gate(1);

        let decision = gate.intercept_with_verdict(&form, VerifyState::Verified);
        assert_eq!(decision, GateDecision::Released);
        assert_eq!(form.native_submits(), 1);
        // Never re-dispatched through the interceptable path.
        assert_eq!(form.submit_requests(), 0);
    }
}
