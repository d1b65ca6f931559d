//! Verification state machine and orchestration.
//!
//! `Idle -> Checking -> Verifying -> {Verified, Failed}`, with
//! `Failed -> Idle` only through an explicit user reset. The widget is a
//! projection of the state: every transition re-renders and re-derives
//! submit-button enablement, nothing else mutates the affordances.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use verigate_common::constants::DEFAULT_HELP_URL;
use verigate_common::{
    EnvironmentFingerprint, SensorError, SubmissionMeta, VerificationPayload, WidgetKind,
};

use crate::fingerprint::{CollectorConfig, FingerprintCollector};
use crate::host::{EnvironmentHost, WidgetView};
use crate::recorder::SessionContext;
use crate::service::VerificationService;

/// Verification lifecycle states.
///
/// `Verified` and `Failed` are stable until reset or a fresh page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    Idle,
    Checking,
    Verifying,
    Verified,
    Failed,
}

impl VerifyState {
    /// Affordance label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "I'm not a robot",
            Self::Checking => "Checking your browser",
            Self::Verifying => "Verifying",
            Self::Verified => "Verified",
            Self::Failed => "Verification failed",
        }
    }

    /// The submit control is enabled in exactly one state.
    pub fn submit_enabled(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Events driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEvent {
    /// User interaction or auto-trigger starts an attempt
    Engage,
    /// Token acquired and fingerprint assembled
    Advance,
    /// 2xx from the verification endpoint
    Accept,
    /// Token failure, network failure, timeout, or rejecting verdict
    Reject,
    /// Explicit user retry
    Reset,
}

/// Pure transition function. `None` means the event is not legal in the
/// given state and must be ignored.
pub fn transition(state: VerifyState, event: VerifyEvent) -> Option<VerifyState> {
    use VerifyEvent::*;
    use VerifyState::*;

    match (state, event) {
        (Idle, Engage) => Some(Checking),
        (Checking, Advance) => Some(Verifying),
        (Checking, Reject) => Some(Failed),
        (Verifying, Accept) => Some(Verified),
        (Verifying, Reject) => Some(Failed),
        (Failed, Reset) => Some(Idle),
        _ => None,
    }
}

/// One end-to-end verification cycle: token, evidence, verdict.
///
/// Discarded, never retried, on terminal failure unless the caller
/// explicitly resets.
#[derive(Debug, Clone)]
pub struct VerificationAttempt {
    pub started_at: DateTime<Utc>,
    pub token: String,
    pub fingerprint: EnvironmentFingerprint,
}

/// Controller options.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub widget_kind: WidgetKind,
    pub collector: CollectorConfig,
    /// Help/trust page linked from the failure modal
    pub help_url: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            widget_kind: WidgetKind::default(),
            collector: CollectorConfig::default(),
            help_url: DEFAULT_HELP_URL.to_string(),
        }
    }
}

/// Owns the state machine and the current attempt.
///
/// Construction is pure; [`verify`](Self::verify) is the explicit impure
/// entry point. At most one attempt is in flight: re-entrant calls while
/// `Checking`/`Verifying` (or after a terminal state) are no-ops.
pub struct VerificationController<S, V> {
    state: VerifyState,
    session: Arc<SessionContext>,
    service: S,
    view: V,
    config: ControllerConfig,
    attempt: Option<VerificationAttempt>,
}

impl<S: VerificationService, V: WidgetView> VerificationController<S, V> {
    pub fn new(
        session: Arc<SessionContext>,
        service: S,
        view: V,
        config: ControllerConfig,
    ) -> Self {
        Self {
            state: VerifyState::Idle,
            session,
            service,
            view,
            config,
            attempt: None,
        }
    }

    pub fn state(&self) -> VerifyState {
        self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == VerifyState::Verified
    }

    pub fn attempt(&self) -> Option<&VerificationAttempt> {
        self.attempt.as_ref()
    }

    /// Apply one event; illegal events are ignored. Rendering and button
    /// enablement are derived from the resulting state, nowhere else.
    fn apply(&mut self, event: VerifyEvent) {
        match transition(self.state, event) {
            Some(next) => {
                tracing::debug!(from = ?self.state, to = ?next, event = ?event, "state transition");
                self.state = next;
                self.view.render(next);
                self.view.set_submit_enabled(next.submit_enabled());
            }
            None => {
                tracing::trace!(state = ?self.state, event = ?event, "event ignored");
            }
        }
    }

    fn fail(&mut self, error: SensorError) {
        tracing::warn!(error = %error, "verification attempt failed");
        self.view.show_failure(&error.notice(), &self.config.help_url);
        self.apply(VerifyEvent::Reject);
    }

    /// Run one verification attempt to a terminal state.
    ///
    /// A no-op unless the controller is `Idle`; the single-threaded
    /// cooperative scheduling model makes the check-then-engage safe.
    pub async fn verify<H: EnvironmentHost>(&mut self, host: &H) -> VerifyState {
        if self.state != VerifyState::Idle {
            tracing::debug!(state = ?self.state, "verify ignored: attempt not permitted");
            return self.state;
        }

        self.apply(VerifyEvent::Engage);

        let token = match self.service.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                self.fail(e);
                return self.state;
            }
        };

        let collector = FingerprintCollector::new(self.config.collector);
        let fingerprint = collector.collect(host).await;

        self.attempt = Some(VerificationAttempt {
            started_at: Utc::now(),
            token: token.clone(),
            fingerprint: fingerprint.clone(),
        });

        self.apply(VerifyEvent::Advance);

        let payload = self.assemble_payload(host, token, fingerprint);
        match self.service.submit(&payload).await {
            Ok(()) => self.apply(VerifyEvent::Accept),
            Err(e) => self.fail(e),
        }

        self.state
    }

    /// Explicit user retry: legal only from `Failed`. Clears the attempt
    /// and the recorded session so the next attempt starts clean.
    pub fn reset(&mut self) {
        if self.state != VerifyState::Failed {
            tracing::trace!(state = ?self.state, "reset ignored");
            return;
        }
        self.attempt = None;
        self.session.reset();
        self.apply(VerifyEvent::Reset);
    }

    /// Bundle the evidence: event log, counters, page timing, geometry,
    /// fingerprint, token. The fingerprint is the one collected for this
    /// attempt and is never refreshed mid-attempt.
    fn assemble_payload(
        &self,
        host: &impl EnvironmentHost,
        token: String,
        fingerprint: EnvironmentFingerprint,
    ) -> VerificationPayload {
        let (events, interaction_stats) = self.session.snapshot();
        let geometry = host.viewport();
        let headless = fingerprint.webdriver;

        VerificationPayload {
            events,
            meta: SubmissionMeta {
                time_on_page_ms: self.session.elapsed_ms(),
                screen_w: geometry.screen_w,
                screen_h: geometry.screen_h,
                pixel_ratio: geometry.pixel_ratio,
                inner_w: geometry.inner_w,
                inner_h: geometry.inner_h,
                headless,
                inputs_count: host.form_input_count(),
                widget_type: self.config.widget_kind,
                interaction_stats,
                client_info: fingerprint,
            },
            token,
        }
    }

    #[cfg(test)]
    fn force_state(&mut self, state: VerifyState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EnvironmentProfile, RecordingWidget, SimulatedHost};
    use crate::recorder::RecorderConfig;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use verigate_common::{Challenge, EventCategory, FailureNotice};

    /// Service double with programmable outcomes and call counters.
    #[derive(Default)]
    struct ScriptedService {
        token_fails: bool,
        rejection: Option<FailureNotice>,
        transport_fails: bool,
        token_calls: AtomicU32,
        submit_calls: AtomicU32,
        submitted: Mutex<Option<VerificationPayload>>,
    }

    impl VerificationService for ScriptedService {
        async fn fetch_token(&self) -> Result<String, SensorError> {
            self.token_calls.fetch_add(1, Ordering::Relaxed);
            if self.token_fails {
                return Err(SensorError::TokenAcquisition(
                    "token endpoint returned 500".to_string(),
                ));
            }
            Ok("tok-1".to_string())
        }

        async fn fetch_challenge(&self, _context_path: &str) -> Result<Challenge, SensorError> {
            unimplemented!("controller flow never fetches challenges")
        }

        async fn submit(&self, payload: &VerificationPayload) -> Result<(), SensorError> {
            self.submit_calls.fetch_add(1, Ordering::Relaxed);
            *self.submitted.lock().unwrap() = Some(payload.clone());
            if self.transport_fails {
                return Err(SensorError::Transport("connection reset".to_string()));
            }
            if let Some(notice) = &self.rejection {
                return Err(SensorError::Rejected(notice.clone()));
            }
            Ok(())
        }
    }

    fn controller(
        service: ScriptedService,
    ) -> VerificationController<ScriptedService, RecordingWidget> {
        let session = SessionContext::new(RecorderConfig::bounded());
        VerificationController::new(
            session,
            service,
            RecordingWidget::default(),
            ControllerConfig::default(),
        )
    }

    #[test]
    fn transition_table_is_exact() {
        use VerifyEvent::*;
        use VerifyState::*;

        assert_eq!(transition(Idle, Engage), Some(Checking));
        assert_eq!(transition(Checking, Advance), Some(Verifying));
        assert_eq!(transition(Checking, Reject), Some(Failed));
        assert_eq!(transition(Verifying, Accept), Some(Verified));
        assert_eq!(transition(Verifying, Reject), Some(Failed));
        assert_eq!(transition(Failed, Reset), Some(Idle));

        // No silent retry, no engagement from non-idle states.
        assert_eq!(transition(Failed, Engage), None);
        assert_eq!(transition(Verified, Engage), None);
        assert_eq!(transition(Checking, Engage), None);
        assert_eq!(transition(Idle, Reset), None);
        assert_eq!(transition(Verified, Reset), None);
    }

    #[tokio::test]
    async fn successful_attempt_reaches_verified() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService::default());

        let state = controller.verify(&host).await;

        assert_eq!(state, VerifyState::Verified);
        assert!(controller.is_verified());
        assert_eq!(controller.service.submit_calls.load(Ordering::Relaxed), 1);
        assert_eq!(
            controller.view.states(),
            vec![
                VerifyState::Checking,
                VerifyState::Verifying,
                VerifyState::Verified
            ]
        );
        assert!(controller.view.submit_enabled());
    }

    #[tokio::test]
    async fn verified_requires_a_successful_submission() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService {
            transport_fails: true,
            ..Default::default()
        });

        let state = controller.verify(&host).await;

        assert_eq!(state, VerifyState::Failed);
        assert!(!controller.view.submit_enabled());
    }

    #[tokio::test]
    async fn token_failure_short_circuits_without_submission() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService {
            token_fails: true,
            ..Default::default()
        });

        let state = controller.verify(&host).await;

        assert_eq!(state, VerifyState::Failed);
        assert_eq!(controller.service.submit_calls.load(Ordering::Relaxed), 0);
        assert_eq!(
            controller.view.states(),
            vec![VerifyState::Checking, VerifyState::Failed]
        );
    }

    #[tokio::test]
    async fn rejection_notice_reaches_the_view_verbatim() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService {
            rejection: Some(FailureNotice {
                sky_id: Some("SK-9".to_string()),
                score: Some(0.92),
            }),
            ..Default::default()
        });

        controller.verify(&host).await;

        let failures = controller.view.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sky_id_display(), "SK-9");
        assert_eq!(failures[0].score_display(), "0.92");
    }

    #[tokio::test]
    async fn failure_modal_links_the_help_page() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let session = SessionContext::new(RecorderConfig::bounded());
        let mut controller = VerificationController::new(
            session,
            ScriptedService {
                token_fails: true,
                ..Default::default()
            },
            RecordingWidget::default(),
            ControllerConfig {
                help_url: "https://help.example.test/why".to_string(),
                ..Default::default()
            },
        );

        controller.verify(&host).await;

        assert_eq!(
            controller.view.help_links(),
            vec!["https://help.example.test/why".to_string()]
        );
    }

    #[tokio::test]
    async fn reentrant_verify_is_a_noop() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        for in_flight in [VerifyState::Checking, VerifyState::Verifying] {
            let mut controller = controller(ScriptedService::default());
            controller.force_state(in_flight);

            let state = controller.verify(&host).await;

            assert_eq!(state, in_flight);
            assert_eq!(controller.service.token_calls.load(Ordering::Relaxed), 0);
            assert_eq!(controller.service.submit_calls.load(Ordering::Relaxed), 0);
            assert!(controller.view.states().is_empty());
        }
    }

    #[tokio::test]
    async fn verify_after_verified_is_a_noop() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService::default());

        controller.verify(&host).await;
        controller.verify(&host).await;

        assert_eq!(controller.service.token_calls.load(Ordering::Relaxed), 1);
        assert_eq!(controller.service.submit_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn failed_stays_failed_until_explicit_reset() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService {
            token_fails: true,
            ..Default::default()
        });

        controller.verify(&host).await;
        assert_eq!(controller.state(), VerifyState::Failed);

        // No unsupervised retry: a second verify changes nothing.
        controller.verify(&host).await;
        assert_eq!(controller.state(), VerifyState::Failed);
        assert_eq!(controller.service.token_calls.load(Ordering::Relaxed), 1);
        assert!(!controller.view.submit_enabled());

        controller.reset();
        assert_eq!(controller.state(), VerifyState::Idle);
        assert!(!controller.view.submit_enabled());
        assert!(controller.attempt().is_none());
    }

    #[tokio::test]
    async fn reset_is_ignored_outside_failed() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let mut controller = controller(ScriptedService::default());

        controller.reset();
        assert_eq!(controller.state(), VerifyState::Idle);

        controller.verify(&host).await;
        controller.reset();
        assert_eq!(controller.state(), VerifyState::Verified);
    }

    #[tokio::test]
    async fn payload_bundles_log_counters_and_geometry() {
        let host = SimulatedHost::new(EnvironmentProfile::desktop_chrome());
        let service = ScriptedService::default();
        let session = SessionContext::new(RecorderConfig::bounded());
        session.record_at(EventCategory::PointerMove, 40, None);
        session.record_at(EventCategory::Click, 900, None);
        session.record_at(EventCategory::KeyDown, 1800, None);

        let mut controller = VerificationController::new(
            session,
            service,
            RecordingWidget::default(),
            ControllerConfig::default(),
        );
        controller.verify(&host).await;

        let payload = controller
            .service
            .submitted
            .lock()
            .unwrap()
            .clone()
            .expect("payload submitted");

        assert_eq!(payload.token, "tok-1");
        assert_eq!(payload.events.len(), 3);
        assert_eq!(payload.meta.interaction_stats.clicks, 1);
        assert_eq!(payload.meta.interaction_stats.keypresses, 1);
        assert_eq!(payload.meta.screen_w, 1920);
        assert_eq!(payload.meta.inputs_count, 4);
        assert_eq!(payload.meta.widget_type, WidgetKind::Visible);
        assert!(!payload.meta.headless);
        assert!(!payload.meta.client_info.automation_framework_detected);
    }
}
