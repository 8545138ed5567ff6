//! services/client/src/ui/verification.rs
//!
//! The verification code manager for the schedule-visit page: issues one-time
//! numeric codes bound to an email address, delivers them through the email
//! collaborator, expires them, and gates form submission on a successful
//! check.

use crate::error::ErrorKind;
use crate::ui::events::{UiEvent, VerificationEvent};
use guestgo_core::domain::{AuthUser, CodeEmail, NewVisit, VisitQrPayload};
use guestgo_core::ports::{DataService, EmailDeliveryService, PortError};
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long an issued code stays verifiable.
pub const CODE_TTL: Duration = Duration::from_secs(5 * 60);

/// How long the resend button stays disabled after a send.
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

//=========================================================================================
// Operation Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendCodeError {
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("Only Gmail addresses can receive a verification code.")]
    UnsupportedProvider,
    #[error("The code could not be sent: {0}")]
    Delivery(String),
}

impl SendCodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SendCodeError::InvalidEmail | SendCodeError::UnsupportedProvider => {
                ErrorKind::Validation
            }
            SendCodeError::Delivery(_) => ErrorKind::Provider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyCodeError {
    #[error("Enter the code from your email.")]
    MissingCode,
    #[error("No active code. Request a new one.")]
    NoActiveCode,
    #[error("That code does not match.")]
    Mismatch,
}

impl VerifyCodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyCodeError::MissingCode | VerifyCodeError::Mismatch => ErrorKind::Validation,
            VerifyCodeError::NoActiveCode => ErrorKind::State,
        }
    }
}

//=========================================================================================
// VerificationSession
//=========================================================================================

/// The ephemeral per-page verification state. Held only in page memory;
/// reset on email change, on successful submission, and on page teardown.
#[derive(Debug)]
struct VerificationSession {
    target_email: String,
    issued_code: Option<String>,
    sent_at: Option<Instant>,
    expires_at: Option<Instant>,
    resend_available_at: Option<Instant>,
    verified: bool,
    /// Bumped on every reset and every send. A completed in-flight send whose
    /// generation no longer matches must not apply its result.
    generation: u64,
    /// Owns the countdown and expiry tasks. Cancelled and replaced, never
    /// stacked, on every new send and on reset.
    timers: CancellationToken,
}

impl VerificationSession {
    fn new() -> Self {
        Self {
            target_email: String::new(),
            issued_code: None,
            sent_at: None,
            expires_at: None,
            resend_available_at: None,
            verified: false,
            generation: 0,
            timers: CancellationToken::new(),
        }
    }

    /// Returns the session to its initial empty state for a new email,
    /// cancelling any pending timers.
    fn reset_for(&mut self, email: &str) {
        self.timers.cancel();
        self.timers = CancellationToken::new();
        self.target_email = email.to_string();
        self.issued_code = None;
        self.sent_at = None;
        self.expires_at = None;
        self.resend_available_at = None;
        self.verified = false;
        self.generation += 1;
    }
}

//=========================================================================================
// VerificationManager
//=========================================================================================

/// Drives the verification code lifecycle for one schedule-visit page
/// activation.
#[derive(Clone)]
pub struct VerificationManager {
    session: Arc<Mutex<VerificationSession>>,
    email: Arc<dyn EmailDeliveryService>,
    events: mpsc::UnboundedSender<VerificationEvent>,
}

impl VerificationManager {
    pub fn new(
        email: Arc<dyn EmailDeliveryService>,
        events: mpsc::UnboundedSender<VerificationEvent>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(VerificationSession::new())),
            email,
            events,
        }
    }

    /// Dispatches the verification-related subset of page events.
    pub async fn handle(&self, event: &UiEvent) {
        match event {
            UiEvent::EmailChanged { email } => self.on_email_changed(email).await,
            UiEvent::SendCodeRequested => {
                if !self.is_resend_available().await {
                    debug!("Send requested during cooldown; ignored by the UI gate.");
                    return;
                }
                let email = self.session.lock().await.target_email.clone();
                // Failures are already surfaced as view events.
                let _ = self.send_code(&email).await;
            }
            UiEvent::CodeSubmitted { code } => {
                let _ = self.verify_code(code).await;
            }
            _ => {}
        }
    }

    /// Resets the session for a new target email and re-evaluates whether the
    /// send action is offered.
    pub async fn on_email_changed(&self, email: &str) {
        {
            let mut session = self.session.lock().await;
            session.reset_for(email);
        }

        let (enabled, reason) = if email.trim().is_empty() {
            (false, Some("Enter your email address.".to_string()))
        } else if !is_gmail_address(email) {
            (false, Some("Only Gmail addresses can receive a code.".to_string()))
        } else {
            (true, None)
        };
        let _ = self
            .events
            .send(VerificationEvent::SendAvailability { enabled, reason });
    }

    /// Generates and delivers a fresh 6-digit code. Any previously issued code
    /// is invalidated before the provider is called.
    pub async fn send_code(&self, email: &str) -> Result<(), SendCodeError> {
        if !email_pattern().is_match(email) {
            return Err(self.surface_send_error(SendCodeError::InvalidEmail));
        }
        if !is_gmail_address(email) {
            return Err(self.surface_send_error(SendCodeError::UnsupportedProvider));
        }

        // Invalidate any prior code immediately and record which send this is.
        let generation = {
            let mut session = self.session.lock().await;
            session.reset_for(email);
            session.generation
        };

        let code = generate_code();
        let template = CodeEmail {
            code: code.clone(),
            valid_minutes: (CODE_TTL.as_secs() / 60) as i64,
        };

        // The session lock is not held across the provider call, so rapid
        // email edits can proceed while delivery is in flight.
        if let Err(e) = self.email.send_code(email, &template).await {
            warn!("Verification email delivery failed: {:?}", e);
            return Err(self.surface_send_error(SendCodeError::Delivery(e.to_string())));
        }

        let mut session = self.session.lock().await;
        if session.generation != generation {
            info!("Discarding a stale code delivery; the session moved on.");
            return Ok(());
        }

        let now = Instant::now();
        session.issued_code = Some(code);
        session.sent_at = Some(now);
        session.expires_at = Some(now + CODE_TTL);
        session.resend_available_at = Some(now + RESEND_COOLDOWN);
        session.verified = false;

        let token = session.timers.clone();
        tokio::spawn(countdown_task(self.events.clone(), token.clone()));
        tokio::spawn(expiry_task(
            self.session.clone(),
            self.events.clone(),
            token,
            generation,
        ));

        let _ = self.events.send(VerificationEvent::CodeSent);
        Ok(())
    }

    /// Checks a candidate against the issued code. Success is single-use: the
    /// code is consumed and the session marked verified.
    pub async fn verify_code(&self, candidate: &str) -> Result<(), VerifyCodeError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(self.surface_verify_error(VerifyCodeError::MissingCode));
        }

        let mut session = self.session.lock().await;

        // The deadline is checked here as well as in the expiry task, so
        // invalidation is ordered ahead of every verify attempt even when the
        // task has not fired yet.
        if let Some(expires_at) = session.expires_at {
            if Instant::now() >= expires_at {
                session.issued_code = None;
                session.expires_at = None;
            }
        }

        let issued = match session.issued_code.clone() {
            Some(code) => code,
            None => {
                drop(session);
                return Err(self.surface_verify_error(VerifyCodeError::NoActiveCode));
            }
        };

        if issued != candidate {
            drop(session);
            return Err(self.surface_verify_error(VerifyCodeError::Mismatch));
        }

        session.verified = true;
        session.issued_code = None;
        session.expires_at = None;
        session.timers.cancel();
        session.timers = CancellationToken::new();
        if let Some(sent_at) = session.sent_at {
            info!("Code verified {:?} after send.", sent_at.elapsed());
        }
        drop(session);

        let _ = self.events.send(VerificationEvent::Verified);
        Ok(())
    }

    /// False while the resend button should stay disabled.
    pub async fn is_resend_available(&self) -> bool {
        let session = self.session.lock().await;
        match session.resend_available_at {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    /// Seconds remaining on the resend cooldown label.
    pub async fn resend_seconds_left(&self) -> u64 {
        let session = self.session.lock().await;
        match session.resend_available_at {
            Some(at) => at.saturating_duration_since(Instant::now()).as_secs(),
            None => 0,
        }
    }

    pub async fn is_verified(&self) -> bool {
        self.session.lock().await.verified
    }

    /// The sole gate for the schedule-visit submit action.
    pub async fn submission_allowed(&self, form: &ScheduleForm) -> bool {
        if !form.required_fields_complete() {
            return false;
        }
        if form.email_readonly {
            return true;
        }
        self.is_verified().await
    }

    /// Page teardown / successful submission: back to the initial empty state.
    pub async fn reset(&self) {
        let mut session = self.session.lock().await;
        session.reset_for("");
    }

    fn surface_send_error(&self, err: SendCodeError) -> SendCodeError {
        let _ = self.events.send(VerificationEvent::VerificationFailed {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }

    fn surface_verify_error(&self, err: VerifyCodeError) -> VerifyCodeError {
        let _ = self.events.send(VerificationEvent::VerificationFailed {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }
}

/// The 1-second countdown driving the resend label, purely for UI updates.
async fn countdown_task(
    events: mpsc::UnboundedSender<VerificationEvent>,
    token: CancellationToken,
) {
    let mut seconds_left = RESEND_COOLDOWN.as_secs();
    let mut ticker = time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                if seconds_left == 0 {
                    let _ = events.send(VerificationEvent::ResendAvailable);
                    return;
                }
                let _ = events.send(VerificationEvent::ResendCountdown { seconds_left });
                seconds_left -= 1;
            }
        }
    }
}

/// The one-shot expiry timer: clears the issued code and marks the session
/// unverified when it fires.
async fn expiry_task(
    session_lock: Arc<Mutex<VerificationSession>>,
    events: mpsc::UnboundedSender<VerificationEvent>,
    token: CancellationToken,
    generation: u64,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = time::sleep(CODE_TTL) => {
            let mut session = session_lock.lock().await;
            if session.generation == generation && session.issued_code.is_some() {
                session.issued_code = None;
                session.expires_at = None;
                session.verified = false;
                let _ = events.send(VerificationEvent::CodeExpired);
            }
        }
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn email_pattern() -> &'static Regex {
    static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern")
    })
}

fn is_gmail_address(email: &str) -> bool {
    email_pattern().is_match(email) && email.trim().to_lowercase().ends_with("@gmail.com")
}

//=========================================================================================
// ScheduleForm and SchedulePage
//=========================================================================================

/// The visit-scheduling form fields the submit gate inspects.
#[derive(Debug, Clone, Default)]
pub struct ScheduleForm {
    pub visitor_name: String,
    pub email: String,
    pub visit_date: String,
    pub purpose: String,
    pub place_ids: Vec<String>,
    /// True when the email field is pre-filled from the signed-in identity
    /// and rendered read-only; verification is bypassed in that mode.
    pub email_readonly: bool,
}

impl ScheduleForm {
    /// An empty form, or one pre-filled from the signed-in identity.
    pub fn for_user(user: Option<&AuthUser>) -> Self {
        match user {
            Some(u) => Self {
                email: u.email.clone(),
                email_readonly: true,
                ..Default::default()
            },
            None => Self::default(),
        }
    }

    pub fn required_fields_complete(&self) -> bool {
        !self.visitor_name.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.visit_date.trim().is_empty()
            && !self.purpose.trim().is_empty()
            && !self.place_ids.is_empty()
    }

    fn to_new_visit(&self) -> NewVisit {
        NewVisit {
            visitor_name: self.visitor_name.clone(),
            visitor_email: self.email.clone(),
            visit_date: self.visit_date.clone(),
            purpose: self.purpose.clone(),
            place_ids: self.place_ids.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("The form is incomplete or the email is not verified yet.")]
    NotAllowed,
    #[error("Scheduling failed: {0}")]
    Data(#[from] PortError),
}

/// One schedule-visit page activation: the form, its verification manager,
/// and the data-service calls behind the submit button.
pub struct SchedulePage {
    form: Mutex<ScheduleForm>,
    verification: VerificationManager,
    data: Arc<dyn DataService>,
}

impl SchedulePage {
    pub fn new(
        data: Arc<dyn DataService>,
        email: Arc<dyn EmailDeliveryService>,
        events: mpsc::UnboundedSender<VerificationEvent>,
        user: Option<&AuthUser>,
    ) -> Self {
        Self {
            form: Mutex::new(ScheduleForm::for_user(user)),
            verification: VerificationManager::new(email, events),
            data,
        }
    }

    pub fn verification(&self) -> &VerificationManager {
        &self.verification
    }

    pub async fn set_form(&self, form: ScheduleForm) {
        *self.form.lock().await = form;
    }

    pub async fn submission_allowed(&self) -> bool {
        let form = self.form.lock().await.clone();
        self.verification.submission_allowed(&form).await
    }

    /// Creates the visit through the data service, records the action in the
    /// audit log, and resets the verification session.
    pub async fn submit(&self) -> Result<VisitQrPayload, ScheduleError> {
        let form = self.form.lock().await.clone();
        if !self.verification.submission_allowed(&form).await {
            return Err(ScheduleError::NotAllowed);
        }

        let visit = self.data.create_visit(form.to_new_visit()).await?;
        if let Err(e) = self
            .data
            .log_action("visit_scheduled", &visit.visit_id)
            .await
        {
            warn!("Failed to record the scheduling action: {:?}", e);
        }
        self.verification.reset().await;
        Ok(visit)
    }

    /// Dispatches the schedule-page subset of page events.
    pub async fn handle(&self, event: &UiEvent) {
        match event {
            UiEvent::EmailChanged { email } => {
                {
                    let mut form = self.form.lock().await;
                    if form.email_readonly {
                        return;
                    }
                    form.email = email.clone();
                }
                self.verification.on_email_changed(email).await;
            }
            UiEvent::ScheduleSubmitted => {
                if let Err(e) = self.submit().await {
                    warn!("Submission rejected: {}", e);
                }
            }
            other => self.verification.handle(other).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use guestgo_core::domain::{Gate, NewGate, NewPlace, Place, Role};
    use guestgo_core::ports::PortResult;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeEmail {
        calls: StdMutex<Vec<(String, String)>>,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EmailDeliveryService for FakeEmail {
        async fn send_code(&self, to_address: &str, email: &CodeEmail) -> PortResult<()> {
            if let Some(delay) = self.delay {
                time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::Provider("smtp outage".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((to_address.to_string(), email.code.clone()));
            Ok(())
        }
    }

    impl FakeEmail {
        fn failing() -> Self {
            let fake = Self::default();
            fake.fail.store(true, Ordering::SeqCst);
            fake
        }

        fn delayed(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_code(&self) -> String {
            self.calls.lock().unwrap().last().unwrap().1.clone()
        }
    }

    fn manager_with(
        fake: Arc<FakeEmail>,
    ) -> (
        VerificationManager,
        mpsc::UnboundedReceiver<VerificationEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (VerificationManager::new(fake, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<VerificationEvent>) -> Vec<VerificationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn complete_form() -> ScheduleForm {
        ScheduleForm {
            visitor_name: "Ada Vance".to_string(),
            email: "user@gmail.com".to_string(),
            visit_date: "2024-06-12".to_string(),
            purpose: "Interview".to_string(),
            place_ids: vec!["p1".to_string()],
            email_readonly: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_then_verify_succeeds_exactly_once() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, mut rx) = manager_with(fake.clone());

        manager.on_email_changed("user@gmail.com").await;
        manager.send_code("user@gmail.com").await.unwrap();
        let code = fake.last_code();
        assert_eq!(code.len(), 6);

        manager.verify_code(&code).await.unwrap();
        assert!(manager.is_verified().await);

        // The code was consumed; a replay is a state error, not a mismatch.
        assert_eq!(
            manager.verify_code(&code).await,
            Err(VerifyCodeError::NoActiveCode)
        );

        let events = drain(&mut rx);
        assert!(events.contains(&VerificationEvent::CodeSent));
        assert!(events.contains(&VerificationEvent::Verified));
    }

    #[tokio::test(start_paused = true)]
    async fn non_gmail_addresses_never_reach_the_provider() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake.clone());

        assert_eq!(
            manager.send_code("user@yahoo.com").await,
            Err(SendCodeError::UnsupportedProvider)
        );
        assert_eq!(
            manager.send_code("nonsense").await,
            Err(SendCodeError::InvalidEmail)
        );
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn code_is_accepted_just_before_expiry() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake.clone());

        manager.send_code("user@gmail.com").await.unwrap();
        time::advance(CODE_TTL - Duration::from_secs(1)).await;
        manager.verify_code(&fake.last_code()).await.unwrap();
        assert!(manager.is_verified().await);
    }

    #[tokio::test(start_paused = true)]
    async fn code_is_rejected_after_expiry() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, mut rx) = manager_with(fake.clone());

        manager.send_code("user@gmail.com").await.unwrap();
        tokio::task::yield_now().await;
        time::advance(CODE_TTL + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            manager.verify_code(&fake.last_code()).await,
            Err(VerifyCodeError::NoActiveCode)
        );
        assert!(!manager.is_verified().await);
        assert!(drain(&mut rx).contains(&VerificationEvent::CodeExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn resend_becomes_available_after_the_cooldown() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, mut rx) = manager_with(fake.clone());

        manager.send_code("user@gmail.com").await.unwrap();
        tokio::task::yield_now().await;
        assert!(!manager.is_resend_available().await);
        assert_eq!(manager.resend_seconds_left().await, 60);

        time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(!manager.is_resend_available().await);

        time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(manager.is_resend_available().await);

        let events = drain(&mut rx);
        assert!(events.contains(&VerificationEvent::ResendCountdown { seconds_left: 60 }));
        assert!(events.contains(&VerificationEvent::ResendAvailable));
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_starts_no_timers_and_keeps_no_code() {
        let fake = Arc::new(FakeEmail::failing());
        let (manager, mut rx) = manager_with(fake.clone());

        match manager.send_code("user@gmail.com").await {
            Err(SendCodeError::Delivery(_)) => {}
            other => panic!("expected a delivery error, got {:?}", other),
        }

        // No cooldown is running and no code is active: the error is retryable.
        assert!(manager.is_resend_available().await);
        assert_eq!(
            manager.verify_code("123456").await,
            Err(VerifyCodeError::NoActiveCode)
        );
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            VerificationEvent::VerificationFailed {
                kind: ErrorKind::Provider,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, VerificationEvent::ResendCountdown { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_leaves_submission_disallowed_until_the_real_code() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake.clone());
        let form = complete_form();

        manager.on_email_changed("user@gmail.com").await;
        manager.send_code("user@gmail.com").await.unwrap();

        // Codes start at 100000, so this can never collide.
        assert_eq!(
            manager.verify_code("000000").await,
            Err(VerifyCodeError::Mismatch)
        );
        assert!(!manager.submission_allowed(&form).await);

        manager.verify_code(&fake.last_code()).await.unwrap();
        assert!(manager.submission_allowed(&form).await);
    }

    #[tokio::test(start_paused = true)]
    async fn changing_the_email_resets_the_session() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake.clone());

        manager.send_code("user@gmail.com").await.unwrap();
        let code = fake.last_code();

        manager.on_email_changed("someone.else@gmail.com").await;
        assert_eq!(
            manager.verify_code(&code).await,
            Err(VerifyCodeError::NoActiveCode)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_delivery_applies_nothing_after_an_email_edit() {
        let fake = Arc::new(FakeEmail::delayed(Duration::from_secs(2)));
        let (manager, _rx) = manager_with(fake.clone());

        manager.on_email_changed("user@gmail.com").await;
        let in_flight = manager.clone();
        let send = tokio::spawn(async move { in_flight.send_code("user@gmail.com").await });
        tokio::task::yield_now().await;

        // The user keeps typing while the provider call is in flight.
        manager.on_email_changed("second@gmail.com").await;

        send.await.unwrap().unwrap();
        assert_eq!(fake.call_count(), 1);
        assert_eq!(
            manager.verify_code(&fake.last_code()).await,
            Err(VerifyCodeError::NoActiveCode)
        );
        // No timers were started by the discarded delivery.
        assert!(manager.is_resend_available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_candidate_is_a_validation_error() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake.clone());
        manager.send_code("user@gmail.com").await.unwrap();
        assert_eq!(
            manager.verify_code("   ").await,
            Err(VerifyCodeError::MissingCode)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn readonly_email_mode_bypasses_verification() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, _rx) = manager_with(fake);
        let mut form = complete_form();
        form.email_readonly = true;
        assert!(manager.submission_allowed(&form).await);

        form.visitor_name.clear();
        assert!(!manager.submission_allowed(&form).await);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_and_non_gmail_emails_disable_the_send_action() {
        let fake = Arc::new(FakeEmail::default());
        let (manager, mut rx) = manager_with(fake);

        manager.on_email_changed("").await;
        manager.on_email_changed("user@outlook.com").await;
        manager.on_email_changed("user@gmail.com").await;

        let availability: Vec<bool> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                VerificationEvent::SendAvailability { enabled, .. } => Some(enabled),
                _ => None,
            })
            .collect();
        assert_eq!(availability, [false, false, true]);
    }

    //-------------------------------------------------------------------------------------
    // SchedulePage
    //-------------------------------------------------------------------------------------

    struct FakeData;

    #[async_trait]
    impl DataService for FakeData {
        async fn fetch_role(&self, _user_id: Uuid) -> PortResult<Option<Role>> {
            Ok(None)
        }
        async fn resolve_visit(&self, _visit_id: &str) -> PortResult<VisitQrPayload> {
            Err(PortError::Unexpected("not used".to_string()))
        }
        async fn create_visit(&self, visit: NewVisit) -> PortResult<VisitQrPayload> {
            Ok(VisitQrPayload {
                visit_id: "v-100".to_string(),
                visitor_name: visit.visitor_name,
                visitor_email: visit.visitor_email,
                visit_date: visit.visit_date,
                purpose: visit.purpose,
                places: Vec::new(),
                status: "pending".to_string(),
                scheduled_at: String::new(),
            })
        }
        async fn list_visits_for(&self, _visitor_email: &str) -> PortResult<Vec<VisitQrPayload>> {
            Ok(Vec::new())
        }
        async fn list_places(&self) -> PortResult<Vec<Place>> {
            Ok(Vec::new())
        }
        async fn create_place(&self, _place: NewPlace) -> PortResult<Place> {
            Err(PortError::Unexpected("not used".to_string()))
        }
        async fn update_place(&self, _place: &Place) -> PortResult<()> {
            Ok(())
        }
        async fn delete_place(&self, _place_id: &str) -> PortResult<()> {
            Ok(())
        }
        async fn list_gates(&self) -> PortResult<Vec<Gate>> {
            Ok(Vec::new())
        }
        async fn create_gate(&self, _gate: NewGate) -> PortResult<Gate> {
            Err(PortError::Unexpected("not used".to_string()))
        }
        async fn update_gate(&self, _gate: &Gate) -> PortResult<()> {
            Ok(())
        }
        async fn delete_gate(&self, _gate_id: &str) -> PortResult<()> {
            Ok(())
        }
        async fn log_action(&self, _action_kind: &str, _details: &str) -> PortResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_submission_resets_the_verification_session() {
        let fake_email = Arc::new(FakeEmail::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let page = SchedulePage::new(Arc::new(FakeData), fake_email.clone(), tx, None);
        page.set_form(complete_form()).await;

        assert!(matches!(page.submit().await, Err(ScheduleError::NotAllowed)));

        page.verification().send_code("user@gmail.com").await.unwrap();
        page.verification()
            .verify_code(&fake_email.last_code())
            .await
            .unwrap();

        let visit = page.submit().await.unwrap();
        assert_eq!(visit.visit_id, "v-100");

        // The session was consumed by the submission.
        assert!(!page.verification().is_verified().await);
        assert!(!page.submission_allowed().await);
    }
}
