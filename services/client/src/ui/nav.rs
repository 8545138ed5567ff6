//! services/client/src/ui/nav.rs
//!
//! Derives which navigation affordances are visible from the authenticated
//! identity's role, and recomputes them on every authentication-state
//! change.

use futures::StreamExt;
use guestgo_core::domain::{AuthUser, Role};
use guestgo_core::ports::{AuthService, DataService};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The visibility of the role-gated navigation affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavView {
    pub dashboard: bool,
    pub scanner: bool,
    pub schedule_visit: bool,
}

/// The pure visibility matrix.
///
/// Dashboard: any authenticated identity. Scanner: personnel only.
/// Schedule-visit: hidden for admin, log and personnel, visible otherwise —
/// including unauthenticated visitors and identities with no role record.
pub fn visibility(authenticated: bool, role: Option<Role>) -> NavView {
    NavView {
        dashboard: authenticated,
        scanner: role == Some(Role::Personnel),
        schedule_visit: !matches!(
            role,
            Some(Role::Admin) | Some(Role::Log) | Some(Role::Personnel)
        ),
    }
}

/// Recomputes the navigation view once at load and on every sign-in and
/// sign-out.
pub struct NavPresenter {
    data: Arc<dyn DataService>,
    events: mpsc::UnboundedSender<NavView>,
}

impl NavPresenter {
    pub fn new(data: Arc<dyn DataService>, events: mpsc::UnboundedSender<NavView>) -> Self {
        Self { data, events }
    }

    /// Looks up the identity's role and emits the resulting view.
    /// A failed lookup falls back to the role-absent default rather than
    /// hiding everything.
    pub async fn refresh(&self, user: Option<&AuthUser>) {
        let role = match user {
            None => None,
            Some(user) => match self.data.fetch_role(user.id).await {
                Ok(role) => role,
                Err(e) => {
                    warn!("Role lookup failed; treating as role-absent: {:?}", e);
                    None
                }
            },
        };
        let view = visibility(user.is_some(), role);
        let _ = self.events.send(view);
    }

    /// Emits the initial view, then follows the authentication stream until
    /// cancelled.
    pub async fn run(&self, auth: Arc<dyn AuthService>, cancel: CancellationToken) {
        let initial = match auth.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Could not read the current user at load: {:?}", e);
                None
            }
        };
        self.refresh(initial.as_ref()).await;

        let mut changes = auth.on_auth_state_change();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Navigation presenter stopped.");
                    return;
                }
                item = changes.next() => match item {
                    Some(user) => self.refresh(user.as_ref()).await,
                    None => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use guestgo_core::domain::{
        Gate, NewGate, NewPlace, NewVisit, Place, VisitQrPayload,
    };
    use guestgo_core::ports::{AuthStateStream, PortError, PortResult};
    use std::collections::HashMap;
    use uuid::Uuid;

    struct RoleTable {
        roles: HashMap<Uuid, Role>,
        fail_lookups: bool,
    }

    impl RoleTable {
        fn with(entries: &[(Uuid, Role)]) -> Self {
            Self {
                roles: entries.iter().cloned().collect(),
                fail_lookups: false,
            }
        }
    }

    #[async_trait]
    impl DataService for RoleTable {
        async fn fetch_role(&self, user_id: Uuid) -> PortResult<Option<Role>> {
            if self.fail_lookups {
                return Err(PortError::Provider("backend outage".to_string()));
            }
            Ok(self.roles.get(&user_id).copied())
        }
        async fn resolve_visit(&self, _visit_id: &str) -> PortResult<VisitQrPayload> {
            Err(PortError::Unexpected("not used".to_string()))
        }
        async fn create_visit(&self, _visit: NewVisit) -> PortResult<VisitQrPayload> {
            Err(PortError::Unexpected("not used".to_string()))
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

    struct SequencedAuth {
        initial: Option<AuthUser>,
        changes: std::sync::Mutex<Option<Vec<Option<AuthUser>>>>,
    }

    #[async_trait]
    impl AuthService for SequencedAuth {
        async fn current_user(&self) -> PortResult<Option<AuthUser>> {
            Ok(self.initial.clone())
        }
        fn on_auth_state_change(&self) -> AuthStateStream {
            let changes = self.changes.lock().unwrap().take().unwrap_or_default();
            Box::pin(futures::stream::iter(changes))
        }
        async fn sign_out(&self) -> PortResult<()> {
            Ok(())
        }
    }

    fn user(id: Uuid) -> AuthUser {
        AuthUser {
            id,
            email: "user@gmail.com".to_string(),
        }
    }

    #[test]
    fn personnel_sees_the_scanner_but_cannot_schedule() {
        let view = visibility(true, Some(Role::Personnel));
        assert!(view.dashboard);
        assert!(view.scanner);
        assert!(!view.schedule_visit);
    }

    #[test]
    fn admin_and_log_lose_the_schedule_affordance() {
        assert!(!visibility(true, Some(Role::Admin)).schedule_visit);
        assert!(!visibility(true, Some(Role::Log)).schedule_visit);
        assert!(!visibility(true, Some(Role::Admin)).scanner);
    }

    #[test]
    fn visitors_and_guests_can_schedule() {
        for role in [Role::Visitor, Role::Guest] {
            let view = visibility(true, Some(role));
            assert!(view.dashboard);
            assert!(!view.scanner);
            assert!(view.schedule_visit);
        }
    }

    #[test]
    fn unauthenticated_can_schedule_but_sees_no_dashboard() {
        let view = visibility(false, None);
        assert!(!view.dashboard);
        assert!(!view.scanner);
        assert!(view.schedule_visit);
    }

    #[test]
    fn a_missing_role_record_defaults_to_schedulable() {
        let view = visibility(true, None);
        assert!(view.dashboard);
        assert!(!view.scanner);
        assert!(view.schedule_visit);
    }

    #[tokio::test]
    async fn refresh_falls_back_when_the_lookup_fails() {
        let id = Uuid::new_v4();
        let mut table = RoleTable::with(&[(id, Role::Admin)]);
        table.fail_lookups = true;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let presenter = NavPresenter::new(Arc::new(table), tx);

        presenter.refresh(Some(&user(id))).await;
        let view = rx.recv().await.unwrap();
        // The admin role never loaded, so the default applies.
        assert!(view.schedule_visit);
        assert!(view.dashboard);
    }

    #[tokio::test]
    async fn run_recomputes_on_every_auth_transition() {
        let personnel_id = Uuid::new_v4();
        let table = RoleTable::with(&[(personnel_id, Role::Personnel)]);
        let auth = SequencedAuth {
            initial: None,
            changes: std::sync::Mutex::new(Some(vec![
                Some(user(personnel_id)),
                None,
            ])),
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let presenter = NavPresenter::new(Arc::new(table), tx);

        presenter
            .run(Arc::new(auth), CancellationToken::new())
            .await;

        // Initial load: unauthenticated.
        assert_eq!(rx.recv().await.unwrap(), visibility(false, None));
        // Sign-in as personnel.
        assert_eq!(
            rx.recv().await.unwrap(),
            visibility(true, Some(Role::Personnel))
        );
        // Sign-out.
        assert_eq!(rx.recv().await.unwrap(), visibility(false, None));
    }
}
