//! crates/guestgo_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the backend
//! data service, the mail provider, or the capture device.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{
    AuthUser, CameraFacing, CodeEmail, Gate, NewGate, NewPlace, NewVisit, Place, Role,
    VideoFrame, VisitQrPayload,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the
/// backend REST API, SMTP, the capture device).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Provider failure: {0}")]
    Provider(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The stream of authentication-state transitions. Each item is the user that
/// is now signed in, or `None` after a sign-out.
pub type AuthStateStream = Pin<Box<dyn Stream<Item = Option<AuthUser>> + Send>>;

/// A live sequence of camera frames. Dropping the stream releases the
/// underlying capture device.
pub type FrameStream = Pin<Box<dyn Stream<Item = VideoFrame> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// The currently signed-in user, if any.
    async fn current_user(&self) -> PortResult<Option<AuthUser>>;

    /// A stream that yields on every sign-in and sign-out.
    fn on_auth_state_change(&self) -> AuthStateStream;

    async fn sign_out(&self) -> PortResult<()>;
}

#[async_trait]
pub trait DataService: Send + Sync {
    // --- Roles ---

    /// The role recorded for a user, or `None` when no role row exists.
    async fn fetch_role(&self, user_id: Uuid) -> PortResult<Option<Role>>;

    // --- Visits ---

    /// Resolves a reference-stub visit id into the full payload.
    async fn resolve_visit(&self, visit_id: &str) -> PortResult<VisitQrPayload>;

    async fn create_visit(&self, visit: NewVisit) -> PortResult<VisitQrPayload>;

    async fn list_visits_for(&self, visitor_email: &str) -> PortResult<Vec<VisitQrPayload>>;

    // --- Place Management ---

    async fn list_places(&self) -> PortResult<Vec<Place>>;

    async fn create_place(&self, place: NewPlace) -> PortResult<Place>;

    async fn update_place(&self, place: &Place) -> PortResult<()>;

    async fn delete_place(&self, place_id: &str) -> PortResult<()>;

    // --- Gate Management ---

    async fn list_gates(&self) -> PortResult<Vec<Gate>>;

    async fn create_gate(&self, gate: NewGate) -> PortResult<Gate>;

    async fn update_gate(&self, gate: &Gate) -> PortResult<()>;

    async fn delete_gate(&self, gate_id: &str) -> PortResult<()>;

    // --- Audit Log ---

    /// Records a user-visible action in the logs table.
    async fn log_action(&self, action_kind: &str, details: &str) -> PortResult<()>;
}

#[async_trait]
pub trait EmailDeliveryService: Send + Sync {
    /// Delivers a verification code email. May fail independent of input
    /// validity (network or provider outage).
    async fn send_code(&self, to_address: &str, email: &CodeEmail) -> PortResult<()>;
}

#[async_trait]
pub trait CameraService: Send + Sync {
    /// Requests a live stream from the capture device. A user denying the
    /// permission prompt surfaces as `PortError::PermissionDenied`.
    async fn request_stream(&self, facing: CameraFacing) -> PortResult<FrameStream>;
}
