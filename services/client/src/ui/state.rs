//! services/client/src/ui/state.rs
//!
//! Defines the application's shared state: the collaborator ports behind
//! `Arc<dyn …>`, created once at startup and handed to each page controller.

use crate::config::Config;
use guestgo_core::ports::{AuthService, CameraService, DataService, EmailDeliveryService};
use std::sync::Arc;

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub data: Arc<dyn DataService>,
    pub email: Arc<dyn EmailDeliveryService>,
    pub camera: Arc<dyn CameraService>,
    pub config: Arc<Config>,
}
