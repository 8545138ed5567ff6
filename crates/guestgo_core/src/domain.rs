//! crates/guestgo_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! The QR payload types double as the wire format (camelCase JSON), so their
//! serde derives live here with the types themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An authorization tag on a user identity, controlling UI visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Personnel,
    Visitor,
    Guest,
    Log,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "personnel" => Ok(Role::Personnel),
            "visitor" => Ok(Role::Visitor),
            "guest" => Ok(Role::Guest),
            "log" => Ok(Role::Log),
            other => Err(format!("'{}' is not a known role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Personnel => "personnel",
            Role::Visitor => "visitor",
            Role::Guest => "guest",
            Role::Log => "log",
        };
        write!(f, "{}", s)
    }
}

/// The identity provider's view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// A destination place within a visit. Also the CRUD record for the
/// administrators' place management screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub place_id: String,
    pub place_name: String,
    #[serde(default)]
    pub place_location: String,
    #[serde(default)]
    pub status: String,
}

/// Parameters for creating a place.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub place_name: String,
    pub place_location: String,
    pub status: String,
}

/// A scheduled guest appointment, in the exact shape carried by a visit
/// QR code. Immutable once constructed.
///
/// A payload counts as "full" only when `visit_id`, `visitor_name` and
/// `visit_date` are all present in the serialized form; the remaining fields
/// default to empty. Place order is display order and survives round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitQrPayload {
    pub visit_id: String,
    pub visitor_name: String,
    #[serde(default)]
    pub visitor_email: String,
    pub visit_date: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scheduled_at: String,
}

/// A minimal QR payload carrying only a type tag and id; it must be resolved
/// through the data service before anything can be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceStub {
    pub id: String,
}

/// Parameters for scheduling a new visit.
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub visitor_name: String,
    pub visitor_email: String,
    pub visit_date: String,
    pub purpose: String,
    pub place_ids: Vec<String>,
}

/// Whether a gate admits arrivals, departures, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Entrance,
    Exit,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Open,
    Closed,
}

/// A physical access point record managed by administrators. Doubles as the
/// payload printed into a gate QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub gate_id: String,
    pub gate_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_location: Option<String>,
    pub gate_type: GateType,
    pub status: GateStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Parameters for creating a gate.
#[derive(Debug, Clone)]
pub struct NewGate {
    pub gate_name: String,
    pub gate_description: Option<String>,
    pub gate_location: Option<String>,
    pub gate_type: GateType,
    pub status: GateStatus,
}

/// Template data for the verification code email.
#[derive(Debug, Clone)]
pub struct CodeEmail {
    pub code: String,
    pub valid_minutes: i64,
}

/// Which camera the scanner asks the capture device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Environment,
    User,
}

impl CameraFacing {
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Environment => CameraFacing::User,
            CameraFacing::User => CameraFacing::Environment,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CameraFacing::Environment => "environment",
            CameraFacing::User => "user",
        }
    }
}

/// One grayscale frame pulled from the camera stream.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
}
