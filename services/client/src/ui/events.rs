//! services/client/src/ui/events.rs
//!
//! Defines the event protocol between the rendered page and the controllers:
//! the user-originated events each controller dispatches on, and the view
//! events the controllers emit for the page to render.

use crate::error::ErrorKind;
use guestgo_core::domain::VisitQrPayload;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Events Originating FROM the User (page input)
//=========================================================================================

/// Represents the structured events a page can hand to its controllers.
/// Each controller handles the variants it owns and ignores the rest, which
/// keeps the state transitions auditable per component.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// A keystroke changed the email field on the scheduling form.
    EmailChanged { email: String },

    /// The user pressed the send-code (or resend) button.
    SendCodeRequested,

    /// The user submitted a candidate verification code.
    CodeSubmitted { code: String },

    /// The user pressed the schedule-visit submit button.
    ScheduleSubmitted,

    /// The user entered the scanner page; the camera starts automatically.
    ScannerEntered,

    /// The user navigated away from the scanner page.
    ScannerLeft,

    /// The user toggled between the rear and front camera.
    SwitchCameraRequested,

    /// The user pasted or typed a code instead of scanning one.
    ManualCodeEntered { text: String },
}

//=========================================================================================
// Events Emitted FOR the Page (view updates)
//=========================================================================================

/// View updates from the verification code manager.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// Whether the send-code action is currently offered, with a reason
    /// when it is not.
    SendAvailability {
        enabled: bool,
        reason: Option<String>,
    },

    /// A code was delivered to the target address.
    CodeSent,

    /// One tick of the resend cooldown countdown label.
    ResendCountdown { seconds_left: u64 },

    /// The resend cooldown elapsed; the button re-enables.
    ResendAvailable,

    /// The active code expired unverified.
    CodeExpired,

    /// The candidate matched; input controls disable.
    Verified,

    /// A send or verify attempt failed.
    VerificationFailed { kind: ErrorKind, message: String },
}

/// View updates from the scanner controller.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScannerEvent {
    /// The camera permission/stream request is in flight.
    Requesting,

    /// A live preview is attached; per-frame decoding is running.
    Started { facing: String },

    /// A code was read and interpreted; the payload goes to the details
    /// renderer.
    Detected { payload: VisitQrPayload },

    /// A symbol was read but it is not a recognized GuestGo code.
    Unrecognized,

    /// The stream was torn down.
    Stopped,

    /// Camera acquisition or payload resolution failed.
    ScannerError { kind: ErrorKind, message: String },
}
