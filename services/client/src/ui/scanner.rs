//! services/client/src/ui/scanner.rs
//!
//! The scanner page controller: acquires the camera, runs the per-frame
//! decode loop, and hands the first recognized payload to the details
//! renderer. Manual text entry bypasses the camera entirely and feeds the
//! codec directly.

use crate::error::ErrorKind;
use crate::qr::{self, DecodedQr};
use crate::ui::events::{ScannerEvent, UiEvent};
use guestgo_core::domain::{CameraFacing, VisitQrPayload};
use guestgo_core::ports::{CameraService, DataService, FrameStream};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pause between releasing one camera and requesting the opposite one, so
/// the device is not reported busy.
const CAMERA_SWITCH_DELAY: Duration = Duration::from_millis(200);

/// The scanner's per-scan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// No camera stream held.
    Idle,
    /// The permission/stream request is in flight.
    Requesting,
    /// A live stream is attached and frames are being decoded.
    Active,
    /// Terminal per scan: a symbol was read and the stream torn down.
    Detected,
    /// Teardown finished; a new start is allowed.
    Stopped,
    /// Acquisition or the stream failed; restarting is explicit, never
    /// automatic.
    Error,
}

/// The state for a single scanner page activation.
struct ScannerSession {
    state: ScannerState,
    facing: CameraFacing,
    last_decoded: Option<VisitQrPayload>,
    /// Cancels the frame loop; replaced on every start.
    frame_task: CancellationToken,
    frame_handle: Option<JoinHandle<()>>,
}

impl ScannerSession {
    fn new() -> Self {
        Self {
            state: ScannerState::Idle,
            facing: CameraFacing::Environment,
            last_decoded: None,
            frame_task: CancellationToken::new(),
            frame_handle: None,
        }
    }
}

/// Drives one scanner page activation. The camera stream is exclusively
/// owned by the frame task this controller spawns; only one stream is ever
/// open at a time.
pub struct ScannerController {
    session: Arc<Mutex<ScannerSession>>,
    camera: Arc<dyn CameraService>,
    data: Arc<dyn DataService>,
    events: mpsc::UnboundedSender<ScannerEvent>,
}

impl ScannerController {
    pub fn new(
        camera: Arc<dyn CameraService>,
        data: Arc<dyn DataService>,
        events: mpsc::UnboundedSender<ScannerEvent>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ScannerSession::new())),
            camera,
            data,
            events,
        }
    }

    /// Dispatches the scanner subset of page events.
    pub async fn handle(&self, event: &UiEvent) {
        match event {
            UiEvent::ScannerEntered => self.start().await,
            UiEvent::ScannerLeft => self.teardown().await,
            UiEvent::SwitchCameraRequested => self.switch_camera().await,
            UiEvent::ManualCodeEntered { text } => self.submit_manual(text).await,
            _ => {}
        }
    }

    /// Requests the camera and, on success, starts the frame loop.
    pub async fn start(&self) {
        let facing = {
            let mut session = self.session.lock().await;
            match session.state {
                ScannerState::Idle | ScannerState::Stopped | ScannerState::Error => {}
                ScannerState::Requesting | ScannerState::Active => {
                    warn!("Scanner start ignored; already {:?}.", session.state);
                    return;
                }
                ScannerState::Detected => {
                    warn!("Scan already completed; re-enter the scanner to scan again.");
                    return;
                }
            }
            session.state = ScannerState::Requesting;
            session.last_decoded = None;
            session.facing
        };
        let _ = self.events.send(ScannerEvent::Requesting);

        // The lock is not held while the browser permission prompt is up.
        match self.camera.request_stream(facing).await {
            Err(e) => {
                let mut session = self.session.lock().await;
                session.state = ScannerState::Error;
                error!("Camera acquisition failed: {:?}", e);
                let _ = self.events.send(ScannerEvent::ScannerError {
                    kind: ErrorKind::Provider,
                    message: format!("Camera unavailable: {}", e),
                });
            }
            Ok(stream) => {
                let mut session = self.session.lock().await;
                if session.state != ScannerState::Requesting {
                    // A stop raced the permission grant; the stream drops
                    // here, unused.
                    return;
                }
                session.state = ScannerState::Active;
                session.frame_task = CancellationToken::new();
                let token = session.frame_task.clone();
                session.frame_handle = Some(tokio::spawn(frame_loop(
                    self.session.clone(),
                    self.data.clone(),
                    self.events.clone(),
                    stream,
                    token,
                )));
                let _ = self.events.send(ScannerEvent::Started {
                    facing: facing.as_str().to_string(),
                });
            }
        }
    }

    /// Cancels the frame loop and waits for the stream's tracks to be
    /// released.
    pub async fn stop(&self) {
        let handle = {
            let mut session = self.session.lock().await;
            session.frame_task.cancel();
            if matches!(
                session.state,
                ScannerState::Requesting | ScannerState::Active
            ) {
                session.state = ScannerState::Stopped;
                let _ = self.events.send(ScannerEvent::Stopped);
            }
            session.frame_handle.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Toggles between the rear and front camera. Only meaningful while a
    /// stream is live; the prior stream is fully released before the new
    /// request goes out.
    pub async fn switch_camera(&self) {
        {
            let session = self.session.lock().await;
            if session.state != ScannerState::Active {
                warn!("Camera switch is only meaningful while scanning.");
                return;
            }
        }
        self.stop().await;
        time::sleep(CAMERA_SWITCH_DELAY).await;
        {
            let mut session = self.session.lock().await;
            session.facing = session.facing.toggled();
        }
        self.start().await;
    }

    /// Pasted or typed input, fed straight to the codec. The camera state
    /// machine is not involved.
    pub async fn submit_manual(&self, text: &str) {
        interpret_text(&self.session, &self.data, &self.events, text).await;
    }

    /// Page teardown: release everything and forget the session.
    pub async fn teardown(&self) {
        self.stop().await;
        let mut session = self.session.lock().await;
        *session = ScannerSession::new();
    }

    pub async fn state(&self) -> ScannerState {
        self.session.lock().await.state
    }

    pub async fn facing(&self) -> CameraFacing {
        self.session.lock().await.facing
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == ScannerState::Active
    }

    pub async fn last_decoded(&self) -> Option<VisitQrPayload> {
        self.session.lock().await.last_decoded.clone()
    }
}

/// The per-frame decode loop. Runs for as long as the session stays
/// `Active`; the first readable symbol tears the stream down before the
/// payload is interpreted, so duplicate triggers are impossible.
async fn frame_loop(
    session_lock: Arc<Mutex<ScannerSession>>,
    data: Arc<dyn DataService>,
    events: mpsc::UnboundedSender<ScannerEvent>,
    mut stream: FrameStream,
    token: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => {
                info!("Frame loop cancelled.");
                return;
            }
            frame = stream.next() => match frame {
                Some(frame) => frame,
                None => {
                    // The device went away mid-scan.
                    let mut session = session_lock.lock().await;
                    if session.state == ScannerState::Active {
                        session.state = ScannerState::Error;
                        let _ = events.send(ScannerEvent::ScannerError {
                            kind: ErrorKind::Provider,
                            message: "The camera stream ended unexpectedly.".to_string(),
                        });
                    }
                    return;
                }
            },
        };

        let text = match qr::detect_in_frame(&frame) {
            Some(text) => text,
            // No symbol in this frame; re-arm on the next one.
            None => continue,
        };

        drop(stream);
        {
            let mut session = session_lock.lock().await;
            session.state = ScannerState::Detected;
        }
        info!("Scanner read a symbol; stream released.");
        interpret_text(&session_lock, &data, &events, &text).await;
        return;
    }
}

/// Shared by the frame loop and manual entry: turn symbol text into a
/// payload for the details renderer, resolving reference stubs through the
/// data service.
async fn interpret_text(
    session_lock: &Arc<Mutex<ScannerSession>>,
    data: &Arc<dyn DataService>,
    events: &mpsc::UnboundedSender<ScannerEvent>,
    text: &str,
) {
    match qr::decode(text) {
        Some(DecodedQr::Visit(payload)) => {
            deliver(session_lock, data, events, payload).await;
        }
        Some(DecodedQr::Reference(stub)) => match data.resolve_visit(&stub.id).await {
            Ok(payload) => deliver(session_lock, data, events, payload).await,
            Err(e) => {
                warn!("Could not resolve scanned visit {}: {:?}", stub.id, e);
                let _ = events.send(ScannerEvent::ScannerError {
                    kind: ErrorKind::Provider,
                    message: "Could not load the scanned visit. Try again.".to_string(),
                });
            }
        },
        None => {
            let _ = events.send(ScannerEvent::Unrecognized);
        }
    }
}

async fn deliver(
    session_lock: &Arc<Mutex<ScannerSession>>,
    data: &Arc<dyn DataService>,
    events: &mpsc::UnboundedSender<ScannerEvent>,
    payload: VisitQrPayload,
) {
    {
        let mut session = session_lock.lock().await;
        session.last_decoded = Some(payload.clone());
    }
    if let Err(e) = data.log_action("visit_scanned", &payload.visit_id).await {
        warn!("Failed to record the scan action: {:?}", e);
    }
    let _ = events.send(ScannerEvent::Detected { payload });
}
