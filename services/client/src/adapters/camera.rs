//! services/client/src/adapters/camera.rs
//!
//! This module contains the capture-device adapter, implementing the
//! `CameraService` port from a directory of still frames. It stands in for
//! the browser capture device the production pages delegate to, with one
//! subdirectory per facing mode.

use crate::qr;
use async_trait::async_trait;
use guestgo_core::domain::CameraFacing;
use guestgo_core::ports::{CameraService, FrameStream, PortError, PortResult};
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A capture source that cycles through the image files found under
/// `<frames_dir>/<facing>/`, yielding one grayscale frame per interval.
/// A missing or unreadable facing directory plays the role of a denied
/// permission prompt.
pub struct FrameSourceCamera {
    frames_dir: PathBuf,
    interval: Duration,
}

impl FrameSourceCamera {
    pub fn new(frames_dir: PathBuf, interval: Duration) -> Self {
        Self {
            frames_dir,
            interval,
        }
    }
}

//=========================================================================================
// `CameraService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CameraService for FrameSourceCamera {
    async fn request_stream(&self, facing: CameraFacing) -> PortResult<FrameStream> {
        let dir = self.frames_dir.join(facing.as_str());
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            PortError::PermissionDenied(format!(
                "no capture source for the {} camera: {}",
                facing.as_str(),
                e
            ))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(PortError::Provider(format!(
                "capture source {} holds no frames",
                dir.display()
            )));
        }

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let img = image::open(path)
                .map_err(|e| {
                    PortError::Provider(format!("unreadable frame {}: {}", path.display(), e))
                })?
                .to_luma8();
            frames.push(qr::frame_from_luma(&img));
        }
        debug!("Capture source opened with {} frames.", frames.len());

        let interval = self.interval;
        Ok(Box::pin(async_stream::stream! {
            loop {
                for frame in &frames {
                    tokio::time::sleep(interval).await;
                    yield frame.clone();
                }
            }
        }))
    }
}
