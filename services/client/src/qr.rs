//! services/client/src/qr.rs
//!
//! The QR codec: serializes visit and gate records into QR rasters and turns
//! scanned or pasted text back into structured payloads.
//!
//! The canonical text form is the payload's camelCase JSON. Decoding is
//! deliberately forgiving about *why* a string is not a GuestGo code:
//! malformed JSON and well-formed JSON of the wrong shape both come back as
//! `None` and are surfaced identically as "unrecognized code".

use guestgo_core::domain::{Gate, ReferenceStub, VideoFrame, VisitQrPayload};
use image::{GrayImage, ImageBuffer, Luma};
use qrcode::{EcLevel, QrCode};

/// Target raster size for visit codes. Dense payloads get medium error
/// correction so a phone screen at arm's length still reads.
const VISIT_QR_SIZE: u32 = 256;

/// Gate payloads are small, so a smaller raster at low error correction
/// is acceptable.
const GATE_QR_SIZE: u32 = 200;

/// The structured result of decoding scanned or pasted text.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedQr {
    /// A complete visit record, ready for the details renderer.
    Visit(VisitQrPayload),
    /// A bare reference that must be resolved through the data service.
    Reference(ReferenceStub),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("QR rasterization failed: {0:?}")]
    Qr(qrcode::types::QrError),
}

//=========================================================================================
// Encoding
//=========================================================================================

/// The canonical text form of a visit payload, as printed into its QR code.
pub fn visit_text(payload: &VisitQrPayload) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(payload)?)
}

/// The canonical text form of a gate record, as printed into its QR code.
pub fn gate_text(gate: &Gate) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(gate)?)
}

/// Renders a visit payload as a QR raster (medium error correction,
/// 256x256 target).
pub fn encode_visit(payload: &VisitQrPayload) -> Result<GrayImage, EncodeError> {
    let text = visit_text(payload)?;
    render(&text, EcLevel::M, VISIT_QR_SIZE)
}

/// Renders a gate record as a QR raster (low error correction, 200x200
/// target).
pub fn encode_gate(gate: &Gate) -> Result<GrayImage, EncodeError> {
    let text = gate_text(gate)?;
    render(&text, EcLevel::L, GATE_QR_SIZE)
}

fn render(text: &str, level: EcLevel, size: u32) -> Result<GrayImage, EncodeError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), level)
        .map_err(EncodeError::Qr)?;
    Ok(code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build())
}

//=========================================================================================
// Decoding
//=========================================================================================

/// Attempts a structural parse of scanned or pasted text.
///
/// Returns a full payload when `visitId`, `visitorName` and `visitDate` are
/// all present; a reference stub when the text is `{"type":"visit","id":…}`;
/// and `None` for everything else. Unparseable text and wrong-shape JSON are
/// not distinguished.
pub fn decode(raw_text: &str) -> Option<DecodedQr> {
    let value: serde_json::Value = serde_json::from_str(raw_text).ok()?;

    // A full payload wins over the reference interpretation.
    if let Ok(payload) = serde_json::from_value::<VisitQrPayload>(value.clone()) {
        return Some(DecodedQr::Visit(payload));
    }

    if value.get("type").and_then(|t| t.as_str()) == Some("visit") {
        if let Some(id) = reference_id(&value) {
            return Some(DecodedQr::Reference(ReferenceStub { id }));
        }
    }

    None
}

fn reference_id(value: &serde_json::Value) -> Option<String> {
    match value.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//=========================================================================================
// Frame Detection
//=========================================================================================

/// Locates and reads a QR symbol in one grayscale camera frame.
/// Returns the symbol's text, or `None` when no readable symbol is present.
pub fn detect_in_frame(frame: &VideoFrame) -> Option<String> {
    let img: GrayImage =
        ImageBuffer::from_raw(frame.width, frame.height, frame.luma.clone())?;
    let mut prepared = rqrr::PreparedImage::prepare(img);
    for grid in prepared.detect_grids() {
        if let Ok((_meta, content)) = grid.decode() {
            return Some(content);
        }
    }
    None
}

/// Converts a grayscale raster into the frame shape the camera port yields.
pub fn frame_from_luma(img: &GrayImage) -> VideoFrame {
    VideoFrame {
        width: img.width(),
        height: img.height(),
        luma: img.as_raw().clone(),
    }
}
