//! services/scanner/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the scanner page and the
//! server. The page owns the physical camera and the QR decoder; the server
//! owns the scan lifecycle and tells the page what to do with the camera.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use turant_scan_core::{CameraDescriptor, ScanSnapshot};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages the scanner page can send.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The user pressed "Scan Smart Health Card".
    StartScan,

    /// The user left the scanner or pressed cancel.
    CancelScan,

    /// Answer to `ListCameras`.
    Cameras {
        request_id: Uuid,
        cameras: Vec<CameraInfo>,
    },

    /// Answer to `StartCamera`: the camera is streaming frames into the decoder.
    CameraStarted { request_id: Uuid },

    /// Answer to `ListCameras` or `StartCamera` when the camera is unusable.
    CameraFailed {
        request_id: Uuid,
        kind: CameraFailureKind,
        #[serde(default)]
        message: String,
    },

    /// Answer to `StopCamera`.
    CameraStopped { request_id: Uuid },

    /// Answer to `StopCamera` when the camera could not be stopped cleanly.
    StopFailed {
        request_id: Uuid,
        #[serde(default)]
        message: String,
    },

    /// A frame contained a QR code.
    Decoded { handle_id: Uuid, text: String },

    /// A frame contained no readable QR code.
    FrameMiss {
        handle_id: Uuid,
        #[serde(default)]
        reason: String,
    },
}

/// A capture device as reported by the page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl From<CameraInfo> for CameraDescriptor {
    fn from(info: CameraInfo) -> Self {
        CameraDescriptor {
            id: info.id,
            label: info.label,
        }
    }
}

/// Why the page could not provide a camera.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CameraFailureKind {
    NoDevice,
    PermissionDenied,
    Busy,
    Other,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the page.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The scanner view should render this state.
    ScanState {
        state: String,
        session_id: Option<Uuid>,
        started_at: Option<DateTime<Utc>>,
        patient_id: Option<String>,
        error: Option<String>,
    },

    /// Enumerate the available cameras and answer with `Cameras`.
    ListCameras { request_id: Uuid },

    /// Start decoding from `camera_id`. Decode events must carry `handle_id`.
    StartCamera {
        request_id: Uuid,
        handle_id: Uuid,
        camera_id: String,
        target_frame_rate: u32,
        detection_box_size: u32,
    },

    /// Stop the camera started under `handle_id`.
    StopCamera { request_id: Uuid, handle_id: Uuid },

    /// Open the given route.
    Navigate { path: String },

    /// Reports a protocol error to the client.
    Error { message: String },
}

impl From<&ScanSnapshot> for ServerMessage {
    fn from(snapshot: &ScanSnapshot) -> Self {
        ServerMessage::ScanState {
            state: snapshot.state.as_str().to_string(),
            session_id: snapshot.session_id,
            started_at: snapshot.started_at,
            patient_id: snapshot.patient_id.clone(),
            error: snapshot.error.as_ref().map(|e| e.to_string()),
        }
    }
}
