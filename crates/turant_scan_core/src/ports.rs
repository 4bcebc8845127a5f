//! crates/turant_scan_core/src/ports.rs
//!
//! Defines the service contracts (traits) the scan controller depends on.
//! The camera decoder, the navigation capability and the patient data source
//! are all external; these traits are the boundary.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::{CameraDescriptor, CameraHandle, PatientProfile, PatientSummary, ScanOptions};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("No camera device available")]
    NoDevice,
    #[error("Camera acquisition failed: {0}")]
    Acquisition(String),
    #[error("Camera release failed: {0}")]
    Release(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Decode Callbacks
//=========================================================================================

type TextCallback = Arc<dyn Fn(String) + Send + Sync>;

/// The two callbacks a decoder invokes while a camera is running.
///
/// `on_success` receives the decoded text of a frame. It may fire again for
/// later frames until the camera is stopped. `on_frame_error` fires for every
/// frame without a readable code.
#[derive(Clone)]
pub struct DecodeCallbacks {
    on_success: TextCallback,
    on_frame_error: TextCallback,
}

impl DecodeCallbacks {
    pub fn new(
        on_success: impl Fn(String) + Send + Sync + 'static,
        on_frame_error: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_success: Arc::new(on_success),
            on_frame_error: Arc::new(on_frame_error),
        }
    }

    pub fn success(&self, text: String) {
        (self.on_success)(text)
    }

    pub fn frame_error(&self, reason: String) {
        (self.on_frame_error)(reason)
    }
}

impl fmt::Debug for DecodeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeCallbacks").finish_non_exhaustive()
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DecoderAdapter: Send + Sync {
    /// Enumerates capture devices. May fail with `PortError::NoDevice` or
    /// return an empty list when there is no camera.
    async fn list_cameras(&self) -> PortResult<Vec<CameraDescriptor>>;

    /// Starts continuous capture and decoding on `camera`.
    async fn start(
        &self,
        camera: &CameraDescriptor,
        options: ScanOptions,
        callbacks: DecodeCallbacks,
    ) -> PortResult<CameraHandle>;

    /// Releases the camera. Callbacks may still arrive while this is pending.
    async fn stop(&self, handle: CameraHandle) -> PortResult<()>;
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate_to(&self, path: &str) -> PortResult<()>;
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn get_patient(&self, patient_id: &str) -> PortResult<PatientSummary>;

    async fn list_patients(&self) -> PortResult<Vec<PatientSummary>>;

    /// The full record behind a patient's profile page.
    async fn get_profile(&self, patient_id: &str) -> PortResult<PatientProfile>;
}
