//! services/scanner/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::adapters::{BrowserCameraAdapter, BrowserNavigator, Outbound};
use crate::config::Config;
use std::sync::Arc;
use turant_scan_core::{PatientDirectory, ScanController};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub patients: Arc<dyn PatientDirectory>,
}

//=========================================================================================
// ScannerConnection (Specific to One WebSocket Connection)
//=========================================================================================

/// Everything one open scanner page needs: its camera bridge and the
/// controller driving it.
pub struct ScannerConnection {
    pub camera: Arc<BrowserCameraAdapter>,
    pub controller: ScanController,
}

impl ScannerConnection {
    /// Wires a fresh controller to the page behind `outbound`.
    pub fn new(app_state: &AppState, outbound: Outbound) -> Self {
        let camera = Arc::new(BrowserCameraAdapter::new(
            outbound.clone(),
            app_state.config.camera_reply_timeout,
        ));
        let navigator = Arc::new(BrowserNavigator::new(outbound));
        let controller = ScanController::new(
            camera.clone(),
            navigator,
            app_state.config.scan_settings(),
        );
        Self { camera, controller }
    }

    /// Tears the connection down without waiting for the camera.
    pub async fn close(&self) {
        self.controller.cancel();
        self.camera.close().await;
    }
}
