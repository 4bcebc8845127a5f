//! crates/turant_scan_core/src/controller.rs
//!
//! The scan lifecycle controller. It owns the current `ScanSession` and the
//! camera that session acquired, turns decoder callbacks into state
//! transitions, and hands the resolved patient off to the navigator.
//!
//! Decoder callbacks are synchronous and may arrive from any task, so the
//! session lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. All slow work (acquisition, release, navigation) runs on
//! detached tasks.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::camera::select_camera;
use crate::domain::{CameraHandle, ScanError, ScanSession, ScanSettings, ScanSnapshot, ScanState};
use crate::patient_id::{extract_patient_id, profile_path};
use crate::ports::{DecodeCallbacks, DecoderAdapter, Navigator, PortError};

//=========================================================================================
// Controller
//=========================================================================================

/// Drives one scanner view. Cloning is cheap and every clone controls the
/// same session.
#[derive(Clone)]
pub struct ScanController {
    shared: Arc<Shared>,
}

struct Shared {
    decoder: Arc<dyn DecoderAdapter>,
    navigator: Arc<dyn Navigator>,
    settings: ScanSettings,
    slot: Mutex<SessionSlot>,
    snapshots: watch::Sender<ScanSnapshot>,
}

/// At most one session, and the camera it holds.
#[derive(Default)]
struct SessionSlot {
    session: Option<ScanSession>,
    camera: Option<CameraHandle>,
    /// Cancelled when the session stops scanning, for any reason.
    cancel: CancellationToken,
}

impl SessionSlot {
    fn is_scanning(&self, session_id: Uuid) -> bool {
        matches!(&self.session, Some(s) if s.id == session_id && s.state == ScanState::Scanning)
    }
}

impl ScanController {
    pub fn new(
        decoder: Arc<dyn DecoderAdapter>,
        navigator: Arc<dyn Navigator>,
        settings: ScanSettings,
    ) -> Self {
        let (snapshots, _) = watch::channel(ScanSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                decoder,
                navigator,
                settings,
                slot: Mutex::new(SessionSlot::default()),
                snapshots,
            }),
        }
    }

    /// Receives a snapshot on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub fn state(&self) -> ScanState {
        self.shared.snapshots.borrow().state
    }

    pub fn current_session(&self) -> Option<ScanSession> {
        self.shared.lock().session.clone()
    }

    /// Begins a new scan session and returns its id.
    ///
    /// Returns the running session's id without side effects if one is
    /// already scanning. Camera acquisition happens in the background.
    pub fn start_scan(&self) -> Uuid {
        let (session_id, token) = {
            let mut guard = self.shared.lock();
            let slot = &mut *guard;
            if let Some(session) = slot
                .session
                .as_ref()
                .filter(|s| s.state == ScanState::Scanning)
            {
                debug!("Scan {} already in progress; start ignored.", session.id);
                return session.id;
            }

            let session = ScanSession::new();
            let session_id = session.id;
            slot.cancel = CancellationToken::new();
            slot.camera = None;
            self.shared.publish(ScanSnapshot::of(&session));
            slot.session = Some(session);
            (session_id, slot.cancel.clone())
        };

        info!("Scan session {} started.", session_id);
        let acquisition = Shared::acquire(self.shared.clone(), session_id, token);
        if !spawn_detached(acquisition) {
            self.shared.fail(
                session_id,
                ScanError::Acquisition("no async runtime available".to_string()),
            );
        }
        session_id
    }

    /// Accepts the first decoded payload of `session_id`. Later calls, and
    /// calls for any session that is no longer scanning, are ignored.
    pub fn on_decode_success(&self, session_id: Uuid, payload: String) {
        self.shared.on_decode_success(session_id, payload)
    }

    /// A frame without a readable code. Expected many times per second.
    pub fn on_decode_error(&self, session_id: Uuid, reason: String) {
        self.shared.on_decode_error(session_id, reason)
    }

    /// Abandons a running scan, or dismisses a failed one. Safe in every
    /// state and never blocks on the camera release.
    pub fn cancel(&self) {
        self.shared.cancel()
    }
}

//=========================================================================================
// Transitions
//=========================================================================================

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: ScanSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    /// Lists cameras, starts the preferred one and, if configured, waits out
    /// the scan timeout.
    async fn acquire(self: Arc<Self>, session_id: Uuid, token: CancellationToken) {
        let listed = tokio::select! {
            _ = token.cancelled() => {
                debug!("Scan {} ended before cameras were listed.", session_id);
                return;
            }
            listed = self.decoder.list_cameras() => listed,
        };

        let cameras = match listed {
            Ok(cameras) => cameras,
            Err(e) => {
                self.fail(session_id, scan_error_from(e));
                return;
            }
        };

        let Some(camera) = select_camera(&cameras).cloned() else {
            self.fail(session_id, ScanError::NoDevice);
            return;
        };
        info!(
            "Starting camera '{}' ({}) for scan {}.",
            camera.label, camera.id, session_id
        );

        let callbacks = Self::callbacks_for(&self, session_id);
        let handle = match self
            .decoder
            .start(&camera, self.settings.options, callbacks)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(session_id, scan_error_from(e));
                return;
            }
        };

        if !self.adopt_camera(session_id, handle) {
            return;
        }

        if let Some(timeout) = self.settings.scan_timeout {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    info!("Scan {} timed out after {:?}.", session_id, timeout);
                    self.fail(session_id, ScanError::TimedOut);
                }
            }
        }
    }

    /// Callbacks that only reach this controller while it is alive.
    fn callbacks_for(shared: &Arc<Self>, session_id: Uuid) -> DecodeCallbacks {
        let on_success = Arc::downgrade(shared);
        let on_frame_error = Arc::downgrade(shared);
        DecodeCallbacks::new(
            move |text| {
                if let Some(shared) = on_success.upgrade() {
                    shared.on_decode_success(session_id, text);
                }
            },
            move |reason| {
                if let Some(shared) = on_frame_error.upgrade() {
                    shared.on_decode_error(session_id, reason);
                }
            },
        )
    }

    /// Stores the started camera on its session. A camera that comes up after
    /// its session stopped scanning is released straight away.
    fn adopt_camera(&self, session_id: Uuid, handle: CameraHandle) -> bool {
        {
            let mut slot = self.lock();
            if slot.is_scanning(session_id) {
                slot.camera = Some(handle);
                return true;
            }
        }
        debug!(
            "Camera {} started after scan {} ended; releasing it.",
            handle.id, session_id
        );
        self.release(handle);
        false
    }

    fn on_decode_success(&self, session_id: Uuid, payload: String) {
        let (camera, patient_id) = {
            let mut guard = self.lock();
            let slot = &mut *guard;
            let Some(session) = slot
                .session
                .as_mut()
                .filter(|s| s.id == session_id && s.state == ScanState::Scanning)
            else {
                debug!("Ignoring decode result for inactive scan {}.", session_id);
                return;
            };

            let patient_id = extract_patient_id(&payload, &self.settings.fallback_patient_id);
            session.state = ScanState::Success;
            session.decoded_payload = Some(payload);
            session.resolved_patient_id = Some(patient_id.clone());
            let snapshot = ScanSnapshot::of(session);

            slot.cancel.cancel();
            let camera = slot.camera.take();
            self.publish(snapshot);
            (camera, patient_id)
        };

        info!("Scan {} resolved patient {}.", session_id, patient_id);
        if let Some(camera) = camera {
            self.release(camera);
        }
        self.schedule_navigation(profile_path(&patient_id));
    }

    fn on_decode_error(&self, session_id: Uuid, reason: String) {
        trace!("Scan {}: no code in frame ({}).", session_id, reason);
    }

    fn cancel(&self) {
        let (session_id, camera) = {
            let mut guard = self.lock();
            let slot = &mut *guard;
            let Some((session_id, state)) = slot.session.as_ref().map(|s| (s.id, s.state)) else {
                return;
            };
            match state {
                ScanState::Scanning => {}
                ScanState::Failed => {
                    debug!("Failed scan {} dismissed.", session_id);
                    slot.session = None;
                    self.publish(ScanSnapshot::idle());
                    return;
                }
                ScanState::Idle | ScanState::Success => return,
            }
            slot.session = None;
            slot.cancel.cancel();
            self.publish(ScanSnapshot::idle());
            (session_id, slot.camera.take())
        };

        info!("Scan {} cancelled.", session_id);
        if let Some(camera) = camera {
            self.release(camera);
        }
    }

    /// Ends a scanning session with a user-visible error. The session stays
    /// `Failed` until the next `start_scan` or `cancel`.
    fn fail(&self, session_id: Uuid, error: ScanError) {
        let camera = {
            let mut guard = self.lock();
            let slot = &mut *guard;
            let Some(session) = slot
                .session
                .as_mut()
                .filter(|s| s.id == session_id && s.state == ScanState::Scanning)
            else {
                return;
            };

            session.state = ScanState::Failed;
            let snapshot = ScanSnapshot {
                error: Some(error.clone()),
                ..ScanSnapshot::of(session)
            };
            slot.cancel.cancel();
            self.publish(snapshot);
            slot.camera.take()
        };

        warn!("Scan {} failed: {}", session_id, error);
        if let Some(camera) = camera {
            self.release(camera);
        }
    }

    /// Best-effort camera release. Never awaited by the caller.
    fn release(&self, handle: CameraHandle) {
        let decoder = self.decoder.clone();
        spawn_detached(async move {
            let handle_id = handle.id;
            match decoder.stop(handle).await {
                Ok(()) => debug!("Camera {} released.", handle_id),
                Err(e) => warn!("Failed to release camera {}: {}", handle_id, e),
            }
        });
    }

    fn schedule_navigation(&self, path: String) {
        let navigator = self.navigator.clone();
        let delay = self.settings.navigation_delay;
        spawn_detached(async move {
            tokio::time::sleep(delay).await;
            info!("Navigating to {}.", path);
            if let Err(e) = navigator.navigate_to(&path).await {
                error!("Navigation to {} failed: {}", path, e);
            }
        });
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn scan_error_from(error: PortError) -> ScanError {
    match error {
        PortError::NoDevice => ScanError::NoDevice,
        PortError::Acquisition(message) => ScanError::Acquisition(message),
        other => ScanError::Acquisition(other.to_string()),
    }
}

/// Spawns onto the current runtime. Returns `false` when there is none.
fn spawn_detached<F>(task: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
            true
        }
        Err(_) => {
            error!("No async runtime available; background task dropped.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_user_visible_errors() {
        assert_eq!(scan_error_from(PortError::NoDevice), ScanError::NoDevice);
        assert_eq!(
            scan_error_from(PortError::Acquisition("Permission denied".into())),
            ScanError::Acquisition("Permission denied".into())
        );
        assert!(matches!(
            scan_error_from(PortError::Unexpected("socket closed".into())),
            ScanError::Acquisition(message) if message.contains("socket closed")
        ));
    }

    #[test]
    fn slot_reports_scanning_only_for_its_own_session() {
        let session = ScanSession::new();
        let id = session.id;
        let slot = SessionSlot {
            session: Some(session),
            ..SessionSlot::default()
        };
        assert!(slot.is_scanning(id));
        assert!(!slot.is_scanning(Uuid::new_v4()));
    }
}
