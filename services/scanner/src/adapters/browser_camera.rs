//! services/scanner/src/adapters/browser_camera.rs
//!
//! This module contains the adapter for the camera and QR decoder running in
//! the scanner page. It implements the `DecoderAdapter` port from the `core`
//! crate by sending camera requests over the WebSocket and matching the
//! page's replies to them by `request_id`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};
use turant_scan_core::{
    CameraDescriptor, CameraHandle, DecodeCallbacks, DecoderAdapter, PortError, PortResult,
    ScanOptions,
};
use uuid::Uuid;

use crate::web::protocol::{CameraFailureKind, ServerMessage};

/// Messages queued for the scanner page.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// A page reply to one camera request.
#[derive(Debug)]
pub enum CameraReply {
    Cameras(Vec<CameraDescriptor>),
    Started,
    Failed {
        kind: CameraFailureKind,
        message: String,
    },
    Stopped,
    StopFailed(String),
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DecoderAdapter` on top of the page's camera.
pub struct BrowserCameraAdapter {
    outbound: Outbound,
    reply_timeout: Duration,
    closed: AtomicBool,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<CameraReply>>>,
    decoders: Mutex<HashMap<Uuid, DecodeCallbacks>>,
}

impl BrowserCameraAdapter {
    /// Creates a new `BrowserCameraAdapter`.
    pub fn new(outbound: Outbound, reply_timeout: Duration) -> Self {
        Self {
            outbound,
            reply_timeout,
            closed: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            decoders: Mutex::new(HashMap::new()),
        }
    }

    /// Hands a page reply to the request waiting for it.
    pub async fn resolve(&self, request_id: Uuid, reply: CameraReply) {
        match self.pending.lock().await.remove(&request_id) {
            Some(waiter) => {
                let _ = waiter.send(reply);
            }
            None => warn!("Reply for unknown or expired camera request {}.", request_id),
        }
    }

    /// Routes a decoded frame to the callbacks registered for `handle_id`.
    pub async fn dispatch_decoded(&self, handle_id: Uuid, text: String) {
        match self.callbacks(handle_id).await {
            Some(callbacks) => callbacks.success(text),
            None => debug!("Decoded frame for unknown camera {} dropped.", handle_id),
        }
    }

    /// Routes a frame without a code to the callbacks registered for `handle_id`.
    pub async fn dispatch_frame_miss(&self, handle_id: Uuid, reason: String) {
        if let Some(callbacks) = self.callbacks(handle_id).await {
            callbacks.frame_error(reason);
        }
    }

    /// Fails every outstanding and future request and forgets all cameras.
    /// Used when the page disconnects.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.lock().await.clear();
        self.decoders.lock().await.clear();
    }

    async fn callbacks(&self, handle_id: Uuid) -> Option<DecodeCallbacks> {
        self.decoders.lock().await.get(&handle_id).cloned()
    }

    /// Sends `message` and waits for the page to answer `request_id`.
    async fn request(&self, request_id: Uuid, message: ServerMessage) -> Result<CameraReply, String> {
        if self.closed.load(Ordering::SeqCst) {
            return Err("scanner page disconnected".to_string());
        }

        let (waiter, reply) = oneshot::channel();
        self.pending.lock().await.insert(request_id, waiter);

        if self.outbound.send(message).is_err() {
            self.pending.lock().await.remove(&request_id);
            return Err("scanner page disconnected".to_string());
        }

        match tokio::time::timeout(self.reply_timeout, reply).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err("scanner page disconnected before replying".to_string()),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                Err(format!(
                    "scanner page did not reply within {:?}",
                    self.reply_timeout
                ))
            }
        }
    }
}

//=========================================================================================
// `DecoderAdapter` Trait Implementation
//=========================================================================================

#[async_trait]
impl DecoderAdapter for BrowserCameraAdapter {
    async fn list_cameras(&self) -> PortResult<Vec<CameraDescriptor>> {
        let request_id = Uuid::new_v4();
        let reply = self
            .request(request_id, ServerMessage::ListCameras { request_id })
            .await
            .map_err(PortError::Acquisition)?;

        match reply {
            CameraReply::Cameras(cameras) => Ok(cameras),
            CameraReply::Failed { kind, message } => Err(acquisition_error(kind, message)),
            other => Err(PortError::Unexpected(format!(
                "unexpected reply to list_cameras: {:?}",
                other
            ))),
        }
    }

    async fn start(
        &self,
        camera: &CameraDescriptor,
        options: ScanOptions,
        callbacks: DecodeCallbacks,
    ) -> PortResult<CameraHandle> {
        let request_id = Uuid::new_v4();
        let handle_id = Uuid::new_v4();

        // Registered first: the page may report frames before its start reply
        // has been picked up.
        self.decoders.lock().await.insert(handle_id, callbacks);

        let message = ServerMessage::StartCamera {
            request_id,
            handle_id,
            camera_id: camera.id.clone(),
            target_frame_rate: options.target_frame_rate,
            detection_box_size: options.detection_box_size,
        };
        let result = match self.request(request_id, message).await {
            Ok(CameraReply::Started) => Ok(CameraHandle {
                id: handle_id,
                camera_id: camera.id.clone(),
            }),
            Ok(CameraReply::Failed { kind, message }) => Err(acquisition_error(kind, message)),
            Ok(other) => Err(PortError::Unexpected(format!(
                "unexpected reply to start_camera: {:?}",
                other
            ))),
            Err(reason) => Err(PortError::Acquisition(reason)),
        };

        if result.is_err() {
            self.decoders.lock().await.remove(&handle_id);
        }
        result
    }

    async fn stop(&self, handle: CameraHandle) -> PortResult<()> {
        let request_id = Uuid::new_v4();
        let message = ServerMessage::StopCamera {
            request_id,
            handle_id: handle.id,
        };
        let reply = self.request(request_id, message).await;
        self.decoders.lock().await.remove(&handle.id);

        match reply {
            Ok(CameraReply::Stopped) => Ok(()),
            Ok(CameraReply::StopFailed(message)) => Err(PortError::Release(message)),
            Ok(other) => Err(PortError::Release(format!(
                "unexpected reply to stop_camera: {:?}",
                other
            ))),
            Err(reason) => Err(PortError::Release(reason)),
        }
    }
}

fn acquisition_error(kind: CameraFailureKind, message: String) -> PortError {
    match kind {
        CameraFailureKind::NoDevice => PortError::NoDevice,
        _ if message.is_empty() => PortError::Acquisition(format!("{:?}", kind)),
        _ => PortError::Acquisition(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn adapter(timeout: Duration) -> (Arc<BrowserCameraAdapter>, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(BrowserCameraAdapter::new(tx, timeout)), rx)
    }

    fn recording_callbacks() -> (DecodeCallbacks, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let on_success = seen.clone();
        let callbacks = DecodeCallbacks::new(
            move |text| on_success.lock().unwrap().push(text),
            |_reason| {},
        );
        (callbacks, seen)
    }

    fn camera() -> CameraDescriptor {
        CameraDescriptor {
            id: "cam-1".to_string(),
            label: "Back Camera".to_string(),
        }
    }

    #[tokio::test]
    async fn list_cameras_round_trips_through_the_page() {
        let (adapter, mut page) = adapter(Duration::from_secs(5));

        let listing = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.list_cameras().await }
        });

        let request_id = match page.recv().await {
            Some(ServerMessage::ListCameras { request_id }) => request_id,
            other => panic!("expected list_cameras, got {:?}", other),
        };
        adapter
            .resolve(request_id, CameraReply::Cameras(vec![camera()]))
            .await;

        let cameras = listing.await.unwrap().unwrap();
        assert_eq!(cameras, vec![camera()]);
    }

    #[tokio::test]
    async fn no_device_reply_maps_to_no_device_error() {
        let (adapter, mut page) = adapter(Duration::from_secs(5));

        let listing = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.list_cameras().await }
        });
        let Some(ServerMessage::ListCameras { request_id }) = page.recv().await else {
            panic!("expected list_cameras");
        };
        adapter
            .resolve(
                request_id,
                CameraReply::Failed {
                    kind: CameraFailureKind::NoDevice,
                    message: String::new(),
                },
            )
            .await;

        assert!(matches!(listing.await.unwrap(), Err(PortError::NoDevice)));
    }

    #[tokio::test]
    async fn decoded_frames_reach_callbacks_until_stopped() {
        let (adapter, mut page) = adapter(Duration::from_secs(5));
        let (callbacks, seen) = recording_callbacks();

        let starting = tokio::spawn({
            let adapter = adapter.clone();
            async move {
                adapter
                    .start(&camera(), ScanOptions::default(), callbacks)
                    .await
            }
        });
        let (request_id, handle_id) = match page.recv().await {
            Some(ServerMessage::StartCamera {
                request_id,
                handle_id,
                camera_id,
                target_frame_rate,
                ..
            }) => {
                assert_eq!(camera_id, "cam-1");
                assert_eq!(target_frame_rate, 10);
                (request_id, handle_id)
            }
            other => panic!("expected start_camera, got {:?}", other),
        };

        // Frames that beat the start reply are still delivered.
        adapter
            .dispatch_decoded(handle_id, "TC-2024-001847".to_string())
            .await;
        adapter.resolve(request_id, CameraReply::Started).await;
        let handle = starting.await.unwrap().unwrap();
        assert_eq!(handle.id, handle_id);

        let stopping = tokio::spawn({
            let adapter = adapter.clone();
            let handle = handle.clone();
            async move { adapter.stop(handle).await }
        });
        let Some(ServerMessage::StopCamera { request_id, handle_id: stopped }) = page.recv().await
        else {
            panic!("expected stop_camera");
        };
        assert_eq!(stopped, handle_id);
        adapter.resolve(request_id, CameraReply::Stopped).await;
        stopping.await.unwrap().unwrap();

        adapter
            .dispatch_decoded(handle_id, "TC-2024-009999".to_string())
            .await;
        assert_eq!(*seen.lock().unwrap(), vec!["TC-2024-001847".to_string()]);
    }

    #[tokio::test]
    async fn failed_start_detaches_callbacks() {
        let (adapter, mut page) = adapter(Duration::from_secs(5));
        let (callbacks, seen) = recording_callbacks();

        let starting = tokio::spawn({
            let adapter = adapter.clone();
            async move {
                adapter
                    .start(&camera(), ScanOptions::default(), callbacks)
                    .await
            }
        });
        let Some(ServerMessage::StartCamera {
            request_id,
            handle_id,
            ..
        }) = page.recv().await
        else {
            panic!("expected start_camera");
        };
        adapter
            .resolve(
                request_id,
                CameraReply::Failed {
                    kind: CameraFailureKind::PermissionDenied,
                    message: "NotAllowedError: Permission denied".to_string(),
                },
            )
            .await;

        match starting.await.unwrap() {
            Err(PortError::Acquisition(message)) => assert!(message.contains("Permission denied")),
            other => panic!("unexpected result: {:?}", other),
        }
        adapter
            .dispatch_decoded(handle_id, "TC-2024-001847".to_string())
            .await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_stop_is_a_release_error() {
        let (adapter, mut page) = adapter(Duration::from_millis(200));
        let handle = CameraHandle {
            id: Uuid::new_v4(),
            camera_id: "cam-1".to_string(),
        };

        let result = adapter.stop(handle).await;
        assert!(matches!(result, Err(PortError::Release(_))));
        assert!(matches!(page.recv().await, Some(ServerMessage::StopCamera { .. })));
    }

    #[tokio::test]
    async fn closed_page_fails_requests_immediately() {
        let (adapter, page) = adapter(Duration::from_secs(60));
        drop(page);

        assert!(matches!(
            adapter.list_cameras().await,
            Err(PortError::Acquisition(_))
        ));
    }

    #[tokio::test]
    async fn close_fails_outstanding_requests() {
        let (adapter, mut page) = adapter(Duration::from_secs(60));

        let listing = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.list_cameras().await }
        });
        assert!(page.recv().await.is_some());
        adapter.close().await;

        assert!(matches!(
            listing.await.unwrap(),
            Err(PortError::Acquisition(_))
        ));

        let handle = CameraHandle {
            id: Uuid::new_v4(),
            camera_id: "cam-1".to_string(),
        };
        assert!(matches!(adapter.stop(handle).await, Err(PortError::Release(_))));
        assert!(page.try_recv().is_err());
    }
}
