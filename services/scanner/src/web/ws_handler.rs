//! services/scanner/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a scanner WebSocket
//! connection. Each connection gets its own scan controller; the page's
//! messages are routed either to the controller (user actions) or to the
//! camera bridge (camera replies and decode events).

use crate::{
    adapters::{CameraReply, Outbound},
    web::{
        protocol::{ClientMessage, ServerMessage},
        state::{AppState, ScannerConnection},
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use turant_scan_core::ScanSnapshot;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New scanner connection established.");

    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // --- 1. Writer: the only task touching the socket sink ---
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                warn!("Failed to send message; scanner page is gone.");
                break;
            }
        }
    });

    // --- 2. Controller and state forwarding ---
    let connection = ScannerConnection::new(&app_state, outbound.clone());
    let shutdown = CancellationToken::new();
    let forwarder = tokio::spawn(forward_snapshots(
        connection.controller.subscribe(),
        outbound.clone(),
        shutdown.clone(),
    ));

    // --- 3. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(text.as_str(), &connection, &outbound).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Scanner connection error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    connection.close().await;
    shutdown.cancel();
    let _ = forwarder.await;
    writer.abort();
    info!("Scanner connection closed.");
}

/// Pushes the current scan state to the page, then every change after it.
async fn forward_snapshots(
    mut snapshots: watch::Receiver<ScanSnapshot>,
    outbound: Outbound,
    shutdown: CancellationToken,
) {
    loop {
        let message = ServerMessage::from(&*snapshots.borrow_and_update());
        if outbound.send(message).is_err() {
            return;
        }
        tokio::select! {
            _ = shutdown.cancelled() => return,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// Helper function to parse a text frame and route it.
async fn handle_text_message(text: &str, connection: &ScannerConnection, outbound: &Outbound) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => dispatch_client_message(connection, message).await,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let _ = outbound.send(ServerMessage::Error {
                message: format!("Unrecognised message: {}", e),
            });
        }
    }
}

/// Routes one client message to the controller or the camera bridge.
pub(crate) async fn dispatch_client_message(connection: &ScannerConnection, message: ClientMessage) {
    match message {
        ClientMessage::StartScan => {
            info!("StartScan message received.");
            connection.controller.start_scan();
        }
        ClientMessage::CancelScan => {
            info!("CancelScan message received.");
            connection.controller.cancel();
        }
        ClientMessage::Cameras {
            request_id,
            cameras,
        } => {
            let cameras = cameras.into_iter().map(Into::into).collect();
            connection
                .camera
                .resolve(request_id, CameraReply::Cameras(cameras))
                .await;
        }
        ClientMessage::CameraStarted { request_id } => {
            connection
                .camera
                .resolve(request_id, CameraReply::Started)
                .await;
        }
        ClientMessage::CameraFailed {
            request_id,
            kind,
            message,
        } => {
            connection
                .camera
                .resolve(request_id, CameraReply::Failed { kind, message })
                .await;
        }
        ClientMessage::CameraStopped { request_id } => {
            connection
                .camera
                .resolve(request_id, CameraReply::Stopped)
                .await;
        }
        ClientMessage::StopFailed {
            request_id,
            message,
        } => {
            connection
                .camera
                .resolve(request_id, CameraReply::StopFailed(message))
                .await;
        }
        ClientMessage::Decoded { handle_id, text } => {
            connection.camera.dispatch_decoded(handle_id, text).await;
        }
        ClientMessage::FrameMiss { handle_id, reason } => {
            connection.camera.dispatch_frame_miss(handle_id, reason).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticPatientDirectory;
    use crate::config::Config;
    use crate::web::protocol::{CameraFailureKind, CameraInfo};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use turant_scan_core::ScanState;

    fn app_state() -> AppState {
        let config = Config::from_lookup(|name| match name {
            "NAVIGATION_DELAY_MS" => Some("20".to_string()),
            "CAMERA_REPLY_TIMEOUT_MS" => Some("2000".to_string()),
            _ => None,
        })
        .unwrap();
        AppState {
            config: Arc::new(config),
            patients: Arc::new(StaticPatientDirectory::demo()),
        }
    }

    async fn next_message(page: &mut UnboundedReceiver<ServerMessage>) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(2), page.recv())
            .await
            .expect("page message in time")
            .expect("outbound channel open")
    }

    #[tokio::test]
    async fn scan_flow_ends_in_navigation_to_profile() {
        let (outbound, mut page) = mpsc::unbounded_channel();
        let connection = ScannerConnection::new(&app_state(), outbound);

        dispatch_client_message(&connection, ClientMessage::StartScan).await;
        assert_eq!(connection.controller.state(), ScanState::Scanning);

        let ServerMessage::ListCameras { request_id } = next_message(&mut page).await else {
            panic!("expected list_cameras");
        };
        dispatch_client_message(
            &connection,
            ClientMessage::Cameras {
                request_id,
                cameras: vec![
                    CameraInfo {
                        id: "front".into(),
                        label: "Front Camera".into(),
                    },
                    CameraInfo {
                        id: "back".into(),
                        label: "Back Camera".into(),
                    },
                ],
            },
        )
        .await;

        let (request_id, handle_id) = match next_message(&mut page).await {
            ServerMessage::StartCamera {
                request_id,
                handle_id,
                camera_id,
                ..
            } => {
                assert_eq!(camera_id, "back");
                (request_id, handle_id)
            }
            other => panic!("expected start_camera, got {:?}", other),
        };
        dispatch_client_message(&connection, ClientMessage::CameraStarted { request_id }).await;

        dispatch_client_message(
            &connection,
            ClientMessage::FrameMiss {
                handle_id,
                reason: "NotFoundException".into(),
            },
        )
        .await;
        assert_eq!(connection.controller.state(), ScanState::Scanning);

        dispatch_client_message(
            &connection,
            ClientMessage::Decoded {
                handle_id,
                text: "https://turant.care/p/TC-2024-001823".into(),
            },
        )
        .await;
        assert_eq!(connection.controller.state(), ScanState::Success);

        let stop_request = match next_message(&mut page).await {
            ServerMessage::StopCamera {
                request_id,
                handle_id: stopped,
            } => {
                assert_eq!(stopped, handle_id);
                request_id
            }
            other => panic!("expected stop_camera, got {:?}", other),
        };
        dispatch_client_message(
            &connection,
            ClientMessage::CameraStopped {
                request_id: stop_request,
            },
        )
        .await;

        match next_message(&mut page).await {
            ServerMessage::Navigate { path } => assert_eq!(path, "/profile/TC-2024-001823"),
            other => panic!("expected navigate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_camera_is_reported_as_a_failed_scan() {
        let (outbound, mut page) = mpsc::unbounded_channel();
        let connection = ScannerConnection::new(&app_state(), outbound);

        dispatch_client_message(&connection, ClientMessage::StartScan).await;
        let ServerMessage::ListCameras { request_id } = next_message(&mut page).await else {
            panic!("expected list_cameras");
        };
        dispatch_client_message(
            &connection,
            ClientMessage::CameraFailed {
                request_id,
                kind: CameraFailureKind::NoDevice,
                message: String::new(),
            },
        )
        .await;

        let mut snapshots = connection.controller.subscribe();
        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            snapshots.wait_for(|s| s.state == ScanState::Failed),
        )
        .await
        .expect("controller fails the scan")
        .expect("controller alive")
        .clone();
        assert!(snapshot.error.is_some());
        assert!(page.try_recv().is_err());
    }

    #[tokio::test]
    async fn snapshots_are_forwarded_until_shutdown() {
        let (outbound, mut page) = mpsc::unbounded_channel();
        let connection = ScannerConnection::new(&app_state(), outbound.clone());
        let shutdown = CancellationToken::new();
        let forwarder = tokio::spawn(forward_snapshots(
            connection.controller.subscribe(),
            outbound,
            shutdown.clone(),
        ));

        match next_message(&mut page).await {
            ServerMessage::ScanState { state, .. } => assert_eq!(state, "idle"),
            other => panic!("expected scan_state, got {:?}", other),
        }

        shutdown.cancel();
        forwarder.await.unwrap();
    }

    #[tokio::test]
    async fn closing_the_connection_cancels_the_scan() {
        let (outbound, mut page) = mpsc::unbounded_channel();
        let connection = ScannerConnection::new(&app_state(), outbound);

        dispatch_client_message(&connection, ClientMessage::StartScan).await;
        assert!(matches!(
            next_message(&mut page).await,
            ServerMessage::ListCameras { .. }
        ));

        connection.close().await;
        assert_eq!(connection.controller.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn malformed_text_is_answered_with_an_error() {
        let (outbound, mut page) = mpsc::unbounded_channel();
        let connection = ScannerConnection::new(&app_state(), outbound.clone());

        handle_text_message("{\"type\":\"open_pod_bay_doors\"}", &connection, &outbound).await;

        assert!(matches!(
            next_message(&mut page).await,
            ServerMessage::Error { .. }
        ));
    }
}
