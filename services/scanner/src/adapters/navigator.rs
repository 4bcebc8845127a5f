//! services/scanner/src/adapters/navigator.rs
//!
//! This module contains the adapter that tells the scanner page which route
//! to open. It implements the `Navigator` port from the `core` crate.

use async_trait::async_trait;
use turant_scan_core::{Navigator, PortError, PortResult};

use crate::adapters::browser_camera::Outbound;
use crate::web::protocol::ServerMessage;

/// An adapter that implements `Navigator` by pushing `navigate` messages.
#[derive(Clone)]
pub struct BrowserNavigator {
    outbound: Outbound,
}

impl BrowserNavigator {
    /// Creates a new `BrowserNavigator`.
    pub fn new(outbound: Outbound) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl Navigator for BrowserNavigator {
    async fn navigate_to(&self, path: &str) -> PortResult<()> {
        self.outbound
            .send(ServerMessage::Navigate {
                path: path.to_string(),
            })
            .map_err(|_| PortError::Unexpected("scanner page disconnected".to_string()))
    }
}
