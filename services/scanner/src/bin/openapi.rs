//! services/scanner/src/bin/openapi.rs
//!
//! Dumps the scanner's REST document. The first argument overrides the
//! output path, which defaults to `openapi.json`.

use scanner_lib::{error::ApiError, web::rest::ApiDoc};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .map_err(|e| ApiError::Internal(format!("Could not render OpenAPI document: {}", e)))?;
    std::fs::write(&output, document)?;

    tracing::info!(
        "Wrote {} paths to {}.",
        ApiDoc::openapi().paths.paths.len(),
        output
    );
    Ok(())
}
