pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers to make them easily accessible
// to the binary that will build the web server router.
pub use rest::{get_patient_handler, get_profile_handler, health_handler, list_patients_handler};
pub use ws_handler::ws_handler;
