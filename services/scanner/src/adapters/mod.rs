pub mod browser_camera;
pub mod navigator;
pub mod patient_directory;

pub use browser_camera::{BrowserCameraAdapter, CameraReply, Outbound};
pub use navigator::BrowserNavigator;
pub use patient_directory::StaticPatientDirectory;
