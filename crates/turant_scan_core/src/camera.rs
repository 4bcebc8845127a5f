//! crates/turant_scan_core/src/camera.rs
//!
//! Camera selection when a device exposes more than one capture source.

use crate::domain::CameraDescriptor;

const REAR_FACING_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Picks the camera to scan with: the first rear-facing device, otherwise the
/// last one enumerated. `None` only when `cameras` is empty.
pub fn select_camera(cameras: &[CameraDescriptor]) -> Option<&CameraDescriptor> {
    cameras
        .iter()
        .find(|camera| is_rear_facing(camera))
        .or_else(|| cameras.last())
}

fn is_rear_facing(camera: &CameraDescriptor) -> bool {
    let label = camera.label.to_lowercase();
    REAR_FACING_HINTS.iter().any(|hint| label.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(id: &str, label: &str) -> CameraDescriptor {
        CameraDescriptor {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(select_camera(&[]).is_none());
    }

    #[test]
    fn rear_camera_is_preferred() {
        let cameras = vec![
            camera("0", "Front Camera"),
            camera("1", "Back Camera"),
            camera("2", "USB Webcam"),
        ];
        assert_eq!(select_camera(&cameras).map(|c| c.id.as_str()), Some("1"));
    }

    #[test]
    fn environment_facing_label_counts_as_rear() {
        let cameras = vec![
            camera("a", "camera2 1, facing front"),
            camera("b", "camera2 0, facing ENVIRONMENT"),
        ];
        assert_eq!(select_camera(&cameras).map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn last_camera_is_used_without_a_rear_one() {
        let cameras = vec![camera("0", "Integrated"), camera("1", "USB Webcam")];
        assert_eq!(select_camera(&cameras).map(|c| c.id.as_str()), Some("1"));
    }
}
