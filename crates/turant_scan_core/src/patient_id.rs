//! crates/turant_scan_core/src/patient_id.rs
//!
//! Maps the raw text of a scanned QR code to a patient identifier.

/// Every patient identifier starts with this prefix.
pub const PATIENT_ID_PREFIX: &str = "TC-";

/// Returned when a payload carries no identifier.
pub const DEFAULT_PATIENT_ID: &str = "TC-2024-001847";

/// Extracts a patient identifier from decoded QR text.
///
/// Accepts a bare identifier, or a URL/path whose last segment is one.
/// Anything else yields `fallback`. Never fails.
pub fn extract_patient_id(raw: &str, fallback: &str) -> String {
    if raw.starts_with(PATIENT_ID_PREFIX) {
        return raw.to_string();
    }

    if raw.contains('/') {
        if let Some(last) = raw.rsplit('/').next() {
            if last.starts_with(PATIENT_ID_PREFIX) {
                return last.to_string();
            }
        }
    }

    fallback.to_string()
}

/// The route of the profile page for `patient_id`.
pub fn profile_path(patient_id: &str) -> String {
    format!("/profile/{}", patient_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifier_is_returned_unchanged() {
        assert_eq!(
            extract_patient_id("TC-2024-001847", DEFAULT_PATIENT_ID),
            "TC-2024-001847"
        );
    }

    #[test]
    fn identifier_is_taken_from_last_path_segment() {
        assert_eq!(
            extract_patient_id("https://example.com/scan/TC-2024-009999", DEFAULT_PATIENT_ID),
            "TC-2024-009999"
        );
    }

    #[test]
    fn garbage_falls_back() {
        assert_eq!(extract_patient_id("not-an-id", "TC-0000"), "TC-0000");
        assert_eq!(extract_patient_id("", "TC-0000"), "TC-0000");
    }

    #[test]
    fn only_the_final_segment_is_considered() {
        assert_eq!(
            extract_patient_id("https://example.com/TC-2024-1/profile", "TC-0000"),
            "TC-0000"
        );
        assert_eq!(extract_patient_id("https://example.com/scan/", "TC-0000"), "TC-0000");
    }

    #[test]
    fn prefix_is_case_sensitive() {
        assert_eq!(extract_patient_id("tc-2024-001847", "TC-0000"), "TC-0000");
    }

    #[test]
    fn profile_path_uses_profile_route() {
        assert_eq!(profile_path("TC-2024-001823"), "/profile/TC-2024-001823");
    }
}
