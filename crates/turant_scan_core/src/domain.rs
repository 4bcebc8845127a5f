//! crates/turant_scan_core/src/domain.rs
//!
//! Defines the pure, core data structures for the scanner.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::patient_id::DEFAULT_PATIENT_ID;

//=========================================================================================
// Scan Lifecycle
//=========================================================================================

/// The visual state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Success,
    Failed,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Scanning => "scanning",
            ScanState::Success => "success",
            ScanState::Failed => "failed",
        }
    }
}

/// One attempt to acquire a camera and decode a QR code.
///
/// `decoded_payload` and `resolved_patient_id` are written once, when the
/// first decode succeeds, and never change afterwards.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: Uuid,
    pub state: ScanState,
    pub started_at: DateTime<Utc>,
    pub decoded_payload: Option<String>,
    pub resolved_patient_id: Option<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ScanState::Scanning,
            started_at: Utc::now(),
            decoded_payload: None,
            resolved_patient_id: None,
        }
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors the user gets to see. Everything else stays inside the controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("No camera found on this device")]
    NoDevice,
    #[error("Could not start the camera: {0}")]
    Acquisition(String),
    #[error("No QR code was detected before the scan timed out")]
    TimedOut,
}

/// What the hosting view renders. Published on every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSnapshot {
    pub session_id: Option<Uuid>,
    pub state: ScanState,
    pub started_at: Option<DateTime<Utc>>,
    pub patient_id: Option<String>,
    pub error: Option<ScanError>,
}

impl ScanSnapshot {
    pub fn idle() -> Self {
        Self {
            session_id: None,
            state: ScanState::Idle,
            started_at: None,
            patient_id: None,
            error: None,
        }
    }

    pub(crate) fn of(session: &ScanSession) -> Self {
        Self {
            session_id: Some(session.id),
            state: session.state,
            started_at: Some(session.started_at),
            patient_id: session.resolved_patient_id.clone(),
            error: None,
        }
    }
}

//=========================================================================================
// Camera
//=========================================================================================

/// A capture device as enumerated by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub id: String,
    pub label: String,
}

/// A running camera. Exclusively owned by the session that acquired it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraHandle {
    pub id: Uuid,
    pub camera_id: String,
}

/// Options handed to the decoder when it starts a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub target_frame_rate: u32,
    pub detection_box_size: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target_frame_rate: 10,
            detection_box_size: 250,
        }
    }
}

/// Tunables for a `ScanController`.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub options: ScanOptions,
    /// Delay between a successful decode and the navigation to the profile.
    pub navigation_delay: Duration,
    /// Identifier used when a payload does not contain one.
    pub fallback_patient_id: String,
    /// `None` lets a session scan indefinitely.
    pub scan_timeout: Option<Duration>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            options: ScanOptions::default(),
            navigation_delay: Duration::from_millis(800),
            fallback_patient_id: DEFAULT_PATIENT_ID.to_string(),
            scan_timeout: None,
        }
    }
}

//=========================================================================================
// Patient Directory
//=========================================================================================

/// A patient as shown on the profile page. Inert display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub risk_level: String,
    pub condition: String,
    pub last_scan: String,
}

/// Everything the profile page shows for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientProfile {
    pub demographics: Demographics,
    pub medical_history: MedicalHistory,
    pub genetic_profile: GeneticProfile,
    pub drug_risk: DrugRiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demographics {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub date_of_birth: String,
    pub blood_group: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub emergency_contact: String,
    pub insurance_id: String,
    pub registered_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Medication {
    pub name: String,
    pub frequency: String,
    pub since: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalHistory {
    pub conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<Medication>,
    pub past_surgeries: Vec<String>,
    pub vaccinations: Vec<String>,
    pub last_visit: String,
    pub upcoming_appointment: Option<String>,
}

/// One variant found in the patient's genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneVariant {
    pub gene: String,
    pub variant: String,
    pub effect: String,
    /// Population frequency as reported by the lab, e.g. "21%".
    pub allele_frequency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticProfile {
    pub primary_gene: String,
    pub diplotype: String,
    pub phenotype: String,
    pub detected_variants: Vec<GeneVariant>,
    pub ethnicity: String,
    pub analysis_date: String,
    pub source_file: String,
}

/// A canned drug-risk result. Nothing here is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrugRiskAssessment {
    pub drug: String,
    pub risk_label: String,
    /// 0 to 100.
    pub risk_score: u8,
    pub severity: String,
    /// Percent.
    pub confidence: f64,
    pub primary_gene: String,
    pub diplotype: String,
    pub phenotype: String,
    pub variants: Vec<String>,
    pub recommendation: String,
    pub alternatives: Vec<String>,
    pub explanation: String,
    pub references: Vec<String>,
}
