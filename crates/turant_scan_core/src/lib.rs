pub mod camera;
pub mod controller;
pub mod domain;
pub mod patient_id;
pub mod ports;

pub use camera::select_camera;
pub use controller::ScanController;
pub use domain::{
    CameraDescriptor, CameraHandle, Demographics, DrugRiskAssessment, GeneVariant,
    GeneticProfile, MedicalHistory, Medication, PatientProfile, PatientSummary, ScanError,
    ScanOptions, ScanSession, ScanSettings, ScanSnapshot, ScanState,
};
pub use patient_id::{extract_patient_id, profile_path, DEFAULT_PATIENT_ID, PATIENT_ID_PREFIX};
pub use ports::{
    DecodeCallbacks, DecoderAdapter, Navigator, PatientDirectory, PortError, PortResult,
};
