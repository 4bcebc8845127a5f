//! services/scanner/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use turant_scan_core::{
    Demographics, DrugRiskAssessment, GeneVariant, GeneticProfile, MedicalHistory, Medication,
    PatientProfile, PatientSummary, PortError,
};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_patients_handler,
        get_patient_handler,
        get_profile_handler,
    ),
    components(
        schemas(
            HealthResponse,
            PatientResponse,
            ProfileResponse,
            DemographicsResponse,
            MedicalHistoryResponse,
            MedicationResponse,
            GeneticProfileResponse,
            GeneVariantResponse,
            DrugRiskResponse
        )
    ),
    tags(
        (name = "PharmaGuard Scanner API", description = "Patient lookup for the smart health card scanner.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// A patient as returned to the scanner's profile page.
#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct PatientResponse {
    id: String,
    name: String,
    age: u32,
    risk_level: String,
    condition: String,
    last_scan: String,
}

impl From<PatientSummary> for PatientResponse {
    fn from(patient: PatientSummary) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            age: patient.age,
            risk_level: patient.risk_level,
            condition: patient.condition,
            last_scan: patient.last_scan,
        }
    }
}

/// The full record behind `/profile/{patient_id}`.
#[derive(Serialize, ToSchema, Debug)]
pub struct ProfileResponse {
    demographics: DemographicsResponse,
    medical_history: MedicalHistoryResponse,
    genetic_profile: GeneticProfileResponse,
    drug_risk: DrugRiskResponse,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct DemographicsResponse {
    id: String,
    name: String,
    age: u32,
    date_of_birth: String,
    blood_group: String,
    gender: String,
    phone: String,
    email: String,
    address: String,
    emergency_contact: String,
    insurance_id: String,
    registered_at: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct MedicationResponse {
    name: String,
    frequency: String,
    since: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct MedicalHistoryResponse {
    conditions: Vec<String>,
    allergies: Vec<String>,
    current_medications: Vec<MedicationResponse>,
    past_surgeries: Vec<String>,
    vaccinations: Vec<String>,
    last_visit: String,
    upcoming_appointment: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GeneVariantResponse {
    gene: String,
    variant: String,
    effect: String,
    allele_frequency: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GeneticProfileResponse {
    primary_gene: String,
    diplotype: String,
    phenotype: String,
    detected_variants: Vec<GeneVariantResponse>,
    ethnicity: String,
    analysis_date: String,
    source_file: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct DrugRiskResponse {
    drug: String,
    risk_label: String,
    risk_score: u8,
    severity: String,
    confidence: f64,
    primary_gene: String,
    diplotype: String,
    phenotype: String,
    variants: Vec<String>,
    recommendation: String,
    alternatives: Vec<String>,
    explanation: String,
    references: Vec<String>,
}

impl From<PatientProfile> for ProfileResponse {
    fn from(profile: PatientProfile) -> Self {
        Self {
            demographics: profile.demographics.into(),
            medical_history: profile.medical_history.into(),
            genetic_profile: profile.genetic_profile.into(),
            drug_risk: profile.drug_risk.into(),
        }
    }
}

impl From<Demographics> for DemographicsResponse {
    fn from(d: Demographics) -> Self {
        Self {
            id: d.id,
            name: d.name,
            age: d.age,
            date_of_birth: d.date_of_birth,
            blood_group: d.blood_group,
            gender: d.gender,
            phone: d.phone,
            email: d.email,
            address: d.address,
            emergency_contact: d.emergency_contact,
            insurance_id: d.insurance_id,
            registered_at: d.registered_at,
        }
    }
}

impl From<Medication> for MedicationResponse {
    fn from(m: Medication) -> Self {
        Self {
            name: m.name,
            frequency: m.frequency,
            since: m.since,
        }
    }
}

impl From<MedicalHistory> for MedicalHistoryResponse {
    fn from(h: MedicalHistory) -> Self {
        Self {
            conditions: h.conditions,
            allergies: h.allergies,
            current_medications: h.current_medications.into_iter().map(Into::into).collect(),
            past_surgeries: h.past_surgeries,
            vaccinations: h.vaccinations,
            last_visit: h.last_visit,
            upcoming_appointment: h.upcoming_appointment,
        }
    }
}

impl From<GeneVariant> for GeneVariantResponse {
    fn from(v: GeneVariant) -> Self {
        Self {
            gene: v.gene,
            variant: v.variant,
            effect: v.effect,
            allele_frequency: v.allele_frequency,
        }
    }
}

impl From<GeneticProfile> for GeneticProfileResponse {
    fn from(g: GeneticProfile) -> Self {
        Self {
            primary_gene: g.primary_gene,
            diplotype: g.diplotype,
            phenotype: g.phenotype,
            detected_variants: g.detected_variants.into_iter().map(Into::into).collect(),
            ethnicity: g.ethnicity,
            analysis_date: g.analysis_date,
            source_file: g.source_file,
        }
    }
}

impl From<DrugRiskAssessment> for DrugRiskResponse {
    fn from(r: DrugRiskAssessment) -> Self {
        Self {
            drug: r.drug,
            risk_label: r.risk_label,
            risk_score: r.risk_score,
            severity: r.severity,
            confidence: r.confidence,
            primary_gene: r.primary_gene,
            diplotype: r.diplotype,
            phenotype: r.phenotype,
            variants: r.variants,
            recommendation: r.recommendation,
            alternatives: r.alternatives,
            explanation: r.explanation,
            references: r.references,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// List every patient in the directory.
#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients", body = [PatientResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_patients_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<PatientResponse>>, (StatusCode, String)> {
    match app_state.patients.list_patients().await {
        Ok(patients) => Ok(Json(patients.into_iter().map(Into::into).collect())),
        Err(e) => {
            error!("Failed to list patients: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list patients".to_string(),
            ))
        }
    }
}

/// Look up the patient a scanned card resolved to.
#[utoipa::path(
    get,
    path = "/patients/{patient_id}",
    responses(
        (status = 200, description = "Patient found", body = PatientResponse),
        (status = 404, description = "No patient with this identifier"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("patient_id" = String, Path, description = "Patient identifier, e.g. TC-2024-001847.")
    )
)]
pub async fn get_patient_handler(
    State(app_state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientResponse>, (StatusCode, String)> {
    match app_state.patients.get_patient(&patient_id).await {
        Ok(patient) => Ok(Json(patient.into())),
        Err(PortError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            format!("Patient {} not found", patient_id),
        )),
        Err(e) => {
            error!("Failed to load patient {}: {:?}", patient_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load patient".to_string(),
            ))
        }
    }
}

/// The profile page's data: demographics, medical history, genetic profile
/// and the drug-risk result.
#[utoipa::path(
    get,
    path = "/patients/{patient_id}/profile",
    responses(
        (status = 200, description = "Profile found", body = ProfileResponse),
        (status = 404, description = "No profile on record for this identifier"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("patient_id" = String, Path, description = "Patient identifier, e.g. TC-2024-001847.")
    )
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    match app_state.patients.get_profile(&patient_id).await {
        Ok(profile) => Ok(Json(profile.into())),
        Err(PortError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            format!("No profile on record for patient {}", patient_id),
        )),
        Err(e) => {
            error!("Failed to load profile {}: {:?}", patient_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load profile".to_string(),
            ))
        }
    }
}
