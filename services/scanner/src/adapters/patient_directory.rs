//! services/scanner/src/adapters/patient_directory.rs
//!
//! A read-only, in-memory patient directory with the demo patients. It
//! implements the `PatientDirectory` port from the `core` crate. Only the
//! demo patient has a full profile on record.

use async_trait::async_trait;
use turant_scan_core::{
    Demographics, DrugRiskAssessment, GeneVariant, GeneticProfile, MedicalHistory, Medication,
    PatientDirectory, PatientProfile, PatientSummary, PortError, PortResult, DEFAULT_PATIENT_ID,
};

/// (id, name, age, risk level, condition, last scan)
const DEMO_PATIENTS: [(&str, &str, u32, &str, &str, &str); 5] = [
    ("TC-2024-001847", "Priya Sharma", 34, "High", "Diabetes + Hypertension", "2 hrs ago"),
    ("TC-2024-001823", "Amit Verma", 52, "Moderate", "Cardiac arrhythmia", "4 hrs ago"),
    ("TC-2024-001799", "Sunita Rao", 28, "Low", "Thyroid disorder", "Yesterday"),
    ("TC-2024-001756", "Rajesh Kumar", 67, "High", "CKD + Hypertension", "Yesterday"),
    ("TC-2024-001734", "Meera Joshi", 41, "Moderate", "Epilepsy", "2 days ago"),
];

/// (gene, variant, effect, allele frequency)
const DEMO_VARIANTS: [(&str, &str, &str, &str); 4] = [
    ("CYP2D6", "*4", "Loss of function", "21%"),
    ("CYP2C19", "*2", "Reduced function", "15%"),
    ("SLCO1B1", "c.521T>C", "Reduced transport", "18%"),
    ("TPMT", "Wild-type", "Normal function", "94%"),
];

/// (name, frequency, since)
const DEMO_MEDICATIONS: [(&str, &str, &str); 3] = [
    ("Metformin 500mg", "Twice daily", "Jan 2022"),
    ("Amlodipine 5mg", "Once daily", "Mar 2023"),
    ("Levothyroxine 50mcg", "Once daily (morning)", "Sep 2021"),
];

#[derive(Clone, Debug)]
pub struct StaticPatientDirectory {
    patients: Vec<PatientSummary>,
    profiles: Vec<PatientProfile>,
}

impl StaticPatientDirectory {
    pub fn new(patients: Vec<PatientSummary>, profiles: Vec<PatientProfile>) -> Self {
        Self { patients, profiles }
    }

    /// The directory the demo ships with.
    pub fn demo() -> Self {
        let patients = DEMO_PATIENTS
            .iter()
            .map(|(id, name, age, risk_level, condition, last_scan)| PatientSummary {
                id: id.to_string(),
                name: name.to_string(),
                age: *age,
                risk_level: risk_level.to_string(),
                condition: condition.to_string(),
                last_scan: last_scan.to_string(),
            })
            .collect();
        Self::new(patients, vec![demo_profile()])
    }
}

#[async_trait]
impl PatientDirectory for StaticPatientDirectory {
    async fn get_patient(&self, patient_id: &str) -> PortResult<PatientSummary> {
        self.patients
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("patient {}", patient_id)))
    }

    async fn list_patients(&self) -> PortResult<Vec<PatientSummary>> {
        Ok(self.patients.clone())
    }

    async fn get_profile(&self, patient_id: &str) -> PortResult<PatientProfile> {
        self.profiles
            .iter()
            .find(|p| p.demographics.id == patient_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("profile for patient {}", patient_id)))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn demo_profile() -> PatientProfile {
    PatientProfile {
        demographics: Demographics {
            id: DEFAULT_PATIENT_ID.to_string(),
            name: "Priya Sharma".to_string(),
            age: 34,
            date_of_birth: "15 March 1990".to_string(),
            blood_group: "B+".to_string(),
            gender: "Female".to_string(),
            phone: "+91 98765 43210".to_string(),
            email: "priya.sharma@email.com".to_string(),
            address: "Sector 14, Gurgaon, Haryana 122001".to_string(),
            emergency_contact: "Rahul Sharma (+91 98765 43211)".to_string(),
            insurance_id: "HDFC-HEALTH-2024-7823".to_string(),
            registered_at: "Apollo Hospital, Gurgaon".to_string(),
        },
        medical_history: MedicalHistory {
            conditions: strings(&[
                "Type 2 Diabetes (Controlled)",
                "Hypertension (Stage 1)",
                "Hypothyroidism",
            ]),
            allergies: strings(&["Penicillin", "Sulfa drugs"]),
            current_medications: DEMO_MEDICATIONS
                .iter()
                .map(|(name, frequency, since)| Medication {
                    name: name.to_string(),
                    frequency: frequency.to_string(),
                    since: since.to_string(),
                })
                .collect(),
            past_surgeries: strings(&["Appendectomy (2018)"]),
            vaccinations: strings(&[
                "COVID-19 (Covishield, 2 doses + booster)",
                "Hepatitis B",
                "Influenza 2024",
            ]),
            last_visit: "12 Feb 2026".to_string(),
            upcoming_appointment: Some(
                "5 Mar 2026, Dr. Anand Kapoor (Endocrinologist)".to_string(),
            ),
        },
        genetic_profile: GeneticProfile {
            primary_gene: "CYP2D6".to_string(),
            diplotype: "*1/*4".to_string(),
            phenotype: "Intermediate Metabolizer".to_string(),
            detected_variants: DEMO_VARIANTS
                .iter()
                .map(|(gene, variant, effect, frequency)| GeneVariant {
                    gene: gene.to_string(),
                    variant: variant.to_string(),
                    effect: effect.to_string(),
                    allele_frequency: frequency.to_string(),
                })
                .collect(),
            ethnicity: "South Asian".to_string(),
            analysis_date: "14 Feb 2026".to_string(),
            source_file: "priya_sharma_genome_v2.vcf".to_string(),
        },
        drug_risk: DrugRiskAssessment {
            drug: "Codeine".to_string(),
            risk_label: "High Risk".to_string(),
            risk_score: 82,
            severity: "Contraindicated".to_string(),
            confidence: 94.7,
            primary_gene: "CYP2D6".to_string(),
            diplotype: "*1/*4".to_string(),
            phenotype: "Intermediate Metabolizer".to_string(),
            variants: strings(&[
                "CYP2D6*4 (loss-of-function)",
                "CYP2C19*2 (reduced function)",
            ]),
            recommendation: "Avoid codeine. Switch to tramadol with dose adjustment or \
                             morphine with standard dosing."
                .to_string(),
            alternatives: strings(&[
                "Tramadol (reduce dose by 25%)",
                "Oxycodone (standard dose)",
                "Morphine (standard dose)",
            ]),
            explanation: "CYP2D6*4 allele causes significantly reduced codeine metabolism. \
                          The patient converts codeine to morphine at approximately 50% of \
                          normal rate. This leads to unpredictable analgesic effect and risk \
                          of respiratory depression. CYP2C19*2 co-occurrence further \
                          complicates drug metabolism cascade. Clinical guidelines (CPIC \
                          2021) recommend against codeine use in intermediate and poor \
                          metabolizers."
                .to_string(),
            references: strings(&[
                "CPIC Guideline for Codeine (2021)",
                "PharmGKB PA166104996",
                "FDA Drug Safety Communication 2017",
            ]),
        },
    }
}
