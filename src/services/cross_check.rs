//! Cross-checks contra registros externos
//!
//! Samsat, KIR y seguro están simulados con respuestas fijas detrás del
//! trait `RegistryCheck`; la integración real se conecta ahí. La detección
//! de duplicados sí consulta la base de datos.

use async_trait::async_trait;
use serde_json::json;

use crate::models::vehicle::VehicleIdentity;
use crate::models::verification::{CheckStatus, DuplicateField};
use crate::repositories::verification_repository::VerificationStore;
use crate::utils::errors::AppResult;

/// Lo que reporta un cross-check antes de persistirse
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFinding {
    pub status: CheckStatus,
    pub confidence: f64,
    pub message: String,
    pub details: serde_json::Value,
}

#[async_trait]
pub trait RegistryCheck: Send + Sync {
    async fn run(&self, identity: &VehicleIdentity) -> AppResult<CheckFinding>;
}

/// Registro de impuestos vehiculares (Samsat), simulado
pub struct SimulatedSamsat;

#[async_trait]
impl RegistryCheck for SimulatedSamsat {
    async fn run(&self, identity: &VehicleIdentity) -> AppResult<CheckFinding> {
        Ok(CheckFinding {
            status: CheckStatus::Passed,
            confidence: 0.95,
            message: format!(
                "Registration number {} is registered and tax is active",
                identity.registration_number
            ),
            details: json!({
                "registration_valid": true,
                "tax_status": "active",
                "last_tax_payment": "2024-01-15",
                "next_due_date": "2025-01-15",
            }),
        })
    }
}

/// Certificado de inspección técnica (KIR), simulado
pub struct SimulatedKir;

#[async_trait]
impl RegistryCheck for SimulatedKir {
    async fn run(&self, _identity: &VehicleIdentity) -> AppResult<CheckFinding> {
        Ok(CheckFinding {
            status: CheckStatus::Passed,
            confidence: 0.90,
            message: "Vehicle has a valid KIR certificate".to_string(),
            details: json!({
                "kir_valid": true,
                "issue_date": "2024-06-01",
                "expiry_date": "2025-06-01",
                "inspection_station": "Dishub Jakarta Pusat",
            }),
        })
    }
}

/// Póliza de seguro, simulada
pub struct SimulatedInsurance;

#[async_trait]
impl RegistryCheck for SimulatedInsurance {
    async fn run(&self, _identity: &VehicleIdentity) -> AppResult<CheckFinding> {
        Ok(CheckFinding {
            status: CheckStatus::Passed,
            confidence: 0.88,
            message: "Insurance is active and matches the vehicle data".to_string(),
            details: json!({
                "policy_active": true,
                "insurance_company": "Asuransi Jasa Indonesia",
                "policy_number": "AJI-2024-001234",
                "coverage_type": "comprehensive",
                "expiry_date": "2025-03-15",
            }),
        })
    }
}

/// Los tres registros externos usados por el motor de verificación
pub struct RegistryChecks {
    pub samsat: Box<dyn RegistryCheck>,
    pub kir: Box<dyn RegistryCheck>,
    pub insurance: Box<dyn RegistryCheck>,
}

impl RegistryChecks {
    pub fn simulated() -> Self {
        Self {
            samsat: Box::new(SimulatedSamsat),
            kir: Box::new(SimulatedKir),
            insurance: Box::new(SimulatedInsurance),
        }
    }
}

/// Consulta matrícula, chasis y motor en ese orden; se queda con el primero duplicado
pub async fn duplicate_check(
    store: &dyn VerificationStore,
    identity: &VehicleIdentity,
) -> AppResult<CheckFinding> {
    for field in DuplicateField::ORDER {
        let value = match field {
            DuplicateField::RegistrationNumber => &identity.registration_number,
            DuplicateField::ChassisNumber => &identity.chassis_number,
            DuplicateField::EngineNumber => &identity.engine_number,
        };

        let count = store.count_duplicates(field, value, identity.id).await?;
        if count > 0 {
            return Ok(CheckFinding {
                status: CheckStatus::Failed,
                confidence: 1.0,
                message: format!("Duplicate {} found", field.column()),
                details: json!({
                    "duplicate_found": true,
                    "duplicate_type": field.column(),
                    "duplicate_count": count,
                }),
            });
        }
    }

    Ok(CheckFinding {
        status: CheckStatus::Passed,
        confidence: 1.0,
        message: "No duplicate registration, chassis or engine number found".to_string(),
        details: json!({ "duplicate_found": false }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> VehicleIdentity {
        VehicleIdentity {
            id: 1,
            registration_number: "B 1234 XYZ".into(),
            chassis_number: "MHF11KF8000000001".into(),
            engine_number: "1KD-0000001".into(),
        }
    }

    #[tokio::test]
    async fn test_simulated_checks_pass_with_fixed_confidence() {
        let checks = RegistryChecks::simulated();
        let samsat = checks.samsat.run(&identity()).await.unwrap();
        let kir = checks.kir.run(&identity()).await.unwrap();
        let insurance = checks.insurance.run(&identity()).await.unwrap();

        assert_eq!(samsat.status, CheckStatus::Passed);
        assert_eq!(samsat.confidence, 0.95);
        assert_eq!(kir.confidence, 0.90);
        assert_eq!(insurance.confidence, 0.88);
        assert_eq!(kir.details["inspection_station"], "Dishub Jakarta Pusat");
        assert_eq!(insurance.details["policy_number"], "AJI-2024-001234");
    }
}
