//! Pure validation of raw form payloads.
//!
//! Rules run in a fixed order and stop at the first failure. Nothing here
//! touches a store; the only input besides the payload is a catalog snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boimedicado_pharmacy::{MedicineCode, Millilitres};

use crate::catalog::CatalogSnapshot;
use crate::entry::{MovementKind, MovementSubject};
use crate::tag::AnimalTag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid animal tag '{0}' (expected 000000-0)")]
    InvalidAnimalTag(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("no medication with a positive dose was specified")]
    NoMedicationSpecified,

    #[error("unknown medicine '{0}'")]
    UnknownMedicine(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// One medication slot as typed in the form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestedMedication {
    pub medicine: String,
    pub dose: String,
}

impl RequestedMedication {
    pub fn new(medicine: impl Into<String>, dose: impl Into<String>) -> Self {
        Self {
            medicine: medicine.into(),
            dose: dose.into(),
        }
    }
}

/// Raw treatment form payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreatmentRequest {
    pub animal_tag: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Location code or free text.
    pub location: String,
    pub conditions: Vec<String>,
    pub medications: Vec<RequestedMedication>,
}

/// A dose resolved against the catalog, still unpriced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDose {
    pub code: MedicineCode,
    pub dose: Millilitres,
}

/// A treatment that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTreatment {
    pub animal_tag: AnimalTag,
    pub occurred_on: NaiveDate,
    pub location: String,
    pub conditions: Vec<String>,
    /// In the order the operator entered them.
    pub doses: Vec<PlannedDose>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathRequest {
    pub animal_tag: String,
    pub date: String,
    pub location: String,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDeath {
    pub animal_tag: AnimalTag,
    pub occurred_on: NaiveDate,
    pub location: String,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub kind: MovementKind,
    /// Tagged movements carry one animal; when blank, `quantity` counts heads.
    pub animal_tag: String,
    pub quantity: Option<u32>,
    pub date: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMovement {
    pub kind: MovementKind,
    pub subject: MovementSubject,
    pub occurred_on: NaiveDate,
    pub location: String,
}

fn parse_tag(raw: &str) -> Result<AnimalTag, ValidationError> {
    AnimalTag::parse(raw).map_err(|_| ValidationError::InvalidAnimalTag(raw.to_string()))
}

/// Blank or unparsable dates count as missing.
fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingRequiredField("date"));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::MissingRequiredField("date"))
}

fn require(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingRequiredField(field));
    }
    Ok(trimmed.to_string())
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn distinct_conditions(conditions: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(conditions.len());
    for c in conditions {
        let c = c.trim();
        if !c.is_empty() && !out.iter().any(|seen| seen == c) {
            out.push(c.to_string());
        }
    }
    out
}

/// Validate a treatment form.
///
/// 1. tag shape, 2. date and location, 3. at least one positive dose,
/// 4. every medicine known to the catalog.
///
/// Slots with a blank medicine, or a medicine but a blank dose (an unused
/// protocol suggestion), are skipped. A dose that is filled in but not a
/// positive number rejects the whole request.
pub fn validate_treatment(
    request: &TreatmentRequest,
    catalog: &CatalogSnapshot,
) -> Result<ValidatedTreatment, ValidationError> {
    let animal_tag = parse_tag(&request.animal_tag)?;
    let occurred_on = parse_date(&request.date)?;
    let location = require(&request.location, "location")?;

    let mut active: Vec<(&str, Millilitres)> = Vec::new();
    for slot in &request.medications {
        let medicine = slot.medicine.trim();
        if medicine.is_empty() || slot.dose.trim().is_empty() {
            continue;
        }
        let dose = Millilitres::parse_dose(&slot.dose).ok_or(ValidationError::NoMedicationSpecified)?;
        active.push((medicine, dose));
    }
    if active.is_empty() {
        return Err(ValidationError::NoMedicationSpecified);
    }

    let doses = active
        .into_iter()
        .map(|(label, dose)| {
            catalog
                .resolve_medicine(label)
                .map(|m| PlannedDose {
                    code: m.code.clone(),
                    dose,
                })
                .ok_or_else(|| ValidationError::UnknownMedicine(label.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedTreatment {
        animal_tag,
        occurred_on,
        location: catalog.location_label(&location),
        conditions: distinct_conditions(&request.conditions),
        doses,
    })
}

pub fn validate_death(
    request: &DeathRequest,
    catalog: &CatalogSnapshot,
) -> Result<ValidatedDeath, ValidationError> {
    let animal_tag = parse_tag(&request.animal_tag)?;
    let occurred_on = parse_date(&request.date)?;
    let location = require(&request.location, "location")?;
    let cause = require(&request.cause, "cause")?;

    Ok(ValidatedDeath {
        animal_tag,
        occurred_on,
        location: catalog.location_label(&location),
        cause,
    })
}

pub fn validate_movement(
    request: &MovementRequest,
    catalog: &CatalogSnapshot,
) -> Result<ValidatedMovement, ValidationError> {
    let subject = if request.animal_tag.trim().is_empty() {
        match request.quantity {
            Some(quantity) if quantity > 0 => MovementSubject::Headcount { quantity },
            Some(_) => {
                return Err(ValidationError::InvalidQuantity(
                    "headcount must be greater than zero".to_string(),
                ));
            }
            None => return Err(ValidationError::MissingRequiredField("quantity")),
        }
    } else {
        MovementSubject::Tagged {
            animal_tag: parse_tag(&request.animal_tag)?,
        }
    };
    let occurred_on = parse_date(&request.date)?;
    let location = require(&request.location, "location")?;

    Ok(ValidatedMovement {
        kind: request.kind,
        subject,
        occurred_on,
        location: catalog.location_label(&location),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::new()
            .with_medicine("Draxxin")
            .with_medicine("Flunixin")
            .with_location("c01", "Curral 01 - Engorda")
    }

    fn request() -> TreatmentRequest {
        TreatmentRequest {
            animal_tag: "123456-7".to_string(),
            date: "2026-05-10".to_string(),
            location: "c01".to_string(),
            conditions: vec!["Pneumonia".to_string(), "".to_string()],
            medications: vec![
                RequestedMedication::new("Draxxin", "200"),
                RequestedMedication::new("flunixin", "50,5"),
                RequestedMedication::default(),
            ],
        }
    }

    #[test]
    fn valid_request_resolves_codes_in_entry_order() {
        let ok = validate_treatment(&request(), &catalog()).unwrap();

        assert_eq!(ok.animal_tag.as_str(), "123456-7");
        assert_eq!(ok.location, "Curral 01 - Engorda");
        assert_eq!(ok.conditions, vec!["Pneumonia"]);
        let codes: Vec<&str> = ok.doses.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["draxxin", "flunixin"]);
        assert_eq!(ok.doses[1].dose.value(), 50.5);
    }

    #[test]
    fn malformed_tag_fails_first() {
        let mut req = request();
        req.animal_tag = "12345".to_string();
        req.date.clear();
        req.medications.clear();
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::InvalidAnimalTag("12345".to_string())
        );
    }

    #[test]
    fn date_and_location_are_required() {
        let mut req = request();
        req.date = "  ".to_string();
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::MissingRequiredField("date")
        );

        let mut req = request();
        req.date = "10/05/2026".to_string();
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::MissingRequiredField("date")
        );

        let mut req = request();
        req.location = String::new();
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::MissingRequiredField("location")
        );
    }

    #[test]
    fn needs_at_least_one_positive_dose() {
        let mut req = request();
        req.medications = vec![RequestedMedication::new("Draxxin", "")];
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::NoMedicationSpecified
        );

        let mut req = request();
        req.medications = vec![RequestedMedication::new("Draxxin", "0")];
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::NoMedicationSpecified
        );
    }

    #[test]
    fn dose_rule_runs_before_medicine_lookup() {
        let mut req = request();
        req.medications = vec![
            RequestedMedication::new("Unobtainium", "5"),
            RequestedMedication::new("Draxxin", "-1"),
        ];
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::NoMedicationSpecified
        );
    }

    #[test]
    fn unknown_medicine_is_named() {
        let mut req = request();
        req.medications.push(RequestedMedication::new("Zuprevo", "10"));
        assert_eq!(
            validate_treatment(&req, &catalog()).unwrap_err(),
            ValidationError::UnknownMedicine("Zuprevo".to_string())
        );
    }

    #[test]
    fn death_requires_cause() {
        let req = DeathRequest {
            animal_tag: "654321-0".to_string(),
            date: "2026-05-11".to_string(),
            location: "c01".to_string(),
            cause: " ".to_string(),
        };
        assert_eq!(
            validate_death(&req, &catalog()).unwrap_err(),
            ValidationError::MissingRequiredField("cause")
        );
    }

    #[test]
    fn movement_by_headcount_or_tag() {
        let mut req = MovementRequest {
            kind: MovementKind::Slaughter,
            animal_tag: String::new(),
            quantity: Some(25),
            date: "2026-05-12".to_string(),
            location: "c01".to_string(),
        };
        let ok = validate_movement(&req, &catalog()).unwrap();
        assert_eq!(ok.subject, MovementSubject::Headcount { quantity: 25 });

        req.quantity = Some(0);
        assert!(matches!(
            validate_movement(&req, &catalog()).unwrap_err(),
            ValidationError::InvalidQuantity(_)
        ));

        req.quantity = None;
        req.animal_tag = "111111-1".to_string();
        let ok = validate_movement(&req, &catalog()).unwrap();
        assert_eq!(ok.subject.head_count(), 1);
    }
}
