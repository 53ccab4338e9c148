use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use boimedicado_core::UnitId;

use crate::job::AiJob;
use crate::result::{Advisory, AdvisoryError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosedMedicine {
    pub name: String,
    pub dose_ml: f64,
}

/// What the generator gets to see of a treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSummary {
    pub diagnoses: Vec<String>,
    pub medications: Vec<DosedMedicine>,
    pub location: String,
}

/// Prompt sent to a text model for one treatment.
///
/// Asks for at most three sentences in Brazilian Portuguese on whether the
/// medicines fit the diagnoses.
pub fn build_prompt(summary: &TreatmentSummary) -> String {
    let medications = summary
        .medications
        .iter()
        .map(|m| format!("{} (Dose: {} mL)", m.name, m.dose_ml))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analise o seguinte registro de sanidade animal em um confinamento bovino:\n\
         - Doenças Identificadas: {}\n\
         - Medicamentos Prescritos: {}\n\
         - Local: {}\n\n\
         Como um veterinário especialista, forneça uma análise rápida (máximo 3 sentenças) \
         sobre a compatibilidade do tratamento com as enfermidades citadas e se há alguma \
         observação crítica.\n\
         Responda em Português do Brasil.",
        summary.diagnoses.join(", "),
        medications,
        summary.location,
    )
}

/// Produces advisory text for a treatment summary.
///
/// Implementations may call out to a remote model; callers treat any error as
/// "no advice".
pub trait AdvisoryGenerator: Send + Sync {
    fn advise(&self, summary: &TreatmentSummary) -> Result<Advisory, AdvisoryError>;
}

impl<T: AdvisoryGenerator + ?Sized> AdvisoryGenerator for Arc<T> {
    fn advise(&self, summary: &TreatmentSummary) -> Result<Advisory, AdvisoryError> {
        (**self).advise(summary)
    }
}

/// Fixed-answer generator for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAdvisor {
    text: Option<String>,
}

impl StaticAdvisor {
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// An advisor with no backing model; every call fails.
    pub fn unconfigured() -> Self {
        Self { text: None }
    }
}

impl AdvisoryGenerator for StaticAdvisor {
    fn advise(&self, summary: &TreatmentSummary) -> Result<Advisory, AdvisoryError> {
        let text = self.text.as_ref().ok_or(AdvisoryError::NotConfigured)?;
        Ok(Advisory::new(text.clone()).with_metadata(json!({
            "generator": "static",
            "prompt_chars": build_prompt(summary).chars().count(),
        })))
    }
}

/// Runs a generator against one treatment summary.
pub struct TreatmentAdvisoryJob {
    unit_id: UnitId,
    input: TreatmentSummary,
    generator: Arc<dyn AdvisoryGenerator>,
}

impl TreatmentAdvisoryJob {
    pub fn new(unit_id: UnitId, input: TreatmentSummary, generator: Arc<dyn AdvisoryGenerator>) -> Self {
        Self {
            unit_id,
            input,
            generator,
        }
    }
}

impl AiJob for TreatmentAdvisoryJob {
    type Input = TreatmentSummary;

    fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    fn input(&self) -> &Self::Input {
        &self.input
    }

    fn run(&self) -> Result<Advisory, AdvisoryError> {
        if self.input.medications.is_empty() {
            return Err(AdvisoryError::InvalidInput("treatment has no medications".to_string()));
        }
        let advisory = self.generator.advise(&self.input)?;
        if advisory.text.trim().is_empty() {
            return Err(AdvisoryError::GenerationFailed("empty advisory text".to_string()));
        }
        Ok(advisory)
    }
}
