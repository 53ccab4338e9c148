//! Treatment commit pipeline.
//!
//! ```text
//! Actor + raw form
//!   ↓
//! 1. Authorize and check the farm unit is accessible
//!   ↓
//! 2. Validate against the unit's catalog snapshot (no store calls yet)
//!   ↓
//! 3. Lock every touched medicine row, debit in entry order on staged copies
//!   ↓
//! 4. Append the ledger record while the rows are still locked
//!   ↓
//! 5. Publish staged stock, release locks
//! ```
//!
//! Any failure before step 5 leaves stock and ledger exactly as they were.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use boimedicado_ai::{Advisory, AdvisoryGenerator, AiJob, DosedMedicine, TreatmentAdvisoryJob, TreatmentSummary};
use boimedicado_auth::{Actor, AuthzError, Permission, authorize};
use boimedicado_core::{DomainError, ExpectedVersion, RecordId, UnitId};
use boimedicado_ledger::{
    AnimalTag, DeathRequest, LedgerEntry, LedgerQuery, LedgerRecord, MedicationLine, MovementRequest, RecordKind,
    TreatmentRequest, ValidatedDeath, ValidatedMovement, ValidatedTreatment, ValidationError, validate_death,
    validate_movement, validate_treatment,
};
use boimedicado_pharmacy::{
    CreateMedicine, MedicineCode, MedicineStock, Millilitres, Rename, Reprice, Restock, Retire, StockCommand,
};

use crate::catalog::{CatalogError, CatalogSource};
use crate::config::LedgerConfig;
use crate::ledger_store::{LedgerStore, LedgerStoreError, UncommittedRecord};
use crate::reporting::{DashboardFilter, DashboardSummary, recent_feed};
use crate::stock_store::{StockStore, StockStoreError};
use crate::units::{UnitDirectory, UnitDirectoryError};

/// Flat failure kind, for callers that branch rather than format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitErrorKind {
    InvalidAnimalTag,
    MissingRequiredField,
    NoMedicationSpecified,
    UnknownMedicine,
    InvalidQuantity,
    InsufficientStock,
    UnitUnavailable,
    Unauthorized,
    NotFound,
    AlreadyReversed,
    Rejected,
    TransactionConflict,
    StoreUnavailable,
}

/// Why a write was refused. State is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("insufficient stock of {code}: requested {requested}, on hand {on_hand}, short by {shortfall}")]
    InsufficientStock {
        code: MedicineCode,
        requested: Millilitres,
        on_hand: Millilitres,
        shortfall: Millilitres,
    },

    #[error("farm unit {unit_id} is unavailable: {reason}")]
    UnitUnavailable { unit_id: UnitId, reason: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    #[error("treatment {0} has already been reversed")]
    AlreadyReversed(RecordId),

    #[error("rejected: {0}")]
    Rejected(DomainError),

    /// Retry the whole call; validation runs again against fresh stock.
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CommitError {
    pub fn kind(&self) -> CommitErrorKind {
        match self {
            CommitError::Invalid(v) => match v {
                ValidationError::InvalidAnimalTag(_) => CommitErrorKind::InvalidAnimalTag,
                ValidationError::MissingRequiredField(_) => CommitErrorKind::MissingRequiredField,
                ValidationError::NoMedicationSpecified => CommitErrorKind::NoMedicationSpecified,
                ValidationError::UnknownMedicine(_) => CommitErrorKind::UnknownMedicine,
                ValidationError::InvalidQuantity(_) => CommitErrorKind::InvalidQuantity,
            },
            CommitError::InsufficientStock { .. } => CommitErrorKind::InsufficientStock,
            CommitError::UnitUnavailable { .. } => CommitErrorKind::UnitUnavailable,
            CommitError::Unauthorized(_) => CommitErrorKind::Unauthorized,
            CommitError::RecordNotFound(_) => CommitErrorKind::NotFound,
            CommitError::AlreadyReversed(_) => CommitErrorKind::AlreadyReversed,
            CommitError::Rejected(_) => CommitErrorKind::Rejected,
            CommitError::TransactionConflict(_) => CommitErrorKind::TransactionConflict,
            CommitError::StoreUnavailable(_) => CommitErrorKind::StoreUnavailable,
        }
    }

    /// Safe to resubmit unchanged (infrastructure hiccup, not bad input).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            CommitErrorKind::TransactionConflict | CommitErrorKind::StoreUnavailable
        )
    }
}

impl From<StockStoreError> for CommitError {
    fn from(value: StockStoreError) -> Self {
        match value {
            StockStoreError::NotFound(code) => CommitError::Invalid(ValidationError::UnknownMedicine(code.to_string())),
            StockStoreError::InsufficientStock {
                code,
                requested,
                on_hand,
            } => CommitError::InsufficientStock {
                shortfall: Millilitres::new(requested.value() - on_hand.value()).unwrap_or(Millilitres::ZERO),
                code,
                requested,
                on_hand,
            },
            StockStoreError::Domain(DomainError::Conflict(msg)) => CommitError::TransactionConflict(msg),
            StockStoreError::Domain(other) => CommitError::Rejected(other),
            StockStoreError::Unavailable(msg) => CommitError::StoreUnavailable(msg),
        }
    }
}

impl From<LedgerStoreError> for CommitError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::Duplicate(id) => CommitError::TransactionConflict(format!("record {id} already exists")),
            LedgerStoreError::TenantIsolation(msg) => CommitError::Unauthorized(msg),
            LedgerStoreError::Unavailable(msg) => CommitError::StoreUnavailable(msg),
            LedgerStoreError::Publish { reason, .. } => {
                CommitError::StoreUnavailable(format!("publication failed: {reason}"))
            }
        }
    }
}

impl From<AuthzError> for CommitError {
    fn from(value: AuthzError) -> Self {
        CommitError::Unauthorized(value.to_string())
    }
}

impl From<CatalogError> for CommitError {
    fn from(value: CatalogError) -> Self {
        CommitError::StoreUnavailable(value.to_string())
    }
}

impl From<UnitDirectoryError> for CommitError {
    fn from(value: UnitDirectoryError) -> Self {
        match value {
            UnitDirectoryError::NotFound(unit_id) => CommitError::UnitUnavailable {
                unit_id,
                reason: "unknown unit".to_string(),
            },
            UnitDirectoryError::Forbidden(msg) => CommitError::Unauthorized(msg),
            UnitDirectoryError::Domain(err) => CommitError::Rejected(err),
            UnitDirectoryError::Unavailable(msg) => CommitError::StoreUnavailable(msg),
        }
    }
}

/// Composes the catalog, stock store and ledger into atomic commits.
///
/// Calls block until the commit either lands or is rolled back; there is no
/// mid-flight cancellation.
pub struct TreatmentCoordinator<S, L> {
    stock: S,
    ledger: L,
    catalog: Arc<dyn CatalogSource>,
    units: Option<Arc<dyn UnitDirectory>>,
    advisor: Option<Arc<dyn AdvisoryGenerator>>,
    config: LedgerConfig,
}

impl<S, L> TreatmentCoordinator<S, L> {
    pub fn new(stock: S, ledger: L, catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            stock,
            ledger,
            catalog,
            units: None,
            advisor: None,
            config: LedgerConfig::default(),
        }
    }

    /// Check unit status (active, expiry) before every write.
    pub fn with_units(mut self, units: Arc<dyn UnitDirectory>) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn AdvisoryGenerator>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stock(&self) -> &S {
        &self.stock
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, L) {
        (self.stock, self.ledger)
    }

    fn recorded_by(&self, actor: &Actor) -> String {
        actor.recorded_name(&self.config.system_actor).to_string()
    }

    fn admit(&self, actor: &Actor, permission: Permission) -> Result<UnitId, CommitError> {
        let unit_id = actor.unit_id;
        authorize(actor, unit_id, permission)?;

        let Some(units) = &self.units else {
            return Ok(unit_id);
        };
        let unit = units.get(unit_id)?.ok_or_else(|| CommitError::UnitUnavailable {
            unit_id,
            reason: "unknown unit".to_string(),
        })?;
        if !unit.active {
            return Err(CommitError::UnitUnavailable {
                unit_id,
                reason: "unit is suspended".to_string(),
            });
        }
        if self.config.enforce_unit_expiry && unit.is_expired(Utc::now()) {
            return Err(CommitError::UnitUnavailable {
                unit_id,
                reason: format!("access expired at {}", unit.expires_at),
            });
        }
        Ok(unit_id)
    }
}

impl<S, L> TreatmentCoordinator<S, L>
where
    S: StockStore,
    L: LedgerStore,
{
    /// Validate, debit every dose and append one treatment record, atomically.
    pub fn commit_treatment(&self, actor: &Actor, request: &TreatmentRequest) -> Result<LedgerRecord, CommitError> {
        let result = self.try_commit_treatment(actor, request);
        observe("treatment", actor.unit_id, result)
    }

    /// Commit, then ask the advisory generator about the stored record.
    ///
    /// Advice never affects the commit: generator failures are logged and
    /// come back as `None`.
    pub fn commit_treatment_with_advice(
        &self,
        actor: &Actor,
        request: &TreatmentRequest,
    ) -> Result<(LedgerRecord, Option<Advisory>), CommitError> {
        let record = self.commit_treatment(actor, request)?;
        let advisory = self.advise(&record);
        Ok((record, advisory))
    }

    /// Advisory text for a committed treatment, when a generator is set up.
    pub fn advise(&self, record: &LedgerRecord) -> Option<Advisory> {
        if !self.config.advisory_enabled {
            return None;
        }
        let advisor = self.advisor.as_ref()?;
        let summary = treatment_summary(record)?;

        let job = TreatmentAdvisoryJob::new(record.unit_id(), summary, Arc::clone(advisor));
        match job.run() {
            Ok(advisory) => Some(advisory),
            Err(err) => {
                warn!(record_id = %record.id(), error = %err, "advisory generation failed");
                None
            }
        }
    }

    pub fn record_death(&self, actor: &Actor, request: &DeathRequest) -> Result<LedgerRecord, CommitError> {
        let result = self.try_record_death(actor, request);
        observe("death", actor.unit_id, result)
    }

    pub fn record_movement(&self, actor: &Actor, request: &MovementRequest) -> Result<LedgerRecord, CommitError> {
        let result = self.try_record_movement(actor, request);
        observe("movement", actor.unit_id, result)
    }

    /// Compensate a committed treatment: restock its doses and append a
    /// `Reversal` entry. The original record is never touched, and a
    /// treatment can only be reversed once.
    pub fn reverse_treatment(
        &self,
        actor: &Actor,
        record_id: RecordId,
        reason: &str,
    ) -> Result<LedgerRecord, CommitError> {
        let result = self.try_reverse_treatment(actor, record_id, reason);
        observe("reversal", actor.unit_id, result)
    }

    pub fn create_medicine(
        &self,
        actor: &Actor,
        name: &str,
        initial_quantity: Millilitres,
        unit_cost: f64,
    ) -> Result<MedicineStock, CommitError> {
        let unit_id = self.admit(actor, Permission::ManagePharmacy)?;
        let command = StockCommand::CreateMedicine(CreateMedicine {
            unit_id,
            name: name.to_string(),
            initial_quantity,
            unit_cost,
            occurred_at: Utc::now(),
        });
        self.administer(unit_id, command, ExpectedVersion::Exact(0))
    }

    pub fn restock(
        &self,
        actor: &Actor,
        code: &MedicineCode,
        amount: Millilitres,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, CommitError> {
        let unit_id = self.admit(actor, Permission::ManagePharmacy)?;
        let command = StockCommand::Restock(Restock {
            unit_id,
            code: code.clone(),
            amount,
            occurred_at: Utc::now(),
        });
        self.administer(unit_id, command, expected)
    }

    pub fn rename_medicine(
        &self,
        actor: &Actor,
        code: &MedicineCode,
        display_name: &str,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, CommitError> {
        let unit_id = self.admit(actor, Permission::ManagePharmacy)?;
        let command = StockCommand::Rename(Rename {
            unit_id,
            code: code.clone(),
            display_name: display_name.to_string(),
            occurred_at: Utc::now(),
        });
        self.administer(unit_id, command, expected)
    }

    /// New price per mL. Already committed treatments keep their cost.
    pub fn reprice_medicine(
        &self,
        actor: &Actor,
        code: &MedicineCode,
        unit_cost: f64,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, CommitError> {
        let unit_id = self.admit(actor, Permission::ManagePharmacy)?;
        let command = StockCommand::Reprice(Reprice {
            unit_id,
            code: code.clone(),
            unit_cost,
            occurred_at: Utc::now(),
        });
        self.administer(unit_id, command, expected)
    }

    /// Soft-disable: the row stays for history but can no longer be debited.
    pub fn retire_medicine(
        &self,
        actor: &Actor,
        code: &MedicineCode,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, CommitError> {
        let unit_id = self.admit(actor, Permission::ManagePharmacy)?;
        let command = StockCommand::Retire(Retire {
            unit_id,
            code: code.clone(),
            occurred_at: Utc::now(),
        });
        self.administer(unit_id, command, expected)
    }

    /// Medicine labels the unit's protocol prescribes for `diagnosis`, to
    /// prefill a treatment form. Entries the catalog no longer carries are
    /// skipped; a diagnosis outside the catalog is rejected.
    pub fn suggested_medications(&self, actor: &Actor, diagnosis: &str) -> Result<Vec<String>, CommitError> {
        let unit_id = self.admit(actor, Permission::RecordTreatment)?;
        let catalog = self.catalog.snapshot(unit_id)?;
        if !catalog.knows_disease(diagnosis) {
            return Err(CommitError::Rejected(DomainError::validation(format!(
                "unknown diagnosis {}",
                diagnosis.trim()
            ))));
        }
        Ok(catalog
            .suggested_medications(diagnosis)
            .iter()
            .filter_map(|label| catalog.resolve_medicine(label))
            .map(|medicine| medicine.label.clone())
            .collect())
    }

    pub fn stock_levels(&self, actor: &Actor) -> Result<Vec<MedicineStock>, CommitError> {
        Ok(self.stock.list(actor.unit_id)?)
    }

    /// Newest records first; capped at the configured limit for roles that
    /// may not see the full ledger.
    pub fn recent_feed(&self, actor: &Actor) -> Result<Vec<LedgerRecord>, CommitError> {
        Ok(recent_feed(&self.ledger, actor, &self.config)?)
    }

    pub fn dashboard(&self, actor: &Actor, filter: &DashboardFilter) -> Result<DashboardSummary, CommitError> {
        let query = filter.to_query(actor.unit_id).map_err(CommitError::Rejected)?;
        let records = self.ledger.query(&query)?;
        Ok(DashboardSummary::from_records(&records))
    }

    fn try_commit_treatment(&self, actor: &Actor, request: &TreatmentRequest) -> Result<LedgerRecord, CommitError> {
        let unit_id = self.admit(actor, Permission::RecordTreatment)?;
        let catalog = self.catalog.snapshot(unit_id)?;
        let ValidatedTreatment {
            animal_tag,
            occurred_on,
            location,
            conditions,
            doses,
        } = validate_treatment(request, &catalog)?;

        let codes: Vec<MedicineCode> = doses.iter().map(|d| d.code.clone()).collect();
        let recorded_by = self.recorded_by(actor);

        self.stock.transaction(unit_id, &codes, |tx| {
            // Stamped once the rows are held, so commit time follows lock order.
            let now = Utc::now();
            let mut medications = Vec::with_capacity(doses.len());
            for planned in &doses {
                let remaining = tx.debit(&planned.code, planned.dose, now)?;
                let row = tx.get(&planned.code)?;
                debug!(
                    unit_id = %unit_id,
                    code = %planned.code,
                    dose_ml = planned.dose.value(),
                    remaining_ml = remaining.value(),
                    "dose debited"
                );
                medications.push(MedicationLine {
                    medicine_code: planned.code.clone(),
                    medicine_name: row.display_name().to_string(),
                    dose: planned.dose,
                    cost_at_time: row.cost_of(planned.dose),
                });
            }

            let entry = LedgerEntry::Treatment {
                animal_tag,
                occurred_on,
                location,
                conditions,
                medications,
            };
            self.append(UncommittedRecord::new(unit_id, recorded_by, entry).recorded_at(now.timestamp_millis()))
        })
    }

    fn try_record_death(&self, actor: &Actor, request: &DeathRequest) -> Result<LedgerRecord, CommitError> {
        let unit_id = self.admit(actor, Permission::RecordDeath)?;
        let catalog = self.catalog.snapshot(unit_id)?;
        let ValidatedDeath {
            animal_tag,
            occurred_on,
            location,
            cause,
        } = validate_death(request, &catalog)?;

        let entry = LedgerEntry::Death {
            animal_tag,
            occurred_on,
            location,
            cause,
        };
        self.append(UncommittedRecord::new(unit_id, self.recorded_by(actor), entry))
    }

    fn try_record_movement(&self, actor: &Actor, request: &MovementRequest) -> Result<LedgerRecord, CommitError> {
        let unit_id = self.admit(actor, Permission::RecordMovement)?;
        let catalog = self.catalog.snapshot(unit_id)?;
        let ValidatedMovement {
            kind,
            subject,
            occurred_on,
            location,
        } = validate_movement(request, &catalog)?;

        let entry = LedgerEntry::Movement {
            subject,
            occurred_on,
            location,
            kind,
        };
        self.append(UncommittedRecord::new(unit_id, self.recorded_by(actor), entry))
    }

    fn try_reverse_treatment(
        &self,
        actor: &Actor,
        record_id: RecordId,
        reason: &str,
    ) -> Result<LedgerRecord, CommitError> {
        let unit_id = self.admit(actor, Permission::ReverseTreatment)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingRequiredField("reason").into());
        }

        let original = self
            .ledger
            .get(unit_id, record_id)?
            .ok_or(CommitError::RecordNotFound(record_id))?;
        let LedgerEntry::Treatment {
            animal_tag,
            occurred_on,
            location,
            medications,
            ..
        } = original.entry()
        else {
            return Err(CommitError::Rejected(DomainError::validation(
                "only treatments can be reversed",
            )));
        };

        let codes: Vec<MedicineCode> = medications.iter().map(|m| m.medicine_code.clone()).collect();
        let recorded_by = self.recorded_by(actor);

        // The reversal check runs under the row locks so two concurrent
        // reversals of one treatment cannot both pass it.
        self.stock.transaction(unit_id, &codes, |tx| {
            let now = Utc::now();
            if self.is_reversed(unit_id, animal_tag.clone(), record_id)? {
                return Err(CommitError::AlreadyReversed(record_id));
            }
            for line in medications {
                let on_hand = tx.restock(&line.medicine_code, line.dose, now)?;
                debug!(
                    unit_id = %unit_id,
                    code = %line.medicine_code,
                    dose_ml = line.dose.value(),
                    on_hand_ml = on_hand.value(),
                    "dose restocked"
                );
            }

            let entry = LedgerEntry::Reversal {
                reverses: record_id,
                animal_tag: animal_tag.clone(),
                occurred_on: *occurred_on,
                location: location.clone(),
                reason: reason.to_string(),
                restocked: medications.clone(),
            };
            self.append(UncommittedRecord::new(unit_id, recorded_by, entry).recorded_at(now.timestamp_millis()))
        })
    }

    fn is_reversed(
        &self,
        unit_id: UnitId,
        animal_tag: AnimalTag,
        record_id: RecordId,
    ) -> Result<bool, CommitError> {
        let query = LedgerQuery::for_unit(unit_id)
            .of_kind(RecordKind::Reversal)
            .for_animal(animal_tag);
        let reversals = self.ledger.query(&query)?;
        Ok(reversals
            .iter()
            .any(|r| matches!(r.entry(), LedgerEntry::Reversal { reverses, .. } if *reverses == record_id)))
    }

    /// Append; a record that is stored but failed to publish still counts
    /// as committed.
    fn append(&self, record: UncommittedRecord) -> Result<LedgerRecord, CommitError> {
        match self.ledger.append(record) {
            Ok(stored) => Ok(stored),
            Err(LedgerStoreError::Publish { record, reason }) => {
                warn!(record_id = %record.id(), reason = %reason, "record stored but not published");
                Ok(*record)
            }
            Err(other) => Err(other.into()),
        }
    }

    fn administer(
        &self,
        unit_id: UnitId,
        command: StockCommand,
        expected: ExpectedVersion,
    ) -> Result<MedicineStock, CommitError> {
        let operation = stock_operation(&command);
        match self.stock.execute(unit_id, command, expected) {
            Ok(stock) => {
                info!(
                    unit_id = %unit_id,
                    code = %stock.code(),
                    operation,
                    on_hand_ml = stock.quantity_on_hand().value(),
                    "stock updated"
                );
                Ok(stock)
            }
            Err(err) => {
                let err = CommitError::from(err);
                warn!(unit_id = %unit_id, operation, kind = ?err.kind(), error = %err, "stock update rejected");
                Err(err)
            }
        }
    }
}

fn observe(
    operation: &'static str,
    unit_id: UnitId,
    result: Result<LedgerRecord, CommitError>,
) -> Result<LedgerRecord, CommitError> {
    match &result {
        Ok(record) => info!(
            unit_id = %unit_id,
            record_id = %record.id(),
            operation,
            lines = record.entry().medications().len(),
            "ledger entry committed"
        ),
        Err(err) => warn!(unit_id = %unit_id, operation, kind = ?err.kind(), error = %err, "commit rejected"),
    }
    result
}

fn stock_operation(command: &StockCommand) -> &'static str {
    match command {
        StockCommand::CreateMedicine(_) => "create",
        StockCommand::Restock(_) => "restock",
        StockCommand::Debit(_) => "debit",
        StockCommand::Rename(_) => "rename",
        StockCommand::Reprice(_) => "reprice",
        StockCommand::Retire(_) => "retire",
    }
}

fn treatment_summary(record: &LedgerRecord) -> Option<TreatmentSummary> {
    match record.entry() {
        LedgerEntry::Treatment {
            conditions,
            location,
            medications,
            ..
        } => Some(TreatmentSummary {
            diagnoses: conditions.clone(),
            medications: medications
                .iter()
                .map(|m| DosedMedicine {
                    name: m.medicine_name.clone(),
                    dose_ml: m.dose.value(),
                })
                .collect(),
            location: location.clone(),
        }),
        _ => None,
    }
}
