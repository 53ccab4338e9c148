use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boimedicado_core::{Aggregate, AggregateRoot, DomainError, UnitId};
use boimedicado_events::Event;

use crate::code::{MedicineCode, Millilitres};

/// Aggregate root: the on-hand stock of one medicine in one farm unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineStock {
    code: MedicineCode,
    unit_id: Option<UnitId>,
    display_name: String,
    quantity_on_hand: Millilitres,
    /// Price per millilitre.
    unit_cost: f64,
    retired: bool,
    version: u64,
    created: bool,
}

impl MedicineStock {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(code: MedicineCode) -> Self {
        Self {
            code,
            unit_id: None,
            display_name: String::new(),
            quantity_on_hand: Millilitres::ZERO,
            unit_cost: 0.0,
            retired: false,
            version: 0,
            created: false,
        }
    }

    pub fn code(&self) -> &MedicineCode {
        &self.code
    }

    pub fn unit_id(&self) -> Option<UnitId> {
        self.unit_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn quantity_on_hand(&self) -> Millilitres {
        self.quantity_on_hand
    }

    pub fn unit_cost(&self) -> f64 {
        self.unit_cost
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Cost of administering `dose` at the current price.
    pub fn cost_of(&self, dose: Millilitres) -> f64 {
        dose.value() * self.unit_cost
    }
}

impl AggregateRoot for MedicineStock {
    type Id = MedicineCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Stock-level failures.
///
/// `InsufficientStock` is kept apart from [`DomainError`] because callers
/// report the medicine and the shortfall back to the operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockError {
    #[error("insufficient stock of {code}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        code: MedicineCode,
        requested: Millilitres,
        on_hand: Millilitres,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StockError {
    /// How much is missing for the request to succeed (zero for other errors).
    pub fn shortfall(&self) -> Millilitres {
        match self {
            StockError::InsufficientStock {
                requested, on_hand, ..
            } => Millilitres::new(requested.value() - on_hand.value()).unwrap_or(Millilitres::ZERO),
            StockError::Domain(_) => Millilitres::ZERO,
        }
    }
}

/// Command: CreateMedicine. The code is derived from `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMedicine {
    pub unit_id: UnitId,
    pub name: String,
    pub initial_quantity: Millilitres,
    pub unit_cost: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Restock (administrative increase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restock {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub amount: Millilitres,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Debit (dose administered in a treatment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debit {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub amount: Millilitres,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Rename (display name only; the code is stable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rename {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Reprice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reprice {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub unit_cost: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Retire (soft-disable; the row stays for ledger history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retire {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockCommand {
    CreateMedicine(CreateMedicine),
    Restock(Restock),
    Debit(Debit),
    Rename(Rename),
    Reprice(Reprice),
    Retire(Retire),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineCreated {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub display_name: String,
    pub initial_quantity: Millilitres,
    pub unit_cost: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restocked {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub amount: Millilitres,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDebited {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub amount: Millilitres,
    pub remaining: Millilitres,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRenamed {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRepriced {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub unit_cost: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRetired {
    pub unit_id: UnitId,
    pub code: MedicineCode,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockEvent {
    MedicineCreated(MedicineCreated),
    Restocked(Restocked),
    StockDebited(StockDebited),
    MedicineRenamed(MedicineRenamed),
    MedicineRepriced(MedicineRepriced),
    MedicineRetired(MedicineRetired),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::MedicineCreated(_) => "pharmacy.medicine.created",
            StockEvent::Restocked(_) => "pharmacy.stock.restocked",
            StockEvent::StockDebited(_) => "pharmacy.stock.debited",
            StockEvent::MedicineRenamed(_) => "pharmacy.medicine.renamed",
            StockEvent::MedicineRepriced(_) => "pharmacy.medicine.repriced",
            StockEvent::MedicineRetired(_) => "pharmacy.medicine.retired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::MedicineCreated(e) => e.occurred_at,
            StockEvent::Restocked(e) => e.occurred_at,
            StockEvent::StockDebited(e) => e.occurred_at,
            StockEvent::MedicineRenamed(e) => e.occurred_at,
            StockEvent::MedicineRepriced(e) => e.occurred_at,
            StockEvent::MedicineRetired(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MedicineStock {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = StockError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::MedicineCreated(e) => {
                self.code = e.code.clone();
                self.unit_id = Some(e.unit_id);
                self.display_name = e.display_name.clone();
                self.quantity_on_hand = e.initial_quantity;
                self.unit_cost = e.unit_cost;
                self.created = true;
            }
            StockEvent::Restocked(e) => {
                self.quantity_on_hand = self.quantity_on_hand.saturating_add(e.amount);
            }
            StockEvent::StockDebited(e) => {
                self.quantity_on_hand = e.remaining;
            }
            StockEvent::MedicineRenamed(e) => {
                self.display_name = e.display_name.clone();
            }
            StockEvent::MedicineRepriced(e) => {
                self.unit_cost = e.unit_cost;
            }
            StockEvent::MedicineRetired(_) => {
                self.retired = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::CreateMedicine(cmd) => self.handle_create(cmd),
            StockCommand::Restock(cmd) => self.handle_restock(cmd),
            StockCommand::Debit(cmd) => self.handle_debit(cmd),
            StockCommand::Rename(cmd) => self.handle_rename(cmd),
            StockCommand::Reprice(cmd) => self.handle_reprice(cmd),
            StockCommand::Retire(cmd) => self.handle_retire(cmd),
        }
    }
}

fn validate_unit_cost(unit_cost: f64) -> Result<(), DomainError> {
    if !unit_cost.is_finite() || unit_cost < 0.0 {
        return Err(DomainError::validation("unit cost must be a finite, non-negative number"));
    }
    Ok(())
}

impl MedicineStock {
    fn ensure_live(&self, unit_id: UnitId, code: &MedicineCode) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.unit_id != Some(unit_id) {
            return Err(DomainError::invariant("unit mismatch"));
        }
        if &self.code != code {
            return Err(DomainError::invariant("medicine code mismatch"));
        }
        Ok(())
    }

    fn ensure_not_retired(&self) -> Result<(), DomainError> {
        if self.retired {
            return Err(DomainError::invariant(format!("medicine {} is retired", self.code)));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateMedicine) -> Result<Vec<StockEvent>, StockError> {
        if self.created {
            return Err(DomainError::conflict(format!("medicine {} already exists", self.code)).into());
        }
        let display_name = cmd.name.trim();
        let code = MedicineCode::from_name(display_name)?;
        if code != self.code {
            return Err(DomainError::invariant("medicine code mismatch").into());
        }
        validate_unit_cost(cmd.unit_cost)?;

        Ok(vec![StockEvent::MedicineCreated(MedicineCreated {
            unit_id: cmd.unit_id,
            code,
            display_name: display_name.to_string(),
            initial_quantity: cmd.initial_quantity,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restock(&self, cmd: &Restock) -> Result<Vec<StockEvent>, StockError> {
        self.ensure_live(cmd.unit_id, &cmd.code)?;
        self.ensure_not_retired()?;
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("restock amount must be greater than zero").into());
        }

        Ok(vec![StockEvent::Restocked(Restocked {
            unit_id: cmd.unit_id,
            code: cmd.code.clone(),
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_debit(&self, cmd: &Debit) -> Result<Vec<StockEvent>, StockError> {
        self.ensure_live(cmd.unit_id, &cmd.code)?;
        self.ensure_not_retired()?;
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("debit amount must be greater than zero").into());
        }

        let remaining = self.quantity_on_hand.checked_sub(cmd.amount).ok_or_else(|| {
            StockError::InsufficientStock {
                code: cmd.code.clone(),
                requested: cmd.amount,
                on_hand: self.quantity_on_hand,
            }
        })?;

        Ok(vec![StockEvent::StockDebited(StockDebited {
            unit_id: cmd.unit_id,
            code: cmd.code.clone(),
            amount: cmd.amount,
            remaining,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &Rename) -> Result<Vec<StockEvent>, StockError> {
        self.ensure_live(cmd.unit_id, &cmd.code)?;
        let display_name = cmd.display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty").into());
        }

        Ok(vec![StockEvent::MedicineRenamed(MedicineRenamed {
            unit_id: cmd.unit_id,
            code: cmd.code.clone(),
            display_name: display_name.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reprice(&self, cmd: &Reprice) -> Result<Vec<StockEvent>, StockError> {
        self.ensure_live(cmd.unit_id, &cmd.code)?;
        validate_unit_cost(cmd.unit_cost)?;

        Ok(vec![StockEvent::MedicineRepriced(MedicineRepriced {
            unit_id: cmd.unit_id,
            code: cmd.code.clone(),
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_retire(&self, cmd: &Retire) -> Result<Vec<StockEvent>, StockError> {
        self.ensure_live(cmd.unit_id, &cmd.code)?;
        if self.retired {
            return Ok(vec![]);
        }

        Ok(vec![StockEvent::MedicineRetired(MedicineRetired {
            unit_id: cmd.unit_id,
            code: cmd.code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boimedicado_core::aggregate::execute;
    use proptest::prelude::*;

    fn ml(v: f64) -> Millilitres {
        Millilitres::new(v).unwrap()
    }

    fn code(name: &str) -> MedicineCode {
        MedicineCode::from_name(name).unwrap()
    }

    fn created(unit_id: UnitId, name: &str, quantity: f64, unit_cost: f64) -> MedicineStock {
        let mut stock = MedicineStock::empty(code(name));
        execute(
            &mut stock,
            &StockCommand::CreateMedicine(CreateMedicine {
                unit_id,
                name: name.to_string(),
                initial_quantity: ml(quantity),
                unit_cost,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        stock
    }

    fn debit(unit_id: UnitId, name: &str, amount: f64) -> StockCommand {
        StockCommand::Debit(Debit {
            unit_id,
            code: code(name),
            amount: ml(amount),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn create_sets_quantity_and_price() {
        let unit = UnitId::new();
        let stock = created(unit, "Draxxin", 500.0, 2.5);

        assert_eq!(stock.display_name(), "Draxxin");
        assert_eq!(stock.code().as_str(), "draxxin");
        assert_eq!(stock.quantity_on_hand(), ml(500.0));
        assert_eq!(stock.unit_cost(), 2.5);
        assert_eq!(stock.unit_id(), Some(unit));
        assert_eq!(stock.version(), 1);
    }

    #[test]
    fn create_twice_is_a_conflict() {
        let unit = UnitId::new();
        let stock = created(unit, "Draxxin", 500.0, 2.5);
        let err = stock
            .handle(&StockCommand::CreateMedicine(CreateMedicine {
                unit_id: unit,
                name: "Draxxin".to_string(),
                initial_quantity: ml(1.0),
                unit_cost: 1.0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn negative_price_is_rejected() {
        let stock = MedicineStock::empty(code("Zuprevo"));
        let err = stock
            .handle(&StockCommand::CreateMedicine(CreateMedicine {
                unit_id: UnitId::new(),
                name: "Zuprevo".to_string(),
                initial_quantity: ml(10.0),
                unit_cost: -1.0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn debit_reduces_stock() {
        let unit = UnitId::new();
        let mut stock = created(unit, "Draxxin", 500.0, 2.5);

        let events = execute(&mut stock, &debit(unit, "Draxxin", 200.0)).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(stock.quantity_on_hand(), ml(300.0));
    }

    #[test]
    fn overdraw_reports_shortfall_and_leaves_state() {
        let unit = UnitId::new();
        let mut stock = created(unit, "Draxxin", 100.0, 2.5);
        let before = stock.clone();

        let err = execute(&mut stock, &debit(unit, "Draxxin", 200.0)).unwrap_err();

        match &err {
            StockError::InsufficientStock {
                code, requested, on_hand,
            } => {
                assert_eq!(code.as_str(), "draxxin");
                assert_eq!(*requested, ml(200.0));
                assert_eq!(*on_hand, ml(100.0));
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
        assert_eq!(err.shortfall(), ml(100.0));
        assert_eq!(stock, before);
    }

    #[test]
    fn debit_from_other_unit_is_rejected() {
        let stock = created(UnitId::new(), "Draxxin", 100.0, 2.5);
        let err = stock.handle(&debit(UnitId::new(), "Draxxin", 1.0)).unwrap_err();
        assert!(matches!(err, StockError::Domain(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn retired_medicine_cannot_be_debited_or_restocked() {
        let unit = UnitId::new();
        let mut stock = created(unit, "Baytril", 100.0, 0.9);
        execute(
            &mut stock,
            &StockCommand::Retire(Retire {
                unit_id: unit,
                code: code("Baytril"),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert!(stock.is_retired());
        assert!(stock.handle(&debit(unit, "Baytril", 1.0)).is_err());
        assert!(
            stock
                .handle(&StockCommand::Restock(Restock {
                    unit_id: unit,
                    code: code("Baytril"),
                    amount: ml(10.0),
                    occurred_at: Utc::now(),
                }))
                .is_err()
        );
        // Retiring again is a no-op.
        assert!(
            stock
                .handle(&StockCommand::Retire(Retire {
                    unit_id: unit,
                    code: code("Baytril"),
                    occurred_at: Utc::now(),
                }))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn rename_keeps_code() {
        let unit = UnitId::new();
        let mut stock = created(unit, "Flunixin", 300.0, 0.4);
        execute(
            &mut stock,
            &StockCommand::Rename(Rename {
                unit_id: unit,
                code: code("Flunixin"),
                display_name: "Flunixin Meglumine".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(stock.display_name(), "Flunixin Meglumine");
        assert_eq!(stock.code().as_str(), "flunixin");
    }

    #[test]
    fn debit_on_missing_medicine_is_not_found() {
        let stock = MedicineStock::empty(code("Ghost"));
        let err = stock.handle(&debit(UnitId::new(), "Ghost", 1.0)).unwrap_err();
        assert_eq!(err, StockError::Domain(DomainError::NotFound));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Stock equals the initial quantity minus the successful debits only,
        /// and never drops below zero.
        #[test]
        fn stock_is_initial_minus_successful_debits(
            initial in 0u32..1_000,
            amounts in prop::collection::vec(1u32..200, 1..30)
        ) {
            let unit = UnitId::new();
            let mut stock = created(unit, "Draxxin", initial as f64, 1.0);
            let mut debited = 0u32;

            for amount in amounts {
                if execute(&mut stock, &debit(unit, "Draxxin", amount as f64)).is_ok() {
                    debited += amount;
                }
                prop_assert!(stock.quantity_on_hand().value() >= 0.0);
            }

            prop_assert_eq!(stock.quantity_on_hand().value(), (initial - debited) as f64);
        }
    }
}
