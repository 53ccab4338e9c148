//! Farm-unit directory: the super-admin console's view of tenants.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use boimedicado_auth::{Actor, Permission};
use boimedicado_core::{DomainError, UnitId};

pub use boimedicado_auth::FarmUnit;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitDirectoryError {
    #[error("farm unit {0} not found")]
    NotFound(UnitId),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("unit directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup used by the coordinator before every write.
pub trait UnitDirectory: Send + Sync {
    fn get(&self, unit_id: UnitId) -> Result<Option<FarmUnit>, UnitDirectoryError>;
}

impl<S> UnitDirectory for Arc<S>
where
    S: UnitDirectory + ?Sized,
{
    fn get(&self, unit_id: UnitId) -> Result<Option<FarmUnit>, UnitDirectoryError> {
        (**self).get(unit_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUnitDirectory {
    units: RwLock<HashMap<UnitId, FarmUnit>>,
}

fn require_admin(actor: &Actor) -> Result<(), UnitDirectoryError> {
    if actor.role.allows(Permission::ManageUnits) {
        Ok(())
    } else {
        Err(UnitDirectoryError::Forbidden(format!(
            "{} may not manage farm units",
            actor.role
        )))
    }
}

fn poisoned<T>(_: T) -> UnitDirectoryError {
    UnitDirectoryError::Unavailable("lock poisoned".to_string())
}

impl InMemoryUnitDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        actor: &Actor,
        name: &str,
        now: DateTime<Utc>,
        valid_for: Duration,
    ) -> Result<FarmUnit, UnitDirectoryError> {
        require_admin(actor)?;
        let unit = FarmUnit::open(name, now, valid_for)?;
        self.units
            .write()
            .map_err(poisoned)?
            .insert(unit.unit_id, unit.clone());
        tracing::info!(unit_id = %unit.unit_id, name = %unit.name, "farm unit created");
        Ok(unit)
    }

    /// Suspend or reactivate a unit.
    pub fn set_active(&self, actor: &Actor, unit_id: UnitId, active: bool) -> Result<FarmUnit, UnitDirectoryError> {
        require_admin(actor)?;
        self.update(unit_id, |unit| {
            unit.active = active;
            Ok(())
        })
    }

    pub fn extend(
        &self,
        actor: &Actor,
        unit_id: UnitId,
        now: DateTime<Utc>,
        by: Duration,
    ) -> Result<FarmUnit, UnitDirectoryError> {
        require_admin(actor)?;
        self.update(unit_id, |unit| unit.extend(now, by))
    }

    /// All units, by name.
    pub fn list(&self) -> Result<Vec<FarmUnit>, UnitDirectoryError> {
        let units = self.units.read().map_err(poisoned)?;
        let mut out: Vec<FarmUnit> = units.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn update(
        &self,
        unit_id: UnitId,
        change: impl FnOnce(&mut FarmUnit) -> Result<(), DomainError>,
    ) -> Result<FarmUnit, UnitDirectoryError> {
        let mut units = self.units.write().map_err(poisoned)?;
        let unit = units.get_mut(&unit_id).ok_or(UnitDirectoryError::NotFound(unit_id))?;
        let mut staged = unit.clone();
        change(&mut staged)?;
        *unit = staged.clone();
        Ok(staged)
    }
}

impl UnitDirectory for InMemoryUnitDirectory {
    fn get(&self, unit_id: UnitId) -> Result<Option<FarmUnit>, UnitDirectoryError> {
        let units = self.units.read().map_err(poisoned)?;
        Ok(units.get(&unit_id).cloned())
    }
}
