use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use boimedicado_core::{DomainError, Entity, UnitId};

/// One feedlot: the tenant boundary for stock and ledger data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmUnit {
    pub unit_id: UnitId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FarmUnit {
    /// A new, active unit licensed for `valid_for` from `now`.
    pub fn open(name: &str, now: DateTime<Utc>, valid_for: Duration) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("unit name cannot be empty"));
        }
        if valid_for <= Duration::zero() {
            return Err(DomainError::validation("unit validity must be positive"));
        }
        Ok(Self {
            unit_id: UnitId::new(),
            name: name.to_string(),
            active: true,
            created_at: now,
            expires_at: shifted(now, valid_for)?,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active and not past its expiry.
    pub fn is_accessible(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    /// Push the expiry forward; an already expired unit restarts from `now`.
    pub fn extend(&mut self, now: DateTime<Utc>, by: Duration) -> Result<(), DomainError> {
        if by <= Duration::zero() {
            return Err(DomainError::validation("extension must be positive"));
        }
        let base = if self.is_expired(now) { now } else { self.expires_at };
        self.expires_at = shifted(base, by)?;
        Ok(())
    }
}

fn shifted(from: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>, DomainError> {
    from.checked_add_signed(by)
        .ok_or_else(|| DomainError::validation("validity out of range"))
}

impl Entity for FarmUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.unit_id
    }
}
