use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use boimedicado_core::UnitId;

use crate::entry::{LedgerRecord, RecordKind};
use crate::tag::AnimalTag;

/// Filter for ledger reads. The unit scope is mandatory; everything else
/// narrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub unit_id: UnitId,
    /// Inclusive lower bound on `occurred_on`.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `occurred_on`.
    pub to: Option<NaiveDate>,
    /// Empty means every kind.
    pub kinds: Vec<RecordKind>,
    pub location: Option<String>,
    pub animal_tag: Option<AnimalTag>,
    pub limit: Option<usize>,
}

impl LedgerQuery {
    pub fn for_unit(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            from: None,
            to: None,
            kinds: Vec::new(),
            location: None,
            animal_tag: None,
            limit: None,
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn of_kind(mut self, kind: RecordKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn for_animal(mut self, animal_tag: AnimalTag) -> Self {
        self.animal_tag = Some(animal_tag);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &LedgerRecord) -> bool {
        if record.unit_id() != self.unit_id {
            return false;
        }
        let entry = record.entry();
        let day = entry.occurred_on();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&entry.kind()) {
            return false;
        }
        if let Some(location) = &self.location {
            if entry.location() != location {
                return false;
            }
        }
        if let Some(tag) = &self.animal_tag {
            if entry.animal_tag() != Some(tag) {
                return false;
            }
        }
        true
    }

    /// Filter, order most-recent-first and apply the limit.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a LedgerRecord>) -> Vec<LedgerRecord> {
        let mut selected: Vec<LedgerRecord> =
            records.into_iter().filter(|r| self.matches(r)).cloned().collect();
        selected.sort_by(most_recent_first);
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Descending commit time; equal timestamps fall back to descending insertion
/// sequence so the order is total and stable.
pub fn most_recent_first(a: &LedgerRecord, b: &LedgerRecord) -> Ordering {
    b.recorded_at_millis()
        .cmp(&a.recorded_at_millis())
        .then_with(|| b.sequence().cmp(&a.sequence()))
}
