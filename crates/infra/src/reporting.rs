//! Read-side aggregation over ledger query results.
//!
//! Nothing here mutates state; it only counts what a [`LedgerQuery`] returns.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use boimedicado_auth::{Actor, Permission};
use boimedicado_core::{DomainError, RecordId, UnitId};
use boimedicado_ledger::{LedgerEntry, LedgerQuery, LedgerRecord, RecordKind, SyncState};
use boimedicado_pharmacy::MedicineCode;

use crate::config::LedgerConfig;
use crate::ledger_store::{LedgerStore, LedgerStoreError};

/// Dashboard filter: a year, optionally narrowed to a month, a location and
/// a record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilter {
    pub year: i32,
    /// 1..=12.
    pub month: Option<u32>,
    pub location: Option<String>,
    pub kind: Option<RecordKind>,
}

impl DashboardFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            month: None,
            location: None,
            kind: None,
        }
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn of_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn to_query(&self, unit_id: UnitId) -> Result<LedgerQuery, DomainError> {
        let (from, to) = self.bounds()?;
        let mut query = LedgerQuery::for_unit(unit_id).between(from, to);
        if let Some(location) = &self.location {
            query = query.at_location(location.clone());
        }
        if let Some(kind) = self.kind {
            query = query.of_kind(kind);
            if kind == RecordKind::Treatment {
                query = query.of_kind(RecordKind::Reversal);
            }
        }
        Ok(query)
    }

    fn bounds(&self) -> Result<(NaiveDate, NaiveDate), DomainError> {
        let invalid = || DomainError::validation(format!("invalid dashboard period {}/{:?}", self.year, self.month));
        let (first, span) = match self.month {
            Some(month) => (NaiveDate::from_ymd_opt(self.year, month, 1), Months::new(1)),
            None => (NaiveDate::from_ymd_opt(self.year, 1, 1), Months::new(12)),
        };
        let first = first.ok_or_else(invalid)?;
        let last = first
            .checked_add_months(span)
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;
        Ok((first, last))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineConsumption {
    pub code: MedicineCode,
    pub name: String,
    pub total_ml: f64,
    pub total_cost: f64,
}

/// Period totals.
///
/// A reversed treatment is left out entirely, as if never given; its
/// `Reversal` entry only shows up in `reversals` and `pending_sync`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Records in effect: treatments not reversed, deaths and movements.
    pub total_records: usize,
    pub treatments: usize,
    pub deaths: usize,
    pub reversals: usize,
    /// Deaths over `total_records`, in percent with one decimal.
    pub mortality_percent: f64,
    pub pending_sync: usize,
    /// Most frequent first, ties by label.
    pub diagnoses: Vec<DiagnosisCount>,
    /// Ordered by medicine code.
    pub consumption: Vec<MedicineConsumption>,
    /// Sum of frozen `cost_at_time` over treatments.
    pub treatment_cost: f64,
}

impl DashboardSummary {
    pub fn from_records(records: &[LedgerRecord]) -> Self {
        let reversed: HashSet<RecordId> = records
            .iter()
            .filter_map(|r| match r.entry() {
                LedgerEntry::Reversal { reverses, .. } => Some(*reverses),
                _ => None,
            })
            .collect();

        let mut summary = DashboardSummary::default();
        let mut diagnoses: HashMap<&str, usize> = HashMap::new();
        let mut consumption: BTreeMap<&MedicineCode, MedicineConsumption> = BTreeMap::new();

        for record in records {
            if record.sync_state() == SyncState::Pending {
                summary.pending_sync += 1;
            }
            match record.entry() {
                LedgerEntry::Treatment { .. } if reversed.contains(&record.id()) => {}
                LedgerEntry::Treatment {
                    conditions,
                    medications,
                    ..
                } => {
                    summary.total_records += 1;
                    summary.treatments += 1;
                    for condition in conditions {
                        *diagnoses.entry(condition.as_str()).or_default() += 1;
                    }
                    for line in medications {
                        let slot = consumption
                            .entry(&line.medicine_code)
                            .or_insert_with(|| MedicineConsumption {
                                code: line.medicine_code.clone(),
                                name: line.medicine_name.clone(),
                                total_ml: 0.0,
                                total_cost: 0.0,
                            });
                        slot.total_ml += line.dose.value();
                        slot.total_cost += line.cost_at_time;
                        summary.treatment_cost += line.cost_at_time;
                    }
                }
                LedgerEntry::Death { .. } => {
                    summary.total_records += 1;
                    summary.deaths += 1;
                }
                LedgerEntry::Movement { .. } => summary.total_records += 1,
                LedgerEntry::Reversal { .. } => summary.reversals += 1,
            }
        }

        if summary.total_records > 0 {
            let percent = summary.deaths as f64 / summary.total_records as f64 * 100.0;
            summary.mortality_percent = (percent * 10.0).round() / 10.0;
        }

        let mut diagnoses: Vec<DiagnosisCount> = diagnoses
            .into_iter()
            .map(|(diagnosis, count)| DiagnosisCount {
                diagnosis: diagnosis.to_string(),
                count,
            })
            .collect();
        diagnoses.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.diagnosis.cmp(&b.diagnosis)));
        summary.diagnoses = diagnoses;
        summary.consumption = consumption.into_values().collect();

        summary
    }
}

/// The home-screen feed: managers see everything, other roles only the
/// `recent_limit` newest records.
pub fn recent_feed<L>(ledger: &L, actor: &Actor, config: &LedgerConfig) -> Result<Vec<LedgerRecord>, LedgerStoreError>
where
    L: LedgerStore + ?Sized,
{
    let mut query = LedgerQuery::for_unit(actor.unit_id);
    if !actor.role.allows(Permission::ViewFullLedger) {
        query = query.limit(config.recent_limit);
    }
    ledger.query(&query)
}
