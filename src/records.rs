//! Output record types and the per-run population table.

use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A population center: one region (ZIP code or census tract) with its
/// representative point and aggregated figures.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PopulationRecord {
    pub code: u64,
    pub lat: f64,
    pub lon: f64,
    pub pop: i64,
    pub vacc: i64,
    /// Mean ADI, or `None` when no valid sub-region value was observed.
    pub adi: Option<f64>,
}

impl PopulationRecord {
    pub fn new(code: u64) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }
}

/// A vaccination-administering facility.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRecord {
    pub id: usize,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub cap: u32,
}

/// What to do with a secondary-source row whose region code was never seen
/// in the primary source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCodePolicy {
    #[default]
    Fail,
    Skip,
}

/// Whether a secondary-source row belongs to a known region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Known,
    Skipped,
}

/// Population records keyed by region code. Iteration is always in
/// ascending code order, which is also the output order.
#[derive(Debug, Default)]
pub struct PopulationTable {
    records: BTreeMap<u64, PopulationRecord>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, code: u64) -> bool {
        self.records.contains_key(&code)
    }

    pub fn get(&self, code: u64) -> Option<&PopulationRecord> {
        self.records.get(&code)
    }

    /// Records a primary-source observation. The first observation of a code
    /// creates its record; coordinates are overwritten by later rows and the
    /// population keeps the largest value seen.
    pub fn observe(&mut self, code: u64, (lat, lon): (f64, f64), pop: i64) {
        let record = self
            .records
            .entry(code)
            .or_insert_with(|| PopulationRecord::new(code));
        record.lat = lat;
        record.lon = lon;
        record.pop = record.pop.max(pop);
    }

    /// Checks a secondary-source code against the primary source before any
    /// of the row's values are read.
    pub fn admit(&self, code: u64, policy: UnknownCodePolicy) -> Result<Admission> {
        match (self.contains(code), policy) {
            (true, _) => Ok(Admission::Known),
            (false, UnknownCodePolicy::Skip) => Ok(Admission::Skipped),
            (false, UnknownCodePolicy::Fail) => {
                bail!("unknown code {code}: not present in the primary source")
            }
        }
    }

    /// Adds a vaccination count to an admitted code. Unknown codes are ignored.
    pub fn add_vaccinations(&mut self, code: u64, count: i64) {
        if let Some(record) = self.records.get_mut(&code) {
            record.vacc += count;
        }
    }

    /// Stores the mean of every tally that saw at least one value; other
    /// records are left without an ADI.
    pub fn apply_adi(&mut self, tallies: &AdiTallies) {
        for (code, record) in self.records.iter_mut() {
            record.adi = tallies.mean(*code);
        }
    }

    /// Records in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = &PopulationRecord> {
        self.records.values()
    }
}

/// Running `(sum, count)` of ADI values per parent region.
#[derive(Debug, Default)]
pub struct AdiTallies {
    tallies: BTreeMap<u64, (i64, u32)>,
}

impl AdiTallies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, code: u64, value: i64) {
        let tally = self.tallies.entry(code).or_default();
        tally.0 += value;
        tally.1 += 1;
    }

    /// Arithmetic mean for `code`, or `None` when no value was recorded.
    pub fn mean(&self, code: u64) -> Option<f64> {
        match self.tallies.get(&code) {
            Some(&(sum, count)) if count > 0 => Some(sum as f64 / count as f64),
            _ => None,
        }
    }
}
