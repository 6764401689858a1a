//! Dataset builder
//!
//! Folds scanned markers into an ordered map keyed by
//! (buildset, source, target), deriving each record's status on the way.

use crate::error::Result;
use crate::measure::Measure;
use crate::record::{BuildRecord, BuildStatus, RecordKey};
use crate::scanner::ScannedRecord;
use std::collections::{BTreeMap, BTreeSet};

/// All build records of a results tree, in key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: BTreeMap<RecordKey, BuildRecord>,
    buildsets: BTreeSet<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from scanned markers
    ///
    /// Failed compiles are not measured. A measurement failure downgrades
    /// the record to "Failed to get size" and is logged; scanner errors
    /// abort the whole collection.
    pub fn collect<I, M>(scanned: I, measurer: &M) -> Result<Self>
    where
        I: IntoIterator<Item = Result<ScannedRecord>>,
        M: Measure + ?Sized,
    {
        let mut dataset = Self::new();

        for item in scanned {
            let ScannedRecord { location, marker } = item?;

            let status = if marker.exit_code != 0 {
                BuildStatus::FailedToCompile
            } else {
                match measurer.measure(&location, &marker) {
                    Ok(measurement) => BuildStatus::Ok(measurement),
                    Err(e) => {
                        tracing::warn!("{}: failed to get size: {}", marker.key(), e);
                        BuildStatus::FailedToGetSize
                    }
                }
            };

            dataset.insert(BuildRecord::new(marker, status));
        }

        tracing::info!(
            "Collected {} build records in {} buildsets",
            dataset.len(),
            dataset.buildsets.len()
        );
        Ok(dataset)
    }

    /// Insert a record; a record with the same key is replaced
    pub fn insert(&mut self, record: BuildRecord) {
        let key = record.key();
        self.buildsets.insert(key.buildset.clone());
        if self.records.insert(key, record).is_some() {
            tracing::debug!("Duplicate build record replaced");
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&BuildRecord> {
        self.records.get(key)
    }

    /// Records in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &BuildRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct buildset names, sorted
    pub fn buildsets(&self) -> &BTreeSet<String> {
        &self.buildsets
    }

    /// Pick the baseline buildset for a report
    ///
    /// An explicit choice always wins. Otherwise `auto_name` is used when
    /// more than one buildset exists and one of them has that name.
    pub fn select_baseline(&self, explicit: Option<&str>, auto_name: &str) -> Option<String> {
        if let Some(name) = explicit {
            return Some(name.to_string());
        }
        if self.buildsets.len() > 1 && self.buildsets.contains(auto_name) {
            return Some(auto_name.to_string());
        }
        None
    }
}

impl FromIterator<BuildRecord> for Dataset {
    fn from_iter<T: IntoIterator<Item = BuildRecord>>(iter: T) -> Self {
        let mut dataset = Self::new();
        for record in iter {
            dataset.insert(record);
        }
        dataset
    }
}
