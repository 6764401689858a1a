//! Buildset comparison
//!
//! Classifies every record against its counterpart in the baseline
//! buildset (same source and target). Each comparison depends only on the
//! two records involved, so the result is independent of visiting order.
//! Records are never modified; annotations live in a separate map.

use crate::dataset::Dataset;
use crate::record::{BuildRecord, RecordKey};
use std::collections::BTreeMap;
use std::fmt;

/// How a record's outcome changed relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaStatus {
    /// Record belongs to the baseline buildset
    IsBase,
    /// No counterpart in the baseline buildset
    NoBase,
    /// Both compiled to the same image
    Identical,
    /// Both compiled, images differ
    Modified,
    /// Baseline failed, this one is OK
    Fixed,
    /// Baseline OK, this one failed
    Broken,
    /// Neither is OK
    StillBroken,
}

impl DeltaStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DeltaStatus::IsBase => "Is base",
            DeltaStatus::NoBase => "No base",
            DeltaStatus::Identical => "Identical",
            DeltaStatus::Modified => "Modified",
            DeltaStatus::Fixed => "Fixed",
            DeltaStatus::Broken => "Broken",
            DeltaStatus::StillBroken => "Still broken",
        }
    }
}

impl fmt::Display for DeltaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Delta fields attached to one record during reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaAnnotation {
    pub status: DeltaStatus,
    pub delta_program_size: Option<i64>,
    pub delta_data_size: Option<i64>,
    pub is_base: bool,
}

impl DeltaAnnotation {
    /// Annotation for a record of the baseline buildset itself
    pub fn for_base(record: &BuildRecord) -> Self {
        let zero = record.is_ok().then_some(0);
        Self {
            status: DeltaStatus::IsBase,
            delta_program_size: zero,
            delta_data_size: zero,
            is_base: true,
        }
    }
}

/// Compare a non-baseline record with its baseline counterpart
///
/// Size deltas are only produced when both records are OK.
pub fn classify(record: &BuildRecord, baseline: Option<&BuildRecord>) -> DeltaAnnotation {
    let Some(base) = baseline else {
        return DeltaAnnotation {
            status: DeltaStatus::NoBase,
            delta_program_size: None,
            delta_data_size: None,
            is_base: false,
        };
    };

    let (status, delta_program_size, delta_data_size) =
        match (record.status.measurement(), base.status.measurement()) {
            (Some(cur), Some(old)) => {
                let status = if cur.content_hash == old.content_hash {
                    DeltaStatus::Identical
                } else {
                    DeltaStatus::Modified
                };
                (
                    status,
                    Some(signed_diff(cur.program_size, old.program_size)),
                    Some(signed_diff(cur.data_size, old.data_size)),
                )
            }
            (Some(_), None) => (DeltaStatus::Fixed, None, None),
            (None, Some(_)) => (DeltaStatus::Broken, None, None),
            (None, None) => (DeltaStatus::StillBroken, None, None),
        };

    DeltaAnnotation {
        status,
        delta_program_size,
        delta_data_size,
        is_base: false,
    }
}

fn signed_diff(current: u64, baseline: u64) -> i64 {
    (current as i128 - baseline as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Delta annotations of a whole dataset against one baseline buildset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    baseline: String,
    annotations: BTreeMap<RecordKey, DeltaAnnotation>,
    missing_baseline: Vec<RecordKey>,
}

impl Comparison {
    /// Annotate every record of `dataset` against `baseline`
    ///
    /// Records without a baseline counterpart are reported as warnings
    /// and recorded in [`Comparison::missing_baseline`].
    pub fn compute(dataset: &Dataset, baseline: &str) -> Self {
        if !dataset.buildsets().contains(baseline) {
            tracing::warn!("Baseline buildset '{}' has no build records", baseline);
        }

        let mut annotations = BTreeMap::new();
        let mut missing_baseline = Vec::new();

        for (key, record) in dataset.iter() {
            let annotation = if key.buildset == baseline {
                DeltaAnnotation::for_base(record)
            } else {
                let counterpart = dataset.get(&key.in_buildset(baseline));
                if counterpart.is_none() {
                    tracing::warn!(
                        "{}: No corresponding build in base buildset found, cannot compare",
                        key
                    );
                    missing_baseline.push(key.clone());
                }
                classify(record, counterpart)
            };
            annotations.insert(key.clone(), annotation);
        }

        Self {
            baseline: baseline.to_string(),
            annotations,
            missing_baseline,
        }
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn get(&self, key: &RecordKey) -> Option<&DeltaAnnotation> {
        self.annotations.get(key)
    }

    /// Keys of records that had no counterpart in the baseline
    pub fn missing_baseline(&self) -> &[RecordKey] {
        &self.missing_baseline
    }

    /// Number of records per delta status
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for annotation in self.annotations.values() {
            *counts.entry(annotation.status.label()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BuildStatus, MarkerRecord, Measurement};

    fn ok(buildset: &str, sketch: &str, board: &str, program: u64, data: u64, hash: &str) -> BuildRecord {
        record(
            buildset,
            sketch,
            board,
            BuildStatus::Ok(Measurement {
                program_size: program,
                data_size: data,
                content_hash: hash.to_string(),
            }),
        )
    }

    fn record(buildset: &str, sketch: &str, board: &str, status: BuildStatus) -> BuildRecord {
        let exit_code = if status == BuildStatus::FailedToCompile { 1 } else { 0 };
        BuildRecord::new(
            MarkerRecord {
                exit_code,
                sketch_dir: sketch.to_string(),
                sketch_name: sketch.to_string(),
                board: board.to_string(),
                buildset: buildset.to_string(),
            },
            status,
        )
    }

    #[test]
    fn test_modified_with_size_delta() {
        let dataset: Dataset = vec![
            ok("base", "blink", "uno", 1000, 20, "aaa"),
            ok("next", "blink", "uno", 1200, 18, "bbb"),
        ]
        .into_iter()
        .collect();

        let cmp = Comparison::compute(&dataset, "base");
        let delta = cmp.get(&RecordKey::new("next", "blink", "uno")).unwrap();
        assert_eq!(delta.status, DeltaStatus::Modified);
        assert_eq!(delta.delta_program_size, Some(200));
        assert_eq!(delta.delta_data_size, Some(-2));
        assert!(!delta.is_base);
    }

    #[test]
    fn test_identical_keeps_size_delta() {
        let base = ok("base", "blink", "uno", 1000, 20, "same");
        let next = ok("next", "blink", "uno", 1000, 20, "same");
        let delta = classify(&next, Some(&base));
        assert_eq!(delta.status, DeltaStatus::Identical);
        assert_eq!(delta.delta_program_size, Some(0));
        assert_eq!(delta.delta_data_size, Some(0));
    }

    #[test]
    fn test_fixed_broken_still_broken() {
        let good = ok("base", "blink", "uno", 1000, 20, "a");
        let bad = record("base", "blink", "uno", BuildStatus::FailedToCompile);
        let no_size = record("next", "blink", "uno", BuildStatus::FailedToGetSize);
        let good_next = ok("next", "blink", "uno", 900, 20, "b");

        let fixed = classify(&good_next, Some(&bad));
        assert_eq!(fixed.status, DeltaStatus::Fixed);
        assert_eq!(fixed.delta_program_size, None);

        let broken = classify(&no_size, Some(&good));
        assert_eq!(broken.status, DeltaStatus::Broken);
        assert_eq!(broken.delta_data_size, None);

        let still = classify(&no_size, Some(&bad));
        assert_eq!(still.status, DeltaStatus::StillBroken);
        assert_eq!(still.delta_program_size, None);
    }

    #[test]
    fn test_base_records() {
        let dataset: Dataset = vec![
            ok("base", "blink", "uno", 1000, 20, "a"),
            record("base", "fade", "uno", BuildStatus::FailedToCompile),
        ]
        .into_iter()
        .collect();

        let cmp = Comparison::compute(&dataset, "base");
        let blink = cmp.get(&RecordKey::new("base", "blink", "uno")).unwrap();
        assert_eq!(blink.status, DeltaStatus::IsBase);
        assert!(blink.is_base);
        assert_eq!(blink.delta_program_size, Some(0));
        assert_eq!(blink.delta_data_size, Some(0));

        let fade = cmp.get(&RecordKey::new("base", "fade", "uno")).unwrap();
        assert_eq!(fade.status, DeltaStatus::IsBase);
        assert_eq!(fade.delta_program_size, None);
    }

    #[test]
    fn test_no_base_counterpart() {
        let dataset: Dataset = vec![
            ok("base", "blink", "uno", 1000, 20, "a"),
            ok("next", "blink", "mega", 1000, 20, "a"),
        ]
        .into_iter()
        .collect();

        let cmp = Comparison::compute(&dataset, "base");
        let key = RecordKey::new("next", "blink", "mega");
        let delta = cmp.get(&key).unwrap();
        assert_eq!(delta.status, DeltaStatus::NoBase);
        assert_eq!(delta.delta_program_size, None);
        assert_eq!(delta.delta_data_size, None);
        assert!(!delta.is_base);
        assert_eq!(cmp.missing_baseline(), &[key]);
    }

    #[test]
    fn test_unknown_baseline_marks_everything_no_base() {
        let dataset: Dataset = vec![ok("next", "blink", "uno", 1000, 20, "a")].into_iter().collect();
        let cmp = Comparison::compute(&dataset, "base");
        assert_eq!(
            cmp.get(&RecordKey::new("next", "blink", "uno")).unwrap().status,
            DeltaStatus::NoBase
        );
        assert_eq!(cmp.baseline(), "base");
    }

    #[test]
    fn test_every_record_annotated() {
        let dataset: Dataset = vec![
            ok("base", "blink", "uno", 1, 1, "a"),
            ok("next", "blink", "uno", 1, 1, "a"),
            ok("other", "fade", "uno", 1, 1, "a"),
        ]
        .into_iter()
        .collect();

        let cmp = Comparison::compute(&dataset, "base");
        for (key, _) in dataset.iter() {
            assert!(cmp.get(key).is_some(), "{} not annotated", key);
        }
        let summary = cmp.summary();
        assert_eq!(summary.get("Is base"), Some(&1));
        assert_eq!(summary.get("Identical"), Some(&1));
        assert_eq!(summary.get("No base"), Some(&1));
    }

    #[test]
    fn test_signed_diff_extremes() {
        assert_eq!(signed_diff(0, u64::MAX), i64::MIN);
        assert_eq!(signed_diff(u64::MAX, 0), i64::MAX);
        assert_eq!(signed_diff(5, 7), -2);
    }

    #[test]
    fn test_labels() {
        assert_eq!(DeltaStatus::StillBroken.to_string(), "Still broken");
        assert_eq!(DeltaStatus::NoBase.label(), "No base");
    }
}
