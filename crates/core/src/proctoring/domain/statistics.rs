use std::collections::BTreeMap;

use serde::Serialize;

use crate::proctoring::domain::violation::{Violation, ViolationType};

/// Summary of a session's audited history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProctoringStatistics {
    pub total_violations: usize,
    /// One entry per violation type, zero when never recorded.
    pub violations_by_type: BTreeMap<ViolationType, usize>,
    pub current_face_count: usize,
}

impl ProctoringStatistics {
    pub fn from_history(history: &[Violation], current_face_count: usize) -> Self {
        let mut violations_by_type: BTreeMap<ViolationType, usize> =
            ViolationType::ALL.iter().map(|&kind| (kind, 0)).collect();
        for violation in history {
            *violations_by_type.entry(violation.kind).or_default() += 1;
        }
        Self {
            total_violations: history.len(),
            violations_by_type,
            current_face_count,
        }
    }

    pub fn count(&self, kind: ViolationType) -> usize {
        self.violations_by_type.get(&kind).copied().unwrap_or(0)
    }
}
