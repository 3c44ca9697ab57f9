use crate::proctoring::domain::violation::{ProctoringStatus, Violation};

/// Everything a host can observe from a running session.
///
/// Within one detection tick events are published in this order: face
/// count, live violation, recorded violations, status change.
#[derive(Clone, Debug, PartialEq)]
pub enum ProctoringEvent {
    /// Published on every completed tick, including failed inferences.
    FaceCount(usize),
    /// Live feedback: the tick's first violation, or the `NORMAL` recovery
    /// marker. Not rate limited.
    Violation(Violation),
    /// A violation that passed the per-type cooldown and entered history.
    /// `snapshot` is a JPEG data URL of the classified frame when violation
    /// snapshots are enabled on the service.
    ViolationRecorded {
        violation: Violation,
        snapshot: Option<String>,
    },
    StatusChanged {
        previous: ProctoringStatus,
        current: ProctoringStatus,
    },
}

impl ProctoringEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProctoringEvent::FaceCount(_) => EventKind::FaceCount,
            ProctoringEvent::Violation(_) => EventKind::Violation,
            ProctoringEvent::ViolationRecorded { .. } => EventKind::ViolationRecorded,
            ProctoringEvent::StatusChanged { .. } => EventKind::StatusChanged,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    FaceCount,
    Violation,
    ViolationRecorded,
    StatusChanged,
}
