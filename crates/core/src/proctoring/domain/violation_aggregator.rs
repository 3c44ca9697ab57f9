use std::collections::HashMap;

use crate::proctoring::domain::proctoring_event::ProctoringEvent;
use crate::proctoring::domain::violation::{ProctoringStatus, Violation, ViolationType};
use crate::proctoring::domain::violation_classifier::FrameAnalysis;

/// Session state fed by classified frames.
///
/// Two policies run side by side. Live feedback reports the first violation
/// of every tick immediately. History only accepts a violation type once per
/// cooldown window. History survives [`reset_session`](Self::reset_session);
/// everything else does not.
#[derive(Debug, Default)]
pub struct ViolationAggregator {
    status: ProctoringStatus,
    face_count: usize,
    latest: Option<Violation>,
    last_recorded: HashMap<ViolationType, u64>,
    history: Vec<Violation>,
}

impl ViolationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one frame into the session and returns the events to publish.
    pub fn apply(
        &mut self,
        analysis: FrameAnalysis,
        now: u64,
        cooldown_ms: u64,
    ) -> Vec<ProctoringEvent> {
        let mut events = Vec::with_capacity(analysis.violations.len() + 3);

        self.face_count = analysis.face_count;
        events.push(ProctoringEvent::FaceCount(analysis.face_count));

        match analysis.violations.first() {
            Some(first) => {
                self.latest = Some(first.clone());
                events.push(ProctoringEvent::Violation(first.clone()));
            }
            None => {
                if self.latest.take().is_some() {
                    events.push(ProctoringEvent::Violation(Violation::recovered(now)));
                }
            }
        }

        for violation in analysis.violations {
            if self.cooled_down(violation.kind, now, cooldown_ms) {
                self.last_recorded.insert(violation.kind, now);
                self.history.push(violation.clone());
                events.push(ProctoringEvent::ViolationRecorded {
                    violation,
                    snapshot: None,
                });
            }
        }

        if analysis.status != self.status {
            events.push(ProctoringEvent::StatusChanged {
                previous: self.status,
                current: analysis.status,
            });
            self.status = analysis.status;
        }

        events
    }

    fn cooled_down(&self, kind: ViolationType, now: u64, cooldown_ms: u64) -> bool {
        self.last_recorded
            .get(&kind)
            .map_or(true, |&last| now.saturating_sub(last) >= cooldown_ms)
    }

    /// Forgets per-session state. History is kept.
    pub fn reset_session(&mut self) {
        self.status = ProctoringStatus::Normal;
        self.face_count = 0;
        self.latest = None;
        self.last_recorded.clear();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn status(&self) -> ProctoringStatus {
        self.status
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn latest(&self) -> Option<&Violation> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &[Violation] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proctoring::domain::proctoring_config::ProctoringConfig;
    use crate::proctoring::domain::violation_classifier::classify;
    use crate::testing::{centered_face, face_at, FRAME_H, FRAME_W};

    const COOLDOWN: u64 = 3000;

    fn analysis(faces: &[crate::detection::domain::face_detection::FaceDetection], now: u64) -> FrameAnalysis {
        classify(faces, FRAME_W, FRAME_H, &ProctoringConfig::default(), now)
    }

    fn live(events: &[ProctoringEvent]) -> Vec<(ViolationType, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                ProctoringEvent::Violation(v) => Some((v.kind, v.message.clone())),
                _ => None,
            })
            .collect()
    }

    fn face_counts(events: &[ProctoringEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                ProctoringEvent::FaceCount(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_recovery_after_missing_face() {
        let mut agg = ViolationAggregator::new();
        let mut events = Vec::new();
        for (i, faces) in [vec![], vec![], vec![], vec![centered_face(40.0, 0.95)]]
            .iter()
            .enumerate()
        {
            let now = i as u64 * 1000;
            events.extend(agg.apply(analysis(faces, now), now, COOLDOWN));
        }

        assert_eq!(face_counts(&events), vec![0, 0, 0, 1]);
        let no_face = (ViolationType::NoFace, "No face detected".to_string());
        assert_eq!(
            live(&events),
            vec![
                no_face.clone(),
                no_face.clone(),
                no_face,
                (ViolationType::Normal, "Face Detected".to_string()),
            ]
        );
        assert!(agg.latest().is_none());
        assert!(agg.history().iter().all(|v| v.kind != ViolationType::Normal));
    }

    #[test]
    fn test_cooldown_limits_history_but_not_live_feedback() {
        let mut agg = ViolationAggregator::new();
        let k = 4u64;
        let mut live_count = 0;
        // One tick every 500 ms across cooldown * k milliseconds, inclusive.
        for now in (0..=COOLDOWN * k).step_by(500) {
            let events = agg.apply(analysis(&[], now), now, COOLDOWN);
            live_count += live(&events).len();
        }

        let recorded = agg
            .history()
            .iter()
            .filter(|v| v.kind == ViolationType::NoFace)
            .count();
        assert!(recorded as u64 <= k + 1);
        assert_eq!(recorded as u64, k + 1);
        assert_eq!(live_count, (COOLDOWN * k / 500 + 1) as usize);
    }

    #[test]
    fn test_cooldown_is_per_type() {
        let mut agg = ViolationAggregator::new();
        agg.apply(analysis(&[], 0), 0, COOLDOWN);
        agg.apply(
            analysis(&[centered_face(40.0, 0.9), centered_face(30.0, 0.9)], 100),
            100,
            COOLDOWN,
        );
        agg.apply(analysis(&[], 200), 200, COOLDOWN);

        let kinds: Vec<_> = agg.history().iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationType::NoFace, ViolationType::MultipleFaces]);
    }

    #[test]
    fn test_all_simultaneous_violations_are_recorded() {
        let mut agg = ViolationAggregator::new();
        let events = agg.apply(analysis(&[face_at(0.3, 0.0, 10.0, 0.4)], 0), 0, COOLDOWN);

        let recorded = events
            .iter()
            .filter(|e| matches!(e, ProctoringEvent::ViolationRecorded { .. }))
            .count();
        assert_eq!(recorded, 3);
        assert_eq!(agg.history().len(), 3);
        assert_eq!(agg.latest().unwrap().kind, ViolationType::FaceTooFar);
    }

    #[test]
    fn test_status_change_fires_only_on_transition() {
        let mut agg = ViolationAggregator::new();
        let first = agg.apply(analysis(&[], 0), 0, COOLDOWN);
        let second = agg.apply(analysis(&[], 1000), 1000, COOLDOWN);
        let third = agg.apply(analysis(&[centered_face(40.0, 0.95)], 2000), 2000, COOLDOWN);

        let changes = |events: &[ProctoringEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, ProctoringEvent::StatusChanged { .. }))
                .count()
        };
        assert_eq!(changes(&first), 1);
        assert_eq!(changes(&second), 0);
        assert_eq!(
            third.last(),
            Some(&ProctoringEvent::StatusChanged {
                previous: ProctoringStatus::Violation,
                current: ProctoringStatus::Normal,
            })
        );
    }

    #[test]
    fn test_event_order_within_tick() {
        let mut agg = ViolationAggregator::new();
        let events = agg.apply(analysis(&[], 0), 0, COOLDOWN);

        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        use crate::proctoring::domain::proctoring_event::EventKind;
        assert_eq!(
            kinds,
            vec![
                EventKind::FaceCount,
                EventKind::Violation,
                EventKind::ViolationRecorded,
                EventKind::StatusChanged,
            ]
        );
    }

    #[test]
    fn test_clean_first_tick_emits_only_face_count() {
        let mut agg = ViolationAggregator::new();
        let events = agg.apply(analysis(&[centered_face(40.0, 0.95)], 0), 0, COOLDOWN);
        assert_eq!(events, vec![ProctoringEvent::FaceCount(1)]);
    }

    #[test]
    fn test_reset_session_keeps_history() {
        let mut agg = ViolationAggregator::new();
        agg.apply(analysis(&[], 0), 0, COOLDOWN);

        agg.reset_session();

        assert_eq!(agg.status(), ProctoringStatus::Normal);
        assert_eq!(agg.face_count(), 0);
        assert!(agg.latest().is_none());
        assert_eq!(agg.history().len(), 1);

        // Cooldown map was reset, so the same type records again immediately.
        agg.apply(analysis(&[], 10), 10, COOLDOWN);
        assert_eq!(agg.history().len(), 2);
    }

    #[test]
    fn test_clear_history() {
        let mut agg = ViolationAggregator::new();
        agg.apply(analysis(&[], 0), 0, COOLDOWN);
        agg.clear_history();
        assert!(agg.history().is_empty());
        assert_eq!(agg.status(), ProctoringStatus::Violation);
    }
}
