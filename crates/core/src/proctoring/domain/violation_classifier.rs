use crate::detection::domain::face_detection::FaceDetection;
use crate::proctoring::domain::proctoring_config::ProctoringConfig;
use crate::proctoring::domain::violation::{ProctoringStatus, Severity, Violation, ViolationType};
use crate::shared::constants::{EYE_MOVEMENT_FACTOR, POOR_LIGHTING_CONFIDENCE};

/// Verdict for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAnalysis {
    pub face_count: usize,
    pub violations: Vec<Violation>,
    pub status: ProctoringStatus,
}

impl FrameAnalysis {
    /// What a tick reports when inference produced nothing usable.
    pub fn no_face(timestamp: u64) -> Self {
        let violations = vec![no_face(timestamp)];
        Self {
            face_count: 0,
            status: ProctoringStatus::from_violations(&violations),
            violations,
        }
    }
}

/// Classifies one frame's detections against the config thresholds.
///
/// Zero faces and several faces each produce exactly one high-severity
/// violation. A single face is checked for size, then attention, then
/// lighting, and may yield several violations at once.
pub fn classify(
    detections: &[FaceDetection],
    frame_width: u32,
    frame_height: u32,
    config: &ProctoringConfig,
    timestamp: u64,
) -> FrameAnalysis {
    let violations = match detections {
        [] => vec![no_face(timestamp)],
        [face] => single_face(face, frame_width, frame_height, config, timestamp),
        faces => vec![Violation::new(
            ViolationType::MultipleFaces,
            format!("Multiple faces detected ({})", faces.len()),
            Severity::High,
            timestamp,
        )],
    };

    FrameAnalysis {
        face_count: detections.len(),
        status: ProctoringStatus::from_violations(&violations),
        violations,
    }
}

fn no_face(timestamp: u64) -> Violation {
    Violation::new(
        ViolationType::NoFace,
        "No face detected",
        Severity::High,
        timestamp,
    )
}

fn single_face(
    face: &FaceDetection,
    frame_width: u32,
    frame_height: u32,
    config: &ProctoringConfig,
    timestamp: u64,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if frame_width > 0 && frame_height > 0 {
        let (w, h) = (frame_width as f64, frame_height as f64);

        let size_pct = face.bbox.height() / h * 100.0;
        if size_pct < config.min_face_size {
            violations.push(Violation::new(
                ViolationType::FaceTooFar,
                "Face too far from camera",
                Severity::Medium,
                timestamp,
            ));
        } else if size_pct > config.max_face_size {
            violations.push(Violation::new(
                ViolationType::FaceTooClose,
                "Face too close to camera",
                Severity::Medium,
                timestamp,
            ));
        }

        let (cx, cy) = face.bbox.center();
        let offset_x = (cx - w / 2.0).abs() / w;
        let offset_y = (cy - h / 2.0).abs() / h;
        let threshold = config.looking_away_threshold;
        if offset_x > threshold || offset_y > threshold {
            violations.push(Violation::new(
                ViolationType::LookingAway,
                "Looking away from screen",
                Severity::Medium,
                timestamp,
            ));
        } else if offset_x > threshold * EYE_MOVEMENT_FACTOR
            || offset_y > threshold * EYE_MOVEMENT_FACTOR
        {
            violations.push(Violation::new(
                ViolationType::EyeMovement,
                "Eye movement detected",
                Severity::Medium,
                timestamp,
            ));
        }
    }

    // Detection confidence stands in for scene brightness.
    if face.confidence < POOR_LIGHTING_CONFIDENCE {
        violations.push(
            Violation::new(
                ViolationType::PoorLighting,
                "Poor lighting conditions",
                Severity::Low,
                timestamp,
            )
            .with_confidence(face.confidence),
        );
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{centered_face, face_at, FRAME_H, FRAME_W};
    use rstest::rstest;

    fn kinds(analysis: &FrameAnalysis) -> Vec<(ViolationType, Severity)> {
        analysis
            .violations
            .iter()
            .map(|v| (v.kind, v.severity))
            .collect()
    }

    fn run(detections: &[FaceDetection]) -> FrameAnalysis {
        classify(detections, FRAME_W, FRAME_H, &ProctoringConfig::default(), 1_000)
    }

    #[test]
    fn test_centered_face_is_normal() {
        let analysis = run(&[centered_face(40.0, 0.95)]);
        assert!(analysis.violations.is_empty());
        assert_eq!(analysis.status, ProctoringStatus::Normal);
        assert_eq!(analysis.face_count, 1);
    }

    #[test]
    fn test_small_face_is_too_far() {
        let analysis = run(&[centered_face(10.0, 0.95)]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::FaceTooFar, Severity::Medium)]);
        assert_eq!(analysis.status, ProctoringStatus::Warning);
    }

    #[test]
    fn test_large_face_is_too_close() {
        let analysis = run(&[centered_face(80.0, 0.95)]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::FaceTooClose, Severity::Medium)]);
        assert_eq!(analysis.status, ProctoringStatus::Warning);
    }

    #[test]
    fn test_horizontal_offset_is_looking_away_without_eye_movement() {
        let analysis = run(&[face_at(0.30, 0.0, 40.0, 0.95)]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::LookingAway, Severity::Medium)]);
        assert_eq!(analysis.status, ProctoringStatus::Warning);
    }

    #[rstest]
    #[case::horizontal(0.20, 0.0)]
    #[case::vertical(0.0, 0.19)]
    fn test_moderate_offset_is_eye_movement(#[case] dx: f64, #[case] dy: f64) {
        let analysis = run(&[face_at(dx, dy, 40.0, 0.95)]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::EyeMovement, Severity::Medium)]);
    }

    #[test]
    fn test_offset_at_eye_threshold_is_not_flagged() {
        // 0.7 * 0.25 = 0.175 is not exceeded.
        let analysis = run(&[face_at(0.17, 0.0, 40.0, 0.95)]);
        assert!(analysis.violations.is_empty());
    }

    #[test]
    fn test_low_confidence_is_poor_lighting() {
        let analysis = run(&[centered_face(40.0, 0.5)]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::PoorLighting, Severity::Low)]);
        assert_eq!(analysis.violations[0].confidence, Some(0.5));
        assert_eq!(analysis.status, ProctoringStatus::Normal);
    }

    #[test]
    fn test_violations_combine_in_order() {
        let analysis = run(&[face_at(0.30, 0.0, 10.0, 0.4)]);
        assert_eq!(
            kinds(&analysis),
            vec![
                (ViolationType::FaceTooFar, Severity::Medium),
                (ViolationType::LookingAway, Severity::Medium),
                (ViolationType::PoorLighting, Severity::Low),
            ]
        );
        assert_eq!(analysis.status, ProctoringStatus::Warning);
    }

    #[test]
    fn test_no_faces_is_single_high_violation() {
        let analysis = run(&[]);
        assert_eq!(kinds(&analysis), vec![(ViolationType::NoFace, Severity::High)]);
        assert_eq!(analysis.status, ProctoringStatus::Violation);
        assert_eq!(analysis.face_count, 0);
        assert_eq!(analysis, FrameAnalysis::no_face(1_000));
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(7)]
    fn test_multiple_faces_is_single_high_violation(#[case] count: usize) {
        // Off-center, tiny and dim faces must not add per-face violations.
        let faces: Vec<_> = (0..count).map(|i| face_at(0.3, 0.0, 5.0 + i as f64, 0.3)).collect();
        let analysis = run(&faces);

        assert_eq!(kinds(&analysis), vec![(ViolationType::MultipleFaces, Severity::High)]);
        assert!(analysis.violations[0].message.contains(&count.to_string()));
        assert_eq!(analysis.status, ProctoringStatus::Violation);
        assert_eq!(analysis.face_count, count);
    }

    #[test]
    fn test_zero_sized_frame_skips_geometry() {
        let analysis = classify(
            &[face_at(0.4, 0.4, 5.0, 0.95)],
            0,
            0,
            &ProctoringConfig::default(),
            0,
        );
        assert!(analysis.violations.is_empty());
    }

    #[test]
    fn test_thresholds_follow_config() {
        let config = ProctoringConfig {
            min_face_size: 50.0,
            ..ProctoringConfig::default()
        };
        let analysis = classify(&[centered_face(40.0, 0.95)], FRAME_W, FRAME_H, &config, 0);
        assert_eq!(kinds(&analysis), vec![(ViolationType::FaceTooFar, Severity::Medium)]);
    }

    #[test]
    fn test_timestamp_is_stamped_on_every_violation() {
        let analysis = classify(
            &[face_at(0.30, 0.0, 10.0, 0.4)],
            FRAME_W,
            FRAME_H,
            &ProctoringConfig::default(),
            77,
        );
        assert!(analysis.violations.iter().all(|v| v.timestamp == 77));
    }
}
