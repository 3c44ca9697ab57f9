use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    NoFace,
    MultipleFaces,
    LookingAway,
    EyeMovement,
    FaceTooClose,
    FaceTooFar,
    PoorLighting,
    Normal,
}

impl ViolationType {
    pub const ALL: [ViolationType; 8] = [
        ViolationType::NoFace,
        ViolationType::MultipleFaces,
        ViolationType::LookingAway,
        ViolationType::EyeMovement,
        ViolationType::FaceTooClose,
        ViolationType::FaceTooFar,
        ViolationType::PoorLighting,
        ViolationType::Normal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::NoFace => "NO_FACE",
            ViolationType::MultipleFaces => "MULTIPLE_FACES",
            ViolationType::LookingAway => "LOOKING_AWAY",
            ViolationType::EyeMovement => "EYE_MOVEMENT",
            ViolationType::FaceTooClose => "FACE_TOO_CLOSE",
            ViolationType::FaceTooFar => "FACE_TOO_FAR",
            ViolationType::PoorLighting => "POOR_LIGHTING",
            ViolationType::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Overall verdict for one detection tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProctoringStatus {
    #[default]
    Normal,
    Warning,
    Violation,
}

impl ProctoringStatus {
    /// `Violation` if any high-severity entry, else `Warning` if any medium
    /// one, else `Normal`.
    pub fn from_violations(violations: &[Violation]) -> Self {
        match violations.iter().map(|v| v.severity).max() {
            Some(Severity::High) => ProctoringStatus::Violation,
            Some(Severity::Medium) => ProctoringStatus::Warning,
            _ => ProctoringStatus::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationType,
    pub message: String,
    pub severity: Severity,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Violation {
    pub fn new(
        kind: ViolationType,
        message: impl Into<String>,
        severity: Severity,
        timestamp: u64,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
            timestamp,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Pseudo-violation announcing that the candidate is back in frame.
    /// Sent to live listeners only, never recorded.
    pub fn recovered(timestamp: u64) -> Self {
        Self::new(ViolationType::Normal, "Face Detected", Severity::Low, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(kind: ViolationType, severity: Severity) -> Violation {
        Violation::new(kind, "msg", severity, 0)
    }

    #[rstest]
    #[case::empty(vec![], ProctoringStatus::Normal)]
    #[case::low_only(vec![v(ViolationType::PoorLighting, Severity::Low)], ProctoringStatus::Normal)]
    #[case::medium(vec![v(ViolationType::FaceTooFar, Severity::Medium)], ProctoringStatus::Warning)]
    #[case::high_wins(
        vec![v(ViolationType::PoorLighting, Severity::Low), v(ViolationType::NoFace, Severity::High)],
        ProctoringStatus::Violation
    )]
    fn test_status_from_violations(
        #[case] violations: Vec<Violation>,
        #[case] expected: ProctoringStatus,
    ) {
        assert_eq!(ProctoringStatus::from_violations(&violations), expected);
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let violation = Violation::new(
            ViolationType::MultipleFaces,
            "Multiple faces detected (2)",
            Severity::High,
            1_700_000_000_000,
        );
        let json = serde_json::to_value(&violation).unwrap();

        assert_eq!(json["type"], "MULTIPLE_FACES");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["timestamp"], 1_700_000_000_000u64);
        assert!(json.get("confidence").is_none());
    }

    #[test]
    fn test_deserializes_with_confidence() {
        let json = r#"{"type":"POOR_LIGHTING","message":"dim","severity":"low","timestamp":5,"confidence":0.4}"#;
        let violation: Violation = serde_json::from_str(json).unwrap();
        assert_eq!(violation.kind, ViolationType::PoorLighting);
        assert_eq!(violation.confidence, Some(0.4));
    }

    #[test]
    fn test_display_matches_serde_name() {
        for kind in ViolationType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_recovered_is_normal_face_detected() {
        let r = Violation::recovered(42);
        assert_eq!(r.kind, ViolationType::Normal);
        assert_eq!(r.message, "Face Detected");
        assert_eq!(r.timestamp, 42);
    }
}
