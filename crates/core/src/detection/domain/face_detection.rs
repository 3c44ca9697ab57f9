/// Axis-aligned face box in frame pixel coordinates.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size whose center sits at `(cx, cy)`.
    pub fn centered_at(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Confidence exactly as an inference backend reported it.
///
/// Backends disagree on shape: some return a plain score, others a
/// one-element tensor, some nothing at all.
#[derive(Clone, Debug, PartialEq)]
pub enum RawConfidence {
    Scalar(f64),
    Series(Vec<f64>),
    Missing,
}

impl RawConfidence {
    /// Collapses to one score in `[0, 1]`.
    ///
    /// A series contributes its first element. Absent or non-finite scores
    /// count as fully confident, so they never raise a lighting flag on
    /// their own.
    pub fn normalize(&self) -> f64 {
        let value = match self {
            RawConfidence::Scalar(v) => Some(*v),
            RawConfidence::Series(values) => values.first().copied(),
            RawConfidence::Missing => None,
        };
        match value {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }
}

impl From<f64> for RawConfidence {
    fn from(value: f64) -> Self {
        RawConfidence::Scalar(value)
    }
}

/// One detected face with a normalized confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

impl FaceDetection {
    pub fn new(bbox: BoundingBox, confidence: impl Into<RawConfidence>) -> Self {
        Self {
            bbox,
            confidence: confidence.into().normalize(),
        }
    }
}
