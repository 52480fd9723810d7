// Vibration Monitor — Data Types passed between pipeline stages

use crate::config::EI_LABEL_COUNT;

// ---------------------------------------------------------------------------
// Sensor Data (3-axis accelerometer reading, m/s²)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn axis(&self, axis: crate::config::Axis) -> f64 {
        use crate::config::Axis;
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Time spent inside the classifier, milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub dsp_ms: u32,
    pub classification_ms: u32,
}

/// Per-label scores for one feature frame, in model output order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub scores: [f32; EI_LABEL_COUNT],
    pub timing: Timing,
}

impl ClassificationResult {
    pub fn new(scores: [f32; EI_LABEL_COUNT]) -> Self {
        Self { scores, timing: Timing::default() }
    }

    /// Winning label of this run. Scanning starts at score 0.0 / index 0 and
    /// only a strictly greater score takes over, so ties keep the lower index.
    pub fn winner(&self) -> usize {
        let mut largest = 0.0f32;
        let mut largest_index = 0;
        for (ix, &score) in self.scores.iter().enumerate() {
            if score > largest {
                largest = score;
                largest_index = ix;
            }
        }
        largest_index
    }
}
