// Vibration Monitor — Edge Impulse Inference Interface
//
// This module provides a safe Rust API for vibration-frequency classification.
//
// Architecture:
//   1. STUB mode (default) — estimates the dominant frequency from zero
//      crossings and scores every label by its distance to that estimate, so
//      the pipeline can run end-to-end without the C++ Edge Impulse SDK.
//   2. FFI mode — enable the `edge-impulse` feature to compile the SDK and
//      shim/ei_shim.cpp in build.rs. The shim exposes plain float buffers,
//      so no SDK struct layout is mirrored on the Rust side.
//
// The pipeline calls `classify(features)` with a 600-float buffer
// (200 samples × 3 axes) and receives the score of every label plus timing.

use crate::config::*;
use crate::error::ClassifierError;
use crate::events::ClassificationResult;

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// Labels matching the Edge Impulse model output order.
pub const LABELS: [&str; EI_LABEL_COUNT] = [
    "0Hz", "10Hz", "15Hz", "20Hz", "30Hz", "40Hz", "50Hz", "60Hz", "80Hz", "100Hz",
];

/// Nominal vibration frequency of each label, Hz.
pub const LABEL_FREQUENCIES: [f32; EI_LABEL_COUNT] =
    [0.0, 10.0, 15.0, 20.0, 30.0, 40.0, 50.0, 60.0, 80.0, 100.0];

/// A trained model: fixed input shape, fixed label set.
pub trait Classifier {
    /// Raw values per time-step the model was trained on.
    fn raw_samples_per_frame(&self) -> usize;

    /// Total floats in one input frame.
    fn frame_size(&self) -> usize;

    fn labels(&self) -> &[&'static str];

    fn classify(&mut self, features: &[f32]) -> Result<ClassificationResult, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn raw_samples_per_frame(&self) -> usize {
        (**self).raw_samples_per_frame()
    }

    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn labels(&self) -> &[&'static str] {
        (**self).labels()
    }

    fn classify(&mut self, features: &[f32]) -> Result<ClassificationResult, ClassifierError> {
        (**self).classify(features)
    }
}

/// The compiled-in vibration model.
#[derive(Debug, Default)]
pub struct EdgeImpulse;

impl EdgeImpulse {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for EdgeImpulse {
    fn raw_samples_per_frame(&self) -> usize {
        EI_RAW_SAMPLES_PER_FRAME
    }

    fn frame_size(&self) -> usize {
        EI_DSP_INPUT_FRAME_SIZE
    }

    fn labels(&self) -> &[&'static str] {
        &LABELS
    }

    /// `features` must contain exactly `EI_DSP_INPUT_FRAME_SIZE` floats.
    fn classify(&mut self, features: &[f32]) -> Result<ClassificationResult, ClassifierError> {
        if features.len() != EI_DSP_INPUT_FRAME_SIZE {
            return Err(ClassifierError { code: EI_IMPULSE_DSP_ERROR });
        }
        run_inference(features)
    }
}

/// Edge Impulse `EI_IMPULSE_DSP_ERROR`, used for a malformed input frame.
const EI_IMPULSE_DSP_ERROR: i32 = -5;

// ---------------------------------------------------------------------------
// Inference back-end (swap between stub / real FFI)
// ---------------------------------------------------------------------------

fn run_inference(features: &[f32]) -> Result<ClassificationResult, ClassifierError> {
    #[cfg(not(feature = "edge-impulse"))]
    {
        Ok(stub_inference(features))
    }

    #[cfg(feature = "edge-impulse")]
    {
        ffi_inference(features)
    }
}

// ---------------------------------------------------------------------------
// Stub back-end — development / testing without the C++ SDK
// ---------------------------------------------------------------------------
#[cfg(not(feature = "edge-impulse"))]
fn stub_inference(features: &[f32]) -> ClassificationResult {
    use std::time::Instant;

    use crate::events::Timing;

    let dsp_start = Instant::now();
    let estimate = dominant_frequency(features, EI_RAW_SAMPLES_PER_FRAME, EI_CLASSIFIER_FREQUENCY);
    let dsp_ms = dsp_start.elapsed().as_millis() as u32;

    let nn_start = Instant::now();
    let scores = score_labels(estimate);
    let classification_ms = nn_start.elapsed().as_millis() as u32;

    log::debug!("STUB inference — f ≈ {:.1} Hz, scores = {:?}", estimate, scores);

    ClassificationResult { scores, timing: Timing { dsp_ms, classification_ms } }
}

/// Zero-crossing frequency estimate of the first axis, mean removed.
/// Walks the frame in place; nothing is allocated per frame.
#[cfg(not(feature = "edge-impulse"))]
fn dominant_frequency(features: &[f32], stride: usize, sample_hz: u32) -> f32 {
    let axis = || features.iter().step_by(stride.max(1)).copied();

    let len = axis().count();
    if len < 2 {
        return 0.0;
    }

    let mean = axis().sum::<f32>() / len as f32;
    let peak = axis().map(|v| (v - mean).abs()).fold(0.0f32, f32::max);
    if peak < 0.05 {
        return 0.0;
    }
    // Noise around zero must not count as a crossing.
    let hysteresis = peak * 0.2;

    let mut crossings = 0u32;
    let mut above: Option<bool> = None;
    for v in axis().map(|v| v - mean) {
        let side = if v > hysteresis {
            Some(true)
        } else if v < -hysteresis {
            Some(false)
        } else {
            None
        };
        if let Some(side) = side {
            if above.is_some_and(|prev| prev != side) {
                crossings += 1;
            }
            above = Some(side);
        }
    }

    let duration_s = len as f32 / sample_hz as f32;
    crossings as f32 / 2.0 / duration_s
}

/// Scores that peak at the label nearest to `estimate` and sum to 1.
#[cfg(not(feature = "edge-impulse"))]
fn score_labels(estimate: f32) -> [f32; EI_LABEL_COUNT] {
    let mut scores = [0.0f32; EI_LABEL_COUNT];
    for (score, &f) in scores.iter_mut().zip(LABEL_FREQUENCIES.iter()) {
        *score = 1.0 / (1.0 + (f - estimate).abs());
    }
    let total: f32 = scores.iter().sum();
    for score in scores.iter_mut() {
        *score /= total;
    }
    scores
}

// ---------------------------------------------------------------------------
// Real FFI back-end — calls the C++ Edge Impulse compiled library
// ---------------------------------------------------------------------------
//
// `ei_shim.cpp` (compiled by build.rs next to the SDK) owns the
// `signal_t` and `ei_impulse_result_t` on the C++ side and copies the scores
// and timings into flat buffers, so no SDK struct layout crosses the FFI.
#[cfg(feature = "edge-impulse")]
mod ffi {
    extern "C" {
        /// Labels the compiled model emits.
        pub fn vm_ei_label_count() -> usize;

        pub fn vm_ei_classify(
            features: *const f32,
            features_len: usize,
            scores: *mut f32,
            scores_len: usize,
            dsp_ms: *mut i32,
            classification_ms: *mut i32,
        ) -> i32;
    }
}

/// Returned by the shim when the model's label count differs from ours.
#[cfg(feature = "edge-impulse")]
pub const VM_EI_LABEL_COUNT_MISMATCH: i32 = -1000;

#[cfg(feature = "edge-impulse")]
fn ffi_inference(features: &[f32]) -> Result<ClassificationResult, ClassifierError> {
    use crate::events::Timing;

    let mut scores = [0.0f32; EI_LABEL_COUNT];
    let mut dsp_ms: i32 = 0;
    let mut classification_ms: i32 = 0;

    // SAFETY: every pointer is valid for the length passed alongside it for
    // the whole call, and the shim writes at most `scores_len` floats.
    let err = unsafe {
        ffi::vm_ei_classify(
            features.as_ptr(),
            features.len(),
            scores.as_mut_ptr(),
            scores.len(),
            &mut dsp_ms,
            &mut classification_ms,
        )
    };
    if err != 0 {
        log::error!("Edge Impulse classifier error: {}", err);
        return Err(ClassifierError { code: err });
    }

    for (label, score) in LABELS.iter().zip(scores.iter()) {
        log::debug!("{}: {:.4}", label, score);
    }

    Ok(ClassificationResult {
        scores,
        timing: Timing {
            dsp_ms: dsp_ms.max(0) as u32,
            classification_ms: classification_ms.max(0) as u32,
        },
    })
}
