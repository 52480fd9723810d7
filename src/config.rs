// Vibration Monitor — Hardware & Pipeline Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V) + IIS2DLPC accelerometer

use crate::error::ConfigError;
use crate::vote::VoteConfig;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6; // D4 — I2C data line
pub const PIN_I2C_SCL: i32 = 7; // D5 — I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_IIS2DLPC: u8 = 0x19; // SA0 pulled high
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// IIS2DLPC Sensor Scale
// ---------------------------------------------------------------------------
pub const ACCEL_MG_PER_LSB_2G: f64 = 0.244; // 14-bit high-performance, ±2 g
pub const STANDARD_GRAVITY: f64 = 9.806_65; // m/s² per g

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_PIPELINE: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// AI / Edge Impulse Model
// ---------------------------------------------------------------------------
pub const EI_CLASSIFIER_FREQUENCY: u32 = 400; // Hz
pub const EI_RAW_SAMPLES_PER_FRAME: usize = 3; // accX, accY, accZ
pub const EI_RAW_SAMPLE_COUNT: usize = 200; // 0.5-second window @ 400 Hz
pub const EI_DSP_INPUT_FRAME_SIZE: usize = EI_RAW_SAMPLE_COUNT * EI_RAW_SAMPLES_PER_FRAME; // 600
pub const EI_LABEL_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// Vote Window
// ---------------------------------------------------------------------------
/// Classification runs aggregated into one verdict.
pub const CHECK_BUCKETS: usize = 20;

/// Labels with at least this many wins are candidate winners.
pub const MIN_BUCKETS: usize = CHECK_BUCKETS / 2;

/// Labels with at least this many wins are contending error buckets.
pub const ERR_BUCKETS: usize = CHECK_BUCKETS / 4;

/// Contending buckets at which a window is ambiguous.
pub const ERR_BUCKETS_FAIL_COUNT: usize = 3;

/// Failed windows in a row that raise the high-failure-rate flag.
pub const ERR_FAILS_IN_ROW: u32 = 3;

/// Label indices considered low (good) vibration: 10, 20, 30, 40 and 50 Hz.
pub const GOOD_LABELS: [usize; 5] = [1, 3, 4, 5, 6];

// ---------------------------------------------------------------------------
// Host simulator
// ---------------------------------------------------------------------------
pub const SIM_VIBRATION_HZ: f64 = 20.0;
pub const SIM_AMPLITUDE: f64 = 4.0; // m/s²
pub const SIM_NOISE: f64 = 0.3; // m/s², uniform
pub const SIM_SEED: u64 = 0x5EED;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Accelerometer axis, in feature-frame order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Set of enabled axes. Always iterated X → Y → Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSet {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisSet {
    pub const ALL: Self = Self { x: true, y: true, z: true };

    pub fn count(&self) -> usize {
        [self.x, self.y, self.z].iter().filter(|&&on| on).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Axis> {
        let set = *self;
        [(Axis::X, set.x), (Axis::Y, set.y), (Axis::Z, set.z)]
            .into_iter()
            .filter_map(|(axis, on)| on.then_some(axis))
    }

    /// Parse a subset of "xyz" (case-insensitive, any order).
    pub fn parse(s: &str) -> Option<Self> {
        let mut set = Self { x: false, y: false, z: false };
        for c in s.chars() {
            match c.to_ascii_lowercase() {
                'x' => set.x = true,
                'y' => set.y = true,
                'z' => set.z = true,
                _ => return None,
            }
        }
        Some(set)
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        Self::ALL
    }
}

/// Report wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Readable,
    Delimited,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "readable" => Some(Self::Readable),
            "delimited" => Some(Self::Delimited),
            _ => None,
        }
    }
}

impl Default for OutputFormat {
    #[cfg(not(feature = "delimited-output"))]
    fn default() -> Self {
        Self::Readable
    }

    #[cfg(feature = "delimited-output")]
    fn default() -> Self {
        Self::Delimited
    }
}

/// How the sampler blocks until the next sample deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    #[default]
    Spin,
    Sleep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub axes: AxisSet,
    pub output: OutputFormat,
    pub window_size: usize,
    pub sampling_hz: u32,
    pub good_labels: Vec<usize>,
    pub timer: TimerMode,
    /// Stop after this many verdicts; `None` runs forever.
    pub max_windows: Option<u32>,
    pub sim_vibration_hz: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            axes: AxisSet::ALL,
            output: OutputFormat::default(),
            window_size: CHECK_BUCKETS,
            sampling_hz: EI_CLASSIFIER_FREQUENCY,
            good_labels: GOOD_LABELS.to_vec(),
            timer: TimerMode::default(),
            max_windows: None,
            sim_vibration_hz: SIM_VIBRATION_HZ,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `VIBE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("VIBE_OUTPUT") {
            match OutputFormat::parse(&v) {
                Some(output) => config.output = output,
                None => log::warn!("Ignoring VIBE_OUTPUT={:?} (expected readable|delimited)", v),
            }
        }
        if let Some(v) = lookup("VIBE_AXES") {
            match AxisSet::parse(&v) {
                Some(axes) => config.axes = axes,
                None => log::warn!("Ignoring VIBE_AXES={:?} (expected a subset of xyz)", v),
            }
        }
        if let Some(v) = lookup("VIBE_WINDOWS") {
            match v.parse::<u32>() {
                Ok(n) => config.max_windows = Some(n),
                Err(_) => log::warn!("Ignoring VIBE_WINDOWS={:?}", v),
            }
        }
        if let Some(v) = lookup("VIBE_SIM_HZ") {
            match v.parse::<f64>() {
                Ok(hz) if hz.is_finite() && hz >= 0.0 => config.sim_vibration_hz = hz,
                _ => log::warn!("Ignoring VIBE_SIM_HZ={:?}", v),
            }
        }
        if let Some(v) = lookup("VIBE_TIMER") {
            match v.to_ascii_lowercase().as_str() {
                "spin" => config.timer = TimerMode::Spin,
                "sleep" => config.timer = TimerMode::Sleep,
                _ => log::warn!("Ignoring VIBE_TIMER={:?} (expected spin|sleep)", v),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::NoAxes);
        }
        if self.sampling_hz < 2 {
            return Err(ConfigError::SamplingRate(self.sampling_hz));
        }
        VoteConfig::from(self).validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reference_thresholds() {
        assert_eq!(MIN_BUCKETS, 10);
        assert_eq!(ERR_BUCKETS, 5);
        assert_eq!(EI_DSP_INPUT_FRAME_SIZE % EI_RAW_SAMPLES_PER_FRAME, 0);
    }

    #[test]
    fn axis_set_iterates_in_fixed_order() {
        let set = AxisSet::parse("zx").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Axis::X, Axis::Z]);
        assert_eq!(set.count(), 2);
        assert!(AxisSet::parse("xw").is_none());
        assert!(AxisSet::parse("").unwrap().is_empty());
    }

    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = PipelineConfig::default();
        c.axes = AxisSet { x: false, y: false, z: false };
        assert!(matches!(c.validate(), Err(ConfigError::NoAxes)));

        let mut c = PipelineConfig::default();
        c.sampling_hz = 1;
        assert!(matches!(c.validate(), Err(ConfigError::SamplingRate(1))));

        let mut c = PipelineConfig::default();
        c.window_size = 3;
        assert!(matches!(c.validate(), Err(ConfigError::WindowSize(3))));
        c.window_size = 256;
        assert!(matches!(c.validate(), Err(ConfigError::WindowSize(256))));

        let mut c = PipelineConfig::default();
        c.good_labels = vec![1, EI_LABEL_COUNT];
        assert!(matches!(c.validate(), Err(ConfigError::GoodLabel(l)) if l == EI_LABEL_COUNT));
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("VIBE_OUTPUT", "Delimited"),
            ("VIBE_AXES", "xy"),
            ("VIBE_WINDOWS", "not-a-number"),
            ("VIBE_SIM_HZ", "60"),
            ("VIBE_TIMER", "sleep"),
        ]
        .into_iter()
        .collect();
        let c = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(c.output, OutputFormat::Delimited);
        assert_eq!(c.axes, AxisSet { x: true, y: true, z: false });
        assert_eq!(c.max_windows, None);
        assert_eq!(c.sim_vibration_hz, 60.0);
        assert_eq!(c.timer, TimerMode::Sleep);
    }
}
