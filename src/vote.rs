// Vibration Monitor — Classification Vote Aggregator
//
// Collects the winning label of every classification run. Once a window of
// runs is complete the counts are resolved into a verdict:
//
//   1. No label reached the winning minimum          -> NoWinner
//   2. Too many labels reached the error minimum     -> Ambiguous
//   3. Otherwise the most frequent label wins        -> Good/BadFrequency
//
// Failed windows (1 and 2) extend a failure streak that survives window
// resets; a clear winner clears it. A streak of `ERR_FAILS_IN_ROW` or more
// raises the high-failure-rate flag on the failing verdict.

use crate::config::*;
use crate::error::ConfigError;
use crate::events::{ClassificationResult, Timing};

/// Base classification of a resolved window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No label reached the winning minimum.
    NoWinner,
    /// A label reached the minimum but too many others contend.
    Ambiguous,
    /// Winner is in the known-good frequency set.
    GoodFrequency,
    /// Winner is outside the known-good set (high or stationary).
    BadFrequency,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NoWinner | Self::Ambiguous)
    }
}

/// Resolved outcome of one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// 1-based window number.
    pub window: u32,
    pub outcome: Outcome,
    pub high_failure_rate: bool,
    /// Consecutive failed windows, including this one.
    pub failure_streak: u32,
    pub counts: [u8; EI_LABEL_COUNT],
    pub max_id: usize,
    pub max_val: u8,
    pub max_dup: u8,
    pub entries_over_min: u8,
    pub entries_over_err: u8,
    /// Classifier time summed over the window.
    pub timing: Timing,
}

impl Verdict {
    pub fn good_pass(&self) -> bool {
        self.outcome == Outcome::GoodFrequency
    }

    pub fn bad_pass(&self) -> bool {
        self.outcome == Outcome::BadFrequency
    }

    pub fn high_fail(&self) -> bool {
        self.outcome.is_failure() && self.high_failure_rate
    }

    /// A failed window that has not (yet) become a high failure rate.
    pub fn single_fail(&self) -> bool {
        self.outcome.is_failure() && !self.high_failure_rate
    }
}

/// Window geometry and the known-good label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteConfig {
    pub window_size: usize,
    pub good_labels: Vec<usize>,
}

impl VoteConfig {
    pub fn min_buckets(&self) -> usize {
        self.window_size / 2
    }

    pub fn err_buckets(&self) -> usize {
        self.window_size / 4
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Both thresholds must be non-zero and every count must fit in a u8.
        if !(4..=u8::MAX as usize).contains(&self.window_size) {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if let Some(&label) = self.good_labels.iter().find(|&&l| l >= EI_LABEL_COUNT) {
            return Err(ConfigError::GoodLabel(label));
        }
        Ok(())
    }
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self { window_size: CHECK_BUCKETS, good_labels: GOOD_LABELS.to_vec() }
    }
}

impl From<&PipelineConfig> for VoteConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self { window_size: config.window_size, good_labels: config.good_labels.clone() }
    }
}

pub struct VoteAggregator {
    config: VoteConfig,
    counts: [u8; EI_LABEL_COUNT],
    runs: usize,
    failure_streak: u32,
    window: u32,
    timing: Timing,
}

impl VoteAggregator {
    pub fn new(config: VoteConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            counts: [0; EI_LABEL_COUNT],
            runs: 0,
            failure_streak: 0,
            window: 1,
            timing: Timing::default(),
        })
    }

    pub fn config(&self) -> &VoteConfig {
        &self.config
    }

    /// Runs recorded in the current window.
    pub fn runs_in_window(&self) -> usize {
        self.runs
    }

    /// 1-based number of the window being filled.
    pub fn window_index(&self) -> u32 {
        self.window
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Record one classification run. Returns the verdict on the run that
    /// completes a window, `None` otherwise.
    pub fn record(&mut self, result: &ClassificationResult) -> Option<Verdict> {
        self.record_winner(result.winner(), result.timing)
    }

    /// Record a run whose winning label is already known. A label outside
    /// the model's label set is dropped and does not count as a run.
    pub fn record_winner(&mut self, label: usize, timing: Timing) -> Option<Verdict> {
        let Some(count) = self.counts.get_mut(label) else {
            log::warn!("Dropping vote for unknown label {}", label);
            return None;
        };
        *count = count.saturating_add(1);
        self.runs += 1;
        self.timing.dsp_ms = self.timing.dsp_ms.saturating_add(timing.dsp_ms);
        self.timing.classification_ms =
            self.timing.classification_ms.saturating_add(timing.classification_ms);

        if self.runs < self.config.window_size {
            return None;
        }

        let verdict = self.resolve();
        log::debug!("Window #{} resolved: {:?}", verdict.window, verdict);

        self.counts = [0; EI_LABEL_COUNT];
        self.runs = 0;
        self.timing = Timing::default();
        self.window = self.window.wrapping_add(1);

        Some(verdict)
    }

    fn resolve(&mut self) -> Verdict {
        let min = self.config.min_buckets();
        let err = self.config.err_buckets();

        let mut entries_over_min: u8 = 0;
        let mut entries_over_err: u8 = 0;
        let mut max_id = 0;
        let mut max_val: u8 = 0;
        let mut max_dup: u8 = 1;

        for (ix, &count) in self.counts.iter().enumerate() {
            if usize::from(count) >= min {
                entries_over_min += 1;
            }
            if usize::from(count) >= err {
                entries_over_err += 1;
            }
            if count == max_val {
                max_dup = max_dup.saturating_add(1);
            } else if count > max_val {
                max_id = ix;
                max_val = count;
                max_dup = 1;
            }
        }

        let outcome = if entries_over_min == 0 {
            Outcome::NoWinner
        } else if usize::from(entries_over_err) >= ERR_BUCKETS_FAIL_COUNT {
            Outcome::Ambiguous
        } else if self.config.good_labels.contains(&max_id) {
            Outcome::GoodFrequency
        } else {
            Outcome::BadFrequency
        };

        if outcome.is_failure() {
            self.failure_streak = self.failure_streak.saturating_add(1);
        } else {
            self.failure_streak = 0;
        }

        Verdict {
            window: self.window,
            outcome,
            high_failure_rate: outcome.is_failure() && self.failure_streak >= ERR_FAILS_IN_ROW,
            failure_streak: self.failure_streak,
            counts: self.counts,
            max_id,
            max_val,
            max_dup,
            entries_over_min,
            entries_over_err,
            timing: self.timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(agg: &mut VoteAggregator, labels: &[usize]) -> Option<Verdict> {
        let mut last = None;
        for &label in labels {
            assert!(last.is_none(), "verdict before the window was complete");
            last = agg.record_winner(label, Timing::default());
        }
        last
    }

    fn window_of(pattern: &[(usize, usize)]) -> Vec<usize> {
        pattern
            .iter()
            .flat_map(|&(label, n)| std::iter::repeat(label).take(n))
            .collect()
    }

    fn fresh() -> VoteAggregator {
        VoteAggregator::new(VoteConfig::default()).unwrap()
    }

    fn small(good: usize) -> VoteAggregator {
        VoteAggregator::new(VoteConfig { window_size: 4, good_labels: vec![good] }).unwrap()
    }

    fn no_winner_window() -> Vec<usize> {
        window_of(&[(0, 4), (2, 4), (7, 4), (8, 4), (9, 4)])
    }

    #[test]
    fn unanimous_good_label() {
        let mut agg = fresh();
        let v = feed(&mut agg, &[1; 20]).unwrap();

        assert_eq!(v.window, 1);
        assert_eq!(v.outcome, Outcome::GoodFrequency);
        assert_eq!((v.max_id, v.max_val, v.max_dup), (1, 20, 1));
        assert_eq!((v.entries_over_min, v.entries_over_err), (1, 1));
        assert!(!v.high_failure_rate);
        assert!(v.good_pass() && !v.bad_pass() && !v.high_fail() && !v.single_fail());
    }

    #[test]
    fn even_split_keeps_first_maximum() {
        let mut agg = fresh();
        let v = feed(&mut agg, &window_of(&[(7, 10), (1, 10)])).unwrap();

        assert_eq!((v.entries_over_min, v.entries_over_err), (2, 2));
        assert_eq!((v.max_id, v.max_val, v.max_dup), (1, 10, 2));
        assert_eq!(v.outcome, Outcome::GoodFrequency);
        assert_eq!(agg.failure_streak(), 0);
    }

    #[test]
    fn winner_outside_good_set_is_bad() {
        let mut agg = fresh();
        let v = feed(&mut agg, &window_of(&[(7, 12), (3, 8)])).unwrap();
        assert_eq!(v.outcome, Outcome::BadFrequency);
        assert_eq!(v.max_id, 7);
        assert!(v.bad_pass());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut agg = fresh();
        let v = feed(&mut agg, &window_of(&[(3, 10), (5, 5), (8, 5)])).unwrap();
        assert_eq!(v.entries_over_min, 1);
        assert_eq!(v.entries_over_err, 3);

        let v = feed(&mut agg, &window_of(&[(3, 9), (5, 4), (8, 7)])).unwrap();
        assert_eq!(v.entries_over_min, 0);
        assert_eq!(v.entries_over_err, 2);
    }

    #[test]
    fn spread_votes_are_no_winner() {
        let mut agg = fresh();
        let v = feed(&mut agg, &no_winner_window()).unwrap();
        assert_eq!(v.outcome, Outcome::NoWinner);
        assert_eq!(v.entries_over_min, 0);
        assert_eq!(v.failure_streak, 1);
        assert!(v.single_fail() && !v.high_fail());
    }

    #[test]
    fn three_contenders_are_ambiguous() {
        let mut agg = fresh();
        let v = feed(&mut agg, &window_of(&[(4, 10), (2, 5), (9, 5)])).unwrap();
        assert_eq!(v.outcome, Outcome::Ambiguous);
        assert_eq!(v.max_id, 4);
        assert_eq!(agg.failure_streak(), 1);
    }

    #[test]
    fn streak_survives_mixed_failures_and_clear_winner_resets_it() {
        let mut agg = fresh();
        let ambiguous = window_of(&[(4, 10), (2, 5), (9, 5)]);

        let v1 = feed(&mut agg, &no_winner_window()).unwrap();
        let v2 = feed(&mut agg, &ambiguous).unwrap();
        let v3 = feed(&mut agg, &no_winner_window()).unwrap();
        assert_eq!((v1.failure_streak, v2.failure_streak, v3.failure_streak), (1, 2, 3));
        assert!(!v1.high_failure_rate && !v2.high_failure_rate);
        assert!(v3.high_failure_rate && v3.high_fail() && !v3.single_fail());
        assert_eq!(v3.outcome, Outcome::NoWinner);

        let v4 = feed(&mut agg, &[5; 20]).unwrap();
        assert_eq!(v4.outcome, Outcome::GoodFrequency);
        assert!(!v4.high_failure_rate);
        assert_eq!(v4.failure_streak, 0);

        let v5 = feed(&mut agg, &no_winner_window()).unwrap();
        assert_eq!(v5.failure_streak, 1);
        assert!(!v5.high_failure_rate);
    }

    #[test]
    fn window_state_resets_and_index_advances() {
        let mut agg = fresh();
        let labels = window_of(&[(2, 7), (6, 13)]);
        for (i, &label) in labels.iter().enumerate().take(19) {
            assert!(agg.record_winner(label, Timing::default()).is_none());
            assert_eq!(agg.runs_in_window(), i + 1);
        }
        let v = agg.record_winner(labels[19], Timing::default()).unwrap();
        assert_eq!(v.counts.iter().map(|&c| usize::from(c)).sum::<usize>(), 20);

        assert_eq!(agg.runs_in_window(), 0);
        assert_eq!(agg.window_index(), 2);
        let v2 = feed(&mut agg, &[0; 20]).unwrap();
        assert_eq!(v2.window, 2);
        assert_eq!(v2.counts[0], 20);
        assert_eq!(v2.counts[6], 0);
    }

    #[test]
    fn timing_is_summed_per_window() {
        let mut agg = small(1);
        let t = Timing { dsp_ms: 3, classification_ms: 7 };
        for _ in 0..3 {
            assert!(agg.record_winner(1, t).is_none());
        }
        let v = agg.record_winner(1, t).unwrap();
        assert_eq!(v.timing, Timing { dsp_ms: 12, classification_ms: 28 });

        let v = feed(&mut agg, &[1; 4]).unwrap();
        assert_eq!(v.timing, Timing::default());
    }

    #[test]
    fn records_full_classification_results() {
        let mut agg = small(3);
        let mut scores = [0.0; EI_LABEL_COUNT];
        scores[3] = 0.8;
        scores[9] = 0.8;
        let result = ClassificationResult::new(scores);
        let v = (0..4).find_map(|_| agg.record(&result)).unwrap();
        assert_eq!(v.max_id, 3);
        assert_eq!(v.outcome, Outcome::GoodFrequency);
    }

    #[test]
    fn resolution_depends_only_on_counts() {
        let labels = window_of(&[(1, 6), (3, 11), (8, 3)]);
        let mut shuffled = labels.clone();
        shuffled.reverse();

        let a = feed(&mut fresh(), &labels).unwrap();
        let b = feed(&mut fresh(), &shuffled).unwrap();
        assert_eq!(a, b);
        assert_eq!((a.max_id, a.entries_over_min, a.entries_over_err), (3, 1, 2));
    }

    #[test]
    fn window_too_small_for_thresholds_is_rejected() {
        for window_size in [0, 1, 2, 3, 256] {
            let config = VoteConfig { window_size, good_labels: vec![1] };
            assert_eq!(
                VoteAggregator::new(config).err(),
                Some(ConfigError::WindowSize(window_size))
            );
        }
        let config = VoteConfig { window_size: 20, good_labels: vec![EI_LABEL_COUNT] };
        assert_eq!(
            VoteAggregator::new(config).err(),
            Some(ConfigError::GoodLabel(EI_LABEL_COUNT))
        );
        assert!(VoteAggregator::new(VoteConfig { window_size: 4, good_labels: vec![] }).is_ok());
    }

    #[test]
    fn unknown_label_is_dropped_without_counting_a_run() {
        let mut agg = small(1);
        let t = Timing { dsp_ms: 50, classification_ms: 50 };
        assert!(agg.record_winner(EI_LABEL_COUNT, t).is_none());
        assert!(agg.record_winner(42, t).is_none());
        assert_eq!(agg.runs_in_window(), 0);

        let v = feed(&mut agg, &[1; 4]).unwrap();
        assert_eq!(v.counts.iter().map(|&c| usize::from(c)).sum::<usize>(), 4);
        assert_eq!(v.counts[EI_LABEL_COUNT - 1], 0);
        assert_eq!(v.timing, Timing::default());
        assert_eq!(v.outcome, Outcome::GoodFrequency);
    }
}
