// Vibration Monitor — Closed Loop
//
//   sensor -> sampler -> classifier -> vote aggregator -> reporter
//
// Strictly sequential: one frame is sampled, classified and recorded before
// the next one starts. The pipeline owns every stage, so the feature buffer
// and the window state are never shared.

use crate::config::PipelineConfig;
use crate::drivers::SensorSource;
use crate::ei::Classifier;
use crate::error::{ConfigError, PipelineError};
use crate::report::Reporter;
use crate::sampler::{DeadlineTimer, FrameSampler};
use crate::vote::{Verdict, VoteAggregator, VoteConfig};

pub struct Pipeline<S, T, C, R> {
    sampler: FrameSampler<S, T>,
    classifier: C,
    votes: VoteAggregator,
    reporter: R,
    max_windows: Option<u32>,
}

impl<S, T, C, R> Pipeline<S, T, C, R>
where
    S: SensorSource,
    T: DeadlineTimer,
    C: Classifier,
    R: Reporter,
{
    /// Assemble the loop, checking the configuration and that the enabled
    /// axes match what the classifier was trained on.
    pub fn new(
        config: &PipelineConfig,
        sensor: S,
        timer: T,
        classifier: C,
        reporter: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let votes = VoteAggregator::new(VoteConfig::from(config))?;

        let enabled = config.axes.count();
        let expected = classifier.raw_samples_per_frame();
        if enabled != expected {
            return Err(ConfigError::AxisArity { enabled, expected });
        }
        let frame_size = classifier.frame_size();
        if frame_size == 0 || frame_size % expected != 0 {
            return Err(ConfigError::FrameSize { frame_size, arity: expected });
        }

        let sampler = FrameSampler::new(sensor, timer, config.axes, frame_size, config.sampling_hz);
        log::info!(
            "Pipeline ready — {} samples x {} axes every {} us, window of {} runs",
            sampler.frame_samples(),
            enabled,
            sampler.period().as_micros(),
            config.window_size
        );

        Ok(Self {
            sampler,
            classifier,
            votes,
            reporter,
            max_windows: config.max_windows,
        })
    }

    pub fn votes(&self) -> &VoteAggregator {
        &self.votes
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Sample, classify and record one frame. Returns the verdict when this
    /// frame completes a window.
    pub fn step(&mut self) -> Result<Option<Verdict>, PipelineError> {
        let features = self.sampler.acquire_frame()?;
        let result = self.classifier.classify(features)?;

        let window = self.votes.window_index();
        let verdict = self.votes.record(&result);

        // The run that completes a window is reported as run W of W.
        let run = match verdict {
            Some(_) => self.votes.config().window_size,
            None => self.votes.runs_in_window(),
        };
        self.reporter.progress(window, run, self.votes.config().window_size)?;

        if let Some(verdict) = &verdict {
            self.reporter.verdict(verdict, self.classifier.labels())?;
        }
        Ok(verdict)
    }

    /// Run until `max_windows` verdicts have been produced, or forever.
    pub fn run(&mut self) -> Result<(), PipelineError> {
        let mut windows = 0u32;
        loop {
            if self.max_windows.is_some_and(|max| windows >= max) {
                log::info!("Completed {} windows — stopping", windows);
                return Ok(());
            }
            if let Some(verdict) = self.step()? {
                windows += 1;
                if verdict.high_fail() {
                    log::warn!(
                        "High failure rate — {} failed windows in a row",
                        verdict.failure_streak
                    );
                }
            }
        }
    }
}
