// Vibration Monitor — Verdict Reporting
//
// Two wire formats over any `io::Write`:
//   Readable  — progress line per run and a multi-line report per window.
//   Delimited — one `>count,...,field,...<` line per window, nothing else.
// Output is flushed after every write so a serial console sees it at once.

use std::io::{self, Write};

use crate::config::OutputFormat;
use crate::vote::{Outcome, Verdict};

pub trait Reporter {
    /// Called after every recorded run.
    fn progress(&mut self, window: u32, run: usize, window_size: usize) -> io::Result<()>;

    /// Called once per resolved window.
    fn verdict(&mut self, verdict: &Verdict, labels: &[&str]) -> io::Result<()>;
}

pub struct WriterReporter<W> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> WriterReporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterReporter<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> Reporter for WriterReporter<W> {
    fn progress(&mut self, window: u32, run: usize, window_size: usize) -> io::Result<()> {
        if self.format == OutputFormat::Readable {
            write!(self.out, "\rRun #{} loop {} of {}...", window, run, window_size)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn verdict(&mut self, verdict: &Verdict, labels: &[&str]) -> io::Result<()> {
        match self.format {
            OutputFormat::Readable => write_readable(&mut self.out, verdict, labels)?,
            OutputFormat::Delimited => write_delimited(&mut self.out, verdict)?,
        }
        self.out.flush()
    }
}

fn plural(n: u8) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

fn write_readable(out: &mut impl Write, v: &Verdict, labels: &[&str]) -> io::Result<()> {
    let label = |ix: usize| labels.get(ix).copied().unwrap_or("?");

    write!(out, "\r\nDetections:\r\n")?;
    for (ix, count) in v.counts.iter().enumerate() {
        writeln!(out, "\t{}: {}", label(ix), count)?;
    }

    write!(out, "Results:\r\n")?;
    match v.outcome {
        Outcome::NoWinner => write!(out, "\tDetection failure (no winning entry)\r\n")?,
        Outcome::Ambiguous => write!(out, "\tDetection failure (fail bucket count reached)\r\n")?,
        Outcome::GoodFrequency => {
            write!(out, "\tLow frequency ({}) - good\r\n", label(v.max_id))?
        }
        Outcome::BadFrequency => {
            write!(out, "\tHigh/stationary frequency ({}) - bad\r\n", label(v.max_id))?
        }
    }
    if v.high_fail() {
        write!(out, "\tHigh failure rate\r\n")?;
    }

    write!(
        out,
        "\t{} entr{} over winning minimum\r\n\
         \t{} entr{} over error minimum\r\n\
         \t{} entr{} with maximum value\r\n",
        v.entries_over_min,
        plural(v.entries_over_min),
        v.entries_over_err,
        plural(v.entries_over_err),
        v.max_dup,
        plural(v.max_dup),
    )?;
    write!(
        out,
        "Run time:\r\n\tDSP: {}ms\r\n\tClassification: {}ms\r\n\r\n",
        v.timing.dsp_ms, v.timing.classification_ms
    )
}

fn write_delimited(out: &mut impl Write, v: &Verdict) -> io::Result<()> {
    write!(out, ">")?;
    for count in v.counts.iter() {
        write!(out, "{},", count)?;
    }
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{}<",
        v.entries_over_min,
        v.entries_over_err,
        v.max_id,
        v.max_val,
        v.max_dup,
        u8::from(v.good_pass()),
        u8::from(v.bad_pass()),
        u8::from(v.high_fail()),
        u8::from(v.single_fail()),
        v.timing.dsp_ms,
        v.timing.classification_ms,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EI_LABEL_COUNT;
    use crate::ei::LABELS;
    use crate::events::Timing;

    fn verdict(outcome: Outcome, high_failure_rate: bool) -> Verdict {
        let mut counts = [0u8; EI_LABEL_COUNT];
        counts[1] = 15;
        counts[7] = 5;
        Verdict {
            window: 4,
            outcome,
            high_failure_rate,
            failure_streak: u32::from(high_failure_rate) * 3,
            counts,
            max_id: 1,
            max_val: 15,
            max_dup: 1,
            entries_over_min: 1,
            entries_over_err: 2,
            timing: Timing { dsp_ms: 40, classification_ms: 120 },
        }
    }

    fn render(format: OutputFormat, v: &Verdict) -> String {
        let mut r = WriterReporter::new(Vec::new(), format);
        r.verdict(v, &LABELS).unwrap();
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn delimited_line_for_good_pass() {
        let line = render(OutputFormat::Delimited, &verdict(Outcome::GoodFrequency, false));
        assert_eq!(line, ">0,15,0,0,0,0,0,5,0,0,1,2,1,15,1,1,0,0,0,40,120<\n");
    }

    #[test]
    fn delimited_flags_are_exclusive() {
        let single = render(OutputFormat::Delimited, &verdict(Outcome::NoWinner, false));
        assert!(single.ends_with(",0,0,0,1,40,120<\n"), "{}", single);

        let high = render(OutputFormat::Delimited, &verdict(Outcome::Ambiguous, true));
        assert!(high.ends_with(",0,0,1,0,40,120<\n"), "{}", high);

        let bad = render(OutputFormat::Delimited, &verdict(Outcome::BadFrequency, false));
        assert!(bad.ends_with(",0,1,0,0,40,120<\n"), "{}", bad);
    }

    #[test]
    fn readable_report_for_good_pass() {
        let text = render(OutputFormat::Readable, &verdict(Outcome::GoodFrequency, false));
        assert!(text.starts_with("\r\nDetections:\r\n\t0Hz: 0\n\t10Hz: 15\n"));
        assert!(text.contains("\t60Hz: 5\n"));
        assert!(text.contains("Results:\r\n\tLow frequency (10Hz) - good\r\n"));
        assert!(text.contains("\t1 entry over winning minimum\r\n"));
        assert!(text.contains("\t2 entries over error minimum\r\n"));
        assert!(text.contains("\t1 entry with maximum value\r\n"));
        assert!(text.ends_with("Run time:\r\n\tDSP: 40ms\r\n\tClassification: 120ms\r\n\r\n"));
        assert!(!text.contains("failure"));
    }

    #[test]
    fn readable_report_narrates_failures() {
        let text = render(OutputFormat::Readable, &verdict(Outcome::NoWinner, true));
        assert!(text.contains("\tDetection failure (no winning entry)\r\n\tHigh failure rate\r\n"));

        let text = render(OutputFormat::Readable, &verdict(Outcome::Ambiguous, false));
        assert!(text.contains("\tDetection failure (fail bucket count reached)\r\n"));
        assert!(!text.contains("High failure rate"));

        let text = render(OutputFormat::Readable, &verdict(Outcome::BadFrequency, false));
        assert!(text.contains("\tHigh/stationary frequency (10Hz) - bad\r\n"));
    }

    #[test]
    fn progress_only_in_readable_mode() {
        let mut r = WriterReporter::new(Vec::new(), OutputFormat::Readable);
        r.progress(3, 7, 20).unwrap();
        assert_eq!(r.into_inner(), b"\rRun #3 loop 7 of 20...");

        let mut r = WriterReporter::new(Vec::new(), OutputFormat::Delimited);
        r.progress(3, 7, 20).unwrap();
        assert!(r.into_inner().is_empty());
    }
}
