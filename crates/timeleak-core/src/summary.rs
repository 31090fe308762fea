//! Run summary persistence.
//!
//! Each run produces two files in the output directory:
//! - `run_summary_<YYYYMMDD_HHMMSS>.json`: the full [`RunReport`] plus
//!   target details and a short summary block
//! - `run_summary_<YYYYMMDD_HHMMSS>.txt`: a human-readable digest

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::attack::RunReport;
use crate::config::TargetConfig;
use crate::error::Result;
use crate::stats::fmt_secs;

/// Headline numbers written at the top of the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: u32,
    pub run_id: String,
    pub started_at: String,
    pub ended_at: String,
    pub total_elapsed_secs: f64,
    pub estimated_length: Option<usize>,
    pub secret: Option<String>,
    pub verified: Option<bool>,
    pub interrupted: bool,
    pub positions: usize,
    pub timeleak_version: String,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            version: 1,
            run_id: report.run_id.clone(),
            started_at: report.started_at.to_rfc3339(),
            ended_at: report.ended_at.to_rfc3339(),
            total_elapsed_secs: report.total_secs,
            estimated_length: report.estimated_length,
            secret: report.secret.clone(),
            verified: report.verified,
            interrupted: report.interrupted,
            positions: report.positions.len(),
            timeleak_version: crate::VERSION.to_string(),
        }
    }
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    summary: RunSummary,
    target: &'a TargetConfig,
    report: &'a RunReport,
}

/// Paths of the files written for one run.
#[derive(Debug, Clone)]
pub struct SummaryPaths {
    pub json: PathBuf,
    pub text: PathBuf,
}

/// Writes run summaries into one output directory.
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    output_dir: PathBuf,
}

impl SummaryWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the JSON and text summaries for `report`.
    pub fn write(&self, report: &RunReport, target: &TargetConfig) -> Result<SummaryPaths> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = format!("run_summary_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let paths = self.unique_paths(&stem);

        let file = SummaryFile {
            summary: RunSummary::from_report(report),
            target,
            report,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&paths.json, json)?;

        let mut txt = BufWriter::new(File::create(&paths.text)?);
        write_text(&mut txt, report, target)?;
        txt.flush()?;

        log::info!("run summary written to {}", paths.json.display());
        Ok(paths)
    }

    /// Two runs finishing in the same second get distinct files.
    fn unique_paths(&self, stem: &str) -> SummaryPaths {
        let mut n = 0;
        loop {
            let name = if n == 0 {
                stem.to_string()
            } else {
                format!("{stem}_{n}")
            };
            let json = self.output_dir.join(format!("{name}.json"));
            if !json.exists() {
                let text = self.output_dir.join(format!("{name}.txt"));
                return SummaryPaths { json, text };
            }
            n += 1;
        }
    }
}

fn write_text(w: &mut impl Write, report: &RunReport, target: &TargetConfig) -> std::io::Result<()> {
    let rule = "=".repeat(60);
    writeln!(w, "{rule}")?;
    writeln!(w, "TIMING SIDE-CHANNEL RUN SUMMARY")?;
    writeln!(w, "{rule}")?;
    writeln!(w, "Run:      {}", report.run_id)?;
    writeln!(w, "Start:    {}", report.started_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(w, "End:      {}", report.ended_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(w, "Duration: {}", fmt_secs(report.total_secs))?;
    if let Some(secs) = report.length_phase_secs {
        writeln!(w, "  length discovery:   {}", fmt_secs(secs))?;
    }
    if let Some(secs) = report.recovery_phase_secs {
        writeln!(w, "  character recovery: {}", fmt_secs(secs))?;
    }
    writeln!(w)?;

    let c = &report.config;
    writeln!(w, "CONFIG:")?;
    writeln!(w, "  - target: {}", target.base_url)?;
    writeln!(w, "  - user: {}", target.user)?;
    writeln!(w, "  - difficulty: {}", target.difficulty)?;
    writeln!(w, "  - alphabet: {}", c.alphabet)?;
    writeln!(w, "  - max_length: {}", c.max_length)?;
    writeln!(w, "  - mode: {}", c.mode)?;
    writeln!(
        w,
        "  - length stage: {} samples / {} workers",
        c.length_stage.samples, c.length_stage.workers
    )?;
    match c.mode {
        crate::config::RankingMode::TwoStage => {
            writeln!(w, "  - quick stage: {} samples / {} workers", c.quick.samples, c.quick.workers)?;
            writeln!(w, "  - full stage: {} samples / {} workers", c.full.samples, c.full.workers)?;
            writeln!(w, "  - top_k: {}", c.top_k)?;
        }
        crate::config::RankingMode::Simple => {
            writeln!(w, "  - simple stage: {} samples / {} workers", c.simple.samples, c.simple.workers)?;
        }
    }
    writeln!(w)?;

    writeln!(w, "RESULT:")?;
    let or_none = |v: Option<String>| v.unwrap_or_else(|| "None".to_string());
    writeln!(w, "  - Secret length: {}", or_none(report.estimated_length.map(|l| l.to_string())))?;
    writeln!(w, "  - Discovered secret: {}", or_none(report.secret.clone()))?;
    let verdict = match report.verified {
        Some(true) => "accepted",
        Some(false) => "rejected",
        None => "not attempted",
    };
    writeln!(w, "  - Verification: {verdict}")?;
    writeln!(w, "  - Per-character results: {}", report.positions.len())?;
    if report.interrupted {
        writeln!(w, "  - Interrupted by operator")?;
    }
    if let Some(reason) = &report.failure {
        writeln!(w, "  - Stopped early: {reason}")?;
    }
    for p in &report.positions {
        writeln!(
            w,
            "    [{:>2}] '{}' median {} ({})",
            p.position,
            p.symbol,
            fmt_secs(p.median),
            p.method
        )?;
    }
    writeln!(w)?;
    writeln!(w, "(For details see JSON file.)")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::{Attack, AttackPlan, SilentObserver};
    use crate::config::{AttackConfig, RankingMode, StageParams};
    use crate::transport::Transport;
    use std::time::Duration;

    struct EchoTarget;

    impl Transport for EchoTarget {
        fn probe(&self, candidate: &str) -> Option<Duration> {
            let hits = candidate.chars().take_while(|&c| c == 'c').count();
            Some(Duration::from_millis(10 + 5 * hits as u64))
        }

        fn verify(&self, candidate: &str) -> bool {
            candidate == "ccc"
        }
    }

    fn report() -> RunReport {
        let cfg = AttackConfig {
            alphabet: "abc".to_string(),
            simple: StageParams::new(1, 1),
            mode: RankingMode::Simple,
            ..Default::default()
        };
        Attack::new(&EchoTarget, cfg)
            .unwrap()
            .run(AttackPlan::Crack { length: 3 }, &mut SilentObserver)
            .unwrap()
    }

    #[test]
    fn test_writer_creates_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(tmp.path().join("runs"));
        let paths = writer.write(&report(), &TargetConfig::new("alice")).unwrap();
        assert!(paths.json.exists());
        assert!(paths.text.exists());
        let name = paths.json.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("run_summary_"));
    }

    #[test]
    fn test_json_contains_summary_and_trace() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(tmp.path());
        let paths = writer.write(&report(), &TargetConfig::new("alice")).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["summary"]["version"], 1);
        assert_eq!(json["summary"]["secret"], "ccc");
        assert_eq!(json["summary"]["verified"], true);
        assert_eq!(json["summary"]["positions"], 3);
        assert_eq!(json["target"]["user"], "alice");
        assert_eq!(json["report"]["positions"].as_array().unwrap().len(), 3);

        let parsed: RunReport = serde_json::from_value(json["report"].clone()).unwrap();
        assert_eq!(parsed.secret.as_deref(), Some("ccc"));
    }

    #[test]
    fn test_text_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(tmp.path());
        let paths = writer.write(&report(), &TargetConfig::new("bob")).unwrap();
        let text = std::fs::read_to_string(&paths.text).unwrap();
        assert!(text.contains("TIMING SIDE-CHANNEL RUN SUMMARY"));
        assert!(text.contains("Discovered secret: ccc"));
        assert!(text.contains("Verification: accepted"));
        assert!(text.contains("simple stage: 1 samples / 1 workers"));
        assert!(text.contains("Secret length: None"));
    }

    #[test]
    fn test_same_second_runs_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(tmp.path());
        let r = report();
        let target = TargetConfig::new("alice");
        let a = writer.write(&r, &target).unwrap();
        let b = writer.write(&r, &target).unwrap();
        assert_ne!(a.json, b.json);
        assert!(a.json.exists() && b.json.exists());
    }
}
