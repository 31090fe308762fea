//! Console progress output for attack runs.

use timeleak_core::{
    AttackObserver, CandidateRecord, LengthEstimate, LengthRecord, Phase, PositionTrace,
    RankingTrace, fmt_secs,
};

use super::Verbosity;

/// Prints attack progress to stdout.
pub struct ConsoleReporter {
    verbosity: Verbosity,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn normal(&self) -> bool {
        self.verbosity >= Verbosity::Normal
    }

    fn verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }
}

impl AttackObserver for ConsoleReporter {
    fn on_phase(&mut self, phase: Phase) {
        if !self.normal() {
            return;
        }
        match phase {
            Phase::LengthDiscovery => println!("\n=== Phase 1: length discovery ==="),
            Phase::CharacterRecovery => println!("\n=== Phase 2: character recovery ==="),
            Phase::Idle | Phase::Done => {}
        }
    }

    fn on_length_measured(&mut self, record: &LengthRecord) {
        if self.normal() {
            println!("{}", length_line(record));
        }
    }

    fn on_length_estimated(&mut self, estimate: &LengthEstimate) {
        if self.normal() {
            println!(
                "\nEstimated length: {} (median {})",
                estimate.length,
                fmt_secs(estimate.median)
            );
        }
    }

    fn on_position_start(&mut self, position: usize, length: usize, known: &str) {
        if self.normal() {
            println!(
                "\n[Position {}/{}] known prefix: {:?}",
                position + 1,
                length,
                known
            );
        }
    }

    fn on_position_done(&mut self, trace: &PositionTrace) {
        if self.verbose() {
            match &trace.ranking {
                RankingTrace::TwoStage { quick, full } => {
                    println!("  quick stage:");
                    print_ranking(quick);
                    println!("  full stage:");
                    print_ranking(full);
                }
                RankingTrace::Simple { results } => print_ranking(results),
            }
        }
        if self.normal() {
            println!(
                "  ✓ Selected char '{}' ({}, median {}, {:.2}s, {:.2}s total)",
                trace.symbol,
                trace.method,
                fmt_secs(trace.median),
                trace.position_secs,
                trace.elapsed_secs
            );
        }
    }

    fn on_verified(&mut self, secret: &str, accepted: bool) {
        if self.normal() {
            let verdict = if accepted { "accepted" } else { "rejected" };
            println!("\nVerification of {secret:?}: {verdict}");
        }
    }
}

fn length_line(record: &LengthRecord) -> String {
    format!(
        "[Length {:02}] -> median {} (samples={})",
        record.length,
        fmt_secs(record.median),
        record.samples
    )
}

fn print_ranking(records: &[CandidateRecord]) {
    for (rank, r) in records.iter().enumerate() {
        println!(
            "    {:>2}. '{}' {:<34} {} (samples={})",
            rank + 1,
            r.symbol,
            r.probe,
            fmt_secs(r.median),
            r.samples
        );
    }
}
