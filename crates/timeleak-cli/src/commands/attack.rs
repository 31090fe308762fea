//! `timeleak length|crack|attack`: run the timing attack against a target.

use timeleak_core::{
    Attack, AttackPlan, HttpTransport, RunReport, StopFlag, SummaryWriter, fmt_secs,
};

use super::report::ConsoleReporter;
use super::{Verbosity, build_config, build_target, fail};
use crate::{RunArgs, TargetArgs};

/// Which phases to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LengthOnly,
    Crack(usize),
    Full,
}

impl Action {
    fn plan(self) -> AttackPlan {
        match self {
            Self::LengthOnly => AttackPlan::LengthOnly,
            Self::Crack(length) => AttackPlan::Crack { length },
            Self::Full => AttackPlan::Full,
        }
    }
}

/// Run the attack command.
pub fn run(action: Action, target_args: &TargetArgs, run_args: &RunArgs, verbosity: Verbosity) {
    if let Action::Crack(0) = action {
        fail("--length must be at least 1");
    }
    let config = build_config(run_args).unwrap_or_else(|e| fail(e));
    let target = build_target(target_args).unwrap_or_else(|e| fail(e));
    let transport = HttpTransport::new(&target).unwrap_or_else(|e| fail(e));

    let stop = StopFlag::new();
    let handler_flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.stop()) {
        log::warn!("cannot install Ctrl+C handler: {e}");
    }

    if verbosity >= Verbosity::Normal {
        println!(
            "Target:    {} (user {:?}, difficulty {})",
            target.base_url, target.user, target.difficulty
        );
        println!("Alphabet:  {} symbols", config.alphabet.chars().count());
        println!("Ranking:   {}", config.mode);
        println!("Press Ctrl+C to stop; partial results are kept.");
    }

    let mut attack = Attack::new(&transport, config)
        .unwrap_or_else(|e| fail(e))
        .with_stop_flag(stop);
    let mut reporter = ConsoleReporter::new(verbosity);
    let report = attack
        .run(action.plan(), &mut reporter)
        .unwrap_or_else(|e| fail(e));

    print_result(&report);

    if !run_args.no_save {
        let writer = SummaryWriter::new(&run_args.output);
        match writer.write(&report, &target) {
            Ok(paths) => {
                println!("\nSummary saved:");
                println!("  {}", paths.json.display());
                println!("  {}", paths.text.display());
            }
            Err(e) => eprintln!("Warning: could not write run summary: {e}"),
        }
    }

    if report.failure.is_some() {
        std::process::exit(1);
    }
}

fn print_result(report: &RunReport) {
    println!("\n{}", "=".repeat(60));
    if report.interrupted {
        println!("Run interrupted; partial results follow.");
    }
    if let Some(failure) = &report.failure {
        println!("Run stopped early: {failure}");
    }
    match (report.plan, report.estimated_length) {
        (AttackPlan::Crack { length }, _) => println!("Secret length:     {length} (given)"),
        (_, Some(length)) => println!("Estimated length:  {length}"),
        (_, None) => println!("Estimated length:  None"),
    }
    if let Some(secret) = &report.secret {
        println!("Discovered secret: {secret}");
    }
    match report.verified {
        Some(true) => println!("Verification:      accepted"),
        Some(false) => println!("Verification:      rejected"),
        None if report.secret.is_some() => println!("Verification:      not attempted"),
        None => {}
    }
    println!("Started:           {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Ended:             {}", report.ended_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Total time:        {}", fmt_secs(report.total_secs));
    if let Some(secs) = report.length_phase_secs {
        println!("Length phase:      {}", fmt_secs(secs));
    }
    if let Some(secs) = report.recovery_phase_secs {
        println!("Recovery phase:    {}", fmt_secs(secs));
    }
}
