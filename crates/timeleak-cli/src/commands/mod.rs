pub mod attack;
pub mod report;
pub mod server;
pub mod verify;

use std::path::Path;

use timeleak_core::{AttackConfig, RankingMode, StageParams, TargetConfig};

use crate::{RunArgs, TargetArgs};

/// How much the console reporter prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose > 0 {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

/// Initialize `env_logger`. `RUST_LOG` wins over the flags.
pub fn init_logging(verbosity: Verbosity, verbose: u8) {
    let level = match (verbosity, verbose) {
        (Verbosity::Quiet, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

/// Build the attack configuration: defaults, then `--config`, then flags.
pub fn build_config(args: &RunArgs) -> Result<AttackConfig, String> {
    let mut config = match &args.config {
        Some(path) => AttackConfig::from_json_file(Path::new(path))
            .map_err(|e| format!("cannot load config '{path}': {e}"))?,
        None => AttackConfig::default(),
    };

    if let Some(alphabet) = &args.alphabet {
        config.alphabet = alphabet.clone();
    }
    if let Some(max_length) = args.max_length {
        config.max_length = max_length;
    }
    if args.simple {
        config.mode = RankingMode::Simple;
    }
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    override_stage(&mut config.length_stage, args.measurements, args.workers);
    override_stage(&mut config.quick, args.quick_measurements, args.quick_workers);
    override_stage(&mut config.full, args.full_measurements, args.full_workers);
    override_stage(&mut config.simple, args.simple_measurements, args.simple_workers);

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn override_stage(stage: &mut StageParams, samples: Option<usize>, workers: Option<usize>) {
    if let Some(n) = samples {
        stage.samples = n;
    }
    if let Some(w) = workers {
        stage.workers = w;
    }
}

/// Build the target description from flags.
pub fn build_target(args: &TargetArgs) -> Result<TargetConfig, String> {
    if args.user.trim().is_empty() {
        return Err("username cannot be empty".to_string());
    }
    let target = TargetConfig {
        base_url: args.url.clone(),
        user: args.user.clone(),
        difficulty: args.difficulty,
        timeout_ms: args.timeout_ms,
        success_marker: args.success_marker.clone(),
    };
    target.validate().map_err(|e| e.to_string())?;
    Ok(target)
}

/// Print `Error: ...` and exit with status 1.
pub fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_args(user: &str) -> TargetArgs {
        TargetArgs {
            url: "http://127.0.0.1:8080".to_string(),
            user: user.to_string(),
            difficulty: 3,
            timeout_ms: 2000,
            success_marker: "1".to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // build_config tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&RunArgs::default()).unwrap();
        assert_eq!(config, AttackConfig::default());
    }

    #[test]
    fn test_build_config_flag_overrides() {
        let args = RunArgs {
            alphabet: Some("0123456789".to_string()),
            simple: true,
            simple_measurements: Some(20),
            workers: Some(2),
            top_k: Some(5),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.alphabet, "0123456789");
        assert_eq!(config.mode, RankingMode::Simple);
        assert_eq!(config.simple, StageParams::new(20, 8));
        assert_eq!(config.length_stage, StageParams::new(8, 2));
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_build_config_rejects_invalid() {
        let args = RunArgs {
            top_k: Some(0),
            ..Default::default()
        };
        let err = build_config(&args).unwrap_err();
        assert!(err.contains("top_k"));
    }

    #[test]
    fn test_build_config_file_then_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg.json");
        std::fs::write(&path, r#"{"max_length": 16, "top_k": 2}"#).unwrap();
        let args = RunArgs {
            config: Some(path.to_string_lossy().to_string()),
            top_k: Some(4),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.max_length, 16);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn test_build_config_missing_file() {
        let args = RunArgs {
            config: Some("/nonexistent/timeleak.json".to_string()),
            ..Default::default()
        };
        assert!(build_config(&args).unwrap_err().contains("cannot load config"));
    }

    // -----------------------------------------------------------------------
    // build_target tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_build_target() {
        let target = build_target(&target_args("alice")).unwrap();
        assert_eq!(target.user, "alice");
        assert_eq!(target.difficulty, 3);
        assert_eq!(target.timeout_ms, 2000);
    }

    #[test]
    fn test_build_target_rejects_blank_user() {
        assert!(build_target(&target_args("  ")).is_err());
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
    }
}
