use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keytouch_core::KeytouchConfig;

use crate::error::{HarnessError, Result};
use crate::replay::replay;
use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(
    name = "keytouch-replay",
    about = "Replay keyboard touch scenarios and check their event traces",
    version
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a scenario and print its JSONL trace.
    Run(RunArgs),

    /// Validate a TOML or JSON configuration file and print it in TOML.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Scenario JSON file.
    pub scenario: PathBuf,

    /// Write the trace here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Compare the trace digest with the one stored in this file.
    #[arg(long)]
    pub golden: Option<PathBuf>,

    /// Write the digest to the `--golden` file instead of comparing.
    #[arg(long, requires = "golden")]
    pub bless: bool,

    /// Print only the digest and a summary line.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init(cli.log_json);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_scenario(&args, &mut std::io::stdout().lock()),
        Commands::CheckConfig(args) => check_config(&args, &mut std::io::stdout().lock()),
    }
}

pub fn run_scenario(args: &RunArgs, stdout: &mut dyn Write) -> Result<()> {
    let scenario = Scenario::from_json_file(&args.scenario)?;
    let result = replay(&scenario);
    let digest = result.digest();

    match &args.out {
        Some(path) => result.write_jsonl(fs::File::create(path)?)?,
        None if !args.quiet => result.write_jsonl(&mut *stdout)?,
        None => {}
    }

    if let Some(golden) = &args.golden {
        if args.bless {
            fs::write(golden, format!("{digest}\n"))?;
            tracing::info!(path = %golden.display(), %digest, "golden updated");
        } else {
            let expected = fs::read_to_string(golden)?.trim().to_string();
            if expected != digest {
                return Err(HarnessError::GoldenMismatch {
                    path: golden.clone(),
                    expected,
                    actual: digest,
                });
            }
        }
    }

    if args.quiet || args.out.is_some() {
        let s = result.summary;
        writeln!(
            stdout,
            "{} {} presses={} inside={} outside={} long_press={} double_tap={} repeat={} popup={} cancelled={}",
            scenario.name,
            digest,
            s.presses,
            s.releases_inside,
            s.releases_outside,
            s.long_presses,
            s.double_taps,
            s.repeat_ticks,
            s.popup_commits,
            s.cancelled,
        )?;
    }
    Ok(())
}

pub fn check_config(args: &CheckConfigArgs, stdout: &mut dyn Write) -> Result<()> {
    let is_json = args
        .path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        KeytouchConfig::from_json_file(&args.path)?
    } else {
        KeytouchConfig::from_toml_file(&args.path)?
    };
    write!(stdout, "{}", config.to_toml_string()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TAP: &str = r#"{ "name": "tap", "steps": [
        { "at_ms": 0, "action": "down", "x": 5, "y": 5 },
        { "at_ms": 40, "action": "up", "x": 5, "y": 5 }
    ] }"#;

    fn run_args(scenario: PathBuf) -> RunArgs {
        RunArgs {
            scenario,
            out: None,
            golden: None,
            bless: false,
            quiet: false,
        }
    }

    #[test]
    fn cli_parses_run_with_golden() {
        let cli = Cli::try_parse_from([
            "keytouch-replay",
            "--log-json",
            "run",
            "tap.json",
            "--golden",
            "tap.golden",
            "--bless",
        ])
        .unwrap();
        assert!(cli.log_json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenario, PathBuf::from("tap.json"));
        assert!(args.bless);
    }

    #[test]
    fn bless_requires_golden() {
        assert!(Cli::try_parse_from(["keytouch-replay", "run", "tap.json", "--bless"]).is_err());
    }

    #[test]
    fn run_prints_trace_to_stdout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tap.json");
        fs::write(&path, TAP).unwrap();

        let mut out = Vec::new();
        run_scenario(&run_args(path), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("\"release_inside\""));
    }

    #[test]
    fn bless_then_check_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tap.json");
        let golden = dir.path().join("tap.golden");
        fs::write(&path, TAP).unwrap();

        let mut args = run_args(path);
        args.golden = Some(golden.clone());
        args.bless = true;
        args.quiet = true;
        let mut out = Vec::new();
        run_scenario(&args, &mut out).unwrap();
        let stored = fs::read_to_string(&golden).unwrap();
        assert!(stored.starts_with("blake3:"));
        assert!(String::from_utf8(out).unwrap().contains("presses=1"));

        args.bless = false;
        run_scenario(&args, &mut Vec::new()).unwrap();
    }

    #[test]
    fn golden_mismatch_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tap.json");
        let golden = dir.path().join("tap.golden");
        fs::write(&path, TAP).unwrap();
        fs::write(&golden, "blake3:0000\n").unwrap();

        let mut args = run_args(path);
        args.golden = Some(golden);
        let err = run_scenario(&args, &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(matches!(
            err,
            HarnessError::GoldenMismatch { ref expected, .. } if expected == "blake3:0000"
        ));
    }

    #[test]
    fn out_file_receives_trace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tap.json");
        let trace = dir.path().join("trace.jsonl");
        fs::write(&path, TAP).unwrap();

        let mut args = run_args(path);
        args.out = Some(trace.clone());
        let mut out = Vec::new();
        run_scenario(&args, &mut out).unwrap();
        assert_eq!(fs::read_to_string(&trace).unwrap().lines().count(), 5);
        assert!(String::from_utf8(out).unwrap().starts_with("tap blake3:"));
    }

    #[test]
    fn check_config_accepts_toml_and_json() {
        let dir = tempdir().unwrap();
        let toml_path = dir.path().join("keys.toml");
        fs::write(&toml_path, "[gesture]\nlong_press_delay = 350\n").unwrap();
        let mut out = Vec::new();
        check_config(&CheckConfigArgs { path: toml_path }, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("long_press_delay = 350"));

        let json_path = dir.path().join("keys.json");
        fs::write(&json_path, r#"{ "popup": { "max_slot_width": 44.0 } }"#).unwrap();
        let mut out = Vec::new();
        check_config(&CheckConfigArgs { path: json_path }, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("max_slot_width = 44"));
    }

    #[test]
    fn check_config_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[gesture]\nrepeat_interval = 0\n").unwrap();
        let err = check_config(&CheckConfigArgs { path }, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
