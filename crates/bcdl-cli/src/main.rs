//! `bcdl` - replay recorded backend sessions and run the orchestrator simulator

use anyhow::{bail, Context, Result};
use bcdl_core::harness::{run_simulation, DeliveryMode, Script, ScriptedBackend, SimulatorConfig};
use bcdl_core::{
    decode_script, notification_channel, AudioFormat, Notification, Orchestrator,
    OrchestratorConfig, SessionView,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("bcdl")
        .version(bcdl_core::VERSION)
        .about("Artist catalog scan and batch download orchestrator")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG overrides)"),
        )
        .subcommand(
            Command::new("replay")
                .about("Run a recorded notification script through the orchestrator")
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON-lines notification script"),
                )
                .arg(
                    Arg::new("url")
                        .long("url")
                        .help("Artist URL (defaults to the script's scan:start)"),
                )
                .arg(
                    Arg::new("folder")
                        .long("folder")
                        .value_parser(value_parser!(PathBuf))
                        .help("Download folder; without one the batch is refused"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_parser(value_parser!(AudioFormat))
                        .help("Audio format (flac, mp3-320, mp3-v0, ...)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the final session view as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the orchestrator simulator")
                .arg(
                    Arg::new("releases")
                        .long("releases")
                        .default_value("25")
                        .value_parser(value_parser!(usize))
                        .help("Releases per artist"),
                )
                .arg(
                    Arg::new("sessions")
                        .long("sessions")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Independent sessions to run"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("paid-ratio")
                        .long("paid-ratio")
                        .default_value("0.3")
                        .value_parser(value_parser!(f64))
                        .help("Probability a release is paid"),
                )
                .arg(
                    Arg::new("fail-rate")
                        .long("fail-rate")
                        .default_value("0.2")
                        .value_parser(value_parser!(f64))
                        .help("Probability a download fails"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .default_value("both")
                        .value_parser(value_parser!(DeliveryMode))
                        .help("Scan delivery: incremental, bulk or both"),
                ),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("replay", args)) => replay(args).await,
        Some(("simulate", args)) => {
            let passed = simulate(args).await?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        _ => unreachable!("subcommand_required"),
    }
}

async fn replay(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("script")
        .context("missing script path")?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let events = decode_script(&text).with_context(|| format!("decoding {}", path.display()))?;

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(file) => OrchestratorConfig::from_file(file)?,
        None => OrchestratorConfig::new(),
    };
    if let Some(folder) = args.get_one::<PathBuf>("folder") {
        config = config.with_folder(folder.clone());
    }
    if let Some(format) = args.get_one::<AudioFormat>("format") {
        config = config.with_format(*format);
    }

    let url = match args.get_one::<String>("url") {
        Some(url) => url.clone(),
        None => events
            .iter()
            .find_map(|n| match n {
                Notification::ScanStarted(url) => Some(url.clone()),
                _ => None,
            })
            .context("script has no scan:start; pass --url")?,
    };
    tracing::info!(events = events.len(), %url, "replaying script");

    let (sink, inbox) = notification_channel();
    let backend = ScriptedBackend::new(sink, Script::from_notifications(events));
    let orch = Orchestrator::spawn(config, backend, inbox);

    if let Err(e) = orch.start_scan(&url).await {
        bail!("scan refused: {e}");
    }
    orch.flush().await;
    orch.select_all_eligible();

    // refusals are already in the session log
    if let Ok(driver) = orch.download_selected() {
        driver.await.context("download driver panicked")?;
    }
    orch.flush().await;

    let view = orch.view();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

fn print_view(view: &SessionView) {
    for entry in view.log.iter() {
        println!("[{}] {:<7} {}", entry.time_label(), entry.severity, entry.message);
    }
    println!();
    println!("Releases: {}", view.releases.len());
    println!("Selected: {}", view.selected.len());
    if view.summary.visible {
        println!("{}", view.summary.line());
    }
}

async fn simulate(args: &ArgMatches) -> Result<bool> {
    let config = SimulatorConfig {
        seed: *args.get_one::<u64>("seed").context("seed")?,
        sessions: *args.get_one::<usize>("sessions").context("sessions")?,
        releases: *args.get_one::<usize>("releases").context("releases")?,
        paid_ratio: *args.get_one::<f64>("paid-ratio").context("paid-ratio")?,
        fail_rate: *args.get_one::<f64>("fail-rate").context("fail-rate")?,
        mode: *args.get_one::<DeliveryMode>("mode").context("mode")?,
        ..SimulatorConfig::default()
    };
    for (name, p) in [("paid-ratio", config.paid_ratio), ("fail-rate", config.fail_rate)] {
        if !(0.0..=1.0).contains(&p) {
            bail!("--{name} must be between 0 and 1, got {p}");
        }
    }

    println!("Running bcdl simulator...");
    println!("Sessions: {}", config.sessions);
    println!("Releases: {}", config.releases);
    println!("Seed: {}", config.seed);
    println!();

    let report = run_simulation(config).await;
    println!("{}", report.generate_text());
    Ok(report.passed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn simulate_defaults_parse() {
        let matches = cli().get_matches_from(["bcdl", "simulate", "--mode", "bulk"]);
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<DeliveryMode>("mode"), Some(&DeliveryMode::Bulk));
        assert_eq!(args.get_one::<usize>("releases"), Some(&25));
    }

    #[test]
    fn replay_parses_format() {
        let matches =
            cli().get_matches_from(["bcdl", "replay", "s.jsonl", "--format", "mp3-320", "-v"]);
        assert!(matches.get_flag("verbose"));
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<AudioFormat>("format"), Some(&AudioFormat::Mp3320));
    }
}
