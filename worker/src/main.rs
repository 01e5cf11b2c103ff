//! `ticket-worker` command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use ticket_model::InteractionEvent;
use ticket_worker::config::DEFAULT_CONFIG_PATH;
use ticket_worker::logging::{self, LogFormat};
use ticket_worker::{Fixture, FixtureServices, Worker, WorkerConfig};

fn cli() -> Command {
    Command::new("ticket-worker")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ticket bot interaction worker")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .env("TICKET_WORKER_CONFIG")
                .default_value(DEFAULT_CONFIG_PATH)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the TOML configuration file"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log line format"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("commands")
                .about("List registered commands")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Dispatch one interaction against in-memory collaborators")
                .arg(
                    Arg::new("event")
                        .long("event")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Interaction event (JSON)"),
                )
                .arg(
                    Arg::new("fixture")
                        .long("fixture")
                        .value_parser(value_parser!(PathBuf))
                        .help("Seed data for the collaborators (JSON)"),
                ),
        )
        .subcommand(Command::new("check-config").about("Validate and print the configuration"))
}

async fn services(fixture: Option<&PathBuf>) -> anyhow::Result<Arc<FixtureServices>> {
    let fixture = match fixture {
        Some(path) => Fixture::load(path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?,
        None => Fixture::default(),
    };
    Ok(Arc::new(FixtureServices::seed(fixture).await?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let format: LogFormat = matches
        .get_one::<String>("log-format")
        .map_or(Ok(LogFormat::Text), |s| s.parse())
        .map_err(anyhow::Error::msg)?;
    logging::init(format)?;

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = WorkerConfig::load(&config_path)
        .with_context(|| format!("invalid configuration at {}", config_path.display()))?;

    match matches.subcommand() {
        Some(("commands", args)) => {
            let worker = Worker::build(&config, services(None).await?)?;
            let commands = worker.commands();
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&commands)?);
            } else {
                for command in &commands {
                    println!("{}", command.render(0));
                }
            }
        }
        Some(("replay", args)) => {
            let event_path = args
                .get_one::<PathBuf>("event")
                .context("--event is required")?;
            let raw = std::fs::read_to_string(event_path)
                .with_context(|| format!("failed to read {}", event_path.display()))?;
            let event: InteractionEvent =
                serde_json::from_str(&raw).context("failed to decode interaction event")?;

            let worker = Worker::build(&config, services(args.get_one::<PathBuf>("fixture")).await?)?;
            let outcome = worker.replay(event).await;
            if outcome.response.is_none() {
                tracing::info!("Invocation produced no response");
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Some(("check-config", _)) => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        _ => anyhow::bail!("no subcommand given"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn replay_requires_event() {
        assert!(cli()
            .try_get_matches_from(["ticket-worker", "replay"])
            .is_err());
        let matches = cli()
            .try_get_matches_from([
                "ticket-worker",
                "--log-format",
                "json",
                "replay",
                "--event",
                "event.json",
            ])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("log-format").map(String::as_str),
            Some("json")
        );
    }
}
