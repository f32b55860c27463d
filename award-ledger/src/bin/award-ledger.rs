//! Award ledger command-line front end
//!
//! Usage: `award-ledger <invoker> <command> [args...]`
//!
//! - `shoutout <to> <count> <reason...>`
//! - `redeem <from> <amount>`
//! - `standings`
//! - `ping`
//!
//! Configuration comes from the TOML file named by `AWARD_LEDGER_CONFIG`,
//! or from `AWARD_LEDGER_*` environment variables. Set
//! `AWARD_LEDGER_OUTPUT=json` to print the reply as a JSON object.

use anyhow::{bail, Context};
use award_ledger::{
    commands::{self, Command},
    AwardManager, Config, FileStorage, StaticOracle, UserId,
};
use std::sync::Arc;

fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::var("AWARD_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env()?,
    };
    Ok(config)
}

fn parse_user(raw: &str) -> anyhow::Result<UserId> {
    UserId::parse(raw).map_err(Into::into)
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        bail!("missing command (shoutout, redeem, standings, ping)");
    };

    let command = match (name.as_str(), rest) {
        ("shoutout", [to, count, reason @ ..]) if !reason.is_empty() => Command::Shoutout {
            to: parse_user(to)?,
            count: count.parse().context("award count must be an integer")?,
            reason: reason.join(" "),
        },
        ("redeem", [from, amount]) => Command::Redeem {
            from: parse_user(from)?,
            amount: amount.parse().context("amount must be an integer")?,
        },
        ("standings", []) => Command::Standings,
        ("ping", []) => Command::Ping,
        (other, _) => bail!("unknown command or wrong arguments: {}", other),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((invoker, command_args)) = args.split_first() else {
        bail!("usage: award-ledger <invoker> <command> [args...]");
    };
    let invoker = parse_user(invoker)?;
    let command = parse_command(command_args)?;

    let config = load_config()?;
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting award ledger"
    );

    let storage = FileStorage::open(&config.storage.data_dir).await?;
    let oracle = StaticOracle::from_config(&config.oracle, config.agent().as_ref());
    let manager = AwardManager::new(&config, Arc::new(storage), Arc::new(oracle));

    let reply = commands::handle(&manager, &invoker, command).await;
    match std::env::var("AWARD_LEDGER_OUTPUT").as_deref() {
        Ok("json") => println!("{}", serde_json::to_string(&reply)?),
        _ => println!("{}", reply.content),
    }

    // Let anything still queued finish before exiting
    manager.when_idle().await;
    tracing::info!("Award queue drained, shutting down");

    if reply.is_warning() {
        std::process::exit(1);
    }
    Ok(())
}
