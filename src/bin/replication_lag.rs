//!
//! `replication_lag` polls replication lag from both sides of the pair:
//! `pg_stat_replication` on the primary (through the container runtime) and
//! the replay timestamp on the standby.
//!
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Arg;
use tracing::error;

use replication_tools::config::ClusterConfig;
use replication_tools::demo::{DemoTimings, ReplicationDemo};
use replication_tools::logger::*;
use replication_tools::replication::ReplicationDatabase;

fn main() -> Result<()> {
    init_logger(DEFAULT_LOG_LEVEL)?;
    let matches = cli().get_matches();

    let count = *matches
        .get_one::<usize>("count")
        .context("count has a default")?;
    let interval_ms = *matches
        .get_one::<u64>("interval-ms")
        .context("interval-ms has a default")?;

    let conf = ClusterConfig::from_env()?;
    let db = match ReplicationDatabase::connect(&conf) {
        Ok(db) => db,
        Err(e) => {
            error!("{e:#}");
            println!("❌ standby connection error: {e:#}");
            exit(1)
        }
    };
    let mut demo = ReplicationDemo::new(db, DemoTimings::default());

    println!("⏱️  polling replication lag ({count} samples)");
    let samples = demo.poll_replication_lag(count, Duration::from_millis(interval_ms));

    let streaming = samples.iter().filter(|s| s.primary.is_some()).count();
    println!("\n📋 {streaming}/{} samples saw a streaming standby", samples.len());

    exit(if streaming > 0 { 0 } else { 1 })
}

fn cli() -> clap::Command {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown");
    clap::Command::new("replication_lag")
        .version(version)
        .about("Poll and print replication lag")
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .value_name("SAMPLES")
                .default_value("5")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("interval-ms")
                .short('i')
                .long("interval-ms")
                .value_name("MILLISECONDS")
                .default_value("1000")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[test]
fn verify_cli() {
    cli().debug_assert()
}
