//!
//! `simple_demo` reads the standby's newest rows, writes one row to the
//! primary through the container runtime and checks that the standby's row
//! count grew after a short wait.
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

    let wait_ms = *matches
        .get_one::<u64>("wait-ms")
        .context("wait-ms has a default")?;

    let conf = ClusterConfig::from_env()?;
    let db = match ReplicationDatabase::connect(&conf) {
        Ok(db) => db,
        Err(e) => {
            error!("{e:#}");
            println!("❌ standby connection error: {e:#}");
            exit(1)
        }
    };

    let timings = DemoTimings {
        replication_wait: Duration::from_millis(wait_ms),
        ..Default::default()
    };
    let mut demo = ReplicationDemo::new(db, timings);

    match demo.run_simple_demo() {
        Ok(delta) if delta.replicated() => exit(0),
        Ok(_) => exit(1),
        Err(e) => {
            error!("simple demo failed: {e:#}");
            println!("❌ {e:#}");
            exit(1)
        }
    }
}

fn cli() -> clap::Command {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown");
    clap::Command::new("simple_demo")
        .version(version)
        .about("Write one row to the primary and verify it on the standby")
        .arg(
            Arg::new("wait-ms")
                .long("wait-ms")
                .value_name("MILLISECONDS")
                .help("How long to wait for replication before re-checking the standby")
                .default_value("2000")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[test]
fn verify_cli() {
    cli().debug_assert()
}
