//!
//! `connection_check` connects to the primary and the standby directly and
//! prints version, `test_replication` row count and server role for each.
//! Exits with 0 only if both checks pass, so it can gate the demos:
//!
//! ```sh
//! connection_check && replication_demo
//! ```
//!
use std::process::exit;

use anyhow::Result;
use tracing::info;

use replication_tools::checker::check_connection;
use replication_tools::config::ClusterConfig;
use replication_tools::logger::*;

fn main() -> Result<()> {
    init_logger(DEFAULT_LOG_LEVEL)?;
    let _matches = cli().get_matches();

    let conf = ClusterConfig::from_env()?;
    info!(primary = %conf.primary, standby = %conf.standby, "checking connections");

    println!("🎯 PostgreSQL connection check");
    println!("{}", "=".repeat(50));

    let primary_ok = check_connection(
        &conf.primary,
        &conf.credentials,
        conf.connect_timeout_secs,
        "primary server",
    );
    println!();

    let standby_ok = check_connection(
        &conf.standby,
        &conf.credentials,
        conf.connect_timeout_secs,
        "standby server",
    );
    println!();

    println!("📋 summary:");
    println!("   primary: {}", status_mark(primary_ok));
    println!("   standby: {}", status_mark(standby_ok));

    if primary_ok && standby_ok {
        println!("\n🎉 all connection checks passed");
        println!("   the demo applications can be run");
        exit(0)
    } else {
        println!("\n⚠️  connection problems detected");
        println!("   check the state of the compose containers");
        exit(1)
    }
}

fn status_mark(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ NG" }
}

fn cli() -> clap::Command {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown");
    clap::Command::new("connection_check")
        .version(version)
        .about("Check connectivity to the primary and the standby")
        .after_help(
            "Configured through POSTGRES_USER, POSTGRES_PASSWORD, POSTGRES_DB, \
             POSTGRES_PRIMARY_HOST, POSTGRES_PRIMARY_PORT, POSTGRES_STANDBY_HOST \
             and POSTGRES_STANDBY_PORT.",
        )
}

#[test]
fn verify_cli() {
    cli().debug_assert()
}
