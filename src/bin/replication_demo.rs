//!
//! `replication_demo` runs the full read/write split walkthrough:
//! - basic demo: one write to the primary, read back from the standby;
//! - performance test: timed write/read pairs and their averages;
//! - consistency check: a burst of tagged writes, all expected on the standby.
//!
//! The last two only run if the basic demo succeeded.
//!
use std::process::exit;

use anyhow::{Context, Result};
use clap::Arg;
use tracing::{error, info};

use replication_tools::config::ClusterConfig;
use replication_tools::demo::{DemoTimings, ReplicationDemo};
use replication_tools::logger::*;
use replication_tools::replication::ReplicationDatabase;

fn main() -> Result<()> {
    init_logger(DEFAULT_LOG_LEVEL)?;
    let matches = cli().get_matches();

    let iterations = *matches
        .get_one::<usize>("iterations")
        .context("iterations has a default")?;
    let writes = *matches
        .get_one::<usize>("consistency-writes")
        .context("consistency-writes has a default")?;

    let conf = ClusterConfig::from_env()?;
    let db = match ReplicationDatabase::connect(&conf) {
        Ok(db) => db,
        Err(e) => {
            error!("{e:#}");
            println!("❌ demo initialization failed: {e:#}");
            exit(1)
        }
    };
    let mut demo = ReplicationDemo::new(db, DemoTimings::default());

    println!("🎯 PostgreSQL read/write split demo");
    println!("🔗 verifying replication in the container environment");

    if !demo.run_basic_demo() {
        println!("\n❌ basic demo failed, skipping the remaining tests");
        exit(1)
    }

    let perf = demo.run_performance_test(iterations);
    info!(
        writes = perf.write_times.len(),
        reads = perf.read_times.len(),
        "performance test finished"
    );

    let consistency = demo.run_data_consistency_check(writes);

    println!("\n🎉 all demos finished");
    println!("📋 covered:");
    println!("   ✅ basic read/write split");
    println!("   ✅ performance measurement");
    println!("   ✅ data consistency check");
    println!("   ✅ replication monitoring");

    exit(if consistency.passed() { 0 } else { 1 })
}

fn cli() -> clap::Command {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown");
    clap::Command::new("replication_demo")
        .version(version)
        .about("Read/write split demo against a primary/standby pair")
        .arg(
            Arg::new("iterations")
                .short('n')
                .long("iterations")
                .value_name("COUNT")
                .help("Number of timed write/read pairs")
                .default_value("3")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("consistency-writes")
                .long("consistency-writes")
                .value_name("COUNT")
                .help("Number of tagged rows written by the consistency check")
                .default_value("3")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[test]
fn verify_cli() {
    cli().debug_assert()
}
