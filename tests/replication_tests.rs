//! Checks against a running primary/standby pair, e.g. the compose setup.
//! Run with `cargo test -- --ignored`.
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use replication_tools::config::ClusterConfig;
use replication_tools::demo::average;
use replication_tools::replication::{ReplicationBackend, ReplicationDatabase};

fn connect() -> ReplicationDatabase {
    let conf = ClusterConfig::from_env().expect("valid environment");
    ReplicationDatabase::connect(&conf).expect("standby reachable")
}

#[test]
#[ignore]
fn database_connection() {
    let mut db = connect();
    let version = db.standby().version().unwrap();
    assert!(version.starts_with("PostgreSQL"), "{version}");
    assert!(db.standby().is_in_recovery().unwrap());

    let primary_version = db.primary().version().unwrap();
    assert!(primary_version.contains("PostgreSQL"), "{primary_version}");
}

#[test]
#[ignore]
fn basic_replication() {
    let mut db = connect();
    let initial = db.data_count().unwrap();

    let data = format!("Test data at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    db.write_to_primary(&data).unwrap();

    thread::sleep(Duration::from_secs(2));

    let last = db.data_count().unwrap();
    assert!(last > initial, "initial={initial}, last={last}");
}

#[test]
#[ignore]
fn replication_lag_is_bounded() {
    let mut db = connect();
    let status = db.replication_status().unwrap();
    let lag = status.map(|s| s.lag_seconds).unwrap_or(0.0);
    assert!(lag <= 10.0, "lag {lag:.3}s");
}

#[test]
#[ignore]
fn read_write_separation() {
    let mut db = connect();

    let start = Instant::now();
    let data = format!(
        "Performance test at {}",
        Local::now().format("%Y-%m-%dT%H:%M:%S")
    );
    let outcome = db.write_to_primary(&data).unwrap();
    let write_time = start.elapsed();
    assert!(outcome.id.is_some() || outcome.rows == Some(1));

    thread::sleep(Duration::from_millis(500));

    let start = Instant::now();
    let rows = db.read_from_standby(1).unwrap();
    let read_time = start.elapsed();
    assert_eq!(rows.len(), 1);

    println!(
        "write={:.3}s, read={:.3}s",
        write_time.as_secs_f64(),
        read_time.as_secs_f64()
    );
}

#[test]
#[ignore]
fn data_consistency() {
    let mut db = connect();
    let marker = Local::now().format("%Y%m%d_%H%M%S").to_string();

    let mut written = 0;
    for i in 1..=3 {
        if db
            .write_to_primary(&format!("Consistency test {i} - {marker}"))
            .is_ok()
        {
            written += 1;
        }
        thread::sleep(Duration::from_millis(300));
    }

    thread::sleep(Duration::from_secs(2));

    let rows = db.read_from_standby(10).unwrap();
    let replicated = rows.iter().filter(|r| r.data.contains(&marker)).count();
    assert!(
        replicated >= written,
        "written={written}, replicated={replicated}"
    );
}

#[test]
#[ignore]
fn performance_benchmark() {
    let mut db = connect();
    let mut write_times = Vec::new();
    let mut read_times = Vec::new();

    for i in 1..=5 {
        let start = Instant::now();
        if db.write_to_primary(&format!("Benchmark test #{i}")).is_ok() {
            write_times.push(start.elapsed().as_secs_f64());
        }

        thread::sleep(Duration::from_millis(300));

        let start = Instant::now();
        if db.read_from_standby(1).is_ok() {
            read_times.push(start.elapsed().as_secs_f64());
        }
    }

    assert!(!write_times.is_empty());
    assert!(!read_times.is_empty());
    println!(
        "avg write={:.3}s, avg read={:.3}s",
        average(&write_times),
        average(&read_times)
    );
}
