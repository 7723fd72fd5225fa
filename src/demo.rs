//!
//! Sequential demo routines for the read/write split. Every routine prints
//! an operator-facing report to stdout and returns a summary the binaries
//! turn into an exit code.
//!
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use tracing::{error, warn};

use crate::pg_helpers::format_timestamp;
use crate::primary_exec::ReplicationStatus;
use crate::replication::ReplicationBackend;

const BANNER_WIDTH: usize = 60;

/// Fixed waits between demo steps.
#[derive(Clone, Copy, Debug)]
pub struct DemoTimings {
    /// After the single write of the basic demo.
    pub after_write: Duration,
    /// Between the timed write and the timed read of a performance iteration.
    pub between_write_and_read: Duration,
    /// Between consecutive writes of the consistency check.
    pub between_writes: Duration,
    /// Before reading back from the standby.
    pub replication_wait: Duration,
}

impl Default for DemoTimings {
    fn default() -> Self {
        DemoTimings {
            after_write: Duration::from_secs(1),
            between_write_and_read: Duration::from_millis(500),
            between_writes: Duration::from_millis(300),
            replication_wait: Duration::from_secs(2),
        }
    }
}

impl DemoTimings {
    /// No waiting at all, for driving the routines against fakes.
    pub fn none() -> Self {
        DemoTimings {
            after_write: Duration::ZERO,
            between_write_and_read: Duration::ZERO,
            between_writes: Duration::ZERO,
            replication_wait: Duration::ZERO,
        }
    }
}

/// Arithmetic mean, 0 for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerfSummary {
    pub iterations: usize,
    /// Seconds per successful write.
    pub write_times: Vec<f64>,
    /// Seconds per successful read.
    pub read_times: Vec<f64>,
}

impl PerfSummary {
    pub fn has_data(&self) -> bool {
        !self.write_times.is_empty() && !self.read_times.is_empty()
    }

    pub fn avg_write(&self) -> f64 {
        average(&self.write_times)
    }

    pub fn avg_read(&self) -> f64 {
        average(&self.read_times)
    }

    /// How many times slower a write is than a read.
    pub fn write_read_ratio(&self) -> Option<f64> {
        let read = self.avg_read();
        if self.has_data() && read > 0.0 {
            Some(self.avg_write() / read)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub marker: String,
    pub written: usize,
    pub replicated: usize,
    /// Set when the standby could not be read back at all.
    pub read_error: Option<String>,
}

impl ConsistencyReport {
    pub fn passed(&self) -> bool {
        self.read_error.is_none() && self.replicated >= self.written
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountDelta {
    pub before: i64,
    pub after: i64,
}

impl CountDelta {
    pub fn increase(&self) -> i64 {
        self.after - self.before
    }

    pub fn replicated(&self) -> bool {
        self.after > self.before
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LagSample {
    pub primary: Option<ReplicationStatus>,
    pub standby_lag: Option<f64>,
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(BANNER_WIDTH));
    println!("{title}");
    println!("{}", "=".repeat(BANNER_WIDTH));
}

pub struct ReplicationDemo<B> {
    backend: B,
    timings: DemoTimings,
}

impl<B: ReplicationBackend> ReplicationDemo<B> {
    pub fn new(backend: B, timings: DemoTimings) -> Self {
        ReplicationDemo { backend, timings }
    }

    pub fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Write one row to the primary and check that the standby's row count
    /// grew. Returns false only when a step errors out; a count that did not
    /// grow is reported as a warning.
    pub fn run_basic_demo(&mut self) -> bool {
        banner("🚀 basic read/write split demo");
        match self.basic_demo() {
            Ok(_) => true,
            Err(e) => {
                error!("basic demo failed: {e:#}");
                println!("❌ {e:#}");
                false
            }
        }
    }

    fn basic_demo(&mut self) -> Result<CountDelta> {
        let before = self.backend.data_count()?;
        println!("📊 rows at start: {before}");

        let data = format!("Demo data at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        self.backend.write_to_primary(&data)?;

        thread::sleep(self.timings.after_write);
        if let Err(e) = self.backend.replication_status() {
            warn!("replication status unavailable: {e:#}");
            println!("⚠️  {e:#}");
        }

        let rows = self.backend.read_from_standby(5)?;
        let after = self.backend.data_count()?;
        let delta = CountDelta { before, after };

        println!("\n📊 sync result:");
        println!("   at start: {before}");
        println!("   at end:   {after}");
        println!("   increase: {}", delta.increase());

        if delta.replicated() {
            println!("   ✅ data replicated to standby");
            if let Some(latest) = rows.first() {
                println!("   📄 latest row: ID={}, data='{}'", latest.id, latest.data);
            }
        } else {
            println!("   ⚠️  standby row count did not grow");
        }

        Ok(delta)
    }

    /// Time `iterations` write/read pairs. A failed write skips the read of
    /// that iteration.
    pub fn run_performance_test(&mut self, iterations: usize) -> PerfSummary {
        banner(&format!("⚡ performance test ({iterations} iterations)"));

        let mut summary = PerfSummary {
            iterations,
            ..Default::default()
        };

        for i in 1..=iterations {
            println!("\n🔄 iteration {i}/{iterations}");

            let start = Instant::now();
            let data = format!(
                "Performance test #{i} at {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S")
            );
            match self.backend.write_to_primary(&data) {
                Ok(_) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    summary.write_times.push(elapsed);
                    println!("   📝 write time: {elapsed:.3}s");
                }
                Err(e) => {
                    println!("   ❌ write failed: {e:#}");
                    continue;
                }
            }

            thread::sleep(self.timings.between_write_and_read);

            let start = Instant::now();
            match self.backend.read_from_standby(1) {
                Ok(_) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    summary.read_times.push(elapsed);
                    println!("   📖 read time: {elapsed:.3}s");
                }
                Err(e) => println!("   ❌ read failed: {e:#}"),
            }
        }

        if summary.has_data() {
            println!("\n📈 performance results:");
            println!("   average write time: {:.3}s", summary.avg_write());
            println!("   average read time:  {:.3}s", summary.avg_read());
            if let Some(ratio) = summary.write_read_ratio() {
                println!("   write/read ratio:   {ratio:.1}x");
            }

            println!("\n📊 final replication state:");
            if let Err(e) = self.backend.replication_status() {
                println!("⚠️  {e:#}");
            }
        } else {
            println!("❌ no usable timing data collected");
        }

        summary
    }

    /// Write `writes` rows sharing one marker, wait, and count how many of
    /// them the standby returns among its newest rows.
    pub fn run_data_consistency_check(&mut self, writes: usize) -> ConsistencyReport {
        banner("🔍 data consistency check");

        println!("📝 writing rows...");
        let marker = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut written = 0;
        for i in 1..=writes {
            let data = format!("Consistency test {i} - {marker}");
            match self.backend.write_to_primary(&data) {
                Ok(_) => {
                    println!("   ✅ row {i} written");
                    written += 1;
                }
                Err(e) => println!("   ❌ row {i} not written: {e:#}"),
            }
            thread::sleep(self.timings.between_writes);
        }

        println!("\n⏱️  waiting for replication...");
        thread::sleep(self.timings.replication_wait);

        println!("\n📖 verifying on standby...");
        let limit = writes.max(5) as i64;
        let (replicated, read_error) = match self.backend.read_from_standby(limit) {
            Ok(rows) => {
                let replicated = rows
                    .iter()
                    .filter(|row| row.data.contains(&marker))
                    .inspect(|row| {
                        println!("   ✅ replicated: ID={}, data='{}'", row.id, row.data)
                    })
                    .count();
                (replicated, None)
            }
            Err(e) => {
                error!("consistency read failed: {e:#}");
                println!("❌ read failed: {e:#}");
                (0, Some(format!("{e:#}")))
            }
        };

        let report = ConsistencyReport {
            marker,
            written,
            replicated,
            read_error,
        };

        println!("\n📊 consistency result:");
        println!("   written:    {}", report.written);
        println!("   replicated: {}", report.replicated);
        if report.passed() {
            println!("   🎉 consistency check passed");
        } else if report.read_error.is_some() {
            println!("   ❌ standby could not be read, nothing was verified");
        } else {
            println!("   ⚠️  some rows may not have replicated yet");
        }

        report
    }

    /// The minimal flow: list the standby's newest rows, write one row to
    /// the primary, wait, and recount.
    pub fn run_simple_demo(&mut self) -> Result<CountDelta> {
        println!("🎯 simple read/write split test");

        println!("\n📖 reading from standby...");
        let before = self.backend.data_count()?;
        println!("   rows before write: {before}");

        let rows = self.backend.read_from_standby(3)?;
        println!("   latest rows:");
        for row in &rows {
            println!(
                "     ID:{} | {} | {}",
                row.id,
                row.data,
                format_timestamp(&row.created_at)
            );
        }

        println!("\n📝 writing to primary...");
        let data = format!("Simple test at {}", Local::now().format("%Y-%m-%dT%H:%M:%S"));
        self.backend.write_to_primary(&data)?;
        println!("   ✅ write succeeded: '{data}'");

        println!("\n⏱️  waiting for replication...");
        thread::sleep(self.timings.replication_wait);

        println!("\n📖 checking standby...");
        let after = self.backend.data_count()?;
        println!("   rows after write: {after}");

        let delta = CountDelta { before, after };
        if delta.replicated() {
            println!("   ✅ data replicated to standby");
            match self.backend.read_from_standby(1) {
                Ok(rows) => {
                    if let Some(latest) = rows.first() {
                        println!(
                            "   latest row: ID:{} | {} | {}",
                            latest.id,
                            latest.data,
                            format_timestamp(&latest.created_at)
                        );
                    }
                }
                Err(e) => println!("❌ could not read latest row: {e:#}"),
            }
        } else {
            println!("   ⚠️  standby row count did not grow");
        }

        println!("\n🎉 read/write split test finished");
        println!("   before:   {}", delta.before);
        println!("   after:    {}", delta.after);
        println!("   increase: {}", delta.increase());

        Ok(delta)
    }

    /// Print the primary's view and the standby's replay lag `count` times,
    /// `interval` apart. Failed probes are printed and leave the field empty.
    pub fn poll_replication_lag(&mut self, count: usize, interval: Duration) -> Vec<LagSample> {
        let mut samples = Vec::with_capacity(count);
        for i in 1..=count {
            println!("\n🔄 sample {i}/{count}");

            let primary = match self.backend.replication_status() {
                Ok(status) => status,
                Err(e) => {
                    println!("   ❌ primary: {e:#}");
                    None
                }
            };

            let standby_lag = match self.backend.standby_replay_lag() {
                Ok(Some(lag)) => {
                    println!("   ⏱️  standby replay lag: {lag:.3}s");
                    Some(lag)
                }
                Ok(None) => {
                    println!("   ⏱️  standby has not replayed any transaction yet");
                    None
                }
                Err(e) => {
                    println!("   ❌ standby: {e:#}");
                    None
                }
            };

            samples.push(LagSample {
                primary,
                standby_lag,
            });

            if i < count {
                thread::sleep(interval);
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_values() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2.0]), 2.0);
        assert!((average(&[0.1, 0.2, 0.3]) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn perf_summary_ratio() {
        let summary = PerfSummary {
            iterations: 2,
            write_times: vec![0.2, 0.4],
            read_times: vec![0.01, 0.03],
        };
        assert!(summary.has_data());
        let ratio = summary.write_read_ratio().unwrap();
        assert!((ratio - 15.0).abs() < 1e-9);

        let no_reads = PerfSummary {
            iterations: 1,
            write_times: vec![0.2],
            read_times: vec![],
        };
        assert!(!no_reads.has_data());
        assert_eq!(no_reads.write_read_ratio(), None);
    }

    #[test]
    fn consistency_pass_condition() {
        let report = |written, replicated| ConsistencyReport {
            marker: "20261018_091500".to_string(),
            written,
            replicated,
            read_error: None,
        };
        assert!(report(3, 3).passed());
        assert!(report(2, 3).passed());
        assert!(report(0, 0).passed());
        assert!(!report(3, 2).passed());

        let unread = ConsistencyReport {
            read_error: Some("standby down".to_string()),
            ..report(0, 0)
        };
        assert!(!unread.passed());
    }

    #[test]
    fn count_delta() {
        let d = CountDelta { before: 10, after: 11 };
        assert!(d.replicated());
        assert_eq!(d.increase(), 1);
        assert!(!CountDelta { before: 10, after: 10 }.replicated());
    }
}
