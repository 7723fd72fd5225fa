//!
//! Read/write split over the primary/standby pair: writes through
//! [`PrimaryExec`], reads over a direct connection to the standby.
//!
use anyhow::{Context, Result};
use tracing::info;

use crate::config::ClusterConfig;
use crate::primary_exec::{InsertOutcome, PrimaryExec, ReplicationStatus};
use crate::standby::{ReplicationRow, StandbyClient};

/// Operations the demo routines run against a replicated cluster.
pub trait ReplicationBackend {
    fn write_to_primary(&mut self, data: &str) -> Result<InsertOutcome>;
    fn read_from_standby(&mut self, limit: i64) -> Result<Vec<ReplicationRow>>;
    fn data_count(&mut self) -> Result<i64>;
    fn replication_status(&mut self) -> Result<Option<ReplicationStatus>>;
    /// Replay lag seen by the standby itself, if it has replayed anything.
    fn standby_replay_lag(&mut self) -> Result<Option<f64>>;
}

pub struct ReplicationDatabase {
    standby: StandbyClient,
    primary: PrimaryExec,
}

impl ReplicationDatabase {
    /// Connect to the standby and ping it. The primary is only reached
    /// through the container runtime, so nothing is opened for it here.
    pub fn connect(conf: &ClusterConfig) -> Result<Self> {
        let mut standby =
            StandbyClient::connect(&conf.standby, &conf.credentials, conf.connect_timeout_secs)
                .context("standby connection failed")?;
        standby.ping().context("standby ping failed")?;

        info!(
            standby = %conf.standby,
            container = %conf.primary_container,
            "replication database ready"
        );
        println!("✅ replication database connections initialized");
        println!("   - reads:  standby ({})", conf.standby);
        println!(
            "   - writes: primary (via `{} exec {}`)",
            conf.container_runtime, conf.primary_container
        );

        Ok(ReplicationDatabase {
            standby,
            primary: PrimaryExec::from_config(conf),
        })
    }

    pub fn standby(&mut self) -> &mut StandbyClient {
        &mut self.standby
    }

    pub fn primary(&self) -> &PrimaryExec {
        &self.primary
    }
}

fn write_status_line(outcome: &InsertOutcome, data: &str) -> String {
    let mut line = String::from("📝 written to primary:");
    if let Some(id) = outcome.id {
        line.push_str(&format!(" ID={id},"));
    }
    line.push_str(&format!(" data='{data}'"));
    if let Some(created_at) = &outcome.created_at {
        line.push_str(&format!(", created_at={created_at}"));
    }
    line
}

impl ReplicationBackend for ReplicationDatabase {
    fn write_to_primary(&mut self, data: &str) -> Result<InsertOutcome> {
        let outcome = self
            .primary
            .insert_row(data)
            .context("write to primary failed")?;
        println!("{}", write_status_line(&outcome, data));
        Ok(outcome)
    }

    fn read_from_standby(&mut self, limit: i64) -> Result<Vec<ReplicationRow>> {
        let rows = self.standby.latest_rows(limit)?;
        println!("📖 read from standby: {} rows", rows.len());
        Ok(rows)
    }

    fn data_count(&mut self) -> Result<i64> {
        self.standby.row_count()
    }

    fn replication_status(&mut self) -> Result<Option<ReplicationStatus>> {
        let status = self
            .primary
            .replication_status()
            .context("could not read pg_stat_replication on primary")?;
        match &status {
            Some(s) => println!(
                "⏱️  replication state: {}, lag: {:.3}s (client: {})",
                s.state, s.lag_seconds, s.client_addr
            ),
            None => println!("⚠️  primary reports no streaming standby"),
        }
        Ok(status)
    }

    fn standby_replay_lag(&mut self) -> Result<Option<f64>> {
        self.standby.replay_lag_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_status_with_returning_row() {
        let outcome = InsertOutcome {
            id: Some(42),
            created_at: Some("2026-10-18 09:12:44.123456".to_string()),
            rows: Some(1),
        };
        assert_eq!(
            write_status_line(&outcome, "Demo data"),
            "📝 written to primary: ID=42, data='Demo data', created_at=2026-10-18 09:12:44.123456"
        );
    }

    #[test]
    fn write_status_with_tag_only() {
        let outcome = InsertOutcome {
            rows: Some(1),
            ..Default::default()
        };
        assert_eq!(
            write_status_line(&outcome, "Demo data"),
            "📝 written to primary: data='Demo data'"
        );
    }
}
