use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use postgres::{Client, NoTls, Row};
use tracing::{debug, instrument};

use crate::config::{Credentials, Endpoint};

const LATEST_ROWS_QUERY: &str = "SELECT id::int8, coalesce(data, ''), created_at::timestamptz \
     FROM test_replication ORDER BY created_at DESC LIMIT $1";

/// One row of `test_replication`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicationRow {
    pub id: i64,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for ReplicationRow {
    type Error = postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(ReplicationRow {
            id: row.try_get(0)?,
            data: row.try_get(1)?,
            created_at: row.try_get(2)?,
        })
    }
}

/// A single direct connection to one Postgres instance. Used for the
/// standby, and by the connection check for either side.
pub struct StandbyClient {
    client: Client,
    endpoint: Endpoint,
}

impl StandbyClient {
    #[instrument(skip(creds))]
    pub fn connect(
        endpoint: &Endpoint,
        creds: &Credentials,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let client = endpoint
            .pg_config(creds, connect_timeout_secs)
            .connect(NoTls)
            .with_context(|| format!("could not connect to {endpoint}"))?;
        debug!("connected to {endpoint}");
        Ok(StandbyClient {
            client,
            endpoint: endpoint.clone(),
        })
    }

    pub fn ping(&mut self) -> Result<()> {
        if self.client.is_closed() {
            anyhow::bail!("connection to {} is closed", self.endpoint);
        }
        self.client
            .simple_query("SELECT 1")
            .with_context(|| format!("ping to {} failed", self.endpoint))?;
        Ok(())
    }

    pub fn version(&mut self) -> Result<String> {
        let row = self
            .client
            .query_one("SELECT version()", &[])
            .context("failed to query server version")?;
        Ok(row.try_get(0)?)
    }

    pub fn is_in_recovery(&mut self) -> Result<bool> {
        let row = self
            .client
            .query_one("SELECT pg_is_in_recovery()", &[])
            .context("failed to query recovery state")?;
        Ok(row.try_get(0)?)
    }

    pub fn row_count(&mut self) -> Result<i64> {
        let row = self
            .client
            .query_one("SELECT count(*) FROM test_replication", &[])
            .context("failed to count test_replication rows")?;
        Ok(row.try_get(0)?)
    }

    /// Newest rows first.
    pub fn latest_rows(&mut self, limit: i64) -> Result<Vec<ReplicationRow>> {
        let rows = self
            .client
            .query(LATEST_ROWS_QUERY, &[&limit])
            .context("failed to read test_replication")?;
        rows.iter()
            .map(|row| ReplicationRow::try_from(row).context("failed to decode row"))
            .collect()
    }

    /// Seconds since the last replayed transaction, measured on the standby.
    /// `None` if nothing has been replayed since the standby started.
    pub fn replay_lag_seconds(&mut self) -> Result<Option<f64>> {
        let row = self
            .client
            .query_one(
                "SELECT EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp()))::float8",
                &[],
            )
            .context("failed to query replay lag")?;
        Ok(row.try_get(0)?)
    }
}
