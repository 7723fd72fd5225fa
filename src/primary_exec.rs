//!
//! Writes to the primary go through the container runtime: `docker exec
//! <container> psql ...`. The primary's port is not always reachable from
//! the host, while the container's own unix socket always is.
//!
use std::fmt;
use std::process::{Command, ExitStatus};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::config::ClusterConfig;
use crate::pg_helpers::escape_literal;

static INSERT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^INSERT \d+ (\d+)$").expect("valid regex"));

const REPLICATION_STATUS_QUERY: &str = "SELECT client_addr, state, sent_lsn, write_lsn, flush_lsn, replay_lsn, \
     CASE WHEN replay_lsn IS NOT NULL THEN \
     EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp())) \
     END AS lag_seconds \
     FROM pg_stat_replication;";

#[derive(thiserror::Error, Debug)]
pub enum ExecError {
    Spawn {
        program: String,
        source: std::io::Error,
    },
    Failed {
        status: ExitStatus,
        output: String,
    },
    UnexpectedOutput(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecError::Spawn { program, source } => {
                write!(f, "could not spawn `{program}`: {source}")
            }
            ExecError::Failed { status, output } => {
                write!(f, "command failed with {status}: {}", output.trim())
            }
            ExecError::UnexpectedOutput(output) => {
                write!(f, "unexpected command output: {}", output.trim())
            }
        }
    }
}

/// Result of a single-row insert on the primary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub id: Option<i64>,
    pub created_at: Option<String>,
    /// Row count from the `INSERT 0 <n>` command tag, if psql printed one.
    pub rows: Option<u64>,
}

impl InsertOutcome {
    fn confirmed(&self) -> bool {
        self.id.is_some() || self.rows.is_some_and(|n| n > 0)
    }
}

/// One streaming standby as reported by `pg_stat_replication`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicationStatus {
    pub client_addr: String,
    pub state: String,
    pub lag_seconds: f64,
}

/// Runs `psql` inside the primary's container.
#[derive(Clone, Debug)]
pub struct PrimaryExec {
    runtime: String,
    container: String,
    user: String,
    dbname: String,
}

impl PrimaryExec {
    pub fn new(
        runtime: impl Into<String>,
        container: impl Into<String>,
        user: impl Into<String>,
        dbname: impl Into<String>,
    ) -> Self {
        PrimaryExec {
            runtime: runtime.into(),
            container: container.into(),
            user: user.into(),
            dbname: dbname.into(),
        }
    }

    pub fn from_config(conf: &ClusterConfig) -> Self {
        Self::new(
            &conf.container_runtime,
            &conf.primary_container,
            &conf.credentials.user,
            &conf.credentials.dbname,
        )
    }

    /// Argument list passed to the container runtime.
    pub fn args<'a>(&'a self, sql: &'a str) -> Vec<&'a str> {
        vec![
            "exec",
            self.container.as_str(),
            "psql",
            "-U",
            self.user.as_str(),
            "-d",
            self.dbname.as_str(),
            "-t",
            "-c",
            sql,
        ]
    }

    /// Run `sql` and return combined stdout and stderr.
    #[instrument(skip(self), fields(container = %self.container))]
    pub fn psql(&self, sql: &str) -> Result<String, ExecError> {
        debug!("running {} {:?}", self.runtime, self.args(sql));
        let output = Command::new(&self.runtime)
            .args(self.args(sql))
            .output()
            .map_err(|source| ExecError::Spawn {
                program: self.runtime.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ExecError::Failed {
                status: output.status,
                output: combined,
            });
        }
        Ok(combined)
    }

    /// Insert one row with payload `data` into `test_replication`.
    pub fn insert_row(&self, data: &str) -> Result<InsertOutcome, ExecError> {
        let sql = format!(
            "INSERT INTO test_replication (data) VALUES ({}) RETURNING id, created_at;",
            escape_literal(data)
        );
        let output = self.psql(&sql)?;
        let outcome = parse_insert_output(&output);
        if !outcome.confirmed() {
            return Err(ExecError::UnexpectedOutput(output));
        }
        Ok(outcome)
    }

    /// Status of the first streaming standby, `None` if no standby is
    /// currently streaming from the primary.
    pub fn replication_status(&self) -> Result<Option<ReplicationStatus>, ExecError> {
        let output = self.psql(REPLICATION_STATUS_QUERY)?;
        Ok(parse_replication_status(&output))
    }

    /// Probe the primary through the container.
    pub fn version(&self) -> Result<String, ExecError> {
        let output = self.psql("SELECT version();")?;
        let version = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string);
        version.ok_or(ExecError::UnexpectedOutput(output))
    }
}

/// Parse the output of `INSERT ... RETURNING id, created_at` in psql's
/// aligned format. Header lines are skipped, so it works with and without
/// `-t`.
pub fn parse_insert_output(output: &str) -> InsertOutcome {
    let mut outcome = InsertOutcome::default();

    for line in output.lines().map(str::trim) {
        if let Some(caps) = INSERT_TAG_RE.captures(line) {
            outcome.rows = caps[1].parse().ok();
            continue;
        }
        if outcome.id.is_some() {
            continue;
        }

        let mut fields = line.split('|').map(str::trim);
        let Some(first) = fields.next() else {
            continue;
        };
        if let Ok(id) = first.parse::<i64>() {
            outcome.id = Some(id);
            outcome.created_at = fields
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
    }

    outcome
}

/// Find the first `streaming` row in `pg_stat_replication` output.
pub fn parse_replication_status(output: &str) -> Option<ReplicationStatus> {
    output
        .lines()
        .filter(|line| line.contains("streaming"))
        .find_map(|line| {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() < 7 {
                return None;
            }
            Some(ReplicationStatus {
                client_addr: parts[0].to_string(),
                state: parts[1].to_string(),
                // NULL lag (nothing replayed yet) reads as caught up.
                lag_seconds: parts[6].parse().unwrap_or(0.0),
            })
        })
}
