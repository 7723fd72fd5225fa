use anyhow::{Context, Result};
use tracing::{error, instrument};

use crate::config::{Credentials, Endpoint};
use crate::pg_helpers::truncate_for_display;
use crate::standby::StandbyClient;

const VERSION_DISPLAY_CHARS: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerRole {
    Primary,
    Standby,
}

impl ServerRole {
    pub fn from_recovery(in_recovery: bool) -> Self {
        if in_recovery {
            ServerRole::Standby
        } else {
            ServerRole::Primary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Primary => "primary",
            ServerRole::Standby => "standby",
        }
    }
}

/// Connect to `endpoint`, print its version, the `test_replication` row
/// count and whether it is a primary or a standby. Returns false on the
/// first failing step.
#[instrument(skip(creds))]
pub fn check_connection(
    endpoint: &Endpoint,
    creds: &Credentials,
    connect_timeout_secs: u64,
    description: &str,
) -> bool {
    println!("🔗 testing connection to {description}...");
    println!("   host: {endpoint}");

    match probe(endpoint, creds, connect_timeout_secs) {
        Ok(()) => true,
        Err(e) => {
            error!("{description} check failed: {e:#}");
            println!("   ❌ {e:#}");
            false
        }
    }
}

fn probe(endpoint: &Endpoint, creds: &Credentials, connect_timeout_secs: u64) -> Result<()> {
    let mut client = StandbyClient::connect(endpoint, creds, connect_timeout_secs)
        .context("connection failed")?;
    client.ping().context("connection failed")?;

    let version = client.version().context("version lookup failed")?;
    println!(
        "   ✅ connected: {}",
        truncate_for_display(&version, VERSION_DISPLAY_CHARS)
    );

    let count = client
        .row_count()
        .context("test_replication table check failed")?;
    println!("   📊 test_replication table: {count} rows");

    let role = client
        .is_in_recovery()
        .map(ServerRole::from_recovery)
        .context("server role check failed")?;
    println!("   🏷️  server role: {}", role.as_str());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_from_recovery_flag() {
        assert_eq!(ServerRole::from_recovery(true), ServerRole::Standby);
        assert_eq!(ServerRole::from_recovery(false), ServerRole::Primary);
        assert_eq!(ServerRole::Standby.as_str(), "standby");
    }

    #[test]
    fn unreachable_server_fails_check() {
        let creds = Credentials {
            user: "postgres".to_string(),
            password: "password".to_string(),
            dbname: "testdb".to_string(),
        };
        // Port 1 on loopback refuses connections.
        let endpoint = Endpoint::new("127.0.0.1", 1);
        assert!(!check_connection(&endpoint, &creds, 1, "unreachable server"));
    }
}
