//!
//! Tools to verify a Postgres primary/standby streaming replication pair:
//! connectivity checks, a write-to-primary / read-from-standby demo,
//! replication lag polling and ad-hoc latency loops.
//!
pub mod checker;
pub mod config;
pub mod demo;
pub mod logger;
pub mod pg_helpers;
pub mod primary_exec;
pub mod replication;
pub mod standby;
