#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Admin engine and CLI for the MyBot backend.
//!
//! Layout:
//! - `gateway.rs`: one HTTP call per backend operation, shared error classification
//! - `normalize.rs`: nested backend listings flattened into typed entries
//! - `aggregate.rs`: counts, series and gauges derived from normalized entries
//! - `views.rs`: live views publishing snapshots, scoped by liveness
//! - `schedule.rs`: recurring display and telemetry schedules, time-left formatting
//! - `refresh.rs`: mutate-then-refetch around every write
//! - `notice.rs`: transient success/error notices
//! - `cli.rs`, `commands/`, `client.rs`, `output.rs`: the command-line front end
//! - `main.rs`: thin entrypoint delegating to `run()`

pub mod aggregate;
pub mod error;
pub mod gateway;
pub mod model;
pub mod normalize;
pub mod notice;
pub mod refresh;
pub mod schedule;
pub mod views;

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
