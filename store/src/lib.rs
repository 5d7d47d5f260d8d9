//! Store-side collaborators for the genread read benchmark
//!
//! This crate owns everything the benchmark core talks to but does not
//! measure: the key-value store clients, the versioned key layout, the
//! network-block key universe and the application configuration.
//!
//! - `client`: the `StoreClient` trait and the `GetOutcome` returned per lookup
//! - `memory`: an in-process store used for dry runs and tests
//! - `resp`: a blocking RESP2 (Redis protocol) client with a connection pool
//! - `network`: IPv4 CIDR parsing and host sampling for the key universe
//! - `config`: JSON file + environment configuration loading

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod network;
pub mod resp;

pub use client::{versioned_key, GetOutcome, StoreClient, KEY_NAMESPACE};
pub use config::AppConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use network::{load_universe, NetworkBlock};
pub use resp::RespStore;
