//! fleetseek - keyword search over managed endpoint records.
//!
//! Client records (hostname, FQDN, labels, IPs, MACs, users, id) are broken
//! into categorized tokens and kept in an in-memory inverted index. A search
//! box query is first checked against a job registry, so that a hunt id
//! opens the hunt, and otherwise evaluated as an AND of keyword terms.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use fleetseek::{ClientRecord, MemoryJobRegistry, SearchOutcome, SearchService};
//!
//! let clients = vec![
//!     ClientRecord::new("C.1000000000000001")
//!         .with_host("Host-1", "Host-1.example.com")
//!         .with_label("common_test_label", "admin")
//!         .with_mac("aabbccddee01"),
//!     ClientRecord::new("C.1000000000000002").with_host("Host-2", "Host-2.example.com"),
//! ];
//!
//! let registry = Arc::new(MemoryJobRegistry::new());
//! registry.insert("H:1A2B3C4D", "demo hunt").unwrap();
//! let service = SearchService::from_source(&clients, registry).unwrap();
//!
//! match service.search("host:Host-1").unwrap() {
//!     SearchOutcome::Clients(ids) => assert_eq!(ids.len(), 1),
//!     SearchOutcome::Job(_) => unreachable!(),
//! }
//! assert_eq!(
//!     service.search("H:1A2B3C4D").unwrap(),
//!     SearchOutcome::Job("H:1A2B3C4D".to_string())
//! );
//! assert_eq!(
//!     service.complete_label("common_").unwrap(),
//!     vec!["label:common_test_label"]
//! );
//! ```

pub mod cli;
pub mod client;
pub mod data_dir;
pub mod error;
pub mod fleet_db;
pub mod index;
pub mod mcp;
pub mod query;
pub mod registry;
pub mod search;
pub mod snapshot;
pub mod tokenizer;
pub mod vocabulary;

pub use client::{ClientLabel, ClientRecord};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use fleet_db::FleetDb;
pub use index::ClientIndex;
pub use registry::{JobLookup, JobRegistry, MemoryJobRegistry};
pub use search::{RegistryPolicy, SearchOutcome, SearchService};
pub use snapshot::ClientSource;
