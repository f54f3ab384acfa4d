pub mod admission;
pub mod config;
pub mod content_type;
pub mod dirs;
pub mod filename;
pub mod humanize;
pub mod job;
pub mod ledger;
pub mod messaging;
pub mod observability;
pub mod orchestrator;
pub mod reuse;
pub mod strategy;
pub mod worker;
