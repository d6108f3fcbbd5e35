pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod export;
pub mod import;
pub mod league_table;
pub mod logging;
pub mod memo;
pub mod metrics;
pub mod standings;
