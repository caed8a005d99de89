pub mod core;
pub mod models;
pub mod schedule;
pub mod stores;
pub mod validation;
pub mod report;
pub mod handlers;
pub mod jobs;
pub mod transport;
pub mod metrics;
