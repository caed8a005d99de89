pub mod reporting;
pub mod scheduler;
