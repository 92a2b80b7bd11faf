pub mod aggregator;
pub mod automation;
pub mod browser;
pub mod career_page;
pub mod job_details;
pub mod questions;
pub mod sources;
pub mod stream;
