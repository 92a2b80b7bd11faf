pub mod automate;
pub mod details;
pub mod error;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod scrape;
pub mod stream;
