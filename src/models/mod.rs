pub mod application;
pub mod details;
pub mod job;
pub mod question;
