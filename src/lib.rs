pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gdpr;
pub mod models;
pub mod notify;
pub mod output;
pub mod reminders;
pub mod report;
pub mod store;
