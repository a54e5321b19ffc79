pub mod clients;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod reports;
