pub mod health;
pub mod lots;
pub mod portfolio;
pub mod tax;
pub mod transactions;
