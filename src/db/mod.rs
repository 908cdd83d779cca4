pub mod lot_queries;
pub mod tax_queries;
pub mod transaction_queries;

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
