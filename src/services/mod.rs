pub mod failure_cache;
pub mod gains_classifier;
pub mod gains_summary_service;
pub mod lot_service;
pub mod price_history;
pub mod rate_limiter;
pub mod sell_engine;
pub mod tax_service;
pub mod valuation_service;
