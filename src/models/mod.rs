mod lot;
mod tax;
mod transaction;
mod valuation;

pub use lot::{
    BuyLotRequest, Lot, LotFilter, LotRow, NewLot, OpenPosition, PriceSnapshot, RealizedSale,
    SaleOrder, SellLotRequest, PRICE_HISTORY_CAPACITY,
};
pub use tax::{
    validate_year, CalculateTaxRequest, SlabTable, TaxBreakdown, TaxInputs, TaxRecord, TaxRequest,
};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use valuation::{GainsSummary, ValuationMeta, ValuationPoint, ValuationResponse};
