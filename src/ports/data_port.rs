//! Price data access port trait.

use chrono::NaiveDate;

use crate::domain::error::StratlangError;
use crate::domain::table::PriceTable;

pub trait DataPort {
    /// Load the full table, keeping only rows inside the inclusive date
    /// range when bounds are given. Rows without timestamps are never
    /// filtered out.
    fn fetch_table(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceTable, StratlangError>;
}
