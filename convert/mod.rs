//! Lab-unit conversion and uPCR to uACR estimation.
//!
//! Both operations only ever add columns; source columns are left as they are.

pub mod uacr;
pub mod units;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::shared::files::TableError;

pub use uacr::{UacrColumns, add_uacr_column, upcr_to_uacr};
pub use units::{Conversion, ConversionReport, ConversionRequest, Quantity, perform_conversions};

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{0}")]
    Table(#[from] TableError),
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}
