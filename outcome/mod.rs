//! Outcome labels for validation and CKD stage classification.

pub mod labels;
pub mod stages;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::shared::files::TableError;

pub use labels::{DAYS_PER_YEAR, OutcomeRequest, label_outcome};
pub use stages::{CkdStage, classify_ckd_stage, combined_stage_label};

#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("{0}")]
    Table(#[from] TableError),
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}
