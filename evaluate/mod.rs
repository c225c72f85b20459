//! Validation of risk columns against observed outcomes.

pub mod metrics;
pub mod report;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::shared::files::TableError;
use crate::validation::ValidationError;

pub use metrics::{BinaryMetrics, ConfusionCounts, DECISION_THRESHOLD};
pub use report::{MetricInputs, OutcomeLabels, VariantPredictions, eval_kfre_metrics, prepare_metric_inputs};

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("No column ending in '{0}' was found; label outcomes before deriving metrics.")]
    MissingOutcomeColumn(String),
    #[error(
        "Must derive KFRE probabilities before generating performance evaluation metrics. Missing columns: {}",
        .0.join(", ")
    )]
    MissingProbabilityColumns(Vec<String>),
    #[error("{0}")]
    Table(#[from] TableError),
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}
