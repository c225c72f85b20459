use itertools::Itertools;
use log::{info, warn};
use ndarray::Array1;
use polars::prelude::{DataFrame, NamedFrom, Series};

use super::EvaluationError;
use super::metrics::BinaryMetrics;
use crate::naming::{METRICS_COLUMN, metric_outcome_label, outcome_column_suffix, risk_column_name};
use crate::predictor::round_to;
use crate::shared::files::numeric_column;
use crate::types::{Horizon, ModelVariant};
use crate::validation::ValidationError;

/// Observed 0/1 outcomes for one horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeLabels {
    pub horizon: Horizon,
    pub column: String,
    pub labels: Array1<f64>,
}

/// Probabilities of one variant, one array per horizon in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPredictions {
    pub variant: ModelVariant,
    pub probabilities: Vec<Array1<f64>>,
}

/// Labels and predictions lined up for curve plotting or metric computation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricInputs {
    pub outcomes: Vec<OutcomeLabels>,
    pub predictions: Vec<VariantPredictions>,
}

fn parse_request(
    num_vars: &[u32],
    years: &[u32],
) -> Result<(Vec<ModelVariant>, Vec<Horizon>), ValidationError> {
    let mut issues = Vec::new();
    let variants = num_vars
        .iter()
        .unique()
        .filter_map(|&n| ModelVariant::try_from(n).map_err(|i| issues.push(i)).ok())
        .collect();
    let horizons = years
        .iter()
        .unique()
        .filter_map(|&y| Horizon::try_from(y).map_err(|i| issues.push(i)).ok())
        .collect();
    ValidationError::check(issues)?;
    Ok((variants, horizons))
}

/// The first column, in table order, ending in `{h}_year_outcome`.
fn outcome_labels(df: &DataFrame, horizon: Horizon) -> Result<OutcomeLabels, EvaluationError> {
    let suffix = outcome_column_suffix(horizon);
    let column = df
        .get_column_names()
        .into_iter()
        .find(|name| name.as_str().ends_with(&suffix))
        .map(|name| name.to_string())
        .ok_or_else(|| EvaluationError::MissingOutcomeColumn(suffix.clone()))?;
    Ok(OutcomeLabels {
        horizon,
        labels: numeric_column(df, &column)?,
        column,
    })
}

/// Gathers outcome labels per horizon and default-named probability columns
/// per variant. Every absent probability column is reported in one error.
pub fn prepare_metric_inputs(
    df: &DataFrame,
    num_vars: &[u32],
    years: &[u32],
) -> Result<MetricInputs, EvaluationError> {
    let (variants, horizons) = parse_request(num_vars, years)?;

    let missing: Vec<String> = horizons
        .iter()
        .flat_map(|&h| variants.iter().map(move |&v| risk_column_name(v, h, None)))
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(EvaluationError::MissingProbabilityColumns(missing));
    }

    let outcomes = horizons
        .iter()
        .map(|&horizon| outcome_labels(df, horizon))
        .collect::<Result<Vec<_>, _>>()?;

    let predictions = variants
        .iter()
        .map(|&variant| {
            let probabilities = horizons
                .iter()
                .map(|&h| numeric_column(df, &risk_column_name(variant, h, None)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(VariantPredictions {
                variant,
                probabilities,
            })
        })
        .collect::<Result<Vec<_>, EvaluationError>>()?;

    Ok(MetricInputs {
        outcomes,
        predictions,
    })
}

/// A metric table: a `Metrics` label column plus one column per available
/// (variant, horizon), named like `2_year_4_var_kfre`. Probability columns
/// that do not exist are skipped; outcome columns must exist.
pub fn eval_kfre_metrics(
    df: &DataFrame,
    num_vars: &[u32],
    years: &[u32],
    decimal_places: u32,
) -> Result<DataFrame, EvaluationError> {
    let (variants, horizons) = parse_request(num_vars, years)?;
    let outcomes = horizons
        .iter()
        .map(|&horizon| outcome_labels(df, horizon))
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = vec![Series::new(METRICS_COLUMN.into(), BinaryMetrics::NAMES.to_vec()).into()];
    for &variant in &variants {
        for outcome in &outcomes {
            let name = risk_column_name(variant, outcome.horizon, None);
            if df.column(&name).is_err() {
                warn!("Column '{name}' not found; skipping its metrics.");
                continue;
            }
            let probabilities = numeric_column(df, &name)?;
            let metrics = BinaryMetrics::compute(outcome.labels.view(), probabilities.view());
            let values: Vec<f64> = metrics
                .values()
                .iter()
                .map(|&value| round_to(value, decimal_places))
                .collect();
            let label = metric_outcome_label(outcome.horizon, variant);
            info!(
                "{label}: AUC ROC {:.4}, Brier {:.4} against '{}'",
                metrics.auc_roc, metrics.brier, outcome.column
            );
            columns.push(Series::new(label.as_str().into(), values).into());
        }
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scored_cohort() -> DataFrame {
        DataFrame::new(vec![
            Series::new("ESRD_2_year_outcome".into(), vec![0i32, 0, 1, 1]).into(),
            Series::new("ESRD_5_year_outcome".into(), vec![0i32, 1, 1, 1]).into(),
            Series::new("kfre_4var_2year".into(), vec![0.1, 0.2, 0.8, 0.9]).into(),
            Series::new("kfre_4var_5year".into(), vec![0.3, 0.6, 0.9, 0.95]).into(),
            Series::new("kfre_6var_2year".into(), vec![Some(0.4), Some(0.3), None, Some(0.7)]).into(),
        ])
        .expect("construct scored cohort")
    }

    fn metric(df: &DataFrame, column: &str, row: usize) -> f64 {
        df.column(column).unwrap().f64().unwrap().get(row).unwrap()
    }

    #[test]
    fn metric_table_layout() {
        let df = scored_cohort();
        let table = eval_kfre_metrics(&df, &[4, 6], &[2, 5], 6).unwrap();

        let names: Vec<String> = table
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Metrics", "2_year_4_var_kfre", "5_year_4_var_kfre", "2_year_6_var_kfre"]
        );
        assert_eq!(table.height(), 6);

        let rows: Vec<Option<&str>> = table.column("Metrics").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(rows[0], Some("Precision/PPV"));
        assert_eq!(rows[5], Some("Brier Score"));
    }

    #[test]
    fn perfect_two_year_separation() {
        let df = scored_cohort();
        let table = eval_kfre_metrics(&df, &[4], &[2], 6).unwrap();
        assert_abs_diff_eq!(metric(&table, "2_year_4_var_kfre", 4), 1.0);
        assert_abs_diff_eq!(metric(&table, "2_year_4_var_kfre", 5), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn decimal_places_round_values() {
        let df = scored_cohort();
        let table = eval_kfre_metrics(&df, &[6], &[2], 2).unwrap();
        // Rows kept: (0, 0.4), (0, 0.3), (1, 0.7); Brier = (0.16 + 0.09 + 0.09) / 3.
        assert_abs_diff_eq!(metric(&table, "2_year_6_var_kfre", 5), 0.11, epsilon = 1e-12);
    }

    #[test]
    fn absent_outcome_column_is_an_error() {
        let mut df = scored_cohort();
        df.drop_in_place("ESRD_5_year_outcome").unwrap();
        let err = eval_kfre_metrics(&df, &[4], &[2, 5], 6).unwrap_err();
        assert!(matches!(err, EvaluationError::MissingOutcomeColumn(ref s) if s == "5_year_outcome"));
    }

    #[test]
    fn invalid_request_is_rejected() {
        let df = scored_cohort();
        let err = eval_kfre_metrics(&df, &[4, 7], &[3], 6).unwrap_err();
        let EvaluationError::Validation(err) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn prepare_reports_all_missing_probability_columns() {
        let df = scored_cohort();
        let err = prepare_metric_inputs(&df, &[6, 8], &[2, 5]).unwrap_err();
        let EvaluationError::MissingProbabilityColumns(missing) = err else {
            panic!("expected missing probability columns");
        };
        assert_eq!(
            missing,
            vec!["kfre_8var_2year", "kfre_6var_5year", "kfre_8var_5year"]
        );
    }

    #[test]
    fn prepare_lines_up_labels_and_predictions() {
        let df = scored_cohort();
        let inputs = prepare_metric_inputs(&df, &[4], &[2, 5]).unwrap();
        assert_eq!(inputs.outcomes.len(), 2);
        assert_eq!(inputs.outcomes[0].column, "ESRD_2_year_outcome");
        assert_eq!(inputs.outcomes[1].labels.to_vec(), vec![0.0, 1.0, 1.0, 1.0]);
        assert_eq!(inputs.predictions.len(), 1);
        assert_eq!(inputs.predictions[0].variant, ModelVariant::FourVariable);
        assert_eq!(inputs.predictions[0].probabilities[1][1], 0.6);
    }
}
