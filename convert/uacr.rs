//! Estimated uACR from uPCR, sex, diabetes and hypertension.
//!
//! Sumida K, Nadkarni GN, Grams ME, et al. "Conversion of urine
//! protein-creatinine ratio or urine dipstick protein to urine
//! albumin-creatinine ratio for use in chronic kidney disease screening and
//! prognosis." Ann Intern Med 173(6):426-435 (2020).

use log::info;
use ndarray::{Array1, Zip};
use polars::prelude::{DataFrame, Series};

use super::ConversionError;
use crate::shared::files::{float_series, numeric_column, string_values};

/// Source columns for the uPCR to uACR estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UacrColumns {
    pub sex: String,
    pub diabetes: String,
    pub hypertension: String,
    pub upcr: String,
    /// Value of the sex column that marks a female patient.
    pub female_label: String,
}

/// uACR for one patient. `female`, `diabetes` and `hypertension` are 0/1.
pub fn estimate_uacr(upcr: f64, female: f64, diabetes: f64, hypertension: f64) -> f64 {
    (5.2659 + 0.2934 * (upcr / 50.0).min(1.0).ln()
        + 1.5643 * (upcr / 500.0).min(1.0).max(0.1).ln()
        + 1.1109 * (upcr / 500.0).max(1.0).ln()
        - 0.0773 * female
        + 0.0797 * diabetes
        + 0.1265 * hypertension)
        .exp()
}

/// Estimated uACR for every row as a nullable `Float64` series named `uACR`.
///
/// A row missing diabetes, hypertension or uPCR is null; those are never
/// defaulted. The sex column must hold strings and is compared exactly
/// against `female_label`. Indicator values are truncated to integers.
pub fn upcr_to_uacr(df: &DataFrame, columns: &UacrColumns) -> Result<Series, ConversionError> {
    Ok(float_series("uACR", &uacr_values(df, columns)?))
}

fn uacr_values(df: &DataFrame, columns: &UacrColumns) -> Result<Array1<f64>, ConversionError> {
    let female: Array1<f64> = string_values(df, &columns.sex)?
        .into_iter()
        .map(|sex| match sex {
            Some(sex) if sex == columns.female_label => 1.0,
            _ => 0.0,
        })
        .collect();
    let diabetes = numeric_column(df, &columns.diabetes)?;
    let hypertension = numeric_column(df, &columns.hypertension)?;
    let upcr = numeric_column(df, &columns.upcr)?;

    Ok(Zip::from(&upcr)
        .and(&female)
        .and(&diabetes)
        .and(&hypertension)
        .map_collect(|&upcr, &female, &dm, &htn| {
            if dm.is_nan() || htn.is_nan() {
                f64::NAN
            } else {
                estimate_uacr(upcr, female, dm.trunc(), htn.trunc())
            }
        }))
}

/// Writes [`upcr_to_uacr`] into `df` under `output`, replacing a same-named column.
pub fn add_uacr_column(
    df: &mut DataFrame,
    columns: &UacrColumns,
    output: &str,
) -> Result<(), ConversionError> {
    let values = uacr_values(df, columns)?;
    let estimated = values.iter().filter(|v| !v.is_nan()).count();
    df.with_column(float_series(output, &values))?;
    info!(
        "Estimated uACR for {estimated} of {} rows into column '{output}'.",
        values.len()
    );
    Ok(())
}
