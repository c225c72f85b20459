//! Table-level risk: one probability per row, for an explicitly chosen variant.

use std::fmt;

use itertools::Itertools;
use log::{debug, info};
use ndarray::Array1;
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equation::{CovariateColumns, ExtraColumns, risk_probabilities};
use crate::naming::risk_column_name;
use crate::shared::files::{TableError, column, float_series, numeric_column, string_values};
use crate::types::{Horizon, ModelVariant, Region};
use crate::validation::{ValidationError, ValidationIssue};

#[derive(Debug, Error)]
pub enum KfreError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Table(#[from] TableError),
}

/// One covariate the equation can consume from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Covariate {
    Age,
    Sex,
    Egfr,
    Uacr,
    Diabetes,
    Hypertension,
    Albumin,
    Phosphorous,
    Bicarbonate,
    Calcium,
}

impl Covariate {
    const BASE: [Covariate; 4] = [
        Covariate::Age,
        Covariate::Sex,
        Covariate::Egfr,
        Covariate::Uacr,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Covariate::Age => "age",
            Covariate::Sex => "sex",
            Covariate::Egfr => "eGFR",
            Covariate::Uacr => "uACR",
            Covariate::Diabetes => "dm",
            Covariate::Hypertension => "htn",
            Covariate::Albumin => "albumin",
            Covariate::Phosphorous => "phosphorous",
            Covariate::Bicarbonate => "bicarbonate",
            Covariate::Calcium => "calcium",
        }
    }

    /// Covariates beyond the base four that `variant` needs, in equation order.
    pub fn extras(variant: ModelVariant) -> &'static [Covariate] {
        match variant {
            ModelVariant::FourVariable => &[],
            ModelVariant::SixVariable => &[Covariate::Diabetes, Covariate::Hypertension],
            ModelVariant::EightVariable => &[
                Covariate::Albumin,
                Covariate::Phosphorous,
                Covariate::Bicarbonate,
                Covariate::Calcium,
            ],
        }
    }

    pub fn required(variant: ModelVariant) -> impl Iterator<Item = Covariate> {
        Covariate::BASE
            .into_iter()
            .chain(Covariate::extras(variant).iter().copied())
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which table column holds each covariate. Unmapped covariates stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMap {
    pub age: Option<String>,
    pub sex: Option<String>,
    pub egfr: Option<String>,
    pub uacr: Option<String>,
    pub dm: Option<String>,
    pub htn: Option<String>,
    pub albumin: Option<String>,
    pub phosphorous: Option<String>,
    pub bicarbonate: Option<String>,
    pub calcium: Option<String>,
}

impl ColumnMap {
    pub fn get(&self, covariate: Covariate) -> Option<&str> {
        let name = match covariate {
            Covariate::Age => &self.age,
            Covariate::Sex => &self.sex,
            Covariate::Egfr => &self.egfr,
            Covariate::Uacr => &self.uacr,
            Covariate::Diabetes => &self.dm,
            Covariate::Hypertension => &self.htn,
            Covariate::Albumin => &self.albumin,
            Covariate::Phosphorous => &self.phosphorous,
            Covariate::Bicarbonate => &self.bicarbonate,
            Covariate::Calcium => &self.calcium,
        };
        name.as_deref()
    }
}

/// Covariate arrays loaded for one variant. Reused across horizons.
struct LoadedCovariates {
    age: Array1<f64>,
    sex: Array1<f64>,
    egfr: Array1<f64>,
    uacr: Array1<f64>,
    extra: Vec<Array1<f64>>,
}

impl LoadedCovariates {
    fn columns(&self) -> CovariateColumns<'_> {
        let extra = match self.extra.as_slice() {
            [diabetes, hypertension] => ExtraColumns::Comorbidity {
                diabetes: diabetes.view(),
                hypertension: hypertension.view(),
            },
            [albumin, phosphorous, bicarbonate, calcium] => ExtraColumns::SerumMarkers {
                albumin: albumin.view(),
                phosphorous: phosphorous.view(),
                bicarbonate: bicarbonate.view(),
                calcium: calcium.view(),
            },
            _ => ExtraColumns::None,
        };
        CovariateColumns {
            age: self.age.view(),
            sex: self.sex.view(),
            egfr: self.egfr.view(),
            uacr: self.uacr.view(),
            extra,
        }
    }
}

/// `"male"` in any case is 1, any other string 0, null missing. Boolean and
/// numeric columns are read as 0/1 directly.
fn sex_indicator(df: &DataFrame, name: &str) -> Result<Array1<f64>, TableError> {
    if !matches!(column(df, name)?.dtype(), DataType::String) {
        return numeric_column(df, name);
    }
    Ok(string_values(df, name)?
        .into_iter()
        .map(|value| match value {
            Some(sex) if sex.trim().eq_ignore_ascii_case("male") => 1.0,
            Some(_) => 0.0,
            None => f64::NAN,
        })
        .collect())
}

/// Rounds half away from zero. Precision beyond what `f64` can scale to leaves
/// `value` as it is.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

/// A same-named column may be replaced only when it looks like an earlier
/// risk column: `Float64` with every value in `[0, 1]`.
fn holds_prior_risk(df: &DataFrame, name: &str) -> bool {
    df.column(name)
        .ok()
        .and_then(|existing| existing.f64().ok())
        .is_some_and(|values| values.into_iter().flatten().all(|p| (0.0..=1.0).contains(&p)))
}

/// Scores rows of a table with the column mapping supplied at construction.
#[derive(Debug, Clone)]
pub struct RiskPredictor<'a> {
    df: &'a DataFrame,
    columns: ColumnMap,
}

impl<'a> RiskPredictor<'a> {
    pub fn new(df: &'a DataFrame, columns: ColumnMap) -> Self {
        Self { df, columns }
    }

    /// Probability of kidney failure within `years` for every row.
    ///
    /// With `use_extra_vars` false the 4-variable model is used whatever
    /// `num_vars` says. Otherwise `num_vars` picks the model and must be 4, 6
    /// or 8. Rows with any missing covariate come back as NaN.
    pub fn predict_kfre(
        &self,
        years: u32,
        is_north_american: bool,
        use_extra_vars: bool,
        num_vars: u32,
    ) -> Result<Array1<f64>, KfreError> {
        let mut issues = Vec::new();
        let horizon = Horizon::try_from(years)
            .map_err(|issue| issues.push(issue))
            .ok();
        let variant = if use_extra_vars {
            ModelVariant::try_from(num_vars)
                .map_err(|issue| issues.push(issue))
                .ok()
        } else {
            Some(ModelVariant::FourVariable)
        };
        if let Some(variant) = variant {
            self.check_mapping(&[variant], &mut issues);
        }

        let (Some(horizon), Some(variant)) = (horizon, variant) else {
            return Err(ValidationError::from_issues(issues).into());
        };
        ValidationError::check(issues)?;

        let loaded = self.load(variant)?;
        Ok(risk_probabilities(
            &loaded.columns(),
            Region::from_flag(is_north_american),
            horizon,
        ))
    }

    /// Records every unmapped covariate, per variant, and every mapped column
    /// the table does not have.
    fn check_mapping(&self, variants: &[ModelVariant], issues: &mut Vec<ValidationIssue>) {
        for &variant in variants {
            let missing = Covariate::required(variant)
                .filter(|covariate| self.columns.get(*covariate).is_none())
                .join(", ");
            if !missing.is_empty() {
                issues.push(ValidationIssue::MissingColumnMapping {
                    num_vars: variant.num_vars(),
                    fields: missing,
                });
            }
        }

        let mapped = variants
            .iter()
            .flat_map(|variant| Covariate::required(*variant))
            .unique()
            .filter_map(|covariate| Some((covariate, self.columns.get(covariate)?)));
        for (covariate, name) in mapped {
            if self.df.column(name).is_err() {
                issues.push(ValidationIssue::ColumnAbsent {
                    field: covariate.label(),
                    column: name.to_string(),
                });
            }
        }
    }

    fn load_covariate(&self, covariate: Covariate) -> Result<Array1<f64>, KfreError> {
        let name = self.columns.get(covariate).ok_or_else(|| {
            ValidationError::from(ValidationIssue::MissingValue(covariate.label()))
        })?;
        let values = match covariate {
            Covariate::Sex => sex_indicator(self.df, name)?,
            _ => numeric_column(self.df, name)?,
        };
        Ok(values)
    }

    fn load(&self, variant: ModelVariant) -> Result<LoadedCovariates, KfreError> {
        Ok(LoadedCovariates {
            age: self.load_covariate(Covariate::Age)?,
            sex: self.load_covariate(Covariate::Sex)?,
            egfr: self.load_covariate(Covariate::Egfr)?,
            uacr: self.load_covariate(Covariate::Uacr)?,
            extra: Covariate::extras(variant)
                .iter()
                .map(|covariate| self.load_covariate(*covariate))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Free-function form of [`RiskPredictor::predict_kfre`].
pub fn predict_kfre(
    df: &DataFrame,
    columns: ColumnMap,
    years: u32,
    is_north_american: bool,
    use_extra_vars: bool,
    num_vars: u32,
) -> Result<Array1<f64>, KfreError> {
    RiskPredictor::new(df, columns).predict_kfre(years, is_north_american, use_extra_vars, num_vars)
}

/// Which risk columns to add to a table, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskColumnRequest {
    pub columns: ColumnMap,
    /// Variant sizes to compute, each 4, 6 or 8.
    pub num_vars: Vec<u32>,
    /// Horizons in years, each 2 or 5.
    pub years: Vec<u32>,
    pub is_north_american: bool,
    /// Replaces the default `kfre` prefix of the output columns.
    pub prefix: Option<String>,
    /// Decimal places to round probabilities to.
    pub precision: Option<u32>,
}

impl Default for RiskColumnRequest {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            num_vars: vec![4],
            years: vec![2, 5],
            is_north_american: false,
            prefix: None,
            precision: None,
        }
    }
}

/// Adds one risk column per requested (variant, horizon) and returns their
/// names in the order written.
///
/// The whole request is validated, and every column computed, before the
/// table is touched; a failed request leaves `df` exactly as it was. An
/// earlier risk column of the same name is replaced, but any other existing
/// column with that name is reported instead of overwritten.
pub fn add_kfre_risk_cols(
    df: &mut DataFrame,
    request: &RiskColumnRequest,
) -> Result<Vec<String>, KfreError> {
    let mut issues = Vec::new();
    let variants: Vec<ModelVariant> = request
        .num_vars
        .iter()
        .unique()
        .filter_map(|&n| ModelVariant::try_from(n).map_err(|i| issues.push(i)).ok())
        .collect();
    let horizons: Vec<Horizon> = request
        .years
        .iter()
        .unique()
        .filter_map(|&y| Horizon::try_from(y).map_err(|i| issues.push(i)).ok())
        .collect();

    let predictor = RiskPredictor::new(df, request.columns.clone());
    predictor.check_mapping(&variants, &mut issues);
    for &variant in &variants {
        for &horizon in &horizons {
            let name = risk_column_name(variant, horizon, request.prefix.as_deref());
            if df.column(&name).is_ok() && !holds_prior_risk(df, &name) {
                issues.push(ValidationIssue::OutputColumnTaken(name));
            }
        }
    }
    ValidationError::check(issues)?;

    let region = Region::from_flag(request.is_north_american);
    let mut computed = Vec::with_capacity(variants.len() * horizons.len());
    for &variant in &variants {
        let loaded = predictor.load(variant)?;
        let columns = loaded.columns();
        for &horizon in &horizons {
            let mut probabilities = risk_probabilities(&columns, region, horizon);
            if let Some(decimals) = request.precision {
                probabilities.mapv_inplace(|p| round_to(p, decimals));
            }
            let name = risk_column_name(variant, horizon, request.prefix.as_deref());
            debug!(
                "{name}: {} of {} rows scored",
                probabilities.iter().filter(|p| !p.is_nan()).count(),
                probabilities.len()
            );
            computed.push(float_series(&name, &probabilities));
        }
    }

    let mut written = Vec::with_capacity(computed.len());
    for series in computed {
        let name = series.name().to_string();
        df.with_column(series).map_err(TableError::from)?;
        info!("Added risk column '{name}'.");
        written.push(name);
    }
    Ok(written)
}

/// Like [`add_kfre_risk_cols`] but leaves `df` untouched and returns a copy.
pub fn with_kfre_risk_cols(
    df: &DataFrame,
    request: &RiskColumnRequest,
) -> Result<DataFrame, KfreError> {
    let mut copy = df.clone();
    add_kfre_risk_cols(&mut copy, request)?;
    Ok(copy)
}
