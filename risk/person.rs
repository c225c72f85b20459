//! Single-patient risk.
//!
//! The model variant is inferred from which optional covariates are present:
//! a complete serum-marker panel selects the 8-variable model, otherwise
//! complete diabetes and hypertension status selects the 6-variable model,
//! otherwise the 4-variable model is used.

use log::debug;

use crate::equation::{ExtraCovariates, PatientCovariates, risk_probability};
use crate::types::{FlagValue, Horizon, Region};
use crate::validation::{ValidationError, ValidationIssue};

/// Raw inputs for one patient. Leave a field `None` when the value is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientInputs {
    pub age: Option<f64>,
    pub is_male: Option<bool>,
    pub egfr: Option<f64>,
    pub uacr: Option<f64>,
    pub is_north_american: Option<bool>,
    /// 2 or 5.
    pub years: u32,
    pub diabetes: Option<FlagValue>,
    pub hypertension: Option<FlagValue>,
    pub albumin: Option<f64>,
    pub phosphorous: Option<f64>,
    pub bicarbonate: Option<f64>,
    pub calcium: Option<f64>,
}

impl Default for PatientInputs {
    fn default() -> Self {
        Self {
            age: None,
            is_male: None,
            egfr: None,
            uacr: None,
            is_north_american: None,
            years: 2,
            diabetes: None,
            hypertension: None,
            albumin: None,
            phosphorous: None,
            bicarbonate: None,
            calcium: None,
        }
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

fn required(value: Option<f64>, name: &'static str, issues: &mut Vec<ValidationIssue>) -> f64 {
    present(value).unwrap_or_else(|| {
        issues.push(ValidationIssue::MissingValue(name));
        f64::NAN
    })
}

fn indicator(
    value: Option<FlagValue>,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<f64> {
    let value = value?;
    let indicator = value.as_indicator();
    if indicator.is_none() {
        issues.push(ValidationIssue::InvalidIndicator {
            field,
            value: value.to_string(),
        });
    }
    indicator
}

fn infer_extra(
    inputs: &PatientInputs,
    diabetes: Option<f64>,
    hypertension: Option<f64>,
) -> ExtraCovariates {
    let markers = [
        present(inputs.albumin),
        present(inputs.phosphorous),
        present(inputs.bicarbonate),
        present(inputs.calcium),
    ];

    if let [Some(albumin), Some(phosphorous), Some(bicarbonate), Some(calcium)] = markers {
        if diabetes.is_some() || hypertension.is_some() {
            debug!("Serum markers are complete; diabetes and hypertension are not used.");
        }
        return ExtraCovariates::SerumMarkers {
            albumin,
            phosphorous,
            bicarbonate,
            calcium,
        };
    }
    if markers.iter().any(Option::is_some) {
        debug!("Serum marker panel is incomplete and will be ignored.");
    }

    match (diabetes, hypertension) {
        (Some(diabetes), Some(hypertension)) => ExtraCovariates::Comorbidity {
            diabetes,
            hypertension,
        },
        (None, None) => ExtraCovariates::None,
        _ => {
            debug!("Only one of diabetes and hypertension was supplied; both are ignored.");
            ExtraCovariates::None
        }
    }
}

/// Probability of kidney failure within `inputs.years` for one patient.
///
/// Every input problem is reported in a single `ValidationError`.
pub fn kfre_person(inputs: &PatientInputs) -> Result<f64, ValidationError> {
    let mut issues = Vec::new();

    let age = required(inputs.age, "age", &mut issues);
    let is_male = inputs.is_male;
    if is_male.is_none() {
        issues.push(ValidationIssue::MissingSex);
    }
    let egfr = required(inputs.egfr, "eGFR", &mut issues);
    let uacr = required(inputs.uacr, "uACR", &mut issues);
    let is_north_american = inputs.is_north_american;
    if is_north_american.is_none() {
        issues.push(ValidationIssue::MissingRegion);
    }
    let horizon = Horizon::try_from(inputs.years)
        .map_err(|issue| issues.push(issue))
        .ok();
    let diabetes = indicator(inputs.diabetes, "diabetes", &mut issues);
    let hypertension = indicator(inputs.hypertension, "hypertension", &mut issues);

    let (Some(is_male), Some(is_north_american), Some(horizon)) =
        (is_male, is_north_american, horizon)
    else {
        return Err(ValidationError::from_issues(issues));
    };
    ValidationError::check(issues)?;

    let patient = PatientCovariates {
        age,
        sex: if is_male { 1.0 } else { 0.0 },
        egfr,
        uacr,
        extra: infer_extra(inputs, diabetes, hypertension),
    };
    debug!(
        "Scoring one patient with the {} model over {horizon}.",
        patient.variant()
    );

    Ok(risk_probability(
        &patient,
        Region::from_flag(is_north_american),
        horizon,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelVariant;
    use approx::assert_abs_diff_eq;

    fn published_patient() -> PatientInputs {
        PatientInputs {
            age: Some(57.28),
            is_male: Some(false),
            egfr: Some(15.0),
            uacr: Some(1762.00184),
            is_north_american: Some(false),
            ..PatientInputs::default()
        }
    }

    #[test]
    fn defaults_to_two_years() {
        assert_eq!(PatientInputs::default().years, 2);
    }

    #[test]
    fn published_example_two_and_five_year() {
        let two = kfre_person(&published_patient()).unwrap();
        assert_abs_diff_eq!(two, 0.4466170330988224, epsilon = 1e-12);

        let five = kfre_person(&PatientInputs {
            years: 5,
            ..published_patient()
        })
        .unwrap();
        assert_abs_diff_eq!(five, 0.8988555353304475, epsilon = 1e-12);
    }

    #[test]
    fn all_problems_are_reported_together() {
        let err = kfre_person(&PatientInputs {
            years: 3,
            diabetes: Some(FlagValue::Number(2.0)),
            ..PatientInputs::default()
        })
        .unwrap_err();

        let issues = err.issues();
        assert!(issues.contains(&ValidationIssue::MissingValue("age")));
        assert!(issues.contains(&ValidationIssue::MissingSex));
        assert!(issues.contains(&ValidationIssue::MissingValue("eGFR")));
        assert!(issues.contains(&ValidationIssue::MissingValue("uACR")));
        assert!(issues.contains(&ValidationIssue::MissingRegion));
        assert!(issues.contains(&ValidationIssue::InvalidHorizon(3)));
        assert!(issues.contains(&ValidationIssue::InvalidIndicator {
            field: "diabetes",
            value: "2".to_string(),
        }));
        assert_eq!(issues.len(), 7);
    }

    #[test]
    fn nan_counts_as_missing() {
        let err = kfre_person(&PatientInputs {
            age: Some(f64::NAN),
            ..published_patient()
        })
        .unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::MissingValue("age")]);
    }

    #[test]
    fn comorbidities_select_six_variable_model() {
        let inputs = PatientInputs {
            age: Some(55.0),
            is_male: Some(true),
            egfr: Some(45.0),
            uacr: Some(120.0),
            is_north_american: Some(true),
            years: 5,
            diabetes: Some(FlagValue::Bool(true)),
            hypertension: Some(FlagValue::Number(1.0)),
            ..PatientInputs::default()
        };
        assert_abs_diff_eq!(
            kfre_person(&inputs).unwrap(),
            0.03688339303541699,
            epsilon = 1e-12
        );
    }

    #[test]
    fn serum_markers_take_precedence_over_comorbidities() {
        let eight = PatientInputs {
            age: Some(72.0),
            is_male: Some(false),
            egfr: Some(28.0),
            uacr: Some(800.0),
            is_north_american: Some(true),
            albumin: Some(3.4),
            phosphorous: Some(4.6),
            bicarbonate: Some(22.0),
            calcium: Some(9.8),
            ..PatientInputs::default()
        };
        let with_comorbidities = PatientInputs {
            diabetes: Some(FlagValue::from(0)),
            hypertension: Some(FlagValue::from(1)),
            ..eight.clone()
        };

        let expected = 0.11930161043670862;
        assert_abs_diff_eq!(kfre_person(&eight).unwrap(), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(
            kfre_person(&with_comorbidities).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn partial_optional_groups_fall_back_to_four_variables() {
        let base = PatientInputs {
            age: Some(55.0),
            is_male: Some(true),
            egfr: Some(45.0),
            uacr: Some(120.0),
            is_north_american: Some(true),
            ..PatientInputs::default()
        };
        let partial = PatientInputs {
            diabetes: Some(FlagValue::Bool(true)),
            albumin: Some(4.2),
            calcium: Some(9.1),
            ..base.clone()
        };

        assert_eq!(
            infer_extra(&partial, Some(1.0), None),
            ExtraCovariates::None
        );
        let four = kfre_person(&base).unwrap();
        assert_abs_diff_eq!(four, 0.012470734327208355, epsilon = 1e-12);
        assert_eq!(kfre_person(&partial).unwrap(), four);

        let covariates = PatientCovariates {
            age: 55.0,
            sex: 1.0,
            egfr: 45.0,
            uacr: 120.0,
            extra: infer_extra(&partial, Some(1.0), None),
        };
        assert_eq!(covariates.variant(), ModelVariant::FourVariable);
    }

    #[test]
    fn non_positive_uacr_is_floored_not_rejected() {
        let inputs = PatientInputs {
            age: Some(50.0),
            is_male: Some(true),
            egfr: Some(60.0),
            uacr: Some(0.0),
            is_north_american: Some(true),
            ..PatientInputs::default()
        };
        let risk = kfre_person(&inputs).unwrap();
        assert!(risk.is_finite());
        assert_abs_diff_eq!(risk, 5.989384737059567e-07, epsilon = 1e-15);
    }
}
