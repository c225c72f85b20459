//! # The Closed-Form Risk Equation
//!
//! `p = 1 - alpha ^ exp(score)`, where `score` is a sum of centred, scaled
//! covariate terms and `alpha` is the baseline survival for the region and
//! horizon.
//!
//! The scalar path (`risk_probability`) and the column path
//! (`risk_probabilities`) share the same per-row kernel functions and add the
//! terms in the same order, so a patient scored alone and the same patient
//! scored as a table row produce bit-identical probabilities.

use ndarray::{Array1, ArrayView1, Zip};

use crate::coefficients::{
    AGE_SCALE, BaseTerms, ComorbidityTerms, EGFR_SCALE, ExtraTerms, SerumMarkerTerms, UACR_FLOOR,
};
use crate::types::{Horizon, ModelVariant, Region};

/// Natural log of uACR after flooring at `UACR_FLOOR`. A missing (NaN) input stays NaN.
#[inline]
pub fn floored_log_uacr(uacr: f64) -> f64 {
    if uacr.is_nan() {
        return f64::NAN;
    }
    uacr.max(UACR_FLOOR).ln()
}

/// Maps a linear score to the probability of kidney failure within the horizon.
#[inline]
pub fn failure_probability(alpha: f64, score: f64) -> f64 {
    1.0 - alpha.powf(score.exp())
}

impl BaseTerms {
    /// Age in years, sex as 0/1 (1 = male), eGFR in clinical units, uACR in mg/g.
    #[inline]
    pub fn score(&self, age: f64, sex: f64, egfr: f64, uacr: f64) -> f64 {
        self.age.apply(age / AGE_SCALE)
            + self.sex.apply(sex)
            + self.egfr.apply(egfr / EGFR_SCALE)
            + self.log_uacr.apply(floored_log_uacr(uacr))
    }
}

impl ComorbidityTerms {
    #[inline]
    pub fn score(&self, diabetes: f64, hypertension: f64) -> f64 {
        self.diabetes.apply(diabetes) + self.hypertension.apply(hypertension)
    }
}

impl SerumMarkerTerms {
    #[inline]
    pub fn score(&self, albumin: f64, phosphorous: f64, bicarbonate: f64, calcium: f64) -> f64 {
        self.albumin.apply(albumin)
            + self.phosphorous.apply(phosphorous)
            + self.bicarbonate.apply(bicarbonate)
            + self.calcium.apply(calcium)
    }
}

/// Optional covariates of one patient. Which group is present decides the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtraCovariates {
    None,
    Comorbidity {
        diabetes: f64,
        hypertension: f64,
    },
    SerumMarkers {
        albumin: f64,
        phosphorous: f64,
        bicarbonate: f64,
        calcium: f64,
    },
}

/// Validated covariates of a single patient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientCovariates {
    pub age: f64,
    pub sex: f64,
    pub egfr: f64,
    pub uacr: f64,
    pub extra: ExtraCovariates,
}

impl PatientCovariates {
    pub fn variant(&self) -> ModelVariant {
        match self.extra {
            ExtraCovariates::None => ModelVariant::FourVariable,
            ExtraCovariates::Comorbidity { .. } => ModelVariant::SixVariable,
            ExtraCovariates::SerumMarkers { .. } => ModelVariant::EightVariable,
        }
    }
}

/// Optional covariate columns of a table.
#[derive(Debug, Clone)]
pub enum ExtraColumns<'a> {
    None,
    Comorbidity {
        diabetes: ArrayView1<'a, f64>,
        hypertension: ArrayView1<'a, f64>,
    },
    SerumMarkers {
        albumin: ArrayView1<'a, f64>,
        phosphorous: ArrayView1<'a, f64>,
        bicarbonate: ArrayView1<'a, f64>,
        calcium: ArrayView1<'a, f64>,
    },
}

/// Column views over a table, one entry per row. All views must share one length.
#[derive(Debug, Clone)]
pub struct CovariateColumns<'a> {
    pub age: ArrayView1<'a, f64>,
    pub sex: ArrayView1<'a, f64>,
    pub egfr: ArrayView1<'a, f64>,
    pub uacr: ArrayView1<'a, f64>,
    pub extra: ExtraColumns<'a>,
}

impl CovariateColumns<'_> {
    pub fn variant(&self) -> ModelVariant {
        match self.extra {
            ExtraColumns::None => ModelVariant::FourVariable,
            ExtraColumns::Comorbidity { .. } => ModelVariant::SixVariable,
            ExtraColumns::SerumMarkers { .. } => ModelVariant::EightVariable,
        }
    }
}

pub fn linear_score(patient: &PatientCovariates) -> f64 {
    let coefficients = patient.variant().coefficients();
    let base = coefficients
        .base
        .score(patient.age, patient.sex, patient.egfr, patient.uacr);

    match (coefficients.extra, patient.extra) {
        (
            ExtraTerms::Comorbidity(terms),
            ExtraCovariates::Comorbidity {
                diabetes,
                hypertension,
            },
        ) => base + terms.score(diabetes, hypertension),
        (
            ExtraTerms::SerumMarkers(terms),
            ExtraCovariates::SerumMarkers {
                albumin,
                phosphorous,
                bicarbonate,
                calcium,
            },
        ) => base + terms.score(albumin, phosphorous, bicarbonate, calcium),
        _ => base,
    }
}

pub fn linear_scores(columns: &CovariateColumns<'_>) -> Array1<f64> {
    let coefficients = columns.variant().coefficients();
    let base = coefficients.base;

    let mut scores = Zip::from(&columns.age)
        .and(&columns.sex)
        .and(&columns.egfr)
        .and(&columns.uacr)
        .map_collect(|&age, &sex, &egfr, &uacr| base.score(age, sex, egfr, uacr));

    match (coefficients.extra, &columns.extra) {
        (
            ExtraTerms::Comorbidity(terms),
            ExtraColumns::Comorbidity {
                diabetes,
                hypertension,
            },
        ) => {
            Zip::from(&mut scores)
                .and(diabetes)
                .and(hypertension)
                .for_each(|score, &dm, &htn| *score += terms.score(dm, htn));
        }
        (
            ExtraTerms::SerumMarkers(terms),
            ExtraColumns::SerumMarkers {
                albumin,
                phosphorous,
                bicarbonate,
                calcium,
            },
        ) => {
            Zip::from(&mut scores)
                .and(albumin)
                .and(phosphorous)
                .and(bicarbonate)
                .and(calcium)
                .for_each(|score, &alb, &phos, &bicarb, &ca| {
                    *score += terms.score(alb, phos, bicarb, ca)
                });
        }
        _ => {}
    }

    scores
}

/// Probability of kidney failure within `horizon` for one patient.
pub fn risk_probability(patient: &PatientCovariates, region: Region, horizon: Horizon) -> f64 {
    let alpha = patient
        .variant()
        .coefficients()
        .baseline
        .alpha(region, horizon);
    failure_probability(alpha, linear_score(patient))
}

/// Probability of kidney failure within `horizon` for every row. Rows with a
/// missing covariate come back as NaN.
pub fn risk_probabilities(
    columns: &CovariateColumns<'_>,
    region: Region,
    horizon: Horizon,
) -> Array1<f64> {
    let alpha = columns
        .variant()
        .coefficients()
        .baseline
        .alpha(region, horizon);
    linear_scores(columns).mapv_into(|score| failure_probability(alpha, score))
}
