//! # Published KFRE Constants
//!
//! Literal coefficients, centring constants and baseline survival values of the
//! Kidney Failure Risk Equation, as published in:
//!
//! - Tangri N, Stevens LA, Griffith J, et al. "A predictive model for progression
//!   of chronic kidney disease to kidney failure." JAMA 305(15):1553-1559 (2011).
//! - Tangri N, Grams ME, Levey AS, et al. "Multinational assessment of accuracy of
//!   equations for predicting risk of kidney failure: a meta-analysis." JAMA
//!   315(2):164-174 (2016).
//!
//! Nothing here is tunable. Every number must match the publication exactly.

use crate::types::{Horizon, ModelVariant, Region};

/// Age enters the score in decades.
pub const AGE_SCALE: f64 = 10.0;
/// eGFR enters the score in units of 5 mL/min/1.73 m^2.
pub const EGFR_SCALE: f64 = 5.0;
/// uACR is floored here before its logarithm is taken.
pub const UACR_FLOOR: f64 = 1e-6;

/// A `coefficient * (value - center)` term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredTerm {
    pub coefficient: f64,
    pub center: f64,
}

impl CenteredTerm {
    const fn new(coefficient: f64, center: f64) -> Self {
        Self {
            coefficient,
            center,
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.coefficient * (value - self.center)
    }
}

/// The four covariates shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseTerms {
    pub age: CenteredTerm,
    pub sex: CenteredTerm,
    pub egfr: CenteredTerm,
    pub log_uacr: CenteredTerm,
}

/// Terms of the 6-variable model beyond the base four.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComorbidityTerms {
    pub diabetes: CenteredTerm,
    pub hypertension: CenteredTerm,
}

/// Terms of the 8-variable model beyond the base four.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerumMarkerTerms {
    pub albumin: CenteredTerm,
    pub phosphorous: CenteredTerm,
    pub bicarbonate: CenteredTerm,
    pub calcium: CenteredTerm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtraTerms {
    None,
    Comorbidity(ComorbidityTerms),
    SerumMarkers(SerumMarkerTerms),
}

/// Baseline survival (`alpha`) per region and horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineSurvival {
    pub north_american_two_year: f64,
    pub north_american_five_year: f64,
    pub other_two_year: f64,
    pub other_five_year: f64,
}

impl BaselineSurvival {
    pub fn alpha(&self, region: Region, horizon: Horizon) -> f64 {
        match (region, horizon) {
            (Region::NorthAmerican, Horizon::TwoYear) => self.north_american_two_year,
            (Region::NorthAmerican, Horizon::FiveYear) => self.north_american_five_year,
            (Region::NonNorthAmerican, Horizon::TwoYear) => self.other_two_year,
            (Region::NonNorthAmerican, Horizon::FiveYear) => self.other_five_year,
        }
    }
}

/// Everything one variant needs to turn covariates into a probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantCoefficients {
    pub base: BaseTerms,
    pub extra: ExtraTerms,
    pub baseline: BaselineSurvival,
}

const AGE_CENTER: f64 = 7.036;
const SEX_CENTER: f64 = 0.5642;
const EGFR_CENTER: f64 = 7.222;
const LOG_UACR_CENTER: f64 = 5.137;

const fn base_terms(age: f64, sex: f64, egfr: f64, log_uacr: f64) -> BaseTerms {
    BaseTerms {
        age: CenteredTerm::new(age, AGE_CENTER),
        sex: CenteredTerm::new(sex, SEX_CENTER),
        egfr: CenteredTerm::new(egfr, EGFR_CENTER),
        log_uacr: CenteredTerm::new(log_uacr, LOG_UACR_CENTER),
    }
}

pub const FOUR_VARIABLE: VariantCoefficients = VariantCoefficients {
    base: base_terms(-0.2201, 0.2467, -0.5567, 0.4510),
    extra: ExtraTerms::None,
    baseline: BaselineSurvival {
        north_american_two_year: 0.9750,
        north_american_five_year: 0.9240,
        other_two_year: 0.9832,
        other_five_year: 0.9365,
    },
};

pub const SIX_VARIABLE: VariantCoefficients = VariantCoefficients {
    base: base_terms(-0.2218, 0.2553, -0.5541, 0.4562),
    extra: ExtraTerms::Comorbidity(ComorbidityTerms {
        diabetes: CenteredTerm::new(-0.1475, 0.5106),
        hypertension: CenteredTerm::new(0.1426, 0.8501),
    }),
    baseline: BaselineSurvival {
        north_american_two_year: 0.9750,
        north_american_five_year: 0.9240,
        other_two_year: 0.9830,
        other_five_year: 0.9370,
    },
};

pub const EIGHT_VARIABLE: VariantCoefficients = VariantCoefficients {
    base: base_terms(-0.1992, 0.1602, -0.4919, 0.3364),
    extra: ExtraTerms::SerumMarkers(SerumMarkerTerms {
        albumin: CenteredTerm::new(-0.3441, 3.997),
        phosphorous: CenteredTerm::new(0.2604, 3.916),
        bicarbonate: CenteredTerm::new(-0.07354, 25.57),
        calcium: CenteredTerm::new(-0.2228, 9.355),
    }),
    baseline: BaselineSurvival {
        north_american_two_year: 0.9780,
        north_american_five_year: 0.9301,
        other_two_year: 0.9827,
        other_five_year: 0.9245,
    },
};

impl ModelVariant {
    pub fn coefficients(self) -> &'static VariantCoefficients {
        match self {
            ModelVariant::FourVariable => &FOUR_VARIABLE,
            ModelVariant::SixVariable => &SIX_VARIABLE,
            ModelVariant::EightVariable => &EIGHT_VARIABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_variant_owns_its_extra_terms() {
        assert!(matches!(
            ModelVariant::FourVariable.coefficients().extra,
            ExtraTerms::None
        ));
        assert!(matches!(
            ModelVariant::SixVariable.coefficients().extra,
            ExtraTerms::Comorbidity(_)
        ));
        assert!(matches!(
            ModelVariant::EightVariable.coefficients().extra,
            ExtraTerms::SerumMarkers(_)
        ));
    }

    #[test]
    fn alpha_table_matches_publication() {
        let cases = [
            (ModelVariant::FourVariable, [0.9750, 0.9240, 0.9832, 0.9365]),
            (ModelVariant::SixVariable, [0.9750, 0.9240, 0.9830, 0.9370]),
            (ModelVariant::EightVariable, [0.9780, 0.9301, 0.9827, 0.9245]),
        ];
        for (variant, expected) in cases {
            let baseline = variant.coefficients().baseline;
            let observed = [
                baseline.alpha(Region::NorthAmerican, Horizon::TwoYear),
                baseline.alpha(Region::NorthAmerican, Horizon::FiveYear),
                baseline.alpha(Region::NonNorthAmerican, Horizon::TwoYear),
                baseline.alpha(Region::NonNorthAmerican, Horizon::FiveYear),
            ];
            assert_eq!(observed, expected, "alpha mismatch for {variant}");
        }
    }

    #[test]
    fn base_centres_are_shared() {
        for variant in ModelVariant::ALL {
            let base = variant.coefficients().base;
            assert_eq!(base.age.center, 7.036);
            assert_eq!(base.sex.center, 0.5642);
            assert_eq!(base.egfr.center, 7.222);
            assert_eq!(base.log_uacr.center, 5.137);
        }
    }

    #[test]
    fn centered_term_applies_offset_then_coefficient() {
        let term = CenteredTerm::new(-0.5, 2.0);
        assert_eq!(term.apply(4.0), -1.0);
        assert_eq!(term.apply(2.0), 0.0);
    }
}
