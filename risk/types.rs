use std::fmt;

use crate::validation::ValidationIssue;

/// Projection window of the risk equation. Only the two published horizons exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Horizon {
    TwoYear,
    FiveYear,
}

impl Horizon {
    pub const ALL: [Horizon; 2] = [Horizon::TwoYear, Horizon::FiveYear];

    pub fn years(self) -> u32 {
        match self {
            Horizon::TwoYear => 2,
            Horizon::FiveYear => 5,
        }
    }

    pub fn from_years(years: u32) -> Option<Self> {
        match years {
            2 => Some(Horizon::TwoYear),
            5 => Some(Horizon::FiveYear),
            _ => None,
        }
    }
}

impl TryFrom<u32> for Horizon {
    type Error = ValidationIssue;

    fn try_from(years: u32) -> Result<Self, Self::Error> {
        Horizon::from_years(years).ok_or(ValidationIssue::InvalidHorizon(years))
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-year", self.years())
    }
}

/// Cohort region. Selects which column of baseline survival constants applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    NorthAmerican,
    NonNorthAmerican,
}

impl Region {
    pub fn from_flag(is_north_american: bool) -> Self {
        if is_north_american {
            Region::NorthAmerican
        } else {
            Region::NonNorthAmerican
        }
    }
}

/// One of the three published covariate sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelVariant {
    /// Age, sex, eGFR, uACR.
    FourVariable,
    /// The four base covariates plus diabetes and hypertension.
    SixVariable,
    /// The four base covariates plus serum albumin, phosphorous, bicarbonate and calcium.
    EightVariable,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [
        ModelVariant::FourVariable,
        ModelVariant::SixVariable,
        ModelVariant::EightVariable,
    ];

    pub fn num_vars(self) -> u32 {
        match self {
            ModelVariant::FourVariable => 4,
            ModelVariant::SixVariable => 6,
            ModelVariant::EightVariable => 8,
        }
    }

    pub fn from_num_vars(num_vars: u32) -> Option<Self> {
        match num_vars {
            4 => Some(ModelVariant::FourVariable),
            6 => Some(ModelVariant::SixVariable),
            8 => Some(ModelVariant::EightVariable),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ModelVariant {
    type Error = ValidationIssue;

    fn try_from(num_vars: u32) -> Result<Self, Self::Error> {
        ModelVariant::from_num_vars(num_vars)
            .ok_or(ValidationIssue::UnsupportedVariableCount(num_vars))
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-variable", self.num_vars())
    }
}

/// A boolean-like clinical indicator as supplied by a caller.
///
/// Callers hand over diabetes and hypertension status either as booleans or as
/// numbers; only `0`, `1`, `true` and `false` are meaningful to the equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
}

impl FlagValue {
    /// The 0/1 value entering the score, or `None` when the value is not boolean-like.
    pub fn as_indicator(self) -> Option<f64> {
        match self {
            FlagValue::Bool(true) => Some(1.0),
            FlagValue::Bool(false) => Some(0.0),
            FlagValue::Number(v) if v == 0.0 || v == 1.0 => Some(v),
            FlagValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Number(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Number(value)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        FlagValue::Number(f64::from(value))
    }
}
