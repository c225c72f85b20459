#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod coefficients;
pub mod config;
pub mod equation;
pub mod naming;
pub mod person;
pub mod predictor;
pub mod types;
pub mod validation;
#[path = "../shared/files.rs"]
pub mod shared_files;
pub mod shared {
    pub use super::shared_files as files;
}

#[path = "../convert/mod.rs"]
pub mod convert;

#[path = "../outcome/mod.rs"]
pub mod outcome;

#[path = "../evaluate/mod.rs"]
pub mod evaluate;

pub use person::{PatientInputs, kfre_person};
pub use predictor::{
    ColumnMap, Covariate, KfreError, RiskColumnRequest, RiskPredictor, add_kfre_risk_cols, predict_kfre,
    with_kfre_risk_cols,
};
pub use config::{ConfigError, RiskRunConfig};
pub use types::{FlagValue, Horizon, ModelVariant, Region};
pub use validation::{ValidationError, ValidationIssue};
