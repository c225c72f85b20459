//! Composite input validation.
//!
//! Input mistakes are never reported one at a time. Every entry point gathers
//! all the problems it can see into a `Vec<ValidationIssue>` and only then
//! fails, so a caller fixing their inputs sees the full list in one pass.

use itertools::Itertools;
use thiserror::Error;

/// A single input problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Must supply a value for {0}.")]
    MissingValue(&'static str),
    #[error("Must specify sex using true or false for is_male.")]
    MissingSex,
    #[error("Must specify true or false for is_north_american.")]
    MissingRegion,
    #[error("Value must be 2 or 5 for 2-year risk or 5-year risk (got {0}).")]
    InvalidHorizon(u32),
    #[error("The {field} parameter must be either 0, 1, true, or false (got {value}).")]
    InvalidIndicator { field: &'static str, value: String },
    #[error("Unsupported number of variables {0}. Valid options are 4, 6, or 8.")]
    UnsupportedVariableCount(u32),
    #[error("{fields} needed to complete calculation for {num_vars}var model")]
    MissingColumnMapping { num_vars: u32, fields: String },
    #[error("Column '{column}' mapped for {field} was not found in the table.")]
    ColumnAbsent { field: &'static str, column: String },
    #[error("Column '{0}' already exists and does not hold risk probabilities; choose another prefix.")]
    OutputColumnTaken(String),
}

/// Every problem found in one call, displayed one per line.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", .issues.iter().join("\n"))]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Succeeds when `issues` is empty, otherwise wraps all of them.
    pub fn check(issues: Vec<ValidationIssue>) -> Result<(), ValidationError> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub(crate) fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        ValidationError { issues }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl From<ValidationIssue> for ValidationError {
    fn from(issue: ValidationIssue) -> Self {
        ValidationError {
            issues: vec![issue],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_issue_list_passes() {
        assert!(ValidationError::check(Vec::new()).is_ok());
    }

    #[test]
    fn every_issue_is_rendered_on_its_own_line() {
        let err = ValidationError::check(vec![
            ValidationIssue::MissingValue("age"),
            ValidationIssue::InvalidHorizon(3),
            ValidationIssue::MissingRegion,
        ])
        .unwrap_err();

        assert_eq!(err.issues().len(), 3);
        let message = err.to_string();
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Must supply a value for age.",
                "Value must be 2 or 5 for 2-year risk or 5-year risk (got 3).",
                "Must specify true or false for is_north_american.",
            ]
        );
    }

    #[test]
    fn missing_mapping_message_names_the_model() {
        let issue = ValidationIssue::MissingColumnMapping {
            num_vars: 6,
            fields: "dm, htn".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "dm, htn needed to complete calculation for 6var model"
        );
    }
}
