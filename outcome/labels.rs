use log::info;
use ndarray::Zip;
use polars::prelude::{DataFrame, NamedFrom, Series};

use super::OutcomeError;
use crate::naming::{DURATION_YEARS_COLUMN, outcome_column_name};
use crate::shared::files::{float_series, numeric_column};
use crate::types::Horizon;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// How to derive a 0/1 outcome column for one horizon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRequest {
    /// Event flag column; the event counts when its value equals 1.
    pub event_column: String,
    pub horizon: Horizon,
    /// Follow-up column, in days when `derive_duration_in_years` is set and
    /// in years otherwise.
    pub duration_column: String,
    /// Divide the duration by 365.25 into `ESRD_duration_years` and label from that.
    pub derive_duration_in_years: bool,
    pub prefix: Option<String>,
}

/// Writes an `Int32` outcome column: 1 when the event happened within the
/// horizon, 0 otherwise (including rows with a missing event or duration).
/// Returns the name of the column written. A previous column of the same
/// name is replaced.
pub fn label_outcome(df: &mut DataFrame, request: &OutcomeRequest) -> Result<String, OutcomeError> {
    let events = numeric_column(df, &request.event_column)?;
    let mut duration = numeric_column(df, &request.duration_column)?;
    if request.derive_duration_in_years {
        duration.mapv_inplace(|days| days / DAYS_PER_YEAR);
        df.with_column(float_series(DURATION_YEARS_COLUMN, &duration))?;
    }

    let horizon = f64::from(request.horizon.years());
    let labels = Zip::from(&events)
        .and(&duration)
        .map_collect(|&event, &years| i32::from(event == 1.0 && years <= horizon));

    let name = outcome_column_name(request.horizon, request.prefix.as_deref());
    let positives = labels.iter().filter(|&&label| label == 1).count();
    df.with_column(Series::new(name.as_str().into(), labels.to_vec()))?;
    info!(
        "Labelled {positives} of {} rows positive in '{name}'.",
        labels.len()
    );
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::files::TableError;
    use approx::assert_abs_diff_eq;
    use polars::prelude::DataType;

    fn cohort() -> DataFrame {
        DataFrame::new(vec![
            Series::new("ESRD".into(), vec![Some(1i32), Some(1), Some(0), None, Some(1)]).into(),
            Series::new(
                "days".into(),
                vec![Some(700.0), Some(1500.0), Some(100.0), Some(10.0), None],
            )
            .into(),
        ])
        .expect("construct cohort")
    }

    fn labels(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
        df.column(name)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn request(horizon: Horizon) -> OutcomeRequest {
        OutcomeRequest {
            event_column: "ESRD".into(),
            horizon,
            duration_column: "days".into(),
            derive_duration_in_years: true,
            prefix: None,
        }
    }

    #[test]
    fn labels_events_within_horizon() {
        let mut df = cohort();
        let two = label_outcome(&mut df, &request(Horizon::TwoYear)).unwrap();
        let five = label_outcome(&mut df, &request(Horizon::FiveYear)).unwrap();
        assert_eq!(two, "2_year_outcome");
        assert_eq!(five, "5_year_outcome");
        assert_eq!(
            labels(&df, &two),
            vec![Some(1), Some(0), Some(0), Some(0), Some(0)]
        );
        assert_eq!(
            labels(&df, &five),
            vec![Some(1), Some(1), Some(0), Some(0), Some(0)]
        );
        assert_eq!(df.column(&two).unwrap().dtype(), &DataType::Int32);

        let years = numeric_column(&df, DURATION_YEARS_COLUMN).unwrap();
        assert_abs_diff_eq!(years[0], 700.0 / 365.25, epsilon = 1e-12);
        assert!(years[4].is_nan());
    }

    #[test]
    fn durations_already_in_years_are_used_directly() {
        let mut df = DataFrame::new(vec![
            Series::new("event".into(), vec![true, true, false]).into(),
            Series::new("follow_up".into(), vec![2.0, 2.5, 1.0]).into(),
        ])
        .unwrap();
        let name = label_outcome(
            &mut df,
            &OutcomeRequest {
                event_column: "event".into(),
                horizon: Horizon::TwoYear,
                duration_column: "follow_up".into(),
                derive_duration_in_years: false,
                prefix: Some("ESRD".into()),
            },
        )
        .unwrap();
        assert_eq!(name, "ESRD_2_year_outcome");
        assert_eq!(labels(&df, &name), vec![Some(1), Some(0), Some(0)]);
        assert!(df.column(DURATION_YEARS_COLUMN).is_err());
    }

    #[test]
    fn relabelling_replaces_the_column() {
        let mut df = cohort();
        label_outcome(&mut df, &request(Horizon::TwoYear)).unwrap();
        let width = df.width();
        label_outcome(&mut df, &request(Horizon::TwoYear)).unwrap();
        assert_eq!(df.width(), width);
    }

    #[test]
    fn absent_event_column_fails_without_writing() {
        let mut df = cohort();
        let err = label_outcome(
            &mut df,
            &OutcomeRequest {
                event_column: "dialysis".into(),
                ..request(Horizon::TwoYear)
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OutcomeError::Table(TableError::ColumnNotFound(_))
        ));
        assert!(df.equals_missing(&cohort()));
    }
}
