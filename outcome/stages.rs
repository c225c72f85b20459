use std::fmt;

use polars::prelude::{DataFrame, NamedFrom, Series};

use super::OutcomeError;
use crate::shared::files::numeric_column;

/// eGFR-based CKD stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CkdStage {
    Stage1,
    Stage2,
    Stage3a,
    Stage3b,
    Stage4,
    Stage5,
    /// eGFR missing.
    NotClassified,
}

impl CkdStage {
    pub fn from_egfr(egfr: f64) -> Self {
        if egfr.is_nan() {
            CkdStage::NotClassified
        } else if egfr >= 90.0 {
            CkdStage::Stage1
        } else if egfr >= 60.0 {
            CkdStage::Stage2
        } else if egfr >= 45.0 {
            CkdStage::Stage3a
        } else if egfr >= 30.0 {
            CkdStage::Stage3b
        } else if egfr >= 15.0 {
            CkdStage::Stage4
        } else {
            CkdStage::Stage5
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CkdStage::Stage1 => "CKD Stage 1",
            CkdStage::Stage2 => "CKD Stage 2",
            CkdStage::Stage3a => "CKD Stage 3a",
            CkdStage::Stage3b => "CKD Stage 3b",
            CkdStage::Stage4 => "CKD Stage 4",
            CkdStage::Stage5 => "CKD Stage 5",
            CkdStage::NotClassified => NOT_CLASSIFIED,
        }
    }
}

impl fmt::Display for CkdStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const NOT_CLASSIFIED: &str = "Not Classified";

/// Stages 3 to 5 collapsed into one label; everything else, missing eGFR included, is unclassified.
pub fn combined_stage_label(egfr: f64) -> &'static str {
    if egfr < 60.0 {
        "CKD Stage 3 - 5"
    } else {
        NOT_CLASSIFIED
    }
}

/// Adds a fine stage column, a combined stage column, or both. With neither
/// requested the table is left alone and `egfr_col` is not read.
pub fn classify_ckd_stage(
    df: &mut DataFrame,
    egfr_col: &str,
    stage_col: Option<&str>,
    combined_stage_col: Option<&str>,
) -> Result<(), OutcomeError> {
    if stage_col.is_none() && combined_stage_col.is_none() {
        return Ok(());
    }
    let egfr = numeric_column(df, egfr_col)?;

    if let Some(name) = stage_col {
        let stages: Vec<&str> = egfr
            .iter()
            .map(|&value| CkdStage::from_egfr(value).label())
            .collect();
        df.with_column(Series::new(name.into(), stages))?;
    }
    if let Some(name) = combined_stage_col {
        let combined: Vec<&str> = egfr.iter().map(|&value| combined_stage_label(value)).collect();
        df.with_column(Series::new(name.into(), combined))?;
    }
    Ok(())
}
