//! Every column name this crate writes or looks up comes from here.

use crate::convert::Quantity;
use crate::types::{Horizon, ModelVariant};

/// Prefix of risk columns when the caller supplies none.
pub const DEFAULT_RISK_PREFIX: &str = "kfre";

/// Follow-up column derived from a duration in days.
pub const DURATION_YEARS_COLUMN: &str = "ESRD_duration_years";

/// Label column of the metric table.
pub const METRICS_COLUMN: &str = "Metrics";

/// `kfre_4var_2year`, or `{prefix}_4var_2year`.
pub fn risk_column_name(variant: ModelVariant, horizon: Horizon, prefix: Option<&str>) -> String {
    format!(
        "{}_{}var_{}year",
        prefix.unwrap_or(DEFAULT_RISK_PREFIX),
        variant.num_vars(),
        horizon.years()
    )
}

/// Suffix shared by every outcome column of one horizon.
pub fn outcome_column_suffix(horizon: Horizon) -> String {
    format!("{}_year_outcome", horizon.years())
}

/// `2_year_outcome`, or `{prefix}_2_year_outcome`.
pub fn outcome_column_name(horizon: Horizon, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{}", outcome_column_suffix(horizon)),
        None => outcome_column_suffix(horizon),
    }
}

/// Column label in the metric table, e.g. `2_year_4_var_kfre`.
pub fn metric_outcome_label(horizon: Horizon, variant: ModelVariant) -> String {
    format!("{}_year_{}_var_kfre", horizon.years(), variant.num_vars())
}

/// `uPCR_mg_g`, `Calcium_mmol_L`, and so on.
pub fn converted_column_name(quantity: Quantity, reverse: bool) -> String {
    format!("{}_{}", quantity.name(), quantity.target_suffix(reverse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_names_cover_every_combination() {
        for variant in ModelVariant::ALL {
            for horizon in Horizon::ALL {
                let n = variant.num_vars();
                let h = horizon.years();
                assert_eq!(
                    risk_column_name(variant, horizon, None),
                    format!("kfre_{n}var_{h}year")
                );
                assert_eq!(
                    risk_column_name(variant, horizon, Some("site")),
                    format!("site_{n}var_{h}year")
                );
            }
        }
        assert_eq!(
            risk_column_name(ModelVariant::FourVariable, Horizon::TwoYear, None),
            "kfre_4var_2year"
        );
    }

    #[test]
    fn outcome_names() {
        assert_eq!(outcome_column_name(Horizon::TwoYear, None), "2_year_outcome");
        assert_eq!(outcome_column_name(Horizon::FiveYear, None), "5_year_outcome");
        assert_eq!(
            outcome_column_name(Horizon::TwoYear, Some("ESRD")),
            "ESRD_2_year_outcome"
        );
        assert_eq!(
            outcome_column_name(Horizon::FiveYear, Some("ESRD")),
            "ESRD_5_year_outcome"
        );
        assert_eq!(DURATION_YEARS_COLUMN, "ESRD_duration_years");
    }

    #[test]
    fn metric_labels_cover_every_combination() {
        for variant in ModelVariant::ALL {
            for horizon in Horizon::ALL {
                assert_eq!(
                    metric_outcome_label(horizon, variant),
                    format!("{}_year_{}_var_kfre", horizon.years(), variant.num_vars())
                );
            }
        }
        assert_eq!(
            metric_outcome_label(Horizon::TwoYear, ModelVariant::FourVariable),
            "2_year_4_var_kfre"
        );
    }

    #[test]
    fn converted_names() {
        let expected = [
            (Quantity::Upcr, "uPCR_mg_g", "uPCR_mmol_L"),
            (Quantity::Calcium, "Calcium_mg_dl", "Calcium_mmol_L"),
            (Quantity::Phosphate, "Phosphate_mg_dl", "Phosphate_mmol_L"),
            (Quantity::Albumin, "Albumin_g_dl", "Albumin_g_L"),
        ];
        for (quantity, forward, reverse) in expected {
            assert_eq!(converted_column_name(quantity, false), forward);
            assert_eq!(converted_column_name(quantity, true), reverse);
        }
    }
}
