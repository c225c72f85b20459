use log::{debug, info, warn};
use polars::prelude::DataFrame;

use super::ConversionError;
use crate::naming::converted_column_name;
use crate::shared::files::{find_column_containing, float_series, numeric_column};

/// A lab quantity with a fixed multiplicative unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Upcr,
    Calcium,
    Phosphate,
    Albumin,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [
        Quantity::Upcr,
        Quantity::Calcium,
        Quantity::Phosphate,
        Quantity::Albumin,
    ];

    /// Display name; also the prefix of the output column and the needle for auto-detection.
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Upcr => "uPCR",
            Quantity::Calcium => "Calcium",
            Quantity::Phosphate => "Phosphate",
            Quantity::Albumin => "Albumin",
        }
    }

    /// Forward conversion multiplies by this factor; reverse divides.
    pub fn factor(self) -> f64 {
        match self {
            Quantity::Upcr => 1.0 / 0.11312,
            Quantity::Calcium => 4.0,
            Quantity::Phosphate => 3.1,
            Quantity::Albumin => 1.0 / 10.0,
        }
    }

    pub fn target_suffix(self, reverse: bool) -> &'static str {
        match (self, reverse) {
            (Quantity::Upcr, false) => "mg_g",
            (Quantity::Calcium | Quantity::Phosphate, false) => "mg_dl",
            (Quantity::Albumin, false) => "g_dl",
            (Quantity::Albumin, true) => "g_L",
            (_, true) => "mmol_L",
        }
    }

    #[inline]
    pub fn convert(self, value: f64, reverse: bool) -> f64 {
        if reverse {
            value / self.factor()
        } else {
            value * self.factor()
        }
    }
}

/// Which columns to convert. With `convert_all` the explicit names are
/// ignored and each quantity's source is the first column whose name
/// contains the quantity name, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRequest {
    pub reverse: bool,
    pub convert_all: bool,
    pub upcr: Option<String>,
    pub calcium: Option<String>,
    pub phosphate: Option<String>,
    pub albumin: Option<String>,
}

impl ConversionRequest {
    fn explicit_source(&self, quantity: Quantity) -> Option<&str> {
        match quantity {
            Quantity::Upcr => self.upcr.as_deref(),
            Quantity::Calcium => self.calcium.as_deref(),
            Quantity::Phosphate => self.phosphate.as_deref(),
            Quantity::Albumin => self.albumin.as_deref(),
        }
        .filter(|name| !name.is_empty())
    }
}

/// One column written by [`perform_conversions`].
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub quantity: Quantity,
    pub source: String,
    pub output: String,
    pub factor: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub converted: Vec<Conversion>,
    /// Quantities that were asked for but had no matching column, or whose
    /// source column already carries the output name.
    pub skipped: Vec<(Quantity, Option<String>)>,
}

/// Adds `{Quantity}_{suffix}` columns for each requested quantity.
///
/// A requested column missing from the table is skipped with a warning and
/// listed in the report rather than failing the call. So is a source column
/// whose name equals its output name; source columns are never overwritten.
pub fn perform_conversions(
    df: &mut DataFrame,
    request: &ConversionRequest,
) -> Result<ConversionReport, ConversionError> {
    let mut report = ConversionReport::default();

    for quantity in Quantity::ALL {
        let source = if request.convert_all {
            find_column_containing(df, quantity.name())
        } else {
            match request.explicit_source(quantity) {
                Some(name) => Some(name.to_string()),
                None => {
                    debug!("No {} column requested.", quantity.name());
                    continue;
                }
            }
        };

        let Some(source) = source.filter(|name| df.column(name).is_ok()) else {
            let requested = if request.convert_all {
                None
            } else {
                request.explicit_source(quantity).map(str::to_string)
            };
            warn!(
                "Column '{}' not found in table. No conversion performed for {}.",
                requested.as_deref().unwrap_or("<auto-detect>"),
                quantity.name()
            );
            report.skipped.push((quantity, requested));
            continue;
        };

        let output = converted_column_name(quantity, request.reverse);
        if output == source {
            warn!(
                "Column '{source}' already has the output name. No conversion performed for {}.",
                quantity.name()
            );
            report.skipped.push((quantity, Some(source)));
            continue;
        }

        let values = numeric_column(df, &source)?
            .mapv_into(|value| quantity.convert(value, request.reverse));
        df.with_column(float_series(&output, &values))?;
        info!(
            "Converted '{source}' to column '{output}' with factor {}",
            quantity.factor()
        );
        report.converted.push(Conversion {
            quantity,
            source,
            output,
            factor: quantity.factor(),
        });
    }

    Ok(report)
}
