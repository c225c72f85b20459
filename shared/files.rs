//! Delimited-table I/O and typed column access over polars `DataFrame`s.
//!
//! `.csv` paths are comma separated; every other path is treated as
//! tab separated. A header row is always required.

use std::fs::File;
use std::path::Path;

use ndarray::Array1;
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("The required column '{0}' was not found in the table.")]
    ColumnNotFound(String),
    #[error(
        "Column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
}

fn separator_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => b',',
        _ => b'\t',
    }
}

pub fn read_table(path: impl AsRef<Path>) -> Result<DataFrame, TableError> {
    let path = path.as_ref();
    let separator = separator_for(path);
    let file = File::open(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|options| options.with_separator(separator))
        .into_reader_with_file_handle(file)
        .finish()?;
    log::debug!(
        "Read {} rows and {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), TableError> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator_for(path))
        .finish(df)?;
    Ok(())
}

pub fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, TableError> {
    df.column(name)
        .map_err(|_| TableError::ColumnNotFound(name.to_string()))
}

/// Reads a column as `f64`. Booleans become 0/1, integers are widened and
/// nulls become NaN. String columns are rejected.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Array1<f64>, TableError> {
    let column = column(df, name)?;
    let dtype = column.dtype().clone();
    let wrong_type = || TableError::ColumnWrongType {
        column_name: name.to_string(),
        expected_type: "numeric",
        found_type: dtype.to_string(),
    };
    if matches!(dtype, DataType::String) {
        return Err(wrong_type());
    }
    let casted = column.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    let values = casted.f64()?;
    Ok(values
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

/// Reads a string column. Any other dtype is rejected.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TableError> {
    let column = column(df, name)?;
    if !matches!(column.dtype(), DataType::String) {
        return Err(TableError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "string",
            found_type: column.dtype().to_string(),
        });
    }
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// A nullable `Float64` series; NaN entries are written as null.
pub fn float_series(name: &str, values: &Array1<f64>) -> Series {
    let values: Vec<Option<f64>> = values
        .iter()
        .map(|&value| if value.is_nan() { None } else { Some(value) })
        .collect();
    Series::new(name.into(), values)
}

/// First column, in table order, whose name contains `needle` ignoring case.
pub fn find_column_containing(df: &DataFrame, needle: &str) -> Option<String> {
    let needle = needle.to_lowercase();
    df.get_column_names()
        .into_iter()
        .find(|name| name.as_str().to_lowercase().contains(&needle))
        .map(|name| name.to_string())
}
