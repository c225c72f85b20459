#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use kfre::convert::{ConversionRequest, UacrColumns, add_uacr_column, perform_conversions};
use kfre::evaluate::eval_kfre_metrics;
use kfre::outcome::{OutcomeRequest, classify_ckd_stage, label_outcome};
use kfre::shared::files::{read_table, write_table};
use kfre::{
    FlagValue, Horizon, PatientInputs, RiskRunConfig, add_kfre_risk_cols, kfre_person,
};
use polars::prelude::DataFrame;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Clone, Copy, ValueEnum)]
enum SexCli {
    Male,
    Female,
}

#[derive(Clone, Copy, ValueEnum)]
enum RegionCli {
    NorthAmerican,
    Other,
}

#[derive(Args)]
struct PersonArgs {
    /// Age in years
    #[arg(long)]
    age: Option<f64>,

    #[arg(long, value_enum)]
    sex: Option<SexCli>,

    /// eGFR in mL/min/1.73 m^2
    #[arg(long)]
    egfr: Option<f64>,

    /// Urine albumin-creatinine ratio in mg/g
    #[arg(long)]
    uacr: Option<f64>,

    /// Cohort region; selects the baseline survival constants
    #[arg(long, value_enum)]
    region: Option<RegionCli>,

    /// Risk horizon in years (2 or 5)
    #[arg(long, default_value = "2")]
    years: u32,

    /// Diabetes status (0 or 1)
    #[arg(long)]
    diabetes: Option<f64>,

    /// Hypertension status (0 or 1)
    #[arg(long)]
    hypertension: Option<f64>,

    /// Serum albumin in g/dL
    #[arg(long)]
    albumin: Option<f64>,

    /// Serum phosphorous in mg/dL
    #[arg(long)]
    phosphorous: Option<f64>,

    /// Serum bicarbonate in mEq/L
    #[arg(long)]
    bicarbonate: Option<f64>,

    /// Serum calcium in mg/dL
    #[arg(long)]
    calcium: Option<f64>,
}

#[derive(Args)]
struct TableArgs {
    /// Input table (.csv is comma separated, anything else tab separated)
    #[arg(value_name = "TABLE")]
    table: PathBuf,

    /// Output table; defaults to a tagged file next to the input
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "kfre",
    about = "Kidney Failure Risk Equation toolkit",
    long_about = "Computes 2- and 5-year kidney failure risk for single patients or whole \
                 tables, prepares lab units and outcome labels, and validates risk columns \
                 against observed outcomes."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Risk for one patient, printed as a percentage
    Person(PersonArgs),

    /// Add risk columns to a table using a TOML run configuration
    Risk {
        #[command(flatten)]
        table: TableArgs,

        /// Run configuration (.toml) holding the column mapping and options
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Add unit-converted copies of lab columns
    Convert {
        #[command(flatten)]
        table: TableArgs,

        /// Divide instead of multiply
        #[arg(long)]
        reverse: bool,

        /// Detect uPCR, calcium, phosphate and albumin columns by name
        #[arg(long)]
        all: bool,

        #[arg(long)]
        upcr_col: Option<String>,

        #[arg(long)]
        calcium_col: Option<String>,

        #[arg(long)]
        phosphate_col: Option<String>,

        #[arg(long)]
        albumin_col: Option<String>,
    },

    /// Estimate uACR from uPCR, sex, diabetes and hypertension
    Uacr {
        #[command(flatten)]
        table: TableArgs,

        #[arg(long)]
        sex_col: String,

        #[arg(long)]
        dm_col: String,

        #[arg(long)]
        htn_col: String,

        #[arg(long)]
        upcr_col: String,

        /// Value of the sex column that marks a female patient
        #[arg(long, default_value = "Female")]
        female_label: String,

        /// Name of the column to write
        #[arg(long, default_value = "uACR")]
        output_col: String,
    },

    /// Label whether the event happened within a horizon
    Outcome {
        #[command(flatten)]
        table: TableArgs,

        #[arg(long)]
        event_col: String,

        #[arg(long)]
        duration_col: String,

        /// Horizon in years (2 or 5)
        #[arg(long)]
        years: u32,

        /// The duration column is in days; convert it to years first
        #[arg(long)]
        days: bool,

        #[arg(long)]
        prefix: Option<String>,
    },

    /// Classify CKD stages from eGFR
    Stages {
        #[command(flatten)]
        table: TableArgs,

        #[arg(long, default_value = "eGFR")]
        egfr_col: String,

        #[arg(long)]
        stage_col: Option<String>,

        #[arg(long)]
        combined_col: Option<String>,
    },

    /// Print validation metrics for risk columns against outcome labels
    Evaluate {
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Variant sizes to evaluate, comma separated
        #[arg(long, value_delimiter = ',', default_value = "4")]
        num_vars: Vec<u32>,

        /// Horizons to evaluate, comma separated
        #[arg(long, value_delimiter = ',', default_value = "2,5")]
        years: Vec<u32>,

        #[arg(long, default_value = "6")]
        decimal_places: u32,

        /// Also write the metric table here
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Person(args)) => run_person(args),
        Some(Commands::Risk { table, config }) => run_risk(table, config),
        Some(Commands::Convert {
            table,
            reverse,
            all,
            upcr_col,
            calcium_col,
            phosphate_col,
            albumin_col,
        }) => run_convert(
            table,
            ConversionRequest {
                reverse,
                convert_all: all,
                upcr: upcr_col,
                calcium: calcium_col,
                phosphate: phosphate_col,
                albumin: albumin_col,
            },
        ),
        Some(Commands::Uacr {
            table,
            sex_col,
            dm_col,
            htn_col,
            upcr_col,
            female_label,
            output_col,
        }) => run_uacr(
            table,
            UacrColumns {
                sex: sex_col,
                diabetes: dm_col,
                hypertension: htn_col,
                upcr: upcr_col,
                female_label,
            },
            output_col,
        ),
        Some(Commands::Outcome {
            table,
            event_col,
            duration_col,
            years,
            days,
            prefix,
        }) => run_outcome(table, event_col, duration_col, years, days, prefix),
        Some(Commands::Stages {
            table,
            egfr_col,
            stage_col,
            combined_col,
        }) => run_stages(table, egfr_col, stage_col, combined_col),
        Some(Commands::Evaluate {
            table,
            num_vars,
            years,
            decimal_places,
            output,
        }) => run_evaluate(table, num_vars, years, decimal_places, output),
        Some(Commands::Version) => {
            println!("kfre {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// `cohort.tsv` with tag `kfre` becomes `cohort.kfre.tsv` in the same directory.
fn default_output(input: &Path, tag: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    input.with_file_name(format!("{stem}.{tag}.tsv"))
}

fn write_result(mut df: DataFrame, table: &TableArgs, tag: &str) -> CliResult {
    let path = table
        .output
        .clone()
        .unwrap_or_else(|| default_output(&table.table, tag));
    write_table(&mut df, &path)?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn run_person(args: PersonArgs) -> CliResult {
    let inputs = PatientInputs {
        age: args.age,
        is_male: args.sex.map(|sex| matches!(sex, SexCli::Male)),
        egfr: args.egfr,
        uacr: args.uacr,
        is_north_american: args
            .region
            .map(|region| matches!(region, RegionCli::NorthAmerican)),
        years: args.years,
        diabetes: args.diabetes.map(FlagValue::from),
        hypertension: args.hypertension.map(FlagValue::from),
        albumin: args.albumin,
        phosphorous: args.phosphorous,
        bicarbonate: args.bicarbonate,
        calcium: args.calcium,
    };
    let risk = kfre_person(&inputs)?;
    println!(
        "{}-year risk of kidney failure: {:.2}%",
        args.years,
        risk * 100.0
    );
    Ok(())
}

fn run_risk(table: TableArgs, config: PathBuf) -> CliResult {
    let config = RiskRunConfig::load(&config)?;
    let mut df = read_table(&table.table)?;
    let written = add_kfre_risk_cols(&mut df, &config.to_request())?;
    info!("Added {} risk columns: {}", written.len(), written.join(", "));
    write_result(df, &table, "kfre")
}

fn run_convert(table: TableArgs, request: ConversionRequest) -> CliResult {
    let mut df = read_table(&table.table)?;
    let report = perform_conversions(&mut df, &request)?;
    if report.converted.is_empty() {
        return Err("no columns were converted".into());
    }
    write_result(df, &table, "converted")
}

fn run_uacr(table: TableArgs, columns: UacrColumns, output_col: String) -> CliResult {
    let mut df = read_table(&table.table)?;
    add_uacr_column(&mut df, &columns, &output_col)?;
    write_result(df, &table, "uacr")
}

fn run_outcome(
    table: TableArgs,
    event_col: String,
    duration_col: String,
    years: u32,
    days: bool,
    prefix: Option<String>,
) -> CliResult {
    let request = OutcomeRequest {
        event_column: event_col,
        horizon: Horizon::try_from(years)?,
        duration_column: duration_col,
        derive_duration_in_years: days,
        prefix,
    };
    let mut df = read_table(&table.table)?;
    label_outcome(&mut df, &request)?;
    write_result(df, &table, "outcome")
}

fn run_stages(
    table: TableArgs,
    egfr_col: String,
    stage_col: Option<String>,
    combined_col: Option<String>,
) -> CliResult {
    if stage_col.is_none() && combined_col.is_none() {
        return Err("pass --stage-col, --combined-col, or both".into());
    }
    let mut df = read_table(&table.table)?;
    classify_ckd_stage(
        &mut df,
        &egfr_col,
        stage_col.as_deref(),
        combined_col.as_deref(),
    )?;
    write_result(df, &table, "stages")
}

fn run_evaluate(
    table: PathBuf,
    num_vars: Vec<u32>,
    years: Vec<u32>,
    decimal_places: u32,
    output: Option<PathBuf>,
) -> CliResult {
    let df = read_table(&table)?;
    let mut metrics = eval_kfre_metrics(&df, &num_vars, &years, decimal_places)?;
    println!("{metrics}");
    if let Some(path) = output {
        write_table(&mut metrics, &path)?;
        info!("Wrote metric table to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/data/cohort.csv"), "kfre"),
            PathBuf::from("/data/cohort.kfre.tsv")
        );
        assert_eq!(
            default_output(Path::new("labs.tsv"), "converted"),
            PathBuf::from("labs.converted.tsv")
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn evaluate_lists_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "kfre",
            "evaluate",
            "scored.tsv",
            "--num-vars",
            "4,6",
            "--years",
            "5",
        ])
        .unwrap();
        let Some(Commands::Evaluate { num_vars, years, .. }) = cli.command else {
            panic!("expected the evaluate command");
        };
        assert_eq!(num_vars, vec![4, 6]);
        assert_eq!(years, vec![5]);
    }
}
