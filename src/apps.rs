use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::comparator::compare_descriptors;
use crate::config::{PipelineConfig, RecordPolicy};
use crate::constants::columns::LOG_POTENCY;
use crate::descriptors::{
    CommandDescriptorEngine, DescriptorEngine, DescriptorMatrix, PrecomputedDescriptors, join,
};
use crate::labeler::two_class;
use crate::metrics::regression_scores;
use crate::pipeline::Pipeline;
use crate::source::CsvDumpSource;
use crate::splits::SplitRatios;
use crate::transport::fs::{
    comparison_path, read_descriptor_table, read_labeled, read_prediction_pairs, write_comparison,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Skip,
    Fail,
}

impl From<PolicyArg> for RecordPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Skip => RecordPolicy::Skip,
            PolicyArg::Fail => RecordPolicy::Fail,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "curate",
    disable_help_subcommand = true,
    about = "Curate bioactivity data into a model-ready dataset",
    long_about = "Clean, canonicalize, and label a bioactivity dump, join externally computed descriptors, compare active and inactive compounds, and write a filtered train/test split.",
    after_help = "Flags override values loaded from --config. Exactly one of --descriptors or --descriptor-command is required."
)]
struct CurateCli {
    #[arg(long, value_name = "PATH", help = "JSON pipeline configuration")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Bioactivity dump (CSV with header)")]
    dump: PathBuf,
    #[arg(long, value_name = "ID", help = "Keep only rows for this target")]
    target_id: Option<String>,
    #[arg(long, value_name = "NAME", help = "Prefix for checkpoint file names")]
    target_name: Option<String>,
    #[arg(long, value_name = "TYPE", help = "Measurement type to keep, e.g. IC50")]
    standard_type: Option<String>,
    #[arg(long, value_name = "DIR", help = "Directory for checkpoints and the report")]
    output_dir: Option<PathBuf>,
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "descriptor_command",
        help = "Precomputed descriptor table keyed by Name or compound_id"
    )]
    descriptors: Option<PathBuf>,
    #[arg(long, value_name = "PROGRAM", help = "External descriptor program")]
    descriptor_command: Option<PathBuf>,
    #[arg(
        long = "descriptor-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = "Argument for the descriptor program; {input} and {output} are substituted"
    )]
    descriptor_args: Vec<String>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Descriptor program output table, relative to the output directory"
    )]
    descriptor_output: Option<PathBuf>,
    #[arg(
        long = "split-ratios",
        value_name = "TRAIN,TEST",
        value_parser = parse_split_ratios_arg,
        help = "Comma-separated split ratios that must sum to 1.0"
    )]
    split: Option<SplitRatios>,
    #[arg(long, help = "Seed for the train/test shuffle")]
    seed: Option<u64>,
    #[arg(long, help = "Descriptor columns with lower variance are removed")]
    variance_threshold: Option<f64>,
    #[arg(long, help = "Significance level for class comparisons")]
    alpha: Option<f64>,
    #[arg(long, value_enum, help = "Handling of records with missing fields")]
    missing_data: Option<PolicyArg>,
    #[arg(long, value_enum, help = "Handling of zero or negative potency values")]
    invalid_potency: Option<PolicyArg>,
    #[arg(long = "compare", value_name = "NAME", help = "Column to compare, repeat as needed")]
    comparisons: Vec<String>,
    #[arg(long, help = "Write only the model-ready tables and the report")]
    no_checkpoints: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "compare_classes",
    disable_help_subcommand = true,
    about = "Mann-Whitney U comparison of active and inactive compounds",
    long_about = "Read a labeled table, keep active and inactive rows, and test whether pIC50 and optional descriptor columns differ between the two classes."
)]
struct CompareClassesCli {
    #[arg(long, value_name = "PATH", help = "Labeled table with class and pIC50 columns")]
    labeled: PathBuf,
    #[arg(long, value_name = "PATH", help = "Descriptor table to join on compound id")]
    descriptors: Option<PathBuf>,
    #[arg(long = "descriptor", value_name = "NAME", help = "Column to compare, repeat as needed")]
    names: Vec<String>,
    #[arg(long, default_value_t = crate::constants::comparator::DEFAULT_ALPHA)]
    alpha: f64,
    #[arg(long, value_name = "DIR", help = "Write one summary table per column here")]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(
    name = "evaluate_predictions",
    disable_help_subcommand = true,
    about = "Score externally produced pIC50 predictions",
    long_about = "Read an observed,predicted table written by an external trainer and report R^2, RMSE, MAE and MSE."
)]
struct EvaluatePredictionsCli {
    #[arg(long, value_name = "PATH", help = "CSV with observed and predicted columns")]
    predictions: PathBuf,
    #[arg(long, help = "Print scores as JSON")]
    json: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Run the `curate` binary: full pipeline from a bioactivity dump.
pub fn run_curate<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();
    let Some(cli) = parse_cli::<CurateCli, _>(std::iter::once("curate".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(target_id) = cli.target_id {
        config.query.target_id = Some(target_id);
    }
    if let Some(standard_type) = cli.standard_type {
        config.query.standard_type = standard_type;
    }
    if let Some(target_name) = cli.target_name {
        config.target_name = target_name;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(split) = cli.split {
        config.split = split;
    }
    config.seed = cli.seed.unwrap_or(config.seed);
    config.variance_threshold = cli.variance_threshold.unwrap_or(config.variance_threshold);
    config.alpha = cli.alpha.unwrap_or(config.alpha);
    if let Some(policy) = cli.missing_data {
        config.missing_data = policy.into();
    }
    if let Some(policy) = cli.invalid_potency {
        config.invalid_potency = policy.into();
    }
    if !cli.comparisons.is_empty() {
        config.comparison_descriptors = cli.comparisons;
    }
    if cli.no_checkpoints {
        config.write_checkpoints = false;
    }

    let engine: Box<dyn DescriptorEngine> = match (cli.descriptors, cli.descriptor_command) {
        (Some(path), None) => Box::new(PrecomputedDescriptors::new(path)),
        (None, Some(program)) => {
            let mut engine = CommandDescriptorEngine::new(program, config.output_dir.clone())
                .with_args(cli.descriptor_args);
            if let Some(output) = cli.descriptor_output {
                engine = engine.with_output_file(output);
            }
            Box::new(engine)
        }
        _ => return Err("exactly one of --descriptors or --descriptor-command is required".into()),
    };

    let pipeline = Pipeline::new(config)?;
    let source = CsvDumpSource::new(cli.dump);
    let report = pipeline.run(&source, engine.as_ref())?;

    let counts = report.counts;
    println!("=== curation summary: {} ===", report.target_name);
    println!("fetched        : {}", counts.fetched);
    println!(
        "cleaned        : {} (missing={}, duplicates={})",
        counts.cleaned,
        report.dropped_missing.len(),
        report.dropped_duplicates
    );
    println!("labeled        : {} (2-class: {})", counts.labeled, counts.two_class);
    if let Some(balance) = &report.class_balance {
        for share in &balance.per_class {
            println!(
                "  {:<12} {:>6} ({:.1}%)",
                share.class,
                share.count,
                share.share * 100.0
            );
        }
    }
    if let Some(summary) = &report.log_potency_summary {
        println!(
            "{LOG_POTENCY:<15}: mean={:.3} std={:.3} min={:.3} median={:.3} max={:.3}",
            summary.mean, summary.std, summary.min, summary.median, summary.max
        );
    }
    println!(
        "descriptors    : {} kept, {} removed by variance filter",
        counts.features_kept,
        report.removed_columns.len()
    );
    println!("split          : train={} test={}", counts.train, counts.test);
    println!(
        "comparisons    : {} written, {} skipped",
        report.comparisons.len(),
        report.skipped_comparisons.len()
    );
    for summary in report.comparisons.iter().take(10) {
        println!(
            "  {:<20} U={:<10} p={:.4e}  {}",
            summary.descriptor, summary.statistic, summary.p_value, summary.interpretation
        );
    }
    if let Some(path) = report.outputs.last() {
        println!("report         : {}", path.display());
    }
    Ok(())
}

/// Run the `compare_classes` binary over a labeled table.
pub fn run_compare_classes<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();
    let Some(cli) = parse_cli::<CompareClassesCli, _>(
        std::iter::once("compare_classes".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let labeled = two_class(&read_labeled(&cli.labeled)?);
    let matrix = match &cli.descriptors {
        Some(path) => join(&labeled, &read_descriptor_table(path)?)?,
        None => DescriptorMatrix::labels_only(&labeled),
    };
    let names = if cli.names.is_empty() {
        vec![LOG_POTENCY.to_string()]
    } else {
        cli.names
    };

    println!("{:<20} {:>12} {:>12}  Interpretation", "Descriptor", "Statistics", "p");
    for (descriptor, result) in compare_descriptors(&matrix, &names, cli.alpha) {
        match result {
            Ok(summary) => {
                println!(
                    "{:<20} {:>12} {:>12.4e}  {}",
                    summary.descriptor, summary.statistic, summary.p_value, summary.interpretation
                );
                if let Some(dir) = &cli.output_dir {
                    write_comparison(&comparison_path(dir, &descriptor), &summary)?;
                }
            }
            Err(err) => println!("{descriptor:<20} skipped: {err}"),
        }
    }
    Ok(())
}

/// Run the `evaluate_predictions` binary over `observed,predicted` pairs.
pub fn run_evaluate_predictions<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();
    let Some(cli) = parse_cli::<EvaluatePredictionsCli, _>(
        std::iter::once("evaluate_predictions".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let (observed, predicted) = read_prediction_pairs(&cli.predictions)?;
    let scores = regression_scores(&observed, &predicted)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        println!("rows : {}", observed.len());
        println!("r2   : {:.4}", scores.r2);
        println!("rmse : {:.4}", scores.rmse);
        println!("mae  : {:.4}", scores.mae);
        println!("mse  : {:.4}", scores.mse);
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_split_ratios_arg(raw: &str) -> Result<SplitRatios, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err("--split-ratios expects exactly 2 comma-separated values".to_string());
    }
    let train = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid train ratio '{}': must be a float", parts[0].trim()))?;
    let test = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid test ratio '{}': must be a float", parts[1].trim()))?;
    SplitRatios { train, test }
        .normalized()
        .map_err(|err| format!("{err} (train={train}, test={test})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ratio_arg_requires_two_values_summing_to_one() {
        let ratios = parse_split_ratios_arg("0.75, 0.25").unwrap();
        assert_eq!(ratios, SplitRatios { train: 0.75, test: 0.25 });
        assert!(parse_split_ratios_arg("0.8,0.1,0.1").unwrap_err().contains("exactly 2"));
        assert!(parse_split_ratios_arg("0.5,0.2").unwrap_err().contains("sum to 1.0"));
        assert!(parse_split_ratios_arg("x,0.2").unwrap_err().contains("invalid train"));
    }

    #[test]
    fn help_is_not_an_error() {
        let parsed = parse_cli::<EvaluatePredictionsCli, _>(["evaluate_predictions", "--help"]);
        assert!(matches!(parsed, Ok(None)));
    }

    #[test]
    fn curate_cli_rejects_both_descriptor_sources() {
        let parsed = parse_cli::<CurateCli, _>([
            "curate",
            "--dump",
            "dump.csv",
            "--descriptors",
            "d.csv",
            "--descriptor-command",
            "padel.sh",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn curate_cli_collects_repeated_flags() {
        let cli = parse_cli::<CurateCli, _>([
            "curate",
            "--dump",
            "dump.csv",
            "--descriptor-command",
            "padel.sh",
            "--descriptor-arg",
            "-dir",
            "--descriptor-arg",
            "{input}",
            "--compare",
            "pIC50",
            "--missing-data",
            "fail",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(cli.descriptor_args, vec!["-dir", "{input}"]);
        assert_eq!(cli.comparisons, vec!["pIC50"]);
        assert!(matches!(cli.missing_data, Some(PolicyArg::Fail)));
    }

    #[test]
    fn evaluate_predictions_runs_on_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pred.csv");
        std::fs::write(&path, "observed,predicted\n5.0,5.1\n6.0,5.9\n7.0,7.2\n").unwrap();
        run_evaluate_predictions(
            ["--predictions".to_string(), path.display().to_string()].into_iter(),
        )
        .unwrap();
    }
}
