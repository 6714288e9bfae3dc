//! Offline CSV analysis tool.
//!
//! This binary loads a delimited file, runs the analyses of the
//! `tabsurveyor-core` engine and writes reports, exports and JSON results.
//!
//! # Guarantees
//! - No network access; every input and output is a local file or stdout
//! - Cell values are never logged
//! - Failed analyses are reported as warnings next to the other results

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabsurveyor_core::{
    AnalysisSession, AnalysisWarning, AppConfig, DatasetCache, FilterSpec, StatisticsResult,
    export::{ExportFormat, ExportKind, export, export_file_name, to_csv_bytes},
    logging::init_logging,
    quality::deduplicate,
    report::{ReportBuilder, render_html, render_markdown, to_data_uri},
    samples::{SAMPLE_SEED, SampleKind, generate_with_seed},
    stats::{
        CorrelationMethod, DEFAULT_Z_THRESHOLD, OutlierMethod, correlate, describe,
        detect_outliers, frequency_table, normality_test, strong_pairs, t_test,
    },
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "tabsurveyor")]
#[command(about = "Offline CSV analysis and report generator")]
#[command(version)]
#[command(long_about = "
TabSurveyor - Offline CSV analysis

Loads a delimited file (UTF-8, Shift_JIS or EUC-JP) and produces:
- Self-contained HTML or Markdown analysis reports
- Filtered exports as CSV, xlsx or JSON
- Descriptive statistics, correlations, t-tests, normality tests,
  outlier detection and frequency tables as JSON
- Data quality audits (missing values, duplicate rows)

ENVIRONMENT:
  APP_NAME, APP_VERSION, DEBUG, MAX_UPLOAD_SIZE_MB, ALLOWED_FILE_TYPES

EXAMPLES:
  tabsurveyor report sales.csv -o report.html
  tabsurveyor export sales.csv --format xlsx --range price:10:100
  tabsurveyor analyze sales.csv --correlation spearman --t-test price:region
  tabsurveyor quality sales.csv --write-unique
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate an analysis report
    Report(ReportArgs),
    /// Export a filtered view of a file
    Export(ExportArgs),
    /// Run statistical analyses and print JSON results
    Analyze(AnalyzeArgs),
    /// Audit missing values and duplicate rows
    Quality(QualityArgs),
    /// Generate a sample dataset
    Sample(SampleArgs),
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Report output formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Self-contained HTML page
    Html,
    /// Markdown document
    Markdown,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Input file
    pub input: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "html")]
    pub format: ReportFormat,

    /// Report title
    #[arg(long)]
    pub title: Option<String>,

    /// Print the HTML report as a data: URI
    #[arg(long)]
    pub data_uri: bool,
}

/// Filter flags shared by the export and analyze commands.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Keep only the first N rows
    #[arg(long)]
    pub rows: Option<usize>,

    /// Keep only these columns
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Numeric range filter (COLUMN:MIN:MAX)
    #[arg(long)]
    pub range: Option<String>,

    /// Category filter (COLUMN:value1,value2)
    #[arg(long)]
    pub category: Option<String>,
}

impl FilterArgs {
    /// Builds the filter spec these flags describe.
    fn to_spec(&self) -> anyhow::Result<FilterSpec> {
        let mut spec = FilterSpec::new();
        if let Some(raw) = &self.range {
            let (column, min, max) = parse_range(raw)?;
            spec = spec.with_range(column, min, max)?;
        }
        if let Some(raw) = &self.category {
            let (column, values) = parse_category(raw)?;
            spec = spec.with_membership(column, values)?;
        }
        if !self.columns.is_empty() {
            spec = spec.with_projection(self.columns.iter().map(String::as_str))?;
        }
        if let Some(n) = self.rows {
            spec = spec.with_row_limit(n)?;
        }
        Ok(spec)
    }
}

#[derive(Args)]
pub struct ExportArgs {
    /// Input file
    pub input: PathBuf,

    /// Output format (csv, xlsx, json)
    #[arg(long, default_value = "csv")]
    pub format: ExportFormat,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Drop duplicate rows before exporting
    #[arg(long)]
    pub dedupe: bool,

    /// Output file path (derived from the input name when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Outlier rules
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutlierRule {
    /// Interquartile range rule
    Iqr,
    /// Z-score rule
    Zscore,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input file
    pub input: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Include descriptive statistics
    #[arg(long)]
    pub describe: bool,

    /// Correlation method (pearson, spearman, kendall)
    #[arg(long)]
    pub correlation: Option<CorrelationMethod>,

    /// Minimum |r| for a strong correlation pair
    #[arg(long, default_value_t = 0.7)]
    pub threshold: f64,

    /// Two-sample t-test (NUMERIC:GROUP)
    #[arg(long)]
    pub t_test: Option<String>,

    /// Shapiro-Wilk normality test on a column
    #[arg(long)]
    pub normality: Option<String>,

    /// Outlier detection on a column
    #[arg(long)]
    pub outliers: Option<String>,

    /// Outlier rule
    #[arg(long, value_enum, default_value = "iqr")]
    pub method: OutlierRule,

    /// Z-score threshold
    #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
    pub z_threshold: f64,

    /// Write the rows without outliers as CSV
    #[arg(long)]
    pub write_clean: bool,

    /// Frequency table of a column
    #[arg(long)]
    pub frequency: Option<String>,

    /// Number of frequency table entries
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Args)]
pub struct QualityArgs {
    /// Input file
    pub input: PathBuf,

    /// Write the file without duplicate rows as CSV
    #[arg(long)]
    pub write_unique: bool,
}

#[derive(Args)]
pub struct SampleArgs {
    /// Sample kind (sales, customers, stock-prices, survey)
    pub kind: SampleKind,

    /// Random seed
    #[arg(long, default_value_t = SAMPLE_SEED)]
    pub seed: u64,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    init_logging(cli.global.verbose, cli.global.quiet, config.debug)?;
    debug!("{} v{}", config.app_name, config.app_version);

    let cache = DatasetCache::new();
    match &cli.command {
        Command::Report(args) => run_report(args, &config, &cache),
        Command::Export(args) => run_export(args, &config, &cache),
        Command::Analyze(args) => run_analyze(args, &config, &cache),
        Command::Quality(args) => run_quality(args, &config, &cache),
        Command::Sample(args) => run_sample(args),
    }
}

/// Reads a file and opens an analysis session over it.
fn open_session(
    path: &Path,
    config: &AppConfig,
    cache: &DatasetCache,
) -> anyhow::Result<AnalysisSession> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = file_name(path);
    AnalysisSession::open(cache, config, &bytes, &filename)
        .with_context(|| format!("Failed to load {}", filename))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn run_report(args: &ReportArgs, config: &AppConfig, cache: &DatasetCache) -> anyhow::Result<()> {
    let session = open_session(&args.input, config, cache)?;

    let mut builder = ReportBuilder::new(session.table(), &session.dataset().filename);
    if let Some(title) = &args.title {
        builder = builder.with_title(title);
    }
    let document = builder.build();

    let rendered = match args.format {
        ReportFormat::Html => {
            let html = render_html(&document)?;
            if args.data_uri { to_data_uri(&html) } else { html }
        }
        ReportFormat::Markdown => {
            if args.data_uri {
                bail!("--data-uri is only available for HTML reports");
            }
            render_markdown(&document)
        }
    };

    match &args.output {
        Some(path) => write_output(path, rendered.as_bytes()),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn run_export(args: &ExportArgs, config: &AppConfig, cache: &DatasetCache) -> anyhow::Result<()> {
    let session = open_session(&args.input, config, cache)?;
    let view = session.view(&args.filter.to_spec()?)?;

    let (table, kind) = if args.dedupe {
        (deduplicate(&view.table), ExportKind::Unique)
    } else {
        (view.table, ExportKind::Filtered)
    };
    let bytes = export(&table, session.table(), args.format)?;

    let path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(export_file_name(kind, &session.dataset().filename, args.format))
    });
    write_output(&path, &bytes)?;
    println!("{}", path.display());
    Ok(())
}

/// One analysis result labelled with the analysis that produced it.
#[derive(Serialize)]
struct NamedResult {
    operation: &'static str,
    result: StatisticsResult,
}

#[derive(Serialize)]
struct AnalysisOutput<'a> {
    file: &'a str,
    encoding: &'a str,
    rows: usize,
    columns: usize,
    results: Vec<NamedResult>,
    warnings: &'a [AnalysisWarning],
}

fn run_analyze(args: &AnalyzeArgs, config: &AppConfig, cache: &DatasetCache) -> anyhow::Result<()> {
    let mut session = open_session(&args.input, config, cache)?;
    let view = session.view(&args.filter.to_spec()?)?;
    let table = &view.table;
    let mut results = Vec::new();

    if args.describe {
        results.push(NamedResult {
            operation: "describe",
            result: StatisticsResult::DescriptiveSummary(describe(table)),
        });
    }

    if let Some(method) = args.correlation {
        let matrix = correlate(table, method);
        let pairs = strong_pairs(&matrix, args.threshold);
        results.push(NamedResult {
            operation: "correlation",
            result: StatisticsResult::CorrelationMatrix {
                matrix,
                strong_pairs: pairs,
            },
        });
    }

    if let Some(raw) = &args.t_test {
        let (value, group) = parse_pair(raw)?;
        if let Some(result) = session.run("t-test", || t_test(table, value, group))? {
            results.push(NamedResult {
                operation: "t-test",
                result: StatisticsResult::HypothesisTest(result),
            });
        }
    }

    if let Some(column) = &args.normality
        && let Some(outcome) = session.run("normality", || normality_test(table, column))?
    {
        results.push(NamedResult {
            operation: "normality",
            result: StatisticsResult::Normality(outcome),
        });
    }

    if let Some(column) = &args.outliers {
        let method = match args.method {
            OutlierRule::Iqr => OutlierMethod::Iqr,
            OutlierRule::Zscore => OutlierMethod::ZScore {
                threshold: args.z_threshold,
            },
        };
        if let Some(outliers) = session.run("outliers", || detect_outliers(table, column, method))? {
            if args.write_clean {
                let path = export_file_name(
                    ExportKind::Clean,
                    &session.dataset().filename,
                    ExportFormat::Csv,
                );
                write_output(Path::new(&path), &to_csv_bytes(&outliers.clean)?)?;
            }
            results.push(NamedResult {
                operation: "outliers",
                result: StatisticsResult::OutlierSet(outliers),
            });
        }
    }

    if let Some(column) = &args.frequency
        && let Some(frequencies) =
            session.run("frequency", || frequency_table(table, column, args.top))?
    {
        results.push(NamedResult {
            operation: "frequency",
            result: StatisticsResult::FrequencyTable(frequencies),
        });
    }

    let dataset = session.dataset();
    let output = AnalysisOutput {
        file: &dataset.filename,
        encoding: dataset.encoding,
        rows: table.row_count(),
        columns: table.column_count(),
        results,
        warnings: session.warnings(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_quality(args: &QualityArgs, config: &AppConfig, cache: &DatasetCache) -> anyhow::Result<()> {
    let session = open_session(&args.input, config, cache)?;
    let report = session.audit();

    if args.write_unique {
        let unique = deduplicate(session.table());
        let path = export_file_name(
            ExportKind::Unique,
            &session.dataset().filename,
            ExportFormat::Csv,
        );
        write_output(Path::new(&path), &to_csv_bytes(&unique)?)?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_sample(args: &SampleArgs) -> anyhow::Result<()> {
    let table = generate_with_seed(args.kind, args.seed)?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.kind.file_name()));
    write_output(&path, &to_csv_bytes(&table)?)?;
    println!("{}", path.display());
    Ok(())
}

/// Parses `COLUMN:MIN:MAX`; the column name may itself contain colons.
fn parse_range(raw: &str) -> anyhow::Result<(&str, f64, f64)> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(max), Some(min), Some(column)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("range filter must look like COLUMN:MIN:MAX, got '{}'", raw);
    };
    let min: f64 = min
        .trim()
        .parse()
        .with_context(|| format!("invalid range minimum '{}'", min))?;
    let max: f64 = max
        .trim()
        .parse()
        .with_context(|| format!("invalid range maximum '{}'", max))?;
    if min > max {
        bail!("range minimum {} is greater than maximum {}", min, max);
    }
    Ok((column, min, max))
}

/// Parses `COLUMN:value1,value2`.
fn parse_category(raw: &str) -> anyhow::Result<(&str, Vec<&str>)> {
    let Some((column, values)) = raw.split_once(':') else {
        bail!("category filter must look like COLUMN:value1,value2, got '{}'", raw);
    };
    let values = if values.is_empty() {
        Vec::new()
    } else {
        values.split(',').collect()
    };
    Ok((column, values))
}

/// Parses `FIRST:SECOND`.
fn parse_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((first, second)) if !first.is_empty() && !second.is_empty() => Ok((first, second)),
        _ => bail!("expected NUMERIC:GROUP, got '{}'", raw),
    }
}
