//! Chart requests and the data prepared for an external renderer.
//!
//! The core never draws. A [`ChartRequest`] names the chart kind, the columns
//! it plots and display options; [`prepare`] validates it against a table and
//! returns exactly the data a [`ChartRenderer`] needs.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats::{FrequencyTable, frequency_table};
use crate::table::{Column, Table};
use crate::{Result, TabSurveyorError};

/// Largest number of rows drawn in a pair plot.
pub const PAIR_PLOT_MAX_ROWS: usize = 1000;

/// Seed of the pair plot row sample, fixed so repeated requests match.
pub const PAIR_PLOT_SEED: u64 = 42;

/// Supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    /// Bar chart of a numeric column per category
    Bar,
    /// Line chart of one or more numeric series
    Line,
    /// Scatter plot of two numeric columns
    Scatter,
    /// Histogram of one numeric column
    Histogram,
    /// Box plot of a numeric column, optionally per category
    Box,
    /// Pie chart of the most frequent values of a categorical column
    Pie,
    /// Stacked area chart of numeric series
    Area,
    /// Violin plot of a numeric column, optionally per category
    Violin,
    /// Scatter matrix of several numeric columns
    PairPlot,
}

impl ChartKind {
    /// Every chart kind in menu order.
    pub const ALL: [Self; 9] = [
        Self::Bar,
        Self::Line,
        Self::Scatter,
        Self::Histogram,
        Self::Box,
        Self::Pie,
        Self::Area,
        Self::Violin,
        Self::PairPlot,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
            Self::Box => "box",
            Self::Pie => "pie",
            Self::Area => "area",
            Self::Violin => "violin",
            Self::PairPlot => "pair-plot",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = TabSurveyorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| TabSurveyorError::configuration(format!("unknown chart kind '{}'", s)))
    }
}

/// Which individual points a box plot draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointDisplay {
    /// No points
    #[default]
    None,
    /// Every point
    All,
    /// Only points beyond the whiskers
    Outliers,
}

/// Normalization of histogram bar heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramNorm {
    /// Raw counts
    #[default]
    Count,
    /// Fraction of all values
    Probability,
    /// Probability density
    Density,
}

/// Display options passed through to the renderer.
///
/// None of these change the prepared data except `top_n`, which bounds the
/// pie chart's frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Chart title; the renderer picks one when unset
    pub title: Option<String>,
    /// Height in pixels (300-800)
    pub height: u32,
    /// Histogram bin count (10-100)
    pub bins: usize,
    /// Number of pie slices (3-20)
    pub top_n: usize,
    /// Draw bars horizontally
    pub horizontal: bool,
    /// Add a least-squares trend line to scatter plots
    pub trendline: bool,
    /// Histogram normalization
    pub histogram_norm: HistogramNorm,
    /// Draw notched boxes
    pub notched: bool,
    /// Points drawn on box plots
    pub show_points: PointDisplay,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            height: 500,
            bins: 30,
            top_n: 10,
            horizontal: false,
            trendline: false,
            histogram_norm: HistogramNorm::Count,
            notched: false,
            show_points: PointDisplay::None,
        }
    }
}

impl ChartOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder method to set the height.
    pub fn with_height(mut self, height: u32) -> Self {
        if !(300..=800).contains(&height) {
            tracing::warn!("chart height {} clamped to valid range [300, 800]", height);
        }
        self.height = height.clamp(300, 800);
        self
    }

    /// Builder method to set the histogram bin count.
    pub fn with_bins(mut self, bins: usize) -> Self {
        if !(10..=100).contains(&bins) {
            tracing::warn!("histogram bins {} clamped to valid range [10, 100]", bins);
        }
        self.bins = bins.clamp(10, 100);
        self
    }

    /// Builder method to set the number of pie slices.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        if !(3..=20).contains(&top_n) {
            tracing::warn!("pie top_n {} clamped to valid range [3, 20]", top_n);
        }
        self.top_n = top_n.clamp(3, 20);
        self
    }

    /// Builder method to set box plot display flags.
    pub fn with_box_style(mut self, notched: bool, show_points: PointDisplay) -> Self {
        self.notched = notched;
        self.show_points = show_points;
        self
    }
}

/// A chart to draw from a table.
///
/// `x` is the horizontal axis (or the only column, for histograms and pie
/// charts); `y` holds one or more plotted series (the dimensions, for pair
/// plots).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Chart kind
    pub kind: ChartKind,
    /// Horizontal axis or single column
    pub x: Option<String>,
    /// Plotted series
    pub y: Vec<String>,
    /// Categorical column used for color grouping
    pub color: Option<String>,
    /// Numeric column mapped to marker size (scatter plots)
    pub size: Option<String>,
    /// Display options
    pub options: ChartOptions,
}

impl ChartRequest {
    /// Creates an empty request of the given kind.
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            x: None,
            y: Vec::new(),
            color: None,
            size: None,
            options: ChartOptions::default(),
        }
    }

    /// Builder method to set the x column.
    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    /// Builder method to set the plotted series.
    pub fn with_y<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.y = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the color grouping column.
    pub fn with_color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    /// Builder method to set the marker size column.
    pub fn with_size(mut self, column: impl Into<String>) -> Self {
        self.size = Some(column.into());
        self
    }

    /// Builder method to set display options.
    pub fn with_options(mut self, options: ChartOptions) -> Self {
        self.options = options;
        self
    }

    /// Every column the request references, without repeats.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        let candidates = self
            .x
            .iter()
            .chain(&self.y)
            .chain(&self.color)
            .chain(&self.size);
        for name in candidates {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
        columns
    }

    /// Checks the request against a table.
    ///
    /// Referenced columns must exist and have the kind the chart needs.
    /// An empty required selection fails with `EmptySelection`.
    pub fn validate(&self, table: &Table) -> Result<()> {
        for name in self.referenced_columns() {
            table.column(name)?;
        }

        match self.kind {
            ChartKind::Bar => {
                self.require_x(table, None)?;
                self.require_single_y(table)?;
            }
            ChartKind::Line | ChartKind::Area => {
                self.require_x(table, Some(true))?;
                self.require_y(table, 1)?;
            }
            ChartKind::Scatter => {
                self.require_x(table, Some(true))?;
                self.require_single_y(table)?;
                if let Some(size) = &self.size {
                    require_numeric(table, size)?;
                }
            }
            ChartKind::Histogram => self.require_x(table, Some(true))?,
            ChartKind::Pie => self.require_x(table, Some(false))?,
            ChartKind::Box | ChartKind::Violin => {
                self.require_single_y(table)?;
                if let Some(x) = &self.x {
                    require_categorical(table, x)?;
                }
            }
            ChartKind::PairPlot => self.require_y(table, 2)?,
        }

        if let Some(color) = &self.color {
            require_categorical(table, color)?;
        }
        Ok(())
    }

    fn require_x(&self, table: &Table, numeric: Option<bool>) -> Result<()> {
        let x = self
            .x
            .as_deref()
            .ok_or(TabSurveyorError::EmptySelection { what: "x axis" })?;
        match numeric {
            Some(true) => require_numeric(table, x),
            Some(false) => require_categorical(table, x),
            None => Ok(()),
        }
    }

    fn require_y(&self, table: &Table, minimum: usize) -> Result<()> {
        if self.y.is_empty() {
            return Err(TabSurveyorError::EmptySelection { what: "y axis" });
        }
        if self.y.len() < minimum {
            return Err(TabSurveyorError::InsufficientData {
                operation: "chart series selection",
                required: minimum,
                actual: self.y.len(),
            });
        }
        for name in &self.y {
            require_numeric(table, name)?;
        }
        Ok(())
    }

    fn require_single_y(&self, table: &Table) -> Result<()> {
        self.require_y(table, 1)?;
        if self.y.len() > 1 {
            return Err(TabSurveyorError::configuration(format!(
                "{} chart plots a single y column, got {}",
                self.kind,
                self.y.len()
            )));
        }
        Ok(())
    }
}

fn require_numeric(table: &Table, name: &str) -> Result<()> {
    if table.column(name)?.is_numeric() {
        Ok(())
    } else {
        Err(TabSurveyorError::non_numeric(name))
    }
}

fn require_categorical(table: &Table, name: &str) -> Result<()> {
    if table.column(name)?.is_numeric() {
        Err(TabSurveyorError::configuration(format!(
            "column '{}' must be categorical",
            name
        )))
    } else {
        Ok(())
    }
}

/// Data handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// The referenced columns, possibly down-sampled
    Columns {
        /// Projected rows
        table: Table,
        /// Row count before sampling, when the rows were sampled
        sampled_from: Option<usize>,
    },
    /// Value frequencies, for pie charts
    Frequencies(FrequencyTable),
}

/// A validated request and its data.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChart {
    /// The request
    pub request: ChartRequest,
    /// Data to draw
    pub data: ChartData,
}

/// Validates a request and extracts the data it plots.
pub fn prepare(table: &Table, request: &ChartRequest) -> Result<PreparedChart> {
    request.validate(table)?;

    let data = match request.kind {
        ChartKind::Pie => {
            let column = request
                .x
                .as_deref()
                .ok_or(TabSurveyorError::EmptySelection { what: "x axis" })?;
            ChartData::Frequencies(frequency_table(table, column, request.options.top_n)?)
        }
        ChartKind::PairPlot => {
            let projected = table.select(request.referenced_columns().as_slice())?;
            if projected.row_count() > PAIR_PLOT_MAX_ROWS {
                let rows = sample_rows(projected.row_count(), PAIR_PLOT_MAX_ROWS);
                debug!(
                    "Sampled {} of {} rows for pair plot",
                    rows.len(),
                    projected.row_count()
                );
                ChartData::Columns {
                    table: projected.take_rows(&rows),
                    sampled_from: Some(projected.row_count()),
                }
            } else {
                ChartData::Columns {
                    table: projected,
                    sampled_from: None,
                }
            }
        }
        _ => ChartData::Columns {
            table: table.select(request.referenced_columns().as_slice())?,
            sampled_from: None,
        },
    };

    Ok(PreparedChart {
        request: request.clone(),
        data,
    })
}

/// Draws `amount` distinct row positions with a fixed seed, in row order.
fn sample_rows(length: usize, amount: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(PAIR_PLOT_SEED);
    let mut rows = index::sample(&mut rng, length, amount).into_vec();
    rows.sort_unstable();
    rows
}

/// Plotting collaborator that turns prepared chart data into output.
pub trait ChartRenderer {
    /// Rendered artifact, e.g. an SVG string or a figure specification
    type Output;

    /// Renders one chart.
    fn render(&self, chart: &PreparedChart) -> Result<Self::Output>;
}

/// Column names of a prepared chart's data, for renderers that label axes.
pub fn data_columns(data: &ChartData) -> Vec<&str> {
    match data {
        ChartData::Columns { table, .. } => table.columns().iter().map(Column::name).collect(),
        ChartData::Frequencies(table) => vec![table.column.as_str()],
    }
}
