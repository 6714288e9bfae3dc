//! Synthetic sample datasets for trying the analyzer without a file.
//!
//! Each generator is seeded, so the same kind and seed always produce the
//! same table.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::table::{Column, Table};
use crate::{Result, TabSurveyorError};

/// Seed used when none is given.
pub const SAMPLE_SEED: u64 = 42;

/// Available sample datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    /// A year of daily sales by category and region
    Sales,
    /// Customer demographics and purchase behaviour
    Customers,
    /// A year of business-day stock prices
    StockPrices,
    /// Questionnaire answers on a 1-5 scale
    Survey,
}

impl SampleKind {
    /// Every sample kind.
    pub const ALL: [Self; 4] = [Self::Sales, Self::Customers, Self::StockPrices, Self::Survey];

    fn name(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Customers => "customers",
            Self::StockPrices => "stock-prices",
            Self::Survey => "survey",
        }
    }

    /// Download name for the generated CSV.
    pub fn file_name(self) -> String {
        format!("sample_{}.csv", self.name())
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleKind {
    type Err = TabSurveyorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| TabSurveyorError::configuration(format!("unknown sample '{}'", s)))
    }
}

/// Generates a sample dataset with the default seed.
pub fn generate(kind: SampleKind) -> Result<Table> {
    generate_with_seed(kind, SAMPLE_SEED)
}

/// Generates a sample dataset with an explicit seed.
pub fn generate_with_seed(kind: SampleKind, seed: u64) -> Result<Table> {
    let mut rng = SampleRng::new(seed);
    match kind {
        SampleKind::Sales => sales(&mut rng),
        SampleKind::Customers => customers(&mut rng),
        SampleKind::StockPrices => stock_prices(&mut rng),
        SampleKind::Survey => survey(&mut rng),
    }
}

fn sales(rng: &mut SampleRng) -> Result<Table> {
    const ROWS: usize = 365;
    let dates = date_labels(start_date()?.iter_days().take(ROWS));

    Table::new(vec![
        Column::categorical("date", dates),
        Column::numeric("sales", rng.normals_truncated(ROWS, 100_000.0, 20_000.0)),
        Column::categorical(
            "category",
            rng.choices(ROWS, &["Electronics", "Clothing", "Food", "Books"]),
        ),
        Column::categorical(
            "region",
            rng.choices(ROWS, &["Tokyo", "Osaka", "Nagoya", "Fukuoka"]),
        ),
        Column::numeric("customers", rng.poissons(ROWS, 50.0)),
        Column::numeric("average_price", rng.normals_truncated(ROWS, 2_000.0, 500.0)),
    ])
}

fn customers(rng: &mut SampleRng) -> Result<Table> {
    const ROWS: usize = 1000;
    let income: Vec<Option<f64>> = rng
        .normals_truncated(ROWS, 500.0, 150.0)
        .into_iter()
        .map(|v| v.map(|v| v * 10_000.0))
        .collect();

    Table::new(vec![
        Column::numeric("customer_id", sequence(ROWS)),
        Column::numeric("age", rng.normals_truncated(ROWS, 40.0, 15.0)),
        Column::categorical("gender", rng.choices(ROWS, &["Male", "Female"])),
        Column::numeric("annual_income", income),
        Column::numeric("purchases", rng.poissons(ROWS, 5.0)),
        Column::numeric(
            "satisfaction",
            rng.weighted_scores(ROWS, &[0.05, 0.1, 0.2, 0.4, 0.25]),
        ),
        Column::categorical(
            "membership",
            rng.weighted_choices(
                ROWS,
                &[("Bronze", 0.4), ("Silver", 0.3), ("Gold", 0.2), ("Platinum", 0.1)],
            ),
        ),
    ])
}

fn stock_prices(rng: &mut SampleRng) -> Result<Table> {
    const ROWS: usize = 252;
    let business_days = start_date()?
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(ROWS);

    let mut price = 1000.0;
    let mut close = Vec::with_capacity(ROWS);
    for _ in 0..ROWS {
        price *= 1.0 + rng.normal(0.0, 0.02);
        close.push(price);
    }
    let volume = rng.normals_truncated(ROWS, 1_000_000.0, 300_000.0);
    let high: Vec<Option<f64>> = close
        .iter()
        .map(|p| Some(p * (1.0 + rng.normal(0.0, 0.01).abs())))
        .collect();
    let low: Vec<Option<f64>> = close
        .iter()
        .map(|p| Some(p * (1.0 - rng.normal(0.0, 0.01).abs())))
        .collect();

    Table::new(vec![
        Column::categorical("date", date_labels(business_days)),
        Column::numeric("close", close.into_iter().map(Some).collect()),
        Column::numeric("volume", volume),
        Column::numeric("high", high),
        Column::numeric("low", low),
    ])
}

fn survey(rng: &mut SampleRng) -> Result<Table> {
    const ROWS: usize = 500;

    Table::new(vec![
        Column::numeric("respondent_id", sequence(ROWS)),
        Column::categorical(
            "age_group",
            rng.choices(ROWS, &["10s", "20s", "30s", "40s", "50s", "60+"]),
        ),
        Column::categorical(
            "occupation",
            rng.choices(
                ROWS,
                &["Office worker", "Civil servant", "Self-employed", "Student", "Homemaker", "Other"],
            ),
        ),
        Column::numeric(
            "service_satisfaction",
            rng.weighted_scores(ROWS, &[0.05, 0.1, 0.25, 0.4, 0.2]),
        ),
        Column::numeric(
            "price_satisfaction",
            rng.weighted_scores(ROWS, &[0.1, 0.15, 0.3, 0.3, 0.15]),
        ),
        Column::categorical(
            "usage_frequency",
            rng.choices(
                ROWS,
                &["Daily", "Several times a week", "Weekly", "Several times a month", "Monthly", "Rarely"],
            ),
        ),
        Column::numeric(
            "recommendation",
            rng.weighted_scores(ROWS, &[0.1, 0.1, 0.2, 0.35, 0.25]),
        ),
    ])
}

fn start_date() -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .ok_or_else(|| TabSurveyorError::configuration("invalid sample start date"))
}

fn date_labels(dates: impl Iterator<Item = NaiveDate>) -> Vec<Option<String>> {
    dates.map(|d| Some(d.format("%Y-%m-%d").to_string())).collect()
}

fn sequence(rows: usize) -> Vec<Option<f64>> {
    (1..=rows).map(|i| Some(i as f64)).collect()
}

/// Seeded source of the distributions the generators draw from.
struct SampleRng(StdRng);

impl SampleRng {
    fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Normal variate by the Box-Muller transform.
    fn normal(&mut self, mean: f64, std: f64) -> f64 {
        let u1: f64 = 1.0 - self.0.random::<f64>();
        let u2: f64 = self.0.random();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
        mean + std * z
    }

    /// Normal variates truncated toward zero to whole numbers.
    fn normals_truncated(&mut self, n: usize, mean: f64, std: f64) -> Vec<Option<f64>> {
        (0..n).map(|_| Some(self.normal(mean, std).trunc())).collect()
    }

    /// Poisson variates by Knuth's multiplication method.
    fn poisson(&mut self, lambda: f64) -> f64 {
        let limit = (-lambda).exp();
        let mut k = 0.0;
        let mut product: f64 = self.0.random();
        while product > limit {
            k += 1.0;
            product *= self.0.random::<f64>();
        }
        k
    }

    fn poissons(&mut self, n: usize, lambda: f64) -> Vec<Option<f64>> {
        (0..n).map(|_| Some(self.poisson(lambda))).collect()
    }

    fn choices(&mut self, n: usize, options: &[&str]) -> Vec<Option<String>> {
        (0..n)
            .map(|_| Some(options[self.0.random_range(0..options.len())].to_string()))
            .collect()
    }

    fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.0.random::<f64>() * total;
        for (index, weight) in weights.iter().enumerate() {
            if target < *weight {
                return index;
            }
            target -= weight;
        }
        weights.len() - 1
    }

    fn weighted_choices(&mut self, n: usize, options: &[(&str, f64)]) -> Vec<Option<String>> {
        let weights: Vec<f64> = options.iter().map(|(_, w)| *w).collect();
        (0..n)
            .map(|_| Some(options[self.pick_weighted(&weights)].0.to_string()))
            .collect()
    }

    /// Scores 1 to `weights.len()` drawn with the given probabilities.
    fn weighted_scores(&mut self, n: usize, weights: &[f64]) -> Vec<Option<f64>> {
        (0..n)
            .map(|_| Some((self.pick_weighted(weights) + 1) as f64))
            .collect()
    }
}
