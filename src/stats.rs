//! Descriptive statistics and histogram binning for RFM columns

use std::fmt;

use ndarray::Array1;

use crate::rfm::{rfm_columns, RfmRecord};

/// Default bin count for RFM histograms
pub const HISTOGRAM_BINS: usize = 20;

/// count / mean / std / min / quartiles / max of one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1), NaN for a single value
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Describe `values`, or `None` when there is nothing to describe
pub fn describe(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let data = Array1::from_vec(values.to_vec());
    let mean = data.mean()?;
    let std = if data.len() < 2 { f64::NAN } else { data.std(1.0) };

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(Summary {
        count: sorted.len(),
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear interpolation between the closest ranks of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Summaries of the three RFM columns over the same customers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfmSummary {
    pub recency: Summary,
    pub frequency: Summary,
    pub monetary: Summary,
}

impl RfmSummary {
    /// `None` when there are no customers
    pub fn from_records(records: &[RfmRecord]) -> Option<Self> {
        let (recency, frequency, monetary) = rfm_columns(records);
        Some(Self {
            recency: describe(&recency)?,
            frequency: describe(&frequency)?,
            monetary: describe(&monetary)?,
        })
    }
}

impl fmt::Display for RfmSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = [self.recency, self.frequency, self.monetary];
        writeln!(f, "  {:<6} | {:>14} | {:>14} | {:>14}", "", "Recency", "Frequency", "Monetary")?;
        writeln!(f, "  -------|----------------|----------------|---------------")?;

        let rows: [(&str, fn(&Summary) -> f64); 8] = [
            ("count", |s| s.count as f64),
            ("mean", |s| s.mean),
            ("std", |s| s.std),
            ("min", |s| s.min),
            ("25%", |s| s.q25),
            ("50%", |s| s.median),
            ("75%", |s| s.q75),
            ("max", |s| s.max),
        ];
        for (name, value) in rows {
            write!(f, "  {:<6}", name)?;
            for column in &columns {
                write!(f, " | {:>14.2}", value(column))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning their range
    ///
    /// Every bin is half-open except the last, which also takes the maximum.
    /// A range of zero width is widened by 0.5 on each side.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }

        let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let width = (max - min) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();

        let mut counts = vec![0u64; bins];
        for &value in values {
            let index = (((value - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Some(Self { edges, counts })
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(lower edge, upper edge, count)` per bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, u64)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(edge, &count)| (edge[0], edge[1], count))
    }
}

/// Gaussian kernel density estimate sampled at `points` evenly spaced x values
/// over `[from, to]`
///
/// Bandwidth follows Scott's rule (`std * n^(-1/5)`). Densities are scaled by
/// `n * bin_width` so the curve sits on the same axis as a histogram with that
/// bin width. `None` when the values have no spread.
pub fn gaussian_kde(
    values: &[f64],
    from: f64,
    to: f64,
    points: usize,
    bin_width: f64,
) -> Option<Vec<(f64, f64)>> {
    if values.len() < 2 || points < 2 {
        return None;
    }

    let data = Array1::from_vec(values.to_vec());
    let std = data.std(1.0);
    if !std.is_finite() || std <= 0.0 {
        return None;
    }

    let n = values.len() as f64;
    let bandwidth = std * n.powf(-0.2);
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let step = (to - from) / (points - 1) as f64;

    let curve = (0..points)
        .map(|i| {
            let x = from + step * i as f64;
            let density: f64 = data
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density * n * bin_width)
        })
        .collect();

    Some(curve)
}
