//! Aggregates behind the dashboard sections
//!
//! Every function here is a pure read over a borrowed [`CustomerTable`].

use crate::data::{ChurnLabel, CustomerTable, Metric};
use std::collections::{BTreeMap, HashSet};

/// Bin count used by the RFM histograms
pub const HISTOGRAM_BINS: usize = 30;

/// Headline figures for the Overview section
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub total_customers: usize,
    pub total_revenue: f64,
    pub avg_recency: Option<f64>,
    /// Percentage in [0, 100]
    pub churn_rate: Option<f64>,
}

impl Overview {
    /// Single pass over the table. Missing metric values are skipped; the
    /// churn rate is taken over every row.
    pub fn compute(table: &CustomerTable) -> Self {
        let mut ids = HashSet::new();
        let mut total_revenue = 0.0;
        let mut recency = RunningMean::default();
        let mut churned = 0usize;

        for record in table.records() {
            if let Some(id) = record.customer_id.as_deref() {
                ids.insert(id);
            }
            total_revenue += record.monetary.unwrap_or(0.0);
            recency.push(record.recency);
            churned += record.churn().as_flag() as usize;
        }

        let rows = table.len();
        Self {
            total_customers: ids.len(),
            total_revenue,
            avg_recency: recency.value(),
            churn_rate: (rows > 0).then(|| churned as f64 / rows as f64 * 100.0),
        }
    }
}

/// Mean over the values that are present
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` ascending bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets spanning min..=max.
    /// The last bucket is closed on the right.
    pub fn compute(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (lo, hi) = match min_max(values) {
            Some((lo, hi)) if hi > lo => (lo, hi),
            Some((v, _)) => (v - 0.5, v + 0.5),
            None => (0.0, 1.0),
        };
        let width = (hi - lo) / bins as f64;

        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// (lower edge, upper edge, count) per bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(edge, &count)| (edge[0], edge[1], count))
    }
}

/// Mean RFM values of one cluster, `None` where every value is missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMeans {
    pub recency: Option<f64>,
    pub frequency: Option<f64>,
    pub monetary: Option<f64>,
}

impl ClusterMeans {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Recency => self.recency,
            Metric::Frequency => self.frequency,
            Metric::Monetary => self.monetary,
        }
    }
}

/// Customers per cluster, ascending by cluster. Rows without a cluster are skipped.
pub fn cluster_counts(table: &CustomerTable) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for cluster in table.records().iter().filter_map(|r| r.cluster) {
        *counts.entry(cluster).or_insert(0) += 1;
    }
    counts
}

/// Mean Recency, Frequency and Monetary per cluster
pub fn cluster_means(table: &CustomerTable) -> BTreeMap<i64, ClusterMeans> {
    let mut sums: BTreeMap<i64, [RunningMean; 3]> = BTreeMap::new();
    for record in table.records() {
        let Some(cluster) = record.cluster else {
            continue;
        };
        let acc = sums.entry(cluster).or_default();
        for (mean, metric) in acc.iter_mut().zip(Metric::ALL) {
            mean.push(metric.of(record));
        }
    }

    sums.into_iter()
        .map(|(cluster, [recency, frequency, monetary])| {
            (
                cluster,
                ClusterMeans {
                    recency: recency.value(),
                    frequency: frequency.value(),
                    monetary: monetary.value(),
                },
            )
        })
        .collect()
}

/// Churn rate (percentage) per cluster
pub fn churn_rate_by_cluster(table: &CustomerTable) -> BTreeMap<i64, f64> {
    let mut tallies: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    for record in table.records() {
        if let Some(cluster) = record.cluster {
            let (churned, n) = tallies.entry(cluster).or_insert((0, 0));
            *churned += record.churn().as_flag() as usize;
            *n += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(cluster, (churned, n))| (cluster, churned as f64 / n as f64 * 100.0))
        .collect()
}

/// Five-number summary with Tukey whiskers
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value within 1.5 IQR below q1
    pub lower_whisker: f64,
    /// Largest value within 1.5 IQR above q3
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
    pub count: usize,
}

impl BoxSummary {
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let fence = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - fence, q3 + fence);

        let within = |v: &f64| (low_fence..=high_fence).contains(v);
        let lower_whisker = sorted.iter().copied().find(|v| within(v)).unwrap_or(q1);
        let upper_whisker = sorted.iter().copied().rev().find(|v| within(v)).unwrap_or(q3);
        let outliers = sorted.iter().copied().filter(|v| !within(v)).collect();

        Some(Self {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
            count: sorted.len(),
        })
    }
}

/// Recency box summaries split by churn status, Not Churned first
pub fn recency_by_churn(table: &CustomerTable) -> [(ChurnLabel, Option<BoxSummary>); 2] {
    let split = |label: ChurnLabel| {
        let values: Vec<f64> = table
            .records()
            .iter()
            .filter(|r| r.churn() == label)
            .filter_map(|r| r.recency)
            .collect();
        (label, BoxSummary::compute(&values))
    };
    [split(ChurnLabel::NotChurned), split(ChurnLabel::Churned)]
}

/// Linear-interpolation quantile of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
