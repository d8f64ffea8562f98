//! Chart rendering using Plotters' SVG backend
//!
//! Charts are returned as standalone `<svg>` documents so the section pages can
//! embed them inline.

use crate::data::{ChurnLabel, Metric};
use crate::stats::{BoxSummary, ClusterMeans, Histogram};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;

const HISTOGRAM_SIZE: (u32, u32) = (420, 300);
const WIDE_SIZE: (u32, u32) = (900, 420);

pub const RECENCY_COLOR: RGBColor = RGBColor(0x00, 0xbc, 0xd4);
pub const FREQUENCY_COLOR: RGBColor = RGBColor(0x8b, 0xc3, 0x4a);
pub const MONETARY_COLOR: RGBColor = RGBColor(0xff, 0x70, 0x43);

const NOT_CHURNED_COLOR: RGBColor = RGBColor(0x00, 0x80, 0x00);
const CHURNED_COLOR: RGBColor = RGBColor(0xff, 0x00, 0x00);

/// Sequential teal palette for the cluster size bars
const TEAL: [RGBColor; 7] = [
    RGBColor(209, 238, 234),
    RGBColor(168, 219, 217),
    RGBColor(133, 196, 201),
    RGBColor(104, 171, 184),
    RGBColor(79, 144, 166),
    RGBColor(59, 115, 143),
    RGBColor(42, 86, 116),
];

/// Sequential sunset palette for the churn rate bars
const SUNSET: [RGBColor; 7] = [
    RGBColor(243, 231, 155),
    RGBColor(250, 196, 132),
    RGBColor(248, 160, 126),
    RGBColor(235, 127, 134),
    RGBColor(206, 102, 147),
    RGBColor(160, 89, 160),
    RGBColor(92, 83, 165),
];

/// One color per RFM metric in the grouped bar chart
const METRIC_PALETTE: [RGBColor; 3] = [
    RGBColor(0x2e, 0x91, 0xe5),
    RGBColor(0xe1, 0x5f, 0x99),
    RGBColor(0x1c, 0xa7, 0x1c),
];

/// Width of one bar inside a cluster group
const GROUP_BAR_WIDTH: f64 = 0.26;

pub fn metric_color(metric: Metric) -> RGBColor {
    match metric {
        Metric::Recency => RECENCY_COLOR,
        Metric::Frequency => FREQUENCY_COLOR,
        Metric::Monetary => MONETARY_COLOR,
    }
}

fn churn_color(label: ChurnLabel) -> RGBColor {
    match label {
        ChurnLabel::NotChurned => NOT_CHURNED_COLOR,
        ChurnLabel::Churned => CHURNED_COLOR,
    }
}

/// Draw into an in-memory SVG document and return its text
fn render_svg<F>(size: (u32, u32), draw: F) -> crate::Result<String>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> crate::Result<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

/// X range covering every cluster bar with some padding
fn cluster_span<'a>(clusters: impl Iterator<Item = &'a i64>) -> std::ops::Range<f64> {
    let (lo, hi) = clusters.fold((i64::MAX, i64::MIN), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    if lo > hi {
        return -0.6..0.6;
    }
    (lo as f64 - 0.6)..(hi as f64 + 0.6)
}

fn padded_max(value: f64) -> f64 {
    if value > 0.0 {
        value * 1.15
    } else {
        1.0
    }
}

/// Integer tick labels only
fn cluster_tick(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{}", x.round() as i64)
    } else {
        String::new()
    }
}

fn churn_tick(x: &f64) -> String {
    match x.round() as i64 {
        0 if (x - 0.0).abs() < 1e-6 => ChurnLabel::NotChurned.caption().to_string(),
        1 if (x - 1.0).abs() < 1e-6 => ChurnLabel::Churned.caption().to_string(),
        _ => String::new(),
    }
}

/// Histogram of one RFM metric
pub fn histogram_chart(metric: Metric, histogram: &Histogram) -> crate::Result<String> {
    let x_range = match (histogram.edges.first(), histogram.edges.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => lo..hi,
        _ => 0.0..1.0,
    };
    let y_max = padded_max(histogram.counts.iter().copied().max().unwrap_or(0) as f64);
    let color = metric_color(metric);

    render_svg(HISTOGRAM_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(metric.name(), ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(6)
            .x_desc(metric.name())
            .y_desc("count")
            .axis_desc_style(("sans-serif", 13))
            .draw()?;

        chart.draw_series(histogram.bins().map(|(lo, hi, count)| {
            Rectangle::new([(lo, 0.0), (hi, count as f64)], color.filled())
        }))?;

        Ok(())
    })
}

/// Bar chart of customers per cluster
pub fn cluster_count_chart(counts: &BTreeMap<i64, usize>) -> crate::Result<String> {
    let x_range = cluster_span(counts.keys());
    let y_max = padded_max(counts.values().copied().max().unwrap_or(0) as f64);

    render_svg(WIDE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Customer Count by Cluster", ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&cluster_tick)
            .x_desc("Cluster")
            .y_desc("Customer Count")
            .axis_desc_style(("sans-serif", 14))
            .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, (&cluster, &count))| {
            let x = cluster as f64;
            let color = TEAL[(i + 2) % TEAL.len()];
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, count as f64)], color.filled())
        }))?;

        Ok(())
    })
}

/// Grouped bars of mean Recency, Frequency and Monetary per cluster
pub fn cluster_means_chart(means: &BTreeMap<i64, ClusterMeans>) -> crate::Result<String> {
    let x_range = cluster_span(means.keys());
    let y_max = padded_max(
        means
            .values()
            .flat_map(|m| Metric::ALL.into_iter().filter_map(|metric| m.get(metric)))
            .fold(0.0, f64::max),
    );

    render_svg(WIDE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Average RFM by Cluster", ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&cluster_tick)
            .x_desc("Cluster")
            .y_desc("value")
            .axis_desc_style(("sans-serif", 14))
            .draw()?;

        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            let color = METRIC_PALETTE[i];
            let offset = (i as f64 - 1.0) * GROUP_BAR_WIDTH;
            chart
                .draw_series(means.iter().filter_map(move |(&cluster, m)| {
                    let x = cluster as f64 + offset;
                    let mean = m.get(metric)?;
                    Some(Rectangle::new(
                        [
                            (x - GROUP_BAR_WIDTH / 2.0, 0.0),
                            (x + GROUP_BAR_WIDTH / 2.0, mean),
                        ],
                        color.filled(),
                    ))
                }))?
                .label(metric.name())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .border_style(BLACK.stroke_width(1))
            .draw()?;

        Ok(())
    })
}

/// Churn rate per cluster with the value printed above each bar
pub fn churn_rate_chart(rates: &BTreeMap<i64, f64>) -> crate::Result<String> {
    let x_range = cluster_span(rates.keys());
    let y_max = padded_max(rates.values().copied().fold(0.0, f64::max));

    render_svg(WIDE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Churn Rate by Cluster", ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&cluster_tick)
            .x_desc("Cluster")
            .y_desc("Churn Rate (%)")
            .axis_desc_style(("sans-serif", 14))
            .draw()?;

        chart.draw_series(rates.iter().enumerate().map(|(i, (&cluster, &rate))| {
            let x = cluster as f64;
            let color = SUNSET[(i + 1) % SUNSET.len()];
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, rate)], color.filled())
        }))?;

        chart.draw_series(rates.iter().map(|(&cluster, &rate)| {
            Text::new(
                format!("{:.2}", rate),
                (cluster as f64 - 0.15, rate + y_max * 0.04),
                ("sans-serif", 13),
            )
        }))?;

        Ok(())
    })
}

/// Box-and-whisker summaries of Recency for each churn status
pub fn recency_box_chart(groups: &[(ChurnLabel, Option<BoxSummary>)]) -> crate::Result<String> {
    let summaries: Vec<(ChurnLabel, &BoxSummary)> = groups
        .iter()
        .filter_map(|(label, summary)| summary.as_ref().map(|s| (*label, s)))
        .collect();

    let (lo, hi) = summaries
        .iter()
        .flat_map(|(_, s)| {
            s.outliers
                .iter()
                .copied()
                .chain([s.lower_whisker, s.upper_whisker])
        })
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let y_range = if lo <= hi {
        let pad = ((hi - lo) * 0.08).max(1.0);
        (lo - pad)..(hi + pad)
    } else {
        0.0..1.0
    };

    render_svg(WIDE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Recency by Churn Status", ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..1.5f64, y_range)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(3)
            .x_label_formatter(&churn_tick)
            .x_desc("Churn")
            .y_desc("Recency")
            .axis_desc_style(("sans-serif", 14))
            .draw()?;

        for (label, s) in &summaries {
            let x = label.as_flag() as f64;
            let color = churn_color(*label);
            let half = 0.25;

            chart.draw_series([
                Rectangle::new([(x - half, s.q1), (x + half, s.q3)], color.mix(0.3).filled()),
                Rectangle::new([(x - half, s.q1), (x + half, s.q3)], color.stroke_width(2)),
            ])?;

            chart.draw_series([
                PathElement::new(vec![(x - half, s.median), (x + half, s.median)], color.stroke_width(3)),
                PathElement::new(vec![(x, s.q3), (x, s.upper_whisker)], color.stroke_width(2)),
                PathElement::new(vec![(x, s.q1), (x, s.lower_whisker)], color.stroke_width(2)),
                PathElement::new(
                    vec![(x - half / 2.0, s.upper_whisker), (x + half / 2.0, s.upper_whisker)],
                    color.stroke_width(2),
                ),
                PathElement::new(
                    vec![(x - half / 2.0, s.lower_whisker), (x + half / 2.0, s.lower_whisker)],
                    color.stroke_width(2),
                ),
            ])?;

            chart.draw_series(
                s.outliers
                    .iter()
                    .map(|&v| Circle::new((x, v), 3, color.filled())),
            )?;
        }

        Ok(())
    })
}
