//! Dashboard sections and HTML page rendering
//!
//! [`Section`] is the sidebar selector: each variant owns one renderer, chosen
//! by an exhaustive match. Renderers only borrow the customer table.

use crate::data::{ChurnLabel, CustomerTable, Metric};
use crate::error::InferenceError;
use crate::model::{InputBounds, PredictionRequest, FREQUENCY_INPUT, MONETARY_INPUT, RECENCY_INPUT};
use crate::stats::{self, Histogram, Overview, HISTOGRAM_BINS};
use crate::viz;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

const DASHBOARD_TITLE: &str = "📊 Customer Segmentation & Churn Dashboard";
const NAV_TITLE: &str = "📁 Dashboard Navigation";
const FOOTER: &str = "Powered by churnscope · axum + Plotters";

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; color: #262730; display: flex; }
nav { width: 240px; min-height: 100vh; background: #f0f2f6; padding: 24px 16px; box-sizing: border-box; }
nav h2 { font-size: 18px; margin-top: 0; }
nav a { display: block; padding: 6px 10px; margin: 2px 0; border-radius: 6px; color: #262730; text-decoration: none; }
nav a.active { background: #4F8BF9; color: white; }
main { flex: 1; padding: 24px 48px; }
.big-font { font-size: 32px; font-weight: bold; color: #4F8BF9; }
.section-header { font-size: 24px; color: #444; margin-top: 30px; }
.metrics, .columns { display: flex; gap: 24px; flex-wrap: wrap; }
.metric { flex: 1; min-width: 180px; }
.metric-label { font-size: 16px; color: #555; }
.metric-value { font-size: 32px; }
.chart svg { max-width: 100%; height: auto; }
.field { display: flex; flex-direction: column; flex: 1; }
.field input { padding: 6px; font-size: 16px; }
button { width: 100%; margin-top: 16px; padding: 10px; font-size: 16px; }
.success { margin-top: 16px; padding: 12px; border-radius: 6px; background: #dff5e3; color: #1b5e20; }
.failure { margin-top: 16px; padding: 12px; border-radius: 6px; background: #fde2e1; color: #8a1c1c; }
.caption { color: #808495; font-size: 14px; }
"#;

/// The six dashboard sections, in sidebar order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    Introduction,
    Overview,
    RfmAnalysis,
    Clusters,
    ChurnAnalysis,
    PredictChurn,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Introduction,
        Section::Overview,
        Section::RfmAnalysis,
        Section::Clusters,
        Section::ChurnAnalysis,
        Section::PredictChurn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Introduction => "Introduction",
            Section::Overview => "Overview",
            Section::RfmAnalysis => "RFM Analysis",
            Section::Clusters => "Clusters",
            Section::ChurnAnalysis => "Churn Analysis",
            Section::PredictChurn => "Predict Churn",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Section::Introduction => "introduction",
            Section::Overview => "overview",
            Section::RfmAnalysis => "rfm-analysis",
            Section::Clusters => "clusters",
            Section::ChurnAnalysis => "churn-analysis",
            Section::PredictChurn => "predict-churn",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.slug() == slug)
    }

    /// URL of the section page
    pub fn href(self) -> String {
        format!("/sections/{}", self.slug())
    }

    /// Render this section's body
    pub fn render(self, table: &CustomerTable) -> crate::Result<String> {
        match self {
            Section::Introduction => Ok(render_introduction()),
            Section::Overview => Ok(render_overview(table)),
            Section::RfmAnalysis => render_rfm_analysis(table),
            Section::Clusters => render_clusters(table),
            Section::ChurnAnalysis => render_churn_analysis(table),
            Section::PredictChurn => Ok(render_predict_form(&PredictionRequest::default(), None)),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    /// Accepts either the display label or the slug
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.label() == s)
            .or_else(|| Self::from_slug(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown section: {}", s))
    }
}

/// Full page for a section switch
pub fn render_page(section: Section, table: &CustomerTable) -> crate::Result<String> {
    let body = section.render(table)?;
    Ok(layout(Some(section), &body))
}

/// Full Predict Churn page after a form submission
pub fn render_prediction_page(
    request: &PredictionRequest,
    outcome: &Result<ChurnLabel, InferenceError>,
) -> String {
    layout(
        Some(Section::PredictChurn),
        &render_predict_form(request, Some(outcome)),
    )
}

pub fn render_not_found(path: &str) -> String {
    layout(
        None,
        &format!(
            "<p class='section-header'>Section not found</p><p>No section is served at <code>{}</code>.</p>",
            escape_html(path)
        ),
    )
}

pub fn render_error_page(section: Section, message: &str) -> String {
    layout(
        Some(section),
        &format!(
            "<div class='failure'>Failed to render {}: {}</div>",
            section.label(),
            escape_html(message)
        ),
    )
}

fn layout(active: Option<Section>, body: &str) -> String {
    let mut nav = String::new();
    for section in Section::ALL {
        let class = if Some(section) == active { " class='active'" } else { "" };
        let _ = write!(nav, "<a href='{}'{}>{}</a>", section.href(), class, section.label());
    }
    let title = active.map(Section::label).unwrap_or("Not found");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Customer Dashboard · {title}</title>
    <style>{style}</style>
</head>
<body>
    <nav><h2>{nav_title}</h2>{nav}</nav>
    <main>
        <p class="big-font">{heading}</p>
        <hr>
        {body}
        <hr>
        <p class="caption">{footer}</p>
    </main>
</body>
</html>"#,
        title = title,
        style = STYLE,
        nav_title = NAV_TITLE,
        nav = nav,
        heading = DASHBOARD_TITLE,
        body = body,
        footer = FOOTER,
    )
}

fn section_header(text: &str) -> String {
    format!("<p class='section-header'>{}</p>", text)
}

fn chart(svg: String) -> String {
    format!("<div class='chart'>{}</div>", svg)
}

fn render_introduction() -> String {
    r#"<h2>🧾 Project Introduction</h2>
<p>This interactive dashboard helps businesses understand customer behavior using:</p>
<ul>
    <li>📦 <b>RFM Analysis</b>: Measures Recency, Frequency, and Monetary value of customers</li>
    <li>🧠 <b>Customer Segmentation</b>: Groups customers based on purchasing behavior</li>
    <li>🔮 <b>Churn Prediction</b>: Uses a machine learning model to predict if a customer is at risk of churning</li>
</ul>
<h3>💡 Objectives:</h3>
<ul>
    <li>Improve customer retention strategies</li>
    <li>Tailor marketing based on segment behavior</li>
    <li>Identify at-risk customers early</li>
</ul>
<h3>📂 Dataset Overview:</h3>
<ul>
    <li>Transactions from an e-commerce platform</li>
    <li>~25,000 purchases with Customer ID, Purchase Date, and Product Details</li>
</ul>
<p>👉 Use the navigation sidebar to explore sections and insights.</p>"#
        .to_string()
}

fn render_overview(table: &CustomerTable) -> String {
    let overview = Overview::compute(table);
    let metric = |label: &str, value: String| {
        format!(
            "<div class='metric'><div class='metric-label'>{}</div><div class='metric-value'>{}</div></div>",
            label, value
        )
    };

    let avg_recency = overview
        .avg_recency
        .map(|r| format!("{:.0} days", r))
        .unwrap_or_else(|| "n/a".to_string());
    let churn_rate = overview
        .churn_rate
        .map(|r| format!("{:.2}%", r))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "<div class='metrics'>{}{}{}{}</div>{}",
        metric("🧑‍🤝‍🧑 Total Customers", overview.total_customers.to_string()),
        metric("💰 Total Revenue", format!("₹{}", format_thousands(overview.total_revenue))),
        metric("⏱️ Avg Recency", avg_recency),
        metric("⚠️ Churn Rate", churn_rate),
        section_header("📌 Use the sidebar to explore detailed views."),
    )
}

fn render_rfm_analysis(table: &CustomerTable) -> crate::Result<String> {
    let mut columns = String::new();
    for metric in Metric::ALL {
        let histogram = Histogram::compute(&table.column(metric), HISTOGRAM_BINS);
        columns.push_str(&chart(viz::histogram_chart(metric, &histogram)?));
    }

    Ok(format!(
        "{}<div class='columns'>{}</div>",
        section_header("📦 RFM Metric Distributions"),
        columns
    ))
}

fn render_clusters(table: &CustomerTable) -> crate::Result<String> {
    let counts = viz::cluster_count_chart(&stats::cluster_counts(table))?;
    let means = viz::cluster_means_chart(&stats::cluster_means(table))?;

    Ok(format!(
        "{}{}{}",
        section_header("🧠 Customer Segment Overview"),
        chart(counts),
        chart(means)
    ))
}

fn render_churn_analysis(table: &CustomerTable) -> crate::Result<String> {
    let rates = viz::churn_rate_chart(&stats::churn_rate_by_cluster(table))?;
    let boxes = viz::recency_box_chart(&stats::recency_by_churn(table))?;

    Ok(format!(
        "{}{}{}",
        section_header("🔮 Churn Insights"),
        chart(rates),
        chart(boxes)
    ))
}

fn number_input(bounds: &InputBounds, value: u32) -> String {
    format!(
        "<label class='field'>{label}<input type='number' name='{name}' min='{min}' max='{max}' step='1' value='{value}' required></label>",
        label = bounds.label,
        name = bounds.name,
        min = bounds.min,
        max = bounds.max,
        value = value,
    )
}

fn render_predict_form(
    request: &PredictionRequest,
    outcome: Option<&Result<ChurnLabel, InferenceError>>,
) -> String {
    let result = match outcome {
        None => String::new(),
        Some(Ok(label)) => format!(
            "<div class='success'>Prediction Result: {}</div>",
            label.outcome()
        ),
        Some(Err(err)) => format!(
            "<div class='failure'>Prediction failed: {}</div>",
            escape_html(&err.to_string())
        ),
    };

    format!(
        "{header}<form method='post' action='{action}'><div class='columns'>{r}{f}{m}</div><button type='submit'>Predict Churn</button></form>{result}",
        header = section_header("📈 Predict Customer Churn"),
        action = Section::PredictChurn.href(),
        r = number_input(&RECENCY_INPUT, request.recency),
        f = number_input(&FREQUENCY_INPUT, request.frequency),
        m = number_input(&MONETARY_INPUT, request.monetary),
        result = result,
    )
}

/// Whole-number formatting with comma thousands separators
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
