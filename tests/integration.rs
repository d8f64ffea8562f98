//! Integration tests for churnscope

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use churnscope::model::ChurnModelArtifact;
use churnscope::{build_router, initialize, LoadError, Section, TableCache};
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2};
use std::io::Write;
use tempfile::NamedTempFile;
use tower::util::ServiceExt; // for `oneshot` method

/// Create a test CSV file with sample clustered customers
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CustomerID,Recency,Frequency,Monetary,Cluster").unwrap();

    // Cluster 0 - recent, frequent buyers
    writeln!(file, "12347.0,2,7,4310.0,0").unwrap();
    writeln!(file, "12348.0,75,4,1797.24,0").unwrap();
    // Cluster 1 - lapsed, low value
    writeln!(file, "12346.0,325,1,77183.6,1").unwrap();
    writeln!(file, "12350.0,310,1,334.4,1").unwrap();
    // Cluster 2 - borderline recency
    writeln!(file, "12352.0,181,8,2506.04,2").unwrap();
    writeln!(file, "12353.0,180,1,89.0,2").unwrap();

    file
}

/// Fit a shallow tree on (recency, frequency, monetary) rows and write it as a model artifact
fn write_model(rows: &[[f64; 3]], targets: Vec<usize>) -> NamedTempFile {
    let records = Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j]);
    let classifier = DecisionTree::params()
        .max_depth(Some(2))
        .fit(&Dataset::new(records, Array1::from(targets)))
        .unwrap();

    let file = NamedTempFile::new().unwrap();
    serde_json::to_writer(file.as_file(), &ChurnModelArtifact::new(classifier, Some(180.0))).unwrap();
    file
}

fn create_test_model() -> NamedTempFile {
    write_model(
        &[
            [15.0, 9.0, 800.0],
            [45.0, 6.0, 500.0],
            [90.0, 4.0, 300.0],
            [220.0, 1.0, 60.0],
            [300.0, 1.0, 30.0],
            [350.0, 1.0, 10.0],
        ],
        vec![0, 0, 0, 1, 1, 1],
    )
}

fn setup_app(data: &NamedTempFile, model: &NamedTempFile) -> axum::Router {
    let cache = TableCache::new(data.path());
    let state = initialize(&cache, model.path()).unwrap();
    build_router(state)
}

async fn body_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_root_serves_introduction() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response.into_body()).await;
    assert!(html.contains("Project Introduction"));
    assert!(html.contains("class='active'>Introduction</a>"));
}

#[tokio::test]
async fn test_every_section_is_reachable() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    for section in Section::ALL {
        let response = app.clone().oneshot(get(&section.href())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", section);

        let html = body_text(response.into_body()).await;
        assert!(html.contains(&format!("class='active'>{}</a>", section.label())));
    }
}

#[tokio::test]
async fn test_overview_metrics() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app.oneshot(get("/sections/overview")).await.unwrap();
    let html = body_text(response.into_body()).await;

    // 6 customers, revenue 86,220, mean recency 178.83, 3 of 6 churned
    assert!(html.contains("<div class='metric-value'>6</div>"));
    assert!(html.contains("₹86,220"));
    assert!(html.contains("179 days"));
    assert!(html.contains("50.00%"));
}

#[tokio::test]
async fn test_chart_sections_embed_svg() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    for slug in ["rfm-analysis", "clusters", "churn-analysis"] {
        let response = app
            .clone()
            .oneshot(get(&format!("/sections/{}", slug)))
            .await
            .unwrap();
        let html = body_text(response.into_body()).await;
        assert!(html.contains("<svg"), "{}", slug);
    }
}

#[tokio::test]
async fn test_prediction_submission() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app
        .clone()
        .oneshot(post_form(
            "/sections/predict-churn",
            "recency=90&frequency=10&monetary=500",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response.into_body()).await;
    let not_churn = html.contains("Prediction Result: 🟢 Not Likely to Churn");
    let churn = html.contains("Prediction Result: 🔴 At Risk of Churning");
    assert!(not_churn ^ churn, "exactly one outcome expected");
    assert!(html.contains("name='recency' min='0' max='365' step='1' value='90'"));

    let response = app
        .oneshot(post_form(
            "/sections/predict-churn",
            "recency=340&frequency=1&monetary=20",
        ))
        .await
        .unwrap();
    let html = body_text(response.into_body()).await;
    assert!(html.contains("Prediction Result: 🔴 At Risk of Churning"));
}

#[tokio::test]
async fn test_out_of_range_inputs_are_clamped() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app
        .oneshot(post_form(
            "/sections/predict-churn",
            "recency=900&frequency=0&monetary=99999",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response.into_body()).await;
    assert!(html.contains("name='recency' min='0' max='365' step='1' value='365'"));
    assert!(html.contains("name='frequency' min='1' max='100' step='1' value='1'"));
    assert!(html.contains("name='monetary' min='1' max='10000' step='1' value='10000'"));
}

#[tokio::test]
async fn test_switching_sections_resets_form() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    app.clone()
        .oneshot(post_form(
            "/sections/predict-churn",
            "recency=300&frequency=2&monetary=40",
        ))
        .await
        .unwrap();
    app.clone().oneshot(get("/sections/overview")).await.unwrap();

    let response = app.oneshot(get("/sections/predict-churn")).await.unwrap();
    let html = body_text(response.into_body()).await;
    assert!(html.contains("value='90'"));
    assert!(!html.contains("Prediction Result"));
}

#[tokio::test]
async fn test_malformed_form_is_rejected() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app
        .oneshot(post_form("/sections/predict-churn", "recency=soon"))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_section_is_not_found() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app.clone().oneshot(get("/sections/settings")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_form("/sections/overview", "recency=1&frequency=1&monetary=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the section is resolved before the body is parsed
    let response = app
        .oneshot(post_form("/sections/overview", "recency=soon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response.into_body()).await;
    assert!(html.contains("/sections/overview"));
}

#[tokio::test]
async fn test_unexpected_model_label_is_unprocessable() {
    let data = create_test_csv();
    // class 2 has no churn meaning
    let model = write_model(
        &[
            [10.0, 12.0, 900.0],
            [20.0, 10.0, 800.0],
            [200.0, 2.0, 50.0],
            [300.0, 1.0, 20.0],
        ],
        vec![0, 0, 2, 2],
    );
    let app = setup_app(&data, &model);

    let response = app
        .clone()
        .oneshot(post_form(
            "/sections/predict-churn",
            "recency=300&frequency=1&monetary=20",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let html = body_text(response.into_body()).await;
    assert!(html.contains("Prediction failed"));
    assert!(!html.contains("Prediction Result"));
    assert!(html.contains("value='300'"));

    let response = app.oneshot(get("/sections/overview")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (data, model) = (create_test_csv(), create_test_model());
    let app = setup_app(&data, &model);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "churnscope");
    assert_eq!(body["customers"], 6);
}

#[test]
fn test_missing_source_fails_initialization() {
    let model = create_test_model();
    let dir = tempfile::tempdir().unwrap();
    let cache = TableCache::new(dir.path().join("clustered_customers.csv"));

    let result = initialize(&cache, model.path());
    assert!(matches!(result, Err(LoadError::Missing { .. })));
}

#[test]
fn test_missing_model_fails_initialization() {
    let data = create_test_csv();
    let dir = tempfile::tempdir().unwrap();
    let cache = TableCache::new(data.path());

    let result = initialize(&cache, &dir.path().join("model.json"));
    assert!(matches!(result, Err(LoadError::Missing { .. })));
}

#[test]
fn test_loaded_table_churn_labels() {
    let data = create_test_csv();
    let table = TableCache::new(data.path()).load().unwrap();

    let flags: Vec<u8> = table.records().iter().map(|r| r.churn().as_flag()).collect();
    assert_eq!(flags, vec![0, 0, 1, 1, 1, 0]);
}
