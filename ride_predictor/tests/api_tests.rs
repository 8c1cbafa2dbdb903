//! HTTP tests against the router with the bundled demo model.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ride_predictor::{model::Model, router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let dir = env!("CARGO_MANIFEST_DIR");
    let mdl = Model::load(
        format!("{}/models/xgb_model.json", dir),
        format!("{}/models/meta.json", dir),
    )
    .unwrap();
    router(AppState::new(mdl).with_log_pred(true))
}

fn completed_ride() -> Value {
    json!({
        "Date": "2024-08-23 09:10:00",
        "Vehicle_Type": "Prime Sedan",
        "Pickup_Location": "Hebbal",
        "Drop_Location": "Koramangala",
        "V_TAT": 98.0,
        "C_TAT": 42.0,
        "Booking_Value": 320,
        "Payment_Method": "UPI",
        "Ride_Distance": 18,
        "Driver_Ratings": 4.5,
        "Customer_Rating": 4.8
    })
}

fn driver_cancelled() -> Value {
    json!({
        "Date": "2024-08-25 14:30:00",
        "Vehicle_Type": "Auto",
        "Pickup_Location": "Hebbal",
        "Drop_Location": "Jayanagar",
        "V_TAT": null,
        "C_TAT": null,
        "Booking_Value": 110,
        "Payment_Method": null,
        "Ride_Distance": 6,
        "Driver_Ratings": null,
        "Customer_Rating": null
    })
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(app(), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "API is live" }));
}

#[tokio::test]
async fn test_predict_single() {
    let (status, body) = call(app(), "POST", "/predict", Some(completed_ride())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "prediction": "Success" }));
}

#[tokio::test]
async fn test_predict_batch_keeps_order() {
    let mut customer_cancelled = completed_ride();
    customer_cancelled["C_TAT"] = Value::Null;
    let mut incomplete = completed_ride();
    incomplete["Driver_Ratings"] = json!(0.0);

    let batch = json!([driver_cancelled(), completed_ride(), customer_cancelled, incomplete]);
    let (status, body) = call(app(), "POST", "/predict-batch", Some(batch)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "predictions": ["Canceled by Driver", "Success", "Canceled by Customer", "Incomplete"] })
    );
}

#[tokio::test]
async fn test_bad_date_is_unprocessable() {
    let mut ride = completed_ride();
    ride["Date"] = json!("not-a-date");

    let (status, body) = call(app(), "POST", "/predict", Some(ride)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("not-a-date"), "error should name the value: {}", msg);
}

#[tokio::test]
async fn test_bad_date_aborts_batch() {
    let mut bad = completed_ride();
    bad["Date"] = json!("2024/08/25 14:30");
    let batch = json!([completed_ride(), bad]);

    let (status, body) = call(app(), "POST", "/predict-batch", Some(batch)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.get("predictions").is_none());
    assert!(body["error"].as_str().unwrap().starts_with("row 1"));
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let (status, body) = call(app(), "POST", "/predict-batch", Some(json!([]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_schema_mismatch_is_a_client_error() {
    let mut ride = completed_ride();
    ride.as_object_mut().unwrap().remove("Ride_Distance");

    let (status, _) = call(app(), "POST", "/predict", Some(ride)).await;
    assert!(status.is_client_error(), "got {}", status);
}
