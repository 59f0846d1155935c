//! Booking endpoints behind the gate

use bookgate::booking::{Appointment, BookingConfig};
use bookgate::testing::{self, TestApp};
use chrono::Duration;
use serde_json::json;

#[tokio::test]
async fn test_create_and_fetch_appointment() {
    let test_app = TestApp::without_rate_limit();
    let app = test_app.router();
    let request = test_app.appointment().message("First visit").build();

    let created = testing::post(app.clone(), "/api/appointments")
        .json_body(&request)
        .execute()
        .await
        .assert_created()
        .assert_json();

    let location = created.header("location").unwrap();
    let appointment: Appointment = created.json().await;
    assert_eq!(location, format!("/api/appointments/{}", appointment.id));
    assert_eq!(appointment.service, "consultation");

    testing::get(app, &location)
        .execute()
        .await
        .assert_ok()
        .assert_json_path("status", json!("pending"))
        .await
        .assert_json_path("message", json!("First visit"))
        .await;
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let app = TestApp::without_rate_limit().router();

    testing::get(app.clone(), "/api/appointments/6f1c2a1e-9a43-4c8e-8f0b-2d4b5e6a7c8d")
        .execute()
        .await
        .assert_not_found();

    testing::get(app, "/api/appointments/not-a-uuid")
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_invalid_fields_are_rejected() {
    let test_app = TestApp::without_rate_limit();

    let response = testing::post(test_app.router(), "/api/appointments")
        .json_body(&json!({
            "name": "",
            "email": "not-an-email",
            "phone": "12",
            "service": "consultation",
            "preferredDate": "tomorrow"
        }))
        .execute()
        .await
        .assert_bad_request();

    let body: serde_json::Value = response.json().await;
    for field in ["name", "email", "phone", "preferredDate"] {
        assert!(body["field_errors"][field].is_array(), "missing error for {}", field);
    }
    assert_eq!(test_app.appointments_created().await, 0);
}

#[tokio::test]
async fn test_unknown_service_is_rejected() {
    let test_app = TestApp::without_rate_limit();

    let response = testing::post(test_app.router(), "/api/appointments")
        .json_body(&test_app.appointment().service("tattoo").build())
        .execute()
        .await
        .assert_bad_request();

    let body: serde_json::Value = response.json().await;
    assert!(body["field_errors"]["service"][0]
        .as_str()
        .unwrap()
        .contains("consultation"));
}

#[tokio::test]
async fn test_past_date_is_rejected() {
    let test_app = TestApp::without_rate_limit();
    let yesterday = (test_app.now() - Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    let today = test_app.now().format("%Y-%m-%d").to_string();

    let response = testing::post(test_app.router(), "/api/appointments")
        .json_body(&test_app.appointment().preferred_date(yesterday).build())
        .execute()
        .await
        .assert_bad_request();

    // Error keys use the same names as the request body
    let body: serde_json::Value = response.json().await;
    assert_eq!(
        body["field_errors"]["preferredDate"][0],
        "must not be in the past"
    );
    assert!(body["field_errors"]["preferred_date"].is_null());

    testing::post(test_app.router(), "/api/appointments")
        .json_body(&test_app.appointment().preferred_date(today).build())
        .execute()
        .await
        .assert_created();
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::without_rate_limit().router();

    testing::post(app, "/api/appointments")
        .header("content-type", "application/json")
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_services_come_from_config() {
    let test_app = TestApp::without_rate_limit().with_booking(BookingConfig {
        services: vec!["massage".to_string(), "facial".to_string()],
    });
    let app = test_app.router();

    testing::get(app.clone(), "/api/services")
        .execute()
        .await
        .assert_ok()
        .assert_json_path("services", json!(["massage", "facial"]))
        .await;

    testing::post(app, "/api/appointments")
        .json_body(&test_app.appointment().service("massage").build())
        .execute()
        .await
        .assert_created();
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::without_rate_limit().router();

    let response = testing::get(app.clone(), "/api/services").execute().await.assert_ok();
    assert!(response.header("x-request-id").is_some());

    testing::get(app, "/api/services")
        .header("x-request-id", "client-supplied")
        .execute()
        .await
        .assert_header("x-request-id", "client-supplied");
}
