use actix_web::{test, web, App};
use chrono::DateTime;
use stable_auth::routes;

mod common;

#[actix_web::test]
async fn test_health_check() {
    let (state, _) = common::state().await;

    // Create test app
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes),
    )
    .await;

    // Send request
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    // Assert response
    assert!(resp.status().is_success());

    // Parse response body
    let body = test::read_body(resp).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // Verify response format
    assert_eq!(json["status"], "healthy");
    assert!(DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
}

#[actix_web::test]
async fn test_health_check_needs_no_credentials() {
    let (state, _) = common::state().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
