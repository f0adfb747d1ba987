mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use velo_server::providers::TokenVerification;

const ANGERS_START: [f64; 2] = [-0.55, 47.47];
const ANGERS_END: [f64; 2] = [-0.56, 47.48];

fn five_km() -> Directions {
    Directions::Route {
        distance: 5000.0,
        duration: 600.0,
    }
}

fn setup(routing: FakeRouting) -> TestApp {
    setup_with(
        routing,
        FakeWeather::failing(),
        FakeIdentity(TokenVerification::Failed("unused".into())),
    )
}

async fn plan(app: &TestApp, token: &str, body: Value) -> axum_test::TestResponse {
    app.server
        .post("/api/external/plan-route")
        .add_header(token_header(), token_value(token))
        .json(&body)
        .await
}

#[tokio::test]
async fn test_both_profiles_in_fixed_order() {
    let app = setup(FakeRouting::new().both(five_km()));
    let token = register(&app.server, "cyclist").await;

    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;

    response.assert_status_ok();
    response.assert_json(&json!([
        {
            "type": "rapide",
            "distance": "5.0",
            "duree": 10,
            "trace": [[-0.55, 47.47], [-0.56, 47.48]]
        },
        {
            "type": "securise",
            "distance": "5.0",
            "duree": 10,
            "trace": [[-0.55, 47.47], [-0.56, 47.48]]
        }
    ]));
}

#[tokio::test]
async fn test_each_profile_is_requested_once() {
    let app = setup(FakeRouting::new().both(five_km()));
    let token = register(&app.server, "cyclist").await;

    plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END}))
        .await
        .assert_status_ok();

    let mut profiles: Vec<_> = app
        .routing
        .requests()
        .into_iter()
        .map(|(profile, start, end)| {
            assert_eq!(start, ANGERS_START);
            assert_eq!(end, ANGERS_END);
            profile
        })
        .collect();
    profiles.sort();
    assert_eq!(profiles, ["cycling-regular", "cycling-road"]);
}

#[tokio::test]
async fn test_unit_conversion() {
    let app = setup(FakeRouting::new().both(Directions::Route {
        distance: 12345.0,
        duration: 905.0,
    }));
    let token = register(&app.server, "cyclist").await;

    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;

    let body: Value = response.json();
    assert_eq!(body[0]["distance"], "12.3");
    assert_eq!(body[0]["duree"], 15);
}

#[tokio::test]
async fn test_one_profile_failing() {
    let app = setup(
        FakeRouting::new()
            .answer("cycling-road", Directions::Fail)
            .answer("cycling-regular", five_km()),
    );
    let token = register(&app.server, "cyclist").await;

    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let routes = body.as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["type"], "securise");
}

#[tokio::test]
async fn test_one_profile_without_features() {
    let app = setup(
        FakeRouting::new()
            .answer("cycling-road", five_km())
            .answer("cycling-regular", Directions::NoFeatures),
    );
    let token = register(&app.server, "cyclist").await;

    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let routes = body.as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["type"], "rapide");
}

#[tokio::test]
async fn test_both_profiles_failing_is_still_ok() {
    let app = setup(FakeRouting::new().both(Directions::Fail));
    let token = register(&app.server, "cyclist").await;

    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
    assert_eq!(app.routing.calls(), 2);
}

#[tokio::test]
async fn test_missing_start_or_end() {
    let app = setup(FakeRouting::new().both(five_km()));
    let token = register(&app.server, "cyclist").await;

    for body in [
        json!({"end": ANGERS_END}),
        json!({"start": ANGERS_START}),
        json!({}),
    ] {
        let response = plan(&app, &token, body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "Error! 'start' and 'end' are required."}));
    }

    assert_eq!(app.routing.calls(), 0);
}

#[tokio::test]
async fn test_malformed_coordinates() {
    let app = setup(FakeRouting::new().both(five_km()));
    let token = register(&app.server, "cyclist").await;

    for body in [
        json!({"start": [1.0], "end": ANGERS_END}),
        json!({"start": "a", "end": ANGERS_END}),
        json!({"start": [1.0, 2.0, 5.0], "end": ANGERS_END}),
        json!({"start": ANGERS_START, "end": [null, 47.48]}),
    ] {
        let response = plan(&app, &token, body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert!(error["message"].is_string(), "unexpected body: {error}");
    }

    assert_eq!(app.routing.calls(), 0);
}

#[tokio::test]
async fn test_body_that_is_not_json() {
    let app = setup(FakeRouting::new().both(five_km()));
    let token = register(&app.server, "cyclist").await;

    let response = app
        .server
        .post("/api/external/plan-route")
        .add_header(token_header(), token_value(&token))
        .text("start=1,2")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].is_string());
    assert_eq!(app.routing.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_without_token() {
    let app = setup(FakeRouting::new().both(five_km()));

    let response = app
        .server
        .post("/api/external/plan-route")
        .json(&json!({"start": [1.0], "end": ANGERS_END}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({"message": "No token provided!"}));
}

#[tokio::test]
async fn test_profiles_run_in_parallel() {
    let app = setup(
        FakeRouting::new()
            .both(five_km())
            .with_delay(Duration::from_millis(200)),
    );
    let token = register(&app.server, "cyclist").await;

    let started = Instant::now();
    let response = plan(&app, &token, json!({"start": ANGERS_START, "end": ANGERS_END})).await;
    let elapsed = started.elapsed();

    response.assert_status_ok();
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 2);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(380), "took {elapsed:?}");
}

#[tokio::test]
async fn test_plan_route_requires_auth() {
    let app = setup(FakeRouting::new().both(five_km()));

    let response = app
        .server
        .post("/api/external/plan-route")
        .json(&json!({"start": ANGERS_START, "end": ANGERS_END}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.routing.calls(), 0);

    let body = json!({"start": ANGERS_START, "end": ANGERS_END});
    let response = plan(&app, "not-a-token", body).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(app.routing.calls(), 0);
}
