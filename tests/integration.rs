use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_dispatch::api::rest::router;
use courier_dispatch::config::Config;
use courier_dispatch::engine::notify::NotificationRequest;
use courier_dispatch::payments::simulator::spawn_payment_simulator;
use courier_dispatch::state::AppState;
use courier_dispatch::store::DocumentStore;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> (Router, mpsc::Receiver<NotificationRequest>) {
    let (state, rx) = AppState::new(Config::default().dispatch_settings(), 1024, 1024);
    (router(Arc::new(state)), rx)
}

async fn setup_with_payments() -> (Router, mpsc::Receiver<NotificationRequest>) {
    let (state, rx) = AppState::new(Config::default().dispatch_settings(), 1024, 1024);
    let state = Arc::new(state);
    let store = Arc::clone(&state.store) as Arc<dyn DocumentStore>;
    spawn_payment_simulator(store).await.unwrap();
    (router(state), rx)
}

fn json_request(method: &str, uri: &str, actor: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", actor.to_string())
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", Uuid::new_v4().to_string())
        .header("x-actor-role", "admin")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, actor: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn address(label: &str, lat: f64, lng: f64) -> Value {
    json!({
        "place_id": format!("place-{label}"),
        "formatted": format!("{label} street 1"),
        "coordinates": { "lat": lat, "lng": lng },
        "instructions": "ring twice",
    })
}

fn job_body(pickup_lat: f64) -> Value {
    json!({
        "sender_profile": { "kind": "individual", "first_name": "Sam", "last_name": "Sender" },
        "sender_phone": "+33100000000",
        "sender_address": address("sender", 48.8566, 2.3522),
        "receiver": {
            "name": "Rita Receiver",
            "phone": "+33100000001",
            "address": address("receiver", 48.8738, 2.2950),
        },
        "pickup": address("pickup", pickup_lat, 2.3522),
        "delivery": address("delivery", 48.8738, 2.2950),
        "schedule": { "date": "2026-11-02", "window_start": "09:00:00", "window_end": "12:00:00" },
        "package": {
            "description": "books",
            "weight_kg": 2.5,
            "dimensions": { "length_cm": 30.0, "width_cm": 20.0, "height_cm": 10.0 },
            "category": "parcel",
            "fragile": true,
        },
        "price": 25.50,
    })
}

async fn create_job(app: &Router, creator: Uuid) -> Value {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/jobs", creator, job_body(48.8566)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

async fn approved_agent(app: &Router, range_km: f64) -> Uuid {
    let agent = Uuid::new_v4();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/agents",
            agent,
            json!({
                "name": "Ada Agent",
                "home_address": address("home", 48.8600, 2.3400),
                "delivery_range_km": range_km,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(admin_request(
            "PATCH",
            &format!("/agents/{agent}/approval"),
            json!({ "approval": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    agent
}

async fn pay(app: &Router, creator: Uuid, job_id: &str) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/payment"),
            creator,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let session = body_json(res).await;
    assert_eq!(session["amount"], 2550);
    assert!(session["client_secret"].is_string());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/payments/webhook",
            Uuid::new_v4(),
            json!({ "session_id": session["id"], "outcome": "captured" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack = body_json(res).await;
    assert_eq!(ack["state"], "prepaid");
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"], 0);
    assert_eq!(body["agents"], 0);
    assert_eq!(body["checkout_sessions"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("acceptance_conflicts_total"));
    assert!(body.contains("active_subscriptions"));
}

#[tokio::test]
async fn create_job_returns_owner_view() {
    let (app, _rx) = setup();
    let creator = Uuid::new_v4();
    let body = create_job(&app, creator).await;

    assert_eq!(body["status"], "awaiting_agent");
    assert_eq!(body["state"], "awaiting_prepayment");
    assert_eq!(body["creator_id"], creator.to_string());
    assert!(body["agent_id"].is_null());
    assert_eq!(body["sender"]["name"], "Sam Sender");
    assert_eq!(body["secret_code"].as_str().unwrap().len(), 6);
    assert_eq!(body["reschedule_count"], 0);
    assert_eq!(body["max_reschedules"], 2);
    assert_eq!(body["pickup"]["approximate"], false);
}

#[tokio::test]
async fn create_job_without_actor_returns_400() {
    let (app, _rx) = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("content-type", "application/json")
        .body(Body::from(job_body(48.8566).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_job_with_invalid_coordinates_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request("POST", "/jobs", Uuid::new_v4(), job_body(95.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_coordinate");
}

#[tokio::test]
async fn get_nonexistent_job_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/jobs/{fake_id}"), Some(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_agent_cannot_go_online() {
    let (app, _rx) = setup();
    let agent = Uuid::new_v4();
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/agents",
            agent,
            json!({ "name": "Pat", "home_address": address("home", 48.86, 2.34) }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["approval_status"], "pending");
    assert_eq!(body["delivery_range_km"], 20.0);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/agents/{agent}/status"),
            agent,
            json!({ "status": "available" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_admins_review_agents() {
    let (app, _rx) = setup();
    let agent = Uuid::new_v4();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/agents",
            agent,
            json!({ "name": "Pat", "home_address": address("home", 48.86, 2.34) }),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/agents/{agent}/approval"),
            agent,
            json!({ "approval": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn agent_location_update() {
    let (app, _rx) = setup();
    let agent = approved_agent(&app, 10.0).await;

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/agents/{agent}/location"),
            agent,
            json!({ "location": { "lat": 48.85, "lng": 2.35 } }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["current_location"]["lat"], 48.85);
    assert_eq!(body["current_location"]["lng"], 2.35);
}

#[tokio::test]
async fn full_delivery_flow() {
    let (app, _rx) = setup_with_payments().await;
    let creator = Uuid::new_v4();
    let job = create_job(&app, creator).await;
    let job_id = job["id"].as_str().unwrap().to_string();
    let code = job["secret_code"].as_str().unwrap().to_string();

    pay(&app, creator, &job_id).await;

    let agent = approved_agent(&app, 10.0).await;
    let rival = approved_agent(&app, 10.0).await;

    let res = app
        .clone()
        .oneshot(get_request(
            &format!("/agents/{agent}/available-jobs"),
            Some(agent),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let available = body_json(res).await;
    let list = available.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], job_id);
    assert_eq!(list[0]["pickup"]["approximate"], true);
    assert!(list[0]["secret_code"].is_null());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/accept"),
            agent,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["status"], "agent_accepted");
    assert_eq!(accepted["state"], "processing");
    assert_eq!(accepted["agent_name"], "Ada Agent");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/accept"),
            rival,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["code"], "already_accepted");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/pickup"),
            agent,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "picked_up");

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/deliver"),
            agent,
            json!({ "secret_code": wrong }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/deliver"),
            agent,
            json!({ "secret_code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = body_json(res).await;
    assert_eq!(delivered["status"], "delivered");
    assert_eq!(delivered["state"], "completed");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/rating"),
            creator,
            json!({ "stars": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get_request(&format!("/agents/{agent}"), Some(agent)))
        .await
        .unwrap();
    let stats = body_json(res).await["stats"].clone();
    assert_eq!(stats["completed_count"], 1);
    assert_eq!(stats["rating"], 5.0);
    assert_eq!(stats["earnings"], 25.5);
}

#[tokio::test]
async fn edit_after_acceptance_is_refused() {
    let (app, _rx) = setup_with_payments().await;
    let creator = Uuid::new_v4();
    let job = create_job(&app, creator).await;
    let job_id = job["id"].as_str().unwrap().to_string();
    pay(&app, creator, &job_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}"),
            creator,
            json!({ "package": {
                "description": "more books",
                "weight_kg": 3.0,
                "dimensions": { "length_cm": 30.0, "width_cm": 20.0, "height_cm": 15.0 },
                "category": "parcel",
            } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["package"]["description"], "more books");

    let agent = approved_agent(&app, 10.0).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/accept"),
            agent,
            json!({}),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(get_request(
            &format!("/jobs/{job_id}/permissions"),
            Some(creator),
        ))
        .await
        .unwrap();
    let permissions = body_json(res).await;
    assert_eq!(permissions["can_edit"], false);
    assert!(
        permissions["reason"]
            .as_str()
            .unwrap()
            .contains("contact support")
    );

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/jobs/{job_id}"),
            creator,
            json!({ "price": 40.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(
        body_json(res).await["error"]
            .as_str()
            .unwrap()
            .contains("contact support")
    );
}

#[tokio::test]
async fn delete_job_by_owner_only() {
    let (app, _rx) = setup();
    let creator = Uuid::new_v4();
    let job = create_job(&app, creator).await;
    let job_id = job["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/jobs/{job_id}"),
            Uuid::new_v4(),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["error"], "not owner");

    let res = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/jobs/{job_id}"),
            creator,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["deleted"], true);

    let res = app
        .oneshot(get_request(
            &format!("/jobs/{job_id}/permissions"),
            Some(creator),
        ))
        .await
        .unwrap();
    let permissions = body_json(res).await;
    assert_eq!(permissions["can_delete"], false);
    assert_eq!(permissions["reason"], "already deleted");
}

#[tokio::test]
async fn reschedule_then_resume_over_rest() {
    let (app, _rx) = setup_with_payments().await;
    let creator = Uuid::new_v4();
    let job = create_job(&app, creator).await;
    let job_id = job["id"].as_str().unwrap().to_string();
    pay(&app, creator, &job_id).await;

    let agent = approved_agent(&app, 10.0).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/accept"),
            agent,
            json!({}),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/reschedule"),
            agent,
            json!({ "reason": "  receiver away  " }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "rescheduled");
    assert_eq!(body["reschedule_count"], 1);
    assert_eq!(body["reschedule_history"][0]["reason"], "receiver away");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/resume"),
            Uuid::new_v4(),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/jobs/{job_id}/resume"),
            agent,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "agent_accepted");
}
