use std::{sync::Arc, time::Duration};

use httpmock::prelude::*;
use serde_json::{json, Value};

use unirec_client::{
    app::{App, Destination, NoticeKind, Screen},
    config::Config,
    models::{Domain, ItemKey},
    services::{HttpApiClient, OnboardingOutcome},
    store::{KeyValueStore, MemoryStore, SessionStore},
};

const USER: &str = r#"{"id": 7, "name": "Ann", "email": "u@example.com", "quiz_responses": {"favorite_movie_genres": ["Drama"]}, "preferences": {"favorite_genres": ["Drama"]}}"#;

fn feed_body() -> Value {
    json!({
        "user_id": 7,
        "recommendations": [
            {"item_id": 42, "title": "Inception", "domain": "movies", "score": 0.95},
            {"item_id": 2, "title": "Sony WH-1000XM5", "domain": "products", "score": 0.92},
            {"item_id": 3, "title": "Bohemian Rhapsody", "domain": "music", "score": 0.89}
        ],
        "profile_summary": {"domains_engaged": ["movies"]}
    })
}

async fn mock_feed_and_status(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/recommendations/unified")
                .header("authorization", "Bearer T1");
            then.status(200).json_body(feed_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .json_body(json!({"status": "healthy", "models_loaded": {"movies": true}}));
        })
        .await;
}

fn app(base_url: &str, backend: Arc<MemoryStore>) -> App {
    let config = Config {
        api_base_url: base_url.to_string(),
        ..Config::default()
    };
    let api = HttpApiClient::new(base_url, Duration::from_secs(5)).unwrap();
    App::new(Arc::new(api), SessionStore::new(backend), &config)
}

#[tokio::test]
async fn test_login_enters_authenticated_app() {
    let server = MockServer::start_async().await;
    mock_feed_and_status(&server).await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/login")
                .json_body(json!({"email": "u@example.com", "password": "secret1"}));
            then.status(200)
                .json_body(json!({"access_token": "T1", "user": {"id": 7, "name": "Ann"}}));
        })
        .await;

    let backend = Arc::new(MemoryStore::new());
    let mut app = app(&server.base_url(), backend.clone());
    app.boot().unwrap();
    assert!(matches!(app.screen(), Screen::Landing));

    app.navigate(Destination::Login).unwrap();
    app.login("u@example.com", "secret1").await.unwrap();
    login.assert_async().await;

    assert!(app.is_authenticated());
    assert_eq!(backend.get("token").unwrap(), Some("T1".to_string()));
    assert_eq!(app.session().unwrap().user.name, "Ann");

    app.settle().await;
    let workspace = app.workspace().unwrap();
    assert_eq!(workspace.feed().items().len(), 3);
    assert!(workspace
        .feed()
        .items()
        .iter()
        .all(|item| (0.0..=1.0).contains(&item.score)));
    assert!(workspace.feed().profile_summary().is_some());
    assert_eq!(workspace.status().unwrap().status, "healthy");
}

#[tokio::test]
async fn test_failed_login_stays_on_auth_form() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(401)
                .json_body(json!({"detail": "Incorrect email or password"}));
        })
        .await;

    let backend = Arc::new(MemoryStore::new());
    let mut app = app(&server.base_url(), backend.clone());
    app.boot().unwrap();
    app.navigate(Destination::Login).unwrap();

    assert!(app.login("u@example.com", "secret1").await.is_err());
    assert!(matches!(app.screen(), Screen::Auth(_)));
    assert_eq!(
        app.auth().unwrap().error(),
        Some("Incorrect email or password")
    );
    assert_eq!(backend.get("token").unwrap(), None);
}

#[tokio::test]
async fn test_dislike_survives_logging_failure() {
    let server = MockServer::start_async().await;
    mock_feed_and_status(&server).await;
    let log = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/interactions/log")
                .header("authorization", "Bearer T1");
            then.status(500).body("Internal Server Error");
        })
        .await;

    let backend = Arc::new(MemoryStore::with_entries([("token", "T1"), ("user", USER)]));
    let mut app = app(&server.base_url(), backend);
    let mut diagnostics = app.subscribe_diagnostics();
    app.boot().unwrap();
    app.settle().await;
    assert_eq!(app.workspace().unwrap().feed().items().len(), 3);

    let disliked = ItemKey::new(Domain::Movies, 42);
    assert_eq!(app.dislike(disliked).unwrap(), 1);

    let feed = app.workspace().unwrap().feed();
    assert_eq!(feed.items().len(), 2);
    assert!(feed.find(disliked).is_none());
    let notices = app.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Success);

    let diagnostic = diagnostics.recv().await.unwrap();
    assert_eq!(diagnostic.event.key(), disliked);
    log.assert_async().await;

    // Disliking an item that is already gone changes nothing
    assert_eq!(app.dislike(disliked).unwrap(), 0);
    assert_eq!(app.workspace().unwrap().feed().items().len(), 2);
}

#[tokio::test]
async fn test_learn_failure_keeps_preferences() {
    let backend = Arc::new(MemoryStore::with_entries([("token", "T1"), ("user", USER)]));
    let mut app = app("http://127.0.0.1:9", backend);
    app.boot().unwrap();
    app.settle().await;

    let workspace = app.workspace().unwrap();
    assert!(workspace.feed().is_empty());
    assert!(!workspace.feed().is_loading());
    let before = workspace.user().profile.clone();
    app.drain_notices();

    assert!(app.learn_from_interactions(Some(30)).await.is_err());
    assert_eq!(app.workspace().unwrap().user().profile, before);
    assert_eq!(app.pending_requests(), 0);

    let notices = app.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert_eq!(
        notices[0].message,
        "Unable to reach the recommendation service"
    );
}

#[tokio::test]
async fn test_signup_submits_questionnaire_answers() {
    let server = MockServer::start_async().await;
    mock_feed_and_status(&server).await;
    let signup = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/signup").json_body(json!({
                "email": "u@example.com",
                "password": "secret1",
                "name": "Ann",
                "quiz_responses": {
                    "favorite_movie_genres": ["Action", "Comedy"],
                    "favorite_music_genres": ["Rock"],
                    "shopping_interests": ["Books"],
                    "learning_topics": ["Programming"],
                    "experience_level": "intermediate",
                    "budget_range": "medium"
                }
            }));
            then.status(200)
                .json_body(json!({"access_token": "T1", "user": {"id": 7, "name": "Ann"}}));
        })
        .await;

    let backend = Arc::new(MemoryStore::new());
    let mut app = app(&server.base_url(), backend.clone());
    app.boot().unwrap();
    app.navigate(Destination::Signup).unwrap();
    app.begin_signup("u@example.com", "secret1", "Ann").unwrap();

    let answers: [&[&str]; 4] = [&["Action", "Comedy"], &["Rock"], &["Books"], &["Programming"]];
    for options in answers {
        let wizard = app.wizard_mut().unwrap();
        for option in options {
            wizard.toggle_option(option).unwrap();
        }
        assert!(matches!(
            app.onboarding_next().await.unwrap(),
            OnboardingOutcome::Advanced(_)
        ));
    }
    app.wizard_mut().unwrap().select("intermediate").unwrap();
    app.onboarding_next().await.unwrap();
    assert_eq!(app.wizard_mut().unwrap().progress_percent(), 100);

    let outcome = app.onboarding_next().await.unwrap();
    assert!(matches!(outcome, OnboardingOutcome::Authenticated(_)));
    signup.assert_async().await;
    assert!(app.is_authenticated());
    assert_eq!(backend.get("token").unwrap(), Some("T1".to_string()));

    app.logout().unwrap();
    assert!(matches!(app.screen(), Screen::Landing));
    assert_eq!(backend.get("token").unwrap(), None);
    assert_eq!(backend.get("user").unwrap(), None);
}
