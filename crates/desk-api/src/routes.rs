//! # Routes
//!
//! Axum router configuration for the terminal API.
//! Everything under `/api/v1` except login sits behind the session
//! middleware; the OAuth callback stays public because Square redirects
//! the browser into it.

use crate::handlers;
use crate::session;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Auth:
///   - POST /api/v1/login - Operator login (public)
///   - POST /api/v1/logout - Drop the session
///
/// - Profiles (session required):
///   - GET    /api/v1/profiles - List profiles (tokens masked)
///   - POST   /api/v1/profiles - Create profile
///   - PUT    /api/v1/profiles/{id} - Update profile
///   - DELETE /api/v1/profiles/{id} - Delete profile (last one is refused)
///   - POST   /api/v1/profiles/{id}/activate - Switch active profile
///   - GET    /api/v1/transactions - Active profile's transaction log
///
/// - Payments (session required):
///   - POST /api/v1/charge - Manual card payment
///   - POST /api/v1/links - Create payment link
///
/// - OAuth onboarding:
///   - GET /oauth/authorize - Redirect to Square consent (session required)
///   - GET /oauth/callback - Square redirects back here (public, state-checked)
///
/// - GET /health - Health check
/// - Static frontend from `public/`
pub fn create_router(state: AppState) -> Router {
    // CORS: the frontend is served from this same process, but the operator
    // UI is occasionally pointed at a staging backend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected_api = Router::new()
        .route("/logout", post(handlers::logout))
        .route(
            "/profiles",
            get(handlers::list_profiles).post(handlers::create_profile),
        )
        .route(
            "/profiles/{profile_id}",
            put(handlers::update_profile).delete(handlers::delete_profile),
        )
        .route(
            "/profiles/{profile_id}/activate",
            post(handlers::activate_profile),
        )
        .route("/transactions", get(handlers::list_transactions))
        .route("/charge", post(handlers::charge))
        .route("/links", post(handlers::create_link))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    let api_routes = Router::new()
        .route("/login", post(handlers::login))
        .merge(protected_api);

    let oauth_routes = Router::new()
        .route("/authorize", get(handlers::oauth_authorize))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ))
        .route("/callback", get(handlers::oauth_callback));

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // OAuth onboarding
        .nest("/oauth", oauth_routes)
        // Operator frontend
        .fallback_service(ServeDir::new("public"))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use desk_core::{Environment, NullPersistence, Profile, ProfileStore};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let profile = Profile::new(
            "Test Cart",
            "EAAAtok_0123456789",
            "sandbox-sq0idb-x",
            "L1",
            Environment::Sandbox,
        );
        AppState::with_store(
            ProfileStore::new(profile),
            Arc::new(NullPersistence),
            AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                base_url: "http://localhost".to_string(),
                environment: "test".to_string(),
                admin_password: "hunter2".to_string(),
                session_key: "test_key".to_string(),
                session_ttl_minutes: 60,
                store_var: "DESK_TEST_ROUTES".to_string(),
                hosted_env_api_url: None,
                hosted_env_api_token: None,
            },
        )
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let server = axum_test::TestServer::new(create_router(test_state())).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_json_contains(&serde_json::json!({ "service": "charge-desk" }));
    }

    #[tokio::test]
    async fn test_profiles_require_session() {
        let server = axum_test::TestServer::new(create_router(test_state())).unwrap();

        let response = server.get("/api/v1/profiles").await;
        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_login_then_list_profiles() {
        let state = test_state();
        let server = axum_test::TestServer::new(create_router(state)).unwrap();

        let bad = server
            .post("/api/v1/login")
            .json(&serde_json::json!({ "password": "wrong" }))
            .await;
        bad.assert_status_unauthorized();

        let login = server
            .post("/api/v1/login")
            .json(&serde_json::json!({ "password": "hunter2" }))
            .await;
        login.assert_status_ok();

        let cookie = login.cookie(crate::session::SESSION_COOKIE);

        let response = server
            .get("/api/v1/profiles")
            .add_cookie(cookie)
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["count"], 1);
        // Raw token never leaves the store
        assert!(!body.to_string().contains("EAAAtok_0123456789"));
    }

    #[tokio::test]
    async fn test_delete_last_profile_conflict() {
        let state = test_state();
        let profile_id = state.store.read().await.active_id.clone();
        let server = axum_test::TestServer::new(create_router(state)).unwrap();

        let login = server
            .post("/api/v1/login")
            .json(&serde_json::json!({ "password": "hunter2" }))
            .await;
        let cookie = login.cookie(crate::session::SESSION_COOKIE);

        let response = server
            .delete(&format!("/api/v1/profiles/{}", profile_id))
            .add_cookie(cookie)
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_oauth_authorize_unconfigured() {
        let server = axum_test::TestServer::new(create_router(test_state())).unwrap();

        let login = server
            .post("/api/v1/login")
            .json(&serde_json::json!({ "password": "hunter2" }))
            .await;
        let cookie = login.cookie(crate::session::SESSION_COOKIE);

        let response = server.get("/oauth/authorize").add_cookie(cookie).await;
        response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
