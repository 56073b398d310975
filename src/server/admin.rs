//! Session administration routes.
//!
//! Mounted only when an admin token is configured. Every request must carry
//! `Authorization: Bearer <token>`.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use super::state::{GuardedSessionRegistry, ServerState};
use crate::session::Session;

#[derive(Serialize)]
struct SessionsListing {
    count: usize,
    sessions: Vec<Session>,
}

async fn require_admin_token(
    State(token): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|provided| provided.trim() == token);

    if !authorized {
        warn!("Rejected admin request to {}", request.uri().path());
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn list_sessions(State(sessions): State<GuardedSessionRegistry>) -> impl IntoResponse {
    let mut sessions: Vec<Session> = sessions.list_all().await.into_values().collect();
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(SessionsListing {
        count: sessions.len(),
        sessions,
    })
}

async fn get_session(
    State(sessions): State<GuardedSessionRegistry>,
    Path(id): Path<String>,
) -> Response {
    match sessions.get(&id).await {
        Some(session) => Json(session).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_session(
    State(sessions): State<GuardedSessionRegistry>,
    Path(id): Path<String>,
) -> StatusCode {
    if sessions.remove(&id).await {
        info!("Session {} removed by admin", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn make_admin_routes(state: ServerState, token: String) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .layer(middleware::from_fn_with_state(token, require_admin_token))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentPolicy;
    use crate::mcp::testing::Fixture;
    use crate::mcp::{create_mcp_state, McpSettings};
    use crate::server::ServerConfig;
    use crate::session::TransportKind;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn admin_app(fixture: &Fixture) -> Router {
        let mcp_state = create_mcp_state(
            fixture.catalog.clone(),
            fixture.sessions.clone(),
            fixture.upstream.clone(),
            McpSettings {
                transport: TransportKind::Http,
                default_mode: "managed".to_string(),
                consent_policy: ConsentPolicy::default(),
                consent_timeout: Duration::from_secs(5),
            },
        );
        let state = ServerState::new(ServerConfig::default(), Arc::new(mcp_state));
        make_admin_routes(state, "secret".to_string())
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_token() {
        let fixture = Fixture::new();
        let app = admin_app(&fixture);

        let response = app
            .clone()
            .oneshot(request("GET", "/sessions", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(request("GET", "/sessions", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lists_gets_and_deletes_sessions() {
        let fixture = Fixture::new();
        let identity = Fixture::identity("10.0.0.1", 5000, "managed");
        let session = fixture.sessions.get_or_create(&identity).await;
        let app = admin_app(&fixture);

        let response = app
            .clone()
            .oneshot(request("GET", "/sessions", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let listing: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(listing["count"], 1);
        assert_eq!(listing["sessions"][0]["id"], session.id.as_str());

        let uri = format!("/sessions/{}", session.id);
        let response = app
            .clone()
            .oneshot(request("GET", &uri, Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(fixture.sessions.get(&session.id).await.is_none());

        let response = app
            .oneshot(request("DELETE", &uri, Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
