use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/state", get(handlers::stream_state))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/frame", get(handlers::frame))
        .route("/message", post(handlers::message))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    use crate::{app_state::AppState, config::AppConfig};

    use super::build_router;

    fn router() -> axum::Router {
        let config = AppConfig {
            app_name: "MJPEG Viewer".to_string(),
            bind_addr: "127.0.0.1:8080"
                .parse::<SocketAddr>()
                .expect("socket addr should parse"),
            stream_url: None,
            default_stream_path: "/stream".to_string(),
            max_frame_bytes: None,
            user_agent: "mjpeg-viewer-test".to_string(),
            connect_timeout: Duration::from_secs(1),
            log_dir: PathBuf::from("logs"),
        };
        build_router(Arc::new(AppState::new(config).expect("state should build")))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn state_starts_idle() {
        let response = router()
            .oneshot(Request::get("/state").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("state should be json");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["message"], "Idle");
        assert_eq!(json["is_error"], false);
    }

    #[tokio::test]
    async fn start_form_with_bad_url_is_rejected() {
        let request = Request::post("/start")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("url=ftp%3A%2F%2Fcam.local"))
            .expect("request");
        let response = router()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stop_while_idle_is_fine() {
        let response = router()
            .oneshot(Request::post("/stop").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
