use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{cors_layer, make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes and middleware
///
/// The request-id middleware wraps the trace layer so request spans can read the id.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin_list());

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
}

/// Routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/branches", get(handlers::branches))
        .route("/check-book", post(handlers::check_book))
        .route("/check-library", post(handlers::check_library))
        .route("/recommendations", get(handlers::recommendations))
        .route("/save-list", post(handlers::save_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        config::Config,
        middleware::REQUEST_ID_HEADER,
        services::{
            catalog::{MockAvailabilityRetriever, MockRecordLocator},
            shelves::MockShelfSource,
            summary::SummaryPolicy,
            LibraryChecker, RecommendationService,
        },
        store::MemoryStore,
    };

    fn test_router() -> Router {
        let checker = LibraryChecker::new(
            Arc::new(MockRecordLocator::new()),
            Arc::new(MockAvailabilityRetriever::new()),
            SummaryPolicy::new("PARK BRANCH", "SFPL"),
            Duration::ZERO,
        );
        let recommender = RecommendationService::new(Arc::new(MockShelfSource::new()), None, 1);
        let state = AppState::new(
            Config::default(),
            checker,
            recommender,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        );
        create_router(state)
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], id);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://shelf.lovable.app")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shelf.lovable.app"
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
