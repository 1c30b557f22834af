//! Endpoint directory routes

use axum::{Json, Router, extract::State, routing::get};
use bits_core::{EndpointsList, ViewKind};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

async fn serve_view(state: &AppState, kind: ViewKind) -> Result<Json<EndpointsList>, ApiError> {
    metrics::counter!("bits_endpoints_requests_total", "view" => kind.as_str()).increment(1);

    let endpoints = state.directory.get_view(kind).await?;
    Ok(Json(EndpointsList::from(endpoints)))
}

/// GET|POST /api/v1/endpoints
async fn active_endpoints(State(state): State<AppState>) -> Result<Json<EndpointsList>, ApiError> {
    serve_view(&state, ViewKind::Active).await
}

/// GET|POST /api/v1/endpoints/dated
async fn dated_endpoints(State(state): State<AppState>) -> Result<Json<EndpointsList>, ApiError> {
    serve_view(&state, ViewKind::Dated).await
}

/// GET|POST /api/v1/endpoints/refresh
async fn refresh_endpoints(
    State(state): State<AppState>,
) -> Result<Json<EndpointsList>, ApiError> {
    metrics::counter!("bits_endpoints_requests_total", "view" => "refresh").increment(1);
    info!("Refreshing endpoint registry on request");

    let stored = state.directory.read_endpoints_and_cache().await?;
    Ok(Json(EndpointsList::from(stored.as_ref().clone())))
}

/// Create endpoint directory routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/endpoints",
            get(active_endpoints).post(active_endpoints),
        )
        .route(
            "/api/v1/endpoints/dated",
            get(dated_endpoints).post(dated_endpoints),
        )
        .route(
            "/api/v1/endpoints/refresh",
            get(refresh_endpoints).post(refresh_endpoints),
        )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{REGISTRY, body_json, create_test_state, send};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_active_view_payload() {
        let (state, _) = create_test_state(Some(REGISTRY));

        let response = send(state, get("/api/v1/endpoints")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "endpoints": [{
                    "orgNo": "910000001",
                    "name": "Bank A, ASA",
                    "url": "https://a.example/api",
                    "version": "v2",
                    "env": "test"
                }],
                "total": 1
            })
        );
    }

    #[tokio::test]
    async fn test_dated_view_includes_future_endpoint() {
        let (state, _) = create_test_state(Some(REGISTRY));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/endpoints/dated")
            .body(Body::empty())
            .unwrap();
        let body = body_json(send(state, request).await).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["endpoints"][1]["orgNo"], "910000002");
        assert_eq!(body["endpoints"][1]["fromDate"], "2024-06-30T22:00:00Z");
        assert!(body["endpoints"][1].get("toDate").is_none());
    }

    #[tokio::test]
    async fn test_reads_share_cached_registry() {
        let (state, source) = create_test_state(Some(REGISTRY));

        send(state.clone(), get("/api/v1/endpoints")).await;
        send(state.clone(), get("/api/v1/endpoints/dated")).await;
        send(state, get("/api/v1/endpoints")).await;

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_returns_unfiltered_superset() {
        let (state, source) = create_test_state(Some(REGISTRY));

        send(state.clone(), get("/api/v1/endpoints")).await;
        let response = send(state, get("/api/v1/endpoints/refresh")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["endpoints"][2]["toDate"], "2024-05-01T00:00:00Z");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_service_unavailable() {
        let (state, _) = create_test_state(None);

        let response = send(state, get("/api/v1/endpoints")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_parse_failure_is_service_unavailable() {
        let (state, _) = create_test_state(Some(
            "OrgNummer,Navn,Url,Version,FromDate,ToDate\n1,Bank,https://x,v2,not-a-date,\n",
        ));

        let response = send(state, get("/api/v1/endpoints/dated")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], "UNABLE_TO_PARSE_RESPONSE");
    }
}
