//! JSON API routes.
//!
//! - `GET  /health`         — readiness plus data-store counts
//! - `GET  /products`       — catalog listing (`query`, `tag`, `min_inventory` filters)
//! - `GET  /products/{sku}` — single catalog entry
//! - `GET  /orders`         — order listing (`customer_email`, `order_number` filters)
//! - `POST /chat`           — one dialogue turn against a session

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use sierra_agent::SessionStatus;
use sierra_core::domain::order::normalize_order_number;
use sierra_core::{Order, Product};

use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub products: usize,
    pub orders: usize,
    pub checked_at: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub query: Option<String>,
    pub tag: Option<String>,
    pub min_inventory: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub customer_email: Option<String>,
    pub order_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: String,
    pub status: SessionStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/products", get(list_products))
        .route("/products/{sku}", get(get_product))
        .route("/orders", get(list_orders))
        .route("/chat", post(chat))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        products: state.store.products().len(),
        orders: state.store.orders().len(),
        checked_at: Utc::now().to_rfc3339(),
    })
}

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Json<Vec<Product>> {
    let products = state
        .store
        .products()
        .iter()
        .filter(|product| {
            filter.query.as_deref().map_or(true, |query| product.matches_query(query))
        })
        .filter(|product| {
            filter.tag.as_deref().map_or(true, |tag| {
                product.tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag))
            })
        })
        .filter(|product| {
            filter.min_inventory.map_or(true, |minimum| product.inventory >= minimum)
        })
        .cloned()
        .collect();
    Json(products)
}

async fn get_product(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<Product>, (StatusCode, Json<ApiError>)> {
    state
        .store
        .products()
        .iter()
        .find(|product| product.sku.eq_ignore_ascii_case(&sku))
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError { error: format!("no product with sku `{sku}`") }),
            )
        })
}

async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Json<Vec<Order>> {
    let wanted_number = filter.order_number.as_deref().map(normalize_order_number);
    let orders = state
        .store
        .orders()
        .iter()
        .filter(|order| {
            filter
                .customer_email
                .as_deref()
                .map_or(true, |email| order.email.eq_ignore_ascii_case(email))
        })
        .filter(|order| {
            wanted_number.as_deref().map_or(true, |number| order.normalized_number() == number)
        })
        .cloned()
        .collect();
    Json(orders)
}

/// One dialogue turn. An omitted `session_id` begins a new session. The
/// session's entry is taken out of the map before processing and put back
/// after, so the registry lock is never held across the turn and
/// independent sessions proceed concurrently.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);

    let previous = state.sessions.lock().await.remove(&session_id);
    let turn = state.processor.process(previous, &request.message).await;
    let status = turn.state.status;
    state.sessions.lock().await.insert(session_id, turn.state);

    info!(
        event_name = "chat.turn",
        session_id = %session_id,
        status = ?status,
        "processed chat turn"
    );

    Json(ChatResponse { session_id, reply: turn.reply, status })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tokio::sync::Mutex;
    use tower::ServiceExt;
    use uuid::Uuid;

    use sierra_agent::TurnProcessor;
    use sierra_core::config::AppConfig;
    use sierra_core::{CatalogIndex, Order, Product, ServiceAdapter, ServiceError, TrackingStatus};
    use sierra_store::fixtures;

    use crate::bootstrap::AppState;

    fn router_with(services: Arc<dyn ServiceAdapter>) -> Router {
        let store = Arc::new(fixtures::demo_store());
        let catalog = CatalogIndex::new(store.product_names());
        let config = AppConfig::default();
        let processor = Arc::new(TurnProcessor::new(&config, catalog, services, None));
        super::router(AppState {
            store,
            processor,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn test_router() -> Router {
        router_with(Arc::new(fixtures::demo_store()))
    }

    /// Adapter that simulates a slow backend.
    struct SlowAdapter {
        inner: sierra_store::JsonStore,
        delay: Duration,
    }

    #[async_trait]
    impl ServiceAdapter for SlowAdapter {
        async fn find_products(&self, query: &str) -> Result<Vec<Product>, ServiceError> {
            tokio::time::sleep(self.delay).await;
            self.inner.find_products(query).await
        }

        async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_order(order_id).await
        }

        async fn get_tracking(
            &self,
            tracking_number: &str,
        ) -> Result<TrackingStatus, ServiceError> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_tracking(tracking_number).await
        }
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(
        router: &Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_store_counts() {
        let router = test_router();
        let (status, payload) = get_json(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["products"], 4);
        assert_eq!(payload["orders"], 4);
    }

    #[tokio::test]
    async fn products_endpoint_applies_filters() {
        let router = test_router();

        let (_, all) = get_json(&router, "/products").await;
        assert_eq!(all.as_array().unwrap().len(), 4);

        let (_, hiking) = get_json(&router, "/products?tag=hiking").await;
        assert_eq!(hiking.as_array().unwrap().len(), 2);

        let (_, stocked) = get_json(&router, "/products?min_inventory=10").await;
        assert_eq!(stocked.as_array().unwrap().len(), 2);

        let (_, skis) = get_json(&router, "/products?query=skis").await;
        assert_eq!(skis.as_array().unwrap().len(), 1);
        assert_eq!(skis[0]["SKU"], "SOTN002");
    }

    #[tokio::test]
    async fn product_lookup_by_sku() {
        let router = test_router();

        let (status, product) = get_json(&router, "/products/sobp001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(product["ProductName"], "Backcountry Blaze Backpack");

        let (status, error) = get_json(&router, "/products/NOPE999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error["error"].as_str().unwrap().contains("NOPE999"));
    }

    #[tokio::test]
    async fn orders_endpoint_applies_filters() {
        let router = test_router();

        let (_, by_number) = get_json(&router, "/orders?order_number=w002").await;
        assert_eq!(by_number.as_array().unwrap().len(), 1);
        assert_eq!(by_number[0]["OrderNumber"], "#W002");

        let (_, by_email) = get_json(&router, "/orders?customer_email=val@example.com").await;
        assert_eq!(by_email.as_array().unwrap().len(), 1);
        assert_eq!(by_email[0]["CustomerName"], "Val Kane");

        let (_, none) = get_json(&router, "/orders?order_number=W999").await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_threads_state_through_a_session() {
        let router = test_router();

        let (status, first) = post_json(
            &router,
            "/chat",
            serde_json::json!({ "message": "what's my order status?" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(first["reply"].as_str().unwrap().contains("order number"));
        let session_id: Uuid =
            first["session_id"].as_str().unwrap().parse().expect("session id is a uuid");

        let (_, second) = post_json(
            &router,
            "/chat",
            serde_json::json!({ "session_id": session_id, "message": "#W001" }),
        )
        .await;
        assert_eq!(second["session_id"], first["session_id"]);
        assert!(second["reply"].as_str().unwrap().contains("The order has been delivered"));
        assert_eq!(second["status"], "active");
    }

    #[tokio::test]
    async fn concurrent_sessions_overlap_the_backend_wait() {
        let delay = Duration::from_millis(300);
        let router =
            router_with(Arc::new(SlowAdapter { inner: fixtures::demo_store(), delay }));

        let started = Instant::now();
        let (first, second) = tokio::join!(
            post_json(&router, "/chat", serde_json::json!({ "message": "status of order W001" })),
            post_json(&router, "/chat", serde_json::json!({ "message": "status of order W002" })),
        );
        let elapsed = started.elapsed();

        assert!(first.1["reply"].as_str().unwrap().contains("delivered"));
        assert!(second.1["reply"].as_str().unwrap().contains("on its way"));
        assert_ne!(first.1["session_id"], second.1["session_id"]);
        assert!(
            elapsed < delay * 2,
            "independent sessions should not serialize behind each other, took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn chat_exit_keyword_terminates_the_session() {
        let router = test_router();

        let (_, first) = post_json(&router, "/chat", serde_json::json!({ "message": "bye" })).await;
        assert_eq!(first["status"], "terminated");

        let (_, after) = post_json(
            &router,
            "/chat",
            serde_json::json!({
                "session_id": first["session_id"],
                "message": "hello again?"
            }),
        )
        .await;
        assert_eq!(after["status"], "terminated");
        assert!(after["reply"].as_str().unwrap().contains("session has ended"));
    }
}
