use async_trait::async_trait;

use crate::domain::order::{Order, TrackingStatus};
use crate::domain::product::Product;
use crate::errors::ServiceError;

/// Typed call surface of the catalog/order data provider. The dialogue core
/// only ever consumes this trait; storage and transport live behind it.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Products matching a free-text query; an empty query returns the full
    /// catalog.
    async fn find_products(&self, query: &str) -> Result<Vec<Product>, ServiceError>;

    /// Order lookup by order number, tolerant of a leading `#`.
    async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError>;

    /// Tracking lookup by tracking number.
    async fn get_tracking(&self, tracking_number: &str) -> Result<TrackingStatus, ServiceError>;
}
