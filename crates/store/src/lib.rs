//! JSON-file-backed catalog and order data provider.
//!
//! Implements the `ServiceAdapter` trait over two read-only JSON documents
//! (`ProductCatalog.json`, `CustomerOrders.json`). The store is loaded once
//! at startup and shared immutably; there is no write path.

pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use sierra_core::domain::order::{normalize_order_number, tracking_url, Order, TrackingStatus};
use sierra_core::domain::product::Product;
use sierra_core::{ServiceAdapter, ServiceError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read data file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse data file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

#[derive(Clone, Debug, Default)]
pub struct JsonStore {
    products: Vec<Product>,
    orders: Vec<Order>,
}

impl JsonStore {
    pub fn load(catalog_path: &Path, orders_path: &Path) -> Result<Self, StoreError> {
        let products: Vec<Product> = read_json(catalog_path)?;
        let orders: Vec<Order> = read_json(orders_path)?;
        info!(
            event_name = "store.loaded",
            products = products.len(),
            orders = orders.len(),
            "data store loaded"
        );
        Ok(Self { products, orders })
    }

    pub fn from_parts(products: Vec<Product>, orders: Vec<Order>) -> Self {
        Self { products, orders }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product_names(&self) -> Vec<String> {
        self.products.iter().map(|product| product.name.clone()).collect()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| StoreError::ReadFile { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| StoreError::ParseFile { path: path.to_path_buf(), source })
}

#[async_trait]
impl ServiceAdapter for JsonStore {
    async fn find_products(&self, query: &str) -> Result<Vec<Product>, ServiceError> {
        Ok(self
            .products
            .iter()
            .filter(|product| product.matches_query(query))
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
        let wanted = normalize_order_number(order_id);
        self.orders
            .iter()
            .find(|order| order.normalized_number() == wanted)
            .cloned()
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    async fn get_tracking(&self, tracking_number: &str) -> Result<TrackingStatus, ServiceError> {
        let wanted = tracking_number.trim().to_uppercase();
        self.orders
            .iter()
            .find(|order| {
                order
                    .tracking_number
                    .as_deref()
                    .is_some_and(|number| number.eq_ignore_ascii_case(&wanted))
            })
            .map(|order| TrackingStatus {
                tracking_number: wanted.clone(),
                order_number: order.order_number.clone(),
                status: order.status,
                tracking_url: tracking_url(&wanted),
            })
            .ok_or_else(|| ServiceError::tracking_not_found(tracking_number))
    }
}
