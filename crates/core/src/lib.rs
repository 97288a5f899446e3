pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod patterns;
pub mod services;

pub use catalog::{CatalogIndex, CatalogMatch};
pub use domain::order::{Order, OrderStatus, TrackingStatus};
pub use domain::product::Product;
pub use errors::ServiceError;
pub use patterns::PatternLibrary;
pub use services::ServiceAdapter;
