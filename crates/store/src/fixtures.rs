//! Deterministic demo data used by tests, the evaluation harness, and
//! `sierra doctor`. Mirrors the shipped `data/*.json` files.

use sierra_core::domain::order::{Order, OrderStatus};
use sierra_core::domain::product::Product;

use crate::JsonStore;

pub fn demo_store() -> JsonStore {
    JsonStore::from_parts(demo_products(), demo_orders())
}

pub fn demo_products() -> Vec<Product> {
    vec![
        Product {
            name: "Backcountry Blaze Backpack".to_string(),
            sku: "SOBP001".to_string(),
            inventory: 12,
            description: "A rugged 45L pack built for multi-day treks.".to_string(),
            tags: vec!["Backpack".to_string(), "Hiking".to_string()],
        },
        Product {
            name: "Summit Pro X Skis".to_string(),
            sku: "SOTN002".to_string(),
            inventory: 5,
            description: "Carving skis tuned for alpine descents.".to_string(),
            tags: vec!["Winter".to_string(), "Skiing".to_string()],
        },
        Product {
            name: "Nishita's Invisibility Cloak".to_string(),
            sku: "SOIC003".to_string(),
            inventory: 1,
            description: "Limited edition cloak. You won't see it coming.".to_string(),
            tags: vec!["Novelty".to_string(), "Apparel".to_string()],
        },
        Product {
            name: "Trailblazer Energy Bars".to_string(),
            sku: "SOEB004".to_string(),
            inventory: 140,
            description: "Protein-packed fuel for the trail, box of twelve.".to_string(),
            tags: vec!["Food".to_string(), "Hiking".to_string()],
        },
    ]
}

pub fn demo_orders() -> Vec<Order> {
    vec![
        Order {
            customer_name: "Val Kane".to_string(),
            email: "val@example.com".to_string(),
            order_number: "#W001".to_string(),
            products_ordered: vec!["SOBP001".to_string()],
            status: OrderStatus::Delivered,
            tracking_number: Some("TRK123456789".to_string()),
        },
        Order {
            customer_name: "Renata Ilves".to_string(),
            email: "renata@example.com".to_string(),
            order_number: "#W002".to_string(),
            products_ordered: vec!["SOTN002".to_string(), "SOEB004".to_string()],
            status: OrderStatus::InTransit,
            tracking_number: Some("TRK987654321".to_string()),
        },
        Order {
            customer_name: "Marcus Webb".to_string(),
            email: "marcus@example.com".to_string(),
            order_number: "#W003".to_string(),
            products_ordered: vec!["SOEB004".to_string()],
            status: OrderStatus::Fulfilled,
            tracking_number: None,
        },
        Order {
            customer_name: "Dana Frost".to_string(),
            email: "dana@example.com".to_string(),
            order_number: "#W004".to_string(),
            products_ordered: vec!["SOIC003".to_string()],
            status: OrderStatus::Error,
            tracking_number: None,
        },
    ]
}
