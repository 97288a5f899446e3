use serde::{Deserialize, Serialize};

const USPS_TRACKING_BASE: &str = "https://tools.usps.com/go/TrackConfirmAction?tLabels=";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Delivered,
    InTransit,
    Fulfilled,
    Error,
}

impl OrderStatus {
    /// Customer-facing phrasing for a raw status value.
    pub fn readable(&self) -> &'static str {
        match self {
            Self::Delivered => "The order has been delivered",
            Self::InTransit => "The order is on its way",
            Self::Fulfilled => "The order has been processed and is ready for shipping",
            Self::Error => "There was an issue with the order",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::InTransit => "in-transit",
            Self::Fulfilled => "fulfilled",
            Self::Error => "error",
        }
    }
}

/// One customer order. Field names mirror the `CustomerOrders.json` wire
/// format. Order numbers are stored with their leading `#` as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "CustomerName")]
    pub customer_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "OrderNumber")]
    pub order_number: String,
    #[serde(rename = "ProductsOrdered")]
    pub products_ordered: Vec<String>,
    #[serde(rename = "Status")]
    pub status: OrderStatus,
    #[serde(rename = "TrackingNumber")]
    pub tracking_number: Option<String>,
}

impl Order {
    /// Order number without the leading `#`, uppercased, for comparisons.
    pub fn normalized_number(&self) -> String {
        normalize_order_number(&self.order_number)
    }

    pub fn tracking_url(&self) -> Option<String> {
        self.tracking_number.as_deref().map(tracking_url)
    }
}

/// Result of a tracking-number lookup, resolved from the owning order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub tracking_number: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub tracking_url: String,
}

pub fn normalize_order_number(raw: &str) -> String {
    raw.trim().trim_start_matches('#').to_uppercase()
}

pub fn tracking_url(tracking_number: &str) -> String {
    format!("{USPS_TRACKING_BASE}{tracking_number}")
}
