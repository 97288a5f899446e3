use serde::{Deserialize, Serialize};

/// One catalog entry. Field names mirror the `ProductCatalog.json` wire
/// format, which uses PascalCase keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ProductName")]
    pub name: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Inventory")]
    pub inventory: u32,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
}

impl Product {
    /// Case-insensitive substring match over name, SKU, description, and tags.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.sku.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
    }

    pub fn in_stock(&self) -> bool {
        self.inventory > 0
    }
}
