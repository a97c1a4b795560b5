use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A stocked product as exposed to the inventory lookup. `in_stock` is
/// derived from the quantity, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub next_restock_date: Option<NaiveDate>,
}

impl InventoryItem {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Product categories with a dedicated return policy. Anything outside the
/// known set falls back to the standard policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Furniture,
}

pub const STANDARD_RETURN_POLICY: &str = "Standard 30-day return policy applies.";

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Clothing => "clothing",
            Self::Furniture => "furniture",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "electronics" => Some(Self::Electronics),
            "clothing" => Some(Self::Clothing),
            "furniture" => Some(Self::Furniture),
            _ => None,
        }
    }

    pub fn return_policy(&self) -> &'static str {
        match self {
            Self::Electronics => {
                "30-day return window. Items must include original packaging."
            }
            Self::Clothing => "60-day return window. Items must have tags attached.",
            Self::Furniture => "14-day return window. Assembly affects eligibility.",
        }
    }

    /// Policy text for an arbitrary customer-supplied category string.
    pub fn policy_for(value: &str) -> &'static str {
        match Self::parse(value) {
            Some(category) => category.return_policy(),
            None => STANDARD_RETURN_POLICY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InventoryItem, ProductCategory, ProductId, STANDARD_RETURN_POLICY};

    #[test]
    fn stock_is_derived_from_quantity() {
        let mut item = InventoryItem {
            product_id: ProductId("XYZ".to_string()),
            name: "Wireless Headphones".to_string(),
            quantity: 12,
            next_restock_date: None,
        };
        assert!(item.in_stock());
        item.quantity = 0;
        assert!(!item.in_stock());
    }

    #[test]
    fn known_categories_have_dedicated_policies() {
        assert!(ProductCategory::policy_for("electronics").contains("30-day"));
        assert!(ProductCategory::policy_for("Clothing").contains("60-day"));
        assert!(ProductCategory::policy_for(" furniture ").contains("14-day"));
    }

    #[test]
    fn unknown_categories_fall_back_to_standard_policy() {
        assert_eq!(ProductCategory::policy_for("houseplants"), STANDARD_RETURN_POLICY);
        assert_eq!(ProductCategory::policy_for(""), STANDARD_RETURN_POLICY);
    }
}
