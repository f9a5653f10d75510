//! Catalog types.

use serde::{Deserialize, Serialize};

use crate::{CategoryId, Money, ProductId};

/// Current price plus the previous one when the product is discounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub current: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Money>,
}

impl Price {
    pub fn new(current: Money) -> Self {
        Self { current, old: None }
    }

    /// Whole percentage by which the old price exceeds the current one.
    ///
    /// Returns zero when there is no old price or it is not higher.
    /// Computed in `i128` so extreme prices cannot overflow.
    pub fn discount_percent(&self) -> i64 {
        match self.old {
            Some(old) if old.cents() > 0 && old > self.current => {
                let old = i128::from(old.cents());
                let current = i128::from(self.current.cents());
                // At most 100 when current is non-negative.
                i64::try_from((old - current) * 100 / old).unwrap_or(i64::MAX)
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category_id: CategoryId,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(default)]
    pub description: String,
    /// Units on hand. Never negative.
    pub quantity: i32,
}

/// Fields required to insert a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: CategoryId,
    pub price: Price,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Optional price constraints applied to catalog searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Minimum discount, as a whole percentage of the old price.
    pub min_discount: Option<i64>,
}

impl ProductFilter {
    /// Returns true if the product satisfies every constraint that is set.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(min) = self.min_price
            && product.price.current < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price.current > max
        {
            return false;
        }
        if let Some(discount) = self.min_discount
            && discount > 0
            && product.price.discount_percent() < discount
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(current: i64, old: Option<i64>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Lamp".to_string(),
            category_id: CategoryId::new(1),
            price: Price {
                current: Money::from_cents(current),
                old: old.map(Money::from_cents),
            },
            rating: None,
            description: String::new(),
            quantity: 3,
        }
    }

    #[test]
    fn discount_percent_requires_higher_old_price() {
        assert_eq!(product(750, Some(1000)).price.discount_percent(), 25);
        assert_eq!(product(1000, Some(1000)).price.discount_percent(), 0);
        assert_eq!(product(1000, None).price.discount_percent(), 0);
    }

    #[test]
    fn filter_matches_price_range() {
        let filter = ProductFilter {
            min_price: Some(Money::from_cents(500)),
            max_price: Some(Money::from_cents(1500)),
            min_discount: None,
        };
        assert!(filter.matches(&product(500, None)));
        assert!(filter.matches(&product(1500, None)));
        assert!(!filter.matches(&product(499, None)));
        assert!(!filter.matches(&product(1501, None)));
    }

    #[test]
    fn filter_matches_discount() {
        let filter = ProductFilter {
            min_discount: Some(20),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product(800, Some(1000))));
        assert!(!filter.matches(&product(900, Some(1000))));
        assert!(!filter.matches(&product(900, None)));
    }

    #[test]
    fn discount_of_extreme_prices_does_not_overflow() {
        let price = Price {
            current: Money::from_cents(1),
            old: Some(Money::from_cents(i64::MAX / 10)),
        };
        assert_eq!(price.discount_percent(), 99);

        let filter = ProductFilter {
            min_discount: Some(10),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product(1, Some(i64::MAX))));
    }

    #[test]
    fn old_price_is_omitted_when_absent() {
        let json = serde_json::to_value(product(1200, None)).unwrap();
        assert_eq!(json["price"], serde_json::json!({ "current": 1200 }));
        assert!(json.get("rating").is_none());
    }
}
