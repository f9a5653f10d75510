use common::{CategoryId, Page, Product, ProductFilter};

/// Builder for catalog searches.
///
/// Every criterion is optional except the page, which stores assume has
/// already been validated by the caller.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Case-insensitive substring of the product name.
    pub search_term: Option<String>,

    /// Price and discount constraints.
    pub filter: ProductFilter,

    /// Which slice of the ordered result to return.
    pub page: Page,
}

impl ProductQuery {
    /// Creates a query for the given page with no filters.
    pub fn new(page: Page) -> Self {
        Self {
            category_id: None,
            search_term: None,
            filter: ProductFilter::default(),
            page,
        }
    }

    /// Filters by category.
    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Filters by name. Blank terms are ignored.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let trimmed = term.trim();
        self.search_term = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Applies price constraints.
    pub fn filter(mut self, filter: ProductFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns true if the product satisfies every criterion except paging.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id
            && product.category_id != category_id
        {
            return false;
        }
        if let Some(term) = &self.search_term
            && !product
                .name
                .to_lowercase()
                .contains(&term.to_lowercase())
        {
            return false;
        }
        self.filter.matches(product)
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, Price, ProductId};

    use super::*;

    fn product(name: &str, category: i64, cents: i64) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            category_id: CategoryId::new(category),
            price: Price::new(Money::from_cents(cents)),
            rating: None,
            description: String::new(),
            quantity: 1,
        }
    }

    #[test]
    fn blank_search_term_is_ignored() {
        let query = ProductQuery::new(Page::new(1, 10)).search("   ");
        assert_eq!(query.search_term, None);
    }

    #[test]
    fn search_is_case_insensitive() {
        let query = ProductQuery::new(Page::new(1, 10)).search("LAMP");
        assert!(query.matches(&product("Desk lamp", 1, 100)));
        assert!(!query.matches(&product("Chair", 1, 100)));
    }

    #[test]
    fn category_and_filter_combine() {
        let query = ProductQuery::new(Page::new(1, 10))
            .category(CategoryId::new(2))
            .filter(ProductFilter {
                max_price: Some(Money::from_cents(500)),
                ..ProductFilter::default()
            });
        assert!(query.matches(&product("Mug", 2, 400)));
        assert!(!query.matches(&product("Mug", 1, 400)));
        assert!(!query.matches(&product("Mug", 2, 600)));
    }
}
