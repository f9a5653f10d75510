//! Product service providing catalog search and management.

use common::{Category, CategoryId, NewProduct, Page, Product, ProductFilter, ProductId};
use storage::{ProductQuery, ProductStore};

use crate::error::{DomainError, ResultExt};
use crate::validation;

/// Service for browsing and managing the catalog.
#[derive(Clone)]
pub struct ProductService<S> {
    store: S,
}

impl<S: ProductStore> ProductService<S> {
    /// Creates a new product service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns one page of products matching every given criterion.
    ///
    /// Invalid paging is rejected before the store is queried.
    #[tracing::instrument(skip(self))]
    pub async fn products(
        &self,
        category_id: Option<CategoryId>,
        search_term: Option<&str>,
        filter: ProductFilter,
        page: i64,
        size: i64,
    ) -> Result<Vec<Product>, DomainError> {
        let page = Page::new(page, size);
        validation::page(&page)?;
        check_filter(&filter)?;

        let mut query = ProductQuery::new(page).filter(filter);
        if let Some(category_id) = category_id {
            query = query.category(category_id);
        }
        if let Some(term) = search_term {
            query = query.search(term);
        }

        let ids = self
            .store
            .product_ids(&query)
            .await
            .context("ProductService.products", "looking up product ids")?;
        self.products_from_ids(&ids).await
    }

    /// Loads products in the order of `ids`, skipping unknown ones.
    pub async fn products_from_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .products_from_ids(ids)
            .await
            .context("ProductService.products_from_ids", "loading products")
    }

    #[tracing::instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .product(id)
            .await
            .context("ProductService.product", format!("loading product {id}"))?
            .ok_or_else(|| DomainError::not_found(format!("product {id} not found")))
    }

    pub async fn categories(&self) -> Result<Vec<Category>, DomainError> {
        self.store
            .categories()
            .await
            .context("ProductService.categories", "listing categories")
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<CategoryId, DomainError> {
        validation::non_blank("category name", name)?;
        self.store
            .create_category(name.trim())
            .await
            .context("ProductService.create_category", format!("inserting {name}"))
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<ProductId, DomainError> {
        validation::new_product(product)?;
        let id = self
            .store
            .create_product(product)
            .await
            .context("ProductService.create_product", "inserting product")?;

        tracing::info!(product_id = %id, "product created");
        Ok(id)
    }

    /// Writes a product's mutable fields inside the caller's transaction.
    ///
    /// Never commits; the caller owns the transaction.
    pub async fn update_product_with_tx(
        &self,
        tx: &mut S::Tx,
        product: &Product,
    ) -> Result<(), DomainError> {
        if product.quantity < 0 {
            return Err(DomainError::internal(format!(
                "product {} quantity would become negative",
                product.id
            )));
        }
        self.store
            .update_product_with_tx(tx, product)
            .await
            .context(
                "ProductService.update_product_with_tx",
                format!("updating product {}", product.id),
            )
    }
}

fn check_filter(filter: &ProductFilter) -> Result<(), DomainError> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(DomainError::validation(
            "min-price must not be greater than max-price",
        ));
    }
    if filter.min_price.is_some_and(|p| p.is_negative())
        || filter.max_price.is_some_and(|p| p.is_negative())
    {
        return Err(DomainError::validation("prices must not be negative"));
    }
    if let Some(discount) = filter.min_discount
        && !(0..=100).contains(&discount)
    {
        return Err(DomainError::validation(
            "discount must be between 0 and 100",
        ));
    }
    Ok(())
}
