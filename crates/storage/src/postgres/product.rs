use std::collections::HashMap;

use async_trait::async_trait;
use common::{Category, CategoryId, Money, NewProduct, Price, Product, ProductId};
use sqlx::{Row, postgres::PgRow};

use super::{PgTx, PostgresStore, map_constraint};
use crate::{ProductQuery, Result, StorageError, store::ProductStore};

const PRODUCT_COLUMNS: &str =
    "id, name, category_id, price, old_price, rating, description, quantity";

pub(super) fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        price: Price {
            current: Money::from_cents(row.try_get("price")?),
            old: row
                .try_get::<Option<i64>, _>("old_price")?
                .map(Money::from_cents),
        },
        rating: row.try_get("rating")?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
    })
}

/// Escapes LIKE wildcards so the term is matched literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the id lookup for a catalog query. Placeholders are numbered in
/// the order [`product_ids`](ProductStore::product_ids) binds them.
fn product_ids_sql(query: &ProductQuery) -> String {
    let mut sql = String::from("SELECT id FROM products WHERE 1=1");
    let mut param_count = 0;

    if query.category_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND category_id = ${param_count}"));
    }
    if query.search_term.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND name ILIKE '%' || ${param_count} || '%'"));
    }
    if query.filter.min_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price >= ${param_count}"));
    }
    if query.filter.max_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price <= ${param_count}"));
    }
    if query.filter.min_discount.is_some() {
        param_count += 1;
        sql.push_str(&format!(
            " AND old_price IS NOT NULL AND old_price > price \
             AND (old_price - price)::numeric * 100 >= ${param_count} * old_price::numeric"
        ));
    }

    sql.push_str(" ORDER BY id ASC");
    sql.push_str(&format!(
        " LIMIT ${} OFFSET ${}",
        param_count + 1,
        param_count + 2
    ));
    sql
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn product_ids(&self, query: &ProductQuery) -> Result<Vec<ProductId>> {
        let sql = product_ids_sql(query);
        let mut sqlx_query = sqlx::query_scalar(&sql);

        if let Some(category_id) = query.category_id {
            sqlx_query = sqlx_query.bind(category_id.as_i64());
        }
        if let Some(term) = &query.search_term {
            sqlx_query = sqlx_query.bind(escape_like(term));
        }
        if let Some(min_price) = query.filter.min_price {
            sqlx_query = sqlx_query.bind(min_price.cents());
        }
        if let Some(max_price) = query.filter.max_price {
            sqlx_query = sqlx_query.bind(max_price.cents());
        }
        if let Some(min_discount) = query.filter.min_discount {
            sqlx_query = sqlx_query.bind(min_discount);
        }
        let ids: Vec<i64> = sqlx_query
            .bind(query.page.size)
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    async fn products_from_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product = row_to_product(row)?;
            by_id.insert(product.id, product);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn product_with_tx(&self, tx: &mut PgTx, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx.0)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM product_categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Category> {
                Ok(Category {
                    id: CategoryId::new(row.try_get("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn create_category(&self, name: &str) -> Result<CategoryId> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO product_categories (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_constraint(e, "category", name))?;

        Ok(CategoryId::new(id))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<ProductId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, category_id, price, old_price, rating, description, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(product.category_id.as_i64())
        .bind(product.price.current.cents())
        .bind(product.price.old.map(|m| m.cents()))
        .bind(product.rating)
        .bind(&product.description)
        .bind(product.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "category", product.category_id))?;

        Ok(ProductId::new(id))
    }

    async fn update_product_with_tx(&self, tx: &mut PgTx, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, category_id = $3, price = $4, old_price = $5,
                rating = $6, description = $7, quantity = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(product.category_id.as_i64())
        .bind(product.price.current.cents())
        .bind(product.price.old.map(|m| m.cents()))
        .bind(product.rating)
        .bind(&product.description)
        .bind(product.quantity)
        .execute(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "category", product.category_id))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("product", product.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{Page, ProductFilter};

    use super::*;

    #[test]
    fn unfiltered_query_only_pages() {
        let sql = product_ids_sql(&ProductQuery::new(Page::new(1, 20)));
        assert_eq!(
            sql,
            "SELECT id FROM products WHERE 1=1 ORDER BY id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn placeholders_follow_bind_order() {
        let query = ProductQuery::new(Page::new(2, 10))
            .category(CategoryId::new(3))
            .search("lamp")
            .filter(ProductFilter {
                max_price: Some(Money::from_cents(5000)),
                min_discount: Some(10),
                ..ProductFilter::default()
            });
        let sql = product_ids_sql(&query);

        assert!(sql.contains("category_id = $1"));
        assert!(sql.contains("ILIKE '%' || $2 || '%'"));
        assert!(sql.contains("price <= $3"));
        assert!(sql.contains("(old_price - price)::numeric * 100 >= $4 * old_price::numeric"));
        assert!(sql.ends_with("LIMIT $5 OFFSET $6"));
        assert!(!sql.contains("price >="));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("lamp"), "lamp");
    }
}
