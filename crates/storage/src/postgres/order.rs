use async_trait::async_trait;
use common::{AddressId, CartItem, Money, Order, OrderId, ProductId, UserId};
use sqlx::Row;

use super::{PgTx, PostgresStore, map_constraint, product::row_to_product};
use crate::{Result, store::OrderStore};

#[async_trait]
impl OrderStore for PostgresStore {
    async fn save_order_with_tx(
        &self,
        tx: &mut PgTx,
        customer_id: UserId,
        product_id: ProductId,
        unit_price: Money,
        quantity: i32,
        shipping_address_id: AddressId,
    ) -> Result<OrderId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (product_id, customer_id, shipping_address_id, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(product_id.as_i64())
        .bind(customer_id.as_i64())
        .bind(shipping_address_id.as_i64())
        .bind(unit_price.cents())
        .bind(quantity)
        .fetch_one(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "product", product_id))?;

        Ok(OrderId::new(id))
    }

    async fn orders_by_customer(&self, customer_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id AS order_id, o.customer_id, o.shipping_address_id, o.unit_price,
                   o.quantity AS ordered_quantity, o.ordered_at,
                   p.id, p.name, p.category_id, p.price, p.old_price, p.rating,
                   p.description, p.quantity
            FROM orders o
            JOIN products p ON p.id = o.product_id
            WHERE o.customer_id = $1
            ORDER BY o.ordered_at DESC, o.id DESC
            "#,
        )
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Order> {
                Ok(Order {
                    id: OrderId::new(row.try_get("order_id")?),
                    customer_id: UserId::new(row.try_get("customer_id")?),
                    product: row_to_product(row)?,
                    unit_price: Money::from_cents(row.try_get("unit_price")?),
                    quantity: row.try_get("ordered_quantity")?,
                    shipping_address_id: row
                        .try_get::<Option<i64>, _>("shipping_address_id")?
                        .map(AddressId::new),
                    ordered_at: row.try_get("ordered_at")?,
                })
            })
            .collect()
    }

    async fn cart_items(&self, customer_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            r#"
            SELECT c.quantity AS cart_quantity,
                   p.id, p.name, p.category_id, p.price, p.old_price, p.rating,
                   p.description, p.quantity
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.customer_id = $1
            ORDER BY p.id ASC
            "#,
        )
        .bind(customer_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CartItem> {
                Ok(CartItem {
                    product: row_to_product(row)?,
                    quantity: row.try_get("cart_quantity")?,
                })
            })
            .collect()
    }

    async fn add_cart_item_with_tx(
        &self,
        tx: &mut PgTx,
        customer_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (customer_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(customer_id.as_i64())
        .bind(product_id.as_i64())
        .bind(quantity)
        .execute(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "product", product_id))?;

        Ok(())
    }

    async fn cart_item_count(&self, customer_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM cart_items WHERE customer_id = $1",
        )
        .bind(customer_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
