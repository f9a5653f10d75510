use async_trait::async_trait;
use common::{Address, AddressId};
use sqlx::Row;

use super::{PgTx, PostgresStore};
use crate::{Result, store::AddressStore};

#[async_trait]
impl AddressStore for PostgresStore {
    async fn save_address_with_tx(&self, tx: &mut PgTx, address: &Address) -> Result<AddressId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO addresses (country, state, city, postal_code, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&address.country)
        .bind(&address.state)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.address)
        .fetch_one(&mut *tx.0)
        .await?;

        Ok(AddressId::new(id))
    }

    async fn update_address_with_tx(
        &self,
        tx: &mut PgTx,
        id: AddressId,
        address: &Address,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET country = $2, state = $3, city = $4, postal_code = $5, address = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&address.country)
        .bind(&address.state)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.address)
        .execute(&mut *tx.0)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query(
            "SELECT id, country, state, city, postal_code, address FROM addresses WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Address {
                id: Some(AddressId::new(row.try_get("id")?)),
                country: row.try_get("country")?,
                state: row.try_get("state")?,
                city: row.try_get("city")?,
                postal_code: row.try_get("postal_code")?,
                address: row.try_get("address")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_address_with_tx(&self, tx: &mut PgTx, id: AddressId) -> Result<()> {
        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx.0)
            .await?;
        Ok(())
    }
}
