use async_trait::async_trait;
use common::{
    AddressId, CardId, CreditCard, NewCreditCard, NewCustomer, ProfileUpdate, RoleId, User, UserId,
};
use sqlx::{Row, postgres::PgRow};

use super::{PgTx, PostgresStore, map_constraint};
use crate::{Result, StorageError, store::UserStore};

fn row_to_user(row: &PgRow, roles: Vec<i32>) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        roles: roles.into_iter().map(RoleId::new).collect(),
        address_id: row
            .try_get::<Option<i64>, _>("address_id")?
            .map(AddressId::new),
    })
}

fn row_to_card(row: &PgRow) -> Result<CreditCard> {
    Ok(CreditCard {
        id: CardId::new(row.try_get("id")?),
        customer_id: UserId::new(row.try_get("customer_id")?),
        name: row.try_get("name")?,
        number: row.try_get("number")?,
        cvc: row.try_get("cvc")?,
        expiry: row.try_get("expiry_date")?,
    })
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn save_user_with_tx(
        &self,
        tx: &mut PgTx,
        user: &NewCustomer,
        password_hash: &str,
    ) -> Result<UserId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (first_name, last_name, email, password)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(password_hash)
        .fetch_one(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "email", &user.email))?;

        Ok(UserId::new(id))
    }

    async fn update_roles_with_tx(
        &self,
        tx: &mut PgTx,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<()> {
        sqlx::query("DELETE FROM role_user_map WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *tx.0)
            .await?;

        let role_ids: Vec<i32> = roles.iter().map(RoleId::as_i32).collect();
        sqlx::query(
            "INSERT INTO role_user_map (user_id, role_id) SELECT $1, UNNEST($2::int[])",
        )
        .bind(user_id.as_i64())
        .bind(role_ids)
        .execute(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "user", user_id))?;

        Ok(())
    }

    async fn update_user_with_tx(
        &self,
        tx: &mut PgTx,
        user_id: UserId,
        profile: &ProfileUpdate,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1",
        )
        .bind(user_id.as_i64())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .execute(&mut *tx.0)
        .await
        .map_err(|e| map_constraint(e, "email", &profile.email))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn set_address_with_tx(
        &self,
        tx: &mut PgTx,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE users SET address_id = $2 WHERE id = $1")
            .bind(user_id.as_i64())
            .bind(address_id.map(|id| id.as_i64()))
            .execute(&mut *tx.0)
            .await
            .map_err(|e| {
                map_constraint(
                    e,
                    "address",
                    address_id.map(|id| id.to_string()).unwrap_or_default(),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.email, u.address_id,
                   COALESCE(
                       array_agg(r.role_id ORDER BY r.role_id) FILTER (WHERE r.role_id IS NOT NULL),
                       '{}'
                   ) AS roles
            FROM users u
            LEFT JOIN role_user_map r ON r.user_id = u.id
            WHERE u.id = $1
            GROUP BY u.id
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let roles: Vec<i32> = row.try_get("roles")?;
                Ok(Some(row_to_user(&row, roles)?))
            }
            None => Ok(None),
        }
    }

    async fn user_with_tx(&self, tx: &mut PgTx, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, email, address_id FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&mut *tx.0)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let roles: Vec<i32> = sqlx::query_scalar(
            "SELECT role_id FROM role_user_map WHERE user_id = $1 ORDER BY role_id",
        )
        .bind(user_id.as_i64())
        .fetch_all(&mut *tx.0)
        .await?;

        Ok(Some(row_to_user(&row, roles)?))
    }

    async fn user_id_and_password_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(UserId, String)>> {
        let row = sqlx::query("SELECT id, password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some((
                UserId::new(row.try_get("id")?),
                row.try_get("password")?,
            ))),
            None => Ok(None),
        }
    }

    async fn save_credit_card(&self, owner: UserId, card: &NewCreditCard) -> Result<CardId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO credit_cards (customer_id, name, number, cvc, expiry_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(owner.as_i64())
        .bind(&card.name)
        .bind(&card.number)
        .bind(&card.cvc)
        .bind(&card.expiry)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "user", owner))?;

        Ok(CardId::new(id))
    }

    async fn credit_cards(&self, owner: UserId) -> Result<Vec<CreditCard>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, name, number, cvc, expiry_date
            FROM credit_cards
            WHERE customer_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(owner.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_card).collect()
    }

    async fn delete_credit_card(&self, owner: UserId, card_id: CardId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credit_cards WHERE id = $1 AND customer_id = $2")
            .bind(card_id.as_i64())
            .bind(owner.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
