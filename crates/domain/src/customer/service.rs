//! Customer service orchestrating account, address, card, cart and order
//! operations.
//!
//! Operations that write more than one row run inside a single store
//! transaction which is committed only when every step succeeds.

use std::time::Instant;

use common::{
    Address, CardId, CartItem, CreditCard, NewCartItem, NewCreditCard, NewCustomer, NewOrder,
    Order, OrderId, ProfileUpdate, RoleId, User, UserId,
};
use storage::Store;

use crate::error::{DomainError, ResultExt};
use crate::password::Argon2Hasher;
use crate::product::ProductService;
use crate::tx::finish;
use crate::validation;

/// Service for everything a customer owns.
#[derive(Clone)]
pub struct CustomerService<S> {
    store: S,
    products: ProductService<S>,
    hasher: Argon2Hasher,
}

impl<S: Store> CustomerService<S> {
    /// Creates a customer service with the default Argon2id costs.
    pub fn new(store: S) -> Self {
        Self::with_hasher(store, Argon2Hasher::default())
    }

    pub fn with_hasher(store: S, hasher: Argon2Hasher) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            store,
            hasher,
        }
    }

    /// Returns the product service used for inventory updates.
    pub fn products(&self) -> &ProductService<S> {
        &self.products
    }

    /// Registers a customer and assigns the customer role atomically.
    #[tracing::instrument(skip(self, customer, password), fields(email = %customer.email))]
    pub async fn create_customer(
        &self,
        customer: &NewCustomer,
        password: &str,
    ) -> Result<UserId, DomainError> {
        const OP: &str = "CustomerService.create_customer";

        let customer = NewCustomer {
            email: validation::normalize_email(&customer.email),
            ..customer.clone()
        };
        validation::new_customer(&customer)?;
        validation::password(password)?;
        let hash = self.hasher.hash(password).context(OP, "hashing password")?;

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            let id = self
                .store
                .save_user_with_tx(&mut tx, &customer, &hash)
                .await
                .context(OP, "inserting user")?;
            self.store
                .update_roles_with_tx(&mut tx, id, &[RoleId::CUSTOMER])
                .await
                .context(OP, format!("assigning customer role to {id}"))?;
            Ok::<_, DomainError>(id)
        }
        .await;
        let id = finish(tx, OP, result).await?;

        metrics::counter!("customers_created_total").increment(1);
        tracing::info!(user_id = %id, "customer created");
        Ok(id)
    }

    /// Checks a login attempt.
    ///
    /// Returns `(false, 0)` when the email is unknown or the password does
    /// not match. Only lookup or hash failures are errors.
    #[tracing::instrument(skip(self, password))]
    pub async fn email_match_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(bool, UserId), DomainError> {
        const OP: &str = "CustomerService.email_match_password";
        let no_match = (false, UserId::new(0));

        let email = validation::normalize_email(email);
        let Some((id, hash)) = self
            .store
            .user_id_and_password_by_email(&email)
            .await
            .context(OP, "looking up credentials")?
        else {
            return Ok(no_match);
        };

        let matched = self
            .hasher
            .verify(password, &hash)
            .context(OP, format!("verifying password of user {id}"))?;
        Ok(if matched { (true, id) } else { no_match })
    }

    #[tracing::instrument(skip(self))]
    pub async fn user(&self, id: UserId) -> Result<User, DomainError> {
        self.store
            .user(id)
            .await
            .context("CustomerService.user", format!("loading user {id}"))?
            .ok_or_else(|| DomainError::not_found(format!("user {id} not found")))
    }

    /// Updates profile fields in their own transaction and returns the result.
    #[tracing::instrument(skip(self, profile))]
    pub async fn update_user(
        &self,
        id: UserId,
        profile: &ProfileUpdate,
    ) -> Result<User, DomainError> {
        const OP: &str = "CustomerService.update_user";

        let profile = ProfileUpdate {
            email: validation::normalize_email(&profile.email),
            ..profile.clone()
        };
        validation::profile(&profile)?;

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            self.store
                .update_user_with_tx(&mut tx, id, &profile)
                .await
                .context(OP, format!("updating user {id}"))?;
            self.store
                .user_with_tx(&mut tx, id)
                .await
                .context(OP, format!("reloading user {id}"))?
                .ok_or_else(|| DomainError::not_found(format!("user {id} not found")))
        }
        .await;
        finish(tx, OP, result).await
    }

    #[tracing::instrument(skip(self, card))]
    pub async fn save_credit_card(
        &self,
        owner: UserId,
        card: &NewCreditCard,
    ) -> Result<CardId, DomainError> {
        validation::credit_card(card)?;
        self.store
            .save_credit_card(owner, card)
            .await
            .context("CustomerService.save_credit_card", format!("saving card of {owner}"))
    }

    pub async fn credit_cards(&self, owner: UserId) -> Result<Vec<CreditCard>, DomainError> {
        self.store
            .credit_cards(owner)
            .await
            .context("CustomerService.credit_cards", format!("listing cards of {owner}"))
    }

    /// Deletes a card the owner holds. Unknown cards and other customers'
    /// cards are both reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn delete_credit_card(&self, owner: UserId, card: CardId) -> Result<(), DomainError> {
        let deleted = self
            .store
            .delete_credit_card(owner, card)
            .await
            .context("CustomerService.delete_credit_card", format!("deleting card {card}"))?;
        if !deleted {
            return Err(DomainError::not_found(format!("card {card} not found")));
        }
        Ok(())
    }

    /// Creates or updates the customer's shipping address.
    ///
    /// An address carrying an id must be the customer's current one and is
    /// updated in place. An address without an id is created only when the
    /// customer has none.
    #[tracing::instrument(skip(self, address))]
    pub async fn update_customer_address(
        &self,
        customer_id: UserId,
        address: &Address,
    ) -> Result<Address, DomainError> {
        const OP: &str = "CustomerService.update_customer_address";
        validation::address(address)?;

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            let customer = self.lock_customer(&mut tx, customer_id, OP).await?;
            if let Some(address_id) = address.id {
                if customer.address_id != Some(address_id) {
                    return Err(DomainError::forbidden(format!(
                        "address {address_id} does not belong to customer {customer_id}"
                    )));
                }
                let updated = self
                    .store
                    .update_address_with_tx(&mut tx, address_id, address)
                    .await
                    .context(OP, format!("updating address {address_id}"))?;
                if !updated {
                    return Err(DomainError::not_found(format!(
                        "address {address_id} not found"
                    )));
                }
                return Ok(address_id);
            }
            if let Some(existing) = customer.address_id {
                return Err(DomainError::conflict("customer already has an address")
                    .context(OP, format!("customer {customer_id} has address {existing}")));
            }
            let address_id = self
                .store
                .save_address_with_tx(&mut tx, address)
                .await
                .context(OP, "inserting address")?;
            self.store
                .set_address_with_tx(&mut tx, customer_id, Some(address_id))
                .await
                .context(OP, format!("linking address {address_id}"))?;
            Ok::<_, DomainError>(address_id)
        }
        .await;
        let address_id = finish(tx, OP, result).await?;

        Ok(Address {
            id: Some(address_id),
            ..address.clone()
        })
    }

    /// Returns `None` when the customer has no address.
    #[tracing::instrument(skip(self))]
    pub async fn customer_address(
        &self,
        customer_id: UserId,
    ) -> Result<Option<Address>, DomainError> {
        const OP: &str = "CustomerService.customer_address";

        let customer = self.user(customer_id).await.context(OP, "loading customer")?;
        let Some(address_id) = customer.address_id else {
            return Ok(None);
        };
        self.store
            .address(address_id)
            .await
            .context(OP, format!("loading address {address_id}"))
    }

    /// Unlinks and deletes the customer's address in one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer_address(&self, customer_id: UserId) -> Result<(), DomainError> {
        const OP: &str = "CustomerService.delete_customer_address";

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            let customer = self.lock_customer(&mut tx, customer_id, OP).await?;
            let address_id = customer
                .address_id
                .ok_or_else(|| DomainError::not_found("customer has no address"))?;
            self.store
                .set_address_with_tx(&mut tx, customer_id, None)
                .await
                .context(OP, "unlinking address")?;
            self.store
                .delete_address_with_tx(&mut tx, address_id)
                .await
                .context(OP, format!("deleting address {address_id}"))
        }
        .await;
        finish(tx, OP, result).await
    }

    async fn lock_customer(
        &self,
        tx: &mut S::Tx,
        customer_id: UserId,
        op: &'static str,
    ) -> Result<User, DomainError> {
        self.store
            .user_with_tx(tx, customer_id)
            .await
            .context(op, "locking customer")?
            .ok_or_else(|| DomainError::not_found(format!("user {customer_id} not found")))
    }

    /// Places an order, decrementing stock and recording the order atomically.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        customer_id: UserId,
        order: &NewOrder,
    ) -> Result<OrderId, DomainError> {
        const OP: &str = "CustomerService.create_order";
        validation::quantity(order.quantity)?;
        let started = Instant::now();

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            let mut product = self
                .store
                .product_with_tx(&mut tx, order.product_id)
                .await
                .context(OP, "locking product")?
                .ok_or_else(|| {
                    DomainError::not_found(format!("product {} not found", order.product_id))
                })?;
            if order.quantity > product.quantity {
                return Err(DomainError::conflict(format!(
                    "only {} units of product {} are in stock",
                    product.quantity, product.id
                )));
            }

            let customer = self.lock_customer(&mut tx, customer_id, OP).await?;
            let shipping_address_id = customer.address_id.ok_or_else(|| {
                DomainError::validation("a shipping address is required to order")
            })?;

            product.quantity -= order.quantity;
            self.products
                .update_product_with_tx(&mut tx, &product)
                .await
                .context(OP, "decrementing stock")?;
            self.store
                .save_order_with_tx(
                    &mut tx,
                    customer_id,
                    product.id,
                    product.price.current,
                    order.quantity,
                    shipping_address_id,
                )
                .await
                .context(OP, "inserting order")
        }
        .await;
        let id = finish(tx, OP, result).await?;

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %id, "order placed");
        Ok(id)
    }

    pub async fn orders_by_customer(&self, customer_id: UserId) -> Result<Vec<Order>, DomainError> {
        self.store.orders_by_customer(customer_id).await.context(
            "CustomerService.orders_by_customer",
            format!("listing orders of {customer_id}"),
        )
    }

    pub async fn cart_items(&self, customer_id: UserId) -> Result<Vec<CartItem>, DomainError> {
        self.store.cart_items(customer_id).await.context(
            "CustomerService.cart_items",
            format!("listing cart of {customer_id}"),
        )
    }

    /// Adds items to the cart in one transaction, incrementing quantities of
    /// products already present.
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub async fn add_cart_items(
        &self,
        customer_id: UserId,
        items: &[NewCartItem],
    ) -> Result<(), DomainError> {
        const OP: &str = "CustomerService.add_cart_items";
        for item in items {
            validation::quantity(item.quantity)?;
        }

        let mut tx = self.store.begin().await.context(OP, "beginning transaction")?;
        let result = async {
            for item in items {
                self.store
                    .add_cart_item_with_tx(&mut tx, customer_id, item.product_id, item.quantity)
                    .await
                    .context(OP, format!("adding product {}", item.product_id))?;
            }
            Ok::<_, DomainError>(())
        }
        .await;
        finish(tx, OP, result).await
    }

    /// Total units across the customer's cart.
    pub async fn cart_item_count(&self, customer_id: UserId) -> Result<i64, DomainError> {
        self.store.cart_item_count(customer_id).await.context(
            "CustomerService.cart_item_count",
            format!("counting cart of {customer_id}"),
        )
    }
}
