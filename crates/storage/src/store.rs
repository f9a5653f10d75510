use async_trait::async_trait;
use common::{
    Address, AddressId, CardId, CartItem, Category, CategoryId, CreditCard, Money, NewCreditCard,
    NewCustomer, NewProduct, Order, OrderId, Product, ProductId, ProfileUpdate, RoleId, User,
    UserId,
};

use crate::{ProductQuery, Result};

/// A unit of work opened by [`Transactional::begin`].
///
/// Dropping a transaction without committing it discards its writes.
#[async_trait]
pub trait Transaction: Send {
    /// Makes every write performed through this transaction visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write performed through this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Backends that can group writes into a transaction.
#[async_trait]
pub trait Transactional: Send + Sync {
    type Tx: Transaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// Catalog persistence.
#[async_trait]
pub trait ProductStore: Transactional {
    /// Returns the ids of products matching the query, ordered by id.
    async fn product_ids(&self, query: &ProductQuery) -> Result<Vec<ProductId>>;

    /// Loads full product records, in the order of `ids`. Unknown ids are skipped.
    async fn products_from_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Loads a product inside a transaction, locking it until the transaction ends.
    async fn product_with_tx(&self, tx: &mut Self::Tx, id: ProductId)
    -> Result<Option<Product>>;

    async fn categories(&self) -> Result<Vec<Category>>;

    async fn create_category(&self, name: &str) -> Result<CategoryId>;

    async fn create_product(&self, product: &NewProduct) -> Result<ProductId>;

    /// Writes the mutable fields of an existing product.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn update_product_with_tx(&self, tx: &mut Self::Tx, product: &Product) -> Result<()>;
}

/// Account, role and credit card persistence.
#[async_trait]
pub trait UserStore: Transactional {
    /// Inserts a user. Fails with `Conflict` if the email is taken.
    async fn save_user_with_tx(
        &self,
        tx: &mut Self::Tx,
        user: &NewCustomer,
        password_hash: &str,
    ) -> Result<UserId>;

    /// Replaces every role of a user with `roles`.
    async fn update_roles_with_tx(
        &self,
        tx: &mut Self::Tx,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<()>;

    /// Writes the profile fields of a user.
    ///
    /// Fails with `NotFound` if the user does not exist and `Conflict` if the
    /// new email belongs to someone else.
    async fn update_user_with_tx(
        &self,
        tx: &mut Self::Tx,
        user_id: UserId,
        profile: &ProfileUpdate,
    ) -> Result<()>;

    /// Sets or clears the address reference of a user.
    async fn set_address_with_tx(
        &self,
        tx: &mut Self::Tx,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<()>;

    async fn user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Loads a user inside a transaction, locking the row until it ends.
    async fn user_with_tx(&self, tx: &mut Self::Tx, user_id: UserId) -> Result<Option<User>>;

    /// Returns the id and stored password hash for an email, if registered.
    async fn user_id_and_password_by_email(&self, email: &str)
    -> Result<Option<(UserId, String)>>;

    async fn save_credit_card(&self, owner: UserId, card: &NewCreditCard) -> Result<CardId>;

    async fn credit_cards(&self, owner: UserId) -> Result<Vec<CreditCard>>;

    /// Deletes a card only if it belongs to `owner`. Returns whether a row was removed.
    async fn delete_credit_card(&self, owner: UserId, card_id: CardId) -> Result<bool>;
}

/// Shipping address persistence.
#[async_trait]
pub trait AddressStore: Transactional {
    async fn save_address_with_tx(&self, tx: &mut Self::Tx, address: &Address)
    -> Result<AddressId>;

    /// Updates an address in place. Returns false if no row has that id.
    async fn update_address_with_tx(
        &self,
        tx: &mut Self::Tx,
        id: AddressId,
        address: &Address,
    ) -> Result<bool>;

    async fn address(&self, id: AddressId) -> Result<Option<Address>>;

    async fn delete_address_with_tx(&self, tx: &mut Self::Tx, id: AddressId) -> Result<()>;
}

/// Order and cart persistence.
#[async_trait]
pub trait OrderStore: Transactional {
    async fn save_order_with_tx(
        &self,
        tx: &mut Self::Tx,
        customer_id: UserId,
        product_id: ProductId,
        unit_price: Money,
        quantity: i32,
        shipping_address_id: AddressId,
    ) -> Result<OrderId>;

    /// Orders of a customer, most recent first, joined with current product data.
    async fn orders_by_customer(&self, customer_id: UserId) -> Result<Vec<Order>>;

    /// Cart rows of a customer joined with current product data.
    async fn cart_items(&self, customer_id: UserId) -> Result<Vec<CartItem>>;

    /// Inserts a cart row or adds `quantity` to the existing one.
    async fn add_cart_item_with_tx(
        &self,
        tx: &mut Self::Tx,
        customer_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<()>;

    /// Total number of units in a customer's cart.
    async fn cart_item_count(&self, customer_id: UserId) -> Result<i64>;
}

/// Everything the domain services need from a backend.
pub trait Store: ProductStore + UserStore + AddressStore + OrderStore + Clone + 'static {}

impl<T> Store for T where T: ProductStore + UserStore + AddressStore + OrderStore + Clone + 'static {}
