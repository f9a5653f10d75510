use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Address, AddressId, CardId, CartItem, Category, CategoryId, CreditCard, Money, NewCreditCard,
    NewCustomer, NewProduct, Order, OrderId, Product, ProductId, ProfileUpdate, RoleId, User,
    UserId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    ProductQuery, Result, StorageError,
    store::{AddressStore, OrderStore, ProductStore, Transaction, Transactional, UserStore},
};

/// Writes that can be told to fail, to exercise rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SaveUser,
    UpdateRoles,
    UpdateUser,
    SetAddress,
    SaveAddress,
    DeleteAddress,
    UpdateProduct,
    SaveOrder,
    AddCartItem,
    Commit,
}

#[derive(Debug, Clone)]
struct UserRow {
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    address_id: Option<AddressId>,
}

#[derive(Debug, Clone)]
struct OrderRow {
    customer_id: UserId,
    product_id: ProductId,
    unit_price: Money,
    quantity: i32,
    shipping_address_id: Option<AddressId>,
    ordered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    category: i64,
    product: i64,
    user: i64,
    address: i64,
    card: i64,
    order: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct State {
    categories: BTreeMap<CategoryId, String>,
    products: BTreeMap<ProductId, Product>,
    users: BTreeMap<UserId, UserRow>,
    roles: BTreeSet<(UserId, RoleId)>,
    addresses: BTreeMap<AddressId, Address>,
    cards: BTreeMap<CardId, CreditCard>,
    orders: BTreeMap<OrderId, OrderRow>,
    cart: BTreeMap<(UserId, ProductId), i32>,
    sequences: Sequences,
    fail_points: HashSet<FailPoint>,
    product_searches: usize,
}

impl State {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.contains(&point) {
            return Err(StorageError::Unavailable(format!("{point:?} failed")));
        }
        Ok(())
    }

    fn user(&self, user_id: UserId) -> Option<User> {
        self.users.get(&user_id).map(|row| User {
            id: user_id,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            email: row.email.clone(),
            roles: self
                .roles
                .range((user_id, RoleId::new(i32::MIN))..=(user_id, RoleId::new(i32::MAX)))
                .map(|(_, role)| *role)
                .collect(),
            address_id: row.address_id,
        })
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|(id, row)| Some(*id) != except && row.email == email)
    }

    fn user_exists(&self, user_id: UserId) -> Result<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StorageError::not_found("user", user_id))
        }
    }
}

/// In-memory store implementation for testing.
///
/// Provides the same interface and transactional guarantees as the
/// PostgreSQL implementation. A transaction holds the store lock and works
/// on a private copy of the data, which replaces the shared state on commit.
/// Calls made outside a transaction wait until any open transaction ends,
/// so a task must not use the non-transactional methods while it holds one.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

/// Transaction handle for [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    working: State,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `point` write fail with `StorageError::Unavailable`.
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.lock().await.fail_points.insert(point);
    }

    /// Clears a failure set with [`fail_on`](Self::fail_on).
    pub async fn recover(&self, point: FailPoint) {
        self.state.lock().await.fail_points.remove(&point);
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of (user, role) assignments across all users.
    pub async fn role_assignment_count(&self) -> usize {
        self.state.lock().await.roles.len()
    }

    pub async fn address_count(&self) -> usize {
        self.state.lock().await.addresses.len()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of catalog searches served so far.
    pub async fn product_search_count(&self) -> usize {
        self.state.lock().await.product_searches
    }

    /// Number of distinct cart rows across all customers.
    pub async fn cart_row_count(&self) -> usize {
        self.state.lock().await.cart.len()
    }
}

#[async_trait]
impl Transaction for InMemoryTx {
    async fn commit(self) -> Result<()> {
        let InMemoryTx { mut guard, working } = self;
        working.check(FailPoint::Commit)?;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Transactional for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn product_ids(&self, query: &ProductQuery) -> Result<Vec<ProductId>> {
        let mut state = self.state.lock().await;
        state.product_searches += 1;
        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(query.page.size).unwrap_or(0);

        Ok(state
            .products
            .values()
            .filter(|p| query.matches(p))
            .skip(offset)
            .take(size)
            .map(|p| p.id)
            .collect())
    }

    async fn products_from_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn product_with_tx(&self, tx: &mut InMemoryTx, id: ProductId) -> Result<Option<Product>> {
        Ok(tx.working.products.get(&id).cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .map(|(id, name)| Category {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn create_category(&self, name: &str) -> Result<CategoryId> {
        let mut state = self.state.lock().await;
        if state.categories.values().any(|existing| existing == name) {
            return Err(StorageError::Conflict(format!(
                "category {name} already exists"
            )));
        }
        let id = CategoryId::new(next(&mut state.sequences.category));
        state.categories.insert(id, name.to_string());
        Ok(id)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<ProductId> {
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&product.category_id) {
            return Err(StorageError::not_found("category", product.category_id));
        }
        let id = ProductId::new(next(&mut state.sequences.product));
        state.products.insert(
            id,
            Product {
                id,
                name: product.name.clone(),
                category_id: product.category_id,
                price: product.price,
                rating: product.rating,
                description: product.description.clone(),
                quantity: product.quantity,
            },
        );
        Ok(id)
    }

    async fn update_product_with_tx(&self, tx: &mut InMemoryTx, product: &Product) -> Result<()> {
        tx.working.check(FailPoint::UpdateProduct)?;
        let stored = tx
            .working
            .products
            .get_mut(&product.id)
            .ok_or_else(|| StorageError::not_found("product", product.id))?;
        *stored = product.clone();
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn save_user_with_tx(
        &self,
        tx: &mut InMemoryTx,
        user: &NewCustomer,
        password_hash: &str,
    ) -> Result<UserId> {
        let state = &mut tx.working;
        state.check(FailPoint::SaveUser)?;
        if state.email_taken(&user.email, None) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        let id = UserId::new(next(&mut state.sequences.user));
        state.users.insert(
            id,
            UserRow {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                password_hash: password_hash.to_string(),
                address_id: None,
            },
        );
        Ok(id)
    }

    async fn update_roles_with_tx(
        &self,
        tx: &mut InMemoryTx,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<()> {
        let state = &mut tx.working;
        state.check(FailPoint::UpdateRoles)?;
        state.user_exists(user_id)?;
        state.roles.retain(|(uid, _)| *uid != user_id);
        state
            .roles
            .extend(roles.iter().map(|role| (user_id, *role)));
        Ok(())
    }

    async fn update_user_with_tx(
        &self,
        tx: &mut InMemoryTx,
        user_id: UserId,
        profile: &ProfileUpdate,
    ) -> Result<()> {
        let state = &mut tx.working;
        state.check(FailPoint::UpdateUser)?;
        if state.email_taken(&profile.email, Some(user_id)) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                profile.email
            )));
        }
        let row = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        row.first_name = profile.first_name.clone();
        row.last_name = profile.last_name.clone();
        row.email = profile.email.clone();
        Ok(())
    }

    async fn set_address_with_tx(
        &self,
        tx: &mut InMemoryTx,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<()> {
        let state = &mut tx.working;
        state.check(FailPoint::SetAddress)?;
        if let Some(address_id) = address_id
            && !state.addresses.contains_key(&address_id)
        {
            return Err(StorageError::not_found("address", address_id));
        }
        let row = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        row.address_id = address_id;
        Ok(())
    }

    async fn user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.user(user_id))
    }

    async fn user_with_tx(&self, tx: &mut InMemoryTx, user_id: UserId) -> Result<Option<User>> {
        Ok(tx.working.user(user_id))
    }

    async fn user_id_and_password_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(UserId, String)>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|(_, row)| row.email == email)
            .map(|(id, row)| (*id, row.password_hash.clone())))
    }

    async fn save_credit_card(&self, owner: UserId, card: &NewCreditCard) -> Result<CardId> {
        let mut state = self.state.lock().await;
        state.user_exists(owner)?;
        let id = CardId::new(next(&mut state.sequences.card));
        state.cards.insert(
            id,
            CreditCard {
                id,
                customer_id: owner,
                name: card.name.clone(),
                number: card.number.clone(),
                cvc: card.cvc.clone(),
                expiry: card.expiry.clone(),
            },
        );
        Ok(id)
    }

    async fn credit_cards(&self, owner: UserId) -> Result<Vec<CreditCard>> {
        let state = self.state.lock().await;
        Ok(state
            .cards
            .values()
            .filter(|card| card.customer_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_credit_card(&self, owner: UserId, card_id: CardId) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.cards.get(&card_id) {
            Some(card) if card.customer_id == owner => {
                state.cards.remove(&card_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn save_address_with_tx(
        &self,
        tx: &mut InMemoryTx,
        address: &Address,
    ) -> Result<AddressId> {
        let state = &mut tx.working;
        state.check(FailPoint::SaveAddress)?;
        let id = AddressId::new(next(&mut state.sequences.address));
        state.addresses.insert(
            id,
            Address {
                id: Some(id),
                ..address.clone()
            },
        );
        Ok(id)
    }

    async fn update_address_with_tx(
        &self,
        tx: &mut InMemoryTx,
        id: AddressId,
        address: &Address,
    ) -> Result<bool> {
        let state = &mut tx.working;
        match state.addresses.get_mut(&id) {
            Some(stored) => {
                *stored = Address {
                    id: Some(id),
                    ..address.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        Ok(self.state.lock().await.addresses.get(&id).cloned())
    }

    async fn delete_address_with_tx(&self, tx: &mut InMemoryTx, id: AddressId) -> Result<()> {
        let state = &mut tx.working;
        state.check(FailPoint::DeleteAddress)?;
        state.addresses.remove(&id);
        for user in state.users.values_mut() {
            if user.address_id == Some(id) {
                user.address_id = None;
            }
        }
        for order in state.orders.values_mut() {
            if order.shipping_address_id == Some(id) {
                order.shipping_address_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn save_order_with_tx(
        &self,
        tx: &mut InMemoryTx,
        customer_id: UserId,
        product_id: ProductId,
        unit_price: Money,
        quantity: i32,
        shipping_address_id: AddressId,
    ) -> Result<OrderId> {
        let state = &mut tx.working;
        state.check(FailPoint::SaveOrder)?;
        state.user_exists(customer_id)?;
        if !state.products.contains_key(&product_id) {
            return Err(StorageError::not_found("product", product_id));
        }
        let id = OrderId::new(next(&mut state.sequences.order));
        state.orders.insert(
            id,
            OrderRow {
                customer_id,
                product_id,
                unit_price,
                quantity,
                shipping_address_id: Some(shipping_address_id),
                ordered_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn orders_by_customer(&self, customer_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|(_, row)| row.customer_id == customer_id)
            .filter_map(|(id, row)| {
                state.products.get(&row.product_id).map(|product| Order {
                    id: *id,
                    customer_id: row.customer_id,
                    product: product.clone(),
                    unit_price: row.unit_price,
                    quantity: row.quantity,
                    shipping_address_id: row.shipping_address_id,
                    ordered_at: row.ordered_at,
                })
            })
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn cart_items(&self, customer_id: UserId) -> Result<Vec<CartItem>> {
        let state = self.state.lock().await;
        Ok(state
            .cart
            .iter()
            .filter(|((uid, _), _)| *uid == customer_id)
            .filter_map(|((_, product_id), quantity)| {
                state.products.get(product_id).map(|product| CartItem {
                    product: product.clone(),
                    quantity: *quantity,
                })
            })
            .collect())
    }

    async fn add_cart_item_with_tx(
        &self,
        tx: &mut InMemoryTx,
        customer_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<()> {
        let state = &mut tx.working;
        state.check(FailPoint::AddCartItem)?;
        state.user_exists(customer_id)?;
        if !state.products.contains_key(&product_id) {
            return Err(StorageError::not_found("product", product_id));
        }
        let entry = state.cart.entry((customer_id, product_id)).or_insert(0);
        *entry = entry.checked_add(quantity).ok_or_else(|| {
            StorageError::Conflict(format!("cart quantity of product {product_id} out of range"))
        })?;
        Ok(())
    }

    async fn cart_item_count(&self, customer_id: UserId) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .cart
            .iter()
            .filter(|((uid, _), _)| *uid == customer_id)
            .map(|(_, quantity)| i64::from(*quantity))
            .sum())
    }
}
