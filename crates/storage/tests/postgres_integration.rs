//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate every table
//! before each test. Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration
//! ```

use std::sync::Arc;

use common::{
    Address, Money, NewCreditCard, NewCustomer, NewProduct, Page, Price, ProductFilter,
    ProductId, ProfileUpdate, RoleId, UserId,
};
use serial_test::serial;
use sqlx::PgPool;
use storage::{
    AddressStore, OrderStore, PostgresStore, ProductQuery, ProductStore, StorageError,
    Transaction, Transactional, UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_schema.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE cart_items, orders, credit_cards, role_user_map, users, addresses, \
         products, product_categories RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn customer(email: &str) -> NewCustomer {
    NewCustomer {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: email.to_string(),
    }
}

fn address(city: &str) -> Address {
    Address {
        id: None,
        country: "US".to_string(),
        state: "NY".to_string(),
        city: city.to_string(),
        postal_code: "10001".to_string(),
        address: "1 Main St".to_string(),
    }
}

async fn seed_product(store: &PostgresStore, name: &str, cents: i64, old: Option<i64>) -> ProductId {
    let categories = store.categories().await.unwrap();
    let category_id = match categories.first() {
        Some(category) => category.id,
        None => store.create_category("General").await.unwrap(),
    };
    store
        .create_product(&NewProduct {
            name: name.to_string(),
            category_id,
            price: Price {
                current: Money::from_cents(cents),
                old: old.map(Money::from_cents),
            },
            rating: Some(4),
            description: format!("{name} description"),
            quantity: 5,
        })
        .await
        .unwrap()
}

async fn seed_user(store: &PostgresStore, email: &str) -> UserId {
    let mut tx = store.begin().await.unwrap();
    let id = store
        .save_user_with_tx(&mut tx, &customer(email), "hash")
        .await
        .unwrap();
    store
        .update_roles_with_tx(&mut tx, id, &[RoleId::CUSTOMER])
        .await
        .unwrap();
    tx.commit().await.unwrap();
    id
}

#[tokio::test]
#[serial]
async fn test_user_roundtrip_with_roles() {
    let store = get_test_store().await;
    let id = seed_user(&store, "grace@example.com").await;

    let user = store.user(id).await.unwrap().unwrap();
    assert_eq!(user.email, "grace@example.com");
    assert_eq!(user.roles, vec![RoleId::CUSTOMER]);
    assert_eq!(user.address_id, None);

    let (found, hash) = store
        .user_id_and_password_by_email("grace@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, id);
    assert_eq!(hash, "hash");
}

#[tokio::test]
#[serial]
async fn test_user_without_roles_is_found() {
    let store = get_test_store().await;
    let mut tx = store.begin().await.unwrap();
    let id = store
        .save_user_with_tx(&mut tx, &customer("noroles@example.com"), "hash")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let user = store.user(id).await.unwrap().unwrap();
    assert!(user.roles.is_empty());
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_is_conflict_and_rolls_back() {
    let store = get_test_store().await;
    seed_user(&store, "dup@example.com").await;

    let mut tx = store.begin().await.unwrap();
    let result = store
        .save_user_with_tx(&mut tx, &customer("dup@example.com"), "hash")
        .await;
    assert!(matches!(result, Err(StorageError::Conflict(_))));
    tx.rollback().await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM role_user_map")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[serial]
async fn test_dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    {
        let mut tx = store.begin().await.unwrap();
        store
            .save_user_with_tx(&mut tx, &customer("ghost@example.com"), "hash")
            .await
            .unwrap();
    }

    let found = store
        .user_id_and_password_by_email("ghost@example.com")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
#[serial]
async fn test_update_profile_conflicts_on_taken_email() {
    let store = get_test_store().await;
    let first = seed_user(&store, "first@example.com").await;
    seed_user(&store, "second@example.com").await;

    let mut tx = store.begin().await.unwrap();
    let result = store
        .update_user_with_tx(
            &mut tx,
            first,
            &ProfileUpdate {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                email: "second@example.com".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(StorageError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn test_product_search_filters_and_pages() {
    let store = get_test_store().await;
    let lamp = seed_product(&store, "Desk Lamp", 2500, Some(5000)).await;
    let floor = seed_product(&store, "Floor lamp", 9000, None).await;
    seed_product(&store, "Chair", 4000, None).await;
    let percent = seed_product(&store, "100% Lamp", 1000, Some(1050)).await;

    let all_lamps = store
        .product_ids(&ProductQuery::new(Page::new(1, 10)).search("LAMP"))
        .await
        .unwrap();
    assert_eq!(all_lamps, vec![lamp, floor, percent]);

    let literal = store
        .product_ids(&ProductQuery::new(Page::new(1, 10)).search("0%"))
        .await
        .unwrap();
    assert_eq!(literal, vec![percent]);

    let discounted = store
        .product_ids(&ProductQuery::new(Page::new(1, 10)).filter(ProductFilter {
            min_discount: Some(40),
            ..ProductFilter::default()
        }))
        .await
        .unwrap();
    assert_eq!(discounted, vec![lamp]);

    let cheap = store
        .product_ids(&ProductQuery::new(Page::new(1, 10)).filter(ProductFilter {
            min_price: Some(Money::from_cents(2000)),
            max_price: Some(Money::from_cents(5000)),
            ..ProductFilter::default()
        }))
        .await
        .unwrap();
    assert_eq!(cheap.len(), 2);

    let second_page = store
        .product_ids(&ProductQuery::new(Page::new(2, 3)))
        .await
        .unwrap();
    assert_eq!(second_page, vec![percent]);

    let products = store.products_from_ids(&[floor, lamp]).await.unwrap();
    assert_eq!(products[0].id, floor);
    assert_eq!(products[1].price.old, Some(Money::from_cents(5000)));
}

#[tokio::test]
#[serial]
async fn test_order_and_stock_update_commit_together() {
    let store = get_test_store().await;
    let user = seed_user(&store, "buyer@example.com").await;
    let product_id = seed_product(&store, "Mug", 800, None).await;

    let mut tx = store.begin().await.unwrap();
    let address_id = store
        .save_address_with_tx(&mut tx, &address("Albany"))
        .await
        .unwrap();
    store
        .set_address_with_tx(&mut tx, user, Some(address_id))
        .await
        .unwrap();
    let mut product = store
        .product_with_tx(&mut tx, product_id)
        .await
        .unwrap()
        .unwrap();
    product.quantity -= 3;
    store.update_product_with_tx(&mut tx, &product).await.unwrap();
    store
        .save_order_with_tx(&mut tx, user, product_id, product.price.current, 3, address_id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.product(product_id).await.unwrap().unwrap().quantity, 2);
    let orders = store.orders_by_customer(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].quantity, 3);
    assert_eq!(orders[0].unit_price, Money::from_cents(800));
    assert_eq!(orders[0].shipping_address_id, Some(address_id));
}

#[tokio::test]
#[serial]
async fn test_address_delete_clears_references() {
    let store = get_test_store().await;
    let user = seed_user(&store, "mover@example.com").await;

    let mut tx = store.begin().await.unwrap();
    let address_id = store
        .save_address_with_tx(&mut tx, &address("Boston"))
        .await
        .unwrap();
    store
        .set_address_with_tx(&mut tx, user, Some(address_id))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(
        store
            .update_address_with_tx(&mut tx, address_id, &address("Salem"))
            .await
            .unwrap()
    );
    tx.commit().await.unwrap();
    assert_eq!(
        store.address(address_id).await.unwrap().unwrap().city,
        "Salem"
    );

    let mut tx = store.begin().await.unwrap();
    store.set_address_with_tx(&mut tx, user, None).await.unwrap();
    store
        .delete_address_with_tx(&mut tx, address_id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(store.address(address_id).await.unwrap().is_none());
    assert_eq!(store.user(user).await.unwrap().unwrap().address_id, None);
}

#[tokio::test]
#[serial]
async fn test_cart_upsert_and_count() {
    let store = get_test_store().await;
    let user = seed_user(&store, "cart@example.com").await;
    let mug = seed_product(&store, "Mug", 800, None).await;
    let plate = seed_product(&store, "Plate", 1200, None).await;

    for product_id in [mug, mug, plate] {
        let mut tx = store.begin().await.unwrap();
        store
            .add_cart_item_with_tx(&mut tx, user, product_id, 1)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let items = store.cart_items(user).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product.id, mug);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(store.cart_item_count(user).await.unwrap(), 3);

    let mut tx = store.begin().await.unwrap();
    let missing = store
        .add_cart_item_with_tx(&mut tx, user, ProductId::new(9999), 1)
        .await;
    assert!(matches!(missing, Err(StorageError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn test_cart_quantity_overflow_is_conflict() {
    let store = get_test_store().await;
    let user = seed_user(&store, "overflow@example.com").await;
    let mug = seed_product(&store, "Mug", 800, None).await;

    let mut tx = store.begin().await.unwrap();
    store
        .add_cart_item_with_tx(&mut tx, user, mug, i32::MAX)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let overflow = store.add_cart_item_with_tx(&mut tx, user, mug, 1).await;
    assert!(matches!(overflow, Err(StorageError::Conflict(_))));
    drop(tx);

    assert_eq!(store.cart_item_count(user).await.unwrap(), i64::from(i32::MAX));
}

#[tokio::test]
#[serial]
async fn test_discount_filter_handles_extreme_prices() {
    let store = get_test_store().await;
    let bargain = seed_product(&store, "Bargain", 1, Some(i64::MAX / 2)).await;

    let found = store
        .product_ids(&ProductQuery::new(Page::new(1, 10)).filter(ProductFilter {
            min_discount: Some(50),
            ..ProductFilter::default()
        }))
        .await
        .unwrap();
    assert_eq!(found, vec![bargain]);
}

#[tokio::test]
#[serial]
async fn test_credit_cards_are_scoped_to_owner() {
    let store = get_test_store().await;
    let owner = seed_user(&store, "owner@example.com").await;
    let other = seed_user(&store, "other@example.com").await;

    let card = store
        .save_credit_card(
            owner,
            &NewCreditCard {
                name: "Work".to_string(),
                number: "4111111111111111".to_string(),
                cvc: "321".to_string(),
                expiry: "11/30".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(!store.delete_credit_card(other, card).await.unwrap());
    let cards = store.credit_cards(owner).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].expiry, "11/30");
    assert!(store.delete_credit_card(owner, card).await.unwrap());
}
