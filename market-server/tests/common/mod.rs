//! Shared fixture: a small two-merchant marketplace in a MemoryStore
//!
//! ```text
//! merchant 42: products 5 (published), 9 (draft, low stock)
//! merchant 8:  products 7 (published), 11 (draft)
//!
//! order 100 (customer 500, paid)    items 1 → product 5, 4 → product 9
//! order 101 (customer 501, pending) item  2 → product 9
//! order 102 (customer 502, shipped) item  3 → product 7
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use market_server::MarketplaceEngine;
use market_server::db::MemoryStore;
use market_server::guard::BoxError;
use market_server::orders::Notifier;
use market_server::services::EngineLimits;
use market_server::utils::time::TimeWindow;
use parking_lot::Mutex;
use shared::models::{
    Banner, Category, ConditionTag, Customer, Entity, Operation, Order, OrderItem, OrderStatus,
    PermissionGrant, Principal, Product, ResourceType, Role,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const MERCHANT_ROLE: i64 = 10;
pub const ANALYST_ROLE: i64 = 11;

/// Records every status notification; can be switched to fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, OrderStatus, OrderStatus)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_status_changed(&self, order: &Order, previous: OrderStatus) -> Result<(), BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("mail relay unreachable".into());
        }
        self.sent.lock().push((order.id, previous, order.status));
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: MarketplaceEngine,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store);
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = MarketplaceEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            EngineLimits::default(),
        );
        Self {
            store,
            notifier,
            engine,
        }
    }
}

pub fn merchant_a() -> Principal {
    Principal::new(42, "alice", vec![Role::new(MERCHANT_ROLE, "merchant")])
}

pub fn merchant_b() -> Principal {
    Principal::new(8, "bob", vec![Role::new(MERCHANT_ROLE, "merchant")])
}

/// Merchant role but nothing created yet
pub fn newcomer() -> Principal {
    Principal::new(55, "nina", vec![Role::new(MERCHANT_ROLE, "merchant")])
}

/// Read-only, unconditioned grants on every resource
pub fn analyst() -> Principal {
    Principal::new(77, "ana", vec![Role::new(ANALYST_ROLE, "analyst")])
}

pub fn admin() -> Principal {
    Principal::new(1, "root", vec![Role::super_admin(1)])
}

/// Authenticated but without any role
pub fn visitor() -> Principal {
    Principal::new(99, "guest", vec![])
}

fn product(id: i64, owner: i64, stock: i64, published: bool, created_at: i64) -> Entity {
    Entity::Product(Product {
        id,
        name: format!("Product {id}"),
        created_by: owner,
        category_id: None,
        price: 20.0,
        stock,
        published_at: published.then_some(created_at),
        created_at,
    })
}

fn order(id: i64, customer_id: i64, status: OrderStatus, total: f64, created_at: i64) -> Entity {
    Entity::Order(Order {
        id,
        reference: format!("ORD-{id}"),
        customer_id,
        status,
        total_amount: total,
        created_at,
    })
}

fn item(id: i64, order_id: i64, product_id: i64, quantity: i64, unit_price: f64) -> Entity {
    Entity::OrderItem(OrderItem {
        id,
        order_id,
        product_id,
        quantity,
        unit_price,
    })
}

fn customer(id: i64, name: &str, created_at: i64) -> Entity {
    Entity::Customer(Customer {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        created_at,
    })
}

fn seed(store: &MemoryStore) {
    let now = Utc::now();
    let this_month = TimeWindow::month_of(now).start + 1_000;
    let last_month = TimeWindow::previous_month_of(now).start + 1_000;

    store.insert_all([
        product(5, 42, 10, true, this_month),
        product(9, 42, 2, false, this_month),
        product(7, 8, 30, true, last_month),
        product(11, 8, 0, false, last_month),
        order(100, 500, OrderStatus::Paid, 60.0, this_month),
        order(101, 501, OrderStatus::Pending, 20.0, this_month),
        order(102, 502, OrderStatus::Shipped, 50.0, last_month),
        item(1, 100, 5, 2, 20.0),
        item(4, 100, 9, 1, 20.0),
        item(2, 101, 9, 1, 20.0),
        item(3, 102, 7, 1, 50.0),
        customer(500, "Ada", this_month),
        customer(501, "Ben", last_month),
        customer(502, "Cleo", last_month),
        Entity::Category(Category {
            id: 20,
            name: "Lamps".into(),
            created_by: 42,
            created_at: this_month,
        }),
        Entity::Category(Category {
            id: 21,
            name: "Rugs".into(),
            created_by: 8,
            created_at: this_month,
        }),
        Entity::Banner(Banner {
            id: 30,
            title: "Spring sale".into(),
            created_by: 42,
            published_at: None,
            created_at: this_month,
        }),
    ]);

    let owned = |resource, operation| {
        PermissionGrant::new(MERCHANT_ROLE, resource, operation)
            .with_condition(ConditionTag::IsCreator)
    };
    for resource in [ResourceType::Product, ResourceType::Category, ResourceType::Banner] {
        for operation in [Operation::Read, Operation::Update, Operation::Delete] {
            store.add_grant(owned(resource, operation));
        }
    }
    for resource in [ResourceType::Order, ResourceType::OrderItem, ResourceType::Customer] {
        store.add_grant(PermissionGrant::new(MERCHANT_ROLE, resource, Operation::Read));
    }
    store.add_grant(owned(ResourceType::Order, Operation::Update));

    for resource in ResourceType::ALL {
        store.add_grant(PermissionGrant::new(ANALYST_ROLE, resource, Operation::Read));
    }
}
