//! Mock repositories with call counters, shared by the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use firin_core::auth::repository::UserRepository;
use firin_core::auth::user::AdminUser;
use firin_core::auth::AuthError;
use firin_core::storefront::{
    ContactMessage, MessageRepository, Order, OrderRepository, OrderStatus, Product,
    ProductRepository, StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory user store. `find_calls` counts credential lookups, which lets
/// tests assert that a rate-limited request never reached the handler.
#[derive(Default)]
pub struct MockUserRepository {
    users: Mutex<Vec<AdminUser>>,
    find_calls: AtomicUsize,
}

impl MockUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password_hash: &str, role: &str) -> i64 {
        self.add_user_with_totp(username, password_hash, role, None)
    }

    pub fn add_user_with_totp(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        totp_secret: Option<&str>,
    ) -> i64 {
        let mut users = self.users.lock().unwrap();
        let id = users.len() as i64 + 1;
        let now = Utc::now();
        users.push(AdminUser {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            totp_secret: totp_secret.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        });
        id
    }

    pub fn deactivate(&self, username: &str) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.is_active = false;
        }
    }

    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AuthError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, AuthError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, AuthError> {
        Ok(self.add_user(username, password_hash, role))
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn set_active(&self, username: &str, active: bool) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.is_active = active;
        }
        Ok(())
    }

    async fn set_totp_secret(
        &self,
        username: &str,
        secret_hex: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.totp_secret = secret_hex.map(str::to_string);
        }
        Ok(())
    }

    async fn record_login(&self, id: i64) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AdminUser>, AuthError> {
        Ok(self.users.lock().unwrap().clone())
    }
}

/// In-memory order store. `update_calls` counts status writes so tests can
/// assert that a 422 left stored state untouched.
#[derive(Default)]
pub struct MockOrderRepository {
    orders: DashMap<i64, Order>,
    update_calls: AtomicUsize,
}

impl MockOrderRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&self, id: i64, status: OrderStatus) {
        let now = Utc::now();
        self.orders.insert(
            id,
            Order {
                id,
                customer_name: "Test Müşteri".to_string(),
                customer_phone: "+90 555 000 0000".to_string(),
                total_kurus: 12500,
                status,
                note: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    #[must_use]
    pub fn status_of(&self, id: i64) -> Option<OrderStatus> {
        self.orders.get(&id).map(|o| o.status)
    }

    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.clone()).collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.id));
        orders.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(orders)
    }

    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<bool, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        match self.orders.get_mut(&id) {
            Some(mut order) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory product catalog.
#[derive(Default)]
pub struct MockProductRepository {
    products: Mutex<Vec<Product>>,
}

impl MockProductRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, id: i64, name: &str, featured: bool) {
        self.products.lock().unwrap().push(Product {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            category: "ekmek".to_string(),
            price_kurus: 4500,
            description: None,
            is_featured: featured,
            is_active: true,
        });
    }
}

#[async_trait]
impl ProductRepository for MockProductRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.products.lock().unwrap().iter().find(|p| p.id == id && p.is_active).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.lock().unwrap().iter().filter(|p| p.is_active).cloned().collect())
    }

    async fn list_featured(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active && p.is_featured)
            .cloned()
            .collect())
    }
}

/// In-memory contact message store.
#[derive(Default)]
pub struct MockMessageRepository {
    messages: Mutex<Vec<ContactMessage>>,
}

impl MockMessageRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepository {
    async fn create(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        message: &str,
    ) -> Result<i64, StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let id = messages.len() as i64 + 1;
        messages.push(ContactMessage {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            message: message.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ContactMessage>, StoreError> {
        let messages = self.messages.lock().unwrap();
        let mut recent: Vec<ContactMessage> = messages.iter().rev().cloned().collect();
        recent.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(recent)
    }
}
