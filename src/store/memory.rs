//! In-process repositories backing handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User};
use crate::orders::repo::OrderRepo;
use crate::orders::repo_types::{DateRange, NewOrder, Order};
use crate::products::repo::ProductRepo;
use crate::products::repo_types::{NewProduct, Product};
use crate::uploads::repo::UploadRepo;
use crate::uploads::repo_types::{NewUpload, Upload, UploadFilter, UploadFlags};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    uploads: Vec<Upload>,
    orders: Vec<Order>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn upload_matches(filter: &UploadFilter, u: &Upload) -> bool {
    filter.user_id.map_or(true, |id| u.user_id == id)
        && filter.in_cart.map_or(true, |v| u.in_cart == v)
        && filter.ordered.map_or(true, |v| u.ordered == v)
}

/// Same half-open window as the SQL in `orders::repo`.
fn in_range(range: &DateRange, t: OffsetDateTime) -> bool {
    range.from.map_or(true, |f| t >= f) && range.to.map_or(true, |to| t < to)
}

impl MemoryStore {
    pub fn user(&self, email: &str) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.iter().find(|u| u.email == email).cloned()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.user(email))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            is_admin: new.is_admin,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            category: new.category,
            image: new.image,
            price: new.price,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.tables.lock().unwrap().products.clone())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let t = self.tables.lock().unwrap();
        Ok(t.products.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl UploadRepo for MemoryStore {
    async fn insert(&self, new: NewUpload) -> anyhow::Result<Upload> {
        let now = OffsetDateTime::now_utc();
        let upload = Upload {
            id: new.id,
            user_id: new.user_id,
            s3_key: new.s3_key,
            content_type: new.content_type,
            size_bytes: new.size_bytes,
            in_cart: false,
            ordered: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().uploads.push(upload.clone());
        Ok(upload)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Upload>> {
        let t = self.tables.lock().unwrap();
        Ok(t.uploads.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self, filter: &UploadFilter) -> anyhow::Result<Vec<Upload>> {
        let t = self.tables.lock().unwrap();
        Ok(t.uploads
            .iter()
            .rev()
            .filter(|u| upload_matches(filter, u))
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn update_flags(&self, id: Uuid, flags: UploadFlags) -> anyhow::Result<Option<Upload>> {
        let mut t = self.tables.lock().unwrap();
        let Some(u) = t.uploads.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = flags.in_cart {
            u.in_cart = v;
        }
        if let Some(v) = flags.ordered {
            u.ordered = v;
        }
        u.updated_at = OffsetDateTime::now_utc();
        Ok(Some(u.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.uploads.len();
        t.uploads.retain(|u| u.id != id);
        Ok(t.uploads.len() < before)
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order> {
        let mut t = self.tables.lock().unwrap();
        for u in t
            .uploads
            .iter_mut()
            .filter(|u| u.user_id == new.user_id && new.upload_ids.contains(&u.id))
        {
            u.ordered = true;
            u.in_cart = false;
        }
        let order = Order {
            id: new.id,
            user_id: new.user_id,
            payment_intent_id: new.payment_intent_id.clone(),
            total: new.total(),
            created_at: OffsetDateTime::now_utc(),
            items: new.items,
        };
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let t = self.tables.lock().unwrap();
        Ok(t.orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_in_range(&self, range: DateRange) -> anyhow::Result<Vec<Order>> {
        let t = self.tables.lock().unwrap();
        Ok(t.orders
            .iter()
            .filter(|o| in_range(&range, o.created_at))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn range_includes_start_and_excludes_end() {
        let range = DateRange {
            from: Some(datetime!(2024-05-01 00:00 UTC)),
            to: Some(datetime!(2024-05-02 00:00 UTC)),
        };
        assert!(in_range(&range, datetime!(2024-05-01 00:00 UTC)));
        assert!(in_range(&range, datetime!(2024-05-01 23:59 UTC)));
        assert!(!in_range(&range, datetime!(2024-05-02 00:00 UTC)));
        assert!(!in_range(&range, datetime!(2024-04-30 23:59 UTC)));
        assert!(in_range(&DateRange { from: None, to: None }, datetime!(1999-01-01 00:00 UTC)));
    }
}
