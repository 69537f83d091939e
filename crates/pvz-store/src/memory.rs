use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};
use tokio::sync::RwLock;

use crate::{
    JoinedRow, PickupPoint, Product, PvzPageQuery, Reception, Result, StoreError, User,
    store::{JoinedRowStream, PickupPointStore, ProductStore, ReceptionStore, UserStore},
};

#[derive(Default)]
struct Tables {
    pickup_points: Vec<PickupPoint>,
    receptions: Vec<Reception>,
    products: Vec<Product>,
    users: Vec<User>,
    clock: Option<DateTime<Utc>>,
}

impl Tables {
    /// Server-side `now()` at microsecond precision, strictly increasing so
    /// creation order is always recoverable from timestamps.
    fn now(&mut self) -> DateTime<Utc> {
        let mut ts = Utc::now().trunc_subsecs(6);
        if let Some(last) = self.clock
            && ts <= last
        {
            ts = last + Duration::microseconds(1);
        }
        self.clock = Some(ts);
        ts
    }
}

/// In-memory store implementation for testing.
///
/// Enforces the same integrity rules as the PostgreSQL schema: foreign keys,
/// one open reception per pickup point and unique e-mails.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with `StoreError::Unavailable`
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Inserts a pickup point with an explicit registration date.
    pub async fn seed_pickup_point(&self, pickup_point: PickupPoint) {
        self.tables.write().await.pickup_points.push(pickup_point);
    }

    /// Returns the total number of products stored.
    pub async fn product_count(&self) -> usize {
        self.tables.read().await.products.len()
    }

    /// Returns every reception of a pickup point, oldest first.
    pub async fn receptions_of(&self, pvz_id: PvzId) -> Vec<Reception> {
        let tables = self.tables.read().await;
        let mut receptions: Vec<_> = tables
            .receptions
            .iter()
            .filter(|r| r.pvz_id == pvz_id)
            .cloned()
            .collect();
        receptions.sort_by_key(|r| (r.created_at, r.id));
        receptions
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

fn sorted_page(tables: &Tables, query: &PvzPageQuery) -> Vec<PickupPoint> {
    let mut selected: Vec<_> = tables
        .pickup_points
        .iter()
        .filter(|p| query.matches(p))
        .cloned()
        .collect();
    selected.sort_by_key(|p| (p.registration_date, p.id));
    selected
        .into_iter()
        .skip(query.offset.max(0) as usize)
        .take(query.limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl PickupPointStore for InMemoryStore {
    async fn insert_pickup_point(&self, id: PvzId, city: City) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let registration_date = tables.now();
        tables.pickup_points.push(PickupPoint {
            id,
            registration_date,
            city,
        });
        Ok(())
    }

    async fn get_pickup_point(&self, id: PvzId) -> Result<Option<PickupPoint>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.pickup_points.iter().find(|p| p.id == id).cloned())
    }

    async fn list_pickup_points(
        &self,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<PickupPoint>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let query = PvzPageQuery::new(limit.unwrap_or(i64::MAX), offset);
        Ok(sorted_page(&tables, &query))
    }

    async fn query_pickup_points_joined<'a>(
        &'a self,
        query: PvzPageQuery,
    ) -> Result<JoinedRowStream<'a>> {
        self.check_available()?;
        let tables = self.tables.read().await;

        let mut rows = Vec::new();
        for pvz in sorted_page(&tables, &query) {
            let mut receptions: Vec<_> = tables
                .receptions
                .iter()
                .filter(|r| r.pvz_id == pvz.id)
                .collect();
            receptions.sort_by_key(|r| (r.created_at, r.id));

            if receptions.is_empty() {
                rows.push(Ok(JoinedRow {
                    pvz: pvz.clone(),
                    reception: None,
                    product: None,
                }));
                continue;
            }

            for reception in receptions {
                let mut products: Vec<_> = tables
                    .products
                    .iter()
                    .filter(|p| p.reception_id == reception.id)
                    .collect();
                products.sort_by_key(|p| (p.created_at, p.id));

                if products.is_empty() {
                    rows.push(Ok(JoinedRow {
                        pvz: pvz.clone(),
                        reception: Some(reception.clone()),
                        product: None,
                    }));
                    continue;
                }

                for product in products {
                    rows.push(Ok(JoinedRow {
                        pvz: pvz.clone(),
                        reception: Some(reception.clone()),
                        product: Some(product.clone()),
                    }));
                }
            }
        }

        Ok(Box::pin(futures_util::stream::iter(rows)))
    }
}

#[async_trait]
impl ReceptionStore for InMemoryStore {
    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .receptions
            .iter()
            .find(|r| r.pvz_id == pvz_id && r.is_open())
            .cloned())
    }

    async fn has_open_reception(&self, pvz_id: PvzId) -> Result<bool> {
        Ok(self.find_open_reception(pvz_id).await?.is_some())
    }

    async fn insert_reception(
        &self,
        id: ReceptionId,
        pvz_id: PvzId,
        status: ReceptionStatus,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if !tables.pickup_points.iter().any(|p| p.id == pvz_id) {
            return Err(StoreError::MissingParent {
                entity: "pickup point",
            });
        }

        // Unique partial index simulation
        if status == ReceptionStatus::InProgress
            && tables
                .receptions
                .iter()
                .any(|r| r.pvz_id == pvz_id && r.is_open())
        {
            return Err(StoreError::OpenReceptionExists(pvz_id));
        }

        let closed_at = status.is_terminal().then_some(created_at);
        tables.receptions.push(Reception {
            id,
            pvz_id,
            created_at,
            status,
            closed_at,
        });
        Ok(())
    }

    async fn get_reception(&self, id: ReceptionId) -> Result<Option<Reception>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.receptions.iter().find(|r| r.id == id).cloned())
    }

    async fn update_reception_close(
        &self,
        id: ReceptionId,
        closed_at: DateTime<Utc>,
    ) -> Result<u64> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables
            .receptions
            .iter_mut()
            .find(|r| r.id == id && r.is_open())
        {
            Some(reception) => {
                reception.status = ReceptionStatus::Closed;
                reception.closed_at = Some(closed_at);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(
        &self,
        id: ProductId,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        match tables.receptions.iter().find(|r| r.id == reception_id) {
            None => {
                return Err(StoreError::MissingParent {
                    entity: "reception",
                });
            }
            Some(r) if !r.is_open() => return Err(StoreError::ReceptionClosed(reception_id)),
            Some(_) => {}
        }

        let created_at = tables.now();
        tables.products.push(Product {
            id,
            reception_id,
            product_type,
            created_at,
        });
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| p.reception_id == reception_id)
            .max_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn delete_product(&self, id: ProductId) -> Result<u64> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let Some(reception_id) = tables
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.reception_id)
        else {
            return Ok(0);
        };

        if !tables
            .receptions
            .iter()
            .any(|r| r.id == reception_id && r.is_open())
        {
            return Err(StoreError::ReceptionClosed(reception_id));
        }

        tables.products.retain(|p| p.id != id);
        Ok(1)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(
        &self,
        id: UserId,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::EmailTaken(email.to_string()));
        }

        let created_at = tables.now();
        tables.users.push(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at,
        });
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_role(&self, role: Role) -> Result<Option<User>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.role == role).cloned())
    }
}
