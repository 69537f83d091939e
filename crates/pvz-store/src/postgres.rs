use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    JoinedRow, PickupPoint, Product, PvzPageQuery, Reception, Result, StoreError, User,
    store::{JoinedRowStream, PickupPointStore, ProductStore, ReceptionStore, UserStore},
};

/// Name of the partial unique index guarding one open reception per pickup point.
const OPEN_RECEPTION_INDEX: &str = "one_open_reception_per_pvz";

const USERS_EMAIL_KEY: &str = "users_email_key";

const JOINED_PAGE_SQL: &str = r#"
    WITH page AS (
        SELECT id, registration_date, city
        FROM pvz
        WHERE ($1::timestamptz IS NULL OR registration_date >= $1)
          AND ($2::timestamptz IS NULL OR registration_date <= $2)
        ORDER BY registration_date ASC, id ASC
        LIMIT $3 OFFSET $4
    )
    SELECT
        p.id AS pvz_id,
        p.registration_date AS pvz_registration_date,
        p.city AS pvz_city,
        r.id AS reception_id,
        r.created_at AS reception_created_at,
        r.pvz_id AS reception_pvz_id,
        r.status AS reception_status,
        r.closed_at AS reception_closed_at,
        pr.id AS product_id,
        pr.created_at AS product_created_at,
        pr.type AS product_type,
        pr.reception_id AS product_reception_id
    FROM page p
    LEFT JOIN receptions r ON r.pvz_id = p.id
    LEFT JOIN products pr ON pr.reception_id = r.id
    ORDER BY p.registration_date ASC, p.id ASC,
             r.created_at ASC, r.id ASC,
             pr.created_at ASC, pr.id ASC
"#;

/// PostgreSQL-backed store implementing every entity trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database, retrying with a fixed delay between attempts.
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
                .await
            {
                Ok(pool) => return Ok(Self::new(pool)),
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, attempts, error = %e, "database connection failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::Database(e)),
            }
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_pickup_point(row: &PgRow) -> Result<PickupPoint> {
        Ok(PickupPoint {
            id: PvzId::from_uuid(row.try_get::<Uuid, _>("id")?),
            registration_date: row.try_get("registration_date")?,
            city: row.try_get::<String, _>("city")?.parse()?,
        })
    }

    fn row_to_reception(row: &PgRow) -> Result<Reception> {
        Ok(Reception {
            id: ReceptionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            pvz_id: PvzId::from_uuid(row.try_get::<Uuid, _>("pvz_id")?),
            created_at: row.try_get("created_at")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            closed_at: row.try_get("closed_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            reception_id: ReceptionId::from_uuid(row.try_get::<Uuid, _>("reception_id")?),
            product_type: row.try_get::<String, _>("type")?.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            email: row.try_get("email")?,
            password_hash: row.try_get("password")?,
            role: row.try_get::<String, _>("role")?.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_joined(row: &PgRow) -> Result<JoinedRow> {
        let pvz = PickupPoint {
            id: PvzId::from_uuid(row.try_get::<Uuid, _>("pvz_id")?),
            registration_date: row.try_get("pvz_registration_date")?,
            city: row.try_get::<String, _>("pvz_city")?.parse()?,
        };

        let reception = match row.try_get::<Option<Uuid>, _>("reception_id")? {
            None => None,
            Some(id) => Some(Reception {
                id: ReceptionId::from_uuid(id),
                pvz_id: PvzId::from_uuid(required(
                    row.try_get("reception_pvz_id")?,
                    "reception_pvz_id",
                )?),
                created_at: required(row.try_get("reception_created_at")?, "reception_created_at")?,
                status: required::<String>(row.try_get("reception_status")?, "reception_status")?
                    .parse()?,
                closed_at: row.try_get("reception_closed_at")?,
            }),
        };

        let product = match row.try_get::<Option<Uuid>, _>("product_id")? {
            None => None,
            Some(id) => Some(Product {
                id: ProductId::from_uuid(id),
                reception_id: ReceptionId::from_uuid(required(
                    row.try_get("product_reception_id")?,
                    "product_reception_id",
                )?),
                product_type: required::<String>(row.try_get("product_type")?, "product_type")?
                    .parse()?,
                created_at: required(row.try_get("product_created_at")?, "product_created_at")?,
            }),
        };

        Ok(JoinedRow {
            pvz,
            reception,
            product,
        })
    }
}

fn required<T>(value: Option<T>, column: &'static str) -> Result<T> {
    value.ok_or(StoreError::IncompleteRow(column))
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

fn violates_constraint(e: &sqlx::Error, name: &str) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.constraint() == Some(name))
}

/// Share-locks a reception for the rest of the transaction and checks it is
/// still in progress. A concurrent close blocks until the transaction ends.
async fn lock_open_reception(
    tx: &mut Transaction<'_, Postgres>,
    reception_id: ReceptionId,
) -> Result<()> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM receptions WHERE id = $1 FOR SHARE")
            .bind(reception_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

    let status: ReceptionStatus = status
        .ok_or(StoreError::MissingParent {
            entity: "reception",
        })?
        .parse()?;

    if status != ReceptionStatus::InProgress {
        return Err(StoreError::ReceptionClosed(reception_id));
    }
    Ok(())
}

#[async_trait]
impl PickupPointStore for PostgresStore {
    async fn insert_pickup_point(&self, id: PvzId, city: City) -> Result<()> {
        sqlx::query("INSERT INTO pvz (id, city) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(city.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_pickup_point(&self, id: PvzId) -> Result<Option<PickupPoint>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, registration_date, city FROM pvz WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_pickup_point).transpose()
    }

    async fn list_pickup_points(
        &self,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<PickupPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, registration_date, city
            FROM pvz
            ORDER BY registration_date ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_pickup_point).collect()
    }

    async fn query_pickup_points_joined<'a>(
        &'a self,
        query: PvzPageQuery,
    ) -> Result<JoinedRowStream<'a>> {
        use futures_util::StreamExt;

        let stream = sqlx::query(JOINED_PAGE_SQL)
            .bind(query.start_date)
            .bind(query.end_date)
            .bind(query.limit)
            .bind(query.offset)
            .fetch(&self.pool)
            .map(|result| match result {
                Ok(row) => Self::row_to_joined(&row),
                Err(e) => Err(StoreError::Database(e)),
            });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ReceptionStore for PostgresStore {
    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, pvz_id, created_at, status, closed_at
            FROM receptions
            WHERE pvz_id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(pvz_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_reception).transpose()
    }

    async fn has_open_reception(&self, pvz_id: PvzId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM receptions WHERE pvz_id = $1 AND status = 'in_progress')",
        )
        .bind(pvz_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_reception(
        &self,
        id: ReceptionId,
        pvz_id: PvzId,
        status: ReceptionStatus,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO receptions (id, pvz_id, status, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.as_uuid())
        .bind(pvz_id.as_uuid())
        .bind(status.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates_constraint(&e, OPEN_RECEPTION_INDEX) {
                return StoreError::OpenReceptionExists(pvz_id);
            }
            if is_foreign_key_violation(&e) {
                return StoreError::MissingParent {
                    entity: "pickup point",
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_reception(&self, id: ReceptionId) -> Result<Option<Reception>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, pvz_id, created_at, status, closed_at FROM receptions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_reception).transpose()
    }

    async fn update_reception_close(
        &self,
        id: ReceptionId,
        closed_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE receptions
            SET status = 'close', closed_at = $1
            WHERE id = $2 AND status = 'in_progress'
            "#,
        )
        .bind(closed_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(
        &self,
        id: ProductId,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        lock_open_reception(&mut tx, reception_id).await?;

        sqlx::query("INSERT INTO products (id, reception_id, type) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(reception_id.as_uuid())
            .bind(product_type.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, reception_id, type, created_at FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn find_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, reception_id, type, created_at
            FROM products
            WHERE reception_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(reception_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let parent: Option<PgRow> = sqlx::query(
            r#"
            SELECT r.id, r.status
            FROM products p
            JOIN receptions r ON r.id = p.reception_id
            WHERE p.id = $1
            FOR SHARE OF r
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(parent) = parent else {
            return Ok(0);
        };
        let reception_id = ReceptionId::from_uuid(parent.try_get::<Uuid, _>("id")?);
        let status: ReceptionStatus = parent.try_get::<String, _>("status")?.parse()?;
        if status != ReceptionStatus::InProgress {
            return Err(StoreError::ReceptionClosed(reception_id));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(
        &self,
        id: UserId,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, password, role) VALUES ($1, $2, $3, $4)")
            .bind(id.as_uuid())
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if violates_constraint(&e, USERS_EMAIL_KEY) {
                    return StoreError::EmailTaken(email.to_string());
                }
                StoreError::Database(e)
            })?;

        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, email, password, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_user_by_role(&self, role: Role) -> Result<Option<User>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, email, password, role, created_at
            FROM users
            WHERE role = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }
}
