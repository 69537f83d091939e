//! Entity records as they are persisted.

use chrono::{DateTime, Utc};
use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};

/// A pickup point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupPoint {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: City,
}

/// A reception session at a pickup point.
///
/// `closed_at` is `None` exactly while `status` is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub id: ReceptionId,
    pub pvz_id: PvzId,
    pub created_at: DateTime<Utc>,
    pub status: ReceptionStatus,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Reception {
    /// Creates a reception in progress.
    pub fn open(id: ReceptionId, pvz_id: PvzId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            pvz_id,
            created_at,
            status: ReceptionStatus::InProgress,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ReceptionStatus::InProgress
    }
}

/// A product logged against a reception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub reception_id: ReceptionId,
    pub product_type: ProductType,
    pub created_at: DateTime<Utc>,
}

/// A user account. `password_hash` is opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// One row of the pickup point ⟕ reception ⟕ product join.
///
/// `reception` is `None` for a pickup point without receptions; `product` is
/// `None` for a reception without products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub pvz: PickupPoint,
    pub reception: Option<Reception>,
    pub product: Option<Product>,
}

/// Window over pickup points for the joined listing.
///
/// `limit` and `offset` count distinct pickup points, ordered by
/// registration date. Date bounds are inclusive and each applies on its own.
#[derive(Debug, Clone, Default)]
pub struct PvzPageQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl PvzPageQuery {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            ..Default::default()
        }
    }

    /// Restricts the window to pickup points registered within the bounds.
    pub fn registered_between(
        mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Returns true if the pickup point passes the date filter.
    pub fn matches(&self, pvz: &PickupPoint) -> bool {
        self.start_date.is_none_or(|start| pvz.registration_date >= start)
            && self.end_date.is_none_or(|end| pvz.registration_date <= end)
    }
}
