//! Pickup-point registration and the paginated nested listing.

use chrono::{DateTime, Utc};
use common::{City, PvzId};
use pvz_store::{PickupPoint, PickupPointStore, PvzPageQuery};

use crate::error::DomainError;
use crate::listing::{PvzWithReceptions, fold_rows};

/// Largest page size accepted by the listing.
pub const MAX_PAGE_LIMIT: i64 = 30;

pub(crate) const INVALID_CITY: &str = "invalid city";
pub(crate) const INVALID_PAGE: &str = "invalid page number";
pub(crate) const INVALID_LIMIT: &str = "invalid limit";
pub(crate) const INVALID_START_DATE: &str = "invalid start date format";
pub(crate) const INVALID_END_DATE: &str = "invalid end date format";

/// Raw listing parameters as received from a caller.
///
/// Dates are RFC 3339 strings; an empty string counts as absent.
#[derive(Debug, Clone)]
pub struct ListPvzParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListPvzParams {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            page: 1,
            limit: 10,
        }
    }
}

impl ListPvzParams {
    /// Checks the parameters and turns them into a store window.
    pub fn validate(&self) -> Result<PvzPageQuery, DomainError> {
        if self.page < 1 {
            return Err(DomainError::validation(INVALID_PAGE));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(DomainError::validation(INVALID_LIMIT));
        }

        let start = parse_bound(self.start_date.as_deref(), INVALID_START_DATE)?;
        let end = parse_bound(self.end_date.as_deref(), INVALID_END_DATE)?;

        let offset = (self.page - 1)
            .checked_mul(self.limit)
            .ok_or_else(|| DomainError::validation(INVALID_PAGE))?;

        Ok(PvzPageQuery::new(self.limit, offset).registered_between(start, end))
    }
}

fn parse_bound(raw: Option<&str>, message: &str) -> Result<Option<DateTime<Utc>>, DomainError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|_| DomainError::validation(message)),
    }
}

/// Service registering pickup points and assembling the nested listing.
pub struct PvzService<S: PickupPointStore> {
    store: S,
}

impl<S: PickupPointStore> PvzService<S> {
    /// Creates a new pickup-point service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a pickup point in one of the supported cities.
    #[tracing::instrument(skip(self))]
    pub async fn create_pvz(&self, city: &str) -> Result<PickupPoint, DomainError> {
        let city: City = city
            .parse()
            .map_err(|_| DomainError::validation(INVALID_CITY))?;

        let id = PvzId::new();
        self.store.insert_pickup_point(id, city).await?;

        let pvz = self
            .store
            .get_pickup_point(id)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("pickup point {id} missing after insert")))?;

        tracing::info!(pvz_id = %pvz.id, city = %pvz.city, "pickup point registered");
        Ok(pvz)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_pvz(&self, id: PvzId) -> Result<PickupPoint, DomainError> {
        self.store
            .get_pickup_point(id)
            .await?
            .ok_or_else(|| DomainError::not_found(crate::reception::PVZ_NOT_FOUND))
    }

    /// Flat listing without relations, oldest first. `None` lists everything.
    #[tracing::instrument(skip(self))]
    pub async fn list_pvzs(
        &self,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<PickupPoint>, DomainError> {
        if limit.is_some_and(|l| l < 1) || offset < 0 {
            return Err(DomainError::validation(INVALID_LIMIT));
        }
        Ok(self.store.list_pickup_points(limit, offset).await?)
    }

    /// One page of pickup points with their receptions and products.
    #[tracing::instrument(skip(self))]
    pub async fn list_pvzs_with_relations(
        &self,
        params: &ListPvzParams,
    ) -> Result<Vec<PvzWithReceptions>, DomainError> {
        let query = params.validate()?;
        let rows = self.store.query_pickup_points_joined(query).await?;
        Ok(fold_rows(rows).await?)
    }
}
