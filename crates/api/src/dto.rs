//! JSON shapes of the HTTP surface.

use chrono::{DateTime, Utc};
use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus};
use domain::{PvzWithReceptions, ReceptionWithProducts};
use pvz_store::{PickupPoint, Product, Reception};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvzDto {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: City,
}

impl From<PickupPoint> for PvzDto {
    fn from(pvz: PickupPoint) -> Self {
        Self {
            id: pvz.id,
            registration_date: pvz.registration_date,
            city: pvz.city,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionDto {
    pub id: ReceptionId,
    pub date_time: DateTime<Utc>,
    pub pvz_id: PvzId,
    pub status: ReceptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Reception> for ReceptionDto {
    fn from(r: Reception) -> Self {
        Self {
            id: r.id,
            date_time: r.created_at,
            pvz_id: r.pvz_id,
            status: r.status,
            closed_at: r.closed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub reception_id: ReceptionId,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            date_time: p.created_at,
            product_type: p.product_type,
            reception_id: p.reception_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceptionItem {
    pub reception: ReceptionDto,
    pub products: Vec<ProductDto>,
}

impl From<ReceptionWithProducts> for ReceptionItem {
    fn from(node: ReceptionWithProducts) -> Self {
        Self {
            reception: node.reception.into(),
            products: node.products.into_iter().map(Into::into).collect(),
        }
    }
}

/// One element of `GET /pvz`.
#[derive(Debug, Serialize)]
pub struct PvzListItem {
    pub pvz: PvzDto,
    pub receptions: Vec<ReceptionItem>,
}

impl From<PvzWithReceptions> for PvzListItem {
    fn from(node: PvzWithReceptions) -> Self {
        Self {
            pvz: node.pvz.into(),
            receptions: node.receptions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct DummyLoginRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePvzRequest {
    pub city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceptionRequest {
    pub pvz_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    #[serde(rename = "type")]
    pub product_type: String,
    pub pvz_id: String,
}

/// Query string of `GET /pvz`. Kept as text so malformed numbers get the
/// same `{message}` body as every other validation failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPvzQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}
