//! gRPC surface of the pickup-point service.

pub mod proto {
    tonic::include_proto!("pvz.v1");
}

use domain::{DomainError, PvzService};
use prost_types::Timestamp;
use pvz_store::{PickupPoint, PickupPointStore};
use tonic::{Request, Response, Status};

use proto::pvz_service_server::PvzServiceServer;
use proto::{GetPvzListRequest, GetPvzListResponse, Pvz};

/// `pvz.v1.PVZService` backed by the pickup-point registry.
pub struct PvzGrpcService<S: PickupPointStore> {
    pvz: PvzService<S>,
}

impl<S: PickupPointStore + 'static> PvzGrpcService<S> {
    pub fn new(store: S) -> Self {
        Self {
            pvz: PvzService::new(store),
        }
    }

    pub fn into_server(self) -> PvzServiceServer<Self> {
        PvzServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl<S: PickupPointStore + 'static> proto::pvz_service_server::PvzService for PvzGrpcService<S> {
    #[tracing::instrument(skip(self, _request))]
    async fn get_pvz_list(
        &self,
        _request: Request<GetPvzListRequest>,
    ) -> Result<Response<GetPvzListResponse>, Status> {
        let pvzs = self
            .pvz
            .list_pvzs(None, 0)
            .await
            .map_err(to_status)?
            .into_iter()
            .map(to_proto)
            .collect();

        Ok(Response::new(GetPvzListResponse { pvzs }))
    }
}

fn to_proto(pvz: PickupPoint) -> Pvz {
    Pvz {
        id: pvz.id.to_string(),
        registration_date: Some(Timestamp {
            seconds: pvz.registration_date.timestamp(),
            nanos: pvz.registration_date.timestamp_subsec_nanos() as i32,
        }),
        city: pvz.city.to_string(),
    }
}

fn to_status(err: DomainError) -> Status {
    match err {
        DomainError::Validation(msg) => Status::invalid_argument(msg),
        DomainError::Conflict(msg) => Status::failed_precondition(msg),
        DomainError::NotFound(msg) => Status::not_found(msg),
        DomainError::Unauthorized(msg) => Status::unauthenticated(msg),
        other => {
            tracing::error!(error = %other, "pickup point listing failed");
            Status::internal("internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use common::City;
    use proto::pvz_service_server::PvzService as _;
    use pvz_store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn lists_every_pickup_point_in_registration_order() {
        let store = InMemoryStore::new();
        let registry = PvzService::new(store.clone());
        let first = registry.create_pvz("Москва").await.unwrap();
        let second = registry.create_pvz("Казань").await.unwrap();

        let service = PvzGrpcService::new(store);
        let response = service
            .get_pvz_list(Request::new(GetPvzListRequest {}))
            .await
            .unwrap()
            .into_inner();

        let ids: Vec<_> = response.pvzs.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![first.id.to_string(), second.id.to_string()]);
        assert_eq!(response.pvzs[1].city, City::Kazan.as_str());

        let ts = response.pvzs[0].registration_date.as_ref().unwrap();
        assert_eq!(ts.seconds, first.registration_date.timestamp());
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_list() {
        let service = PvzGrpcService::new(InMemoryStore::new());

        let response = service
            .get_pvz_list(Request::new(GetPvzListRequest {}))
            .await
            .unwrap();

        assert!(response.into_inner().pvzs.is_empty());
    }

    #[tokio::test]
    async fn store_outage_is_internal() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let service = PvzGrpcService::new(store);

        let status = service
            .get_pvz_list(Request::new(GetPvzListRequest {}))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(status.message(), "internal server error");
    }
}
