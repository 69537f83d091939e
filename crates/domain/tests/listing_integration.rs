//! Integration tests for the paginated pickup-point listing.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{City, PvzId};
use domain::{ListPvzParams, ProductService, PvzService, ReceptionService};
use pvz_store::{InMemoryStore, PickupPoint};

fn page(page: i64, limit: i64) -> ListPvzParams {
    ListPvzParams {
        page,
        limit,
        ..Default::default()
    }
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, d, 9, 0, 0).unwrap()
}

async fn seed(store: &InMemoryStore, registration_date: DateTime<Utc>) -> PvzId {
    let id = PvzId::new();
    store
        .seed_pickup_point(PickupPoint {
            id,
            registration_date,
            city: City::Moscow,
        })
        .await;
    id
}

#[tokio::test]
async fn round_trip_keeps_every_child_under_its_parent() {
    const N: usize = 4;
    const M: usize = 3;

    let store = InMemoryStore::new();
    let pvzs = PvzService::new(store.clone());
    let receptions = ReceptionService::new(store.clone());
    let products = ProductService::new(store.clone());

    for _ in 0..N {
        let pvz = pvzs.create_pvz("Казань").await.unwrap();
        receptions.create_reception(pvz.id).await.unwrap();
        for _ in 0..M {
            products.add_product(pvz.id, "электроника").await.unwrap();
        }
    }

    let tree = pvzs.list_pvzs_with_relations(&page(1, 30)).await.unwrap();

    assert_eq!(tree.len(), N);
    for node in &tree {
        assert_eq!(node.receptions.len(), 1);
        let reception = &node.receptions[0];
        assert_eq!(reception.reception.pvz_id, node.pvz.id);
        assert_eq!(reception.products.len(), M);
        assert!(
            reception
                .products
                .iter()
                .all(|p| p.reception_id == reception.reception.id)
        );
    }
}

#[tokio::test]
async fn pages_are_disjoint_and_cover_everything() {
    const L: i64 = 3;

    let store = InMemoryStore::new();
    let mut all = HashSet::new();
    for d in 1..=(2 * L as u32) {
        all.insert(seed(&store, day(d)).await);
    }
    // Children on the first pickup point must not shift the page boundary.
    let service = PvzService::new(store.clone());
    let first = service.list_pvzs(Some(1), 0).await.unwrap()[0].id;
    ReceptionService::new(store.clone())
        .create_reception(first)
        .await
        .unwrap();
    let ledger = ProductService::new(store.clone());
    for _ in 0..5 {
        ledger.add_product(first, "обувь").await.unwrap();
    }

    let one: HashSet<_> = service
        .list_pvzs_with_relations(&page(1, L))
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.pvz.id)
        .collect();
    let two: HashSet<_> = service
        .list_pvzs_with_relations(&page(2, L))
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.pvz.id)
        .collect();

    assert_eq!(one.len(), L as usize);
    assert_eq!(two.len(), L as usize);
    assert!(one.is_disjoint(&two));
    assert_eq!(one.union(&two).copied().collect::<HashSet<_>>(), all);
    assert!(one.contains(&first));
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let store = InMemoryStore::new();
    seed(&store, day(1)).await;

    let tree = PvzService::new(store)
        .list_pvzs_with_relations(&page(5, 10))
        .await
        .unwrap();
    assert!(tree.is_empty());
}

#[tokio::test]
async fn date_filter_is_inclusive_on_both_ends() {
    let store = InMemoryStore::new();
    let before = seed(&store, day(1) - Duration::seconds(1)).await;
    let at_start = seed(&store, day(1)).await;
    let inside = seed(&store, day(5)).await;
    let at_end = seed(&store, day(10)).await;
    let after = seed(&store, day(10) + Duration::seconds(1)).await;

    let params = ListPvzParams {
        start_date: Some(day(1).to_rfc3339()),
        end_date: Some(day(10).to_rfc3339()),
        ..Default::default()
    };
    let ids: HashSet<_> = PvzService::new(store)
        .list_pvzs_with_relations(&params)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.pvz.id)
        .collect();

    assert_eq!(ids, [at_start, inside, at_end].into_iter().collect());
    assert!(!ids.contains(&before));
    assert!(!ids.contains(&after));
}

#[tokio::test]
async fn single_date_bound_filters_one_side() {
    let store = InMemoryStore::new();
    let early = seed(&store, day(1)).await;
    let late = seed(&store, day(20)).await;

    let params = ListPvzParams {
        start_date: Some(day(10).to_rfc3339()),
        ..Default::default()
    };
    let ids: Vec<_> = PvzService::new(store)
        .list_pvzs_with_relations(&params)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.pvz.id)
        .collect();

    assert_eq!(ids, vec![late]);
    assert!(!ids.contains(&early));
}

#[tokio::test]
async fn listing_orders_pickup_points_by_registration_date() {
    let store = InMemoryStore::new();
    let third = seed(&store, day(3)).await;
    let first = seed(&store, day(1)).await;
    let second = seed(&store, day(2)).await;

    let ids: Vec<_> = PvzService::new(store)
        .list_pvzs_with_relations(&page(1, 10))
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.pvz.id)
        .collect();

    assert_eq!(ids, vec![first, second, third]);
}
