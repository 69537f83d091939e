//! Reassembly of the flat pickup point ⟕ reception ⟕ product join into a tree.
//!
//! Rows are folded once into id-keyed arenas and only turned into the nested
//! shape in [`PvzTreeBuilder::finish`]. Every reception lands under the
//! pickup point named by its own `pvz_id` and every product under the
//! reception named by its own `reception_id`; children whose parent is not
//! part of the fetched page are dropped.

use std::collections::{HashMap, HashSet};

use common::{ProductId, PvzId, ReceptionId};
use futures_util::TryStreamExt;
use pvz_store::{JoinedRow, JoinedRowStream, PickupPoint, Product, Reception, StoreError};

/// A reception with the products logged against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceptionWithProducts {
    pub reception: Reception,
    pub products: Vec<Product>,
}

/// A pickup point with its receptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvzWithReceptions {
    pub pvz: PickupPoint,
    pub receptions: Vec<ReceptionWithProducts>,
}

/// Streaming fold from joined rows to [`PvzWithReceptions`].
///
/// Output keeps first-seen order at every level.
#[derive(Debug, Default)]
pub struct PvzTreeBuilder {
    pvzs: Vec<PickupPoint>,
    pvz_slots: HashMap<PvzId, usize>,
    receptions: Vec<Reception>,
    reception_slots: HashMap<ReceptionId, usize>,
    products: HashMap<ReceptionId, Vec<Product>>,
    seen_products: HashSet<ProductId>,
}

impl PvzTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one joined row.
    ///
    /// - no reception: contributes the pickup point only
    /// - reception without product: contributes a reception with no products
    /// - both present: appends the product to its reception
    pub fn push(&mut self, row: JoinedRow) {
        let JoinedRow {
            pvz,
            reception,
            product,
        } = row;

        let pvzs = &mut self.pvzs;
        self.pvz_slots.entry(pvz.id).or_insert_with(|| {
            pvzs.push(pvz);
            pvzs.len() - 1
        });

        let Some(reception) = reception else {
            return;
        };

        let receptions = &mut self.receptions;
        self.reception_slots
            .entry(reception.id)
            .or_insert_with(|| {
                receptions.push(reception);
                receptions.len() - 1
            });

        if let Some(product) = product
            && self.seen_products.insert(product.id)
        {
            self.products
                .entry(product.reception_id)
                .or_default()
                .push(product);
        }
    }

    /// Number of distinct pickup points folded so far.
    pub fn pvz_count(&self) -> usize {
        self.pvzs.len()
    }

    /// Attaches products to receptions and receptions to pickup points.
    pub fn finish(self) -> Vec<PvzWithReceptions> {
        let Self {
            pvzs,
            pvz_slots,
            receptions,
            reception_slots: _,
            mut products,
            seen_products: _,
        } = self;

        let mut tree: Vec<PvzWithReceptions> = pvzs
            .into_iter()
            .map(|pvz| PvzWithReceptions {
                pvz,
                receptions: Vec::new(),
            })
            .collect();

        for reception in receptions {
            let products = products.remove(&reception.id).unwrap_or_default();
            match pvz_slots.get(&reception.pvz_id) {
                Some(&slot) => tree[slot]
                    .receptions
                    .push(ReceptionWithProducts { reception, products }),
                None => tracing::warn!(
                    reception_id = %reception.id,
                    pvz_id = %reception.pvz_id,
                    "dropping reception whose pickup point is not in the page"
                ),
            }
        }

        for (reception_id, orphans) in products {
            tracing::warn!(%reception_id, count = orphans.len(), "dropping products without a reception");
        }

        tree
    }
}

/// Drains a row stream through a [`PvzTreeBuilder`].
pub async fn fold_rows(
    mut rows: JoinedRowStream<'_>,
) -> Result<Vec<PvzWithReceptions>, StoreError> {
    let mut builder = PvzTreeBuilder::new();
    let mut row_count = 0usize;
    while let Some(row) = rows.try_next().await? {
        builder.push(row);
        row_count += 1;
    }

    tracing::debug!(rows = row_count, pvz_count = builder.pvz_count(), "listing rows folded");
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use common::{City, ProductType, ReceptionStatus};

    use super::*;

    fn pvz(minute: u32) -> PickupPoint {
        PickupPoint {
            id: PvzId::new(),
            registration_date: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
            city: City::Moscow,
        }
    }

    fn reception(pvz: &PickupPoint) -> Reception {
        Reception::open(ReceptionId::new(), pvz.id, pvz.registration_date + Duration::hours(1))
    }

    fn product(reception: &Reception, n: i64) -> Product {
        Product {
            id: ProductId::new(),
            reception_id: reception.id,
            product_type: ProductType::Electronics,
            created_at: reception.created_at + Duration::seconds(n),
        }
    }

    fn row(pvz: &PickupPoint, reception: Option<&Reception>, product: Option<&Product>) -> JoinedRow {
        JoinedRow {
            pvz: pvz.clone(),
            reception: reception.cloned(),
            product: product.cloned(),
        }
    }

    #[test]
    fn pickup_point_without_receptions_has_empty_list() {
        let p = pvz(0);
        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p, None, None));

        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].pvz, p);
        assert!(tree[0].receptions.is_empty());
    }

    #[test]
    fn reception_without_products_has_empty_list() {
        let p = pvz(0);
        let r = reception(&p);
        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p, Some(&r), None));

        let tree = builder.finish();
        assert_eq!(tree[0].receptions.len(), 1);
        assert_eq!(tree[0].receptions[0].reception, r);
        assert!(tree[0].receptions[0].products.is_empty());
    }

    #[test]
    fn products_group_under_their_reception() {
        let p = pvz(0);
        let open = reception(&p);
        let mut closed = reception(&p);
        closed.status = ReceptionStatus::Closed;
        closed.closed_at = Some(closed.created_at + Duration::minutes(5));

        let a = product(&closed, 1);
        let b = product(&open, 2);
        let c = product(&open, 3);

        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p, Some(&closed), Some(&a)));
        builder.push(row(&p, Some(&open), Some(&b)));
        builder.push(row(&p, Some(&open), Some(&c)));

        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        let receptions = &tree[0].receptions;
        assert_eq!(receptions.len(), 2);

        let closed_node = receptions.iter().find(|r| r.reception.id == closed.id).unwrap();
        assert_eq!(closed_node.products, vec![a]);
        let open_node = receptions.iter().find(|r| r.reception.id == open.id).unwrap();
        assert_eq!(open_node.products, vec![b, c]);
    }

    #[test]
    fn interleaved_rows_keep_each_child_under_its_parent() {
        let p1 = pvz(0);
        let p2 = pvz(1);
        let r1 = reception(&p1);
        let r2 = reception(&p2);
        let x1 = product(&r1, 1);
        let x2 = product(&r2, 1);
        let x3 = product(&r1, 2);

        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p1, Some(&r1), Some(&x1)));
        builder.push(row(&p2, Some(&r2), Some(&x2)));
        builder.push(row(&p1, Some(&r1), Some(&x3)));

        let tree = builder.finish();
        assert_eq!(tree.len(), 2);
        for node in &tree {
            assert_eq!(node.receptions.len(), 1);
            for r in &node.receptions {
                assert_eq!(r.reception.pvz_id, node.pvz.id);
                assert!(r.products.iter().all(|x| x.reception_id == r.reception.id));
            }
        }
        let first = tree.iter().find(|n| n.pvz.id == p1.id).unwrap();
        assert_eq!(first.receptions[0].products.len(), 2);
    }

    #[test]
    fn repeated_product_rows_are_counted_once() {
        let p = pvz(0);
        let r = reception(&p);
        let x = product(&r, 1);

        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p, Some(&r), Some(&x)));
        builder.push(row(&p, Some(&r), Some(&x)));

        let tree = builder.finish();
        assert_eq!(tree[0].receptions[0].products.len(), 1);
    }

    #[test]
    fn reception_of_pickup_point_outside_page_is_dropped() {
        let p = pvz(0);
        let outsider = pvz(5);
        // A row whose reception claims a different parent than the row's pvz.
        let stray = reception(&outsider);

        let mut builder = PvzTreeBuilder::new();
        builder.push(row(&p, Some(&stray), None));

        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        assert!(tree[0].receptions.is_empty());
    }

    #[test]
    fn first_seen_order_is_kept() {
        let pvzs: Vec<_> = (0..5).map(pvz).collect();
        let mut builder = PvzTreeBuilder::new();
        for p in &pvzs {
            builder.push(row(p, None, None));
        }
        assert_eq!(builder.pvz_count(), 5);

        let ids: Vec<_> = builder.finish().into_iter().map(|n| n.pvz.id).collect();
        assert_eq!(ids, pvzs.iter().map(|p| p.id).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn fold_rows_propagates_stream_errors() {
        let p = pvz(0);
        let rows: Vec<Result<JoinedRow, StoreError>> = vec![
            Ok(row(&p, None, None)),
            Err(StoreError::IncompleteRow("reception_status")),
        ];
        let stream: JoinedRowStream<'_> = Box::pin(futures_util::stream::iter(rows));

        let err = fold_rows(stream).await.unwrap_err();
        assert!(matches!(err, StoreError::IncompleteRow("reception_status")));
    }
}
