//! The append-only sale record store.
//!
//! Sales are immutable once created except for the `refunded` flag, which
//! flips exactly once. Refunded sales stay in the store for audit.

use serde::{Deserialize, Serialize};
use tesora_cuts::CutSplit;
use tesora_types::events::SaleKind;
use tesora_types::{AccountId, DayIndex, SaleId};

/// One recorded sale (content or coaching).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique, monotonically assigned id.
    pub sale_id: SaleId,
    /// Content or coaching.
    pub kind: SaleKind,
    /// Account that paid.
    pub payer: AccountId,
    /// Account that received the content (differs from payer on a gift).
    pub receiver: AccountId,
    /// Instructor credited with the residual.
    pub instructor: AccountId,
    /// Full price paid.
    pub total_price: u64,
    /// The five-way split recorded at sale time.
    pub cuts: CutSplit,
    /// Day the sale was posted; drives refund-window aging.
    pub created_day: DayIndex,
    /// Ledger slot the sale's deposit landed in. Re-pointed when a window
    /// shrink folds that slot away, so a refund always reverses the slot
    /// actually holding the sale's locked amounts.
    pub bucket: usize,
    /// Refund-window length at sale time, for snapshot-rule refunds.
    pub window_at_sale: u64,
    /// Whether the sale has been reversed.
    pub refunded: bool,
}

/// Append-only store of all sales.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SaleStore {
    sales: Vec<Sale>,
}

impl SaleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new sale and return its id.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        kind: SaleKind,
        payer: AccountId,
        receiver: AccountId,
        instructor: AccountId,
        total_price: u64,
        cuts: CutSplit,
        created_day: DayIndex,
        bucket: usize,
        window_at_sale: u64,
    ) -> SaleId {
        let sale_id = self.sales.len() as SaleId;
        self.sales.push(Sale {
            sale_id,
            kind,
            payer,
            receiver,
            instructor,
            total_price,
            cuts,
            created_day,
            bucket,
            window_at_sale,
            refunded: false,
        });
        sale_id
    }

    /// Look up a sale by id.
    pub fn get(&self, sale_id: SaleId) -> Option<&Sale> {
        self.sales.get(sale_id as usize)
    }

    /// Re-point sales whose ledger slot a window shrink folded into the
    /// last surviving slot (`new_length - 1`).
    pub(crate) fn fold_buckets_from(&mut self, new_length: usize) {
        let last = new_length - 1;
        for sale in &mut self.sales {
            if !sale.refunded && sale.bucket >= new_length {
                sale.bucket = last;
            }
        }
    }

    /// Flip the refunded flag. The caller must have checked it is unset.
    pub(crate) fn mark_refunded(&mut self, sale_id: SaleId) {
        if let Some(sale) = self.sales.get_mut(sale_id as usize) {
            sale.refunded = true;
        }
    }

    /// Number of recorded sales (refunded ones included).
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    /// Whether no sales have been recorded.
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    /// Sum of residuals of this instructor's never-refunded sales. Used by
    /// conservation audits.
    pub fn outstanding_residual(&self, instructor: &AccountId) -> u64 {
        self.sales
            .iter()
            .filter(|s| &s.instructor == instructor && !s.refunded)
            .map(|s| s.cuts.instructor)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tesora_cuts::policy::{split, DEFAULT_RATES};

    fn record_one(store: &mut SaleStore, price: u64) -> SaleId {
        let cuts = split(price, &DEFAULT_RATES).expect("split");
        store.record(
            SaleKind::Content,
            [1u8; 32],
            [1u8; 32],
            [2u8; 32],
            price,
            cuts,
            100,
            100 % 14,
            14,
        )
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = SaleStore::new();
        assert_eq!(record_one(&mut store, 100), 0);
        assert_eq!(record_one(&mut store, 200), 1);
        assert_eq!(record_one(&mut store, 300), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_refunded_sales_remain() {
        let mut store = SaleStore::new();
        let id = record_one(&mut store, 100);
        store.mark_refunded(id);
        let sale = store.get(id).expect("still present");
        assert!(sale.refunded);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_outstanding_residual_excludes_refunded() {
        let mut store = SaleStore::new();
        let a = record_one(&mut store, 1_000_000);
        let b = record_one(&mut store, 2_000_000);
        let residual_a = store.get(a).expect("a").cuts.instructor;
        let residual_b = store.get(b).expect("b").cuts.instructor;

        assert_eq!(
            store.outstanding_residual(&[2u8; 32]),
            residual_a + residual_b
        );
        store.mark_refunded(a);
        assert_eq!(store.outstanding_residual(&[2u8; 32]), residual_b);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let store = SaleStore::new();
        assert!(store.get(7).is_none());
    }

    #[test]
    fn test_fold_repoints_dropped_buckets() {
        let mut store = SaleStore::new();
        let cuts = split(1_000_000, &DEFAULT_RATES).expect("split");
        let kept = store.record(
            SaleKind::Content,
            [1u8; 32],
            [1u8; 32],
            [2u8; 32],
            1_000_000,
            cuts,
            1_000,
            6,
            14,
        );
        let folded = store.record(
            SaleKind::Content,
            [1u8; 32],
            [1u8; 32],
            [2u8; 32],
            1_000_000,
            cuts,
            1_002,
            8,
            14,
        );

        // Shrink 14 -> 7: slot 8 folds into slot 6, slot 6 stays put.
        store.fold_buckets_from(7);
        assert_eq!(store.get(kept).expect("kept").bucket, 6);
        assert_eq!(store.get(folded).expect("folded").bucket, 6);
    }
}
