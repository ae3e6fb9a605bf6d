//! Structured treasury events for external indexers.
//!
//! Every mutating treasury entry point records one of these on success. The
//! service buffers them; the host drains the buffer and ships the records to
//! whatever indexing pipeline it runs. Field layout is part of the external
//! contract: a sale event always carries the sale id, both parties, the
//! instructor, and the amount.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Round, SaleId};

/// What kind of sale an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    Content,
    Coaching,
}

/// Which withdrawable pool a withdrawal event drew from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalRole {
    Instructor,
    Foundation,
    Governance,
    Validator,
    Juror,
}

/// All treasury events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event_type")]
pub enum TreasuryEvent {
    /// A sale was recorded and its proceeds locked.
    SaleRecorded {
        sale_id: SaleId,
        kind: SaleKind,
        payer: AccountId,
        receiver: AccountId,
        instructor: AccountId,
        total_price: u64,
    },
    /// A previously recorded sale was reversed.
    SaleRefunded {
        sale_id: SaleId,
        payer: AccountId,
        instructor: AccountId,
        total_price: u64,
    },
    /// Matured or distributed funds left the treasury.
    Withdrawal {
        account: AccountId,
        role: WithdrawalRole,
        amount: u64,
    },
    /// A distribution round was closed and payout rates fixed.
    RewardsDistributed {
        round: Round,
        validator_per_point: u64,
        juror_per_point: u64,
    },
    /// The refund window length changed.
    RefundWindowChanged {
        old_length_days: u64,
        new_length_days: u64,
        precaution_deadline_day: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = TreasuryEvent::SaleRecorded {
            sale_id: 7,
            kind: SaleKind::Content,
            payer: [1u8; 32],
            receiver: [2u8; 32],
            instructor: [3u8; 32],
            total_price: 1_000_000,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let back: TreasuryEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, back);
    }

    #[test]
    fn test_event_type_tag() {
        let event = TreasuryEvent::RefundWindowChanged {
            old_length_days: 14,
            new_length_days: 30,
            precaution_deadline_day: 100,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"event_type\":\"refund_window_changed\""));
    }
}
