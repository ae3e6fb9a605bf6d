//! Integration test: the full marketplace revenue lifecycle.
//!
//! 1. A buyer purchases full content and books a coaching session
//! 2. Proceeds escrow to the treasury and lock per-day
//! 3. Nothing is withdrawable before the refund window has passed
//! 4. After maturity every role withdraws its cut
//! 5. A reward round distributes the validator and juror pools
//! 6. Value is conserved end to end

use tesora_integration_tests::{account, now_on, Marketplace, FOUNDATION, GOVERNANCE, OPERATOR, TREASURY};
use tesora_types::events::TreasuryEvent;

const DAY0: u64 = 1_000;
const TOKEN: u64 = 7;

const BUYER: [u8; 32] = [1u8; 32];
const INSTRUCTOR: [u8; 32] = [2u8; 32];

#[test]
fn marketplace_full_lifecycle() {
    // =========================================================
    // Setup: 14-day window, one instructor, one funded buyer
    // =========================================================
    let mut mp = Marketplace::open(14, DAY0);
    mp.bank.credit(BUYER, 10_000_000);
    mp.catalog
        .publish(TOKEN, INSTRUCTOR, vec![300_000, 200_000, 500_000]);
    let supply_before = mp.bank.total_supply();

    // =========================================================
    // Day 0: full-content purchase (1 000 000)
    // =========================================================
    let voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    let sale_ids = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect("purchase");
    assert_eq!(sale_ids.len(), 1);
    assert_eq!(mp.bank.balance(&BUYER), 9_000_000);
    assert_eq!(mp.bank.balance(&TREASURY), 1_000_000);

    let content_cuts = mp.service.sale(sale_ids[0]).expect("sale").cuts;
    assert_eq!(content_cuts.total(), 1_000_000);

    // =========================================================
    // Day 1: coaching session (500 000)
    // =========================================================
    let voucher = mp.coaching_voucher(INSTRUCTOR, BUYER, 500_000, DAY0 + 1);
    let coaching_id = mp
        .service
        .buy_coaching(BUYER, &voucher, now_on(DAY0 + 1))
        .expect("coaching");
    let coaching_cuts = mp.service.sale(coaching_id).expect("sale").cuts;
    assert_eq!(mp.bank.balance(&TREASURY), 1_500_000);

    // =========================================================
    // Day 10: still inside the window, everything locked
    // =========================================================
    assert_eq!(
        mp.service
            .withdraw_instructor(INSTRUCTOR, now_on(DAY0 + 10))
            .expect("early withdrawal"),
        0
    );
    assert_eq!(
        mp.service
            .withdraw_foundation(now_on(DAY0 + 10))
            .expect("early foundation"),
        0
    );

    // =========================================================
    // Day 16: both sales matured; each role withdraws
    // =========================================================
    let later = now_on(DAY0 + 16);
    let residuals = content_cuts.instructor + coaching_cuts.instructor;
    assert_eq!(
        mp.service
            .withdraw_instructor(INSTRUCTOR, later)
            .expect("instructor withdrawal"),
        residuals
    );
    assert_eq!(mp.bank.balance(&INSTRUCTOR), residuals);

    let foundation = content_cuts.foundation + coaching_cuts.foundation;
    assert_eq!(
        mp.service
            .withdraw_foundation(later)
            .expect("foundation withdrawal"),
        foundation
    );
    assert_eq!(mp.bank.balance(&FOUNDATION), foundation);

    let governance = content_cuts.governance + coaching_cuts.governance;
    assert_eq!(
        mp.service
            .withdraw_governance(later)
            .expect("governance withdrawal"),
        governance
    );
    assert_eq!(mp.bank.balance(&GOVERNANCE), governance);

    // =========================================================
    // Reward round: one validator (score 3), one juror (score 2)
    // =========================================================
    let validator = account(11);
    let juror = account(12);
    mp.scores.set_validator_score(validator, 1, 3);
    mp.scores.set_juror_score(juror, 1, 2);

    let validator_pool = content_cuts.validator + coaching_cuts.validator;
    let juror_pool = content_cuts.juror + coaching_cuts.juror;
    let (consumed_v, consumed_j) = mp
        .service
        .distribute_rewards(OPERATOR, later)
        .expect("distribution");
    assert_eq!(consumed_v, (validator_pool / 3) * 3);
    assert_eq!(consumed_j, (juror_pool / 2) * 2);

    let paid_v = mp
        .service
        .withdraw_validator(validator, later)
        .expect("validator claim");
    assert_eq!(paid_v, consumed_v);
    let paid_j = mp.service.withdraw_juror(juror, later).expect("juror claim");
    assert_eq!(paid_j, consumed_j);

    // =========================================================
    // Conservation and the event trail
    // =========================================================
    assert_eq!(mp.bank.total_supply(), supply_before);
    // Treasury keeps only the floor remainders of the reward round.
    assert_eq!(
        mp.bank.balance(&TREASURY),
        (validator_pool - consumed_v) + (juror_pool - consumed_j)
    );

    let events = mp.service.drain_events();
    assert_eq!(events.len(), 8);
    assert!(matches!(events[0], TreasuryEvent::SaleRecorded { .. }));
    assert!(matches!(events[1], TreasuryEvent::SaleRecorded { .. }));
    assert!(events
        .iter()
        .any(|e| matches!(e, TreasuryEvent::RewardsDistributed { round: 1, .. })));

    // Indexers read the snake_case wire tag.
    let json = serde_json::to_string(&events[0]).expect("event json");
    assert!(json.contains("\"event_type\":\"sale_recorded\""));
}

#[test]
fn instructor_balance_survives_ban() {
    // A ban blocks new purchases but not withdrawal of earned funds.
    let mut mp = Marketplace::open(14, DAY0);
    mp.bank.credit(BUYER, 5_000_000);
    mp.catalog.publish(TOKEN, INSTRUCTOR, vec![1_000_000]);

    let voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    let sale_id = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect("purchase")[0];
    let residual = mp.service.sale(sale_id).expect("sale").cuts.instructor;

    mp.registry.ban(INSTRUCTOR);
    let paid = mp
        .service
        .withdraw_instructor(INSTRUCTOR, now_on(DAY0 + 16))
        .expect("withdrawal despite ban");
    assert_eq!(paid, residual);

    // The banned instructor cannot buy anything new, though.
    mp.bank.credit(INSTRUCTOR, 2_000_000);
    let voucher = mp.purchase_voucher(TOKEN, INSTRUCTOR, DAY0 + 16);
    assert!(mp
        .service
        .buy_content(INSTRUCTOR, &[voucher], now_on(DAY0 + 16))
        .is_err());
}
