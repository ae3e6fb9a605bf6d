//! Integration test: refund handling against the rotating window.
//!
//! 1. Refund inside the window restores the payer in full
//! 2. The reversal only touches the refunded sale's bucket
//! 3. A second refund of the same sale is rejected
//! 4. Refunds past the window are rejected
//! 5. The current-window and snapshot rules diverge after a resize
//! 6. A refund reverses the right slot even after the window is resized

use tesora_integration_tests::{now_on, Marketplace, OPERATOR};
use tesora_treasury::{RefundWindowRule, TreasuryError};

const DAY0: u64 = 1_000;
const TOKEN_A: u64 = 1;
const TOKEN_B: u64 = 2;

const BUYER: [u8; 32] = [1u8; 32];
const INSTRUCTOR: [u8; 32] = [2u8; 32];

fn two_sales(mp: &mut Marketplace) -> (u64, u64) {
    mp.bank.credit(BUYER, 10_000_000);
    mp.catalog.publish(TOKEN_A, INSTRUCTOR, vec![1_000_000]);
    mp.catalog.publish(TOKEN_B, INSTRUCTOR, vec![2_000_000]);

    let voucher = mp.purchase_voucher(TOKEN_A, BUYER, DAY0);
    let a = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect("sale a")[0];
    let voucher = mp.purchase_voucher(TOKEN_B, BUYER, DAY0 + 2);
    let b = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0 + 2))
        .expect("sale b")[0];
    (a, b)
}

#[test]
fn refund_inside_window_restores_payer() {
    let mut mp = Marketplace::open(14, DAY0);
    let (a, b) = two_sales(&mut mp);
    let cuts_a = mp.service.sale(a).expect("a").cuts;
    let cuts_b = mp.service.sale(b).expect("b").cuts;
    let balance_before = mp.bank.balance(&BUYER);

    let voucher = mp.refund_voucher(b, DAY0 + 10);
    mp.service.refund(&voucher, now_on(DAY0 + 10)).expect("refund b");

    // Full price back; only b's residual reversed.
    assert_eq!(mp.bank.balance(&BUYER), balance_before + 2_000_000);
    assert!(mp.service.sale(b).expect("b").refunded);
    assert!(!mp.service.sale(a).expect("a").refunded);
    assert_eq!(
        mp.service.ledger().locked_instructor_total(&INSTRUCTOR),
        cuts_a.instructor
    );
    assert_eq!(
        mp.service.ledger().refunded_instructor_total(&INSTRUCTOR),
        cuts_b.instructor
    );
    assert_eq!(mp.service.ledger().pool_refunded_total(), cuts_b.pool_total());

    // Sale a still matures and pays out untouched.
    let paid = mp
        .service
        .withdraw_instructor(INSTRUCTOR, now_on(DAY0 + 17))
        .expect("withdrawal");
    assert_eq!(paid, cuts_a.instructor);
}

#[test]
fn refund_replay_rejected() {
    let mut mp = Marketplace::open(14, DAY0);
    let (a, _) = two_sales(&mut mp);

    let voucher = mp.refund_voucher(a, DAY0 + 5);
    mp.service.refund(&voucher, now_on(DAY0 + 5)).expect("first");
    let err = mp
        .service
        .refund(&voucher, now_on(DAY0 + 6))
        .expect_err("replay");
    assert!(matches!(err, TreasuryError::AlreadyRefunded { sale_id } if sale_id == a));
}

#[test]
fn refund_past_window_rejected() {
    let mut mp = Marketplace::open(14, DAY0);
    let (a, _) = two_sales(&mut mp);

    let voucher = mp.refund_voucher(a, DAY0 + 15);
    let err = mp
        .service
        .refund(&voucher, now_on(DAY0 + 15))
        .expect_err("too old");
    assert!(matches!(
        err,
        TreasuryError::RefundWindowExpired {
            age_days: 15,
            window_days: 14,
            ..
        }
    ));
}

#[test]
fn current_window_rule_follows_resize() {
    // Shrinking the window retroactively closes older sales for refunds.
    let mut mp = Marketplace::open(14, DAY0);
    let (a, _) = two_sales(&mut mp);

    mp.service
        .change_refund_window(OPERATOR, 7, now_on(DAY0 + 5))
        .expect("shrink");

    let voucher = mp.refund_voucher(a, DAY0 + 10);
    let err = mp
        .service
        .refund(&voucher, now_on(DAY0 + 10))
        .expect_err("outside the shrunk window");
    assert!(matches!(
        err,
        TreasuryError::RefundWindowExpired { window_days: 7, .. }
    ));
}

#[test]
fn snapshot_rule_keeps_sale_window_through_resize() {
    // The same story under the snapshot rule: the day-0 sale keeps its
    // 14-day window and the refund still lands in the original bucket.
    let mut mp = Marketplace::open_with_rule(14, DAY0, RefundWindowRule::SnapshotAtSale);
    let (a, _) = two_sales(&mut mp);
    let balance_before = mp.bank.balance(&BUYER);

    mp.service
        .change_refund_window(OPERATOR, 7, now_on(DAY0 + 5))
        .expect("shrink");

    let voucher = mp.refund_voucher(a, DAY0 + 10);
    mp.service
        .refund(&voucher, now_on(DAY0 + 10))
        .expect("still inside the snapshot window");
    assert_eq!(mp.bank.balance(&BUYER), balance_before + 1_000_000);
}

#[test]
fn refund_lands_in_original_slot_after_grow() {
    // Sale b on day 1002 sits in slot 8 of the 14-day window. After
    // growing to 20 days, `1002 % 20` points at slot 2 — the refund must
    // still reverse slot 8.
    let mut mp = Marketplace::open(14, DAY0);
    let (a, b) = two_sales(&mut mp);
    let cuts_a = mp.service.sale(a).expect("a").cuts;
    let balance_before = mp.bank.balance(&BUYER);
    assert_eq!(mp.service.sale(b).expect("b").bucket, 8);

    mp.service
        .change_refund_window(OPERATOR, 20, now_on(DAY0 + 4))
        .expect("grow");

    let voucher = mp.refund_voucher(b, DAY0 + 5);
    mp.service.refund(&voucher, now_on(DAY0 + 5)).expect("refund b");

    assert_eq!(mp.bank.balance(&BUYER), balance_before + 2_000_000);
    assert_eq!(
        mp.service.ledger().locked_instructor_total(&INSTRUCTOR),
        cuts_a.instructor
    );
}

#[test]
fn refund_follows_slot_fold_across_shrink_then_grow() {
    // Shrinking to 7 folds sale b's slot 8 into slot 6; a later grow
    // leaves the folded amounts where they are. The sale record tracks
    // the fold, so the refund drains slot 6.
    let mut mp = Marketplace::open(14, DAY0);
    let (a, b) = two_sales(&mut mp);
    let cuts_a = mp.service.sale(a).expect("a").cuts;
    let balance_before = mp.bank.balance(&BUYER);

    mp.service
        .change_refund_window(OPERATOR, 7, now_on(DAY0 + 3))
        .expect("shrink");
    assert_eq!(mp.service.sale(b).expect("b").bucket, 6);
    mp.service
        .change_refund_window(OPERATOR, 20, now_on(DAY0 + 4))
        .expect("grow");

    let voucher = mp.refund_voucher(b, DAY0 + 5);
    mp.service.refund(&voucher, now_on(DAY0 + 5)).expect("refund b");

    assert_eq!(mp.bank.balance(&BUYER), balance_before + 2_000_000);
    assert_eq!(
        mp.service.ledger().locked_instructor_total(&INSTRUCTOR),
        cuts_a.instructor
    );
    assert_eq!(mp.service.ledger().pool_locked_total(), cuts_a.pool_total());
}
