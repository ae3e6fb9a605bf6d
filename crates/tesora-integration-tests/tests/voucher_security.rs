//! Integration test: voucher authorization at the treasury boundary.
//!
//! 1. Expired, tampered, and rogue-signed vouchers are rejected
//! 2. Only the named redeemer can spend a purchase voucher
//! 3. Banned or un-KYC'd payers are barred from new purchases
//! 4. A batch with one bad voucher changes nothing at all

use tesora_crypto::ed25519::KeyPair;
use tesora_integration_tests::{now_on, Marketplace, TREASURY};
use tesora_treasury::TreasuryError;
use tesora_voucher::{SignedVoucher, VoucherError};

const BUYER: [u8; 32] = [1u8; 32];
const INSTRUCTOR: [u8; 32] = [2u8; 32];
const TOKEN: u64 = 5;
const DAY0: u64 = 3_000;

fn marketplace() -> Marketplace {
    let mp = Marketplace::open(14, DAY0);
    mp.bank.credit(BUYER, 10_000_000);
    mp.catalog.publish(TOKEN, INSTRUCTOR, vec![1_000_000]);
    mp
}

#[test]
fn expired_voucher_rejected() {
    let mut mp = marketplace();
    let mut body = mp.purchase_voucher(TOKEN, BUYER, DAY0).body;
    body.valid_until = now_on(DAY0) - 1;
    let voucher = mp.sign(body);

    let err = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect_err("expired");
    assert!(matches!(
        err,
        TreasuryError::Voucher(VoucherError::Expired { .. })
    ));
}

#[test]
fn tampered_voucher_rejected() {
    let mut mp = marketplace();
    let mut voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    voucher.body.price = 1;
    voucher.body.discounted = true; // grant yourself a discount

    let err = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect_err("tampered");
    assert!(matches!(
        err,
        TreasuryError::Voucher(VoucherError::SignatureInvalid)
    ));
}

#[test]
fn rogue_signer_rejected() {
    let mut mp = marketplace();
    let body = mp.purchase_voucher(TOKEN, BUYER, DAY0).body;
    // Correctly signed, but the key holds no voucher-signer role.
    let rogue = KeyPair::generate();
    let voucher = SignedVoucher::sign(body, &rogue.signing_key);

    let err = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect_err("rogue signer");
    assert!(matches!(
        err,
        TreasuryError::Voucher(VoucherError::SignatureInvalid)
    ));
}

#[test]
fn only_named_redeemer_can_spend() {
    let mut mp = marketplace();
    let thief = [9u8; 32];
    mp.bank.credit(thief, 10_000_000);
    let voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);

    let err = mp
        .service
        .buy_content(thief, &[voucher], now_on(DAY0))
        .expect_err("not the redeemer");
    assert!(matches!(err, TreasuryError::NotAuthorized));
}

#[test]
fn barred_payers_cannot_buy() {
    let mut mp = marketplace();
    mp.registry.ban(BUYER);
    let voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    let err = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect_err("banned");
    assert!(matches!(err, TreasuryError::AccountBarred));

    let mut mp = marketplace();
    mp.registry.revoke_kyc(BUYER);
    let voucher = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    let err = mp
        .service
        .buy_content(BUYER, &[voucher], now_on(DAY0))
        .expect_err("no kyc");
    assert!(matches!(err, TreasuryError::AccountBarred));
}

#[test]
fn bad_voucher_poisons_whole_batch() {
    let mut mp = marketplace();
    let good = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    let mut bad = mp.purchase_voucher(TOKEN, BUYER, DAY0);
    bad.body.price = 1;

    let balance_before = mp.bank.balance(&BUYER);
    mp.service
        .buy_content(BUYER, &[good, bad], now_on(DAY0))
        .expect_err("batch rejected");

    assert_eq!(mp.bank.balance(&BUYER), balance_before);
    assert_eq!(mp.bank.balance(&TREASURY), 0);
    assert!(mp.service.sales().is_empty());
    assert!(mp.service.drain_events().is_empty());
}

#[test]
fn batch_needs_full_funding_upfront() {
    let mut mp = marketplace();
    // Buyer holds 10 000 000; eleven full-price vouchers exceed it.
    let vouchers: Vec<_> = (0..11)
        .map(|_| mp.purchase_voucher(TOKEN, BUYER, DAY0))
        .collect();

    let err = mp
        .service
        .buy_content(BUYER, &vouchers, now_on(DAY0))
        .expect_err("underfunded batch");
    assert!(matches!(err, TreasuryError::Transfer(_)));
    assert_eq!(mp.bank.balance(&BUYER), 10_000_000);
    assert!(mp.service.sales().is_empty());
}
