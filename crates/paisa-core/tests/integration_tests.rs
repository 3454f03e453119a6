//! Integration tests for paisa-core
//!
//! These tests exercise the full classify → extract → score → assemble
//! workflow against the embedded rule catalog.

use paisa_core::{
    grouping_key, normalize_merchant, BulkScan, DedupIndex, Field, Offer, ParseResult, Pipeline,
    RawSms, RejectReason, ReviewStatus, RuleCatalog, ScanOptions,
};

const SWIGGY_ALERT: &str =
    "Alert: Rs.250.00 debited from A/c XX1234 at SWIGGY BANGALORE on 25-Dec-24. Ref: 123456789";

const PROMO_LOAN: &str =
    "Congratulations! You are eligible for a loan of Rs.5,00,000. Apply now!";

/// 2024-12-25T04:30:00Z
const TIMESTAMP: i64 = 1_735_101_000_000;

fn pipeline() -> Pipeline {
    Pipeline::new(RuleCatalog::embedded().expect("embedded catalog must load"))
}

/// Bodies that exercise odd shapes, used for the totality checks
fn adversarial_bodies() -> Vec<String> {
    vec![
        String::new(),
        " ".repeat(500),
        "Rs.".to_string(),
        "Rs 9999999999999999999999999999999999.99 debited. Ref 1234".to_string(),
        "Rs 1,,,, debited at ,,,. Ref ####".to_string(),
        "₹₹₹ 12 ₹ credited debited spent received Ref: 0000".to_string(),
        "at at at at at on on on Ref: A1B2".to_string(),
        "Rs 0.00 debited at FREE CASHBACK OFFER on 99-99-99. Ref 12345".to_string(),
        "Rs.250.00 debited at 💸💸💸 on 25-Dec-24. Ref: 123456789".to_string(),
        "INR 45 paid to abc@upi. UPI Ref 1234567. Ref 7654321".to_string(),
        SWIGGY_ALERT.repeat(20),
    ]
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_hdfc_swiggy_alert() {
    let result = pipeline().parse(&RawSms::new("HDFCBK", SWIGGY_ALERT, TIMESTAMP));

    let candidate = result.candidate().expect("alert should parse");
    assert_eq!(candidate.amount, 250.00);
    assert_eq!(candidate.raw_merchant, "SWIGGY BANGALORE");
    assert_eq!(candidate.normalized_merchant, "SWIGGY BANGALORE");
    assert!(candidate.is_debit);
    assert_eq!(candidate.reference_number.as_deref(), Some("123456789"));
    assert!(candidate.confidence.overall >= 0.85);
    assert_eq!(candidate.status, ReviewStatus::Accepted);
    assert!(candidate.is_auto_accept());
}

#[test]
fn test_promotional_message_rejected() {
    let result = pipeline().parse(&RawSms::new("PROMO", PROMO_LOAN, TIMESTAMP));
    assert_eq!(
        result,
        ParseResult::Rejected(RejectReason::NoReferenceNumber)
    );
}

#[test]
fn test_live_and_rescan_share_keys() {
    let live_pipeline = pipeline();
    let rescan_pipeline = pipeline();
    let sms = RawSms::new("VM-HDFCBK", SWIGGY_ALERT, TIMESTAMP);

    let live = live_pipeline.parse(&sms).into_candidate().unwrap();
    let rescanned = rescan_pipeline.parse(&sms).into_candidate().unwrap();
    assert_eq!(live.dedup_key, rescanned.dedup_key);
    assert_eq!(live.source_id, rescanned.source_id);

    let mut index = DedupIndex::new();
    assert_eq!(index.offer(live), Offer::Inserted);
    assert_eq!(index.offer(rescanned), Offer::VerbatimDuplicate);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_same_event_from_different_text_shares_dedup_key() {
    let p = pipeline();
    let a = p
        .parse(&RawSms::new("HDFCBK", SWIGGY_ALERT, TIMESTAMP))
        .into_candidate()
        .unwrap();
    let b = p
        .parse(&RawSms::new(
            "VM-HDFCBN-T",
            "Rs 250 spent on HDFC Bank Card at Swiggy   Bangalore on 25/12/2024. Txn ID 123456789",
            TIMESTAMP + 60_000,
        ))
        .into_candidate()
        .unwrap();

    assert_ne!(a.source_id, b.source_id);
    assert_eq!(a.dedup_key, b.dedup_key);

    let mut index = DedupIndex::new();
    index.offer(a);
    assert!(index.offer(b).is_duplicate());
    assert_eq!(index.len(), 1);
}

#[test]
fn test_merchant_normalization_scenario() {
    assert_eq!(normalize_merchant("SWIGGY*ORDER9182"), "SWIGGY");
    assert!(normalize_merchant("Swiggy   Bangalore").starts_with("SWIGGY"));
    assert_eq!(grouping_key("Swiggy   Bangalore"), "SWIGGY");
    assert_eq!(
        grouping_key("SWIGGY*ORDER9182"),
        grouping_key("Swiggy   Bangalore")
    );
}

// =============================================================================
// Property Tests
// =============================================================================

#[test]
fn test_parse_is_total_and_bounded() {
    let p = pipeline();
    for sender in ["HDFCBK", "PROMO", "+919812345678", "", "re:", "PYTMSMS"] {
        for body in adversarial_bodies() {
            match p.parse(&RawSms::new(sender, body.as_str(), TIMESTAMP)) {
                ParseResult::Success(candidate) => {
                    assert!(candidate.amount > 0.0);
                    let overall = candidate.confidence.overall;
                    assert!((0.0..=1.0).contains(&overall), "{overall} for {body:?}");
                    assert!(candidate.reference_number.is_some());
                }
                ParseResult::Rejected(_) => {}
            }
        }
    }
}

#[test]
fn test_auto_accept_requires_all_critical_fields() {
    let p = pipeline();
    let bodies = [
        SWIGGY_ALERT,
        "Rs.500.00 debited on 02-01-25. Ref: 9988776655",
        "Rs.99.00 debited at ZEPTO MARKETPLACE. Ref: 5566778899",
        "INR 1,200.50 paid to Uber India via UPI on 05-Jan-25. UPI Ref 501234567890",
    ];
    for body in bodies {
        if let Some(c) = p.parse(&RawSms::new("HDFCBK", body, TIMESTAMP)).candidate() {
            let gate = [Field::Amount, Field::Merchant, Field::Reference]
                .iter()
                .all(|f| c.confidence.is_extracted(*f));
            assert_eq!(
                c.is_auto_accept(),
                gate && c.confidence.overall >= 0.85,
                "{body}"
            );
        }
    }
}

#[test]
fn test_unknown_sender_never_auto_accepts() {
    let result = pipeline().parse(&RawSms::new("+919812345678", SWIGGY_ALERT, TIMESTAMP));
    let candidate = result.candidate().expect("fallback rule still parses");
    assert_eq!(candidate.rule_code, "GENERIC");
    assert_eq!(candidate.bank_name, "+919812345678");
    assert!(candidate.confidence.overall < 0.85);
    assert_eq!(candidate.status, ReviewStatus::Monitored);
}

#[test]
fn test_normalize_merchant_idempotent_over_extracted_values() {
    let p = pipeline();
    for body in adversarial_bodies() {
        if let Some(c) = p.parse(&RawSms::new("HDFCBK", body.as_str(), TIMESTAMP)).candidate() {
            let once = normalize_merchant(&c.normalized_merchant);
            assert_eq!(once, c.normalized_merchant);
        }
    }
}

#[test]
fn test_pipeline_shared_across_threads() {
    let p = pipeline();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = p.clone();
            std::thread::spawn(move || {
                p.parse(&RawSms::new("HDFCBK", SWIGGY_ALERT, TIMESTAMP + i))
                    .into_candidate()
                    .map(|c| c.dedup_key)
            })
        })
        .collect();

    let keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(keys.iter().all(|k| k == &keys[0] && k.is_some()));
}

// =============================================================================
// Bulk Scan Tests
// =============================================================================

#[test]
fn test_bulk_scan_counts_and_dedup() {
    let p = pipeline();
    let messages: Vec<RawSms> = (0..250)
        .map(|i| {
            let body = if i % 5 == 0 {
                PROMO_LOAN.to_string()
            } else {
                format!(
                    "Rs.{}.00 debited at MERCHANT{} on 25-Dec-24. Ref: {}",
                    100 + i % 10,
                    i % 10,
                    900000 + i
                )
            };
            RawSms::new("HDFCBK", body, TIMESTAMP + i)
        })
        .collect();

    let mut scan = BulkScan::new(&p, ScanOptions::default());
    scan.run(&messages);
    let report = scan.finish();

    assert_eq!(report.summary.processed, 250);
    assert_eq!(
        report.summary.rejected.get(&RejectReason::NoReferenceNumber),
        Some(&50)
    );
    assert_eq!(report.summary.successes(), 200);
    // i % 10 in {1..4, 6..9}: eight distinct (merchant, amount) events
    assert_eq!(report.records.len(), 8);
    assert_eq!(report.summary.duplicates, 192);
    assert_eq!(report.summary.last_timestamp, Some(TIMESTAMP + 249));
}
