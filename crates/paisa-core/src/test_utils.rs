//! SMS fixtures shared by unit, integration and CLI tests

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    CandidateTransaction, ConfidenceScore, Field, FieldConfidence, RawSms, ReviewStatus,
};

/// 2024-12-25T04:30:00Z (10:00 IST)
pub const TIMESTAMP: i64 = 1_735_101_000_000;

pub const SWIGGY_ALERT: &str =
    "Alert: Rs.250.00 debited from A/c XX1234 at SWIGGY BANGALORE on 25-Dec-24. Ref: 123456789";

pub const PROMO_LOAN: &str =
    "Congratulations! You are eligible for a loan of Rs.5,00,000. Apply now!";

pub const ICICI_UPI: &str =
    "ICICI Bank Acct XX456 debited for Rs 1,499.00 on 03-Jan-25; ZOMATO LTD credited. UPI:412233445566";

pub const SBI_CREDIT: &str =
    "Dear Customer, your A/c X7890 is credited by Rs.15,000.00 on 01/01/25 transfer from RAVI KUMAR Ref No 334455667788";

pub const OTP: &str = "Your OTP for login is 482913. Do not share it with anyone.";

pub fn sms(address: &str, body: &str) -> RawSms {
    RawSms::new(address, body, TIMESTAMP)
}

/// A realistic mixed inbox in delivery order
pub fn sample_inbox() -> Vec<RawSms> {
    vec![
        RawSms::new("VM-HDFCBK", SWIGGY_ALERT, TIMESTAMP),
        RawSms::new("PROMO", PROMO_LOAN, TIMESTAMP + 1_000),
        RawSms::new("AD-ICICIB", ICICI_UPI, TIMESTAMP + 2_000),
        RawSms::new("HDFCBK", OTP, TIMESTAMP + 3_000),
        RawSms::new("JD-SBIINB-S", SBI_CREDIT, TIMESTAMP + 4_000),
        // Verbatim re-delivery of the first message
        RawSms::new("VM-HDFCBK", SWIGGY_ALERT, TIMESTAMP),
    ]
}

/// A candidate with a fixed dedup key and the given source id and score
pub fn sample_candidate(source_id: &str, overall: f64) -> CandidateTransaction {
    let breakdown: BTreeMap<Field, FieldConfidence> = Field::all()
        .iter()
        .map(|f| {
            (
                *f,
                FieldConfidence {
                    extracted: true,
                    score: 1.0,
                    value: None,
                },
            )
        })
        .collect();

    CandidateTransaction {
        amount: 250.0,
        normalized_merchant: "SWIGGY BANGALORE".to_string(),
        raw_merchant: "SWIGGY BANGALORE".to_string(),
        bank_name: "HDFC Bank".to_string(),
        rule_code: "HDFC".to_string(),
        is_debit: true,
        transaction_date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
        received_at: DateTime::<Utc>::from_timestamp_millis(TIMESTAMP).unwrap(),
        reference_number: Some("123456789".to_string()),
        confidence: ConfidenceScore { overall, breakdown },
        status: ReviewStatus::Monitored,
        dedup_key: "SWIGGY BANGALORE|250.00|2024-12-25|HDFC BANK".to_string(),
        source_id: source_id.to_string(),
        raw_body: SWIGGY_ALERT.to_string(),
    }
}
