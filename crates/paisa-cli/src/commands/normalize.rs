//! Merchant normalization command

use paisa_core::{grouping_key, normalize_merchant};

pub fn cmd_normalize(merchant: &str, grouping: bool) {
    println!("{}", normalize_merchant(merchant));
    if grouping {
        println!("group: {}", grouping_key(merchant));
    }
}
