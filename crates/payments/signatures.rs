//! Signature primitives shared by the gateway adapters. All digests are lowercase hex.

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};

fn hex_digest<D: Digest>(parts: &[&str]) -> String {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Gateway A notification signature: SHA-512 over order id, status code, gross amount and server key.
pub fn midtrans_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    hex_digest::<Sha512>(&[order_id, status_code, gross_amount, server_key])
}

pub fn duitku_inquiry_signature(merchant_code: &str, order_id: &str, amount: i64, key: &str) -> String {
    hex_digest::<Md5>(&[merchant_code, order_id, &amount.to_string(), key])
}

/// Callback field order differs from the inquiry: amount precedes the order id.
pub fn duitku_callback_signature(merchant_code: &str, amount: i64, order_id: &str, key: &str) -> String {
    hex_digest::<Md5>(&[merchant_code, &amount.to_string(), order_id, key])
}

pub fn duitku_status_signature(merchant_code: &str, order_id: &str, key: &str) -> String {
    hex_digest::<Md5>(&[merchant_code, order_id, key])
}

/// `datetime` is formatted `YYYY-MM-DD HH:MM:SS`.
pub fn duitku_payment_method_signature(
    merchant_code: &str,
    amount: i64,
    datetime: &str,
    key: &str,
) -> String {
    hex_digest::<Sha256>(&[merchant_code, &amount.to_string(), datetime, key])
}

/// Length-independent comparison so signature checks do not leak timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duitku_inquiry_signature_matches_md5_of_concatenation() {
        assert_eq!(
            duitku_inquiry_signature("M1", "ORD1", 10000, "K"),
            "d3ed3532ae78f2d32cc3e308f88ec29e"
        );
    }

    #[test]
    fn duitku_callback_signature_orders_amount_first() {
        assert_eq!(
            duitku_callback_signature("M1", 10000, "ORD1", "K"),
            "6b2f33ae9e6461de0a23a440ffbd08c8"
        );
        assert_ne!(
            duitku_callback_signature("M1", 10000, "ORD1", "K"),
            duitku_inquiry_signature("M1", "ORD1", 10000, "K")
        );
    }

    #[test]
    fn duitku_status_and_method_signatures() {
        assert_eq!(
            duitku_status_signature("M1", "ORD1", "K"),
            "85bfc6ee5ca82a4e014ac36acab71910"
        );
        assert_eq!(
            duitku_payment_method_signature("M1", 10000, "2024-01-02 03:04:05", "K"),
            "424d14ddc0a7fc1ee9c07e74966f3987632aa98d129078bc557a176f47c1f42a"
        );
    }

    #[test]
    fn midtrans_signature_is_sha512_hex() {
        let signature = midtrans_signature("ORD1", "200", "10000.00", "SK");
        assert_eq!(signature.len(), 128);
        assert_eq!(
            signature,
            "eee9ea43ba4ad82175539735e6456d1b446781983cc74aac668bd10d25b3f9de37ed7a91ac0c87790be98b1b261cfb0777ef8842d04ca16bb54166d65f143c89"
        );
    }

    #[test]
    fn changing_any_input_changes_the_signature() {
        let base = midtrans_signature("ORD1", "200", "10000.00", "SK");
        assert_ne!(base, midtrans_signature("ORD2", "200", "10000.00", "SK"));
        assert_ne!(base, midtrans_signature("ORD1", "200", "10001.00", "SK"));
        assert_ne!(base, midtrans_signature("ORD1", "200", "10000.00", "SL"));
    }

    #[test]
    fn constant_time_eq_compares_exactly() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ABC"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
