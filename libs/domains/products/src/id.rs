//! Business identifiers of the form `<PREFIX>-<n>`.

use mongodb::bson::oid::ObjectId;
use std::cmp::Ordering;

/// Default prefix for generated product ids
pub const DEFAULT_PREFIX: &str = "PROD";
/// Number assigned when no product carries a parseable id yet
pub const FIRST_PRODUCT_NUMBER: u64 = 1001;

/// The id following `current_max`, or the first id when there is none.
pub fn next_product_id(prefix: &str, current_max: Option<u64>) -> String {
    let number = current_max.map_or(FIRST_PRODUCT_NUMBER, |max| max.saturating_add(1));
    format!("{}-{}", prefix, number)
}

/// Numeric suffix of `product_id` when it has the expected shape.
pub fn parse_product_number(prefix: &str, product_id: &str) -> Option<u64> {
    let digits = product_id.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Order ids the way a numeric-ordering collation does: runs of digits
/// compare by value, so `PROD-9999` sorts before `PROD-10000`.
pub fn product_id_order(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (digits_a, rest_a) = split_digits(a);
                let (digits_b, rest_b) = split_digits(b);
                let value_a = digits_a.trim_start_matches('0');
                let value_b = digits_b.trim_start_matches('0');
                let order = value_a
                    .len()
                    .cmp(&value_b.len())
                    .then_with(|| value_a.cmp(value_b));
                if order != Ordering::Equal {
                    return order;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a = &a[x.len_utf8()..];
                b = &b[y.len_utf8()..];
            }
        }
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// One way of addressing a stored product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductLookup {
    ByInternalId(String),
    ByBusinessId(String),
}

impl ProductLookup {
    /// Lookups to try for a path segment, in order.
    ///
    /// The business id always comes first. A segment that is also a
    /// well-formed ObjectId falls back to the internal id.
    pub fn candidates(raw: &str) -> Vec<Self> {
        let mut lookups = vec![ProductLookup::ByBusinessId(raw.to_string())];
        if let Ok(oid) = ObjectId::parse_str(raw) {
            lookups.push(ProductLookup::ByInternalId(oid.to_hex()));
        }
        lookups
    }

    /// Raw identifier, for messages
    pub fn as_str(&self) -> &str {
        match self {
            ProductLookup::ByInternalId(id) | ProductLookup::ByBusinessId(id) => id,
        }
    }
}

/// Generate a fresh internal id
pub fn new_internal_id() -> String {
    ObjectId::new().to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_product_id() {
        assert_eq!(next_product_id("PROD", None), "PROD-1001");
        assert_eq!(next_product_id("PROD", Some(1001)), "PROD-1002");
        assert_eq!(next_product_id("SKU", Some(41)), "SKU-42");
    }

    #[test]
    fn test_parse_product_number() {
        assert_eq!(parse_product_number("PROD", "PROD-1042"), Some(1042));
        assert_eq!(parse_product_number("PROD", "PROD-"), None);
        assert_eq!(parse_product_number("PROD", "PROD-12a"), None);
        assert_eq!(parse_product_number("PROD", "PROD-+12"), None);
        assert_eq!(parse_product_number("PROD", "ITEM-12"), None);
        assert_eq!(parse_product_number("PROD", "PROD1042"), None);
    }

    #[test]
    fn test_product_id_order_is_numeric() {
        assert_eq!(product_id_order("PROD-9999", "PROD-10000"), Ordering::Less);
        assert_eq!(product_id_order("PROD-1002", "PROD-1001"), Ordering::Greater);
        assert_eq!(product_id_order("PROD-1001", "PROD-1001"), Ordering::Equal);
        assert_eq!(product_id_order("PROD-007", "PROD-7"), Ordering::Equal);
        assert_eq!(product_id_order("ITEM-5", "PROD-1"), Ordering::Less);
        assert_eq!(product_id_order("PROD-", "PROD-1"), Ordering::Less);

        let mut ids = vec!["PROD-10000", "PROD-999", "PROD-1001", "PROD-9999"];
        ids.sort_by(|a, b| product_id_order(a, b));
        assert_eq!(ids, ["PROD-999", "PROD-1001", "PROD-9999", "PROD-10000"]);
    }

    #[test]
    fn test_lookup_candidates() {
        let hex = new_internal_id();
        assert_eq!(
            ProductLookup::candidates(&hex.to_uppercase()),
            vec![
                ProductLookup::ByBusinessId(hex.to_uppercase()),
                ProductLookup::ByInternalId(hex),
            ]
        );
        assert_eq!(
            ProductLookup::candidates("PROD-1001"),
            vec![ProductLookup::ByBusinessId("PROD-1001".to_string())]
        );
    }
}
