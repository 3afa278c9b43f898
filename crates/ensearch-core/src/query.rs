//! Query classification: decides what a raw search string could resolve to
//!
//! All functions here are pure and synchronous. They gate whether a point
//! lookup is worth issuing at all: a bare word such as `vitalik` is a search
//! term, not an identifier, and a point lookup for it is guaranteed to fail.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// One or more dot-free, whitespace-free segments joined by single dots.
/// Subdomains of any depth are accepted (`a.b.c.eth`).
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s.]+(\.[^\s.]+)+$").expect("valid name regex"));

static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid address regex"));

/// What a query looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Name,
    Address,
    /// Neither a name nor an address: free-text search only
    Ambiguous,
}

/// Result of classifying a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: QueryKind,
    pub eligible_for_direct_lookup: bool,
}

/// Check whether `raw` has the shape of a name
pub fn is_name_candidate(raw: &str) -> bool {
    NAME_REGEX.is_match(raw)
}

/// Check whether `raw` is `0x` followed by exactly 40 hex characters
pub fn is_address_candidate(raw: &str) -> bool {
    ADDRESS_REGEX.is_match(raw)
}

/// Whether a point lookup should be attempted for this query
pub fn should_attempt_direct_lookup(raw: &str) -> bool {
    is_name_candidate(raw) || is_address_candidate(raw)
}

pub fn classify(raw: &str) -> Classification {
    let kind = if is_address_candidate(raw) {
        QueryKind::Address
    } else if is_name_candidate(raw) {
        QueryKind::Name
    } else {
        QueryKind::Ambiguous
    };

    Classification {
        kind,
        eligible_for_direct_lookup: kind != QueryKind::Ambiguous,
    }
}

/// `{query}.eth` when the query is a bare word worth suggesting as a name.
///
/// Returns `None` for queries that contain a dot, start with `0x`, are a
/// single character, or would not form a valid name (e.g. contain spaces).
pub fn eth_suggestion(query: &str) -> Option<String> {
    if query.contains('.') || query.starts_with("0x") || query.chars().count() <= 1 {
        return None;
    }

    let candidate = format!("{query}.eth");
    is_name_candidate(&candidate).then_some(candidate)
}

/// A point lookup target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Name(String),
    Address(String),
}

impl Lookup {
    /// Build a name lookup, rejecting strings that are not name-shaped
    pub fn name(raw: &str) -> Result<Self> {
        if is_name_candidate(raw) {
            Ok(Lookup::Name(raw.to_string()))
        } else {
            Err(Error::InvalidFormat(format!("not a name: {raw}")))
        }
    }

    /// Build an address lookup, rejecting strings that are not address-shaped
    pub fn address(raw: &str) -> Result<Self> {
        if is_address_candidate(raw) {
            Ok(Lookup::Address(raw.to_string()))
        } else {
            Err(Error::InvalidFormat(format!("not an address: {raw}")))
        }
    }

    /// Guess the lookup kind from the input's shape (universal resolution)
    pub fn guess(raw: &str) -> Result<Self> {
        match classify(raw).kind {
            QueryKind::Address => Ok(Lookup::Address(raw.to_string())),
            QueryKind::Name => Ok(Lookup::Name(raw.to_string())),
            QueryKind::Ambiguous => Err(Error::InvalidFormat(format!(
                "not a name or address: {raw}"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Lookup::Name(name) => name,
            Lookup::Address(address) => address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_candidates() {
        assert!(is_name_candidate("vitalik.eth"));
        assert!(is_name_candidate("luc.willbreak.eth"));
        assert!(is_name_candidate("a.b.c.eth"));
        assert!(is_name_candidate("lucemans.cb.id"));

        assert!(!is_name_candidate("vitalik"));
        assert!(!is_name_candidate(".eth"));
        assert!(!is_name_candidate("vitalik."));
        assert!(!is_name_candidate("a..eth"));
        assert!(!is_name_candidate("vita lik.eth"));
        assert!(!is_name_candidate(""));
    }

    #[test]
    fn test_address_candidates() {
        assert!(is_address_candidate("0x225f137127d9067788314bc7fcc1f36746a3c3B5"));
        assert!(is_address_candidate("0xB8C2C29EE19D8307CB7255E1CD9CBDE883A267D5"));

        // 39 and 41 hex chars
        assert!(!is_address_candidate("0x225f137127d9067788314bc7fcc1f36746a3c3B"));
        assert!(!is_address_candidate("0x225f137127d9067788314bc7fcc1f36746a3c3B55"));
        assert!(!is_address_candidate("0X225f137127d9067788314bc7fcc1f36746a3c3B5"));
        assert!(!is_address_candidate("0x225f137127d9067788314bc7fcc1f36746a3c3Bz"));
        assert!(!is_address_candidate("hi"));
    }

    #[test]
    fn test_direct_lookup_eligibility() {
        assert!(should_attempt_direct_lookup("vitalik.eth"));
        assert!(!should_attempt_direct_lookup("vitalik"));
        assert!(should_attempt_direct_lookup(
            "0x225f137127d9067788314bc7fcc1f36746a3c3B5"
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("nick.eth").kind, QueryKind::Name);
        assert_eq!(
            classify("0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5").kind,
            QueryKind::Address
        );

        let bare = classify("nick");
        assert_eq!(bare.kind, QueryKind::Ambiguous);
        assert!(!bare.eligible_for_direct_lookup);
    }

    #[test]
    fn test_eth_suggestion() {
        assert_eq!(eth_suggestion("vitalik").as_deref(), Some("vitalik.eth"));
        assert_eq!(eth_suggestion("vi").as_deref(), Some("vi.eth"));
        assert_eq!(eth_suggestion("v"), None);
        assert_eq!(eth_suggestion("vitalik.eth"), None);
        assert_eq!(eth_suggestion("0xabc"), None);
        assert_eq!(eth_suggestion("two words"), None);
    }

    #[test]
    fn test_lookup_guess() {
        assert_eq!(
            Lookup::guess("luc.eth").unwrap(),
            Lookup::Name("luc.eth".into())
        );
        assert_eq!(
            Lookup::guess("0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5").unwrap(),
            Lookup::Address("0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5".into())
        );

        let err = Lookup::guess("hi").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(Lookup::address("hi").is_err());
        assert!(Lookup::name("0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5").is_err());
    }
}
