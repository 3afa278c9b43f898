//! Bulk resolution contract
//!
//! A bulk request carries up to [`MAX_BULK`] identifiers. The backend resolves
//! each distinct identifier once and replays the outcome at every position it
//! appeared in, so the response lines up one-to-one with the request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::Lookup;
use crate::{Error, Profile, Result};

/// Maximum number of entries in one bulk request
pub const MAX_BULK: usize = 10;

/// The three bulk endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    Names,
    Addresses,
    /// Names and addresses mixed, each classified by shape
    Universal,
}

impl BulkKind {
    /// (path segment under `/bulk`, repeated query parameter)
    pub fn route(self) -> (&'static str, &'static str) {
        match self {
            BulkKind::Names => ("n", "names[]"),
            BulkKind::Addresses => ("a", "addresses[]"),
            BulkKind::Universal => ("u", "queries[]"),
        }
    }

    /// Inverse of the path segment in [`BulkKind::route`]
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "n" => Some(BulkKind::Names),
            "a" => Some(BulkKind::Addresses),
            "u" => Some(BulkKind::Universal),
            _ => None,
        }
    }

    /// Short label for logs and metrics
    pub fn label(self) -> &'static str {
        match self {
            BulkKind::Names => "names",
            BulkKind::Addresses => "addresses",
            BulkKind::Universal => "universal",
        }
    }

    /// Lookup for one entry. Only the universal kind can reject an input
    /// here; names and addresses are validated by whoever resolves them.
    pub fn lookup(self, input: &str) -> Result<Lookup> {
        match self {
            BulkKind::Names => Ok(Lookup::Name(input.to_string())),
            BulkKind::Addresses => Ok(Lookup::Address(input.to_string())),
            BulkKind::Universal => Lookup::guess(input),
        }
    }
}

/// Deduplication plan for a validated bulk request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPlan {
    /// Distinct inputs in first-seen order
    unique: Vec<String>,
    /// For each request position, the index into `unique`
    positions: Vec<usize>,
}

impl BulkPlan {
    /// Validate the request size and deduplicate (case-insensitively).
    ///
    /// The limit applies to the request as sent, duplicates included.
    pub fn new(input: &[String], max: usize) -> Result<Self> {
        if input.len() > max {
            return Err(Error::TooManyInputs {
                count: input.len(),
                max,
            });
        }

        let mut seen: HashMap<String, usize> = HashMap::with_capacity(input.len());
        let mut unique = Vec::with_capacity(input.len());
        let mut positions = Vec::with_capacity(input.len());

        for entry in input {
            let index = *seen.entry(entry.to_lowercase()).or_insert_with(|| {
                unique.push(entry.clone());
                unique.len() - 1
            });
            positions.push(index);
        }

        Ok(Self { unique, positions })
    }

    /// Distinct inputs that actually need resolving
    pub fn unique(&self) -> &[String] {
        &self.unique
    }

    /// Number of entries in the original request
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Replay outcomes for the distinct inputs back onto the request order.
    ///
    /// `resolved[i]` must be the outcome for `unique()[i]`.
    pub fn expand<T: Clone>(&self, resolved: &[T]) -> Vec<T> {
        debug_assert_eq!(resolved.len(), self.unique.len());
        self.positions
            .iter()
            .map(|&index| resolved[index].clone())
            .collect()
    }
}

/// Error payload for a failed entry (and for whole-request failures)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    #[serde(default)]
    pub error: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            status: err.status(),
            error: err.to_string(),
        }
    }
}

impl From<Error> for ErrorBody {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

/// One independently tagged entry of a bulk response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BulkEntry<T> {
    #[serde(rename = "success")]
    Success(T),
    #[serde(rename = "error")]
    Error(ErrorBody),
}

impl<T> BulkEntry<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, BulkEntry::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BulkEntry<U> {
        match self {
            BulkEntry::Success(value) => BulkEntry::Success(f(value)),
            BulkEntry::Error(err) => BulkEntry::Error(err),
        }
    }
}

impl<T> From<std::result::Result<T, ErrorBody>> for BulkEntry<T> {
    fn from(value: std::result::Result<T, ErrorBody>) -> Self {
        match value {
            Ok(value) => BulkEntry::Success(value),
            Err(err) => BulkEntry::Error(err),
        }
    }
}

impl<T> From<BulkEntry<T>> for std::result::Result<T, ErrorBody> {
    fn from(value: BulkEntry<T>) -> Self {
        match value {
            BulkEntry::Success(value) => Ok(value),
            BulkEntry::Error(err) => Err(err),
        }
    }
}

/// Ordered bulk response with its length alongside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResponse<T> {
    pub response_length: usize,
    pub response: Vec<T>,
}

impl<T> From<Vec<T>> for BulkResponse<T> {
    fn from(value: Vec<T>) -> Self {
        Self {
            response_length: value.len(),
            response: value,
        }
    }
}

/// The other representation of a resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolved {
    Address { address: String },
    Name { name: String },
}

impl Resolved {
    /// Project a profile onto the direction that was asked for:
    /// name lookups yield the address, address lookups yield the name.
    pub fn from_profile(lookup: &Lookup, profile: &Profile) -> Option<Self> {
        match lookup {
            Lookup::Name(_) => profile.address.clone().map(|address| Resolved::Address { address }),
            Lookup::Address(_) if profile.name.is_empty() => None,
            Lookup::Address(_) => Some(Resolved::Name {
                name: profile.name.clone(),
            }),
        }
    }
}

/// Single or bulk point-lookup outcome
pub type ResolutionOutcome = BulkEntry<Resolved>;

impl ResolutionOutcome {
    /// Build the outcome for a lookup from the profile-level result
    pub fn from_lookup(lookup: &Lookup, result: std::result::Result<Profile, ErrorBody>) -> Self {
        match result {
            Ok(profile) => match Resolved::from_profile(lookup, &profile) {
                Some(resolved) => BulkEntry::Success(resolved),
                None => BulkEntry::Error(ErrorBody::from(Error::NotFound(
                    lookup.as_str().to_string(),
                ))),
            },
            Err(err) => BulkEntry::Error(err),
        }
    }
}
