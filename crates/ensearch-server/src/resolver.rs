//! Backend seam for the HTTP routes

use async_trait::async_trait;
use ensearch_core::{Lookup, Profile};

use crate::error::Result;

/// Source of profiles behind the resolution routes.
///
/// Inputs arrive as sent by the caller; implementations validate their
/// shape and report `InvalidFormat` or `NotFound` through the error.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve_name(&self, name: &str) -> Result<Profile>;

    async fn resolve_address(&self, address: &str) -> Result<Profile>;

    /// Discovery search, at most `limit` profiles
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Profile>>;

    /// Resolve a lookup whose kind is already known
    async fn resolve(&self, lookup: &Lookup) -> Result<Profile> {
        match lookup {
            Lookup::Name(name) => self.resolve_name(name).await,
            Lookup::Address(address) => self.resolve_address(address).await,
        }
    }
}
