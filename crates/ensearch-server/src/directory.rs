//! In-memory profile directory
//!
//! Loaded from a JSON array of profiles. Names are indexed case-insensitively,
//! addresses are stored EIP-55 checksummed and indexed by their lowercase hex,
//! so any casing of a registered address resolves.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use ensearch_core::{is_address_candidate, is_name_candidate, normalize_address, Error, Profile};

use crate::error::{Result, ServerError};
use crate::resolver::ProfileResolver;

#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// Sorted by lowercase name
    profiles: Vec<Profile>,
    by_name: HashMap<String, usize>,
    by_address: HashMap<String, usize>,
    loaded_at: i64,
}

impl Directory {
    /// Read and index a directory file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ServerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let profiles: Vec<Profile> = serde_json::from_slice(bytes)?;
        Self::from_profiles(profiles)
    }

    /// Index profiles, checksumming their addresses.
    ///
    /// A later entry with the same name replaces an earlier one. When two
    /// profiles claim the same address, the first (by name) keeps the reverse
    /// record.
    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Result<Self> {
        let loaded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        let mut by_lower: BTreeMap<String, Profile> = BTreeMap::new();
        for mut profile in profiles {
            profile.name = profile.name.trim().to_string();
            if profile.name.is_empty() {
                return Err(ServerError::InvalidEntry("profile without a name".into()));
            }
            if !is_name_candidate(&profile.name) {
                tracing::warn!(name = %profile.name, "Directory name is not dot-separated");
            }
            if let Some(address) = profile.address.take() {
                let checksummed = normalize_address(&address)
                    .map_err(|e| ServerError::InvalidEntry(format!("{}: {e}", profile.name)))?;
                profile.address = Some(checksummed);
            }
            profile.fresh = Some(loaded_at);

            if let Some(previous) = by_lower.insert(profile.name.to_lowercase(), profile) {
                tracing::warn!(name = %previous.name, "Duplicate directory entry replaced");
            }
        }

        let profiles: Vec<Profile> = by_lower.into_values().collect();
        let mut by_name = HashMap::with_capacity(profiles.len());
        let mut by_address = HashMap::with_capacity(profiles.len());

        for (index, profile) in profiles.iter().enumerate() {
            by_name.insert(profile.name.to_lowercase(), index);
            if let Some(address) = &profile.address {
                let key = address.to_lowercase();
                if by_address.contains_key(&key) {
                    tracing::warn!(%address, name = %profile.name, "Address already claimed");
                } else {
                    by_address.insert(key, index);
                }
            }
        }

        Ok(Self {
            profiles,
            by_name,
            by_address,
            loaded_at,
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Unix timestamp of when this directory was indexed
    pub fn loaded_at(&self) -> i64 {
        self.loaded_at
    }

    pub fn get_name(&self, name: &str) -> Result<Profile> {
        let name = name.trim();
        if !is_name_candidate(name) {
            tracing::warn!(name, "Rejecting name the classifier does not accept");
            return Err(Error::InvalidFormat(format!("not a name: {name}")).into());
        }

        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| self.profiles[index].clone())
            .ok_or_else(|| Error::NotFound(name.to_string()).into())
    }

    pub fn get_address(&self, address: &str) -> Result<Profile> {
        let address = address.trim();
        if !is_address_candidate(address) {
            return Err(Error::InvalidFormat(format!("not an address: {address}")).into());
        }

        self.by_address
            .get(&address.to_lowercase())
            .map(|&index| self.profiles[index].clone())
            .ok_or_else(|| Error::NotFound(address.to_string()).into())
    }

    /// Case-insensitive substring match on name and display name.
    ///
    /// Exact name matches come first, then the rest in name order. An
    /// address-shaped term also matches the profile registered at it.
    pub fn find(&self, term: &str, limit: usize) -> Vec<Profile> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }
        let by_address = is_address_candidate(&needle);

        let mut matches: Vec<&Profile> = self
            .profiles
            .iter()
            .filter(|profile| {
                profile.name.to_lowercase().contains(&needle)
                    || profile.display.to_lowercase().contains(&needle)
                    || (by_address
                        && profile
                            .address
                            .as_deref()
                            .is_some_and(|a| a.eq_ignore_ascii_case(&needle)))
            })
            .collect();
        matches.sort_by_key(|profile| !profile.matches_name(&needle));

        matches.into_iter().take(limit).cloned().collect()
    }
}

#[async_trait]
impl ProfileResolver for Directory {
    async fn resolve_name(&self, name: &str) -> Result<Profile> {
        self.get_name(name)
    }

    async fn resolve_address(&self, address: &str) -> Result<Profile> {
        self.get_address(address)
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Profile>> {
        Ok(self.find(term, limit))
    }
}
