//! Profile records returned by the resolution service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Text records attached to a name.
///
/// Every record key the service is known to fetch has its own field; anything
/// else lands in `extra` so newer keys survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Records {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "com.github", default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(rename = "com.twitter", default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(rename = "com.discord", default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(rename = "org.telegram", default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(rename = "org.matrix", default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<String>,
    #[serde(rename = "io.keybase", default, skip_serializing_if = "Option::is_none")]
    pub keybase: Option<String>,
    #[serde(rename = "social.bsky", default, skip_serializing_if = "Option::is_none")]
    pub bluesky: Option<String>,
    #[serde(rename = "social.mastodon", default, skip_serializing_if = "Option::is_none")]
    pub mastodon: Option<String>,

    /// Unknown or future record keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Records {
    /// Look a record up by its wire key, known or not
    pub fn get(&self, key: &str) -> Option<&str> {
        let known = match key {
            "url" => &self.url,
            "name" => &self.name,
            "mail" => &self.mail,
            "email" => &self.email,
            "avatar" => &self.avatar,
            "header" => &self.header,
            "display" => &self.display,
            "location" => &self.location,
            "timezone" => &self.timezone,
            "language" => &self.language,
            "pronouns" => &self.pronouns,
            "description" => &self.description,
            "com.github" => &self.github,
            "com.twitter" => &self.twitter,
            "com.discord" => &self.discord,
            "org.telegram" => &self.telegram,
            "org.matrix" => &self.matrix,
            "io.keybase" => &self.keybase,
            "social.bsky" => &self.bluesky,
            "social.mastodon" => &self.mastodon,
            other => return self.extra.get(other).map(String::as_str),
        };
        known.as_deref()
    }
}

/// A resolved identity, as returned by point lookups and search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Canonical name. Empty when the server projected it away (bulk
    /// name lookups carry only the address).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Mainnet address (EIP-55 checksummed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Preferred capitalization of the name
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub records: Records,
    /// Addresses on other chains, keyed by chain id (`eth`, `btc`, ...)
    #[serde(default)]
    pub chains: BTreeMap<String, String>,
    /// Unix timestamp of when the service loaded this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh: Option<i64>,
}

impl Profile {
    /// Identifier to link to: the name when there is one, else the address
    pub fn profile_id(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.address.as_deref().unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        if self.display.is_empty() {
            &self.name
        } else {
            &self.display
        }
    }

    /// Avatar URL, falling back to the avatar text record
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar.as_deref().or(self.records.avatar.as_deref())
    }

    /// Header URL, falling back to the header text record
    pub fn header_url(&self) -> Option<&str> {
        self.header.as_deref().or(self.records.header.as_deref())
    }

    /// Case-insensitive comparison against the canonical name
    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserialize_with_unknown_records() {
        let json = r#"{
            "name": "luc.eth",
            "address": "0x225f137127d9067788314bc7fcc1f36746a3c3B5",
            "display": "luc.eth",
            "records": {
                "description": "hi",
                "com.twitter": "lucemansnl",
                "xyz.custom": "value"
            },
            "chains": { "eth": "0x225f137127d9067788314bc7fcc1f36746a3c3B5" },
            "fresh": 1700000000,
            "resolver": "0x231b0Ee14048e9dCcD1d247744d114a4EB5E8E63",
            "errors": {}
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "luc.eth");
        assert_eq!(profile.records.description.as_deref(), Some("hi"));
        assert_eq!(profile.records.twitter.as_deref(), Some("lucemansnl"));
        assert_eq!(profile.records.get("xyz.custom"), Some("value"));
        assert_eq!(profile.records.get("com.twitter"), Some("lucemansnl"));
        assert_eq!(profile.chains.len(), 1);
    }

    #[test]
    fn test_minimal_profile() {
        let profile: Profile = serde_json::from_str(r#"{"name":"nick.eth"}"#).unwrap();
        assert_eq!(profile.display_name(), "nick.eth");
        assert_eq!(profile.profile_id(), "nick.eth");
        assert!(profile.address.is_none());
        assert!(profile.avatar_url().is_none());
    }

    #[test]
    fn test_address_only_profile() {
        let profile: Profile =
            serde_json::from_str(r#"{"address":"0x225f137127d9067788314bc7fcc1f36746a3c3B5"}"#).unwrap();
        assert!(profile.name.is_empty());
        assert_eq!(
            profile.address.as_deref(),
            Some("0x225f137127d9067788314bc7fcc1f36746a3c3B5")
        );

        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_media_fallback_to_records() {
        let mut profile = Profile {
            name: "luc.eth".into(),
            ..Default::default()
        };
        profile.records.avatar = Some("ipfs://avatar".into());
        assert_eq!(profile.avatar_url(), Some("ipfs://avatar"));

        profile.avatar = Some("https://avatar".into());
        assert_eq!(profile.avatar_url(), Some("https://avatar"));
    }

    #[test]
    fn test_matches_name_ignores_case() {
        let profile = Profile {
            name: "Luc.eth".into(),
            ..Default::default()
        };
        assert!(profile.matches_name("luc.ETH"));
        assert!(!profile.matches_name("luc"));
    }
}
