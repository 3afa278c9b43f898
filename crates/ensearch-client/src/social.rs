//! Social graph follower counts

use serde::{Deserialize, Deserializer, Serialize};

/// Follower and following counts for an identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialStats {
    #[serde(rename = "followers_count", deserialize_with = "count")]
    pub followers: u64,
    #[serde(rename = "following_count", deserialize_with = "count")]
    pub following: u64,
}

/// The social graph API reports counts as strings; accept numbers too
fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
