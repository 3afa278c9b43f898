//! Chain identifier to icon location mapping

/// Base location for chain icons
pub const ICON_BASE_URL: &str = "https://frame.nyc3.cdn.digitaloceanspaces.com/icons";

/// Icon URL for a chain id as it appears in [`Profile::chains`](crate::Profile).
///
/// Chain ids are lowercased and `eth` maps to `ethereum`. Chains without an
/// alias use their own id, so unmapped chains fall back to `{id}.svg`.
pub fn chain_icon_url(chain: &str) -> String {
    let chain = chain.to_lowercase();
    let name = match chain.as_str() {
        "eth" => "ethereum",
        other => other,
    };
    format!("{ICON_BASE_URL}/{name}.svg")
}
