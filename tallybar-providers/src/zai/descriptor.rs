//! z.ai regions and quota profile.

use tallybar_core::ProviderProfile;

/// Type tag of the primary (5-hour token) bucket.
pub const PRIMARY_KIND: &str = "TOKENS_LIMIT";

/// Fixed labels for known bucket types.
const LABELS: &[(&str, &str)] = &[
    ("TOKENS_LIMIT", "Tokens (5h)"),
    ("TIME_LIMIT", "Search (Monthly)"),
];

/// Deployment of the z.ai coding plan API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZaiRegion {
    /// International service at api.z.ai.
    Global,
    /// Mainland China service (BigModel) at open.bigmodel.cn.
    China,
}

impl ZaiRegion {
    /// All regions, default first.
    pub const ALL: [ZaiRegion; 2] = [ZaiRegion::Global, ZaiRegion::China];

    /// Provider id used in config, keychain service names, and snapshots.
    pub fn id(self) -> &'static str {
        match self {
            Self::Global => "zai",
            Self::China => "bigmodel",
        }
    }

    /// Looks up a region by provider id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|region| region.id() == id)
    }

    /// Name shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Global => "z.ai",
            Self::China => "BigModel",
        }
    }

    /// Default API base URL.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Global => "https://api.z.ai",
            Self::China => "https://open.bigmodel.cn",
        }
    }

    /// Environment variables checked for an API key, in priority order.
    pub fn api_key_env_vars(self) -> &'static [&'static str] {
        match self {
            Self::Global => &["ZAI_API_KEY", "ZAI_API_TOKEN"],
            Self::China => &["BIGMODEL_API_KEY", "ZHIPU_API_KEY"],
        }
    }

    /// Where users manage their key and plan.
    pub fn dashboard_url(self) -> &'static str {
        match self {
            Self::Global => "https://z.ai/manage-apikey/subscription",
            Self::China => "https://open.bigmodel.cn/usercenter/glm-coding/usage",
        }
    }

    /// Normalization profile for this region.
    pub fn profile(self) -> ProviderProfile {
        ProviderProfile {
            id: self.id(),
            primary_kind: PRIMARY_KIND,
            labels: LABELS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_ids_roundtrip() {
        for region in ZaiRegion::ALL {
            assert_eq!(ZaiRegion::from_id(region.id()), Some(region));
        }
        assert_eq!(ZaiRegion::from_id("claude"), None);
    }

    #[test]
    fn test_profile_labels() {
        let profile = ZaiRegion::China.profile();
        assert_eq!(profile.id, "bigmodel");
        assert_eq!(profile.primary_kind, "TOKENS_LIMIT");
        assert_eq!(profile.label_for("TIME_LIMIT"), "Search (Monthly)");
        assert_eq!(profile.label_for("TOKENS_LIMIT"), "Tokens (5h)");
    }
}
