pub const ONSEN_STATUS_HEADER: &str = "x-onsen-status";
pub const ONSEN_CACHE_HEADER: &str = "x-onsen-cache";
pub const ONSEN_STATUS_HEALTHY: &str = "healthy";
pub const ONSEN_STATUS_READY: &str = "ready";
pub const ONSEN_STATUS_NOT_READY: &str = "not_ready";
pub const ONSEN_STATUS_ERROR: &str = "error";

/// Whether a query was answered from the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// The cache was not consulted.
    Bypass,
}

impl CacheStatus {
    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_header_value())
    }
}
