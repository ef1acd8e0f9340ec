//! Usage recency banding.

use crate::config::ScoringConfig;
use crate::types::UsagePattern;

/// Band days-since-last-use into a usage pattern. `None` means never used,
/// which lands in the dormant band together with anything past the stale
/// boundary.
pub fn classify_usage(days_since_last_use: Option<i64>, config: &ScoringConfig) -> UsagePattern {
    match days_since_last_use {
        Some(days) if days <= config.active_days => UsagePattern::Active,
        Some(days) if days <= config.recent_days => UsagePattern::Recent,
        Some(days) if days <= config.stale_days => UsagePattern::Stale,
        _ => UsagePattern::Dormant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        let config = ScoringConfig::default();
        assert_eq!(classify_usage(Some(0), &config), UsagePattern::Active);
        assert_eq!(classify_usage(Some(30), &config), UsagePattern::Active);
        assert_eq!(classify_usage(Some(31), &config), UsagePattern::Recent);
        assert_eq!(classify_usage(Some(90), &config), UsagePattern::Recent);
        assert_eq!(classify_usage(Some(91), &config), UsagePattern::Stale);
        assert_eq!(classify_usage(Some(365), &config), UsagePattern::Stale);
        assert_eq!(classify_usage(Some(366), &config), UsagePattern::Dormant);
    }

    #[test]
    fn test_never_used_is_dormant() {
        let config = ScoringConfig::default();
        assert_eq!(classify_usage(None, &config), UsagePattern::Dormant);
    }
}
