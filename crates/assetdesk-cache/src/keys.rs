//! Cache key builders for all AssetDesk cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use uuid::Uuid;

/// Prefix applied to all AssetDesk cache keys.
const PREFIX: &str = "assetdesk";

/// Cache key for a report preview as seen by one viewer.
pub fn report_preview(report_id: Uuid, viewer_id: Uuid) -> String {
    format!("{PREFIX}:report:{report_id}:preview:{viewer_id}")
}

/// Prefix covering every cached entry of a report.
pub fn report_prefix(report_id: Uuid) -> String {
    format!("{PREFIX}:report:{report_id}:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_key_under_report_prefix() {
        let report = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        assert!(report_preview(report, viewer).starts_with(&report_prefix(report)));
    }
}
