//! Referrer classification into a small label taxonomy.

use serde::{Deserialize, Serialize};

/// Label for events without a referrer.
pub const DIRECT: &str = "Direct";
/// Label for referrers matching no rule.
pub const OTHER: &str = "Other";

/// One classification rule: a case-insensitive substring and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerRule {
    pub needle: String,
    pub label: String,
}

impl ReferrerRule {
    pub fn new(needle: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_lowercase(),
            label: label.into(),
        }
    }
}

/// Ordered referrer rules. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerTable {
    rules: Vec<ReferrerRule>,
}

impl Default for ReferrerTable {
    fn default() -> Self {
        Self::new(vec![
            ReferrerRule::new("google", "Google"),
            ReferrerRule::new("facebook", "Facebook"),
            ReferrerRule::new("twitter", "Twitter"),
        ])
    }
}

impl ReferrerTable {
    pub fn new(rules: Vec<ReferrerRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|r| !r.needle.is_empty())
            .map(|r| ReferrerRule::new(r.needle, r.label))
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[ReferrerRule] {
        &self.rules
    }

    /// Classify a raw referrer URL.
    pub fn classify(&self, referrer: &str) -> String {
        if referrer.trim().is_empty() {
            return DIRECT.to_string();
        }
        let lower = referrer.to_lowercase();
        self.rules
            .iter()
            .find(|r| lower.contains(&r.needle))
            .map(|r| r.label.clone())
            .unwrap_or_else(|| OTHER.to_string())
    }

    /// Whether a raw referrer belongs to `label`: either it classifies to that
    /// label or it contains `label` case-insensitively.
    pub fn matches(&self, label: &str, referrer: &str) -> bool {
        if self.classify(referrer).eq_ignore_ascii_case(label) {
            return true;
        }
        !label.is_empty() && referrer.to_lowercase().contains(&label.to_lowercase())
    }
}
