use super::scoring::Item;
use serde::{Deserialize, Serialize};

pub const HIGH_RISK_THRESHOLD: i64 = 60;
pub const MEDIUM_RISK_THRESHOLD: i64 = 25;

/// Tags naming hardcore competition restrictions. Any item carrying one forces HIGH risk.
pub const HARDCORE_TAGS: [&str; 4] = [
    "price_fixing",
    "market_sharing",
    "output_limitation",
    "bid_rigging",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

pub fn risk_bucket(score: i64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Risk level plus the reason a hardcore override was applied, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub override_reason: Option<String>,
}

/// Buckets `score`, escalating to HIGH when any item marks a hardcore restriction.
pub fn classify<'a, I>(score: i64, items: I) -> RiskAssessment
where
    I: IntoIterator<Item = &'a Item>,
{
    match items.into_iter().find_map(hardcore_trigger) {
        Some(reason) => RiskAssessment {
            level: RiskLevel::High,
            override_reason: Some(reason),
        },
        None => RiskAssessment {
            level: risk_bucket(score),
            override_reason: None,
        },
    }
}

/// Explains why `item` forces HIGH risk, if it does.
pub fn hardcore_trigger(item: &Item) -> Option<String> {
    let hardcore_tag = item
        .tag
        .as_deref()
        .map(canonical_tag)
        .filter(|tag| HARDCORE_TAGS.contains(&tag.as_str()));

    match (hardcore_tag, item.hardcore == Some(true)) {
        (Some(tag), _) => Some(format!(
            "hardcore restriction '{}' recorded for {} ({})",
            tag, item.id, item.answer
        )),
        (None, true) => Some(match item.tag.as_deref() {
            Some(tag) => format!(
                "hardcore restriction flagged as '{}' for {} ({})",
                tag, item.id, item.answer
            ),
            None => format!(
                "hardcore restriction flagged for {} ({})",
                item.id, item.answer
            ),
        }),
        (None, false) => None,
    }
}

fn canonical_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
