use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }
}

/// An entry of `/api/alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// "release", "weather", "condition", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub river: String,
    pub message: String,
    pub severity: Severity,
    pub expires: DateTime<Utc>,
}

impl Alert {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

/// Active alerts, most severe first.
pub fn active_alerts(alerts: &[Alert], now: DateTime<Utc>) -> Vec<&Alert> {
    let mut active: Vec<&Alert> = alerts.iter().filter(|a| a.is_active(now)).collect();
    active.sort_by(|a, b| b.severity.cmp(&a.severity));
    active
}
