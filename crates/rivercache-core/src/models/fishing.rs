use serde::{Deserialize, Serialize};

/// An entry of `/api/fishing-reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishingReport {
    pub river: String,
    pub section: String,
    pub report: String,
    pub date: String,
    #[serde(default)]
    pub flies: Vec<String>,
}

impl FishingReport {
    pub fn title(&self) -> String {
        format!("{} - {}", self.river, self.section)
    }
}
