use serde::{Deserialize, Serialize};

/// Where completed utterances are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub output_dir: String,
    pub enabled: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        AssetConfig {
            output_dir: "recordings".to_string(),
            enabled: true,
        }
    }
}
