use serde::{Deserialize, Serialize};

/// How a derivative is fitted into its target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Scale to cover the whole box, then centre-crop the overflow.
    #[default]
    #[serde(alias = "center-crop")]
    Cover,
}

/// One derivative target, e.g. `thumb` or `small`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeProfile {
    pub name: String,
    /// Directory segment under the storage root, one level deep.
    pub directory: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fit: FitMode,
}

impl ResizeProfile {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            directory: name.to_string(),
            width,
            height,
            fit: FitMode::Cover,
        }
    }
}

pub fn default_profiles() -> Vec<ResizeProfile> {
    vec![
        ResizeProfile::new("thumb", 120, 100),
        ResizeProfile::new("small", 320, 240),
    ]
}
