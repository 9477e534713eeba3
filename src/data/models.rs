//! Persisted share models
//!
//! Field names follow the JSON the browser client reads and writes
//! (`createdAt`, `enable3D`), so records stay interchangeable between the
//! two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current [`SceneSnapshot`] format version
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Encoding tag of a scene snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SceneFormat {
    /// Base64 of the renderer-native file format
    BinaryBlob,
    /// Any tag this build does not understand; kept so it can be rejected
    /// explicitly instead of failing deserialization.
    Other(String),
}

impl SceneFormat {
    pub fn as_str(&self) -> &str {
        match self {
            SceneFormat::BinaryBlob => "binary-blob",
            SceneFormat::Other(tag) => tag,
        }
    }
}

impl From<String> for SceneFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "binary-blob" => SceneFormat::BinaryBlob,
            _ => SceneFormat::Other(value),
        }
    }
}

impl From<SceneFormat> for String {
    fn from(value: SceneFormat) -> Self {
        match value {
            SceneFormat::BinaryBlob => "binary-blob".to_string(),
            SceneFormat::Other(tag) => tag,
        }
    }
}

/// Versioned, opaque renderer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub version: u32,
    pub format: SceneFormat,
    /// Base64 payload; only the renderer can interpret it
    pub data: String,
}

impl SceneSnapshot {
    /// Whether this build can hand the snapshot to a renderer
    pub fn is_supported(&self) -> bool {
        self.version == SCENE_FORMAT_VERSION
            && self.format == SceneFormat::BinaryBlob
            && !self.data.trim().is_empty()
    }
}

/// Extra fields captured alongside the code when sharing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOptions {
    pub enable_3d: bool,
    pub scene: Option<SceneSnapshot>,
}

impl ShareOptions {
    pub fn with_3d(mut self, enable_3d: bool) -> Self {
        self.enable_3d = enable_3d;
        self
    }

    pub fn with_scene(mut self, scene: Option<SceneSnapshot>) -> Self {
        self.scene = scene;
        self
    }
}

/// The persisted unit behind a share link. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub code: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "enable3D", default)]
    pub enable_3d: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneSnapshot>,
}

impl ShareRecord {
    pub fn new(code: impl Into<String>, options: ShareOptions) -> Self {
        Self {
            code: code.into(),
            created_at: Utc::now(),
            enable_3d: options.enable_3d,
            scene: options.scene,
        }
    }
}
