//! Project Document
//!
//! A versioned JSON description of a session: the WAV data behind each
//! buffer id, the tracks and the clips placed on them.
//!
//! ```json
//! {
//!   "version": 1,
//!   "name": "demo",
//!   "sources": [
//!     { "id": "drums", "path": "audio/drums.wav" },
//!     { "id": "vox", "data": "UklGRiQAAABXQVZF..." }
//!   ],
//!   "tracks": [{ "id": "t1", "volume": 0.8 }],
//!   "clips": [{ "id": "c1", "bufferId": "drums", "trackId": "t1",
//!               "startTime": 0.0, "duration": 2.0 }]
//! }
//! ```
//!
//! A source either embeds its WAV bytes as standard base64 in `data` or
//! points at a file through `path`, relative to the document's directory.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{Clip, Engine, Track};
use crate::error::{MixError, Result};

/// Document version this build reads and writes
pub const PROJECT_VERSION: u32 = 1;

/// The WAV data behind one buffer id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    /// WAV file, relative to the document's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Base64-encoded WAV bytes; takes precedence over `path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl SourceRef {
    /// Source read from a WAV file
    pub fn file(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
            data: None,
        }
    }

    /// Source carrying its WAV bytes inside the document
    pub fn inline(id: impl Into<String>, wav: &[u8]) -> Self {
        Self {
            id: id.into(),
            path: None,
            data: Some(BASE64.encode(wav)),
        }
    }

    /// Fetch the WAV bytes, resolving relative paths against `base_dir`
    pub fn read(&self, base_dir: &Path) -> Result<Vec<u8>> {
        if let Some(data) = &self.data {
            return BASE64.decode(data.trim()).map_err(|e| MixError::Decode {
                reason: format!("source '{}' is not valid base64", self.id),
                source: Some(Box::new(e)),
            });
        }
        match &self.path {
            Some(path) => {
                let path = base_dir.join(path);
                debug!("reading source '{}' from {}", self.id, path.display());
                Ok(fs::read(path)?)
            }
            None => Err(MixError::InvalidProject {
                reason: format!("source '{}' has neither data nor path", self.id),
            }),
        }
    }
}

/// Serialized session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub clips: Vec<Clip>,
    /// Render length in seconds; the end of the last clip when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl ProjectDocument {
    /// Create an empty document at the current version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: PROJECT_VERSION,
            name: name.into(),
            sources: Vec::new(),
            tracks: Vec::new(),
            clips: Vec::new(),
            duration: None,
        }
    }

    /// Parse a document, checking the version before anything else
    ///
    /// Track parameters are clamped into range on load.
    pub fn from_json(content: &str) -> Result<Self> {
        let data: serde_json::Value = serde_json::from_str(content)?;

        let found = data
            .get("version")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        if found != PROJECT_VERSION {
            return Err(MixError::UnsupportedProjectVersion {
                found,
                expected: PROJECT_VERSION,
            });
        }

        let mut document: ProjectDocument = serde_json::from_value(data)?;
        document.tracks = document.tracks.iter().map(Track::sanitized).collect();
        Ok(document)
    }

    /// Read a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let document = Self::from_json(&content)?;
        debug!(
            "loaded project '{}': {} tracks, {} clips",
            document.name,
            document.tracks.len(),
            document.clips.len()
        );
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Timeline second at which the last clip stops sounding
    pub fn timeline_end(&self) -> f64 {
        self.clips
            .iter()
            .map(|clip| {
                let rate = self
                    .tracks
                    .iter()
                    .find(|t| t.id == clip.track_id)
                    .map(|t| t.sanitized().playback_rate)
                    .unwrap_or(1.0);
                clip.start_time + clip.timeline_duration(rate).max(0.0)
            })
            .fold(0.0, f64::max)
    }

    /// Length to render: the explicit duration or the timeline end
    pub fn render_duration(&self) -> f64 {
        self.duration.unwrap_or_else(|| self.timeline_end())
    }

    /// Decode every source into the engine's store
    ///
    /// Relative paths resolve against `base_dir`. Stops at the first source
    /// that cannot be read or decoded.
    pub fn load_sources(&self, base_dir: &Path, engine: &Engine) -> Result<usize> {
        for source in &self.sources {
            let bytes = source.read(base_dir)?;
            engine.decode_buffer(source.id.clone(), &bytes)?;
        }
        info!("loaded {} sources", self.sources.len());
        Ok(self.sources.len())
    }
}
