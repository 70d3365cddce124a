//! Aspect ratio probing
//!
//! Runs `ffprobe` against a local file and reads `display_aspect_ratio` from
//! the first reported stream. Classification into a storage folder is a pure
//! function of the reported ratio string.

use crate::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;

/// Probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch probe: {0}")]
    Launch(#[from] std::io::Error),

    #[error("Probe exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("Malformed probe output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("Probe reported no streams")]
    NoStreams,
}

/// Reports the display aspect ratio of a local media file
#[async_trait]
pub trait AspectRatioProbe: Send + Sync {
    /// Raw ratio string as reported, e.g. `16:9`
    async fn aspect_ratio(&self, path: &Path) -> Result<String, ProbeError>;
}

/// Coarse aspect-ratio bucket used as a storage key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClassification {
    Landscape,
    Portrait,
    Other,
}

impl AspectClassification {
    /// Folder label used in object keys
    pub fn folder(&self) -> &'static str {
        match self {
            AspectClassification::Landscape => "landscape",
            AspectClassification::Portrait => "portrait",
            AspectClassification::Other => "other",
        }
    }
}

impl fmt::Display for AspectClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// Exact-string classification: `16:9` and `9:16` only, everything else is `Other`.
pub fn classify_aspect_ratio(ratio: &str) -> AspectClassification {
    match ratio {
        "16:9" => AspectClassification::Landscape,
        "9:16" => AspectClassification::Portrait,
        _ => AspectClassification::Other,
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    display_aspect_ratio: Option<String>,
}

/// Extract the first stream's `display_aspect_ratio` from ffprobe JSON.
///
/// A first stream without the field yields an empty string.
pub fn parse_display_aspect_ratio(stdout: &[u8]) -> Result<String, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;
    let first = output.streams.into_iter().next().ok_or(ProbeError::NoStreams)?;
    Ok(first.display_aspect_ratio.unwrap_or_default())
}

/// `ffprobe` subprocess probe
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl AspectRatioProbe for FfprobeProbe {
    #[tracing::instrument(
        name = "probe.aspect_ratio",
        skip(self),
        fields(
            process.executable.path = %self.ffprobe_path,
            probe.aspect_ratio = tracing::field::Empty
        ),
        err
    )]
    async fn aspect_ratio(&self, path: &Path) -> Result<String, ProbeError> {
        let start = Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;

        metrics::record_probe_duration(start.elapsed().as_secs_f64());

        if !output.status.success() {
            return Err(ProbeError::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let ratio = parse_display_aspect_ratio(&output.stdout)?;
        tracing::Span::current().record("probe.aspect_ratio", ratio.as_str());

        Ok(ratio)
    }
}
