// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Vidra studio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Error count above which the health status is [`HealthStatus::Critical`].
pub const CRITICAL_ERROR_THRESHOLD: u32 = 5;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Allocate a fresh, process-unique job id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a generation job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted; waiting on the generation API.
    Generating,
    /// A successful job being re-rendered at a higher resolution.
    Upgrading,
    /// Media is available.
    Success,
    /// Generation failed; `error_message` holds the classified text.
    Error,
}

impl JobStatus {
    /// Whether the status is a resting state for a submission.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }
}

/// How a request is turned into video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Prompt only.
    TextToVideo,
    /// Prompt plus a start frame.
    FramesToVideo,
    /// Prompt plus style/subject reference images.
    ReferencesToVideo,
    /// Edit the start frame with the prompt, then animate the edited still.
    ImageEditToVideo,
    /// Swap the subject of the start frame for a character reference, then animate.
    CharacterReplacement,
}

/// Output resolution tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum Resolution {
    #[strum(serialize = "720p")]
    #[serde(rename = "720p")]
    P720,
    #[strum(serialize = "1080p")]
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// The highest tier the generator supports; upgrades target this.
    pub const fn highest() -> Self {
        Resolution::P1080
    }
}

/// Output frame aspect ratio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AspectRatio {
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Landscape,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Portrait,
}

/// An inline image used as reference media or produced by an edit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// The immutable parameters a job was created from.
///
/// Retained on the job so it can be regenerated or upgraded later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub mode: GenerationMode,
    /// Start frame, or the still to edit / re-cast depending on `mode`.
    #[serde(default)]
    pub start_frame: Option<ImageInput>,
    #[serde(default)]
    pub reference_images: Vec<ImageInput>,
    /// Character reference for [`GenerationMode::CharacterReplacement`].
    #[serde(default)]
    pub character_image: Option<ImageInput>,
}

impl GenerationParams {
    /// Text-to-video parameters at 720p landscape.
    pub fn text(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: AspectRatio::Landscape,
            resolution: Resolution::P720,
            mode: GenerationMode::TextToVideo,
            start_frame: None,
            reference_images: Vec::new(),
            character_image: None,
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_start_frame(mut self, image: ImageInput) -> Self {
        self.start_frame = Some(image);
        self
    }

    pub fn has_reference_media(&self) -> bool {
        self.start_frame.is_some()
            || !self.reference_images.is_empty()
            || self.character_image.is_some()
    }

    /// A request is submittable with a non-empty prompt or any reference media.
    pub fn is_submittable(&self) -> bool {
        !self.prompt.trim().is_empty() || self.has_reference_media()
    }
}

/// Reference to produced video as stored on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMedia {
    pub url: String,
    pub resolution: Resolution,
}

/// Video returned by the generation API: a handle plus the downloaded bytes.
#[derive(Clone)]
pub struct GeneratedMedia {
    pub url: String,
    pub blob: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for GeneratedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedMedia")
            .field("url", &self.url)
            .field("bytes", &self.blob.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// One generation request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub params: Option<GenerationParams>,
    #[serde(default)]
    pub media: Option<ResultMedia>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// A freshly submitted job in [`JobStatus::Generating`].
    pub fn pending(params: GenerationParams) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Generating,
            params: Some(params),
            media: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Resolve to success with the produced media.
    pub fn succeed(&mut self, media: ResultMedia) {
        self.status = JobStatus::Success;
        self.media = Some(media);
        self.error_message = None;
    }

    /// Resolve to failure with a classified message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.media = None;
        self.error_message = Some(message.into());
    }

    /// Enter [`JobStatus::Upgrading`], keeping the current media visible.
    ///
    /// Returns `false` (and changes nothing) unless the job is a successful
    /// job with replayable params.
    pub fn begin_upgrade(&mut self) -> bool {
        if self.status != JobStatus::Success || self.params.is_none() {
            return false;
        }
        self.status = JobStatus::Upgrading;
        true
    }

    /// Return an upgrading job to success without touching its media.
    pub fn revert_upgrade(&mut self) {
        if self.status == JobStatus::Upgrading {
            self.status = JobStatus::Success;
        }
    }
}

/// Coarse health of the studio, derived from the active error count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn from_error_count(count: u32) -> Self {
        match count {
            0 => HealthStatus::Healthy,
            c if c > CRITICAL_ERROR_THRESHOLD => HealthStatus::Critical,
            _ => HealthStatus::Degraded,
        }
    }
}

/// Health reported by an adapter's own health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterHealth {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Generator,
    Persistence,
    MediaCache,
}

/// Severity for health log entries and persisted events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
