// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generator adapter trait for hosted generative-media APIs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VidraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GeneratedMedia, GenerationParams, ImageInput};

/// Callback receiving human-readable progress messages from composite operations.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Adapter for the external generation API.
///
/// Failures are reported as [`VidraError::Generation`] carrying the raw
/// upstream message; callers classify it, adapters never do.
#[async_trait]
pub trait GeneratorAdapter: PluginAdapter {
    /// Generates a video from text and/or reference media.
    async fn generate_video(&self, params: &GenerationParams)
    -> Result<GeneratedMedia, VidraError>;

    /// Edits a still image according to `prompt`.
    async fn edit_image(&self, image: &ImageInput, prompt: &str)
    -> Result<ImageInput, VidraError>;

    /// Replaces the subject of the start frame with the character reference
    /// and animates the result, reporting progress along the way.
    async fn generate_character_replacement(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<GeneratedMedia, VidraError>;

    /// Produces a quick still previewing what `params` would generate.
    async fn generate_preview(&self, params: &GenerationParams)
    -> Result<ImageInput, VidraError>;
}
