// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed commands: generate, feed, upgrade, regenerate, delete.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing::info;
use vidra_core::classify::{ErrorKind, template_for};
use vidra_core::{
    AspectRatio, GenerationJob, GenerationMode, GenerationParams, ImageInput, JobId, JobStatus,
    Resolution, VidraError,
};

use crate::app::App;
use crate::output::format_job_line;

/// Options for `vidra generate`.
#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub prompt: String,
    pub mode: Option<GenerationMode>,
    pub model: Option<String>,
    pub resolution: Option<Resolution>,
    pub aspect_ratio: Option<AspectRatio>,
    pub start_frame: Option<PathBuf>,
    pub references: Vec<PathBuf>,
    pub character: Option<PathBuf>,
    pub preview: bool,
}

/// Reads an image file, guessing its MIME type from the extension.
pub async fn load_image(path: &Path) -> Result<ImageInput, VidraError> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        VidraError::Config(format!("cannot read image {}: {e}", path.display()))
    })?;
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    };
    Ok(ImageInput::new(data, mime))
}

/// Mode implied by the supplied media when none is given explicitly.
pub fn infer_mode(args: &GenerateArgs) -> GenerationMode {
    if let Some(mode) = args.mode {
        return mode;
    }
    if args.character.is_some() {
        GenerationMode::CharacterReplacement
    } else if !args.references.is_empty() {
        GenerationMode::ReferencesToVideo
    } else if args.start_frame.is_some() {
        GenerationMode::FramesToVideo
    } else {
        GenerationMode::TextToVideo
    }
}

pub async fn build_params(app: &App, args: &GenerateArgs) -> Result<GenerationParams, VidraError> {
    let studio = &app.config.studio;
    let mut params = GenerationParams::text(
        args.prompt.clone(),
        args.model.clone().unwrap_or_else(|| studio.default_model.clone()),
    )
    .with_mode(infer_mode(args))
    .with_resolution(args.resolution.unwrap_or(studio.default_resolution));
    params.aspect_ratio = args.aspect_ratio.unwrap_or(studio.default_aspect_ratio);

    if let Some(path) = &args.start_frame {
        params.start_frame = Some(load_image(path).await?);
    }
    for path in &args.references {
        params.reference_images.push(load_image(path).await?);
    }
    if let Some(path) = &args.character {
        params.character_image = Some(load_image(path).await?);
    }
    Ok(params)
}

pub async fn run_generate(app: &App, args: GenerateArgs) -> Result<(), VidraError> {
    let params = build_params(app, &args).await?;
    if !params.is_submittable() {
        return Err(VidraError::Config(
            "nothing to generate: give a prompt or reference media".into(),
        ));
    }

    if args.preview {
        app.controller.schedule_preview(params.clone());
        let mut preview = app.controller.preview();
        let wait = app.controller.options().preview_debounce * 4 + std::time::Duration::from_secs(60);
        if tokio::time::timeout(wait, preview.changed()).await.is_ok()
            && let Some(image) = app.controller.current_preview()
        {
            let path = app.cache.materialize(&JobId::from("preview"), &image.data, &image.mime_type).await?;
            println!("preview: {}", path.display());
        }
    }

    let id = app.controller.submit(params);
    println!("submitted {id}");
    let job = app.controller.wait_for_terminal(&id).await?;
    report(app, &job).await
}

pub async fn run_feed(app: &App) -> Result<(), VidraError> {
    let use_color = std::io::stdout().is_terminal();
    let jobs = app.controller.jobs();
    if jobs.is_empty() {
        println!("  feed is empty");
        return Ok(());
    }
    for job in &jobs {
        println!("{}", format_job_line(job, use_color));
    }
    Ok(())
}

pub async fn run_upgrade(app: &App, id: &JobId) -> Result<(), VidraError> {
    let Some(job) = app.controller.job(id) else {
        return Err(VidraError::JobNotFound(id.clone()));
    };
    if !app.controller.upgrade(id) {
        println!("{id} cannot be upgraded from status {}", job.status);
        return Ok(());
    }
    println!("upgrading {id} to {}", Resolution::highest());
    let job = app.controller.wait_for_terminal(id).await?;
    report(app, &job).await
}

pub async fn run_regenerate(app: &App, id: &JobId) -> Result<(), VidraError> {
    if app.controller.job(id).is_none() {
        return Err(VidraError::JobNotFound(id.clone()));
    }
    let Some(new_id) = app.controller.regenerate(id) else {
        println!("{id} has no stored parameters to regenerate from");
        return Ok(());
    };
    println!("submitted {new_id} (from {id})");
    let job = app.controller.wait_for_terminal(&new_id).await?;
    report(app, &job).await
}

pub async fn run_delete(app: &App, id: &JobId) -> Result<(), VidraError> {
    app.controller.delete(id).await?;
    println!("deleted {id}");
    Ok(())
}

/// Whether a stored error message is one of the credential failure texts.
pub fn is_auth_failure(message: &str) -> bool {
    [
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::BillingError,
    ]
    .into_iter()
    .any(|kind| template_for(kind) == message)
}

async fn report(app: &App, job: &GenerationJob) -> Result<(), VidraError> {
    let use_color = std::io::stdout().is_terminal();
    println!("{}", format_job_line(job, use_color));

    match job.status {
        JobStatus::Success => {
            if let Some(path) = app.materialize(job).await? {
                println!("  saved to {}", path.display());
            }
            Ok(())
        }
        JobStatus::Error => {
            let message = job.error_message.clone().unwrap_or_default();
            if is_auth_failure(&message) {
                let wait = app.controller.options().auth_reprompt_delay
                    + std::time::Duration::from_secs(120);
                if app.prompt.wait_for_dialog(wait).await {
                    info!(job_id = %job.id, "credential prompt finished");
                    println!("  run `vidra regenerate {}` to retry with the new key", job.id);
                }
            }
            Err(VidraError::generation(message))
        }
        JobStatus::Generating | JobStatus::Upgrading => Ok(()),
    }
}
