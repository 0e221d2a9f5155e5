// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal formatting for jobs and notices.

use colored::Colorize;
use vidra_core::{GenerationJob, JobStatus};
use vidra_studio::{Notice, NoticeKind};

const PROMPT_WIDTH: usize = 48;

pub fn format_notice(notice: &Notice) -> String {
    let tag = match notice.kind {
        NoticeKind::Success => "ok".green(),
        NoticeKind::Error => "error".red(),
        NoticeKind::Info => "info".cyan(),
    };
    format!("  [{tag}] {}", notice.message)
}

fn status_label(status: JobStatus, use_color: bool) -> String {
    let label = format!("{:<10}", status.to_string());
    if !use_color {
        return label;
    }
    match status {
        JobStatus::Success => label.green().to_string(),
        JobStatus::Error => label.red().to_string(),
        JobStatus::Generating | JobStatus::Upgrading => label.yellow().to_string(),
    }
}

/// One feed row: id, status, resolution, prompt.
pub fn format_job_line(job: &GenerationJob, use_color: bool) -> String {
    let resolution = job
        .media
        .as_ref()
        .map(|m| m.resolution.to_string())
        .unwrap_or_else(|| "-".to_string());
    let prompt = job
        .params
        .as_ref()
        .map(|p| truncate(&p.prompt, PROMPT_WIDTH))
        .unwrap_or_default();
    let mut line = format!(
        "{}  {}  {:<5}  {prompt}",
        job.id,
        status_label(job.status, use_color),
        resolution
    );
    if let Some(err) = &job.error_message {
        line.push_str(&format!("\n      {err}"));
    }
    line
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
