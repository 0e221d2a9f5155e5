// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of raw generation API failures.
//!
//! The upstream API only gives us a message string, so failures are sorted
//! by substring rules held in an ordered table. Matching is case-insensitive
//! and treats `_` as a space, which lets `RESOURCE_EXHAUSTED` hit the
//! "resource exhausted" rule. The first matching rule wins.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Category of a generation failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    QuotaExceeded,
    ServerError,
    BillingError,
    SafetyBlocked,
    Unknown,
}

impl ErrorKind {
    /// Whether the failure implies the stored credential is unusable.
    pub fn is_auth_class(self) -> bool {
        matches!(
            self,
            ErrorKind::Unauthorized | ErrorKind::Forbidden | ErrorKind::BillingError
        )
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub kind: ErrorKind,
    /// Lowercase substrings, any of which selects this rule.
    pub needles: &'static [&'static str],
    /// User-facing message that replaces the raw error.
    pub template: &'static str,
}

/// Message used when no rule matches.
pub const UNKNOWN_TEMPLATE: &str = "Generation failed unexpectedly. Please try again.";

/// Rules in priority order.
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        kind: ErrorKind::BadRequest,
        needles: &["400", "invalid argument"],
        template: "The request was rejected as invalid. Check the prompt and reference media, then try again.",
    },
    ClassificationRule {
        kind: ErrorKind::Unauthorized,
        needles: &["401", "unauthenticated"],
        template: "Your API key is missing or invalid. Please select a valid key.",
    },
    ClassificationRule {
        kind: ErrorKind::Forbidden,
        needles: &["403", "permission denied"],
        template: "Your API key does not have permission to use this model.",
    },
    ClassificationRule {
        kind: ErrorKind::NotFound,
        needles: &["404"],
        template: "The requested model or resource was not found.",
    },
    ClassificationRule {
        kind: ErrorKind::QuotaExceeded,
        needles: &["429", "quota", "resource exhausted"],
        template: "Quota exceeded. Wait a moment before generating again.",
    },
    ClassificationRule {
        kind: ErrorKind::ServerError,
        needles: &["500", "internal"],
        template: "The generation service hit an internal error. Please try again shortly.",
    },
    ClassificationRule {
        kind: ErrorKind::BillingError,
        needles: &["billing", "project not linked"],
        template: "Billing is not enabled for the project behind this API key.",
    },
    ClassificationRule {
        kind: ErrorKind::SafetyBlocked,
        needles: &["safety", "blocked"],
        template: "The request was blocked by safety filters. Try rephrasing the prompt.",
    },
];

/// A failure after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Display message stored on the job.
    pub message: String,
    /// Original upstream text, kept for the event log.
    pub raw: String,
}

impl ClassifiedError {
    pub fn is_auth_class(&self) -> bool {
        self.kind.is_auth_class()
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Classify a raw error message against [`CLASSIFICATION_RULES`].
pub fn classify(raw: &str) -> ClassifiedError {
    classify_with(CLASSIFICATION_RULES, raw)
}

/// Classify against an arbitrary rule table.
pub fn classify_with(rules: &[ClassificationRule], raw: &str) -> ClassifiedError {
    let normalized = raw.to_lowercase().replace('_', " ");
    let matched = rules
        .iter()
        .find(|rule| rule.needles.iter().any(|n| normalized.contains(n)));

    match matched {
        Some(rule) => ClassifiedError {
            kind: rule.kind,
            message: rule.template.to_string(),
            raw: raw.to_string(),
        },
        None => ClassifiedError {
            kind: ErrorKind::Unknown,
            message: UNKNOWN_TEMPLATE.to_string(),
            raw: raw.to_string(),
        },
    }
}

/// The template for a kind, as stored on failed jobs.
pub fn template_for(kind: ErrorKind) -> &'static str {
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.kind == kind)
        .map(|rule| rule.template)
        .unwrap_or(UNKNOWN_TEMPLATE)
}
