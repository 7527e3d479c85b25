use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::MatchRule;

#[derive(Debug, Error, Diagnostic)]
pub enum MetagrateError {
    #[error("invalid long code: {0}")]
    InvalidLongCode(String),

    #[error(
        "SOURCE long code {source_code} does not match TEMPLATE long code {template_code}{}",
        mismatch_hint(.rule)
    )]
    LongCodeMismatch {
        source_code: String,
        template_code: String,
        rule: MatchRule,
    },

    #[error("TEMPLATE long code {template_code} has no matching SOURCE row")]
    #[diagnostic(help("--allow-unmatched-template keeps TEMPLATE rows without a SOURCE partner"))]
    UnmatchedTemplate { template_code: String },

    #[error("multiple {table} rows match long code {code}: {candidates:?}")]
    AmbiguousLongCode {
        table: &'static str,
        code: String,
        candidates: Vec<String>,
    },

    #[error(
        "compound codes in SOURCE ({source_value}) do not match TEMPLATE ({template_value}) for {code}"
    )]
    CompoundCodeMismatch {
        code: String,
        source_value: String,
        template_value: String,
    },

    #[error(
        "{column} inconsistency ({code}): {template_value:?} maps to both {cached:?} and {source_value:?}"
    )]
    #[diagnostic(help("--no-rename-sites leaves site aliases untouched"))]
    SiteAliasInconsistency {
        column: String,
        code: String,
        template_value: String,
        source_value: String,
        cached: String,
    },

    #[error("missing column {column:?} in {path}")]
    MissingColumn { path: String, column: String },

    #[error("{path}: {message}")]
    MalformedInput { path: String, message: String },

    #[error("failed to read {path}: {message}")]
    InputRead { path: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unsupported config schema_version {found} (expected {expected})")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl MetagrateError {
    /// SOURCE and TEMPLATE disagree structurally.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MetagrateError::LongCodeMismatch { .. }
                | MetagrateError::UnmatchedTemplate { .. }
                | MetagrateError::AmbiguousLongCode { .. }
                | MetagrateError::CompoundCodeMismatch { .. }
                | MetagrateError::SiteAliasInconsistency { .. }
        )
    }

    /// An input file could not be read or does not look like a metadata export.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            MetagrateError::InvalidLongCode(_)
                | MetagrateError::MissingColumn { .. }
                | MetagrateError::MalformedInput { .. }
                | MetagrateError::InputRead { .. }
        )
    }
}

/// Relaxed matching already accepts legacy codes, so the flag only helps strict runs.
fn mismatch_hint(rule: &MatchRule) -> &'static str {
    match rule {
        MatchRule::Strict => ". Try running with --no-rename-sites",
        MatchRule::Relaxed => "",
    }
}
