use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Invalid value at '{path}': {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("Variant mismatch at '{path}': tag '{tag}' conflicts with '{field}' ({reason})")]
    VariantMismatch {
        path: String,
        tag: String,
        field: String,
        reason: String,
    },

    #[error("Unsupported combination: {combination}")]
    UnsupportedCombination { combination: String },

    #[error("Unknown layer kind '{kind}' for the {root} root")]
    UnknownLayerKind { root: &'static str, kind: &'static str },

    #[error("Unsupported input '{kind}': {root} accepts nothing, a {root} root, or a raw override")]
    UnsupportedInput { root: &'static str, kind: &'static str },

    #[error("Fragment {fragment} maps to '{key}', which is not a section of the root")]
    OrphanCategory {
        fragment: &'static str,
        key: &'static str,
    },

    #[error("Invalid {root} configuration ({} issue(s)):{}", .issues.len(), format_issues(.issues))]
    Invalid {
        root: &'static str,
        issues: Vec<ComposeError>,
    },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to parse TOML layer: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to dump configuration: {0}")]
    Dump(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ComposeError {
    pub(crate) fn violation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ComposeError::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Every offending field path carried by this error, in report order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ComposeError::SchemaViolation { path, .. }
            | ComposeError::VariantMismatch { path, .. } => vec![path.as_str()],
            ComposeError::Invalid { issues, .. } => {
                issues.iter().flat_map(ComposeError::paths).collect()
            }
            _ => vec![],
        }
    }
}

fn format_issues(issues: &[ComposeError]) -> String {
    issues.iter().map(|issue| format!("\n  - {issue}")).collect()
}
