use std::sync::Arc;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.api", "container.bucket")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected value, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "object_cache", "fs_store", "http_synthesizer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse classification of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Provider,
    Store,
    Configuration,
    Runtime,
    Serialization,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Provider => "provider",
            Self::Store => "store",
            Self::Configuration => "configuration",
            Self::Runtime => "runtime",
            Self::Serialization => "serialization",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the speech cache.
#[derive(Debug, Error)]
pub enum Error {
    /// Object absent in the backing store.
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Provider error: {message}{}", format_context(.context))]
    Provider {
        message: String,
        context: ErrorContext,
    },

    #[error("Object store error: {message}{}", format_context(.context))]
    Store {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    /// Provisioning failed. Every caller awaiting the same attempt receives
    /// the same underlying error.
    #[error("Initialization failed: {0}")]
    Initialization(Arc<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn not_found(container: impl Into<String>, key: impl Into<String>) -> Self {
        Error::NotFound {
            container: container.into(),
            key: key.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new provider error with structured context
    pub fn provider_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Provider {
            message: msg.into(),
            context,
        }
    }

    /// Create a new object store error with structured context
    pub fn store_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Store {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Classify this error. Initialization failures report the kind of the
    /// step that failed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Provider { .. } => ErrorKind::Provider,
            Error::Store { .. } => ErrorKind::Store,
            Error::Configuration { .. } | Error::Yaml(_) => ErrorKind::Configuration,
            Error::Runtime { .. } => ErrorKind::Runtime,
            Error::Initialization(inner) => inner.kind(),
            Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// True when the object was absent in the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Provider { context, .. }
            | Error::Store { context, .. }
            | Error::Configuration { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            Error::Initialization(inner) => inner.context(),
            _ => None,
        }
    }
}
