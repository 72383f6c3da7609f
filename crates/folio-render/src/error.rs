//! Error types for template rendering.
//!
//! [`RenderError`] wraps MiniJinja, serialisation and filesystem failures
//! behind one stable type.

use std::fmt;

use crate::file_loader::LoadError;

/// Error type for template loading and rendering.
#[derive(Debug)]
pub enum RenderError {
    /// Template syntax error or evaluation failure.
    TemplateError(String),

    /// No template with that name is registered.
    TemplateNotFound(String),

    /// Data could not be converted for the template.
    SerializationError(String),

    /// Two template directories provide the same name.
    Collision {
        /// The contested name.
        name: String,
        /// The file registered first.
        existing: std::path::PathBuf,
        /// The file that clashed with it.
        conflicting: std::path::PathBuf,
    },

    /// A template directory could not be walked.
    LoadError(LoadError),

    /// I/O error reading a template from disk.
    IoError(std::io::Error),

    /// Other operational error.
    OperationError(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateError(msg) => write!(f, "template error: {}", msg),
            RenderError::TemplateNotFound(name) => write!(f, "template not found: {}", name),
            RenderError::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            RenderError::Collision {
                name,
                existing,
                conflicting,
            } => write!(
                f,
                "template collision for \"{}\": {} and {}",
                name,
                existing.display(),
                conflicting.display()
            ),
            RenderError::LoadError(err) => write!(f, "{}", err),
            RenderError::IoError(err) => write!(f, "I/O error: {}", err),
            RenderError::OperationError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::IoError(err) => Some(err),
            RenderError::LoadError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::IoError(err)
    }
}

impl From<LoadError> for RenderError {
    fn from(err: LoadError) -> Self {
        RenderError::LoadError(err)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::SerializationError(err.to_string())
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err.to_string()),
            ErrorKind::SyntaxError
            | ErrorKind::BadEscape
            | ErrorKind::UndefinedError
            | ErrorKind::UnknownTest
            | ErrorKind::UnknownFunction
            | ErrorKind::UnknownFilter
            | ErrorKind::UnknownMethod
            | ErrorKind::MissingArgument
            | ErrorKind::TooManyArguments
            | ErrorKind::InvalidOperation => RenderError::TemplateError(format!("{:#}", err)),
            ErrorKind::BadSerialization => RenderError::SerializationError(err.to_string()),
            _ => RenderError::OperationError(err.to_string()),
        }
    }
}
