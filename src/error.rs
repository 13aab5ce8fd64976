use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for one build pass.
///
/// `MalformedClass` and `Transformation` are contained per candidate;
/// `ClasspathResolution` aborts the whole pass. `AnnotationCreation` is
/// only ever logged, since annotations are themselves the failure channel.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("malformed class file: {reason}")]
    MalformedClass { reason: String },

    #[error("classpath entry cannot be resolved: {entry}")]
    ClasspathResolution { entry: String },

    #[error("{pass} pass failed for {class_name}: {message}")]
    Transformation {
        pass: &'static str,
        class_name: String,
        message: String,
    },

    #[error("failed to record annotation on {}", target.display())]
    AnnotationCreation {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EnhanceError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedClass {
            reason: reason.into(),
        }
    }
}
