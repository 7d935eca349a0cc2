use std::fmt;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable, closed set of error codes reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TargetNotFound,
    TargetZeroSize,
    DependencyLoadFailed,
    AssetLoadFailed,
    GenerationFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TargetNotFound => "target-not-found",
            ErrorCode::TargetZeroSize => "target-zero-size",
            ErrorCode::DependencyLoadFailed => "dependency-load-failed",
            ErrorCode::AssetLoadFailed => "asset-load-failed",
            ErrorCode::GenerationFailed => "generation-failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("target not found: {0}")]
    TargetNotFound(String),
    #[error("target has zero size: {0}")]
    TargetZeroSize(String),
    #[error("failed to load font '{font}': {source}")]
    DependencyLoadFailed {
        font: String,
        #[source]
        source: Cause,
    },
    #[error("failed to load asset '{asset}': {source}")]
    AssetLoadFailed {
        asset: String,
        #[source]
        source: Cause,
    },
    #[error("generation failed: {message}")]
    GenerationFailed {
        message: String,
        #[source]
        source: Option<Cause>,
    },
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::TargetNotFound(_) => ErrorCode::TargetNotFound,
            Error::TargetZeroSize(_) => ErrorCode::TargetZeroSize,
            Error::DependencyLoadFailed { .. } => ErrorCode::DependencyLoadFailed,
            Error::AssetLoadFailed { .. } => ErrorCode::AssetLoadFailed,
            Error::GenerationFailed { .. } => ErrorCode::GenerationFailed,
        }
    }

    /// Wrap an arbitrary failure as `generation-failed`, keeping it as the source.
    /// Errors that are already typed pass through untouched.
    pub fn generation(cause: impl Into<Cause>) -> Self {
        let cause: Cause = cause.into();
        match cause.downcast::<Error>() {
            Ok(typed) => *typed,
            Err(cause) => Error::GenerationFailed {
                message: cause.to_string(),
                source: Some(cause),
            },
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Error::GenerationFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn asset(asset: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Error::AssetLoadFailed {
            asset: asset.into(),
            source: cause.into(),
        }
    }

    pub fn font(font: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Error::DependencyLoadFailed {
            font: font.into(),
            source: cause.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::generation(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::generation(err)
    }
}

/// Raised by a selector matcher for selectors it cannot evaluate.
/// Never escapes extraction: callers treat it as a non-match.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid selector '{0}'")]
pub struct SelectorError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn codes_are_kebab_case() {
        assert_eq!(ErrorCode::TargetZeroSize.as_str(), "target-zero-size");
        assert_eq!(
            Error::message("boom").code().to_string(),
            "generation-failed"
        );
    }

    #[test]
    fn generation_keeps_original_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::generation(io);
        assert_eq!(err.code(), ErrorCode::GenerationFailed);
        assert!(err.source().unwrap().to_string().contains("disk on fire"));
    }

    #[test]
    fn generation_passes_typed_errors_through() {
        let err = Error::generation(Error::TargetNotFound("#main".into()));
        assert_eq!(err.code(), ErrorCode::TargetNotFound);
    }
}
