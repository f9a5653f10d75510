//! Domain error types.
//!
//! A [`DomainError`] carries a coarse [`ErrorKind`] that callers branch on,
//! a chain of private context frames for logs, and an optional public
//! message that is safe to show to clients.

use std::error::Error as StdError;
use std::fmt;

use storage::StorageError;

use crate::password::PasswordError;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input was rejected before any write happened.
    Validation,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller is authenticated but may not act on the resource.
    Forbidden,
    NotFound,
    /// The request conflicts with existing state.
    Conflict,
    Internal,
}

/// One step of the propagation path, outermost last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub op: &'static str,
    pub message: String,
}

/// Errors returned by domain services.
pub struct DomainError {
    kind: ErrorKind,
    message: String,
    frames: Vec<Frame>,
    public: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl DomainError {
    /// Creates an error with a private message only.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: Vec::new(),
            public: None,
            source: None,
        }
    }

    fn public(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(kind, message.clone()).with_public(message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::public(ErrorKind::Validation, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::public(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::public(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::public(ErrorKind::Conflict, message)
    }

    /// An unexpected failure. The message is never shown to clients.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wraps an underlying error as an internal failure.
    pub fn from_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut err = Self::internal(message);
        err.source = Some(Box::new(source));
        err
    }

    /// Records the operation the error passed through.
    pub fn context(mut self, op: &'static str, message: impl Into<String>) -> Self {
        self.frames.push(Frame {
            op,
            message: message.into(),
        });
        self
    }

    /// Sets the message returned to clients.
    pub fn with_public(mut self, message: impl Into<String>) -> Self {
        self.public = Some(message.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The client-facing message, if one was set.
    pub fn public_message(&self) -> Option<&str> {
        self.public.as_deref()
    }

    /// Context frames in the order they were added.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.frames.iter().rev() {
            write!(f, "[{}] {}: ", frame.op, frame.message)?;
        }
        f.write_str(&self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainError")
            .field("kind", &self.kind)
            .field("error", &self.to_string())
            .field("public", &self.public)
            .finish()
    }
}

impl StdError for DomainError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        let (kind, public) = match &err {
            StorageError::NotFound { entity, .. } => {
                (ErrorKind::NotFound, Some(format!("{entity} not found")))
            }
            StorageError::Conflict(message) => (ErrorKind::Conflict, Some(message.clone())),
            _ => (ErrorKind::Internal, None),
        };
        Self {
            kind,
            message: "storage".to_string(),
            frames: Vec::new(),
            public,
            source: Some(Box::new(err)),
        }
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        Self::from_source("password", err)
    }
}

/// Adds context frames to fallible results.
pub trait ResultExt<T> {
    fn context(self, op: &'static str, message: impl Into<String>) -> Result<T, DomainError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<DomainError>,
{
    fn context(self, op: &'static str, message: impl Into<String>) -> Result<T, DomainError> {
        self.map_err(|err| {
            let err: DomainError = err.into();
            err.context(op, message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_frames_outermost_first() {
        let err = DomainError::internal("connection reset")
            .context("products.lookup", "fetching ids")
            .context("ProductService.products", "listing page 1");

        assert_eq!(
            err.to_string(),
            "[ProductService.products] listing page 1: [products.lookup] fetching ids: connection reset"
        );
        assert_eq!(err.frames().len(), 2);
        assert_eq!(err.public_message(), None);
    }

    #[test]
    fn public_constructors_expose_message() {
        let err = DomainError::validation("page must be at least 1");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.public_message(), Some("page must be at least 1"));
    }

    #[test]
    fn storage_errors_keep_their_kind() {
        let not_found: DomainError = StorageError::not_found("product", 7).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.public_message(), Some("product not found"));

        let conflict: DomainError =
            StorageError::Conflict("email a@b.co already exists".to_string()).into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let internal: DomainError = StorageError::Unavailable("down".to_string()).into();
        assert_eq!(internal.kind(), ErrorKind::Internal);
        assert!(internal.public_message().is_none());
        assert!(internal.source().is_some());
    }

    #[test]
    fn result_ext_wraps_errors() {
        let result: Result<(), StorageError> = Err(StorageError::not_found("user", 3));
        let err = result.context("CustomerService.user", "loading user 3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.frames()[0].op, "CustomerService.user");
    }
}
