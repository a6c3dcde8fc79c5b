//! The provider capability: anything that may answer a message.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::answer::Answer;

/// Errors that can occur while a provider initializes.
///
/// Any of these is fatal at startup: the registry refuses to enter service
/// with a partially initialized provider.
#[derive(Debug)]
pub enum InitError {
    /// Failed to read or enumerate provider data on disk.
    Io { path: PathBuf, source: io::Error },
    /// Failed to build the search index.
    Index(tantivy::TantivyError),
    /// Anything else a provider considers fatal.
    Other(String),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "init failed on '{}': {}", path.display(), source)
            }
            Self::Index(source) => write!(f, "index build failed: {}", source),
            Self::Other(msg) => write!(f, "init failed: {}", msg),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Index(source) => Some(source),
            Self::Other(_) => None,
        }
    }
}

impl From<tantivy::TantivyError> for InitError {
    fn from(e: tantivy::TantivyError) -> Self {
        Self::Index(e)
    }
}

/// Errors a provider can raise while answering.
///
/// Ordinary "no match" is not an error; providers return `Ok(None)` for it.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider was queried before its `init()` completed.
    NotInitialized,
    /// The search index failed at query time.
    Search(tantivy::TantivyError),
    /// Anything else.
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "provider not initialized"),
            Self::Search(source) => write!(f, "index search failed: {}", source),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Search(source) => Some(source),
            _ => None,
        }
    }
}

impl From<tantivy::TantivyError> for ProviderError {
    fn from(e: tantivy::TantivyError) -> Self {
        Self::Search(e)
    }
}

/// A pluggable component that may answer a message.
///
/// `init()` is called exactly once, before any `answer()` call, and may do
/// I/O. `answer()` receives text that the dispatcher has already
/// lower-cased; it returns `Ok(None)` when the provider has nothing to say.
pub trait AnswerProvider {
    fn name(&self) -> &'static str;

    fn init(&mut self) -> Result<(), InitError>;

    fn answer(&self, text: &str) -> Result<Option<Answer>, ProviderError>;
}
