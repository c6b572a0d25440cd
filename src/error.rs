//! Error types for the recoverable failure categories: storage, audio and
//! browser plumbing. Gameplay itself has no error paths.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// High-score storage failures. Callers degrade to an in-memory score of 0.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage access failed: {0}")]
    Access(String),
    #[error("stored value {0:?} is not a score")]
    Corrupt(String),
}

/// Audio failures never interrupt gameplay; they are logged and dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio is unavailable")]
    Unavailable,
    #[error("failed to play {name:?}: {reason}")]
    Playback { name: String, reason: String },
}

/// Failures while wiring the game into the page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebError {
    #[error("no window")]
    NoWindow,
    #[error("no document")]
    NoDocument,
    #[error("missing element #{0}")]
    MissingElement(String),
    #[error("javascript error: {0}")]
    Js(String),
}

impl WebError {
    pub fn from_js(value: &JsValue) -> Self {
        WebError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        WebError::from_js(&value)
    }
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
