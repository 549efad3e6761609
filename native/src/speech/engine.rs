// Capability contract for an external speech engine.

use std::path::PathBuf;
use thiserror::Error;

/// Status code the controller client returns for success.
pub const STATUS_OK: u32 = 0;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Library not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
    #[error("{path} does not export {symbol}")]
    MissingSymbol { path: PathBuf, symbol: &'static str },
    #[error("Screen reader client libraries are only available on Windows")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{call} failed: {reason}")]
    CallFailed { call: &'static str, reason: String },
}

/// Raw operations exposed by a loaded speech engine client.
///
/// Every call returns the engine's status code; `STATUS_OK` means success.
/// An `Err` means the call itself faulted and no code was produced.
pub trait SpeechEngine {
    /// Human-readable origin of the engine, e.g. the library path.
    fn describe(&self) -> String;

    fn test_if_running(&self) -> Result<u32, EngineError>;

    fn speak_text(&self, text: &str) -> Result<u32, EngineError>;

    fn cancel_speech(&self) -> Result<u32, EngineError>;
}
