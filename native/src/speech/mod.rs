// Speech output: NVDA controller client discovery and the speech sink.

pub mod candidates;
pub mod engine;
#[cfg(windows)]
pub mod nvda_client;
pub mod sink;

pub use candidates::SearchLocations;
pub use engine::{EngineError, LoadError, SpeechEngine, STATUS_OK};
#[cfg(windows)]
pub use nvda_client::NvdaControllerClient;
pub use sink::{ConsoleEcho, SideChannel, SpeechCapability, SpeechSink};

/// Acquire the NVDA controller client from the first candidate that loads.
pub fn acquire_controller_client(locations: &SearchLocations) -> SpeechCapability {
    let candidates = locations.candidates();
    log::debug!("[NVDA] Searching {} candidate locations", candidates.len());

    SpeechCapability::acquire(candidates.into_iter().map(|path| {
        move || -> Result<Box<dyn SpeechEngine>, LoadError> { load_client(&path) }
    }))
}

#[cfg(windows)]
fn load_client(path: &std::path::Path) -> Result<Box<dyn SpeechEngine>, LoadError> {
    NvdaControllerClient::load(path).map(|client| Box::new(client) as Box<dyn SpeechEngine>)
}

#[cfg(not(windows))]
fn load_client(path: &std::path::Path) -> Result<Box<dyn SpeechEngine>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    Err(LoadError::Unsupported)
}
