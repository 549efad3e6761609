// Speech output with console fallback when the screen reader is unreachable.

use super::engine::{LoadError, SpeechEngine, STATUS_OK};
use crate::status::ComponentState;
use log::{debug, info, warn};

/// Whether a working speech engine client was acquired.
pub enum SpeechCapability {
    Loaded(Box<dyn SpeechEngine>),
    Unavailable,
}

impl SpeechCapability {
    /// Try each provider in order and keep the first one that loads.
    pub fn acquire<I, F>(providers: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Result<Box<dyn SpeechEngine>, LoadError>,
    {
        for provider in providers {
            match provider() {
                Ok(engine) => {
                    info!("[NVDA] Loaded controller from: {}", engine.describe());
                    return SpeechCapability::Loaded(engine);
                }
                Err(LoadError::NotFound(path)) => {
                    debug!("[NVDA] Not found: {}", path.display());
                }
                Err(e) => {
                    warn!("[NVDA] {}", e);
                }
            }
        }

        warn!("[NVDA] Could not load NVDA controller client DLL");
        warn!("[NVDA] Speech will be printed to console instead");
        SpeechCapability::Unavailable
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SpeechCapability::Loaded(_))
    }
}

/// Degraded output path used when speech cannot reach the engine.
pub trait SideChannel {
    fn emit(&mut self, text: &str);
}

/// Echo undelivered speech to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEcho;

impl SideChannel for ConsoleEcho {
    fn emit(&mut self, text: &str) {
        println!("[NVDA SPEAK] {}", text);
    }
}

/// Delivers speak and cancel requests. No method fails past this boundary.
pub struct SpeechSink<C: SideChannel = ConsoleEcho> {
    capability: SpeechCapability,
    side_channel: C,
}

impl SpeechSink<ConsoleEcho> {
    pub fn new(capability: SpeechCapability) -> Self {
        Self::with_side_channel(capability, ConsoleEcho)
    }
}

impl<C: SideChannel> SpeechSink<C> {
    pub fn with_side_channel(capability: SpeechCapability, side_channel: C) -> Self {
        Self {
            capability,
            side_channel,
        }
    }

    pub fn capability(&self) -> &SpeechCapability {
        &self.capability
    }

    pub fn side_channel(&self) -> &C {
        &self.side_channel
    }

    /// Whether the engine reports itself as running.
    pub fn probe_running(&self) -> bool {
        match &self.capability {
            SpeechCapability::Loaded(engine) => match engine.test_if_running() {
                Ok(code) => code == STATUS_OK,
                Err(e) => {
                    debug!("[NVDA] Probe error: {}", e);
                    false
                }
            },
            SpeechCapability::Unavailable => false,
        }
    }

    /// Speak `text`, echoing it to the side channel when the engine does not
    /// accept it. Returns `true` only when the engine accepted the text.
    pub fn speak(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }

        if let SpeechCapability::Loaded(engine) = &self.capability {
            match engine.speak_text(text) {
                Ok(STATUS_OK) => return true,
                Ok(code) => warn!("[NVDA] Speak failed with code: {}", code),
                Err(e) => warn!("[NVDA] Speak error: {}", e),
            }
        }

        self.side_channel.emit(text);
        false
    }

    /// Interrupt current speech. A no-op without an engine.
    pub fn cancel_speech(&self) -> bool {
        match &self.capability {
            SpeechCapability::Loaded(engine) => match engine.cancel_speech() {
                Ok(code) => {
                    if code != STATUS_OK {
                        debug!("[NVDA] Cancel returned code: {}", code);
                    }
                    true
                }
                Err(e) => {
                    warn!("[NVDA] Cancel error: {}", e);
                    false
                }
            },
            SpeechCapability::Unavailable => false,
        }
    }

    /// Health snapshot for diagnostics.
    pub fn component_state(&self) -> ComponentState {
        match &self.capability {
            SpeechCapability::Loaded(engine) => ComponentState::ok(engine.describe()),
            SpeechCapability::Unavailable => {
                ComponentState::missing("NVDA controller client not loaded".to_string())
            }
        }
    }
}
