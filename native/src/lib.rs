pub mod config;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod speech;
pub mod status;
pub mod transport;

use log::{debug, info};
use std::time::Instant;

pub use config::BridgeConfig;
pub use protocol::{encode_actions, parse_message, Action, ACKNOWLEDGMENT};
pub use session::{dispatch, Session, SessionEnd, SessionReport};
pub use speech::{SideChannel, SpeechCapability, SpeechSink};
pub use transport::{Transport, TransportError};

use speech::{acquire_controller_client, SearchLocations};
use status::BridgeStatus;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Acquire the speech capability. Called once per process; the returned
/// sink is then handed to the session.
pub fn initialize_speech(config: &BridgeConfig) -> SpeechSink {
    info!("[INIT] Loading NVDA controller client...");
    let step_start = Instant::now();

    let locations = SearchLocations::from_environment(config.dll_dir.clone());
    let sink = SpeechSink::new(acquire_controller_client(&locations));

    debug!(
        "[INIT] Speech capability acquired in {:?} (loaded: {})",
        step_start.elapsed(),
        sink.capability().is_loaded()
    );
    sink
}

/// Diagnostics snapshot for the current configuration and sink.
pub fn bridge_status<C: SideChannel>(config: &BridgeConfig, sink: &SpeechSink<C>) -> BridgeStatus {
    BridgeStatus {
        version: get_version(),
        pipe: config.pipe_path(),
        speech_engine: sink.component_state(),
        screen_reader_running: sink.probe_running(),
    }
}
