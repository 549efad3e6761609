// Console host for the X4 Foundations NVDA bridge.

extern crate x4_nvda_bridge;
use log::{error, info};
use x4_nvda_bridge::{logging, BridgeConfig};

fn main() {
    // Load or ignore .env file
    let _ = dotenvy::dotenv();

    logging::init_logger();
    logging::init_crash_logger();

    let config = BridgeConfig::from_env();

    if logging::init_sentry(
        config.sentry_dsn.as_deref(),
        config.sentry_environment.as_deref(),
    ) {
        info!("[BRIDGE] Sentry monitoring enabled");
    }

    info!(
        "[BRIDGE] X4 Foundations NVDA Bridge v{} starting",
        x4_nvda_bridge::get_version()
    );

    let exit_code = run(&config);

    logging::shutdown_sentry();
    std::process::exit(exit_code);
}

#[cfg(windows)]
fn run(config: &BridgeConfig) -> i32 {
    use x4_nvda_bridge::session::{Session, SessionEnd};
    use x4_nvda_bridge::transport::PipeServer;

    let mut sink = x4_nvda_bridge::initialize_speech(config);

    match x4_nvda_bridge::bridge_status(config, &sink).to_json() {
        Ok(json) => log::debug!("[BRIDGE] Status: {}", json),
        Err(e) => log::debug!("[BRIDGE] Status unavailable: {}", e),
    }

    let mut transport = PipeServer::new(config.pipe_path());

    info!("[BRIDGE] Serving pipe {}", transport.path());

    let report = Session::new(&mut transport, &mut sink).run();
    match report.end {
        SessionEnd::PeerClosed => 0,
        _ => 1,
    }
}

#[cfg(not(windows))]
fn run(config: &BridgeConfig) -> i32 {
    error!(
        "[BRIDGE] Cannot serve {}: named pipes and NVDA require Windows",
        config.pipe_path()
    );
    1
}
