use clap::Parser;
use signal_relay::{logging::init_tracing, server, AppState, Config, RelayError};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let config = Config::parse();
    init_tracing(&config.log_level);

    let state = AppState::new(config);
    server::serve(state, server::shutdown_signal()).await
}
