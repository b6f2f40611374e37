use std::process::ExitCode;

use ::server::config::Config;

pub async fn run(port: Option<u16>) -> ExitCode {
    ::server::init_tracing();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = port {
        config.port = port;
    }

    match ::server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("server stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
