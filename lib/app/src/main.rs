use pawtag_app::{App, AppConfig, telemetry};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(&config.log_filter);
    info!("Loaded configuration");

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(report) => {
            error!(error = %report, "failed to assemble application");
            return ExitCode::FAILURE;
        }
    };

    if let Some(commerce) = app.commerce() {
        commerce.test_connection().await;
    }

    let listener = app.start().await;
    let mut states = app.auth().subscribe_state();
    let follow = async {
        loop {
            let state = states.borrow_and_update().clone();
            info!(
                phase = %state.phase(),
                principal_id = ?state.principal_id(),
                roles = state.roles().roles().len(),
                "authorization state"
            );
            if states.changed().await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "failed to listen for shutdown signal");
            }
        }
        () = follow => {}
    }

    listener.abort();
    info!("Shutting down");
    ExitCode::SUCCESS
}
