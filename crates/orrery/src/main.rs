//! Orrery: particles pulling on each other under gravity, drawn in the terminal.
//!
//! Everything interesting happens in [`run`], this just reports how it went.

pub mod cli_args;
/// All the user-configurable settings.
pub mod config {
    pub mod input;
    pub mod main;
}
pub mod controls;
pub mod frame_clock;
pub mod renderer;
pub mod run;
pub mod shared_state;
pub mod surface;

use color_eyre::eyre::Result;

#[expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "The terminal is back to normal by now, so this is where we talk to the user"
)]
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let state = shared_state::SharedState::init();
    let result = run::run(&state).await;

    let log_path = state.config.read().await.log_path.clone();
    let is_logging = *state.is_logging.read().await;
    tracing::debug!("Orrery is exiting");

    if let Err(error) = result {
        tracing::error!("{error:?}");
        eprintln!("Orrery stopped: {error}");
        let config_path = config::main::Config::main_config_path(&state).await;
        eprintln!("Config: {}", config_path.display());
        if is_logging {
            eprintln!("Log: {}", log_path.display());
        }
        return Ok(());
    }

    if is_logging {
        println!("Orrery's log is at {}", log_path.display());
    }
    Ok(())
}
