//! Main entrypoint for running Orrery

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use orrery_engine::errors::EngineError;
use orrery_engine::simulation::{Renderer, Scheduler};
use orrery_engine::Simulation;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::cli_args::CliArgs;
use crate::config::main::Config;
use crate::controls::Outcome;
use crate::frame_clock::FrameClock;
use crate::renderer::TerminalRenderer;
use crate::shared_state::SharedState;

/// How often to check for key presses and terminal resizes.
const INPUT_POLL_INTERVAL: core::time::Duration = core::time::Duration::from_millis(10);

/// The simulation as driven by the terminal.
type TerminalSimulation = Simulation<FrameClock, TerminalRenderer>;

/// Messages between the various tasks
#[non_exhaustive]
#[derive(Clone, Debug)]
pub(crate) enum Protocol {
    /// The entire application is exiting.
    End,
    /// The config file has changed.
    Config(Config),
}

/// Main entrypoint
pub(crate) async fn run(state_arc: &Arc<SharedState>) -> Result<()> {
    setup(state_arc).await?;

    let config_handle = Config::watch(Arc::clone(state_arc));
    override_on_panic_behaviour();

    let result = event_loop(state_arc).await;
    broadcast_protocol_end(&state_arc.protocol_tx);
    config_handle.await??;

    tracing::trace!("Leaving Orrery's main `run()` function");
    result
}

/// The one loop that owns the simulation. Frames, input and config changes all arrive here, so
/// the simulation is never touched from more than one place at a time.
async fn event_loop(state: &Arc<SharedState>) -> Result<()> {
    let config = state.config.read().await.clone();
    let renderer = TerminalRenderer::new(config.scale)?;
    let bounds = renderer.bounds();
    let mut simulation = Simulation::new(
        config.simulation_config(),
        bounds,
        FrameClock::new(config.frame_rate),
        renderer,
    )?;
    if config.start_running {
        simulation.start();
    }

    let mut protocol_rx = state.protocol_tx.subscribe();
    let mut input_interval = tokio::time::interval(INPUT_POLL_INTERVAL);
    input_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::debug!("Starting event loop");
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "`tokio::select! generates this.`"
    )]
    loop {
        let deadline = simulation.scheduler().deadline();
        tokio::select! {
            () = FrameClock::sleep_until(deadline) => {
                simulation.scheduler_mut().fire();
                if let Err(error) = simulation.on_frame() {
                    tracing::error!("Frame failed, waiting to be started again: {error:?}");
                }
            }
            _ = input_interval.tick() => {
                if handle_input(state, &mut simulation).await? == Outcome::Quit {
                    break;
                }
            }
            Ok(message) = protocol_rx.recv() => {
                match message {
                    Protocol::Config(new_config) => apply_config(&mut simulation, &new_config),
                    Protocol::End => break,
                }
            }
        }
    }
    tracing::debug!("Exited event loop");

    simulation.renderer_mut().restore()?;
    simulation.teardown();
    Ok(())
}

/// Act on everything the user has typed, and on any change in the terminal's size.
async fn handle_input(
    state: &Arc<SharedState>,
    simulation: &mut TerminalSimulation,
) -> Result<Outcome> {
    let events = simulation.renderer_mut().poll_input()?;
    if let Some(bounds) = simulation.renderer_mut().handle_resize()? {
        log_render_failure(simulation.set_bounds(bounds), "resizing");
    }
    if events.is_empty() {
        return Ok(Outcome::Continue);
    }

    let keybindings = state.keybindings.read().await.clone();
    for event in events {
        let termwiz::input::InputEvent::Key(key) = event else {
            continue;
        };
        if is_interrupt(&key) {
            return Ok(Outcome::Quit);
        }
        let Some(action) = crate::config::input::action_for(&keybindings, &key) else {
            continue;
        };
        if apply_action(action, simulation) == Outcome::Quit {
            return Ok(Outcome::Quit);
        }
    }

    Ok(Outcome::Continue)
}

/// In raw mode CTRL+C is just another key press.
fn is_interrupt(key: &termwiz::input::KeyEvent) -> bool {
    key.key == termwiz::input::KeyCode::Char('c')
        && key.modifiers.contains(termwiz::input::Modifiers::CTRL)
}

/// Hand a reloaded config to the simulation. Changing the particle count recreates the
/// particles, everything else is picked up on the next tick.
fn apply_config(simulation: &mut TerminalSimulation, config: &Config) {
    simulation.scheduler_mut().set_frame_rate(config.frame_rate);
    let bounds = simulation.renderer_mut().set_scale(config.scale);
    log_render_failure(simulation.set_bounds(bounds), "rescaling");
    if let Some(action) = log_render_failure(
        simulation.set_config(config.simulation_config()),
        "applying the new config",
    ) {
        tracing::debug!("New config applied: {action:?}");
    }
}

/// Run a keybinding's action. A frame that can't be drawn only stops the current run, so the
/// app keeps going and the user can start it again.
fn apply_action<S: Scheduler, R: Renderer>(
    action: crate::config::input::KeybindingAction,
    simulation: &mut Simulation<S, R>,
) -> Outcome {
    log_render_failure(crate::controls::apply(action, simulation), "handling a key press")
        .unwrap_or(Outcome::Continue)
}

/// Engine errors are all render failures. They've already paused the simulation, so log them
/// and carry on.
fn log_render_failure<T>(result: Result<T, EngineError>, activity: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!(
                "Frame failed whilst {activity}, waiting to be started again: {error:?}"
            );
            None
        }
    }
}

/// Panics inside the event loop would otherwise print over the simulation's screen. Log them
/// instead, the terminal itself gets restored when the renderer is dropped.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task loops to exit.
///
/// Errors are only logged. There's nothing else that could be done with them, because the `End`
/// message is what lets the other tasks finish and their errors be reported.
pub(crate) fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &Arc<SharedState>) -> Result<()> {
    let cli_args = CliArgs::parse();

    let mut main_config_file = state.main_config_file.write().await;
    (*main_config_file).clone_from(&cli_args.main_config);
    drop(main_config_file);

    let directory_result = Config::setup_directory(cli_args.config_dir.clone(), state).await;
    if let Err(directory_error) = directory_result {
        color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
    }

    let config_result = Config::load_config_into_shared_state(state).await;
    if let Err(config_error) = config_result {
        let path = Config::main_config_path(state).await;
        color_eyre::eyre::bail!(
            "Bad config file: {config_error:?}\n\nConfig path: {}",
            path.display()
        );
    }
    state.config.write().await.apply_cli_overrides(&cli_args);

    setup_logging(cli_args, state).await?;

    tracing::info!("Starting Orrery");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);

    Ok(())
}

/// Setup logging
async fn setup_logging(cli_args: CliArgs, state: &Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var("ORRERY_LOG").is_ok();
    let mut path = state.config.read().await.log_path.clone();

    if let Some(cli_override_path) = cli_args.log_path {
        path.clone_from(&cli_override_path);
        state.config.write().await.log_path = cli_override_path;
    }

    let mut level = state.config.read().await.log_level.clone();
    if let Some(cli_override_level) = cli_args.log_level {
        level = cli_override_level;
    }
    let level_as_string = format!("{level:?}").to_lowercase();

    let is_loggable =
        !matches!(level, crate::config::main::LogLevel::Off) || are_log_filters_manually_set;

    if !is_loggable {
        return Ok(());
    }

    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(path)?;

    let filters = if are_log_filters_manually_set {
        if let Ok(user_filters) = std::env::var("ORRERY_LOG") {
            std::env::set_var("RUST_LOG", user_filters);
        }

        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("orrery={level_as_string}").parse()?)
            .add_directive(format!("orrery_engine={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    *state.is_logging.write().await = true;

    Ok(())
}

#[cfg(test)]
mod test {
    use orrery_engine::errors::RenderError;
    use orrery_engine::simulation::Frame;
    use orrery_engine::{Bounds, SimulationConfig};
    use termwiz::input::{KeyCode, KeyEvent, Modifiers};

    use super::*;
    use crate::config::input::KeybindingAction;

    #[derive(Default)]
    struct IdleScheduler;

    impl Scheduler for IdleScheduler {
        fn schedule_next_tick(&mut self) {}
        fn cancel_scheduled_tick(&mut self) {}
    }

    /// A terminal that has gone away after the first frame.
    struct LostTerminal {
        frames: usize,
    }

    impl Renderer for LostTerminal {
        fn is_ready(&self) -> bool {
            true
        }

        fn render(&mut self, _frame: &Frame<'_>) -> Result<(), RenderError> {
            self.frames += 1;
            if self.frames > 1 {
                return Err(RenderError::SurfaceUnavailable);
            }
            Ok(())
        }
    }

    fn simulation() -> Simulation<IdleScheduler, LostTerminal> {
        Simulation::new(
            SimulationConfig::default(),
            Bounds::new(80.0, 40.0),
            IdleScheduler,
            LostTerminal { frames: 0 },
        )
        .unwrap()
    }

    #[test]
    fn failed_static_frame_keeps_the_app_going() {
        let mut simulation = simulation();
        simulation.start();

        assert_eq!(
            apply_action(KeybindingAction::Pause, &mut simulation),
            Outcome::Continue
        );
        assert!(!simulation.is_running());

        assert_eq!(
            apply_action(KeybindingAction::Start, &mut simulation),
            Outcome::Continue
        );
        assert!(simulation.is_running());
    }

    #[test]
    fn failed_reset_keeps_the_app_going() {
        let mut simulation = simulation();
        assert_eq!(
            apply_action(KeybindingAction::Reset, &mut simulation),
            Outcome::Continue
        );
        assert_eq!(
            apply_action(KeybindingAction::Quit, &mut simulation),
            Outcome::Quit
        );
    }

    #[test]
    fn failed_resize_is_only_logged() {
        let mut simulation = simulation();
        let result = simulation.set_bounds(Bounds::new(20.0, 10.0));
        assert!(result.is_err());
        assert!(log_render_failure(result, "resizing").is_none());
        assert_eq!(simulation.bounds(), Bounds::new(20.0, 10.0));
        assert_eq!(log_render_failure::<u8>(Ok(7), "resizing"), Some(7));
    }

    #[test]
    fn ctrl_c_is_an_interrupt() {
        assert!(is_interrupt(&KeyEvent {
            key: KeyCode::Char('c'),
            modifiers: Modifiers::CTRL,
        }));
        assert!(!is_interrupt(&KeyEvent {
            key: KeyCode::Char('c'),
            modifiers: Modifiers::NONE,
        }));
    }
}
