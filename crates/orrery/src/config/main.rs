//! All of the user config for Orrery.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;

use crate::shared_state::SharedState;

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start Orrery.
static DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Config {
    /// How many particles to simulate.
    pub particle_count: usize,
    /// How strongly particles attract each other.
    pub gravity_strength: f64,
    /// Target frame rate whilst running.
    pub frame_rate: u32,
    /// World units per terminal pixel.
    pub scale: f64,
    /// Whether to start ticking as soon as the simulation is created.
    pub start_running: bool,
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Keybindings
    pub keybindings: super::input::KeybindingsRaw,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("orrery").join("orrery.log");
        let defaults = orrery_engine::SimulationConfig::default();

        Self {
            particle_count: defaults.particle_count,
            gravity_strength: defaults.gravity_strength,
            frame_rate: 60,
            scale: 4.0,
            start_running: false,
            log_level: LogLevel::Off,
            log_path,
            keybindings: super::input::KeybindingsRaw::new(),
        }
    }
}

impl Config {
    /// Canonical path to the config directory.
    pub async fn directory(state: &std::sync::Arc<SharedState>) -> std::path::PathBuf {
        state.config_path.read().await.clone()
    }

    /// Get the stable location of Orrery's config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("orrery"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    pub async fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
        state: &std::sync::Arc<SharedState>,
    ) -> Result<()> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path) => path,
        };

        std::fs::create_dir_all(path.clone())?;
        *state.config_path.write().await = path;

        Ok(())
    }

    /// Canonical path to the main config file.
    pub async fn main_config_path(state: &std::sync::Arc<SharedState>) -> std::path::PathBuf {
        let directory = Self::directory(state).await;
        let main_config_file = state.main_config_file.read().await.clone();
        directory.join(main_config_file)
    }

    /// Load the main config, writing the default one first if this is the very first run.
    pub async fn load(state: &std::sync::Arc<SharedState>) -> Result<Self> {
        let config_path = Self::main_config_path(state).await;
        let config_file_name = config_path
            .file_name()
            .context("Couldn't get file name from config path")?;
        let is_default_config = config_file_name == crate::cli_args::DEFAULT_CONFIG_FILE_NAME;
        if is_default_config && !config_path.exists() {
            tracing::info!("Writing default config to {config_path:?}");
            std::fs::write(config_path.clone(), DEFAULT_CONFIG)?;
        }

        tracing::info!("(Re)loading the main Orrery config from: {config_path:?}");
        let result = std::fs::read_to_string(config_path.clone());
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                let config = toml::from_str::<Self>(&data)?;
                Self::load_keybindings(state, &config).await?;
                Ok(config)
            }
            Err(err) => {
                tracing::error!("Loading config: {err:?}");
                color_eyre::eyre::bail!(
                    "Couldn't load config at {config_path:?}: {}",
                    err.to_string()
                );
            }
        }
    }

    /// Parse the shipped default config.
    fn parse_default_config() -> Result<Self> {
        Ok(toml::from_str::<Self>(DEFAULT_CONFIG)?)
    }

    /// Load the main config into the shared state.
    pub async fn load_config_into_shared_state(
        state: &std::sync::Arc<SharedState>,
    ) -> Result<Self> {
        let mut config_state = state.config.write().await;
        let new_config = Self::load(state).await?;
        *config_state = new_config.clone();
        drop(config_state);

        Ok(new_config)
    }

    /// Load all keybindings. The defaults are always loaded first, so that the user only needs
    /// to mention the ones they want to change.
    #[expect(clippy::iter_over_hash_type, reason = "The ordering doesn't matter")]
    async fn load_keybindings(
        state: &std::sync::Arc<SharedState>,
        user_config: &Self,
    ) -> Result<()> {
        let mut keybindings = crate::config::input::KeybindingsAsEvents::new();

        let defaults = Self::parse_default_config()?;
        for (action, binding_config) in defaults.keybindings {
            let key_event: termwiz::input::KeyEvent = binding_config.try_into()?;
            keybindings.insert(action, key_event);
        }

        tracing::trace!("Loading user-defined keybindings...");
        for (action, binding_config) in user_config.keybindings.clone() {
            tracing::trace!("Keybinding found for '{action:?}': {binding_config:?}");
            let key_event: termwiz::input::KeyEvent = binding_config.try_into()?;
            tracing::debug!("Keybinding parsed for '{action:?}': {key_event:?}");
            keybindings.insert(action, key_event);
        }

        *state.keybindings.write().await = keybindings;
        Ok(())
    }

    /// Values given on the command line win over the ones in the config file.
    pub fn apply_cli_overrides(&mut self, cli_args: &crate::cli_args::CliArgs) {
        if let Some(particle_count) = cli_args.particles {
            self.particle_count = particle_count;
        }
        if let Some(gravity_strength) = cli_args.gravity {
            self.gravity_strength = gravity_strength;
        }
        if let Some(frame_rate) = cli_args.frame_rate {
            self.frame_rate = frame_rate;
        }
        if cli_args.run {
            self.start_running = true;
        }
    }

    /// The parameters for the engine, kept within the ranges that the controls allow.
    pub fn simulation_config(&self) -> orrery_engine::SimulationConfig {
        orrery_engine::SimulationConfig::new(
            crate::controls::clamp_particle_count(self.particle_count),
            crate::controls::clamp_gravity_strength(self.gravity_strength),
        )
    }

    /// Watch the config file for any changes and then automatically update the shared state with
    /// the contents of the new config file.
    pub fn watch(state: std::sync::Arc<SharedState>) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let path = Self::directory(&state).await;
            tracing::debug!("Watching config ({path:?}) for changes.");

            let (config_file_change_tx, mut config_file_change_rx) = tokio::sync::mpsc::channel(1);
            let mut protocol_rx = state.protocol_tx.subscribe();

            let mut debouncer = notify_debouncer_full::new_debouncer(
                std::time::Duration::from_millis(100),
                None,
                move |result: notify_debouncer_full::DebounceEventResult| match result {
                    Ok(events) => {
                        for event in events {
                            let send_result = config_file_change_tx.blocking_send(event);
                            if let Err(error) = send_result {
                                tracing::error!(
                                    "Sending config file watcher notification: {error:?}"
                                );
                            }
                        }
                    }
                    Err(error) => tracing::error!("File watcher: {error:?}"),
                },
            )?;
            debouncer.watch(
                &path,
                notify_debouncer_full::notify::RecursiveMode::NonRecursive,
            )?;

            #[expect(
                clippy::integer_division_remainder_used,
                reason = "This is caused by the `tokio::select!`"
            )]
            loop {
                tokio::select! {
                    Some(event) = config_file_change_rx.recv() => {
                        Self::handle_file_change_event(event, &state).await;
                    },
                    Ok(message) = protocol_rx.recv() => {
                        if matches!(message, crate::run::Protocol::End) {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Leaving config watcher loop");
            Ok(())
        })
    }

    /// Handle an event from the config file watcher. Should normally be a notification that the
    /// config file has changed.
    async fn handle_file_change_event(
        event: notify_debouncer_full::DebouncedEvent,
        state: &std::sync::Arc<SharedState>,
    ) {
        use notify_debouncer_full::notify::event as notify_event;
        let notify_event::EventKind::Modify(kind) = event.kind else {
            return;
        };
        let notify_event::ModifyKind::Data(_) = kind else {
            return;
        };

        let main_config_path = Self::main_config_path(state).await;
        let is_main_config = event
            .paths
            .iter()
            .any(|path| path.file_name() == main_config_path.file_name());
        if !is_main_config {
            return;
        }

        tracing::debug!(
            "Config file change detected ({:?}), updating shared state.",
            event.paths
        );

        match Self::load_config_into_shared_state(state).await {
            Ok(config) => {
                state
                    .protocol_tx
                    .send(crate::run::Protocol::Config(config))
                    .unwrap_or_else(|send_error| {
                        tracing::error!(
                            "Couldn't send config update on protocol channel: {send_error:?}"
                        );
                        0
                    });
            }
            Err(error) => {
                tracing::error!("Config update error, keeping the previous config: {error:?}");
            }
        }
    }
}
