//! The simulation loop.
//!
//! A [`Simulation`] is either paused or running. Whilst running, every frame callback from the
//! driver's clock does one tick of physics (gravity, then integration), renders the result and
//! asks the clock for another frame. Whilst paused no physics happens and a single static frame
//! is rendered whenever the simulation lands in that state.
//!
//! The engine never waits on anything itself. It only talks to the outside world through the
//! [`Scheduler`] and [`Renderer`] traits.

use snafu::ResultExt as _;

use crate::{
    bounds::Bounds,
    errors::{EngineError, RenderError, RenderSnafu},
    forces, integrator,
    particle::Particle,
    particle_store::{self, ParticleSet},
};

/// The parameters that the outside world controls.
///
/// The engine doesn't validate these. Keeping `particle_count` within `[10, 200]` and
/// `gravity_strength` within `[0, 1]` is up to whatever UI is setting them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct SimulationConfig {
    /// How many particles a freshly created set has.
    pub particle_count: usize,
    /// Scales the pull between every pair of particles.
    pub gravity_strength: f64,
}

impl SimulationConfig {
    /// Instantiate
    #[must_use]
    pub const fn new(particle_count: usize, gravity_strength: f64) -> Self {
        Self {
            particle_count,
            gravity_strength,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 50,
            gravity_strength: 0.1,
        }
    }
}

/// Whether the simulation is moving or not.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SimulationState {
    /// No physics happens. This is the initial state.
    #[default]
    Paused,
    /// Every frame callback ticks the physics.
    Running,
}

/// What a change in config requires of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigAction {
    /// Just carry on, the new values get picked up on the next tick.
    None,
    /// Throw away the particles, create a new set and pause.
    Reset,
}

/// Decide what a config change means for the simulation. Only a new particle count requires a
/// reset, gravity is simply read again on the next tick.
#[must_use]
pub fn on_config_change(old: &SimulationConfig, new: &SimulationConfig) -> ConfigAction {
    if old.particle_count == new.particle_count {
        ConfigAction::None
    } else {
        ConfigAction::Reset
    }
}

/// What happened when a frame callback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FrameOutcome {
    /// The physics ticked and the frame was rendered.
    Ticked,
    /// There was nothing to render to, so the tick was skipped. Another frame was requested.
    Skipped,
    /// The simulation isn't running. The callback was stale and did nothing.
    Ignored,
}

/// A source of frame callbacks, usually tied to a display's refresh rate.
///
/// When a scheduled tick is due, the driver should call [`Simulation::on_frame`].
pub trait Scheduler {
    /// Ask for [`Simulation::on_frame`] to be called on the next frame.
    fn schedule_next_tick(&mut self);
    /// Forget about any requested frame.
    fn cancel_scheduled_tick(&mut self);
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Frame<'particles> {
    /// The particles to draw.
    pub particles: &'particles [Particle],
    /// Whether the simulation is running or paused.
    pub state: SimulationState,
    /// The config that the frame was produced with.
    pub config: SimulationConfig,
    /// How many ticks have happened since the particles were created.
    pub tick: u64,
}

impl<'particles> Frame<'particles> {
    /// Instantiate
    #[must_use]
    pub const fn new(
        particles: &'particles [Particle],
        state: SimulationState,
        config: SimulationConfig,
        tick: u64,
    ) -> Self {
        Self {
            particles,
            state,
            config,
            tick,
        }
    }
}

/// Draws frames.
///
/// A renderer is expected to clear the previous frame and then draw each particle as a filled
/// circle with the particle's radius, coloured by `hsl(mass × 36°, 100%, 50%)`.
pub trait Renderer {
    /// Whether there's a surface to render to. When there isn't, ticks are skipped entirely.
    fn is_ready(&self) -> bool;

    /// Draw a frame.
    ///
    /// # Errors
    /// When the frame couldn't be drawn. The simulation pauses and waits to be started again.
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;
}

/// One tick of physics: the gravity pass over all particles, then the integration pass.
///
/// This is a pure function of the particles, the gravity and the bounds. Randomness is only ever
/// used when particles are created.
pub fn advance(particles: &mut ParticleSet, gravity_strength: f64, bounds: Bounds) {
    let particles = particles.as_mut_slice();
    forces::apply_gravity(particles, gravity_strength);
    integrator::step(particles, bounds);
}

/// The simulation, along with the scheduler and renderer that drive it.
pub struct Simulation<S: Scheduler, R: Renderer> {
    /// The parameters last given by the outside world.
    config: SimulationConfig,
    /// The current size of the drawable area.
    bounds: Bounds,
    /// The only copy of the particles. It's lent out to each stage of a tick.
    particles: ParticleSet,
    /// Running or paused.
    state: SimulationState,
    /// Asks for frame callbacks.
    scheduler: S,
    /// Draws the frames.
    renderer: R,
    /// Ticks since the particles were created.
    tick: u64,
    /// Whether we've asked the scheduler for a frame that hasn't arrived yet.
    is_tick_scheduled: bool,
}

impl<S: Scheduler, R: Renderer> Simulation<S, R> {
    /// Create a paused simulation with a random set of particles, and render its first static
    /// frame.
    ///
    /// # Errors
    /// If the first frame can't be rendered.
    pub fn new(
        config: SimulationConfig,
        bounds: Bounds,
        scheduler: S,
        renderer: R,
    ) -> Result<Self, EngineError> {
        let particles = particle_store::create(config.particle_count, bounds);
        Self::with_particles(config, bounds, particles, scheduler, renderer)
    }

    /// Create a paused simulation from an existing set of particles, and render its first static
    /// frame.
    ///
    /// # Errors
    /// If the first frame can't be rendered.
    pub fn with_particles(
        config: SimulationConfig,
        bounds: Bounds,
        particles: ParticleSet,
        scheduler: S,
        renderer: R,
    ) -> Result<Self, EngineError> {
        let mut simulation = Self {
            config,
            bounds,
            particles,
            state: SimulationState::Paused,
            scheduler,
            renderer,
            tick: 0,
            is_tick_scheduled: false,
        };
        tracing::debug!(
            "Simulation created with {} particles in {bounds:?}",
            simulation.particles.len()
        );
        simulation.render_static_frame()?;
        Ok(simulation)
    }

    /// Start ticking. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        tracing::debug!("Starting simulation");
        self.state = SimulationState::Running;
        self.schedule_tick();
    }

    /// Stop ticking and render the particles where they are. Does nothing if already paused.
    ///
    /// # Errors
    /// If the static frame can't be rendered.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        if !self.is_running() {
            return Ok(());
        }

        tracing::debug!("Pausing simulation after {} ticks", self.tick);
        self.enter_paused()
    }

    /// Start if paused, pause if running.
    ///
    /// # Errors
    /// If pausing and the static frame can't be rendered.
    pub fn toggle(&mut self) -> Result<(), EngineError> {
        match self.state {
            SimulationState::Paused => {
                self.start();
                Ok(())
            }
            SimulationState::Running => self.pause(),
        }
    }

    /// Replace all the particles with a new random set, then pause. Works from either state.
    ///
    /// # Errors
    /// If the static frame can't be rendered.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        let previous = core::mem::take(&mut self.particles);
        self.particles = particle_store::reset(previous, self.config.particle_count, self.bounds);
        self.tick = 0;
        tracing::debug!("Simulation reset with {} particles", self.particles.len());
        self.enter_paused()
    }

    /// Take on a new config. A change in particle count resets the simulation.
    ///
    /// # Errors
    /// If a reset was needed and its static frame can't be rendered.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<ConfigAction, EngineError> {
        let action = on_config_change(&self.config, &config);
        tracing::debug!("New config {config:?} requires: {action:?}");
        self.config = config;
        if action == ConfigAction::Reset {
            self.reset()?;
        }
        Ok(action)
    }

    /// Change only the particle count. Resets the simulation if the count is different.
    ///
    /// # Errors
    /// If a reset was needed and its static frame can't be rendered.
    pub fn set_particle_count(&mut self, particle_count: usize) -> Result<ConfigAction, EngineError> {
        self.set_config(SimulationConfig {
            particle_count,
            ..self.config
        })
    }

    /// Change only the gravity strength. It's picked up on the next tick.
    pub fn set_gravity_strength(&mut self, gravity_strength: f64) {
        self.config.gravity_strength = gravity_strength;
    }

    /// Take on new bounds, eg after the drawable area was resized. Particles aren't moved or
    /// recreated, the new bounds are just used for reflection from the next tick onwards.
    ///
    /// # Errors
    /// If paused and the static frame can't be rendered.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        tracing::debug!("Bounds changed to {bounds:?}");
        self.bounds = bounds;
        if self.is_running() {
            return Ok(());
        }
        self.render_static_frame()
    }

    /// The callback for when a scheduled frame is due.
    ///
    /// Whilst running, this ticks the physics, renders and schedules the next frame. A callback
    /// that arrives whilst paused is stale and does nothing.
    ///
    /// # Errors
    /// If the frame can't be rendered. The simulation is paused before the error is returned.
    pub fn on_frame(&mut self) -> Result<FrameOutcome, EngineError> {
        self.is_tick_scheduled = false;

        if !self.is_running() {
            tracing::trace!("Ignoring frame callback whilst paused");
            return Ok(FrameOutcome::Ignored);
        }

        if !self.renderer.is_ready() {
            tracing::trace!("No surface to render to, skipping tick");
            self.schedule_tick();
            return Ok(FrameOutcome::Skipped);
        }

        advance(&mut self.particles, self.config.gravity_strength, self.bounds);
        self.tick = self.tick.wrapping_add(1);

        if let Err(error) = self.render() {
            tracing::error!("Aborting simulation run: {error:?}");
            self.state = SimulationState::Paused;
            self.cancel_tick();
            return Err(error);
        }

        self.schedule_tick();
        Ok(FrameOutcome::Ticked)
    }

    /// Stop for good, making sure no scheduled frame is left behind.
    pub fn teardown(self) {
        tracing::debug!("Tearing down simulation");
        drop(self);
    }

    /// Whether the simulation is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> SimulationState {
        self.state
    }

    /// The current config.
    #[must_use]
    pub const fn config(&self) -> SimulationConfig {
        self.config
    }

    /// The current bounds.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The current particles.
    #[must_use]
    pub const fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    /// Ticks since the particles were created.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether a frame has been requested but not yet delivered.
    #[must_use]
    pub const fn is_tick_scheduled(&self) -> bool {
        self.is_tick_scheduled
    }

    /// The scheduler driving the simulation.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for when the frame rate changes.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// The renderer drawing the simulation.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the renderer, eg for it to handle its own resizing.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Land in the paused state, with no frame pending, showing the current particles.
    fn enter_paused(&mut self) -> Result<(), EngineError> {
        self.state = SimulationState::Paused;
        self.cancel_tick();
        self.render_static_frame()
    }

    /// Render the particles without ticking. Quietly does nothing if there's nowhere to render.
    fn render_static_frame(&mut self) -> Result<(), EngineError> {
        if !self.renderer.is_ready() {
            tracing::trace!("No surface to render to, skipping static frame");
            return Ok(());
        }
        self.render()
    }

    /// Hand the current particles to the renderer.
    fn render(&mut self) -> Result<(), EngineError> {
        let frame = Frame::new(self.particles.as_slice(), self.state, self.config, self.tick);
        self.renderer.render(&frame).context(RenderSnafu)
    }

    /// Ask for the next frame.
    fn schedule_tick(&mut self) {
        self.scheduler.schedule_next_tick();
        self.is_tick_scheduled = true;
    }

    /// Withdraw any pending frame request.
    fn cancel_tick(&mut self) {
        if self.is_tick_scheduled {
            self.scheduler.cancel_scheduled_tick();
            self.is_tick_scheduled = false;
        }
    }
}

impl<S: Scheduler, R: Renderer> Drop for Simulation<S, R> {
    fn drop(&mut self) {
        self.cancel_tick();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Counts the scheduler calls.
    #[derive(Default)]
    struct CountingScheduler {
        scheduled: usize,
        cancelled: usize,
    }

    impl Scheduler for CountingScheduler {
        fn schedule_next_tick(&mut self) {
            self.scheduled += 1;
        }

        fn cancel_scheduled_tick(&mut self) {
            self.cancelled += 1;
        }
    }

    /// Keeps a copy of everything it's asked to render.
    struct RecordingRenderer {
        is_ready: bool,
        is_failing: bool,
        frames: Vec<(SimulationState, Vec<Particle>)>,
    }

    impl RecordingRenderer {
        const fn ready() -> Self {
            Self {
                is_ready: true,
                is_failing: false,
                frames: Vec::new(),
            }
        }
    }

    impl Renderer for RecordingRenderer {
        fn is_ready(&self) -> bool {
            self.is_ready
        }

        fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
            if self.is_failing {
                return Err(RenderError::SurfaceUnavailable);
            }
            self.frames.push((frame.state, frame.particles.to_vec()));
            Ok(())
        }
    }

    type TestSimulation = Simulation<CountingScheduler, RecordingRenderer>;

    fn simulation() -> TestSimulation {
        Simulation::new(
            SimulationConfig::new(20, 0.1),
            Bounds::new(300.0, 200.0),
            CountingScheduler::default(),
            RecordingRenderer::ready(),
        )
        .unwrap()
    }

    fn drifting() -> ParticleSet {
        ParticleSet::from_particles(vec![
            Particle::new((10.0, 10.0), (1.0, 0.0), 1.0, 1.0),
            Particle::new((90.0, 90.0), (0.0, -1.0), 1.0, 1.0),
        ])
    }

    #[test]
    fn starts_paused_with_a_static_frame() {
        let simulation = simulation();
        assert_eq!(simulation.state(), SimulationState::Paused);
        assert_eq!(simulation.particles().len(), 20);
        assert_eq!(simulation.renderer().frames.len(), 1);
        assert_eq!(simulation.scheduler().scheduled, 0);
    }

    #[test]
    fn start_schedules_and_frames_tick() {
        let mut simulation = simulation();
        simulation.start();
        assert!(simulation.is_running());
        assert!(simulation.is_tick_scheduled());
        assert_eq!(simulation.scheduler().scheduled, 1);

        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Ticked);
        assert_eq!(simulation.tick(), 1);
        assert_eq!(simulation.scheduler().scheduled, 2);
        assert_eq!(simulation.renderer().frames.len(), 2);
    }

    #[test]
    fn start_whilst_running_is_a_no_op() {
        let mut simulation = simulation();
        simulation.start();
        simulation.start();
        assert_eq!(simulation.scheduler().scheduled, 1);
    }

    #[test]
    fn pause_cancels_and_renders_a_static_frame() {
        let mut simulation = simulation();
        simulation.start();
        simulation.on_frame().unwrap();
        simulation.pause().unwrap();

        assert_eq!(simulation.state(), SimulationState::Paused);
        assert!(!simulation.is_tick_scheduled());
        assert_eq!(simulation.scheduler().cancelled, 1);
        let last = simulation.renderer().frames.last().unwrap();
        assert_eq!(last.0, SimulationState::Paused);
    }

    #[test]
    fn pause_whilst_paused_is_a_no_op() {
        let mut simulation = simulation();
        simulation.pause().unwrap();
        assert_eq!(simulation.renderer().frames.len(), 1);
        assert_eq!(simulation.scheduler().cancelled, 0);
    }

    #[test]
    fn stale_frames_do_nothing() {
        let mut simulation = Simulation::with_particles(
            SimulationConfig::new(2, 0.0),
            Bounds::new(100.0, 100.0),
            drifting(),
            CountingScheduler::default(),
            RecordingRenderer::ready(),
        )
        .unwrap();
        simulation.start();
        simulation.pause().unwrap();
        let before = simulation.particles().clone();

        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Ignored);
        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Ignored);
        assert_eq!(simulation.particles(), &before);
        assert_eq!(simulation.tick(), 0);
    }

    #[test]
    fn toggle_flips_between_states() {
        let mut simulation = simulation();
        simulation.toggle().unwrap();
        assert!(simulation.is_running());
        simulation.toggle().unwrap();
        assert!(!simulation.is_running());
    }

    #[test]
    fn reset_lands_paused_with_fresh_particles() {
        let mut simulation = simulation();
        simulation.start();
        simulation.on_frame().unwrap();
        let before = simulation.particles().clone();

        simulation.reset().unwrap();

        assert_eq!(simulation.state(), SimulationState::Paused);
        assert_eq!(simulation.tick(), 0);
        assert_eq!(simulation.particles().len(), 20);
        assert_ne!(simulation.particles(), &before);
        assert!(!simulation.is_tick_scheduled());
    }

    #[test]
    fn config_change_decides_on_a_reset() {
        let old = SimulationConfig::new(50, 0.1);
        assert_eq!(
            on_config_change(&old, &SimulationConfig::new(50, 0.9)),
            ConfigAction::None
        );
        assert_eq!(
            on_config_change(&old, &SimulationConfig::new(51, 0.1)),
            ConfigAction::Reset
        );
    }

    #[test]
    fn gravity_change_keeps_running() {
        let mut simulation = simulation();
        simulation.start();
        let action = simulation
            .set_config(SimulationConfig::new(20, 0.8))
            .unwrap();
        assert_eq!(action, ConfigAction::None);
        assert!(simulation.is_running());
        assert_eq!(simulation.config().gravity_strength, 0.8);
    }

    #[test]
    fn particle_count_change_resets() {
        let mut simulation = simulation();
        simulation.start();
        let action = simulation.set_particle_count(35).unwrap();
        assert_eq!(action, ConfigAction::Reset);
        assert!(!simulation.is_running());
        assert_eq!(simulation.particles().len(), 35);
    }

    #[test]
    fn bounds_change_rerenders_only_whilst_paused() {
        let mut simulation = simulation();
        let before = simulation.particles().clone();
        simulation.set_bounds(Bounds::new(10.0, 10.0)).unwrap();
        assert_eq!(simulation.renderer().frames.len(), 2);
        assert_eq!(simulation.particles(), &before);

        simulation.start();
        simulation.set_bounds(Bounds::new(20.0, 20.0)).unwrap();
        assert_eq!(simulation.renderer().frames.len(), 2);
        assert_eq!(simulation.bounds(), Bounds::new(20.0, 20.0));
    }

    #[test]
    fn missing_surface_skips_the_whole_tick() {
        let mut simulation = simulation();
        simulation.renderer_mut().is_ready = false;
        simulation.start();
        let before = simulation.particles().clone();

        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Skipped);
        assert_eq!(simulation.particles(), &before);
        assert!(simulation.is_running());
        assert!(simulation.is_tick_scheduled());

        simulation.renderer_mut().is_ready = true;
        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Ticked);
    }

    #[test]
    fn render_failure_aborts_the_run() {
        let mut simulation = simulation();
        simulation.start();
        simulation.renderer_mut().is_failing = true;

        assert!(simulation.on_frame().is_err());
        assert!(!simulation.is_running());
        assert!(!simulation.is_tick_scheduled());
        // The failed frame consumed the only scheduled tick, so there's nothing to cancel.
        assert_eq!(simulation.scheduler().scheduled, 1);
        assert_eq!(simulation.scheduler().cancelled, 0);

        // A later callback for that run is stale.
        simulation.renderer_mut().is_failing = false;
        assert_eq!(simulation.on_frame().unwrap(), FrameOutcome::Ignored);
    }

    #[test]
    fn advance_is_deterministic() {
        let mut first = drifting();
        let mut second = drifting();
        advance(&mut first, 0.3, Bounds::new(100.0, 100.0));
        advance(&mut second, 0.3, Bounds::new(100.0, 100.0));
        assert_eq!(first, second);
    }
}
