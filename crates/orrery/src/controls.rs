//! What the user's key presses do to the simulation.
//!
//! The particle count and gravity can be nudged up and down, but only within fixed ranges. The
//! same ranges also apply to values coming from the config file or the command line.

use orrery_engine::errors::EngineError;
use orrery_engine::simulation::{Renderer, Scheduler};
use orrery_engine::Simulation;

use crate::config::input::KeybindingAction;

/// The smallest and largest number of particles allowed.
pub const PARTICLE_COUNT_RANGE: core::ops::RangeInclusive<usize> = 10..=200;

/// The weakest and strongest gravity allowed.
pub const GRAVITY_STRENGTH_RANGE: core::ops::RangeInclusive<f64> = 0.0..=1.0;

/// How much the particle count changes with each key press.
pub const PARTICLE_COUNT_STEP: usize = 1;

/// How much gravity changes with each key press.
pub const GRAVITY_STRENGTH_STEP: f64 = 0.01;

/// Whether the app should keep going after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Keep running
    Continue,
    /// The user wants to leave
    Quit,
}

/// Keep a particle count within [`PARTICLE_COUNT_RANGE`].
#[must_use]
pub fn clamp_particle_count(count: usize) -> usize {
    count.clamp(*PARTICLE_COUNT_RANGE.start(), *PARTICLE_COUNT_RANGE.end())
}

/// Keep gravity within [`GRAVITY_STRENGTH_RANGE`], snapped to the nearest step. `NaN` becomes no
/// gravity at all.
#[must_use]
pub fn clamp_gravity_strength(gravity_strength: f64) -> f64 {
    if gravity_strength.is_nan() {
        return *GRAVITY_STRENGTH_RANGE.start();
    }
    let snapped = (gravity_strength / GRAVITY_STRENGTH_STEP).round() * GRAVITY_STRENGTH_STEP;
    snapped.clamp(*GRAVITY_STRENGTH_RANGE.start(), *GRAVITY_STRENGTH_RANGE.end())
}

/// Carry out an action on the simulation.
///
/// # Errors
/// When the simulation needed to render a static frame and couldn't.
pub(crate) fn apply<S: Scheduler, R: Renderer>(
    action: KeybindingAction,
    simulation: &mut Simulation<S, R>,
) -> Result<Outcome, EngineError> {
    tracing::debug!("Applying action: {action:?}");
    let config = simulation.config();

    match action {
        KeybindingAction::Toggle => simulation.toggle()?,
        KeybindingAction::Start => simulation.start(),
        KeybindingAction::Pause => simulation.pause()?,
        KeybindingAction::Reset => simulation.reset()?,
        KeybindingAction::MoreParticles => {
            let count =
                clamp_particle_count(config.particle_count.saturating_add(PARTICLE_COUNT_STEP));
            change_particle_count(simulation, count)?;
        }
        KeybindingAction::FewerParticles => {
            let count =
                clamp_particle_count(config.particle_count.saturating_sub(PARTICLE_COUNT_STEP));
            change_particle_count(simulation, count)?;
        }
        KeybindingAction::MoreGravity => simulation.set_gravity_strength(clamp_gravity_strength(
            config.gravity_strength + GRAVITY_STRENGTH_STEP,
        )),
        KeybindingAction::LessGravity => simulation.set_gravity_strength(clamp_gravity_strength(
            config.gravity_strength - GRAVITY_STRENGTH_STEP,
        )),
        KeybindingAction::Quit => return Ok(Outcome::Quit),
    }

    Ok(Outcome::Continue)
}

/// Only recreates the particles when the count actually changes, so that pressing "more" at the
/// upper limit doesn't wipe the simulation.
fn change_particle_count<S: Scheduler, R: Renderer>(
    simulation: &mut Simulation<S, R>,
    count: usize,
) -> Result<(), EngineError> {
    if count == simulation.config().particle_count {
        return Ok(());
    }
    simulation.set_particle_count(count)?;
    Ok(())
}
