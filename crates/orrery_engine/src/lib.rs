//! # Orrery Engine
//! A real-time N-body particle simulation. Point masses attract each other pairwise, are stepped
//! forward with explicit Euler integration and bounce off the edges of a rectangular area.
//!
//! The engine doesn't own a clock or a screen. A driver hands it a [`simulation::Scheduler`],
//! which it uses to ask for the next frame, and a [`simulation::Renderer`], which it calls once
//! for every frame it produces. The driver then calls [`simulation::Simulation::on_frame`]
//! whenever a requested frame is due.
//!
//! The physics stages are also usable on their own:
//!   * [`particle_store`] creates and replaces sets of particles.
//!   * [`forces`] applies the pairwise gravitational pull to every particle's velocity.
//!   * [`integrator`] moves particles and reflects them off the bounds.

#![expect(clippy::pub_use, reason = "How else are you supposed re-export??")]

pub mod bounds;
pub mod errors;
pub mod forces;
pub mod integrator;
pub mod particle;
pub mod particle_store;
pub mod simulation;

pub use bounds::Bounds;
pub use particle::Particle;
pub use particle_store::ParticleSet;
pub use simulation::{Simulation, SimulationConfig, SimulationState};
