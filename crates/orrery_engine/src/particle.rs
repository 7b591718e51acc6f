//! A single point mass.

/// A point mass. It has no identity beyond its index in a
/// [`crate::particle_store::ParticleSet`].
///
/// Mass and radius are fixed when the particle is created. Position and velocity can only be
/// changed by the engine's physics stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Horizontal position
    pub(crate) x: f64,
    /// Vertical position
    pub(crate) y: f64,
    /// Horizontal velocity, in units per tick
    pub(crate) dx: f64,
    /// Vertical velocity, in units per tick
    pub(crate) dy: f64,
    /// Visual size only, it plays no part in the physics
    radius: f64,
    /// Drives both the gravitational pull and the rendered colour
    mass: f64,
}

impl Particle {
    /// Instantiate
    #[must_use]
    pub const fn new(position: (f64, f64), velocity: (f64, f64), radius: f64, mass: f64) -> Self {
        Self {
            x: position.0,
            y: position.1,
            dx: velocity.0,
            dy: velocity.1,
            radius,
            mass,
        }
    }

    /// The current `(x, y)` position.
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// The current `(dx, dy)` velocity.
    #[must_use]
    pub const fn velocity(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    /// The radius used when drawing the particle.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// The particle's mass.
    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// Whether the particle's motion is still well defined. Two exactly coincident particles
    /// produce an infinite pull on each other, which poisons their position and velocity.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.dx.is_finite() && self.dy.is_finite()
    }
}
