//! Creating, and wholesale replacing, the set of particles.

use rand::Rng;

use crate::{bounds::Bounds, particle::Particle};

/// The range that a new particle's radius is picked from.
pub const RADIUS_RANGE: core::ops::Range<f64> = 1.0..3.0;

/// The range that a new particle's mass is picked from.
pub const MASS_RANGE: core::ops::Range<f64> = 1.0..11.0;

/// The range that each component of a new particle's velocity is picked from.
pub const VELOCITY_RANGE: core::ops::Range<f64> = -1.0..1.0;

/// An ordered sequence of particles. Particles are never added or removed individually, the
/// whole set is replaced instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSet {
    /// All the particles
    particles: Vec<Particle>,
}

impl ParticleSet {
    /// Build a set from already existing particles.
    #[must_use]
    pub const fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    /// The number of particles in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the set has no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Read-only view of the particles.
    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Iterate over the particles in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Only the physics stages get to change particles.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}

impl<'set> IntoIterator for &'set ParticleSet {
    type Item = &'set Particle;
    type IntoIter = core::slice::Iter<'set, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Create `count` randomly placed particles inside the bounds. Not seeded, so every call gives a
/// different set.
#[must_use]
pub fn create(count: usize, bounds: Bounds) -> ParticleSet {
    create_with_rng(count, bounds, &mut rand::thread_rng())
}

/// Create `count` particles using the given source of randomness.
///
/// Every value is sampled independently:
///   * position uniformly within `[0, width) x [0, height)`
///   * velocity components uniformly within [`VELOCITY_RANGE`]
///   * radius uniformly within [`RADIUS_RANGE`]
///   * mass uniformly within [`MASS_RANGE`]
pub fn create_with_rng<R: Rng + ?Sized>(count: usize, bounds: Bounds, rng: &mut R) -> ParticleSet {
    let particles = (0..count)
        .map(|_| {
            Particle::new(
                (
                    sample_axis(rng, bounds.width),
                    sample_axis(rng, bounds.height),
                ),
                (
                    rng.gen_range(VELOCITY_RANGE),
                    rng.gen_range(VELOCITY_RANGE),
                ),
                rng.gen_range(RADIUS_RANGE),
                rng.gen_range(MASS_RANGE),
            )
        })
        .collect();

    tracing::trace!("Created {count} particles within {bounds:?}");
    ParticleSet::from_particles(particles)
}

/// Replace a set with a freshly created one. Nothing from the previous set is reused.
#[must_use]
pub fn reset(previous: ParticleSet, count: usize, bounds: Bounds) -> ParticleSet {
    tracing::debug!(
        "Replacing {} particles with {count} new ones",
        previous.len()
    );
    drop(previous);
    create(count, bounds)
}

/// Pick a coordinate along one axis. An axis with no extent can't be sampled from, so everything
/// goes at the origin until the area has a real size.
fn sample_axis<R: Rng + ?Sized>(rng: &mut R, extent: f64) -> f64 {
    if extent > 0.0 {
        rng.gen_range(0.0..extent)
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    fn assert_within_ranges(set: &ParticleSet, bounds: Bounds) {
        for particle in set {
            let (x, y) = particle.position();
            let (dx, dy) = particle.velocity();
            assert!((0.0..bounds.width).contains(&x), "x out of range: {x}");
            assert!((0.0..bounds.height).contains(&y), "y out of range: {y}");
            assert!(VELOCITY_RANGE.contains(&dx));
            assert!(VELOCITY_RANGE.contains(&dy));
            assert!(RADIUS_RANGE.contains(&particle.radius()));
            assert!(MASS_RANGE.contains(&particle.mass()));
        }
    }

    #[test]
    fn creates_the_requested_number_of_particles() {
        let bounds = Bounds::new(700.0, 400.0);
        let set = create(50, bounds);
        assert_eq!(set.len(), 50);
        assert_within_ranges(&set, bounds);
    }

    #[test]
    fn reset_replaces_everything() {
        let bounds = Bounds::new(700.0, 400.0);
        let previous = create(10, bounds);
        let snapshot = previous.clone();

        let set = reset(previous, 75, bounds);

        assert_eq!(set.len(), 75);
        assert_within_ranges(&set, bounds);
        assert!(set.iter().take(10).ne(snapshot.iter()));
    }

    #[test]
    fn seeded_creation_is_reproducible() {
        let bounds = Bounds::new(100.0, 100.0);
        let first = create_with_rng(20, bounds, &mut rand::rngs::StdRng::seed_from_u64(7));
        let second = create_with_rng(20, bounds, &mut rand::rngs::StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }

    #[test]
    fn unsized_bounds_put_particles_at_the_origin() {
        let set = create(3, Bounds::default());
        assert_eq!(set.len(), 3);
        assert!(set.iter().all(|particle| particle.position() == (0.0, 0.0)));
    }

    #[test]
    fn zero_particles() {
        assert!(create(0, Bounds::new(1.0, 1.0)).is_empty());
    }
}
