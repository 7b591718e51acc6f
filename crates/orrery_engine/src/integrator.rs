//! Explicit Euler stepping with a fixed timestep of one tick.

use crate::{bounds::Bounds, particle::Particle};

/// Move every particle by its velocity and bounce it off the edges of the bounds.
pub fn step(particles: &mut [Particle], bounds: Bounds) {
    for particle in particles {
        advance(particle, bounds);
    }
}

/// Move a single particle by its velocity, then reflect it if it ended up outside the bounds.
///
/// Reflection only flips the sign of the velocity on the offending axis, the position itself is
/// never clamped. So a particle can sit just outside the bounds for a frame until its reversed
/// velocity carries it back in. Each axis is handled on its own and no energy is lost.
pub fn advance(particle: &mut Particle, bounds: Bounds) {
    particle.x += particle.dx;
    particle.y += particle.dy;

    if bounds.is_outside_horizontally(particle.x) {
        particle.dx = -particle.dx;
    }
    if bounds.is_outside_vertically(particle.y) {
        particle.dy = -particle.dy;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BOUNDS: Bounds = Bounds::new(100.0, 50.0);

    #[test]
    fn moves_by_velocity() {
        let mut particle = Particle::new((10.0, 20.0), (1.5, -0.5), 1.0, 1.0);
        advance(&mut particle, BOUNDS);
        assert_eq!(particle.position(), (11.5, 19.5));
        assert_eq!(particle.velocity(), (1.5, -0.5));
    }

    #[test]
    fn reflects_off_the_right_edge() {
        let mut particle = Particle::new((100.0 + 0.01, 25.0), (0.5, 0.0), 2.5, 7.0);
        advance(&mut particle, BOUNDS);
        assert!(particle.velocity().0 < 0.0);
        assert_eq!(particle.velocity().1, 0.0);
        assert_eq!(particle.radius(), 2.5);
        assert_eq!(particle.mass(), 7.0);
    }

    #[test]
    fn reflects_off_the_top_edge_without_clamping() {
        let mut particle = Particle::new((50.0, 0.5), (0.0, -1.0), 1.0, 1.0);
        advance(&mut particle, BOUNDS);
        assert_eq!(particle.position(), (50.0, -0.5));
        assert_eq!(particle.velocity(), (0.0, 1.0));

        advance(&mut particle, BOUNDS);
        assert_eq!(particle.position(), (50.0, 0.5));
        assert_eq!(particle.velocity(), (0.0, 1.0));
    }

    #[test]
    fn reflection_ignores_which_side_was_crossed() {
        // Moving inwards whilst still outside flips the velocity back outwards. Reflection is only
        // ever a sign flip.
        let mut particle = Particle::new((-5.0, 10.0), (1.0, 0.0), 1.0, 1.0);
        advance(&mut particle, BOUNDS);
        assert_eq!(particle.position(), (-4.0, 10.0));
        assert_eq!(particle.velocity(), (-1.0, 0.0));
    }

    #[test]
    fn reflects_each_axis_independently() {
        let mut particles = vec![
            Particle::new((99.5, 49.5), (1.0, 1.0), 1.0, 1.0),
            Particle::new((50.0, 49.5), (0.0, 1.0), 1.0, 1.0),
        ];
        step(&mut particles, BOUNDS);
        assert_eq!(particles.first().map(Particle::velocity), Some((-1.0, -1.0)));
        assert_eq!(particles.get(1).map(Particle::velocity), Some((0.0, -1.0)));
    }
}
