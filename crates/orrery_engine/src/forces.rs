//! Pairwise gravitational attraction between every particle and every other particle.
//!
//! There's no softening term. Two particles at exactly the same position pull on each other
//! infinitely hard, so their velocities become non-finite. That's left as is, clamping the
//! distance would change how close encounters play out.

use crate::particle::Particle;

/// The change in velocity that `other` causes on `particle` during one tick.
///
/// The pull is `gravity_strength * m1 * m2 / distance²`, directed from `particle` towards
/// `other` and divided by `particle`'s own mass to get an acceleration.
#[must_use]
pub fn pairwise_impulse(particle: &Particle, other: &Particle, gravity_strength: f64) -> (f64, f64) {
    let dx = other.x - particle.x;
    let dy = other.y - particle.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let force = gravity_strength * particle.mass() * other.mass() / (distance * distance);
    let angle = dy.atan2(dx);

    (
        force * angle.cos() / particle.mass(),
        force * angle.sin() / particle.mass(),
    )
}

/// Add the pull of all the other particles to the velocity of every particle.
///
/// Every ordered pair is visited, so the pull of `q` on `p` is computed separately from the pull
/// of `p` on `q`. Only velocities are written and each impulse only reads positions and masses,
/// so the order that particles are visited in makes no difference to the result.
pub fn apply_gravity(particles: &mut [Particle], gravity_strength: f64) {
    let velocities: Vec<(f64, f64)> = particles
        .iter()
        .enumerate()
        .map(|(index, particle)| {
            particles
                .iter()
                .enumerate()
                .filter(|(other_index, _)| *other_index != index)
                .fold(particle.velocity(), |(dx, dy), (_, other)| {
                    let impulse = pairwise_impulse(particle, other, gravity_strength);
                    (dx + impulse.0, dy + impulse.1)
                })
        })
        .collect();

    for (particle, (dx, dy)) in particles.iter_mut().zip(velocities) {
        particle.dx = dx;
        particle.dy = dy;
    }
}
