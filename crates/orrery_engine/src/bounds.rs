//! The rectangular area that particles live in.

/// The size of the drawable area. The origin is the top-left corner.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "A rectangle anchored at the origin only ever needs a width and a height"
)]
pub struct Bounds {
    /// Width of the area
    pub width: f64,
    /// Height of the area
    pub height: f64,
}

impl Bounds {
    /// Instantiate
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Can anything actually be placed in, or drawn to, this area?
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Is the horizontal coordinate past the left or right edge?
    #[must_use]
    pub fn is_outside_horizontally(&self, x: f64) -> bool {
        x < 0.0 || x > self.width
    }

    /// Is the vertical coordinate past the top or bottom edge?
    #[must_use]
    pub fn is_outside_vertically(&self, y: f64) -> bool {
        y < 0.0 || y > self.height
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edges_are_inside() {
        let bounds = Bounds::new(10.0, 5.0);
        assert!(!bounds.is_outside_horizontally(0.0));
        assert!(!bounds.is_outside_horizontally(10.0));
        assert!(!bounds.is_outside_vertically(5.0));
        assert!(bounds.is_outside_horizontally(-0.001));
        assert!(bounds.is_outside_vertically(5.001));
    }

    #[test]
    fn empty_area_is_not_drawable() {
        assert!(!Bounds::default().is_drawable());
        assert!(!Bounds::new(10.0, 0.0).is_drawable());
        assert!(Bounds::new(1.0, 1.0).is_drawable());
    }
}
