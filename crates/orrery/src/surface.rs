//! A grid of terminal cells that can be drawn on with "pixels".
//!
//! Each cell holds two vertically stacked pixels, drawn with the half block characters "▀" and
//! "▄". So a surface of `width` columns and `height` rows has `width × 2·height` pixels.

use color_eyre::eyre::bail;
use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;
use termwiz::cell::AttributeChange;
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

/// An RGBA colour
pub(crate) type Colour = (f32, f32, f32, f32);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// The upper half block. Its foreground is the upper pixel and its background the lower pixel.
const UPPER: &str = "▀";

/// The lower half block. Only used when the upper pixel needs to stay the terminal's default.
const LOWER: &str = "▄";

/// `Surface`
#[derive(Clone)]
pub(crate) struct Surface {
    /// Width in columns
    pub width: u16,
    /// Height in rows
    pub height: u16,
    /// A surface of terminal cells
    pub surface: termwiz::surface::Surface,
}

impl Surface {
    /// Instantiate
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            surface: termwiz::surface::Surface::new(usize::from(width), usize::from(height)),
        }
    }

    /// How many pixels tall the surface is.
    #[must_use]
    pub fn pixel_height(&self) -> u32 {
        u32::from(self.height) * 2
    }

    /// Colour in one pixel.
    ///
    /// A pair of coloured pixels is always drawn with the upper half block. The one exception is
    /// a lone pixel in the lower half of an empty cell: using the upper block there would mean
    /// giving the upper half a colour, so instead the lower block is used and the terminal's own
    /// background stays visible above it.
    pub fn add_pixel(&mut self, x: usize, y: usize, colour: Colour) -> Result<()> {
        let (col, row) = self.coords_to_tty(x, y)?;
        let cell = self.get_cell_at(col, row)?;
        let attrs = cell.attrs();
        let is_upper_half = y.rem_euclid(2) == 0;

        let (foreground, background, glyph) = match (is_upper_half, cell.str()) {
            // The existing colour is the foreground of a lower block, so it has to move to the
            // background of an upper block.
            (true, LOWER) => (
                Self::make_fg_colour(colour),
                AttributeChange::Background(attrs.foreground()),
                UPPER,
            ),
            (true, _) => (
                Self::make_fg_colour(colour),
                AttributeChange::Background(attrs.background()),
                UPPER,
            ),
            (false, UPPER) => (
                AttributeChange::Foreground(attrs.foreground()),
                Self::make_bg_colour(colour),
                UPPER,
            ),
            (false, _) => (
                Self::make_fg_colour(colour),
                AttributeChange::Background(attrs.background()),
                LOWER,
            ),
        };

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(col),
                y: TermwizPosition::Absolute(row),
            },
            TermwizChange::Attribute(foreground),
            TermwizChange::Attribute(background),
        ]);
        self.surface.add_change(glyph);

        Ok(())
    }

    /// Draw a filled circle, centred and sized in pixels. Any part that falls off the surface is
    /// clipped. The pixel that the centre falls in is always drawn, even for tiny radii.
    pub fn add_disc(&mut self, centre: (f64, f64), radius: f64, colour: Colour) -> Result<()> {
        let (x, y) = centre;
        if !x.is_finite() || !y.is_finite() || !radius.is_finite() {
            tracing::trace!("Not drawing a disc at {centre:?} with radius {radius}");
            return Ok(());
        }

        let left = (x - radius).floor().max(0.0);
        let right = (x + radius).floor().min(f64::from(self.width) - 1.0);
        let top = (y - radius).floor().max(0.0);
        let bottom = (y + radius).floor().min(f64::from(self.pixel_height()) - 1.0);
        if left > right || top > bottom {
            return Ok(());
        }

        #[expect(
            clippy::as_conversions,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "The values have been clamped to the surface, so they fit"
        )]
        let (left, right, top, bottom) = (left as u32, right as u32, top as u32, bottom as u32);

        for pixel_y in top..=bottom {
            let upper_edge = f64::from(pixel_y);
            for pixel_x in left..=right {
                let left_edge = f64::from(pixel_x);
                let dx = left_edge + 0.5 - x;
                let dy = upper_edge + 0.5 - y;
                let contains_centre = (left_edge..left_edge + 1.0).contains(&x)
                    && (upper_edge..upper_edge + 1.0).contains(&y);

                if contains_centre || dx * dx + dy * dy <= radius * radius {
                    self.add_pixel(usize::try_from(pixel_x)?, usize::try_from(pixel_y)?, colour)?;
                }
            }
        }

        Ok(())
    }

    /// Overlay text at a given coord with the given colours.
    pub fn add_text(
        &mut self,
        x: usize,
        y: usize,
        text: String,
        maybe_background_colour: Option<Colour>,
        maybe_foreground_colour: Option<Colour>,
    ) {
        let bg_colour = maybe_background_colour.map_or(
            AttributeChange::Background(termwiz::color::ColorAttribute::Default),
            Self::make_bg_colour,
        );
        let fg_colour = Self::make_fg_colour(maybe_foreground_colour.unwrap_or(WHITE));

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(x),
                y: TermwizPosition::Absolute(y),
            },
            TermwizChange::Attribute(bg_colour),
            TermwizChange::Attribute(fg_colour),
        ]);
        self.surface.add_change(text);
    }

    /// Make a Termwiz colour attribute
    #[must_use]
    pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.0, colour.1, colour.2, colour.3,
        ))
    }

    /// Make a Termwiz background colour
    #[must_use]
    pub const fn make_bg_colour(colour: Colour) -> AttributeChange {
        AttributeChange::Background(Self::make_colour_attribute(colour))
    }

    /// Make a Termwiz foreground colour
    #[must_use]
    pub const fn make_fg_colour(colour: Colour) -> AttributeChange {
        AttributeChange::Foreground(Self::make_colour_attribute(colour))
    }

    /// Safely convert pixel coordinates to TTY col/row
    fn coords_to_tty(&self, x: usize, y: usize) -> Result<(usize, usize)> {
        let col = x;
        let row = y.div_euclid(2);
        if col >= usize::from(self.width) {
            bail!("Tried to add pixel to column: {col}")
        }
        if row >= usize::from(self.height) {
            bail!("Tried to add pixel to row: {row}")
        }
        Ok((col, row))
    }

    /// Get the cell at the given column and row.
    fn get_cell_at(&mut self, col: usize, row: usize) -> Result<termwiz::cell::Cell> {
        let cells = self.surface.screen_cells();
        let cell = cells
            .get(row)
            .context("No cell row")?
            .get(col)
            .context("No cell column")?;
        Ok(cell.clone())
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::shadow_unrelated,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);
    const GREY: Colour = (0.5, 0.5, 0.5, 1.0);

    fn inked_pixels(surface: &mut Surface) -> usize {
        surface
            .surface
            .screen_cells()
            .iter()
            .flat_map(|row| row.iter())
            .map(|cell| match cell.str() {
                UPPER if cell.attrs().background() != termwiz::color::ColorAttribute::Default => 2,
                UPPER | LOWER => 1,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn add_new_pixels() {
        let mut surface = Surface::new(2, 2);

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), " ");
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );

        surface.add_pixel(0, 0, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), UPPER);
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );

        surface.add_pixel(1, 2, WHITE).unwrap();
        surface.add_pixel(1, 3, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[1][1];
        assert_eq!(cell.str(), UPPER);

        let result = surface.add_pixel(1, 4, WHITE).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to row: 2"
        );
    }

    #[test]
    fn add_pixel_at_bottom_of_empty_cell() {
        let mut surface = Surface::new(1, 1);

        surface.add_pixel(0, 1, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), LOWER);
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn convert_cell_from_bottom_to_full() {
        let mut surface = Surface::new(1, 1);

        surface.add_pixel(0, 1, WHITE).unwrap();
        surface.add_pixel(0, 0, RED).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), UPPER);
        assert_eq!(cell.attrs().foreground(), Surface::make_colour_attribute(RED));
        assert_eq!(
            cell.attrs().background(),
            Surface::make_colour_attribute(WHITE)
        );
    }

    #[test]
    fn add_pixel_below_existing_pixel() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel(0, 0, WHITE).unwrap();
        surface.add_pixel(0, 1, GREY).unwrap();

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), UPPER);
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(cell.attrs().background(), Surface::make_colour_attribute(GREY));
    }

    #[test]
    fn tiny_disc_is_a_single_pixel() {
        let mut surface = Surface::new(10, 5);
        surface.add_disc((4.5, 3.5), 0.25, RED).unwrap();
        assert_eq!(inked_pixels(&mut surface), 1);
        assert_eq!(surface.surface.screen_cells()[1][4].str(), LOWER);
    }

    #[test]
    fn disc_covers_pixels_within_its_radius() {
        let mut surface = Surface::new(10, 5);
        surface.add_disc((5.0, 5.0), 1.0, RED).unwrap();
        // The 4 pixels touching the centre point.
        assert_eq!(inked_pixels(&mut surface), 4);
    }

    #[test]
    fn disc_is_clipped_to_the_surface() {
        let mut surface = Surface::new(4, 2);
        surface.add_disc((0.0, 0.0), 1.5, RED).unwrap();
        surface.add_disc((-100.0, 2.0), 1.0, RED).unwrap();
        surface.add_disc((f64::NAN, 2.0), 1.0, RED).unwrap();
        assert_eq!(inked_pixels(&mut surface), 1);
    }

    #[test]
    fn text() {
        let mut surface = Surface::new(5, 1);
        surface.add_text(1, 0, "abc".into(), None, Some(RED));
        let cells = &surface.surface.screen_cells()[0];
        assert_eq!(cells[1].str(), "a");
        assert_eq!(cells[3].str(), "c");
        assert_eq!(cells[1].attrs().foreground(), Surface::make_colour_attribute(RED));
    }
}
