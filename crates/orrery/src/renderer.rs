//! Render the simulation to the user's terminal.
//!
//! The bottom row of the terminal is a status line, everything above it is particles. World
//! coordinates are divided by the configured scale to get pixel coordinates, so the simulation's
//! bounds grow and shrink with the terminal.

use color_eyre::eyre::Result;
use orrery_engine::errors::RenderError;
use orrery_engine::simulation::{Frame, Renderer};
use orrery_engine::{Bounds, SimulationState};
use palette::IntoColor as _;
use snafu::ResultExt as _;
use termwiz::surface::{Change as TermwizChange, CursorVisibility};
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{SystemTerminal, Terminal as _};

use crate::surface::{Colour, Surface};

/// The colour of the status line's text.
const STATUS_COLOUR: Colour = (0.7, 0.7, 0.7, 1.0);

/// Draws frames to the user's terminal.
pub(crate) struct TerminalRenderer {
    /// The user's terminal. Only `None` once it's been handed back to the user.
    terminal: Option<BufferedTerminal<SystemTerminal>>,
    /// The terminal's width
    width: u16,
    /// The terminal's height, including the status line
    height: u16,
    /// World units per pixel
    scale: f64,
}

impl TerminalRenderer {
    /// Take over the user's terminal: raw mode, alternate screen and no cursor.
    pub fn new(scale: f64) -> Result<Self> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut users_terminal = Self::get_termwiz_terminal()?;
        users_terminal.set_raw_mode()?;
        users_terminal.enter_alternate_screen()?;
        let mut terminal = BufferedTerminal::new(users_terminal)?;
        terminal.add_change(TermwizChange::CursorVisibility(CursorVisibility::Hidden));
        terminal.flush()?;

        let (width, height) = terminal.dimensions();
        Ok(Self {
            terminal: Some(terminal),
            width: width.try_into()?,
            height: height.try_into()?,
            scale: sanitise_scale(scale),
        })
    }

    /// The terminal for the current platform.
    fn get_termwiz_terminal() -> Result<SystemTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(SystemTerminal::new(capabilities)?)
    }

    /// How many rows are available for particles.
    fn particle_rows(&self) -> u16 {
        self.height.saturating_sub(1)
    }

    /// The area that particles live in, in world units.
    pub fn bounds(&self) -> Bounds {
        bounds_for(self.width, self.particle_rows(), self.scale)
    }

    /// Change the scale, returning the new bounds.
    pub fn set_scale(&mut self, scale: f64) -> Bounds {
        self.scale = sanitise_scale(scale);
        self.bounds()
    }

    /// Collect all the input that's waiting, without blocking.
    pub fn poll_input(&mut self) -> Result<Vec<termwiz::input::InputEvent>> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        while let Some(event) = terminal
            .terminal()
            .poll_input(Some(core::time::Duration::ZERO))?
        {
            events.push(event);
        }
        Ok(events)
    }

    /// Check if the user's terminal has changed size. If it has, the new bounds are returned.
    pub fn handle_resize(&mut self) -> Result<Option<Bounds>> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(None);
        };

        let is_resized = terminal.check_for_resize()?;
        if !is_resized {
            return Ok(None);
        }

        terminal.repaint()?;
        let (width, height) = terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        tracing::debug!("Terminal resized to {}x{}", self.width, self.height);

        Ok(Some(self.bounds()))
    }

    /// Give the terminal back to the user the way we found it.
    pub fn restore(&mut self) -> Result<()> {
        let Some(mut terminal) = self.terminal.take() else {
            return Ok(());
        };

        tracing::debug!("Setting user's terminal to cooked mode");
        terminal.add_change(TermwizChange::CursorVisibility(CursorVisibility::Visible));
        terminal.flush()?;
        terminal.terminal().exit_alternate_screen()?;
        terminal.terminal().set_cooked_mode()?;
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        if let Err(error) = self.restore() {
            tracing::error!("Couldn't restore the user's terminal: {error:?}");
        }
    }
}

impl Renderer for TerminalRenderer {
    fn is_ready(&self) -> bool {
        self.terminal.is_some() && self.width > 0 && self.particle_rows() > 0
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        let particle_rows = self.particle_rows();
        let particles = draw_particles(frame, self.width, particle_rows, self.scale)
            .whatever_context::<_, RenderError>("Couldn't draw particles")?;
        let status = draw_status(frame, self.width);

        let terminal = self.terminal.as_mut().ok_or(RenderError::SurfaceUnavailable)?;
        terminal.draw_from_screen(&particles.surface, 0, 0);
        terminal.draw_from_screen(&status.surface, 0, usize::from(particle_rows));
        terminal
            .flush()
            .whatever_context::<_, RenderError>("Couldn't flush frame to the terminal")?;

        Ok(())
    }
}

/// A scale that can't be divided by is replaced with 1.
fn sanitise_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        tracing::warn!("Invalid scale ({scale}), using 1.0");
        1.0
    }
}

/// The world-space size of a grid of cells.
pub(crate) fn bounds_for(width: u16, rows: u16, scale: f64) -> Bounds {
    Bounds::new(
        f64::from(width) * scale,
        f64::from(rows) * 2.0 * scale,
    )
}

/// The colour of a particle: the hue goes round the colour wheel once every 10 units of mass.
pub(crate) fn colour_for_mass(mass: f64) -> Colour {
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        reason = "Hues don't need 64 bits of precision"
    )]
    let hue = (mass * 36.0) as f32;
    let hsl: palette::Hsl = palette::Hsl::new(hue, 1.0, 0.5);
    let rgb: palette::Srgb = hsl.into_color();
    (rgb.red, rgb.green, rgb.blue, 1.0)
}

/// Draw every particle as a disc on a fresh surface.
pub(crate) fn draw_particles(
    frame: &Frame<'_>,
    width: u16,
    rows: u16,
    scale: f64,
) -> Result<Surface> {
    let mut surface = Surface::new(width, rows);
    for particle in frame.particles {
        let (x, y) = particle.position();
        surface.add_disc(
            (x / scale, y / scale),
            particle.radius() / scale,
            colour_for_mass(particle.mass()),
        )?;
    }
    Ok(surface)
}

/// Draw the status line onto its own single row surface.
pub(crate) fn draw_status(frame: &Frame<'_>, width: u16) -> Surface {
    let mut surface = Surface::new(width, 1);
    let text: String = status_line(frame)
        .chars()
        .take(usize::from(width))
        .collect();
    surface.add_text(0, 0, text, None, Some(STATUS_COLOUR));
    surface
}

/// A summary of the simulation.
pub(crate) fn status_line(frame: &Frame<'_>) -> String {
    let state = if matches!(frame.state, SimulationState::Running) {
        "running"
    } else {
        "paused"
    };
    format!(
        " {state}  particles: {}  gravity: {:.2}  tick: {}",
        frame.particles.len(),
        frame.config.gravity_strength,
        frame.tick
    )
}
