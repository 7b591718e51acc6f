//! Errors for this library

/// All the known errors returned by the engine.
#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum EngineError {
    #[snafu(display("Renderer Error"))]
    /// The renderer failed to draw a frame. The simulation pauses when this happens.
    Render {
        /// The parent error type
        source: RenderError,
    },
}

/// Errors that a [`crate::simulation::Renderer`] can report back to the engine.
#[derive(Debug, snafu::Snafu)]
#[non_exhaustive]
pub enum RenderError {
    #[snafu(display("No surface is available to render to"))]
    /// The drawable target has gone away between checking that it's ready and drawing to it.
    SurfaceUnavailable,

    /// General errors that don't need to be matched on
    #[snafu(whatever, display("{message}"))]
    Whatever {
        /// A helpful message acompanying the error
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        /// The parent error type
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
