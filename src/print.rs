//! Drawing a map onto a page through external collaborators.
//!
//! The map engine and the drawing surface live outside this crate. They are
//! reached through three traits:
//!
//! - [`MapSource`]: the map: its envelope, raster size and rendering.
//! - [`Surface`]: a page-sized 2D drawing context in points.
//! - [`Backend`]: creates surfaces; may be unavailable on a given system.
//!
//! [`PagePrinter`] runs the [`PageLayout`] calculation, sizes the map, places
//! it on a fresh page and keeps the resulting [`Placement`] for later reads
//! (the legend uses it to find its corner).

use alloc::string::String;

use crate::layout::{Envelope, LayoutError, PageLayout, Placement, Rect};
use crate::units::m2pt;

/// A 2D drawing context. Coordinates are points, origin top-left, y down.
///
/// Transforms stack the way PDF/cairo contexts do: `translate` and `scale`
/// modify the current matrix, `save`/`restore` push and pop it.
pub trait Surface {
    /// Push the current transform and drawing state.
    fn save(&mut self);
    /// Pop to the last saved transform and drawing state.
    fn restore(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn scale(&mut self, sx: f64, sy: f64);
    /// Set the color for following text and strokes, components `0.0..=1.0`.
    fn set_source_rgb(&mut self, r: f64, g: f64, b: f64);
    fn set_font(&mut self, face: &str, bold: bool, size: f64);
    /// Draw `text` with its baseline starting at `(x, y)`.
    fn show_text(&mut self, x: f64, y: f64, text: &str);
    /// Outline a rectangle.
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, line_width: f64);
}

/// Factory for page surfaces.
pub trait Backend {
    type Surface: Surface;

    /// Short name for error messages.
    fn name(&self) -> &'static str;

    /// Whether the backend can create surfaces on this system.
    fn is_available(&self) -> bool {
        true
    }

    /// Create a blank page of `width × height` points.
    fn create_page(&mut self, width: f64, height: f64) -> Self::Surface;
}

/// A map from the external rendering engine.
pub trait MapSource {
    /// Bounds of the map content in ground units.
    fn envelope(&self) -> Envelope;

    /// Spatial reference of the map, as shown in the legend.
    fn srs(&self) -> &str;

    /// Set the raster canvas the map renders into.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw the map. The surface is already translated to the map corner and
    /// scaled so that one unit is one map pixel.
    fn render(&mut self, surface: &mut dyn Surface) -> Result<(), RenderError>;
}

/// Failure reported by a map or legend collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("render failed: {message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Printing error.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    /// The page configuration or the map envelope is unusable.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The graphics backend can't be used here.
    #[error("graphics backend `{backend}` is not available")]
    UnsupportedEnvironment { backend: &'static str },
    /// Metadata was requested before any map was drawn.
    #[error("no map has been rendered on this page")]
    NoMapRendered,
    /// The map engine failed while drawing.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Renders maps onto pages laid out by a [`PageLayout`].
///
/// # Example
///
/// ```no_run
/// # use mapsheet::print::{Backend, MapSource, PagePrinter, PrintError};
/// # fn run<B: Backend, M: MapSource>(backend: B, map: &mut M) -> Result<(), PrintError> {
/// use mapsheet::{PageLayout, PageSize};
///
/// let mut printer = PagePrinter::new(PageLayout::new(PageSize::A3), backend)?;
/// let placement = printer.render_map(map)?;
/// println!("printed at 1:{:?}", placement.scale);
/// let page = printer.finish();
/// # Ok(())
/// # }
/// ```
pub struct PagePrinter<B: Backend> {
    layout: PageLayout,
    backend: B,
    surface: Option<B::Surface>,
    last: Option<Placement>,
}

impl<B: Backend> PagePrinter<B> {
    /// Create a printer. Fails once, here, when the backend is unavailable.
    pub fn new(layout: PageLayout, backend: B) -> Result<Self, PrintError> {
        if !backend.is_available() {
            return Err(PrintError::UnsupportedEnvironment {
                backend: backend.name(),
            });
        }
        Ok(Self {
            layout,
            backend,
            surface: None,
            last: None,
        })
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Lay out `map`, resize it for the configured resolution and draw it on
    /// a new page.
    ///
    /// Any page from an earlier call is dropped first, so after an error
    /// there is no page and no placement, whether layout or rendering failed.
    pub fn render_map<M: MapSource + ?Sized>(&mut self, map: &mut M) -> Result<Placement, PrintError> {
        self.surface = None;
        self.last = None;
        let placement = self.layout.compute(&map.envelope())?;

        map.resize(placement.pixels.width, placement.pixels.height);

        let (page_w, page_h) = self.layout.page.to_points();
        let mut surface = self.backend.create_page(page_w, page_h);

        let (tx, ty) = placement.offset();
        let px_to_pt = 72.0 / self.layout.resolution;
        surface.save();
        surface.translate(m2pt(tx), m2pt(ty));
        surface.scale(px_to_pt, px_to_pt);
        let drawn = map.render(&mut surface);
        surface.restore();

        drawn?;

        log::info!(
            "rendered {}x{} px map at 1:{} on {:.3}x{:.3} m page",
            placement.pixels.width,
            placement.pixels.height,
            placement.scale.unwrap_or(placement.raw_scale),
            self.layout.page.width,
            self.layout.page.height,
        );

        self.surface = Some(surface);
        self.last = Some(placement);
        Ok(placement)
    }

    /// Placement of the last successful [`render_map`](Self::render_map).
    pub fn last_placement(&self) -> Option<&Placement> {
        self.last.as_ref()
    }

    /// Printed scale of the last map, `None` before any render or when the
    /// aspect ratio was not preserved.
    pub fn scale(&self) -> Option<f64> {
        self.last.and_then(|p| p.scale)
    }

    /// Where the last map was drawn, in page meters.
    pub fn map_box(&self) -> Option<Rect> {
        self.last.map(|p| p.map_box)
    }

    /// The current page, if a map has been drawn.
    pub fn surface_mut(&mut self) -> Option<&mut B::Surface> {
        self.surface.as_mut()
    }

    /// Current page and placement together, for metadata drawing.
    pub(crate) fn page_parts(&mut self) -> Option<(&mut B::Surface, Placement)> {
        match (self.surface.as_mut(), self.last) {
            (Some(s), Some(p)) => Some((s, p)),
            _ => None,
        }
    }

    /// Hand back the finished page.
    pub fn finish(self) -> Option<B::Surface> {
        self.surface
    }
}
