//! Page layout computation for printed maps.
//!
//! Computes the render area, rounded scale, map footprint, raster size and
//! placement from a page description and a map envelope. Pure geometry, no
//! drawing, no allocations, `no_std` compatible.
//!
//! Page coordinates are meters from the top-left corner of the sheet, y down.
//!
//! # Example
//!
//! ```
//! use mapsheet::{Envelope, PageLayout, PageSize, PixelSize};
//!
//! let placement = PageLayout::new(PageSize::A4)
//!     .margin(0.01)
//!     .compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0))
//!     .unwrap();
//!
//! // 1:5263 is needed to fit; the printed scale rounds up to 1:6000.
//! assert_eq!(placement.scale, Some(6000.0));
//! assert_eq!(placement.pixels, PixelSize::new(472, 472));
//! ```

use crate::scale::ScaleRounding;
use crate::units::{PageSize, m2px};

/// Gap between the map and metadata placed next to it, in meters.
pub const META_GAP: f64 = 0.005;

/// Default page margin in meters.
pub const DEFAULT_MARGIN: f64 = 0.01;

/// Where to put the map when scale rounding has left it smaller than the
/// render area.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Centering {
    /// Flush with the top-left corner of the render area.
    None,
    /// Center on the constrained axis: horizontally when the map is relatively
    /// wider than the render area (a square map on a portrait page), else
    /// vertically.
    #[default]
    Constrained,
    /// Center on the axis that is not constrained.
    Unconstrained,
    /// Center vertically only.
    Vertical,
    /// Center horizontally only.
    Horizontal,
    /// Center on both axes.
    Both,
}

impl Centering {
    /// Which axes to center on, as `(horizontal, vertical)`, given whether the
    /// horizontal axis is the constrained one.
    pub fn axes(self, horizontally_constrained: bool) -> (bool, bool) {
        let hc = horizontally_constrained;
        match self {
            Self::None => (false, false),
            Self::Constrained => (hc, !hc),
            Self::Unconstrained => (!hc, hc),
            Self::Vertical => (false, true),
            Self::Horizontal => (true, false),
            Self::Both => (true, true),
        }
    }
}

/// Axis-aligned rectangle in page coordinates (meters).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rect from its top-left corner and size.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rect from two opposite corners, in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(left, top, right - left, bottom - top)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Width over height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Whether both dimensions are positive.
    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Overlap of two rects. `None` when they don't overlap with positive area.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let r = Rect::new(x0, y0, x1 - x0, y1 - y0);
        r.is_positive().then_some(r)
    }
}

/// A render box given as fractions (`0.0..=1.0`) of the page size.
///
/// `x0, y0` is one corner and `x1, y1` the opposite corner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PercentBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PercentBox {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Resolve to page meters. Fractions are clamped to `0.0..=1.0`.
    pub fn resolve(&self, page: PageSize) -> Rect {
        Rect::from_corners(
            self.x0.clamp(0.0, 1.0) * page.width,
            self.y0.clamp(0.0, 1.0) * page.height,
            self.x1.clamp(0.0, 1.0) * page.width,
            self.y1.clamp(0.0, 1.0) * page.height,
        )
    }
}

/// Bounding box of map content in ground units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Envelope {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Envelope {
    /// Create an envelope from two opposite corners, in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            minx: x0.min(x1),
            miny: y0.min(y1),
            maxx: x0.max(x1),
            maxy: y0.max(y1),
        }
    }

    /// Envelope of a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Width over height.
    pub fn aspect(&self) -> f64 {
        self.width() / self.height()
    }

    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.minx + self.maxx) / 2.0,
            (self.miny + self.maxy) / 2.0,
        )
    }

    /// True for points, lines along an axis, and non-finite envelopes:
    /// anything without a usable width and height.
    pub fn is_degenerate(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
    }

    /// Grow (or shrink) around the center by `factor` on both axes.
    pub fn expand(&self, factor: f64) -> Self {
        let (cx, cy) = self.center();
        let hw = self.width() * factor / 2.0;
        let hh = self.height() * factor / 2.0;
        Self::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }
}

/// Raster dimensions in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Page layout settings.
///
/// Describes the sheet, the part of it the map may use, how to round the map
/// scale and where to put the map when rounding leaves it smaller than the
/// space available.
///
/// # Example
///
/// ```
/// use mapsheet::{Centering, Envelope, PageLayout, PageSize, PercentBox};
///
/// let placement = PageLayout::new(PageSize::A3.landscape())
///     .margin(0.015)
///     .percent_box(PercentBox::new(0.0, 0.0, 0.75, 1.0))
///     .centering(Centering::Both)
///     .resolution(300.0)
///     .compute(&Envelope::new(500_000.0, 6_000_000.0, 540_000.0, 6_030_000.0))
///     .unwrap();
///
/// assert!(placement.map_box.right() <= 0.75 * 0.420 + 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    pub page: PageSize,
    /// Margin on every side, in meters.
    pub margin: f64,
    /// Box to render into, in page meters. Intersected with the margins.
    pub area_box: Option<Rect>,
    /// Box as page fractions. Takes precedence over `area_box`.
    pub percent_box: Option<PercentBox>,
    pub centering: Centering,
    /// Raster resolution for the map, in DPI.
    pub resolution: f64,
    /// Keep the map's aspect ratio. Without it there is no single scale.
    pub preserve_aspect: bool,
    pub scale_rounding: ScaleRounding,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::new(PageSize::A4)
    }
}

impl PageLayout {
    /// Layout for `page` with the default margin, 72 DPI, nice scale rounding,
    /// preserved aspect and constrained centering.
    pub fn new(page: PageSize) -> Self {
        Self {
            page,
            margin: DEFAULT_MARGIN,
            area_box: None,
            percent_box: None,
            centering: Centering::Constrained,
            resolution: crate::units::DPI_72,
            preserve_aspect: true,
            scale_rounding: ScaleRounding::Nice,
        }
    }

    /// Set the page margin in meters.
    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Restrict the map to a box in page meters (never over the margin).
    pub fn area_box(mut self, area: Rect) -> Self {
        self.area_box = Some(area);
        self
    }

    /// Restrict the map to a box given as page fractions.
    ///
    /// Wins over [`area_box`](Self::area_box) when both are set.
    pub fn percent_box(mut self, area: PercentBox) -> Self {
        self.percent_box = Some(area);
        self
    }

    /// Set the centering rule.
    pub fn centering(mut self, centering: Centering) -> Self {
        self.centering = centering;
        self
    }

    /// Set the raster resolution in DPI.
    pub fn resolution(mut self, dpi: f64) -> Self {
        self.resolution = dpi;
        self
    }

    /// Whether to preserve the map aspect ratio.
    pub fn preserve_aspect(mut self, preserve: bool) -> Self {
        self.preserve_aspect = preserve;
        self
    }

    /// Set the scale rounding policy.
    pub fn scale_rounding(mut self, rounding: ScaleRounding) -> Self {
        self.scale_rounding = rounding;
        self
    }

    /// The box configured for the map, in page meters, if any.
    pub fn resolved_box(&self) -> Option<Rect> {
        match (self.percent_box, self.area_box) {
            (Some(pb), _) => Some(pb.resolve(self.page)),
            (None, area) => area,
        }
    }

    /// Area of the page the map may use: the page inset by the margin,
    /// intersected with the configured box.
    pub fn render_area(&self) -> Result<Rect, LayoutError> {
        let short_edge = self.page.width.min(self.page.height);
        if !(self.margin >= 0.0 && self.margin * 2.0 < short_edge) {
            return Err(LayoutError::InvalidMargin {
                margin: self.margin,
            });
        }
        let inset = Rect::new(
            self.margin,
            self.margin,
            self.page.width - 2.0 * self.margin,
            self.page.height - 2.0 * self.margin,
        );
        let area = match self.resolved_box() {
            Some(b) => inset.intersect(&b),
            None => inset.is_positive().then_some(inset),
        };
        area.ok_or(LayoutError::EmptyRenderArea)
    }

    /// Work out the scale and footprint for `envelope` drawn into `area`.
    pub fn resolve_scale(&self, envelope: &Envelope, area: &Rect) -> Result<MapFit, LayoutError> {
        if envelope.is_degenerate() {
            return Err(LayoutError::DegenerateEnvelope);
        }
        if !area.is_positive() {
            return Err(LayoutError::EmptyRenderArea);
        }

        let scale_x = envelope.width() / area.width;
        let scale_y = envelope.height() / area.height;
        let raw = scale_x.max(scale_y);

        let rounded = if self.preserve_aspect {
            self.scale_rounding.round(raw)
        } else {
            raw
        };
        let scale_factor = raw / rounded;

        let horizontally_constrained = is_horizontally_constrained(envelope, area);
        let mut width = area.width * scale_factor;
        let mut height = area.height * scale_factor;
        if self.preserve_aspect {
            let map_aspect = envelope.aspect();
            if horizontally_constrained {
                height = width / map_aspect;
            } else {
                width = height * map_aspect;
            }
        }

        Ok(MapFit {
            raw_scale: raw,
            scale: self.preserve_aspect.then_some(rounded),
            scale_factor,
            width,
            height,
            horizontally_constrained,
        })
    }

    /// Raster size for a footprint of `width × height` page meters at the
    /// configured resolution.
    pub fn pixel_size(&self, width: f64, height: f64) -> Result<PixelSize, LayoutError> {
        pixel_size(width, height, self.resolution)
    }

    /// Top-left corner for a footprint of `width × height` inside `area`,
    /// following the centering rule.
    pub fn corner(
        &self,
        width: f64,
        height: f64,
        area: &Rect,
        horizontally_constrained: bool,
    ) -> (f64, f64) {
        let (center_h, center_v) = self.centering.axes(horizontally_constrained);
        let x = if center_h {
            area.x + (area.width - width) / 2.0
        } else {
            area.x
        };
        let y = if center_v {
            area.y + (area.height - height) / 2.0
        } else {
            area.y
        };
        (x, y)
    }

    /// Compute the full placement of a map with the given envelope.
    pub fn compute(&self, envelope: &Envelope) -> Result<Placement, LayoutError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(LayoutError::InvalidResolution(self.resolution));
        }

        // Step 1: usable area.
        let area = self.render_area()?;

        // Step 2: scale and footprint.
        let fit = self.resolve_scale(envelope, &area)?;

        // Step 3: raster size.
        let pixels = self.pixel_size(fit.width, fit.height)?;

        // Step 4: placement.
        let (x, y) = self.corner(fit.width, fit.height, &area, fit.horizontally_constrained);

        log::debug!(
            "layout: area {:.4}x{:.4} m, scale 1:{:.1} -> {:?}, map {:.4}x{:.4} m at ({:.4}, {:.4}), {}x{} px",
            area.width,
            area.height,
            fit.raw_scale,
            fit.scale,
            fit.width,
            fit.height,
            x,
            y,
            pixels.width,
            pixels.height,
        );

        Ok(Placement {
            page: self.page,
            render_area: area,
            map_box: Rect::new(x, y, fit.width, fit.height),
            pixels,
            raw_scale: fit.raw_scale,
            scale: fit.scale,
            horizontally_constrained: fit.horizontally_constrained,
        })
    }
}

/// Scale and footprint of a map inside a render area.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapFit {
    /// Scale needed to fit the envelope exactly on the binding axis.
    pub raw_scale: f64,
    /// Rounded scale. `None` when aspect is not preserved.
    pub scale: Option<f64>,
    /// `raw_scale / rounded`, at most 1.
    pub scale_factor: f64,
    /// Footprint width in page meters.
    pub width: f64,
    /// Footprint height in page meters.
    pub height: f64,
    /// The horizontal axis is the binding one.
    pub horizontally_constrained: bool,
}

/// Computed placement of a map on a page.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    pub page: PageSize,
    /// Area the map was fitted into.
    pub render_area: Rect,
    /// Where the map is drawn, in page meters.
    pub map_box: Rect,
    /// Raster size to request from the renderer.
    pub pixels: PixelSize,
    /// Scale needed before rounding.
    pub raw_scale: f64,
    /// Printed `1:x` scale. `None` when aspect is not preserved.
    pub scale: Option<f64>,
    /// The horizontal axis is the binding one.
    pub horizontally_constrained: bool,
}

impl Placement {
    /// Top-left corner of the map, page meters.
    pub fn offset(&self) -> (f64, f64) {
        (self.map_box.x, self.map_box.y)
    }

    /// Footprint of the map, page meters.
    pub fn footprint(&self) -> (f64, f64) {
        (self.map_box.width, self.map_box.height)
    }

    /// A spot next to the map for a legend or scale text.
    ///
    /// Below the map at the render area's left edge when the horizontal axis
    /// is constrained (the free space is underneath), otherwise right of the
    /// map at the render area's top edge.
    pub fn meta_corner(&self) -> (f64, f64) {
        meta_corner(&self.render_area, &self.map_box, self.horizontally_constrained)
    }
}

/// Layout computation error. Every variant is a configuration error.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// Resolution is zero, negative or not a number.
    #[error("resolution must be a positive DPI value, got {0}")]
    InvalidResolution(f64),
    /// Margin is negative or eats the whole page.
    #[error("margin of {margin} m must be non-negative and under half the shorter page edge")]
    InvalidMargin { margin: f64 },
    /// Nothing left of the page after margins and box.
    #[error("render area is empty after applying margins and box")]
    EmptyRenderArea,
    /// Map envelope has zero width or height, so no scale can be derived.
    #[error("map envelope has zero width or height")]
    DegenerateEnvelope,
    /// Footprint rounds to zero pixels at the configured resolution.
    #[error("map footprint is smaller than one pixel at {dpi} DPI")]
    ZeroPixelSize { dpi: f64 },
    /// Footprint needs more pixels than a raster dimension can hold.
    #[error("map footprint exceeds the largest raster size at {dpi} DPI")]
    PixelSizeTooLarge { dpi: f64 },
}

impl LayoutError {
    /// All layout errors come from the page configuration or its inputs.
    pub fn is_config_error(&self) -> bool {
        true
    }
}

// ============================================================================
// Internal geometry
// ============================================================================

/// The map is relatively wider than the area, so width binds.
pub fn is_horizontally_constrained(envelope: &Envelope, area: &Rect) -> bool {
    envelope.aspect() > area.aspect()
}

/// Convert a footprint in page meters to pixels at `dpi`, truncating.
pub fn pixel_size(width: f64, height: f64, dpi: f64) -> Result<PixelSize, LayoutError> {
    if !(dpi.is_finite() && dpi > 0.0) {
        return Err(LayoutError::InvalidResolution(dpi));
    }
    let (w, h) = (m2px(width, dpi), m2px(height, dpi));
    if !(w <= u32::MAX as f64 && h <= u32::MAX as f64) {
        return Err(LayoutError::PixelSizeTooLarge { dpi });
    }
    let (w, h) = (w as u32, h as u32);
    if w == 0 || h == 0 {
        return Err(LayoutError::ZeroPixelSize { dpi });
    }
    Ok(PixelSize::new(w, h))
}

fn meta_corner(area: &Rect, map_box: &Rect, horizontally_constrained: bool) -> (f64, f64) {
    if horizontally_constrained {
        (area.x, map_box.bottom() + META_GAP)
    } else {
        (map_box.right() + META_GAP, area.y)
    }
}
