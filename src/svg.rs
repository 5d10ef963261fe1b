//! SVG output: a drawing surface backend and a layout proof sheet.
//!
//! [`SvgBackend`] plugs into [`PagePrinter`](crate::print::PagePrinter) where a
//! PDF surface would, producing an SVG document sized in points.
//! [`render_page_svg`] draws a proof of a computed [`Placement`]: page, render
//! area, map box and the metadata corner.
//!
//! # Example
//!
//! ```
//! use mapsheet::{Envelope, PageLayout, PageSize, svg::render_page_svg};
//!
//! let layout = PageLayout::new(PageSize::A4);
//! let placement = layout.compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0)).unwrap();
//!
//! let svg = render_page_svg(&layout, &placement);
//! assert!(svg.contains("1:6000"));
//! ```

use std::fmt::Write as _;

use crate::layout::{PageLayout, Placement, Rect};
use crate::print::{Backend, Surface};
use crate::units::m2pt;

/// Backend producing [`SvgSurface`] pages.
#[derive(Copy, Clone, Debug, Default)]
pub struct SvgBackend;

impl Backend for SvgBackend {
    type Surface = SvgSurface;

    fn name(&self) -> &'static str {
        "svg"
    }

    fn create_page(&mut self, width: f64, height: f64) -> SvgSurface {
        SvgSurface::new(width, height)
    }
}

/// Transform and paint state saved by [`Surface::save`].
#[derive(Clone, Debug)]
struct State {
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
    rgb: (f64, f64, f64),
    font: String,
    bold: bool,
    font_size: f64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
            rgb: (0.0, 0.0, 0.0),
            font: String::from("sans-serif"),
            bold: false,
            font_size: 10.0,
        }
    }
}

impl State {
    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (self.tx + x * self.sx, self.ty + y * self.sy)
    }

    fn color(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.rgb.0), c(self.rgb.1), c(self.rgb.2))
    }
}

/// A page recorded as SVG elements. Units are points.
#[derive(Clone, Debug)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    state: State,
    stack: Vec<State>,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            state: State::default(),
            stack: Vec::new(),
            body: String::with_capacity(1024),
        }
    }

    /// Page size in points.
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Fill a rectangle with the current color.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let (x0, y0) = self.state.map(x, y);
        let (x1, y1) = self.state.map(x + width, y + height);
        let _ = writeln!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x0.min(x1),
            y0.min(y1),
            (x1 - x0).abs(),
            (y1 - y0).abs(),
            self.state.color()
        );
    }

    /// Complete SVG document.
    pub fn finish(self) -> String {
        let mut svg = String::with_capacity(self.body.len() + 256);
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.2}pt" height="{h:.2}pt" viewBox="0 0 {w:.2} {h:.2}">"#,
            w = self.width,
            h = self.height
        );
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

impl Surface for SvgSurface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        } else {
            log::warn!("svg surface: restore without matching save");
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.tx += dx * self.state.sx;
        self.state.ty += dy * self.state.sy;
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.sx *= sx;
        self.state.sy *= sy;
    }

    fn set_source_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.state.rgb = (r, g, b);
    }

    fn set_font(&mut self, face: &str, bold: bool, size: f64) {
        self.state.font = String::from(face);
        self.state.bold = bold;
        self.state.font_size = size;
    }

    fn show_text(&mut self, x: f64, y: f64, text: &str) {
        let (px, py) = self.state.map(x, y);
        let _ = writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.2}" font-weight="{}" fill="{}">{}</text>"#,
            px,
            py,
            escape_xml(&self.state.font),
            self.state.font_size * self.state.sy.abs(),
            if self.state.bold { "bold" } else { "normal" },
            self.state.color(),
            escape_xml(text)
        );
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, line_width: f64) {
        let (x0, y0) = self.state.map(x, y);
        let (x1, y1) = self.state.map(x + width, y + height);
        let _ = writeln!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="{}" stroke-width="{:.2}"/>"#,
            x0.min(x1),
            y0.min(y1),
            (x1 - x0).abs(),
            (y1 - y0).abs(),
            self.state.color(),
            line_width * self.state.sx.abs()
        );
    }
}

/// Render a proof sheet of `placement` on the page of `layout`.
///
/// Everything is drawn at page size in points: the sheet, the render area
/// (dashed), the map box, and a marker at the metadata corner. The caption
/// lists scale, raster size and resolution.
pub fn render_page_svg(layout: &PageLayout, placement: &Placement) -> String {
    let (w, h) = placement.page.to_points();
    let mut svg = String::with_capacity(2048);

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.2}pt" height="{h:.2}pt" viewBox="0 0 {w:.2} {h:.2}">"#
    );

    // Light/dark mode via prefers-color-scheme
    svg.push_str(
        r##"<style>
  text { font-family: "Consolas", "DejaVu Sans Mono", "Courier New", monospace; }
  .caption { font-size: 7px; fill: #333; }
  .page { fill: #ffffff; stroke: #999; stroke-width: 0.5; }
  .area { fill: none; stroke: #999; stroke-width: 0.5; stroke-dasharray: 3,2; }
  .map { fill: #6ba3d6; stroke: #2c6faa; stroke-width: 0.75; }
  .meta { fill: #d67a6b; }
  @media (prefers-color-scheme: dark) {
    .caption { fill: #e0e0e0; }
    .page { fill: #2d2d2d; stroke: #555; }
    .area { stroke: #777; }
    .map { fill: #3a72a4; stroke: #5a9fd4; }
    .meta { fill: #a4503a; }
  }
</style>
"##,
    );

    push_rect(&mut svg, &Rect::new(0.0, 0.0, placement.page.width, placement.page.height), "page");
    push_rect(&mut svg, &placement.render_area, "area");
    push_rect(&mut svg, &placement.map_box, "map");

    let (mx, my) = placement.meta_corner();
    let _ = writeln!(
        svg,
        r#"<circle cx="{:.2}" cy="{:.2}" r="2" class="meta"/>"#,
        m2pt(mx),
        m2pt(my)
    );

    let scale = match placement.scale {
        Some(s) => format!("1:{}", s as u64),
        None => String::from("distorted"),
    };
    let caption = format!(
        "{scale}  {}×{} px @ {} dpi",
        placement.pixels.width, placement.pixels.height, layout.resolution
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" class="caption">{}</text>"#,
        m2pt(placement.render_area.x),
        h - 3.0,
        escape_xml(&caption)
    );

    svg.push_str("</svg>\n");
    svg
}

fn push_rect(svg: &mut String, r: &Rect, class: &str) {
    let _ = writeln!(
        svg,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" class="{class}"/>"#,
        m2pt(r.x),
        m2pt(r.y),
        m2pt(r.width),
        m2pt(r.height)
    );
}

/// Escape special characters for XML text content.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, PageSize};

    #[test]
    fn surface_transforms_stack() {
        let mut s = SvgSurface::new(100.0, 100.0);
        s.save();
        s.translate(10.0, 20.0);
        s.scale(0.5, 0.5);
        s.stroke_rect(0.0, 0.0, 40.0, 20.0, 2.0);
        s.restore();
        s.show_text(5.0, 6.0, "a<b");
        let svg = s.finish();
        assert!(svg.contains(r#"x="10.00" y="20.00" width="20.00" height="10.00""#));
        assert!(svg.contains(r#"stroke-width="1.00""#));
        assert!(svg.contains(r#"x="5.00" y="6.00""#));
        assert!(svg.contains("a&lt;b"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn surface_colors() {
        let mut s = SvgSurface::new(10.0, 10.0);
        s.set_source_rgb(0.5, 0.5, 0.5);
        s.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert!(s.finish().contains(r##"fill="#808080""##));
    }

    #[test]
    fn unbalanced_restore_is_harmless() {
        let mut s = SvgSurface::new(10.0, 10.0);
        s.restore();
        s.translate(1.0, 1.0);
        s.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert!(s.finish().contains(r#"x="1.00" y="1.00""#));
    }

    #[test]
    fn proof_sheet_shows_scale_and_pixels() {
        let layout = PageLayout::new(PageSize::A4);
        let placement = layout
            .compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0))
            .unwrap();
        let svg = render_page_svg(&layout, &placement);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("1:6000"));
        assert!(svg.contains("472×472 px @ 72 dpi"));
        assert!(svg.contains(r#"class="map""#));
        assert!(svg.contains(r#"class="meta""#));
    }

    #[test]
    fn proof_sheet_distorted() {
        let layout = PageLayout::new(PageSize::A5).preserve_aspect(false);
        let placement = layout
            .compute(&Envelope::new(0.0, 0.0, 30.0, 10.0))
            .unwrap();
        assert!(render_page_svg(&layout, &placement).contains("distorted"));
    }
}
