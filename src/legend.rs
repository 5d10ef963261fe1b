//! Legend assembly next to a printed map.
//!
//! The legend is laid out in two steps. [`plan_legend`] turns the map's style
//! rules into positioned text and swatch items (pure, in points relative to
//! the legend corner). [`PagePrinter::render_legend`] then draws the plan at
//! the placement's metadata corner, asking the map engine for each swatch.
//!
//! Legend assembly is best-effort: rules with no feature to show are left out,
//! and swatches the engine fails to draw are skipped without aborting the rest.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::layout::Envelope;
use crate::print::{Backend, MapSource, PagePrinter, PrintError, RenderError, Surface};
use crate::units::m2pt;

/// Font used for all legend text.
pub const FONT_FACE: &str = "Georgia";
/// Swatch width on the page, meters.
pub const SWATCH_WIDTH: f64 = 0.02;
/// Swatch height on the page, meters.
pub const SWATCH_HEIGHT: f64 = 0.01;
/// Left edge of swatch labels, meters.
pub const LABEL_X: f64 = 0.025;
/// Growth of a feature envelope when zooming a swatch onto it.
pub const SWATCH_ZOOM: f64 = 1.1;

const SCALE_FONT: f64 = 10.0;
const SRS_FONT: f64 = 6.0;
const HEADER_FONT: f64 = 12.0;
/// Rows below the header are this many points apart per line.
const ROW_PITCH: f64 = 12.0;
/// Lines taken by one swatch row.
const SWATCH_LINES: f64 = 2.5;
const FRAME_GREY: f64 = 0.5;
const FRAME_WIDTH: f64 = 1.0;

/// One style rule of the map, as a legend candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    /// Style name.
    pub style: String,
    /// Rule name within the style.
    pub rule: String,
    /// Number of rules in the style. Single-rule styles are labelled by style
    /// name alone.
    pub rules_in_style: usize,
    /// Envelope of the first feature the rule applies to. `None` when the
    /// layer has no matching feature with geometry.
    pub feature: Option<Envelope>,
}

/// What the map engine is asked to draw for one swatch.
#[derive(Clone, Debug, PartialEq)]
pub struct SwatchRequest<'a> {
    pub entry: &'a LegendEntry,
    /// Area of the map to show.
    pub zoom: Envelope,
    /// The feature had no extent. Draw its symbol at the origin instead, using
    /// the map's own reference system, with `zoom` centered on the origin.
    pub synthetic_point: bool,
    /// Swatch raster size.
    pub width: u32,
    pub height: u32,
}

/// A map that can enumerate and draw its legend.
pub trait LegendSource: MapSource {
    /// All (style, rule) pairs of all layers, in drawing order.
    fn legend_entries(&self) -> Vec<LegendEntry>;

    /// Draw a miniature of one rule. The surface is translated to the swatch
    /// corner; one unit is one swatch pixel.
    fn render_swatch(&self, request: &SwatchRequest<'_>, surface: &mut dyn Surface) -> Result<(), RenderError>;
}

/// A line of legend text, in points relative to the legend corner.
#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub x: f64,
    /// Baseline.
    pub y: f64,
    pub size: f64,
    pub text: String,
}

/// A swatch row.
#[derive(Clone, Debug, PartialEq)]
pub struct SwatchItem {
    /// Index into the entries given to [`plan_legend`].
    pub entry: usize,
    /// Top of the swatch, points.
    pub y: f64,
    pub zoom: Envelope,
    pub synthetic_point: bool,
    pub label: TextItem,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LegendItem {
    Text(TextItem),
    Swatch(SwatchItem),
}

/// Positioned legend content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegendPlan {
    pub items: Vec<LegendItem>,
    /// Entries left out because no feature could represent them.
    pub skipped: Vec<usize>,
}

/// Swatch raster size in pixels (one pixel per point).
pub fn swatch_size() -> (u32, u32) {
    (m2pt(SWATCH_WIDTH) as u32, m2pt(SWATCH_HEIGHT) as u32)
}

/// Area a swatch zooms to for a feature envelope, and whether the feature
/// has to be drawn as a synthetic point.
pub fn swatch_zoom(feature: &Envelope) -> (Envelope, bool) {
    if feature.is_degenerate() {
        (Envelope::new(-1.0, -1.0, 1.0, 1.0), true)
    } else {
        (feature.expand(SWATCH_ZOOM), false)
    }
}

/// Lay out the legend.
///
/// `scale` is printed as `SCALE 1:<n>` only when it is known and `show_scale`
/// is set; a map drawn with a distorted aspect has no scale.
pub fn plan_legend(
    entries: &[LegendEntry],
    scale: Option<f64>,
    show_scale: bool,
    srs: &str,
) -> LegendPlan {
    let mut plan = LegendPlan::default();
    let mut line = 1.0;

    if let (Some(scale), true) = (scale, show_scale) {
        plan.items.push(LegendItem::Text(TextItem {
            x: 0.0,
            y: line * SCALE_FONT,
            size: SCALE_FONT,
            text: format!("SCALE 1:{}", scale as u64),
        }));
        line += 1.0;
    }

    plan.items.push(LegendItem::Text(TextItem {
        x: 0.0,
        y: (line - 1.0) * SCALE_FONT + SRS_FONT,
        size: SRS_FONT,
        text: format!("SRS: {srs}"),
    }));
    line += 1.0;

    let label_drop = m2pt(SWATCH_HEIGHT) / 2.0 + SRS_FONT;
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
    let mut have_header = false;
    for (i, entry) in entries.iter().enumerate() {
        if seen.contains(&(entry.style.as_str(), entry.rule.as_str())) {
            continue;
        }
        let Some(feature) = entry.feature else {
            log::warn!(
                "no feature with geometry for legend rule {}:{}",
                entry.style,
                entry.rule
            );
            plan.skipped.push(i);
            continue;
        };
        seen.insert((entry.style.as_str(), entry.rule.as_str()));

        if !have_header {
            plan.items.push(LegendItem::Text(TextItem {
                x: 0.0,
                y: line * ROW_PITCH,
                size: HEADER_FONT,
                text: String::from("LEGEND:"),
            }));
            line += 1.0;
            have_header = true;
        }

        let (zoom, synthetic_point) = swatch_zoom(&feature);
        let top = line * ROW_PITCH;
        let text = if entry.rules_in_style == 1 {
            entry.style.clone()
        } else {
            format!("{}: {}", entry.style, entry.rule)
        };
        plan.items.push(LegendItem::Swatch(SwatchItem {
            entry: i,
            y: top,
            zoom,
            synthetic_point,
            label: TextItem {
                x: m2pt(LABEL_X),
                y: top + label_drop,
                size: HEADER_FONT,
                text,
            },
        }));
        line += SWATCH_LINES;
    }

    plan
}

/// Outcome of drawing a legend.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LegendSummary {
    /// Swatches drawn.
    pub drawn: usize,
    /// Entries with no feature plus swatches that failed to render.
    pub skipped: usize,
}

impl<B: Backend> PagePrinter<B> {
    /// Draw the scale, reference system and a legend for `map` next to the
    /// map drawn by the last [`render_map`](Self::render_map).
    pub fn render_legend<M: LegendSource + ?Sized>(
        &mut self,
        map: &M,
        show_scale: bool,
    ) -> Result<LegendSummary, PrintError> {
        let (surface, placement) = self.page_parts().ok_or(PrintError::NoMapRendered)?;

        let entries = map.legend_entries();
        let plan = plan_legend(&entries, placement.scale, show_scale, map.srs());
        let (swatch_w, swatch_h) = swatch_size();
        let mut summary = LegendSummary {
            drawn: 0,
            skipped: plan.skipped.len(),
        };

        let (cx, cy) = placement.meta_corner();
        surface.save();
        surface.translate(m2pt(cx), m2pt(cy));
        surface.set_source_rgb(0.0, 0.0, 0.0);

        for item in &plan.items {
            match item {
                LegendItem::Text(text) => draw_text(surface, text),
                LegendItem::Swatch(swatch) => {
                    let request = SwatchRequest {
                        entry: &entries[swatch.entry],
                        zoom: swatch.zoom,
                        synthetic_point: swatch.synthetic_point,
                        width: swatch_w,
                        height: swatch_h,
                    };
                    surface.save();
                    surface.translate(0.0, swatch.y);
                    // The engine may leave a clip behind; keep it inside its own save.
                    surface.save();
                    let drawn = map.render_swatch(&request, surface);
                    surface.restore();
                    if let Err(e) = drawn {
                        surface.restore();
                        log::warn!(
                            "skipping legend swatch for {}:{}: {e}",
                            request.entry.style,
                            request.entry.rule
                        );
                        summary.skipped += 1;
                        continue;
                    }
                    surface.set_source_rgb(FRAME_GREY, FRAME_GREY, FRAME_GREY);
                    surface.stroke_rect(0.0, 0.0, swatch_w as f64, swatch_h as f64, FRAME_WIDTH);
                    surface.restore();

                    surface.set_source_rgb(0.0, 0.0, 0.0);
                    draw_text(surface, &swatch.label);
                    summary.drawn += 1;
                }
            }
        }

        surface.restore();
        log::info!(
            "legend: {} swatches drawn, {} skipped",
            summary.drawn,
            summary.skipped
        );
        Ok(summary)
    }
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, text: &TextItem) {
    surface.set_font(FONT_FACE, true, text.size);
    surface.show_text(text.x, text.y, &text.text);
}
