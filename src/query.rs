//! Page options from a query string.
//!
//! Parses strings like `page=a4l&margin=0.015&dpi=300&center=both` into a
//! [`PageLayout`], the way a print service or command line would receive them.
//!
//! # Example
//!
//! ```
//! use mapsheet::{Centering, PageSize, query};
//!
//! let result = query::parse("page=a3l&margin=0.02&center=both&dpi=150");
//! assert!(result.warnings.is_empty());
//!
//! let layout = result.options.to_layout();
//! assert_eq!(layout.page, PageSize::A3.landscape());
//! assert_eq!(layout.centering, Centering::Both);
//! assert_eq!(layout.resolution, 150.0);
//! ```
//!
//! Only layout keys are recognized; anything else produces
//! [`ParseWarning::KeyNotRecognized`]. Values that fail to parse produce
//! [`ParseWarning::ValueInvalid`] and leave the default in place.

use alloc::string::String;
use alloc::vec::Vec;

use crate::layout::{Centering, PageLayout, PercentBox, Rect};
use crate::scale::ScaleRounding;
use crate::units::PageSize;

/// Parsed page options. `None` fields keep the [`PageLayout`] default.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct PageOptions {
    /// `page`, `pagesize`: paper name (`a4`, `letterl`) or `width,height` in meters.
    pub page: Option<PageSize>,
    /// `margin`, meters.
    pub margin: Option<f64>,
    /// `box`: `x0,y0,x1,y1` in page meters.
    pub area_box: Option<Rect>,
    /// `pbox`, `percent_box`: `x0,y0,x1,y1` as page fractions.
    pub percent_box: Option<PercentBox>,
    /// `dpi`, `resolution`.
    pub resolution: Option<f64>,
    /// `aspect`, `preserve_aspect`.
    pub preserve_aspect: Option<bool>,
    /// `center`, `centering`.
    pub centering: Option<Centering>,
    /// `scale`, `rounding`: `nice` or `any`.
    pub scale_rounding: Option<ScaleRounding>,
}

impl PageOptions {
    /// Build a layout over the defaults of [`PageLayout::new`].
    pub fn to_layout(&self) -> PageLayout {
        let mut layout = PageLayout::new(self.page.unwrap_or_default());
        if let Some(m) = self.margin {
            layout.margin = m;
        }
        layout.area_box = self.area_box;
        layout.percent_box = self.percent_box;
        if let Some(dpi) = self.resolution {
            layout.resolution = dpi;
        }
        if let Some(p) = self.preserve_aspect {
            layout.preserve_aspect = p;
        }
        if let Some(c) = self.centering {
            layout.centering = c;
        }
        if let Some(r) = self.scale_rounding {
            layout.scale_rounding = r;
        }
        layout
    }
}

/// Result of parsing a page option string.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub options: PageOptions,
    /// Non-fatal parse warnings.
    pub warnings: Vec<ParseWarning>,
}

/// Non-fatal warning from option parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A key appeared more than once (last value wins).
    DuplicateKey { key: String, value: String },
    /// A key is not a page option.
    KeyNotRecognized { key: String, value: String },
    /// A key was recognized but its value could not be parsed.
    ValueInvalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Parse a page option string (with or without leading `?`).
pub fn parse(query: &str) -> ParseResult {
    let mut options = PageOptions::default();
    let mut warnings = Vec::new();

    for pair in split_query(query) {
        let (raw_key, raw_value) = split_pair(pair);
        let key = percent_decode(raw_key).to_ascii_lowercase();
        let value = percent_decode(raw_value);
        dispatch_key(&key, &value, &mut options, &mut warnings);
    }

    ParseResult { options, warnings }
}

fn dispatch_key(key: &str, value: &str, opts: &mut PageOptions, warnings: &mut Vec<ParseWarning>) {
    match key {
        "page" | "pagesize" => set_or_warn(
            &mut opts.page,
            parse_page(value),
            "page",
            value,
            "expected paper name (a4, a4l, letter, ...) or width,height in meters",
            warnings,
        ),
        "margin" => set_or_warn(
            &mut opts.margin,
            parse_f64(value).filter(|&m| m >= 0.0),
            "margin",
            value,
            "expected a non-negative number of meters",
            warnings,
        ),
        "box" => set_or_warn(
            &mut opts.area_box,
            parse_four(value).map(|[x0, y0, x1, y1]| Rect::from_corners(x0, y0, x1, y1)),
            "box",
            value,
            "expected x0,y0,x1,y1 in meters",
            warnings,
        ),
        "pbox" | "percent_box" => set_or_warn(
            &mut opts.percent_box,
            parse_four(value).map(|[x0, y0, x1, y1]| PercentBox::new(x0, y0, x1, y1)),
            "percent_box",
            value,
            "expected x0,y0,x1,y1 as fractions of the page",
            warnings,
        ),
        "dpi" | "resolution" => set_or_warn(
            &mut opts.resolution,
            parse_f64(value).filter(|&d| d > 0.0),
            "resolution",
            value,
            "expected a positive DPI value",
            warnings,
        ),
        "aspect" | "preserve_aspect" => set_or_warn(
            &mut opts.preserve_aspect,
            parse_bool(value),
            "preserve_aspect",
            value,
            "expected true|false|1|0|yes|no|on|off",
            warnings,
        ),
        "center" | "centering" => set_or_warn(
            &mut opts.centering,
            parse_centering(value),
            "centering",
            value,
            "expected none|constrained|unconstrained|vertical|horizontal|both",
            warnings,
        ),
        "scale" | "rounding" => set_or_warn(
            &mut opts.scale_rounding,
            parse_rounding(value),
            "scale",
            value,
            "expected nice|any",
            warnings,
        ),
        _ => warnings.push(ParseWarning::KeyNotRecognized {
            key: String::from(key),
            value: String::from(value),
        }),
    }
}

/// Set a field, warning on duplicates and invalid values.
fn set_or_warn<T>(
    field: &mut Option<T>,
    parsed: Option<T>,
    key: &'static str,
    value: &str,
    reason: &'static str,
    warnings: &mut Vec<ParseWarning>,
) {
    match parsed {
        Some(v) => {
            if field.is_some() {
                warnings.push(ParseWarning::DuplicateKey {
                    key: String::from(key),
                    value: String::from(value),
                });
            }
            *field = Some(v);
        }
        None => warnings.push(ParseWarning::ValueInvalid {
            key,
            value: String::from(value),
            reason,
        }),
    }
}

// ---- Value parsers ----

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Paper name, or `width,height` in meters.
fn parse_page(s: &str) -> Option<PageSize> {
    if let Some(named) = PageSize::named(s) {
        return Some(named);
    }
    let (w, h) = s.split_once(',')?;
    let w = parse_f64(w)?;
    let h = parse_f64(h)?;
    (w > 0.0 && h > 0.0).then_some(PageSize::new(w, h))
}

fn parse_centering(s: &str) -> Option<Centering> {
    match s.trim().to_ascii_lowercase().as_str() {
        "none" | "" => Some(Centering::None),
        "constrained" => Some(Centering::Constrained),
        "unconstrained" => Some(Centering::Unconstrained),
        "vertical" | "v" => Some(Centering::Vertical),
        "horizontal" | "h" => Some(Centering::Horizontal),
        "both" => Some(Centering::Both),
        _ => None,
    }
}

fn parse_rounding(s: &str) -> Option<ScaleRounding> {
    match s.trim().to_ascii_lowercase().as_str() {
        "nice" | "default" => Some(ScaleRounding::Nice),
        "any" | "exact" => Some(ScaleRounding::Any),
        _ => None,
    }
}

/// Exactly four comma-separated numbers, optionally in parentheses.
fn parse_four(s: &str) -> Option<[f64; 4]> {
    let s = s.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    Some([
        parse_f64(parts[0])?,
        parse_f64(parts[1])?,
        parse_f64(parts[2])?,
        parse_f64(parts[3])?,
    ])
}

// ---- Query string tokenizer ----

/// Split query string on '&'.
fn split_query(query: &str) -> impl Iterator<Item = &str> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query.split('&').filter(|s| !s.is_empty())
}

/// Split a single "key=value" pair on the first '='.
fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once('=').unwrap_or((pair, ""))
}

/// Percent-decode a URL component. Also handles '+' as space.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
