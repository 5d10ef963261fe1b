//! Page units, resolutions, and paper sizes.
//!
//! All page geometry in this crate is in meters. Drawing surfaces work in
//! PostScript points (1/72 inch); rasters work in pixels at a resolution in DPI.
//!
//! ```
//! use mapsheet::units::{self, PageSize};
//!
//! assert_eq!(units::m2px(0.1, units::DPI_72) as u32, 283);
//! assert_eq!(PageSize::named("a4l"), Some(PageSize::A4.landscape()));
//! ```

/// Meters per inch.
pub const METERS_PER_INCH: f64 = 0.0254;

/// Size of a PostScript point in meters.
pub const POINT_SIZE: f64 = METERS_PER_INCH / 72.0;

/// 72 DPI, the native resolution of PDF surfaces.
pub const DPI_72: f64 = 72.0;
/// 150 DPI.
pub const DPI_150: f64 = 150.0;
/// 300 DPI.
pub const DPI_300: f64 = 300.0;
/// 600 DPI.
pub const DPI_600: f64 = 600.0;

/// Convert a distance from meters to points.
#[inline]
pub fn m2pt(meters: f64) -> f64 {
    meters / POINT_SIZE
}

/// Convert a distance from points to meters.
#[inline]
pub fn pt2m(points: f64) -> f64 {
    points * POINT_SIZE
}

/// Convert a distance from meters to inches.
#[inline]
pub fn m2in(meters: f64) -> f64 {
    meters / METERS_PER_INCH
}

/// Convert a distance from meters to (fractional) pixels at `dpi`.
#[inline]
pub fn m2px(meters: f64, dpi: f64) -> f64 {
    m2in(meters) * dpi
}

/// Physical page dimensions in meters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PageSize {
    /// Page width in meters.
    pub width: f64,
    /// Page height in meters.
    pub height: f64,
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

macro_rules! page_sizes {
    ($($name:ident = ($w:expr, $h:expr), $key:literal;)*) => {
        impl PageSize {
            $(
                #[doc = concat!("Portrait `", $key, "`.")]
                pub const $name: Self = Self::new($w, $h);
            )*
        }

        /// Lookup table for [`PageSize::named`]. Portrait sizes only.
        const NAMED: &[(&str, PageSize)] = &[$(($key, PageSize::$name),)*];
    };
}

page_sizes! {
    A0 = (0.841, 1.189), "a0";
    B0 = (1.000, 1.414), "b0";
    C0 = (0.917, 1.297), "c0";
    A1 = (0.594, 0.841), "a1";
    B1 = (0.707, 1.000), "b1";
    C1 = (0.648, 0.917), "c1";
    A2 = (0.420, 0.594), "a2";
    B2 = (0.500, 0.707), "b2";
    C2 = (0.458, 0.648), "c2";
    A3 = (0.297, 0.420), "a3";
    B3 = (0.353, 0.500), "b3";
    C3 = (0.324, 0.458), "c3";
    A4 = (0.210, 0.297), "a4";
    B4 = (0.250, 0.353), "b4";
    C4 = (0.229, 0.324), "c4";
    A5 = (0.148, 0.210), "a5";
    B5 = (0.176, 0.250), "b5";
    C5 = (0.162, 0.229), "c5";
    A6 = (0.105, 0.148), "a6";
    B6 = (0.125, 0.176), "b6";
    C6 = (0.114, 0.162), "c6";
    A7 = (0.074, 0.105), "a7";
    B7 = (0.088, 0.125), "b7";
    C7 = (0.081, 0.114), "c7";
    A8 = (0.052, 0.074), "a8";
    B8 = (0.062, 0.088), "b8";
    C8 = (0.057, 0.081), "c8";
    A9 = (0.037, 0.052), "a9";
    B9 = (0.044, 0.062), "b9";
    C9 = (0.040, 0.057), "c9";
    A10 = (0.026, 0.037), "a10";
    B10 = (0.031, 0.044), "b10";
    C10 = (0.028, 0.040), "c10";
    LETTER = (0.216, 0.279), "letter";
    LEGAL = (0.216, 0.356), "legal";
}

impl PageSize {
    /// Create a page size from width and height in meters.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The same sheet turned sideways (long edge horizontal).
    pub const fn landscape(self) -> Self {
        if self.width >= self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }

    /// The same sheet with the long edge vertical.
    pub const fn portrait(self) -> Self {
        if self.width <= self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }

    /// Whether the page is wider than it is tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Size in points, as drawing surfaces want it.
    pub fn to_points(self) -> (f64, f64) {
        (m2pt(self.width), m2pt(self.height))
    }

    /// Look up a named paper size, case-insensitively.
    ///
    /// A trailing `l` selects landscape: `"a4"` is portrait, `"a4l"` landscape.
    /// `"letterl"` and `"legall"` work the same way.
    pub fn named(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(size) = lookup(name) {
            return Some(size);
        }
        let stem = name
            .strip_suffix('l')
            .or_else(|| name.strip_suffix('L'))?;
        lookup(stem).map(Self::landscape)
    }
}

fn lookup(name: &str) -> Option<PageSize> {
    NAMED
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|&(_, size)| size)
}
