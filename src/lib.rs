//! Printable map page layout: render area, scale rounding, pixel size and
//! placement of a map on a physical page.
//!
//! The geometry core is pure arithmetic: no drawing, no allocations, `no_std`
//! compatible. Drawing goes through traits implemented by the caller's map
//! engine and page surface.
//!
//! # Modules
//!
//! - [`units`]: meter/point/pixel conversions and named paper sizes
//! - [`scale`]: rounding a raw scale denominator to a readable value
//! - [`layout`]: render area, scale resolution, pixel size and centering
//! - [`print`]: page printer driving a map engine onto a drawing surface (`alloc`)
//! - [`legend`]: legend planning and drawing next to the map (`alloc`)
//! - [`svg`]: SVG surface backend and layout proof sheets (`svg`)
//! - [`query`]: page options from `key=value` query strings (`query`)
//! - [`upgrade`]: stylesheet upgrade to the 0.7.2 schema (`upgrade`)
//!
//! # Example
//!
//! ```
//! use mapsheet::{Envelope, PageLayout, PageSize};
//!
//! let layout = PageLayout::new(PageSize::A4).resolution(300.0);
//! let placement = layout.compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0)).unwrap();
//!
//! assert_eq!(placement.scale, Some(6000.0));
//! assert_eq!(placement.pixels.width, placement.pixels.height);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod layout;
pub mod scale;
pub mod units;

#[cfg(feature = "alloc")]
pub mod legend;
#[cfg(feature = "alloc")]
pub mod print;

#[cfg(feature = "query")]
pub mod query;
#[cfg(feature = "svg")]
pub mod svg;
#[cfg(feature = "upgrade")]
pub mod upgrade;

pub use layout::{
    Centering, Envelope, LayoutError, MapFit, PageLayout, PercentBox, PixelSize, Placement, Rect,
};
pub use scale::ScaleRounding;
pub use units::PageSize;

#[cfg(feature = "alloc")]
pub use legend::{LegendEntry, LegendSource, LegendSummary, SwatchRequest};
#[cfg(feature = "alloc")]
pub use print::{Backend, MapSource, PagePrinter, PrintError, RenderError, Surface};
