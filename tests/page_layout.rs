//! End-to-end layout checks: worked examples plus geometric properties over
//! random pages, envelopes and settings.

use mapsheet::layout::pixel_size;
use mapsheet::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

// ---- Worked examples ----

#[test]
fn a4_square_map() {
    let layout = PageLayout::new(PageSize::A4);
    let area = layout.render_area().unwrap();
    assert!(close(area.width, 0.19, EPS));
    assert!(close(area.height, 0.277, EPS));

    let env = Envelope::new(0.0, 0.0, 1000.0, 1000.0);
    let fit = layout.resolve_scale(&env, &area).unwrap();
    assert!((fit.raw_scale - 5263.157_894_7).abs() < 1e-6, "{}", fit.raw_scale);
    assert_eq!(fit.scale, Some(6000.0));
    assert!((fit.scale_factor - 0.877_192_98).abs() < 1e-6);
    assert!((fit.width - 0.166_666_67).abs() < 1e-6);
    assert!(close(fit.width, fit.height, EPS));
    assert!(fit.horizontally_constrained);
}

#[test]
fn constrained_wide_map_centers_horizontally_and_anchors_top() {
    let layout = PageLayout::new(PageSize::A4).centering(Centering::Constrained);
    let placement = layout
        .compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0))
        .unwrap();
    let area = placement.render_area;
    let map = placement.map_box;

    assert!(close(map.y, 0.01, EPS));
    let left = map.x - area.x;
    let right = area.right() - map.right();
    assert!(close(left, right, EPS), "{left} vs {right}");
    assert!(left > 0.0);
}

#[test]
fn tenth_of_a_meter_at_72_dpi() {
    let px = pixel_size(0.1, 0.1, 72.0).unwrap();
    assert_eq!(px, PixelSize::new(283, 283));
}

#[test]
fn a4_square_map_meta_corner_below() {
    let placement = PageLayout::new(PageSize::A4)
        .compute(&Envelope::new(0.0, 0.0, 1000.0, 1000.0))
        .unwrap();
    let (x, y) = placement.meta_corner();
    assert!(close(x, 0.01, EPS));
    assert!(close(y, placement.map_box.bottom() + 0.005, EPS));
}

#[test]
fn landscape_tall_map_meta_corner_right() {
    let placement = PageLayout::new(PageSize::A4.landscape())
        .compute(&Envelope::new(0.0, 0.0, 500.0, 1000.0))
        .unwrap();
    assert!(!placement.horizontally_constrained);
    let (x, y) = placement.meta_corner();
    assert!(close(x, placement.map_box.right() + 0.005, EPS));
    assert!(close(y, 0.01, EPS));
}

#[test]
fn percent_box_limits_area() {
    let layout = PageLayout::new(PageSize::A4).percent_box(PercentBox::new(0.0, 0.0, 0.5, 0.5));
    let area = layout.render_area().unwrap();
    assert!(close(area.x, 0.01, EPS));
    assert!(close(area.right(), 0.105, EPS));
    assert!(close(area.bottom(), 0.1485, EPS));
}

#[test]
fn configuration_errors() {
    let env = Envelope::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(
        PageLayout::new(PageSize::A4).resolution(0.0).compute(&env),
        Err(LayoutError::InvalidResolution(0.0))
    );
    assert_eq!(
        PageLayout::new(PageSize::A4).margin(0.2).compute(&env),
        Err(LayoutError::InvalidMargin { margin: 0.2 })
    );
    assert_eq!(
        PageLayout::new(PageSize::A4)
            .area_box(Rect::new(0.5, 0.5, 0.1, 0.1))
            .compute(&env),
        Err(LayoutError::EmptyRenderArea)
    );
    assert_eq!(
        PageLayout::new(PageSize::A4).compute(&Envelope::new(3.0, 3.0, 3.0, 9.0)),
        Err(LayoutError::DegenerateEnvelope)
    );
}

// ---- Properties ----

fn page() -> impl Strategy<Value = PageSize> {
    prop_oneof![
        Just(PageSize::A3),
        Just(PageSize::A4),
        Just(PageSize::A5),
        Just(PageSize::A4.landscape()),
        Just(PageSize::LETTER),
        Just(PageSize::LEGAL.landscape()),
    ]
}

fn centering() -> impl Strategy<Value = Centering> {
    prop_oneof![
        Just(Centering::None),
        Just(Centering::Constrained),
        Just(Centering::Unconstrained),
        Just(Centering::Vertical),
        Just(Centering::Horizontal),
        Just(Centering::Both),
    ]
}

fn envelope() -> impl Strategy<Value = Envelope> {
    (-1e5..1e5f64, -1e5..1e5f64, 100.0..10_000.0f64, 100.0..10_000.0f64)
        .prop_map(|(x, y, w, h)| Envelope::new(x, y, x + w, y + h))
}

proptest! {
    #[test]
    fn rounded_scale_never_below_raw(raw in 1e-6..1e12f64) {
        prop_assert!(ScaleRounding::Nice.round(raw) >= raw);
    }

    #[test]
    fn rounding_is_idempotent(raw in 1e-6..1e12f64) {
        let once = ScaleRounding::Nice.round(raw);
        let twice = ScaleRounding::Nice.round(once);
        prop_assert!(close(once, twice, 1e-12), "{} -> {} -> {}", raw, once, twice);
    }

    #[test]
    fn both_centers_exactly(page in page(), env in envelope(), margin in 0.0..0.02f64) {
        let layout = PageLayout::new(page).margin(margin).centering(Centering::Both);
        let p = layout.compute(&env).unwrap();
        let (a, m) = (p.render_area, p.map_box);
        prop_assert!(close(m.x - a.x, a.right() - m.right(), 1e-9));
        prop_assert!(close(m.y - a.y, a.bottom() - m.bottom(), 1e-9));
    }

    #[test]
    fn aspect_preserved(page in page(), env in envelope(), c in centering()) {
        let p = PageLayout::new(page).centering(c).compute(&env).unwrap();
        let (w, h) = p.footprint();
        prop_assert!(close(w / h, env.aspect(), 1e-9));
    }

    #[test]
    fn distorted_fills_area(page in page(), env in envelope(), c in centering()) {
        let p = PageLayout::new(page)
            .preserve_aspect(false)
            .centering(c)
            .compute(&env)
            .unwrap();
        prop_assert_eq!(p.map_box, p.render_area);
        prop_assert_eq!(p.scale, None);
    }

    #[test]
    fn map_stays_inside_area(
        page in page(),
        env in envelope(),
        c in centering(),
        dpi in 72.0..600.0f64,
    ) {
        let p = PageLayout::new(page).centering(c).resolution(dpi).compute(&env).unwrap();
        let (a, m) = (p.render_area, p.map_box);
        prop_assert!(m.x >= a.x - 1e-12 && m.y >= a.y - 1e-12);
        prop_assert!(m.right() <= a.right() + 1e-12 && m.bottom() <= a.bottom() + 1e-12);
        prop_assert!(p.pixels.width > 0 && p.pixels.height > 0);
    }

    #[test]
    fn binding_axis_fills_before_rounding(page in page(), env in envelope()) {
        let layout = PageLayout::new(page).scale_rounding(ScaleRounding::Any);
        let p = layout.compute(&env).unwrap();
        let (a, m) = (p.render_area, p.map_box);
        if p.horizontally_constrained {
            prop_assert!(close(m.width, a.width, 1e-9));
        } else {
            prop_assert!(close(m.height, a.height, 1e-9));
        }
    }
}
