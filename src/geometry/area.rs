//! Spherical area computation and size classification.
//!
//! The classifier decides how a region is tessellated: small regions go
//! straight to ear clipping, larger ones are decomposed into grid cells first
//! so the triangulator never sees a country-scale concave boundary in one
//! piece.

use crate::geometry::grid::unwrap_if_antimeridian;
use crate::geometry::types::{RingSet, SizeClass, TessellationMethod};
use geo::ChamberlainDuquetteArea;
use geo_types::Polygon;

/// Upper bound of the small tier in km².
pub const SMALL_MAX_KM2: f64 = 200_000.0;

/// Lower bound of the very-large tier in km².
pub const VERY_LARGE_MIN_KM2: f64 = 1_000_000.0;

/// Spherical surface area of the ring set's outer ring, in km².
///
/// Holes are deliberately ignored: the tier decision is about the extent the
/// triangulator must cover, and holes do not reduce that.
pub fn outer_ring_area_km2(ring_set: &RingSet) -> f64 {
    // A ring jumping between +170 and -170 would otherwise be measured as
    // its 340°-wide complement.
    let (continuous, _) = unwrap_if_antimeridian(ring_set);
    let outer = Polygon::new(continuous.to_geo().exterior().clone(), Vec::new());
    outer.chamberlain_duquette_unsigned_area() / 1_000_000.0
}

/// Classifies an area into its tessellation tier.
pub fn classify_area(area_km2: f64) -> SizeClass {
    if area_km2 < SMALL_MAX_KM2 {
        SizeClass::Small
    } else if area_km2 <= VERY_LARGE_MIN_KM2 {
        SizeClass::Large
    } else {
        SizeClass::VeryLarge
    }
}

/// Resolves the tessellation method for one ring set.
///
/// An explicit override wins; `Auto` falls back to the area tiers. Returns
/// the method together with the classified tier so grid cell sizing can use
/// it.
pub fn resolve_method(ring_set: &RingSet, requested: TessellationMethod) -> (TessellationMethod, SizeClass) {
    let class = classify_area(outer_ring_area_km2(ring_set));
    let method = match requested {
        TessellationMethod::Auto => match class {
            SizeClass::Small => TessellationMethod::Earcut,
            SizeClass::Large | SizeClass::VeryLarge => TessellationMethod::Grid,
        },
        forced => forced,
    };
    (method, class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::types::LngLat;

    /// Closed square ring of the given side length in degrees, centered
    /// near the equator.
    fn square_ring(side_deg: f64) -> RingSet {
        RingSet::new(
            vec![
                LngLat::new(0.0, 0.0),
                LngLat::new(side_deg, 0.0),
                LngLat::new(side_deg, side_deg),
                LngLat::new(0.0, side_deg),
                LngLat::new(0.0, 0.0),
            ],
            vec![],
        )
    }

    #[test]
    fn test_one_degree_square_is_small() {
        // ~111 km x ~111 km near the equator, well under 200,000 km².
        let area = outer_ring_area_km2(&square_ring(1.0));
        assert!(area > 10_000.0 && area < 15_000.0, "area was {area}");
        assert_eq!(classify_area(area), SizeClass::Small);
    }

    #[test]
    fn test_large_square_classifies_large() {
        // ~6.3° squared is roughly 490,000 km².
        let area = outer_ring_area_km2(&square_ring(6.3));
        assert_eq!(classify_area(area), SizeClass::Large, "area was {area}");
    }

    #[test]
    fn test_very_large_square_classifies_very_large() {
        let area = outer_ring_area_km2(&square_ring(15.0));
        assert!(area > VERY_LARGE_MIN_KM2, "area was {area}");
        assert_eq!(classify_area(area), SizeClass::VeryLarge);
    }

    #[test]
    fn test_area_monotonic_in_scale() {
        // Sanity bound, not exact: scaling coordinates up must grow the area.
        let mut previous = 0.0;
        for side in [0.5, 1.0, 2.0, 4.0, 8.0] {
            let area = outer_ring_area_km2(&square_ring(side));
            assert!(area > previous, "area {area} not above {previous}");
            previous = area;
        }
    }

    #[test]
    fn test_holes_do_not_change_classification() {
        let with_hole = RingSet::new(
            square_ring(1.0).outer,
            vec![vec![
                LngLat::new(0.25, 0.25),
                LngLat::new(0.75, 0.25),
                LngLat::new(0.75, 0.75),
                LngLat::new(0.25, 0.25),
            ]],
        );
        let plain = square_ring(1.0);
        assert_eq!(
            outer_ring_area_km2(&with_hole),
            outer_ring_area_km2(&plain)
        );
    }

    #[test]
    fn test_seam_crossing_strip_measures_like_its_shifted_twin() {
        // A 20°-wide strip straddling ±180° and the same strip centered on
        // the prime meridian cover identical sphere area.
        let seam = RingSet::new(
            vec![
                LngLat::new(170.0, -5.0),
                LngLat::new(-170.0, -5.0),
                LngLat::new(-170.0, 5.0),
                LngLat::new(170.0, 5.0),
                LngLat::new(170.0, -5.0),
            ],
            vec![],
        );
        let shifted = RingSet::new(
            vec![
                LngLat::new(-10.0, -5.0),
                LngLat::new(10.0, -5.0),
                LngLat::new(10.0, 5.0),
                LngLat::new(-10.0, 5.0),
                LngLat::new(-10.0, -5.0),
            ],
            vec![],
        );

        let seam_area = outer_ring_area_km2(&seam);
        let shifted_area = outer_ring_area_km2(&shifted);
        assert!(
            (seam_area - shifted_area).abs() < 1.0,
            "{seam_area} km² vs {shifted_area} km²"
        );
        // ~20° x 10° near the equator, a very-large region; measuring the
        // raw ring would classify the 340°-wide complement instead.
        assert_eq!(classify_area(seam_area), SizeClass::VeryLarge);
        let (method, _) = resolve_method(&seam, TessellationMethod::Auto);
        assert_eq!(method, TessellationMethod::Grid);
    }

    #[test]
    fn test_resolve_method_auto_small_is_earcut() {
        let (method, class) = resolve_method(&square_ring(1.0), TessellationMethod::Auto);
        assert_eq!(method, TessellationMethod::Earcut);
        assert_eq!(class, SizeClass::Small);
    }

    #[test]
    fn test_resolve_method_auto_very_large_is_grid() {
        let (method, class) = resolve_method(&square_ring(15.0), TessellationMethod::Auto);
        assert_eq!(method, TessellationMethod::Grid);
        assert_eq!(class, SizeClass::VeryLarge);
    }

    #[test]
    fn test_resolve_method_override_wins() {
        let (method, _) = resolve_method(&square_ring(15.0), TessellationMethod::Earcut);
        assert_eq!(method, TessellationMethod::Earcut);

        let (method, _) = resolve_method(&square_ring(1.0), TessellationMethod::Grid);
        assert_eq!(method, TessellationMethod::Grid);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify_area(199_999.0), SizeClass::Small);
        assert_eq!(classify_area(200_000.0), SizeClass::Large);
        assert_eq!(classify_area(1_000_000.0), SizeClass::Large);
        assert_eq!(classify_area(1_000_001.0), SizeClass::VeryLarge);
    }
}
