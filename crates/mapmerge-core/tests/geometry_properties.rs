use mapmerge_core::geometry::{
    bounding_boxes_intersect, centroid, intersection_area, point_in_polygon, polygon_area,
    polygon_intersection, PolygonIntersection, DEFAULT_TOLERANCE,
};
use mapmerge_core::Coord;
use proptest::prelude::*;

fn rect(x0: f64, y0: f64, w: f64, h: f64) -> Vec<Coord> {
    vec![
        Coord::new(x0, y0),
        Coord::new(x0 + w, y0),
        Coord::new(x0 + w, y0 + h),
        Coord::new(x0, y0 + h),
        Coord::new(x0, y0),
    ]
}

fn rect_strategy() -> impl Strategy<Value = Vec<Coord>> {
    (-100.0..100.0f64, -100.0..100.0f64, 0.5..50.0f64, 0.5..50.0f64)
        .prop_map(|(x, y, w, h)| rect(x, y, w, h))
}

proptest! {
    #[test]
    fn prop_disjoint_boxes_never_overlap(a in rect_strategy(), gap in 0.01..20.0f64, h in 0.5..50.0f64) {
        // Place b strictly to the right of a
        let max_x = a.iter().map(|c| c.x).fold(f64::MIN, f64::max);
        let b = rect(max_x + gap, a[0].y, 3.0, h);
        prop_assert!(!bounding_boxes_intersect(&a, &b));
        prop_assert_eq!(intersection_area(&a, &b, DEFAULT_TOLERANCE), 0.0);
        prop_assert_eq!(polygon_intersection(&a, &b, DEFAULT_TOLERANCE).kind, PolygonIntersection::Outside);
    }

    #[test]
    fn prop_overlap_is_symmetric_and_bounded(a in rect_strategy(), b in rect_strategy()) {
        let ab = intersection_area(&a, &b, DEFAULT_TOLERANCE);
        let ba = intersection_area(&b, &a, DEFAULT_TOLERANCE);
        prop_assert!((ab - ba).abs() < 1e-6);
        prop_assert!(ab <= polygon_area(&a).min(polygon_area(&b)) + 1e-6);
        prop_assert_eq!(ab == 0.0, polygon_intersection(&a, &b, DEFAULT_TOLERANCE).kind == PolygonIntersection::Outside);
    }

    #[test]
    fn prop_rect_overlap_matches_closed_form(a in rect_strategy(), b in rect_strategy()) {
        let w = (a[1].x.min(b[1].x) - a[0].x.max(b[0].x)).max(0.0);
        let h = (a[2].y.min(b[2].y) - a[0].y.max(b[0].y)).max(0.0);
        let expected = w * h;
        let got = intersection_area(&a, &b, DEFAULT_TOLERANCE);
        if expected > DEFAULT_TOLERANCE * 2.0 {
            prop_assert!((got - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_centroid_of_rect_is_inside(a in rect_strategy()) {
        let c = centroid(&a).unwrap();
        prop_assert!(point_in_polygon(&c, &a));
    }
}
