//! Property-based invariant tests for geometry primitives.
//!
//! 1. Canon of a valid rectangle is the rectangle itself.
//! 2. Canon always yields non-inverted axes.
//! 3. Intersection is commutative and lies inside both inputs.
//! 4. Combine contains both non-empty inputs.
//! 5. Inset by n either shrinks by 2n or collapses to a strip.
//! 6. drawreplxy lands in [min, max).

use nui_core::geometry::{Point, Rectangle, drawreplxy};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn valid_rect() -> impl Strategy<Value = Rectangle> {
    (-5000i32..5000, -5000i32..5000, 1i32..2000, 1i32..2000)
        .prop_map(|(x, y, w, h)| Rectangle::new(x, y, x + w, y + h))
}

fn any_rect() -> impl Strategy<Value = Rectangle> {
    (-5000i32..5000, -5000i32..5000, -5000i32..5000, -5000i32..5000)
        .prop_map(|(a, b, c, d)| Rectangle::new(a, b, c, d))
}

proptest! {
    #[test]
    fn canon_of_valid_is_identity(r in valid_rect()) {
        let rebuilt = Rectangle::new(r.min.x, r.min.y, r.max.x, r.max.y);
        prop_assert_eq!(rebuilt, r.canon());
    }

    #[test]
    fn canon_is_ordered(r in any_rect()) {
        let c = r.canon();
        prop_assert!(c.min.x <= c.max.x);
        prop_assert!(c.min.y <= c.max.y);
        prop_assert_eq!(c.canon(), c);
    }

    #[test]
    fn intersection_commutes_and_fits(a in valid_rect(), b in valid_rect()) {
        let i = a.intersection(&b);
        prop_assert_eq!(i, b.intersection(&a));
        if a.overlaps(&b) {
            prop_assert!(a.contains_rect(&i));
            prop_assert!(b.contains_rect(&i));
        } else {
            prop_assert!(i.is_empty());
        }
    }

    #[test]
    fn combine_contains_inputs(a in valid_rect(), b in valid_rect()) {
        let c = a.combine(&b);
        prop_assert!(c.contains_rect(&a));
        prop_assert!(c.contains_rect(&b));
    }

    #[test]
    fn inset_shrinks_or_collapses(r in valid_rect(), n in 0i32..600) {
        let i = r.inset(n);
        if r.dx() >= 2 * n {
            prop_assert_eq!(i.dx(), r.dx() - 2 * n);
        } else {
            prop_assert_eq!(i.dx(), 0);
        }
        if r.dy() >= 2 * n {
            prop_assert_eq!(i.dy(), r.dy() - 2 * n);
        } else {
            prop_assert_eq!(i.dy(), 0);
        }
    }

    #[test]
    fn replxy_in_range(min in -1000i32..1000, span in 1i32..500, x in any::<i32>()) {
        let v = drawreplxy(min, min + span, x);
        prop_assert!(v >= min && v < min + span);
    }

    #[test]
    fn point_in_rect_matches_contains(r in valid_rect(), x in -6000i32..6000, y in -6000i32..6000) {
        let p = Point::new(x, y);
        let expect = x >= r.min.x && x < r.max.x && y >= r.min.y && y < r.max.y;
        prop_assert_eq!(r.contains(p), expect);
    }
}
