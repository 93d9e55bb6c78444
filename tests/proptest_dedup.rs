mod proptest_helpers;

use proptest::prelude::*;
use quadcrop::config::TieBreak;
use quadcrop::dedup::{dedup, dedup_rects, Status};

use proptest_helpers::{arb_pixel_rects, proptest_config};

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn survivors_never_overlap(rects in arb_pixel_rects(200, 200, 12)) {
        let kept = dedup_rects(&rects, TieBreak::RemoveLater);
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                prop_assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn dedup_is_idempotent(rects in arb_pixel_rects(200, 200, 12)) {
        let once = dedup_rects(&rects, TieBreak::RemoveLater);
        let twice = dedup_rects(&once, TieBreak::RemoveLater);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn winner_is_never_smaller(rects in arb_pixel_rects(200, 200, 12)) {
        let outcome = dedup(&rects, TieBreak::RemoveLater);
        for (removed, winner) in outcome.removals() {
            prop_assert!(rects[winner].area() >= rects[removed].area());
            prop_assert!(rects[winner].intersects(&rects[removed]));
        }
    }

    #[test]
    fn survivors_keep_input_order(rects in arb_pixel_rects(200, 200, 12)) {
        let outcome = dedup(&rects, TieBreak::RemoveEarlier);
        let kept = outcome.kept_indices();
        prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(kept.len() + outcome.removed_count(), rects.len());
        for i in kept {
            prop_assert_eq!(outcome.status[i], Status::Kept);
        }
    }
}
