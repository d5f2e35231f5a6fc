//! Property-based invariant tests for the observers.
//!
//! 1. `count` equals the number of visible-to-hidden transitions.
//! 2. `visible` always mirrors the source after a change.
//! 3. Listeners see exactly the delivered changes, in order.
//! 4. A width query's match flag agrees with the viewport width.
//! 5. `build_query` and `MediaQueryProps::to_query` agree.
//! 6. Unsubscribe is idempotent under any call pattern.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use spark_observers::environment::media_condition::{evaluate, DisplayMetrics};
use spark_observers::environment::{HeadlessDocument, Viewport, ViewportConfig};
use spark_observers::{
    build_query, media_query, MediaContent, MediaQueryProps, VisibilityTracker,
};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Whole and fractional px values, e.g. `768` and `767.98`.
fn px_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![
        (0u32..4000).prop_map(|n| n as f32),
        (0u32..400_000).prop_map(|n| n as f32 / 100.0),
    ]
}

fn width_props_strategy() -> impl Strategy<Value = MediaQueryProps> {
    prop_oneof![
        px_strategy().prop_map(MediaQueryProps::MinWidth),
        px_strategy().prop_map(MediaQueryProps::MaxWidth),
        px_strategy().prop_map(MediaQueryProps::MinHeight),
        px_strategy().prop_map(MediaQueryProps::MaxHeight),
    ]
}

fn expected_match(props: MediaQueryProps, width: u32, height: u32) -> bool {
    match props {
        MediaQueryProps::MinWidth(n) => width as f32 >= n,
        MediaQueryProps::MaxWidth(n) => width as f32 <= n,
        MediaQueryProps::MinHeight(n) => height as f32 >= n,
        MediaQueryProps::MaxHeight(n) => height as f32 <= n,
        _ => unreachable!("strategy only yields size props"),
    }
}

fn field_value(props: MediaQueryProps) -> String {
    match props {
        MediaQueryProps::MinWidth(n)
        | MediaQueryProps::MaxWidth(n)
        | MediaQueryProps::MinHeight(n)
        | MediaQueryProps::MaxHeight(n) => n.to_string(),
        _ => unreachable!("strategy only yields size props"),
    }
}

// ── Visibility ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn count_equals_departures(start_hidden in any::<bool>(), steps in prop::collection::vec(any::<bool>(), 0..64)) {
        let document = Rc::new(HeadlessDocument::new(start_hidden));
        let tracker = VisibilityTracker::new(document.clone());

        let mut hidden = start_hidden;
        let mut departures = 0u32;
        for next in &steps {
            if *next && !hidden {
                departures += 1;
            }
            hidden = *next;
            document.set_hidden(*next);
        }

        prop_assert_eq!(tracker.count(), departures);
        prop_assert_eq!(tracker.visible(), !hidden);
    }

    #[test]
    fn listeners_see_every_change_in_order(steps in prop::collection::vec(any::<bool>(), 0..64)) {
        let document = Rc::new(HeadlessDocument::new(false));
        let tracker = VisibilityTracker::new(document.clone());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _handle = tracker
            .on_visibility_change()
            .subscribe_fn(move |visible| seen_clone.borrow_mut().push(visible));

        let mut hidden = false;
        let mut expected = Vec::new();
        for next in &steps {
            if *next != hidden {
                expected.push(!*next);
            }
            hidden = *next;
            document.set_hidden(*next);
        }

        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn unsubscribe_is_idempotent(calls in 1usize..6, others in 0usize..4) {
        let document = Rc::new(HeadlessDocument::new(false));
        let tracker = VisibilityTracker::new(document.clone());
        let subscribe = tracker.on_visibility_change();

        let hits = Rc::new(Cell::new(0u32));
        let _others: Vec<_> = (0..others)
            .map(|_| {
                let hits = hits.clone();
                subscribe.subscribe_fn(move |_| hits.set(hits.get() + 1))
            })
            .collect();
        let target = subscribe.subscribe_fn(|_| {});

        for _ in 0..calls {
            target.unsubscribe();
        }

        prop_assert!(!target.is_active());
        prop_assert_eq!(tracker.listener_count(), others);
        document.hide();
        prop_assert_eq!(hits.get(), others as u32);
    }
}

// ── Media queries ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn size_query_agrees_with_viewport(
        props in width_props_strategy(),
        start in (1u32..4000, 1u32..4000),
        resized in (1u32..4000, 1u32..4000),
    ) {
        let viewport = Rc::new(Viewport::new(ViewportConfig::sized(start.0, start.1)));
        let view = media_query(Some(viewport.clone()), props, MediaContent::Static(()));
        prop_assert_eq!(view.matches(), expected_match(props, start.0, start.1));

        viewport.resize(resized.0, resized.1);
        prop_assert_eq!(view.matches(), expected_match(props, resized.0, resized.1));

        let metrics = DisplayMetrics { width: resized.0, height: resized.1, ..DisplayMetrics::default() };
        prop_assert_eq!(evaluate(&props.to_query(), &metrics), view.matches());
    }

    #[test]
    fn build_query_agrees_with_typed_props(props in width_props_strategy()) {
        let value = field_value(props);
        let built = build_query(&[(props.field(), Some(value.as_str()))]);
        prop_assert_eq!(built, Some(props.to_query()));

        let parsed = MediaQueryProps::from_fields(&[(props.field(), Some(value.as_str()))]);
        prop_assert_eq!(parsed, Ok(props));
    }

    #[test]
    fn unknown_fields_never_build(field in "[a-z]{1,12}", value in "[0-9]{1,4}") {
        prop_assume!(!spark_observers::primitives::QUERY_FIELDS.contains(&field.as_str()));
        prop_assert_eq!(build_query(&[(field.as_str(), Some(value.as_str()))]), None);
    }
}
