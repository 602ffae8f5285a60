use iiif_trainset::ir::{
    derive_image_id, normalize_tag, object_labels, parse_xywh, resize_box, ObjectMode, TagSet,
};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn image_id_derivation_is_idempotent(raw in proptest_helpers::arb_raw_image_id()) {
        let once = derive_image_id(&raw);
        let twice = derive_image_id(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.ends_with(".jpg"));
        prop_assert!(!once.contains('/'));
    }

    #[test]
    fn resize_is_identity_when_sizes_match(
        ((width, height), bbox) in proptest_helpers::arb_full_dims()
            .prop_flat_map(|(w, h)| (Just((w, h)), proptest_helpers::arb_box_within(w, h)))
    ) {
        let resized = resize_box(&bbox, width, height, width, height);
        prop_assert_eq!(
            (resized.xmin(), resized.ymin(), resized.xmax(), resized.ymax()),
            (bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax())
        );
    }

    #[test]
    fn downscaled_box_stays_inside_resized_image(
        (((full_w, full_h), (resized_w, resized_h)), bbox) in proptest_helpers::arb_full_and_resized()
            .prop_flat_map(|(full, resized)| {
                (Just((full, resized)), proptest_helpers::arb_box_within(full.0, full.1))
            })
    ) {
        let resized = resize_box(&bbox, full_w, full_h, resized_w, resized_h);
        prop_assert!(resized.is_ordered());
        prop_assert!(resized.is_within(resized_w, resized_h));
    }

    #[test]
    fn fragment_selector_parses_back(x in 0i64..100_000, y in 0i64..100_000, w in 0i64..10_000, h in 0i64..10_000) {
        let region = parse_xywh(&format!("xywh={x},{y},{w},{h}")).expect("parse");
        prop_assert_eq!((region.x, region.y, region.w, region.h), (x, y, w, h));
        prop_assert_eq!(region.to_string(), format!("{x},{y},{w},{h}"));
    }

    #[test]
    fn tag_normalization_is_idempotent(tag in proptest_helpers::arb_tag()) {
        let once = normalize_tag(&tag);
        prop_assert_eq!(normalize_tag(once), once);
    }

    #[test]
    fn per_tag_labels_are_distinct_and_normalized(tags in prop::collection::vec(proptest_helpers::arb_tag(), 0..6)) {
        let set: TagSet = tags.iter().map(String::as_str).collect();
        let labels = object_labels(&set, ObjectMode::PerTag);

        for (idx, label) in labels.iter().enumerate() {
            prop_assert_eq!(normalize_tag(label), *label);
            prop_assert!(!labels[..idx].contains(label));
        }

        let reduced = object_labels(&set, ObjectMode::Reduced);
        prop_assert_eq!(reduced.len(), usize::from(!set.is_empty()));
    }
}
