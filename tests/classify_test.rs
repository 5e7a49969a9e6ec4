use area_recognition::classify::{
    AreaRecord, ItemCategory, ItemInfo, LabelSet, classify_items, tally,
};
use area_recognition::detection::{BoundingBox, Detection};
use area_recognition::types::Pose;

fn det(class_id: usize, confidence: f32) -> Detection {
    Detection::new(class_id, confidence, BoundingBox::new(0.0, 0.0, 1.0, 1.0))
}

#[test]
fn test_default_label_partition() {
    let labels = LabelSet::default();
    assert_eq!(labels.len(), 11);
    assert_eq!(labels.name(0), Some("coin"));
    assert_eq!(labels.name(10), Some("treasure_box"));
    let treasures: Vec<usize> = labels.indices_of(ItemCategory::Treasure).collect();
    assert_eq!(treasures, vec![3, 4, 5]);
    assert_eq!(labels.indices_of(ItemCategory::Landmark).count(), 8);
    assert_eq!(labels.category(11), None);
}

#[test]
fn test_empty_detections_give_sentinels() {
    let (landmark, treasure) = classify_items(&[], &LabelSet::default());
    assert!(landmark.is_nothing());
    assert!(treasure.is_nothing());
    assert_eq!(landmark.name(), "nothing");
    assert_eq!(treasure.count(), 0);
}

#[test]
fn test_highest_confidence_wins_per_category() {
    let dets = [
        det(0, 0.5),  // coin
        det(0, 0.6),  // coin
        det(9, 0.7),  // shell
        det(3, 0.4),  // crystal
        det(5, 0.95), // emerald
        det(5, 0.3),  // emerald
    ];
    let (landmark, treasure) = classify_items(&dets, &LabelSet::default());
    assert_eq!(landmark, ItemInfo::item("shell", 1));
    assert_eq!(treasure, ItemInfo::item("emerald", 2));
}

#[test]
fn test_ties_go_to_lowest_index() {
    let dets = [det(7, 0.8), det(1, 0.8), det(4, 0.5), det(3, 0.5)];
    let (landmark, treasure) = classify_items(&dets, &LabelSet::default());
    assert_eq!(landmark.name(), "compass");
    assert_eq!(treasure.name(), "crystal");
}

#[test]
fn test_only_one_category_present() {
    let dets = [det(2, 0.9), det(2, 0.8)];
    let (landmark, treasure) = classify_items(&dets, &LabelSet::default());
    assert_eq!(landmark, ItemInfo::item("coral", 2));
    assert_eq!(treasure, ItemInfo::Nothing);
}

#[test]
fn test_tally_ignores_unknown_class() {
    let t = tally(&[det(0, 0.4), det(42, 0.9), det(0, 0.7)], 11);
    assert_eq!(t.len(), 11);
    assert_eq!(t[0].count, 2);
    assert!((t[0].confidence - 0.7).abs() < 1e-6);
    assert_eq!(t.iter().map(|x| x.count).sum::<u32>(), 2);
}

#[test]
fn test_custom_partition() {
    let labels = LabelSet::new(vec!["a".into(), "b".into(), "c".into()], &[0, 7]);
    assert_eq!(labels.category(0), Some(ItemCategory::Treasure));
    assert_eq!(labels.category(1), Some(ItemCategory::Landmark));
    let (landmark, treasure) = classify_items(&[det(0, 0.3), det(2, 0.4)], &labels);
    assert_eq!(landmark.name(), "c");
    assert_eq!(treasure.name(), "a");
}

#[test]
fn test_holds_treasure() {
    let area = AreaRecord::new(
        ItemInfo::item("coin", 1),
        ItemInfo::item("diamond", 2),
        Pose::zero(),
    );
    assert!(area.holds_treasure(&ItemInfo::item("diamond", 1)));
    assert!(!area.holds_treasure(&ItemInfo::item("emerald", 1)));
    assert!(!area.holds_treasure(&ItemInfo::Nothing));

    let empty = AreaRecord::default();
    assert!(!empty.holds_treasure(&ItemInfo::Nothing));
}

#[test]
fn test_item_info_json() {
    let json = serde_json::to_value(ItemInfo::item("key", 3)).unwrap();
    assert_eq!(json["item"]["name"], "key");
    assert_eq!(json["item"]["count"], 3);
    let nothing = serde_json::to_value(ItemInfo::Nothing).unwrap();
    assert_eq!(nothing, serde_json::json!("nothing"));
}
