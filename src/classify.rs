use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::types::Pose;

pub const NOTHING: &str = "nothing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Landmark,
    Treasure,
}

/// Ordered label vocabulary with its landmark / treasure partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
    categories: Vec<ItemCategory>,
}

impl LabelSet {
    /// Labels at `treasure_indices` are treasures, everything else is a landmark.
    /// Out-of-range indices are ignored.
    pub fn new(names: Vec<String>, treasure_indices: &[usize]) -> LabelSet {
        let mut categories = vec![ItemCategory::Landmark; names.len()];
        for &i in treasure_indices {
            if let Some(c) = categories.get_mut(i) {
                *c = ItemCategory::Treasure;
            }
        }
        LabelSet { names, categories }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn category(&self, index: usize) -> Option<ItemCategory> {
        self.categories.get(index).copied()
    }

    pub fn indices_of(&self, category: ItemCategory) -> impl Iterator<Item = usize> + '_ {
        self.categories
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == category)
            .map(|(i, _)| i)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        crate::config::PerceptionConfig::default().label_set()
    }
}

/// Per-label count and best confidence over the kept detections.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LabelTally {
    pub count: u32,
    pub confidence: f32,
}

pub fn tally(detections: &[Detection], num_labels: usize) -> Vec<LabelTally> {
    let mut tallies = vec![LabelTally::default(); num_labels];
    for d in detections {
        let Some(t) = tallies.get_mut(d.class_id) else {
            log::warn!("class id {} outside {} labels", d.class_id, num_labels);
            continue;
        };
        t.count += 1;
        if d.confidence > t.confidence {
            t.confidence = d.confidence;
        }
    }
    tallies
}

/// Item reported for one category of an area; `Nothing` when no label of
/// the category was seen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemInfo {
    #[default]
    Nothing,
    Item {
        name: String,
        count: u32,
    },
}

impl ItemInfo {
    pub fn item(name: impl Into<String>, count: u32) -> ItemInfo {
        ItemInfo::Item {
            name: name.into(),
            count,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ItemInfo::Nothing => NOTHING,
            ItemInfo::Item { name, .. } => name,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            ItemInfo::Nothing => 0,
            ItemInfo::Item { count, .. } => *count,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ItemInfo::Nothing)
    }
}

fn best_of(tallies: &[LabelTally], labels: &LabelSet, category: ItemCategory) -> ItemInfo {
    let mut best: Option<(usize, f32)> = None;
    for i in labels.indices_of(category) {
        let Some(t) = tallies.get(i) else {
            continue;
        };
        if t.count == 0 {
            continue;
        }
        // strict comparison keeps the lowest index on ties
        if best.is_none_or(|(_, conf)| t.confidence > conf) {
            best = Some((i, t.confidence));
        }
    }
    match best {
        Some((i, _)) => ItemInfo::item(labels.name(i).unwrap_or(NOTHING), tallies[i].count),
        None => ItemInfo::Nothing,
    }
}

/// Landmark and treasure of one area from its NMS-kept detections.
pub fn classify_items(detections: &[Detection], labels: &LabelSet) -> (ItemInfo, ItemInfo) {
    let tallies = tally(detections, labels.len());
    let landmark = best_of(&tallies, labels, ItemCategory::Landmark);
    let treasure = best_of(&tallies, labels, ItemCategory::Treasure);
    log::info!(
        "landmark {} x{}, treasure {} x{}",
        landmark.name(),
        landmark.count(),
        treasure.name(),
        treasure.count()
    );
    (landmark, treasure)
}

/// What one survey area holds, plus where its anchor sits relative to the robot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaRecord {
    pub landmark: ItemInfo,
    pub treasure: ItemInfo,
    pub anchor: Pose,
}

impl AreaRecord {
    pub fn new(landmark: ItemInfo, treasure: ItemInfo, anchor: Pose) -> AreaRecord {
        AreaRecord {
            landmark,
            treasure,
            anchor,
        }
    }

    /// True when this area's treasure is a real item named like `target`.
    pub fn holds_treasure(&self, target: &ItemInfo) -> bool {
        match (&self.treasure, target) {
            (ItemInfo::Item { name, .. }, ItemInfo::Item { name: wanted, .. }) => name == wanted,
            _ => false,
        }
    }
}
