use crate::detection::{BoundingBox, Detection};

/// Intersection over union; zero for disjoint boxes or an empty union.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let iw = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let ih = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = iw * ih;
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 || intersection <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Greedy suppression in descending confidence order.
///
/// Equal confidences keep their input order. Suppression ignores the class:
/// a box of one label removes an overlapping box of another.
pub fn non_max_suppression(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut remaining = detections.to_vec();
    remaining.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = Vec::new();
    while !remaining.is_empty() {
        let best = remaining.remove(0);
        remaining.retain(|other| iou(&best.bbox, &other.bbox) <= iou_threshold);
        kept.push(best);
    }
    log::debug!(
        "nms kept {} of {} detections",
        kept.len(),
        detections.len()
    );
    kept
}
