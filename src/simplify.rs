use crate::geometry::PagePoint;

/// Default Ramer-Douglas-Peucker tolerance in page pixels.
pub const DEFAULT_TOLERANCE: f32 = 0.85;

/// Reduces a captured point path while preserving its visual shape.
///
/// Endpoints are always kept exactly. Inputs with two or fewer points are
/// returned unchanged; a fully collapsed span still yields both endpoints,
/// never a single point. Output order follows input order and the result is
/// deterministic for a given input and tolerance.
pub fn simplify_path(points: &[PagePoint], tolerance: f32) -> Vec<PagePoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let (split, distance) = farthest_from_chord(points);
    if distance > tolerance {
        let mut left = simplify_path(&points[..=split], tolerance);
        let right = simplify_path(&points[split..], tolerance);
        // The split point ends both halves; keep one copy.
        left.pop();
        left.extend(right);
        left
    } else {
        vec![points[0], points[points.len() - 1]]
    }
}

/// Index and perpendicular distance of the interior point farthest from the
/// first-to-last chord. Ties keep the earliest index.
fn farthest_from_chord(points: &[PagePoint]) -> (usize, f32) {
    let start = points[0];
    let end = points[points.len() - 1];

    let mut best_index = 0;
    let mut best_dist_sq = 0.0f32;
    for (i, point) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist_sq = point_segment_distance_sq(*point, start, end);
        if dist_sq > best_dist_sq {
            best_dist_sq = dist_sq;
            best_index = i;
        }
    }
    (best_index, best_dist_sq.sqrt())
}

/// Squared distance from `point` to the segment `a..b`, clamping the
/// projection to the segment so degenerate chords (a == b) fall back to
/// plain point distance.
pub fn point_segment_distance_sq(point: PagePoint, a: PagePoint, b: PagePoint) -> f32 {
    let seg_x = b.x - a.x;
    let seg_y = b.y - a.y;
    let len_sq = seg_x * seg_x + seg_y * seg_y;

    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((point.x - a.x) * seg_x + (point.y - a.y) * seg_y) / len_sq).clamp(0.0, 1.0)
    };

    let proj_x = a.x + t * seg_x;
    let proj_y = a.y + t * seg_y;
    let dx = point.x - proj_x;
    let dy = point.y - proj_y;
    dx * dx + dy * dy
}
