//! Straight-segment crossing test used to decide whether a procedure-graph
//! component may keep its linear layout, or a set of frame-to-frame edges
//! visually crosses. Orientation-sign test with an epsilon tolerance,
//! grounded on the reference engine's `_edges_cross`/`_segments_intersect`.

use jmap_model::{FramePlacement, Point};

const EPS: f64 = 1e-6;

fn orientation(p: Point, q: Point, r: Point) -> i32 {
    let value = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if value.abs() < EPS {
        0
    } else if value > 0.0 {
        1
    } else {
        -1
    }
}

fn points_equal(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() <= EPS && (a.y - b.y).abs() <= EPS
}

/// True if open segments `a1-a2` and `b1-b2` cross at an interior point.
/// Shared endpoints are not a crossing.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    if points_equal(a1, b1) || points_equal(a1, b2) || points_equal(a2, b1) || points_equal(a2, b2) {
        return false;
    }
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);
    if o1 == 0 || o2 == 0 || o3 == 0 || o4 == 0 {
        return false;
    }
    o1 != o2 && o3 != o4
}

/// The anchor points a frame-to-frame edge is drawn between: right-center
/// of the source frame, left-center of the target frame.
pub fn frame_edge_endpoints(source: &FramePlacement, target: &FramePlacement) -> (Point, Point) {
    let start = Point::new(source.origin.x + source.size.width, source.origin.y + source.size.height / 2.0);
    let end = Point::new(target.origin.x, target.origin.y + target.size.height / 2.0);
    (start, end)
}

/// True if any two edges among `adjacency`'s frame-to-frame connections
/// cross, ignoring edges that share an endpoint frame.
pub fn edges_cross(
    frame_lookup: &indexmap::IndexMap<String, FramePlacement>,
    adjacency: &jmap_graph::Adjacency,
) -> bool {
    let mut edges: Vec<(String, String, Point, Point)> = Vec::new();
    for (parent, children) in adjacency {
        let Some(source) = frame_lookup.get(parent) else { continue };
        for child in children {
            let Some(target) = frame_lookup.get(child) else { continue };
            let (start, end) = frame_edge_endpoints(source, target);
            edges.push((parent.clone(), child.clone(), start, end));
        }
    }

    for (i, (p1, c1, s1, e1)) in edges.iter().enumerate() {
        for (p2, c2, s2, e2) in &edges[i + 1..] {
            if p1 == p2 || p1 == c2 || c1 == p2 || c1 == c2 {
                continue;
            }
            if segments_intersect(*s1, *e1, *s2, *e2) {
                return true;
            }
        }
    }
    false
}
