use eframe::egui::Vec2;

use super::Bubble;
use super::quadtree::QuadNode;

/// How much two circles intrude into each other, including the requested gap.
pub(super) fn overlap_amount(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32, spacing: f32) -> f32 {
    (radius_a + radius_b + spacing - (a - b).length()).max(0.0)
}

/// Pairs `(i, j)` with `i < j` whose circles overlap once `spacing` is added
/// between them.
pub(super) fn overlapping_pairs(
    positions: &[Vec2],
    radii: &[f32],
    spacing: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    pairs.clear();
    if positions.len() < 2 {
        return;
    }

    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
    let reach = (max_radius * 2.0) + spacing.max(0.0);
    let Some(tree) = QuadNode::build(positions) else {
        return;
    };

    collect_pairs(
        &tree,
        &tree,
        true,
        positions,
        radii,
        spacing,
        reach * reach,
        pairs,
    );

    for pair in pairs.iter_mut() {
        if pair.0 > pair.1 {
            *pair = (pair.1, pair.0);
        }
    }
    pairs.sort_unstable();
}

fn push_if_overlapping(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    spacing: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    if overlap_amount(positions[from], radii[from], positions[to], radii[to], spacing) > 0.0 {
        pairs.push((from, to));
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    spacing: f32,
    reach_sq: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for i in 0..node_a.indices.len() {
                for j in (i + 1)..node_a.indices.len() {
                    push_if_overlapping(
                        node_a.indices[i],
                        node_a.indices[j],
                        positions,
                        radii,
                        spacing,
                        pairs,
                    );
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_if_overlapping(from, to, positions, radii, spacing, pairs);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            collect_pairs(
                child_a, child_a, true, positions, radii, spacing, reach_sq, pairs,
            );

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                collect_pairs(
                    child_a, child_b, false, positions, radii, spacing, reach_sq, pairs,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            collect_pairs(
                child, node_b, false, positions, radii, spacing, reach_sq, pairs,
            );
        }
    } else {
        for child in node_b.children.iter().flatten() {
            collect_pairs(
                node_a, child, false, positions, radii, spacing, reach_sq, pairs,
            );
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlapReport {
    pub pair_count: usize,
    pub overlapping_pairs: usize,
    pub max_overlap: f32,
}

impl OverlapReport {
    /// Share of same-side pairs that do not overlap beyond the tolerance.
    pub fn clear_ratio(&self) -> f32 {
        if self.pair_count == 0 {
            return 1.0;
        }
        1.0 - (self.overlapping_pairs as f32 / self.pair_count as f32)
    }
}

/// Counts same-side circle pairs intruding by more than `tolerance`.
pub fn measure_overlap(bubbles: &[Bubble], tolerance: f32) -> OverlapReport {
    let mut report = OverlapReport::default();
    for (index, first) in bubbles.iter().enumerate() {
        for second in &bubbles[index + 1..] {
            if first.side != second.side {
                continue;
            }
            report.pair_count += 1;
            let overlap = overlap_amount(
                first.position,
                first.radius,
                second.position,
                second.radius,
                0.0,
            );
            report.max_overlap = report.max_overlap.max(overlap);
            if overlap > tolerance {
                report.overlapping_pairs += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn brute_force(positions: &[Vec2], radii: &[f32], spacing: f32) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if overlap_amount(positions[i], radii[i], positions[j], radii[j], spacing) > 0.0 {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    #[test]
    fn quadtree_pairs_match_brute_force() {
        let positions = (0..90)
            .map(|index| {
                let index = index as f32;
                vec2(
                    (index * 37.0) % 480.0,
                    (index * 53.0 + (index * index) * 0.7) % 360.0,
                )
            })
            .collect::<Vec<_>>();
        let radii = (0..90)
            .map(|index| 8.0 + (index % 5) as f32 * 6.0)
            .collect::<Vec<_>>();

        let mut pairs = Vec::new();
        overlapping_pairs(&positions, &radii, 2.0, &mut pairs);
        assert_eq!(pairs, brute_force(&positions, &radii, 2.0));
    }

    #[test]
    fn coincident_circles_are_reported() {
        let positions = vec![vec2(10.0, 10.0); 3];
        let radii = vec![5.0; 3];
        let mut pairs = Vec::new();
        overlapping_pairs(&positions, &radii, 0.0, &mut pairs);
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn touching_circles_do_not_overlap() {
        assert_eq!(
            overlap_amount(vec2(0.0, 0.0), 10.0, vec2(20.0, 0.0), 10.0, 0.0),
            0.0
        );
        assert!(overlap_amount(vec2(0.0, 0.0), 10.0, vec2(19.0, 0.0), 10.0, 0.0) > 0.9);
    }
}
