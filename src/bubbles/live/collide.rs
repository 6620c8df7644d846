use eframe::egui::Vec2;

use super::super::fallback_direction;
use super::LiveBubble;

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    /// Fraction of the approaching normal velocity exchanged per contact.
    pub(super) transfer: f32,
}

/// Separates one overlapping pair and trades part of their closing speed.
/// Returns the overlap that was resolved.
fn resolve_pair(
    first_index: usize,
    second_index: usize,
    first: &mut LiveBubble,
    second: &mut LiveBubble,
    params: CollisionParams,
) -> f32 {
    let delta = first.bubble.position - second.bubble.position;
    let distance_sq = delta.length_sq();
    let min_distance = first.bubble.radius + second.bubble.radius;
    if distance_sq >= min_distance * min_distance {
        return 0.0;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > 1e-4 {
        delta / distance
    } else {
        fallback_direction(first_index, second_index)
    };
    let overlap = min_distance - distance;

    let first_mass = first.bubble.radius * first.bubble.radius;
    let second_mass = second.bubble.radius * second.bubble.radius;
    let total_mass = (first_mass + second_mass).max(1e-3);
    let first_share = second_mass / total_mass;
    let second_share = first_mass / total_mass;

    first.bubble.position += normal * overlap * first_share;
    second.bubble.position -= normal * overlap * second_share;

    let closing = (first.bubble.velocity - second.bubble.velocity).dot(normal);
    if closing < 0.0 {
        let impulse = normal * (-closing * params.transfer);
        first.bubble.velocity += impulse * first_share;
        second.bubble.velocity -= impulse * second_share;
    }

    overlap
}

/// Pairwise collision pass over the members of one quadrant. Returns the
/// largest overlap found.
pub(super) fn collide_members(
    bubbles: &mut [LiveBubble],
    members: &[usize],
    params: CollisionParams,
) -> f32 {
    let mut max_overlap = 0.0_f32;
    for (offset, &first_index) in members.iter().enumerate() {
        for &second_index in &members[offset + 1..] {
            let (first, second) = pair_mut(bubbles, first_index, second_index);
            let overlap = resolve_pair(first_index, second_index, first, second, params);
            max_overlap = max_overlap.max(overlap);
        }
    }
    max_overlap
}

fn pair_mut(bubbles: &mut [LiveBubble], a: usize, b: usize) -> (&mut LiveBubble, &mut LiveBubble) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = bubbles.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = bubbles.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

/// Reflects a circle off the quadrant walls.
pub(super) fn bounce(bubble: &mut LiveBubble, low: Vec2, high: Vec2, restitution: f32) {
    let position = &mut bubble.bubble.position;
    let velocity = &mut bubble.bubble.velocity;

    if position.x < low.x {
        position.x = low.x;
        velocity.x = velocity.x.abs() * restitution;
    } else if position.x > high.x {
        position.x = high.x;
        velocity.x = -velocity.x.abs() * restitution;
    }

    if position.y < low.y {
        position.y = low.y;
        velocity.y = velocity.y.abs() * restitution;
    } else if position.y > high.y {
        position.y = high.y;
        velocity.y = -velocity.y.abs() * restitution;
    }
}
