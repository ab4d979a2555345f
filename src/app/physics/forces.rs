use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadTree;

/// Nodes closer than this are treated as this far apart for charge.
const MIN_CHARGE_DISTANCE: f32 = 1.0;

/// Fallback push direction for coincident points, spread by index.
fn separation_axis(first: usize, second: usize) -> Vec2 {
    let angle = ((first as f32) * 0.618_034 + (second as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

/// Inverse-distance charge of `mass` units at `source` acting on `point`.
/// Negative strength repels.
fn charge_between(point: Vec2, source: Vec2, strength: f32, mass: f32) -> Vec2 {
    let delta = source - point;
    let distance = delta.length();
    if distance < 1e-4 {
        return Vec2::ZERO;
    }
    delta / distance * (strength * mass / distance.max(MIN_CHARGE_DISTANCE))
}

/// Barnes–Hut walk accumulating the charge acting on `index`.
pub(super) fn accumulate_charge(
    tree: &QuadTree,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    velocity: &mut Vec2,
) {
    if tree.mass <= 0.0 {
        return;
    }
    let point = positions[index];

    if tree.is_leaf() {
        for &other in &tree.points {
            if other == index {
                continue;
            }
            let push = charge_between(point, positions[other], strength, 1.0);
            *velocity += if push == Vec2::ZERO {
                // Coincident nodes still need to separate, in opposite directions.
                let axis = separation_axis(index.min(other), index.max(other));
                let side = if index < other { 1.0 } else { -1.0 };
                axis * side * strength.abs() * 0.01
            } else {
                push
            };
        }
        return;
    }

    let distance = (tree.centroid - point).length().max(1e-4);
    if !tree.cell.contains(point) && tree.cell.width() / distance < theta {
        *velocity += charge_between(point, tree.centroid, strength, tree.mass);
        return;
    }

    for child in tree.children() {
        accumulate_charge(child, index, positions, strength, theta, velocity);
    }
}

#[derive(Clone, Copy)]
pub(super) struct Collision {
    pub(super) margin: f32,
    pub(super) strength: f32,
    pub(super) max_reach_sq: f32,
}

fn resolve_pair(
    first: usize,
    second: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: Collision,
    velocities: &mut [Vec2],
) {
    let delta = positions[first] - positions[second];
    let distance = delta.length();
    let min_distance = radii[first] + radii[second] + params.margin;
    if distance >= min_distance {
        return;
    }

    let direction = if distance > 1e-4 {
        delta / distance
    } else {
        separation_axis(first, second)
    };
    let push = direction * ((min_distance - distance) * params.strength * 0.5);
    velocities[first] += push;
    velocities[second] -= push;
}

/// Dual-tree traversal visiting every pair of nodes whose cells are close
/// enough to overlap once radii and margin are accounted for.
pub(super) fn accumulate_collisions(
    first: &QuadTree,
    second: &QuadTree,
    same: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: Collision,
    velocities: &mut [Vec2],
) {
    if first.cell.gap_sq(second.cell) > params.max_reach_sq {
        return;
    }

    if first.is_leaf() && second.is_leaf() {
        if same {
            for (offset, &a) in first.points.iter().enumerate() {
                for &b in &first.points[offset + 1..] {
                    resolve_pair(a, b, positions, radii, params, velocities);
                }
            }
        } else {
            for &a in &first.points {
                for &b in &second.points {
                    resolve_pair(a, b, positions, radii, params, velocities);
                }
            }
        }
        return;
    }

    if same {
        let children: Vec<&QuadTree> = first.children().collect();
        for (offset, &child) in children.iter().enumerate() {
            accumulate_collisions(child, child, true, positions, radii, params, velocities);
            for &other in &children[offset + 1..] {
                accumulate_collisions(child, other, false, positions, radii, params, velocities);
            }
        }
        return;
    }

    let split_first = !first.is_leaf() && (second.is_leaf() || first.cell.half >= second.cell.half);
    if split_first {
        for child in first.children() {
            accumulate_collisions(child, second, false, positions, radii, params, velocities);
        }
    } else {
        for child in second.children() {
            accumulate_collisions(first, child, false, positions, radii, params, velocities);
        }
    }
}

/// Spring pulling each linked pair toward `distance`, weighted so that
/// high-degree nodes move less.
pub(super) fn accumulate_links(
    links: &[(usize, usize)],
    degrees: &[usize],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
) {
    for &(source, target) in links {
        if source == target {
            continue;
        }
        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let strength = 1.0 / source_degree.min(target_degree);
        let bias = source_degree / (source_degree + target_degree);

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() < 1e-8 {
            delta = separation_axis(source, target) * 1e-3;
        }
        let length = delta.length();
        let pull = delta * ((length - distance) / length * alpha * strength);

        velocities[target] -= pull * bias;
        velocities[source] += pull * (1.0 - bias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_pushes_nodes_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadTree::build(&positions).expect("finite points");

        let mut velocity = Vec2::ZERO;
        accumulate_charge(&tree, 0, &positions, -300.0, 0.9, &mut velocity);
        assert!(velocity.x < 0.0);
        assert!(velocity.y.abs() < 1e-4);
    }

    #[test]
    fn overlapping_nodes_collide() {
        let positions = vec![vec2(0.0, 0.0), vec2(5.0, 0.0)];
        let radii = vec![4.0, 4.0];
        let tree = QuadTree::build(&positions).expect("finite points");
        let mut velocities = vec![Vec2::ZERO; 2];
        let params = Collision {
            margin: 2.0,
            strength: 1.0,
            max_reach_sq: 100.0,
        };

        accumulate_collisions(&tree, &tree, true, &positions, &radii, params, &mut velocities);
        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
    }

    #[test]
    fn stretched_link_pulls_together() {
        let positions = vec![vec2(0.0, 0.0), vec2(200.0, 0.0)];
        let mut velocities = vec![Vec2::ZERO; 2];
        accumulate_links(&[(0, 1)], &[1, 1], &positions, &mut velocities, 100.0, 1.0);
        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
    }
}
