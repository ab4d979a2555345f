use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::encoding::{ForceParams, GroupPalette, LayoutConfig, LayoutKind, LayoutMode, VisualConfig};
use crate::topology::{Entity, Role, TopologyGraph, VisibleSubset};
use crate::util::stable_pair;

use super::physics::{LayoutInput, LayoutNode, Simulation};
use super::scene::node_radii;

/// Canvas the layout is centred in. An open detail panel covers the right
/// side, so the centre shifts left by half its width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub size: Vec2,
    pub panel_width: f32,
}

impl Viewport {
    pub fn center(self) -> Vec2 {
        vec2(-self.panel_width * 0.5, 0.0)
    }
}

pub fn layout_input(
    graph: &TopologyGraph,
    visible: &VisibleSubset,
    radius: impl Fn(&Entity) -> f32,
) -> LayoutInput {
    let mut slot_by_id = HashMap::with_capacity(visible.entities.len());
    let nodes = visible
        .entities
        .iter()
        .filter_map(|&index| graph.entities.get(index))
        .enumerate()
        .map(|(slot, entity)| {
            slot_by_id.insert(entity.id.as_str(), slot);
            LayoutNode {
                id: entity.id.clone(),
                group: entity.group.clone(),
                radius: radius(entity),
                primary: entity.role == Role::Primary,
            }
        })
        .collect();

    let links = visible
        .relations
        .iter()
        .filter_map(|&index| graph.relations.get(index))
        .filter_map(|relation| {
            Some((
                *slot_by_id.get(relation.source.as_str())?,
                *slot_by_id.get(relation.target.as_str())?,
            ))
        })
        .collect();

    LayoutInput { nodes, links }
}

fn group_order(input: &LayoutInput) -> Vec<&str> {
    let mut order: Vec<&str> = Vec::new();
    for node in &input.nodes {
        if !order.contains(&node.group.as_str()) {
            order.push(&node.group);
        }
    }
    order
}

/// Starting positions: group centres evenly spaced on a ring with members
/// jittered around them, or a plain ring when seeding by group is off.
/// Primary entities start next to the centre.
pub fn seed_positions(input: &LayoutInput, seed_by_group: bool, center: Vec2, params: &ForceParams) -> Vec<Vec2> {
    let count = input.nodes.len();
    if count == 0 {
        return Vec::new();
    }

    let spacing = params.link_distance.max(20.0);
    let ring_radius = (count as f32).sqrt() * spacing * 0.6 + spacing;
    let groups = group_order(input);
    let group_slot: HashMap<&str, usize> = groups
        .iter()
        .enumerate()
        .map(|(slot, group)| (*group, slot))
        .collect();
    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for node in &input.nodes {
        *group_sizes.entry(node.group.as_str()).or_default() += 1;
    }

    input
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let (jx, jy) = stable_pair(&node.id);
            if node.primary {
                return center + vec2(jx, jy) * 4.0;
            }

            if seed_by_group {
                let slot = group_slot.get(node.group.as_str()).copied().unwrap_or(0);
                let group_center = if groups.len() > 1 {
                    let angle = (slot as f32 / groups.len() as f32) * TAU;
                    center + vec2(angle.cos(), angle.sin()) * ring_radius
                } else {
                    center
                };
                let size = group_sizes.get(node.group.as_str()).copied().unwrap_or(1);
                let jitter = spacing * 0.35 + (size as f32).sqrt() * spacing * 0.2;
                group_center + vec2(jx, jy) * jitter
            } else {
                let angle = (index as f32 / count as f32) * TAU;
                center + vec2(angle.cos(), angle.sin()) * ring_radius + vec2(jx, jy) * spacing * 0.4
            }
        })
        .collect()
}

/// Entities on one circle, grouped members next to each other.
pub fn circular_positions(input: &LayoutInput, center: Vec2, params: &ForceParams) -> Vec<Vec2> {
    let count = input.nodes.len();
    if count == 0 {
        return Vec::new();
    }

    let groups = group_order(input);
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by_key(|&index| {
        let group = input.nodes[index].group.as_str();
        (groups.iter().position(|known| *known == group), index)
    });

    let circumference: f32 = input
        .nodes
        .iter()
        .map(|node| node.radius * 2.0 + params.collision_margin * 2.0)
        .sum();
    let radius = (circumference / TAU).max(params.link_distance);

    let mut positions = vec![center; count];
    for (slot, &index) in order.iter().enumerate() {
        let angle = (slot as f32 / count as f32) * TAU;
        positions[index] = center + vec2(angle.cos(), angle.sin()) * radius;
    }
    positions
}

/// Deterministic scatter over the viewport.
pub fn random_positions(input: &LayoutInput, center: Vec2, size: Vec2) -> Vec<Vec2> {
    let half = (size * 0.4).max(vec2(100.0, 100.0));
    input
        .nodes
        .iter()
        .map(|node| {
            let (jx, jy) = stable_pair(&node.id);
            center + vec2(jx * half.x, jy * half.y)
        })
        .collect()
}

/// Synchronous relaxation with a cooling step size. Primary entities stay
/// where they were seeded.
pub fn relax(input: &LayoutInput, mut positions: Vec<Vec2>, center: Vec2, params: &ForceParams) -> Vec<Vec2> {
    let n = input.nodes.len();
    if n < 2 {
        return positions;
    }

    let k = params.link_distance.max(20.0);
    let repulsion = k * k * (params.charge.abs() / 300.0).max(0.1);
    let mut temperature = k * 1.5;
    let cooling = 0.02_f32.powf(1.0 / params.iterations.max(1) as f32);
    let mut disp = vec![Vec2::ZERO; n];

    for _ in 0..params.iterations {
        disp.fill(Vec2::ZERO);

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = positions[i] - positions[j];
                let distance = delta.length().max(0.5);
                let direction = if delta.length_sq() > 1e-6 {
                    delta / distance
                } else {
                    let (jx, jy) = stable_pair(&input.nodes[i].id);
                    vec2(jx, jy).normalized()
                };

                let force = repulsion / distance;
                disp[i] += direction * force;
                disp[j] -= direction * force;

                let min_distance = input.nodes[i].radius + input.nodes[j].radius + params.collision_margin;
                if distance < min_distance {
                    let push = (min_distance - distance) * 2.0;
                    disp[i] += direction * push;
                    disp[j] -= direction * push;
                }
            }
        }

        for &(from, to) in &input.links {
            if from >= n || to >= n || from == to {
                continue;
            }
            let delta = positions[from] - positions[to];
            let distance = delta.length().max(0.5);
            let direction = delta / distance;
            let ideal = k + input.nodes[from].radius + input.nodes[to].radius;
            let force = (distance - ideal) * 0.5;
            disp[from] -= direction * force;
            disp[to] += direction * force;
        }

        for (index, node) in input.nodes.iter().enumerate() {
            if node.primary {
                continue;
            }
            disp[index] += (center - positions[index]) * params.center_strength;
            let step = disp[index].length();
            if step > 0.0 {
                positions[index] += disp[index] / step * step.min(temperature);
            }
        }

        temperature *= cooling;
    }

    positions
}

/// Builds the simulation for one visible subset according to the layout
/// configuration. Only continuous force layouts start hot.
pub fn build_simulation(input: &LayoutInput, config: &LayoutConfig, viewport: Viewport) -> Simulation {
    let center = viewport.center();
    let params = config.force;
    match (config.kind, config.mode) {
        (LayoutKind::Force, LayoutMode::Continuous) => {
            let seeded = seed_positions(input, config.seed_by_group, center, &params);
            Simulation::create(input, seeded, params, center)
        }
        (LayoutKind::Force, LayoutMode::Batch) => {
            let seeded = seed_positions(input, config.seed_by_group, center, &params);
            let settled = relax(input, seeded, center, &params);
            Simulation::cooled(input, settled, params, center)
        }
        (LayoutKind::Circular, _) => {
            Simulation::cooled(input, circular_positions(input, center, &params), params, center)
        }
        (LayoutKind::Random, _) => Simulation::cooled(
            input,
            random_positions(input, center, viewport.size),
            params,
            center,
        ),
    }
}

/// Lays out `visible` with node radii resolved from the visual config, so
/// collision spacing matches what gets drawn.
pub fn layout_visible(
    graph: &TopologyGraph,
    config: &VisualConfig,
    palette: &GroupPalette,
    visible: &VisibleSubset,
    viewport: Viewport,
) -> Simulation {
    let radii: HashMap<&str, f32> = visible
        .entities
        .iter()
        .filter_map(|&index| graph.entities.get(index))
        .map(|entity| entity.id.as_str())
        .zip(node_radii(graph, config, palette, visible))
        .collect();
    let input = layout_input(graph, visible, |entity| {
        radii.get(entity.id.as_str()).copied().unwrap_or(7.0)
    });
    build_simulation(&input, &config.layout, viewport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::scenario_graph;

    fn sample_input() -> LayoutInput {
        let nodes = (0..12)
            .map(|index| LayoutNode {
                id: format!("node-{index}"),
                group: format!("g{}", index % 3),
                radius: 7.0,
                primary: index == 0,
            })
            .collect();
        let links = (1..12).map(|index| (0, index)).collect();
        LayoutInput { nodes, links }
    }

    fn viewport() -> Viewport {
        Viewport {
            size: vec2(1200.0, 800.0),
            panel_width: 0.0,
        }
    }

    #[test]
    fn input_maps_visible_relations_to_slots() {
        let graph = scenario_graph();
        let visible = VisibleSubset {
            entities: vec![0, 2],
            relations: vec![0],
        };
        let input = layout_input(&graph, &visible, |_| 5.0);
        assert_eq!(input.nodes.len(), 2);
        assert_eq!(input.nodes[1].id, "C");
        assert_eq!(input.links, vec![(0, 1)]);
    }

    #[test]
    fn batch_layout_is_deterministic_and_cooled() {
        let input = sample_input();
        let config = LayoutConfig {
            mode: LayoutMode::Batch,
            seed_by_group: true,
            ..LayoutConfig::default()
        };

        let first = build_simulation(&input, &config, viewport());
        let second = build_simulation(&input, &config, viewport());
        assert!(!first.is_active());
        let a: Vec<_> = first.positions().map(|(_, pos)| pos).collect();
        let b: Vec<_> = second.positions().map(|(_, pos)| pos).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|pos| pos.x.is_finite() && pos.y.is_finite()));
    }

    #[test]
    fn batch_layout_keeps_primary_near_centre() {
        let input = sample_input();
        let config = LayoutConfig {
            mode: LayoutMode::Batch,
            ..LayoutConfig::default()
        };
        let simulation = build_simulation(&input, &config, viewport());
        let primary = simulation.position("node-0").expect("primary placed");
        assert!(primary.length() < 10.0);

        let spread = simulation
            .positions()
            .map(|(_, pos)| (pos - primary).length())
            .fold(0.0_f32, f32::max);
        assert!(spread > 50.0);
    }

    #[test]
    fn batch_layout_separates_overlapping_nodes() {
        let input = sample_input();
        let config = LayoutConfig {
            mode: LayoutMode::Batch,
            seed_by_group: true,
            ..LayoutConfig::default()
        };
        let simulation = build_simulation(&input, &config, viewport());
        let positions: Vec<Vec2> = simulation.positions().map(|(_, pos)| pos).collect();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                assert!((positions[i] - positions[j]).length() > 7.0);
            }
        }
    }

    #[test]
    fn continuous_layout_starts_hot() {
        let simulation = build_simulation(&sample_input(), &LayoutConfig::default(), viewport());
        assert!(simulation.is_active());
    }

    #[test]
    fn open_panel_shifts_centre_left() {
        let shifted = Viewport {
            size: vec2(1200.0, 800.0),
            panel_width: 360.0,
        };
        assert_eq!(shifted.center(), vec2(-180.0, 0.0));

        let config = LayoutConfig {
            kind: LayoutKind::Circular,
            ..LayoutConfig::default()
        };
        let simulation = build_simulation(&sample_input(), &config, shifted);
        let count = simulation.node_count() as f32;
        let centroid = simulation
            .positions()
            .fold(Vec2::ZERO, |sum, (_, pos)| sum + pos)
            / count;
        assert!((centroid - shifted.center()).length() < 1.0);
    }

    #[test]
    fn circular_and_random_layouts_are_cooled() {
        for kind in [LayoutKind::Circular, LayoutKind::Random] {
            let config = LayoutConfig {
                kind,
                ..LayoutConfig::default()
            };
            let simulation = build_simulation(&sample_input(), &config, viewport());
            assert!(!simulation.is_active());
            assert_eq!(simulation.node_count(), 12);
        }
    }

    #[test]
    fn visible_layout_places_only_visible_entities() {
        let graph = scenario_graph();
        let config = VisualConfig::default();
        let palette = super::super::scene::group_palette(&graph, &config);
        let visible = VisibleSubset {
            entities: vec![0, 2],
            relations: vec![0],
        };
        let simulation = layout_visible(&graph, &config, &palette, &visible, viewport());
        assert_eq!(simulation.node_count(), 2);
        assert!(simulation.position("A").is_some());
        assert!(simulation.position("B").is_none());
    }
}
