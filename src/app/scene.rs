use std::collections::{BTreeSet, HashSet};

use eframe::egui::{Color32, Rect, Vec2, pos2};

use crate::encoding::{
    DEFAULT_NODE_COLOR, DIMMED_NODE, GroupPalette, NodeColorStrategy, ResolveContext,
    SEARCH_HIGHLIGHT, VisualConfig, hover_thickness, is_dashed, palette_overrides, parse_color_or,
    resolve_border_color, resolve_edge_color, resolve_edge_thickness, resolve_node_color,
    resolve_node_size, severity_color, with_alpha,
};
use crate::topology::{Entity, Relation, RelationKey, Role, TopologyGraph, VisibleSubset};

use super::selection::HoverTarget;

const PRIMARY_OUTLINE: Color32 = Color32::from_rgb(0xE2, 0xE8, 0xF0);
const RESTING_EDGE_ALPHA: u8 = 0x88;
const DIMMED_EDGE_ALPHA: u8 = 0x1A;

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub position: Vec2,
    pub radius: f32,
    pub fill: Color32,
    pub border: Color32,
    pub border_width: f32,
    pub alarm_ring: Option<Color32>,
    pub alarm_ring_dashed: bool,
    pub primary: bool,
    pub selected: bool,
    pub highlighted: bool,
    pub dimmed: bool,
    pub show_label: bool,
}

#[derive(Clone, Debug)]
pub struct SceneEdge {
    pub key: RelationKey,
    pub from: Vec2,
    pub to: Vec2,
    pub color: Color32,
    pub width: f32,
    pub dashed: bool,
    pub highlighted: bool,
    pub dimmed: bool,
    pub label: Option<String>,
}

/// Everything a backend needs to draw one frame, in world coordinates.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
}

/// Drawing surface for a [`Scene`]. Edges are drawn first, then nodes, then
/// labels, so labels are never covered.
pub trait SceneBackend {
    fn draw_edge(&mut self, edge: &SceneEdge);
    fn draw_node(&mut self, node: &SceneNode);
    fn draw_label(&mut self, node: &SceneNode);
}

impl Scene {
    /// World-space bounds including radii and alarm rings.
    pub fn bounds(&self) -> Option<Rect> {
        let mut nodes = self.nodes.iter();
        let first = nodes.next()?;
        let grow = |node: &SceneNode| {
            let reach = node.radius + 6.0;
            Rect::from_min_max(
                pos2(node.position.x - reach, node.position.y - reach),
                pos2(node.position.x + reach, node.position.y + reach),
            )
        };
        Some(nodes.fold(grow(first), |bounds, node| bounds.union(grow(node))))
    }

    pub fn render(&self, backend: &mut impl SceneBackend) {
        for edge in &self.edges {
            backend.draw_edge(edge);
        }
        for node in &self.nodes {
            backend.draw_node(node);
        }
        for node in self.nodes.iter().filter(|node| node.show_label) {
            backend.draw_label(node);
        }
    }
}

/// Palette for the graph's groups: roster order first, then explicit
/// overrides from the visual config and the roster's own colours.
pub fn group_palette(graph: &TopologyGraph, config: &VisualConfig) -> GroupPalette {
    let (configured, default_color) = match &config.node_color {
        NodeColorStrategy::ByGroup {
            palette,
            default_color,
        } => (Some(palette), default_color.as_deref()),
        _ => (None, None),
    };

    let palette = GroupPalette::new(
        graph.group_keys(),
        parse_color_or(default_color, DEFAULT_NODE_COLOR),
    );
    let palette = match configured {
        Some(map) => palette.with_overrides(palette_overrides(map)),
        None => palette,
    };
    palette.with_overrides(graph.metadata.groups.iter().filter_map(|group| {
        group
            .color
            .as_deref()
            .map(|color| (group.key.as_str(), color))
    }))
}

fn visible_items<'a>(
    graph: &'a TopologyGraph,
    visible: &VisibleSubset,
) -> (Vec<&'a Entity>, Vec<&'a Relation>) {
    let entities = visible
        .entities
        .iter()
        .filter_map(|&index| graph.entities.get(index))
        .collect();
    let relations = visible
        .relations
        .iter()
        .filter_map(|&index| graph.relations.get(index))
        .collect();
    (entities, relations)
}

/// Resolved radius of every visible entity, in visible order.
pub fn node_radii(
    graph: &TopologyGraph,
    config: &VisualConfig,
    palette: &GroupPalette,
    visible: &VisibleSubset,
) -> Vec<f32> {
    let (entities, relations) = visible_items(graph, visible);
    let ctx = ResolveContext::new(palette, &entities, &relations);
    entities
        .iter()
        .map(|entity| resolve_node_size(entity, &config.node_size, &ctx))
        .collect()
}

pub struct SceneInput<'a> {
    pub graph: &'a TopologyGraph,
    pub config: &'a VisualConfig,
    pub palette: &'a GroupPalette,
    pub visible: &'a VisibleSubset,
    pub selected: Option<&'a str>,
    pub hover: &'a HoverTarget,
    pub matches: Option<&'a BTreeSet<String>>,
}

/// Resolves visuals for the visible subset. Entities without a position are
/// left out together with their relations.
pub fn build_scene(input: &SceneInput<'_>, position: impl Fn(&str) -> Option<Vec2>) -> Scene {
    let (entities, relations) = visible_items(input.graph, input.visible);
    let ctx = ResolveContext::new(input.palette, &entities, &relations);
    let config = input.config;

    let search = input.matches.filter(|matches| !matches.is_empty());
    let hovered_entity = input.hover.entity();
    let hovered_relation = input.hover.relation();
    let neighbourhood: Option<HashSet<&str>> = hovered_entity.map(|id| {
        relations
            .iter()
            .filter_map(|relation| relation.other_end(id))
            .chain(std::iter::once(id))
            .collect()
    });

    let mut nodes = Vec::with_capacity(entities.len());
    for entity in &entities {
        let Some(position) = position(&entity.id) else {
            continue;
        };

        let matched = search.is_some_and(|matches| matches.contains(&entity.id));
        let dimmed = match (search, &neighbourhood) {
            (Some(_), _) => !matched,
            (None, Some(around)) => !around.contains(entity.id.as_str()),
            (None, None) => false,
        };
        let selected = input.selected == Some(entity.id.as_str());
        let hovered = hovered_entity == Some(entity.id.as_str());
        let primary = entity.role == Role::Primary;

        let radius = resolve_node_size(entity, &config.node_size, &ctx);
        let mut fill = resolve_node_color(entity, &config.node_color, &ctx);
        let mut border = resolve_border_color(entity, config.node_border.as_ref());
        let mut border_width = config
            .node_border
            .as_ref()
            .map_or(0.0, |border| radius * border.ratio);
        if primary && border_width < 2.5 {
            border_width = 2.5;
            if border == Color32::TRANSPARENT {
                border = PRIMARY_OUTLINE;
            }
        }
        if matched {
            border = SEARCH_HIGHLIGHT;
            border_width = border_width.max(2.0);
        }
        if dimmed {
            fill = DIMMED_NODE;
            border = DIMMED_NODE;
        }

        let severity = entity.alarm_severity();
        let alarm_ring = entity
            .has_active_alarm
            .then(|| severity_color(severity.unwrap_or_default()));
        let alarm_ring_dashed = severity == Some("Major");

        let forced_label = entity
            .entity_type
            .as_ref()
            .is_some_and(|kind| config.labels.force_label_types.contains(kind));
        let show_label = !dimmed
            && (config.labels.show_node_labels || forced_label || matched || selected || hovered);

        nodes.push(SceneNode {
            id: entity.id.clone(),
            label: entity.label.clone(),
            position,
            radius,
            fill,
            border,
            border_width,
            alarm_ring: if dimmed { None } else { alarm_ring },
            alarm_ring_dashed,
            primary,
            selected,
            highlighted: matched || selected || hovered,
            dimmed,
            show_label,
        });
    }

    let mut edges = Vec::with_capacity(relations.len());
    for relation in &relations {
        let (Some(from), Some(to)) = (position(&relation.source), position(&relation.target)) else {
            continue;
        };

        let key = relation.key();
        let hovered = hovered_relation == Some(&key);
        let dimmed = if let Some(matches) = search {
            !matches.contains(&relation.source) && !matches.contains(&relation.target)
        } else if let Some(id) = hovered_entity {
            !relation.touches(id)
        } else {
            false
        };
        let highlighted = hovered || hovered_entity.is_some_and(|id| relation.touches(id));

        let source_color = input
            .graph
            .entity(&relation.source)
            .map(|entity| resolve_node_color(entity, &config.node_color, &ctx));
        let color = resolve_edge_color(relation, &config.edge_color, &ctx, source_color);
        let color = if dimmed {
            with_alpha(color, DIMMED_EDGE_ALPHA)
        } else if highlighted {
            color
        } else {
            with_alpha(color, RESTING_EDGE_ALPHA)
        };

        let base_width = resolve_edge_thickness(relation, &config.edge_size, &ctx);
        let width = if hovered { hover_thickness(base_width) } else { base_width };
        let label = relation
            .label
            .clone()
            .filter(|_| !dimmed && (config.labels.show_edge_labels || hovered));

        edges.push(SceneEdge {
            key,
            from,
            to,
            color,
            width,
            dashed: is_dashed(relation),
            highlighted,
            dimmed,
            label,
        });
    }

    Scene { nodes, edges }
}
