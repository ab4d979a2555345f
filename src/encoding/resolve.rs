use std::collections::{BTreeMap, HashMap};

use eframe::egui::Color32;

use crate::topology::{Entity, Relation, Role};

use super::color::{GroupPalette, interpolate, parse_color, parse_color_or};
use super::config::{
    DEFAULT_EDGE_COLOR, DEFAULT_NODE_COLOR, EdgeColorStrategy, EdgeSizeStrategy,
    NodeBorderConfig, NodeColorStrategy, NodeSizeStrategy, TRANSPARENT,
};

pub const PRIMARY_BASE_RADIUS: f32 = 20.0;
pub const SECONDARY_BASE_RADIUS: f32 = 7.0;
pub const HOVER_THICKNESS_SCALE: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    /// Position of `value` inside the range, clamped to `[0, 1]`.
    /// A degenerate range (`min == max`) maps everything to its start.
    pub fn normalize(self, value: f64) -> f32 {
        let span = self.max - self.min;
        if !span.is_finite() || span.abs() < f64::EPSILON {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0) as f32
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

#[derive(Clone, Debug, Default)]
pub struct MetricRanges {
    ranges: HashMap<String, MetricRange>,
}

impl MetricRanges {
    pub fn collect<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a BTreeMap<String, f64>>,
    {
        let mut ranges: HashMap<String, MetricRange> = HashMap::new();
        for metrics in items {
            for (key, &value) in metrics {
                if !value.is_finite() {
                    continue;
                }
                ranges
                    .entry(key.clone())
                    .and_modify(|range| range.include(value))
                    .or_insert(MetricRange {
                        min: value,
                        max: value,
                    });
            }
        }
        Self { ranges }
    }

    pub fn get(&self, key: &str) -> Option<MetricRange> {
        self.ranges.get(key).copied()
    }
}

/// Per-pass context for resolving visuals over the visible subset.
pub struct ResolveContext<'a> {
    pub palette: &'a GroupPalette,
    pub node_metrics: MetricRanges,
    pub edge_metrics: MetricRanges,
    pub weight_range: MetricRange,
    pub degrees: HashMap<&'a str, usize>,
    pub max_degree: usize,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        palette: &'a GroupPalette,
        entities: &[&'a Entity],
        relations: &[&'a Relation],
    ) -> Self {
        let mut degrees: HashMap<&'a str, usize> = HashMap::new();
        for &relation in relations {
            *degrees.entry(relation.source.as_str()).or_insert(0) += 1;
            *degrees.entry(relation.target.as_str()).or_insert(0) += 1;
        }
        let max_degree = degrees.values().copied().max().unwrap_or(0);

        let mut weight_range = MetricRange { min: 0.0, max: 1.0 };
        for relation in relations {
            weight_range.include(relation.weight as f64);
        }

        Self {
            palette,
            node_metrics: MetricRanges::collect(entities.iter().map(|entity| &entity.metrics)),
            edge_metrics: MetricRanges::collect(relations.iter().map(|relation| &relation.metrics)),
            weight_range,
            degrees,
            max_degree,
        }
    }

    pub fn degree(&self, id: &str) -> usize {
        self.degrees.get(id).copied().unwrap_or(0)
    }
}

pub fn resolve_node_color(
    entity: &Entity,
    strategy: &NodeColorStrategy,
    ctx: &ResolveContext<'_>,
) -> Color32 {
    match strategy {
        NodeColorStrategy::Fixed { color } => parse_color_or(Some(color), DEFAULT_NODE_COLOR),
        NodeColorStrategy::ByGroup {
            palette,
            default_color,
        } => {
            let fallback = parse_color_or(default_color.as_deref(), DEFAULT_NODE_COLOR);
            if entity.group.is_empty() {
                return fallback;
            }
            palette
                .get(&entity.group)
                .and_then(|value| parse_color(value))
                .or_else(|| ctx.palette.color_for_known(&entity.group))
                .unwrap_or(fallback)
        }
        NodeColorStrategy::ByStatus {
            status_colors,
            default_color,
        } => {
            let fallback = parse_color_or(default_color.as_deref(), DEFAULT_NODE_COLOR);
            entity
                .status
                .as_ref()
                .and_then(|status| status_colors.get(status))
                .and_then(|value| parse_color(value))
                .unwrap_or(fallback)
        }
        NodeColorStrategy::ByMetricGradient {
            metric_key,
            gradient_start,
            gradient_end,
        } => {
            let start = parse_color_or(Some(gradient_start), DEFAULT_NODE_COLOR);
            let end = parse_color_or(Some(gradient_end), DEFAULT_NODE_COLOR);
            let (Some(value), Some(range)) =
                (entity.metric(metric_key), ctx.node_metrics.get(metric_key))
            else {
                return start;
            };
            interpolate(start, end, range.normalize(value))
        }
    }
}

/// `base + log2(d+1) / log2(max+1) * (max_size - base)`; collapses to `base`
/// when nothing in view has a relation.
pub fn degree_size(degree: usize, max_degree: usize, base: f32, max_size: f32) -> f32 {
    if max_degree == 0 || degree == 0 {
        return base;
    }
    let t = ((degree as f32) + 1.0).log2() / ((max_degree as f32) + 1.0).log2();
    base + t.clamp(0.0, 1.0) * (max_size - base)
}

pub fn role_radius(role: Role, degree: usize) -> f32 {
    let base = match role {
        Role::Primary => PRIMARY_BASE_RADIUS,
        Role::Secondary => SECONDARY_BASE_RADIUS,
    };
    let bonus = if degree > 0 {
        ((degree as f32) + 1.0).log2() * 4.0
    } else {
        0.0
    };
    base + bonus
}

pub fn resolve_node_size(
    entity: &Entity,
    strategy: &NodeSizeStrategy,
    ctx: &ResolveContext<'_>,
) -> f32 {
    if let Some(size) = entity.explicit_size() {
        return size;
    }

    match strategy {
        NodeSizeStrategy::Fixed { size } => *size,
        NodeSizeStrategy::ByType {
            type_sizes,
            default_size,
        } => entity
            .entity_type
            .as_ref()
            .and_then(|kind| type_sizes.get(kind))
            .copied()
            .or(*default_size)
            .unwrap_or(8.0),
        NodeSizeStrategy::ByMetric {
            metric_key,
            min,
            max,
        } => {
            let (Some(value), Some(range)) =
                (entity.metric(metric_key), ctx.node_metrics.get(metric_key))
            else {
                return *min;
            };
            min + range.normalize(value) * (max - min)
        }
        NodeSizeStrategy::ByDegree {
            min,
            max,
            base_by_type,
        } => {
            let base = entity
                .entity_type
                .as_ref()
                .and_then(|kind| base_by_type.get(kind))
                .copied()
                .unwrap_or(*min);
            degree_size(ctx.degree(&entity.id), ctx.max_degree, base, *max)
        }
        NodeSizeStrategy::ByRole => role_radius(entity.role, ctx.degree(&entity.id)),
    }
}

pub fn resolve_border_color(entity: &Entity, border: Option<&NodeBorderConfig>) -> Color32 {
    let Some(border) = border else {
        return Color32::TRANSPARENT;
    };
    let fallback = parse_color_or(Some(&border.default_color), TRANSPARENT);
    entity
        .status
        .as_ref()
        .and_then(|status| border.status_colors.get(status))
        .and_then(|value| parse_color(value))
        .unwrap_or(fallback)
}

pub fn resolve_edge_color(
    relation: &Relation,
    strategy: &EdgeColorStrategy,
    ctx: &ResolveContext<'_>,
    source_color: Option<Color32>,
) -> Color32 {
    let fallback = || parse_color_or(None, DEFAULT_EDGE_COLOR);
    match strategy {
        EdgeColorStrategy::Fixed { color } => parse_color_or(Some(color), DEFAULT_EDGE_COLOR),
        EdgeColorStrategy::ByType {
            type_colors,
            default_color,
        } => relation
            .kind
            .as_ref()
            .and_then(|kind| type_colors.get(kind))
            .and_then(|value| parse_color(value))
            .unwrap_or_else(|| parse_color_or(default_color.as_deref(), DEFAULT_EDGE_COLOR)),
        EdgeColorStrategy::BySource => source_color.unwrap_or_else(fallback),
        EdgeColorStrategy::ByGroup => ctx
            .palette
            .color_for_known(&relation.transport.group)
            .unwrap_or_else(fallback),
    }
}

pub fn default_thickness(weight: f32) -> f32 {
    (weight / 4.0).max(1.0)
}

pub fn resolve_edge_thickness(
    relation: &Relation,
    strategy: &EdgeSizeStrategy,
    ctx: &ResolveContext<'_>,
) -> f32 {
    if let Some(thickness) = relation.thickness_override.filter(|value| *value > 0.0) {
        return thickness;
    }

    match strategy {
        EdgeSizeStrategy::Default => default_thickness(relation.weight),
        EdgeSizeStrategy::Fixed { size } => *size,
        EdgeSizeStrategy::ByWeight { min, max } => {
            min + ctx.weight_range.normalize(relation.weight as f64) * (max - min)
        }
        EdgeSizeStrategy::ByMetric {
            metric_key,
            min,
            max,
        } => {
            let (Some(value), Some(range)) = (
                relation.metrics.get(metric_key).copied(),
                ctx.edge_metrics.get(metric_key),
            ) else {
                return *min;
            };
            min + range.normalize(value) * (max - min)
        }
    }
}

pub fn hover_thickness(current: f32) -> f32 {
    current * HOVER_THICKNESS_SCALE
}

/// Relations missing either capability are drawn dashed.
pub fn is_dashed(relation: &Relation) -> bool {
    !(relation.has_radio_config && relation.has_transport_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::color::GROUP_PALETTE;
    use crate::topology::{Entity, Relation};

    fn entity_with(id: &str, group: &str, metric: Option<f64>) -> Entity {
        let mut entity = Entity::new(id, group);
        if let Some(value) = metric {
            entity.metrics.insert("load".into(), value);
        }
        entity
    }

    #[test]
    fn degenerate_range_returns_gradient_start() {
        let palette = GroupPalette::new(["g"], Color32::GRAY);
        let a = entity_with("a", "g", Some(5.0));
        let b = entity_with("b", "g", Some(5.0));
        let ctx = ResolveContext::new(&palette, &[&a, &b], &[]);
        let strategy = NodeColorStrategy::ByMetricGradient {
            metric_key: "load".into(),
            gradient_start: "#000000".into(),
            gradient_end: "#ffffff".into(),
        };
        assert_eq!(resolve_node_color(&a, &strategy, &ctx), Color32::from_rgb(0, 0, 0));
    }

    #[test]
    fn gradient_spans_observed_range() {
        let palette = GroupPalette::new(["g"], Color32::GRAY);
        let low = entity_with("low", "g", Some(0.0));
        let high = entity_with("high", "g", Some(10.0));
        let missing = entity_with("missing", "g", None);
        let ctx = ResolveContext::new(&palette, &[&low, &high, &missing], &[]);
        let strategy = NodeColorStrategy::ByMetricGradient {
            metric_key: "load".into(),
            gradient_start: "#000000".into(),
            gradient_end: "#ffffff".into(),
        };
        assert_eq!(resolve_node_color(&high, &strategy, &ctx), Color32::from_rgb(255, 255, 255));
        assert_eq!(resolve_node_color(&missing, &strategy, &ctx), Color32::from_rgb(0, 0, 0));
    }

    #[test]
    fn by_group_uses_palette_then_default() {
        let palette = GroupPalette::new(["g1", "g2"], Color32::GRAY);
        let ctx = ResolveContext::new(&palette, &[], &[]);
        let strategy = NodeColorStrategy::ByGroup {
            palette: [("g2".to_owned(), "#000000".to_owned())].into(),
            default_color: Some("#ffffff".into()),
        };
        let first = entity_with("a", "g1", None);
        let second = entity_with("b", "g2", None);
        let stranger = entity_with("c", "g9", None);
        assert_eq!(resolve_node_color(&first, &strategy, &ctx), GROUP_PALETTE[0]);
        assert_eq!(resolve_node_color(&second, &strategy, &ctx), Color32::from_rgb(0, 0, 0));
        assert_eq!(
            resolve_node_color(&stranger, &strategy, &ctx),
            Color32::from_rgb(255, 255, 255)
        );
    }

    #[test]
    fn degree_size_is_logarithmic_and_collapses_without_relations() {
        assert_eq!(degree_size(3, 0, 6.0, 24.0), 6.0);
        assert_eq!(degree_size(0, 7, 6.0, 24.0), 6.0);
        assert!((degree_size(7, 7, 6.0, 24.0) - 24.0).abs() < 1e-4);
        assert!((degree_size(1, 3, 6.0, 24.0) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn role_radius_boosts_by_degree() {
        assert_eq!(role_radius(Role::Primary, 0), 20.0);
        assert_eq!(role_radius(Role::Secondary, 0), 7.0);
        assert!((role_radius(Role::Secondary, 3) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn explicit_size_override_wins() {
        let palette = GroupPalette::new(["g"], Color32::GRAY);
        let mut entity = entity_with("a", "g", None);
        entity.size_override = Some(40.0);
        let ctx = ResolveContext::new(&palette, &[&entity], &[]);
        assert_eq!(resolve_node_size(&entity, &NodeSizeStrategy::ByRole, &ctx), 40.0);
        assert_eq!(
            resolve_node_size(&entity, &NodeSizeStrategy::Fixed { size: 3.0 }, &ctx),
            40.0
        );

        let mut unsized_entity = entity.clone();
        unsized_entity.size_override = Some(0.0);
        let ctx = ResolveContext::new(&palette, &[&unsized_entity], &[]);
        assert_eq!(
            resolve_node_size(&unsized_entity, &NodeSizeStrategy::Fixed { size: 3.0 }, &ctx),
            3.0
        );
    }

    #[test]
    fn by_degree_counts_visible_relations() {
        let palette = GroupPalette::new(["g"], Color32::GRAY);
        let hub = entity_with("hub", "g", None);
        let leaf = entity_with("leaf", "g", None);
        let other = entity_with("other", "g", None);
        let first = Relation::new("hub", "leaf");
        let second = Relation::new("hub", "other");
        let ctx = ResolveContext::new(&palette, &[&hub, &leaf, &other], &[&first, &second]);
        let strategy = NodeSizeStrategy::ByDegree {
            min: 6.0,
            max: 24.0,
            base_by_type: BTreeMap::new(),
        };
        assert_eq!(ctx.degree("hub"), 2);
        assert!((resolve_node_size(&hub, &strategy, &ctx) - 24.0).abs() < 1e-4);
        assert!(resolve_node_size(&leaf, &strategy, &ctx) < 24.0);
    }

    #[test]
    fn edge_thickness_defaults_and_hover_scales_current() {
        let palette = GroupPalette::new(["g"], Color32::GRAY);
        let ctx = ResolveContext::new(&palette, &[], &[]);
        let mut relation = Relation::new("a", "b");
        relation.weight = 2.0;
        assert_eq!(resolve_edge_thickness(&relation, &EdgeSizeStrategy::Default, &ctx), 1.0);
        relation.weight = 12.0;
        assert_eq!(resolve_edge_thickness(&relation, &EdgeSizeStrategy::Default, &ctx), 3.0);
        relation.thickness_override = Some(6.0);
        let current = resolve_edge_thickness(&relation, &EdgeSizeStrategy::Default, &ctx);
        assert_eq!(hover_thickness(current), 9.0);
    }

    #[test]
    fn dashed_unless_both_capabilities_present() {
        let mut relation = Relation::new("a", "b");
        assert!(!is_dashed(&relation));
        relation.has_radio_config = false;
        assert!(is_dashed(&relation));
        relation.has_radio_config = true;
        relation.has_transport_config = false;
        assert!(is_dashed(&relation));
    }

    #[test]
    fn border_uses_status_map() {
        let border = NodeBorderConfig {
            status_colors: [("Critical".to_owned(), "#EF4444".to_owned())].into(),
            default_color: "transparent".into(),
            ratio: 0.15,
        };
        let mut entity = Entity::new("a", "g");
        assert_eq!(resolve_border_color(&entity, Some(&border)), Color32::TRANSPARENT);
        entity.status = Some("Critical".into());
        assert_eq!(
            resolve_border_color(&entity, Some(&border)),
            Color32::from_rgb(0xEF, 0x44, 0x44)
        );
        assert_eq!(resolve_border_color(&entity, None), Color32::TRANSPARENT);
    }
}
