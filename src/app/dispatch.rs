use eframe::egui::{Pos2, Vec2};

use crate::topology::RelationKey;

use super::scene::Scene;
use super::selection::HoverTarget;

/// Pointer state for one frame, already converted to world space by the
/// backend that produced it.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerFrame {
    pub world: Option<Vec2>,
    pub screen: Option<Pos2>,
    /// Extra reach for relation hits, in world units.
    pub tolerance: f32,
    pub clicked: bool,
    pub drag_started: bool,
    pub drag_released: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    HoverEntity(Option<String>),
    HoverRelation(Option<RelationKey>),
    PointerMove(Pos2),
    ClickEntity(String),
    ClickBackground,
    DragStart { id: String, position: Vec2 },
    DragMove { id: String, position: Vec2 },
    DragEnd { id: String },
}

fn distance_to_segment(point: Vec2, from: Vec2, to: Vec2) -> f32 {
    let span = to - from;
    let length_sq = span.length_sq();
    if length_sq <= f32::EPSILON {
        return (point - from).length();
    }
    let t = ((point - from).dot(span) / length_sq).clamp(0.0, 1.0);
    (point - (from + span * t)).length()
}

/// Entities win over relations; among entities the topmost (last drawn)
/// one under the pointer is hit.
pub fn hit_test(scene: &Scene, point: Vec2, tolerance: f32) -> HoverTarget {
    if let Some(node) = scene
        .nodes
        .iter()
        .rev()
        .find(|node| (node.position - point).length() <= node.radius)
    {
        return HoverTarget::Entity(node.id.clone());
    }

    scene
        .edges
        .iter()
        .filter(|edge| !edge.dimmed)
        .map(|edge| (edge, distance_to_segment(point, edge.from, edge.to)))
        .filter(|(edge, distance)| *distance <= edge.width * 0.5 + tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(HoverTarget::Nothing, |(edge, _)| {
            HoverTarget::Relation(edge.key.clone())
        })
}

/// Turns raw pointer frames into graph events, tracking hover and drag
/// between frames so each transition is reported once.
#[derive(Default)]
pub struct Dispatcher {
    hover: HoverTarget,
    dragging: Option<String>,
}

impl Dispatcher {
    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn dispatch(&mut self, frame: &PointerFrame, scene: &Scene) -> Vec<GraphEvent> {
        let mut events = Vec::new();
        if let Some(screen) = frame.screen {
            events.push(GraphEvent::PointerMove(screen));
        }

        if let Some(id) = self.dragging.clone() {
            if frame.drag_released {
                self.dragging = None;
                events.push(GraphEvent::DragEnd { id });
            } else if let Some(position) = frame.world {
                events.push(GraphEvent::DragMove { id, position });
            }
            return events;
        }

        let hit = frame
            .world
            .map_or(HoverTarget::Nothing, |point| hit_test(scene, point, frame.tolerance));

        if frame.drag_started {
            if let (HoverTarget::Entity(id), Some(position)) = (&hit, frame.world) {
                self.dragging = Some(id.clone());
                events.push(GraphEvent::DragStart {
                    id: id.clone(),
                    position,
                });
                return events;
            }
        }

        if hit != self.hover {
            match (&self.hover, &hit) {
                (HoverTarget::Entity(_), _) => events.push(GraphEvent::HoverEntity(None)),
                (HoverTarget::Relation(_), _) => events.push(GraphEvent::HoverRelation(None)),
                (HoverTarget::Nothing, _) => {}
            }
            match &hit {
                HoverTarget::Entity(id) => events.push(GraphEvent::HoverEntity(Some(id.clone()))),
                HoverTarget::Relation(key) => {
                    events.push(GraphEvent::HoverRelation(Some(key.clone())))
                }
                HoverTarget::Nothing => {}
            }
            self.hover = hit.clone();
        }

        if frame.clicked {
            events.push(match hit {
                HoverTarget::Entity(id) => GraphEvent::ClickEntity(id),
                _ => GraphEvent::ClickBackground,
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Color32, vec2};

    use super::*;
    use crate::app::scene::{SceneEdge, SceneNode};

    fn node(id: &str, position: Vec2) -> SceneNode {
        SceneNode {
            id: id.into(),
            label: id.into(),
            position,
            radius: 10.0,
            fill: Color32::WHITE,
            border: Color32::TRANSPARENT,
            border_width: 0.0,
            alarm_ring: None,
            alarm_ring_dashed: false,
            primary: false,
            selected: false,
            highlighted: false,
            dimmed: false,
            show_label: true,
        }
    }

    fn scene() -> Scene {
        Scene {
            nodes: vec![node("A", vec2(0.0, 0.0)), node("C", vec2(100.0, 0.0))],
            edges: vec![SceneEdge {
                key: RelationKey {
                    source: "A".into(),
                    target: "C".into(),
                },
                from: vec2(0.0, 0.0),
                to: vec2(100.0, 0.0),
                color: Color32::WHITE,
                width: 2.0,
                dashed: false,
                highlighted: false,
                dimmed: false,
                label: None,
            }],
        }
    }

    fn at(x: f32, y: f32) -> PointerFrame {
        PointerFrame {
            world: Some(vec2(x, y)),
            tolerance: 3.0,
            ..PointerFrame::default()
        }
    }

    fn click(x: f32, y: f32) -> PointerFrame {
        PointerFrame {
            clicked: true,
            ..at(x, y)
        }
    }

    #[test]
    fn entities_take_priority_over_relations() {
        let scene = scene();
        assert_eq!(hit_test(&scene, vec2(5.0, 0.0), 3.0), HoverTarget::Entity("A".into()));
        assert!(matches!(hit_test(&scene, vec2(50.0, 2.0), 3.0), HoverTarget::Relation(_)));
        assert_eq!(hit_test(&scene, vec2(50.0, 20.0), 3.0), HoverTarget::Nothing);
    }

    #[test]
    fn entering_relation_clears_entity_hover_first() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();

        let events = dispatcher.dispatch(&at(2.0, 0.0), &scene);
        assert_eq!(events, vec![GraphEvent::HoverEntity(Some("A".into()))]);

        let events = dispatcher.dispatch(&at(50.0, 0.0), &scene);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], GraphEvent::HoverEntity(None));
        assert!(matches!(events[1], GraphEvent::HoverRelation(Some(_))));

        let events = dispatcher.dispatch(&at(50.0, 40.0), &scene);
        assert_eq!(events, vec![GraphEvent::HoverRelation(None)]);
    }

    #[test]
    fn unchanged_hover_emits_nothing() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();
        dispatcher.dispatch(&at(1.0, 0.0), &scene);
        assert!(dispatcher.dispatch(&at(2.0, 1.0), &scene).is_empty());
    }

    #[test]
    fn entity_click_does_not_reach_background() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();
        let events = dispatcher.dispatch(&click(100.0, 0.0), &scene);
        assert!(events.contains(&GraphEvent::ClickEntity("C".into())));
        assert!(!events.contains(&GraphEvent::ClickBackground));
    }

    #[test]
    fn relation_and_empty_clicks_hit_background() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();
        assert!(dispatcher
            .dispatch(&click(50.0, 0.0), &scene)
            .contains(&GraphEvent::ClickBackground));
        assert!(dispatcher
            .dispatch(&click(-300.0, 300.0), &scene)
            .contains(&GraphEvent::ClickBackground));
    }

    #[test]
    fn drag_suppresses_hover_and_clicks() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();

        let start = dispatcher.dispatch(
            &PointerFrame {
                drag_started: true,
                ..at(0.0, 0.0)
            },
            &scene,
        );
        assert_eq!(
            start,
            vec![GraphEvent::DragStart {
                id: "A".into(),
                position: vec2(0.0, 0.0)
            }]
        );
        assert!(dispatcher.is_dragging());

        let moved = dispatcher.dispatch(&click(50.0, 0.0), &scene);
        assert_eq!(
            moved,
            vec![GraphEvent::DragMove {
                id: "A".into(),
                position: vec2(50.0, 0.0)
            }]
        );

        let end = dispatcher.dispatch(
            &PointerFrame {
                drag_released: true,
                ..at(50.0, 0.0)
            },
            &scene,
        );
        assert_eq!(end, vec![GraphEvent::DragEnd { id: "A".into() }]);
        assert!(!dispatcher.is_dragging());
    }

    #[test]
    fn background_drag_is_not_an_entity_drag() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();
        let events = dispatcher.dispatch(
            &PointerFrame {
                drag_started: true,
                ..at(50.0, 80.0)
            },
            &scene,
        );
        assert!(events.is_empty());
        assert!(!dispatcher.is_dragging());
    }

    #[test]
    fn pointer_position_is_forwarded() {
        let scene = scene();
        let mut dispatcher = Dispatcher::default();
        let frame = PointerFrame {
            screen: Some(Pos2::new(12.0, 34.0)),
            ..at(500.0, 500.0)
        };
        assert_eq!(
            dispatcher.dispatch(&frame, &scene),
            vec![GraphEvent::PointerMove(Pos2::new(12.0, 34.0))]
        );
    }
}
