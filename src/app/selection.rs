use eframe::egui::{Pos2, Vec2};

use crate::topology::RelationKey;

use super::dispatch::GraphEvent;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HoverTarget {
    #[default]
    Nothing,
    Entity(String),
    Relation(RelationKey),
}

impl HoverTarget {
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Entity(id) => Some(id),
            _ => None,
        }
    }

    pub fn relation(&self) -> Option<&RelationKey> {
        match self {
            Self::Relation(key) => Some(key),
            _ => None,
        }
    }
}

/// What the pointer is doing with the graph right now.
#[derive(Default)]
pub struct SelectionState {
    selected: Option<String>,
    hover: HoverTarget,
    pointer: Option<Pos2>,
    drag: Option<String>,
}

/// A requested change to the simulation caused by dragging an entity.
#[derive(Clone, Debug, PartialEq)]
pub enum DragCommand {
    Pin { id: String, position: Vec2 },
    Release { id: String },
}

#[derive(Debug, Default, PartialEq)]
pub struct SelectionOutcome {
    pub selection_changed: bool,
    pub drag: Option<DragCommand>,
}

impl SelectionState {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hover(&self) -> &HoverTarget {
        &self.hover
    }

    pub fn pointer(&self) -> Option<Pos2> {
        self.pointer
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_deref()
    }

    pub fn select(&mut self, id: Option<String>) -> bool {
        if self.selected == id {
            return false;
        }
        self.selected = id;
        true
    }

    /// Drops a hover that points at entities no longer shown. The selection
    /// is kept so neighbour focus can bring a hidden entity back.
    pub fn forget_hidden_hover(&mut self, is_visible: impl Fn(&str) -> bool) {
        let hovered_gone = match &self.hover {
            HoverTarget::Entity(id) => !is_visible(id),
            HoverTarget::Relation(key) => !is_visible(&key.source) || !is_visible(&key.target),
            HoverTarget::Nothing => false,
        };
        if hovered_gone {
            self.hover = HoverTarget::Nothing;
        }
    }

    pub fn apply(&mut self, event: &GraphEvent) -> SelectionOutcome {
        let mut outcome = SelectionOutcome::default();
        match event {
            GraphEvent::HoverEntity(Some(id)) => self.hover = HoverTarget::Entity(id.clone()),
            GraphEvent::HoverRelation(Some(key)) => self.hover = HoverTarget::Relation(key.clone()),
            GraphEvent::HoverEntity(None) => {
                if self.hover.entity().is_some() {
                    self.hover = HoverTarget::Nothing;
                }
            }
            GraphEvent::HoverRelation(None) => {
                if self.hover.relation().is_some() {
                    self.hover = HoverTarget::Nothing;
                }
            }
            GraphEvent::PointerMove(position) => self.pointer = Some(*position),
            GraphEvent::ClickEntity(id) => {
                let next = if self.selected.as_deref() == Some(id.as_str()) {
                    None
                } else {
                    Some(id.clone())
                };
                outcome.selection_changed = self.select(next);
            }
            GraphEvent::ClickBackground => outcome.selection_changed = self.select(None),
            GraphEvent::DragStart { id, position } => {
                self.drag = Some(id.clone());
                outcome.drag = Some(DragCommand::Pin {
                    id: id.clone(),
                    position: *position,
                });
            }
            GraphEvent::DragMove { id, position } => {
                outcome.drag = Some(DragCommand::Pin {
                    id: id.clone(),
                    position: *position,
                });
            }
            GraphEvent::DragEnd { id } => {
                self.drag = None;
                outcome.drag = Some(DragCommand::Release { id: id.clone() });
            }
        }
        outcome
    }
}
