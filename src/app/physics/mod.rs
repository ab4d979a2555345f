mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::Vec2;

use crate::encoding::ForceParams;
use forces::{Collision, accumulate_charge, accumulate_collisions, accumulate_links};
use quadtree::QuadTree;

const BARNES_HUT_THETA: f32 = 0.9;
const COLLISION_STRENGTH: f32 = 0.7;
pub const ALPHA_MIN: f32 = 0.001;
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

/// One entity as the layout sees it.
#[derive(Clone, Debug)]
pub struct LayoutNode {
    pub id: String,
    pub group: String,
    pub radius: f32,
    pub primary: bool,
}

/// The visible subset reduced to what the forces need.
#[derive(Clone, Debug, Default)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<(usize, usize)>,
}

/// An owned force simulation over one visible subset.
pub struct Simulation {
    ids: Vec<String>,
    index_by_id: HashMap<String, usize>,
    radii: Vec<f32>,
    degrees: Vec<usize>,
    links: Vec<(usize, usize)>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pins: Vec<Option<Vec2>>,
    params: ForceParams,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
}

impl Simulation {
    /// A hot simulation starting from `initial` positions.
    pub fn create(input: &LayoutInput, initial: Vec<Vec2>, params: ForceParams, center: Vec2) -> Self {
        let count = input.nodes.len();
        let mut degrees = vec![0usize; count];
        let links: Vec<(usize, usize)> = input
            .links
            .iter()
            .copied()
            .filter(|&(source, target)| source < count && target < count)
            .collect();
        for &(source, target) in &links {
            degrees[source] += 1;
            degrees[target] += 1;
        }

        let mut positions = initial;
        positions.resize(count, center);

        Self {
            ids: input.nodes.iter().map(|node| node.id.clone()).collect(),
            index_by_id: input
                .nodes
                .iter()
                .enumerate()
                .map(|(index, node)| (node.id.clone(), index))
                .collect(),
            radii: input.nodes.iter().map(|node| node.radius).collect(),
            degrees,
            links,
            positions,
            velocities: vec![Vec2::ZERO; count],
            pins: vec![None; count],
            params,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    /// Already settled; only reheated by dragging.
    pub fn cooled(input: &LayoutInput, positions: Vec<Vec2>, params: ForceParams, center: Vec2) -> Self {
        let mut simulation = Self::create(input, positions, params, center);
        simulation.alpha = 0.0;
        simulation
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_active(&self) -> bool {
        self.alpha >= ALPHA_MIN || self.alpha_target >= ALPHA_MIN
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.positions.get(index))
            .copied()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.positions.iter().copied())
    }

    /// Fixes `id` at `position` and keeps the simulation warm while held.
    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        self.pins[index] = Some(position);
        self.positions[index] = position;
        self.velocities[index] = Vec2::ZERO;
        self.alpha_target = DRAG_ALPHA_TARGET;
        if self.alpha < DRAG_ALPHA_TARGET {
            self.alpha = DRAG_ALPHA_TARGET;
        }
        true
    }

    pub fn unpin(&mut self, id: &str) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.pins[index] = None;
        }
        self.alpha_target = 0.0;
    }

    /// Advances one step. Returns whether the simulation is still active.
    pub fn tick(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        self.apply_forces();
        self.is_active()
    }

    fn apply_forces(&mut self) {
        let count = self.ids.len();
        if count == 0 {
            return;
        }
        let alpha = self.alpha;

        accumulate_links(
            &self.links,
            &self.degrees,
            &self.positions,
            &mut self.velocities,
            self.params.link_distance,
            alpha,
        );

        if let Some(tree) = QuadTree::build(&self.positions) {
            for (index, velocity) in self.velocities.iter_mut().enumerate() {
                accumulate_charge(
                    &tree,
                    index,
                    &self.positions,
                    self.params.charge * alpha,
                    BARNES_HUT_THETA,
                    velocity,
                );
            }

            let max_radius = self.radii.iter().copied().fold(0.0_f32, f32::max);
            let reach = max_radius * 2.0 + self.params.collision_margin;
            accumulate_collisions(
                &tree,
                &tree,
                true,
                &self.positions,
                &self.radii,
                Collision {
                    margin: self.params.collision_margin,
                    strength: COLLISION_STRENGTH,
                    max_reach_sq: reach * reach,
                },
                &mut self.velocities,
            );
        }

        let pull = self.params.center_strength * alpha;
        let retain = 1.0 - self.params.velocity_decay.clamp(0.0, 1.0);
        for index in 0..count {
            if let Some(pinned) = self.pins[index] {
                self.positions[index] = pinned;
                self.velocities[index] = Vec2::ZERO;
                continue;
            }
            let velocity = (self.velocities[index] + (self.center - self.positions[index]) * pull) * retain;
            self.velocities[index] = velocity;
            self.positions[index] += velocity;
        }
    }
}

/// Owns at most one simulation. Restarting disposes the previous handle
/// before the new one takes over, and stale tick tokens are ignored.
#[derive(Default)]
pub struct LayoutEngine {
    simulation: Option<Simulation>,
    generation: u64,
}

impl LayoutEngine {
    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.simulation.as_mut()
    }

    pub fn restart(&mut self, simulation: Simulation) -> u64 {
        self.dispose();
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            nodes = simulation.node_count(),
            "layout restarted"
        );
        self.simulation = Some(simulation);
        self.generation
    }

    pub fn dispose(&mut self) {
        if self.simulation.take().is_some() {
            tracing::trace!(generation = self.generation, "simulation disposed");
        }
    }

    /// Ticks the current simulation if `generation` still names it.
    pub fn tick(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::trace!(generation, current = self.generation, "ignoring stale tick");
            return false;
        }
        self.simulation.as_mut().is_some_and(Simulation::tick)
    }

    pub fn is_active(&self) -> bool {
        self.simulation.as_ref().is_some_and(Simulation::is_active)
    }
}
