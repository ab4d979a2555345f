use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

/// Axis-aligned square cell.
#[derive(Clone, Copy, Debug)]
pub(super) struct Cell {
    pub(super) center: Vec2,
    pub(super) half: f32,
}

impl Cell {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let (min, max) = points.iter().fold(
            (vec2(f32::INFINITY, f32::INFINITY), vec2(f32::NEG_INFINITY, f32::NEG_INFINITY)),
            |(min, max), point| (min.min(*point), max.max(*point)),
        );
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half && (point.y - self.center.y).abs() <= self.half
    }

    pub(super) fn width(self) -> f32 {
        self.half * 2.0
    }

    /// Squared gap between two cells, zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half + other.half;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        dx * dx + dy * dy
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn sub(self, quadrant: usize) -> Self {
        let quarter = self.half * 0.5;
        let sign = |bit: bool| if bit { quarter } else { -quarter };
        Self {
            center: self.center + vec2(sign(quadrant & 1 == 1), sign(quadrant & 2 == 2)),
            half: quarter,
        }
    }
}

/// Barnes–Hut tree over entity positions. Leaves keep the indices of the
/// points they hold; inner nodes only keep aggregate mass.
pub(super) struct QuadTree {
    pub(super) cell: Cell,
    pub(super) centroid: Vec2,
    pub(super) mass: f32,
    pub(super) points: Vec<usize>,
    pub(super) children: [Option<Box<QuadTree>>; 4],
}

impl QuadTree {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let cell = Cell::enclosing(positions)?;
        Some(Self::subdivide(cell, (0..positions.len()).collect(), positions, 0))
    }

    fn subdivide(cell: Cell, points: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = points.len() as f32;
        let centroid = if points.is_empty() {
            cell.center
        } else {
            points
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / mass
        };

        let mut tree = Self {
            cell,
            centroid,
            mass,
            points,
            children: Default::default(),
        };
        if depth >= MAX_DEPTH || tree.points.len() <= LEAF_CAPACITY {
            return tree;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &tree.points {
            buckets[cell.quadrant(positions[index])].push(index);
        }
        // Coincident points would recurse forever without splitting.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() < 2 {
            return tree;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                tree.children[quadrant] = Some(Box::new(Self::subdivide(
                    cell.sub(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        tree.points.clear();
        tree
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadTree> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_and_centroid_cover_all_points() {
        let positions: Vec<Vec2> = (0..40)
            .map(|index| vec2((index % 7) as f32 * 10.0, (index / 7) as f32 * 10.0))
            .collect();
        let tree = QuadTree::build(&positions).expect("finite points");

        assert_eq!(tree.mass, 40.0);
        assert!(!tree.is_leaf());
        let child_mass: f32 = tree.children().map(|child| child.mass).sum();
        assert_eq!(child_mass, 40.0);
        assert!(positions.iter().all(|point| tree.cell.contains(*point)));
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![Vec2::ZERO; 20];
        let tree = QuadTree::build(&positions).expect("finite points");
        assert!(tree.is_leaf());
        assert_eq!(tree.points.len(), 20);
    }

    #[test]
    fn empty_input_has_no_tree() {
        assert!(QuadTree::build(&[]).is_none());
    }
}
