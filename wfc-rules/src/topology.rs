//! Lattice topologies and their axis-aligned directions.

use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a direction within a [`Topology`].
///
/// Directions are laid out so that the second half mirrors the first half:
/// `opposite(d) = (d + count / 2) % count`.
pub type Direction = usize;

/// Named directions of a planar (4-neighbour) lattice.
pub mod planar {
    use super::Direction;
    /// Towards `+y`.
    pub const UP: Direction = 0;
    /// Towards `+x`.
    pub const RIGHT: Direction = 1;
    /// Towards `-y`.
    pub const DOWN: Direction = 2;
    /// Towards `-x`.
    pub const LEFT: Direction = 3;
}

/// Named directions of a volumetric (6-neighbour) lattice.
pub mod volumetric {
    use super::Direction;
    /// Towards `+z`.
    pub const TOP: Direction = 0;
    /// Towards `+y`.
    pub const BACK: Direction = 1;
    /// Towards `+x`.
    pub const RIGHT: Direction = 2;
    /// Towards `-z`.
    pub const BOTTOM: Direction = 3;
    /// Towards `-y`.
    pub const FRONT: Direction = 4;
    /// Towards `-x`.
    pub const LEFT: Direction = 5;
}

const PLANAR_OFFSETS: [(isize, isize, isize); 4] = [(0, 1, 0), (1, 0, 0), (0, -1, 0), (-1, 0, 0)];
const PLANAR_NAMES: [&str; 4] = ["up", "right", "down", "left"];

const VOLUMETRIC_OFFSETS: [(isize, isize, isize); 6] = [
    (0, 0, 1),
    (0, 1, 0),
    (1, 0, 0),
    (0, 0, -1),
    (0, -1, 0),
    (-1, 0, 0),
];
const VOLUMETRIC_NAMES: [&str; 6] = ["top", "back", "right", "bottom", "front", "left"];

/// The regular lattice a catalog is designed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Topology {
    /// 2-D grid, four neighbours per cell. Grids always have `depth == 1`.
    Planar,
    /// 3-D grid, six neighbours per cell.
    #[default]
    Volumetric,
}

impl Topology {
    /// Number of directions (4 or 6).
    pub const fn direction_count(self) -> usize {
        match self {
            Self::Planar => 4,
            Self::Volumetric => 6,
        }
    }

    /// Iterator over every direction index.
    pub fn directions(self) -> std::ops::Range<Direction> {
        0..self.direction_count()
    }

    /// The direction pointing the other way.
    #[inline]
    pub const fn opposite(self, direction: Direction) -> Direction {
        let count = self.direction_count();
        (direction + count / 2) % count
    }

    /// Integer grid offset `(dx, dy, dz)` of a direction.
    ///
    /// Returns `None` for an index outside this topology.
    pub fn offset(self, direction: Direction) -> Option<(isize, isize, isize)> {
        match self {
            Self::Planar => PLANAR_OFFSETS.get(direction).copied(),
            Self::Volumetric => VOLUMETRIC_OFFSETS.get(direction).copied(),
        }
    }

    /// Unit vector of a direction, used when deriving rotations.
    pub fn unit_vector(self, direction: Direction) -> Option<Vector3<f64>> {
        self.offset(direction)
            .map(|(dx, dy, dz)| Vector3::new(dx as f64, dy as f64, dz as f64))
    }

    /// Maps a (rounded) vector back onto the direction it points to.
    pub fn direction_of(self, vector: &Vector3<f64>) -> Option<Direction> {
        let rounded = (
            vector.x.round() as isize,
            vector.y.round() as isize,
            vector.z.round() as isize,
        );
        self.directions()
            .find(|&d| self.offset(d) == Some(rounded))
    }

    /// Human readable direction name, for logs and error messages.
    pub fn direction_name(self, direction: Direction) -> &'static str {
        let names: &[&'static str] = match self {
            Self::Planar => &PLANAR_NAMES,
            Self::Volumetric => &VOLUMETRIC_NAMES,
        };
        names.get(direction).copied().unwrap_or("invalid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for topology in [Topology::Planar, Topology::Volumetric] {
            for d in topology.directions() {
                let o = topology.opposite(d);
                assert_ne!(d, o);
                assert_eq!(topology.opposite(o), d);
                let (dx, dy, dz) = topology.offset(d).unwrap();
                assert_eq!(topology.offset(o), Some((-dx, -dy, -dz)));
            }
        }
    }

    #[test]
    fn direction_of_round_trips_offsets() {
        let topology = Topology::Volumetric;
        for d in topology.directions() {
            let v = topology.unit_vector(d).unwrap();
            assert_eq!(topology.direction_of(&v), Some(d));
        }
        assert_eq!(topology.direction_of(&Vector3::new(1.0, 1.0, 0.0)), None);
    }

    #[test]
    fn planar_has_no_vertical_directions() {
        let topology = Topology::Planar;
        assert_eq!(topology.direction_of(&Vector3::new(0.0, 0.0, 1.0)), None);
        assert_eq!(topology.direction_name(planar::LEFT), "left");
        assert_eq!(topology.offset(4), None);
    }
}
