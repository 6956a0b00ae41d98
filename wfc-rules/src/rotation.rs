//! The rotation group acting on tile faces.
//!
//! Orientations are words of elementary quarter turns about the world axes.
//! The socket permutation an orientation induces is not tabulated: it is
//! derived by rotating each direction's unit vector and reading off where it
//! lands, so the permutation always matches the geometric rotation applied by
//! whoever renders the tile.

use crate::topology::{Direction, Topology};
use nalgebra::{Rotation3, Vector3};
use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_2;

/// Tag of the identity orientation on volumetric lattices.
pub const IDENTITY_TAG: &str = "I";

/// Sentinel accepted in an orientation list meaning "the whole rotation group".
pub const ALL_ORIENTATIONS: &str = "*";

/// A counter-clockwise (right-handed) quarter turn about a world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    /// About the x axis.
    X,
    /// About the y axis.
    Y,
    /// About the z axis (the view axis on planar lattices).
    Z,
}

impl Turn {
    fn rotation(self) -> Rotation3<f64> {
        let axis = match self {
            Self::X => Vector3::x_axis(),
            Self::Y => Vector3::y_axis(),
            Self::Z => Vector3::z_axis(),
        };
        Rotation3::from_axis_angle(&axis, FRAC_PI_2)
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }
}

/// One element of the rotation group, identified by its tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Orientation {
    tag: String,
    turns: Vec<Turn>,
}

impl Orientation {
    /// The orientation that leaves every face where it is.
    pub fn identity(topology: Topology) -> Self {
        let tag = match topology {
            Topology::Planar => "0",
            Topology::Volumetric => IDENTITY_TAG,
        };
        Self {
            tag: tag.to_owned(),
            turns: Vec::new(),
        }
    }

    /// Parses an orientation tag.
    ///
    /// Planar lattices accept `"0"`, `"90"`, `"180"` and `"270"`
    /// (counter-clockwise). Volumetric lattices accept `"I"` or a non-empty
    /// word over `X`, `Y` and `Z`, applied left to right.
    ///
    /// Returns `None` for tags that do not name an orientation.
    pub fn parse(topology: Topology, tag: &str) -> Option<Self> {
        let turns = match topology {
            Topology::Planar => {
                let quarter_turns = match tag {
                    "0" => 0,
                    "90" => 1,
                    "180" => 2,
                    "270" => 3,
                    _ => return None,
                };
                vec![Turn::Z; quarter_turns]
            }
            Topology::Volumetric => {
                if tag == IDENTITY_TAG {
                    Vec::new()
                } else if tag.is_empty() {
                    return None;
                } else {
                    tag.chars().map(Turn::from_char).collect::<Option<Vec<_>>>()?
                }
            }
        };
        Some(Self {
            tag: tag.to_owned(),
            turns,
        })
    }

    fn from_turns(turns: Vec<Turn>) -> Self {
        let tag = if turns.is_empty() {
            IDENTITY_TAG.to_owned()
        } else {
            turns.iter().map(|t| t.as_char()).collect()
        };
        Self { tag, turns }
    }

    /// The tag this orientation was parsed from.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The elementary turns, in application order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Composite rotation; later turns are applied after earlier ones.
    pub fn rotation(&self) -> Rotation3<f64> {
        self.turns
            .iter()
            .fold(Rotation3::identity(), |acc, turn| turn.rotation() * acc)
    }

    /// Where each face ends up: the socket list that faced `d` faces
    /// `perm[d]` after rotating.
    ///
    /// Returns `None` if the rotation moves a face off the lattice (for
    /// example an `X` turn on a planar lattice).
    pub fn socket_permutation(&self, topology: Topology) -> Option<Vec<Direction>> {
        let rotation = self.rotation();
        topology
            .directions()
            .map(|d| {
                let v = topology.unit_vector(d)?;
                topology.direction_of(&(rotation * v))
            })
            .collect()
    }

    /// Applies this orientation to a per-direction list.
    pub fn rotate_faces<T: Clone>(&self, topology: Topology, faces: &[T]) -> Option<Vec<T>> {
        let permutation = self.socket_permutation(topology)?;
        if faces.len() != permutation.len() {
            return None;
        }
        let mut rotated = faces.to_vec();
        for (from, &to) in permutation.iter().enumerate() {
            rotated[to] = faces[from].clone();
        }
        Some(rotated)
    }
}

/// Enumerates the rotation group of a topology.
pub struct RotationGroup;

impl RotationGroup {
    /// Every distinct orientation, identity first.
    ///
    /// Planar lattices have 4. Volumetric lattices have the 24 rotations of
    /// the cube, each tagged with the shortest turn word reaching it
    /// (breadth-first, `X` before `Y` before `Z`).
    pub fn all(topology: Topology) -> Vec<Orientation> {
        match topology {
            Topology::Planar => ["0", "90", "180", "270"]
                .iter()
                .filter_map(|tag| Orientation::parse(topology, tag))
                .collect(),
            Topology::Volumetric => Self::enumerate_volumetric(),
        }
    }

    fn enumerate_volumetric() -> Vec<Orientation> {
        const GROUP_ORDER: usize = 24;
        let topology = Topology::Volumetric;
        let mut seen: Vec<Vec<Direction>> = Vec::with_capacity(GROUP_ORDER);
        let mut orientations = Vec::with_capacity(GROUP_ORDER);
        let mut frontier: VecDeque<Vec<Turn>> = VecDeque::from([Vec::new()]);

        while let Some(word) = frontier.pop_front() {
            let orientation = Orientation::from_turns(word.clone());
            let Some(permutation) = orientation.socket_permutation(topology) else {
                continue;
            };
            if seen.contains(&permutation) {
                continue;
            }
            seen.push(permutation);
            orientations.push(orientation);
            if orientations.len() == GROUP_ORDER {
                break;
            }
            for turn in [Turn::X, Turn::Y, Turn::Z] {
                let mut next = word.clone();
                next.push(turn);
                frontier.push_back(next);
            }
        }
        log::debug!(
            "Derived {} volumetric orientations: {:?}",
            orientations.len(),
            orientations.iter().map(Orientation::tag).collect::<Vec<_>>()
        );
        orientations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{planar, volumetric};

    #[test]
    fn elementary_turns_cycle_four_faces() {
        let topology = Topology::Volumetric;
        let x = Orientation::parse(topology, "X").unwrap();
        let perm = x.socket_permutation(topology).unwrap();
        assert_eq!(perm[volumetric::TOP], volumetric::FRONT);
        assert_eq!(perm[volumetric::FRONT], volumetric::BOTTOM);
        assert_eq!(perm[volumetric::BOTTOM], volumetric::BACK);
        assert_eq!(perm[volumetric::BACK], volumetric::TOP);
        assert_eq!(perm[volumetric::RIGHT], volumetric::RIGHT);
        assert_eq!(perm[volumetric::LEFT], volumetric::LEFT);

        let y = Orientation::parse(topology, "Y").unwrap();
        let perm = y.socket_permutation(topology).unwrap();
        assert_eq!(perm[volumetric::TOP], volumetric::RIGHT);
        assert_eq!(perm[volumetric::RIGHT], volumetric::BOTTOM);
        assert_eq!(perm[volumetric::BOTTOM], volumetric::LEFT);
        assert_eq!(perm[volumetric::LEFT], volumetric::TOP);
        assert_eq!(perm[volumetric::BACK], volumetric::BACK);

        let z = Orientation::parse(topology, "Z").unwrap();
        let perm = z.socket_permutation(topology).unwrap();
        assert_eq!(perm[volumetric::RIGHT], volumetric::BACK);
        assert_eq!(perm[volumetric::BACK], volumetric::LEFT);
        assert_eq!(perm[volumetric::LEFT], volumetric::FRONT);
        assert_eq!(perm[volumetric::FRONT], volumetric::RIGHT);
        assert_eq!(perm[volumetric::TOP], volumetric::TOP);
    }

    #[test]
    fn planar_quarter_turn_moves_right_face_up() {
        let topology = Topology::Planar;
        let faces = vec!["up", "right", "down", "left"];
        let rotated = Orientation::parse(topology, "90")
            .unwrap()
            .rotate_faces(topology, &faces)
            .unwrap();
        assert_eq!(rotated[planar::UP], "right");
        assert_eq!(rotated, vec!["right", "down", "left", "up"]);

        let half = Orientation::parse(topology, "180")
            .unwrap()
            .rotate_faces(topology, &faces)
            .unwrap();
        assert_eq!(half, vec!["down", "left", "up", "right"]);
    }

    #[test]
    fn volumetric_group_has_24_distinct_elements() {
        let group = RotationGroup::all(Topology::Volumetric);
        assert_eq!(group.len(), 24);
        assert_eq!(group[0].tag(), IDENTITY_TAG);

        let mut perms: Vec<_> = group
            .iter()
            .map(|o| o.socket_permutation(Topology::Volumetric).unwrap())
            .collect();
        perms.sort();
        perms.dedup();
        assert_eq!(perms.len(), 24);

        // Rotations keep opposite faces opposite.
        for perm in &perms {
            for d in Topology::Volumetric.directions() {
                assert_eq!(
                    perm[Topology::Volumetric.opposite(d)],
                    Topology::Volumetric.opposite(perm[d])
                );
            }
        }
    }

    #[test]
    fn four_turns_about_one_axis_is_identity() {
        let topology = Topology::Volumetric;
        let identity = Orientation::identity(topology)
            .socket_permutation(topology)
            .unwrap();
        for word in ["XXXX", "YYYY", "ZZZZ"] {
            let perm = Orientation::parse(topology, word)
                .unwrap()
                .socket_permutation(topology)
                .unwrap();
            assert_eq!(perm, identity);
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(Orientation::parse(Topology::Planar, "45").is_none());
        assert!(Orientation::parse(Topology::Planar, "X").is_none());
        assert!(Orientation::parse(Topology::Volumetric, "").is_none());
        assert!(Orientation::parse(Topology::Volumetric, "XW").is_none());
        assert!(Orientation::parse(Topology::Volumetric, "xy").is_none());
    }

    #[test]
    fn planar_group_has_four_elements() {
        let group = RotationGroup::all(Topology::Planar);
        let tags: Vec<_> = group.iter().map(Orientation::tag).collect();
        assert_eq!(tags, vec!["0", "90", "180", "270"]);
    }
}
