use bitvec::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wfc_rules::{Direction, ModuleId, Topology};

/// Integer cell coordinates `(x, y, z)`. Planar grids always use `z == 0`.
pub type Coords = (usize, usize, usize);

/// Errors raised when addressing or mutating grid cells.
///
/// These indicate an internal invariant violation (a bad offset or a domain
/// built for another catalog) rather than a recoverable solver state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Coordinates outside the grid.
    #[error("Coordinates ({0}, {1}, {2}) are out of bounds")]
    OutOfBounds(usize, usize, usize),
    /// A domain or module index does not match the grid's module count.
    #[error("Domain of length {found} does not match catalog size {expected}")]
    DomainLength {
        /// Catalog size the grid was built for.
        expected: usize,
        /// Length that was supplied.
        found: usize,
    },
    /// Collapsing to a module that is no longer possible at this cell.
    #[error("Module {module} is not possible at ({x}, {y}, {z})")]
    ModuleNotPossible {
        /// Requested module index.
        module: usize,
        /// Cell x.
        x: usize,
        /// Cell y.
        y: usize,
        /// Cell z.
        z: usize,
    },
}

/// Extents of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridDimensions {
    /// Extent along x.
    pub width: usize,
    /// Extent along y.
    pub height: usize,
    /// Extent along z; 1 for planar grids.
    pub depth: usize,
}

impl GridDimensions {
    /// Volumetric extents.
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Planar extents (`depth == 1`).
    pub const fn planar(width: usize, height: usize) -> Self {
        Self::new(width, height, 1)
    }

    /// Number of cells.
    pub const fn cell_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Whether `coords` lies on an outer face of the grid.
    ///
    /// The z faces only count for volumetric topologies.
    pub const fn is_boundary(&self, coords: Coords, topology: Topology) -> bool {
        let (x, y, z) = coords;
        let on_xy = x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height;
        match topology {
            Topology::Planar => on_xy,
            Topology::Volumetric => on_xy || z == 0 || z + 1 == self.depth,
        }
    }
}

/// Dense 3-D array stored in x-fastest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub(crate) data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    /// Creates a new grid with the given dimensions, initialized with default values.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self::filled(width, height, depth, T::default())
    }
}

impl<T: Clone> Grid<T> {
    /// Creates a new grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, depth: usize, value: T) -> Self {
        let size = width * height * depth;
        Self {
            width,
            height,
            depth,
            data: vec![value; size],
        }
    }
}

impl<T> Grid<T> {
    /// Returns an immutable reference to the element at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        self.index(x, y, z).and_then(|idx| self.data.get(idx))
    }

    /// Returns a mutable reference to the element at the given coordinates,
    /// or None if the coordinates are out of bounds.
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut T> {
        self.index(x, y, z)
            .and_then(move |idx| self.data.get_mut(idx))
    }

    /// Calculates the 1D index for the given 3D coordinates.
    /// Returns None if the coordinates are out of bounds.
    pub fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        if x < self.width && y < self.height && z < self.depth {
            Some(z * self.width * self.height + y * self.width + x)
        } else {
            None
        }
    }

    /// Inverse of [`Grid::index`].
    pub fn coords_of(&self, index: usize) -> Coords {
        let layer = self.width * self.height;
        let z = index / layer;
        let rest = index % layer;
        (rest % self.width, rest / self.width, z)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over `(coords, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Coords, &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(idx, value)| (self.coords_of(idx), value))
    }

    /// Coordinates of the neighbour in `direction`, if it is inside the grid.
    pub fn neighbor(&self, coords: Coords, direction: Direction, topology: Topology) -> Option<Coords> {
        let (dx, dy, dz) = topology.offset(direction)?;
        let x = coords.0.checked_add_signed(dx)?;
        let y = coords.1.checked_add_signed(dy)?;
        let z = coords.2.checked_add_signed(dz)?;
        self.index(x, y, z).map(|_| (x, y, z))
    }
}

/// Grid of per-cell domains: the set of modules still possible at each cell.
///
/// Domains only ever shrink. A domain of size 1 is decided, size 0 is a
/// contradiction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibilityGrid {
    cells: Grid<BitVec>,
    num_modules: usize,
}

impl PossibilityGrid {
    /// Allocates every cell with the full module set.
    pub fn new(dimensions: GridDimensions, num_modules: usize) -> Self {
        Self {
            cells: Grid::filled(
                dimensions.width,
                dimensions.height,
                dimensions.depth,
                bitvec![1; num_modules],
            ),
            num_modules,
        }
    }

    /// The grid's extents.
    pub fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.cells.width, self.cells.height, self.cells.depth)
    }

    /// Size of the catalog the domains index into.
    pub fn num_modules(&self) -> usize {
        self.num_modules
    }

    /// Read access to the underlying cell storage.
    pub fn cells(&self) -> &Grid<BitVec> {
        &self.cells
    }

    /// Current possibility set of a cell.
    pub fn domain_at(&self, coords: Coords) -> Option<&BitSlice> {
        self.cells
            .get(coords.0, coords.1, coords.2)
            .map(BitVec::as_bitslice)
    }

    /// Current domain size of a cell.
    pub fn domain_len(&self, coords: Coords) -> Option<usize> {
        self.domain_at(coords).map(BitSlice::count_ones)
    }

    fn cell_mut(&mut self, coords: Coords) -> Result<&mut BitVec, GridError> {
        let (x, y, z) = coords;
        self.cells
            .get_mut(x, y, z)
            .ok_or(GridError::OutOfBounds(x, y, z))
    }

    /// Replaces the domain with `{module}`.
    ///
    /// Returns `true` when this is a genuine change (the cell was undecided).
    ///
    /// # Errors
    ///
    /// * `GridError::OutOfBounds` for coordinates outside the grid.
    /// * `GridError::ModuleNotPossible` if `module` was already ruled out.
    pub fn collapse(&mut self, coords: Coords, module: ModuleId) -> Result<bool, GridError> {
        let cell = self.cell_mut(coords)?;
        let possible = cell.get(module.0).map_or(false, |bit| *bit);
        if !possible {
            let (x, y, z) = coords;
            return Err(GridError::ModuleNotPossible {
                module: module.0,
                x,
                y,
                z,
            });
        }
        let changed = cell.count_ones() > 1;
        cell.fill(false);
        cell.set(module.0, true);
        Ok(changed)
    }

    /// Intersects the domain with `allowed`.
    ///
    /// Returns `true` iff the domain shrank. This is the only mutation the
    /// propagation engine applies to neighbours.
    ///
    /// # Errors
    ///
    /// * `GridError::OutOfBounds` for coordinates outside the grid.
    /// * `GridError::DomainLength` if `allowed` was built for another catalog.
    pub fn restrict(&mut self, coords: Coords, allowed: &BitSlice) -> Result<bool, GridError> {
        let expected = self.num_modules;
        if allowed.len() != expected {
            return Err(GridError::DomainLength {
                expected,
                found: allowed.len(),
            });
        }
        let cell = self.cell_mut(coords)?;
        let removed: Vec<usize> = cell.iter_ones().filter(|&i| !allowed[i]).collect();
        for &i in &removed {
            cell.set(i, false);
        }
        Ok(!removed.is_empty())
    }

    /// Whether the cell holds exactly one module.
    pub fn is_decided(&self, coords: Coords) -> bool {
        self.domain_len(coords) == Some(1)
    }

    /// Whether the cell has no module left.
    pub fn is_contradiction(&self, coords: Coords) -> bool {
        self.domain_len(coords) == Some(0)
    }

    /// The module of a decided cell.
    pub fn decided_module(&self, coords: Coords) -> Option<ModuleId> {
        let domain = self.domain_at(coords)?;
        if domain.count_ones() == 1 {
            domain.first_one().map(ModuleId)
        } else {
            None
        }
    }

    /// Number of decided cells.
    pub fn count_decided(&self) -> usize {
        self.cells.data.iter().filter(|d| d.count_ones() == 1).count()
    }

    /// Coordinates of every cell with an empty domain, in storage order.
    pub fn contradicted_cells(&self) -> Vec<Coords> {
        self.cells
            .iter()
            .filter(|(_, domain)| domain.not_any())
            .map(|(coords, _)| coords)
            .collect()
    }

    /// Coordinates of the neighbour in `direction`, if inside the grid.
    pub fn neighbor(&self, coords: Coords, direction: Direction, topology: Topology) -> Option<Coords> {
        self.cells.neighbor(coords, direction, topology)
    }

    /// Storage index of a cell.
    pub fn index_of(&self, coords: Coords) -> Option<usize> {
        self.cells.index(coords.0, coords.1, coords.2)
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Domain sizes per cell, consumed by cell selection.
pub type EntropyGrid = Grid<usize>;
