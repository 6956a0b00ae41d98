//! Ordered record of grid mutations, detailed enough to replay a solve.

use crate::grid::Coords;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use wfc_rules::ModuleId;

/// How much the change log keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ChangeLogDetail {
    /// Seeds, assignments, forced decisions and contradictions.
    #[default]
    Decisions,
    /// Everything above plus every partial narrowing.
    Full,
}

/// What happened to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum ChangeKind {
    /// Initial restriction from boundary seeding or a seed cell.
    Seeded { remaining: usize },
    /// The driver collapsed the cell.
    Assigned {
        module: ModuleId,
        /// Domain size right before the collapse.
        candidates: usize,
        override_taken: bool,
    },
    /// Propagation narrowed the cell down to one module.
    Forced { module: ModuleId },
    /// Propagation narrowed the cell but left it undecided.
    Narrowed { remaining: usize },
    /// Propagation emptied the cell.
    Contradiction,
}

impl ChangeKind {
    /// Short label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Seeded { .. } => "seeded",
            Self::Assigned { .. } => "assigned",
            Self::Forced { .. } => "forced",
            Self::Narrowed { .. } => "narrowed",
            Self::Contradiction => "contradiction",
        }
    }

    /// The module the cell ended up with, for decisions.
    pub fn module(&self) -> Option<ModuleId> {
        match self {
            Self::Assigned { module, .. } | Self::Forced { module } => Some(*module),
            _ => None,
        }
    }
}

/// One entry of the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangeEvent {
    /// Position in the log, starting at 0 with no gaps.
    pub sequence: u64,
    /// Driver iteration the event belongs to; 0 for seeding.
    pub iteration: u64,
    pub coords: Coords,
    /// The cell whose change caused this one, for propagation events.
    pub cause: Option<Coords>,
    pub kind: ChangeKind,
}

/// Ordered record of every domain change in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog {
    detail: ChangeLogDetail,
    events: Vec<ChangeEvent>,
}

impl ChangeLog {
    pub fn new(detail: ChangeLogDetail) -> Self {
        Self {
            detail,
            events: Vec::new(),
        }
    }

    /// The detail level events are filtered with.
    pub fn detail(&self) -> ChangeLogDetail {
        self.detail
    }

    /// Appends an event unless the detail level filters it out.
    pub fn record(&mut self, iteration: u64, coords: Coords, cause: Option<Coords>, kind: ChangeKind) {
        if self.detail == ChangeLogDetail::Decisions && matches!(kind, ChangeKind::Narrowed { .. }) {
            return;
        }
        let sequence = self.events.len() as u64;
        self.events.push(ChangeEvent {
            sequence,
            iteration,
            coords,
            cause,
            kind,
        });
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every event touching `coords`, in order.
    pub fn for_cell(&self, coords: Coords) -> impl Iterator<Item = &ChangeEvent> + '_ {
        self.events.iter().filter(move |event| event.coords == coords)
    }

    /// Driver assignments only, in order.
    pub fn assignments(&self) -> impl Iterator<Item = &ChangeEvent> + '_ {
        self.events
            .iter()
            .filter(|event| matches!(event.kind, ChangeKind::Assigned { .. }))
    }
}
