//! The walk record: every step taken or rejected, plus the stack of open branches.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::grid::Position;

bitflags::bitflags! {
    /// The outcome of a trace.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct StepFlags: u8 {
        /// The trace is a branch point with more than one way forward.
        const MULTI = 1 << 0;
        /// The trace is on the live path.
        const OK = 1 << 1;
        /// The position has been explored.
        const VISITED = 1 << 2;
    }
}

/// One step of a walk.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub position: Position,
    pub flags: StepFlags,
    /// Alternatives still untried, only meaningful for branch records.
    pub tries: usize,
    /// Index of the branch record this trace belongs to.
    pub section: Option<usize>,
}

impl Trace {
    pub fn is_ok(&self) -> bool {
        self.flags.contains(StepFlags::OK)
    }

    pub fn is_visited(&self) -> bool {
        self.flags.contains(StepFlags::VISITED)
    }

    pub fn is_branch(&self) -> bool {
        self.flags.contains(StepFlags::MULTI)
    }
}

/// Ordered, append-only record of a walk.
///
/// Branch records open a section; plain traces are attached to the most recently
/// opened section that is still open. The open sections are exactly the branch
/// records that are still flagged [`StepFlags::OK`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct TraceLog {
    traces: Vec<Trace>,
    sections: Vec<usize>,
    #[serde(skip)]
    latest: FxHashMap<Position, usize>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, trace: Trace) -> usize {
        let index = self.traces.len();
        self.latest.insert(trace.position, index);
        self.traces.push(trace);
        index
    }

    /// Appends a plain trace on the live path.
    pub fn push(&mut self, position: Position) -> usize {
        self.append(Trace {
            position,
            flags: StepFlags::OK | StepFlags::VISITED,
            tries: 0,
            section: self.sections.last().copied(),
        })
    }

    /// Appends a trace for a dead end, explored but never part of the path.
    pub fn push_dead_end(&mut self, position: Position) -> usize {
        self.append(Trace {
            position,
            flags: StepFlags::VISITED,
            tries: 0,
            section: self.sections.last().copied(),
        })
    }

    /// Appends a branch record for a position with `candidates` ways forward and opens its section.
    pub fn push_branch(&mut self, position: Position, candidates: usize) -> usize {
        debug_assert!(candidates > 1, "a branch needs at least two candidates");
        let index = self.traces.len();
        self.sections.push(index);
        self.append(Trace {
            position,
            flags: StepFlags::MULTI | StepFlags::OK | StepFlags::VISITED,
            tries: candidates - 1,
            section: Some(index),
        })
    }

    /// Returns to the most recent open branch that still has tries left.
    ///
    /// Every trace in that branch's section, or in any section opened after it,
    /// loses its [`StepFlags::OK`] flag and those sections are closed. The branch's
    /// tries are decremented and its position returned. Returns `None` if no
    /// open branch has tries left.
    pub fn backtrack(&mut self) -> Option<Position> {
        let depth = self
            .sections
            .iter()
            .rposition(|&s| self.traces[s].tries > 0)?;
        let target = self.sections[depth];

        let closed = &self.sections[depth..];
        // a trace never belongs to a section opened after it
        for trace in &mut self.traces[target..] {
            if trace.section.is_some_and(|s| closed.contains(&s)) {
                trace.flags.remove(StepFlags::OK);
            }
        }
        self.sections.truncate(depth);

        let branch = &mut self.traces[target];
        branch.tries -= 1;
        log::trace!(
            "backtracking to {} ({} tries left)",
            branch.position,
            branch.tries
        );
        Some(branch.position)
    }

    /// True if any trace was recorded at `position`.
    pub fn has_visited(&self, position: Position) -> bool {
        self.latest.contains_key(&position)
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// The most recent trace recorded at `position`.
    pub fn trace_at(&self, position: Position) -> Option<&Trace> {
        self.latest.get(&position).map(|&i| &self.traces[i])
    }

    /// Indices of the branch records whose sections are still open, oldest first.
    pub fn open_sections(&self) -> &[usize] {
        &self.sections
    }

    pub fn branches(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(|t| t.is_branch())
    }

    /// Positions of the live path in walk order.
    ///
    /// A position recorded twice in a row (the start, or a branch point that was
    /// returned to) appears once.
    pub fn route(&self) -> Vec<Position> {
        let mut route: Vec<Position> = Vec::new();
        for trace in self.traces.iter().filter(|t| t.is_ok()) {
            if route.last() != Some(&trace.position) {
                route.push(trace.position);
            }
        }
        route
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}
