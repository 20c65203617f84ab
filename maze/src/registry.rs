use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{source::MazeRequest, Grid};

/// A classified grid together with the request it was built from.
#[derive(Clone, Debug)]
pub struct MazeEntry {
    pub grid: Grid,
    pub request: MazeRequest,
}

/// Mazes built so far, keyed by id.
///
/// Ids are the unix time of registration in seconds, bumped when needed so
/// every id is larger than the one before.
#[derive(Clone, Debug, Default)]
pub struct MazeRegistry {
    mazes: BTreeMap<u32, MazeEntry>,
    last_id: Option<u32>,
}

impl MazeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: MazeEntry) -> u32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as u32);
        self.register_at(now, entry)
    }

    fn register_at(&mut self, now: u32, entry: MazeEntry) -> u32 {
        let id = match self.last_id {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        };
        self.last_id = Some(id);
        self.mazes.insert(id, entry);
        id
    }

    pub fn get(&self, id: u32) -> Option<&MazeEntry> {
        self.mazes.get(&id)
    }

    /// All ids, ascending.
    pub fn ids(&self) -> Vec<u32> {
        self.mazes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.mazes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mazes.is_empty()
    }
}
