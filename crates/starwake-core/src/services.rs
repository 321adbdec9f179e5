//! Narrow host interfaces the planners talk through, with recording
//! implementations used by tests and the simulator.

use std::collections::BTreeMap;

use starwake_protocol::{EmpireId, MilitaryTask, Notification, OfferResponse, Proposal};

use crate::galaxy::Galaxy;
use crate::universe::Universe;

/// Presents a proposal to the human player.
pub trait DiplomacyScreen {
    fn show(&mut self, proposal: &Proposal);
}

pub trait Notifications {
    fn notify(&mut self, notification: Notification);
}

/// Per-empire military task lists.
pub trait TaskBoard {
    fn tasks(&self, owner: EmpireId) -> &[MilitaryTask];
    fn add(&mut self, task: MilitaryTask);
    /// Drops `owner`'s tasks matching `predicate`.
    fn remove_where(&mut self, owner: EmpireId, predicate: &dyn Fn(&MilitaryTask) -> bool);
}

/// Decides how an AI answers a proposal sent by another empire.
pub trait OfferAnalyzer {
    fn analyze_offer(&mut self, universe: &Universe, galaxy: &dyn Galaxy, proposal: &Proposal) -> OfferResponse;
}

// =============================================================================
// Recording Implementations
// =============================================================================

/// Keeps every proposal shown to the player, in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingScreen {
    pub shown: Vec<Proposal>,
}

impl RecordingScreen {
    pub fn take(&mut self) -> Vec<Proposal> {
        std::mem::take(&mut self.shown)
    }

    pub fn with_dialogue<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Proposal> + 'a {
        self.shown.iter().filter(move |p| p.dialogue.as_deref() == Some(key))
    }
}

impl DiplomacyScreen for RecordingScreen {
    fn show(&mut self, proposal: &Proposal) {
        self.shown.push(proposal.clone());
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotificationLog {
    pub entries: Vec<Notification>,
}

impl Notifications for NotificationLog {
    fn notify(&mut self, notification: Notification) {
        self.entries.push(notification);
    }
}

#[derive(Clone, Debug, Default)]
pub struct TaskLists {
    lists: BTreeMap<EmpireId, Vec<MilitaryTask>>,
}

impl TaskLists {
    pub fn tasks_mut(&mut self, owner: EmpireId) -> &mut Vec<MilitaryTask> {
        self.lists.entry(owner).or_default()
    }

    pub fn total(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    /// Drops every task an empire holds, as when a war ends.
    pub fn clear(&mut self, owner: EmpireId) {
        self.lists.remove(&owner);
    }
}

impl TaskBoard for TaskLists {
    fn tasks(&self, owner: EmpireId) -> &[MilitaryTask] {
        self.lists.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    fn add(&mut self, task: MilitaryTask) {
        self.lists.entry(task.owner).or_default().push(task);
    }

    fn remove_where(&mut self, owner: EmpireId, predicate: &dyn Fn(&MilitaryTask) -> bool) {
        if let Some(list) = self.lists.get_mut(&owner) {
            list.retain(|t| !predicate(t));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starwake_protocol::{PlanetId, Position};

    #[test]
    fn task_lists_are_per_owner() {
        let mut board = TaskLists::default();
        board.add(MilitaryTask::assault_planet(EmpireId(1), PlanetId(3), Position::default()));
        board.add(MilitaryTask::defend_claim(EmpireId(2), PlanetId(4), Position::default()));
        assert_eq!(board.tasks(EmpireId(1)).len(), 1);
        assert_eq!(board.tasks(EmpireId(7)).len(), 0);
        assert_eq!(board.total(), 2);
        board.clear(EmpireId(1));
        assert_eq!(board.total(), 1);
        board.remove_where(EmpireId(2), &|t| t.target_planet == Some(PlanetId(4)));
        assert_eq!(board.total(), 0);
    }
}
