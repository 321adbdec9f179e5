use serde::{Deserialize, Serialize};

use crate::{EmpireId, PlanetId, Position};

/// Classification of a war; drives peace dialogue and task generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarType {
    #[default]
    BorderConflict,
    ImperialistWar,
    DefensiveWar,
    GenocidalWar,
    SkirmishWar,
}

/// Instantaneous assessment of how a war is going for the assessing side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarState {
    LosingBadly,
    LosingSlightly,
    EvenlyMatched,
    WinningSlightly,
    Dominating,
}

impl WarState {
    pub fn is_losing(self) -> bool {
        matches!(self, WarState::LosingBadly | WarState::LosingSlightly)
    }
}

// =============================================================================
// Military Tasks
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    AssaultPlanet,
    DefendClaim,
}

/// Area radius for an assault on a single planet.
pub const ASSAULT_AO_RADIUS: f32 = 35_000.0;
/// Area radius held while a claim on an enemy planet is being established.
pub const CLAIM_AO_RADIUS: f32 = 75_000.0;
/// Step a DefendClaim task reaches once the claim fleet is in place.
pub const CLAIM_ESTABLISHED_STEP: u32 = 2;

/// Directive from the war planner to the tactical layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilitaryTask {
    pub task_type: TaskType,
    pub owner: EmpireId,
    pub target_planet: Option<PlanetId>,
    /// Area of operations center.
    pub ao: Position,
    pub ao_radius: f32,
    /// Progress counter advanced by the tactical layer.
    pub step: u32,
    pub enemy_strength: f32,
}

impl MilitaryTask {
    pub fn assault_planet(owner: EmpireId, planet: PlanetId, center: Position) -> Self {
        Self {
            task_type: TaskType::AssaultPlanet,
            owner,
            target_planet: Some(planet),
            ao: center,
            ao_radius: ASSAULT_AO_RADIUS,
            step: 0,
            enemy_strength: 0.0,
        }
    }

    pub fn defend_claim(owner: EmpireId, planet: PlanetId, center: Position) -> Self {
        Self {
            task_type: TaskType::DefendClaim,
            owner,
            target_planet: Some(planet),
            ao: center,
            ao_radius: CLAIM_AO_RADIUS,
            step: 0,
            enemy_strength: 0.0,
        }
    }

    pub fn targets(&self, planet: PlanetId, task_type: TaskType) -> bool {
        self.target_planet == Some(planet) && self.task_type == task_type
    }

    pub fn claim_established(&self) -> bool {
        self.task_type == TaskType::DefendClaim && self.step == CLAIM_ESTABLISHED_STEP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_constructors_use_expected_radii() {
        let assault = MilitaryTask::assault_planet(EmpireId(0), PlanetId(4), Position::default());
        assert_eq!(assault.ao_radius, ASSAULT_AO_RADIUS);
        assert!(assault.targets(PlanetId(4), TaskType::AssaultPlanet));
        assert!(!assault.claim_established());

        let mut claim = MilitaryTask::defend_claim(EmpireId(0), PlanetId(4), Position::default());
        assert_eq!(claim.ao_radius, CLAIM_AO_RADIUS);
        claim.step = CLAIM_ESTABLISHED_STEP;
        assert!(claim.claim_established());
    }

    #[test]
    fn war_state_ordering() {
        assert!(WarState::Dominating > WarState::WinningSlightly);
        assert!(WarState::LosingSlightly.is_losing());
        assert!(!WarState::EvenlyMatched.is_losing());
    }
}
