//! Read-only view of the physical galaxy the planners consult.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use starwake_protocol::{EmpireId, PlanetId, Position, ShipRole, SystemId, TechUid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub owner: Option<EmpireId>,
    pub system: SystemId,
    pub center: Position,
    #[serde(default)]
    pub food_here: f32,
    #[serde(default)]
    pub production_here: f32,
    #[serde(default = "default_storage")]
    pub max_storage: f32,
    #[serde(default = "default_fertility")]
    pub fertility: f32,
}

impl Planet {
    pub fn new(id: PlanetId, owner: Option<EmpireId>, system: SystemId, center: Position) -> Self {
        Self {
            id,
            owner,
            system,
            center,
            food_here: 0.0,
            production_here: 0.0,
            max_storage: default_storage(),
            fertility: default_fertility(),
        }
    }
}

fn default_storage() -> f32 {
    100.0
}

fn default_fertility() -> f32 {
    1.0
}

/// Presence of another empire in a system near one of our border systems.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyPresence {
    pub empire: EmpireId,
    pub strength_present: f32,
}

/// One of our defended systems with the empires found in its neighborhood.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderSystem {
    pub system: SystemId,
    pub rank_importance: f32,
    #[serde(default)]
    pub nearby: Vec<NearbyPresence>,
}

/// A planet our expansion planner wants, and who holds it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesiredPlanet {
    pub planet: PlanetId,
    pub owner: Option<EmpireId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipDesign {
    pub name: String,
    /// Racial style; "Platforms" and "Misc" are shared by every race.
    pub style: String,
    pub hull_role: ShipRole,
    pub design_role: ShipRole,
    pub role: ShipRole,
    #[serde(default)]
    pub techs_needed: Vec<TechUid>,
    #[serde(default)]
    pub carrier: bool,
    #[serde(default = "default_true")]
    pub unlockable: bool,
    #[serde(default = "default_true")]
    pub good_to_build: bool,
    #[serde(default)]
    pub tech_score: f32,
}

fn default_true() -> bool {
    true
}

impl ShipDesign {
    pub fn usable_by_style(&self, style: &str) -> bool {
        self.style == "Platforms" || self.style == "Misc" || self.style == style
    }
}

/// Physical-world queries answered by the host.
pub trait Galaxy {
    fn planets_of(&self, owner: EmpireId) -> Vec<&Planet>;
    fn current_military_strength(&self, empire: EmpireId) -> f32;
    fn offensive_strength(&self, empire: EmpireId) -> f32;
    fn weighted_center(&self, empire: EmpireId) -> Position;
    fn universe_size(&self) -> f32;
    fn universe_width(&self) -> f32;
    /// Importance `owner` assigns to defending `system`; 0 when undefended.
    fn system_rank_importance(&self, owner: EmpireId, system: SystemId) -> f32;
    fn border_systems(&self, owner: EmpireId) -> Vec<&BorderSystem>;
    /// Planets `owner` wants, most wanted first.
    fn desired_planets(&self, owner: EmpireId) -> Vec<DesiredPlanet>;
    fn strength_of_all_threats(&self, empire: EmpireId) -> f32;
    fn ship_designs(&self) -> &[ShipDesign];
}

// =============================================================================
// Static Galaxy
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpireForces {
    pub military_strength: f32,
    pub offensive_strength: f32,
    pub threat_strength: f32,
}

/// In-memory galaxy for tests, benches and the simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticGalaxy {
    pub universe_size: f32,
    pub universe_width: f32,
    pub planets: Vec<Planet>,
    pub forces: BTreeMap<EmpireId, EmpireForces>,
    /// Explicit centers; otherwise the mean of owned planet centers.
    pub centers: BTreeMap<EmpireId, Position>,
    pub rank_importance: BTreeMap<EmpireId, BTreeMap<SystemId, f32>>,
    pub borders: BTreeMap<EmpireId, Vec<BorderSystem>>,
    pub desired: BTreeMap<EmpireId, Vec<DesiredPlanet>>,
    pub designs: Vec<ShipDesign>,
}

impl Default for StaticGalaxy {
    fn default() -> Self {
        Self {
            universe_size: 1_000_000.0,
            universe_width: 1_000_000.0,
            planets: Vec::new(),
            forces: BTreeMap::new(),
            centers: BTreeMap::new(),
            rank_importance: BTreeMap::new(),
            borders: BTreeMap::new(),
            desired: BTreeMap::new(),
            designs: Vec::new(),
        }
    }
}

impl StaticGalaxy {
    pub fn add_planet(&mut self, planet: Planet) {
        self.planets.push(planet);
    }

    pub fn set_strength(&mut self, empire: EmpireId, strength: f32) {
        let forces = self.forces.entry(empire).or_default();
        forces.military_strength = strength;
        forces.offensive_strength = strength;
    }

    fn forces(&self, empire: EmpireId) -> EmpireForces {
        self.forces.get(&empire).cloned().unwrap_or_default()
    }
}

impl Galaxy for StaticGalaxy {
    fn planets_of(&self, owner: EmpireId) -> Vec<&Planet> {
        self.planets.iter().filter(|p| p.owner == Some(owner)).collect()
    }

    fn current_military_strength(&self, empire: EmpireId) -> f32 {
        self.forces(empire).military_strength
    }

    fn offensive_strength(&self, empire: EmpireId) -> f32 {
        self.forces(empire).offensive_strength
    }

    fn weighted_center(&self, empire: EmpireId) -> Position {
        if let Some(center) = self.centers.get(&empire) {
            return *center;
        }
        let owned = self.planets_of(empire);
        if owned.is_empty() {
            return Position::default();
        }
        let n = owned.len() as f32;
        let (x, y) = owned
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.center.x, y + p.center.y));
        Position::new(x / n, y / n)
    }

    fn universe_size(&self) -> f32 {
        self.universe_size
    }

    fn universe_width(&self) -> f32 {
        self.universe_width
    }

    fn system_rank_importance(&self, owner: EmpireId, system: SystemId) -> f32 {
        self.rank_importance
            .get(&owner)
            .and_then(|m| m.get(&system))
            .copied()
            .unwrap_or(0.0)
    }

    fn border_systems(&self, owner: EmpireId) -> Vec<&BorderSystem> {
        self.borders
            .get(&owner)
            .map(|b| b.iter().collect())
            .unwrap_or_default()
    }

    fn desired_planets(&self, owner: EmpireId) -> Vec<DesiredPlanet> {
        self.desired.get(&owner).cloned().unwrap_or_default()
    }

    fn strength_of_all_threats(&self, empire: EmpireId) -> f32 {
        self.forces(empire).threat_strength
    }

    fn ship_designs(&self) -> &[ShipDesign] {
        &self.designs
    }
}
