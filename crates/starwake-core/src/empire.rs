use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use starwake_protocol::{EmpireId, PersonalityType, ShipRole, TechUid, TechnologyType};

use crate::ledger::RelationshipLedger;
use crate::personality::{DiplomaticTraits, PersonalityModifiers};

// =============================================================================
// Empire Data
// =============================================================================

/// Slow-changing empire settings the planners read and write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpireData {
    /// 0..=1, written by the economic planner.
    pub tax_rate: f32,
    /// Multiplier on the stable income kept in the treasury.
    pub treasury_goal: f32,
    /// Player-only switch that lets the economic planner set taxes.
    pub auto_taxes: bool,
    pub cybernetic: bool,
    /// Turns during which ship research is discouraged.
    pub tech_delay_time: u32,
    /// Technology categories this race may never research.
    pub tech_type_restrictions: Vec<TechnologyType>,
    /// Racial ship style; designs of other styles are ignored.
    pub ship_style: String,
}

impl Default for EmpireData {
    fn default() -> Self {
        Self {
            tax_rate: 0.25,
            treasury_goal: 0.2,
            auto_taxes: false,
            cybernetic: false,
            tech_delay_time: 0,
            tech_type_restrictions: Vec::new(),
            ship_style: String::new(),
        }
    }
}

/// Money figures supplied by the host each turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Treasury {
    pub money: f32,
    /// Income at a 100% tax rate.
    pub maximum_income: f32,
    /// Income at a 100% tax rate ignoring one-off sources.
    pub maximum_stable_income: f32,
    pub civ_ship_maintenance: f32,
    pub troop_cost_on_planets: f32,
    pub troop_ship_maintenance: f32,
    pub all_spending: f32,
    pub gross_taxes: f32,
}

/// Research and economic leanings, plus the research script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicStrategy {
    pub research_priority: f32,
    pub expansion_priority: f32,
    pub military_priority: f32,
    pub industry_priority: f32,
    pub research_ratio: f32,
    pub expansion_ratio: f32,
    pub military_ratio: f32,
    pub industry_ratio: f32,
    /// Research script tokens, see the research planner.
    pub tech_path: Vec<String>,
}

impl Default for EconomicStrategy {
    fn default() -> Self {
        Self {
            research_priority: 5.0,
            expansion_priority: 5.0,
            military_priority: 5.0,
            industry_priority: 5.0,
            research_ratio: 0.25,
            expansion_ratio: 0.25,
            military_ratio: 0.25,
            industry_ratio: 0.25,
            tech_path: Vec::new(),
        }
    }
}

// =============================================================================
// Technology
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HullUnlock {
    pub name: String,
    pub role: ShipRole,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechEntry {
    pub uid: TechUid,
    pub tech_type: TechnologyType,
    pub cost: f32,
    #[serde(default)]
    pub discovered: bool,
    #[serde(default)]
    pub unlocked: bool,
    /// False for techs no ship design or building ever needs.
    #[serde(default = "default_true")]
    pub ship_designs_can_use: bool,
    #[serde(default)]
    pub prerequisites: Vec<TechUid>,
    #[serde(default)]
    pub hulls_unlocked: Vec<HullUnlock>,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default)]
    pub level: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_level() -> u32 {
    1
}

impl TechEntry {
    pub fn new(uid: impl Into<TechUid>, tech_type: TechnologyType, cost: f32) -> Self {
        Self {
            uid: uid.into(),
            tech_type,
            cost,
            discovered: true,
            unlocked: false,
            ship_designs_can_use: true,
            prerequisites: Vec::new(),
            hulls_unlocked: Vec::new(),
            max_level: 1,
            level: 0,
        }
    }

    pub fn with_prerequisite(mut self, uid: impl Into<TechUid>) -> Self {
        self.prerequisites.push(uid.into());
        self
    }

    /// Whether picking this tech moves research toward `tech_type`.
    pub fn leads_to(&self, tech_type: TechnologyType) -> bool {
        self.tech_type == tech_type
    }

    pub fn unlocks_orbital_hull(&self) -> bool {
        self.hulls_unlocked.iter().any(|h| h.role.is_orbital())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechTree {
    techs: BTreeMap<TechUid, TechEntry>,
}

impl TechTree {
    pub fn new(techs: impl IntoIterator<Item = TechEntry>) -> Self {
        Self {
            techs: techs.into_iter().map(|t| (t.uid.clone(), t)).collect(),
        }
    }

    pub fn get(&self, uid: &str) -> Option<&TechEntry> {
        self.techs.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.techs.contains_key(uid)
    }

    pub fn is_unlocked(&self, uid: &str) -> bool {
        self.techs.get(uid).is_some_and(|t| t.unlocked)
    }

    pub fn have_prereq(&self, uid: &str) -> bool {
        self.techs
            .get(uid)
            .is_some_and(|t| t.prerequisites.iter().all(|p| self.is_unlocked(p)))
    }

    /// Marks a tech researched. Returns false for unknown techs.
    pub fn unlock(&mut self, uid: &str) -> bool {
        match self.techs.get_mut(uid) {
            Some(tech) => {
                tech.discovered = true;
                tech.unlocked = true;
                tech.level = (tech.level + 1).min(tech.max_level);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechEntry> {
        self.techs.values()
    }

    pub fn len(&self) -> usize {
        self.techs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }
}

// =============================================================================
// AI State
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchStrategy {
    Random,
    #[default]
    Scripted,
}

/// Research planner memory carried across turns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchState {
    pub strategy: ResearchStrategy,
    pub script_index: usize,
    /// Last topic the planner picked; its cost feeds the research-debt signal.
    pub post_research_topic: Option<TechUid>,
    /// Design name the ship-tech biasing is steering toward.
    pub best_combat_ship: Option<String>,
}

/// Budgets and threat figures written by the economic planner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiState {
    pub defense_budget: f32,
    pub ssp_budget: f32,
    pub build_capacity: f32,
    pub spy_budget: f32,
    pub colony_budget: f32,
    pub terraform_budget: f32,
    pub alliance_build_capacity: f32,
    pub projected_money: f32,
    pub threat_level: f32,
    pub economic_threat: f32,
    pub border_threat: f32,
    pub enemy_threat: f32,
    pub research: ResearchState,
}

// =============================================================================
// Empire
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Empire {
    pub id: EmpireId,
    pub name: String,
    pub is_player: bool,
    /// Pirates, remnants and similar non-diplomatic powers.
    pub is_faction: bool,
    pub defeated: bool,
    pub personality: PersonalityType,
    pub traits: DiplomaticTraits,
    pub data: EmpireData,
    pub treasury: Treasury,
    pub strategy: EconomicStrategy,
    pub techs: TechTree,
    pub research_topic: Option<TechUid>,
    pub max_research_potential: f32,
    pub agents: u32,
    pub spy_limit: u32,
    pub buildable_ships: BTreeSet<String>,
    /// Techs already unlocked that ship designs depend on.
    pub ship_techs: BTreeSet<TechUid>,
    pub can_build_carriers: bool,
    pub relations: RelationshipLedger,
    pub ai: AiState,
}

impl Default for Empire {
    fn default() -> Self {
        Self::new(EmpireId(0), "", PersonalityType::default())
    }
}

impl Empire {
    pub fn new(id: EmpireId, name: impl Into<String>, personality: PersonalityType) -> Self {
        Self {
            id,
            name: name.into(),
            is_player: false,
            is_faction: false,
            defeated: false,
            personality,
            traits: DiplomaticTraits::defaults_for(personality),
            data: EmpireData::default(),
            treasury: Treasury::default(),
            strategy: EconomicStrategy::default(),
            techs: TechTree::default(),
            research_topic: None,
            max_research_potential: 1.0,
            agents: 0,
            spy_limit: 3,
            buildable_ships: BTreeSet::new(),
            ship_techs: BTreeSet::new(),
            can_build_carriers: false,
            relations: RelationshipLedger::new(id),
            ai: AiState::default(),
        }
    }

    pub fn player(mut self) -> Self {
        self.is_player = true;
        self
    }

    pub fn faction(mut self) -> Self {
        self.is_faction = true;
        self
    }

    pub fn modifiers(&self) -> PersonalityModifiers {
        PersonalityModifiers::for_personality(self.personality)
    }

    pub fn is_pacifist(&self) -> bool {
        self.personality == PersonalityType::Pacifist
    }

    pub fn is_honorable(&self) -> bool {
        self.personality == PersonalityType::Honorable
    }

    pub fn is_xenophobic(&self) -> bool {
        self.personality == PersonalityType::Xenophobic
    }

    pub fn is_aggressive(&self) -> bool {
        self.personality == PersonalityType::Aggressive
    }

    pub fn is_ruthless(&self) -> bool {
        self.personality == PersonalityType::Ruthless
    }

    pub fn is_cunning(&self) -> bool {
        self.personality == PersonalityType::Cunning
    }

    /// 0..=1 blend of savings against the projected treasury and tax headroom.
    pub fn credit_rating(&self) -> f32 {
        let goal_ratio = if self.ai.projected_money > 0.0 {
            self.treasury.money / self.ai.projected_money
        } else {
            1.0
        };
        (goal_ratio.min(1.0) * 3.0 + (1.0 - self.data.tax_rate)) / 4.0
    }

    pub fn safe_to_rush(&self) -> bool {
        self.credit_rating() > 0.8
    }

    /// Whether a race trait forbids researching this category.
    pub fn tech_type_restricted(&self, tech_type: TechnologyType) -> bool {
        self.data.tech_type_restrictions.contains(&tech_type)
    }

    /// Unlocks a tech and records it as a ship tech when designs use it.
    pub fn unlock_tech(&mut self, uid: &str) -> bool {
        if !self.techs.unlock(uid) {
            return false;
        }
        if self.techs.get(uid).is_some_and(|t| t.tech_type.is_ship_tech() || t.ship_designs_can_use) {
            self.ship_techs.insert(uid.to_string());
        }
        true
    }
}
