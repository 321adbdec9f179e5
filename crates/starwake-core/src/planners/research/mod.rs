//! Research planner: a small script interpreter over the empire's tech path,
//! with a weighted random chooser as fallback.
//!
//! Script tokens:
//!
//! | token                   | effect                                            |
//! |-------------------------|---------------------------------------------------|
//! | `SCRIPT:type[:mod]`     | cheapest tech of `type`                           |
//! | `LOOP:n`                | jump to index `n`                                 |
//! | `CHEAPEST[:types..]`    | cheapest of the first type; bare form goes random |
//! | `EXPENSIVE[:types..]`   | as above, most expensive                          |
//! | `IFWAR:n`, `IFPEACE:n`  | jump to `n` when the condition holds              |
//! | `IFHIGHTAX:n`, `IFCYBERNETIC:n`, `IF[NOT]LOWRESEARCH:n`, `IF[NOT]LOWINCOME:n` | |
//! | `RANDOM`                | one weighted random pick                          |
//! | anything else           | a tech uid, researched when its prerequisites are |

mod selection;

use std::collections::BTreeSet;

use starwake_protocol::EmpireId;
use tracing::{debug, warn};

use crate::context::GameContext;
use crate::empire::{Empire, ResearchStrategy};
use crate::error::AiError;
use crate::galaxy::{Planet, ShipDesign};
use crate::rng::GameRng;

pub use self::selection::CostPreference;

/// Tech whose absence makes barren planets a research concern.
pub const BIOSPHERES_TECH: &str = "Biospheres";

const SHIP_TECH_TYPES: &str = "ShipWeapons:ShipDefense:ShipGeneral:ShipHull";

/// Inputs that bias what gets researched this turn.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResearchSignals {
    pub wars: f32,
    pub research_debt: f32,
    pub economics: f32,
    pub needs_food: f32,
    pub ship_build_bonus: f32,
    pub cybernetic: bool,
    pub low_income: bool,
}

impl ResearchSignals {
    /// Raw signals. Counts down the empire's tech delay as a side effect.
    pub fn gather(
        empire: &mut Empire,
        factions: &BTreeSet<EmpireId>,
        threat_strength: f32,
        our_strength: f32,
        planets: &[&Planet],
    ) -> Self {
        let cybernetic = empire.data.cybernetic;
        let mut hostile = 0;
        let mut grudges = 0;
        for rel in empire.relations.all_relations() {
            if factions.contains(&rel.them) {
                continue;
            }
            if rel.at_war() || rel.preparing_for_war {
                hostile += 1;
            }
            if rel.total_anger > 10.0 || rel.fear_entries.len() > 1 {
                grudges += 1;
            }
        }
        let wars = hostile as f32 + threat_strength / (our_strength + 1.0) + grudges as f32 * 2.0;

        let mut research_debt = 0.0;
        if let Some(topic) = &empire.ai.research.post_research_topic {
            let cost = empire.techs.get(topic).map_or(0.0, |t| t.cost);
            if empire.max_research_potential > 0.0 {
                research_debt = cost / empire.max_research_potential;
            }
        }
        research_debt += empire.strategy.research_priority - wars;

        let economics = empire.data.tax_rate * 10.0;

        let biospheres = empire.techs.is_unlocked(BIOSPHERES_TECH);
        let mut needs_food = 0.0;
        for planet in planets {
            let stored = if cybernetic { planet.production_here } else { planet.food_here };
            if planet.max_storage > 0.0 && stored / planet.max_storage < 0.2 {
                needs_food += 1.0;
            }
            if !biospheres && planet.fertility < 0.1 {
                needs_food += 2.0;
            }
        }
        if needs_food > 0.0 && !planets.is_empty() {
            needs_food /= planets.len() as f32;
        }
        needs_food *= 10.0;

        empire.data.tech_delay_time = empire.data.tech_delay_time.saturating_sub(1);
        let ship_build_bonus = if empire.data.tech_delay_time > 0 {
            -5.0 - empire.data.tech_delay_time as f32
        } else {
            0.0
        };

        Self {
            wars,
            research_debt,
            economics,
            needs_food,
            ship_build_bonus,
            cybernetic,
            low_income: empire.treasury.money < empire.treasury.gross_taxes,
        }
    }

    /// Scales the four weighted signals so they sum to ten.
    pub fn normalized(mut self) -> Self {
        let total = (self.wars + self.research_debt + self.needs_food + self.economics) * 0.1;
        if total.abs() > f32::EPSILON {
            self.wars /= total;
            self.research_debt /= total;
            self.needs_food /= total;
            self.economics /= total;
        }
        self
    }
}

/// Picks a research topic when the empire has none. Returns whether a topic
/// was chosen by this call.
pub fn run_research_planner(ctx: &mut GameContext<'_>, id: EmpireId) -> Result<bool, AiError> {
    let factions: BTreeSet<EmpireId> = ctx.universe.empires().filter(|e| e.is_faction).map(|e| e.id).collect();
    let galaxy = ctx.galaxy;
    let threat_strength = galaxy.strength_of_all_threats(id);
    let our_strength = galaxy.current_military_strength(id);
    let planets = galaxy.planets_of(id);

    let empire = ctx.universe.get_mut(id)?;
    if empire.research_topic.is_some() {
        return Ok(false);
    }

    let signals = ResearchSignals::gather(empire, &factions, threat_strength, our_strength, &planets).normalized();
    debug!(
        empire = %empire.name,
        wars = signals.wars,
        research_debt = signals.research_debt,
        needs_food = signals.needs_food,
        economics = signals.economics,
        strategy = ?empire.ai.research.strategy,
        "research signals"
    );

    let mut researcher = Researcher {
        empire,
        designs: galaxy.ship_designs(),
        rng: &mut *ctx.rng,
        signals,
    };
    match researcher.empire.ai.research.strategy {
        ResearchStrategy::Random => {
            researcher.choose_random_tech(CostPreference::Cheapest);
        }
        ResearchStrategy::Scripted => {
            researcher.process_script();
        }
    }

    let empire = researcher.empire;
    if let Some(topic) = &empire.research_topic {
        debug!(empire = %empire.name, topic = %topic, "research topic chosen");
    }
    Ok(empire.research_topic.is_some())
}

/// One empire's research decision in progress.
pub(crate) struct Researcher<'r> {
    pub(crate) empire: &'r mut Empire,
    pub(crate) designs: &'r [ShipDesign],
    pub(crate) rng: &'r mut GameRng,
    pub(crate) signals: ResearchSignals,
}

impl Researcher<'_> {
    fn set_index(&mut self, index: usize) {
        self.empire.ai.research.script_index = index;
    }

    fn advance_index(&mut self) {
        self.empire.ai.research.script_index += 1;
    }

    /// Runs the tech path from the saved index. Returns true when a script
    /// entry settled this turn's research.
    fn process_script(&mut self) -> bool {
        let path = self.empire.strategy.tech_path.clone();
        let len = path.len();
        let at_war = self.signals.wars > 0.0;
        let high_tax = self.signals.economics > 4.0;
        let low_research = self.signals.research_debt > 2.0;
        let low_income = self.signals.low_income;
        let cybernetic = self.signals.cybernetic;
        let mut loop_count = 0;

        while self.empire.ai.research.script_index < len && loop_count < len {
            let index = self.empire.ai.research.script_index;
            let entry = path[index].as_str();
            let parts: Vec<&str> = entry.split(':').collect();
            let command = if self.empire.techs.contains(entry) { entry } else { parts[0] };

            match command {
                "SCRIPT" => {
                    let Some(tech_type) = parts.get(1) else {
                        warn!(empire = %self.empire.name, index, entry, "script entry without a tech type");
                        self.advance_index();
                        continue;
                    };
                    let modifier = parts.get(2).copied().unwrap_or("");
                    self.advance_index();
                    if self.scripted_research(CostPreference::Cheapest, tech_type, modifier) {
                        return true;
                    }
                    loop_count += 1;
                }
                "LOOP" => match jump_target(&parts) {
                    Some(target) => {
                        self.set_index(target);
                        loop_count += 1;
                    }
                    None => {
                        warn!(empire = %self.empire.name, index, entry, "malformed loop entry");
                        self.advance_index();
                    }
                },
                "CHEAPEST" | "EXPENSIVE" => {
                    let preference = CostPreference::parse(command).unwrap_or(CostPreference::Cheapest);
                    self.advance_index();
                    if parts.len() == 1 {
                        self.choose_random_tech(preference);
                        return true;
                    }
                    let modifier = parts[1..].join(":");
                    if self.scripted_research(preference, parts[1], &modifier) {
                        return true;
                    }
                    loop_count += 1;
                }
                "IFWAR" => loop_count += self.script_bump(&parts, at_war),
                "IFPEACE" => loop_count += self.script_bump(&parts, !at_war),
                "IFHIGHTAX" => loop_count += self.script_bump(&parts, high_tax),
                "IFCYBERNETIC" => loop_count += self.script_bump(&parts, cybernetic),
                "IFLOWRESEARCH" => loop_count += self.script_bump(&parts, low_research),
                "IFNOTLOWRESEARCH" => loop_count += self.script_bump(&parts, !low_research),
                "IFLOWINCOME" => loop_count += self.script_bump(&parts, low_income),
                "IFNOTLOWINCOME" => loop_count += self.script_bump(&parts, !low_income),
                "RANDOM" => {
                    self.advance_index();
                    self.choose_random_tech(CostPreference::Cheapest);
                    return true;
                }
                _ => {
                    self.advance_index();
                    let Some(tech) = self.empire.techs.get(entry) else {
                        warn!(empire = %self.empire.name, index, tech = entry, "tech in research script not found");
                        continue;
                    };
                    if !tech.unlocked && self.empire.techs.have_prereq(entry) {
                        self.empire.research_topic = Some(entry.to_string());
                        self.empire.ai.research.post_research_topic = Some(entry.to_string());
                        return true;
                    }
                }
            }
        }

        if self.empire.research_topic.is_none() {
            self.choose_random_tech(CostPreference::Cheapest);
            if loop_count >= len {
                self.empire.ai.research.strategy = ResearchStrategy::Random;
            }
        }
        false
    }

    /// Conditional jump. Returns 1 when the jump was taken.
    fn script_bump(&mut self, parts: &[&str], condition: bool) -> usize {
        if !condition {
            self.advance_index();
            return 0;
        }
        match jump_target(parts) {
            Some(target) => {
                self.set_index(target);
                1
            }
            None => {
                warn!(empire = %self.empire.name, entry = %parts.join(":"), "malformed conditional entry");
                self.advance_index();
                0
            }
        }
    }

    /// Weighted random pick across the seven research categories.
    fn choose_random_tech(&mut self, preference: CostPreference) -> bool {
        let s = self.signals;
        let strategy = &self.empire.strategy;
        let (military, research, expansion, industry) = (
            strategy.military_priority,
            strategy.research_priority,
            strategy.expansion_priority,
            strategy.industry_priority,
        );
        let ship_bonus = s.wars + s.ship_build_bonus;

        let mut weights = [
            ("SHIPTECH", randomizer(self.rng, military, ship_bonus)),
            ("Research", randomizer(self.rng, research, s.research_debt)),
            (
                "Colonization",
                randomizer(self.rng, expansion, if s.cybernetic { -1.0 } else { s.needs_food }),
            ),
            ("Economic", randomizer(self.rng, expansion, s.economics)),
            (
                "Industry",
                randomizer(self.rng, industry, if s.cybernetic { s.needs_food } else { 0.0 }),
            ),
            ("General", randomizer(self.rng, research, 0.0)),
            ("GroundCombat", randomizer(self.rng, military, ship_bonus * 0.5)),
        ];
        weights.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut script = String::from("TECH");
        let mut taken = 0;
        for (key, weight) in weights {
            if taken > 4 {
                break;
            }
            if weight < 0.0 {
                continue;
            }
            script.push(':');
            if key == "SHIPTECH" {
                script.push_str(SHIP_TECH_TYPES);
                taken += 2;
            } else {
                script.push_str(key);
                taken += 1;
            }
        }
        debug!(empire = %self.empire.name, script = %script, "random research");
        self.scripted_research(preference, "RANDOM", &script)
    }
}

/// Uniform-ish draw between 0 and `priority + bonus`, negative when the sum is.
fn randomizer(rng: &mut GameRng, priority: f32, bonus: f32) -> f32 {
    let top = priority + bonus;
    if top >= 0.0 {
        rng.avg_random_between(0.0, top)
    } else {
        rng.avg_random_between(top, 0.0)
    }
}

fn jump_target(parts: &[&str]) -> Option<usize> {
    parts.get(1)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Sandbox;
    use crate::empire::{TechEntry, TechTree};
    use crate::galaxy::StaticGalaxy;
    use crate::settings::AiSettings;
    use crate::universe::Universe;
    use crate::war::War;
    use starwake_protocol::{PersonalityType, PlanetId, Position, SystemId, TechnologyType, WarType};

    fn techs() -> TechTree {
        TechTree::new([
            TechEntry::new("Lasers", TechnologyType::ShipWeapons, 100.0),
            TechEntry::new("Farming", TechnologyType::Colonization, 50.0),
            TechEntry::new("Banking", TechnologyType::Economic, 80.0),
            TechEntry::new("Markets", TechnologyType::Economic, 300.0),
            TechEntry::new("Labs", TechnologyType::Research, 120.0),
            TechEntry::new("Mining", TechnologyType::Industry, 90.0),
            TechEntry::new("Theory", TechnologyType::General, 60.0),
            TechEntry::new("Marines", TechnologyType::GroundCombat, 70.0),
            TechEntry::new("Fusion", TechnologyType::General, 500.0).with_prerequisite("Theory"),
        ])
    }

    fn sandbox(path: &[&str]) -> Sandbox {
        let mut empire = Empire::new(EmpireId(0), "Vesh", PersonalityType::Cunning);
        empire.techs = techs();
        empire.strategy.tech_path = path.iter().map(|s| s.to_string()).collect();
        let other = Empire::new(EmpireId(1), "Kulrathi", PersonalityType::Ruthless);
        Sandbox::new(
            Universe::new(vec![empire, other]),
            StaticGalaxy::default(),
            AiSettings::default(),
            11,
        )
    }

    fn run(sb: &mut Sandbox) -> bool {
        run_research_planner(&mut sb.context(), EmpireId(0)).unwrap()
    }

    fn topic(sb: &Sandbox) -> Option<String> {
        sb.universe.get(EmpireId(0)).unwrap().research_topic.clone()
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut sb = sandbox(&["Farming", "Labs"]);
        assert!(run(&mut sb));
        let before = sb.universe.clone();
        assert!(!run(&mut sb));
        assert_eq!(sb.universe, before);
    }

    #[test]
    fn literal_entries_follow_prerequisites() {
        let mut sb = sandbox(&["Bogus", "Fusion", "Theory"]);
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Theory"));
        let empire = sb.universe.get(EmpireId(0)).unwrap();
        assert_eq!(empire.ai.research.script_index, 3);
        assert_eq!(empire.ai.research.post_research_topic.as_deref(), Some("Theory"));
    }

    #[test]
    fn conditional_jump_depends_on_war() {
        let mut sb = sandbox(&["IFWAR:2", "Farming", "Labs"]);
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Farming"));

        let mut sb = sandbox(&["IFWAR:2", "Farming", "Labs"]);
        sb.universe
            .relation_mut(EmpireId(0), EmpireId(1))
            .unwrap()
            .start_war(War::new(EmpireId(0), EmpireId(1), WarType::BorderConflict, 0.0));
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Labs"));
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        let mut sb = sandbox(&["LOOP:x", "IFPEACE:nope", "SCRIPT", "Mining"]);
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Mining"));
    }

    #[test]
    fn cheapest_and_expensive_by_type() {
        let mut sb = sandbox(&["CHEAPEST:Economic"]);
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Banking"));

        let mut sb = sandbox(&["EXPENSIVE:Economic"]);
        run(&mut sb);
        assert_eq!(topic(&sb).as_deref(), Some("Markets"));
    }

    #[test]
    fn exhausted_script_switches_to_random() {
        let mut sb = sandbox(&["SCRIPT:ShipHull"]);
        run(&mut sb);
        let empire = sb.universe.get(EmpireId(0)).unwrap();
        assert_eq!(empire.ai.research.strategy, ResearchStrategy::Random);
        let picked = empire.research_topic.as_deref().unwrap();
        assert!(!empire.techs.get(picked).unwrap().tech_type.is_ship_tech());
    }

    #[test]
    fn random_mode_never_panics_without_candidates() {
        let mut sb = sandbox(&[]);
        sb.universe.get_mut(EmpireId(0)).unwrap().techs = TechTree::default();
        assert!(!run(&mut sb));
        assert_eq!(topic(&sb), None);
    }

    #[test]
    fn signals_count_wars_food_and_delay() {
        let mut empire = Empire::new(EmpireId(0), "Vesh", PersonalityType::Cunning);
        empire.relations.add_relation(EmpireId(1)).prepare_for_war(WarType::ImperialistWar);
        empire.relations.add_relation(EmpireId(2)).add_anger_diplomatic_conflict(20.0);
        empire.data.tech_delay_time = 3;
        let planet = Planet {
            id: PlanetId(1),
            owner: Some(EmpireId(0)),
            system: SystemId(1),
            center: Position::default(),
            food_here: 10.0,
            production_here: 0.0,
            max_storage: 100.0,
            fertility: 0.05,
        };
        let factions = BTreeSet::from([EmpireId(2)]);

        let s = ResearchSignals::gather(&mut empire, &factions, 100.0, 99.0, &[&planet]);
        // one preparing relation plus the threat ratio; the faction is ignored
        assert!((s.wars - 2.0).abs() < 1e-5);
        assert!((s.needs_food - 30.0).abs() < 1e-5);
        assert_eq!(s.ship_build_bonus, -7.0);
        assert_eq!(empire.data.tech_delay_time, 2);

        let n = s.normalized();
        let sum = n.wars + n.research_debt + n.needs_food + n.economics;
        assert!((sum - 10.0).abs() < 1e-3);
    }
}
