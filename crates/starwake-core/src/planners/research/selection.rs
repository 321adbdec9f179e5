//! Tech selection by type and cost, biased toward a target combat ship.

use std::collections::{BTreeMap, BTreeSet};

use starwake_protocol::{ShipRole, TechUid, TechnologyType};
use tracing::{debug, warn};

use super::Researcher;
use crate::empire::TechEntry;
use crate::galaxy::ShipDesign;

const SHIP_TYPE_NAMES: [&str; 4] = ["ShipWeapons", "ShipDefense", "ShipGeneral", "ShipHull"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostPreference {
    Cheapest,
    Expensive,
}

impl CostPreference {
    pub fn parse(command: &str) -> Option<Self> {
        match command {
            "CHEAPEST" => Some(CostPreference::Cheapest),
            "EXPENSIVE" => Some(CostPreference::Expensive),
            _ => None,
        }
    }
}

impl<'r> Researcher<'r> {
    /// Techs that could be started right now.
    fn available_techs(&self) -> Vec<TechUid> {
        let techs = &self.empire.techs;
        techs
            .iter()
            .filter(|t| t.discovered && t.ship_designs_can_use && !t.unlocked && techs.have_prereq(&t.uid))
            .map(|t| t.uid.clone())
            .collect()
    }

    /// Sets the research topic from `target` (a tech type, or `RANDOM`/`TECH`
    /// with the types listed in `modifier`). Returns false when nothing fits.
    pub(super) fn scripted_research(&mut self, preference: CostPreference, target: &str, modifier: &str) -> bool {
        let available = self.available_techs();
        if available.is_empty() {
            debug!(empire = %self.empire.name, "no techs available to research");
            return false;
        }
        let money_needed = self.empire.ai.build_capacity * 0.2;

        self.clear_finished_best_ship();
        let wanted = self.find_best_ship(modifier, &available, target);
        let candidates = self.best_ship_techs(&wanted, &available);

        let topic = match target {
            "RANDOM" | "TECH" => {
                let mut normalizer = 0.01_f32;
                let mut previous = match preference {
                    CostPreference::Cheapest => i64::MAX,
                    CostPreference::Expensive => i64::MIN,
                };
                let mut best = None;
                for type_name in modifier.split(':').skip(1) {
                    let Some(tech) = self.scripted_tech(preference, type_name, &candidates, money_needed) else {
                        continue;
                    };
                    let cost = (tech.cost * normalizer).ceil() as i64;
                    match preference {
                        CostPreference::Cheapest if cost < previous => {
                            best = Some(tech.uid.clone());
                            previous = cost;
                            normalizer += 0.005;
                        }
                        CostPreference::Expensive if cost > previous => {
                            best = Some(tech.uid.clone());
                            previous = cost;
                            normalizer *= 0.25;
                        }
                        _ => {}
                    }
                }
                best
            }
            _ => self
                .scripted_tech(preference, target, &candidates, money_needed)
                .map(|t| t.uid.clone()),
        };

        match topic {
            Some(topic) => {
                self.empire.ai.research.post_research_topic = Some(topic.clone());
                self.empire.research_topic = Some(topic);
                true
            }
            None => false,
        }
    }

    /// Cheapest or most expensive candidate of one type.
    fn scripted_tech(
        &self,
        preference: CostPreference,
        type_name: &str,
        candidates: &[TechUid],
        money_needed: f32,
    ) -> Option<&TechEntry> {
        let Some(tech_type) = TechnologyType::parse(type_name) else {
            warn!(empire = %self.empire.name, tech_type = type_name, "unknown tech type in research script");
            return None;
        };
        if self.empire.tech_type_restricted(tech_type) {
            debug!(empire = %self.empire.name, ?tech_type, "tech type restricted by traits");
            return None;
        }

        let only_one = candidates.len() == 1;
        let filtered = candidates
            .iter()
            .filter_map(|uid| self.empire.techs.get(uid))
            .filter(|t| {
                t.leads_to(tech_type)
                    && (tech_type != TechnologyType::Economic
                        || t.hulls_unlocked.is_empty()
                        || money_needed < 1.0
                        || only_one
                        || t.unlocks_orbital_hull())
            });

        match preference {
            CostPreference::Cheapest => filtered.reduce(|best, t| if t.cost < best.cost { t } else { best }),
            CostPreference::Expensive => filtered.reduce(|best, t| if t.cost > best.cost { t } else { best }),
        }
    }

    /// Candidates that survive the ship plan. Repeatable techs are dropped
    /// once one level is researched.
    fn best_ship_techs(&self, wanted: &BTreeSet<TechUid>, available: &[TechUid]) -> Vec<TechUid> {
        available
            .iter()
            .filter(|uid| wanted.contains(*uid))
            .filter(|uid| {
                self.empire
                    .techs
                    .get(uid)
                    .is_some_and(|t| !(t.max_level > 1 && t.level > 0))
            })
            .cloned()
            .collect()
    }

    fn design(&self, name: &str) -> Option<&'r ShipDesign> {
        let designs = self.designs;
        designs.iter().find(|d| d.name == name)
    }

    /// Forgets the target ship once it can be built or needs nothing new.
    fn clear_finished_best_ship(&mut self) {
        let Some(name) = self.empire.ai.research.best_combat_ship.clone() else {
            return;
        };
        let finished = self.empire.buildable_ships.contains(&name)
            || self
                .design(&name)
                .map_or(true, |d| d.techs_needed.iter().all(|t| self.empire.ship_techs.contains(t)));
        if finished {
            self.empire.ai.research.best_combat_ship = None;
        }
    }

    /// Non-ship techs plus the techs of the ship we are steering toward.
    fn find_best_ship(&mut self, modifier: &str, available: &[TechUid], target: &str) -> BTreeSet<TechUid> {
        let mut ship_techs = BTreeSet::new();
        let mut wanted = BTreeSet::new();
        for uid in available {
            let is_ship = self.empire.techs.get(uid).is_some_and(|t| t.tech_type.is_ship_tech());
            if is_ship {
                ship_techs.insert(uid.clone());
            } else {
                wanted.insert(uid.clone());
            }
        }

        if !SHIP_TYPE_NAMES.iter().any(|name| modifier.contains(name)) {
            return wanted;
        }

        if target == "RANDOM" {
            if let Some(best) = self
                .empire
                .ai
                .research
                .best_combat_ship
                .as_deref()
                .and_then(|name| self.design(name))
            {
                wanted.extend(best.techs_needed.iter().cloned());
                return wanted;
            }
        }

        let researchable = self.researchable_designs();
        if researchable.is_empty() {
            return wanted;
        }
        if let Some(best) = self.line_focused_ship(&researchable, &ship_techs) {
            debug!(empire = %self.empire.name, ship = %best.name, hull = ?best.hull_role, "best combat ship");
            self.empire.ai.research.best_combat_ship = Some(best.name.clone());
            wanted.extend(best.techs_needed.iter().cloned());
        }
        wanted
    }

    /// Our-style combat designs we cannot build yet but could research.
    fn researchable_designs(&self) -> Vec<&'r ShipDesign> {
        let designs = self.designs;
        let mut racial: Vec<&ShipDesign> = designs
            .iter()
            .filter(|d| d.usable_by_style(&self.empire.data.ship_style) && !d.techs_needed.is_empty())
            .collect();
        racial.sort_by(|a, b| a.tech_score.total_cmp(&b.tech_score));

        racial
            .into_iter()
            .filter(|d| d.hull_role.is_combat_role() && d.design_role.is_combat_role() && d.role.is_combat_role())
            .filter(|d| !self.empire.buildable_ships.contains(&d.name))
            .filter(|d| d.good_to_build && d.unlockable)
            .filter(|d| {
                d.techs_needed
                    .iter()
                    .all(|t| self.empire.techs.get(t).is_some_and(|e| e.discovered))
            })
            .collect()
    }

    /// Among the designs closest to completion, picks a hull role, a design
    /// role and finally a ship, each with rising odds down the list.
    fn line_focused_ship(
        &mut self,
        researchable: &[&'r ShipDesign],
        ship_techs: &BTreeSet<TechUid>,
    ) -> Option<&'r ShipDesign> {
        let mut by_missing: BTreeMap<usize, Vec<&'r ShipDesign>> = BTreeMap::new();
        for design in researchable {
            if !self.empire.can_build_carriers && design.carrier {
                continue;
            }
            let missing = design
                .techs_needed
                .iter()
                .filter(|t| !self.empire.ship_techs.contains(*t) && !ship_techs.contains(*t))
                .count();
            by_missing.entry(missing).or_default().push(*design);
        }
        let (_, closest) = by_missing.into_iter().next()?;

        let hulls = self.choose_role(group_by_role(closest, |d| d.hull_role))?;
        let mut ships = self.choose_role(group_by_role(hulls, |d| d.design_role))?;
        ships.sort_by(|a, b| b.techs_needed.len().cmp(&a.techs_needed.len()));

        let count = ships.len() as f32;
        for (i, ship) in ships.iter().enumerate() {
            let chance = (i + 1) as f32 / count;
            if self.rng.random_between(0.01, 1.0) > chance {
                continue;
            }
            return Some(*ship);
        }
        None
    }

    fn choose_role(&mut self, groups: BTreeMap<ShipRole, Vec<&'r ShipDesign>>) -> Option<Vec<&'r ShipDesign>> {
        let count = groups.len() as f32;
        let mut fallback = None;
        for (x, (_, ships)) in groups.into_iter().enumerate() {
            let chance = (x + 1) as f32 / count;
            if self.rng.avg_random_between(0.01, 1.0) <= chance {
                return Some(ships);
            }
            if fallback.is_none() {
                fallback = Some(ships);
            }
        }
        fallback
    }
}

fn group_by_role<'d>(
    designs: Vec<&'d ShipDesign>,
    key: impl Fn(&ShipDesign) -> ShipRole,
) -> BTreeMap<ShipRole, Vec<&'d ShipDesign>> {
    let mut groups: BTreeMap<ShipRole, Vec<&'d ShipDesign>> = BTreeMap::new();
    for design in designs {
        groups.entry(key(design)).or_default().push(design);
    }
    groups
}
