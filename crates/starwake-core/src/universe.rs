//! Registry of all empires plus the bilateral relationship operations.

use serde::{Deserialize, Serialize};
use starwake_protocol::{EmpireId, Notification, TechUid, TreatyType};

use crate::empire::Empire;
use crate::error::AiError;
use crate::ledger::Relationship;
use crate::services::Notifications;
use crate::settings::{AiSettings, Difficulty};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    empires: Vec<Empire>,
}

impl Universe {
    /// Takes ownership of the empires; ids are reassigned to registry order.
    pub fn new(empires: Vec<Empire>) -> Self {
        let mut empires = empires;
        for (index, empire) in empires.iter_mut().enumerate() {
            let id = EmpireId(index as u8);
            if empire.id != id || empire.relations.owner() != id {
                empire.id = id;
                empire.relations = crate::ledger::RelationshipLedger::new(id);
            }
        }
        Self { empires }
    }

    pub fn get(&self, id: EmpireId) -> Result<&Empire, AiError> {
        self.empires.get(id.index()).ok_or(AiError::UnknownEmpire(id))
    }

    pub fn get_mut(&mut self, id: EmpireId) -> Result<&mut Empire, AiError> {
        self.empires.get_mut(id.index()).ok_or(AiError::UnknownEmpire(id))
    }

    /// Mutable access to two distinct empires at once.
    pub fn pair_mut(&mut self, a: EmpireId, b: EmpireId) -> Result<(&mut Empire, &mut Empire), AiError> {
        let (ai, bi) = (a.index(), b.index());
        let len = self.empires.len();
        if ai >= len {
            return Err(AiError::UnknownEmpire(a));
        }
        if bi >= len || ai == bi {
            return Err(AiError::UnknownEmpire(b));
        }
        if ai < bi {
            let (left, right) = self.empires.split_at_mut(bi);
            Ok((&mut left[ai], &mut right[0]))
        } else {
            let (left, right) = self.empires.split_at_mut(ai);
            Ok((&mut right[0], &mut left[bi]))
        }
    }

    pub fn empires(&self) -> impl Iterator<Item = &Empire> {
        self.empires.iter()
    }

    pub fn empires_mut(&mut self) -> impl Iterator<Item = &mut Empire> {
        self.empires.iter_mut()
    }

    pub fn ids(&self) -> Vec<EmpireId> {
        self.empires.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.empires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.empires.is_empty()
    }

    pub fn player(&self) -> Option<&Empire> {
        self.empires.iter().find(|e| e.is_player)
    }

    pub fn player_id(&self) -> Option<EmpireId> {
        self.player().map(|e| e.id)
    }

    pub fn is_player(&self, id: EmpireId) -> bool {
        self.get(id).is_ok_and(|e| e.is_player)
    }

    pub fn relation(&self, us: EmpireId, them: EmpireId) -> Result<&Relationship, AiError> {
        self.get(us)?.relations.get_relations(them)
    }

    pub fn relation_mut(&mut self, us: EmpireId, them: EmpireId) -> Result<&mut Relationship, AiError> {
        self.get_mut(us)?.relations.get_relations_mut(them)
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Creates every pairwise relation and applies the difficulty penalty
    /// toward the player. Traits are refreshed from settings first.
    pub fn initialize_relationships(&mut self, settings: &AiSettings) {
        for empire in &mut self.empires {
            empire.traits = settings.traits_for(empire.personality);
        }

        let ids = self.ids();
        let players: Vec<bool> = self.empires.iter().map(|e| e.is_player).collect();
        let difficulty = settings.difficulty;
        for empire in &mut self.empires {
            for &them in &ids {
                if them == empire.id {
                    continue;
                }
                let mut rel = Relationship::new(them);
                if players[them.index()] && difficulty > Difficulty::Normal {
                    let ratio = difficulty.ratio();
                    rel.trust -= ratio * (100.0 - empire.traits.trustworthiness).max(0.0);
                    rel.add_anger_territorial_conflict(ratio * (100.0 - empire.traits.territorialism).max(0.0));
                }
                empire.relations.insert(rel);
            }
        }
    }

    /// Both sides learn about each other.
    pub fn set_relations_as_known(&mut self, a: EmpireId, b: EmpireId) -> Result<(), AiError> {
        let (ea, eb) = self.pair_mut(a, b)?;
        ea.relations.add_relation(b).known = true;
        eb.relations.add_relation(a).known = true;
        Ok(())
    }

    // =========================================================================
    // Bilateral Treaties
    // =========================================================================

    fn sign_bilateral(&mut self, us: EmpireId, them: EmpireId, treaty: TreatyType, value: bool) -> Result<(), AiError> {
        let (ours, theirs) = self.pair_mut(us, them)?;
        let our_mods = ours.modifiers();
        let their_mods = theirs.modifiers();
        ours.relations
            .get_relations_mut(them)?
            .set_treaty(&our_mods, treaty, value);
        if let Ok(rel) = theirs.relations.get_relations_mut(us) {
            rel.set_treaty(&their_mods, treaty, value);
        }
        Ok(())
    }

    pub fn sign_treaty_with(&mut self, us: EmpireId, them: EmpireId, treaty: TreatyType) -> Result<(), AiError> {
        self.sign_bilateral(us, them, treaty, true)
    }

    /// Breaks a treaty on both sides; the player hears about it when they held it.
    pub fn break_treaty_with(
        &mut self,
        notifications: &mut dyn Notifications,
        us: EmpireId,
        them: EmpireId,
        treaty: TreatyType,
    ) -> Result<(), AiError> {
        let held = self.relation(us, them)?.treaty(treaty);
        if held && treaty != TreatyType::Peace && self.is_player(them) {
            notifications.notify(Notification::TreatyBroken { by: us, with: them, treaty });
        }
        self.sign_bilateral(us, them, treaty, false)
    }

    pub fn break_all_treaties_with(
        &mut self,
        notifications: &mut dyn Notifications,
        us: EmpireId,
        them: EmpireId,
        include_peace: bool,
    ) -> Result<(), AiError> {
        for treaty in [
            TreatyType::Alliance,
            TreatyType::OpenBorders,
            TreatyType::NonAggression,
            TreatyType::Trade,
        ] {
            self.break_treaty_with(notifications, us, them, treaty)?;
        }
        if include_peace {
            self.break_treaty_with(notifications, us, them, TreatyType::Peace)?;
        }
        Ok(())
    }

    pub fn sign_alliance_with(&mut self, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
        self.sign_treaty_with(us, them, TreatyType::Alliance)?;
        self.sign_treaty_with(us, them, TreatyType::OpenBorders)?;
        self.sign_treaty_with(us, them, TreatyType::NonAggression)
    }

    pub fn break_alliance_with(
        &mut self,
        notifications: &mut dyn Notifications,
        us: EmpireId,
        them: EmpireId,
    ) -> Result<(), AiError> {
        self.break_treaty_with(notifications, us, them, TreatyType::Alliance)?;
        self.break_treaty_with(notifications, us, them, TreatyType::OpenBorders)?;
        self.break_treaty_with(notifications, us, them, TreatyType::NonAggression)
    }

    // =========================================================================
    // War Queries
    // =========================================================================

    /// Mean grade of our wars against living major empires; 5 when at peace.
    pub fn average_war_grade(&self, us: EmpireId) -> f32 {
        let Ok(empire) = self.get(us) else {
            return 5.0;
        };
        let grades: Vec<f32> = empire
            .relations
            .all_relations()
            .filter(|rel| {
                self.get(rel.them)
                    .is_ok_and(|them| !them.is_faction && !them.defeated)
            })
            .filter_map(|rel| rel.active_war().map(|w| w.grade()))
            .collect();
        if grades.is_empty() {
            return 5.0;
        }
        grades.iter().sum::<f32>() / grades.len() as f32
    }

    pub fn is_losing_war_with(&self, us: EmpireId, enemy: EmpireId) -> bool {
        self.relation(us, enemy)
            .ok()
            .and_then(Relationship::active_war)
            .is_some_and(|w| w.score_state().is_losing())
    }

    /// Empires we are at war with that hold an alliance with `them`.
    pub fn they_are_allied_with_our_enemies(&self, us: EmpireId, them: EmpireId) -> Vec<EmpireId> {
        let Ok(empire) = self.get(us) else {
            return Vec::new();
        };
        empire
            .relations
            .all_relations()
            .filter(|rel| rel.known && rel.at_war())
            .filter_map(|rel| self.get(rel.them).ok())
            .filter(|other| !other.is_faction && other.relations.is_allied_with(them))
            .map(|other| other.id)
            .collect()
    }

    /// Scales our trust in `them` down when they are allied with our enemies.
    /// Returns the multiplier and whether we refuse outright.
    pub fn alliance_value_multiplier_third_party(
        &mut self,
        us: EmpireId,
        them: EmpireId,
    ) -> Result<(f32, bool), AiError> {
        let allied_with_enemies = !self.they_are_allied_with_our_enemies(us, them).is_empty();
        let empire = self.get_mut(us)?;
        let mods = empire.modifiers();
        let xenophobic = empire.is_xenophobic();
        let rel = empire.relations.get_relations_mut(them)?;

        let mut multiplier = 1.0;
        let mut decline = false;
        if allied_with_enemies {
            rel.add_anger_diplomatic_conflict(mods.add_anger_allied_with_enemies_3rd_party);
            multiplier = mods.alliance_value_allied_with_enemy;
            decline = xenophobic;
        }
        rel.trust *= multiplier;
        Ok((multiplier, decline))
    }

    /// Techs `owner` could hand over to `them`: unlocked here, known but not
    /// researched there, and not forbidden by their race.
    pub fn tradable_techs(&self, owner: EmpireId, them: EmpireId) -> Vec<TechUid> {
        let (Ok(ours), Ok(theirs)) = (self.get(owner), self.get(them)) else {
            return Vec::new();
        };
        ours.techs
            .iter()
            .filter(|t| t.unlocked)
            .filter(|t| {
                theirs
                    .techs
                    .get(&t.uid)
                    .is_some_and(|their| !their.unlocked && !theirs.tech_type_restricted(their.tech_type))
            })
            .map(|t| t.uid.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::empire::TechEntry;
    use crate::empire::TechTree;
    use crate::services::NotificationLog;
    use crate::war::War;
    use starwake_protocol::{PersonalityType, TechnologyType, WarType};

    fn universe() -> Universe {
        let mut u = Universe::new(vec![
            Empire::new(EmpireId(0), "Terran", PersonalityType::Honorable).player(),
            Empire::new(EmpireId(1), "Vesh", PersonalityType::Pacifist),
            Empire::new(EmpireId(2), "Kulrathi", PersonalityType::Xenophobic),
        ]);
        u.initialize_relationships(&AiSettings::default());
        u
    }

    #[test]
    fn every_pair_has_a_relation() {
        let u = universe();
        for a in u.ids() {
            for b in u.ids() {
                assert_eq!(u.relation(a, b).is_ok(), a != b);
            }
        }
    }

    #[test]
    fn hard_difficulty_sours_relations_toward_player() {
        let mut u = Universe::new(vec![
            Empire::new(EmpireId(0), "Terran", PersonalityType::Honorable).player(),
            Empire::new(EmpireId(1), "Kulrathi", PersonalityType::Xenophobic),
        ]);
        let settings = AiSettings {
            difficulty: Difficulty::Brutal,
            ..AiSettings::default()
        };
        u.initialize_relationships(&settings);
        let rel = u.relation(EmpireId(1), EmpireId(0)).unwrap();
        // xenophobic trustworthiness 60, territorialism 100
        assert!((rel.trust + 0.3 * 40.0).abs() < 1e-4);
        assert_eq!(rel.anger_territorial_conflict, 0.0);
        assert_eq!(u.relation(EmpireId(0), EmpireId(1)).unwrap().trust, 0.0);
    }

    #[test]
    fn known_is_symmetric() {
        let mut u = universe();
        u.set_relations_as_known(EmpireId(1), EmpireId(2)).unwrap();
        assert!(u.relation(EmpireId(2), EmpireId(1)).unwrap().known);
        assert!(u.set_relations_as_known(EmpireId(1), EmpireId(1)).is_err());
    }

    #[test]
    fn breaking_a_held_treaty_notifies_the_player() {
        let mut u = universe();
        let mut log = NotificationLog::default();
        u.sign_alliance_with(EmpireId(1), EmpireId(0)).unwrap();
        assert!(u.relation(EmpireId(0), EmpireId(1)).unwrap().nap_pact);
        assert_eq!(u.relation(EmpireId(1), EmpireId(0)).unwrap().trust_entries.len(), 1);

        u.break_all_treaties_with(&mut log, EmpireId(1), EmpireId(0), false).unwrap();
        assert_eq!(log.entries.len(), 3);
        let rel = u.relation(EmpireId(1), EmpireId(0)).unwrap();
        assert!(!rel.alliance && !rel.open_borders && !rel.nap_pact);
        assert!(rel.trust_entries.is_empty());
    }

    #[test]
    fn allied_with_enemies_lowers_alliance_value() {
        let mut u = universe();
        u.set_relations_as_known(EmpireId(2), EmpireId(1)).unwrap();
        u.relation_mut(EmpireId(2), EmpireId(1))
            .unwrap()
            .start_war(War::new(EmpireId(2), EmpireId(1), WarType::ImperialistWar, 0.0));
        u.sign_alliance_with(EmpireId(1), EmpireId(0)).unwrap();
        u.relation_mut(EmpireId(2), EmpireId(0)).unwrap().trust = 50.0;

        assert_eq!(u.they_are_allied_with_our_enemies(EmpireId(2), EmpireId(0)), vec![EmpireId(1)]);
        let (multiplier, decline) = u.alliance_value_multiplier_third_party(EmpireId(2), EmpireId(0)).unwrap();
        assert_eq!(multiplier, 0.5);
        assert!(decline);
        assert_eq!(u.relation(EmpireId(2), EmpireId(0)).unwrap().trust, 25.0);
        assert!(u.average_war_grade(EmpireId(2)) == 5.0);
        assert!(!u.is_losing_war_with(EmpireId(2), EmpireId(1)));
    }

    #[test]
    fn tradable_techs_respect_restrictions() {
        let mut u = universe();
        let mut ours = TechTree::new([
            TechEntry::new("Lasers", TechnologyType::ShipWeapons, 100.0),
            TechEntry::new("Farming", TechnologyType::Colonization, 50.0),
        ]);
        ours.unlock("Lasers");
        ours.unlock("Farming");
        u.get_mut(EmpireId(1)).unwrap().techs = ours;
        let theirs = u.get_mut(EmpireId(2)).unwrap();
        theirs.techs = TechTree::new([
            TechEntry::new("Lasers", TechnologyType::ShipWeapons, 100.0),
            TechEntry::new("Farming", TechnologyType::Colonization, 50.0),
        ]);
        theirs.data.tech_type_restrictions.push(TechnologyType::Colonization);

        assert_eq!(u.tradable_techs(EmpireId(1), EmpireId(2)), vec!["Lasers".to_string()]);
        assert!(u.tradable_techs(EmpireId(2), EmpireId(1)).is_empty());
    }
}
