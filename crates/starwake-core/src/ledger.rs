//! Directed relationship records and the per-empire ledger holding them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use starwake_protocol::{EmpireId, Posture, RejectionFlag, SystemId, TreatyType, WarType};

use crate::error::AiError;
use crate::personality::PersonalityModifiers;
use crate::settings::AiSettings;
use crate::war::War;

/// Upper bound of every anger accumulator.
pub const MAX_ANGER: f32 = 100.0;
/// Trust ceiling reached by peaceful drift.
pub const MAX_TRUST: f32 = 100.0;
/// Turns a freshly signed peace treaty holds.
pub const PEACE_TURNS: u32 = 100;

/// Trust reserved by a standing treaty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustEntry {
    pub treaty: TreatyType,
    pub trust_cost: f32,
}

/// A temporary fear, such as a fleet massing on our border.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FearEntry {
    pub reason: String,
    pub fear: f32,
    pub turns_remaining: u32,
}

/// Per-relation contribution to the economic risk estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk: f32,
    pub expansion: f32,
    pub border: f32,
    pub known_threat: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestKind {
    AllyFriend,
    DefeatEnemy,
}

/// Federation quest handed to the player; cleared by any war declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationQuest {
    pub kind: QuestKind,
    pub target: EmpireId,
}

/// Our view of one other empire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub them: EmpireId,
    pub known: bool,
    pub posture: Posture,

    pub trust: f32,
    pub total_anger: f32,
    pub anger_territorial_conflict: f32,
    pub anger_diplomatic_conflict: f32,
    pub anger_from_ships_in_our_borders: f32,
    pub anger_military_conflict: f32,
    /// Their strength relative to ours, -100..=100. Negative means they are weaker.
    pub threat: f32,
    pub risk: RiskAssessment,

    pub nap_pact: bool,
    pub trade: bool,
    pub open_borders: bool,
    pub alliance: bool,
    pub peace: bool,
    pub peace_turns_remaining: u32,

    active_war: Option<War>,
    pub preparing_for_war: bool,
    pub preparing_for_war_type: WarType,
    /// Set when an outside event wants a peace offer at the next opportunity.
    pub peace_requested: bool,

    pub turns_known: u32,
    pub turns_since_last_contact: u32,
    pub turns_above_95: u32,

    pub rejected_trade: bool,
    pub rejected_alliance: bool,
    pub rejected_nap_pact: bool,
    pub rejected_demand_tech: bool,
    pub xeno_demanded_tech: bool,
    pub insulted_military: bool,
    pub complimented_military: bool,

    pub fed_quest: Option<FederationQuest>,
    pub contested_system: Option<SystemId>,
    pub trust_entries: Vec<TrustEntry>,
    pub fear_entries: Vec<FearEntry>,
}

impl Relationship {
    pub fn new(them: EmpireId) -> Self {
        Self {
            them,
            known: false,
            posture: Posture::Neutral,
            trust: 0.0,
            total_anger: 0.0,
            anger_territorial_conflict: 0.0,
            anger_diplomatic_conflict: 0.0,
            anger_from_ships_in_our_borders: 0.0,
            anger_military_conflict: 0.0,
            threat: 0.0,
            risk: RiskAssessment::default(),
            nap_pact: false,
            trade: false,
            open_borders: false,
            alliance: false,
            peace: false,
            peace_turns_remaining: 0,
            active_war: None,
            preparing_for_war: false,
            preparing_for_war_type: WarType::default(),
            peace_requested: false,
            turns_known: 0,
            turns_since_last_contact: 0,
            turns_above_95: 0,
            rejected_trade: false,
            rejected_alliance: false,
            rejected_nap_pact: false,
            rejected_demand_tech: false,
            xeno_demanded_tech: false,
            insulted_military: false,
            complimented_military: false,
            fed_quest: None,
            contested_system: None,
            trust_entries: Vec::new(),
            fear_entries: Vec::new(),
        }
    }

    // =========================================================================
    // War State
    // =========================================================================

    /// Derived from the active war so the two can never disagree.
    pub fn at_war(&self) -> bool {
        self.active_war.is_some()
    }

    pub fn active_war(&self) -> Option<&War> {
        self.active_war.as_ref()
    }

    pub fn active_war_mut(&mut self) -> Option<&mut War> {
        self.active_war.as_mut()
    }

    pub fn start_war(&mut self, war: War) {
        self.active_war = Some(war);
        self.posture = Posture::Hostile;
        self.preparing_for_war = false;
        self.peace_requested = false;
    }

    pub fn end_war(&mut self) -> Option<War> {
        self.peace_requested = false;
        self.active_war.take()
    }

    pub fn prepare_for_war(&mut self, war_type: WarType) {
        if self.at_war() {
            return;
        }
        self.preparing_for_war = true;
        self.preparing_for_war_type = war_type;
    }

    /// Losing wars are escalated to imperialist wars when peace is refused.
    pub fn set_imperialist_war(&mut self) {
        if let Some(war) = self.active_war.as_mut() {
            war.war_type = WarType::ImperialistWar;
        }
    }

    pub fn request_peace_now(&mut self) {
        if self.at_war() {
            self.peace_requested = true;
        }
    }

    // =========================================================================
    // Treaties
    // =========================================================================

    pub fn treaty(&self, treaty: TreatyType) -> bool {
        match treaty {
            TreatyType::NonAggression => self.nap_pact,
            TreatyType::Trade => self.trade,
            TreatyType::OpenBorders => self.open_borders,
            TreatyType::Alliance => self.alliance,
            TreatyType::Peace => self.peace,
        }
    }

    /// Sets a treaty flag. NAPact and trade reserve trust while signed.
    pub fn set_treaty(&mut self, modifiers: &PersonalityModifiers, treaty: TreatyType, value: bool) {
        match treaty {
            TreatyType::NonAggression => self.nap_pact = value,
            TreatyType::Trade => self.trade = value,
            TreatyType::OpenBorders => self.open_borders = value,
            TreatyType::Alliance => self.alliance = value,
            TreatyType::Peace => {
                self.peace = value;
                self.peace_turns_remaining = if value { PEACE_TURNS } else { 0 };
            }
        }

        let trust_cost = match treaty {
            TreatyType::NonAggression => modifiers.trust_cost_nap_pact,
            TreatyType::Trade => modifiers.trust_cost_trade_pact,
            _ => return,
        };
        self.trust_entries.retain(|e| e.treaty != treaty);
        if value {
            self.trust_entries.push(TrustEntry { treaty, trust_cost });
        }
    }

    /// Drops every treaty flag along with its trust entries.
    pub fn clear_treaties(&mut self) {
        self.nap_pact = false;
        self.trade = false;
        self.open_borders = false;
        self.alliance = false;
        self.peace = false;
        self.peace_turns_remaining = 0;
        self.trust_entries.clear();
    }

    pub fn used_trust(&self) -> f32 {
        self.trust_entries.iter().map(|e| e.trust_cost).sum()
    }

    pub fn rejected(&self, flag: RejectionFlag) -> bool {
        match flag {
            RejectionFlag::Trade => self.rejected_trade,
            RejectionFlag::Alliance => self.rejected_alliance,
            RejectionFlag::NapPact => self.rejected_nap_pact,
            RejectionFlag::DemandTech => self.rejected_demand_tech,
        }
    }

    pub fn set_rejected(&mut self, flag: RejectionFlag, value: bool) {
        match flag {
            RejectionFlag::Trade => self.rejected_trade = value,
            RejectionFlag::Alliance => self.rejected_alliance = value,
            RejectionFlag::NapPact => self.rejected_nap_pact = value,
            RejectionFlag::DemandTech => self.rejected_demand_tech = value,
        }
    }

    // =========================================================================
    // Trust & Anger
    // =========================================================================

    /// Applies a diplomatic penalty. Negative inputs are ignored, so a
    /// penalty never raises trust or lowers anger.
    pub fn penalize(&mut self, trust_loss: f32, anger_gain: f32) {
        self.trust -= trust_loss.max(0.0);
        self.add_anger_diplomatic_conflict(anger_gain);
    }

    /// Settles posture after trust or anger moved outside the turn: wars keep
    /// us Hostile and a Friendly relation with overdrawn trust cools to Neutral.
    pub fn update_posture(&mut self) {
        if self.at_war() {
            self.posture = Posture::Hostile;
        } else if self.posture == Posture::Friendly && self.trust < self.used_trust() {
            self.posture = Posture::Neutral;
        }
    }

    pub fn add_anger_territorial_conflict(&mut self, amount: f32) {
        self.anger_territorial_conflict = (self.anger_territorial_conflict + amount).clamp(0.0, MAX_ANGER);
        self.recompute_total_anger();
    }

    pub fn add_anger_diplomatic_conflict(&mut self, amount: f32) {
        self.anger_diplomatic_conflict =
            (self.anger_diplomatic_conflict + amount.max(0.0)).clamp(0.0, MAX_ANGER);
        self.recompute_total_anger();
    }

    pub fn add_anger_ships_in_borders(&mut self, amount: f32) {
        self.anger_from_ships_in_our_borders =
            (self.anger_from_ships_in_our_borders + amount).clamp(0.0, MAX_ANGER);
        self.recompute_total_anger();
    }

    pub fn add_anger_military_conflict(&mut self, amount: f32) {
        self.anger_military_conflict = (self.anger_military_conflict + amount).clamp(0.0, MAX_ANGER);
        self.recompute_total_anger();
    }

    fn recompute_total_anger(&mut self) {
        self.total_anger = (self.anger_territorial_conflict
            + self.anger_diplomatic_conflict
            + self.anger_from_ships_in_our_borders
            + self.anger_military_conflict)
            .min(MAX_ANGER);
    }

    pub fn add_fear(&mut self, reason: impl Into<String>, fear: f32, turns: u32) {
        self.fear_entries.push(FearEntry {
            reason: reason.into(),
            fear,
            turns_remaining: turns,
        });
    }

    // =========================================================================
    // Turn Advance
    // =========================================================================

    /// Ages counters, decays anger, drifts trust and recomputes threat and risk.
    pub fn advance_turn(&mut self, settings: &AiSettings, our_strength: f32, their_strength: f32) {
        if self.known {
            self.turns_known += 1;
            self.turns_since_last_contact += 1;
        }
        if self.trust > 95.0 {
            self.turns_above_95 += 1;
        } else {
            self.turns_above_95 = 0;
        }
        if let Some(war) = self.active_war.as_mut() {
            war.turns_at_war += 1;
        }
        if self.peace {
            self.peace_turns_remaining = self.peace_turns_remaining.saturating_sub(1);
            if self.peace_turns_remaining == 0 {
                self.peace = false;
            }
        }

        let decay = &settings.anger_decay;
        self.anger_territorial_conflict = decay_toward_zero(self.anger_territorial_conflict, decay.territorial);
        self.anger_diplomatic_conflict = decay_toward_zero(self.anger_diplomatic_conflict, decay.diplomatic);
        self.anger_from_ships_in_our_borders =
            decay_toward_zero(self.anger_from_ships_in_our_borders, decay.ships_in_borders);
        self.anger_military_conflict = decay_toward_zero(self.anger_military_conflict, decay.military);
        self.recompute_total_anger();

        if self.known && !self.at_war() && self.total_anger < 10.0 && self.trust < MAX_TRUST {
            let treaties = u8::from(self.nap_pact) + u8::from(self.trade);
            let gain = settings.trust_gain_per_turn * (1.0 + f32::from(treaties));
            self.trust = (self.trust + gain).min(MAX_TRUST);
        }

        for fear in &mut self.fear_entries {
            fear.turns_remaining = fear.turns_remaining.saturating_sub(1);
        }
        self.fear_entries.retain(|f| f.turns_remaining > 0);

        self.update_threat(our_strength, their_strength);
    }

    /// Threat and risk from current strengths, without aging anything.
    pub fn update_threat(&mut self, our_strength: f32, their_strength: f32) {
        self.threat = ((their_strength - our_strength) / our_strength.max(1.0) * 100.0).clamp(-100.0, 100.0);
        self.risk = self.assess_risk();
    }

    fn assess_risk(&self) -> RiskAssessment {
        if !self.known || self.alliance {
            return RiskAssessment::default();
        }
        let expansion = self.anger_territorial_conflict / MAX_ANGER;
        let mut border = self.anger_from_ships_in_our_borders / MAX_ANGER;
        if self.preparing_for_war || self.at_war() {
            border += 0.5;
        }
        let mut known_threat = self.threat.max(0.0) / 100.0;
        if self.at_war() {
            known_threat = known_threat.max(0.5);
        }
        RiskAssessment {
            risk: expansion.max(border).max(known_threat),
            expansion,
            border,
            known_threat,
        }
    }
}

fn decay_toward_zero(value: f32, rate: f32) -> f32 {
    if value > 0.0 {
        (value - rate).max(0.0)
    } else {
        (value + rate).min(0.0)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// One empire's relations, keyed by the other empire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLedger {
    owner: EmpireId,
    relations: BTreeMap<EmpireId, Relationship>,
}

impl Default for RelationshipLedger {
    fn default() -> Self {
        Self::new(EmpireId(0))
    }
}

impl RelationshipLedger {
    pub fn new(owner: EmpireId) -> Self {
        Self {
            owner,
            relations: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> EmpireId {
        self.owner
    }

    pub fn get_relations(&self, them: EmpireId) -> Result<&Relationship, AiError> {
        let from = self.owner;
        self.relations
            .get(&them)
            .ok_or(AiError::MissingRelation { from, to: them })
    }

    pub fn get_relations_mut(&mut self, them: EmpireId) -> Result<&mut Relationship, AiError> {
        let from = self.owner;
        self.relations
            .get_mut(&them)
            .ok_or(AiError::MissingRelation { from, to: them })
    }

    pub fn get_relations_or_none(&self, them: EmpireId) -> Option<&Relationship> {
        self.relations.get(&them)
    }

    /// Adds an empty relation unless one exists. Returns the relation.
    pub fn add_relation(&mut self, them: EmpireId) -> &mut Relationship {
        self.relations.entry(them).or_insert_with(|| Relationship::new(them))
    }

    /// Inserts a prepared relation, replacing nothing.
    pub fn insert(&mut self, rel: Relationship) -> bool {
        if self.relations.contains_key(&rel.them) {
            return false;
        }
        self.relations.insert(rel.them, rel);
        true
    }

    pub fn all_relations(&self) -> impl Iterator<Item = &Relationship> {
        self.relations.values()
    }

    pub fn all_relations_mut(&mut self) -> impl Iterator<Item = &mut Relationship> {
        self.relations.values_mut()
    }

    /// Ids of every empire we hold a relation with, in id order.
    pub fn others(&self) -> Vec<EmpireId> {
        self.relations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn is_known(&self, them: EmpireId) -> bool {
        self.relations.get(&them).is_some_and(|r| r.known)
    }

    pub fn is_at_war_with(&self, them: EmpireId) -> bool {
        self.relations.get(&them).is_some_and(Relationship::at_war)
    }

    pub fn is_allied_with(&self, them: EmpireId) -> bool {
        self.relations.get(&them).is_some_and(|r| r.alliance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starwake_protocol::PersonalityType;

    fn honorable() -> PersonalityModifiers {
        PersonalityModifiers::for_personality(PersonalityType::Honorable)
    }

    #[test]
    fn treaties_reserve_trust() {
        let mut rel = Relationship::new(EmpireId(1));
        let mods = honorable();
        rel.set_treaty(&mods, TreatyType::NonAggression, true);
        rel.set_treaty(&mods, TreatyType::Trade, true);
        rel.set_treaty(&mods, TreatyType::Trade, true);
        assert_eq!(rel.trust_entries.len(), 2);
        assert_eq!(rel.used_trust(), mods.trust_cost_nap_pact + mods.trust_cost_trade_pact);

        rel.set_treaty(&mods, TreatyType::Trade, false);
        assert_eq!(rel.used_trust(), mods.trust_cost_nap_pact);
        rel.set_treaty(&mods, TreatyType::OpenBorders, true);
        assert_eq!(rel.trust_entries.len(), 1);
    }

    #[test]
    fn at_war_follows_active_war() {
        let mut rel = Relationship::new(EmpireId(1));
        rel.prepare_for_war(WarType::ImperialistWar);
        assert!(rel.preparing_for_war);
        rel.start_war(War::new(EmpireId(0), EmpireId(1), WarType::ImperialistWar, 0.0));
        assert!(rel.at_war());
        assert!(!rel.preparing_for_war);
        assert_eq!(rel.posture, Posture::Hostile);
        rel.set_imperialist_war();
        assert!(rel.end_war().is_some());
        assert!(!rel.at_war());
        assert!(rel.active_war().is_none());
    }

    #[test]
    fn penalize_ignores_negative_amounts() {
        let mut rel = Relationship::new(EmpireId(1));
        rel.trust = 20.0;
        rel.penalize(-10.0, -5.0);
        assert_eq!(rel.trust, 20.0);
        assert_eq!(rel.anger_diplomatic_conflict, 0.0);
        rel.penalize(30.0, 15.0);
        assert_eq!(rel.trust, -10.0);
        assert_eq!(rel.anger_diplomatic_conflict, 15.0);
        assert_eq!(rel.total_anger, 15.0);
    }

    #[test]
    fn posture_follows_overdrawn_trust_and_war() {
        let mut rel = Relationship::new(EmpireId(1));
        rel.set_treaty(&honorable(), TreatyType::Trade, true);
        rel.posture = Posture::Friendly;
        rel.trust = rel.used_trust();
        rel.update_posture();
        assert_eq!(rel.posture, Posture::Friendly);

        rel.penalize(1.0, 0.0);
        rel.update_posture();
        assert_eq!(rel.posture, Posture::Neutral);

        rel.start_war(War::new(EmpireId(0), EmpireId(1), WarType::BorderConflict, 0.0));
        rel.posture = Posture::Neutral;
        rel.update_posture();
        assert_eq!(rel.posture, Posture::Hostile);
    }

    #[test]
    fn advance_turn_ages_and_decays() {
        let settings = AiSettings::default();
        let mut rel = Relationship::new(EmpireId(1));
        rel.known = true;
        rel.trust = 96.0;
        rel.add_anger_diplomatic_conflict(1.0);
        rel.add_anger_ships_in_borders(0.2);
        rel.add_fear("fleet", 5.0, 1);

        rel.advance_turn(&settings, 100.0, 50.0);
        assert_eq!(rel.turns_known, 1);
        assert_eq!(rel.turns_since_last_contact, 1);
        assert_eq!(rel.turns_above_95, 1);
        assert_eq!(rel.anger_from_ships_in_our_borders, 0.0);
        assert!(rel.anger_diplomatic_conflict < 1.0);
        assert!(rel.fear_entries.is_empty());
        assert_eq!(rel.threat, -50.0);
        assert!(rel.trust > 96.0);
    }

    #[test]
    fn threat_and_risk_from_strength() {
        let mut rel = Relationship::new(EmpireId(1));
        rel.known = true;
        rel.update_threat(0.0, 1000.0);
        assert_eq!(rel.threat, 100.0);
        assert_eq!(rel.risk.known_threat, 1.0);
        assert_eq!(rel.risk.risk, 1.0);

        rel.alliance = true;
        rel.update_threat(0.0, 1000.0);
        assert_eq!(rel.risk, RiskAssessment::default());
    }

    #[test]
    fn ledger_lookup() {
        let mut ledger = RelationshipLedger::new(EmpireId(0));
        ledger.add_relation(EmpireId(2)).known = true;
        ledger.add_relation(EmpireId(2));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_known(EmpireId(2)));
        assert!(ledger.get_relations(EmpireId(3)).is_err());
        assert!(matches!(
            ledger.get_relations_mut(EmpireId(3)),
            Err(AiError::MissingRelation { to: EmpireId(3), .. })
        ));
        assert!(!ledger.insert(Relationship::new(EmpireId(2))));
    }
}
