//! Diplomacy protocol types for treaties, offers and their effects.
//!
//! Offers never hold references into live game state. What should happen
//! once an offer is answered is described by [`OfferEffect`] values that the
//! core applies through a single dispatcher.

use serde::{Deserialize, Serialize};

use crate::{EmpireId, TechUid, WarType};

// =============================================================================
// Treaty Types
// =============================================================================

/// Coarse diplomatic stance of one empire toward another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Posture {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

/// Independently toggleable bilateral agreements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TreatyType {
    /// Non-aggression pact.
    NonAggression,
    Trade,
    OpenBorders,
    Alliance,
    Peace,
}

impl TreatyType {
    pub const ALL: [TreatyType; 5] = [
        TreatyType::NonAggression,
        TreatyType::Trade,
        TreatyType::OpenBorders,
        TreatyType::Alliance,
        TreatyType::Peace,
    ];
}

/// One-shot gates that stop an AI from repeating an offer that was turned down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionFlag {
    Trade,
    Alliance,
    NapPact,
    DemandTech,
}

/// Tone used when one AI presents an offer to another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attitude {
    Pleading,
    #[default]
    Respectful,
    Threaten,
}

// =============================================================================
// Offers
// =============================================================================

/// Deferred side effect of answering an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OfferEffect {
    /// `owner`'s flag toward `toward` becomes `!accepted`.
    SetRejectedFlag {
        owner: EmpireId,
        toward: EmpireId,
        flag: RejectionFlag,
    },
    /// Bilateral trade treaty is signed on acceptance.
    SetTradeTreaty { a: EmpireId, b: EmpireId },
    /// Alliance (with open borders and a non-aggression pact) on acceptance.
    SetAlliance { a: EmpireId, b: EmpireId },
    /// Accepted ends the war; rejected escalates it to an imperialist war.
    SetPeace { a: EmpireId, b: EmpireId },
    /// Accepted makes `ally` declare war on `enemy`; rejected costs
    /// `caller`'s trust in the ally.
    DeclareWarViaCall {
        caller: EmpireId,
        ally: EmpireId,
        enemy: EmpireId,
        war_type: WarType,
    },
}

/// One side of a diplomatic exchange.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub nap_pact: bool,
    pub trade_treaty: bool,
    pub open_borders: bool,
    pub alliance: bool,
    pub peace_treaty: bool,
    pub technologies: Vec<TechUid>,
    /// Dialogue key shown when the counterpart accepts.
    pub accept_dialogue: Option<String>,
    /// Dialogue key shown when the counterpart rejects.
    pub reject_dialogue: Option<String>,
    pub effects: Vec<OfferEffect>,
}

impl Offer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn treaty(treaty: TreatyType) -> Self {
        let mut offer = Self::default();
        match treaty {
            TreatyType::NonAggression => offer.nap_pact = true,
            TreatyType::Trade => offer.trade_treaty = true,
            TreatyType::OpenBorders => offer.open_borders = true,
            TreatyType::Alliance => offer.alliance = true,
            TreatyType::Peace => offer.peace_treaty = true,
        }
        offer
    }

    pub fn with_dialogues(mut self, accept: &str, reject: &str) -> Self {
        self.accept_dialogue = Some(accept.to_string());
        self.reject_dialogue = Some(reject.to_string());
        self
    }

    pub fn with_effect(mut self, effect: OfferEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_technology(mut self, tech: impl Into<TechUid>) -> Self {
        let tech = tech.into();
        if !self.technologies.contains(&tech) {
            self.technologies.push(tech);
        }
        self
    }

    /// Treaties this offer asks to be signed.
    pub fn treaties(&self) -> Vec<TreatyType> {
        let mut out = Vec::new();
        if self.nap_pact {
            out.push(TreatyType::NonAggression);
        }
        if self.trade_treaty {
            out.push(TreatyType::Trade);
        }
        if self.open_borders {
            out.push(TreatyType::OpenBorders);
        }
        if self.alliance {
            out.push(TreatyType::Alliance);
        }
        if self.peace_treaty {
            out.push(TreatyType::Peace);
        }
        out
    }
}

/// A complete exchange routed either to the diplomacy screen or to another AI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub from: EmpireId,
    pub to: EmpireId,
    /// Opening dialogue key; `None` for silent AI-to-AI exchanges.
    pub dialogue: Option<String>,
    /// What the proposer gives.
    pub our_offer: Offer,
    /// What the proposer wants; carries the effects to apply on answer.
    pub their_offer: Offer,
    pub attitude: Attitude,
    /// Third empire the dialogue refers to (the enemy in a call to war).
    pub context: Option<EmpireId>,
}

impl Proposal {
    /// All effects attached to either side of the exchange.
    pub fn effects(&self) -> impl Iterator<Item = &OfferEffect> {
        self.our_offer.effects.iter().chain(self.their_offer.effects.iter())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferResponse {
    Accept,
    Reject,
}

impl OfferResponse {
    pub fn accepted(self) -> bool {
        self == OfferResponse::Accept
    }
}

// =============================================================================
// Dialogue Keys
// =============================================================================

pub mod dialogue {
    pub const OFFER_TRADE: &str = "Offer Trade";
    pub const TRADE_ACCEPTED: &str = "Trade Accepted";
    pub const TRADE_REJECTED: &str = "Trade Rejected";

    pub const OFFER_NAPACT: &str = "Offer NAPact";
    pub const NAPACT_ACCEPTED: &str = "NAPact Accepted";
    pub const NAPACT_REJECTED: &str = "NAPact Rejected";

    pub const OFFER_ALLIANCE: &str = "OFFER_ALLIANCE";
    pub const ALLIANCE_ACCEPTED: &str = "ALLIANCE_ACCEPTED";
    pub const ALLIANCE_REJECTED: &str = "ALLIANCE_REJECTED";

    pub const XENO_DEMAND_TECH: &str = "Xeno Demand Tech";
    pub const XENO_DEMAND_TECH_ACCEPTED: &str = "Xeno Demand Tech Accepted";
    pub const XENO_DEMAND_TECH_REJECTED: &str = "Xeno Demand Tech Rejected";

    pub const INSULT_MILITARY: &str = "Insult Military";
    pub const COMPLIMENT_MILITARY: &str = "Compliment Military";
    pub const COMPLIMENT_MILITARY_BETTER: &str = "Compliment Military Better";

    pub const OFFERPEACE_FAIR: &str = "OFFERPEACE_FAIR";
    pub const OFFERPEACE_FAIR_WINNING: &str = "OFFERPEACE_FAIR_WINNING";
    pub const OFFERPEACE_WINNINGBC: &str = "OFFERPEACE_WINNINGBC";
    pub const OFFERPEACE_LOSINGBC: &str = "OFFERPEACE_LOSINGBC";
    pub const OFFERPEACE_EVENLY_MATCHED: &str = "OFFERPEACE_EVENLY_MATCHED";
    pub const OFFERPEACE_PLEADING: &str = "OFFERPEACE_PLEADING";
    pub const OFFERPEACE_ACCEPTED: &str = "OFFERPEACE_ACCEPTED";
    pub const OFFERPEACE_REJECTED: &str = "OFFERPEACE_REJECTED";

    pub const HELP_US_WAR: &str = "HelpUS_War";
    pub const HELP_US_WAR_YES: &str = "HelpUS_War_Yes";
    pub const HELP_US_WAR_NO: &str = "HelpUS_War_No";
    pub const HELP_US_WAR_NO_BREAK_ALLIANCE: &str = "HelpUS_War_No_BreakAlliance";

    pub const DECLARE_WAR_BC: &str = "Declare War BC";
    pub const DECLARE_WAR_BC_TARSYS: &str = "Declare War BC TarSys";
    pub const DECLARE_WAR_IMPERIALISM: &str = "Declare War Imperialism";
    pub const DECLARE_WAR_IMPERIALISM_BREAK_NA: &str = "Declare War Imperialism Break NA";
    pub const DECLARE_WAR_DEFENSE: &str = "Declare War Defense";
    pub const DECLARE_WAR_DEFENSE_BROKEN_NA: &str = "Declare War Defense BrokenNA";

    pub const CUTTING_DEALS_WITH_ENEMY: &str = "CUTTING_DEALS_WITH_ENEMY";
    pub const TRIED_CUTTING_DEALS_WITH_ENEMY: &str = "TRIED_CUTTING_DEALS_WITH_ENEMY";
    pub const DECLARE_WAR: &str = "DECLAREWAR";

    pub const JOIN_WAR_ALLIED_OK: &str = "JoinWar_Allied_OK";
    pub const JOIN_WAR_ALLIED_DECLINE: &str = "JoinWar_Allied_DECLINE";
    pub const JOIN_WAR_REJECT_TOO_DANGEROUS: &str = "JoinWar_Reject_TooDangerous";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treaty_offer_lists_its_treaty() {
        let offer = Offer::treaty(TreatyType::NonAggression)
            .with_dialogues(dialogue::NAPACT_ACCEPTED, dialogue::NAPACT_REJECTED);
        assert_eq!(offer.treaties(), vec![TreatyType::NonAggression]);
        assert_eq!(offer.accept_dialogue.as_deref(), Some("NAPact Accepted"));
    }

    #[test]
    fn technologies_are_unique() {
        let offer = Offer::new().with_technology("Lasers").with_technology("Lasers");
        assert_eq!(offer.technologies, vec!["Lasers".to_string()]);
    }

    #[test]
    fn effect_serializes_with_tag() {
        let effect = OfferEffect::SetRejectedFlag {
            owner: EmpireId(1),
            toward: EmpireId(2),
            flag: RejectionFlag::NapPact,
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains("\"type\":\"SetRejectedFlag\""));
        let back: OfferEffect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }
}
