//! Default AI-vs-AI offer analysis.

use starwake_protocol::{Attitude, OfferEffect, OfferResponse, Proposal, TreatyType};
use tracing::debug;

use crate::galaxy::Galaxy;
use crate::services::OfferAnalyzer;
use crate::universe::Universe;

/// Trust an empire needs before it agrees to an alliance.
pub const ALLIANCE_TRUST: f32 = 75.0;
/// Strength ratio a threatening demand needs before it is met.
pub const THREAT_COMPLIANCE_RATIO: f32 = 1.5;

/// Answers proposals from the receiving empire's point of view. Every item
/// in the exchange must be acceptable on its own for the whole to pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct AiNegotiator;

impl AiNegotiator {
    fn evaluate(universe: &Universe, galaxy: &dyn Galaxy, proposal: &Proposal) -> Option<bool> {
        let receiver = universe.get(proposal.to).ok()?;
        let rel = receiver.relations.get_relations_or_none(proposal.from)?;
        let mods = receiver.modifiers();
        let spare_trust = rel.trust - rel.used_trust();

        let mut treaties = proposal.our_offer.treaties();
        treaties.extend(proposal.their_offer.treaties());
        treaties.sort();
        treaties.dedup();

        for treaty in treaties {
            let ok = match treaty {
                TreatyType::NonAggression => !rel.at_war() && spare_trust >= mods.trust_cost_nap_pact,
                TreatyType::Trade => !rel.at_war() && spare_trust >= mods.trust_cost_trade_pact,
                TreatyType::OpenBorders | TreatyType::Alliance => {
                    let allied_with_enemies = !universe
                        .they_are_allied_with_our_enemies(proposal.to, proposal.from)
                        .is_empty();
                    rel.trust >= ALLIANCE_TRUST
                        && rel.total_anger < 20.0
                        && !(receiver.is_xenophobic() && allied_with_enemies)
                }
                TreatyType::Peace => {
                    universe.is_losing_war_with(proposal.to, proposal.from)
                        || universe.average_war_grade(proposal.to) <= mods.war_grade_threshold_for_peace
                        || rel.total_anger < 30.0
                }
            };
            if !ok {
                return Some(false);
            }
        }

        // Handing over technology is only done under threat.
        if !proposal.their_offer.technologies.is_empty() {
            let theirs = galaxy.current_military_strength(proposal.from);
            let ours = galaxy.current_military_strength(proposal.to);
            if proposal.attitude != Attitude::Threaten || theirs <= ours * THREAT_COMPLIANCE_RATIO {
                return Some(false);
            }
        }

        for effect in proposal.effects() {
            if let OfferEffect::DeclareWarViaCall { caller, enemy, .. } = effect {
                if !receiver.relations.is_allied_with(*caller) || receiver.relations.is_allied_with(*enemy) {
                    return Some(false);
                }
            }
        }

        Some(true)
    }
}

impl OfferAnalyzer for AiNegotiator {
    fn analyze_offer(&mut self, universe: &Universe, galaxy: &dyn Galaxy, proposal: &Proposal) -> OfferResponse {
        let accepted = Self::evaluate(universe, galaxy, proposal).unwrap_or(false);
        debug!(from = %proposal.from, to = %proposal.to, accepted, "analyzed offer");
        if accepted {
            OfferResponse::Accept
        } else {
            OfferResponse::Reject
        }
    }
}
