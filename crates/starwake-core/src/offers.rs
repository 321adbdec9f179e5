//! Routing of proposals and the single dispatcher for offer effects.

use starwake_protocol::{Attitude, EmpireId, Offer, OfferEffect, OfferResponse, Proposal, TreatyType};
use tracing::debug;

use crate::context::GameContext;
use crate::error::AiError;
use crate::planners::{diplomatic, military};

/// Shows the player a dialogue that carries no offer.
pub fn announce(ctx: &mut GameContext<'_>, from: EmpireId, to: EmpireId, key: &str, context: Option<EmpireId>) {
    if !ctx.universe.is_player(to) {
        return;
    }
    ctx.screen.show(&Proposal {
        from,
        to,
        dialogue: Some(key.to_string()),
        our_offer: Offer::new(),
        their_offer: Offer::new(),
        attitude: Attitude::Respectful,
        context,
    });
}

/// Sends a proposal to its recipient.
///
/// The player sees it on the diplomacy screen and answers later through
/// [`resolve_proposal`]; `None` is returned. AI recipients answer at once and
/// the answer is applied before returning.
pub fn send_proposal(ctx: &mut GameContext<'_>, proposal: Proposal) -> Result<Option<OfferResponse>, AiError> {
    if ctx.universe.is_player(proposal.to) {
        debug!(from = %proposal.from, dialogue = ?proposal.dialogue, "proposal shown to player");
        ctx.screen.show(&proposal);
        return Ok(None);
    }
    let response = ctx.negotiator.analyze_offer(ctx.universe, ctx.galaxy, &proposal);
    resolve_proposal(ctx, &proposal, response)?;
    Ok(Some(response))
}

/// Applies an answer: treaties and technologies change hands on acceptance,
/// then every attached effect runs with the outcome.
pub fn resolve_proposal(
    ctx: &mut GameContext<'_>,
    proposal: &Proposal,
    response: OfferResponse,
) -> Result<(), AiError> {
    let accepted = response.accepted();
    let mut treaties = proposal.our_offer.treaties();
    treaties.extend(proposal.their_offer.treaties());
    treaties.sort();
    treaties.dedup();

    if accepted {
        for &treaty in &treaties {
            sign_from_offer(ctx, proposal.from, proposal.to, treaty)?;
        }

        for tech in &proposal.our_offer.technologies {
            ctx.universe.get_mut(proposal.to)?.unlock_tech(tech);
        }
        for tech in &proposal.their_offer.technologies {
            ctx.universe.get_mut(proposal.from)?.unlock_tech(tech);
        }
    }

    for effect in proposal.effects() {
        apply_offer_effect(ctx, effect, accepted)?;
    }

    if treaties.iter().any(|t| *t != TreatyType::Peace) {
        warn_enemies_of_partner(ctx, proposal, accepted)?;
    }
    Ok(())
}

/// Empires at war with the player's treaty partner react to the deal, or to
/// the attempt when the partner turned the player down.
fn warn_enemies_of_partner(ctx: &mut GameContext<'_>, proposal: &Proposal, accepted: bool) -> Result<(), AiError> {
    let (player, partner) = if ctx.universe.is_player(proposal.from) {
        (proposal.from, proposal.to)
    } else if ctx.universe.is_player(proposal.to) && accepted {
        (proposal.to, proposal.from)
    } else {
        return Ok(());
    };

    for id in ctx.universe.ids() {
        if id == player || id == partner {
            continue;
        }
        let empire = ctx.universe.get(id)?;
        if empire.is_faction
            || empire.defeated
            || !empire.relations.is_at_war_with(partner)
            || !empire.relations.is_known(player)
        {
            continue;
        }
        diplomatic::respond_to_player_third_party_treaties(ctx, id, player, partner, accepted)?;
    }
    Ok(())
}

fn sign_from_offer(ctx: &mut GameContext<'_>, a: EmpireId, b: EmpireId, treaty: TreatyType) -> Result<(), AiError> {
    match treaty {
        TreatyType::Alliance => ctx.universe.sign_alliance_with(a, b),
        TreatyType::Peace => military::make_peace(ctx, a, b),
        _ => ctx.universe.sign_treaty_with(a, b, treaty),
    }
}

pub fn apply_offer_effect(ctx: &mut GameContext<'_>, effect: &OfferEffect, accepted: bool) -> Result<(), AiError> {
    match *effect {
        OfferEffect::SetRejectedFlag { owner, toward, flag } => {
            ctx.universe.relation_mut(owner, toward)?.set_rejected(flag, !accepted);
        }
        OfferEffect::SetTradeTreaty { a, b } => {
            if accepted {
                ctx.universe.sign_treaty_with(a, b, TreatyType::Trade)?;
            }
        }
        OfferEffect::SetAlliance { a, b } => {
            if accepted {
                ctx.universe.sign_alliance_with(a, b)?;
            }
        }
        OfferEffect::SetPeace { a, b } => {
            if accepted {
                military::make_peace(ctx, a, b)?;
            } else {
                ctx.universe.relation_mut(a, b)?.set_imperialist_war();
            }
        }
        OfferEffect::DeclareWarViaCall {
            caller,
            ally,
            enemy,
            war_type,
        } => {
            if accepted {
                military::declare_war_on_via_call(ctx, ally, enemy, war_type)?;
            } else {
                let honorable = ctx.universe.get(caller)?.is_honorable();
                let penalty = if honorable { 60.0 } else { 30.0 };
                ctx.universe.relation_mut(caller, ally)?.penalize(penalty, penalty);
                if honorable {
                    ctx.universe.break_alliance_with(ctx.notifications, caller, ally)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Sandbox;
    use crate::empire::Empire;
    use crate::galaxy::StaticGalaxy;
    use crate::services::OfferAnalyzer;
    use crate::settings::AiSettings;
    use crate::universe::Universe;
    use crate::war::War;
    use starwake_protocol::{dialogue, Attitude, Offer, PersonalityType, RejectionFlag, WarType};

    struct Always(OfferResponse);

    impl OfferAnalyzer for Always {
        fn analyze_offer(&mut self, _: &Universe, _: &dyn crate::galaxy::Galaxy, _: &Proposal) -> OfferResponse {
            self.0
        }
    }

    fn sandbox(response: OfferResponse) -> Sandbox {
        let universe = Universe::new(vec![
            Empire::new(EmpireId(0), "Terran", PersonalityType::Honorable).player(),
            Empire::new(EmpireId(1), "Vesh", PersonalityType::Honorable),
            Empire::new(EmpireId(2), "Kulrathi", PersonalityType::Aggressive),
        ]);
        Sandbox::new(universe, StaticGalaxy::default(), AiSettings::default(), 1)
            .with_negotiator(Box::new(Always(response)))
    }

    fn nap_proposal(from: u8, to: u8) -> Proposal {
        let effect = OfferEffect::SetRejectedFlag {
            owner: EmpireId(from),
            toward: EmpireId(to),
            flag: RejectionFlag::NapPact,
        };
        Proposal {
            from: EmpireId(from),
            to: EmpireId(to),
            dialogue: Some(dialogue::OFFER_NAPACT.to_string()),
            our_offer: Offer::treaty(TreatyType::NonAggression),
            their_offer: Offer::treaty(TreatyType::NonAggression)
                .with_dialogues(dialogue::NAPACT_ACCEPTED, dialogue::NAPACT_REJECTED)
                .with_effect(effect),
            attitude: Attitude::Respectful,
            context: None,
        }
    }

    #[test]
    fn player_proposals_go_to_the_screen() {
        let mut sb = sandbox(OfferResponse::Accept);
        let response = send_proposal(&mut sb.context(), nap_proposal(1, 0)).unwrap();
        assert!(response.is_none());
        assert_eq!(sb.screen.shown.len(), 1);
        assert!(!sb.universe.relation(EmpireId(1), EmpireId(0)).unwrap().nap_pact);
    }

    #[test]
    fn accepted_nap_pact_is_signed_both_ways() {
        let mut sb = sandbox(OfferResponse::Accept);
        let response = send_proposal(&mut sb.context(), nap_proposal(1, 2)).unwrap();
        assert_eq!(response, Some(OfferResponse::Accept));
        assert!(sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap().nap_pact);
        assert!(sb.universe.relation(EmpireId(2), EmpireId(1)).unwrap().nap_pact);
        assert!(!sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap().rejected_nap_pact);
    }

    #[test]
    fn rejection_sets_the_flag() {
        let mut sb = sandbox(OfferResponse::Reject);
        send_proposal(&mut sb.context(), nap_proposal(1, 2)).unwrap();
        let rel = sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap();
        assert!(rel.rejected_nap_pact);
        assert!(!rel.nap_pact);
    }

    #[test]
    fn refused_call_to_war_costs_an_honorable_alliance() {
        let mut sb = sandbox(OfferResponse::Reject);
        sb.universe.sign_alliance_with(EmpireId(1), EmpireId(2)).unwrap();
        sb.universe.relation_mut(EmpireId(1), EmpireId(2)).unwrap().trust = 80.0;
        let effect = OfferEffect::DeclareWarViaCall {
            caller: EmpireId(1),
            ally: EmpireId(2),
            enemy: EmpireId(0),
            war_type: WarType::ImperialistWar,
        };
        apply_offer_effect(&mut sb.context(), &effect, false).unwrap();

        let rel = sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap();
        assert_eq!(rel.trust, 20.0);
        assert_eq!(rel.anger_diplomatic_conflict, 60.0);
        assert!(!rel.alliance && !rel.nap_pact && !rel.open_borders);
    }

    #[test]
    fn rejected_peace_escalates() {
        let mut sb = sandbox(OfferResponse::Reject);
        sb.universe
            .relation_mut(EmpireId(1), EmpireId(2))
            .unwrap()
            .start_war(War::new(EmpireId(1), EmpireId(2), WarType::BorderConflict, 0.0));
        let effect = OfferEffect::SetPeace {
            a: EmpireId(1),
            b: EmpireId(2),
        };
        apply_offer_effect(&mut sb.context(), &effect, false).unwrap();
        let rel = sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap();
        assert_eq!(rel.active_war().map(|w| w.war_type), Some(WarType::ImperialistWar));

        apply_offer_effect(&mut sb.context(), &effect, true).unwrap();
        let rel = sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap();
        assert!(!rel.at_war());
        assert!(rel.peace);
    }
}
