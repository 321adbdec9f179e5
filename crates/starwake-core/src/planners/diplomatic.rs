//! Diplomatic planner.
//!
//! Every AI walks its known relationships once per turn and moves postures,
//! sends treaty offers, calls allies and asks for peace. The walk is shared;
//! a [`PersonalityPolicy`] picks the territorial weight and the relations
//! hook that runs it.

use starwake_protocol::{
    dialogue, Attitude, EmpireId, Offer, OfferEffect, PersonalityType, Posture, Proposal, RejectionFlag, TreatyType,
    WarState, WarType,
};
use tracing::debug;

use crate::context::GameContext;
use crate::error::AiError;
use crate::ledger::Relationship;
use crate::offers::{announce, send_proposal};
use crate::planners::military::{call_ally_to_war, make_peace, offer_peace};
use crate::war::War;

/// Turns of standing above 95 trust before an alliance is proposed.
pub const ALLIANCE_TRUST_TURNS: u32 = 100;
pub const MIN_CONTACT_GAP: u32 = 10;
/// Border systems below this importance never cause territorial anger.
pub const BORDER_RANK_THRESHOLD: f32 = 5.0;

type RelationsHook = fn(&mut GameContext<'_>, EmpireId, &PersonalityPolicy) -> Result<(), AiError>;

/// How one personality conducts diplomacy.
#[derive(Clone, Copy)]
pub struct PersonalityPolicy {
    /// Territorialism is divided by this before weighing border conflicts.
    pub territorial_divisor: f32,
    /// Neutral relations turn Friendly on high trust alone.
    pub promote_on_trust: bool,
    /// Hostile relations at peace are reviewed for a return to Neutral.
    pub review_hostile_at_peace: bool,
    relations: RelationsHook,
}

impl PersonalityPolicy {
    pub fn for_personality(personality: PersonalityType) -> Self {
        match personality {
            PersonalityType::Pacifist => Self {
                territorial_divisor: 50.0,
                promote_on_trust: true,
                review_hostile_at_peace: false,
                relations: standard_relations,
            },
            PersonalityType::Honorable | PersonalityType::Cunning => Self {
                territorial_divisor: 10.0,
                promote_on_trust: false,
                review_hostile_at_peace: true,
                relations: standard_relations,
            },
            PersonalityType::Ruthless => Self {
                territorial_divisor: 5.0,
                promote_on_trust: false,
                review_hostile_at_peace: false,
                relations: ruthless_relations,
            },
            PersonalityType::Aggressive => Self {
                territorial_divisor: 10.0,
                promote_on_trust: false,
                review_hostile_at_peace: false,
                relations: aggressive_relations,
            },
            PersonalityType::Xenophobic => Self {
                territorial_divisor: 10.0,
                promote_on_trust: false,
                review_hostile_at_peace: false,
                relations: xenophobic_relations,
            },
        }
    }
}

// =============================================================================
// Planner
// =============================================================================

pub fn run_diplomatic_planner(ctx: &mut GameContext<'_>, us: EmpireId) -> Result<(), AiError> {
    let empire = ctx.universe.get(us)?;
    if empire.is_player || empire.is_faction || empire.defeated {
        return Ok(());
    }
    let policy = PersonalityPolicy::for_personality(empire.personality);
    let weight = empire.traits.territorialism / policy.territorial_divisor;

    assess_territorial_conflicts(ctx, us, weight)?;
    (policy.relations)(ctx, us, &policy)
}

/// Known major empires that are still in the game.
fn known_rivals(ctx: &GameContext<'_>, us: EmpireId) -> Result<Vec<EmpireId>, AiError> {
    let universe = &*ctx.universe;
    Ok(universe
        .get(us)?
        .relations
        .all_relations()
        .filter(|rel| rel.known)
        .filter(|rel| universe.get(rel.them).is_ok_and(|e| !e.is_faction && !e.defeated))
        .map(|rel| rel.them)
        .collect())
}

/// Raises territorial anger toward AI neighbors present around our important
/// border systems.
pub fn assess_territorial_conflicts(ctx: &mut GameContext<'_>, us: EmpireId, weight: f32) -> Result<(), AiError> {
    let weight = weight * 0.1;
    let galaxy = ctx.galaxy;
    let ours = galaxy.current_military_strength(us);

    for border in galaxy.border_systems(us) {
        if border.rank_importance <= BORDER_RANK_THRESHOLD {
            continue;
        }
        for presence in &border.nearby {
            let enemy = presence.empire;
            if enemy == us {
                continue;
            }
            // The player is judged through other channels.
            let skip = ctx.universe.get(enemy).map_or(true, |e| e.is_player || e.is_faction);
            if skip {
                continue;
            }
            let Ok(rel) = ctx.universe.relation_mut(us, enemy) else {
                continue;
            };
            if !rel.known || rel.alliance {
                continue;
            }

            let mut w = weight * (ours + presence.strength_present) / (ours + 1.0);
            if rel.open_borders {
                w *= 0.5;
            }
            if rel.nap_pact {
                w *= 0.5;
            }
            let anger = rel.anger_territorial_conflict;
            let gain = if anger > 0.0 {
                (anger + border.rank_importance * w) / anger
            } else {
                border.rank_importance * w
            };
            rel.add_anger_territorial_conflict(gain);
        }
    }
    Ok(())
}

// =============================================================================
// Offers
// =============================================================================

fn treaty_proposal(us: EmpireId, them: EmpireId, treaty: TreatyType, both_sides: bool) -> Proposal {
    let (key, accept, reject, flag) = match treaty {
        TreatyType::Trade => (
            dialogue::OFFER_TRADE,
            dialogue::TRADE_ACCEPTED,
            dialogue::TRADE_REJECTED,
            RejectionFlag::Trade,
        ),
        TreatyType::Alliance => (
            dialogue::OFFER_ALLIANCE,
            dialogue::ALLIANCE_ACCEPTED,
            dialogue::ALLIANCE_REJECTED,
            RejectionFlag::Alliance,
        ),
        _ => (
            dialogue::OFFER_NAPACT,
            dialogue::NAPACT_ACCEPTED,
            dialogue::NAPACT_REJECTED,
            RejectionFlag::NapPact,
        ),
    };
    Proposal {
        from: us,
        to: them,
        dialogue: Some(key.to_string()),
        our_offer: if both_sides { Offer::treaty(treaty) } else { Offer::new() },
        their_offer: Offer::treaty(treaty)
            .with_dialogues(accept, reject)
            .with_effect(OfferEffect::SetRejectedFlag {
                owner: us,
                toward: them,
                flag,
            }),
        attitude: Attitude::Respectful,
        context: None,
    }
}

fn propose(ctx: &mut GameContext<'_>, proposal: Proposal) -> Result<(), AiError> {
    ctx.universe.relation_mut(proposal.from, proposal.to)?.turns_since_last_contact = 0;
    debug!(empire = %proposal.from, target = %proposal.to, dialogue = ?proposal.dialogue, "diplomatic offer");
    send_proposal(ctx, proposal)?;
    Ok(())
}

fn offer_trade(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    propose(ctx, treaty_proposal(us, them, TreatyType::Trade, true))
}

fn offer_nap_pact(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    propose(ctx, treaty_proposal(us, them, TreatyType::NonAggression, true))
}

fn offer_alliance(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    propose(ctx, treaty_proposal(us, them, TreatyType::Alliance, false))
}

fn wants_trade(rel: &Relationship, trade_trait: f32, second_demand: u32) -> bool {
    rel.turns_known > second_demand
        && !rel.trade
        && !rel.rejected_trade
        && rel.trust - rel.used_trust() > trade_trait
        && rel.turns_since_last_contact > second_demand
}

fn wants_alliance(rel: &Relationship) -> bool {
    rel.turns_above_95 > ALLIANCE_TRUST_TURNS
        && rel.turns_since_last_contact > MIN_CONTACT_GAP
        && !rel.alliance
        && rel.trade
        && rel.nap_pact
        && !rel.rejected_alliance
        && rel.total_anger < 20.0
}

/// Trade sent to AI rivals whenever nothing stands in the way.
fn offer_trade_to_ai(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    if ctx.universe.is_player(them) {
        return Ok(());
    }
    let rel = ctx.universe.relation(us, them)?;
    if rel.rejected_trade || rel.trade || rel.at_war() {
        return Ok(());
    }
    offer_trade(ctx, us, them)
}

// =============================================================================
// Anger Assessment
// =============================================================================

/// Breaks a treaty we hold; the other side pays it back in trust and anger.
fn break_treaty_penalized(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    treaty: TreatyType,
) -> Result<(), AiError> {
    if !ctx.universe.relation(us, them)?.treaty(treaty) {
        return Ok(());
    }
    ctx.universe.break_treaty_with(ctx.notifications, us, them, treaty)?;

    let mods = ctx.universe.get(them)?.modifiers();
    let cost = match treaty {
        TreatyType::NonAggression => mods.trust_cost_nap_pact,
        TreatyType::Trade => mods.trust_cost_trade_pact,
        _ => 0.0,
    };
    if let Ok(victim) = ctx.universe.relation_mut(them, us) {
        victim.penalize(cost, cost * 0.5);
    }
    debug!(empire = %us, target = %them, ?treaty, "broke treaty");
    Ok(())
}

fn territorialism(ctx: &GameContext<'_>, us: EmpireId) -> Result<f32, AiError> {
    Ok(ctx.universe.get(us)?.traits.territorialism)
}

fn assess_anger_pacifist(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    posture: Posture,
    used_trust: f32,
) -> Result<(), AiError> {
    let territorialism = territorialism(ctx, us)?;
    let rel = ctx.universe.relation_mut(us, them)?;
    match posture {
        Posture::Friendly => {
            if rel.total_anger > territorialism * 0.5 {
                rel.posture = Posture::Neutral;
            }
            if rel.trade && rel.trust - used_trust < 0.0 {
                break_treaty_penalized(ctx, us, them, TreatyType::Trade)?;
            }
        }
        Posture::Neutral => {
            if rel.total_anger > territorialism {
                rel.posture = Posture::Hostile;
                break_treaty_penalized(ctx, us, them, TreatyType::NonAggression)?;
            }
        }
        Posture::Hostile => {
            if !rel.at_war() && rel.total_anger < 10.0 && rel.trust > used_trust * 0.5 {
                rel.posture = Posture::Neutral;
            }
        }
    }
    Ok(())
}

fn assess_anger_aggressive(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    posture: Posture,
    used_trust: f32,
) -> Result<(), AiError> {
    let territorialism = territorialism(ctx, us)?;
    let rel = ctx.universe.relation_mut(us, them)?;
    if rel.anger_territorial_conflict > territorialism && !rel.at_war() && !rel.nap_pact && !rel.preparing_for_war {
        rel.prepare_for_war(WarType::BorderConflict);
        debug!(empire = %us, target = %them, "territorial anger turns to war preparation");
    }
    if rel.trade && used_trust > rel.trust {
        break_treaty_penalized(ctx, us, them, TreatyType::Trade)?;
    }
    let rel = ctx.universe.relation(us, them)?;
    if posture == Posture::Hostile && rel.nap_pact && rel.total_anger > territorialism {
        break_treaty_penalized(ctx, us, them, TreatyType::NonAggression)?;
    }
    Ok(())
}

fn assess_diplomatic_anger(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    let territorialism = territorialism(ctx, us)?;
    let rel = ctx.universe.relation(us, them)?;
    if rel.anger_diplomatic_conflict > 50.0 && rel.trade {
        break_treaty_penalized(ctx, us, them, TreatyType::Trade)?;
    }
    let rel = ctx.universe.relation_mut(us, them)?;
    if rel.total_anger > territorialism * 0.5 {
        rel.posture = Posture::Hostile;
    }
    if rel.trust - rel.used_trust() < 0.0 && rel.nap_pact {
        break_treaty_penalized(ctx, us, them, TreatyType::NonAggression)?;
    }
    Ok(())
}

// =============================================================================
// Standard Flow
// =============================================================================

fn standard_relations(ctx: &mut GameContext<'_>, us: EmpireId, policy: &PersonalityPolicy) -> Result<(), AiError> {
    let trade_trait = ctx.universe.get(us)?.traits.trade;
    let first_demand = ctx.settings.first_demand;
    let second_demand = ctx.settings.second_demand;

    for them in known_rivals(ctx, us)? {
        let rel = ctx.universe.relation(us, them)?;
        let used_trust = rel.used_trust();
        match rel.posture {
            Posture::Friendly => {
                if wants_trade(rel, trade_trait, second_demand) {
                    offer_trade(ctx, us, them)?;
                }
                assess_anger_pacifist(ctx, us, them, Posture::Friendly, used_trust)?;
                if wants_alliance(ctx.universe.relation(us, them)?) {
                    offer_alliance(ctx, us, them)?;
                }
            }
            Posture::Neutral => {
                if rel.turns_known == first_demand && !rel.nap_pact {
                    offer_nap_pact(ctx, us, them)?;
                }
                let rel = ctx.universe.relation_mut(us, them)?;
                if rel.turns_known > first_demand && rel.nap_pact {
                    rel.posture = Posture::Friendly;
                }
                assess_anger_pacifist(ctx, us, them, Posture::Neutral, used_trust)?;
                let rel = ctx.universe.relation_mut(us, them)?;
                if policy.promote_on_trust && rel.trust > 50.0 && rel.total_anger < 10.0 {
                    rel.posture = Posture::Friendly;
                }
            }
            Posture::Hostile => {
                if rel.at_war() {
                    hostile_at_war(ctx, us, them)?;
                } else if policy.review_hostile_at_peace {
                    assess_anger_pacifist(ctx, us, them, Posture::Hostile, 100.0)?;
                }
            }
        }
    }
    Ok(())
}

fn hostile_at_war(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    for ally in allies_to_call(ctx, us, them)? {
        call_ally_to_war(ctx, us, ally, them)?;
        if let Ok(rel) = ctx.universe.relation_mut(us, ally) {
            rel.turns_since_last_contact = 0;
        }
        if let Some(war) = ctx.universe.relation_mut(us, them)?.active_war_mut() {
            war.allies_called.push(ally);
        }
    }

    let territorialism = territorialism(ctx, us)?;
    let rel = ctx.universe.relation(us, them)?;
    let Some(war) = rel.active_war() else {
        return Ok(());
    };
    let due = (war.turns_at_war > 0 && war.turns_at_war % 100 == 0) || rel.peace_requested;
    if !due {
        return Ok(());
    }
    let border_anger = rel.anger_from_ships_in_our_borders + rel.anger_territorial_conflict;
    if let Some(key) = peace_dialogue(war, border_anger, territorialism) {
        offer_peace(ctx, us, them, key)?;
    }
    if let Ok(rel) = ctx.universe.relation_mut(us, them) {
        rel.peace_requested = false;
    }
    Ok(())
}

/// Allies that know `enemy`, are not fighting it yet, have not been asked
/// during this war and have not heard from us lately.
fn allies_to_call(ctx: &GameContext<'_>, us: EmpireId, enemy: EmpireId) -> Result<Vec<EmpireId>, AiError> {
    let universe = &*ctx.universe;
    let empire = universe.get(us)?;
    let war = empire.relations.get_relations(enemy)?.active_war();
    Ok(empire
        .relations
        .all_relations()
        .filter(|rel| rel.alliance && rel.them != enemy)
        .filter(|rel| rel.turns_since_last_contact > MIN_CONTACT_GAP)
        .filter(|rel| !war.is_some_and(|w| w.was_ally_called(rel.them)))
        .filter(|rel| {
            universe
                .relation(rel.them, enemy)
                .is_ok_and(|theirs| theirs.known && !theirs.at_war())
        })
        .map(|rel| rel.them)
        .collect())
}

/// Dialogue for a peace offer in `war`, or `None` when no offer is made.
pub fn peace_dialogue(war: &War, border_anger: f32, territorialism: f32) -> Option<&'static str> {
    match war.war_type {
        WarType::BorderConflict => {
            if border_anger > territorialism {
                // Only this relation skips its offer; the rest of the turn still runs.
                return None;
            }
            match war.border_conflict_state() {
                WarState::WinningSlightly => Some(dialogue::OFFERPEACE_FAIR),
                WarState::Dominating => Some(dialogue::OFFERPEACE_WINNINGBC),
                WarState::LosingSlightly | WarState::LosingBadly => Some(dialogue::OFFERPEACE_LOSINGBC),
                WarState::EvenlyMatched => None,
            }
        }
        WarType::ImperialistWar => Some(general_peace_key(war.score_state())),
        WarType::DefensiveWar => Some(general_peace_key(war.border_conflict_state())),
        WarType::GenocidalWar | WarType::SkirmishWar => None,
    }
}

fn general_peace_key(state: WarState) -> &'static str {
    match state {
        WarState::WinningSlightly => dialogue::OFFERPEACE_FAIR,
        WarState::Dominating => dialogue::OFFERPEACE_FAIR_WINNING,
        WarState::EvenlyMatched => dialogue::OFFERPEACE_EVENLY_MATCHED,
        WarState::LosingSlightly | WarState::LosingBadly => dialogue::OFFERPEACE_PLEADING,
    }
}

// =============================================================================
// Personality Hooks
// =============================================================================

fn desires_planets_of(ctx: &GameContext<'_>, us: EmpireId, them: EmpireId) -> bool {
    ctx.galaxy
        .desired_planets(us)
        .iter()
        .take(5)
        .any(|d| d.owner == Some(them))
}

/// Starts preparing for war, keeping whatever war type was planned before.
fn start_preparing(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    let rel = ctx.universe.relation_mut(us, them)?;
    let war_type = rel.preparing_for_war_type;
    rel.prepare_for_war(war_type);
    debug!(empire = %us, target = %them, ?war_type, "preparing for war");
    Ok(())
}

fn ruthless_relations(ctx: &mut GameContext<'_>, us: EmpireId, _: &PersonalityPolicy) -> Result<(), AiError> {
    let first_demand = ctx.settings.first_demand;
    let second_demand = ctx.settings.second_demand;
    let our_strength = ctx.galaxy.current_military_strength(us);
    let wars = war_burden(ctx, us, false, 2.0)?;

    let mut targets = Vec::new();
    for them in known_rivals(ctx, us)? {
        offer_trade_to_ai(ctx, us, them)?;
        let rel = ctx.universe.relation(us, them)?;
        let (posture, used_trust) = (rel.posture, rel.used_trust());
        assess_anger_aggressive(ctx, us, them, posture, used_trust)?;

        let is_player = ctx.universe.is_player(them);
        let rel = ctx.universe.relation_mut(us, them)?;
        rel.posture = Posture::Hostile;
        if rel.at_war() {
            continue;
        }
        if is_player && rel.threat <= -15.0 && !rel.insulted_military && rel.turns_known > first_demand {
            rel.insulted_military = true;
            announce(ctx, us, them, dialogue::INSULT_MILITARY, None);
        }

        let rel = ctx.universe.relation(us, them)?;
        if rel.threat > 0.0 || rel.turns_known <= second_demand || rel.alliance {
            if rel.threat > -45.0 || wars > our_strength {
                continue;
            }
            targets.push(them);
        } else if desires_planets_of(ctx, us, them) {
            targets.push(them);
        }
    }

    if targets.is_empty() || wars > our_strength {
        return Ok(());
    }
    let mut found = false;
    for &target in &targets {
        if ctx.universe.relation(us, target)?.nap_pact {
            continue;
        }
        start_preparing(ctx, us, target)?;
        found = true;
    }
    if !found {
        let center = ctx.galaxy.weighted_center(us);
        let closest = targets.iter().copied().min_by(|a, b| {
            let da = ctx.galaxy.weighted_center(*a).distance(center);
            let db = ctx.galaxy.weighted_center(*b).distance(center);
            da.total_cmp(&db)
        });
        if let Some(target) = closest {
            start_preparing(ctx, us, target)?;
        }
    }
    Ok(())
}

/// Strength of everyone we fight, counted in whole units and scaled.
fn war_burden(ctx: &GameContext<'_>, us: EmpireId, count_preparing: bool, scale: f32) -> Result<f32, AiError> {
    let universe = &*ctx.universe;
    Ok(universe
        .get(us)?
        .relations
        .all_relations()
        .filter(|rel| rel.at_war() || (count_preparing && rel.preparing_for_war))
        .filter(|rel| universe.get(rel.them).is_ok_and(|e| !e.defeated))
        .map(|rel| ctx.galaxy.current_military_strength(rel.them).trunc() * scale)
        .sum())
}

fn aggressive_relations(ctx: &mut GameContext<'_>, us: EmpireId, _: &PersonalityPolicy) -> Result<(), AiError> {
    let first_demand = ctx.settings.first_demand;
    let second_demand = ctx.settings.second_demand;
    let trade_trait = ctx.universe.get(us)?.traits.trade;
    let our_strength = ctx.galaxy.current_military_strength(us);
    let wars = war_burden(ctx, us, true, 1.0)?;

    let mut targets = Vec::new();
    for them in known_rivals(ctx, us)? {
        if ctx.universe.relation(us, them)?.at_war() {
            continue;
        }
        offer_trade_to_ai(ctx, us, them)?;

        let is_player = ctx.universe.is_player(them);
        let rel = ctx.universe.relation_mut(us, them)?;
        let used_trust = rel.used_trust();
        rel.posture = Posture::Neutral;
        if rel.threat <= 0.0 {
            let insult = !rel.insulted_military && rel.turns_known > first_demand;
            if insult {
                rel.insulted_military = true;
            }
            rel.posture = Posture::Hostile;
            if insult && is_player {
                announce(ctx, us, them, dialogue::INSULT_MILITARY, None);
            }
        } else if rel.threat > 25.0 && rel.turns_known > first_demand {
            let compliment = !rel.complimented_military && rel.insulted_military && is_player;
            let key = if rel.turns_known <= second_demand {
                dialogue::COMPLIMENT_MILITARY
            } else {
                dialogue::COMPLIMENT_MILITARY_BETTER
            };
            if compliment {
                rel.complimented_military = true;
            }
            rel.posture = Posture::Friendly;
            if compliment {
                announce(ctx, us, them, key, None);
            }
        }

        let rel = ctx.universe.relation(us, them)?;
        match rel.posture {
            Posture::Friendly => {
                let trade = rel.turns_known > second_demand
                    && rel.trust - used_trust > trade_trait
                    && !rel.rejected_trade
                    && !rel.trade;
                if trade {
                    offer_trade(ctx, us, them)?;
                }
                assess_anger_aggressive(ctx, us, them, Posture::Friendly, used_trust)?;
                if wants_alliance(ctx.universe.relation(us, them)?) {
                    offer_alliance(ctx, us, them)?;
                }
            }
            Posture::Neutral => {
                assess_anger_aggressive(ctx, us, them, Posture::Neutral, used_trust)?;
            }
            Posture::Hostile => {
                if rel.threat < -15.0 && rel.turns_known > second_demand && !rel.alliance {
                    if rel.total_anger >= 75.0 || desires_planets_of(ctx, us, them) {
                        targets.push(them);
                    }
                } else if rel.threat <= -45.0 && rel.total_anger > 20.0 {
                    targets.push(them);
                }
                assess_anger_aggressive(ctx, us, them, Posture::Hostile, used_trust)?;
            }
        }
    }

    if let Some(&target) = targets.first() {
        if wars * 2.0 < our_strength {
            start_preparing(ctx, us, target)?;
        }
    }
    Ok(())
}

fn xenophobic_relations(ctx: &mut GameContext<'_>, us: EmpireId, _: &PersonalityPolicy) -> Result<(), AiError> {
    let first_demand = ctx.settings.first_demand;
    let second_demand = ctx.settings.second_demand;
    let trade_trait = ctx.universe.get(us)?.traits.trade;

    for them in known_rivals(ctx, us)? {
        assess_diplomatic_anger(ctx, us, them)?;
        let rel = ctx.universe.relation(us, them)?;
        match rel.posture {
            Posture::Friendly => {
                if wants_trade(rel, trade_trait, second_demand) {
                    offer_trade(ctx, us, them)?;
                }
            }
            Posture::Neutral => {
                if rel.turns_known >= first_demand
                    && !rel.nap_pact
                    && !rel.rejected_demand_tech
                    && !rel.xeno_demanded_tech
                {
                    demand_tech(ctx, us, them)?;
                }
                let rel = ctx.universe.relation_mut(us, them)?;
                if rel.rejected_demand_tech {
                    rel.posture = Posture::Hostile;
                }
            }
            Posture::Hostile => {}
        }
    }
    Ok(())
}

/// Demands one technology `them` could hand over, under threat.
fn demand_tech(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    let techs = ctx.universe.tradable_techs(them, us);
    if techs.is_empty() {
        return Ok(());
    }
    // The upper slot is slightly wider, so the last tech is favored.
    let roll = ctx.rng.random_between(0.0, techs.len() as f32 + 0.75) as usize;
    let tech = techs[roll.min(techs.len() - 1)].clone();

    let rel = ctx.universe.relation_mut(us, them)?;
    rel.xeno_demanded_tech = true;
    rel.turns_since_last_contact = 0;
    debug!(empire = %us, target = %them, tech = %tech, "demanding technology");

    send_proposal(
        ctx,
        Proposal {
            from: us,
            to: them,
            dialogue: Some(dialogue::XENO_DEMAND_TECH.to_string()),
            our_offer: Offer::new(),
            their_offer: Offer::new()
                .with_technology(tech)
                .with_dialogues(dialogue::XENO_DEMAND_TECH_ACCEPTED, dialogue::XENO_DEMAND_TECH_REJECTED)
                .with_effect(OfferEffect::SetRejectedFlag {
                    owner: us,
                    toward: them,
                    flag: RejectionFlag::DemandTech,
                }),
            attitude: Attitude::Threaten,
            context: None,
        },
    )?;
    Ok(())
}

// =============================================================================
// Third Parties
// =============================================================================

/// How `us` reacts when the player deals with `signed_with`, an empire we
/// are at war with. Attempts that failed are only noticed by our spies and
/// cost half as much.
pub fn respond_to_player_third_party_treaties(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    player: EmpireId,
    signed_with: EmpireId,
    treaty_signed: bool,
) -> Result<(), AiError> {
    if !ctx.universe.is_player(player) {
        return Ok(());
    }
    let empire = ctx.universe.get(us)?;
    let personality = empire.personality;
    let spy_defense = empire.agents as f32;
    let at_war_with_partner = empire.relations.is_at_war_with(signed_with);
    let m = if treaty_signed { 1.0 } else { 0.5 };
    if !treaty_signed && !ctx.rng.roll_dice(spy_defense * 5.0) {
        return Ok(());
    }

    let key = if treaty_signed {
        dialogue::CUTTING_DEALS_WITH_ENEMY
    } else {
        dialogue::TRIED_CUTTING_DEALS_WITH_ENEMY
    };
    ctx.universe.relation_mut(us, player)?.turns_since_last_contact = 0;
    announce(ctx, us, player, key, Some(signed_with));
    debug!(empire = %us, partner = %signed_with, treaty_signed, "player dealt with our enemy");

    match personality {
        PersonalityType::Aggressive => {
            ctx.universe.relation_mut(us, player)?.penalize(75.0 * m, 25.0 * m);
            ctx.universe.break_alliance_with(ctx.notifications, us, player)?;
            request_peace_if_at_war(ctx, us, signed_with, at_war_with_partner)?;
        }
        PersonalityType::Ruthless => {
            ctx.universe.relation_mut(us, player)?.penalize(75.0 * m, 30.0 * m);
            ctx.universe.break_all_treaties_with(ctx.notifications, us, player, false)?;
            request_peace_if_at_war(ctx, us, signed_with, at_war_with_partner)?;
        }
        PersonalityType::Xenophobic => {
            ctx.universe.relation_mut(us, player)?.penalize(150.0 * m, 75.0 * m);
            ctx.universe.break_alliance_with(ctx.notifications, us, player)?;
            ctx.universe
                .relation_mut(us, player)?
                .prepare_for_war(WarType::ImperialistWar);
            request_peace_if_at_war(ctx, us, signed_with, at_war_with_partner)?;
        }
        PersonalityType::Pacifist => {
            ctx.universe.relation_mut(us, player)?.penalize(0.0, 5.0 * m);
            if treaty_signed && at_war_with_partner {
                make_peace(ctx, us, signed_with)?;
            }
        }
        PersonalityType::Cunning => {
            let rel = ctx.universe.relation_mut(us, player)?;
            rel.penalize(50.0 * m, 20.0 * m);
            rel.prepare_for_war(WarType::ImperialistWar);
            if treaty_signed && at_war_with_partner {
                make_peace(ctx, us, signed_with)?;
            }
        }
        PersonalityType::Honorable => {
            ctx.universe.relation_mut(us, player)?.penalize(50.0 * m, 100.0 * m);
            if at_war_with_partner {
                make_peace(ctx, us, signed_with)?;
            }
            announce(ctx, us, player, dialogue::DECLARE_WAR, Some(signed_with));
        }
    }
    Ok(())
}

fn request_peace_if_at_war(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    enemy: EmpireId,
    at_war: bool,
) -> Result<(), AiError> {
    if at_war {
        ctx.universe.relation_mut(us, enemy)?.request_peace_now();
    }
    Ok(())
}
