//! War planner.
//!
//! A relationship moves from preparation to war once one of our claims on
//! their planets is established. While preparing, DefendClaim tasks are
//! raised over the most valuable enemy planets; at war, assault tasks follow.
//! Everything that starts or ends a war lives here as well.

use std::collections::BTreeSet;

use starwake_protocol::{
    dialogue, Attitude, EmpireId, MilitaryTask, Notification, Offer, OfferEffect, OfferResponse, PersonalityType,
    PlanetId, Position, Posture, Proposal, TaskType, TreatyType, WarType,
};
use tracing::{debug, info};

use crate::context::GameContext;
use crate::error::AiError;
use crate::galaxy::{Galaxy, Planet};
use crate::offers::{announce, resolve_proposal, send_proposal};
use crate::universe::Universe;
use crate::war::War;

/// Distance that weighs as much as one point of system importance when
/// ordering enemy planets.
pub const TARGET_DISTANCE_SCALE: f32 = 150_000.0;

/// Trust lost by every other empire when the player breaks a
/// non-aggression pact by declaring war.
pub const BROKEN_NAP_TRUST_PENALTY: f32 = 50.0;
pub const BROKEN_NAP_WITNESS_ANGER: f32 = 20.0;
pub const BROKEN_NAP_VICTIM_ANGER: f32 = 50.0;

// =============================================================================
// Planner
// =============================================================================

pub fn run_war_planner(ctx: &mut GameContext<'_>, us: EmpireId) -> Result<(), AiError> {
    let empire = ctx.universe.get(us)?;
    if empire.is_player || empire.is_faction || empire.defeated {
        return Ok(());
    }
    let mut war_weight = 1.0 + empire.strategy.expansion_priority + empire.strategy.military_priority;
    let task_cap = (war_weight + 1.0).floor().max(0.0) as usize;
    let mut created = 0usize;

    for them in by_anger(ctx, us)? {
        if war_weight <= 0.0 {
            break;
        }
        if ctx.universe.get(them)?.is_faction {
            if ctx.universe.relation_mut(us, them)?.end_war().is_some() {
                debug!(empire = %us, faction = %them, "dropped war against faction");
            }
            continue;
        }
        war_weight -= 1.0;

        let rel = ctx.universe.relation(us, them)?;
        // A war declared below is fought from the next call on, so its
        // assaults stay inside this call's task cap.
        let was_at_war = rel.at_war();
        if rel.preparing_for_war {
            let war_type = rel.preparing_for_war_type;
            match war_type {
                WarType::BorderConflict | WarType::ImperialistWar => {
                    let targets = war_targets(ctx.galaxy, us, them, war_weight);
                    let mut new_tasks = claim_then_assault(ctx.tasks.tasks(us), us, &targets);
                    new_tasks.truncate(task_cap.saturating_sub(created));
                    created += new_tasks.len();
                    if !new_tasks.is_empty() {
                        debug!(empire = %us, target = %them, tasks = new_tasks.len(), "preparing for war");
                    }
                    for task in new_tasks {
                        ctx.tasks.add(task);
                    }

                    let claimed = targets.iter().any(|(planet, _)| {
                        ctx.tasks
                            .tasks(us)
                            .iter()
                            .any(|t| t.target_planet == Some(*planet) && t.claim_established())
                    });
                    if claimed {
                        declare_war_on(ctx, us, them, war_type)?;
                    }
                }
                WarType::DefensiveWar | WarType::GenocidalWar | WarType::SkirmishWar => {}
            }
        }

        if was_at_war && ctx.universe.relation(us, them)?.at_war() {
            fight_default_war(ctx, us, them)?;
        }
    }
    Ok(())
}

/// Others ordered by how much their anger matters right now: closer and at
/// war first.
fn by_anger(ctx: &GameContext<'_>, us: EmpireId) -> Result<Vec<EmpireId>, AiError> {
    let galaxy = ctx.galaxy;
    let center = galaxy.weighted_center(us);
    let size = galaxy.universe_size();
    let width = galaxy.universe_width().max(1.0);

    let mut scored: Vec<(EmpireId, f32)> = ctx
        .universe
        .get(us)?
        .relations
        .all_relations()
        .map(|rel| {
            let distance = galaxy.weighted_center(rel.them).distance(center);
            let mut modifier = (size - distance) / width;
            if rel.at_war() {
                modifier *= 100.0;
            }
            (rel.them, rel.total_anger * modifier)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scored.into_iter().map(|(id, _)| id).collect())
}

/// Enemy planets ordered by distance and importance, taken until more
/// distinct systems than `war_weight` are covered.
pub fn war_targets(galaxy: &dyn Galaxy, us: EmpireId, them: EmpireId, war_weight: f32) -> Vec<(PlanetId, Position)> {
    let center = galaxy.weighted_center(us);
    let value = |p: &Planet| center.distance(p.center) / TARGET_DISTANCE_SCALE + galaxy.system_rank_importance(them, p.system);

    let mut planets = galaxy.planets_of(them);
    planets.sort_by(|a, b| value(*a).total_cmp(&value(*b)));

    let mut systems = BTreeSet::new();
    let mut targets = Vec::new();
    for planet in planets {
        if systems.len() as f32 > war_weight {
            break;
        }
        systems.insert(planet.system);
        targets.push((planet.id, planet.center));
    }
    targets
}

/// New tasks for each target: an assault once our claim is established,
/// a claim when none exists yet.
fn claim_then_assault(existing: &[MilitaryTask], us: EmpireId, targets: &[(PlanetId, Position)]) -> Vec<MilitaryTask> {
    let mut out = Vec::new();
    for &(planet, center) in targets {
        let assault = existing.iter().any(|t| t.targets(planet, TaskType::AssaultPlanet));
        let mut claims = existing.iter().filter(|t| t.targets(planet, TaskType::DefendClaim)).peekable();
        let claim = claims.peek().is_some();
        let established = claims.any(MilitaryTask::claim_established);

        if !assault && established {
            out.push(MilitaryTask::assault_planet(us, planet, center));
        }
        if !claim {
            out.push(MilitaryTask::defend_claim(us, planet, center));
        }
    }
    out
}

/// Adds offensive tasks against an enemy we are at war with, limited by how
/// many assaults are already running.
pub fn fight_default_war(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    let empire = ctx.universe.get(us)?;
    let assaults = ctx
        .tasks
        .tasks(us)
        .iter()
        .filter(|t| t.task_type == TaskType::AssaultPlanet)
        .count();
    let war_weight =
        1.0 + empire.strategy.expansion_priority + empire.strategy.military_priority - assaults as f32;
    if war_weight < 0.0 {
        return Ok(());
    }
    let Some(war_type) = ctx.universe.relation(us, them)?.active_war().map(|w| w.war_type) else {
        return Ok(());
    };

    let new_tasks: Vec<MilitaryTask> = match war_type {
        WarType::BorderConflict => war_targets(ctx.galaxy, us, them, war_weight)
            .into_iter()
            .filter(|(planet, _)| {
                !ctx.tasks
                    .tasks(us)
                    .iter()
                    .any(|t| t.targets(*planet, TaskType::AssaultPlanet))
            })
            .map(|(planet, center)| MilitaryTask::assault_planet(us, planet, center))
            .collect(),
        WarType::ImperialistWar => {
            let targets = war_targets(ctx.galaxy, us, them, war_weight);
            claim_then_assault(ctx.tasks.tasks(us), us, &targets)
        }
        WarType::DefensiveWar | WarType::GenocidalWar | WarType::SkirmishWar => Vec::new(),
    };
    for task in new_tasks {
        ctx.tasks.add(task);
    }
    Ok(())
}

// =============================================================================
// Declarations
// =============================================================================

/// Formal declaration of war. Does nothing against factions, defeated
/// empires or an enemy we are already fighting.
pub fn declare_war_on(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId, war_type: WarType) -> Result<(), AiError> {
    declare(ctx, us, them, war_type, false)
}

/// Declaration made on behalf of an ally that called us in.
pub fn declare_war_on_via_call(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    war_type: WarType,
) -> Result<(), AiError> {
    declare(ctx, us, them, war_type, true)
}

fn declare(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId, war_type: WarType, via_call: bool) -> Result<(), AiError> {
    let rel = ctx.universe.relation_mut(us, them)?;
    rel.preparing_for_war = false;
    if rel.at_war() {
        return Ok(());
    }
    let (ours, theirs) = (ctx.universe.get(us)?, ctx.universe.get(them)?);
    if ours.is_faction || ours.defeated || theirs.is_faction || theirs.defeated {
        return Ok(());
    }
    let player_declares = ours.is_player;
    let player_attacked = theirs.is_player;

    let rel = ctx.universe.relation_mut(us, them)?;
    rel.fed_quest = None;
    if player_declares && rel.nap_pact {
        ctx.universe
            .break_treaty_with(ctx.notifications, us, them, TreatyType::NonAggression)?;
        if !via_call {
            for other in ctx.universe.ids() {
                if other == us || other == them {
                    continue;
                }
                if let Ok(witness) = ctx.universe.relation_mut(other, us) {
                    witness.penalize(BROKEN_NAP_TRUST_PENALTY, BROKEN_NAP_WITNESS_ANGER);
                    witness.update_posture();
                }
            }
        }
        let victim = ctx.universe.relation_mut(them, us)?;
        victim.penalize(BROKEN_NAP_TRUST_PENALTY, BROKEN_NAP_VICTIM_ANGER);
        victim.update_posture();
    }

    if player_attacked {
        let rel = ctx.universe.relation_mut(us, them)?;
        let key = match war_type {
            WarType::BorderConflict if rel.contested_system.is_some() => Some(dialogue::DECLARE_WAR_BC_TARSYS),
            WarType::BorderConflict => Some(dialogue::DECLARE_WAR_BC),
            WarType::ImperialistWar if rel.nap_pact => Some(dialogue::DECLARE_WAR_IMPERIALISM_BREAK_NA),
            WarType::ImperialistWar => Some(dialogue::DECLARE_WAR_IMPERIALISM),
            WarType::DefensiveWar if rel.nap_pact => {
                rel.penalize(50.0, 50.0);
                Some(dialogue::DECLARE_WAR_DEFENSE_BROKEN_NA)
            }
            WarType::DefensiveWar => {
                rel.penalize(25.0, 25.0);
                Some(dialogue::DECLARE_WAR_DEFENSE)
            }
            WarType::GenocidalWar | WarType::SkirmishWar => None,
        };
        if let Some(key) = key {
            announce(ctx, us, them, key, None);
        }
    }

    if player_should_hear_of_war(ctx.universe, us, them) {
        ctx.notifications.notify(Notification::WarDeclared {
            aggressor: us,
            defender: them,
        });
    }

    let contested = contested_systems(ctx.galaxy, us, them);
    let rel = ctx.universe.relation_mut(us, them)?;
    rel.start_war(War::new(us, them, war_type, ctx.star_date).with_contested_systems(contested));
    rel.trust = rel.trust.min(0.0);
    rel.clear_treaties();
    info!(aggressor = %us, defender = %them, ?war_type, via_call, "war declared");

    get_war_declared_on_us(ctx, them, us, war_type)
}

fn player_should_hear_of_war(universe: &Universe, aggressor: EmpireId, defender: EmpireId) -> bool {
    let Some(player) = universe.player() else {
        return false;
    };
    player.id == aggressor
        || player.id == defender
        || (player.relations.is_known(aggressor) && player.relations.is_known(defender))
}

/// War started by a scripted event; skips every diplomatic consequence.
pub fn declare_war_from_event(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    war_type: WarType,
) -> Result<(), AiError> {
    let contested = contested_systems(ctx.galaxy, us, them);
    let rel = ctx.universe.relation_mut(us, them)?;
    rel.start_war(War::new(us, them, war_type, ctx.star_date).with_contested_systems(contested));
    rel.trust = rel.trust.min(0.0);
    rel.clear_treaties();
    get_war_declared_on_us(ctx, them, us, war_type)
}

/// The victim's side of a declaration. Pacifists re-frame the war as
/// defensive, or as a border conflict when systems are contested.
pub fn get_war_declared_on_us(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    declarant: EmpireId,
    war_type: WarType,
) -> Result<(), AiError> {
    let empire = ctx.universe.get(us)?;
    let pacifist_ai = !empire.is_player && empire.is_pacifist();
    let contested = contested_systems(ctx.galaxy, us, declarant);

    let mut war = War::new(us, declarant, war_type, ctx.star_date).with_contested_systems(contested);
    if pacifist_ai {
        war.war_type = if contested == 0 {
            WarType::DefensiveWar
        } else {
            WarType::BorderConflict
        };
    }

    let rel = ctx.universe.relation_mut(us, declarant)?;
    rel.fed_quest = None;
    rel.start_war(war);
    rel.trust = rel.trust.min(0.0);
    rel.clear_treaties();
    Ok(())
}

/// Systems where both empires own planets.
pub fn contested_systems(galaxy: &dyn Galaxy, a: EmpireId, b: EmpireId) -> u32 {
    let ours: BTreeSet<_> = galaxy.planets_of(a).iter().map(|p| p.system).collect();
    let shared: BTreeSet<_> = galaxy
        .planets_of(b)
        .iter()
        .map(|p| p.system)
        .filter(|s| ours.contains(s))
        .collect();
    shared.len() as u32
}

// =============================================================================
// Ending Wars
// =============================================================================

/// Ends the war on both sides without a treaty and stands down the
/// tasks aimed at each other.
pub fn end_war_from_event(ctx: &mut GameContext<'_>, us: EmpireId, them: EmpireId) -> Result<(), AiError> {
    ctx.universe.relation_mut(us, them)?.end_war();
    if let Ok(rel) = ctx.universe.relation_mut(them, us) {
        rel.end_war();
    }
    drop_tasks_against(ctx, us, them);
    drop_tasks_against(ctx, them, us);
    Ok(())
}

/// Signs peace between two empires. Calling it again while the peace holds
/// changes nothing.
pub fn make_peace(ctx: &mut GameContext<'_>, a: EmpireId, b: EmpireId) -> Result<(), AiError> {
    let rel = ctx.universe.relation(a, b)?;
    let at_war = rel.at_war() || ctx.universe.get(b)?.relations.is_at_war_with(a);
    if rel.peace && !at_war {
        return Ok(());
    }

    for (x, y) in [(a, b), (b, a)] {
        if let Ok(rel) = ctx.universe.relation_mut(x, y) {
            rel.end_war();
            rel.preparing_for_war = false;
            rel.posture = Posture::Neutral;
        }
    }
    ctx.universe.sign_treaty_with(a, b, TreatyType::Peace)?;
    drop_tasks_against(ctx, a, b);
    drop_tasks_against(ctx, b, a);

    if ctx.universe.is_player(a) || ctx.universe.is_player(b) {
        ctx.notifications.notify(Notification::PeaceSigned { a, b });
    }
    info!(a = %a, b = %b, "peace signed");
    Ok(())
}

fn drop_tasks_against(ctx: &mut GameContext<'_>, owner: EmpireId, enemy: EmpireId) {
    let targets: BTreeSet<PlanetId> = ctx.galaxy.planets_of(enemy).iter().map(|p| p.id).collect();
    ctx.tasks
        .remove_where(owner, &|t| t.target_planet.is_some_and(|p| targets.contains(&p)));
}

/// Proposes peace under the given dialogue. A refusal escalates the war.
pub fn offer_peace(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    them: EmpireId,
    dialogue_key: &str,
) -> Result<Option<OfferResponse>, AiError> {
    let their_offer = Offer::treaty(TreatyType::Peace)
        .with_dialogues(dialogue::OFFERPEACE_ACCEPTED, dialogue::OFFERPEACE_REJECTED)
        .with_effect(OfferEffect::SetPeace { a: us, b: them });
    let our_offer = if ctx.universe.is_player(them) {
        Offer::new()
    } else {
        Offer::treaty(TreatyType::Peace)
    };
    debug!(empire = %us, target = %them, dialogue = dialogue_key, "offering peace");
    send_proposal(
        ctx,
        Proposal {
            from: us,
            to: them,
            dialogue: Some(dialogue_key.to_string()),
            our_offer,
            their_offer,
            attitude: Attitude::Respectful,
            context: None,
        },
    )
}

// =============================================================================
// Allies
// =============================================================================

/// Asks an ally to join our war on `enemy`. The player decides on the
/// diplomacy screen; AI allies answer through [`process_ally_call_to_war`].
pub fn call_ally_to_war(
    ctx: &mut GameContext<'_>,
    us: EmpireId,
    ally: EmpireId,
    enemy: EmpireId,
) -> Result<Option<OfferResponse>, AiError> {
    let reject_key = if ctx.universe.get(us)?.is_honorable() {
        dialogue::HELP_US_WAR_NO_BREAK_ALLIANCE
    } else {
        dialogue::HELP_US_WAR_NO
    };
    let proposal = Proposal {
        from: us,
        to: ally,
        dialogue: Some(dialogue::HELP_US_WAR.to_string()),
        our_offer: Offer::new(),
        their_offer: Offer::new()
            .with_dialogues(dialogue::HELP_US_WAR_YES, reject_key)
            .with_effect(OfferEffect::DeclareWarViaCall {
                caller: us,
                ally,
                enemy,
                war_type: WarType::ImperialistWar,
            }),
        attitude: Attitude::Respectful,
        context: Some(enemy),
    };
    if ctx.universe.is_player(ally) {
        return send_proposal(ctx, proposal);
    }

    let (joins, reason) = process_ally_call_to_war(ctx.universe, ctx.galaxy, ally, us, enemy)?;
    debug!(empire = %us, ally = %ally, enemy = %enemy, joins, reason, "called ally to war");
    let response = if joins {
        OfferResponse::Accept
    } else {
        OfferResponse::Reject
    };
    resolve_proposal(ctx, &proposal, response)?;
    Ok(Some(response))
}

/// Whether `us` joins `ally`'s war on `enemy`, with the dialogue key that
/// explains the answer.
pub fn process_ally_call_to_war(
    universe: &Universe,
    galaxy: &dyn Galaxy,
    us: EmpireId,
    ally: EmpireId,
    enemy: EmpireId,
) -> Result<(bool, &'static str), AiError> {
    let empire = universe.get(us)?;
    if universe.average_war_grade(us) < 5.0 && !empire.is_honorable() {
        return Ok((false, dialogue::JOIN_WAR_REJECT_TOO_DANGEROUS));
    }

    let our_offense = galaxy.offensive_strength(us);
    let combined = our_offense + galaxy.offensive_strength(ally);
    let enemy_strength = galaxy.current_military_strength(enemy);
    if empire.relations.is_allied_with(enemy) {
        match empire.personality {
            PersonalityType::Pacifist | PersonalityType::Honorable => {
                return Ok((false, dialogue::JOIN_WAR_ALLIED_DECLINE));
            }
            PersonalityType::Aggressive if our_offense > enemy_strength => {
                return Ok((true, dialogue::JOIN_WAR_ALLIED_OK));
            }
            PersonalityType::Ruthless if combined > enemy_strength => {
                return Ok((true, dialogue::JOIN_WAR_ALLIED_OK));
            }
            _ => {}
        }
    }

    if enemy_strength.abs() < f32::EPSILON {
        return Ok((false, dialogue::JOIN_WAR_REJECT_TOO_DANGEROUS));
    }
    if combined / enemy_strength > empire.modifiers().ally_call_to_war_ratio {
        Ok((true, dialogue::JOIN_WAR_ALLIED_OK))
    } else {
        Ok((false, dialogue::JOIN_WAR_REJECT_TOO_DANGEROUS))
    }
}
