//! Turn driver: runs the planners in order and ages every relationship.

use starwake_protocol::EmpireId;
use tracing::debug;

use crate::context::GameContext;
use crate::error::AiError;
use crate::planners::{run_diplomatic_planner, run_economic_planner, run_research_planner, run_war_planner};

/// One empire's share of a turn. Every empire balances its budget; only AI
/// empires go on to research, diplomacy and war.
pub fn run_empire_turn(ctx: &mut GameContext<'_>, id: EmpireId) -> Result<(), AiError> {
    let empire = ctx.universe.get(id)?;
    if empire.is_faction || empire.defeated {
        return Ok(());
    }
    let is_player = empire.is_player;

    run_economic_planner(ctx, id)?;
    if is_player {
        return Ok(());
    }
    run_research_planner(ctx, id)?;
    run_diplomatic_planner(ctx, id)?;
    run_war_planner(ctx, id)
}

/// Runs every empire in id order, then advances all relationships.
pub fn run_universe_turn(ctx: &mut GameContext<'_>) -> Result<(), AiError> {
    debug!(turn = ctx.turn, "running empire turns");
    for id in ctx.universe.ids() {
        run_empire_turn(ctx, id)?;
    }
    advance_relationships(ctx);
    Ok(())
}

/// Ages counters, decays anger and refreshes threat using current strengths.
pub fn advance_relationships(ctx: &mut GameContext<'_>) {
    let galaxy = ctx.galaxy;
    let settings = ctx.settings;
    for empire in ctx.universe.empires_mut() {
        let ours = galaxy.current_military_strength(empire.id);
        for rel in empire.relations.all_relations_mut() {
            rel.advance_turn(settings, ours, galaxy.current_military_strength(rel.them));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Sandbox;
    use crate::empire::Empire;
    use crate::galaxy::StaticGalaxy;
    use crate::settings::AiSettings;
    use crate::universe::Universe;
    use starwake_protocol::PersonalityType;

    fn sandbox() -> Sandbox {
        let universe = Universe::new(vec![
            Empire::new(EmpireId(0), "Terran", PersonalityType::Honorable).player(),
            Empire::new(EmpireId(1), "Vesh", PersonalityType::Pacifist),
            Empire::new(EmpireId(2), "Drift", PersonalityType::Ruthless).faction(),
        ]);
        let mut galaxy = StaticGalaxy::default();
        galaxy.set_strength(EmpireId(0), 200.0);
        galaxy.set_strength(EmpireId(1), 100.0);
        Sandbox::new(universe, galaxy, AiSettings::default(), 5)
    }

    #[test]
    fn relationships_age_once_per_turn() {
        let mut sb = sandbox();
        sb.universe.set_relations_as_known(EmpireId(0), EmpireId(1)).unwrap();
        run_universe_turn(&mut sb.context()).unwrap();
        sb.tick();
        run_universe_turn(&mut sb.context()).unwrap();

        let rel = sb.universe.relation(EmpireId(1), EmpireId(0)).unwrap();
        assert_eq!(rel.turns_known, 2);
        assert_eq!(rel.threat, 100.0);
        let rel = sb.universe.relation(EmpireId(0), EmpireId(1)).unwrap();
        assert_eq!(rel.threat, -50.0);
        assert_eq!(sb.universe.relation(EmpireId(1), EmpireId(2)).unwrap().turns_known, 0);
    }

    #[test]
    fn the_player_only_balances_the_budget() {
        let mut sb = sandbox();
        sb.universe.get_mut(EmpireId(0)).unwrap().treasury.money = 0.0;
        run_empire_turn(&mut sb.context(), EmpireId(0)).unwrap();
        let player = sb.universe.get(EmpireId(0)).unwrap();
        assert!(player.research_topic.is_none());
        assert!((0.0..=1.0).contains(&player.data.tax_rate));
    }
}
