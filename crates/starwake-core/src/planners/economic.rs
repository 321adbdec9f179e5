//! Treasury goal, tax rate, threat level and per-area budgets.
//!
//! Budgets are not hard limits. They tell the other planners how much of
//! the treasury an area may lean on this turn, smoothed across turns.

use std::collections::BTreeSet;

use starwake_protocol::EmpireId;
use tracing::debug;

use crate::context::GameContext;
use crate::empire::Empire;
use crate::error::AiError;

/// Turns of income the treasury goal is measured in.
pub const TREASURY_TIME_SPAN: f32 = 200.0;

pub fn run_economic_planner(ctx: &mut GameContext<'_>, id: EmpireId) -> Result<(), AiError> {
    let defeated: BTreeSet<EmpireId> = ctx.universe.empires().filter(|e| e.defeated).map(|e| e.id).collect();
    let factions: BTreeSet<EmpireId> = ctx.universe.empires().filter(|e| e.is_faction).map(|e| e.id).collect();
    let settings = ctx.settings;
    let smoothing = settings.ema_smoothing;

    let empire = ctx.universe.get_mut(id)?;
    let money = empire.treasury.money;
    let goal = treasury_goal(empire);
    empire.ai.projected_money = goal;
    auto_set_taxes(empire, goal);

    let risk_limit = (empire.credit_rating() * 2.0).clamp(0.1, 2.0);
    let threat = get_risk(empire, risk_limit, &defeated);
    empire.ai.threat_level = threat;

    let weights = &settings.budget;
    let mut defense = weights.defense;
    let mut ssp = weights.ssp;
    let build = weights.build;
    let spy = weights.spy;
    let mut colony = weights.colony;
    let terraform = weights.terraform;

    // The player does not use build or spy budgets; spread them elsewhere.
    if empire.is_player {
        let balance = (build + spy) / 2.0;
        defense += balance;
        colony += balance;
        ssp += balance;
    }

    let strategy = goal.max(money);
    let ssp_risk = (1.0 + empire.strategy.industry_ratio + empire.strategy.expansion_ratio) * 0.5;

    let new_defense = set_budget_for_area(empire, defense, strategy, threat);
    let new_ssp = set_budget_for_area(empire, ssp, strategy, ssp_risk);
    let new_build = set_budget_for_area(empire, build, strategy, threat);
    let new_spy = spy_budget(empire, strategy, spy, &factions);
    let new_colony = set_budget_for_area(empire, colony, strategy, 1.0);
    let new_terraform = set_budget_for_area(empire, terraform, strategy, 1.0);

    let ai = &mut empire.ai;
    ai.defense_budget = ema(ai.defense_budget, new_defense, smoothing);
    ai.ssp_budget = ema(ai.ssp_budget, new_ssp, smoothing);
    ai.build_capacity = ema(ai.build_capacity, new_build, smoothing);
    ai.spy_budget = ema(ai.spy_budget, new_spy, smoothing);
    ai.colony_budget = ema(ai.colony_budget, new_colony, smoothing);
    ai.terraform_budget = ema(ai.terraform_budget, new_terraform, smoothing);

    debug!(
        empire = %empire.name,
        tax = empire.data.tax_rate,
        goal,
        threat,
        build = empire.ai.build_capacity,
        "economic plan"
    );

    let allies: Vec<EmpireId> = empire
        .relations
        .all_relations()
        .filter(|r| r.alliance)
        .map(|r| r.them)
        .collect();
    let own_build = empire.ai.build_capacity;
    let allied_build: f32 = allies
        .iter()
        .filter_map(|ally| ctx.universe.get(*ally).ok())
        .map(|ally| ally.ai.build_capacity)
        .sum();
    ctx.universe.get_mut(id)?.ai.alliance_build_capacity = own_build + allied_build;
    Ok(())
}

/// Money the empire wants banked: stable income over the time span.
pub fn treasury_goal(empire: &Empire) -> f32 {
    let t = &empire.treasury;
    let gross =
        t.maximum_stable_income - t.civ_ship_maintenance - t.troop_cost_on_planets - t.troop_ship_maintenance;
    let goal = gross * empire.data.treasury_goal / goal_equalizer(empire) * TREASURY_TIME_SPAN;
    goal.max(0.0)
}

/// Shrinks the goal of rich AI empires so taxes stay moderate.
pub fn goal_equalizer(empire: &Empire) -> f32 {
    let money = empire.treasury.money;
    if empire.is_player || money < 2000.0 {
        1.0
    } else {
        (1.0 + money * 0.00004).min(4.0)
    }
}

pub fn auto_set_taxes(empire: &mut Empire, goal: f32) {
    if empire.is_player && !empire.data.auto_taxes {
        return;
    }
    let money = empire.treasury.money;
    if money <= 0.0 {
        empire.data.tax_rate = 1.0;
        return;
    }
    let gap = goal - money;
    if gap < 0.0 {
        empire.data.tax_rate = 0.0;
        return;
    }

    let needed = gap / TREASURY_TIME_SPAN;
    let mut compensator = 1.0;
    if goal > 1000.0 {
        let reducer = goal / if empire.is_player { 9.0 } else { 2.0 };
        compensator = (gap / reducer).min(1.0);
    }
    let amount = empire.treasury.all_spending + needed;
    empire.data.tax_rate = find_tax_rate(empire.treasury.maximum_income, amount * compensator);
}

/// Lowest whole-percent rate whose income covers `amount`; 1 if none does.
pub fn find_tax_rate(maximum_income: f32, amount: f32) -> f32 {
    if amount == 0.0 {
        return 0.0;
    }
    (1..100)
        .map(|i| i as f32 / 100.0)
        .find(|rate| maximum_income * rate >= amount)
        .unwrap_or(1.0)
}

/// Sums the risk of every known, living empire and records the per-kind maxima.
fn get_risk(empire: &mut Empire, risk_limit: f32, defeated: &BTreeSet<EmpireId>) -> f32 {
    let mut total = 0.0;
    let mut economic: f32 = 0.0;
    let mut border: f32 = 0.0;
    let mut enemy: f32 = 0.0;
    for rel in empire.relations.all_relations() {
        if defeated.contains(&rel.them) || !rel.known || rel.risk.risk <= 0.0 {
            continue;
        }
        total += rel.risk.risk;
        economic = economic.max(rel.risk.expansion);
        border = border.max(rel.risk.border);
        enemy = enemy.max(rel.risk.known_threat);
    }
    empire.ai.economic_threat = economic;
    empire.ai.border_threat = border;
    empire.ai.enemy_threat = enemy;
    clamp_low_first(total, 0.25, risk_limit)
}

/// Clamp where the lower bound wins if the bounds cross.
fn clamp_low_first(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

fn set_budget_for_area(empire: &Empire, percent: f32, strategy: f32, risk: f32) -> f32 {
    let risk = if empire.is_player { 1.0 } else { risk };
    (strategy * percent * risk).max(1.0)
}

fn spy_budget(empire: &Empire, strategy: f32, percent: f32, factions: &BTreeSet<EmpireId>) -> f32 {
    if empire.is_player {
        return 0.0;
    }
    let knows_someone = empire
        .relations
        .all_relations()
        .any(|r| r.known && !factions.contains(&r.them));
    if !knows_someone {
        return 0.0;
    }

    let limit = empire.spy_limit.max(1) as f32;
    let agents = empire.agents as f32;
    let agent_ratio = agents.min(limit) / limit;
    let trustworthiness = empire.traits.trustworthiness * 0.01;
    let to_save = (0.5 + agent_ratio + trustworthiness + empire.strategy.military_ratio) * 0.6;
    let needs = (1.0 + limit - agents.min(limit)).max(1.0);
    strategy * percent * over_spend_ratio(empire.treasury.money, strategy, to_save, needs)
}

/// `(money + money - goal * pct) / goal`, clamped to `0..=max_ratio`.
pub fn over_spend_ratio(money: f32, goal: f32, percent_to_save: f32, max_ratio: f32) -> f32 {
    let treasury = goal.max(1.0);
    let min_money = money - treasury * percent_to_save;
    ((money + min_money) / treasury).clamp(0.0, max_ratio.max(0.0))
}

pub fn ema(old: f32, new: f32, smoothing: f32) -> f32 {
    old * smoothing + new * (1.0 - smoothing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Sandbox;
    use crate::galaxy::StaticGalaxy;
    use crate::settings::AiSettings;
    use crate::universe::Universe;
    use starwake_protocol::PersonalityType;

    fn ai(money: f32) -> Empire {
        let mut empire = Empire::new(EmpireId(1), "Vesh", PersonalityType::Cunning);
        empire.treasury.money = money;
        empire.treasury.maximum_income = 100.0;
        empire.treasury.maximum_stable_income = 100.0;
        empire
    }

    #[test]
    fn find_tax_rate_scans_percentages() {
        assert_eq!(find_tax_rate(100.0, 0.0), 0.0);
        assert_eq!(find_tax_rate(100.0, 25.0), 0.25);
        assert_eq!(find_tax_rate(100.0, 25.5), 0.26);
        assert_eq!(find_tax_rate(100.0, 500.0), 1.0);
        assert_eq!(find_tax_rate(0.0, 5.0), 1.0);
    }

    #[test]
    fn treasury_goal_uses_stable_income() {
        let empire = ai(100.0);
        // 100 * 0.2 / 1 * 200
        assert_eq!(treasury_goal(&empire), 4000.0);

        let rich = ai(50_000.0);
        assert_eq!(goal_equalizer(&rich), 3.0);
        assert!((treasury_goal(&rich) - 4000.0 / 3.0).abs() < 1e-2);

        let mut broke = ai(0.0);
        broke.treasury.civ_ship_maintenance = 500.0;
        assert_eq!(treasury_goal(&broke), 0.0);
    }

    #[test]
    fn taxes_follow_money() {
        let mut empire = ai(0.0);
        auto_set_taxes(&mut empire, 4000.0);
        assert_eq!(empire.data.tax_rate, 1.0);

        let mut empire = ai(600.0);
        auto_set_taxes(&mut empire, 500.0);
        assert_eq!(empire.data.tax_rate, 0.0);

        // gap 400, needed 2, no compensator below 1000
        let mut empire = ai(100.0);
        empire.treasury.all_spending = 10.0;
        auto_set_taxes(&mut empire, 500.0);
        assert_eq!(empire.data.tax_rate, 0.12);

        let mut player = ai(0.0).player();
        player.data.tax_rate = 0.4;
        auto_set_taxes(&mut player, 4000.0);
        assert_eq!(player.data.tax_rate, 0.4);
    }

    #[test]
    fn over_spend_ratio_is_bounded() {
        assert_eq!(over_spend_ratio(0.0, 100.0, 0.5, 3.0), 0.0);
        assert_eq!(over_spend_ratio(100.0, 100.0, 0.5, 3.0), 1.5);
        assert_eq!(over_spend_ratio(1000.0, 100.0, 0.5, 3.0), 3.0);
        assert_eq!(over_spend_ratio(10.0, 0.0, 0.0, 2.0), 2.0);
    }

    #[test]
    fn ema_weights_the_old_value() {
        assert!((ema(10.0, 0.0, 0.9) - 9.0).abs() < 1e-5);
        assert!((ema(0.0, 10.0, 0.9) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn planner_writes_budgets_and_alliance_capacity() {
        let universe = Universe::new(vec![ai(1000.0), ai(1000.0)]);
        let mut sb = Sandbox::new(universe, StaticGalaxy::default(), AiSettings::default(), 3);
        sb.universe.set_relations_as_known(EmpireId(0), EmpireId(1)).unwrap();
        sb.universe.sign_alliance_with(EmpireId(0), EmpireId(1)).unwrap();

        run_economic_planner(&mut sb.context(), EmpireId(1)).unwrap();
        run_economic_planner(&mut sb.context(), EmpireId(0)).unwrap();

        let e0 = sb.universe.get(EmpireId(0)).unwrap();
        let e1 = sb.universe.get(EmpireId(1)).unwrap();
        assert_eq!(e0.ai.projected_money, 4000.0);
        assert!(e0.ai.build_capacity > 0.0);
        assert!(e0.ai.spy_budget >= 0.0);
        // no risk from an ally, so the floor of 0.25 applies
        assert_eq!(e0.ai.threat_level, 0.25);
        assert!((e0.ai.alliance_build_capacity - (e0.ai.build_capacity + e1.ai.build_capacity)).abs() < 1e-3);
    }
}
