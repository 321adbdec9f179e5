use starwake_core::{
    resolve_proposal, run_universe_turn, run_war_planner, AiSettings, BorderSystem, DesiredPlanet, Empire,
    NearbyPresence, NotificationLog, Planet, Sandbox, StaticGalaxy, TaskBoard, TechEntry, TechTree, Universe,
    MAX_ANGER, MAX_TRUST,
};
use starwake_protocol::{
    EmpireId, MilitaryTask, OfferResponse, PersonalityType, PlanetId, Position, SystemId, TechnologyType, TreatyType,
    WarType, CLAIM_ESTABLISHED_STEP,
};

const EMPIRES: u8 = 6;

fn techs() -> TechTree {
    TechTree::new([
        TechEntry::new("Theory", TechnologyType::General, 60.0),
        TechEntry::new("Farming", TechnologyType::Colonization, 50.0),
        TechEntry::new("Banking", TechnologyType::Economic, 80.0),
        TechEntry::new("Lasers", TechnologyType::ShipWeapons, 100.0),
        TechEntry::new("Fusion", TechnologyType::General, 500.0).with_prerequisite("Theory"),
    ])
}

/// Six empires on a ring, each owning three planets and bordering both
/// neighbors.
fn crowded_sector() -> Sandbox {
    let mut galaxy = StaticGalaxy::default();
    let mut empires = Vec::new();
    for (i, personality) in PersonalityType::ALL.iter().enumerate() {
        let id = EmpireId(i as u8);
        let mut empire = Empire::new(id, format!("Empire {i}"), *personality);
        empire.treasury.money = 150.0 * i as f32;
        empire.treasury.maximum_income = 120.0;
        empire.treasury.maximum_stable_income = 80.0;
        empire.treasury.all_spending = 40.0;
        empire.techs = techs();
        if i == 0 {
            empire = empire.player();
        }
        empires.push(empire);

        let angle = i as f32 / f32::from(EMPIRES) * std::f32::consts::TAU;
        for j in 0..3u32 {
            let planet = i as u32 * 10 + j;
            let center = Position::new(angle.cos() * 200_000.0 + j as f32 * 5_000.0, angle.sin() * 200_000.0);
            galaxy.add_planet(Planet::new(PlanetId(planet), Some(id), SystemId(planet), center));
        }
        galaxy.set_strength(id, 100.0 + 60.0 * i as f32);

        let neighbors = [(i + 1) % EMPIRES as usize, (i + EMPIRES as usize - 1) % EMPIRES as usize];
        galaxy.borders.insert(
            id,
            vec![BorderSystem {
                system: SystemId(i as u32 * 10),
                rank_importance: 8.0,
                nearby: neighbors
                    .iter()
                    .map(|n| NearbyPresence {
                        empire: EmpireId(*n as u8),
                        strength_present: 40.0,
                    })
                    .collect(),
            }],
        );
        galaxy.desired.insert(
            id,
            vec![DesiredPlanet {
                planet: PlanetId(neighbors[0] as u32 * 10),
                owner: Some(EmpireId(neighbors[0] as u8)),
            }],
        );
    }

    let mut sb = Sandbox::new(Universe::new(empires), galaxy, AiSettings::default(), 7);
    for a in 0..EMPIRES {
        for b in (a + 1)..EMPIRES {
            sb.universe.set_relations_as_known(EmpireId(a), EmpireId(b)).unwrap();
        }
    }
    sb
}

#[test]
fn long_run_keeps_state_consistent() {
    let mut sb = crowded_sector();
    for turn in 0..150 {
        run_universe_turn(&mut sb.context()).unwrap();
        for (i, proposal) in sb.screen.take().into_iter().enumerate() {
            let response = if (turn + i) % 3 == 0 {
                OfferResponse::Accept
            } else {
                OfferResponse::Reject
            };
            resolve_proposal(&mut sb.context(), &proposal, response).unwrap();
        }
        sb.tick();

        for empire in sb.universe.empires() {
            assert!((0.0..=1.0).contains(&empire.data.tax_rate), "{} tax {}", empire.name, empire.data.tax_rate);
            let ai = &empire.ai;
            for budget in [
                ai.defense_budget,
                ai.ssp_budget,
                ai.build_capacity,
                ai.spy_budget,
                ai.colony_budget,
                ai.terraform_budget,
            ] {
                assert!(budget >= 0.0, "{} budget {budget}", empire.name);
            }
            for rel in empire.relations.all_relations() {
                assert_eq!(rel.at_war(), rel.active_war().is_some());
                assert!(rel.trust <= MAX_TRUST);
                assert!((0.0..=MAX_ANGER).contains(&rel.total_anger));
                let other = sb.universe.relation(rel.them, empire.id).unwrap();
                assert_eq!(rel.known, other.known);
            }
        }
    }
}

#[test]
fn breaking_treaties_never_improves_relations() {
    for treaty in [
        TreatyType::NonAggression,
        TreatyType::Trade,
        TreatyType::OpenBorders,
        TreatyType::Alliance,
        TreatyType::Peace,
    ] {
        let mut sb = crowded_sector();
        sb.universe.sign_treaty_with(EmpireId(1), EmpireId(2), treaty).unwrap();
        let before: Vec<(f32, f32)> = [(1, 2), (2, 1)]
            .iter()
            .map(|&(a, b)| {
                let rel = sb.universe.relation(EmpireId(a), EmpireId(b)).unwrap();
                (rel.trust, rel.anger_diplomatic_conflict)
            })
            .collect();

        let mut log = NotificationLog::default();
        sb.universe
            .break_treaty_with(&mut log, EmpireId(1), EmpireId(2), treaty)
            .unwrap();

        for (&(a, b), &(trust, anger)) in [(1, 2), (2, 1)].iter().zip(&before) {
            let rel = sb.universe.relation(EmpireId(a), EmpireId(b)).unwrap();
            assert!(!rel.treaty(treaty), "{treaty:?}");
            assert!(rel.trust <= trust, "{treaty:?}");
            assert!(rel.anger_diplomatic_conflict >= anger, "{treaty:?}");
        }
    }
}

#[test]
fn player_hears_about_broken_treaties() {
    let mut sb = crowded_sector();
    sb.universe
        .sign_treaty_with(EmpireId(3), EmpireId(0), TreatyType::Trade)
        .unwrap();
    let mut log = NotificationLog::default();
    sb.universe
        .break_all_treaties_with(&mut log, EmpireId(3), EmpireId(0), false)
        .unwrap();
    assert_eq!(log.entries.len(), 1);
    assert!(sb.universe.relation(EmpireId(0), EmpireId(3)).unwrap().trust_entries.is_empty());
}

#[test]
fn war_preparation_is_throttled_per_call() {
    let mut sb = crowded_sector();
    let planner = EmpireId(4);
    let empire = sb.universe.get_mut(planner).unwrap();
    empire.strategy.expansion_priority = 1.0;
    empire.strategy.military_priority = 1.0;
    let weight = 1.0 + 1.0 + 1.0;
    for other in 0..EMPIRES {
        if other == planner.0 {
            continue;
        }
        empire
            .relations
            .get_relations_mut(EmpireId(other))
            .unwrap()
            .prepare_for_war(WarType::ImperialistWar);
    }

    run_war_planner(&mut sb.context(), planner).unwrap();
    let first = sb.tasks.tasks(planner).len();
    assert!(first > 0);
    assert!(first as f32 <= weight + 1.0, "{first} tasks");

    run_war_planner(&mut sb.context(), planner).unwrap();
    let second = sb.tasks.tasks(planner).len() - first;
    assert!(second as f32 <= weight + 1.0, "{second} tasks");
}

#[test]
fn declaring_war_mid_call_stays_within_the_task_cap() {
    let mut galaxy = StaticGalaxy::default();
    for j in 0..8u32 {
        let planet = 20 + j;
        galaxy.add_planet(Planet::new(
            PlanetId(planet),
            Some(EmpireId(2)),
            SystemId(planet),
            Position::new(2_000.0 + j as f32, 0.0),
        ));
    }
    let empires = vec![
        Empire::new(EmpireId(0), "Bystander", PersonalityType::Honorable),
        Empire::new(EmpireId(1), "Raider", PersonalityType::Aggressive),
        Empire::new(EmpireId(2), "Target", PersonalityType::Honorable),
    ];
    let mut sb = Sandbox::new(Universe::new(empires), galaxy, AiSettings::default(), 5);
    let planner = EmpireId(1);
    let empire = sb.universe.get_mut(planner).unwrap();
    empire.strategy.expansion_priority = 5.0;
    empire.strategy.military_priority = 0.0;
    empire
        .relations
        .get_relations_mut(EmpireId(2))
        .unwrap()
        .prepare_for_war(WarType::BorderConflict);
    let cap = (1.0f32 + 5.0 + 0.0 + 1.0).floor() as usize;

    let mut claim = MilitaryTask::defend_claim(planner, PlanetId(20), Position::new(2_000.0, 0.0));
    claim.step = CLAIM_ESTABLISHED_STEP;
    sb.tasks.add(claim);

    run_war_planner(&mut sb.context(), planner).unwrap();
    assert!(sb.universe.relation(planner, EmpireId(2)).unwrap().at_war());
    let first = sb.tasks.tasks(planner).len() - 1;
    assert!(first > 0);
    assert!(first <= cap, "{first} new tasks, cap {cap}");

    run_war_planner(&mut sb.context(), planner).unwrap();
    let second = sb.tasks.tasks(planner).len() - 1 - first;
    assert!(second <= cap, "{second} new tasks, cap {cap}");
}
