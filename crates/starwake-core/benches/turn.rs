use criterion::{black_box, criterion_group, criterion_main, Criterion};
use starwake_core::{
    run_universe_turn, AiSettings, BorderSystem, Empire, NearbyPresence, Planet, Sandbox, StaticGalaxy, TechEntry,
    TechTree, Universe,
};
use starwake_protocol::{EmpireId, PersonalityType, PlanetId, Position, SystemId, TechnologyType};

fn sector(empires: u8, planets_each: u32) -> Sandbox {
    let mut galaxy = StaticGalaxy::default();
    let mut roster = Vec::with_capacity(empires as usize);
    for i in 0..empires {
        let id = EmpireId(i);
        let personality = PersonalityType::ALL[i as usize % PersonalityType::ALL.len()];
        let mut empire = Empire::new(id, format!("Empire {i}"), personality);
        empire.treasury.money = 500.0;
        empire.treasury.maximum_income = 200.0;
        empire.treasury.maximum_stable_income = 150.0;
        empire.treasury.all_spending = 90.0;
        empire.techs = TechTree::new((0..40).map(|t| {
            let tech_type = match t % 4 {
                0 => TechnologyType::General,
                1 => TechnologyType::Economic,
                2 => TechnologyType::ShipWeapons,
                _ => TechnologyType::Colonization,
            };
            TechEntry::new(format!("Tech{t}"), tech_type, 50.0 + t as f32 * 25.0)
        }));
        if i == 0 {
            empire = empire.player();
        }
        roster.push(empire);

        for p in 0..planets_each {
            let planet = u32::from(i) * 100 + p;
            let center = Position::new(f32::from(i) * 50_000.0, p as f32 * 4_000.0);
            galaxy.add_planet(Planet::new(PlanetId(planet), Some(id), SystemId(planet), center));
        }
        galaxy.set_strength(id, 200.0 + f32::from(i) * 40.0);
        galaxy.borders.insert(
            id,
            vec![BorderSystem {
                system: SystemId(u32::from(i) * 100),
                rank_importance: 7.0,
                nearby: vec![NearbyPresence {
                    empire: EmpireId((i + 1) % empires),
                    strength_present: 25.0,
                }],
            }],
        );
    }

    let mut sb = Sandbox::new(Universe::new(roster), galaxy, AiSettings::default(), 42);
    for a in 0..empires {
        for b in (a + 1)..empires {
            let _ = sb.universe.set_relations_as_known(EmpireId(a), EmpireId(b));
        }
    }
    sb
}

fn bench_universe_turn(c: &mut Criterion) {
    c.bench_function("starwake-core/run_universe_turn(empires=12)", |b| {
        let mut sb = sector(12, 8);
        b.iter(|| {
            run_universe_turn(&mut sb.context()).expect("turn");
            sb.screen.take();
            sb.tick();
            black_box(sb.tasks.total());
        })
    });
}

criterion_group!(benches, bench_universe_turn);
criterion_main!(benches);
