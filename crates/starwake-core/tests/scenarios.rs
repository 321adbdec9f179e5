use starwake_core::planners::military::declare_war_on;
use starwake_core::{
    resolve_proposal, run_diplomatic_planner, run_economic_planner, AiSettings, Empire, Sandbox, StaticGalaxy,
    Universe,
};
use starwake_protocol::{
    dialogue, EmpireId, OfferEffect, OfferResponse, PersonalityType, Posture, RejectionFlag, TreatyType, WarType,
};

fn sandbox(empires: Vec<Empire>) -> Sandbox {
    Sandbox::new(Universe::new(empires), StaticGalaxy::default(), AiSettings::default(), 42)
}

fn player() -> Empire {
    Empire::new(EmpireId(0), "Terran Union", PersonalityType::Honorable).player()
}

#[test]
fn broke_empire_taxes_everything() {
    let mut vesh = Empire::new(EmpireId(1), "Vesh", PersonalityType::Cunning);
    vesh.treasury.money = 0.0;
    vesh.treasury.maximum_income = 100.0;
    vesh.treasury.maximum_stable_income = 100.0;
    let mut sb = sandbox(vec![player(), vesh]);

    run_economic_planner(&mut sb.context(), EmpireId(1)).unwrap();

    assert_eq!(sb.universe.get(EmpireId(1)).unwrap().data.tax_rate, 1.0);
}

#[test]
fn treasury_above_goal_stops_taxes() {
    let mut vesh = Empire::new(EmpireId(1), "Vesh", PersonalityType::Cunning);
    vesh.treasury.money = 600.0;
    vesh.treasury.maximum_income = 100.0;
    // 12.5 * 0.2 * 200 = 500
    vesh.treasury.maximum_stable_income = 12.5;
    let mut sb = sandbox(vec![player(), vesh]);

    run_economic_planner(&mut sb.context(), EmpireId(1)).unwrap();

    let vesh = sb.universe.get(EmpireId(1)).unwrap();
    assert_eq!(vesh.ai.projected_money, 500.0);
    assert_eq!(vesh.data.tax_rate, 0.0);
}

#[test]
fn first_demand_brings_one_nap_pact_offer() {
    for personality in [PersonalityType::Honorable, PersonalityType::Cunning, PersonalityType::Pacifist] {
        let mut sb = sandbox(vec![player(), Empire::new(EmpireId(1), "Vesh", personality)]);
        sb.universe.set_relations_as_known(EmpireId(0), EmpireId(1)).unwrap();
        let first_demand = sb.settings.first_demand;
        let rel = sb.universe.relation_mut(EmpireId(1), EmpireId(0)).unwrap();
        rel.turns_known = first_demand;
        assert_eq!(rel.posture, Posture::Neutral);

        run_diplomatic_planner(&mut sb.context(), EmpireId(1)).unwrap();

        let offers: Vec<_> = sb.screen.with_dialogue(dialogue::OFFER_NAPACT).collect();
        assert_eq!(offers.len(), 1, "{personality:?}");
        assert!(offers[0].their_offer.nap_pact);
        assert!(offers[0].their_offer.effects.contains(&OfferEffect::SetRejectedFlag {
            owner: EmpireId(1),
            toward: EmpireId(0),
            flag: RejectionFlag::NapPact,
        }));

        // the player says no
        let offer = offers[0].clone();
        resolve_proposal(&mut sb.context(), &offer, OfferResponse::Reject).unwrap();
        let rel = sb.universe.relation(EmpireId(1), EmpireId(0)).unwrap();
        assert!(rel.rejected_nap_pact);
        assert!(!rel.nap_pact);
    }
}

#[test]
fn dominating_border_war_offers_winning_peace() {
    let vesh = Empire::new(EmpireId(1), "Vesh", PersonalityType::Honorable);
    let mut sb = sandbox(vec![player(), vesh]);
    sb.universe.set_relations_as_known(EmpireId(0), EmpireId(1)).unwrap();
    declare_war_on(&mut sb.context(), EmpireId(1), EmpireId(0), WarType::BorderConflict).unwrap();
    sb.screen.take();

    let war = sb
        .universe
        .relation_mut(EmpireId(1), EmpireId(0))
        .unwrap()
        .active_war_mut()
        .unwrap();
    war.turns_at_war = 100;
    war.their_strength_lost = 800.0;

    run_diplomatic_planner(&mut sb.context(), EmpireId(1)).unwrap();

    let offers = sb.screen.take();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].dialogue.as_deref(), Some(dialogue::OFFERPEACE_WINNINGBC));
    assert!(offers[0].their_offer.peace_treaty);

    resolve_proposal(&mut sb.context(), &offers[0], OfferResponse::Accept).unwrap();
    for (a, b) in [(0, 1), (1, 0)] {
        let rel = sb.universe.relation(EmpireId(a), EmpireId(b)).unwrap();
        assert!(!rel.at_war());
        assert!(rel.peace);
    }
}

#[test]
fn turn_that_is_not_a_peace_milestone_stays_silent() {
    let vesh = Empire::new(EmpireId(1), "Vesh", PersonalityType::Honorable);
    let mut sb = sandbox(vec![player(), vesh]);
    sb.universe.set_relations_as_known(EmpireId(0), EmpireId(1)).unwrap();
    declare_war_on(&mut sb.context(), EmpireId(1), EmpireId(0), WarType::BorderConflict).unwrap();
    sb.screen.take();
    let war = sb
        .universe
        .relation_mut(EmpireId(1), EmpireId(0))
        .unwrap()
        .active_war_mut()
        .unwrap();
    war.turns_at_war = 99;
    war.their_strength_lost = 800.0;

    run_diplomatic_planner(&mut sb.context(), EmpireId(1)).unwrap();
    assert!(sb.screen.shown.is_empty());
}

#[test]
fn player_breaking_a_nap_pact_is_remembered_by_everyone() {
    let empires = vec![
        player(),
        Empire::new(EmpireId(1), "Vesh", PersonalityType::Pacifist),
        Empire::new(EmpireId(2), "Kulrathi", PersonalityType::Aggressive),
        Empire::new(EmpireId(3), "Opteris", PersonalityType::Xenophobic),
    ];
    let mut sb = sandbox(empires);
    for other in 1..4 {
        sb.universe.set_relations_as_known(EmpireId(0), EmpireId(other)).unwrap();
    }
    sb.universe
        .sign_treaty_with(EmpireId(0), EmpireId(1), TreatyType::NonAggression)
        .unwrap();
    sb.universe.relation_mut(EmpireId(2), EmpireId(0)).unwrap().trust = 60.0;
    sb.universe.relation_mut(EmpireId(3), EmpireId(0)).unwrap().trust = 10.0;

    declare_war_on(&mut sb.context(), EmpireId(0), EmpireId(1), WarType::ImperialistWar).unwrap();

    let kulrathi = sb.universe.relation(EmpireId(2), EmpireId(0)).unwrap();
    assert_eq!(kulrathi.trust, 10.0);
    assert_eq!(kulrathi.anger_diplomatic_conflict, 20.0);
    let opteris = sb.universe.relation(EmpireId(3), EmpireId(0)).unwrap();
    assert_eq!(opteris.trust, -40.0);
    assert_eq!(opteris.anger_diplomatic_conflict, 20.0);

    let victim = sb.universe.relation(EmpireId(1), EmpireId(0)).unwrap();
    assert!(!victim.nap_pact);
    assert!(victim.at_war());
    assert!(victim.trust <= -50.0);
}
