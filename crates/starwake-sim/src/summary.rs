use serde::Serialize;
use starwake_core::Sandbox;
use starwake_protocol::{Notification, OfferResponse, PersonalityType, Proposal, WarState, WarType};

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub turns_played: u32,
    pub proposals: Vec<ProposalRecord>,
    pub wars_declared: u32,
    pub treaties_broken: u32,
    pub peace_signed: u32,
    pub military_tasks: usize,
    pub empires: Vec<EmpireReport>,
}

#[derive(Debug, Serialize)]
pub struct ProposalRecord {
    pub turn: u32,
    pub from: u8,
    pub dialogue: Option<String>,
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct EmpireReport {
    pub name: String,
    pub personality: PersonalityType,
    pub player: bool,
    pub tax_rate: f32,
    pub money: f32,
    pub defense_budget: f32,
    pub build_capacity: f32,
    pub research_topic: Option<String>,
    pub techs_unlocked: usize,
    pub postures: Vec<String>,
    pub wars: Vec<WarReport>,
    pub treaties: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WarReport {
    pub against: String,
    pub war_type: WarType,
    pub turns: u32,
    pub state: WarState,
}

impl Summary {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            ..Self::default()
        }
    }

    pub fn record_proposal(&mut self, proposal: &Proposal, response: OfferResponse) {
        self.proposals.push(ProposalRecord {
            turn: self.turns_played + 1,
            from: proposal.from.0,
            dialogue: proposal.dialogue.clone(),
            accepted: response.accepted(),
        });
    }

    pub fn record_notifications(&mut self, notifications: impl Iterator<Item = Notification>) {
        for notification in notifications {
            match notification {
                Notification::WarDeclared { .. } => self.wars_declared += 1,
                Notification::TreatyBroken { .. } => self.treaties_broken += 1,
                Notification::PeaceSigned { .. } => self.peace_signed += 1,
            }
        }
        self.turns_played += 1;
    }

    pub fn finish(&mut self, sandbox: &Sandbox) {
        self.military_tasks = sandbox.tasks.total();
        let universe = &sandbox.universe;
        self.empires = universe
            .empires()
            .map(|empire| {
                let name_of = |id| universe.get(id).map(|e| e.name.clone()).unwrap_or_else(|_| id.to_string());
                let wars = empire
                    .relations
                    .all_relations()
                    .filter_map(|rel| rel.active_war())
                    .map(|war| WarReport {
                        against: name_of(war.them),
                        war_type: war.war_type,
                        turns: war.turns_at_war,
                        state: war.score_state(),
                    })
                    .collect();
                let treaties = empire
                    .relations
                    .all_relations()
                    .flat_map(|rel| {
                        [
                            (rel.alliance, "alliance"),
                            (rel.nap_pact, "nap pact"),
                            (rel.trade, "trade"),
                            (rel.open_borders, "open borders"),
                            (rel.peace, "peace"),
                        ]
                        .into_iter()
                        .filter(|(held, _)| *held)
                        .map(move |(_, kind)| format!("{kind} with {}", name_of(rel.them)))
                    })
                    .collect();
                let postures = empire
                    .relations
                    .all_relations()
                    .filter(|rel| rel.known)
                    .map(|rel| format!("{:?} toward {}", rel.posture, name_of(rel.them)))
                    .collect();
                EmpireReport {
                    name: empire.name.clone(),
                    personality: empire.personality,
                    player: empire.is_player,
                    tax_rate: empire.data.tax_rate,
                    money: empire.treasury.money,
                    defense_budget: empire.ai.defense_budget,
                    build_capacity: empire.ai.build_capacity,
                    research_topic: empire.research_topic.clone(),
                    techs_unlocked: empire.techs.iter().filter(|t| t.unlocked).count(),
                    wars,
                    treaties,
                    postures,
                }
            })
            .collect();
    }

    pub fn print(&self) {
        println!("Scenario {} after {} turns", self.scenario, self.turns_played);
        println!(
            "  proposals to player: {} ({} accepted)",
            self.proposals.len(),
            self.proposals.iter().filter(|p| p.accepted).count()
        );
        println!(
            "  wars declared: {}  treaties broken: {}  peace signed: {}  military tasks: {}",
            self.wars_declared, self.treaties_broken, self.peace_signed, self.military_tasks
        );
        for empire in &self.empires {
            println!();
            println!(
                "{}{} [{:?}] tax {:.0}% money {:.0} researching {}",
                empire.name,
                if empire.player { " (player)" } else { "" },
                empire.personality,
                empire.tax_rate * 100.0,
                empire.money,
                empire.research_topic.as_deref().unwrap_or("nothing"),
            );
            println!(
                "  defense budget {:.0} build capacity {:.0}",
                empire.defense_budget, empire.build_capacity
            );
            for posture in &empire.postures {
                println!("  {posture}");
            }
            for war in &empire.wars {
                println!(
                    "  at war with {} ({:?}, {} turns, {:?})",
                    war.against, war.war_type, war.turns, war.state
                );
            }
            for treaty in &empire.treaties {
                println!("  {treaty}");
            }
        }
    }
}
