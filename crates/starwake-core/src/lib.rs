mod context;
mod empire;
mod error;
mod galaxy;
mod ledger;
mod negotiator;
pub mod offers;
mod personality;
pub mod planners;
mod rng;
mod services;
mod settings;
pub mod turn;
mod universe;
mod war;

pub use crate::context::*;
pub use crate::empire::*;
pub use crate::error::*;
pub use crate::galaxy::*;
pub use crate::ledger::*;
pub use crate::negotiator::*;
pub use crate::offers::{announce, apply_offer_effect, resolve_proposal, send_proposal};
pub use crate::personality::*;
pub use crate::planners::{
    declare_war_on, make_peace, run_diplomatic_planner, run_economic_planner, run_research_planner,
    run_war_planner, PersonalityPolicy,
};
pub use crate::rng::*;
pub use crate::services::*;
pub use crate::settings::*;
pub use crate::turn::{advance_relationships, run_empire_turn, run_universe_turn};
pub use crate::universe::*;
pub use crate::war::*;
