//! The four per-turn planners an AI empire runs.

pub mod diplomatic;
pub mod economic;
pub mod military;
pub mod research;

pub use self::diplomatic::{run_diplomatic_planner, PersonalityPolicy};
pub use self::economic::run_economic_planner;
pub use self::military::{declare_war_on, make_peace, run_war_planner};
pub use self::research::run_research_planner;
