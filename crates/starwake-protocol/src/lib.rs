//! Plain data shared between the empire AI and whatever hosts it.
//!
//! Everything here is `serde` serializable so that hosts can persist it or
//! forward it to a UI without reaching into planner internals.

mod diplomacy;
mod ids;
mod notification;
mod types;
mod war;

pub use crate::diplomacy::*;
pub use crate::ids::*;
pub use crate::notification::*;
pub use crate::types::*;
pub use crate::war::*;
