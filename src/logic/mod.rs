//! Logic modules: pure queries over the catalogs.
//!
//! # Modules
//!
//! - `resolver`: Target repository selection per repository family
//! - `planner`: Install/remove sets from package evolution events

pub mod planner;
pub mod resolver;
