#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alias;
pub mod cache;
pub mod clients;
pub mod config;
pub mod denylist;
pub mod external;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod split;
pub mod util;
