#![allow(clippy::needless_range_loop, clippy::float_cmp, clippy::manual_range_contains)]

pub mod q_shared;
pub mod common;
pub mod cvar;
