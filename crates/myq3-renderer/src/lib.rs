#![allow(clippy::needless_range_loop, clippy::float_cmp, clippy::manual_range_contains,
         clippy::nonminimal_bool, clippy::field_reassign_with_default)]
// Portal and mirror views for the Vulkan renderer

pub mod vk_local;
pub mod vk_surface;
pub mod vk_rmain;
pub mod vk_mirror;
