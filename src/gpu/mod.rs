//! GPU rendering internals.

pub mod bloom;
pub mod composite;
pub mod mesh;
pub mod pipeline;
pub mod render_target;
pub mod renderer;
