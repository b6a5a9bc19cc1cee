#[path = "property/sampling_bounds.rs"]
mod sampling_bounds;

#[path = "property/tree_shape.rs"]
mod tree_shape;

#[path = "property/replay_determinism.rs"]
mod replay_determinism;
