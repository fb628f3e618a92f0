pub mod properties;
pub mod scene_tree;
pub mod status_bar;
