pub mod gpu;
pub mod scene_graph;
pub mod mesh_asset;
pub mod camera;
pub mod lighting;
pub mod material;
pub mod picking;
pub mod random;
pub mod frame_loop;

// Animation
pub mod easing;
pub mod tween;
pub mod timeline;

// Scene
pub mod particle;
pub mod audio;
pub mod pointer;
pub mod composer;
pub mod model;
pub mod config;
pub mod scene;
pub mod hero;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
#[cfg(not(target_arch = "wasm32"))]
pub mod viewer;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
