pub mod app;
pub mod camera;
pub mod cli;
pub mod gpu;
pub mod input;
pub mod lighting;
pub mod mesh_asset;
pub mod scene;
pub mod settings;
pub mod texture;
