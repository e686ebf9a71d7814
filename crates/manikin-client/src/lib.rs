pub mod camera;
pub mod cli;
pub mod engine;
pub mod input;
pub mod mesh;
pub mod physics;
pub mod primitives;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod world;
