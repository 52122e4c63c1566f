pub mod config;
pub mod engine;
pub mod fire;
pub mod grid;
pub mod inventory;
pub mod jobs;
pub mod observer;
pub mod pathfinding;
pub mod rng;
pub mod systems;
pub mod worker;
pub mod world;
pub mod worldgen;
