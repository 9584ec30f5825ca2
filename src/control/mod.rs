//! Control module: trajectories, controllers and the trajectory follower
pub mod controllers;
pub mod follower;
pub mod trajectory;
