pub mod agent;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod model;
pub mod moves;
pub mod node;
pub mod protocol;
pub mod rules;
pub mod search;
