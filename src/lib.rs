pub mod config;
pub mod constraints;
pub mod export;
pub mod mutation;
pub mod objective;
pub mod optimization;
pub mod rng;
pub mod sequence;
