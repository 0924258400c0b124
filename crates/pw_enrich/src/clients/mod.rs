pub mod heuristic;
pub mod remote;
