pub mod graph;
pub mod replicate;
pub mod set_params;
