pub mod emissions;
pub mod propagator;
