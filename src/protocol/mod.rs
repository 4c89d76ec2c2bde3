pub mod state;
pub mod suite;
