pub mod actions;
pub mod attack;
