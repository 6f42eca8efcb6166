//! Domain layer: the experiment's entities, the payoff table, the page rules,
//! and the ports the application layer depends on.

pub mod constants;
pub mod currency;
pub mod decision;
pub mod group;
pub mod pages;
pub mod participant;
pub mod payoff;
pub mod player;
pub mod ports;
