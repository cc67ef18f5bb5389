pub mod entity;
pub mod occupant;
pub mod rules;
