//! Input sources standing in for the hardware collaborators.

pub mod simulation;
