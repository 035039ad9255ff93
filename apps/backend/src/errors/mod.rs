//! Error handling for the crowdchess backend.

pub mod domain;

pub use domain::GameError;
