//! State - Loader State Modules
//!
//! The single-owner result-set record and the generation tokens that guard it.

pub mod loader_state;
pub mod token;

pub use loader_state::LoaderState;
pub use token::{RequestToken, TokenGenerator};
