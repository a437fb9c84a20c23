//! Session engine for Chronle, a turn-based date-guessing puzzle.
//!
//! The engine scores guesses, tracks keyboard key states, reconciles cached
//! and authoritative progress, and persists attempt records through a
//! pluggable progress store. It exposes no network surface; its protocol is
//! the in-process call contract of the [`services`] module.

pub mod cache;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod feedback;
pub mod keyboard;
pub mod puzzle;
pub mod retry;
pub mod services;
pub mod state;
