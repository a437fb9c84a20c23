//! Service layer orchestrating feedback, persistence, caching, and the
//! session lifecycle.

pub mod attempt_service;
pub mod guess_service;
pub mod session_service;
pub mod streaks;
