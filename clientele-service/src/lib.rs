//! Clientele Service - User Registration
//!
//! Business rules for registering users against clients, composed over the
//! read-through entity caches from `clientele-storage`.

pub mod constants;
pub mod user_service;

pub use user_service::{age_on, credit_details_for, NewUser, UserService};
