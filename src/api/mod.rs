//! Typed adapters over the backend HTTP surface.
//!
//! One module per capability area; each adapter is a stateless translation
//! from typed calls to transport calls. The state machines consume them
//! through the backend traits they implement.

pub mod admin;
pub mod auth;
pub mod db;
pub mod history;
pub mod models;
pub mod query;
pub mod result;
