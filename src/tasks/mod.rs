//! Background Tasks Module
//!
//! Optional background work for a long-lived store.
//!
//! # Tasks
//! - Expiry sweep: removes expired cache entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
