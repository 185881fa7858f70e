//! Core scheduling and timing modules
//!
//! Contains the critical section, pools, the priority scheduler and the
//! clock arithmetic shared by `sctimer` and `opentimers`.

pub mod callback;
pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod error;
pub mod fault;
pub mod pool;
pub mod power;
pub mod prio;
pub mod sched;
pub mod time;
pub mod types;
