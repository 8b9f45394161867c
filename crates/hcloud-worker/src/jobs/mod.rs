//! Built-in job handlers.

pub mod recycle_sweep;

pub use recycle_sweep::RecycleSweepJob;
