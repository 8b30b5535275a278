//! Board-level adapters behind the `bringup-core` trait seams.

pub mod indicator;
pub mod irq;
pub mod power;
pub mod regulator;
