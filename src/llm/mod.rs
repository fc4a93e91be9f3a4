pub mod client;
pub mod describer;
pub mod types;

pub use client::*;
pub use describer::*;
pub use types::*;
