#![forbid(unsafe_code)]

pub mod decay;
pub mod error;
pub mod model;
pub mod overview;
pub mod quiz;
pub mod strength;
pub mod time;

pub use error::Error;
pub use time::Clock;
