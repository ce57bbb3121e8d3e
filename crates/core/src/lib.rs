#![forbid(unsafe_code)]

pub mod catalog;
pub mod forms;
pub mod model;
pub mod progress;
pub mod time;
pub mod timer;

pub use time::Clock;
