pub mod insight;

pub use insight::*;
