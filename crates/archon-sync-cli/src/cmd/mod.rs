pub mod daemon;
pub mod emit;
pub mod map;
