pub mod fits;
pub mod frames;
