pub mod accumulator;
pub mod batch;
pub mod blend;
