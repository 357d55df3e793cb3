pub mod generation;
pub mod job;
