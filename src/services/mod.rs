pub mod generation;
pub mod ratelimit;
pub mod replicate;
pub mod store;
