mod generation;

pub use generation::{Generation, GenerationToken};
