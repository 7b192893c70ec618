pub mod artefact;
pub mod rule;

pub use artefact::*;
pub use rule::*;
