// Types shared between the kernel adapters and the enrichment domain.

pub mod message;

pub use message::*;
