//! Session-start context assembly.

mod engine;

pub use engine::{BoundedContext, ContextSection, RetrievalEngine, SectionKind};
