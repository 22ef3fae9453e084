//! Copying playlist tracks into the portable output directory

pub mod output;
pub mod resolver;

pub use resolver::{Relocation, Resolver, DEFAULT_VOLUME_ROOT};
