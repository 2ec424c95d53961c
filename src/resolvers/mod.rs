//! Module resolvers: the participants of a resolution pipeline.

mod builtin;
mod filesystem;
mod resolver;

pub use builtin::BuiltinResolver;
pub use filesystem::FileSystemResolver;
pub use resolver::{Outcome, Resolution, Resolver, SearchContext};
