//! Shared source-location types used by the lexer, parser, interpreter and
//! incremental engine.

pub mod span;

pub use span::{Position, SourceMap, Span, Spanned};
