//! Grammar of the achievement script language: keywords and the
//! expression tree the parser builds

pub mod ast;
pub mod keywords;

pub use ast::*;
pub use keywords::{is_reserved_word, Keyword};
