//! The Messaging Intermediate Language token model.
//!
//! Tokens reference one of a fixed set of `static` [`TokenKind`]s; rendering
//! a sequence of tokens and concatenating the results yields MIL text.

pub mod factory;
mod token;

pub use factory::AssociationDirection;
pub use token::*;
