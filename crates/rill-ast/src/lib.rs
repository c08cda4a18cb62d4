//! Resolved (input) and typed (output) ASTs for the Rill front-end.
//!
//! - [`resolved`]: the AST the front-end consumes; names resolved, every
//!   annotation a kinded type; serde-deserializable snapshots
//! - [`typed`]: the AST the front-end produces; every expression annotated
//!   with a fully substituted type and effect

pub mod resolved;
pub mod typed;
