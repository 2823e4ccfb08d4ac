//! # dh-chain
//!
//! Builds the kinematic chain of a serial robot arm from two CSV tables: named
//! link lengths in millimeters, and Denavit-Hartenberg rows whose cells are
//! arithmetic expressions over those lengths and the joint variables `q1..qN`.
//!
//! Cells are evaluated by a small arithmetic-only evaluator; identifiers are
//! resolved through symbol scopes rather than text substitution. The resulting
//! [`Chain`] can be serialized with serde or rendered as a kinematics `.ini`
//! description.

pub mod builder;
pub mod chain;
pub mod error;
pub mod export;
pub mod expression;
pub mod symbols;
pub mod tables;

pub use builder::*;
pub use chain::*;
pub use error::{ChainError, ExpressionError};
pub use export::*;
pub use expression::*;
pub use symbols::*;
pub use tables::*;
