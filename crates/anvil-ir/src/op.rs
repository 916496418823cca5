//! Operators

use serde::{Deserialize, Serialize};

/// Arithmetic and bitwise value operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

/// Comparison operators used inside boolean conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Logical negation, used when a branch jumps around the body on failure.
    pub fn invert(&self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

/// Joiners between boolean terms.
///
/// `And`/`Or` short-circuit. `BitAnd`/`BitOr`/`BitXor` are Java's eager
/// boolean operators: both operands are always evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl LogicOp {
    pub fn is_bitwise(&self) -> bool {
        matches!(self, LogicOp::BitAnd | LogicOp::BitOr | LogicOp::BitXor)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

/// JVM invocation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Static,
    Special,
    Interface,
}
