//! Anvil IR - Instruction Tree Model
//!
//! This crate defines the structured instruction tree the bytecode backend
//! consumes: erased JVM type references, a closed `Instruction` enum and the
//! declaration forms (classes, methods, fields, enum entries). Construction
//! and resolution of these nodes is the producer's job; the backend treats
//! the tree as immutable input.

pub mod decl;
pub mod factory;
pub mod instr;
pub mod op;
pub mod types;

pub use decl::{
    access, ConstructorDeclaration, EnumEntry, EnumEntryBody, FieldDeclaration,
    MethodDeclaration, Parameter, TypeDeclaration, TypeKind,
};
pub use instr::{
    BoolTerm, CaseValue, CatchClause, Check, ForEachIteration, Instruction, Invocation, Literal,
    NewInstance, SwitchCase,
};
pub use op::{CompareOp, InvokeKind, LogicOp, MathOp, UnaryOp};
pub use types::{MethodSig, Primitive, TypeRef, TypeSpec};
