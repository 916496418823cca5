//! The abstract instruction set accepted by method sinks.
//!
//! Instructions reference jump targets through opaque [`Label`] handles; the
//! serializer resolves them. Max-stack, max-locals and stack-map frames are
//! the serializer's problem, not the emitter's.

use serde::{Deserialize, Serialize};

/// Opaque jump-target handle, created by [`crate::MethodSink::new_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub u32);

/// Operand categories for loads, stores, returns and array ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl ValueKind {
    /// Category for a field/type descriptor.
    pub fn of_descriptor(desc: &str) -> ValueKind {
        match desc.as_bytes().first() {
            Some(b'Z') | Some(b'B') | Some(b'S') | Some(b'C') | Some(b'I') => ValueKind::Int,
            Some(b'J') => ValueKind::Long,
            Some(b'F') => ValueKind::Float,
            Some(b'D') => ValueKind::Double,
            _ => ValueKind::Ref,
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double)
    }
}

/// Numeric kinds for primitive conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumKind {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Short,
    Char,
}

/// Jump conditions. The `IfEq`..`IfGe` family tests an int against zero and
/// doubles as the branch after a three-way compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JumpCond {
    Goto,
    IfEq,
    IfNe,
    IfLt,
    IfLe,
    IfGt,
    IfGe,
    IfICmpEq,
    IfICmpNe,
    IfICmpLt,
    IfICmpLe,
    IfICmpGt,
    IfICmpGe,
    IfACmpEq,
    IfACmpNe,
    IfNull,
    IfNonNull,
}

/// Three-way compares for wide and floating operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpKind {
    /// `lcmp`
    Long,
    /// `fcmpg`
    FloatG,
    /// `fcmpl`
    FloatL,
    /// `dcmpg`
    DoubleG,
    /// `dcmpl`
    DoubleL,
}

/// Arithmetic/bitwise instruction ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathInsn {
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

/// Invocation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeInsn {
    Virtual,
    Static,
    Special,
    Interface,
}

/// One abstract instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Insn {
    PushInt(i32),
    PushLong(i64),
    PushFloat(f32),
    PushDouble(f64),
    PushString(String),
    PushClass(String),
    PushNull,

    Load { kind: ValueKind, slot: u16 },
    Store { kind: ValueKind, slot: u16 },

    Math { op: MathInsn, kind: ValueKind },
    Neg(ValueKind),
    Convert { from: NumKind, to: NumKind },
    Cmp(CmpKind),

    Jump { cond: JumpCond, target: Label },
    TableSwitch {
        min: i32,
        default: Label,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },

    GetField {
        owner: String,
        name: String,
        desc: String,
        is_static: bool,
    },
    PutField {
        owner: String,
        name: String,
        desc: String,
        is_static: bool,
    },
    Invoke {
        kind: InvokeInsn,
        owner: String,
        name: String,
        desc: String,
    },
    New(String),

    NewArray {
        /// Component type descriptor.
        component: String,
    },
    ArrayLoad(ValueKind),
    ArrayStore(ValueKind),
    ArrayLength,

    CheckCast(String),
    InstanceOf(String),

    Dup,
    DupX1,
    Pop,
    Pop2,

    /// `None` returns void.
    Return(Option<ValueKind>),
    Athrow,
}

impl Insn {
    /// Whether control never falls through this instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Insn::Return(_)
                | Insn::Athrow
                | Insn::Jump {
                    cond: JumpCond::Goto,
                    ..
                }
                | Insn::TableSwitch { .. }
                | Insn::LookupSwitch { .. }
        )
    }
}
