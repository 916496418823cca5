//! The instruction tree
//!
//! A closed union of every IR node the backend understands. The enum being
//! closed means dispatch over node kinds is an exhaustive `match`: an
//! unhandled kind is a compile error in the backend, not a runtime lookup
//! failure.

use crate::op::{CompareOp, InvokeKind, LogicOp, MathOp, UnaryOp};
use crate::types::{TypeRef, TypeSpec};
use serde::{Deserialize, Serialize};

/// Constant values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Class(TypeRef),
}

impl Literal {
    pub fn type_ref(&self) -> TypeRef {
        match self {
            Literal::Null => TypeRef::object(),
            Literal::Bool(_) => TypeRef::BOOLEAN,
            Literal::Int(_) => TypeRef::INT,
            Literal::Long(_) => TypeRef::LONG,
            Literal::Float(_) => TypeRef::FLOAT,
            Literal::Double(_) => TypeRef::DOUBLE,
            Literal::Char(_) => TypeRef::CHAR,
            Literal::String(_) => TypeRef::string(),
            Literal::Class(_) => TypeRef::reference("java/lang/Class"),
        }
    }
}

/// One term of a boolean condition.
///
/// A condition is a flat list of terms joined by [`LogicOp`]s, with `Group`
/// standing in for parenthesized sub-conditions. Well-formedness (terms and
/// joiners alternating) is the producer's responsibility and is not
/// validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoolTerm {
    Check(Check),
    Group(Vec<BoolTerm>),
    Join(LogicOp),
}

/// A single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub left: Box<Instruction>,
    pub op: CompareOp,
    pub right: Box<Instruction>,
}

/// A method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub kind: InvokeKind,
    pub owner: TypeRef,
    pub name: String,
    pub spec: TypeSpec,
    /// Receiver; `None` for static invocations.
    pub target: Option<Box<Instruction>>,
    pub args: Vec<Instruction>,
}

/// `new T(args)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstance {
    pub owner: TypeRef,
    /// Constructor parameter types; the return type is always `void`.
    pub spec: TypeSpec,
    pub args: Vec<Instruction>,
}

/// How a foreach statement walks its iterable. Method names and types for
/// the iterator protocol arrive already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForEachIteration {
    Array,
    Iterable {
        iterator_owner: TypeRef,
        iterator_method: String,
        iterator_type: TypeRef,
        has_next: String,
        next: String,
        next_ret: TypeRef,
    },
}

impl ForEachIteration {
    /// The standard `java.lang.Iterable` protocol.
    pub fn iterable() -> Self {
        ForEachIteration::Iterable {
            iterator_owner: TypeRef::reference("java/lang/Iterable"),
            iterator_method: "iterator".to_string(),
            iterator_type: TypeRef::reference("java/util/Iterator"),
            has_next: "hasNext".to_string(),
            next: "next".to_string(),
            next_ret: TypeRef::object(),
        }
    }
}

/// One arm of a switch. `value: None` marks the default arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Option<CaseValue>,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseValue {
    Int(i32),
    /// Enum constant name, only valid in enum switches.
    EnumName(String),
}

/// A catch clause: exception types sharing one handler, the variable the
/// exception is bound to, and the handler body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub exception_types: Vec<TypeRef>,
    pub var_name: String,
    pub body: Vec<Instruction>,
}

/// The closed instruction union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Literal(Literal),

    DeclareVariable {
        name: String,
        var_type: TypeRef,
        value: Box<Instruction>,
    },
    AccessVariable {
        name: String,
        var_type: TypeRef,
    },
    SetVariable {
        name: String,
        var_type: TypeRef,
        value: Box<Instruction>,
    },
    AccessThis,

    AccessField {
        owner: TypeRef,
        /// `None` for static fields.
        target: Option<Box<Instruction>>,
        field_type: TypeRef,
        name: String,
    },
    SetField {
        owner: TypeRef,
        target: Option<Box<Instruction>>,
        field_type: TypeRef,
        name: String,
        value: Box<Instruction>,
    },

    Invoke(Invocation),
    New(NewInstance),
    /// `super(args)` in a constructor body. Only legal as the first
    /// statement.
    SuperConstructorCall {
        spec: TypeSpec,
        args: Vec<Instruction>,
    },
    /// `this(args)` in a constructor body. Only legal as the first
    /// statement.
    ThisConstructorCall {
        spec: TypeSpec,
        args: Vec<Instruction>,
    },

    NewArray {
        array_type: TypeRef,
        dims: Vec<Instruction>,
        /// Optional initializer values for a single-dimension array.
        values: Vec<Instruction>,
    },
    ArrayLoad {
        array_type: TypeRef,
        target: Box<Instruction>,
        index: Box<Instruction>,
        value_type: TypeRef,
    },
    ArrayStore {
        array_type: TypeRef,
        target: Box<Instruction>,
        index: Box<Instruction>,
        value_type: TypeRef,
        value: Box<Instruction>,
    },
    ArrayLength {
        array_type: TypeRef,
        target: Box<Instruction>,
    },

    Cast {
        from: TypeRef,
        to: TypeRef,
        value: Box<Instruction>,
    },
    InstanceOf {
        value: Box<Instruction>,
        check_type: TypeRef,
    },
    Operate {
        op: MathOp,
        operand_type: TypeRef,
        left: Box<Instruction>,
        right: Box<Instruction>,
    },
    UnaryOperate {
        op: UnaryOp,
        operand_type: TypeRef,
        value: Box<Instruction>,
    },

    If {
        cond: Vec<BoolTerm>,
        then_body: Vec<Instruction>,
        else_body: Vec<Instruction>,
    },
    /// Ternary conditional producing a value.
    IfExpr {
        cond: Vec<BoolTerm>,
        value_type: TypeRef,
        if_true: Box<Instruction>,
        if_false: Box<Instruction>,
    },
    While {
        cond: Vec<BoolTerm>,
        body: Vec<Instruction>,
    },
    DoWhile {
        cond: Vec<BoolTerm>,
        body: Vec<Instruction>,
    },
    For {
        init: Vec<Instruction>,
        cond: Vec<BoolTerm>,
        update: Vec<Instruction>,
        body: Vec<Instruction>,
    },
    ForEach {
        var_name: String,
        var_type: TypeRef,
        iterable: Box<Instruction>,
        iterable_type: TypeRef,
        iteration: ForEachIteration,
        body: Vec<Instruction>,
    },
    Switch {
        value: Box<Instruction>,
        /// `Some(enum type)` turns this into a switch over enum constants.
        enum_type: Option<TypeRef>,
        cases: Vec<SwitchCase>,
    },

    Try {
        body: Vec<Instruction>,
        catches: Vec<CatchClause>,
        finally: Vec<Instruction>,
    },
    TryWithResources {
        resource_name: String,
        resource_type: TypeRef,
        resource_init: Box<Instruction>,
        body: Vec<Instruction>,
        catches: Vec<CatchClause>,
        finally: Vec<Instruction>,
    },

    Labeled {
        label: String,
        body: Vec<Instruction>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return {
        value: Option<Box<Instruction>>,
    },
    Throw(Box<Instruction>),

    /// Source line marker; emits a line-number entry.
    Line(u16),
}

impl Instruction {
    /// The type of the value this node leaves on the operand stack, or
    /// `None` for statements that produce nothing.
    pub fn result_type(&self) -> Option<TypeRef> {
        match self {
            Instruction::Literal(lit) => Some(lit.type_ref()),
            Instruction::AccessVariable { var_type, .. } => Some(var_type.clone()),
            Instruction::SetVariable { .. } => None,
            Instruction::AccessThis => Some(TypeRef::object()),
            Instruction::AccessField { field_type, .. } => Some(field_type.clone()),
            Instruction::Invoke(inv) => {
                if inv.spec.ret.is_void() {
                    None
                } else {
                    Some(inv.spec.ret.clone())
                }
            }
            Instruction::New(new) => Some(new.owner.clone()),
            Instruction::NewArray { array_type, .. } => Some(array_type.clone()),
            Instruction::ArrayLoad { value_type, .. } => Some(value_type.clone()),
            Instruction::ArrayLength { .. } => Some(TypeRef::INT),
            Instruction::Cast { to, .. } => Some(to.clone()),
            Instruction::InstanceOf { .. } => Some(TypeRef::BOOLEAN),
            Instruction::Operate { operand_type, .. } => Some(operand_type.clone()),
            Instruction::UnaryOperate { operand_type, .. } => Some(operand_type.clone()),
            Instruction::IfExpr { value_type, .. } => Some(value_type.clone()),
            _ => None,
        }
    }

    /// Whether this node is the `null` literal, which gets dedicated branch
    /// opcodes in comparisons.
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Instruction::Literal(Literal::Null))
    }

    /// Whether this node is a boolean literal.
    pub fn bool_literal(&self) -> Option<bool> {
        match self {
            Instruction::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}
