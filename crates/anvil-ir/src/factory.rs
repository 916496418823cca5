//! Convenience constructors for instruction nodes.
//!
//! The desugaring transforms in the backend rewrite high-level constructs
//! into simpler trees; these helpers keep those rewrites readable.

use crate::instr::{BoolTerm, Check, Instruction, Invocation, Literal, NewInstance};
use crate::op::{CompareOp, InvokeKind};
use crate::types::{TypeRef, TypeSpec};

pub fn int(value: i32) -> Instruction {
    Instruction::Literal(Literal::Int(value))
}

pub fn string(value: impl Into<String>) -> Instruction {
    Instruction::Literal(Literal::String(value.into()))
}

pub fn null() -> Instruction {
    Instruction::Literal(Literal::Null)
}

pub fn declare_var(
    name: impl Into<String>,
    var_type: TypeRef,
    value: Instruction,
) -> Instruction {
    Instruction::DeclareVariable {
        name: name.into(),
        var_type,
        value: Box::new(value),
    }
}

pub fn access_var(name: impl Into<String>, var_type: TypeRef) -> Instruction {
    Instruction::AccessVariable {
        name: name.into(),
        var_type,
    }
}

pub fn set_var(name: impl Into<String>, var_type: TypeRef, value: Instruction) -> Instruction {
    Instruction::SetVariable {
        name: name.into(),
        var_type,
        value: Box::new(value),
    }
}

/// A single comparison term.
pub fn check(left: Instruction, op: CompareOp, right: Instruction) -> BoolTerm {
    BoolTerm::Check(Check {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

/// Condition testing a boolean-valued expression for truth.
pub fn truthy(expr: Instruction) -> Vec<BoolTerm> {
    vec![check(
        expr,
        CompareOp::Eq,
        Instruction::Literal(Literal::Bool(true)),
    )]
}

/// Condition testing an expression against `null`.
pub fn not_null(expr: Instruction) -> Vec<BoolTerm> {
    vec![check(expr, CompareOp::Ne, null())]
}

pub fn invoke_virtual(
    owner: TypeRef,
    target: Instruction,
    name: impl Into<String>,
    spec: TypeSpec,
    args: Vec<Instruction>,
) -> Instruction {
    Instruction::Invoke(Invocation {
        kind: InvokeKind::Virtual,
        owner,
        name: name.into(),
        spec,
        target: Some(Box::new(target)),
        args,
    })
}

pub fn invoke_interface(
    owner: TypeRef,
    target: Instruction,
    name: impl Into<String>,
    spec: TypeSpec,
    args: Vec<Instruction>,
) -> Instruction {
    Instruction::Invoke(Invocation {
        kind: InvokeKind::Interface,
        owner,
        name: name.into(),
        spec,
        target: Some(Box::new(target)),
        args,
    })
}

pub fn invoke_static(
    owner: TypeRef,
    name: impl Into<String>,
    spec: TypeSpec,
    args: Vec<Instruction>,
) -> Instruction {
    Instruction::Invoke(Invocation {
        kind: InvokeKind::Static,
        owner,
        name: name.into(),
        spec,
        target: None,
        args,
    })
}

pub fn new_instance(owner: TypeRef, params: Vec<TypeRef>, args: Vec<Instruction>) -> Instruction {
    Instruction::New(NewInstance {
        owner,
        spec: TypeSpec::new(TypeRef::VOID, params),
        args,
    })
}

pub fn access_static_field(
    owner: TypeRef,
    field_type: TypeRef,
    name: impl Into<String>,
) -> Instruction {
    Instruction::AccessField {
        owner,
        target: None,
        field_type,
        name: name.into(),
    }
}

pub fn set_static_field(
    owner: TypeRef,
    field_type: TypeRef,
    name: impl Into<String>,
    value: Instruction,
) -> Instruction {
    Instruction::SetField {
        owner,
        target: None,
        field_type,
        name: name.into(),
        value: Box::new(value),
    }
}

pub fn array_length(array_type: TypeRef, target: Instruction) -> Instruction {
    Instruction::ArrayLength {
        array_type,
        target: Box::new(target),
    }
}

pub fn access_array(
    array_type: TypeRef,
    target: Instruction,
    index: Instruction,
    value_type: TypeRef,
) -> Instruction {
    Instruction::ArrayLoad {
        array_type,
        target: Box::new(target),
        index: Box::new(index),
        value_type,
    }
}

pub fn set_array(
    array_type: TypeRef,
    target: Instruction,
    index: Instruction,
    value_type: TypeRef,
    value: Instruction,
) -> Instruction {
    Instruction::ArrayStore {
        array_type,
        target: Box::new(target),
        index: Box::new(index),
        value_type,
        value: Box::new(value),
    }
}

pub fn cast(from: TypeRef, to: TypeRef, value: Instruction) -> Instruction {
    Instruction::Cast {
        from,
        to,
        value: Box::new(value),
    }
}

pub fn if_stmt(
    cond: Vec<BoolTerm>,
    then_body: Vec<Instruction>,
    else_body: Vec<Instruction>,
) -> Instruction {
    Instruction::If {
        cond,
        then_body,
        else_body,
    }
}

pub fn return_value(value: Instruction) -> Instruction {
    Instruction::Return {
        value: Some(Box::new(value)),
    }
}

pub fn return_void() -> Instruction {
    Instruction::Return { value: None }
}

pub fn throw(value: Instruction) -> Instruction {
    Instruction::Throw(Box::new(value))
}
