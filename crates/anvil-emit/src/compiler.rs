//! The method-body dispatch engine.
//!
//! One [`MethodCompiler`] per method body. Dispatch is an exhaustive match
//! over the instruction union; control-flow lowering lives in the sibling
//! modules (`branch`, `loops`, `switches`, `tryblock`) as further impl
//! blocks on the same type.

use crate::context::{CompilationContext, FlowKind};
use crate::error::{EmitError, EmitResult};
use crate::frame::LocalTable;
use anvil_bytecode::{Insn, InvokeInsn, Label, MathInsn, MethodSink, NumKind, ValueKind};
use anvil_ir::op::{InvokeKind, MathOp, UnaryOp};
use anvil_ir::types::Primitive;
use anvil_ir::{Instruction, Invocation, Literal, NewInstance, TypeRef, TypeSpec};

/// Operand category for a type.
pub(crate) fn value_kind(t: &TypeRef) -> ValueKind {
    match t {
        TypeRef::Primitive(Primitive::Long) => ValueKind::Long,
        TypeRef::Primitive(Primitive::Float) => ValueKind::Float,
        TypeRef::Primitive(Primitive::Double) => ValueKind::Double,
        TypeRef::Primitive(_) => ValueKind::Int,
        TypeRef::Reference(_) | TypeRef::Array(_) => ValueKind::Ref,
    }
}

fn math_insn(op: MathOp) -> MathInsn {
    match op {
        MathOp::Add => MathInsn::Add,
        MathOp::Sub => MathInsn::Sub,
        MathOp::Mul => MathInsn::Mul,
        MathOp::Div => MathInsn::Div,
        MathOp::Rem => MathInsn::Rem,
        MathOp::Shl => MathInsn::Shl,
        MathOp::Shr => MathInsn::Shr,
        MathOp::Ushr => MathInsn::Ushr,
        MathOp::And => MathInsn::And,
        MathOp::Or => MathInsn::Or,
        MathOp::Xor => MathInsn::Xor,
    }
}

fn invoke_insn(kind: InvokeKind) -> InvokeInsn {
    match kind {
        InvokeKind::Virtual => InvokeInsn::Virtual,
        InvokeKind::Static => InvokeInsn::Static,
        InvokeKind::Special => InvokeInsn::Special,
        InvokeKind::Interface => InvokeInsn::Interface,
    }
}

/// The `int`, `long`, `float` or `double` a primitive computes as.
fn main_num_kind(p: Primitive) -> NumKind {
    match p {
        Primitive::Long => NumKind::Long,
        Primitive::Float => NumKind::Float,
        Primitive::Double => NumKind::Double,
        _ => NumKind::Int,
    }
}

/// A deferred piece of body processing, spliced into a rebuilt statement
/// sequence. Used where a desugared construct needs generated code between
/// or after user statements (a for loop's update section, for instance).
pub(crate) type Cont<'a, 'c, M> =
    Box<dyn FnOnce(&mut MethodCompiler<'c, M>) -> EmitResult<()> + 'a>;

pub(crate) enum Elem<'a, 'c, M: MethodSink> {
    Node(&'a Instruction),
    Cont(Cont<'a, 'c, M>),
}

pub struct MethodCompiler<'c, M: MethodSink> {
    pub(crate) sink: &'c mut M,
    pub(crate) ctx: &'c mut CompilationContext,
    pub(crate) locals: LocalTable,
    pub(crate) return_type: TypeRef,
    pub(crate) visit_lines: bool,
    /// Set by the type compiler while the first constructor statement is
    /// processed; super/this calls anywhere else are rejected.
    pub(crate) ctor_call_allowed: bool,
    /// Label carried from a `Labeled` wrapper into the flow the wrapped
    /// loop or switch creates.
    pub(crate) pending_label: Option<String>,
}

impl<'c, M: MethodSink> MethodCompiler<'c, M> {
    pub fn new(
        sink: &'c mut M,
        ctx: &'c mut CompilationContext,
        return_type: TypeRef,
        visit_lines: bool,
    ) -> Self {
        ctx.begin_method();
        Self {
            sink,
            ctx,
            locals: LocalTable::new(),
            return_type,
            visit_lines,
            ctor_call_allowed: false,
            pending_label: None,
        }
    }

    pub(crate) fn emit(&mut self, insn: Insn) {
        self.sink.emit(insn);
    }

    /// Run `f` one expression level deeper. The depth decides whether an
    /// unused value gets popped; it is restored on error paths too.
    pub(crate) fn in_expression<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> EmitResult<T>,
    ) -> EmitResult<T> {
        self.ctx.expression_depth += 1;
        let result = f(self);
        self.ctx.expression_depth -= 1;
        result
    }

    /// Process a node whose value is consumed.
    pub(crate) fn process_value(&mut self, node: &Instruction) -> EmitResult<()> {
        self.in_expression(|c| c.process(node))
    }

    /// Process a node in statement position, discarding an unused value.
    pub(crate) fn process_stmt(&mut self, node: &Instruction) -> EmitResult<()> {
        self.process(node)?;
        if self.ctx.expression_depth == 0 {
            if let Some(t) = node.result_type() {
                self.emit(if t.is_wide() { Insn::Pop2 } else { Insn::Pop });
            }
        }
        Ok(())
    }

    pub(crate) fn process_body(&mut self, body: &[Instruction]) -> EmitResult<()> {
        for node in body {
            self.process_stmt(node)?;
        }
        Ok(())
    }

    pub(crate) fn process_elements(&mut self, elems: Vec<Elem<'_, 'c, M>>) -> EmitResult<()> {
        for elem in elems {
            match elem {
                Elem::Node(node) => self.process_stmt(node)?,
                Elem::Cont(f) => f(self)?,
            }
        }
        Ok(())
    }

    /// Open a child variable frame. The returned label must reach
    /// [`Self::exit_scope`] unmarked.
    pub(crate) fn enter_scope(&mut self) {
        let end = self.sink.new_label();
        self.locals.enter_frame(end);
    }

    pub(crate) fn exit_scope(&mut self) -> EmitResult<()> {
        let end = self.locals.exit_frame()?;
        self.sink.mark(end);
        Ok(())
    }

    /// Run pending finally blocks for an abrupt exit. `after_order`
    /// restricts the splice to try statements entered after the jump
    /// target's flow was created; `None` runs every pending block.
    pub(crate) fn splice_finallys(&mut self, after_order: Option<u64>) -> EmitResult<()> {
        let pending: Vec<usize> = self
            .ctx
            .finally_stack
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, f)| {
                f.active && after_order.map_or(true, |order| f.creation_order > order)
            })
            .map(|(i, _)| i)
            .collect();
        for i in pending {
            self.ctx.finally_stack[i].active = false;
            let body = self.ctx.finally_stack[i].body.clone();
            let result = self.process_body(&body);
            self.ctx.finally_stack[i].active = true;
            result?;
        }
        Ok(())
    }

    /// Dispatch over the closed instruction union.
    pub fn process(&mut self, node: &Instruction) -> EmitResult<()> {
        match node {
            Instruction::Literal(lit) => {
                self.push_literal(lit);
                Ok(())
            }

            Instruction::DeclareVariable {
                name,
                var_type,
                value,
            } => {
                let start = self.sink.new_label();
                self.process_value(value)?;
                let slot = self.locals.store_var(name, var_type.clone(), start)?;
                self.emit(Insn::Store {
                    kind: value_kind(var_type),
                    slot,
                });
                self.sink.mark(start);
                Ok(())
            }

            Instruction::AccessVariable { name, var_type } => {
                let slot = self.lookup_var(name, var_type)?;
                self.emit(Insn::Load {
                    kind: value_kind(var_type),
                    slot,
                });
                Ok(())
            }

            Instruction::SetVariable {
                name,
                var_type,
                value,
            } => {
                self.process_value(value)?;
                let slot = self.lookup_var(name, var_type)?;
                self.emit(Insn::Store {
                    kind: value_kind(var_type),
                    slot,
                });
                Ok(())
            }

            Instruction::AccessThis => {
                self.emit(Insn::Load {
                    kind: ValueKind::Ref,
                    slot: 0,
                });
                Ok(())
            }

            Instruction::AccessField {
                owner,
                target,
                field_type,
                name,
            } => {
                if let Some(target) = target {
                    self.process_value(target)?;
                }
                self.emit(Insn::GetField {
                    owner: owner.internal_name(),
                    name: name.clone(),
                    desc: field_type.descriptor(),
                    is_static: target.is_none(),
                });
                Ok(())
            }

            Instruction::SetField {
                owner,
                target,
                field_type,
                name,
                value,
            } => {
                if let Some(target) = target {
                    self.process_value(target)?;
                }
                self.process_value(value)?;
                self.emit(Insn::PutField {
                    owner: owner.internal_name(),
                    name: name.clone(),
                    desc: field_type.descriptor(),
                    is_static: target.is_none(),
                });
                Ok(())
            }

            Instruction::Invoke(inv) => self.compile_invocation(inv),
            Instruction::New(new) => self.compile_new(new),

            Instruction::SuperConstructorCall { spec, args } => {
                let owner = self.ctx.superclass.clone();
                self.compile_ctor_call(&owner, spec, args)
            }
            Instruction::ThisConstructorCall { spec, args } => {
                let owner = self.ctx.type_name.clone();
                self.compile_ctor_call(&owner, spec, args)
            }

            Instruction::NewArray {
                array_type,
                dims,
                values,
            } => self.compile_new_array(array_type, dims, values),

            Instruction::ArrayLoad {
                target,
                index,
                value_type,
                ..
            } => {
                self.process_value(target)?;
                self.process_value(index)?;
                self.emit(Insn::ArrayLoad(value_kind(value_type)));
                Ok(())
            }

            Instruction::ArrayStore {
                target,
                index,
                value_type,
                value,
                ..
            } => {
                self.process_value(target)?;
                self.process_value(index)?;
                self.process_value(value)?;
                self.emit(Insn::ArrayStore(value_kind(value_type)));
                Ok(())
            }

            Instruction::ArrayLength { target, .. } => {
                self.process_value(target)?;
                self.emit(Insn::ArrayLength);
                Ok(())
            }

            Instruction::Cast { from, to, value } => {
                self.process_value(value)?;
                self.compile_cast(from, to)
            }

            Instruction::InstanceOf { value, check_type } => {
                self.process_value(value)?;
                self.emit(Insn::InstanceOf(check_type.internal_name()));
                Ok(())
            }

            Instruction::Operate {
                op,
                operand_type,
                left,
                right,
            } => {
                self.process_value(left)?;
                self.process_value(right)?;
                self.emit(Insn::Math {
                    op: math_insn(*op),
                    kind: value_kind(operand_type),
                });
                Ok(())
            }

            Instruction::UnaryOperate {
                op,
                operand_type,
                value,
            } => self.compile_unary(*op, operand_type, value),

            Instruction::If {
                cond,
                then_body,
                else_body,
            } => self.compile_if(cond, then_body, else_body),

            Instruction::IfExpr {
                cond,
                if_true,
                if_false,
                ..
            } => self.compile_if_expr(cond, if_true, if_false),

            Instruction::While { cond, body } => self.compile_while(cond, body),
            Instruction::DoWhile { cond, body } => self.compile_do_while(cond, body),
            Instruction::For {
                init,
                cond,
                update,
                body,
            } => self.compile_for(init, cond, update, body),
            Instruction::ForEach {
                var_name,
                var_type,
                iterable,
                iterable_type,
                iteration,
                body,
            } => self.compile_foreach(var_name, var_type, iterable, iterable_type, iteration, body),

            Instruction::Switch {
                value,
                enum_type,
                cases,
            } => self.compile_switch(value, enum_type.as_ref(), cases),

            Instruction::Try {
                body,
                catches,
                finally,
            } => self.compile_try(body, catches, finally),
            Instruction::TryWithResources {
                resource_name,
                resource_type,
                resource_init,
                body,
                catches,
                finally,
            } => self.compile_try_with_resources(
                resource_name,
                resource_type,
                resource_init,
                body,
                catches,
                finally,
            ),

            Instruction::Labeled { label, body } => self.compile_labeled(label, body),

            Instruction::Break { label } => self.compile_break(label.as_deref(), false),
            Instruction::Continue { label } => self.compile_break(label.as_deref(), true),

            Instruction::Return { value } => self.compile_return(value.as_deref()),

            Instruction::Throw(value) => {
                self.process_value(value)?;
                self.emit(Insn::Athrow);
                Ok(())
            }

            Instruction::Line(line) => {
                self.visit_line(*line);
                Ok(())
            }
        }
    }

    fn push_literal(&mut self, lit: &Literal) {
        let insn = match lit {
            Literal::Null => Insn::PushNull,
            Literal::Bool(b) => Insn::PushInt(*b as i32),
            Literal::Int(i) => Insn::PushInt(*i),
            Literal::Long(l) => Insn::PushLong(*l),
            Literal::Float(f) => Insn::PushFloat(*f),
            Literal::Double(d) => Insn::PushDouble(*d),
            Literal::Char(c) => Insn::PushInt(*c as i32),
            Literal::String(s) => Insn::PushString(s.clone()),
            Literal::Class(t) => Insn::PushClass(t.internal_name()),
        };
        self.emit(insn);
    }

    fn lookup_var(&mut self, name: &str, var_type: &TypeRef) -> EmitResult<u16> {
        // Exact (name, type) match first, then by name alone for producers
        // that reference a variable with a widened type.
        if let Some((slot, _)) = self.locals.get_var_by_name(name, Some(var_type)) {
            return Ok(slot);
        }
        if let Some((slot, _)) = self.locals.get_var_by_name(name, None) {
            return Ok(slot);
        }
        Err(EmitError::ScopeLookup {
            name: name.to_string(),
            var_type: Some(var_type.descriptor()),
            snapshot: self.locals.snapshot(),
        })
    }

    fn compile_invocation(&mut self, inv: &Invocation) -> EmitResult<()> {
        if let Some(target) = &inv.target {
            self.process_value(target)?;
        }
        for arg in &inv.args {
            self.process_value(arg)?;
        }
        self.emit(Insn::Invoke {
            kind: invoke_insn(inv.kind),
            owner: inv.owner.internal_name(),
            name: inv.name.clone(),
            desc: inv.spec.descriptor(),
        });
        Ok(())
    }

    fn compile_new(&mut self, new: &NewInstance) -> EmitResult<()> {
        self.emit(Insn::New(new.owner.internal_name()));
        self.emit(Insn::Dup);
        for arg in &new.args {
            self.process_value(arg)?;
        }
        self.emit(Insn::Invoke {
            kind: InvokeInsn::Special,
            owner: new.owner.internal_name(),
            name: "<init>".to_string(),
            desc: new.spec.descriptor(),
        });
        Ok(())
    }

    fn compile_ctor_call(
        &mut self,
        owner: &str,
        spec: &TypeSpec,
        args: &[Instruction],
    ) -> EmitResult<()> {
        if !self.ctor_call_allowed {
            return Err(EmitError::MisplacedConstructorCall);
        }
        self.emit(Insn::Load {
            kind: ValueKind::Ref,
            slot: 0,
        });
        for arg in args {
            self.process_value(arg)?;
        }
        self.emit(Insn::Invoke {
            kind: InvokeInsn::Special,
            owner: owner.to_string(),
            name: "<init>".to_string(),
            desc: spec.descriptor(),
        });
        Ok(())
    }

    fn compile_new_array(
        &mut self,
        array_type: &TypeRef,
        dims: &[Instruction],
        values: &[Instruction],
    ) -> EmitResult<()> {
        let component = match array_type {
            TypeRef::Array(c) => c.as_ref().clone(),
            other => other.clone(),
        };
        match dims.first() {
            Some(dim) => self.process_value(dim)?,
            None => self.emit(Insn::PushInt(values.len() as i32)),
        }
        self.emit(Insn::NewArray {
            component: component.descriptor(),
        });
        let kind = value_kind(&component);
        for (i, value) in values.iter().enumerate() {
            self.emit(Insn::Dup);
            self.emit(Insn::PushInt(i as i32));
            self.process_value(value)?;
            self.emit(Insn::ArrayStore(kind));
        }
        Ok(())
    }

    fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand_type: &TypeRef,
        value: &Instruction,
    ) -> EmitResult<()> {
        self.process_value(value)?;
        let kind = value_kind(operand_type);
        match op {
            UnaryOp::Neg => self.emit(Insn::Neg(kind)),
            UnaryOp::Not => {
                self.emit(Insn::PushInt(1));
                self.emit(Insn::Math {
                    op: MathInsn::Xor,
                    kind: ValueKind::Int,
                });
            }
            UnaryOp::BitNot => {
                if kind == ValueKind::Long {
                    self.emit(Insn::PushLong(-1));
                } else {
                    self.emit(Insn::PushInt(-1));
                }
                self.emit(Insn::Math {
                    op: MathInsn::Xor,
                    kind,
                });
            }
        }
        Ok(())
    }

    /// Cast the value on the stack from `from` to `to`, inserting
    /// conversion, boxing, unboxing or checkcast instructions.
    pub(crate) fn compile_cast(&mut self, from: &TypeRef, to: &TypeRef) -> EmitResult<()> {
        if from == to {
            return Ok(());
        }
        match (from.primitive(), to.primitive()) {
            (Some(f), Some(t)) if f != Primitive::Void && t != Primitive::Void => {
                self.convert_primitive(f, t)
            }
            (Some(f), None) if f != Primitive::Void => {
                // Boxing.
                let wrapper = from.boxed().ok_or_else(|| EmitError::ImpossibleCast {
                    from: from.descriptor(),
                    to: to.descriptor(),
                })?;
                self.emit(Insn::Invoke {
                    kind: InvokeInsn::Static,
                    owner: wrapper.internal_name(),
                    name: "valueOf".to_string(),
                    desc: format!("({}){}", from.descriptor(), wrapper.descriptor()),
                });
                if to != &wrapper && to != &TypeRef::object() {
                    self.emit(Insn::CheckCast(to.internal_name()));
                }
                Ok(())
            }
            (None, Some(t)) if t != Primitive::Void => {
                // Unboxing.
                let wrapper = to.boxed().ok_or_else(|| EmitError::ImpossibleCast {
                    from: from.descriptor(),
                    to: to.descriptor(),
                })?;
                if from != &wrapper {
                    self.emit(Insn::CheckCast(wrapper.internal_name()));
                }
                let name = match t {
                    Primitive::Boolean => "booleanValue",
                    Primitive::Byte => "byteValue",
                    Primitive::Short => "shortValue",
                    Primitive::Char => "charValue",
                    Primitive::Int => "intValue",
                    Primitive::Long => "longValue",
                    Primitive::Float => "floatValue",
                    Primitive::Double => "doubleValue",
                    Primitive::Void => unreachable!(),
                };
                self.emit(Insn::Invoke {
                    kind: InvokeInsn::Virtual,
                    owner: wrapper.internal_name(),
                    name: name.to_string(),
                    desc: format!("(){}", to.descriptor()),
                });
                Ok(())
            }
            (None, None) => {
                self.emit(Insn::CheckCast(to.internal_name()));
                Ok(())
            }
            _ => Err(EmitError::ImpossibleCast {
                from: from.descriptor(),
                to: to.descriptor(),
            }),
        }
    }

    fn convert_primitive(&mut self, from: Primitive, to: Primitive) -> EmitResult<()> {
        if from == Primitive::Boolean || to == Primitive::Boolean {
            return Err(EmitError::ImpossibleCast {
                from: from.descriptor().to_string(),
                to: to.descriptor().to_string(),
            });
        }
        let src = main_num_kind(from);
        match to {
            Primitive::Byte | Primitive::Short | Primitive::Char => {
                if src != NumKind::Int {
                    self.emit(Insn::Convert {
                        from: src,
                        to: NumKind::Int,
                    });
                }
                let narrow = match to {
                    Primitive::Byte => NumKind::Byte,
                    Primitive::Short => NumKind::Short,
                    _ => NumKind::Char,
                };
                self.emit(Insn::Convert {
                    from: NumKind::Int,
                    to: narrow,
                });
            }
            _ => {
                let dst = main_num_kind(to);
                if src != dst {
                    self.emit(Insn::Convert { from: src, to: dst });
                }
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &[anvil_ir::BoolTerm],
        then_body: &[Instruction],
        else_body: &[Instruction],
    ) -> EmitResult<()> {
        let l_true = self.sink.new_label();
        let l_false = self.sink.new_label();
        let l_end = self.sink.new_label();
        self.compile_condition(cond, l_true, l_false)?;
        self.sink.mark(l_true);

        self.enter_scope();
        self.process_body(then_body)?;
        self.exit_scope()?;

        if else_body.is_empty() {
            self.sink.mark(l_false);
        } else {
            self.emit(Insn::Jump {
                cond: anvil_bytecode::JumpCond::Goto,
                target: l_end,
            });
            self.sink.mark(l_false);
            self.enter_scope();
            self.process_body(else_body)?;
            self.exit_scope()?;
        }
        self.sink.mark(l_end);
        Ok(())
    }

    fn compile_if_expr(
        &mut self,
        cond: &[anvil_ir::BoolTerm],
        if_true: &Instruction,
        if_false: &Instruction,
    ) -> EmitResult<()> {
        let l_true = self.sink.new_label();
        let l_false = self.sink.new_label();
        let l_end = self.sink.new_label();
        self.compile_condition(cond, l_true, l_false)?;
        self.sink.mark(l_true);
        self.process_value(if_true)?;
        self.emit(Insn::Jump {
            cond: anvil_bytecode::JumpCond::Goto,
            target: l_end,
        });
        self.sink.mark(l_false);
        self.process_value(if_false)?;
        self.sink.mark(l_end);
        Ok(())
    }

    fn compile_labeled(&mut self, label: &str, body: &[Instruction]) -> EmitResult<()> {
        // A label directly on a loop or switch belongs to that construct's
        // own flow, so continue/break with the label target it correctly.
        if let [single] = body {
            if matches!(
                single,
                Instruction::While { .. }
                    | Instruction::DoWhile { .. }
                    | Instruction::For { .. }
                    | Instruction::ForEach { .. }
                    | Instruction::Switch { .. }
            ) {
                self.pending_label = Some(label.to_string());
                return self.process_stmt(single);
            }
        }

        let start = self.sink.new_label();
        let end = self.sink.new_label();
        let order = self.ctx.next_order();
        self.sink.mark(start);
        self.ctx.flows.push(crate::context::Flow {
            label: Some(label.to_string()),
            kind: FlowKind::Block,
            outside_start: start,
            inside_start: start,
            inside_end: end,
            outside_end: end,
            creation_order: order,
        });
        self.enter_scope();
        let result = self.process_body(body);
        self.ctx.flows.pop();
        result?;
        self.exit_scope()?;
        self.sink.mark(end);
        Ok(())
    }

    fn compile_break(&mut self, label: Option<&str>, continuing: bool) -> EmitResult<()> {
        let flow = self
            .ctx
            .find_flow(label, continuing)
            .ok_or_else(|| EmitError::UnmatchedControlFlow {
                label: label.map(str::to_string),
            })?;
        // continue is only meaningful against a loop; a label on a plain
        // block or switch satisfies break alone.
        if continuing && flow.kind != FlowKind::Loop {
            return Err(EmitError::UnmatchedControlFlow {
                label: label.map(str::to_string),
            });
        }
        self.splice_finallys(Some(flow.creation_order))?;
        let target = if continuing {
            flow.inside_end
        } else {
            flow.outside_end
        };
        self.emit(Insn::Jump {
            cond: anvil_bytecode::JumpCond::Goto,
            target,
        });
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&Instruction>) -> EmitResult<()> {
        match value {
            Some(v) => {
                // The return expression is evaluated before any finally
                // block runs; the value rides out the splice in a temp.
                self.process_value(v)?;
                if self.ctx.finally_stack.iter().any(|f| f.active) {
                    let return_type = self.return_type.clone();
                    let kind = value_kind(&return_type);
                    let start = self.sink.new_label();
                    let name = self.locals.unique_name("#ret_");
                    let slot = self.locals.store_internal_var(&name, return_type, start)?;
                    self.emit(Insn::Store { kind, slot });
                    self.sink.mark(start);
                    self.splice_finallys(None)?;
                    self.emit(Insn::Load { kind, slot });
                }
                self.emit(Insn::Return(Some(value_kind(&self.return_type))));
            }
            None => {
                self.splice_finallys(None)?;
                self.emit(Insn::Return(None));
            }
        }
        Ok(())
    }

    fn visit_line(&mut self, line: u16) {
        if !self.visit_lines || self.ctx.last_line == Some(line) {
            return;
        }
        self.ctx.last_line = Some(line);
        let at = self.sink.new_label();
        self.sink.mark(at);
        self.sink.line(line, at);
    }
}
