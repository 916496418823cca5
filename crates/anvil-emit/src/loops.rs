//! Loop lowering.
//!
//! All four loop forms reduce to marks, conditional branches and a back
//! edge. Foreach desugars to a plain for loop over either array indexing
//! or the iterator protocol and re-enters the dispatcher.

use crate::compiler::{Elem, MethodCompiler};
use crate::context::{Flow, FlowKind};
use crate::error::EmitResult;
use anvil_bytecode::{Insn, JumpCond, MethodSink};
use anvil_ir::op::{CompareOp, MathOp};
use anvil_ir::{factory, BoolTerm, ForEachIteration, Instruction, TypeRef};

impl<'c, M: MethodSink> MethodCompiler<'c, M> {
    pub(crate) fn compile_while(
        &mut self,
        cond: &[BoolTerm],
        body: &[Instruction],
    ) -> EmitResult<()> {
        let label = self.pending_label.take();
        let outside_start = self.sink.new_label();
        let test = self.sink.new_label();
        let l_body = self.sink.new_label();
        let outside_end = self.sink.new_label();
        let order = self.ctx.next_order();

        self.sink.mark(outside_start);
        self.sink.mark(test);
        self.ctx.flows.push(Flow {
            label,
            kind: FlowKind::Loop,
            outside_start,
            inside_start: test,
            // continue re-tests the condition
            inside_end: test,
            outside_end,
            creation_order: order,
        });

        let result = (|| {
            self.compile_condition(cond, l_body, outside_end)?;
            self.sink.mark(l_body);
            self.enter_scope();
            self.process_body(body)?;
            self.exit_scope()?;
            self.emit(Insn::Jump {
                cond: JumpCond::Goto,
                target: test,
            });
            Ok(())
        })();
        self.ctx.flows.pop();
        result?;

        self.sink.mark(outside_end);
        Ok(())
    }

    pub(crate) fn compile_do_while(
        &mut self,
        cond: &[BoolTerm],
        body: &[Instruction],
    ) -> EmitResult<()> {
        let label = self.pending_label.take();
        let body_start = self.sink.new_label();
        let test = self.sink.new_label();
        let outside_end = self.sink.new_label();
        let order = self.ctx.next_order();

        self.sink.mark(body_start);
        self.ctx.flows.push(Flow {
            label,
            kind: FlowKind::Loop,
            outside_start: body_start,
            inside_start: body_start,
            inside_end: test,
            outside_end,
            creation_order: order,
        });

        let result = (|| {
            self.enter_scope();
            self.process_body(body)?;
            self.exit_scope()?;
            self.sink.mark(test);
            self.compile_condition_backjump(cond, body_start, outside_end)
        })();
        self.ctx.flows.pop();
        result?;

        self.sink.mark(outside_end);
        Ok(())
    }

    pub(crate) fn compile_for(
        &mut self,
        init: &[Instruction],
        cond: &[BoolTerm],
        update: &[Instruction],
        body: &[Instruction],
    ) -> EmitResult<()> {
        let label = self.pending_label.take();
        let outside_start = self.sink.new_label();
        self.sink.mark(outside_start);

        // Init declarations live in their own scope around the whole loop.
        self.enter_scope();
        self.process_body(init)?;

        let test = self.sink.new_label();
        let l_body = self.sink.new_label();
        let update_label = self.sink.new_label();
        let outside_end = self.sink.new_label();
        let order = self.ctx.next_order();

        self.sink.mark(test);
        self.ctx.flows.push(Flow {
            label,
            kind: FlowKind::Loop,
            outside_start,
            inside_start: test,
            // continue runs the update section, not the init
            inside_end: update_label,
            outside_end,
            creation_order: order,
        });

        let result = (|| {
            self.compile_condition(cond, l_body, outside_end)?;
            self.sink.mark(l_body);
            self.enter_scope();
            let mut elems: Vec<Elem<'_, 'c, M>> = body.iter().map(Elem::Node).collect();
            elems.push(Elem::Cont(Box::new(move |c: &mut MethodCompiler<'c, M>| {
                c.sink.mark(update_label);
                c.process_body(update)
            })));
            self.process_elements(elems)?;
            self.exit_scope()?;
            self.emit(Insn::Jump {
                cond: JumpCond::Goto,
                target: test,
            });
            Ok(())
        })();
        self.ctx.flows.pop();
        result?;

        self.sink.mark(outside_end);
        self.exit_scope()?;
        Ok(())
    }

    pub(crate) fn compile_foreach(
        &mut self,
        var_name: &str,
        var_type: &TypeRef,
        iterable: &Instruction,
        iterable_type: &TypeRef,
        iteration: &ForEachIteration,
        body: &[Instruction],
    ) -> EmitResult<()> {
        let desugared = match iteration {
            ForEachIteration::Array => {
                self.desugar_array_foreach(var_name, var_type, iterable, iterable_type, body)
            }
            ForEachIteration::Iterable {
                iterator_owner,
                iterator_method,
                iterator_type,
                has_next,
                next,
                next_ret,
            } => self.desugar_iterator_foreach(
                var_name,
                var_type,
                iterable,
                iterator_owner,
                iterator_method,
                iterator_type,
                has_next,
                next,
                next_ret,
                body,
            ),
        };
        self.process_stmt(&desugared)
    }

    fn desugar_array_foreach(
        &mut self,
        var_name: &str,
        var_type: &TypeRef,
        iterable: &Instruction,
        iterable_type: &TypeRef,
        body: &[Instruction],
    ) -> Instruction {
        let arr = self.locals.unique_name("#arr_");
        let idx = self.locals.unique_name("#idx_");
        let component = match iterable_type {
            TypeRef::Array(c) => c.as_ref().clone(),
            other => other.clone(),
        };

        let mut element = factory::access_array(
            iterable_type.clone(),
            factory::access_var(&arr, iterable_type.clone()),
            factory::access_var(&idx, TypeRef::INT),
            component.clone(),
        );
        if &component != var_type {
            element = factory::cast(component, var_type.clone(), element);
        }

        let mut loop_body = vec![factory::declare_var(var_name, var_type.clone(), element)];
        loop_body.extend_from_slice(body);

        Instruction::For {
            init: vec![
                factory::declare_var(&arr, iterable_type.clone(), iterable.clone()),
                factory::declare_var(&idx, TypeRef::INT, factory::int(0)),
            ],
            cond: vec![factory::check(
                factory::access_var(&idx, TypeRef::INT),
                CompareOp::Lt,
                factory::array_length(
                    iterable_type.clone(),
                    factory::access_var(&arr, iterable_type.clone()),
                ),
            )],
            update: vec![factory::set_var(
                &idx,
                TypeRef::INT,
                Instruction::Operate {
                    op: MathOp::Add,
                    operand_type: TypeRef::INT,
                    left: Box::new(factory::access_var(&idx, TypeRef::INT)),
                    right: Box::new(factory::int(1)),
                },
            )],
            body: loop_body,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn desugar_iterator_foreach(
        &mut self,
        var_name: &str,
        var_type: &TypeRef,
        iterable: &Instruction,
        iterator_owner: &TypeRef,
        iterator_method: &str,
        iterator_type: &TypeRef,
        has_next: &str,
        next: &str,
        next_ret: &TypeRef,
        body: &[Instruction],
    ) -> Instruction {
        let it = self.locals.unique_name("#iter_");

        let mut element = factory::invoke_interface(
            iterator_type.clone(),
            factory::access_var(&it, iterator_type.clone()),
            next,
            anvil_ir::TypeSpec::new(next_ret.clone(), vec![]),
            vec![],
        );
        if next_ret != var_type {
            element = factory::cast(next_ret.clone(), var_type.clone(), element);
        }

        let mut loop_body = vec![factory::declare_var(var_name, var_type.clone(), element)];
        loop_body.extend_from_slice(body);

        Instruction::For {
            init: vec![factory::declare_var(
                &it,
                iterator_type.clone(),
                factory::invoke_interface(
                    iterator_owner.clone(),
                    iterable.clone(),
                    iterator_method,
                    anvil_ir::TypeSpec::new(iterator_type.clone(), vec![]),
                    vec![],
                ),
            )],
            cond: factory::truthy(factory::invoke_interface(
                iterator_type.clone(),
                factory::access_var(&it, iterator_type.clone()),
                has_next,
                anvil_ir::TypeSpec::new(TypeRef::BOOLEAN, vec![]),
                vec![],
            )),
            update: vec![],
            body: loop_body,
        }
    }
}
