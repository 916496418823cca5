//! Try statement lowering.
//!
//! The finally block is duplicated at every exit edge of the protected
//! region: the fallthrough edge, every return and every break/continue that
//! leaves the try. While the body is processed the pending block sits on
//! the finally stack, where abrupt-exit handlers find it.
//!
//! Try-with-resources desugars to the suppression protocol: a hidden
//! throwable records the primary exception, and the close call in the
//! finally either runs bare or feeds `addSuppressed`.

use crate::compiler::MethodCompiler;
use crate::context::FinallyFrame;
use crate::error::EmitResult;
use anvil_bytecode::{Insn, JumpCond, MethodSink, ValueKind};
use anvil_ir::{factory, CatchClause, Instruction, TypeRef, TypeSpec};

impl<'c, M: MethodSink> MethodCompiler<'c, M> {
    pub(crate) fn compile_try(
        &mut self,
        body: &[Instruction],
        catches: &[CatchClause],
        finally: &[Instruction],
    ) -> EmitResult<()> {
        let l_start = self.sink.new_label();
        let l_end = self.sink.new_label();
        let out = self.sink.new_label();

        let handlers: Vec<_> = catches.iter().map(|_| self.sink.new_label()).collect();
        for (clause, handler) in catches.iter().zip(&handlers) {
            for exception in &clause.exception_types {
                self.sink
                    .try_catch(l_start, l_end, *handler, Some(exception.internal_name()));
            }
        }

        let order = self.ctx.next_order();
        self.sink.mark(l_start);
        self.ctx.finally_stack.push(FinallyFrame {
            creation_order: order,
            body: finally.to_vec(),
            active: !finally.is_empty(),
        });
        let body_result = (|| {
            self.enter_scope();
            self.process_body(body)?;
            self.exit_scope()
        })();
        self.ctx.finally_stack.pop();
        body_result?;
        self.sink.mark(l_end);

        // Fallthrough copy of the finally block.
        self.process_body(finally)?;
        self.emit(Insn::Jump {
            cond: JumpCond::Goto,
            target: out,
        });

        for (clause, handler) in catches.iter().zip(&handlers) {
            self.sink.mark(*handler);
            self.enter_scope();

            let var_type = clause
                .exception_types
                .first()
                .cloned()
                .unwrap_or_else(TypeRef::throwable);
            let var_start = self.sink.new_label();
            let slot = self
                .locals
                .store_var(&clause.var_name, var_type, var_start)?;
            self.emit(Insn::Store {
                kind: ValueKind::Ref,
                slot,
            });
            self.sink.mark(var_start);

            // Abrupt exits from the handler run the finally block too.
            let order = self.ctx.next_order();
            self.ctx.finally_stack.push(FinallyFrame {
                creation_order: order,
                body: finally.to_vec(),
                active: !finally.is_empty(),
            });
            let result = self.process_body(&clause.body);
            self.ctx.finally_stack.pop();
            result?;

            self.exit_scope()?;
            self.process_body(finally)?;
            self.emit(Insn::Jump {
                cond: JumpCond::Goto,
                target: out,
            });
        }

        self.sink.mark(out);
        Ok(())
    }

    pub(crate) fn compile_try_with_resources(
        &mut self,
        resource_name: &str,
        resource_type: &TypeRef,
        resource_init: &Instruction,
        body: &[Instruction],
        catches: &[CatchClause],
        finally: &[Instruction],
    ) -> EmitResult<()> {
        let throwable = TypeRef::throwable();
        let primary = self.locals.unique_name("#throwable_");
        let caught = self.locals.unique_name("#caught_");
        let on_close = self.locals.unique_name("#onclose_");

        let resource = || factory::access_var(resource_name, resource_type.clone());
        let close = factory::invoke_interface(
            TypeRef::reference("java/lang/AutoCloseable"),
            resource(),
            "close",
            TypeSpec::void(),
            vec![],
        );

        // Close the resource; if a primary exception is pending, suppress
        // anything close itself throws.
        let guarded_close = factory::if_stmt(
            factory::not_null(resource()),
            vec![factory::if_stmt(
                factory::not_null(factory::access_var(&primary, throwable.clone())),
                vec![Instruction::Try {
                    body: vec![close.clone()],
                    catches: vec![CatchClause {
                        exception_types: vec![throwable.clone()],
                        var_name: on_close.clone(),
                        body: vec![factory::invoke_virtual(
                            throwable.clone(),
                            factory::access_var(&primary, throwable.clone()),
                            "addSuppressed",
                            TypeSpec::new(TypeRef::VOID, vec![throwable.clone()]),
                            vec![factory::access_var(&on_close, throwable.clone())],
                        )],
                    }],
                    finally: vec![],
                }],
                vec![close],
            )],
            vec![],
        );

        // catch (Throwable t) { primary = t; close-with-suppression; throw t; }
        // The close runs explicitly before the rethrow because a throw does
        // not go through the finally splice.
        let record_rethrow = CatchClause {
            exception_types: vec![throwable.clone()],
            var_name: caught.clone(),
            body: vec![
                factory::set_var(
                    &primary,
                    throwable.clone(),
                    factory::access_var(&caught, throwable.clone()),
                ),
                guarded_close.clone(),
                factory::throw(factory::access_var(&caught, throwable.clone())),
            ],
        };

        let inner = Instruction::Try {
            body: body.to_vec(),
            catches: vec![record_rethrow],
            finally: vec![guarded_close],
        };
        let stmts = vec![
            factory::declare_var(resource_name, resource_type.clone(), resource_init.clone()),
            factory::declare_var(&primary, throwable, factory::null()),
            inner,
        ];

        if catches.is_empty() && finally.is_empty() {
            self.enter_scope();
            let result = self.process_body(&stmts);
            result?;
            self.exit_scope()
        } else {
            // User catches and finally wrap the whole protocol.
            self.process_stmt(&Instruction::Try {
                body: stmts,
                catches: catches.to_vec(),
                finally: finally.to_vec(),
            })
        }
    }
}
