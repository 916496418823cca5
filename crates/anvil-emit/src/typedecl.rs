//! Type-declaration compilation: fields, constructors, methods, the merged
//! static initializer, nested types and nest attributes.

use crate::compiler::MethodCompiler;
use crate::context::{CompilationContext, Registries};
use crate::error::{EmitError, EmitResult};
use crate::options::BytecodeOptions;
use crate::{bridge, post, BytecodeClass};
use anvil_bytecode::{
    verify_class, ClassSink, Insn, MethodSink, RecordingClassSink, RecordingMethodSink,
};
use anvil_ir::decl::{access, Parameter, TypeDeclaration, TypeKind};
use anvil_ir::{factory, Instruction, TypeRef, TypeSpec};
use std::rc::Rc;

pub(crate) fn compile_type(
    decl: &TypeDeclaration,
    registries: &Rc<Registries>,
    options: &BytecodeOptions,
    nest_root: &str,
    nest_members: &[String],
    enclosing: Option<&str>,
    out: &mut Vec<BytecodeClass>,
) -> EmitResult<()> {
    let mut decl = if decl.kind == TypeKind::Enum {
        crate::enums::desugar_enum(decl)?
    } else {
        decl.clone()
    };
    if options.generate_bridges {
        let bridges = bridge::synthesize_bridges(&decl);
        decl.methods.extend(bridges);
    }

    let mut ctx = CompilationContext::with_registries(
        decl.name.clone(),
        decl.superclass.internal_name(),
        Rc::clone(registries),
    );

    let mut sink = RecordingClassSink::new();
    let class_access = match decl.kind {
        TypeKind::Interface => decl.modifiers | access::INTERFACE | access::ABSTRACT,
        _ => decl.modifiers | access::SUPER,
    };
    let interfaces: Vec<String> = decl.interfaces.iter().map(|t| t.internal_name()).collect();
    sink.begin_class(
        options.class_version,
        class_access,
        &decl.name,
        decl.signature.as_deref(),
        &decl.superclass.internal_name(),
        &interfaces,
    );
    // Membership is recorded on both sides, as class files expect.
    if let Some(outer) = enclosing {
        sink.visit_inner_class(&decl.name, Some(outer), decl.modifiers);
    }

    // Field initializers move into the constructors (or <clinit>).
    let this_type = decl.type_ref();
    let mut instance_inits = Vec::new();
    let mut static_inits = Vec::new();
    for field in &decl.fields {
        sink.visit_field(
            field.modifiers,
            &field.name,
            &field.field_type.descriptor(),
            field.signature.as_deref(),
        );
        if let Some(value) = &field.value {
            if field.is_static() {
                static_inits.push(factory::set_static_field(
                    this_type.clone(),
                    field.field_type.clone(),
                    &field.name,
                    value.clone(),
                ));
            } else {
                instance_inits.push(Instruction::SetField {
                    owner: this_type.clone(),
                    target: Some(Box::new(Instruction::AccessThis)),
                    field_type: field.field_type.clone(),
                    name: field.name.clone(),
                    value: Box::new(value.clone()),
                });
            }
        }
    }

    let default_ctor;
    let constructors = if decl.constructors.is_empty() && decl.kind != TypeKind::Interface {
        default_ctor = vec![anvil_ir::decl::ConstructorDeclaration::new(vec![], vec![])];
        &default_ctor
    } else {
        &decl.constructors
    };
    for ctor in constructors {
        let mut m = sink.begin_method(ctor.modifiers, "<init>", &ctor.spec().descriptor(), None);
        compile_constructor(&mut m, &mut ctx, options, &this_type, ctor, &instance_inits)?;
        sink.end_method(m);
    }

    for method in &decl.methods {
        let mut m = sink.begin_method(
            method.modifiers,
            &method.name,
            &method.spec().descriptor(),
            method.signature.as_deref(),
        );
        if let Some(body) = &method.body {
            let this = (!method.is_static()).then_some(&this_type);
            compile_method_body(
                &mut m,
                &mut ctx,
                options,
                this,
                &method.params,
                &method.return_type,
                body,
            )?;
        }
        sink.end_method(m);
    }

    if !static_inits.is_empty() || !decl.static_block.is_empty() {
        let mut body = static_inits;
        body.extend(decl.static_block.iter().cloned());
        let mut m = sink.begin_method(access::STATIC, "<clinit>", "()V", None);
        compile_method_body(&mut m, &mut ctx, options, None, &[], &TypeRef::VOID, &body)?;
        sink.end_method(m);
    }

    for inner in &decl.inner_types {
        sink.visit_inner_class(&inner.name, Some(&decl.name), inner.modifiers);
        compile_type(
            inner,
            registries,
            options,
            nest_root,
            nest_members,
            Some(&decl.name),
            out,
        )?;
    }

    if options.use_nest_attributes() && nest_members.len() > 1 {
        if decl.name == nest_root {
            for member in nest_members {
                if member != nest_root {
                    sink.visit_nest_member(member);
                }
            }
        } else {
            sink.visit_nest_host(nest_root);
        }
    }

    if options.optimize_jumps {
        post::optimize_class(&mut sink.class);
    }
    if options.validate {
        if let Err(source) = verify_class(&sink.class) {
            return Err(EmitError::Verification {
                name: decl.name.clone(),
                image: sink.class.encode(),
                source,
            });
        }
    }

    let bytes = sink.finish();
    out.push(BytecodeClass {
        name: decl.name.clone(),
        bytes,
        recorded: sink.class,
    });
    Ok(())
}

fn compile_constructor(
    m: &mut RecordingMethodSink,
    ctx: &mut CompilationContext,
    options: &BytecodeOptions,
    this_type: &TypeRef,
    ctor: &anvil_ir::decl::ConstructorDeclaration,
    instance_inits: &[Instruction],
) -> EmitResult<()> {
    let start = m.new_label();
    m.mark(start);
    let mut compiler = MethodCompiler::new(m, ctx, TypeRef::VOID, options.visit_lines);
    compiler
        .locals
        .store_var("this", this_type.clone(), start)?;
    for param in &ctor.params {
        compiler
            .locals
            .store_var(&param.name, param.param_type.clone(), start)?;
    }

    // The first statement may be an explicit super/this call; otherwise an
    // implicit no-arg super call is emitted. Field initializers run after
    // the super call, but not on the this(...) delegation path.
    let (first, rest) = match ctor.body.first() {
        Some(first @ Instruction::SuperConstructorCall { .. })
        | Some(first @ Instruction::ThisConstructorCall { .. }) => (Some(first), &ctor.body[1..]),
        _ => (None, &ctor.body[..]),
    };
    compiler.ctor_call_allowed = true;
    match first {
        Some(call) => compiler.process(call)?,
        None => compiler.process(&Instruction::SuperConstructorCall {
            spec: TypeSpec::void(),
            args: vec![],
        })?,
    }
    compiler.ctor_call_allowed = false;

    if !matches!(first, Some(Instruction::ThisConstructorCall { .. })) {
        compiler.process_body(instance_inits)?;
    }
    compiler.process_body(rest)?;
    compiler.emit(Insn::Return(None));

    finish_locals(compiler)
}

fn compile_method_body(
    m: &mut RecordingMethodSink,
    ctx: &mut CompilationContext,
    options: &BytecodeOptions,
    this_type: Option<&TypeRef>,
    params: &[Parameter],
    return_type: &TypeRef,
    body: &[Instruction],
) -> EmitResult<()> {
    let start = m.new_label();
    m.mark(start);
    let mut compiler = MethodCompiler::new(m, ctx, return_type.clone(), options.visit_lines);
    if let Some(this_type) = this_type {
        compiler
            .locals
            .store_var("this", this_type.clone(), start)?;
    }
    for param in params {
        compiler
            .locals
            .store_var(&param.name, param.param_type.clone(), start)?;
    }

    compiler.process_body(body)?;
    if return_type.is_void() {
        compiler.emit(Insn::Return(None));
    }

    finish_locals(compiler)
}

/// Close the variable table and emit the debug entries.
fn finish_locals(mut compiler: MethodCompiler<'_, RecordingMethodSink>) -> EmitResult<()> {
    let end = compiler.sink.new_label();
    compiler.sink.mark(end);
    let locals = std::mem::take(&mut compiler.locals);
    for entry in locals.finalize(end) {
        compiler.sink.local_variable(
            &entry.name,
            &entry.var_type.descriptor(),
            None,
            entry.start,
            entry.end,
            entry.slot,
        );
    }
    Ok(())
}
