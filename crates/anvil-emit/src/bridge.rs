//! Bridge method synthesis.
//!
//! The producer supplies the erased signatures of the full supertype
//! closure. For every concrete method that overrides one of them with a
//! narrower (erased) signature, a synthetic bridge with the supertype's
//! signature delegates to the real method, casting arguments on the way in.

use anvil_ir::decl::{access, MethodDeclaration, Parameter, TypeDeclaration};
use anvil_ir::types::MethodSig;
use anvil_ir::{factory, TypeRef};

pub(crate) fn synthesize_bridges(decl: &TypeDeclaration) -> Vec<MethodDeclaration> {
    let mut bridges: Vec<MethodDeclaration> = Vec::new();

    for method in &decl.methods {
        if method.body.is_none()
            || method.is_static()
            || method.is_private()
            || method.modifiers & access::BRIDGE != 0
        {
            continue;
        }
        for sig in &decl.resolved_super_signatures {
            if sig.name != method.name
                || sig.spec.params.len() != method.params.len()
                || sig.spec == method.spec()
                || !erasure_compatible(sig, method)
            {
                continue;
            }
            // Dedup against declared methods and already-queued bridges.
            let clashes = |m: &MethodDeclaration| m.name == sig.name && m.spec() == sig.spec;
            if decl.methods.iter().any(clashes) || bridges.iter().any(clashes) {
                continue;
            }
            bridges.push(build_bridge(decl, sig, method));
        }
    }
    bridges
}

/// Whether `sig` could be the erasure of a supertype declaration that
/// `method` overrides: parameters match exactly or are both references
/// (erased type variables), same for the return type, and void-ness agrees.
fn erasure_compatible(sig: &MethodSig, method: &MethodDeclaration) -> bool {
    let compatible = |wide: &TypeRef, narrow: &TypeRef| {
        wide == narrow || (!wide.is_primitive() && !narrow.is_primitive())
    };
    if sig.spec.ret.is_void() != method.return_type.is_void() {
        return false;
    }
    if !sig.spec.ret.is_void() && !compatible(&sig.spec.ret, &method.return_type) {
        return false;
    }
    sig.spec
        .params
        .iter()
        .zip(method.params.iter())
        .all(|(wide, p)| compatible(wide, &p.param_type))
}

fn build_bridge(
    decl: &TypeDeclaration,
    sig: &MethodSig,
    target: &MethodDeclaration,
) -> MethodDeclaration {
    let params: Vec<Parameter> = sig
        .spec
        .params
        .iter()
        .enumerate()
        .map(|(i, t)| Parameter::new(format!("arg{i}"), t.clone()))
        .collect();

    let args = params
        .iter()
        .zip(target.params.iter())
        .map(|(bridge_param, real_param)| {
            let access = factory::access_var(&bridge_param.name, bridge_param.param_type.clone());
            if bridge_param.param_type == real_param.param_type {
                access
            } else {
                factory::cast(
                    bridge_param.param_type.clone(),
                    real_param.param_type.clone(),
                    access,
                )
            }
        })
        .collect();

    let call = factory::invoke_virtual(
        decl.type_ref(),
        anvil_ir::Instruction::AccessThis,
        &target.name,
        target.spec(),
        args,
    );
    let body = if sig.spec.ret.is_void() {
        vec![call, factory::return_void()]
    } else {
        vec![factory::return_value(call)]
    };

    let mut bridge = MethodDeclaration::new(&sig.name, params, sig.spec.ret.clone(), body);
    bridge.modifiers = (target.modifiers & (access::PUBLIC | access::PROTECTED))
        | access::SYNTHETIC
        | access::BRIDGE;
    bridge
}
