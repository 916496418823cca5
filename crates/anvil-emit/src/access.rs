//! Synthetic accessors for cross-type private access inside a nest.
//!
//! When the target class format has no nest attributes (or the options force
//! it), a private member referenced from a sibling nest member is reached
//! through a package-private `access$N` static method added to the owner,
//! and the access site is rewritten to call it. Private constructors get a
//! package-private overload with a trailing always-null marker parameter.
//!
//! This runs as a pre-pass over the whole declaration tree, before any
//! bytecode is produced, so owners compiled earlier than their accessors'
//! first use still receive them.

use anvil_ir::decl::{
    access, ConstructorDeclaration, MethodDeclaration, Parameter, TypeDeclaration,
};
use anvil_ir::{factory, Instruction, Invocation, NewInstance, TypeRef, TypeSpec};
use rustc_hash::FxHashMap;

#[derive(Default)]
struct TypeMembers {
    /// field name -> (modifiers, type, is_static)
    fields: FxHashMap<String, (u16, TypeRef, bool)>,
    /// (method name, descriptor) -> (modifiers, is_static)
    methods: FxHashMap<(String, String), (u16, bool)>,
    /// constructor descriptor -> modifiers
    constructors: FxHashMap<String, u16>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum MemberKey {
    FieldGet(String),
    FieldSet(String),
    Method(String, String),
    Constructor(String),
}

#[derive(Default)]
struct Pass {
    nest: FxHashMap<String, TypeMembers>,
    /// (owner, member) -> accessor method name.
    memo: FxHashMap<(String, MemberKey), String>,
    /// Accessor methods to append, per owner.
    new_methods: FxHashMap<String, Vec<MethodDeclaration>>,
    /// Companion constructors to append, per owner.
    new_constructors: FxHashMap<String, Vec<ConstructorDeclaration>>,
}

/// Rewrite private cross-type accesses in `decl`'s nest through synthetic
/// accessors and inject the accessor members into their owners.
pub(crate) fn apply_accessors(decl: &TypeDeclaration) -> TypeDeclaration {
    let mut pass = Pass::default();
    collect(decl, &mut pass.nest);

    let mut out = decl.clone();
    rewrite_type(&mut out, &mut pass);
    inject(&mut out, &mut pass);
    out
}

fn collect(decl: &TypeDeclaration, nest: &mut FxHashMap<String, TypeMembers>) {
    let mut members = TypeMembers::default();
    for f in &decl.fields {
        members.fields.insert(
            f.name.clone(),
            (f.modifiers, f.field_type.clone(), f.is_static()),
        );
    }
    for m in &decl.methods {
        members.methods.insert(
            (m.name.clone(), m.spec().descriptor()),
            (m.modifiers, m.is_static()),
        );
    }
    for c in &decl.constructors {
        members
            .constructors
            .insert(c.spec().descriptor(), c.modifiers);
    }
    nest.insert(decl.name.clone(), members);
    for inner in &decl.inner_types {
        collect(inner, nest);
    }
}

fn rewrite_type(decl: &mut TypeDeclaration, pass: &mut Pass) {
    let current = decl.name.clone();
    for field in &mut decl.fields {
        if let Some(value) = &mut field.value {
            rewrite_instruction(value, &current, pass);
        }
    }
    for ctor in &mut decl.constructors {
        rewrite_body(&mut ctor.body, &current, pass);
    }
    for method in &mut decl.methods {
        if let Some(body) = &mut method.body {
            rewrite_body(body, &current, pass);
        }
    }
    rewrite_body(&mut decl.static_block, &current, pass);
    for inner in &mut decl.inner_types {
        rewrite_type(inner, pass);
    }
}

fn rewrite_body(body: &mut [Instruction], current: &str, pass: &mut Pass) {
    for node in body {
        rewrite_instruction(node, current, pass);
    }
}

fn rewrite_instruction(node: &mut Instruction, current: &str, pass: &mut Pass) {
    // Children first; a rewritten parent keeps already-rewritten children.
    visit_children(node, &mut |child| rewrite_instruction(child, current, pass));

    let replacement = match node {
        Instruction::AccessField {
            owner,
            target,
            field_type,
            name,
        } => pass.field_get(current, owner, name, field_type, target.take()),
        Instruction::SetField {
            owner,
            target,
            field_type,
            name,
            value,
        } => pass.field_set(
            current,
            owner,
            name,
            field_type,
            target.take(),
            std::mem::replace(value, Box::new(factory::null())),
        ),
        Instruction::Invoke(inv) => pass.invocation(current, inv),
        Instruction::New(new) => pass.construction(current, new),
        _ => None,
    };
    if let Some(new_node) = replacement {
        *node = new_node;
    }
}

impl Pass {
    fn is_foreign_private_field(&self, current: &str, owner: &TypeRef, name: &str) -> bool {
        let owner = owner.internal_name();
        if owner == current {
            return false;
        }
        self.nest
            .get(&owner)
            .and_then(|t| t.fields.get(name))
            .map(|(modifiers, _, _)| modifiers & access::PRIVATE != 0)
            .unwrap_or(false)
    }

    fn accessor_name(&mut self, owner: &str, key: MemberKey) -> (String, bool) {
        if let Some(name) = self.memo.get(&(owner.to_string(), key.clone())) {
            return (name.clone(), false);
        }
        let name = format!("access${}", self.memo.len());
        self.memo.insert((owner.to_string(), key), name.clone());
        (name, true)
    }

    fn field_get(
        &mut self,
        current: &str,
        owner: &TypeRef,
        name: &str,
        field_type: &TypeRef,
        target: Option<Box<Instruction>>,
    ) -> Option<Instruction> {
        if !self.is_foreign_private_field(current, owner, name) {
            // Put the receiver back; this access stays as it was.
            return target.map(|t| Instruction::AccessField {
                owner: owner.clone(),
                target: Some(t),
                field_type: field_type.clone(),
                name: name.to_string(),
            });
        }
        let owner_name = owner.internal_name();
        let is_static = target.is_none();
        let (accessor, fresh) =
            self.accessor_name(&owner_name, MemberKey::FieldGet(name.to_string()));
        if fresh {
            let (params, field) = if is_static {
                (
                    vec![],
                    factory::access_static_field(owner.clone(), field_type.clone(), name),
                )
            } else {
                (
                    vec![Parameter::new("self", owner.clone())],
                    Instruction::AccessField {
                        owner: owner.clone(),
                        target: Some(Box::new(factory::access_var("self", owner.clone()))),
                        field_type: field_type.clone(),
                        name: name.to_string(),
                    },
                )
            };
            self.add_accessor(
                &owner_name,
                accessor.clone(),
                params,
                field_type.clone(),
                vec![factory::return_value(field)],
            );
        }
        Some(factory::invoke_static(
            owner.clone(),
            accessor,
            TypeSpec::new(
                field_type.clone(),
                if is_static {
                    vec![]
                } else {
                    vec![owner.clone()]
                },
            ),
            target.map(|t| vec![*t]).unwrap_or_default(),
        ))
    }

    fn field_set(
        &mut self,
        current: &str,
        owner: &TypeRef,
        name: &str,
        field_type: &TypeRef,
        target: Option<Box<Instruction>>,
        value: Box<Instruction>,
    ) -> Option<Instruction> {
        if !self.is_foreign_private_field(current, owner, name) {
            return Some(Instruction::SetField {
                owner: owner.clone(),
                target,
                field_type: field_type.clone(),
                name: name.to_string(),
                value,
            });
        }
        let owner_name = owner.internal_name();
        let is_static = target.is_none();
        let (accessor, fresh) =
            self.accessor_name(&owner_name, MemberKey::FieldSet(name.to_string()));
        if fresh {
            let mut params = vec![];
            let target_expr = if is_static {
                None
            } else {
                params.push(Parameter::new("self", owner.clone()));
                Some(Box::new(factory::access_var("self", owner.clone())))
            };
            params.push(Parameter::new("value", field_type.clone()));
            self.add_accessor(
                &owner_name,
                accessor.clone(),
                params,
                TypeRef::VOID,
                vec![
                    Instruction::SetField {
                        owner: owner.clone(),
                        target: target_expr,
                        field_type: field_type.clone(),
                        name: name.to_string(),
                        value: Box::new(factory::access_var("value", field_type.clone())),
                    },
                    factory::return_void(),
                ],
            );
        }
        let mut param_types = vec![];
        let mut args = vec![];
        if let Some(t) = target {
            param_types.push(owner.clone());
            args.push(*t);
        }
        param_types.push(field_type.clone());
        args.push(*value);
        Some(factory::invoke_static(
            owner.clone(),
            accessor,
            TypeSpec::new(TypeRef::VOID, param_types),
            args,
        ))
    }

    fn invocation(&mut self, current: &str, inv: &Invocation) -> Option<Instruction> {
        let owner_name = inv.owner.internal_name();
        if owner_name == current {
            return None;
        }
        let desc = inv.spec.descriptor();
        let (modifiers, is_static) = *self
            .nest
            .get(&owner_name)?
            .methods
            .get(&(inv.name.clone(), desc))?;
        if modifiers & access::PRIVATE == 0 {
            return None;
        }
        let (accessor, fresh) = self.accessor_name(
            &owner_name,
            MemberKey::Method(inv.name.clone(), inv.spec.descriptor()),
        );
        if fresh {
            let mut params = vec![];
            if !is_static {
                params.push(Parameter::new("self", inv.owner.clone()));
            }
            params.extend(
                inv.spec
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, t)| Parameter::new(format!("p{i}"), t.clone())),
            );
            let call_args = inv
                .spec
                .params
                .iter()
                .enumerate()
                .map(|(i, t)| factory::access_var(format!("p{i}"), t.clone()))
                .collect();
            let call = Instruction::Invoke(Invocation {
                kind: if is_static {
                    anvil_ir::op::InvokeKind::Static
                } else {
                    anvil_ir::op::InvokeKind::Special
                },
                owner: inv.owner.clone(),
                name: inv.name.clone(),
                spec: inv.spec.clone(),
                target: (!is_static)
                    .then(|| Box::new(factory::access_var("self", inv.owner.clone()))),
                args: call_args,
            });
            let body = if inv.spec.ret.is_void() {
                vec![call, factory::return_void()]
            } else {
                vec![factory::return_value(call)]
            };
            self.add_accessor(
                &owner_name,
                accessor.clone(),
                params,
                inv.spec.ret.clone(),
                body,
            );
        }
        let mut param_types = vec![];
        let mut args = vec![];
        if let Some(target) = &inv.target {
            param_types.push(inv.owner.clone());
            args.push((**target).clone());
        }
        param_types.extend(inv.spec.params.iter().cloned());
        args.extend(inv.args.iter().cloned());
        Some(factory::invoke_static(
            inv.owner.clone(),
            accessor,
            TypeSpec::new(inv.spec.ret.clone(), param_types),
            args,
        ))
    }

    fn construction(&mut self, current: &str, new: &NewInstance) -> Option<Instruction> {
        let owner_name = new.owner.internal_name();
        if owner_name == current {
            return None;
        }
        let desc = new.spec.descriptor();
        let modifiers = *self.nest.get(&owner_name)?.constructors.get(&desc)?;
        if modifiers & access::PRIVATE == 0 {
            return None;
        }
        let (_, fresh) = self.accessor_name(&owner_name, MemberKey::Constructor(desc));
        if fresh {
            // Package-private companion with a trailing marker parameter,
            // delegating to the private constructor.
            let params: Vec<Parameter> = new
                .spec
                .params
                .iter()
                .enumerate()
                .map(|(i, t)| Parameter::new(format!("p{i}"), t.clone()))
                .chain(std::iter::once(Parameter::new("#marker", new.owner.clone())))
                .collect();
            let forward = Instruction::ThisConstructorCall {
                spec: new.spec.clone(),
                args: new
                    .spec
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, t)| factory::access_var(format!("p{i}"), t.clone()))
                    .collect(),
            };
            self.new_constructors
                .entry(owner_name.clone())
                .or_default()
                .push(ConstructorDeclaration {
                    modifiers: access::SYNTHETIC,
                    params,
                    body: vec![forward],
                });
        }
        let mut spec = new.spec.clone();
        spec.params.push(new.owner.clone());
        let mut args = new.args.clone();
        args.push(factory::null());
        Some(Instruction::New(NewInstance {
            owner: new.owner.clone(),
            spec,
            args,
        }))
    }

    fn add_accessor(
        &mut self,
        owner: &str,
        name: String,
        params: Vec<Parameter>,
        ret: TypeRef,
        body: Vec<Instruction>,
    ) {
        let mut method = MethodDeclaration::new(name, params, ret, body);
        method.modifiers = access::STATIC | access::SYNTHETIC;
        self.new_methods
            .entry(owner.to_string())
            .or_default()
            .push(method);
    }
}

fn inject(decl: &mut TypeDeclaration, pass: &mut Pass) {
    if let Some(methods) = pass.new_methods.remove(&decl.name) {
        decl.methods.extend(methods);
    }
    if let Some(ctors) = pass.new_constructors.remove(&decl.name) {
        decl.constructors.extend(ctors);
    }
    for inner in &mut decl.inner_types {
        inject(inner, pass);
    }
}

/// Apply `f` to every direct child instruction of `node`.
fn visit_children(node: &mut Instruction, f: &mut impl FnMut(&mut Instruction)) {
    use Instruction::*;
    match node {
        DeclareVariable { value, .. } | SetVariable { value, .. } => f(value),
        AccessField { target, .. } => {
            if let Some(t) = target {
                f(t);
            }
        }
        SetField { target, value, .. } => {
            if let Some(t) = target {
                f(t);
            }
            f(value);
        }
        Invoke(inv) => {
            if let Some(t) = &mut inv.target {
                f(t);
            }
            inv.args.iter_mut().for_each(&mut *f);
        }
        New(new) => new.args.iter_mut().for_each(&mut *f),
        SuperConstructorCall { args, .. } | ThisConstructorCall { args, .. } => {
            args.iter_mut().for_each(&mut *f)
        }
        NewArray { dims, values, .. } => {
            dims.iter_mut().for_each(&mut *f);
            values.iter_mut().for_each(&mut *f);
        }
        ArrayLoad { target, index, .. } => {
            f(target);
            f(index);
        }
        ArrayStore {
            target,
            index,
            value,
            ..
        } => {
            f(target);
            f(index);
            f(value);
        }
        ArrayLength { target, .. } => f(target),
        Cast { value, .. } | InstanceOf { value, .. } | UnaryOperate { value, .. } => f(value),
        Operate { left, right, .. } => {
            f(left);
            f(right);
        }
        If {
            cond,
            then_body,
            else_body,
        } => {
            visit_cond(cond, f);
            then_body.iter_mut().for_each(&mut *f);
            else_body.iter_mut().for_each(&mut *f);
        }
        IfExpr {
            cond,
            if_true,
            if_false,
            ..
        } => {
            visit_cond(cond, f);
            f(if_true);
            f(if_false);
        }
        While { cond, body } | DoWhile { cond, body } => {
            visit_cond(cond, f);
            body.iter_mut().for_each(&mut *f);
        }
        For {
            init,
            cond,
            update,
            body,
        } => {
            init.iter_mut().for_each(&mut *f);
            visit_cond(cond, f);
            update.iter_mut().for_each(&mut *f);
            body.iter_mut().for_each(&mut *f);
        }
        ForEach { iterable, body, .. } => {
            f(iterable);
            body.iter_mut().for_each(&mut *f);
        }
        Switch { value, cases, .. } => {
            f(value);
            for case in cases {
                case.body.iter_mut().for_each(&mut *f);
            }
        }
        Try {
            body,
            catches,
            finally,
        } => {
            body.iter_mut().for_each(&mut *f);
            for clause in catches.iter_mut() {
                clause.body.iter_mut().for_each(&mut *f);
            }
            finally.iter_mut().for_each(&mut *f);
        }
        TryWithResources {
            resource_init,
            body,
            catches,
            finally,
            ..
        } => {
            f(resource_init);
            body.iter_mut().for_each(&mut *f);
            for clause in catches.iter_mut() {
                clause.body.iter_mut().for_each(&mut *f);
            }
            finally.iter_mut().for_each(&mut *f);
        }
        Labeled { body, .. } => body.iter_mut().for_each(&mut *f),
        Return { value: Some(v) } => f(v),
        Throw(value) => f(value),
        Literal(_) | AccessVariable { .. } | AccessThis | Break { .. } | Continue { .. }
        | Return { value: None } | Line(_) => {}
    }
}

fn visit_cond(cond: &mut [anvil_ir::BoolTerm], f: &mut impl FnMut(&mut Instruction)) {
    for term in cond {
        match term {
            anvil_ir::BoolTerm::Check(check) => {
                f(&mut check.left);
                f(&mut check.right);
            }
            anvil_ir::BoolTerm::Group(inner) => visit_cond(inner, f),
            anvil_ir::BoolTerm::Join(_) => {}
        }
    }
}
