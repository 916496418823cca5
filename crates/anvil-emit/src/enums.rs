//! Enum synthesis.
//!
//! An enum declaration desugars into a plain class extending
//! `java.lang.Enum`: one static final field per constant, a synthetic
//! `$VALUES` array, `values()` returning a clone of it, `valueOf(String)`
//! delegating to `Enum.valueOf`, and constructors with `(name, ordinal)`
//! prepended. Constants with a body get a per-entry subtype.

use crate::error::{EmitError, EmitResult};
use anvil_ir::decl::{
    access, ConstructorDeclaration, FieldDeclaration, MethodDeclaration, Parameter,
    TypeDeclaration, TypeKind,
};
use anvil_ir::{factory, Instruction, Literal, NewInstance, TypeRef, TypeSpec};

const NAME_PARAM: &str = "#name";
const ORDINAL_PARAM: &str = "#ordinal";
const VALUES_FIELD: &str = "$VALUES";

/// Desugar every enum in a declaration tree, nested types included.
pub(crate) fn desugar_tree(decl: &TypeDeclaration) -> EmitResult<TypeDeclaration> {
    let mut out = if decl.kind == TypeKind::Enum {
        desugar_enum(decl)?
    } else {
        decl.clone()
    };
    let inner = std::mem::take(&mut out.inner_types);
    for nested in &inner {
        out.inner_types.push(desugar_tree(nested)?);
    }
    Ok(out)
}

pub(crate) fn desugar_enum(decl: &TypeDeclaration) -> EmitResult<TypeDeclaration> {
    let enum_type = decl.type_ref();
    let mut out = decl.clone();
    out.kind = TypeKind::Class;
    out.modifiers |= access::ENUM | access::SUPER;
    let has_entry_bodies = decl.enum_entries.iter().any(|e| e.body.is_some());
    if !has_entry_bodies {
        out.modifiers |= access::FINAL;
    }
    if out.methods.iter().any(|m| m.body.is_none()) {
        out.modifiers |= access::ABSTRACT;
    }
    if out.superclass == TypeRef::object() {
        out.superclass = TypeRef::enum_base();
    }

    if out.constructors.is_empty() {
        out.constructors.push(ConstructorDeclaration {
            modifiers: access::PRIVATE,
            params: vec![],
            body: vec![],
        });
    }
    for ctor in &mut out.constructors {
        rewrite_constructor(ctor)?;
    }

    // Constant fields precede everything else so <clinit> initializes them
    // first.
    let mut fields = Vec::with_capacity(decl.enum_entries.len() + out.fields.len() + 1);
    for (ordinal, entry) in decl.enum_entries.iter().enumerate() {
        let owner = match &entry.body {
            Some(body) => {
                let sub_name = format!("{}${}", decl.name, ordinal + 1);
                out.inner_types
                    .push(entry_subtype(&out, &enum_type, &sub_name, entry.args.len(), body));
                TypeRef::reference(sub_name)
            }
            None => enum_type.clone(),
        };
        let ctor_params = constructor_param_types(&out, entry.args.len());
        let mut args = vec![factory::string(entry.name.clone()), factory::int(ordinal as i32)];
        args.extend(entry.args.iter().cloned());

        let mut field = FieldDeclaration::new(entry.name.clone(), enum_type.clone());
        field.modifiers = access::PUBLIC | access::STATIC | access::FINAL | access::ENUM;
        field.value = Some(Instruction::New(NewInstance {
            owner,
            spec: TypeSpec::new(TypeRef::VOID, ctor_params),
            args,
        }));
        fields.push(field);
    }

    let array_type = TypeRef::array(enum_type.clone());
    let mut values_field = FieldDeclaration::new(VALUES_FIELD, array_type.clone());
    values_field.modifiers =
        access::PRIVATE | access::STATIC | access::FINAL | access::SYNTHETIC;
    values_field.value = Some(Instruction::NewArray {
        array_type: array_type.clone(),
        dims: vec![],
        values: decl
            .enum_entries
            .iter()
            .map(|e| factory::access_static_field(enum_type.clone(), enum_type.clone(), &e.name))
            .collect(),
    });
    fields.push(values_field);
    fields.append(&mut out.fields);
    out.fields = fields;

    out.methods.push(values_method(&enum_type, &array_type));
    out.methods.push(value_of_method(&enum_type));
    out.enum_entries.clear();
    Ok(out)
}

fn rewrite_constructor(ctor: &mut ConstructorDeclaration) -> EmitResult<()> {
    ctor.modifiers = (ctor.modifiers & !(access::PUBLIC | access::PROTECTED)) | access::PRIVATE;

    let mut params = vec![
        Parameter::new(NAME_PARAM, TypeRef::string()),
        Parameter::new(ORDINAL_PARAM, TypeRef::INT),
    ];
    params.append(&mut ctor.params);
    ctor.params = params;

    let super_call = Instruction::SuperConstructorCall {
        spec: TypeSpec::new(TypeRef::VOID, vec![TypeRef::string(), TypeRef::INT]),
        args: vec![
            factory::access_var(NAME_PARAM, TypeRef::string()),
            factory::access_var(ORDINAL_PARAM, TypeRef::INT),
        ],
    };
    match ctor.body.first() {
        Some(Instruction::SuperConstructorCall { args, .. }) => {
            if !args.is_empty() {
                return Err(EmitError::InvalidEnumSuperCall);
            }
            ctor.body[0] = super_call;
        }
        _ => ctor.body.insert(0, super_call),
    }
    Ok(())
}

/// Parameter types of the rewritten constructor matching `arg_count` user
/// arguments, `(name, ordinal)` included.
fn constructor_param_types(decl: &TypeDeclaration, arg_count: usize) -> Vec<TypeRef> {
    decl.constructors
        .iter()
        .find(|c| c.params.len() == arg_count + 2)
        .map(|c| c.params.iter().map(|p| p.param_type.clone()).collect())
        .unwrap_or_else(|| vec![TypeRef::string(), TypeRef::INT])
}

/// The anonymous-style subtype for a constant with a body.
fn entry_subtype(
    decl: &TypeDeclaration,
    enum_type: &TypeRef,
    sub_name: &str,
    arg_count: usize,
    body: &anvil_ir::decl::EnumEntryBody,
) -> TypeDeclaration {
    let mut sub = TypeDeclaration::new(TypeKind::Class, sub_name);
    sub.modifiers = access::FINAL | access::SUPER | access::ENUM | access::SYNTHETIC;
    sub.superclass = enum_type.clone();
    sub.fields = body.fields.clone();
    sub.methods = body.methods.clone();

    let param_types = constructor_param_types(decl, arg_count);
    let params: Vec<Parameter> = param_types
        .iter()
        .enumerate()
        .map(|(i, t)| Parameter::new(format!("p{i}"), t.clone()))
        .collect();
    let forward = Instruction::SuperConstructorCall {
        spec: TypeSpec::new(TypeRef::VOID, param_types),
        args: params
            .iter()
            .map(|p| factory::access_var(&p.name, p.param_type.clone()))
            .collect(),
    };
    sub.constructors.push(ConstructorDeclaration {
        modifiers: access::SYNTHETIC,
        params,
        body: vec![forward],
    });
    sub
}

fn values_method(enum_type: &TypeRef, array_type: &TypeRef) -> MethodDeclaration {
    let clone_call = factory::invoke_virtual(
        array_type.clone(),
        factory::access_static_field(enum_type.clone(), array_type.clone(), VALUES_FIELD),
        "clone",
        TypeSpec::new(TypeRef::object(), vec![]),
        vec![],
    );
    let mut method = MethodDeclaration::new(
        "values",
        vec![],
        array_type.clone(),
        vec![factory::return_value(factory::cast(
            TypeRef::object(),
            array_type.clone(),
            clone_call,
        ))],
    );
    method.modifiers = access::PUBLIC | access::STATIC;
    method
}

fn value_of_method(enum_type: &TypeRef) -> MethodDeclaration {
    let lookup = factory::invoke_static(
        TypeRef::enum_base(),
        "valueOf",
        TypeSpec::new(
            TypeRef::enum_base(),
            vec![TypeRef::reference("java/lang/Class"), TypeRef::string()],
        ),
        vec![
            Instruction::Literal(Literal::Class(enum_type.clone())),
            factory::access_var("name", TypeRef::string()),
        ],
    );
    let mut method = MethodDeclaration::new(
        "valueOf",
        vec![Parameter::new("name", TypeRef::string())],
        enum_type.clone(),
        vec![factory::return_value(factory::cast(
            TypeRef::enum_base(),
            enum_type.clone(),
            lookup,
        ))],
    );
    method.modifiers = access::PUBLIC | access::STATIC;
    method
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_ir::decl::EnumEntry;

    fn color() -> TypeDeclaration {
        let mut decl = TypeDeclaration::new(TypeKind::Enum, "t/Color");
        decl.enum_entries.push(EnumEntry::new("RED", vec![]));
        decl.enum_entries.push(EnumEntry::new("BLUE", vec![]));
        decl
    }

    #[test]
    fn test_enum_shape() {
        let out = desugar_enum(&color()).unwrap();
        assert_eq!(out.kind, TypeKind::Class);
        assert_eq!(out.superclass, TypeRef::enum_base());
        assert_ne!(out.modifiers & access::ENUM, 0);
        assert_ne!(out.modifiers & access::FINAL, 0);
        assert!(out.enum_entries.is_empty());

        let names: Vec<_> = out.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["RED", "BLUE", "$VALUES"]);
        assert!(out.methods.iter().any(|m| m.name == "values"));
        assert!(out.methods.iter().any(|m| m.name == "valueOf"));
    }

    #[test]
    fn test_constant_initializers_carry_name_and_ordinal() {
        let out = desugar_enum(&color()).unwrap();
        match out.fields[1].value.as_ref().unwrap() {
            Instruction::New(new) => {
                assert_eq!(new.args[0], factory::string("BLUE"));
                assert_eq!(new.args[1], factory::int(1));
            }
            other => panic!("unexpected initializer: {other:?}"),
        }
    }

    #[test]
    fn test_constructor_rewrite() {
        let mut decl = color();
        decl.constructors.push(ConstructorDeclaration::new(
            vec![Parameter::new("rgb", TypeRef::INT)],
            vec![Instruction::SuperConstructorCall {
                spec: TypeSpec::void(),
                args: vec![],
            }],
        ));
        let out = desugar_enum(&decl).unwrap();
        let ctor = &out.constructors[0];
        assert!(ctor.modifiers & access::PRIVATE != 0);
        assert_eq!(ctor.params.len(), 3);
        match &ctor.body[0] {
            Instruction::SuperConstructorCall { spec, .. } => {
                assert_eq!(spec.params, vec![TypeRef::string(), TypeRef::INT]);
            }
            other => panic!("unexpected first statement: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_super_args_rejected() {
        let mut decl = color();
        decl.constructors.push(ConstructorDeclaration::new(
            vec![],
            vec![Instruction::SuperConstructorCall {
                spec: TypeSpec::new(TypeRef::VOID, vec![TypeRef::INT]),
                args: vec![factory::int(1)],
            }],
        ));
        assert!(matches!(
            desugar_enum(&decl),
            Err(EmitError::InvalidEnumSuperCall)
        ));
    }

    #[test]
    fn test_entry_body_forces_subtype() {
        let mut decl = color();
        decl.enum_entries[0].body = Some(anvil_ir::decl::EnumEntryBody {
            fields: vec![],
            methods: vec![MethodDeclaration::new(
                "describe",
                vec![],
                TypeRef::string(),
                vec![factory::return_value(factory::string("red"))],
            )],
        });
        let out = desugar_enum(&decl).unwrap();
        assert_eq!(out.modifiers & access::FINAL, 0);
        assert_eq!(out.inner_types.len(), 1);
        assert_eq!(out.inner_types[0].name, "t/Color$1");
        assert_eq!(out.inner_types[0].superclass, TypeRef::reference("t/Color"));
        // The constant is constructed through the subtype.
        match out.fields[0].value.as_ref().unwrap() {
            Instruction::New(new) => {
                assert_eq!(new.owner, TypeRef::reference("t/Color$1"));
            }
            other => panic!("unexpected initializer: {other:?}"),
        }
    }
}
