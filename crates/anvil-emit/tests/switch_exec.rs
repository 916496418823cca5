//! Switch lowering, executed: numeric fallthrough, instruction selection
//! by density, and enum dispatch through the synthetic mapping class.

mod common;

use anvil_emit::BytecodeGenerator;
use anvil_ir::decl::{access, EnumEntry, MethodDeclaration, Parameter, TypeDeclaration, TypeKind};
use anvil_ir::{factory, CaseValue, Instruction, MathOp, SwitchCase, TypeRef};
use anvil_bytecode::{CodeElem, Insn};
use common::{machine_for, Machine, Obj, Val};

fn static_method(
    name: &str,
    params: Vec<Parameter>,
    ret: TypeRef,
    body: Vec<Instruction>,
) -> MethodDeclaration {
    let mut m = MethodDeclaration::new(name, params, ret, body);
    m.modifiers = access::PUBLIC | access::STATIC;
    m
}

fn int_case(key: i32, body: Vec<Instruction>) -> SwitchCase {
    SwitchCase {
        value: Some(CaseValue::Int(key)),
        body,
    }
}

fn enum_case(name: &str, body: Vec<Instruction>) -> SwitchCase {
    SwitchCase {
        value: Some(CaseValue::EnumName(name.to_string())),
        body,
    }
}

fn default_case(body: Vec<Instruction>) -> SwitchCase {
    SwitchCase { value: None, body }
}

fn add_to(var: &str, by: i32) -> Instruction {
    factory::set_var(
        var,
        TypeRef::INT,
        Instruction::Operate {
            op: MathOp::Add,
            operand_type: TypeRef::INT,
            left: Box::new(factory::access_var(var, TypeRef::INT)),
            right: Box::new(factory::int(by)),
        },
    )
}

fn color_enum() -> TypeDeclaration {
    let mut decl = TypeDeclaration::new(TypeKind::Enum, "t/Color");
    decl.enum_entries.push(EnumEntry::new("RED", vec![]));
    decl.enum_entries.push(EnumEntry::new("GREEN", vec![]));
    decl.enum_entries.push(EnumEntry::new("BLUE", vec![]));
    decl
}

fn switch_class() -> TypeDeclaration {
    let color = TypeRef::reference("t/Color");
    let mut decl = TypeDeclaration::new(TypeKind::Class, "t/Switches");

    // case 1 falls into case 2; case 2 breaks out.
    decl.methods.push(static_method(
        "classify",
        vec![Parameter::new("x", TypeRef::INT)],
        TypeRef::INT,
        vec![
            factory::declare_var("result", TypeRef::INT, factory::int(0)),
            Instruction::Switch {
                value: Box::new(factory::access_var("x", TypeRef::INT)),
                enum_type: None,
                cases: vec![
                    int_case(1, vec![add_to("result", 1)]),
                    int_case(2, vec![add_to("result", 2), Instruction::Break { label: None }]),
                    default_case(vec![factory::set_var(
                        "result",
                        TypeRef::INT,
                        factory::int(99),
                    )]),
                ],
            },
            factory::return_value(factory::access_var("result", TypeRef::INT)),
        ],
    ));

    decl.methods.push(static_method(
        "pick",
        vec![Parameter::new("c", color.clone())],
        TypeRef::INT,
        vec![Instruction::Switch {
            value: Box::new(factory::access_var("c", color.clone())),
            enum_type: Some(color.clone()),
            cases: vec![
                enum_case("RED", vec![factory::return_value(factory::int(1))]),
                enum_case("BLUE", vec![factory::return_value(factory::int(3))]),
                default_case(vec![factory::return_value(factory::int(0))]),
            ],
        }],
    ));

    // A second switch over the same enum; the mapping must be shared.
    decl.methods.push(static_method(
        "is_red",
        vec![Parameter::new("c", color.clone())],
        TypeRef::BOOLEAN,
        vec![Instruction::Switch {
            value: Box::new(factory::access_var("c", color.clone())),
            enum_type: Some(color),
            cases: vec![
                enum_case("RED", vec![factory::return_value(factory::int(1))]),
                default_case(vec![factory::return_value(factory::int(0))]),
            ],
        }],
    ));

    decl
}

fn machine() -> Machine {
    machine_for(&[color_enum(), switch_class()])
}

fn color_constant(m: &mut Machine, ordinal: usize) -> Val {
    let arr = m
        .call_static("t/Color", "values", "()[Lt/Color;", vec![])
        .unwrap();
    match &m.heap[arr.as_obj()] {
        Obj::Array(values) => values[ordinal],
        other => panic!("values() gave {other:?}"),
    }
}

#[test]
fn test_numeric_switch_fallthrough_and_break() {
    let mut m = machine();
    assert_eq!(
        m.call_static("t/Switches", "classify", "(I)I", vec![Val::I(1)]),
        Some(Val::I(3))
    );
    assert_eq!(
        m.call_static("t/Switches", "classify", "(I)I", vec![Val::I(2)]),
        Some(Val::I(2))
    );
    assert_eq!(
        m.call_static("t/Switches", "classify", "(I)I", vec![Val::I(7)]),
        Some(Val::I(99))
    );
}

#[test]
fn test_enum_switch_dispatches_named_arms() {
    let mut m = machine();
    let red = color_constant(&mut m, 0);
    let blue = color_constant(&mut m, 2);
    assert_eq!(
        m.call_static("t/Switches", "pick", "(Lt/Color;)I", vec![red]),
        Some(Val::I(1))
    );
    assert_eq!(
        m.call_static("t/Switches", "pick", "(Lt/Color;)I", vec![blue]),
        Some(Val::I(3))
    );
}

#[test]
fn test_unnamed_constant_takes_default_arm() {
    let mut m = machine();
    let green = color_constant(&mut m, 1);
    assert_eq!(
        m.call_static("t/Switches", "pick", "(Lt/Color;)I", vec![green]),
        Some(Val::I(0))
    );
}

#[test]
fn test_mapping_class_shared_between_switches() {
    let classes = BytecodeGenerator::new()
        .process(&switch_class())
        .expect("emission failed");
    let mappings: Vec<_> = classes
        .iter()
        .filter(|c| c.name.contains("$EnumMap"))
        .collect();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].name, "t/Switches$t_Color$EnumMap");
}

fn switch_insns(cases: Vec<SwitchCase>) -> (usize, usize) {
    let decl = {
        let mut d = TypeDeclaration::new(TypeKind::Class, "t/Density");
        d.methods.push(static_method(
            "f",
            vec![Parameter::new("x", TypeRef::INT)],
            TypeRef::INT,
            vec![
                Instruction::Switch {
                    value: Box::new(factory::access_var("x", TypeRef::INT)),
                    enum_type: None,
                    cases,
                },
                factory::return_value(factory::int(0)),
            ],
        ));
        d
    };
    let classes = BytecodeGenerator::new().process(&decl).expect("emission failed");
    let method = classes[0].recorded.method("f", "(I)I").unwrap();
    let mut tables = 0;
    let mut lookups = 0;
    for elem in &method.code {
        match elem {
            CodeElem::Insn(Insn::TableSwitch { .. }) => tables += 1,
            CodeElem::Insn(Insn::LookupSwitch { .. }) => lookups += 1,
            _ => {}
        }
    }
    (tables, lookups)
}

#[test]
fn test_dense_keys_select_tableswitch() {
    let cases = vec![
        int_case(1, vec![factory::return_value(factory::int(10))]),
        int_case(2, vec![factory::return_value(factory::int(20))]),
        int_case(4, vec![factory::return_value(factory::int(40))]),
    ];
    assert_eq!(switch_insns(cases), (1, 0));
}

#[test]
fn test_sparse_keys_select_lookupswitch() {
    let cases = vec![
        int_case(1, vec![factory::return_value(factory::int(10))]),
        int_case(100, vec![factory::return_value(factory::int(20))]),
    ];
    assert_eq!(switch_insns(cases), (0, 1));
}
