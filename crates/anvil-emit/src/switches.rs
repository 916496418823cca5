//! Switch lowering.
//!
//! Numeric switches pick tableswitch or lookupswitch by density. Enum
//! switches are rewritten to index a memoized mapping class: a synthetic
//! class holding a static int array keyed by ordinal, populated in its
//! static initializer with one try/catch(NoSuchFieldError) per constant so
//! constants removed after compilation degrade to the default arm.

use crate::compiler::MethodCompiler;
use crate::context::{Flow, FlowKind, SwitchMapping};
use crate::error::EmitResult;
use anvil_bytecode::{Insn, Label, MethodSink};
use anvil_ir::decl::{access, FieldDeclaration, TypeDeclaration, TypeKind};
use anvil_ir::{factory, CaseValue, CatchClause, Instruction, SwitchCase, TypeRef, TypeSpec};

/// Beyond this slack a tableswitch wastes more than it saves.
const TABLE_SPAN_FACTOR: i64 = 2;

impl<'c, M: MethodSink> MethodCompiler<'c, M> {
    pub(crate) fn compile_switch(
        &mut self,
        value: &Instruction,
        enum_type: Option<&TypeRef>,
        cases: &[SwitchCase],
    ) -> EmitResult<()> {
        if let Some(et) = enum_type {
            return self.compile_enum_switch(value, et, cases);
        }
        self.compile_numeric_switch(value, cases, None)
    }

    fn compile_enum_switch(
        &mut self,
        value: &Instruction,
        enum_type: &TypeRef,
        cases: &[SwitchCase],
    ) -> EmitResult<()> {
        // Map each named arm through the shared mapping registry.
        let mut mapped = Vec::with_capacity(cases.len());
        let mut map_class = None;
        for case in cases {
            let value = match &case.value {
                Some(CaseValue::EnumName(name)) => {
                    let (class, key) = self.ctx.registries.switch_map_key(
                        &self.ctx.type_name,
                        enum_type,
                        name,
                    );
                    map_class = Some(class);
                    Some(CaseValue::Int(key))
                }
                other => other.clone(),
            };
            mapped.push(SwitchCase {
                value,
                body: case.body.clone(),
            });
        }

        let ordinal = factory::invoke_virtual(
            enum_type.clone(),
            value.clone(),
            "ordinal",
            TypeSpec::new(TypeRef::INT, vec![]),
            vec![],
        );
        let key = match map_class {
            Some(class) => factory::access_array(
                TypeRef::array(TypeRef::INT),
                factory::access_static_field(
                    TypeRef::reference(class),
                    TypeRef::array(TypeRef::INT),
                    SwitchMapping::FIELD,
                ),
                ordinal,
                TypeRef::INT,
            ),
            // No named arms; the ordinal itself cannot match anything but
            // the default.
            None => ordinal,
        };
        self.compile_numeric_switch(&key, &[], Some(&mapped))
    }

    fn compile_numeric_switch(
        &mut self,
        value: &Instruction,
        cases: &[SwitchCase],
        mapped: Option<&[SwitchCase]>,
    ) -> EmitResult<()> {
        let cases = mapped.unwrap_or(cases);
        let label = self.pending_label.take();
        let start = self.sink.new_label();
        let end = self.sink.new_label();
        let order = self.ctx.next_order();

        self.sink.mark(start);
        self.process_value(value)?;

        let mut arm_labels = Vec::with_capacity(cases.len());
        let mut pairs: Vec<(i32, Label)> = Vec::new();
        let mut default_label = end;
        for case in cases {
            let l = self.sink.new_label();
            arm_labels.push(l);
            match &case.value {
                Some(CaseValue::Int(key)) => pairs.push((*key, l)),
                Some(CaseValue::EnumName(_)) => {
                    // Named arms only exist before the enum rewrite.
                }
                None => default_label = l,
            }
        }
        pairs.sort_by_key(|(key, _)| *key);

        self.emit(select_switch_insn(&pairs, default_label));

        self.ctx.flows.push(Flow {
            label,
            kind: FlowKind::Switch,
            outside_start: start,
            inside_start: start,
            inside_end: end,
            outside_end: end,
            creation_order: order,
        });
        let result = (|| {
            for (case, l) in cases.iter().zip(&arm_labels) {
                self.sink.mark(*l);
                self.enter_scope();
                self.process_body(&case.body)?;
                self.exit_scope()?;
            }
            Ok(())
        })();
        self.ctx.flows.pop();
        result?;

        self.sink.mark(end);
        Ok(())
    }
}

fn select_switch_insn(pairs: &[(i32, Label)], default: Label) -> Insn {
    if let (Some((min, _)), Some((max, _))) = (pairs.first(), pairs.last()) {
        let span = *max as i64 - *min as i64 + 1;
        if span <= TABLE_SPAN_FACTOR * pairs.len() as i64 {
            let mut targets = vec![default; span as usize];
            for (key, l) in pairs {
                targets[(*key - *min) as usize] = *l;
            }
            return Insn::TableSwitch {
                min: *min,
                default,
                targets,
            };
        }
    }
    Insn::LookupSwitch {
        default,
        pairs: pairs.to_vec(),
    }
}

/// The synthetic mapping class for one (enclosing type, enum type) pair.
///
/// Layout: one `public static final int[]` sized by `values().length`,
/// populated in `<clinit>` with `ordinal -> key` entries, each store
/// guarded against `NoSuchFieldError`.
pub(crate) fn build_mapping_class(mapping: &SwitchMapping) -> TypeDeclaration {
    let int_array = TypeRef::array(TypeRef::INT);
    let enum_array = TypeRef::array(mapping.enum_type.clone());
    let map_type = TypeRef::reference(mapping.class_name.clone());

    let mut field = FieldDeclaration::new(SwitchMapping::FIELD, int_array.clone());
    field.modifiers = access::PUBLIC | access::STATIC | access::FINAL | access::SYNTHETIC;
    field.value = Some(Instruction::NewArray {
        array_type: int_array.clone(),
        dims: vec![factory::array_length(
            enum_array.clone(),
            factory::invoke_static(
                mapping.enum_type.clone(),
                "values",
                TypeSpec::new(enum_array, vec![]),
                vec![],
            ),
        )],
        values: vec![],
    });

    let static_block = mapping
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let store = Instruction::ArrayStore {
                array_type: int_array.clone(),
                target: Box::new(factory::access_static_field(
                    map_type.clone(),
                    int_array.clone(),
                    SwitchMapping::FIELD,
                )),
                index: Box::new(factory::invoke_virtual(
                    mapping.enum_type.clone(),
                    factory::access_static_field(
                        mapping.enum_type.clone(),
                        mapping.enum_type.clone(),
                        entry,
                    ),
                    "ordinal",
                    TypeSpec::new(TypeRef::INT, vec![]),
                    vec![],
                )),
                value_type: TypeRef::INT,
                value: Box::new(factory::int(i as i32 + 1)),
            };
            Instruction::Try {
                body: vec![store],
                catches: vec![CatchClause {
                    exception_types: vec![TypeRef::reference("java/lang/NoSuchFieldError")],
                    var_name: "#nsfe_".to_string(),
                    body: vec![],
                }],
                finally: vec![],
            }
        })
        .collect();

    let mut decl = TypeDeclaration::new(TypeKind::Class, mapping.class_name.clone());
    decl.modifiers = access::FINAL | access::SUPER | access::SYNTHETIC;
    decl.fields.push(field);
    decl.static_block = static_block;
    decl
}
