//! Bytecode emission backend.
//!
//! Takes a [`TypeDeclaration`] tree and drives a class sink through the
//! full compilation pipeline: enum desugaring, synthetic accessor
//! rewriting, bridge synthesis, per-method code generation, and the
//! synthetic classes that switch-on-enum dispatch needs. The output is a
//! set of [`BytecodeClass`] images, one per emitted class.

mod access;
mod branch;
mod bridge;
mod compiler;
mod context;
mod enums;
mod frame;
mod loops;
mod post;
mod switches;
mod tryblock;
mod typedecl;

pub mod error;
pub mod options;

pub use error::{EmitError, EmitResult};
pub use options::{BytecodeOptions, NestMode};

use anvil_bytecode::RecordedClass;
use anvil_ir::decl::TypeDeclaration;
use context::Registries;
use std::rc::Rc;

/// One emitted class: its internal name, the serialized container image,
/// and the recorded form the image was built from.
#[derive(Debug, Clone)]
pub struct BytecodeClass {
    pub name: String,
    pub bytes: Vec<u8>,
    pub recorded: RecordedClass,
}

/// The compilation entry point. One generator can process any number of
/// declarations; each `process` call is independent.
#[derive(Debug, Default)]
pub struct BytecodeGenerator {
    options: BytecodeOptions,
}

impl BytecodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BytecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BytecodeOptions {
        &self.options
    }

    /// Compile a declaration and everything nested inside it. The result
    /// holds the declared class first, then its inner classes in
    /// declaration order, then any synthetic switch-mapping classes.
    pub fn process(&self, decl: &TypeDeclaration) -> EmitResult<Vec<BytecodeClass>> {
        let registries = Rc::new(Registries::default());

        // Enums desugar before the accessor pass so per-entry subtypes
        // take part in nest-member collection.
        let decl = enums::desugar_tree(decl)?;
        let decl = if self.options.use_accessors() {
            access::apply_accessors(&decl)
        } else {
            decl
        };

        let mut nest_members = Vec::new();
        collect_names(&decl, &mut nest_members);

        let mut out = Vec::new();
        typedecl::compile_type(
            &decl,
            &registries,
            &self.options,
            &decl.name,
            &nest_members,
            None,
            &mut out,
        )?;

        // Switch compilation registers mappings lazily; drain until no
        // class produces new ones.
        loop {
            let pending = registries.take_unemitted_mappings();
            if pending.is_empty() {
                break;
            }
            for mapping in &pending {
                let map_decl = switches::build_mapping_class(mapping);
                typedecl::compile_type(
                    &map_decl,
                    &registries,
                    &self.options,
                    &map_decl.name,
                    &[],
                    Some(&mapping.enclosing),
                    &mut out,
                )?;
            }
        }
        Ok(out)
    }
}

fn collect_names(decl: &TypeDeclaration, out: &mut Vec<String>) {
    out.push(decl.name.clone());
    for inner in &decl.inner_types {
        collect_names(inner, out);
    }
}
