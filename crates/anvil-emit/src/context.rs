//! Per-type compilation state.
//!
//! A [`CompilationContext`] exists for every type being compiled; nested
//! types share the outermost type's registries, so memoized artifacts
//! (switch-on-enum mapping classes) are reused across siblings.

use anvil_bytecode::Label;
use anvil_ir::{Instruction, TypeRef};
use std::cell::RefCell;
use std::rc::Rc;

/// What kind of construct opened a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Loop,
    Switch,
    Block,
}

/// An enclosing breakable/continuable construct.
///
/// `break` jumps to `outside_end`, `continue` to `inside_end`. The creation
/// order decides which pending finally blocks a jump must run through.
#[derive(Debug, Clone)]
pub struct Flow {
    pub label: Option<String>,
    pub kind: FlowKind,
    pub outside_start: Label,
    pub inside_start: Label,
    pub inside_end: Label,
    pub outside_end: Label,
    pub creation_order: u64,
}

/// A try statement whose finally block is still pending.
///
/// Deactivated while its own finally is being spliced, so the splice does
/// not recurse into itself.
#[derive(Debug, Clone)]
pub struct FinallyFrame {
    pub creation_order: u64,
    pub body: Vec<Instruction>,
    pub active: bool,
}

/// One memoized switch-on-enum mapping class.
#[derive(Debug, Clone)]
pub struct SwitchMapping {
    pub class_name: String,
    pub enclosing: String,
    pub enum_type: TypeRef,
    /// Enum constant names in first-use order; index + 1 is the mapped key.
    pub entries: Vec<String>,
    pub emitted: bool,
}

impl SwitchMapping {
    pub const FIELD: &'static str = "ENUM_MAP";
}

/// Registries shared between a type and all of its nested types.
#[derive(Debug, Default)]
pub struct Registries {
    pub switch_mappings: RefCell<Vec<SwitchMapping>>,
}

impl Registries {
    /// Mapped key for `entry_name` in the mapping for (`enclosing`,
    /// `enum_type`), creating the mapping on first use. Returns the mapping
    /// class name and the 1-based key.
    pub fn switch_map_key(
        &self,
        enclosing: &str,
        enum_type: &TypeRef,
        entry_name: &str,
    ) -> (String, i32) {
        let mut maps = self.switch_mappings.borrow_mut();
        let map = match maps
            .iter_mut()
            .find(|m| m.enclosing == enclosing && &m.enum_type == enum_type)
        {
            Some(m) => m,
            None => {
                let sanitized = enum_type.internal_name().replace('/', "_");
                maps.push(SwitchMapping {
                    class_name: format!("{enclosing}${sanitized}$EnumMap"),
                    enclosing: enclosing.to_string(),
                    enum_type: enum_type.clone(),
                    entries: Vec::new(),
                    emitted: false,
                });
                maps.last_mut().unwrap()
            }
        };
        let index = match map.entries.iter().position(|e| e == entry_name) {
            Some(i) => i,
            None => {
                map.entries.push(entry_name.to_string());
                map.entries.len() - 1
            }
        };
        (map.class_name.clone(), index as i32 + 1)
    }

    /// Mappings created but not yet compiled into classes. Marks them
    /// emitted.
    pub fn take_unemitted_mappings(&self) -> Vec<SwitchMapping> {
        let mut maps = self.switch_mappings.borrow_mut();
        let mut out = Vec::new();
        for m in maps.iter_mut() {
            if !m.emitted {
                m.emitted = true;
                out.push(m.clone());
            }
        }
        out
    }
}

/// Mutable state for the type currently being compiled. The flow and
/// finally stacks are per method and reset by [`CompilationContext::begin_method`].
#[derive(Debug)]
pub struct CompilationContext {
    /// Internal name of the type being compiled.
    pub type_name: String,
    /// Internal name of its superclass.
    pub superclass: String,
    pub flows: Vec<Flow>,
    pub finally_stack: Vec<FinallyFrame>,
    pub expression_depth: u32,
    pub last_line: Option<u16>,
    next_order: u64,
    pub registries: Rc<Registries>,
}

impl CompilationContext {
    pub fn new(type_name: impl Into<String>, superclass: impl Into<String>) -> Self {
        Self::with_registries(type_name, superclass, Rc::new(Registries::default()))
    }

    pub fn with_registries(
        type_name: impl Into<String>,
        superclass: impl Into<String>,
        registries: Rc<Registries>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            superclass: superclass.into(),
            flows: Vec::new(),
            finally_stack: Vec::new(),
            expression_depth: 0,
            last_line: None,
            next_order: 0,
            registries,
        }
    }

    /// Reset per-method state.
    pub fn begin_method(&mut self) {
        self.flows.clear();
        self.finally_stack.clear();
        self.expression_depth = 0;
        self.last_line = None;
    }

    pub fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// The flow a break/continue targets. Unlabeled `continue` skips
    /// non-loop flows; unlabeled `break` takes the innermost one.
    pub fn find_flow(&self, label: Option<&str>, continuing: bool) -> Option<Flow> {
        match label {
            Some(l) => self
                .flows
                .iter()
                .rev()
                .find(|f| f.label.as_deref() == Some(l)),
            None if continuing => self
                .flows
                .iter()
                .rev()
                .find(|f| f.kind == FlowKind::Loop),
            None => self.flows.last(),
        }
        .cloned()
    }
}
