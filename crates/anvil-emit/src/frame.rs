//! Local-variable frames.
//!
//! Frames form a stack of lexical scopes. The variables visible at any point
//! are the parent chain's variables followed by the current frame's own, and
//! a variable's slot is its position in that flattened list. Wide types
//! (long, double) reserve the following slot through a hidden placeholder.
//!
//! Exited frames merge their variables into a per-slot history so the debug
//! table can report every generation that occupied a slot.

use crate::error::{EmitError, EmitResult};
use anvil_bytecode::Label;
use anvil_ir::TypeRef;
use std::collections::BTreeMap;

/// A declared local variable.
///
/// Equality is by name and type; lifetime labels and flags do not
/// participate.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub var_type: TypeRef,
    pub start: Label,
    pub end: Option<Label>,
    /// Temporary variables may be redefined and never reach the debug table.
    pub is_temp: bool,
    /// Invisible variables (slot placeholders) are skipped by lookups.
    pub is_visible: bool,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.var_type == other.var_type
    }
}

/// One local-variable debug-table entry, pre-resolution.
#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub name: String,
    pub var_type: TypeRef,
    pub start: Label,
    pub end: Label,
    pub slot: u16,
}

#[derive(Debug)]
struct FrameRec {
    parent: Option<usize>,
    /// Slot offset of this frame's first own variable.
    base: u16,
    own: Vec<Variable>,
    end_label: Option<Label>,
}

/// The frame arena for one method body.
#[derive(Debug)]
pub struct LocalTable {
    frames: Vec<FrameRec>,
    current: usize,
    history: BTreeMap<u16, Vec<Variable>>,
}

impl LocalTable {
    pub fn new() -> Self {
        Self {
            frames: vec![FrameRec {
                parent: None,
                base: 0,
                own: Vec::new(),
                end_label: None,
            }],
            current: 0,
            history: BTreeMap::new(),
        }
    }

    /// Open a child frame. `end_label` is marked by the caller on exit.
    pub fn enter_frame(&mut self, end_label: Label) {
        let base = self.frames[self.current].base + self.frames[self.current].own.len() as u16;
        self.frames.push(FrameRec {
            parent: Some(self.current),
            base,
            own: Vec::new(),
            end_label: Some(end_label),
        });
        self.current = self.frames.len() - 1;
    }

    /// Close the current frame, merging its variables into the history.
    /// Returns the label the caller must mark at the exit point.
    pub fn exit_frame(&mut self) -> EmitResult<Label> {
        let parent = self.frames[self.current]
            .parent
            .ok_or(EmitError::ExitOutermostFrame)?;
        let end = self.frames[self.current].end_label;
        self.archive_frame(self.current, end);
        self.current = parent;
        // enter_frame always sets an end label on child frames
        end.ok_or(EmitError::ExitOutermostFrame)
    }

    fn archive_frame(&mut self, index: usize, end: Option<Label>) {
        let base = self.frames[index].base;
        let own = std::mem::take(&mut self.frames[index].own);
        for (i, mut var) in own.into_iter().enumerate() {
            if var.end.is_none() {
                var.end = end;
            }
            self.history.entry(base + i as u16).or_default().push(var);
        }
    }

    /// Visible variables, outermost first. Slot equals position.
    fn flattened(&self) -> Vec<&Variable> {
        let mut chain = Vec::new();
        let mut cursor = Some(self.current);
        while let Some(i) = cursor {
            chain.push(i);
            cursor = self.frames[i].parent;
        }
        chain
            .iter()
            .rev()
            .flat_map(|&i| self.frames[i].own.iter())
            .collect()
    }

    /// Slot that the next stored variable will receive.
    pub fn next_slot(&self) -> u16 {
        self.frames[self.current].base + self.frames[self.current].own.len() as u16
    }

    /// Declare a variable in the current frame and return its slot.
    ///
    /// Fails if an identical visible non-temporary variable is live anywhere
    /// in the frame chain. An identical temporary is redefined in place.
    pub fn store_var(&mut self, name: &str, var_type: TypeRef, start: Label) -> EmitResult<u16> {
        self.store(name, var_type, start, name.starts_with('#'))
    }

    /// Declare an internal (temporary) variable. Internal variables may be
    /// freely redefined and never appear in the debug table.
    pub fn store_internal_var(
        &mut self,
        name: &str,
        var_type: TypeRef,
        start: Label,
    ) -> EmitResult<u16> {
        self.store(name, var_type, start, true)
    }

    fn store(
        &mut self,
        name: &str,
        var_type: TypeRef,
        start: Label,
        is_temp: bool,
    ) -> EmitResult<u16> {
        let candidate = Variable {
            name: name.to_string(),
            var_type: var_type.clone(),
            start,
            end: None,
            is_temp,
            is_visible: true,
        };
        for (slot, var) in self.flattened().iter().enumerate().rev() {
            if var.is_visible && **var == candidate {
                if var.is_temp {
                    return Ok(slot as u16);
                }
                return Err(EmitError::VariableRedeclaration {
                    name: name.to_string(),
                    var_type: var_type.descriptor(),
                    snapshot: self.snapshot(),
                });
            }
        }
        let slot = self.next_slot();
        let wide = var_type.is_wide();
        self.frames[self.current].own.push(candidate);
        if wide {
            // Placeholder holding the second slot of a wide value.
            self.frames[self.current].own.push(Variable {
                name: format!("#{name}ext_"),
                var_type: TypeRef::VOID,
                start,
                end: None,
                is_temp: true,
                is_visible: false,
            });
        }
        Ok(slot)
    }

    /// Find a visible variable by name, optionally filtering by type.
    pub fn get_var_by_name(
        &self,
        name: &str,
        var_type: Option<&TypeRef>,
    ) -> Option<(u16, &Variable)> {
        self.flattened()
            .into_iter()
            .enumerate()
            .rev()
            .find(|(_, v)| {
                v.is_visible && v.name == name && var_type.map_or(true, |t| &v.var_type == t)
            })
            .map(|(slot, v)| (slot as u16, v))
    }

    /// The visible variable occupying `slot`, if any.
    pub fn get_var(&self, slot: u16) -> Option<&Variable> {
        self.flattened()
            .get(slot as usize)
            .copied()
            .filter(|v| v.is_visible)
    }

    /// A name not used by any visible variable, derived from `base`.
    pub fn unique_name(&self, base: &str) -> String {
        if self.get_var_by_name(base, None).is_none() {
            return base.to_string();
        }
        let mut i = 0usize;
        loop {
            let name = format!("{base}{i}");
            if self.get_var_by_name(&name, None).is_none() {
                return name;
            }
            i += 1;
        }
    }

    /// Human-readable view of the visible variables, for diagnostics.
    pub fn snapshot(&self) -> Vec<String> {
        self.flattened()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_visible)
            .map(|(slot, v)| format!("{}: {} @{}", v.name, v.var_type.descriptor(), slot))
            .collect()
    }

    /// Close every remaining frame and produce the debug-table entries.
    ///
    /// Temporaries, placeholders and `#`-prefixed internals are excluded.
    /// Variables without an end label get `method_end`.
    pub fn finalize(mut self, method_end: Label) -> Vec<DebugEntry> {
        while self.frames[self.current].parent.is_some() {
            // archived with their own end label
            if self.exit_frame().is_err() {
                break;
            }
        }
        self.archive_frame(self.current, Some(method_end));

        let mut entries = Vec::new();
        for (slot, generations) in &self.history {
            for var in generations {
                if var.is_temp || !var.is_visible || var.name.starts_with('#') {
                    continue;
                }
                entries.push(DebugEntry {
                    name: var.name.clone(),
                    var_type: var.var_type.clone(),
                    start: var.start,
                    end: var.end.unwrap_or(method_end),
                    slot: *slot,
                });
            }
        }
        entries
    }
}

impl Default for LocalTable {
    fn default() -> Self {
        Self::new()
    }
}
