//! Sink traits: the collaborator interface the backend drives.
//!
//! The sink is a black box from the emitter's point of view. Calls are
//! strictly ordered; their order *is* the emitted program, so a sink must
//! never reorder or batch them.

use crate::insn::{Insn, Label};

/// Per-method sink. One is obtained per opened method and given back to the
/// class sink when the method body is complete.
pub trait MethodSink {
    /// Create a fresh, unplaced label.
    fn new_label(&mut self) -> Label;

    /// Place a label at the current position.
    fn mark(&mut self, label: Label);

    /// Append one instruction.
    fn emit(&mut self, insn: Insn);

    /// Declare an exception-handler region `[start, end) -> handler`.
    /// `exception: None` catches anything (finally regions).
    fn try_catch(&mut self, start: Label, end: Label, handler: Label, exception: Option<String>);

    /// Declare one local-variable debug-table entry.
    fn local_variable(
        &mut self,
        name: &str,
        desc: &str,
        signature: Option<&str>,
        start: Label,
        end: Label,
        slot: u16,
    );

    /// Declare a line-number entry at `at`.
    fn line(&mut self, line: u16, at: Label);
}

/// Per-class sink.
pub trait ClassSink {
    type Method: MethodSink;

    #[allow(clippy::too_many_arguments)]
    fn begin_class(
        &mut self,
        version: u16,
        access: u16,
        name: &str,
        signature: Option<&str>,
        superclass: &str,
        interfaces: &[String],
    );

    fn visit_field(&mut self, access: u16, name: &str, desc: &str, signature: Option<&str>);

    fn visit_inner_class(&mut self, name: &str, outer: Option<&str>, access: u16);

    fn visit_nest_host(&mut self, host: &str);

    fn visit_nest_member(&mut self, member: &str);

    fn begin_method(
        &mut self,
        access: u16,
        name: &str,
        desc: &str,
        signature: Option<&str>,
    ) -> Self::Method;

    fn end_method(&mut self, method: Self::Method);

    /// Serialize the class into its binary image.
    fn finish(&mut self) -> Vec<u8>;
}
