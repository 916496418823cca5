//! Recording sink
//!
//! Records every sink call in order and serializes the class into the Anvil
//! container format (magic + version + crc32-checksummed payload). The
//! recorded form is also what the structural verifier and the post-emission
//! jump optimizer operate on.

use crate::encoder::ByteWriter;
use crate::insn::{Insn, Label};
use crate::sink::{ClassSink, MethodSink};
use crate::{CONTAINER_VERSION, MAGIC};

/// One element of a recorded method body: an instruction or a placed label.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeElem {
    Insn(Insn),
    Mark(Label),
}

/// A declared exception-handler region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `None` catches anything.
    pub exception: Option<String>,
}

/// One local-variable debug-table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEntry {
    pub name: String,
    pub desc: String,
    pub signature: Option<String>,
    pub start: Label,
    pub end: Label,
    pub slot: u16,
}

#[derive(Debug, Clone)]
pub struct RecordedMethod {
    pub access: u16,
    pub name: String,
    pub desc: String,
    pub signature: Option<String>,
    pub code: Vec<CodeElem>,
    pub regions: Vec<Region>,
    pub locals: Vec<LocalEntry>,
    pub lines: Vec<(u16, Label)>,
}

#[derive(Debug, Clone)]
pub struct RecordedField {
    pub access: u16,
    pub name: String,
    pub desc: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InnerClassEntry {
    pub name: String,
    pub outer: Option<String>,
    pub access: u16,
}

/// A fully recorded class, ready to verify, optimize and serialize.
#[derive(Debug, Clone, Default)]
pub struct RecordedClass {
    pub version: u16,
    pub access: u16,
    pub name: String,
    pub signature: Option<String>,
    pub superclass: String,
    pub interfaces: Vec<String>,
    pub fields: Vec<RecordedField>,
    pub methods: Vec<RecordedMethod>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub nest_host: Option<String>,
    pub nest_members: Vec<String>,
}

impl RecordedClass {
    pub fn method(&self, name: &str, desc: &str) -> Option<&RecordedMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.desc == desc)
    }

    /// Serialize into the container format.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.buffer.extend_from_slice(&MAGIC);
        w.emit_u32(CONTAINER_VERSION);
        let checksum_at = w.offset();
        w.emit_u32(0);

        let payload_start = w.offset();
        w.emit_u16(self.version);
        w.emit_u16(self.access);
        w.emit_str(&self.name);
        w.emit_opt_str(self.signature.as_deref());
        w.emit_str(&self.superclass);
        w.emit_u16(self.interfaces.len() as u16);
        for itf in &self.interfaces {
            w.emit_str(itf);
        }

        w.emit_u16(self.fields.len() as u16);
        for f in &self.fields {
            w.emit_u16(f.access);
            w.emit_str(&f.name);
            w.emit_str(&f.desc);
            w.emit_opt_str(f.signature.as_deref());
        }

        w.emit_u16(self.methods.len() as u16);
        for m in &self.methods {
            m.encode(&mut w);
        }

        w.emit_u16(self.inner_classes.len() as u16);
        for ic in &self.inner_classes {
            w.emit_str(&ic.name);
            w.emit_opt_str(ic.outer.as_deref());
            w.emit_u16(ic.access);
        }

        w.emit_opt_str(self.nest_host.as_deref());
        w.emit_u16(self.nest_members.len() as u16);
        for n in &self.nest_members {
            w.emit_str(n);
        }

        let checksum = crc32fast::hash(&w.buffer[payload_start..]);
        w.patch_u32(checksum_at, checksum);
        w.into_bytes()
    }
}

impl RecordedMethod {
    fn encode(&self, w: &mut ByteWriter) {
        w.emit_u16(self.access);
        w.emit_str(&self.name);
        w.emit_str(&self.desc);
        w.emit_opt_str(self.signature.as_deref());

        // Code is serialized as JSON inside the container; the real class
        // file serializer is a separate collaborator.
        let code = serde_json::to_vec(
            &self
                .code
                .iter()
                .map(|e| match e {
                    CodeElem::Insn(i) => serde_json::json!({ "i": i }),
                    CodeElem::Mark(l) => serde_json::json!({ "l": l.0 }),
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_default();
        w.emit_u32(code.len() as u32);
        w.buffer.extend_from_slice(&code);

        w.emit_u16(self.regions.len() as u16);
        for r in &self.regions {
            w.emit_u32(r.start.0);
            w.emit_u32(r.end.0);
            w.emit_u32(r.handler.0);
            w.emit_opt_str(r.exception.as_deref());
        }

        w.emit_u16(self.locals.len() as u16);
        for l in &self.locals {
            w.emit_str(&l.name);
            w.emit_str(&l.desc);
            w.emit_opt_str(l.signature.as_deref());
            w.emit_u32(l.start.0);
            w.emit_u32(l.end.0);
            w.emit_u16(l.slot);
        }

        w.emit_u16(self.lines.len() as u16);
        for (line, at) in &self.lines {
            w.emit_u16(*line);
            w.emit_u32(at.0);
        }
    }
}

/// Method sink that records calls in order.
#[derive(Debug)]
pub struct RecordingMethodSink {
    method: RecordedMethod,
    next_label: u32,
}

impl RecordingMethodSink {
    fn new(access: u16, name: &str, desc: &str, signature: Option<&str>) -> Self {
        Self {
            method: RecordedMethod {
                access,
                name: name.to_string(),
                desc: desc.to_string(),
                signature: signature.map(str::to_string),
                code: Vec::new(),
                regions: Vec::new(),
                locals: Vec::new(),
                lines: Vec::new(),
            },
            next_label: 0,
        }
    }
}

impl MethodSink for RecordingMethodSink {
    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn mark(&mut self, label: Label) {
        self.method.code.push(CodeElem::Mark(label));
    }

    fn emit(&mut self, insn: Insn) {
        self.method.code.push(CodeElem::Insn(insn));
    }

    fn try_catch(&mut self, start: Label, end: Label, handler: Label, exception: Option<String>) {
        self.method.regions.push(Region {
            start,
            end,
            handler,
            exception,
        });
    }

    fn local_variable(
        &mut self,
        name: &str,
        desc: &str,
        signature: Option<&str>,
        start: Label,
        end: Label,
        slot: u16,
    ) {
        self.method.locals.push(LocalEntry {
            name: name.to_string(),
            desc: desc.to_string(),
            signature: signature.map(str::to_string),
            start,
            end,
            slot,
        });
    }

    fn line(&mut self, line: u16, at: Label) {
        self.method.lines.push((line, at));
    }
}

/// Class sink that records everything into a [`RecordedClass`].
#[derive(Debug, Default)]
pub struct RecordingClassSink {
    pub class: RecordedClass,
}

impl RecordingClassSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClassSink for RecordingClassSink {
    type Method = RecordingMethodSink;

    fn begin_class(
        &mut self,
        version: u16,
        access: u16,
        name: &str,
        signature: Option<&str>,
        superclass: &str,
        interfaces: &[String],
    ) {
        self.class.version = version;
        self.class.access = access;
        self.class.name = name.to_string();
        self.class.signature = signature.map(str::to_string);
        self.class.superclass = superclass.to_string();
        self.class.interfaces = interfaces.to_vec();
    }

    fn visit_field(&mut self, access: u16, name: &str, desc: &str, signature: Option<&str>) {
        self.class.fields.push(RecordedField {
            access,
            name: name.to_string(),
            desc: desc.to_string(),
            signature: signature.map(str::to_string),
        });
    }

    fn visit_inner_class(&mut self, name: &str, outer: Option<&str>, access: u16) {
        self.class.inner_classes.push(InnerClassEntry {
            name: name.to_string(),
            outer: outer.map(str::to_string),
            access,
        });
    }

    fn visit_nest_host(&mut self, host: &str) {
        self.class.nest_host = Some(host.to_string());
    }

    fn visit_nest_member(&mut self, member: &str) {
        self.class.nest_members.push(member.to_string());
    }

    fn begin_method(
        &mut self,
        access: u16,
        name: &str,
        desc: &str,
        signature: Option<&str>,
    ) -> RecordingMethodSink {
        RecordingMethodSink::new(access, name, desc, signature)
    }

    fn end_method(&mut self, method: RecordingMethodSink) {
        self.class.methods.push(method.method);
    }

    fn finish(&mut self) -> Vec<u8> {
        self.class.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insn::ValueKind;

    #[test]
    fn test_recording_order_is_preserved() {
        let mut sink = RecordingClassSink::new();
        sink.begin_class(52, 0x21, "t/Foo", None, "java/lang/Object", &[]);
        let mut m = sink.begin_method(0x1, "f", "()I", None);
        let start = m.new_label();
        m.mark(start);
        m.emit(Insn::PushInt(1));
        m.emit(Insn::Return(Some(ValueKind::Int)));
        sink.end_method(m);

        let method = sink.class.method("f", "()I").unwrap();
        assert_eq!(method.code.len(), 3);
        assert!(matches!(method.code[0], CodeElem::Mark(Label(0))));
        assert!(matches!(method.code[1], CodeElem::Insn(Insn::PushInt(1))));
    }

    #[test]
    fn test_container_header_and_checksum() {
        let mut sink = RecordingClassSink::new();
        sink.begin_class(52, 0x21, "t/Foo", None, "java/lang/Object", &[]);
        let bytes = sink.finish();

        assert_eq!(&bytes[..4], &MAGIC);
        let checksum = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(checksum, crc32fast::hash(&bytes[12..]));
    }

    #[test]
    fn test_labels_are_unique_per_method() {
        let mut sink = RecordingClassSink::new();
        sink.begin_class(52, 0x21, "t/Foo", None, "java/lang/Object", &[]);
        let mut m = sink.begin_method(0x1, "f", "()V", None);
        assert_ne!(m.new_label(), m.new_label());
    }
}
