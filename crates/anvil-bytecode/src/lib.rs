//! Anvil bytecode layer
//!
//! The backend drives a *sink* (a class-writer-style collaborator) through
//! the [`ClassSink`]/[`MethodSink`] traits. This crate defines those traits,
//! the abstract instruction set they accept, a recording implementation that
//! encodes each produced class into a binary container, and a structural
//! verifier over recorded classes.

pub mod encoder;
pub mod insn;
pub mod recording;
pub mod sink;
pub mod verify;

pub use encoder::ByteWriter;
pub use insn::{CmpKind, Insn, InvokeInsn, JumpCond, Label, MathInsn, NumKind, ValueKind};
pub use recording::{
    CodeElem, InnerClassEntry, LocalEntry, RecordedClass, RecordedField, RecordedMethod,
    RecordingClassSink, RecordingMethodSink, Region,
};
pub use sink::{ClassSink, MethodSink};
pub use verify::{verify_class, VerifyError};

/// Magic number for Anvil class containers: "AVBC".
pub const MAGIC: [u8; 4] = *b"AVBC";

/// Current container format version.
pub const CONTAINER_VERSION: u32 = 1;

/// First class file version with nest attributes (Java 11).
pub const NEST_INTRODUCED_VERSION: u16 = 55;
