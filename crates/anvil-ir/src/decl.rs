//! Declaration forms: classes, interfaces, enums and their members.

use crate::instr::Instruction;
use crate::types::{MethodSig, TypeRef, TypeSpec};
use serde::{Deserialize, Serialize};

/// JVM access and property flags.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const BRIDGE: u16 = 0x0040;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ENUM: u16 = 0x4000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
}

/// A type declaration: the unit the backend compiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    /// Internal name, e.g. `com/example/Foo`.
    pub name: String,
    pub modifiers: u16,
    pub superclass: TypeRef,
    pub interfaces: Vec<TypeRef>,
    /// Generic signature, if the declaration carries one.
    pub signature: Option<String>,
    pub fields: Vec<FieldDeclaration>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    /// Static initializer statements; merged into one `<clinit>`.
    pub static_block: Vec<Instruction>,
    pub inner_types: Vec<TypeDeclaration>,
    /// Enum constants, in declaration order. Only meaningful for
    /// `TypeKind::Enum`.
    pub enum_entries: Vec<EnumEntry>,
    /// The erased method signatures of the full supertype/interface closure,
    /// resolved by the producer. Bridge synthesis consumes this; an empty
    /// list disables bridge generation for the type.
    pub resolved_super_signatures: Vec<MethodSig>,
}

impl TypeDeclaration {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            modifiers: access::PUBLIC,
            superclass: TypeRef::object(),
            interfaces: vec![],
            signature: None,
            fields: vec![],
            constructors: vec![],
            methods: vec![],
            static_block: vec![],
            inner_types: vec![],
            enum_entries: vec![],
            resolved_super_signatures: vec![],
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::reference(self.name.clone())
    }

    /// Simple (unqualified) name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    pub modifiers: u16,
    pub params: Vec<Parameter>,
    pub return_type: TypeRef,
    pub signature: Option<String>,
    /// `None` for abstract/interface methods.
    pub body: Option<Vec<Instruction>>,
}

impl MethodDeclaration {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Parameter>,
        return_type: TypeRef,
        body: Vec<Instruction>,
    ) -> Self {
        Self {
            name: name.into(),
            modifiers: access::PUBLIC,
            params,
            return_type,
            signature: None,
            body: Some(body),
        }
    }

    pub fn spec(&self) -> TypeSpec {
        TypeSpec::new(
            self.return_type.clone(),
            self.params.iter().map(|p| p.param_type.clone()).collect(),
        )
    }

    pub fn sig(&self) -> MethodSig {
        MethodSig::new(self.name.clone(), self.spec())
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & access::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & access::PRIVATE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDeclaration {
    pub modifiers: u16,
    pub params: Vec<Parameter>,
    pub body: Vec<Instruction>,
}

impl ConstructorDeclaration {
    pub fn new(params: Vec<Parameter>, body: Vec<Instruction>) -> Self {
        Self {
            modifiers: access::PUBLIC,
            params,
            body,
        }
    }

    pub fn spec(&self) -> TypeSpec {
        TypeSpec::new(
            TypeRef::VOID,
            self.params.iter().map(|p| p.param_type.clone()).collect(),
        )
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & access::PRIVATE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub modifiers: u16,
    pub field_type: TypeRef,
    pub signature: Option<String>,
    /// Initializer; moved into constructors (or `<clinit>` for statics).
    pub value: Option<Instruction>,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            modifiers: access::PUBLIC,
            field_type,
            signature: None,
            value: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & access::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & access::PRIVATE != 0
    }
}

/// One enum constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: String,
    /// Arguments to the enum's own constructor (`name`/`ordinal` excluded;
    /// synthesis prepends those).
    pub args: Vec<Instruction>,
    /// Entry body; present when the constant declares fields or overrides
    /// methods, which forces a per-entry subtype.
    pub body: Option<EnumEntryBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntryBody {
    pub fields: Vec<FieldDeclaration>,
    pub methods: Vec<MethodDeclaration>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, args: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            args,
            body: None,
        }
    }
}
