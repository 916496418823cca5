//! Erased JVM type references
//!
//! Types are already resolved and erased by the IR producer; the backend only
//! needs descriptors, widths and boxing relations.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// JVM primitive kinds, `void` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    /// Descriptor character for this primitive.
    pub fn descriptor(&self) -> char {
        match self {
            Primitive::Void => 'V',
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Short => 'S',
            Primitive::Char => 'C',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }

    /// Whether values of this kind occupy two local slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Primitive::Long | Primitive::Double)
    }

    /// Whether this kind is stored and compared as a 32-bit int.
    pub fn is_int_like(&self) -> bool {
        matches!(
            self,
            Primitive::Boolean
                | Primitive::Byte
                | Primitive::Short
                | Primitive::Char
                | Primitive::Int
        )
    }
}

/// An erased type reference: primitive, class reference (by internal name,
/// e.g. `java/lang/String`) or array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Primitive(Primitive),
    Reference(String),
    Array(Box<TypeRef>),
}

static BOXED: Lazy<FxHashMap<Primitive, &'static str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert(Primitive::Boolean, "java/lang/Boolean");
    m.insert(Primitive::Byte, "java/lang/Byte");
    m.insert(Primitive::Short, "java/lang/Short");
    m.insert(Primitive::Char, "java/lang/Character");
    m.insert(Primitive::Int, "java/lang/Integer");
    m.insert(Primitive::Long, "java/lang/Long");
    m.insert(Primitive::Float, "java/lang/Float");
    m.insert(Primitive::Double, "java/lang/Double");
    m
});

impl TypeRef {
    pub const VOID: TypeRef = TypeRef::Primitive(Primitive::Void);
    pub const BOOLEAN: TypeRef = TypeRef::Primitive(Primitive::Boolean);
    pub const BYTE: TypeRef = TypeRef::Primitive(Primitive::Byte);
    pub const SHORT: TypeRef = TypeRef::Primitive(Primitive::Short);
    pub const CHAR: TypeRef = TypeRef::Primitive(Primitive::Char);
    pub const INT: TypeRef = TypeRef::Primitive(Primitive::Int);
    pub const LONG: TypeRef = TypeRef::Primitive(Primitive::Long);
    pub const FLOAT: TypeRef = TypeRef::Primitive(Primitive::Float);
    pub const DOUBLE: TypeRef = TypeRef::Primitive(Primitive::Double);

    /// Class reference from an internal name.
    pub fn reference(name: impl Into<String>) -> TypeRef {
        TypeRef::Reference(name.into())
    }

    pub fn array(component: TypeRef) -> TypeRef {
        TypeRef::Array(Box::new(component))
    }

    pub fn object() -> TypeRef {
        TypeRef::reference("java/lang/Object")
    }

    pub fn string() -> TypeRef {
        TypeRef::reference("java/lang/String")
    }

    pub fn throwable() -> TypeRef {
        TypeRef::reference("java/lang/Throwable")
    }

    pub fn enum_base() -> TypeRef {
        TypeRef::reference("java/lang/Enum")
    }

    /// JVM descriptor, e.g. `I`, `Ljava/lang/String;`, `[I`.
    pub fn descriptor(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.descriptor().to_string(),
            TypeRef::Reference(name) => format!("L{};", name),
            TypeRef::Array(component) => format!("[{}", component.descriptor()),
        }
    }

    /// Internal name for class and array references.
    ///
    /// Arrays use their descriptor as internal name, as the class file format
    /// does.
    pub fn internal_name(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.descriptor().to_string(),
            TypeRef::Reference(name) => name.clone(),
            TypeRef::Array(_) => self.descriptor(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(p) if *p != Primitive::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Primitive(Primitive::Void))
    }

    /// Whether values of this type occupy two local slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, TypeRef::Primitive(p) if p.is_wide())
    }

    /// Whether this type is compared with the int branch family.
    pub fn is_int_like(&self) -> bool {
        matches!(self, TypeRef::Primitive(p) if p.is_int_like())
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Wrapper class for a primitive type, `None` for everything else.
    pub fn boxed(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Primitive(p) => BOXED.get(p).map(|n| TypeRef::reference(*n)),
            _ => None,
        }
    }

    /// Primitive kind a wrapper class unboxes to, `None` for non-wrappers.
    pub fn unboxed(&self) -> Option<Primitive> {
        match self {
            TypeRef::Reference(name) => BOXED
                .iter()
                .find(|(_, boxed)| **boxed == name.as_str())
                .map(|(p, _)| *p),
            _ => None,
        }
    }
}

/// A method's shape: return type and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    pub ret: TypeRef,
    pub params: Vec<TypeRef>,
}

impl TypeSpec {
    pub fn new(ret: TypeRef, params: Vec<TypeRef>) -> Self {
        Self { ret, params }
    }

    pub fn void() -> Self {
        Self::new(TypeRef::VOID, vec![])
    }

    /// Method descriptor, e.g. `(I[I)V`.
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for p in &self.params {
            out.push_str(&p.descriptor());
        }
        out.push(')');
        out.push_str(&self.ret.descriptor());
        out
    }
}

/// A named, already-erased method signature. Used for the resolved supertype
/// closure consumed by bridge synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub spec: TypeSpec,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors() {
        assert_eq!(TypeRef::INT.descriptor(), "I");
        assert_eq!(TypeRef::string().descriptor(), "Ljava/lang/String;");
        assert_eq!(TypeRef::array(TypeRef::INT).descriptor(), "[I");
        assert_eq!(
            TypeRef::array(TypeRef::array(TypeRef::object())).descriptor(),
            "[[Ljava/lang/Object;"
        );
    }

    #[test]
    fn test_method_descriptor() {
        let spec = TypeSpec::new(TypeRef::INT, vec![TypeRef::array(TypeRef::INT)]);
        assert_eq!(spec.descriptor(), "([I)I");
        assert_eq!(TypeSpec::void().descriptor(), "()V");
    }

    #[test]
    fn test_wide_types() {
        assert!(TypeRef::LONG.is_wide());
        assert!(TypeRef::DOUBLE.is_wide());
        assert!(!TypeRef::INT.is_wide());
        assert!(!TypeRef::object().is_wide());
    }

    #[test]
    fn test_boxing_relation() {
        assert_eq!(
            TypeRef::INT.boxed(),
            Some(TypeRef::reference("java/lang/Integer"))
        );
        assert_eq!(
            TypeRef::reference("java/lang/Integer").unboxed(),
            Some(Primitive::Int)
        );
        assert_eq!(TypeRef::object().unboxed(), None);
        assert_eq!(TypeRef::object().boxed(), None);
    }
}
