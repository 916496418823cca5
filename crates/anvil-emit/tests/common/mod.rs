//! A small abstract machine over recorded classes.
//!
//! Executes the instruction stream the backend emits, with just enough of
//! the runtime modeled to observe control flow, exception dispatch and
//! field state: a heap of instances and arrays, lazy static initializers,
//! exception regions, and host shims for the handful of platform methods
//! emitted code calls (`Object.<init>`, `Enum.<init>`, `ordinal`,
//! `addSuppressed`, array `clone`).

#![allow(dead_code)]

use anvil_bytecode::{
    CmpKind, CodeElem, Insn, InvokeInsn, JumpCond, Label, MathInsn, NumKind, RecordedClass,
    RecordedMethod, ValueKind,
};
use anvil_emit::{BytecodeGenerator, BytecodeOptions};
use anvil_ir::decl::TypeDeclaration;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Val {
    I(i32),
    J(i64),
    F(f32),
    D(f64),
    Null,
    Obj(usize),
}

impl Val {
    pub fn as_i(self) -> i32 {
        match self {
            Val::I(v) => v,
            other => panic!("expected int, got {other:?}"),
        }
    }

    pub fn as_j(self) -> i64 {
        match self {
            Val::J(v) => v,
            other => panic!("expected long, got {other:?}"),
        }
    }

    pub fn as_obj(self) -> usize {
        match self {
            Val::Obj(h) => h,
            other => panic!("expected reference, got {other:?}"),
        }
    }

    fn is_wide(self) -> bool {
        matches!(self, Val::J(_) | Val::D(_))
    }
}

#[derive(Debug, Clone)]
pub enum Obj {
    Array(Vec<Val>),
    Str(String),
    Instance {
        class: String,
        fields: HashMap<String, Val>,
        suppressed: Vec<Val>,
    },
}

fn default_val(desc: &str) -> Val {
    match ValueKind::of_descriptor(desc) {
        ValueKind::Int => Val::I(0),
        ValueKind::Long => Val::J(0),
        ValueKind::Float => Val::F(0.0),
        ValueKind::Double => Val::D(0.0),
        ValueKind::Ref => Val::Null,
    }
}

/// Parameter and return categories of a method descriptor.
fn parse_desc(desc: &str) -> (Vec<ValueKind>, Option<ValueKind>) {
    let bytes = desc.as_bytes();
    let mut params = Vec::new();
    let mut i = 1;
    while bytes[i] != b')' {
        let start = i;
        while bytes[i] == b'[' {
            i += 1;
        }
        if bytes[i] == b'L' {
            while bytes[i] != b';' {
                i += 1;
            }
        }
        i += 1;
        let kind = if bytes[start] == b'[' {
            ValueKind::Ref
        } else {
            ValueKind::of_descriptor(&desc[start..])
        };
        params.push(kind);
    }
    let ret = match bytes[i + 1] {
        b'V' => None,
        _ => Some(if bytes[i + 1] == b'[' {
            ValueKind::Ref
        } else {
            ValueKind::of_descriptor(&desc[i + 1..])
        }),
    };
    (params, ret)
}

pub struct Machine {
    classes: HashMap<String, RecordedClass>,
    pub heap: Vec<Obj>,
    pub statics: HashMap<(String, String), Val>,
    initialized: HashSet<String>,
}

/// Compile declarations with default options and load the result.
pub fn machine_for(decls: &[TypeDeclaration]) -> Machine {
    machine_with(&BytecodeGenerator::new(), decls)
}

pub fn machine_with(generator: &BytecodeGenerator, decls: &[TypeDeclaration]) -> Machine {
    let mut machine = Machine::new();
    for decl in decls {
        for class in generator.process(decl).expect("emission failed") {
            machine.load(class.recorded);
        }
    }
    machine
}

pub fn default_options() -> BytecodeOptions {
    BytecodeOptions::default()
}

impl Machine {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
            heap: Vec::new(),
            statics: HashMap::new(),
            initialized: HashSet::new(),
        }
    }

    pub fn load(&mut self, class: RecordedClass) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn alloc(&mut self, obj: Obj) -> Val {
        self.heap.push(obj);
        Val::Obj(self.heap.len() - 1)
    }

    pub fn alloc_int_array(&mut self, values: &[i32]) -> Val {
        self.alloc(Obj::Array(values.iter().map(|v| Val::I(*v)).collect()))
    }

    pub fn static_field(&self, class: &str, name: &str) -> Val {
        self.statics[&(class.to_string(), name.to_string())]
    }

    pub fn suppressed_count(&self, exc: Val) -> usize {
        match &self.heap[exc.as_obj()] {
            Obj::Instance { suppressed, .. } => suppressed.len(),
            other => panic!("not an instance: {other:?}"),
        }
    }

    /// Call a static method; panics if it throws.
    pub fn call_static(&mut self, class: &str, name: &str, desc: &str, args: Vec<Val>) -> Option<Val> {
        match self.invoke_on_class(class, name, desc, None, args) {
            Ok(v) => v,
            Err(exc) => panic!("uncaught {}", self.class_of(exc)),
        }
    }

    /// Call a static method, returning the thrown exception if any.
    pub fn call_static_catching(
        &mut self,
        class: &str,
        name: &str,
        desc: &str,
        args: Vec<Val>,
    ) -> Result<Option<Val>, Val> {
        self.invoke_on_class(class, name, desc, None, args)
    }

    pub fn class_of(&self, val: Val) -> String {
        match val {
            Val::Obj(h) => match &self.heap[h] {
                Obj::Instance { class, .. } => class.clone(),
                Obj::Array(_) => "array".to_string(),
                Obj::Str(_) => "java/lang/String".to_string(),
            },
            other => panic!("not a reference: {other:?}"),
        }
    }

    fn is_subtype(&self, class: &str, target: &str) -> bool {
        let mut current = class.to_string();
        loop {
            if current == target || target == "java/lang/Object" {
                return true;
            }
            current = match self.classes.get(&current) {
                Some(c) => c.superclass.clone(),
                None => match current.as_str() {
                    "java/lang/RuntimeException" | "java/lang/ClassCastException"
                    | "java/lang/IllegalStateException" | "java/lang/ArithmeticException" => {
                        "java/lang/Exception".to_string()
                    }
                    "java/lang/NoSuchFieldError" => "java/lang/Error".to_string(),
                    "java/lang/Exception" | "java/lang/Error" => "java/lang/Throwable".to_string(),
                    "java/lang/Enum" => "java/lang/Object".to_string(),
                    _ => return false,
                },
            };
        }
    }

    fn throw_new(&mut self, class: &str) -> Val {
        self.alloc(Obj::Instance {
            class: class.to_string(),
            fields: HashMap::new(),
            suppressed: Vec::new(),
        })
    }

    fn ensure_init(&mut self, class: &str) -> Result<(), Val> {
        if !self.classes.contains_key(class) || self.initialized.contains(class) {
            return Ok(());
        }
        self.initialized.insert(class.to_string());
        if let Some(clinit) = self.classes[class].method("<clinit>", "()V").cloned() {
            self.run(&clinit, Vec::new())?;
        }
        Ok(())
    }

    fn invoke_on_class(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        recv: Option<Val>,
        args: Vec<Val>,
    ) -> Result<Option<Val>, Val> {
        self.ensure_init(owner)?;
        if let Some(method) = self
            .classes
            .get(owner)
            .and_then(|c| c.method(name, desc))
            .cloned()
        {
            let mut locals = Vec::new();
            if let Some(r) = recv {
                locals.push(r);
            }
            for arg in args {
                let wide = arg.is_wide();
                locals.push(arg);
                if wide {
                    locals.push(Val::I(0));
                }
            }
            return self.run(&method, locals);
        }
        self.host_call(owner, name, recv, args)
    }

    /// Shims for the platform methods emitted code reaches for.
    fn host_call(
        &mut self,
        owner: &str,
        name: &str,
        recv: Option<Val>,
        args: Vec<Val>,
    ) -> Result<Option<Val>, Val> {
        match name {
            "<init>" if owner == "java/lang/Enum" => {
                if let Obj::Instance { fields, .. } = &mut self.heap[recv.unwrap().as_obj()] {
                    fields.insert("$name".to_string(), args[0]);
                    fields.insert("$ordinal".to_string(), args[1]);
                }
                Ok(None)
            }
            // Constructors of platform exception types carry no observable
            // state here.
            "<init>" => Ok(None),
            "ordinal" | "name" => {
                let key = if name == "ordinal" { "$ordinal" } else { "$name" };
                match &self.heap[recv.unwrap().as_obj()] {
                    Obj::Instance { fields, .. } => Ok(Some(fields[key])),
                    other => panic!("not an instance: {other:?}"),
                }
            }
            "addSuppressed" => {
                if let Obj::Instance { suppressed, .. } = &mut self.heap[recv.unwrap().as_obj()] {
                    suppressed.push(args[0]);
                }
                Ok(None)
            }
            "getSuppressed" => {
                let list = match &self.heap[recv.unwrap().as_obj()] {
                    Obj::Instance { suppressed, .. } => suppressed.clone(),
                    other => panic!("not an instance: {other:?}"),
                };
                Ok(Some(self.alloc(Obj::Array(list))))
            }
            "clone" => {
                let copy = match &self.heap[recv.unwrap().as_obj()] {
                    Obj::Array(values) => Obj::Array(values.clone()),
                    other => panic!("clone on non-array: {other:?}"),
                };
                Ok(Some(self.alloc(copy)))
            }
            _ => panic!("no host method {owner}.{name}"),
        }
    }

    fn run(&mut self, method: &RecordedMethod, mut locals: Vec<Val>) -> Result<Option<Val>, Val> {
        let marks: HashMap<Label, usize> = method
            .code
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                CodeElem::Mark(l) => Some((*l, i)),
                _ => None,
            })
            .collect();
        let mut stack: Vec<Val> = Vec::new();
        let mut pc = 0usize;

        while pc < method.code.len() {
            let insn = match &method.code[pc] {
                CodeElem::Mark(_) => {
                    pc += 1;
                    continue;
                }
                CodeElem::Insn(insn) => insn.clone(),
            };
            let step = self.step(&insn, &mut stack, &mut locals, &marks);
            match step {
                Ok(Flow::Next) => pc += 1,
                Ok(Flow::Goto(target)) => pc = marks[&target],
                Ok(Flow::Return(v)) => return Ok(v),
                Err(exc) => {
                    let handler = self.dispatch(method, &marks, pc, exc)?;
                    stack.clear();
                    stack.push(exc);
                    pc = handler;
                }
            }
        }
        panic!("fell off the end of {}", method.name);
    }

    /// Find the handler for an exception thrown at `pc`, or propagate.
    fn dispatch(
        &self,
        method: &RecordedMethod,
        marks: &HashMap<Label, usize>,
        pc: usize,
        exc: Val,
    ) -> Result<usize, Val> {
        let class = self.class_of(exc);
        for region in &method.regions {
            let (start, end) = (marks[&region.start], marks[&region.end]);
            if pc < start || pc >= end {
                continue;
            }
            let matches = match &region.exception {
                None => true,
                Some(name) => self.is_subtype(&class, name),
            };
            if matches {
                return Ok(marks[&region.handler]);
            }
        }
        Err(exc)
    }

    fn step(
        &mut self,
        insn: &Insn,
        stack: &mut Vec<Val>,
        locals: &mut Vec<Val>,
        _marks: &HashMap<Label, usize>,
    ) -> Result<Flow, Val> {
        match insn {
            Insn::PushInt(v) => stack.push(Val::I(*v)),
            Insn::PushLong(v) => stack.push(Val::J(*v)),
            Insn::PushFloat(v) => stack.push(Val::F(*v)),
            Insn::PushDouble(v) => stack.push(Val::D(*v)),
            Insn::PushString(s) => {
                let v = self.alloc(Obj::Str(s.clone()));
                stack.push(v);
            }
            Insn::PushClass(name) => {
                let v = self.alloc(Obj::Str(name.clone()));
                stack.push(v);
            }
            Insn::PushNull => stack.push(Val::Null),

            Insn::Load { slot, .. } => stack.push(locals[*slot as usize]),
            Insn::Store { slot, .. } => {
                let v = stack.pop().unwrap();
                let needed = *slot as usize + if v.is_wide() { 2 } else { 1 };
                if locals.len() < needed {
                    locals.resize(needed, Val::I(0));
                }
                locals[*slot as usize] = v;
            }

            Insn::Math { op, kind } => {
                let result = self.math(*op, *kind, stack)?;
                stack.push(result);
            }
            Insn::Neg(kind) => {
                let v = stack.pop().unwrap();
                stack.push(match (kind, v) {
                    (ValueKind::Int, Val::I(v)) => Val::I(v.wrapping_neg()),
                    (ValueKind::Long, Val::J(v)) => Val::J(v.wrapping_neg()),
                    (ValueKind::Float, Val::F(v)) => Val::F(-v),
                    (ValueKind::Double, Val::D(v)) => Val::D(-v),
                    other => panic!("bad neg operand: {other:?}"),
                });
            }
            Insn::Convert { from, to } => {
                let v = stack.pop().unwrap();
                stack.push(convert(v, *from, *to));
            }
            Insn::Cmp(kind) => {
                let b = stack.pop().unwrap();
                let a = stack.pop().unwrap();
                stack.push(Val::I(compare(*kind, a, b)));
            }

            Insn::Jump { cond, target } => {
                if self.jump_taken(*cond, stack) {
                    return Ok(Flow::Goto(*target));
                }
            }
            Insn::TableSwitch {
                min,
                default,
                targets,
            } => {
                let v = stack.pop().unwrap().as_i();
                let idx = v as i64 - *min as i64;
                let target = if idx >= 0 && (idx as usize) < targets.len() {
                    targets[idx as usize]
                } else {
                    *default
                };
                return Ok(Flow::Goto(target));
            }
            Insn::LookupSwitch { default, pairs } => {
                let v = stack.pop().unwrap().as_i();
                let target = pairs
                    .iter()
                    .find(|(key, _)| *key == v)
                    .map(|(_, l)| *l)
                    .unwrap_or(*default);
                return Ok(Flow::Goto(target));
            }

            Insn::GetField {
                owner,
                name,
                desc,
                is_static,
            } => {
                if *is_static {
                    self.ensure_init(owner)?;
                    let key = (owner.clone(), name.clone());
                    let v = match self.statics.get(&key) {
                        Some(v) => *v,
                        None => {
                            let declared = self
                                .classes
                                .get(owner)
                                .map_or(false, |c| c.fields.iter().any(|f| &f.name == name));
                            if !declared {
                                let exc = self.throw_new("java/lang/NoSuchFieldError");
                                return Err(exc);
                            }
                            default_val(desc)
                        }
                    };
                    stack.push(v);
                } else {
                    let recv = stack.pop().unwrap();
                    let v = match &self.heap[recv.as_obj()] {
                        Obj::Instance { fields, .. } => {
                            fields.get(name).copied().unwrap_or_else(|| default_val(desc))
                        }
                        other => panic!("getfield on {other:?}"),
                    };
                    stack.push(v);
                }
            }
            Insn::PutField {
                owner,
                name,
                is_static,
                ..
            } => {
                let v = stack.pop().unwrap();
                if *is_static {
                    self.ensure_init(owner)?;
                    self.statics.insert((owner.clone(), name.clone()), v);
                } else {
                    let recv = stack.pop().unwrap();
                    match &mut self.heap[recv.as_obj()] {
                        Obj::Instance { fields, .. } => {
                            fields.insert(name.clone(), v);
                        }
                        other => panic!("putfield on {other:?}"),
                    }
                }
            }

            Insn::Invoke {
                kind,
                owner,
                name,
                desc,
            } => {
                let (params, _) = parse_desc(desc);
                let mut args = vec![Val::Null; params.len()];
                for slot in args.iter_mut().rev() {
                    *slot = stack.pop().unwrap();
                }
                let recv = match kind {
                    InvokeInsn::Static => None,
                    _ => Some(stack.pop().unwrap()),
                };
                // Virtual dispatch starts at the runtime class.
                let dispatch_owner = match (kind, recv) {
                    (InvokeInsn::Virtual | InvokeInsn::Interface, Some(Val::Obj(h))) => {
                        match &self.heap[h] {
                            Obj::Instance { class, .. } => self.resolve(class, name, desc),
                            _ => owner.clone(),
                        }
                    }
                    _ => owner.clone(),
                };
                if let Some(v) = self.invoke_on_class(&dispatch_owner, name, desc, recv, args)? {
                    stack.push(v);
                }
            }
            Insn::New(class) => {
                self.ensure_init(class)?;
                let v = self.alloc(Obj::Instance {
                    class: class.clone(),
                    fields: HashMap::new(),
                    suppressed: Vec::new(),
                });
                stack.push(v);
            }

            Insn::NewArray { component } => {
                let len = stack.pop().unwrap().as_i();
                let fill = default_val(component);
                let v = self.alloc(Obj::Array(vec![fill; len as usize]));
                stack.push(v);
            }
            Insn::ArrayLoad(_) => {
                let idx = stack.pop().unwrap().as_i();
                let arr = stack.pop().unwrap();
                match &self.heap[arr.as_obj()] {
                    Obj::Array(values) => stack.push(values[idx as usize]),
                    other => panic!("arrayload on {other:?}"),
                }
            }
            Insn::ArrayStore(_) => {
                let v = stack.pop().unwrap();
                let idx = stack.pop().unwrap().as_i();
                let arr = stack.pop().unwrap();
                match &mut self.heap[arr.as_obj()] {
                    Obj::Array(values) => values[idx as usize] = v,
                    other => panic!("arraystore on {other:?}"),
                }
            }
            Insn::ArrayLength => {
                let arr = stack.pop().unwrap();
                match &self.heap[arr.as_obj()] {
                    Obj::Array(values) => stack.push(Val::I(values.len() as i32)),
                    other => panic!("arraylength on {other:?}"),
                }
            }

            Insn::CheckCast(_) => {}
            Insn::InstanceOf(target) => {
                let v = stack.pop().unwrap();
                let result = match v {
                    Val::Null => false,
                    _ => self.is_subtype(&self.class_of(v), target),
                };
                stack.push(Val::I(result as i32));
            }

            Insn::Dup => {
                let v = *stack.last().unwrap();
                stack.push(v);
            }
            Insn::DupX1 => {
                let a = stack.pop().unwrap();
                let b = stack.pop().unwrap();
                stack.push(a);
                stack.push(b);
                stack.push(a);
            }
            Insn::Pop => {
                stack.pop().unwrap();
            }
            Insn::Pop2 => {
                let v = stack.pop().unwrap();
                if !v.is_wide() {
                    stack.pop().unwrap();
                }
            }

            Insn::Return(None) => return Ok(Flow::Return(None)),
            Insn::Return(Some(_)) => return Ok(Flow::Return(Some(stack.pop().unwrap()))),
            Insn::Athrow => {
                let exc = stack.pop().unwrap();
                return Err(exc);
            }
        }
        Ok(Flow::Next)
    }

    /// The compiled class actually defining `name`/`desc`, following the
    /// superclass chain from the runtime class.
    fn resolve(&self, runtime_class: &str, name: &str, desc: &str) -> String {
        let mut current = runtime_class.to_string();
        while let Some(class) = self.classes.get(&current) {
            if class.method(name, desc).is_some() {
                return current;
            }
            current = class.superclass.clone();
        }
        current
    }

    fn jump_taken(&self, cond: JumpCond, stack: &mut Vec<Val>) -> bool {
        match cond {
            JumpCond::Goto => true,
            JumpCond::IfEq | JumpCond::IfNe | JumpCond::IfLt | JumpCond::IfLe | JumpCond::IfGt
            | JumpCond::IfGe => {
                let v = stack.pop().unwrap().as_i();
                match cond {
                    JumpCond::IfEq => v == 0,
                    JumpCond::IfNe => v != 0,
                    JumpCond::IfLt => v < 0,
                    JumpCond::IfLe => v <= 0,
                    JumpCond::IfGt => v > 0,
                    _ => v >= 0,
                }
            }
            JumpCond::IfICmpEq | JumpCond::IfICmpNe | JumpCond::IfICmpLt | JumpCond::IfICmpLe
            | JumpCond::IfICmpGt | JumpCond::IfICmpGe => {
                let b = stack.pop().unwrap().as_i();
                let a = stack.pop().unwrap().as_i();
                match cond {
                    JumpCond::IfICmpEq => a == b,
                    JumpCond::IfICmpNe => a != b,
                    JumpCond::IfICmpLt => a < b,
                    JumpCond::IfICmpLe => a <= b,
                    JumpCond::IfICmpGt => a > b,
                    _ => a >= b,
                }
            }
            JumpCond::IfACmpEq | JumpCond::IfACmpNe => {
                let b = stack.pop().unwrap();
                let a = stack.pop().unwrap();
                (a == b) == (cond == JumpCond::IfACmpEq)
            }
            JumpCond::IfNull => stack.pop().unwrap() == Val::Null,
            JumpCond::IfNonNull => stack.pop().unwrap() != Val::Null,
        }
    }

    fn math(&mut self, op: MathInsn, kind: ValueKind, stack: &mut Vec<Val>) -> Result<Val, Val> {
        let b = stack.pop().unwrap();
        let a = stack.pop().unwrap();
        match kind {
            ValueKind::Int => {
                let (a, b) = (a.as_i(), b.as_i());
                let v = match op {
                    MathInsn::Add => a.wrapping_add(b),
                    MathInsn::Sub => a.wrapping_sub(b),
                    MathInsn::Mul => a.wrapping_mul(b),
                    MathInsn::Div => {
                        if b == 0 {
                            return Err(self.throw_new("java/lang/ArithmeticException"));
                        }
                        a.wrapping_div(b)
                    }
                    MathInsn::Rem => {
                        if b == 0 {
                            return Err(self.throw_new("java/lang/ArithmeticException"));
                        }
                        a.wrapping_rem(b)
                    }
                    MathInsn::Shl => a.wrapping_shl(b as u32 & 31),
                    MathInsn::Shr => a.wrapping_shr(b as u32 & 31),
                    MathInsn::Ushr => ((a as u32) >> (b as u32 & 31)) as i32,
                    MathInsn::And => a & b,
                    MathInsn::Or => a | b,
                    MathInsn::Xor => a ^ b,
                };
                Ok(Val::I(v))
            }
            ValueKind::Long => {
                // Shift amounts arrive as ints.
                if matches!(op, MathInsn::Shl | MathInsn::Shr | MathInsn::Ushr) {
                    let shift = b.as_i() as u32 & 63;
                    let a = a.as_j();
                    return Ok(Val::J(match op {
                        MathInsn::Shl => a.wrapping_shl(shift),
                        MathInsn::Shr => a.wrapping_shr(shift),
                        _ => ((a as u64) >> shift) as i64,
                    }));
                }
                let (a, b) = (a.as_j(), b.as_j());
                let v = match op {
                    MathInsn::Add => a.wrapping_add(b),
                    MathInsn::Sub => a.wrapping_sub(b),
                    MathInsn::Mul => a.wrapping_mul(b),
                    MathInsn::Div => {
                        if b == 0 {
                            return Err(self.throw_new("java/lang/ArithmeticException"));
                        }
                        a.wrapping_div(b)
                    }
                    MathInsn::Rem => {
                        if b == 0 {
                            return Err(self.throw_new("java/lang/ArithmeticException"));
                        }
                        a.wrapping_rem(b)
                    }
                    MathInsn::And => a & b,
                    MathInsn::Or => a | b,
                    MathInsn::Xor => a ^ b,
                    _ => unreachable!(),
                };
                Ok(Val::J(v))
            }
            ValueKind::Float => {
                let (a, b) = match (a, b) {
                    (Val::F(a), Val::F(b)) => (a, b),
                    other => panic!("bad float operands: {other:?}"),
                };
                Ok(Val::F(match op {
                    MathInsn::Add => a + b,
                    MathInsn::Sub => a - b,
                    MathInsn::Mul => a * b,
                    MathInsn::Div => a / b,
                    MathInsn::Rem => a % b,
                    other => panic!("bad float op: {other:?}"),
                }))
            }
            ValueKind::Double => {
                let (a, b) = match (a, b) {
                    (Val::D(a), Val::D(b)) => (a, b),
                    other => panic!("bad double operands: {other:?}"),
                };
                Ok(Val::D(match op {
                    MathInsn::Add => a + b,
                    MathInsn::Sub => a - b,
                    MathInsn::Mul => a * b,
                    MathInsn::Div => a / b,
                    MathInsn::Rem => a % b,
                    other => panic!("bad double op: {other:?}"),
                }))
            }
            ValueKind::Ref => panic!("math on references"),
        }
    }
}

enum Flow {
    Next,
    Goto(Label),
    Return(Option<Val>),
}

fn convert(v: Val, from: NumKind, to: NumKind) -> Val {
    let wide: f64 = match (from, v) {
        (NumKind::Int, Val::I(v)) => v as f64,
        (NumKind::Long, Val::J(v)) => v as f64,
        (NumKind::Float, Val::F(v)) => v as f64,
        (NumKind::Double, Val::D(v)) => v,
        other => panic!("bad conversion source: {other:?}"),
    };
    // Integral sources convert through their exact value.
    let int_src: i64 = match v {
        Val::I(v) => v as i64,
        Val::J(v) => v,
        Val::F(v) => v as i64,
        Val::D(v) => v as i64,
        other => panic!("bad conversion source: {other:?}"),
    };
    match to {
        NumKind::Int => Val::I(int_src as i32),
        NumKind::Long => Val::J(int_src),
        NumKind::Float => Val::F(wide as f32),
        NumKind::Double => Val::D(wide),
        NumKind::Byte => Val::I(int_src as i8 as i32),
        NumKind::Short => Val::I(int_src as i16 as i32),
        NumKind::Char => Val::I(int_src as u16 as i32),
    }
}

fn compare(kind: CmpKind, a: Val, b: Val) -> i32 {
    match kind {
        CmpKind::Long => {
            let (a, b) = (a.as_j(), b.as_j());
            (a > b) as i32 - (a < b) as i32
        }
        CmpKind::FloatG | CmpKind::FloatL => {
            let (a, b) = match (a, b) {
                (Val::F(a), Val::F(b)) => (a, b),
                other => panic!("bad float compare: {other:?}"),
            };
            if a.is_nan() || b.is_nan() {
                if kind == CmpKind::FloatG {
                    1
                } else {
                    -1
                }
            } else {
                (a > b) as i32 - (a < b) as i32
            }
        }
        CmpKind::DoubleG | CmpKind::DoubleL => {
            let (a, b) = match (a, b) {
                (Val::D(a), Val::D(b)) => (a, b),
                other => panic!("bad double compare: {other:?}"),
            };
            if a.is_nan() || b.is_nan() {
                if kind == CmpKind::DoubleG {
                    1
                } else {
                    -1
                }
            } else {
                (a > b) as i32 - (a < b) as i32
            }
        }
    }
}
