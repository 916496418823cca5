//! Condition lowering.
//!
//! Conditions arrive as flat term lists with joiners; they are parsed into a
//! tree with Java's operator precedence (`&` over `^` over `|` over `&&`
//! over `||`) and lowered to compare-and-branch chains.
//!
//! Short-circuit runs share targets: every term of an `&&` run jumps to the
//! shared failure target with an inverted comparison, every term of an `||`
//! run jumps to the shared success target uninverted. The eager bitwise
//! joiners evaluate both sides to 0/1 ints, combine with the integer
//! instruction and branch on the result.

use crate::compiler::MethodCompiler;
use crate::error::EmitResult;
use anvil_bytecode::{CmpKind, Insn, JumpCond, Label, MathInsn, MethodSink, ValueKind};
use anvil_ir::op::{CompareOp, LogicOp};
use anvil_ir::{BoolTerm, Check, Instruction, TypeRef};

enum CondNode<'a> {
    Check(&'a Check),
    And(Box<CondNode<'a>>, Box<CondNode<'a>>),
    Or(Box<CondNode<'a>>, Box<CondNode<'a>>),
    Bit(LogicOp, Box<CondNode<'a>>, Box<CondNode<'a>>),
}

/// Joiner precedence levels, loosest first.
const LEVELS: [LogicOp; 5] = [
    LogicOp::Or,
    LogicOp::And,
    LogicOp::BitOr,
    LogicOp::BitXor,
    LogicOp::BitAnd,
];

fn parse(terms: &[BoolTerm]) -> Option<CondNode<'_>> {
    let mut pos = 0;
    parse_level(terms, &mut pos, 0)
}

fn parse_level<'a>(terms: &'a [BoolTerm], pos: &mut usize, level: usize) -> Option<CondNode<'a>> {
    if level == LEVELS.len() {
        return parse_primary(terms, pos);
    }
    let mut node = parse_level(terms, pos, level + 1)?;
    while let Some(BoolTerm::Join(op)) = terms.get(*pos) {
        if *op != LEVELS[level] {
            break;
        }
        *pos += 1;
        let rhs = parse_level(terms, pos, level + 1)?;
        node = match op {
            LogicOp::And => CondNode::And(Box::new(node), Box::new(rhs)),
            LogicOp::Or => CondNode::Or(Box::new(node), Box::new(rhs)),
            bitwise => CondNode::Bit(*bitwise, Box::new(node), Box::new(rhs)),
        };
    }
    Some(node)
}

fn parse_primary<'a>(terms: &'a [BoolTerm], pos: &mut usize) -> Option<CondNode<'a>> {
    match terms.get(*pos)? {
        BoolTerm::Check(check) => {
            *pos += 1;
            Some(CondNode::Check(check))
        }
        BoolTerm::Group(inner) => {
            *pos += 1;
            parse(inner)
        }
        // Stray joiner; skip it. Well-formedness is the producer's problem.
        BoolTerm::Join(_) => {
            *pos += 1;
            parse_primary(terms, pos)
        }
    }
}

fn icmp(op: CompareOp) -> JumpCond {
    match op {
        CompareOp::Eq => JumpCond::IfICmpEq,
        CompareOp::Ne => JumpCond::IfICmpNe,
        CompareOp::Lt => JumpCond::IfICmpLt,
        CompareOp::Le => JumpCond::IfICmpLe,
        CompareOp::Gt => JumpCond::IfICmpGt,
        CompareOp::Ge => JumpCond::IfICmpGe,
    }
}

fn if_zero(op: CompareOp) -> JumpCond {
    match op {
        CompareOp::Eq => JumpCond::IfEq,
        CompareOp::Ne => JumpCond::IfNe,
        CompareOp::Lt => JumpCond::IfLt,
        CompareOp::Le => JumpCond::IfLe,
        CompareOp::Gt => JumpCond::IfGt,
        CompareOp::Ge => JumpCond::IfGe,
    }
}

impl<'c, M: MethodSink> MethodCompiler<'c, M> {
    /// Lower a condition. On success control falls through (or jumps to
    /// `true_target`, which the caller marks at the start of the success
    /// code); on failure it jumps to `false_target`.
    pub(crate) fn compile_condition(
        &mut self,
        terms: &[BoolTerm],
        true_target: Label,
        false_target: Label,
    ) -> EmitResult<()> {
        match parse(terms) {
            Some(node) => self.cond_jump(&node, true_target, false_target, true),
            // An empty condition is vacuously true.
            None => Ok(()),
        }
    }

    /// Lower a condition that jumps backwards on success: control jumps to
    /// `true_target` when the condition holds and falls through otherwise.
    /// Used by do-while, where the success code precedes the test.
    pub(crate) fn compile_condition_backjump(
        &mut self,
        terms: &[BoolTerm],
        true_target: Label,
        false_target: Label,
    ) -> EmitResult<()> {
        match parse(terms) {
            Some(node) => self.cond_jump(&node, true_target, false_target, false),
            None => {
                self.emit(Insn::Jump {
                    cond: JumpCond::Goto,
                    target: true_target,
                });
                Ok(())
            }
        }
    }

    /// `fall_true` says the success code follows immediately, so leaves
    /// jump to the failure target with an inverted comparison. When false,
    /// leaves jump to the success target uninverted and failure falls
    /// through.
    fn cond_jump(
        &mut self,
        node: &CondNode<'_>,
        true_target: Label,
        false_target: Label,
        fall_true: bool,
    ) -> EmitResult<()> {
        match node {
            CondNode::And(left, right) => {
                let rhs = self.sink.new_label();
                self.cond_jump(left, rhs, false_target, true)?;
                self.sink.mark(rhs);
                self.cond_jump(right, true_target, false_target, fall_true)
            }
            CondNode::Or(left, right) => {
                let rhs = self.sink.new_label();
                self.cond_jump(left, true_target, rhs, false)?;
                self.sink.mark(rhs);
                self.cond_jump(right, true_target, false_target, fall_true)
            }
            CondNode::Bit(op, left, right) => {
                self.cond_value(left)?;
                self.cond_value(right)?;
                let math = match op {
                    LogicOp::BitAnd => MathInsn::And,
                    LogicOp::BitXor => MathInsn::Xor,
                    _ => MathInsn::Or,
                };
                self.emit(Insn::Math {
                    op: math,
                    kind: ValueKind::Int,
                });
                self.emit(Insn::Jump {
                    cond: if fall_true {
                        JumpCond::IfEq
                    } else {
                        JumpCond::IfNe
                    },
                    target: if fall_true { false_target } else { true_target },
                });
                Ok(())
            }
            CondNode::Check(check) => {
                if fall_true {
                    self.compile_check(check, false_target, false)
                } else {
                    self.compile_check(check, true_target, true)
                }
            }
        }
    }

    /// Evaluate a condition subtree to a 0/1 int on the stack, for the
    /// eager bitwise joiners.
    fn cond_value(&mut self, node: &CondNode<'_>) -> EmitResult<()> {
        let push_one = self.sink.new_label();
        let push_zero = self.sink.new_label();
        let end = self.sink.new_label();
        self.cond_jump(node, push_one, push_zero, true)?;
        self.sink.mark(push_one);
        self.emit(Insn::PushInt(1));
        self.emit(Insn::Jump {
            cond: JumpCond::Goto,
            target: end,
        });
        self.sink.mark(push_zero);
        self.emit(Insn::PushInt(0));
        self.sink.mark(end);
        Ok(())
    }

    /// Emit one comparison that jumps to `target` when the check result
    /// equals `jump_if_true`, falling through otherwise.
    fn compile_check(&mut self, check: &Check, target: Label, jump_if_true: bool) -> EmitResult<()> {
        let effective = if jump_if_true {
            check.op
        } else {
            check.op.invert()
        };

        // Null comparisons get the dedicated single-operand opcodes.
        if check.right.is_null_literal() || check.left.is_null_literal() {
            let operand = if check.right.is_null_literal() {
                &check.left
            } else {
                &check.right
            };
            self.process_value(operand)?;
            let cond = match effective {
                CompareOp::Eq => JumpCond::IfNull,
                _ => JumpCond::IfNonNull,
            };
            self.emit(Insn::Jump { cond, target });
            return Ok(());
        }

        // Comparisons against a boolean literal test the other operand
        // directly against zero.
        let bool_lit = check
            .right
            .bool_literal()
            .map(|b| (b, &check.left))
            .or_else(|| check.left.bool_literal().map(|b| (b, &check.right)));
        if let Some((lit, operand)) = bool_lit {
            self.process_value(operand)?;
            let holds_when_nonzero = lit == (check.op == CompareOp::Eq);
            let cond = if holds_when_nonzero == jump_if_true {
                JumpCond::IfNe
            } else {
                JumpCond::IfEq
            };
            self.emit(Insn::Jump { cond, target });
            return Ok(());
        }

        let left_type = check.left.result_type().unwrap_or_else(TypeRef::object);
        let right_type = check.right.result_type().unwrap_or_else(TypeRef::object);

        // When exactly one side is primitive, unbox the other before the
        // primitive comparison.
        let prim_type = if left_type.is_primitive() {
            Some(left_type.clone())
        } else if right_type.is_primitive() {
            Some(right_type.clone())
        } else {
            None
        };

        self.process_operand(&check.left, &left_type, prim_type.as_ref())?;
        self.process_operand(&check.right, &right_type, prim_type.as_ref())?;

        match &prim_type {
            None => {
                let cond = match effective {
                    CompareOp::Eq => JumpCond::IfACmpEq,
                    _ => JumpCond::IfACmpNe,
                };
                self.emit(Insn::Jump { cond, target });
            }
            Some(t) if t.is_int_like() => {
                self.emit(Insn::Jump {
                    cond: icmp(effective),
                    target,
                });
            }
            Some(t) => {
                // Wide and floating compares go through a three-way compare
                // and a branch against zero. The G/L variants are picked so
                // NaN makes ordered comparisons fail.
                let cmp = match (t, check.op) {
                    (&TypeRef::LONG, _) => CmpKind::Long,
                    (&TypeRef::FLOAT, CompareOp::Lt | CompareOp::Le) => CmpKind::FloatG,
                    (&TypeRef::FLOAT, _) => CmpKind::FloatL,
                    (_, CompareOp::Lt | CompareOp::Le) => CmpKind::DoubleG,
                    (_, _) => CmpKind::DoubleL,
                };
                self.emit(Insn::Cmp(cmp));
                self.emit(Insn::Jump {
                    cond: if_zero(effective),
                    target,
                });
            }
        }
        Ok(())
    }

    fn process_operand(
        &mut self,
        operand: &Instruction,
        operand_type: &TypeRef,
        prim_type: Option<&TypeRef>,
    ) -> EmitResult<()> {
        self.process_value(operand)?;
        if let Some(prim) = prim_type {
            if !operand_type.is_primitive() {
                self.compile_cast(operand_type, prim)?;
            }
        }
        Ok(())
    }
}
