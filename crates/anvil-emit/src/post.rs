//! Post-emission jump optimization.
//!
//! Rewrites jumps whose target is an unconditional goto to point at the
//! final destination, and drops gotos that jump to the instruction that
//! directly follows them. Runs on the recorded form, per method; a method
//! that cannot be optimized keeps its original code.

use anvil_bytecode::{CodeElem, Insn, JumpCond, Label, RecordedClass, RecordedMethod};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("jump chain exceeds {0} hops")]
    ChainTooLong(usize),
    #[error("jump to unplaced label")]
    UnplacedTarget,
}

/// Longest goto chain worth following before assuming a cycle.
const MAX_CHAIN: usize = 64;

pub(crate) fn optimize_class(class: &mut RecordedClass) {
    for method in &mut class.methods {
        let original = method.code.clone();
        if optimize_method(method).is_err() {
            method.code = original;
        }
    }
}

fn optimize_method(method: &mut RecordedMethod) -> Result<(), PostError> {
    let marks: FxHashMap<Label, usize> = method
        .code
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            CodeElem::Mark(l) => Some((*l, i)),
            _ => None,
        })
        .collect();

    // The instruction a placed label leads to, skipping further marks.
    let insn_after = |label: Label| -> Result<Option<(usize, Insn)>, PostError> {
        let at = *marks.get(&label).ok_or(PostError::UnplacedTarget)?;
        for (i, elem) in method.code.iter().enumerate().skip(at + 1) {
            if let CodeElem::Insn(insn) = elem {
                return Ok(Some((i, insn.clone())));
            }
        }
        Ok(None)
    };

    let chase = |mut target: Label| -> Result<Label, PostError> {
        for _ in 0..MAX_CHAIN {
            match insn_after(target)? {
                Some((
                    _,
                    Insn::Jump {
                        cond: JumpCond::Goto,
                        target: next,
                    },
                )) if next != target => target = next,
                _ => return Ok(target),
            }
        }
        Err(PostError::ChainTooLong(MAX_CHAIN))
    };

    // Retarget jumps and switch arms through goto chains.
    let mut code = method.code.clone();
    for elem in &mut code {
        if let CodeElem::Insn(insn) = elem {
            match insn {
                Insn::Jump { target, .. } => *target = chase(*target)?,
                Insn::TableSwitch {
                    default, targets, ..
                } => {
                    *default = chase(*default)?;
                    for t in targets {
                        *t = chase(*t)?;
                    }
                }
                Insn::LookupSwitch { default, pairs } => {
                    *default = chase(*default)?;
                    for (_, t) in pairs {
                        *t = chase(*t)?;
                    }
                }
                _ => {}
            }
        }
    }

    // Drop gotos that jump to the next instruction.
    let mut out = Vec::with_capacity(code.len());
    for (i, elem) in code.iter().enumerate() {
        if let CodeElem::Insn(Insn::Jump {
            cond: JumpCond::Goto,
            target,
        }) = elem
        {
            let lands_next = marks.get(target).is_some_and(|&at| {
                at > i
                    && code[i + 1..at]
                        .iter()
                        .all(|e| matches!(e, CodeElem::Mark(_)))
            });
            if lands_next {
                continue;
            }
        }
        out.push(elem.clone());
    }
    method.code = out;
    Ok(())
}
