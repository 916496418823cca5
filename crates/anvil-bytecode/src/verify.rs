//! Structural verification of recorded classes.
//!
//! This is not a full type-state verifier; it checks the structural rules
//! the emitter is responsible for: every referenced label is placed exactly
//! once, exception regions are well-formed, and method bodies cannot fall
//! off the end.

use crate::insn::{Insn, Label};
use crate::recording::{CodeElem, RecordedClass, RecordedMethod};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{method}: jump to unplaced label {label:?}")]
    UnplacedLabel { method: String, label: Label },

    #[error("{method}: label {label:?} placed {count} times")]
    DuplicateLabel {
        method: String,
        label: Label,
        count: usize,
    },

    #[error("{method}: exception region starts at or after its end")]
    InvertedRegion { method: String },

    #[error("{method}: exception handler label is not placed")]
    UnplacedHandler { method: String },

    #[error("{method}: execution can fall off the end of the body")]
    FallOffEnd { method: String },
}

/// Verify every method of a recorded class.
pub fn verify_class(class: &RecordedClass) -> Result<(), VerifyError> {
    for method in &class.methods {
        verify_method(method)?;
    }
    Ok(())
}

fn verify_method(method: &RecordedMethod) -> Result<(), VerifyError> {
    let name = format!("{}{}", method.name, method.desc);

    // Collect label placements.
    let mut placed: HashMap<Label, usize> = HashMap::new();
    for elem in &method.code {
        if let CodeElem::Mark(label) = elem {
            *placed.entry(*label).or_insert(0) += 1;
        }
    }
    for (label, count) in &placed {
        if *count > 1 {
            return Err(VerifyError::DuplicateLabel {
                method: name.clone(),
                label: *label,
                count: *count,
            });
        }
    }

    let check_placed = |label: Label| -> Result<(), VerifyError> {
        if placed.contains_key(&label) {
            Ok(())
        } else {
            Err(VerifyError::UnplacedLabel {
                method: name.clone(),
                label,
            })
        }
    };

    for elem in &method.code {
        if let CodeElem::Insn(insn) = elem {
            match insn {
                Insn::Jump { target, .. } => check_placed(*target)?,
                Insn::TableSwitch {
                    default, targets, ..
                } => {
                    check_placed(*default)?;
                    for t in targets {
                        check_placed(*t)?;
                    }
                }
                Insn::LookupSwitch { default, pairs } => {
                    check_placed(*default)?;
                    for (_, t) in pairs {
                        check_placed(*t)?;
                    }
                }
                _ => {}
            }
        }
    }

    // Region sanity: label order follows placement order in the code list.
    let index_of = |label: Label| {
        method.code.iter().position(|e| match e {
            CodeElem::Mark(l) => *l == label,
            _ => false,
        })
    };
    for region in &method.regions {
        let start = index_of(region.start);
        let end = index_of(region.end);
        let handler = index_of(region.handler);
        if handler.is_none() {
            return Err(VerifyError::UnplacedHandler {
                method: name.clone(),
            });
        }
        match (start, end) {
            (Some(s), Some(e)) if s < e => {}
            _ => {
                return Err(VerifyError::InvertedRegion {
                    method: name.clone(),
                })
            }
        }
    }

    // A non-empty body must end in an instruction that does not fall
    // through. Abstract methods record no code at all.
    let last_insn = method.code.iter().rev().find_map(|e| match e {
        CodeElem::Insn(i) => Some(i),
        _ => None,
    });
    if let Some(last) = last_insn {
        if !last.is_terminal() {
            return Err(VerifyError::FallOffEnd { method: name });
        }
    }

    Ok(())
}
