//! Generation options.

use anvil_bytecode::NEST_INTRODUCED_VERSION;

/// How private cross-type member access inside a nest is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestMode {
    /// Emit nest attributes when the class version supports them, fall back
    /// to synthetic accessors otherwise.
    NestBased,
    /// Always rewrite through synthetic accessors.
    Accessors,
    /// Emit nest attributes and accessors both.
    Mixed,
}

#[derive(Debug, Clone)]
pub struct BytecodeOptions {
    /// Major class file version to target.
    pub class_version: u16,
    /// Synthesize bridge methods from resolved supertype signatures.
    pub generate_bridges: bool,
    /// Run the structural verifier on every produced class.
    pub validate: bool,
    /// Emit line-number entries for `Instruction::Line` nodes.
    pub visit_lines: bool,
    /// Run the post-emission jump optimizer.
    pub optimize_jumps: bool,
    pub nest_mode: NestMode,
}

impl Default for BytecodeOptions {
    fn default() -> Self {
        Self {
            class_version: 52,
            generate_bridges: true,
            validate: true,
            visit_lines: true,
            optimize_jumps: false,
            nest_mode: NestMode::NestBased,
        }
    }
}

impl BytecodeOptions {
    /// Whether private cross-type access is rewritten through accessors.
    pub fn use_accessors(&self) -> bool {
        match self.nest_mode {
            NestMode::Accessors | NestMode::Mixed => true,
            NestMode::NestBased => self.class_version < NEST_INTRODUCED_VERSION,
        }
    }

    /// Whether nest host/member attributes are emitted.
    pub fn use_nest_attributes(&self) -> bool {
        self.class_version >= NEST_INTRODUCED_VERSION
            && matches!(self.nest_mode, NestMode::NestBased | NestMode::Mixed)
    }
}
