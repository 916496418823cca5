//! Emission errors
//!
//! Malformed-IR errors are fatal and carry a snapshot of the variable table
//! visible at the failure point. There are no retries; the caller fixes the
//! input or disables the failing optional feature.

use anvil_bytecode::VerifyError;
use thiserror::Error;

pub type EmitResult<T> = Result<T, EmitError>;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("variable '{name}: {var_type}' is already declared; visible variables: {snapshot:?}")]
    VariableRedeclaration {
        name: String,
        var_type: String,
        snapshot: Vec<String>,
    },

    #[error("cannot resolve variable '{name}'{} ; visible variables: {snapshot:?}", var_type.as_deref().map(|t| format!(" of type {t}")).unwrap_or_default())]
    ScopeLookup {
        name: String,
        var_type: Option<String>,
        snapshot: Vec<String>,
    },

    #[error("cannot exit the outermost frame")]
    ExitOutermostFrame,

    #[error("break/continue has no matching enclosing flow (label: {label:?})")]
    UnmatchedControlFlow { label: Option<String> },

    #[error("super/this constructor call is only legal as the first statement of a constructor")]
    MisplacedConstructorCall,

    #[error("explicit enum super-constructor calls are illegal")]
    InvalidEnumSuperCall,

    #[error("impossible primitive cast from {from} to {to}")]
    ImpossibleCast { from: String, to: String },

    #[error("verification of '{name}' failed: {source}")]
    Verification {
        name: String,
        /// The offending binary image, kept for offline inspection.
        image: Vec<u8>,
        #[source]
        source: VerifyError,
    },
}
