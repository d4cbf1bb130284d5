//! Error types.
//!
//! Not-found is never an error here: removal-style calls return `Ok(false)`
//! and lookups return `None`. What remains is hook failure, identity
//! exhaustion, and snapshot or config problems.

use thiserror::Error;

use crate::ecs::{EntityId, HookError};

#[derive(Debug, Error)]
pub enum EcsError {
    /// A lifecycle hook returned an error. The mutation that triggered it has
    /// already been applied and is not rolled back.
    #[error("lifecycle hook failed for {entity:?}")]
    Hook {
        entity: EntityId,
        #[source]
        source: HookError,
    },

    #[error("entity identity space exhausted")]
    IdentityExhausted,

    #[error("snapshot contains entity identity {0} more than once")]
    DuplicateIdentity(EntityId),

    #[error("snapshot references system `{0}`, which is not in the catalog")]
    UnknownSystem(String),

    #[error("malformed snapshot")]
    Malformed(#[from] serde_json::Error),

    #[error("cannot restore a snapshot while systems are running")]
    TickInProgress,

    #[error("invalid world configuration")]
    Config(#[source] serde_json::Error),
}
