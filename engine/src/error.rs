use thiserror::Error;

use crate::actor::{ActorId, Size};
use crate::combat::actions::ActionSlot;
use crate::conditions::Condition;

/// An action the rules refuse. Nothing in the encounter changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("no actor {0} in this encounter")]
    UnknownActor(ActorId),

    #[error("{0} cannot target itself")]
    SelfTarget(ActorId),

    #[error("{0} is not alive")]
    NotAlive(ActorId),

    #[error("{0} is incapacitated")]
    Incapacitated(ActorId),

    #[error("out of range (distance {distance}ft, reach {reach}ft)")]
    OutOfRange { distance: i32, reach: i32 },

    #[error("size mismatch ({grappler:?} cannot hold {target:?})")]
    SizeMismatch { grappler: Size, target: Size },

    #[error("at capacity ({holding}/{capacity} grapples held)")]
    AtCapacity { holding: usize, capacity: usize },

    #[error("{grappler} is already grappling {target}")]
    AlreadyGrappling { grappler: ActorId, target: ActorId },

    #[error("{0} is not grappled")]
    NotGrappled(ActorId),

    #[error("{0} is not grappling anyone")]
    NotGrappling(ActorId),

    #[error("{actor} has already used its {slot:?} this turn")]
    AlreadyUsed { actor: ActorId, slot: ActionSlot },

    #[error("{0:?} is managed by the grapple ledger")]
    LedgerOwned(Condition),

    #[error("{0} cannot move (speed 0)")]
    Immobilized(ActorId),
}

/// Both sides of the ledger disagree after a validator pass.
///
/// The validator exists to make this unreachable, so seeing one is a defect in the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("edge {grappler}→{target} references a missing actor")]
    MissingParticipant { grappler: ActorId, target: ActorId },

    #[error("edge {grappler}→{target} is recorded twice")]
    DuplicateEdge { grappler: ActorId, target: ActorId },

    #[error("edge {grappler}→{target} is missing the {missing:?} condition on one side")]
    OneSided {
        grappler: ActorId,
        target: ActorId,
        missing: Condition,
    },

    #[error("{actor} holds {condition:?} without a matching edge")]
    OrphanedCondition { actor: ActorId, condition: Condition },

    #[error("edge {grappler}→{target} survived with a dead or incapacitated participant")]
    StaleEdge { grappler: ActorId, target: ActorId },

    #[error("{0} is immobilized but its original speed was not cached")]
    SpeedNotCached(ActorId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid dice notation '{0}' (expected NdM)")]
pub struct DiceParseError(pub String);
