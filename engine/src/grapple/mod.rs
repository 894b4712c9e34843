//! Grapple ledger, the operations that create and end grapples, and the validator that
//! keeps the ledger and every actor's Grappled/Grappling conditions in agreement.

pub mod ledger;
pub mod ops;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::{Ability, DamageDice, DamageType};

pub use ledger::{GrappleEdge, GrappleLedger};
pub use ops::{CrushOutcome, EscapeOutcome, GrappleAttempt, GrappleOutcome};
pub use validator::{audit, check_invariants, Release, ReleaseReason, ValidationReport};

/// How a grapple attempt is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrappleMethod {
    /// Attack roll against the target's armor.
    #[default]
    Attack,
    /// The target saves against the escape DC; a failed save means it is caught.
    Save,
}

/// How a creature grapples: constrictor coils, tentacles, bare hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrappleProfile {
    #[serde(default)]
    pub method: GrappleMethod,
    pub damage: DamageDice,
    #[serde(default = "bludgeoning")]
    pub damage_type: DamageType,
    #[serde(default = "five_feet")]
    pub reach: i32,
    /// The target is also Restrained while held.
    #[serde(default)]
    pub restrains: bool,
    /// Simultaneous grapples this creature can hold.
    #[serde(default = "one")]
    pub capacity: usize,
    #[serde(default)]
    pub escape_dc: Option<i32>,
    /// Dice for the crush action; falls back to `damage`.
    #[serde(default)]
    pub crush: Option<DamageDice>,
    #[serde(default = "strength")]
    pub save_ability: Ability,
}

fn bludgeoning() -> DamageType {
    DamageType::Bludgeoning
}

fn five_feet() -> i32 {
    5
}

fn one() -> usize {
    1
}

fn strength() -> Ability {
    Ability::Str
}
