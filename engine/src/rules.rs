use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::grapple::{GrappleMethod, GrappleProfile};
use crate::{Ability, DamageDice, DamageType};

/// How the escape DC of a new grapple is computed when the profile does not fix one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscapeDcRule {
    Formula {
        base: i32,
        #[serde(default = "yes")]
        add_strength: bool,
        #[serde(default = "yes")]
        add_proficiency: bool,
    },
    Fixed {
        dc: i32,
    },
}

fn yes() -> bool {
    true
}

impl Default for EscapeDcRule {
    fn default() -> Self {
        EscapeDcRule::Formula { base: 8, add_strength: true, add_proficiency: true }
    }
}

/// Numeric balancing for one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub escape_dc: EscapeDcRule,
    #[serde(default = "default_unarmed_grapple")]
    pub unarmed_grapple: GrappleProfile,
    #[serde(default = "default_concentration_floor")]
    pub concentration_dc_floor: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            escape_dc: EscapeDcRule::default(),
            unarmed_grapple: default_unarmed_grapple(),
            concentration_dc_floor: default_concentration_floor(),
        }
    }
}

fn default_unarmed_grapple() -> GrappleProfile {
    GrappleProfile {
        method: GrappleMethod::Attack,
        damage: DamageDice::new(1, 4),
        damage_type: DamageType::Bludgeoning,
        reach: 5,
        restrains: false,
        capacity: 1,
        escape_dc: None,
        crush: None,
        save_ability: Ability::Str,
    }
}

fn default_concentration_floor() -> i32 {
    10
}

impl RulesConfig {
    /// The grapple profile an actor fights with: its own, or the unarmed default.
    pub fn grapple_profile<'a>(&'a self, actor: &'a Actor) -> &'a GrappleProfile {
        actor.grapple.as_ref().unwrap_or(&self.unarmed_grapple)
    }

    pub fn escape_dc(&self, grappler: &Actor) -> i32 {
        if let Some(dc) = self.grapple_profile(grappler).escape_dc {
            return dc;
        }
        match self.escape_dc {
            EscapeDcRule::Fixed { dc } => dc,
            EscapeDcRule::Formula { base, add_strength, add_proficiency } => {
                let mut dc = base;
                if add_strength {
                    dc += grappler.ability_mod(Ability::Str);
                }
                if add_proficiency {
                    dc += grappler.proficiency_bonus();
                }
                dc
            }
        }
    }
}
