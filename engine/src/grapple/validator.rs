use std::collections::HashSet;
use std::fmt;

use crate::actor::{ActorId, Roster, Size};
use crate::conditions::Condition;
use crate::encounter::Encounter;
use crate::error::InvariantViolation;
use crate::grapple::ledger::{unbind, GrappleEdge, GrappleLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    GrapplerIncapacitated,
    GrapplerDead,
    GrapplerMissing,
    GrapplerNotGrappling,
    TargetDead,
    TargetMissing,
    TargetNotGrappled,
    OutOfRange { distance: i32, range: i32 },
    SizeMismatch { grappler: Size, target: Size },
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseReason::GrapplerIncapacitated => write!(f, "grappler is incapacitated"),
            ReleaseReason::GrapplerDead => write!(f, "grappler is dead"),
            ReleaseReason::GrapplerMissing => write!(f, "grappler left the encounter"),
            ReleaseReason::GrapplerNotGrappling => write!(f, "grappler no longer grappling"),
            ReleaseReason::TargetDead => write!(f, "target is dead"),
            ReleaseReason::TargetMissing => write!(f, "target left the encounter"),
            ReleaseReason::TargetNotGrappled => write!(f, "target no longer grappled"),
            ReleaseReason::OutOfRange { distance, range } => {
                write!(f, "out of range ({}ft > {}ft)", distance, range)
            }
            ReleaseReason::SizeMismatch { grappler, target } => {
                write!(f, "{:?} cannot hold {:?}", grappler, target)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub grappler: ActorId,
    pub target: ActorId,
    pub reason: ReleaseReason,
}

/// What one validator pass repaired. Empty means the state was already consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub releases: Vec<Release>,
    /// Grapple-role conditions cleared because no edge backed them.
    pub cleared: Vec<(ActorId, Condition)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.releases.is_empty() && self.cleared.is_empty()
    }

    pub fn released(&self, grappler: ActorId, target: ActorId) -> bool {
        self.releases
            .iter()
            .any(|r| r.grappler == grappler && r.target == target)
    }
}

/// Why `edge` can no longer stand, checked in priority order: an incapacitated grappler
/// outranks every other reason.
fn stale_reason(edge: &GrappleEdge, roster: &Roster) -> Option<ReleaseReason> {
    let Some(g) = roster.get(edge.grappler) else {
        return Some(ReleaseReason::GrapplerMissing);
    };
    if g.is_incapacitated() {
        return Some(ReleaseReason::GrapplerIncapacitated);
    }
    if !g.is_alive() {
        return Some(ReleaseReason::GrapplerDead);
    }
    if !g.has(Condition::Grappling) {
        return Some(ReleaseReason::GrapplerNotGrappling);
    }

    let Some(t) = roster.get(edge.target) else {
        return Some(ReleaseReason::TargetMissing);
    };
    if !t.is_alive() {
        return Some(ReleaseReason::TargetDead);
    }
    if !t.has(Condition::Grappled) {
        return Some(ReleaseReason::TargetNotGrappled);
    }
    let distance = g.distance_to(t);
    if distance > edge.range {
        return Some(ReleaseReason::OutOfRange { distance, range: edge.range });
    }

    if !g.size.can_grapple(t.size) {
        return Some(ReleaseReason::SizeMismatch { grappler: g.size, target: t.size });
    }
    None
}

/// Edges that must be torn down, without touching anything.
pub fn audit(ledger: &GrappleLedger, roster: &Roster) -> Vec<Release> {
    ledger
        .edges()
        .iter()
        .filter_map(|edge| {
            stale_reason(edge, roster).map(|reason| Release {
                grappler: edge.grappler,
                target: edge.target,
                reason,
            })
        })
        .collect()
}

/// Consistency of ledger and conditions. An `Err` after a validator pass is a bug.
pub fn check_invariants(ledger: &GrappleLedger, roster: &Roster) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::new();
    for edge in ledger.edges() {
        let (grappler, target) = (edge.grappler, edge.target);
        if !seen.insert((grappler, target)) {
            return Err(InvariantViolation::DuplicateEdge { grappler, target });
        }
        let (Some(g), Some(t)) = (roster.get(grappler), roster.get(target)) else {
            return Err(InvariantViolation::MissingParticipant { grappler, target });
        };
        if !g.has(Condition::Grappling) {
            return Err(InvariantViolation::OneSided { grappler, target, missing: Condition::Grappling });
        }
        if !t.has(Condition::Grappled) {
            return Err(InvariantViolation::OneSided { grappler, target, missing: Condition::Grappled });
        }
        if edge.restrains && !t.has(Condition::Restrained) {
            return Err(InvariantViolation::OneSided { grappler, target, missing: Condition::Restrained });
        }
        if !g.is_alive() || !t.is_alive() || g.is_incapacitated() {
            return Err(InvariantViolation::StaleEdge { grappler, target });
        }
    }

    for actor in roster.iter() {
        let holding = ledger.holding(actor.id);
        if actor.has(Condition::Grappling) && holding == 0 {
            return Err(InvariantViolation::OrphanedCondition { actor: actor.id, condition: Condition::Grappling });
        }
        if actor.has(Condition::Grappled) && ledger.incoming(actor.id).next().is_none() {
            return Err(InvariantViolation::OrphanedCondition { actor: actor.id, condition: Condition::Grappled });
        }
        if actor.has(Condition::Restrained)
            && !actor.registry().restrained_by_effect()
            && !ledger.incoming(actor.id).any(|e| e.restrains)
        {
            return Err(InvariantViolation::OrphanedCondition { actor: actor.id, condition: Condition::Restrained });
        }
        if actor.registry().is_immobilized() && actor.registry().cached_speed().is_none() {
            return Err(InvariantViolation::SpeedNotCached(actor.id));
        }
    }
    Ok(())
}

impl Encounter {
    /// One validator pass: end every edge that can no longer stand, then clear
    /// grapple-role conditions that no edge backs. Running it twice changes nothing
    /// the second time.
    pub fn validate_grapples(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        loop {
            let doomed = audit(&self.ledger, &self.roster);
            if doomed.is_empty() {
                break;
            }
            for release in doomed {
                let g_name = self.name_of(release.grappler);
                let t_name = self.name_of(release.target);
                let Encounter { roster, ledger, narration, .. } = &mut *self;
                narration.push(format!(
                    "[VALIDATE] grapple {} → {} ends: {}",
                    g_name, t_name, release.reason
                ));
                if unbind(ledger, roster, release.grappler, release.target, |m| narration.push(m)).is_some() {
                    tracing::info!(
                        grappler = release.grappler.0,
                        target = release.target.0,
                        reason = %release.reason,
                        "stale grapple released"
                    );
                    report.releases.push(release);
                }
            }
        }

        for id in self.roster.ids() {
            let holding = self.ledger.holding(id);
            let held = self.ledger.incoming(id).next().is_some();
            let Some(actor) = self.roster.get_mut(id) else {
                continue;
            };
            let mut cleared = Vec::new();
            if actor.has(Condition::Grappling) && holding == 0 {
                actor.set_condition(Condition::Grappling, false);
                cleared.push(Condition::Grappling);
            }
            if actor.has(Condition::Grappled) && !held {
                actor.set_condition(Condition::Grappled, false);
                cleared.push(Condition::Grappled);
            }
            let name = actor.name.clone();
            for condition in cleared {
                self.narration.push(format!(
                    "[VALIDATE][{}] {:?} had no matching grapple; cleared",
                    name, condition
                ));
                report.cleared.push((id, condition));
            }
        }

        debug_assert_eq!(self.check_invariants(), Ok(()), "validator left an inconsistent ledger");
        report
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_invariants(&self.ledger, &self.roster)
    }
}
