use crate::actor::{ActorId, Roster};
use crate::conditions::Condition;

/// One grappler holding one target. Both actors own it jointly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrappleEdge {
    pub grappler: ActorId,
    pub target: ActorId,
    /// Fixed when the grapple starts.
    pub escape_dc: i32,
    /// Distance at which the hold was established; moving beyond it breaks the grapple.
    pub range: i32,
    pub restrains: bool,
}

/// Central store of every active grapple in an encounter.
///
/// Edges are never mirrored onto actors; an actor's Grappled/Grappling conditions are
/// derived from here by [`bind`] and [`unbind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrappleLedger {
    edges: Vec<GrappleEdge>,
}

impl GrappleLedger {
    pub fn edges(&self) -> &[GrappleEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, grappler: ActorId, target: ActorId) -> Option<&GrappleEdge> {
        self.edges
            .iter()
            .find(|e| e.grappler == grappler && e.target == target)
    }

    pub fn outgoing(&self, grappler: ActorId) -> impl Iterator<Item = &GrappleEdge> {
        self.edges.iter().filter(move |e| e.grappler == grappler)
    }

    pub fn incoming(&self, target: ActorId) -> impl Iterator<Item = &GrappleEdge> {
        self.edges.iter().filter(move |e| e.target == target)
    }

    pub fn holding(&self, grappler: ActorId) -> usize {
        self.outgoing(grappler).count()
    }

    pub fn is_held_by(&self, target: ActorId, grappler: ActorId) -> bool {
        self.edge(grappler, target).is_some()
    }

    pub fn involves(&self, actor: ActorId) -> bool {
        self.edges
            .iter()
            .any(|e| e.grappler == actor || e.target == actor)
    }
}

/// Record a new edge and apply both sides' conditions in one step.
///
/// Callers validate first; this only refuses exact duplicates or missing actors.
pub(crate) fn bind(
    ledger: &mut GrappleLedger,
    roster: &mut Roster,
    edge: GrappleEdge,
    mut log: impl FnMut(String),
) -> bool {
    if ledger.edge(edge.grappler, edge.target).is_some()
        || !roster.contains(edge.grappler)
        || !roster.contains(edge.target)
    {
        return false;
    }

    let grappler_name = roster.name_of(edge.grappler);
    let target_name = roster.name_of(edge.target);
    if let Some(grappler) = roster.get_mut(edge.grappler) {
        grappler.set_condition(Condition::Grappling, true);
    }
    if let Some(target) = roster.get_mut(edge.target) {
        target.set_condition(Condition::Grappled, true);
        if edge.restrains {
            target.set_condition(Condition::Restrained, true);
        }
    }
    ledger.edges.push(edge);

    tracing::debug!(
        grappler = edge.grappler.0,
        target = edge.target.0,
        escape_dc = edge.escape_dc,
        range = edge.range,
        restrains = edge.restrains,
        "grapple edge created"
    );
    log(format!(
        "[COND][{}] is Grappled by {} (speed 0, escape DC {}){}",
        target_name,
        grappler_name,
        edge.escape_dc,
        if edge.restrains { " and Restrained" } else { "" }
    ));
    true
}

/// Remove an edge and clear whatever conditions no other edge still justifies.
///
/// Missing actors are tolerated so stale edges can always be torn down.
pub(crate) fn unbind(
    ledger: &mut GrappleLedger,
    roster: &mut Roster,
    grappler: ActorId,
    target: ActorId,
    mut log: impl FnMut(String),
) -> Option<GrappleEdge> {
    let idx = ledger
        .edges
        .iter()
        .position(|e| e.grappler == grappler && e.target == target)?;
    let edge = ledger.edges.remove(idx);

    let still_holding = ledger.holding(grappler) > 0;
    let still_held = ledger.incoming(target).count() > 0;
    let still_restrained = ledger.incoming(target).any(|e| e.restrains);

    if !still_holding {
        if let Some(g) = roster.get_mut(grappler) {
            g.set_condition(Condition::Grappling, false);
        }
    }
    if let Some(t) = roster.get_mut(target) {
        if edge.restrains && !still_restrained && !t.registry().restrained_by_effect() {
            t.set_condition(Condition::Restrained, false);
        }
        if !still_held {
            t.set_condition(Condition::Grappled, false);
        }
    }

    tracing::debug!(grappler = grappler.0, target = target.0, "grapple edge destroyed");
    log(format!(
        "[COND][{}] is no longer grappled by {}",
        roster.name_of(target),
        roster.name_of(grappler)
    ));
    Some(edge)
}
