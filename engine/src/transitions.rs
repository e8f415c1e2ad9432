//! Time-boxed attribute transitions.
//!
//! Transitions are keyed by (node, attribute): scheduling on an occupied
//! slot replaces the pending transition, completion effect included. The
//! starting value is sampled from the scene when the transition first
//! becomes active, not at schedule time, so a value written during the
//! delay window is what the animation departs from.

use tracing::debug;

use thema_shared::colors::mix_css;

use crate::scene::{Attr, AttrValue, NodeId, SceneGraph};

/// Work handed back to the caller when a transition finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Finalize an exit: drop the primitive and the layer's bookkeeping
    /// for it.
    RemoveItem { layer: String, node: NodeId },
}

#[derive(Debug)]
struct Transition {
    node: NodeId,
    attr: Attr,
    from: Option<AttrValue>,
    to: AttrValue,
    start: f64,
    duration: f64,
    effect: Option<Effect>,
}

#[derive(Debug, Default)]
pub struct TransitionScheduler {
    active: Vec<Transition>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `attr` to reach `to` over `duration` milliseconds beginning
    /// at `start`.
    pub fn schedule(
        &mut self,
        node: NodeId,
        attr: Attr,
        to: AttrValue,
        start: f64,
        duration: f64,
        effect: Option<Effect>,
    ) {
        self.cancel(node, attr);
        self.active.push(Transition { node, attr, from: None, to, start, duration, effect });
    }

    /// Drop the pending transition on one attribute, effect included.
    pub fn cancel(&mut self, node: NodeId, attr: Attr) {
        self.active.retain(|t| t.node != node || t.attr != attr);
    }

    /// Drop every pending transition on a node.
    pub fn cancel_node(&mut self, node: NodeId) {
        self.active.retain(|t| t.node != node);
    }

    pub fn pending(&self) -> usize {
        self.active.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Advance to `now`, writing interpolated values into the scene.
    /// Completed transitions land exactly on their target value; their
    /// effects are returned for the caller to run.
    pub fn tick<S: SceneGraph>(&mut self, now: f64, scene: &mut S) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut index = 0;
        while index < self.active.len() {
            let transition = &mut self.active[index];
            if now < transition.start {
                index += 1;
                continue;
            }
            if transition.from.is_none() {
                transition.from = scene.attr(transition.node, transition.attr);
            }
            let progress = if transition.duration <= 0.0 {
                1.0
            } else {
                ((now - transition.start) / transition.duration).clamp(0.0, 1.0)
            };
            if progress >= 1.0 {
                let finished = self.active.swap_remove(index);
                scene.set_attr(finished.node, finished.attr, finished.to);
                if let Some(effect) = finished.effect {
                    debug!(?effect, "transition completed");
                    effects.push(effect);
                }
                // swap_remove moved a new element into `index`.
                continue;
            }
            let eased = cubic_ease_out(progress);
            if let Some(value) = interpolate(transition.from.as_ref(), &transition.to, eased) {
                let (node, attr) = (transition.node, transition.attr);
                scene.set_attr(node, attr, value);
            }
            index += 1;
        }
        effects
    }
}

pub fn cubic_ease_out(t: f64) -> f64 {
    let shifted = t - 1.0;
    shifted * shifted * shifted + 1.0
}

/// Numbers blend linearly (eased), colors through HSL. Endpoints that
/// cannot be blended leave the attribute alone mid-flight; completion
/// still snaps to the target.
fn interpolate(from: Option<&AttrValue>, to: &AttrValue, t: f64) -> Option<AttrValue> {
    match (from?, to) {
        (AttrValue::Num(a), AttrValue::Num(b)) => Some(AttrValue::Num(a + (b - a) * t)),
        (AttrValue::Str(a), AttrValue::Str(b)) => mix_css(a, b, t).map(AttrValue::Str),
        _ => None,
    }
}
