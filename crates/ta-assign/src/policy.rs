//! The load decision at the heart of each iteration.
//!
//! Given the proposed load on every link, a [`LoadPolicy`] decides whether
//! the whole proposal fits or how far to scale it down.  The engine owns
//! routing, committing, and validating the ratio; the policy only decides.
//! An equilibrium-style step (e.g. a convex combination of successive
//! loadings) can be slotted in here without touching the engine.

use ta_core::EdgeId;
use ta_network::RoadNetwork;

/// Outcome of one load decision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LoadDecision {
    /// Every proposed load fits the remaining capacity.
    Accept,
    /// Scale every OD flow by `ratio`; `binding` is the link that set it.
    Throttle { ratio: f64, binding: EdgeId },
}

/// Decides how much of a proposed loading to commit.
pub trait LoadPolicy: Send + Sync {
    /// `loads` holds `(edge, proposed load)` for every loaded link, sorted
    /// by `EdgeId`, each load positive.
    fn decide(&self, network: &RoadNetwork, loads: &[(EdgeId, f64)]) -> LoadDecision;
}

/// One network-wide ratio set by the tightest link.
///
/// Accepts when no link overflows (`load − remaining ≤ 0` everywhere, so a
/// load exactly equal to the remaining capacity is accepted).  Otherwise
/// throttles by `min(remaining / load)` over all loaded links.
#[derive(Copy, Clone, Debug, Default)]
pub struct UniformThrottle;

impl LoadPolicy for UniformThrottle {
    fn decide(&self, network: &RoadNetwork, loads: &[(EdgeId, f64)]) -> LoadDecision {
        let max_overflow = loads
            .iter()
            .map(|&(e, load)| load - network.state(e).remaining)
            .fold(f64::NEG_INFINITY, f64::max);

        if loads.is_empty() || max_overflow <= 0.0 {
            return LoadDecision::Accept;
        }

        let mut ratio   = f64::INFINITY;
        let mut binding = EdgeId::INVALID;
        for &(e, load) in loads {
            let r = network.state(e).remaining / load;
            if r < ratio {
                ratio   = r;
                binding = e;
            }
        }
        LoadDecision::Throttle { ratio, binding }
    }
}
