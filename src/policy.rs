//! Tiered resolution of one count from several sources of unequal trust.
//!
//! Sources are tried in rank order until one produces a positive count. The
//! answer is then the maximum of everything observed and the caller's
//! last-known-good value, so a failing or stale source can never pull a total
//! below what was already established.

use core::fmt::Debug;

use crate::platform::Measurement;

/// A source and its trust rank; lower ranks are tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier<S> {
    pub source: S,
    pub rank: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<S> {
    /// `None` only when nothing was observed and nothing was known.
    pub value: Measurement,
    pub attempts: Vec<(S, Measurement)>,
}

/// Maximum over the observations and the last-known value.
pub fn settle<I>(observed: I, last_known: Option<u32>) -> Measurement
where
    I: IntoIterator<Item = Measurement>,
{
    observed.into_iter().flatten().chain(last_known).max()
}

/// Walks `tiers` in rank order, stopping at the first positive observation.
pub async fn resolve<S, F, Fut>(
    mut tiers: Vec<Tier<S>>,
    last_known: Option<u32>,
    mut attempt: F,
) -> Resolution<S>
where
    S: Copy + Debug,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Measurement>,
{
    tiers.sort_by_key(|t| t.rank);

    let mut attempts = Vec::with_capacity(tiers.len());
    for Tier { source, .. } in tiers {
        let m = attempt(source).await;
        tracing::debug!(target: "policy", "{source:?} -> {m:?}");
        attempts.push((source, m));
        if m.is_some_and(|n| n > 0) {
            break;
        }
    }

    Resolution {
        value: settle(attempts.iter().map(|&(_, m)| m), last_known),
        attempts,
    }
}
