//! Bounded "spend while affordable" loops shared by both planners.

use tracing::debug;

use crate::{BudgetError, Location, TurnActions, UnitKind};

/// Places units of `kind` at `location` until the budget runs dry.
///
/// The iteration cap is derived from the balance observed on entry divided by
/// the unit cost, optionally tightened by `limit`. The budget is re-checked
/// before every placement and the loop stops at the first rejection.
///
/// Returns the number of units committed.
///
/// # Errors
///
/// Returns [`BudgetError::FreeCost`] when the kind costs nothing, which is a
/// catalog configuration error rather than a licence to loop forever.
pub fn spend_while_affordable<S>(
    state: &mut S,
    kind: UnitKind,
    location: Location,
    limit: Option<u32>,
) -> Result<u32, BudgetError>
where
    S: TurnActions + ?Sized,
{
    let cost = state.catalog().cost(kind);
    let cap = state.resources().affordable_count(&cost)?;
    let cap = limit.map_or(cap, |limit| cap.min(limit));

    let mut committed = 0;
    for _ in 0..cap {
        if !state.resources().can_afford(&cost) {
            break;
        }

        if let Err(reason) = state.request_place(kind, location) {
            debug!(?kind, %location, %reason, "spend loop stopped");
            break;
        }
        committed += 1;
    }

    Ok(committed)
}
