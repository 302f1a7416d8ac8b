use crate::controller::{Action, WidgetState};

/// Integration errors: an action the widget cannot take in its current
/// condition. These are surfaced to whoever triggered the action and never
/// recovered locally. Network failures and validation failures are not
/// errors at this level; see [`crate::Resolution`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("`{action}` is not a valid action while {state}")]
    IllegalTransition { action: Action, state: WidgetState },

    #[error("`{action}` rejected: a request is already outstanding")]
    Busy { action: Action },

    #[error("`{action}` is not permitted on this widget")]
    Forbidden { action: Action },

    #[error("widget has been replaced or removed")]
    Retired,

    #[error("no request is outstanding")]
    NothingPending,

    #[error("widget handle does not refer to a live widget")]
    StaleHandle,
}
