use crate::{
    types::{RelayEvent, RelayOutcome},
    Error,
};

/// Consulted before each relay and updated after its outcome. A deduplicating
/// or persistent policy plugs in here without touching the dispatcher.
#[cfg_attr(test, mockall::automock)]
pub trait RelayJournal: Send + Sync {
    fn admit(&self, event: &RelayEvent) -> bool;

    fn record(&self, event: &RelayEvent, result: &Result<RelayOutcome, Error>);
}

/// Admits every event and remembers nothing: replays are relayed again.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughJournal;

impl RelayJournal for PassThroughJournal {
    fn admit(&self, _event: &RelayEvent) -> bool {
        true
    }

    fn record(&self, _event: &RelayEvent, _result: &Result<RelayOutcome, Error>) {}
}
