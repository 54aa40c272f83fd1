//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::with_resolution_guard;
pub use dispose_bag::Disposable;
pub(crate) use dispose_bag::{
    dispose_all_reverse, dispose_all_reverse_async, dispose_async_hook, dispose_sync_hook, track_created,
    DisposalHooks, DisposeBag,
};
