use crate::store::Store;

/// Runs store queries through the kanau [`Processor`](kanau::processor::Processor) trait.
///
/// Query types live next to the entity they read (see [`crate::entities`]).
#[derive(Clone)]
pub struct StoreProcessor {
    pub store: Store,
}

impl StoreProcessor {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}
