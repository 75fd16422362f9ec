//! Background tasks owned by the cache. Today that is only the expiration
//! sweeper.

pub(crate) mod sweeper;
