//! Defines [`ResourceId`], the 1-based identifier of a remotely hosted
//! resource, and [`batch`], which carves the ID space into the contiguous
//! ranges requested by [`crate::discover`].

use crate::fetch::Error;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;

/// A positive, 1-based resource identifier. IDs are expected to be dense: the
/// first missing ID marks the end of the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(NonZeroU32);

impl ResourceId {
    /// The first ID in every collection.
    pub const FIRST: ResourceId = ResourceId(NonZeroU32::MIN);

    /// Returns [`Error::MissingId`] for `0`.
    pub fn new(id: u32) -> Result<ResourceId, Error> {
        NonZeroU32::new(id).map(ResourceId).ok_or(Error::MissingId)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns the `size` consecutive IDs starting at `start`, leaving out any ID
/// that is not strictly below `max_id`.
pub fn batch(start: ResourceId, size: usize, max_id: u32) -> Vec<ResourceId> {
    let first = start.get();
    (0..size)
        .map_while(|offset| u32::try_from(offset).ok())
        .map_while(|offset| first.checked_add(offset))
        .take_while(|&id| id < max_id)
        .filter_map(NonZeroU32::new)
        .map(ResourceId)
        .collect()
}
