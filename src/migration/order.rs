//! Deterministic execution order over discovered migrations

use crate::migration::Identified;
use std::collections::HashMap;
use std::ops::Deref;

/// Migrations sorted ascending by identity
///
/// Only [`order`] builds one, so holding an `Ordered` means the sort has happened.
#[derive(Debug)]
pub struct Ordered<T>(Vec<T>);

impl<T: Identified> Ordered<T> {
    /// Identities in execution order
    pub fn identities(&self) -> Vec<&str> {
        self.0.iter().map(Identified::identity).collect()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// Keep the items matching `keep`, preserving order
    #[must_use]
    pub fn filter(self, mut keep: impl FnMut(&T) -> bool) -> Self {
        Self(self.0.into_iter().filter(|item| keep(item)).collect())
    }
}

impl<T> Deref for Ordered<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<'a, T> IntoIterator for &'a Ordered<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Sort a discovered set ascending by identity
///
/// Identities start with a `YYYYMMDDHHMM` timestamp, so this is creation order. Two
/// migrations created in the same minute fall back to name order.
pub fn order<T: Identified>(discovered: HashMap<String, T>) -> Ordered<T> {
    let mut items: Vec<T> = discovered.into_values().collect();
    items.sort_by(|a, b| a.identity().cmp(b.identity()));
    Ordered(items)
}
