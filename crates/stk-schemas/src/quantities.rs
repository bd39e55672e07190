//! Ordered `option_id -> quantity` mapping.
//!
//! Iteration order is insertion order (the order options appear in their
//! group). Even-split remainders and remainder tie-breaks in the distributor
//! depend on it, so the map never re-sorts its entries.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuantityMap {
    entries: Vec<(String, i64)>,
}

impl QuantityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Overwriting keeps the original position.
    pub fn insert(&mut self, option_id: impl Into<String>, quantity: i64) {
        let option_id = option_id.into();
        match self.entries.iter_mut().find(|(id, _)| *id == option_id) {
            Some(entry) => entry.1 = quantity,
            None => self.entries.push((option_id, quantity)),
        }
    }

    pub fn get(&self, option_id: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(id, _)| id == option_id)
            .map(|(_, q)| *q)
    }

    pub fn contains(&self, option_id: &str) -> bool {
        self.get(option_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.entries.iter().map(|(id, q)| (id.as_str(), *q))
    }

    pub fn option_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Sum of all quantities (i128 so corrupt snapshots cannot overflow).
    pub fn total(&self) -> i128 {
        self.entries.iter().map(|(_, q)| i128::from(*q)).sum()
    }

    /// Entries of `self` whose value differs from `baseline` (or that are
    /// missing from it), in `self`'s order.
    pub fn changed_from(&self, baseline: &QuantityMap) -> QuantityMap {
        self.iter()
            .filter(|(id, q)| baseline.get(id) != Some(*q))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for QuantityMap {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut map = QuantityMap::new();
        for (id, q) in iter {
            map.insert(id, q);
        }
        map
    }
}

impl Serialize for QuantityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, q) in &self.entries {
            map.serialize_entry(id, q)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QuantityMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityMapVisitor;

        impl<'de> Visitor<'de> for QuantityMapVisitor {
            type Value = QuantityMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of option id to integer quantity")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<QuantityMap, A::Error> {
                let mut out = QuantityMap::new();
                while let Some((id, q)) = access.next_entry::<String, i64>()? {
                    out.insert(id, q);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(QuantityMapVisitor)
    }
}
