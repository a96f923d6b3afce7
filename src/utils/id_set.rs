use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free collection of document ids.
///
/// Stored as a plain array so existing documents load unchanged; duplicates
/// already present in storage are collapsed on load and are never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ObjectId>", into = "Vec<ObjectId>")]
pub struct IdSet(Vec<ObjectId>);

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.0.contains(id)
    }

    /// Returns `true` when the id was not present before.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Returns `true` when the id was present.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        match self.0.iter().position(|existing| existing == id) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Inserts an absent id or removes a present one. Returns `true` when the
    /// id is a member afterwards.
    pub fn toggle(&mut self, id: ObjectId) -> bool {
        if self.remove(&id) {
            false
        } else {
            self.0.push(id);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(|id| id.to_hex()).collect()
    }
}

impl From<Vec<ObjectId>> for IdSet {
    fn from(ids: Vec<ObjectId>) -> Self {
        let mut set = IdSet(Vec::with_capacity(ids.len()));
        for id in ids {
            set.insert(id);
        }
        set
    }
}

impl From<IdSet> for Vec<ObjectId> {
    fn from(set: IdSet) -> Self {
        set.0
    }
}
