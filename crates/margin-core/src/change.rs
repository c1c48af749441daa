use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Collection;

/// One write to a record document, as published by the store.
///
/// `before` is the stored document prior to the write (if any), `after` the
/// document once the write completed. `after == None` is a deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub collection: Collection,
    pub record_id: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl RecordChange {
    pub fn is_deletion(&self) -> bool {
        self.after.is_none()
    }

    /// True when this write is the first one that made the document carry its
    /// identifying field. A pre-existing document without that field does not
    /// count as seen. Deletions are never first-seen.
    pub fn is_first_seen(&self) -> bool {
        if self.is_deletion() {
            return false;
        }

        match &self.before {
            None => true,
            Some(doc) => doc.get(self.collection.id_field()).is_none(),
        }
    }
}
