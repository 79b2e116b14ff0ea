//! Tag registry.
//!
//! # Invariants
//! - Tag names are unique case-insensitively.
//! - Updates do not propagate to the value copies held by tasks.
//! - Deletion strips the tag from every task.

use crate::model::tag::{Tag, TagId, TagPatch};
use crate::model::{normalize_color, normalize_name};
use crate::store::task_store::TaskStore;
use crate::store::{StoreError, StoreResult};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted tag registry state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStore {
    #[serde(default)]
    tags: Vec<Tag>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    /// Tags sorted by name, case-insensitive.
    pub fn list(&self) -> Vec<&Tag> {
        let mut items: Vec<&Tag> = self.tags.iter().collect();
        items.sort_by_key(|tag| tag.name.to_lowercase());
        items
    }

    pub fn add_tag(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> StoreResult<Tag> {
        let name = normalize_name(name, "tag name")?;
        let color = normalize_color(color)?;
        self.ensure_name_free(&name, None)?;

        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            color,
        };
        self.tags.push(tag.clone());
        Ok(tag)
    }

    pub fn update_tag(&mut self, id: TagId, patch: TagPatch) -> StoreResult<Option<Tag>> {
        let name = patch
            .name
            .map(|value| normalize_name(value, "tag name"))
            .transpose()?;
        let color = patch.color.map(normalize_color).transpose()?;
        if let Some(name) = name.as_deref() {
            self.ensure_name_free(name, Some(id))?;
        }

        let Some(tag) = self.tags.iter_mut().find(|tag| tag.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            tag.name = name;
        }
        if let Some(color) = color {
            tag.color = color;
        }
        Ok(Some(tag.clone()))
    }

    /// Deletes a tag and strips it from every task.
    ///
    /// Returns the removed tag and the number of tasks that carried it.
    pub fn delete_tag(&mut self, tasks: &mut TaskStore, id: TagId) -> Option<(Tag, usize)> {
        let index = self.tags.iter().position(|tag| tag.id == id)?;
        let tag = self.tags.remove(index);
        let stripped = tasks.remove_tag_everywhere(id);
        info!(
            "event=tag_delete module=store status=ok tag_id={} tasks_touched={}",
            id, stripped
        );
        Some((tag, stripped))
    }

    fn ensure_name_free(&self, name: &str, except: Option<TagId>) -> StoreResult<()> {
        let lowered = name.to_lowercase();
        let taken = self
            .tags
            .iter()
            .any(|tag| tag.name.to_lowercase() == lowered && Some(tag.id) != except);
        if taken {
            return Err(StoreError::DuplicateTag(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TagStore;
    use crate::model::tag::TagPatch;
    use crate::store::StoreError;
    use uuid::Uuid;

    #[test]
    fn add_rejects_case_insensitive_duplicates() {
        let mut tags = TagStore::new();
        tags.add_tag("Bug", "#ff0000").unwrap();
        let err = tags.add_tag(" bug ", "#00ff00").unwrap_err();
        assert_eq!(err, StoreError::DuplicateTag("bug".to_string()));
    }

    #[test]
    fn update_can_keep_own_name_and_ignores_unknown() {
        let mut tags = TagStore::new();
        let tag = tags.add_tag("Feature", "#00ff00").unwrap();
        let updated = tags
            .update_tag(
                tag.id,
                TagPatch {
                    name: Some("FEATURE".to_string()),
                    color: Some("#0000FF".to_string()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "FEATURE");
        assert_eq!(updated.color, "#0000ff");
        assert_eq!(
            tags.update_tag(Uuid::new_v4(), TagPatch::default()).unwrap(),
            None
        );
    }

    #[test]
    fn list_sorts_by_name() {
        let mut tags = TagStore::new();
        tags.add_tag("zeta", "#000000").unwrap();
        tags.add_tag("Alpha", "#000000").unwrap();
        let names: Vec<&str> = tags.list().iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
    }
}
