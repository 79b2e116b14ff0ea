//! Task registry.
//!
//! # Responsibility
//! - CRUD over task records, their subtasks and status history.
//! - Push counter deltas into the board registry on every status-affecting
//!   write.
//! - Filter and sort tasks for list/board views.
//!
//! # Invariants
//! - Tasks are only created for existing boards.
//! - A status change appends exactly one history entry.
//! - New tasks are appended at the bottom of their lane (`order = max + 1`).

use crate::model::board::{BoardId, CountDelta};
use crate::model::tag::{Tag, TagId};
use crate::model::task::{
    Priority, StatusChange, SubTask, SubTaskId, Task, TaskDraft, TaskId, TaskPatch, STATUS_DONE,
};
use crate::model::{normalize_name, normalize_status, now_epoch_ms, validate_estimate};
use crate::store::board_store::BoardStore;
use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

/// Persisted task registry state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStore {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Sort key for [`TaskQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortField {
    #[default]
    Created,
    Due,
    Priority,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filter and sort options for [`TaskStore::filter`].
///
/// Empty collections and `None` bounds mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring over title and description.
    pub text: Option<String>,
    pub board_id: Option<BoardId>,
    pub priorities: Vec<Priority>,
    /// Matches tasks carrying any of these tags.
    pub tag_ids: Vec<TagId>,
    /// Inclusive lower due-date bound, epoch ms.
    pub due_from: Option<i64>,
    /// Inclusive upper due-date bound, epoch ms.
    pub due_to: Option<i64>,
    pub sort_by: TaskSortField,
    pub direction: SortDirection,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn for_board(&self, board_id: BoardId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.board_id == board_id)
    }

    /// Tasks of one lane sorted by `order`.
    pub fn by_status(&self, board_id: BoardId, status: &str) -> Vec<&Task> {
        let mut items: Vec<&Task> = self
            .for_board(board_id)
            .filter(|task| task.status == status)
            .collect();
        items.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
        items
    }

    /// Creates a task and adds its contribution to the board counters.
    pub fn add_task(&mut self, boards: &mut BoardStore, draft: TaskDraft) -> StoreResult<Task> {
        if !boards.contains(draft.board_id) {
            return Err(StoreError::BoardNotFound(draft.board_id));
        }

        let title = normalize_name(draft.title, "task title")?;
        let status = normalize_status(draft.status)?;
        let estimate = validate_estimate(draft.estimate)?;
        let now = now_epoch_ms();
        let order = self.next_order(draft.board_id, &status);

        let task = Task {
            id: Uuid::new_v4(),
            title,
            description: normalize_description(draft.description),
            due_date: draft.due_date,
            tags: dedupe_tags(draft.tags),
            estimate,
            priority: draft.priority,
            completed_at: (status == STATUS_DONE).then_some(now),
            status_history: vec![StatusChange {
                from: None,
                to: status.clone(),
                changed_at: now,
            }],
            status,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
            board_id: draft.board_id,
            order,
        };

        boards.apply_counter_delta(task.board_id, CountDelta::for_status(&task.status));
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Merges present patch fields.
    ///
    /// A status change appends to the history and pushes the transition
    /// delta to the board.
    pub fn update_task(
        &mut self,
        boards: &mut BoardStore,
        id: TaskId,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let title = patch
            .title
            .map(|value| normalize_name(value, "task title"))
            .transpose()?;
        let status = patch.status.map(normalize_status).transpose()?;
        let estimate = patch.estimate.map(validate_estimate).transpose()?;

        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return Ok(None);
        };
        // A task entering another lane goes to the end of that lane.
        let lane_order = status
            .as_deref()
            .filter(|status| *status != self.tasks[index].status)
            .map(|status| self.next_order(self.tasks[index].board_id, status));

        let task = &mut self.tasks[index];
        let now = now_epoch_ms();
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = normalize_description(description);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            task.tags = dedupe_tags(tags);
        }
        if let Some(estimate) = estimate {
            task.estimate = estimate;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = status {
            let previous = task.status.clone();
            if task.transition_to(&status, now) {
                if let Some(order) = lane_order {
                    task.order = order;
                }
                boards.apply_counter_delta(
                    task.board_id,
                    CountDelta::for_transition(&previous, &status),
                );
            }
        }
        task.updated_at = now;
        Ok(Some(task.clone()))
    }

    /// Moves a task to another lane by status key.
    pub fn move_task(
        &mut self,
        boards: &mut BoardStore,
        id: TaskId,
        status: impl Into<String>,
    ) -> StoreResult<Option<Task>> {
        self.update_task(
            boards,
            id,
            TaskPatch {
                status: Some(status.into()),
                ..TaskPatch::default()
            },
        )
    }

    /// Deletes a task and removes its contribution from the board counters.
    pub fn delete_task(&mut self, boards: &mut BoardStore, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        let task = self.tasks.remove(index);
        boards.apply_counter_delta(task.board_id, CountDelta::for_status(&task.status).negate());
        Some(task)
    }

    /// Assigns `order = index` for each listed task. Unknown ids are skipped.
    ///
    /// Returns the number of tasks reordered.
    pub fn reorder_tasks(&mut self, ids: &[TaskId]) -> usize {
        let mut touched = 0;
        let now = now_epoch_ms();
        for (index, id) in ids.iter().enumerate() {
            if let Some(task) = self.tasks.iter_mut().find(|task| task.id == *id) {
                task.order = index as i64;
                task.updated_at = now;
                touched += 1;
            }
        }
        touched
    }

    pub fn add_subtask(
        &mut self,
        task_id: TaskId,
        title: impl Into<String>,
    ) -> StoreResult<Option<SubTask>> {
        let title = normalize_name(title, "subtask title")?;
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            return Ok(None);
        };

        let now = now_epoch_ms();
        let subtask = SubTask {
            id: Uuid::new_v4(),
            title,
            completed: false,
            created_at: now,
        };
        task.subtasks.push(subtask.clone());
        task.updated_at = now;
        Ok(Some(subtask))
    }

    /// Flips a subtask's completed flag. Returns the new value.
    pub fn toggle_subtask(&mut self, task_id: TaskId, subtask_id: SubTaskId) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| task.id == task_id)?;
        let subtask = task.subtasks.iter_mut().find(|item| item.id == subtask_id)?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        task.updated_at = now_epoch_ms();
        Some(completed)
    }

    pub fn delete_subtask(&mut self, task_id: TaskId, subtask_id: SubTaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            return false;
        };
        let before = task.subtasks.len();
        task.subtasks.retain(|item| item.id != subtask_id);
        if task.subtasks.len() == before {
            return false;
        }
        task.updated_at = now_epoch_ms();
        true
    }

    /// Returns matching tasks in the requested order.
    pub fn filter(&self, query: &TaskQuery) -> Vec<&Task> {
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        let mut items: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| query.board_id.map_or(true, |id| task.board_id == id))
            .filter(|task| query.priorities.is_empty() || query.priorities.contains(&task.priority))
            .filter(|task| {
                query.tag_ids.is_empty() || query.tag_ids.iter().any(|id| task.has_tag(*id))
            })
            .filter(|task| due_in_range(task.due_date, query.due_from, query.due_to))
            .filter(|task| match needle.as_deref() {
                Some(needle) => matches_text(task, needle),
                None => true,
            })
            .collect();

        items.sort_by(|a, b| compare_tasks(a, b, query.sort_by, query.direction));
        items
    }

    /// Strips one tag from every task. Returns the number of tasks touched.
    pub(crate) fn remove_tag_everywhere(&mut self, tag_id: TagId) -> usize {
        let now = now_epoch_ms();
        let mut touched = 0;
        for task in &mut self.tasks {
            let before = task.tags.len();
            task.tags.retain(|tag| tag.id != tag_id);
            if task.tags.len() != before {
                task.updated_at = now;
                touched += 1;
            }
        }
        touched
    }

    /// Moves every task of a board from one status to another, appending
    /// them after the target lane in their previous relative order.
    ///
    /// Counters are not adjusted; callers recount the board afterwards.
    pub(crate) fn migrate_status(
        &mut self,
        board_id: BoardId,
        from: &str,
        to: &str,
        now: i64,
    ) -> usize {
        let mut order = self.next_order(board_id, to);
        let mut lane: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.board_id == board_id && task.status == from)
            .map(|(index, _)| index)
            .collect();
        lane.sort_by_key(|&index| self.tasks[index].order);

        let mut moved = 0;
        for index in lane {
            let task = &mut self.tasks[index];
            if task.transition_to(to, now) {
                task.order = order;
                order += 1;
                moved += 1;
            }
        }
        moved
    }

    pub(crate) fn remove_with_status(&mut self, board_id: BoardId, status: &str) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|task| !(task.board_id == board_id && task.status == status));
        before - self.tasks.len()
    }

    pub(crate) fn remove_for_board(&mut self, board_id: BoardId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.board_id != board_id);
        before - self.tasks.len()
    }

    fn next_order(&self, board_id: BoardId, status: &str) -> i64 {
        self.for_board(board_id)
            .filter(|task| task.status == status)
            .map(|task| task.order)
            .max()
            .map_or(0, |max| max + 1)
    }
}

fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn dedupe_tags(tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.into_iter().filter(|tag| seen.insert(tag.id)).collect()
}

fn matches_text(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle))
}

fn due_in_range(due_date: Option<i64>, from: Option<i64>, to: Option<i64>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(due) = due_date else {
        return false;
    };
    from.map_or(true, |bound| due >= bound) && to.map_or(true, |bound| due <= bound)
}

fn compare_tasks(a: &Task, b: &Task, field: TaskSortField, direction: SortDirection) -> Ordering {
    let primary = match field {
        TaskSortField::Created => apply_direction(a.created_at.cmp(&b.created_at), direction),
        TaskSortField::Title => apply_direction(
            a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            direction,
        ),
        TaskSortField::Priority => {
            apply_direction(a.priority.rank().cmp(&b.priority.rank()), direction)
        }
        // Tasks without a due date sort last in both directions.
        TaskSortField::Due => match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => apply_direction(left.cmp(&right), direction),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    primary
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

fn apply_direction(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}
