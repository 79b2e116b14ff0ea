//! Read-only dashboard projections.
//!
//! Every function here is a pure view over the registries; nothing is cached
//! and nothing is written back.

use crate::model::board::{BoardId, TaskCounts};
use crate::model::column::ColumnId;
use crate::model::task::{Priority, STATUS_TODO};
use crate::store::task_store::TaskStore;
use crate::store::Registries;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub board_id: BoardId,
    pub name: String,
    pub counts: TaskCounts,
    pub todo: u32,
    pub overdue: u32,
    /// `completed / total` rounded down, 0 for an empty board.
    pub completion_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub column_id: ColumnId,
    pub title: String,
    pub status: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub boards: u32,
    pub starred_boards: u32,
    pub columns: u32,
    pub tags: u32,
    pub counts: TaskCounts,
    pub overdue: u32,
}

/// Summarizes one board. Returns `None` for an unknown board.
pub fn board_summary(registries: &Registries, board_id: BoardId, now: i64) -> Option<BoardSummary> {
    let board = registries.boards.get(board_id)?;
    let mut todo = 0;
    let mut overdue = 0;
    for task in registries.tasks.for_board(board_id) {
        if task.status == STATUS_TODO {
            todo += 1;
        }
        if task.is_overdue(now) {
            overdue += 1;
        }
    }

    Some(BoardSummary {
        board_id,
        name: board.name.clone(),
        counts: board.tasks_count,
        todo,
        overdue,
        completion_percent: completion_percent(&board.tasks_count),
    })
}

/// Task counts per priority, highest rank first. Priorities with no tasks
/// are reported with a zero count.
pub fn priority_breakdown(tasks: &TaskStore, board_id: BoardId) -> Vec<PriorityCount> {
    let mut counts: Vec<PriorityCount> = Priority::ALL
        .iter()
        .rev()
        .map(|priority| PriorityCount {
            priority: *priority,
            count: 0,
        })
        .collect();
    for task in tasks.for_board(board_id) {
        if let Some(entry) = counts.iter_mut().find(|entry| entry.priority == task.priority) {
            entry.count += 1;
        }
    }
    counts
}

/// Task counts per column in column order.
///
/// Tasks whose status matches no column are not reported.
pub fn status_breakdown(registries: &Registries, board_id: BoardId) -> Vec<StatusCount> {
    registries
        .columns
        .for_board(board_id)
        .into_iter()
        .map(|column| StatusCount {
            column_id: column.id,
            title: column.title.clone(),
            status: column.status.clone(),
            count: registries
                .tasks
                .for_board(board_id)
                .filter(|task| task.status == column.status)
                .count() as u32,
        })
        .collect()
}

/// Totals across every board.
pub fn overall(registries: &Registries, now: i64) -> OverallStats {
    let mut stats = OverallStats {
        boards: registries.boards.len() as u32,
        columns: registries.columns.columns().len() as u32,
        tags: registries.tags.tags().len() as u32,
        ..OverallStats::default()
    };
    for board in registries.boards.boards() {
        if board.starred {
            stats.starred_boards += 1;
        }
        stats.counts.total += board.tasks_count.total;
        stats.counts.completed += board.tasks_count.completed;
        stats.counts.in_progress += board.tasks_count.in_progress;
    }
    stats.overdue = registries
        .tasks
        .tasks()
        .iter()
        .filter(|task| task.is_overdue(now))
        .count() as u32;
    stats
}

fn completion_percent(counts: &TaskCounts) -> u8 {
    if counts.total == 0 {
        return 0;
    }
    let percent = u64::from(counts.completed) * 100 / u64::from(counts.total);
    percent.min(100) as u8
}
