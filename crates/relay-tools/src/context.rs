//! Per-request context handed to every tool handler.

use std::path::{Path, PathBuf};

use relay_types::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One entry of the session's todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: String,
    pub priority: String,
    pub id: String,
}

/// Explicit context for one request: the session, the directory relative
/// paths resolve against, and the in-memory todo list.
///
/// Nothing here outlives the process.
#[derive(Debug)]
pub struct ToolContext {
    session: Session,
    working_dir: PathBuf,
    todos: Mutex<Vec<TodoItem>>,
}

impl ToolContext {
    /// `working_dir` should be absolute so that search results are too.
    pub fn new(session: Session, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            working_dir: working_dir.into(),
            todos: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve a tool-supplied path against the working directory, dropping
    /// `.` components.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(path).components().collect()
    }

    /// Snapshot of the current todo list.
    pub async fn todos(&self) -> Vec<TodoItem> {
        self.todos.lock().await.clone()
    }

    /// Replace the todo list wholesale.
    pub async fn replace_todos(&self, todos: Vec<TodoItem>) {
        *self.todos.lock().await = todos;
    }
}
