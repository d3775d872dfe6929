use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    sort_by_order, Board, BoardId, Column, ColumnId, JobApplication, JobApplicationId, UserId,
};
use super::repository::{BoardRepository, RepositoryError, WriteBatch, WriteOp};

#[derive(Debug, Default)]
struct StoreState {
    boards: HashMap<BoardId, Board>,
    columns: HashMap<ColumnId, Column>,
    applications: HashMap<JobApplicationId, JobApplication>,
    versions: HashMap<ColumnId, u64>,
    commits: u64,
}

impl StoreState {
    fn version(&self, column_id: ColumnId) -> u64 {
        self.versions.get(&column_id).copied().unwrap_or(0)
    }
}

/// Process-local store backing the service and the tests.
///
/// A single mutex guards all tables, so a batch is validated and applied
/// without any other reader or writer observing it half done.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBoardStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("board store lock poisoned".to_string()))
    }

    /// Number of batches committed so far.
    pub fn commit_count(&self) -> Result<u64, RepositoryError> {
        Ok(self.lock()?.commits)
    }

    pub fn application_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.applications.len())
    }
}

impl BoardRepository for InMemoryBoardStore {
    fn find_board_for_user(&self, user: &UserId) -> Result<Option<Board>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .boards
            .values()
            .find(|board| &board.user_id == user)
            .cloned())
    }

    fn find_board(
        &self,
        user: &UserId,
        board_id: BoardId,
    ) -> Result<Option<Board>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .boards
            .get(&board_id)
            .filter(|board| &board.user_id == user)
            .cloned())
    }

    fn find_column(
        &self,
        board_id: BoardId,
        column_id: ColumnId,
    ) -> Result<Option<Column>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .columns
            .get(&column_id)
            .filter(|column| column.board_id == board_id)
            .cloned())
    }

    fn columns_for_board(&self, board_id: BoardId) -> Result<Vec<Column>, RepositoryError> {
        let state = self.lock()?;
        let mut columns: Vec<Column> = state
            .columns
            .values()
            .filter(|column| column.board_id == board_id)
            .cloned()
            .collect();
        columns.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(columns)
    }

    fn insert_board(&self, board: Board, columns: Vec<Column>) -> Result<Board, RepositoryError> {
        let mut state = self.lock()?;
        let duplicate = state.boards.contains_key(&board.id)
            || state
                .boards
                .values()
                .any(|existing| existing.user_id == board.user_id);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        for column in columns {
            state.columns.insert(column.id, column);
        }
        state.boards.insert(board.id, board.clone());
        Ok(board)
    }

    fn find_job_application(
        &self,
        id: JobApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.applications.get(&id).cloned())
    }

    fn job_applications_in_column(
        &self,
        column_id: ColumnId,
        user: Option<&UserId>,
    ) -> Result<Vec<JobApplication>, RepositoryError> {
        let state = self.lock()?;
        let mut applications: Vec<JobApplication> = state
            .applications
            .values()
            .filter(|application| application.column_id == column_id)
            .filter(|application| user.map_or(true, |user| &application.user_id == user))
            .cloned()
            .collect();
        sort_by_order(&mut applications);
        Ok(applications)
    }

    fn max_order_in_column(&self, column_id: ColumnId) -> Result<Option<i64>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .applications
            .values()
            .filter(|application| application.column_id == column_id)
            .map(|application| application.order)
            .max())
    }

    fn column_version(&self, column_id: ColumnId) -> Result<u64, RepositoryError> {
        Ok(self.lock()?.version(column_id))
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        let (expected_versions, ops) = batch.into_parts();
        let mut state = self.lock()?;

        if expected_versions
            .iter()
            .any(|(column_id, version)| state.version(*column_id) != *version)
        {
            return Err(RepositoryError::Conflict);
        }

        // Stage every op against a private overlay; nothing touches the
        // tables until the whole batch has validated.
        let mut staged: HashMap<JobApplicationId, Option<JobApplication>> = HashMap::new();
        let mut touched: BTreeSet<ColumnId> = BTreeSet::new();

        for op in ops {
            let id = op.id();
            let current = match staged.get(&id) {
                Some(entry) => entry.clone(),
                None => state.applications.get(&id).cloned(),
            };

            match op {
                WriteOp::Insert(record) => {
                    if current.is_some() {
                        return Err(RepositoryError::Conflict);
                    }
                    if !state.columns.contains_key(&record.column_id) {
                        return Err(RepositoryError::NotFound);
                    }
                    touched.insert(record.column_id);
                    staged.insert(id, Some(record));
                }
                WriteOp::Replace { record, expected } => {
                    let current = current.ok_or(RepositoryError::NotFound)?;
                    if current != *expected {
                        return Err(RepositoryError::Conflict);
                    }
                    if !state.columns.contains_key(&record.column_id) {
                        return Err(RepositoryError::NotFound);
                    }
                    touched.insert(current.column_id);
                    touched.insert(record.column_id);
                    staged.insert(id, Some(record));
                }
                WriteOp::SetOrder {
                    expected, order, ..
                } => {
                    let mut current = current.ok_or(RepositoryError::NotFound)?;
                    if current.slot() != expected {
                        return Err(RepositoryError::Conflict);
                    }
                    current.order = order;
                    touched.insert(current.column_id);
                    staged.insert(id, Some(current));
                }
                WriteOp::Delete { .. } => {
                    let current = current.ok_or(RepositoryError::NotFound)?;
                    touched.insert(current.column_id);
                    staged.insert(id, None);
                }
            }
        }

        for (id, entry) in staged {
            match entry {
                Some(record) => {
                    state.applications.insert(id, record);
                }
                None => {
                    state.applications.remove(&id);
                }
            }
        }
        for column_id in touched {
            *state.versions.entry(column_id).or_insert(0) += 1;
        }
        state.commits += 1;

        Ok(())
    }
}
