use std::collections::BTreeMap;

use super::domain::{
    Board, BoardId, Column, ColumnId, JobApplication, JobApplicationId, OrderSlot, UserId,
};

/// Storage abstraction so the board service can be exercised in isolation.
///
/// Reads are plain keyed lookups. Every mutation of job applications goes
/// through [`BoardRepository::commit`], which must apply a [`WriteBatch`]
/// entirely or not at all.
pub trait BoardRepository: Send + Sync {
    fn find_board_for_user(&self, user: &UserId) -> Result<Option<Board>, RepositoryError>;
    fn find_board(&self, user: &UserId, board_id: BoardId)
        -> Result<Option<Board>, RepositoryError>;
    fn find_column(
        &self,
        board_id: BoardId,
        column_id: ColumnId,
    ) -> Result<Option<Column>, RepositoryError>;
    fn columns_for_board(&self, board_id: BoardId) -> Result<Vec<Column>, RepositoryError>;
    fn insert_board(&self, board: Board, columns: Vec<Column>) -> Result<Board, RepositoryError>;

    fn find_job_application(
        &self,
        id: JobApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError>;
    /// Cards in a column sorted by order, optionally restricted to one owner.
    fn job_applications_in_column(
        &self,
        column_id: ColumnId,
        user: Option<&UserId>,
    ) -> Result<Vec<JobApplication>, RepositoryError>;
    fn max_order_in_column(&self, column_id: ColumnId) -> Result<Option<i64>, RepositoryError>;

    /// Version counter bumped by every committed batch touching the column.
    fn column_version(&self, column_id: ColumnId) -> Result<u64, RepositoryError>;
    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("concurrent modification detected")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// One write inside a batch. Every op carrying an expected value is a
/// compare-and-set: the batch fails with `Conflict` if the stored record no
/// longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Insert(JobApplication),
    /// Overwrites a record that must still equal `expected` in full.
    Replace {
        record: JobApplication,
        expected: Box<JobApplication>,
    },
    /// Rewrites only the order key of a sibling still sitting at `expected`.
    SetOrder {
        id: JobApplicationId,
        expected: OrderSlot,
        order: i64,
    },
    Delete {
        id: JobApplicationId,
    },
}

impl WriteOp {
    pub fn id(&self) -> JobApplicationId {
        match self {
            WriteOp::Insert(record) | WriteOp::Replace { record, .. } => record.id,
            WriteOp::SetOrder { id, .. } | WriteOp::Delete { id } => *id,
        }
    }
}

/// All-or-nothing unit of work against the job application table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    expected_versions: BTreeMap<ColumnId, u64>,
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the version a column had when the batch's snapshot was read.
    pub fn expect_version(mut self, column_id: ColumnId, version: u64) -> Self {
        self.expected_versions.insert(column_id, version);
        self
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn with(mut self, op: WriteOp) -> Self {
        self.push(op);
        self
    }

    pub fn into_parts(self) -> (BTreeMap<ColumnId, u64>, Vec<WriteOp>) {
        (self.expected_versions, self.ops)
    }
}
