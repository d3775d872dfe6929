use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;

use crate::board::domain::{
    Board, BoardId, BoardView, Column, ColumnId, JobApplication, JobApplicationId,
    NewJobApplication, UserId,
};
use crate::board::memory::InMemoryBoardStore;
use crate::board::repository::{BoardRepository, RepositoryError, WriteBatch, WriteOp};
use crate::board::service::JobBoardService;
use crate::config::BoardConfig;

pub(super) fn alice() -> UserId {
    UserId::new("user-alice")
}

pub(super) fn mallory() -> UserId {
    UserId::new("user-mallory")
}

pub(super) fn build_service() -> (JobBoardService<InMemoryBoardStore>, Arc<InMemoryBoardStore>) {
    let store = Arc::new(InMemoryBoardStore::new());
    let service = JobBoardService::new(store.clone(), BoardConfig::default());
    (service, store)
}

pub(super) fn seeded_board<R>(service: &JobBoardService<R>, user: &UserId) -> BoardView
where
    R: BoardRepository + 'static,
{
    service.init_user_board(user).expect("board seeds");
    service
        .get_user_board(user)
        .expect("board loads")
        .expect("board present")
}

pub(super) fn column_id(view: &BoardView, name: &str) -> ColumnId {
    view.column_named(name).expect("default column exists").id
}

pub(super) fn new_application(view: &BoardView, column: ColumnId, company: &str) -> NewJobApplication {
    NewJobApplication {
        board_id: view.id,
        column_id: column,
        company: company.to_string(),
        position: "Backend Engineer".to_string(),
        location: Some("Remote".to_string()),
        notes: None,
        salary: None,
        job_url: None,
        tags: vec!["rust".to_string()],
        description: None,
    }
}

pub(super) fn create_all<R>(
    service: &JobBoardService<R>,
    user: &UserId,
    view: &BoardView,
    column: ColumnId,
    companies: &[&str],
) -> Vec<JobApplication>
where
    R: BoardRepository + 'static,
{
    companies
        .iter()
        .map(|company| {
            service
                .create_job_application(user, new_application(view, column, company))
                .expect("create succeeds")
        })
        .collect()
}

/// Card with an explicit order key, created `seq` seconds after a fixed epoch.
pub(super) fn card_record(
    user: &UserId,
    view: &BoardView,
    column: ColumnId,
    company: &str,
    order: i64,
    seq: i64,
) -> JobApplication {
    let created = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::seconds(seq);
    JobApplication {
        id: JobApplicationId::generate(),
        user_id: user.clone(),
        board_id: view.id,
        column_id: column,
        company: company.to_string(),
        position: "Backend Engineer".to_string(),
        location: None,
        description: None,
        job_url: None,
        salary: None,
        notes: None,
        tags: Vec::new(),
        status: "applied".to_string(),
        order,
        applied_date: None,
        created_at: created,
        updated_at: created,
    }
}

/// Writes cards with explicit order keys straight into the store.
pub(super) fn seed_cards(
    store: &InMemoryBoardStore,
    user: &UserId,
    view: &BoardView,
    column: ColumnId,
    cards: &[(&str, i64)],
) -> Vec<JobApplication> {
    let records: Vec<JobApplication> = cards
        .iter()
        .zip(0_i64..)
        .map(|((company, order), seq)| card_record(user, view, column, company, *order, seq))
        .collect();

    let batch = records
        .iter()
        .cloned()
        .fold(WriteBatch::new(), |batch, record| {
            batch.with(WriteOp::Insert(record))
        });
    store.commit(batch).expect("seed commits");
    records
}

/// `(company, order)` pairs of a column in display order.
pub(super) fn column_state<R>(repository: &R, user: &UserId, column: ColumnId) -> Vec<(String, i64)>
where
    R: BoardRepository,
{
    repository
        .job_applications_in_column(column, Some(user))
        .expect("column query succeeds")
        .into_iter()
        .map(|application| (application.company, application.order))
        .collect()
}

pub(super) fn companies<R>(repository: &R, user: &UserId, column: ColumnId) -> Vec<String>
where
    R: BoardRepository,
{
    column_state(repository, user, column)
        .into_iter()
        .map(|(company, _)| company)
        .collect()
}

pub(super) fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected
        .iter()
        .map(|(company, order)| (company.to_string(), *order))
        .collect()
}

/// Read-through wrapper over a shared store; `commit` is customised per test.
macro_rules! delegate_reads {
    () => {
        fn find_board_for_user(&self, user: &UserId) -> Result<Option<Board>, RepositoryError> {
            self.inner.find_board_for_user(user)
        }

        fn find_board(
            &self,
            user: &UserId,
            board_id: BoardId,
        ) -> Result<Option<Board>, RepositoryError> {
            self.inner.find_board(user, board_id)
        }

        fn find_column(
            &self,
            board_id: BoardId,
            column_id: ColumnId,
        ) -> Result<Option<Column>, RepositoryError> {
            self.inner.find_column(board_id, column_id)
        }

        fn columns_for_board(&self, board_id: BoardId) -> Result<Vec<Column>, RepositoryError> {
            self.inner.columns_for_board(board_id)
        }

        fn insert_board(
            &self,
            board: Board,
            columns: Vec<Column>,
        ) -> Result<Board, RepositoryError> {
            self.inner.insert_board(board, columns)
        }

        fn find_job_application(
            &self,
            id: JobApplicationId,
        ) -> Result<Option<JobApplication>, RepositoryError> {
            self.inner.find_job_application(id)
        }

        fn job_applications_in_column(
            &self,
            column_id: ColumnId,
            user: Option<&UserId>,
        ) -> Result<Vec<JobApplication>, RepositoryError> {
            self.inner.job_applications_in_column(column_id, user)
        }

        fn max_order_in_column(
            &self,
            column_id: ColumnId,
        ) -> Result<Option<i64>, RepositoryError> {
            self.inner.max_order_in_column(column_id)
        }

        fn column_version(&self, column_id: ColumnId) -> Result<u64, RepositoryError> {
            self.inner.column_version(column_id)
        }
    };
}

/// Reads succeed, every commit fails as if storage went away mid-request.
pub(super) struct FailingCommitRepository {
    pub(super) inner: InMemoryBoardStore,
}

impl BoardRepository for FailingCommitRepository {
    delegate_reads!();

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

/// Every commit loses the race.
pub(super) struct AlwaysConflictRepository {
    pub(super) inner: InMemoryBoardStore,
    pub(super) attempts: AtomicUsize,
}

impl BoardRepository for AlwaysConflictRepository {
    delegate_reads!();

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Conflict)
    }
}

pub(super) type Interference = Box<dyn FnOnce(&InMemoryBoardStore) + Send>;

/// Runs a competing write against the store right before the first commit,
/// reproducing two requests interleaving on one column.
pub(super) struct InterleavingRepository {
    pub(super) inner: InMemoryBoardStore,
    pub(super) interference: Mutex<Option<Interference>>,
    pub(super) attempts: AtomicUsize,
}

impl InterleavingRepository {
    pub(super) fn new(inner: InMemoryBoardStore, interference: Interference) -> Self {
        Self {
            inner,
            interference: Mutex::new(Some(interference)),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl BoardRepository for InterleavingRepository {
    delegate_reads!();

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let pending = self
            .interference
            .lock()
            .expect("interference mutex poisoned")
            .take();
        if let Some(interfere) = pending {
            interfere(&self.inner);
        }
        self.inner.commit(batch)
    }
}

pub(super) struct UnavailableRepository;

impl BoardRepository for UnavailableRepository {
    fn find_board_for_user(&self, _user: &UserId) -> Result<Option<Board>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_board(
        &self,
        _user: &UserId,
        _board_id: BoardId,
    ) -> Result<Option<Board>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_column(
        &self,
        _board_id: BoardId,
        _column_id: ColumnId,
    ) -> Result<Option<Column>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn columns_for_board(&self, _board_id: BoardId) -> Result<Vec<Column>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_board(&self, _board: Board, _columns: Vec<Column>) -> Result<Board, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_job_application(
        &self,
        _id: JobApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn job_applications_in_column(
        &self,
        _column_id: ColumnId,
        _user: Option<&UserId>,
    ) -> Result<Vec<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn max_order_in_column(&self, _column_id: ColumnId) -> Result<Option<i64>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn column_version(&self, _column_id: ColumnId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(&self, _batch: WriteBatch) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
