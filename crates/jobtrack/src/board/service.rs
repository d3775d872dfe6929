use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Board, BoardId, BoardView, Column, ColumnId, ColumnView, JobApplication, JobApplicationId,
    JobApplicationUpdate, NewJobApplication, OrderSlot, UserId, DEFAULT_BOARD_NAME, DEFAULT_COLUMNS,
    DEFAULT_STATUS,
};
use super::ordering::{OrderOverflow, OrderingEngine};
use super::repository::{BoardRepository, RepositoryError, WriteBatch, WriteOp};
use crate::config::BoardConfig;

/// Action layer in front of the store: ownership checks, validation, and the
/// ordering engine. Every mutation reaches the store as one [`WriteBatch`].
pub struct JobBoardService<R> {
    repository: Arc<R>,
    engine: OrderingEngine,
    retry_limit: u32,
}

impl<R> JobBoardService<R>
where
    R: BoardRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: BoardConfig) -> Self {
        Self {
            repository,
            engine: OrderingEngine::new(config.order_step),
            retry_limit: config.move_retry_limit.max(1),
        }
    }

    /// Return the caller's board, seeding it with the default columns on first use.
    pub fn init_user_board(&self, user: &UserId) -> Result<Board, BoardServiceError> {
        if let Some(board) = self.repository.find_board_for_user(user)? {
            return Ok(board);
        }

        let now = Utc::now();
        let board = Board {
            id: BoardId::generate(),
            user_id: user.clone(),
            name: DEFAULT_BOARD_NAME.to_string(),
            created_at: now,
            updated_at: now,
        };
        let columns = DEFAULT_COLUMNS
            .iter()
            .zip(0_i64..)
            .map(|(name, order)| Column {
                id: ColumnId::generate(),
                board_id: board.id,
                name: (*name).to_string(),
                order,
                created_at: now,
                updated_at: now,
            })
            .collect();

        match self.repository.insert_board(board, columns) {
            Ok(board) => {
                info!(user = %user, board = %board.id, "seeded default board");
                Ok(board)
            }
            // Lost a race with a parallel first request; theirs wins.
            Err(RepositoryError::Conflict) => self
                .repository
                .find_board_for_user(user)?
                .ok_or(BoardServiceError::BoardNotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// The caller's board with columns and cards sorted by order.
    pub fn get_user_board(&self, user: &UserId) -> Result<Option<BoardView>, BoardServiceError> {
        let Some(board) = self.repository.find_board_for_user(user)? else {
            return Ok(None);
        };

        let columns = self
            .repository
            .columns_for_board(board.id)?
            .into_iter()
            .map(|column| {
                let job_applications = self
                    .repository
                    .job_applications_in_column(column.id, Some(user))?;
                Ok(ColumnView {
                    id: column.id,
                    name: column.name,
                    order: column.order,
                    job_applications,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(BoardView {
            id: board.id,
            name: board.name,
            columns,
        }))
    }

    /// Append a new card to the bottom of its column.
    pub fn create_job_application(
        &self,
        user: &UserId,
        data: NewJobApplication,
    ) -> Result<JobApplication, BoardServiceError> {
        let company = required("company", &data.company)?;
        let position = required("position", &data.position)?;

        let board = self
            .repository
            .find_board(user, data.board_id)?
            .ok_or(BoardServiceError::BoardNotFound)?;
        let column = self
            .repository
            .find_column(board.id, data.column_id)?
            .ok_or(BoardServiceError::ColumnNotFound)?;

        let record = self.with_retries("create", || {
            let version = self.repository.column_version(column.id)?;
            let max_order = self.repository.max_order_in_column(column.id)?;
            let now = Utc::now();
            let record = JobApplication {
                id: JobApplicationId::generate(),
                user_id: user.clone(),
                board_id: board.id,
                column_id: column.id,
                company: company.clone(),
                position: position.clone(),
                location: data.location.clone(),
                description: data.description.clone(),
                job_url: data.job_url.clone(),
                salary: data.salary.clone(),
                notes: data.notes.clone(),
                tags: data.tags.clone(),
                status: DEFAULT_STATUS.to_string(),
                order: OrderingEngine::append_order(max_order)?,
                applied_date: None,
                created_at: now,
                updated_at: now,
            };

            self.repository.commit(
                WriteBatch::new()
                    .expect_version(column.id, version)
                    .with(WriteOp::Insert(record.clone())),
            )?;
            Ok(record)
        })?;

        info!(
            user = %user,
            application = %record.id,
            column = %record.column_id,
            order = record.order,
            "created job application"
        );
        Ok(record)
    }

    /// Edit fields and, when `column_id`/`order` are present, move the card.
    pub fn update_job_application(
        &self,
        user: &UserId,
        id: JobApplicationId,
        updates: JobApplicationUpdate,
    ) -> Result<JobApplication, BoardServiceError> {
        if let Some(company) = &updates.company {
            required("company", company)?;
        }
        if let Some(position) = &updates.position {
            required("position", position)?;
        }

        let updated = self.with_retries("update", || self.apply_update(user, id, &updates))?;

        if updates.has_move() {
            info!(
                user = %user,
                application = %updated.id,
                column = %updated.column_id,
                order = updated.order,
                "moved job application"
            );
        } else {
            debug!(user = %user, application = %updated.id, "edited job application");
        }
        Ok(updated)
    }

    /// Relocate one card to `target_index` in `target_column`, appending when
    /// no index is given.
    pub fn move_job_application(
        &self,
        user: &UserId,
        id: JobApplicationId,
        target_column: ColumnId,
        target_index: Option<usize>,
    ) -> Result<JobApplication, BoardServiceError> {
        self.update_job_application(
            user,
            id,
            JobApplicationUpdate {
                column_id: Some(target_column),
                order: target_index,
                ..JobApplicationUpdate::default()
            },
        )
    }

    /// Remove a card. Sibling order keys are left as they are.
    pub fn delete_job_application(
        &self,
        user: &UserId,
        id: JobApplicationId,
    ) -> Result<(), BoardServiceError> {
        let record = self.owned_application(user, id)?;
        self.repository
            .commit(WriteBatch::new().with(WriteOp::Delete { id: record.id }))?;
        info!(user = %user, application = %id, "deleted job application");
        Ok(())
    }

    fn apply_update(
        &self,
        user: &UserId,
        id: JobApplicationId,
        updates: &JobApplicationUpdate,
    ) -> Result<JobApplication, BoardServiceError> {
        let current = self.owned_application(user, id)?;
        let mut record = current.clone();
        updates.apply_fields(&mut record);
        record.updated_at = Utc::now();

        let mut batch = WriteBatch::new();

        if updates.has_move() {
            let target_column = updates.column_id.unwrap_or(current.column_id);
            if target_column != current.column_id {
                self.repository
                    .find_column(current.board_id, target_column)?
                    .ok_or(BoardServiceError::ColumnNotFound)?;
            }

            // Versions first: anything committed after this point fails the batch.
            batch = batch.expect_version(
                current.column_id,
                self.repository.column_version(current.column_id)?,
            );
            if target_column != current.column_id {
                batch = batch.expect_version(
                    target_column,
                    self.repository.column_version(target_column)?,
                );
            }

            let column_items = self
                .repository
                .job_applications_in_column(target_column, Some(user))?;
            let plan = self
                .engine
                .plan_move(&current, target_column, updates.order, &column_items)?;
            debug!(
                application = %plan.item,
                from = plan.from.order,
                to = plan.to.order,
                shifted = plan.shifts.len(),
                "planned move"
            );

            for shift in &plan.shifts {
                batch.push(WriteOp::SetOrder {
                    id: shift.id,
                    expected: OrderSlot {
                        column_id: target_column,
                        order: shift.from,
                    },
                    order: shift.to,
                });
            }
            record.column_id = plan.to.column_id;
            record.order = plan.to.order;
        }

        batch.push(WriteOp::Replace {
            record: record.clone(),
            expected: Box::new(current),
        });
        self.repository.commit(batch)?;

        Ok(record)
    }

    fn owned_application(
        &self,
        user: &UserId,
        id: JobApplicationId,
    ) -> Result<JobApplication, BoardServiceError> {
        let record = self
            .repository
            .find_job_application(id)?
            .ok_or(BoardServiceError::JobApplicationNotFound)?;
        if &record.user_id != user {
            warn!(user = %user, application = %id, "rejected access to foreign job application");
            return Err(BoardServiceError::Unauthorized);
        }
        Ok(record)
    }

    fn with_retries<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, BoardServiceError>,
    ) -> Result<T, BoardServiceError> {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt() {
                Err(BoardServiceError::Repository(RepositoryError::Conflict))
                    if tries < self.retry_limit =>
                {
                    warn!(operation, attempt = tries, "column changed underneath, retrying");
                }
                outcome => return outcome,
            }
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Input the board cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("position is outside the column's order range")]
    OrderOutOfRange,
}

/// Error raised by the board service.
#[derive(Debug, thiserror::Error)]
pub enum BoardServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("board not found")]
    BoardNotFound,
    #[error("column not found")]
    ColumnNotFound,
    #[error("job application not found")]
    JobApplicationNotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<OrderOverflow> for BoardServiceError {
    fn from(_: OrderOverflow) -> Self {
        Self::Validation(ValidationError::OrderOutOfRange)
    }
}
