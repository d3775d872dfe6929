//! Kanban board of job applications and the ordering engine that keeps card
//! positions consistent as cards are created, dragged and deleted.

pub mod domain;
pub mod memory;
pub mod ordering;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    sort_by_order, Board, BoardId, BoardView, Column, ColumnId, ColumnView, JobApplication,
    JobApplicationId, JobApplicationUpdate, NewJobApplication, OrderSlot, UserId,
    DEFAULT_BOARD_NAME, DEFAULT_COLUMNS, DEFAULT_STATUS,
};
pub use memory::InMemoryBoardStore;
pub use ordering::{MovePlan, OrderOverflow, OrderingEngine, SiblingShift};
pub use repository::{BoardRepository, RepositoryError, WriteBatch, WriteOp};
pub use router::{board_router, MoveRequest, USER_HEADER};
pub use service::{BoardServiceError, JobBoardService, ValidationError};
