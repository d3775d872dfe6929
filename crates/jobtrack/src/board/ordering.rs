//! Order-key planning for card moves.
//!
//! Planning is pure: it looks at a snapshot of the destination column and
//! returns the new slot for the moved card plus every sibling that has to
//! shift. The board service turns a [`MovePlan`] into one atomic write batch.

use serde::Serialize;

use super::domain::{ColumnId, JobApplication, JobApplicationId, OrderSlot};

/// An order key left the `i64` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order key out of range")]
pub struct OrderOverflow;

/// Order change for a card that is not the one being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiblingShift {
    pub id: JobApplicationId,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlan {
    pub item: JobApplicationId,
    pub from: OrderSlot,
    pub to: OrderSlot,
    pub shifts: Vec<SiblingShift>,
}

impl MovePlan {
    pub fn crosses_columns(&self) -> bool {
        self.from.column_id != self.to.column_id
    }
}

/// Sparse-key ordering engine; `step` is the gap between indexed slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingEngine {
    step: i64,
}

impl Default for OrderingEngine {
    fn default() -> Self {
        Self { step: 100 }
    }
}

impl OrderingEngine {
    pub fn new(step: i64) -> Self {
        Self { step: step.max(1) }
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Order for a freshly created card: one past the column maximum.
    pub fn append_order(max_order: Option<i64>) -> Result<i64, OrderOverflow> {
        max_order.unwrap_or(-1).checked_add(1).ok_or(OrderOverflow)
    }

    /// Plans a move of `item` into `target_column`.
    ///
    /// `column_items` is the destination column sorted by order; the moved
    /// card is ignored if present. `target_index` is the zero-based position
    /// in that column as the user sees it with the card lifted out.
    pub fn plan_move(
        &self,
        item: &JobApplication,
        target_column: ColumnId,
        target_index: Option<usize>,
        column_items: &[JobApplication],
    ) -> Result<MovePlan, OrderOverflow> {
        if target_column != item.column_id {
            self.plan_cross_column(item, target_column, target_index, column_items)
        } else {
            match target_index {
                Some(index) => self.plan_within_column(item, index, column_items),
                None => Ok(MovePlan {
                    item: item.id,
                    from: item.slot(),
                    to: item.slot(),
                    shifts: Vec::new(),
                }),
            }
        }
    }

    fn plan_cross_column(
        &self,
        item: &JobApplication,
        target_column: ColumnId,
        target_index: Option<usize>,
        column_items: &[JobApplication],
    ) -> Result<MovePlan, OrderOverflow> {
        let siblings: Vec<&JobApplication> = column_items
            .iter()
            .filter(|sibling| sibling.id != item.id)
            .collect();

        let (order, shifts) = match target_index {
            Some(index) => {
                let shifts = siblings
                    .get(index..)
                    .unwrap_or_default()
                    .iter()
                    .map(|sibling| self.push_down(sibling))
                    .collect::<Result<Vec<_>, _>>()?;
                (self.slot_order(index)?, shifts)
            }
            None => {
                let order = match siblings.last() {
                    Some(last) => last.order.checked_add(self.step).ok_or(OrderOverflow)?,
                    None => 0,
                };
                (order, Vec::new())
            }
        };

        Ok(MovePlan {
            item: item.id,
            from: item.slot(),
            to: OrderSlot {
                column_id: target_column,
                order,
            },
            shifts,
        })
    }

    fn plan_within_column(
        &self,
        item: &JobApplication,
        target_index: usize,
        column_items: &[JobApplication],
    ) -> Result<MovePlan, OrderOverflow> {
        let order = self.slot_order(target_index)?;
        let siblings: Vec<&JobApplication> = column_items
            .iter()
            .filter(|sibling| sibling.id != item.id)
            .collect();

        let old_index = siblings
            .iter()
            .position(|sibling| sibling.order > item.order)
            .unwrap_or(siblings.len());

        let shifts = if target_index < old_index {
            siblings[target_index..old_index]
                .iter()
                .map(|sibling| self.push_down(sibling))
                .collect::<Result<Vec<_>, _>>()?
        } else if target_index > old_index {
            let end = target_index.min(siblings.len());
            siblings[old_index..end]
                .iter()
                .map(|sibling| SiblingShift {
                    id: sibling.id,
                    from: sibling.order,
                    to: sibling.order.saturating_sub(self.step).max(0),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(MovePlan {
            item: item.id,
            from: item.slot(),
            to: OrderSlot {
                column_id: item.column_id,
                order,
            },
            shifts,
        })
    }

    fn push_down(&self, sibling: &JobApplication) -> Result<SiblingShift, OrderOverflow> {
        Ok(SiblingShift {
            id: sibling.id,
            from: sibling.order,
            to: sibling.order.checked_add(self.step).ok_or(OrderOverflow)?,
        })
    }

    fn slot_order(&self, index: usize) -> Result<i64, OrderOverflow> {
        i64::try_from(index)
            .ok()
            .and_then(|index| index.checked_mul(self.step))
            .ok_or(OrderOverflow)
    }
}
