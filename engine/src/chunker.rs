use crate::error::EngineError;
use crate::model::Operation;

/// A bounded group of operations sent as one round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Zero-based position in the dispatch sequence.
    pub index: usize,
    /// Work-list position of the first operation in this batch.
    pub offset: usize,
    pub operations: Vec<Operation>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Splits `operations` into batches of `batch_size`, keeping their order.
/// Only the last batch may be shorter.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfiguration`] when `batch_size` is zero.
pub fn chunk(operations: Vec<Operation>, batch_size: usize) -> Result<Vec<Batch>, EngineError> {
    if batch_size == 0 {
        return Err(EngineError::invalid(
            "batch_size",
            "must be greater than zero",
        ));
    }

    let mut batches = Vec::with_capacity(operations.len().div_ceil(batch_size));
    let mut remaining = operations.into_iter();
    let mut offset = 0;

    loop {
        let operations: Vec<Operation> = remaining.by_ref().take(batch_size).collect();
        if operations.is_empty() {
            break;
        }
        let len = operations.len();
        batches.push(Batch {
            index: batches.len(),
            offset,
            operations,
        });
        offset += len;
    }

    Ok(batches)
}
