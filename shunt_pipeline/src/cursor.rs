use crate::middleware::Middleware;
use std::sync::Arc;

/// A cursor over the middleware array of one chain.
///
/// The cursor is a plain value: the chain slice plus the index of the
/// middleware currently being executed. It starts *before* the first element
/// (index −1); [`move_next`](ChainCursor::move_next) advances by one and
/// returns the element at the new position, or `None` once the end is
/// passed.
///
/// The cursor lives within a single dispatch and is never shared between
/// tasks. Threading an index through the interned slice — rather than
/// linking middlewares to each other — is what keeps the steady-state
/// dispatch free of per-middleware allocations.
#[derive(Clone, Copy)]
pub struct ChainCursor<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    index: isize,
}

impl<'a> std::fmt::Debug for ChainCursor<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCursor")
            .field("len", &self.middlewares.len())
            .field("index", &self.index)
            .finish()
    }
}

impl<'a> ChainCursor<'a> {
    /// Creates a cursor positioned before the first middleware.
    pub fn new(middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            middlewares,
            index: -1,
        }
    }

    /// Advances the cursor by one and returns the middleware at the new
    /// position, or `None` if the cursor has moved past the end.
    pub fn move_next(&mut self) -> Option<&'a Arc<dyn Middleware>> {
        self.index += 1;

        usize::try_from(self.index)
            .ok()
            .and_then(|index| self.middlewares.get(index))
    }

    /// Reports whether another middleware remains ahead of the cursor.
    pub fn has_next(&self) -> bool {
        self.index + 1 < self.middlewares.len() as isize
    }

    /// Restores the cursor to its initial position, before the first
    /// middleware.
    pub fn reset(&mut self) {
        self.index = -1;
    }

    /// Reports the current position of the cursor (−1 before the first
    /// element).
    pub fn index(&self) -> isize {
        self.index
    }
}

impl PartialEq for ChainCursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        // Same underlying array (identity, not contents) at the same position
        std::ptr::eq(self.middlewares, other.middlewares) && self.index == other.index
    }
}

impl Eq for ChainCursor<'_> {}
