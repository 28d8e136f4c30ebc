//! The shared cursor table.
//!
//! One table backs a decoded message and every view derived from it. Handles
//! are cheap clones of one `Rc<RefCell<_>>`, so a write through any view is
//! seen by all of them. Borrows never outlive a single call, which keeps the
//! `RefCell` from ever being borrowed twice.
//!
//! Tables are `!Send`: a message belongs to one thread at a time.

use std::{cell::RefCell, fmt, ops::Range, rc::Rc};

use derview_proto::Cursor;

/// Shared, ordered, mutable sequence of cursors.
#[derive(Clone, Default)]
pub struct CursorTable {
    cursors: Rc<RefCell<Vec<Cursor>>>,
}

impl CursorTable {
    /// Table holding the given cursors
    pub fn new(cursors: Vec<Cursor>) -> Self {
        Self { cursors: Rc::new(RefCell::new(cursors)) }
    }

    /// Table of `len` tombstones
    pub fn absent(len: usize) -> Self {
        Self::new(vec![Cursor::Absent; len])
    }

    /// Number of slots. Fixed for the table's lifetime.
    pub fn len(&self) -> usize {
        self.cursors.borrow().len()
    }

    /// Whether the table has no slots
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor at `index`
    pub fn get(&self, index: usize) -> Option<Cursor> {
        self.cursors.borrow().get(index).cloned()
    }

    /// Overwrite the cursor at `index`, returning the previous one.
    ///
    /// `None` if `index` is out of bounds; the table is left unchanged.
    pub fn replace(&self, index: usize, cursor: Cursor) -> Option<Cursor> {
        self.cursors.borrow_mut().get_mut(index).map(|slot| std::mem::replace(slot, cursor))
    }

    /// Copy of the cursors in `range`, or `None` if it is out of bounds
    pub fn slice(&self, range: Range<usize>) -> Option<Vec<Cursor>> {
        self.cursors.borrow().get(range).map(<[Cursor]>::to_vec)
    }

    /// Copy of every cursor
    pub fn snapshot(&self) -> Vec<Cursor> {
        self.cursors.borrow().clone()
    }

    /// Whether both handles refer to the same table
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cursors, &other.cursors)
    }

    /// Number of live handles, i.e. views and other holders keeping the
    /// table alive
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.cursors)
    }
}

impl fmt::Debug for CursorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.cursors.borrow().iter()).finish()
    }
}
