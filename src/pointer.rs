//! Cursor hints for hoverable models.

use std::cell::Cell;
use std::rc::Rc;

/// Cursor shape requested by the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    /// Something clickable is under the pointer.
    Pointer,
}

impl Cursor {
    /// CSS `cursor` value.
    pub fn css_name(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Pointer => "pointer",
        }
    }
}

/// Host capability that shows a cursor shape.
pub trait PointerHint {
    fn set_cursor(&self, cursor: Cursor);
}

/// Stores the last requested cursor for hosts that poll it each frame.
#[derive(Clone, Debug, Default)]
pub struct CursorCell {
    cursor: Rc<Cell<Cursor>>,
    changes: Rc<Cell<u32>>,
}

impl CursorCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Cursor {
        self.cursor.get()
    }

    /// Number of `set_cursor` calls so far.
    pub fn changes(&self) -> u32 {
        self.changes.get()
    }
}

impl PointerHint for CursorCell {
    fn set_cursor(&self, cursor: Cursor) {
        self.cursor.set(cursor);
        self.changes.set(self.changes.get() + 1);
    }
}
