//! Recorders for plain gameplay values.
//!
//! [`TimeVariable`] owns a shared value cell: gameplay code reads and writes
//! it through one handle while the recorder holds another. [`TimeField`]
//! records a value that lives elsewhere, through a getter and a setter.
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut timeline = Timeline::default();
//! let score = TimeVariable::new(0_u32);
//! let player = timeline.spawn("player", false).unwrap();
//! timeline.attach(player, score.recorder("score")).unwrap();
//!
//! for points in [10, 20, 30] {
//!     score.set(points);
//!     timeline.tick_fixed().unwrap();
//! }
//! timeline.pause();
//! timeline.seek(0);
//! assert_eq!(score.get(), 10);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rewind_core::prelude::*;

/// Snapshot holding one recorded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeValue<T>(pub T);

// ---------------------------------------------------------------------------
// TimeVariable
// ---------------------------------------------------------------------------

/// A value whose history is recorded. Clones share the same cell.
pub struct TimeVariable<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Clone for TimeVariable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TimeVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeVariable").field(&self.cell.borrow()).finish()
    }
}

impl<T: Clone + Default + 'static> TimeVariable<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    /// Mutate the value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.borrow_mut());
    }

    /// A recorder sharing this variable's cell.
    pub fn recorder(&self, label: impl Into<String>) -> SnapshotRecorder<Self> {
        SnapshotRecorder::new(label, self.clone())
    }
}

impl<T: Clone + Default + 'static> Recordable for TimeVariable<T> {
    type Snapshot = TimeValue<T>;

    fn read(&self, snapshot: &mut TimeValue<T>) {
        snapshot.0.clone_from(&self.cell.borrow());
    }

    fn apply(&mut self, snapshot: &TimeValue<T>) {
        self.cell.borrow_mut().clone_from(&snapshot.0);
    }
}

// ---------------------------------------------------------------------------
// TimeField
// ---------------------------------------------------------------------------

type Getter<T> = Box<dyn Fn() -> T>;
type Setter<T> = Box<dyn FnMut(&T)>;

/// A value recorded through accessor closures.
pub struct TimeField<T> {
    get: Getter<T>,
    set: Setter<T>,
}

impl<T: Clone + Default + 'static> TimeField<T> {
    pub fn new(get: impl Fn() -> T + 'static, set: impl FnMut(&T) + 'static) -> Self {
        Self {
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    pub fn recorder(
        label: impl Into<String>,
        get: impl Fn() -> T + 'static,
        set: impl FnMut(&T) + 'static,
    ) -> SnapshotRecorder<Self> {
        SnapshotRecorder::new(label, Self::new(get, set))
    }
}

impl<T: Clone + Default + 'static> Recordable for TimeField<T> {
    type Snapshot = TimeValue<T>;

    fn read(&self, snapshot: &mut TimeValue<T>) {
        snapshot.0 = (self.get)();
    }

    fn apply(&mut self, snapshot: &TimeValue<T>) {
        (self.set)(&snapshot.0);
    }
}
