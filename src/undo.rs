//! Undo/redo history.
//!
//! History is built from [`Command`]s: small values that each perform one change on a
//! target. A [`DelegateUnit`] pairs a forward command with its inverse, an [`UndoGroup`]
//! composes units into one step, and [`UndoService`] keeps the undo and redo stacks plus
//! the save point. The service never looks inside a command; it only alternates
//! `apply` and `revert` on whole units.

use crate::error::EditError;
use std::fmt;

/// One change to a target, e.g. "remove the property at index 3".
pub trait Command<T> {
    fn execute(&self, target: &mut T) -> Result<(), EditError>;
}

/// A forward command and the command that exactly undoes it.
#[derive(Debug, Clone)]
pub struct DelegateUnit<C> {
    forward: C,
    inverse: C,
}

impl<C> DelegateUnit<C> {
    /// Records a change the caller has already made.
    pub fn create(forward: C, inverse: C) -> Self {
        Self { forward, inverse }
    }

    /// Runs `forward` now and records it. If it fails there is no unit to record.
    pub fn create_and_execute<T>(forward: C, inverse: C, target: &mut T) -> Result<Self, EditError>
    where
        C: Command<T>,
    {
        forward.execute(target)?;
        Ok(Self { forward, inverse })
    }

    pub fn forward(&self) -> &C {
        &self.forward
    }

    pub fn inverse(&self) -> &C {
        &self.inverse
    }
}

/// Units that form one user-visible step. Applied in insertion order, reverted in
/// reverse order, so each inverse sees the state its forward command left behind.
#[derive(Debug, Clone)]
pub struct UndoGroup<C> {
    units: Vec<UndoUnit<C>>,
}

impl<C> Default for UndoGroup<C> {
    fn default() -> Self {
        Self { units: Vec::new() }
    }
}

impl<C> UndoGroup<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: impl Into<UndoUnit<C>>) {
        self.units.push(unit.into());
    }

    /// Runs a new delegate unit and appends it. When it fails, the units already in the
    /// group are reverted before the error is returned, leaving the target as it was
    /// before the group was started.
    pub fn add_and_execute<T>(
        &mut self,
        forward: C,
        inverse: C,
        target: &mut T,
    ) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        match DelegateUnit::create_and_execute(forward, inverse, target) {
            Ok(unit) => {
                self.units.push(UndoUnit::Delegate(unit));
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.revert(target) {
                    tracing::warn!("Rolling back partial undo group failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    pub fn units(&self) -> &[UndoUnit<C>] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn apply<T>(&self, target: &mut T) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        for (i, unit) in self.units.iter().enumerate() {
            if let Err(e) = unit.apply(target) {
                // Leave the target as it was before this group started.
                for done in self.units[..i].iter().rev() {
                    if let Err(rollback) = done.revert(target) {
                        tracing::warn!("Rolling back undo group apply failed: {rollback}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn revert<T>(&self, target: &mut T) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        for (i, unit) in self.units.iter().enumerate().rev() {
            if let Err(e) = unit.revert(target) {
                for done in &self.units[i + 1..] {
                    if let Err(rollback) = done.apply(target) {
                        tracing::warn!("Rolling back undo group revert failed: {rollback}");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// A single history entry: either a command pair or a group of entries.
#[derive(Debug, Clone)]
pub enum UndoUnit<C> {
    Delegate(DelegateUnit<C>),
    Group(UndoGroup<C>),
}

impl<C> UndoUnit<C> {
    pub fn apply<T>(&self, target: &mut T) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        match self {
            UndoUnit::Delegate(unit) => unit.forward.execute(target),
            UndoUnit::Group(group) => group.apply(target),
        }
    }

    pub fn revert<T>(&self, target: &mut T) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        match self {
            UndoUnit::Delegate(unit) => unit.inverse.execute(target),
            UndoUnit::Group(group) => group.revert(target),
        }
    }

    /// The command that runs last when this unit is applied.
    pub fn last_applied(&self) -> Option<&C> {
        match self {
            UndoUnit::Delegate(unit) => Some(&unit.forward),
            UndoUnit::Group(group) => group.units.last().and_then(UndoUnit::last_applied),
        }
    }

    /// The command that runs last when this unit is reverted.
    pub fn last_reverted(&self) -> Option<&C> {
        match self {
            UndoUnit::Delegate(unit) => Some(&unit.inverse),
            UndoUnit::Group(group) => group.units.first().and_then(UndoUnit::last_reverted),
        }
    }
}

impl<C> From<DelegateUnit<C>> for UndoUnit<C> {
    fn from(unit: DelegateUnit<C>) -> Self {
        UndoUnit::Delegate(unit)
    }
}

impl<C> From<UndoGroup<C>> for UndoUnit<C> {
    fn from(group: UndoGroup<C>) -> Self {
        UndoUnit::Group(group)
    }
}

impl<C: fmt::Display> fmt::Display for UndoUnit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoUnit::Delegate(unit) => fmt::Display::fmt(&unit.forward, f),
            UndoUnit::Group(group) => {
                for (i, unit) in group.units.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(unit, f)?;
                }
                Ok(())
            }
        }
    }
}

/// Position in history. Every pushed unit gets a fresh version, so two different
/// histories never share one even when their contents happen to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// The state with nothing on the undo stack.
    pub const EMPTY: Version = Version(0);
}

/// Snapshot of the derived command-enablement flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub is_save_point: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone)]
struct HistoryEntry<C> {
    version: Version,
    unit: UndoUnit<C>,
}

type Listener = Box<dyn FnMut(UndoState)>;

/// Linear undo/redo history with a save point.
///
/// Every call that changes the stacks or the save point notifies subscribers exactly once
/// afterwards. Calls that do nothing (undo or redo with an empty stack) do not notify.
pub struct UndoService<C> {
    undo_stack: Vec<HistoryEntry<C>>,
    redo_stack: Vec<HistoryEntry<C>>,
    last_version: u64,
    /// Version of the state below the oldest kept entry. Moves up when the history
    /// limit drops entries.
    base_version: Version,
    save_point: Version,
    history_limit: Option<usize>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl<C> Default for UndoService<C> {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            last_version: 0,
            base_version: Version::EMPTY,
            save_point: Version::EMPTY,
            history_limit: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl<C> fmt::Debug for UndoService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoService")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("current", &self.current_version())
            .field("save_point", &self.save_point)
            .field("history_limit", &self.history_limit)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<C> UndoService<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `limit` undo steps, dropping the oldest first.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history_limit: limit,
            ..Self::default()
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(UndoState) + 'static) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Records a unit whose effect is already in place. Discards any redo history.
    pub fn push_unit(&mut self, unit: impl Into<UndoUnit<C>>) {
        self.redo_stack.clear();
        self.last_version += 1;
        self.undo_stack.push(HistoryEntry {
            version: Version(self.last_version),
            unit: unit.into(),
        });

        if let Some(limit) = self.history_limit {
            let excess = self.undo_stack.len().saturating_sub(limit);
            if excess > 0
                && let Some(last_dropped) = self.undo_stack.drain(..excess).last()
            {
                self.base_version = last_dropped.version;
            }
        }

        tracing::debug!("Pushed undo unit (version {})", self.last_version);
        self.notify();
    }

    /// Applies `unit` to `target` and records it. Nothing is recorded if it fails.
    pub fn execute<T>(&mut self, unit: impl Into<UndoUnit<C>>, target: &mut T) -> Result<(), EditError>
    where
        C: Command<T>,
    {
        let unit = unit.into();
        unit.apply(target)?;
        self.push_unit(unit);
        Ok(())
    }

    /// Reverts the most recent unit. Returns `Ok(false)` when there is nothing to undo.
    /// If the revert fails the unit stays on the undo stack.
    pub fn undo<T>(&mut self, target: &mut T) -> Result<bool, EditError>
    where
        C: Command<T>,
    {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = entry.unit.revert(target) {
            self.undo_stack.push(entry);
            return Err(e);
        }

        tracing::debug!("Undid version {}", entry.version.0);
        self.redo_stack.push(entry);
        self.notify();
        Ok(true)
    }

    /// Re-applies the most recently undone unit. Returns `Ok(false)` when there is
    /// nothing to redo. If the apply fails the unit stays on the redo stack.
    pub fn redo<T>(&mut self, target: &mut T) -> Result<bool, EditError>
    where
        C: Command<T>,
    {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = entry.unit.apply(target) {
            self.redo_stack.push(entry);
            return Err(e);
        }

        tracing::debug!("Redid version {}", entry.version.0);
        self.undo_stack.push(entry);
        self.notify();
        Ok(true)
    }

    /// Marks the current position as the last persisted state.
    pub fn set_save_point(&mut self) {
        self.save_point = self.current_version();
        self.notify();
    }

    /// Drops all history and the save point, e.g. after reloading from disk.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.base_version = Version::EMPTY;
        self.save_point = Version::EMPTY;
        self.notify();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_save_point(&self) -> bool {
        self.current_version() == self.save_point
    }

    pub fn current_version(&self) -> Version {
        self.undo_stack
            .last()
            .map_or(self.base_version, |entry| entry.version)
    }

    pub fn save_point(&self) -> Version {
        self.save_point
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn state(&self) -> UndoState {
        UndoState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            is_save_point: self.is_save_point(),
        }
    }

    /// Undoable units, most recent first.
    pub fn undo_history(&self) -> impl Iterator<Item = &UndoUnit<C>> {
        self.undo_stack.iter().rev().map(|entry| &entry.unit)
    }

    /// Redoable units, next to redo first.
    pub fn redo_history(&self) -> impl Iterator<Item = &UndoUnit<C>> {
        self.redo_stack.iter().rev().map(|entry| &entry.unit)
    }

    fn notify(&mut self) {
        let state = self.state();
        for (_, listener) in &mut self.listeners {
            listener(state);
        }
    }
}
