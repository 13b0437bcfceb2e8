use crate::clipboard::{Clipboard, decode_property, encode_property, with_retries};
use crate::edit::{self, PropertyEdit};
use crate::error::EditError;
use crate::save::{PropertyId, SaveFile, SaveProperty};
use crate::undo::{ListenerId, UndoGroup, UndoService, UndoState, UndoUnit};
use crate::view::{PropertyView, SortDirection};
use crate::{EditorOptions, SaveValue, ValueType, statics};

/// Why a reload needs the user's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadWarning {
    /// The file on disk differs from what is in the editor.
    UnsavedChanges,
    /// Everything is saved, but undo history would be lost.
    HistoryOnly,
}

impl ReloadWarning {
    pub fn title(self) -> &'static str {
        statics::EN_TITLE_CONFIRM_RELOAD
    }

    pub fn message(self) -> &'static str {
        match self {
            ReloadWarning::UnsavedChanges => statics::EN_RELOAD_UNSAVED_CHANGES,
            ReloadWarning::HistoryOnly => statics::EN_RELOAD_HISTORY_ONLY,
        }
    }
}

/// Answer to "a property with this name already exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteChoice {
    Cancel,
    Replace,
    AddNew,
}

pub fn paste_conflict_message(name: &str) -> String {
    format!("A property named '{name}' {}", statics::EN_PASTE_CONFLICT_SUFFIX)
}

/// Questions the document asks the user. Implemented by the host's dialogs.
pub trait Prompter {
    fn confirm_reload(&mut self, warning: ReloadWarning) -> bool;
    fn resolve_paste_conflict(&mut self, name: &str) -> PasteChoice;
}

/// Input of the "new property" dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProperty {
    pub name: String,
    pub value_type: ValueType,
    pub is_array: bool,
}

/// One open save file: its properties, undo history, view and selection.
///
/// Every user command here is recorded as an undo unit paired with its exact inverse;
/// [`SaveFile`] itself knows nothing about undo. Commands whose preconditions fail
/// return `Ok(false)` and change nothing.
#[derive(Debug)]
pub struct SaveDocument {
    file: SaveFile,
    undo: UndoService<PropertyEdit>,
    view: PropertyView,
    /// Row in the current view, not a storage index.
    selected: Option<usize>,
    options: EditorOptions,
}

impl SaveDocument {
    pub fn new(file: SaveFile) -> Self {
        Self::with_options(file, EditorOptions::default())
    }

    pub fn with_options(file: SaveFile, options: EditorOptions) -> Self {
        Self {
            file,
            undo: UndoService::with_history_limit(options.history_limit),
            view: PropertyView::default(),
            selected: None,
            options,
        }
    }

    pub fn name(&self) -> String {
        self.file.name()
    }

    pub fn file(&self) -> &SaveFile {
        &self.file
    }

    pub fn properties(&self) -> &[SaveProperty] {
        self.file.properties()
    }

    pub fn undo_service(&self) -> &UndoService<PropertyEdit> {
        &self.undo
    }

    /// Called whenever undo, redo or save enablement may have changed.
    pub fn subscribe(&mut self, listener: impl FnMut(UndoState) + 'static) -> ListenerId {
        self.undo.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.undo.unsubscribe(id)
    }

    // History

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Undoes the last step and selects the property it restored, if that row is visible.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        if !self.undo.undo(&mut self.file)? {
            return Ok(false);
        }
        let touched = self
            .undo
            .redo_history()
            .next()
            .and_then(UndoUnit::last_reverted)
            .and_then(|edit| edit.touched_property(&self.file));
        self.select_after_history_step(touched);
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        if !self.undo.redo(&mut self.file)? {
            return Ok(false);
        }
        let touched = self
            .undo
            .undo_history()
            .next()
            .and_then(UndoUnit::last_applied)
            .and_then(|edit| edit.touched_property(&self.file));
        self.select_after_history_step(touched);
        Ok(true)
    }

    /// Status line text for the next undo, e.g. "Undo: Rename to 'gold'".
    pub fn undo_description(&self) -> Option<String> {
        self.undo
            .undo_history()
            .next()
            .map(|unit| format!("{} {unit}", statics::EN_PREFIX_UNDO))
    }

    pub fn redo_description(&self) -> Option<String> {
        self.undo
            .redo_history()
            .next()
            .map(|unit| format!("{} {unit}", statics::EN_PREFIX_REDO))
    }

    // Save / reload

    pub fn has_unsaved_changes(&self) -> bool {
        !self.undo.is_save_point()
    }

    pub fn can_save(&self) -> bool {
        self.has_unsaved_changes()
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        self.file.save()?;
        self.undo.set_save_point();
        Ok(())
    }

    pub fn save_to_path(&mut self, path: &std::path::Path) -> anyhow::Result<()> {
        self.file.save_to_path(path)?;
        self.undo.set_save_point();
        Ok(())
    }

    /// Re-reads the file from disk and drops all history. Asks first when that would
    /// lose unsaved changes or undo history. Returns `Ok(false)` if the user declined.
    pub fn reload(&mut self, prompter: &mut dyn Prompter) -> anyhow::Result<bool> {
        let warning = if !self.undo.is_save_point() {
            Some(ReloadWarning::UnsavedChanges)
        } else if self.undo.can_undo() || self.undo.can_redo() {
            Some(ReloadWarning::HistoryOnly)
        } else {
            None
        };

        if let Some(warning) = warning
            && !prompter.confirm_reload(warning)
        {
            return Ok(false);
        }

        self.file.reload()?;
        self.undo.clear();
        self.clamp_selection();
        tracing::info!("Reloaded {}", self.file.name());
        Ok(true)
    }

    // View and selection

    pub fn view(&self) -> &PropertyView {
        &self.view
    }

    /// Storage indices in display order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.view.visible_indices(self.file.properties())
    }

    pub fn filter(&self) -> &str {
        &self.view.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.view.filter = filter.into();
        self.clamp_selection();
    }

    pub fn can_clear_filter(&self) -> bool {
        self.view.has_filter()
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(String::new());
    }

    pub fn set_name_sort(&mut self, direction: Option<SortDirection>) {
        self.view.name_sort = direction;
    }

    pub fn set_type_sort(&mut self, direction: Option<SortDirection>) {
        self.view.type_sort = direction;
    }

    /// Reordering is only offered while rows are shown in storage order.
    pub fn can_move_properties(&self) -> bool {
        self.view.is_identity()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn set_selected_index(&mut self, row: Option<usize>) {
        self.selected = row;
    }

    pub fn selected_property(&self) -> Option<&SaveProperty> {
        self.selected_storage_index()
            .and_then(|i| self.file.properties().get(i))
    }

    fn selected_storage_index(&self) -> Option<usize> {
        let row = self.selected?;
        self.view.storage_index(self.file.properties(), row)
    }

    fn select_after_history_step(&mut self, touched: Option<PropertyId>) {
        let row = touched
            .and_then(|id| self.file.position_of(id))
            .and_then(|i| self.view.visible_index(self.file.properties(), i));
        match row {
            Some(row) => self.selected = Some(row),
            None => self.clamp_selection(),
        }
    }

    fn clamp_selection(&mut self) {
        let Some(row) = self.selected else {
            return;
        };
        let len = self.view.visible_len(self.file.properties());
        self.selected = if len == 0 { None } else { Some(row.min(len - 1)) };
    }

    // Property commands

    pub fn can_rename(&self) -> bool {
        self.selected_property().is_some()
    }

    pub fn can_copy(&self) -> bool {
        self.selected_property().is_some()
    }

    pub fn can_remove(&self) -> bool {
        self.selected_property().is_some()
    }

    pub fn can_move_up(&self) -> bool {
        self.can_move_properties()
            && self
                .selected_storage_index()
                .is_some_and(|i| self.file.can_move_property_up(i))
    }

    pub fn can_move_down(&self) -> bool {
        self.can_move_properties()
            && self
                .selected_storage_index()
                .is_some_and(|i| self.file.can_move_property_down(i))
    }

    /// Renaming to the current name is not an edit.
    pub fn rename_selected(&mut self, new_name: &str) -> Result<bool, EditError> {
        let Some(property) = self.selected_property() else {
            return Ok(false);
        };
        if property.name == new_name {
            return Ok(false);
        }

        let pair = edit::rename(property.id(), property.name.clone(), new_name.to_string());
        let unit = edit::delegate_and_execute(pair, &mut self.file)?;
        self.undo.push_unit(unit);
        Ok(true)
    }

    /// Appends a new property with a default value of the requested type.
    pub fn add_property(&mut self, new: NewProperty) -> Result<PropertyId, EditError> {
        let property = SaveProperty::new(new.name, SaveValue::new_default(new.value_type, new.is_array));
        let id = property.id();
        let unit = edit::delegate_and_execute(edit::insert(self.file.len(), property), &mut self.file)?;
        self.undo.push_unit(unit);
        Ok(id)
    }

    /// Removes the selected property. The selection stays on the same row, which now
    /// shows the next property, or moves to the last row.
    pub fn remove_selected(&mut self) -> Result<bool, EditError> {
        let Some(index) = self.selected_storage_index() else {
            return Ok(false);
        };

        let pair = edit::remove(&self.file, index)?;
        let unit = edit::delegate_and_execute(pair, &mut self.file)?;
        self.undo.push_unit(unit);
        self.clamp_selection();
        Ok(true)
    }

    pub fn move_selected_up(&mut self) -> Result<bool, EditError> {
        if !self.can_move_up() {
            return Ok(false);
        }
        let Some(index) = self.selected_storage_index() else {
            return Ok(false);
        };

        let unit = edit::delegate_and_execute(edit::move_up(index), &mut self.file)?;
        self.undo.push_unit(unit);
        self.selected = Some(index - 1);
        Ok(true)
    }

    pub fn move_selected_down(&mut self) -> Result<bool, EditError> {
        if !self.can_move_down() {
            return Ok(false);
        }
        let Some(index) = self.selected_storage_index() else {
            return Ok(false);
        };

        let unit = edit::delegate_and_execute(edit::move_down(index), &mut self.file)?;
        self.undo.push_unit(unit);
        self.selected = Some(index + 1);
        Ok(true)
    }

    // Value edits

    /// Live access for an editor that changes a value in place. Follow up with
    /// [`SaveDocument::record_value_edit`] once the edit is committed.
    pub fn value_mut(&mut self, id: PropertyId) -> Option<&mut SaveValue> {
        self.file.property_mut(id).map(|p| &mut p.value)
    }

    /// Records an edit whose new value is already live. Returns `Ok(false)`, recording
    /// nothing, when the value did not actually change.
    pub fn record_value_edit(&mut self, id: PropertyId, old: SaveValue) -> Result<bool, EditError> {
        let current = self
            .file
            .property(id)
            .ok_or(EditError::UnknownProperty(id))?;
        if current.value.same_data(&old) {
            return Ok(false);
        }

        let pair = edit::set_value(id, old, current.value.clone());
        self.undo.push_unit(edit::delegate(pair));
        Ok(true)
    }

    /// Sets a value and records it, unless it equals the current one.
    pub fn edit_value(&mut self, id: PropertyId, value: SaveValue) -> Result<bool, EditError> {
        let old = self.file.set_property_value(id, value)?;
        self.record_value_edit(id, old)
    }

    // Clipboard

    /// Copies the selected property. Best-effort: clipboard failures are logged only.
    pub fn copy_selected(&self, clipboard: &mut dyn Clipboard) -> bool {
        let Some(property) = self.selected_property() else {
            return false;
        };

        let data = encode_property(property);
        match with_retries(
            self.options.clipboard_attempts,
            self.options.clipboard_retry_delay(),
            || clipboard.set_data(&data),
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Copy of '{}' abandoned: {e}", property.name);
                false
            }
        }
    }

    /// Pastes a property from the clipboard as a single undo step.
    ///
    /// Unreadable clipboard contents make this a no-op. When exactly one property already
    /// has the pasted name the user chooses between replacing it and adding a new entry;
    /// with two or more the paste is always appended.
    pub fn paste(
        &mut self,
        clipboard: &mut dyn Clipboard,
        prompter: &mut dyn Prompter,
    ) -> Result<bool, EditError> {
        let data = match with_retries(
            self.options.clipboard_attempts,
            self.options.clipboard_retry_delay(),
            || clipboard.get_data(),
        ) {
            Ok(Some(data)) => data,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!("Paste abandoned: {e}");
                return Ok(false);
            }
        };

        let property = match decode_property(&data) {
            Ok(property) => property,
            Err(e) => {
                tracing::debug!("Ignoring clipboard contents: {e:#}");
                return Ok(false);
            }
        };

        let mut group = UndoGroup::new();
        let end = self.file.len();
        let index = match self.file.index_of_property(&property.name, 0) {
            None => end,
            Some(first) if self.file.index_of_property(&property.name, first + 1).is_some() => end,
            Some(first) => match prompter.resolve_paste_conflict(&property.name) {
                PasteChoice::Cancel => return Ok(false),
                PasteChoice::AddNew => end,
                PasteChoice::Replace => {
                    let (forward, inverse) = edit::remove(&self.file, first)?;
                    group.add_and_execute(forward, inverse, &mut self.file)?;
                    first
                }
            },
        };

        let (forward, inverse) = edit::insert(index, property);
        group.add_and_execute(forward, inverse, &mut self.file)?;
        self.undo.push_unit(group);
        Ok(true)
    }
}
