use crate::SaveValue;
use crate::error::EditError;
use crate::save::{PropertyId, SaveFile, SaveProperty};
use crate::undo::{Command, DelegateUnit};
use std::fmt;

/// One primitive change to a [`SaveFile`]'s property list.
///
/// Positional variants address storage order. Rename and value edits address the
/// property by identity, which survives any reordering between record and replay.
#[derive(Debug, Clone)]
pub enum PropertyEdit {
    Insert { index: usize, property: SaveProperty },
    Remove { index: usize },
    MoveUp { index: usize },
    MoveDown { index: usize },
    Rename { id: PropertyId, name: String },
    SetValue { id: PropertyId, value: SaveValue },
}

impl Command<SaveFile> for PropertyEdit {
    fn execute(&self, file: &mut SaveFile) -> Result<(), EditError> {
        match self {
            PropertyEdit::Insert { index, property } => file.insert_property(*index, property.clone()),
            PropertyEdit::Remove { index } => file.remove_property(*index).map(drop),
            PropertyEdit::MoveUp { index } => file.move_property_up(*index),
            PropertyEdit::MoveDown { index } => file.move_property_down(*index),
            PropertyEdit::Rename { id, name } => file.rename_property(*id, name).map(drop),
            PropertyEdit::SetValue { id, value } => file.set_property_value(*id, value.clone()).map(drop),
        }
    }
}

impl PropertyEdit {
    /// The property this command left in place, looked up after it ran. `None` for a
    /// removal.
    pub fn touched_property(&self, file: &SaveFile) -> Option<PropertyId> {
        let index = match self {
            PropertyEdit::Insert { property, .. } => return Some(property.id()),
            PropertyEdit::Remove { .. } => return None,
            PropertyEdit::Rename { id, .. } | PropertyEdit::SetValue { id, .. } => return Some(*id),
            PropertyEdit::MoveUp { index } => index.checked_sub(1)?,
            PropertyEdit::MoveDown { index } => index + 1,
        };
        file.properties().get(index).map(SaveProperty::id)
    }
}

impl fmt::Display for PropertyEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyEdit::Insert { index, property } => {
                write!(f, "Insert '{}' at {index}", property.name)
            }
            PropertyEdit::Remove { index } => write!(f, "Remove property at {index}"),
            PropertyEdit::MoveUp { index } => write!(f, "Move property at {index} up"),
            PropertyEdit::MoveDown { index } => write!(f, "Move property at {index} down"),
            PropertyEdit::Rename { name, .. } => write!(f, "Rename to '{name}'"),
            PropertyEdit::SetValue { value, .. } => write!(f, "Set {} value", value.type_name()),
        }
    }
}

// Forward/inverse pairs. Each helper reads what the inverse needs from the file as it is
// *before* the forward command runs, so call them before executing anything.

pub fn insert(index: usize, property: SaveProperty) -> DelegatePair {
    (
        PropertyEdit::Insert { index, property },
        PropertyEdit::Remove { index },
    )
}

pub fn remove(file: &SaveFile, index: usize) -> Result<DelegatePair, EditError> {
    let property = file
        .properties()
        .get(index)
        .cloned()
        .ok_or(EditError::IndexOutOfRange {
            index,
            len: file.len(),
        })?;
    Ok((
        PropertyEdit::Remove { index },
        PropertyEdit::Insert { index, property },
    ))
}

pub fn move_up(index: usize) -> DelegatePair {
    (
        PropertyEdit::MoveUp { index },
        PropertyEdit::MoveDown {
            index: index.saturating_sub(1),
        },
    )
}

pub fn move_down(index: usize) -> DelegatePair {
    (
        PropertyEdit::MoveDown { index },
        PropertyEdit::MoveUp { index: index + 1 },
    )
}

pub fn rename(id: PropertyId, old: String, new: String) -> DelegatePair {
    (
        PropertyEdit::Rename { id, name: new },
        PropertyEdit::Rename { id, name: old },
    )
}

pub fn set_value(id: PropertyId, old: SaveValue, new: SaveValue) -> DelegatePair {
    (
        PropertyEdit::SetValue { id, value: new },
        PropertyEdit::SetValue { id, value: old },
    )
}

/// `(forward, inverse)`.
pub type DelegatePair = (PropertyEdit, PropertyEdit);

pub(crate) fn delegate((forward, inverse): DelegatePair) -> DelegateUnit<PropertyEdit> {
    DelegateUnit::create(forward, inverse)
}

pub(crate) fn delegate_and_execute(
    (forward, inverse): DelegatePair,
    file: &mut SaveFile,
) -> Result<DelegateUnit<PropertyEdit>, EditError> {
    DelegateUnit::create_and_execute(forward, inverse, file)
}

#[cfg(test)]
mod tests {
    use super::{delegate_and_execute, insert, move_down, move_up, remove, rename};
    use crate::undo::{Command, UndoGroup, UndoUnit};
    use crate::{SaveFile, SaveProperty, SaveValue};

    fn names(file: &SaveFile) -> Vec<&str> {
        file.properties().iter().map(|p| p.name.as_str()).collect()
    }

    fn five() -> SaveFile {
        SaveFile::from_json5_str("{ a: 1, b: 2, c: 3, d: 4, e: 5 }").unwrap()
    }

    #[test]
    fn insert_reverts_and_reapplies_at_same_index() {
        let mut file = five();
        let x = SaveProperty::new("x", SaveValue::Bool(true));
        let x_id = x.id();

        let unit = UndoUnit::from(delegate_and_execute(insert(2, x), &mut file).unwrap());
        assert_eq!(names(&file), ["a", "b", "x", "c", "d", "e"]);

        unit.revert(&mut file).unwrap();
        assert_eq!(names(&file), ["a", "b", "c", "d", "e"]);
        assert!(file.position_of(x_id).is_none());

        unit.apply(&mut file).unwrap();
        assert_eq!(file.position_of(x_id), Some(2));
    }

    #[test]
    fn remove_restores_same_identity() {
        let mut file = five();
        let c_id = file.properties()[2].id();

        let pair = remove(&file, 2).unwrap();
        let unit = UndoUnit::from(delegate_and_execute(pair, &mut file).unwrap());
        assert_eq!(names(&file), ["a", "b", "d", "e"]);

        unit.revert(&mut file).unwrap();
        assert_eq!(file.position_of(c_id), Some(2));
    }

    #[test]
    fn remove_out_of_range_builds_nothing() {
        let file = five();
        assert!(remove(&file, 5).is_err());
    }

    #[test]
    fn moves_are_inverse_pairs() {
        let mut file = five();

        let down = UndoUnit::from(delegate_and_execute(move_down(1), &mut file).unwrap());
        assert_eq!(names(&file), ["a", "c", "b", "d", "e"]);
        let up = UndoUnit::from(delegate_and_execute(move_up(4), &mut file).unwrap());
        assert_eq!(names(&file), ["a", "c", "b", "e", "d"]);

        up.revert(&mut file).unwrap();
        down.revert(&mut file).unwrap();
        assert_eq!(names(&file), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn touched_property_is_where_the_command_left_it() {
        let mut file = five();
        let b_id = file.properties()[1].id();

        let (down, up) = move_down(1);
        down.execute(&mut file).unwrap();
        assert_eq!(down.touched_property(&file), Some(b_id));
        up.execute(&mut file).unwrap();
        assert_eq!(up.touched_property(&file), Some(b_id));

        let (gone, back) = remove(&file, 1).unwrap();
        gone.execute(&mut file).unwrap();
        assert_eq!(gone.touched_property(&file), None);
        back.execute(&mut file).unwrap();
        assert_eq!(back.touched_property(&file), Some(b_id));
    }

    #[test]
    fn failed_move_records_nothing() {
        let mut file = five();
        assert!(delegate_and_execute(move_up(0), &mut file).is_err());
        assert!(delegate_and_execute(move_down(4), &mut file).is_err());
        assert_eq!(names(&file), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn replace_group_restores_original_item_first() {
        let mut file = five();
        let old_id = file.properties()[1].id();
        let pasted = SaveProperty::new("b", SaveValue::String("new".to_string()));

        let mut group = UndoGroup::new();
        let (fwd, inv) = remove(&file, 1).unwrap();
        group.add_and_execute(fwd, inv, &mut file).unwrap();
        let (fwd, inv) = insert(1, pasted);
        group.add_and_execute(fwd, inv, &mut file).unwrap();
        assert_eq!(file.properties()[1].value, SaveValue::String("new".to_string()));

        let unit = UndoUnit::from(group);
        unit.revert(&mut file).unwrap();
        assert_eq!(file.properties()[1].id(), old_id);
        assert_eq!(file.len(), 5);
    }

    #[test]
    fn rename_round_trips() {
        let mut file = five();
        let id = file.properties()[0].id();
        let unit = UndoUnit::from(
            delegate_and_execute(rename(id, "a".to_string(), "z".to_string()), &mut file).unwrap(),
        );
        assert_eq!(names(&file)[0], "z");
        assert_eq!(unit.to_string(), "Rename to 'z'");
        unit.revert(&mut file).unwrap();
        assert_eq!(names(&file)[0], "a");
    }
}
