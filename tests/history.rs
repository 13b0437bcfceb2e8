use pretty_assertions::assert_eq;
use std::{cell::RefCell, path::Path, rc::Rc};
use swse::{
    EditorOptions, NewProperty, PasteChoice, Prompter, ReloadWarning, SaveDocument, SaveFile,
    SaveValue, ValueType, clipboard::MemoryClipboard,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Answers every question the same way and remembers what was asked.
struct Answer {
    reload: bool,
    asked: Vec<ReloadWarning>,
}

impl Answer {
    fn new(reload: bool) -> Self {
        Self {
            reload,
            asked: Vec::new(),
        }
    }
}

impl Prompter for Answer {
    fn confirm_reload(&mut self, warning: ReloadWarning) -> bool {
        self.asked.push(warning);
        self.reload
    }

    fn resolve_paste_conflict(&mut self, _name: &str) -> PasteChoice {
        PasteChoice::AddNew
    }
}

fn write_save(dir: &Path) -> Result<SaveDocument> {
    let path = dir.join("slot1.json");
    std::fs::write(&path, b"{ name: 'Hero', gold: 10, item: 'sword', item: 'shield' }\n")?;
    Ok(SaveDocument::new(SaveFile::load_path(&path)?))
}

fn snapshot(doc: &SaveDocument) -> Vec<(String, String)> {
    doc.properties()
        .iter()
        .map(|p| (p.name.clone(), p.value.to_json5_compact()))
        .collect()
}

#[test]
fn undo_all_then_redo_all_restores_every_intermediate_state() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut doc = write_save(dir.path())?;
    let mut states = vec![snapshot(&doc)];

    doc.set_selected_index(Some(1));
    doc.rename_selected("coins")?;
    states.push(snapshot(&doc));

    doc.move_selected_down()?;
    states.push(snapshot(&doc));

    doc.add_property(NewProperty {
        name: "level".to_string(),
        value_type: ValueType::UInt,
        is_array: false,
    })?;
    states.push(snapshot(&doc));

    let gold = doc.properties()[2].id();
    doc.edit_value(gold, SaveValue::parse_json5("99")?)?;
    states.push(snapshot(&doc));

    doc.set_selected_index(Some(0));
    doc.remove_selected()?;
    states.push(snapshot(&doc));

    let mut clipboard = MemoryClipboard::new();
    doc.set_selected_index(Some(0));
    assert!(doc.copy_selected(&mut clipboard));
    doc.paste(&mut clipboard, &mut Answer::new(true))?;
    states.push(snapshot(&doc));

    let pushes = states.len() - 1;
    assert_eq!(doc.undo_service().undo_count(), pushes);

    for n in 1..=pushes {
        for _ in 0..n {
            assert!(doc.undo()?);
        }
        assert_eq!(snapshot(&doc), states[pushes - n]);
        for _ in 0..n {
            assert!(doc.redo()?);
        }
        assert_eq!(snapshot(&doc), states[pushes]);
    }
    Ok(())
}

#[test]
fn save_point_tracks_saves_edits_and_undo() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut doc = write_save(dir.path())?;
    assert!(!doc.can_save());

    let changes = Rc::new(RefCell::new(0));
    let sink = changes.clone();
    doc.subscribe(move |_| *sink.borrow_mut() += 1);

    doc.set_selected_index(Some(0));
    doc.rename_selected("hero")?;
    assert!(doc.can_save());

    doc.save()?;
    assert!(!doc.can_save());

    let gold = doc.properties()[1].id();
    doc.edit_value(gold, SaveValue::parse_json5("11")?)?;
    assert!(doc.has_unsaved_changes());

    doc.undo()?;
    assert!(!doc.has_unsaved_changes());

    doc.undo()?;
    assert!(doc.has_unsaved_changes());

    // rename, save, edit, undo, undo
    assert_eq!(*changes.borrow(), 5);

    let on_disk = SaveFile::load_path(&dir.path().join("slot1.json"))?;
    assert_eq!(on_disk.properties()[0].name, "hero");
    Ok(())
}

#[test]
fn reload_asks_with_the_right_warning() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut doc = write_save(dir.path())?;

    // Nothing to lose: no question asked.
    let mut prompter = Answer::new(false);
    assert!(doc.reload(&mut prompter)?);
    assert!(prompter.asked.is_empty());

    doc.set_selected_index(Some(0));
    doc.rename_selected("renamed")?;
    let mut decline = Answer::new(false);
    assert!(!doc.reload(&mut decline)?);
    assert_eq!(decline.asked, [ReloadWarning::UnsavedChanges]);
    assert_eq!(doc.properties()[0].name, "renamed");
    assert!(doc.can_undo());

    doc.undo()?;
    let mut decline = Answer::new(false);
    assert!(!doc.reload(&mut decline)?);
    assert_eq!(decline.asked, [ReloadWarning::HistoryOnly]);
    assert!(doc.can_redo());

    let mut accept = Answer::new(true);
    assert!(doc.reload(&mut accept)?);
    assert!(!doc.can_undo());
    assert!(!doc.can_redo());
    assert!(!doc.has_unsaved_changes());
    assert_eq!(doc.properties()[0].name, "name");
    Ok(())
}

#[test]
fn reload_failure_keeps_document_and_history() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut doc = write_save(dir.path())?;
    doc.set_selected_index(Some(0));
    doc.rename_selected("renamed")?;

    std::fs::write(dir.path().join("slot1.json"), b"{ broken")?;
    assert!(doc.reload(&mut Answer::new(true)).is_err());
    assert_eq!(doc.properties()[0].name, "renamed");
    assert!(doc.can_undo());
    Ok(())
}

#[test]
fn history_limit_comes_from_options() -> Result<()> {
    let options = EditorOptions::from_json5("{ historyLimit: 2 }")?;
    let mut doc = SaveDocument::with_options(SaveFile::from_json5_str("{ a: 1 }")?, options);
    let id = doc.properties()[0].id();
    for v in 2..=5 {
        doc.edit_value(id, SaveValue::parse_json5(&v.to_string())?)?;
    }

    assert!(doc.undo()?);
    assert!(doc.undo()?);
    assert!(!doc.undo()?);
    assert_eq!(doc.properties()[0].value, SaveValue::parse_json5("3")?);
    Ok(())
}

#[test]
fn undoing_all_kept_history_still_leaves_unsaved_changes() -> Result<()> {
    let options = EditorOptions::from_json5("{ historyLimit: 2 }")?;
    let mut doc = SaveDocument::with_options(SaveFile::from_json5_str("{ a: 1 }")?, options);
    let id = doc.properties()[0].id();
    assert!(!doc.has_unsaved_changes());
    for v in 2..=4 {
        doc.edit_value(id, SaveValue::parse_json5(&v.to_string())?)?;
    }

    while doc.undo()? {}
    assert_eq!(doc.properties()[0].value, SaveValue::parse_json5("2")?);
    assert!(doc.has_unsaved_changes());
    assert!(doc.can_save());
    Ok(())
}
