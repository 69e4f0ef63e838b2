//! 编辑器完整工作流测试
//!
//! 测试场景：
//! - 从磁盘上的 JSON 块文件加载多个文件
//! - 批量应用、撤回、撤销/重做
//! - 保存到磁盘，锁定的文件不被写入
//! - 保存后重新扫描，已写入的修改从覆盖层中剪除

use std::path::{Path, PathBuf};
use block_attr_editor::editor::FileProgress;
use block_attr_editor::io::{BlockFile, DefaultBlockScanner, DefaultBlockWriter, DefaultLockProbe};
use block_attr_editor::{AttributeEditor, EditorConfig, RevertTarget, Selection, TargetFiles};
use tempfile::TempDir;

fn write_block_file(dir: &Path, name: &str, doors: &[(&str, &str)]) -> PathBuf {
    let blocks: Vec<String> = doors
        .iter()
        .map(|(handle, width)| {
            format!(
                r#"{{ "container": "Model", "block_name": "DOOR", "handle": "{}",
                     "attributes": [ {{ "tag": "WIDTH", "value": "{}" }}, {{ "tag": "MARK", "value": "D" }} ] }}"#,
                handle, width
            )
        })
        .chain(std::iter::once(
            r#"{ "container": "Layout1", "block_name": "TITLE", "handle": "1",
                 "attributes": [ { "tag": "NAME", "value": "Plan" } ] }"#
                .to_string(),
        ))
        .collect();

    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(r#"{{ "format_version": 2, "blocks": [ {} ] }}"#, blocks.join(",")),
    )
    .unwrap();
    path
}

fn setup() -> (TempDir, Vec<String>, AttributeEditor) {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_block_file(dir.path(), "a.json", &[("3A", "30"), ("3B", "32")]),
        write_block_file(dir.path(), "b.json", &[("3A", "30")]),
    ]
    .into_iter()
    .map(|p| p.to_string_lossy().to_string())
    .collect::<Vec<_>>();

    let config = EditorConfig {
        backup_before_save: false,
        ..Default::default()
    };
    let mut editor = AttributeEditor::new(Box::new(DefaultBlockScanner), &config);
    let report = editor.load_files(&files, &mut |_: &FileProgress| {});
    assert!(report.errors.is_empty());

    (dir, files, editor)
}

fn width_on_disk(path: &str, handle: &str) -> String {
    let file = BlockFile::read(Path::new(path)).unwrap();
    let block = file.blocks.iter().find(|b| b.handle == handle).unwrap();
    block.attributes.iter().find(|a| a.tag == "WIDTH").unwrap().value.clone()
}

#[test]
fn test_bulk_edit_and_save() {
    let (_dir, files, mut editor) = setup();

    assert_eq!(editor.apply_similar("door", "width", "36", &TargetFiles::AllLoaded), 3);
    assert_eq!(editor.stats().files_with_changes, 2);

    let result = editor
        .save(&DefaultBlockWriter::default(), &DefaultLockProbe::default(), &mut |_: &FileProgress| {}, None)
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.written_files.len(), 2);
    assert_eq!(width_on_disk(&files[0], "3A"), "36");
    assert_eq!(width_on_disk(&files[0], "3B"), "36");
    assert_eq!(width_on_disk(&files[1], "3A"), "36");
    assert_eq!(BlockFile::read(Path::new(&files[0])).unwrap().format_version, 2);

    // 已写入的修改被剪除，新基线即为保存后的值
    assert_eq!(editor.pending_count(), 0);
    assert_eq!(editor.original_value(&files[1], "3A", "WIDTH"), Some("36"));
}

#[test]
fn test_locked_file_is_left_untouched() {
    let (_dir, files, mut editor) = setup();
    editor.apply_similar("DOOR", "WIDTH", "40", &TargetFiles::AllLoaded);

    let probe = DefaultLockProbe::default();
    std::fs::write(probe.lock_path(Path::new(&files[1])), b"").unwrap();
    let before = std::fs::read_to_string(&files[1]).unwrap();

    let result = editor
        .save(&DefaultBlockWriter::default(), &probe, &mut |_: &FileProgress| {}, None)
        .unwrap();

    assert_eq!(result.failed_files, 1);
    assert_eq!(result.errors[0].file_path, files[1]);
    assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), before);
    assert_eq!(width_on_disk(&files[0], "3A"), "40");

    // 锁定文件的修改仍待保存
    assert_eq!(editor.pending_count(), 1);
    assert!(editor.is_modified(&files[1], "3A", "WIDTH"));
}

#[test]
fn test_scope_revert_and_undo() {
    let (_dir, files, mut editor) = setup();

    editor.set_file_selection(Selection::only([files[0].as_str()]));
    assert_eq!(editor.apply_similar("DOOR", "WIDTH", "44", &TargetFiles::Scope), 2);
    assert!(!editor.is_modified(&files[1], "3A", "WIDTH"));

    assert!(editor.edit_cell(&files[0], "1", "NAME", "Cover"));
    assert_eq!(editor.revert(&RevertTarget::File(files[0].to_uppercase())), 3);
    assert_eq!(editor.pending_count(), 0);

    assert_eq!(editor.undo().as_deref(), Some(RevertTarget::File(files[0].to_uppercase()).describe().as_str()));
    assert_eq!(editor.pending_count(), 3);

    editor.redo();
    assert_eq!(editor.pending_count(), 0);
    assert!(!editor.can_redo());
}

#[test]
fn test_removed_file_comes_back_on_undo() {
    let (_dir, files, mut editor) = setup();
    editor.edit_cell(&files[1], "3A", "WIDTH", "50");

    assert!(editor.remove_files(&[files[1].clone()]));
    assert_eq!(editor.loaded_files().len(), 1);
    assert_eq!(editor.pending_count(), 0);

    editor.undo();
    assert_eq!(editor.loaded_files().len(), 2);
    assert_eq!(editor.display_value(&files[1], "3A", "WIDTH"), "50");
}
