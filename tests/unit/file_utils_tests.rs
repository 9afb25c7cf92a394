/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::cmp::Ordering;
use novelforge::file_utils::{FileManager, natural_cmp};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "page_1.txt", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::dir_exists(&test_file));

    Ok(())
}

/// Test that list_stage_files filters by prefix and extension without recursing
#[test]
fn test_list_stage_files_withMixedEntries_shouldReturnMatchingFilesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "translated_page_10.txt", "")?;
    common::create_test_file(dir, "translated_page_2.txt", "")?;
    common::create_test_file(dir, "page_3.txt", "")?;
    common::create_test_file(dir, "translated_notes.md", "")?;
    std::fs::create_dir(dir.join("translated_sub.txt"))?;
    common::create_test_file(&dir.join("translated_sub.txt"), "translated_deep.txt", "")?;

    let names = FileManager::list_stage_files(dir, "translated_", ".txt")?;

    assert_eq!(names, vec!["translated_page_2.txt", "translated_page_10.txt"]);
    Ok(())
}

/// Test that a missing directory lists as empty
#[test]
fn test_list_stage_files_withMissingDirectory_shouldReturnEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let names = FileManager::list_stage_files(temp_dir.path().join("absent"), "", "txt")?;
    assert!(names.is_empty());
    Ok(())
}

/// Test that write_atomic replaces the whole file and leaves no temp file behind
#[test]
fn test_write_atomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "token_data.json", "old content that is longer")?;

    FileManager::write_atomic(&path, "new")?;

    assert_eq!(common::read(&path), "new");
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 1);
    Ok(())
}

/// Test that stamp degrades to unknown for a missing file
#[test]
fn test_stamp_withMissingFile_shouldBeUnknown() {
    let stamp = FileManager::stamp("definitely_missing_file.txt");
    assert_eq!(stamp.created_display(), "unknown");
    assert_eq!(stamp.size_display(), "unknown");
}

/// Test natural ordering against the chapter names the pipeline produces
#[test]
fn test_natural_cmp_withChapterNames_shouldOrderNumerically() {
    assert_eq!(natural_cmp("page_2", "page_10"), Ordering::Less);
    assert_eq!(natural_cmp("page_0010", "page_0009"), Ordering::Greater);
    assert_eq!(natural_cmp("Chapter 3", "chapter 12"), Ordering::Less);
    assert_eq!(natural_cmp("page_1", "page_1"), Ordering::Equal);
}
