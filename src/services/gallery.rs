use std::fs;
use std::path::Path;
use std::time::SystemTime;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::models::meme::GalleryEntry;
use crate::utils::error::Result;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Maps every non-alphanumeric character of the upload's stem to `_`.
pub fn sanitize_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("meme");
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "meme".to_string()
    } else {
        sanitized
    }
}

/// Produces `{sanitized_stem}_meme_{n}.png` where `n` is one plus the number
/// of files currently in `dir`.
///
/// Racy under concurrent writers: two requests can observe the same count
/// and overwrite each other's meme. Accepted for small-scale usage.
pub fn next_filename(original_name: &str, dir: &Path) -> Result<String> {
    let mut count = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(format!("{}_meme_{}.png", sanitize_stem(original_name), count + 1))
}

/// Lists the gallery: visible image files only, most recently modified
/// first. An entry whose metadata cannot be read is kept in the listing
/// with an inline error instead of aborting the rest.
pub fn list(dir: &Path) -> Result<Vec<GalleryEntry>> {
    let mut entries: Vec<(Option<SystemTime>, GalleryEntry)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') || !has_image_extension(name) {
            continue;
        }

        // fs::metadata follows symlinks, so a dangling link shows up as a
        // broken entry instead of silently vanishing from the gallery.
        match fs::metadata(entry.path()) {
            Ok(meta) => {
                if !meta.is_file() {
                    continue;
                }
                let modified = meta.modified().ok();
                entries.push((
                    modified,
                    GalleryEntry {
                        filename: name.to_string(),
                        size_bytes: meta.len(),
                        modified: modified.and_then(format_timestamp),
                        error: None,
                    },
                ));
            }
            Err(e) => entries.push((
                None,
                GalleryEntry {
                    filename: name.to_string(),
                    size_bytes: 0,
                    modified: None,
                    error: Some(e.to_string()),
                },
            )),
        }
    }

    // Stable sort: equal timestamps keep directory enumeration order,
    // unreadable entries sink to the end.
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Round-robin assignment of entries to `columns` display columns by index.
/// Purely presentational; stored data is unaffected.
pub fn partition_columns(entries: &[GalleryEntry], columns: usize) -> Vec<Vec<GalleryEntry>> {
    let columns = columns.max(1);
    let mut partitioned: Vec<Vec<GalleryEntry>> = vec![Vec::new(); columns];
    for (idx, entry) in entries.iter().enumerate() {
        partitioned[idx % columns].push(entry.clone());
    }
    partitioned
}

fn format_timestamp(t: SystemTime) -> Option<String> {
    OffsetDateTime::from(t).format(&Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_every_non_alphanumeric_with_underscore() {
        assert_eq!(sanitize_stem("my pic!"), "my_pic_");
        assert_eq!(sanitize_stem("photo.jpg"), "photo");
        assert_eq!(sanitize_stem("a-b c.d.png"), "a_b_c_d");
        assert_eq!(sanitize_stem("héllo"), "héllo");
    }

    #[test]
    fn first_meme_in_empty_directory_is_numbered_one() {
        let dir = TempDir::new().expect("temp dir");
        let name = next_filename("my pic!", dir.path()).expect("filename");
        assert_eq!(name, "my_pic__meme_1.png");
    }

    #[test]
    fn counter_is_one_plus_existing_file_count() {
        let dir = TempDir::new().expect("temp dir");
        for i in 0..3 {
            fs::write(dir.path().join(format!("old_{}.png", i)), b"png").expect("write");
        }
        let name = next_filename("cat.jpg", dir.path()).expect("filename");
        assert_eq!(name, "cat_meme_4.png");
    }

    #[test]
    fn subdirectories_do_not_count_toward_the_suffix() {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("a.png"), b"png").expect("write");
        let name = next_filename("x", dir.path()).expect("filename");
        assert_eq!(name, "x_meme_2.png");
    }

    #[test]
    fn listing_is_most_recent_first() {
        let dir = TempDir::new().expect("temp dir");
        for name in ["first.png", "second.jpg", "third.jpeg"] {
            fs::write(dir.path().join(name), b"img").expect("write");
            sleep(Duration::from_millis(20));
        }

        let entries = list(dir.path()).expect("list");
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["third.jpeg", "second.jpg", "first.png"]);
    }

    #[test]
    fn hidden_and_non_image_files_are_excluded() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("visible.png"), b"img").expect("write");
        fs::write(dir.path().join(".hidden.png"), b"img").expect("write");
        fs::write(dir.path().join("notes.txt"), b"txt").expect("write");
        fs::create_dir(dir.path().join("folder.png")).expect("mkdir");

        let entries = list(dir.path()).expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "visible.png");
        assert!(entries[0].error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entry_stays_in_listing_with_inline_error() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("good.png"), b"img").expect("write");
        // dangling symlink: metadata lookup fails but the entry must survive
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("broken.png"))
            .expect("symlink");

        let entries = list(dir.path()).expect("list");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].filename, "good.png");
        assert!(entries[0].error.is_none());
        // broken entries sink to the end and report their failure inline
        assert_eq!(entries[1].filename, "broken.png");
        assert!(entries[1].error.is_some());
        assert!(entries[1].modified.is_none());
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("SHOUT.PNG"), b"img").expect("write");
        let entries = list(dir.path()).expect("list");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn columns_are_filled_round_robin() {
        let entries: Vec<GalleryEntry> = (0..5)
            .map(|i| GalleryEntry {
                filename: format!("{}.png", i),
                size_bytes: 0,
                modified: None,
                error: None,
            })
            .collect();

        let cols = partition_columns(&entries, 2);
        assert_eq!(cols.len(), 2);
        let col0: Vec<&str> = cols[0].iter().map(|e| e.filename.as_str()).collect();
        let col1: Vec<&str> = cols[1].iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(col0, vec!["0.png", "2.png", "4.png"]);
        assert_eq!(col1, vec!["1.png", "3.png"]);
    }

    #[test]
    fn zero_columns_is_clamped_to_one() {
        let entries = vec![GalleryEntry {
            filename: "a.png".to_string(),
            size_bytes: 0,
            modified: None,
            error: None,
        }];
        let cols = partition_columns(&entries, 0);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].len(), 1);
    }
}
