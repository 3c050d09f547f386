//! Image loading and write-after-success output.

use std::{
    ffi::OsString,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::foundation::error::{SpriteError, SpriteResult};

pub fn load_image(path: &Path) -> SpriteResult<DynamicImage> {
    let bytes = std::fs::read(path).map_err(|e| SpriteError::io(path, e))?;
    image::load_from_memory(&bytes).map_err(|source| SpriteError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// `*.png` files directly inside `dir`, sorted by file name.
pub fn list_pngs(dir: &Path) -> SpriteResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| SpriteError::io(dir, e))?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SpriteError::io(dir, e))?.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

pub fn encode_png(img: &RgbaImage) -> SpriteResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| SpriteError::encode(format!("png: {e}")))?;
    Ok(buf)
}

pub fn write_png_atomic(path: &Path, img: &RgbaImage) -> SpriteResult<()> {
    let bytes = encode_png(img)?;
    write_atomic(path, &bytes)
}

pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> SpriteResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| SpriteError::encode(format!("json: {e}")))?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> SpriteResult<()> {
    write_all_atomic(&[(path, bytes)])
}

/// Write a group of outputs so that either all of them land or none do.
///
/// Every output is staged to its temp sibling before the first rename. If a stage or rename
/// fails, remaining temp files are removed along with the outputs already renamed.
pub fn write_all_atomic(outputs: &[(&Path, &[u8])]) -> SpriteResult<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, bytes) in outputs {
        staged.push(stage(path, bytes)?);
    }

    let mut committed: Vec<&Path> = Vec::with_capacity(staged.len());
    for s in &staged {
        if let Err(e) = std::fs::rename(&s.tmp, &s.dest) {
            for done in committed {
                std::fs::remove_file(done).ok();
            }
            return Err(SpriteError::io(&s.dest, e));
        }
        committed.push(&s.dest);
    }
    Ok(())
}

/// A temp file holding finished output, removed on drop unless renamed into place.
struct Staged {
    tmp: PathBuf,
    dest: PathBuf,
}

impl Drop for Staged {
    fn drop(&mut self) {
        if self.tmp.exists() {
            std::fs::remove_file(&self.tmp).ok();
        }
    }
}

fn stage(path: &Path, bytes: &[u8]) -> SpriteResult<Staged> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SpriteError::io(parent, e))?;
    }

    let staged = Staged {
        tmp: temp_sibling(path)?,
        dest: path.to_path_buf(),
    };
    std::fs::write(&staged.tmp, bytes).map_err(|e| SpriteError::io(&staged.tmp, e))?;
    Ok(staged)
}

fn temp_sibling(path: &Path) -> SpriteResult<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("output path '{}' has no file name", path.display()))?;
    let mut tmp_name = OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "spritecut_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn png_round_trips_through_disk() {
        let dir = temp_dir("io_png");
        let path = dir.join("nested").join("px.png");
        let img = RgbaImage::from_pixel(2, 3, Rgba([9, 8, 7, 128]));

        write_png_atomic(&path, &img).unwrap();
        assert!(!temp_sibling(&path).unwrap().exists());

        let back = load_image(&path).unwrap().to_rgba8();
        assert_eq!(back, img);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = temp_dir("io_decode");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, SpriteError::Decode { .. }), "{err}");
        assert!(matches!(
            load_image(&dir.join("missing.png")).unwrap_err(),
            SpriteError::Io { .. }
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn list_pngs_filters_and_sorts() {
        let dir = temp_dir("io_list");
        std::fs::create_dir_all(dir.join("sub.png")).unwrap();
        for name in ["b.png", "a.PNG", "notes.txt", "c.png"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        let names: Vec<String> = list_pngs(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.PNG", "b.png", "c.png"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn group_write_leaves_nothing_when_one_rename_fails() {
        let dir = temp_dir("io_group");
        let first = dir.join("a.png");
        let blocked = dir.join("b.png");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();

        let err = write_all_atomic(&[
            (first.as_path(), b"one".as_slice()),
            (blocked.as_path(), b"two".as_slice()),
        ]).unwrap_err();
        assert!(matches!(err, SpriteError::Io { .. }), "{err}");
        assert!(!first.exists());
        assert!(!temp_sibling(&first).unwrap().exists());
        assert!(!temp_sibling(&blocked).unwrap().exists());
        assert!(blocked.is_dir());

        let fine = dir.join("c.png");
        write_all_atomic(&[
            (first.as_path(), b"one".as_slice()),
            (fine.as_path(), b"three".as_slice()),
        ]).unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&fine).unwrap(), b"three");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_output_is_pretty_and_terminated() {
        let dir = temp_dir("io_json");
        let path = dir.join("out.json");
        write_json_atomic(&path, &serde_json::json!({ "a": [1, 2] })).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"a\""));
        assert!(text.ends_with('\n'));
        std::fs::remove_dir_all(&dir).ok();
    }
}
