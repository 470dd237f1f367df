//! tar.gz extraction.
//!
//! Entries are unpacked into a staging directory inside the target first.
//! Only once the whole archive has decoded are the target's matching
//! top-level entries replaced, so a corrupt archive never leaves a half
//! written world behind and repeated extraction gives identical results.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::{RealmError, RealmResult};

/// Prefix of the staging directory created inside the target.
const STAGING_PREFIX: &str = ".realm-extract-";

fn corrupt(archive: &Path, e: impl std::fmt::Display) -> RealmError {
    RealmError::Extraction(format!("{} is corrupt or truncated: {}", archive.display(), e))
}

fn io_failure(path: &Path, e: std::io::Error) -> RealmError {
    RealmError::Extraction(format!("{}: {}", path.display(), e))
}

/// Relative, without `..`: the entry stays inside the target
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}

fn remove_existing(path: &Path) -> RealmResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map_err(|e| io_failure(path, e)),
        Ok(_) => fs::remove_file(path).map_err(|e| io_failure(path, e)),
        Err(_) => Ok(()),
    }
}

/// Extract `archive` into `target` and return the world directory.
///
/// The world directory is the archive's single top-level directory when it
/// has one, otherwise `target` itself.
pub fn extract_archive(archive: &Path, target: &Path) -> RealmResult<PathBuf> {
    let file = File::open(archive).map_err(|e| io_failure(archive, e))?;
    fs::create_dir_all(target).map_err(|e| io_failure(target, e))?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(target)
        .map_err(|e| io_failure(target, e))?;

    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut count = 0usize;

    for entry in tar.entries().map_err(|e| corrupt(archive, e))? {
        let mut entry = entry.map_err(|e| corrupt(archive, e))?;
        let path = entry.path().map_err(|e| corrupt(archive, e))?.into_owned();

        if !is_contained(&path) {
            if path.components().all(|c| c == Component::CurDir) {
                continue;
            }
            return Err(RealmError::Extraction(format!(
                "archive entry escapes the target directory: {}",
                path.display()
            )));
        }

        entry
            .unpack_in(staging.path())
            .map_err(|e| corrupt(archive, e))?;
        count += 1;
    }

    if count == 0 {
        return Err(RealmError::Extraction(format!(
            "{} contains no entries",
            archive.display()
        )));
    }

    let mut top_level = Vec::new();
    for entry in fs::read_dir(staging.path()).map_err(|e| io_failure(staging.path(), e))? {
        let entry = entry.map_err(|e| io_failure(staging.path(), e))?;
        top_level.push(entry.file_name());
    }

    for name in &top_level {
        let dest = target.join(name);
        remove_existing(&dest)?;
        fs::rename(staging.path().join(name), &dest).map_err(|e| io_failure(&dest, e))?;
        debug!(path = %dest.display(), "Placed extracted entry");
    }

    let world_dir = match top_level.as_slice() {
        [single] if target.join(single).is_dir() => target.join(single),
        _ => target.to_path_buf(),
    };

    info!(entries = count, world = %world_dir.display(), "Archive extracted");
    Ok(world_dir)
}

/// Run `extract_archive` on the blocking pool
pub async fn extract(archive: &Path, target: &Path) -> RealmResult<PathBuf> {
    let archive = archive.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
        .await
        .map_err(|e| RealmError::Extraction(format!("extraction task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn build_archive(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn pack_directory(dir: &Path, name: &str, out: &Path) {
        let file = File::create(out).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.append_dir_all(name, dir).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else {
                    let relative = path.strip_prefix(root).unwrap().to_path_buf();
                    out.insert(relative, fs::read(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(dir, dir, &mut out);
        out
    }

    const WORLD: &[(&str, &[u8])] = &[
        ("world/level.dat", b"level"),
        ("world/region/r.0.0.mca", b"region data"),
        ("world/data/raids.dat", b"raids"),
    ];

    #[test]
    fn test_extract_returns_single_top_level_dir() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);

        let target = temp.path().join("out");
        let world = extract_archive(&archive, &target).unwrap();

        assert_eq!(world, target.join("world"));
        assert_eq!(fs::read(world.join("level.dat")).unwrap(), b"level");
        assert_eq!(fs::read(world.join("region/r.0.0.mca")).unwrap(), b"region data");
    }

    #[test]
    fn test_extract_flat_archive_uses_target() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("flat.tar.gz");
        build_archive(&archive, &[("level.dat", b"level"), ("session.lock", b"")]);

        let target = temp.path().join("out");
        assert_eq!(extract_archive(&archive, &target).unwrap(), target);
    }

    #[test]
    fn test_extract_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);
        let target = temp.path().join("out");

        extract_archive(&archive, &target).unwrap();
        let first = snapshot(&target);

        // Stale file from an older snapshot must not survive re-extraction
        fs::write(target.join("world/stale.dat"), b"old").unwrap();
        extract_archive(&archive, &target).unwrap();
        let second = snapshot(&target);

        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_then_repack_round_trip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);

        let first_target = temp.path().join("first");
        let world = extract_archive(&archive, &first_target).unwrap();

        let repacked = temp.path().join("repacked.tar.gz");
        pack_directory(&world, "world", &repacked);

        let second_target = temp.path().join("second");
        extract_archive(&repacked, &second_target).unwrap();

        assert_eq!(snapshot(&first_target), snapshot(&second_target));
    }

    #[test]
    fn test_staging_dir_is_cleaned_up() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);
        let target = temp.path().join("out");

        extract_archive(&archive, &target).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_truncated_archive_fails_and_preserves_existing_world() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);
        let target = temp.path().join("out");
        extract_archive(&archive, &target).unwrap();
        let before = snapshot(&target);

        let bytes = fs::read(&archive).unwrap();
        let truncated = temp.path().join("truncated.tar.gz");
        fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

        let result = extract_archive(&truncated, &target);
        assert!(matches!(result, Err(RealmError::Extraction(_))));
        assert_eq!(snapshot(&target), before);
    }

    #[test]
    fn test_garbage_file_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("garbage.tar.gz");
        let mut file = File::create(&archive).unwrap();
        file.write_all(b"this is not a gzip stream").unwrap();

        let result = extract_archive(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(RealmError::Extraction(_))));
    }

    #[test]
    fn test_empty_archive_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("empty.tar.gz");
        build_archive(&archive, &[]);

        let result = extract_archive(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(RealmError::Extraction(ref m)) if m.contains("no entries")));
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("world/level.dat")));
        assert!(is_contained(Path::new("./world/level.dat")));
        assert!(!is_contained(Path::new("../evil")));
        assert!(!is_contained(Path::new("world/../../evil")));
        assert!(!is_contained(Path::new("/etc/passwd")));
        assert!(!is_contained(Path::new(".")));
    }

    #[tokio::test]
    async fn test_async_extract() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("world.tar.gz");
        build_archive(&archive, WORLD);

        let world = extract(&archive, &temp.path().join("out")).await.unwrap();
        assert!(world.join("level.dat").exists());
    }
}
