// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use std::fs;
use strata_core::asset::{AssetMetadata, AssetSource, SourceError};
use strata_data::{AssetDatabase, DirectorySource, MemorySource};

#[test]
fn test_directory_source_reads_relative_to_root() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("textures"))?;
    fs::write(dir.path().join("textures/grass.raw"), [1u8, 2, 3])?;

    let source = DirectorySource::new(dir.path());
    let meta = AssetMetadata::new("grass.tex", "texture").with_path("textures/grass.raw");

    assert_eq!(source.read(&meta)?, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn test_directory_source_reports_missing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = DirectorySource::new(dir.path());
    let meta = AssetMetadata::new("ghost.tex", "texture");

    match source.read(&meta) {
        Err(SourceError::NotFound { name }) => assert_eq!(name, "ghost.tex"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_memory_source_serves_by_name() {
    let source = MemorySource::new().with_bytes("beep.snd", b"RIFF".to_vec());
    let meta = AssetMetadata::new("beep.snd", "sound");
    assert_eq!(source.read(&meta).unwrap(), b"RIFF".to_vec());

    let missing = AssetMetadata::new("boop.snd", "sound");
    assert!(matches!(
        source.read(&missing),
        Err(SourceError::NotFound { .. })
    ));
}

#[test]
fn test_index_file_on_disk_round_trips() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let texture = AssetMetadata::new("bark.tex", "texture");
    let material = AssetMetadata::new("bark.mat", "material").with_dependency(texture.uuid);
    let db = AssetDatabase::from_metadata([texture.clone(), material])?;

    let index_path = dir.path().join("index.bin");
    fs::write(&index_path, db.to_index_bytes()?)?;
    let reloaded = AssetDatabase::from_index_bytes(&fs::read(&index_path)?)?;

    let mat = reloaded.get_by_name("bark.mat").expect("material is indexed");
    assert_eq!(mat.dependencies, vec![texture.uuid]);
    Ok(())
}
