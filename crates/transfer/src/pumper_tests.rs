// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn drain(pumper: &mut Pumper, n: usize) -> (Vec<u8>, Vec<usize>) {
    let mut all = Vec::new();
    let mut sizes = Vec::new();
    loop {
        let chunk = pumper.read(n).await.unwrap();
        if chunk.is_empty() {
            return (all, sizes);
        }
        sizes.push(chunk.len());
        all.extend_from_slice(&chunk);
    }
}

fn member_names(archive: &[u8]) -> Vec<String> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let mut names: Vec<String> = tar
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn relative_path_members_keep_their_prefix() {
    let base = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(base.path().join("deps/sub")).unwrap();
    std::fs::write(base.path().join("deps/a.txt"), "a").unwrap();
    std::fs::write(base.path().join("deps/sub/b.txt"), "b").unwrap();

    let mut pumper = Pumper::spawn(base.path(), Path::new("deps"));
    let (archive, _) = drain(&mut pumper, 1024).await;

    assert_eq!(member_names(&archive), vec!["deps", "deps/a.txt", "deps/sub", "deps/sub/b.txt"]);
    assert_eq!(pumper.stats(), Some(PackStats { files: 2, dirs: 2 }));
}

#[tokio::test]
async fn absolute_path_members_drop_the_root() {
    let tree = tempfile::tempdir().unwrap();
    std::fs::write(tree.path().join("f.txt"), "f").unwrap();

    let mut pumper = Pumper::spawn(Path::new("/unused"), tree.path());
    let (archive, _) = drain(&mut pumper, 4096).await;

    let expected = tree.path().join("f.txt");
    let expected = expected.strip_prefix("/").unwrap().to_string_lossy().into_owned();
    assert!(member_names(&archive).contains(&expected));
}

#[tokio::test]
async fn reads_never_exceed_the_requested_size() {
    let base = tempfile::tempdir().unwrap();
    std::fs::create_dir(base.path().join("big")).unwrap();
    // Incompressible enough to span many blocks.
    let noise: Vec<u8> = (0..400_000u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
    std::fs::write(base.path().join("big/noise.bin"), &noise).unwrap();

    let mut pumper = Pumper::spawn_with_capacity(base.path(), Path::new("big"), 2);
    let (archive, sizes) = drain(&mut pumper, 10_000).await;

    assert!(sizes.iter().all(|s| *s <= 10_000));
    assert!(sizes[..sizes.len() - 1].iter().all(|s| *s == 10_000));
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive.as_slice()));
    let mut found = false;
    for entry in tar.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().ends_with("noise.bin") {
            let mut body = Vec::new();
            std::io::Read::read_to_end(&mut entry, &mut body).unwrap();
            assert_eq!(body, noise);
            found = true;
        }
    }
    assert!(found);
}

#[tokio::test]
async fn read_after_end_stays_empty() {
    let base = tempfile::tempdir().unwrap();
    std::fs::write(base.path().join("one"), "1").unwrap();
    let mut pumper = Pumper::spawn(base.path(), Path::new("one"));
    drain(&mut pumper, 512).await;
    assert!(pumper.read(512).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_root_surfaces_the_walk_error() {
    let base = tempfile::tempdir().unwrap();
    let mut pumper = Pumper::spawn(base.path(), Path::new("gone"));
    let mut result = pumper.read(1024).await;
    while let Ok(chunk) = &result {
        if chunk.is_empty() {
            break;
        }
        result = pumper.read(1024).await;
    }
    assert!(result.is_err());
}
