//! End-to-end tests of the `anilib` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use anilib_common::{AnimeFormat, AnimeStatus};
use anilib_db::models::{AnimeTitle, NewAnime};
use anilib_db::pool::{get_conn, init_pool};
use anilib_db::queries::animes;

#[allow(deprecated)]
fn anilib() -> Command {
    Command::cargo_bin("anilib").unwrap()
}

/// Write a config pointing the catalog into `dir` and return its path.
fn write_config(dir: &Path, db_name: &str) -> PathBuf {
    let config = dir.join(format!("{db_name}.toml"));
    let db = dir.join(db_name);
    std::fs::write(
        &config,
        format!(
            "[library]\ndatabase = {:?}\ncovers_dir = {:?}\n",
            db.to_string_lossy(),
            dir.join("covers").to_string_lossy()
        ),
    )
    .unwrap();
    config
}

fn seed_anime(db: &Path, folder: &Path) {
    let pool = init_pool(&db.to_string_lossy()).unwrap();
    let conn = get_conn(&pool).unwrap();
    animes::create_anime(
        &conn,
        &NewAnime {
            anilist_id: 1,
            title: AnimeTitle {
                romaji: Some("Cowboy Bebop".into()),
                english: None,
                native: None,
            },
            cover_url: None,
            description: None,
            episodes: Some(26),
            release_date: None,
            status: AnimeStatus::Finished,
            genres: vec![],
            format: AnimeFormat::Tv,
            folder_path: folder.to_path_buf(),
        },
    )
    .unwrap();
}

#[test]
fn help_lists_commands() {
    anilib()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("sweep"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn version_prints_package_version() {
    anilib()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_reports_catalog_path() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "catalog.db");
    anilib()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("catalog.db"));
}

#[test]
fn validate_rejects_zero_concurrency() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    std::fs::write(&config, "[transcode]\nmax_concurrent = 0\n").unwrap();
    anilib()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrent"));
}

#[test]
fn export_then_import_into_empty_catalog() {
    let tmp = TempDir::new().unwrap();
    let source = write_config(tmp.path(), "source.db");
    let target = write_config(tmp.path(), "target.db");
    let folder = tmp.path().join("Cowboy Bebop");
    std::fs::create_dir_all(&folder).unwrap();
    seed_anime(&tmp.path().join("source.db"), &folder);
    let snapshot = tmp.path().join("catalog.json");

    anilib()
        .args(["--config"])
        .arg(&source)
        .arg("export")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 anime"));
    assert!(snapshot.exists());

    anilib()
        .args(["--config"])
        .arg(&target)
        .arg("import")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 anime"));

    anilib()
        .args(["--config"])
        .arg(&target)
        .arg("import")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 already present)"));
}

#[test]
fn sweep_drops_anime_whose_folder_is_gone() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "catalog.db");
    seed_anime(&tmp.path().join("catalog.db"), &tmp.path().join("Gone"));

    anilib()
        .args(["--config"])
        .arg(&config)
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 anime, 0 episodes"));
}

#[test]
fn probe_missing_file_fails() {
    anilib()
        .args(["probe", "/nonexistent/01.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
