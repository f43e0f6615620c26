//! Ingest pipeline tests against a temporary media tree, a scripted
//! metadata provider and a fake media toolkit.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use anilib_common::{Error, LibraryStatus};
use anilib_db::pool::get_conn;
use anilib_db::queries::{settings, subtitles};
use anilib::state::EventPayload;
use common::{candidate, ScriptedLookup, TestHarness};
use tokio_util::sync::CancellationToken;

const SUFFIX: &str = " [ANILIB COMPATIBLE]";

#[tokio::test]
async fn cowboy_bebop_end_to_end() {
    let h = TestHarness::new();
    let first = h.touch("Cowboy Bebop/01.mkv");
    let second = h.touch("Cowboy Bebop/02.mkv");
    h.toolkit.unsupported_video("01.mkv");

    let summary = h.library.update().await.unwrap();
    assert_eq!(summary.animes_created, 1);
    assert_eq!(summary.episodes_created, 2);
    assert!(summary.failures.is_empty());
    assert!(!summary.cancelled);

    let animes = h.animes();
    assert_eq!(animes.len(), 1);
    assert_eq!(animes[0].title.preferred(), "Cowboy Bebop");
    assert_eq!(animes[0].folder_path, h.media_root().join("Cowboy Bebop"));

    let episodes = h.episodes();
    assert_eq!(episodes.len(), 2);
    let converted: Vec<_> = episodes.iter().filter(|e| e.is_converted()).collect();
    assert_eq!(converted.len(), 1);
    assert_eq!(converted[0].original_file_path.as_deref(), Some(first.as_path()));
    assert_eq!(
        converted[0].file_path,
        h.media_root().join(format!("Cowboy Bebop/01{SUFFIX}.mp4"))
    );
    assert!(episodes.iter().any(|e| e.file_path == second && e.original_file_path.is_none()));
    assert!(episodes.iter().all(|e| e.anime_id == animes[0].id));
    assert!(episodes.iter().all(|e| e.cover_image_path.is_some()));
    assert_eq!(h.toolkit.transcode_count(), 1);
    assert_eq!(h.library.status(), LibraryStatus::Idle);
}

#[tokio::test]
async fn second_scan_creates_nothing() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mkv");
    h.touch("Cowboy Bebop/02.mkv");
    h.touch("Trigun/01.mp4");
    h.toolkit.unsupported_video("01.mkv");

    assert_eq!(h.scan().await, (2, 3));
    let lookups = h.provider.query_count();

    // The transcode output now sits next to its source.
    assert_eq!(h.scan().await, (0, 0));
    assert_eq!(h.episodes().len(), 3);
    assert_eq!(h.toolkit.transcode_count(), 1);
    assert_eq!(h.provider.query_count(), lookups);
}

#[tokio::test]
async fn converted_episode_survives_original_cleanup_and_rescan() {
    let h = TestHarness::with_options(|c| c.library.delete_converted_originals = true);
    let original = h.touch("Cowboy Bebop/01.mkv");
    h.toolkit.unsupported_video("01.mkv");

    let summary = h.library.update().await.unwrap();
    assert_eq!(summary.originals_deleted, 1);
    assert!(!original.exists());

    let summary = h.library.update().await.unwrap();
    assert_eq!(summary.episodes_created, 0);
    assert_eq!(summary.episodes_removed, 0);
    assert_eq!(h.episodes().len(), 1);
}

#[tokio::test]
async fn transcodes_are_capped_process_wide() {
    let h = TestHarness::with_options(|c| c.transcode.max_concurrent = 2);
    h.toolkit.set_delay(Duration::from_millis(50));
    for i in 1..=4 {
        h.touch(&format!("Cowboy Bebop/{i:02}.mkv"));
        h.touch(&format!("Trigun/{i:02}.mkv"));
    }

    let (_, episodes) = h.scan().await;
    assert_eq!(episodes, 8);
    let peak = h.toolkit.max_in_flight();
    assert!(peak <= 2, "peak in-flight creations was {peak}");
    assert!(peak >= 1);
}

#[tokio::test]
async fn overlapping_scans_of_one_anime_create_each_episode_once() {
    let h = TestHarness::new();
    h.toolkit.set_delay(Duration::from_millis(10));
    for i in 1..=5 {
        h.touch(&format!("Cowboy Bebop/{i:02}.mp4"));
    }
    h.ingest
        .animes
        .ingest(&[h.media_root()], &CancellationToken::new())
        .await
        .unwrap();
    let anime = h.animes().remove(0);

    let report = h
        .ingest
        .episodes
        .ingest_for_animes(&[anime.clone(), anime.clone(), anime], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.created.len(), 5);
    assert_eq!(report.skipped, 10);
    assert_eq!(h.episodes().len(), 5);
}

#[tokio::test]
async fn failed_lookup_is_reported_and_siblings_continue() {
    let h = TestHarness::new();
    h.provider
        .script("Mystery Folder", ScriptedLookup::Fail("status 500".into()));
    h.provider.script("Nothing Here", ScriptedLookup::Candidates(vec![]));
    h.touch("Cowboy Bebop/01.mp4");
    h.touch("Mystery Folder/01.mp4");
    h.touch("Nothing Here/01.mp4");

    let summary = h.library.update().await.unwrap();
    assert_eq!(summary.animes_created, 1);
    assert_eq!(summary.episodes_created, 1);
    let failed: Vec<PathBuf> = summary.failures.iter().map(|f| f.path.clone()).collect();
    assert_eq!(
        failed,
        vec![h.media_root().join("Mystery Folder"), h.media_root().join("Nothing Here")]
    );
}

#[tokio::test]
async fn closest_candidate_wins_over_provider_order() {
    let h = TestHarness::new();
    h.provider.script(
        "Naruto",
        ScriptedLookup::Candidates(vec![candidate(2, "Naruto Shippuden"), candidate(1, "Naruto")]),
    );
    h.touch("Naruto/01.mp4");

    let report = h
        .ingest
        .animes
        .ingest(&[h.media_root()], &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].anilist_id, 1);
    assert_eq!(h.animes()[0].title.preferred(), "Naruto");
}

#[tokio::test]
async fn release_tags_are_stripped_from_queries() {
    let h = TestHarness::new();
    h.provider.script(
        "Cowboy Bebop",
        ScriptedLookup::Candidates(vec![candidate(1, "Cowboy Bebop")]),
    );
    h.touch("[Judas] Cowboy Bebop [BD 1080p]/01.mkv");

    h.scan().await;
    assert_eq!(h.provider.queries.lock().as_slice(), ["Cowboy Bebop"]);
    let anime = h.animes().remove(0);
    assert_eq!(anime.anilist_id, 1);
    assert_eq!(
        anime.release_date,
        chrono::NaiveDate::from_ymd_opt(1998, 4, 3)
    );
}

#[tokio::test]
async fn unreachable_provider_fails_the_update() {
    let h = TestHarness::new();
    h.provider.script("Cowboy Bebop", ScriptedLookup::Unavailable);
    h.touch("Cowboy Bebop/01.mp4");
    let mut rx = h.events.subscribe();

    let err = h.library.update().await.unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)));
    assert!(matches!(
        TestHarness::wait_for_scan_end(&mut rx).await,
        EventPayload::ScanFailed { .. }
    ));
    assert_eq!(h.library.status(), LibraryStatus::Idle);
}

#[tokio::test]
async fn failed_transcode_leaves_no_record() {
    let h = TestHarness::new();
    let broken = h.touch("Cowboy Bebop/03.mkv");
    h.touch("Cowboy Bebop/04.mkv");
    h.toolkit.unsupported_video("03.mkv");
    h.toolkit.failing_transcode("03.mkv");

    let summary = h.library.update().await.unwrap();
    assert_eq!(summary.episodes_created, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path, broken);
    assert!(broken.exists());
    assert!(h.episodes().iter().all(|e| e.file_path != broken));
}

#[tokio::test]
async fn container_alone_triggers_transcode() {
    let h = TestHarness::new();
    h.toolkit.unsupported_container("mkv");
    h.touch("Cowboy Bebop/01.mkv");
    h.touch("Cowboy Bebop/02.mp4");

    h.scan().await;
    let converted = h.episodes().into_iter().filter(|e| e.is_converted()).count();
    assert_eq!(converted, 1);
}

#[tokio::test]
async fn stored_hardware_setting_applies_to_transcodes() {
    let h = TestHarness::new();
    {
        let conn = get_conn(&h.pool).unwrap();
        settings::set_setting(&conn, settings::USE_HARDWARE_ACCELERATION, true).unwrap();
    }
    h.toolkit.unsupported_video("01.mkv");
    h.touch("Cowboy Bebop/01.mkv");

    h.scan().await;
    assert_eq!(h.toolkit.transcode_count(), 1);
    assert_eq!(h.toolkit.hardware_transcode_count(), 1);
}

#[tokio::test]
async fn sidecar_subtitles_are_attached() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mp4");
    h.touch("Cowboy Bebop/01.en.ass");
    h.touch("Cowboy Bebop/01.srt");
    h.touch("Cowboy Bebop/02.srt");

    h.scan().await;
    let episode = h.episodes().remove(0);
    let conn = get_conn(&h.pool).unwrap();
    let subs = subtitles::list_by_episode(&conn, episode.id).unwrap();
    assert_eq!(subs.len(), 2);
    assert!(subs.iter().any(|s| s.language.as_deref() == Some("en")));
}

#[tokio::test]
async fn sweep_removes_vanished_entries() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mp4");
    let gone = h.touch("Cowboy Bebop/02.mp4");
    h.touch("Trigun/01.mp4");
    h.scan().await;

    std::fs::remove_file(&gone).unwrap();
    std::fs::remove_dir_all(h.media_root().join("Trigun")).unwrap();

    let report = h.ingest.sweeper.sweep(false).await.unwrap();
    assert_eq!(report.animes_removed, 1);
    assert_eq!(report.episodes_removed, 2);
    assert_eq!(h.animes().len(), 1);
    assert_eq!(h.episodes().len(), 1);
}

#[tokio::test]
async fn concurrent_update_is_rejected() {
    let h = TestHarness::new();
    h.toolkit.set_delay(Duration::from_millis(200));
    h.touch("Cowboy Bebop/01.mp4");
    let mut rx = h.events.subscribe();

    h.library.start_update().unwrap();
    assert_eq!(h.library.status(), LibraryStatus::Updating);
    assert!(matches!(h.library.start_update(), Err(Error::Conflict(_))));

    assert!(matches!(
        TestHarness::wait_for_scan_end(&mut rx).await,
        EventPayload::ScanCompleted { episodes_created: 1, .. }
    ));
    assert_eq!(h.library.status(), LibraryStatus::Idle);
}

#[tokio::test]
async fn cancelled_update_reports_partial_progress() {
    let h = TestHarness::new();
    h.toolkit.set_delay(Duration::from_millis(400));
    for name in ["01.mp4", "02.mp4", "03.mp4"] {
        h.touch(&format!("Cowboy Bebop/{name}"));
    }
    let mut rx = h.events.subscribe();

    assert!(!h.library.cancel());
    h.library.start_update().unwrap();
    // Two slots: the first two episodes commit around 400 ms, the third is
    // still extracting its cover when the update is cancelled.
    tokio::time::sleep(Duration::from_millis(650)).await;
    assert!(h.library.cancel());

    let (animes_created, episodes_created) = match TestHarness::wait_for_scan_end(&mut rx).await {
        EventPayload::ScanCompleted {
            cancelled,
            animes_created,
            episodes_created,
            ..
        } => {
            assert!(cancelled);
            (animes_created, episodes_created)
        }
        other => panic!("unexpected {other:?}"),
    };
    // Wait for the status reset that follows the final event.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.library.status(), LibraryStatus::Idle);
    assert_eq!(animes_created, h.animes().len());
    assert!(episodes_created > 0);
    assert_eq!(episodes_created, h.episodes().len());
}

#[tokio::test]
async fn update_cancelled_before_any_episode_reports_none() {
    let h = TestHarness::new();
    h.toolkit.set_delay(Duration::from_secs(30));
    h.touch("Cowboy Bebop/01.mp4");
    h.touch("Cowboy Bebop/02.mp4");
    let mut rx = h.events.subscribe();

    h.library.start_update().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.library.cancel());

    match TestHarness::wait_for_scan_end(&mut rx).await {
        EventPayload::ScanCompleted {
            cancelled,
            episodes_created,
            ..
        } => {
            assert!(cancelled);
            assert_eq!(episodes_created, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.episodes().is_empty());
}
