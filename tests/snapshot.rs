//! Snapshot-mode tests: repo listing, worker pool, grouped progress.

mod common;

use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Mutex};

use common::{CannedResponse, TestHub};
use hubget::{
    CachePaths, DownloadOptions, GroupProgress, HubClient, HubError, RepoId, RepoType,
    SnapshotOptions,
};
use tempfile::{TempDir, tempdir};

const COMMIT: &str = "abc123abc123abc123abc123abc123abc123abc1";
const REPO: &str = "openai/clip-vit-base-patch16";

fn repo() -> RepoId {
    REPO.parse().unwrap()
}

fn client_for(server: &TestHub, cache: &TempDir) -> HubClient {
    HubClient::new(CachePaths::new(cache.path())).with_endpoint(server.endpoint())
}

/// Register the repo listing plus metadata/content routes for each file.
fn route_snapshot(server: &TestHub, files: &[(&str, &[u8])]) {
    let siblings: Vec<String> = files
        .iter()
        .map(|(name, _)| format!("{{\"rfilename\": \"{}\"}}", name))
        .collect();
    let info = format!(
        "{{\"sha\": \"{}\", \"siblings\": [{}]}}",
        COMMIT,
        siblings.join(", ")
    );
    server.route(
        "GET",
        &format!("/api/models/{}", REPO),
        CannedResponse::new(200).body(info.as_bytes()),
    );

    for (name, body) in files {
        // Workers resolve against the pinned commit, not the branch name.
        let path = format!("/{}/resolve/{}/{}", REPO, COMMIT, name);
        server.route(
            "HEAD",
            &path,
            CannedResponse::new(200)
                .header("X-Repo-Commit", COMMIT)
                .header("ETag", &format!("\"tag-{}\"", name.replace('/', "-")))
                .header("Content-Length", &body.len().to_string()),
        );
        server.route("GET", &path, CannedResponse::new(200).body(body));
    }
}

#[test]
fn snapshot_downloads_every_file() {
    let server = TestHub::start();
    let files: Vec<(&str, &[u8])> = vec![
        ("config.json", b"{}"),
        ("tokenizer.json", b"{\"vocab\": {}}"),
        ("model.bin", b"weights-bytes"),
        ("onnx/model.onnx", b"onnx-bytes"),
        ("README.md", b"# model card"),
    ];
    route_snapshot(&server, &files);

    let cache = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let opts = SnapshotOptions {
        max_workers: 2,
        ..Default::default()
    };
    let snapshot_dir = client.snapshot_download(&repo(), &opts, None).unwrap();

    let paths = client.cache_paths().repo(&repo(), RepoType::Model);
    assert_eq!(snapshot_dir, paths.snapshot_dir(COMMIT));

    for (name, body) in &files {
        let path = snapshot_dir.join(name);
        assert_eq!(&fs::read(&path).unwrap(), body, "wrong contents for {}", name);
    }

    // The branch ref was cached from the listing.
    let ref_contents = fs::read_to_string(paths.refs_dir().join("main")).unwrap();
    assert_eq!(ref_contents.trim(), COMMIT);

    // One listing + one HEAD and one GET per file.
    assert_eq!(server.request_count(), 1 + 2 * files.len());
}

#[test]
fn snapshot_reports_grouped_progress_per_file() {
    let server = TestHub::start();
    let files: Vec<(&str, &[u8])> = vec![("config.json", b"{}"), ("model.bin", b"weights")];
    route_snapshot(&server, &files);

    let cache = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let finished: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let sink = Arc::clone(&finished);
    let progress: Arc<dyn GroupProgress> = Arc::new(move |name: &str, percent: f32| {
        if (percent - 100.0).abs() < f32::EPSILON {
            sink.lock().unwrap().insert(name.to_string());
        }
    });

    client
        .snapshot_download(&repo(), &SnapshotOptions::default(), Some(progress))
        .unwrap();

    let finished = finished.lock().unwrap();
    assert!(finished.contains("config.json"));
    assert!(finished.contains("model.bin"));
}

#[test]
fn snapshot_is_served_from_cache_when_offline() {
    let server = TestHub::start();
    let files: Vec<(&str, &[u8])> = vec![("config.json", b"{}")];
    route_snapshot(&server, &files);

    let cache = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let first = client
        .snapshot_download(&repo(), &SnapshotOptions::default(), None)
        .unwrap();
    let online_requests = server.request_count();

    let offline = SnapshotOptions {
        download: DownloadOptions {
            local_files_only: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let second = client.snapshot_download(&repo(), &offline, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(server.request_count(), online_requests);
}

#[test]
fn snapshot_offline_without_cache_is_not_found() {
    let server = TestHub::start();

    let cache = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let offline = SnapshotOptions {
        download: DownloadOptions {
            local_files_only: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = client.snapshot_download(&repo(), &offline, None);

    assert!(matches!(result, Err(HubError::NotFoundOffline)));
    assert_eq!(server.request_count(), 0);
}

#[test]
fn snapshot_surfaces_a_failing_file() {
    let server = TestHub::start();
    let files: Vec<(&str, &[u8])> = vec![("config.json", b"{}")];
    route_snapshot(&server, &files);

    // A second file is listed but has no routes: its metadata check gets a
    // 404 and there is no cached fallback.
    server.route(
        "GET",
        &format!("/api/models/{}", REPO),
        CannedResponse::new(200).body(
            format!(
                "{{\"sha\": \"{}\", \"siblings\": [{{\"rfilename\": \"config.json\"}}, \
                 {{\"rfilename\": \"missing.bin\"}}]}}",
                COMMIT
            )
            .as_bytes(),
        ),
    );

    let cache = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let result = client.snapshot_download(&repo(), &SnapshotOptions::default(), None);
    assert!(matches!(result, Err(HubError::NotFoundOnline)));
}

#[test]
fn snapshot_publishes_into_a_local_dir() {
    let server = TestHub::start();
    let files: Vec<(&str, &[u8])> = vec![("config.json", b"{}"), ("onnx/model.onnx", b"onnx")];
    route_snapshot(&server, &files);

    let cache = tempdir().unwrap();
    let local = tempdir().unwrap();
    let client = client_for(&server, &cache);

    let opts = SnapshotOptions {
        download: DownloadOptions {
            local_dir: Some(local.path().to_path_buf()),
            local_dir_use_symlinks: hubget::SymlinkPolicy::Never,
            ..Default::default()
        },
        ..Default::default()
    };
    let published = client.snapshot_download(&repo(), &opts, None).unwrap();

    assert_eq!(published, local.path().to_path_buf());
    assert_eq!(fs::read(local.path().join("config.json")).unwrap(), b"{}");
    assert_eq!(
        fs::read(local.path().join("onnx/model.onnx")).unwrap(),
        b"onnx"
    );
}
