//! Integration tests for tracking, staleness and reloading.

use hotswap_modules::core::{ManualClock, ModuleRegistry, unix_secs};
use hotswap_modules::engine::Module;
use hotswap_modules::prelude::*;
use hotswap_modules::resolvers::{BuiltinResolver, SearchContext};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

fn write_module(root: &Path, relative: &str, body: &str, mtime: u64) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    set_mtime(&path, mtime);
    path
}

struct Harness {
    dir: TempDir,
    clock: Arc<ManualClock>,
    reloader: HotReloader<ConfigEngine>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_unix_secs(100));
        let reloader = HotReloader::builder()
            .with_clock(clock.clone())
            .with_search_path(dir.path())
            .build(Arc::new(ConfigEngine::new()));
        Self { dir, clock, reloader }
    }

    fn stale(&self) -> BTreeSet<String> {
        self.reloader.list_stale()
    }
}

fn set_of(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_stale_lifecycle_of_dotted_module() {
    let h = Harness::new();
    let path = write_module(h.dir.path(), "pkg/mod.yaml", "answer: 1\n", 90);

    let module: Arc<Module> = h.reloader.import("pkg.mod").unwrap();
    let tracked = h.reloader.list_tracked();
    let entry = &tracked[0];
    assert_eq!(entry.identity, "pkg.mod");
    assert_eq!(entry.source, path.canonicalize().unwrap());
    assert_eq!(entry.loaded_at, unix_secs(100));
    assert!(h.stale().is_empty());

    fs::write(&path, "answer: 2\n").unwrap();
    set_mtime(&path, 150);
    assert_eq!(h.stale(), set_of(&["pkg.mod"]));

    h.clock.set(unix_secs(160));
    assert_eq!(h.reloader.reload("pkg.mod").unwrap(), ReloadOutcome::Reloaded);

    assert!(h.reloader.registry().get("pkg.mod").unwrap().loaded_at >= unix_secs(150));
    assert!(h.stale().is_empty());
    assert_eq!(module.get_as::<i64>("answer"), Some(2));
    assert_eq!(module.generation(), 2);
}

#[test]
fn test_equal_mtime_is_fresh() {
    let h = Harness::new();
    write_module(h.dir.path(), "tie.yaml", "x: 1\n", 100);
    h.reloader.import("tie").unwrap();
    assert!(h.stale().is_empty());
}

#[test]
fn test_failed_reload_is_isolated() {
    let h = Harness::new();
    let a = write_module(h.dir.path(), "a.yaml", "value: a1\n", 90);
    let b = write_module(h.dir.path(), "b.yaml", "value: b1\n", 90);
    write_module(h.dir.path(), "c.yaml", "value: c1\n", 90);

    let module_a = h.reloader.import("a").unwrap();
    let module_b = h.reloader.import("b").unwrap();
    h.reloader.import("c").unwrap();

    fs::write(&a, "value: [unclosed\n").unwrap();
    set_mtime(&a, 150);
    fs::write(&b, "value: b2\n").unwrap();
    set_mtime(&b, 150);
    h.clock.set(unix_secs(200));

    let report = h.reloader.reload_all_stale();
    assert_eq!(report.reloaded, vec!["b"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].identity, "a");
    assert!(matches!(report.failures[0].error, ReloadError::Execution { .. }));

    // A keeps its old exports and stays stale; B is fresh with new exports
    assert_eq!(module_a.get_as::<String>("value").unwrap(), "a1");
    assert_eq!(module_b.get_as::<String>("value").unwrap(), "b2");
    assert_eq!(h.reloader.registry().get("a").unwrap().loaded_at, unix_secs(100));
    assert_eq!(h.reloader.registry().get("b").unwrap().loaded_at, unix_secs(200));
    assert_eq!(h.stale(), set_of(&["a"]));

    // Fixing A and retrying clears it
    fs::write(&a, "value: a2\n").unwrap();
    set_mtime(&a, 210);
    h.clock.set(unix_secs(220));
    let report = h.reloader.reload_all_stale();
    assert!(report.is_success());
    assert_eq!(report.reloaded, vec!["a"]);
    assert_eq!(module_a.get_as::<String>("value").unwrap(), "a2");
    assert!(h.stale().is_empty());
}

#[test]
fn test_sourceless_resolution_succeeds_untracked() {
    let dir = TempDir::new().unwrap();
    let reloader = HotReloader::builder()
        .with_resolver(BuiltinResolver::new().with_module("sys", [("platform", "test")]))
        .with_search_path(dir.path())
        .build(Arc::new(ConfigEngine::new()));

    let resolution = reloader.resolve("sys").unwrap().unwrap();
    assert!(resolution.source().is_none());
    assert!(resolution.payload::<hotswap_modules::engine::Exports>().is_some());

    let module = reloader.import("sys").unwrap();
    assert_eq!(module.get_as::<String>("platform").unwrap(), "test");
    assert!(reloader.registry().is_empty());
    assert!(reloader.list_stale().is_empty());
}

#[test]
fn test_concurrent_first_imports_track_once() {
    let h = Arc::new(Harness::new());
    write_module(h.dir.path(), "shared.yaml", "n: 1\n", 90);
    let before = h.reloader.list_tracked().len();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.reloader.import("shared").unwrap()
            })
        })
        .collect();

    let modules: Vec<Arc<Module>> = handles.into_iter().map(|t| t.join().unwrap()).collect();

    assert_eq!(h.reloader.list_tracked().len(), before + 1);
    for module in &modules[1..] {
        assert!(Arc::ptr_eq(module, &modules[0]));
    }
}

#[test]
fn test_concurrent_record_if_absent() {
    let registry = Arc::new(ModuleRegistry::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.record_if_absent("fresh.unit", format!("/tmp/fresh{i}.yaml")).unwrap()
            })
        })
        .collect();

    let inserted: usize = handles.into_iter().map(|t| t.join().unwrap() as usize).sum();
    assert_eq!(inserted, 1);
    assert_eq!(registry.all_entries().len(), 1);
}

#[test]
fn test_unloaded_module_is_neither_stale_nor_reloaded() {
    let h = Harness::new();
    let path = write_module(h.dir.path(), "gone.yaml", "x: 1\n", 90);
    h.reloader.import("gone").unwrap();
    h.reloader.engine().unload("gone");

    set_mtime(&path, 150);
    assert!(h.stale().is_empty());
    assert_eq!(h.reloader.reload("gone").unwrap(), ReloadOutcome::NotLoaded);
    assert_eq!(h.reloader.list_tracked().len(), 1);
}

#[test]
fn test_deleted_source_is_skipped() {
    let h = Harness::new();
    let path = write_module(h.dir.path(), "temp.yaml", "x: 1\n", 90);
    h.reloader.import("temp").unwrap();
    fs::remove_file(&path).unwrap();
    assert!(h.stale().is_empty());
    assert!(h.reloader.reload_all_stale().is_empty());
}

#[test]
fn test_search_context_paths_take_priority() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_module(first.path(), "dup.yaml", "from: first\n", 90);
    write_module(second.path(), "dup.yaml", "from: second\n", 90);

    let reloader = HotReloader::builder()
        .with_search_path(first.path())
        .with_search_path(second.path())
        .build(Arc::new(ConfigEngine::new()));

    let module = reloader.import("dup").unwrap();
    assert_eq!(module.get_as::<String>("from").unwrap(), "first");
    assert_eq!(
        reloader.search_context().search_paths,
        SearchContext::new()
            .with_search_path(first.path())
            .with_search_path(second.path())
            .search_paths
    );
}

#[test]
fn test_subscribers_observe_reloads() {
    let h = Harness::new();
    let path = write_module(h.dir.path(), "watched.yaml", "x: 1\n", 90);
    h.reloader.import("watched").unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let subscription = h.reloader.subscribe(move |event| {
        seen_clone.lock().push(event.identity.clone());
    });

    set_mtime(&path, 150);
    h.clock.set(unix_secs(200));
    h.reloader.reload_all_stale();
    assert_eq!(*seen.lock(), vec!["watched"]);

    drop(subscription);
    set_mtime(&path, 250);
    h.clock.set(unix_secs(300));
    h.reloader.reload_all_stale();
    assert_eq!(seen.lock().len(), 1);
}
