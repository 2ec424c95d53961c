//! Import a module, edit its source, and reload it in place.
//!
//! Run with: cargo run --example live_reload

use hotswap_modules::prelude::*;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("ModuleA.yaml");

    println!("---------- Creating ModuleA ----------");
    fs::write(&source, "greeting: Hello, world!\n")?;

    let reloader = HotReloader::builder()
        .with_search_path(dir.path())
        .build(Arc::new(ConfigEngine::new()));

    let module_a = reloader.import("ModuleA")?;
    let tracked: Vec<_> = reloader.list_tracked().into_iter().map(|m| m.identity).collect();
    println!("Loaded modules: {:?}\n", tracked);

    println!("---------- Reading ModuleA.greeting ----------");
    println!("{}\n", module_a.get_as::<String>("greeting").unwrap_or_default());

    // Some filesystems only keep whole-second modification times
    thread::sleep(Duration::from_millis(1100));

    println!("---------- Modifying ModuleA ----------");
    fs::write(&source, "greeting: Hello, new world!\n")?;

    println!("---------- Checking stale modules ----------");
    println!("Stale modules: {:?}\n", reloader.list_stale());

    println!("---------- Reloading ModuleA ----------");
    let outcome = reloader.reload("ModuleA")?;
    println!("{:?}\n", outcome);

    println!("---------- Reading ModuleA.greeting ----------");
    println!("{}", module_a.get_as::<String>("greeting").unwrap_or_default());
    println!("Stale modules: {:?}", reloader.list_stale());

    Ok(())
}
