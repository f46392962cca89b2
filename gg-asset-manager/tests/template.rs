mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gg_asset_manager::{
    AssetError, AssetId, AssetManager, AssetState, DeviceHandle, EntityId, MemorySource,
    SceneGraph, Template, Texture,
};
use gg_util::parking_lot::Mutex;
use serde_json::{json, Value};

use common::{hooked_manager, png, pump_until, wait_for, Gate, GatedTextureLoader};

fn source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_file("a.png", png(2, 2))
            .with_file("b.png", png(8, 8))
            .with_file("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
    )
}

fn template(assets: Value) -> String {
    json!({
        "assets": assets,
        "root": { "name": "crate", "children": [{ "mesh": "mesh" }] },
    })
    .to_string()
}

#[derive(Default)]
struct RecordingScene {
    spawned: Vec<(Value, EntityId)>,
}

impl SceneGraph for RecordingScene {
    fn instantiate(&mut self, fragment: &Value, target: EntityId) -> bool {
        self.spawned.push((fragment.clone(), target));
        true
    }
}

#[test]
fn test_waits_for_every_dependency() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "a", "kind": "texture", "path": "a.png", "async": true },
            { "id": "b", "kind": "texture", "path": "b.png", "async": true },
        ])),
    );

    let gate = Gate::new();
    let manager = AssetManager::builder()
        .loader::<Texture, _>(GatedTextureLoader::new(&gate))
        .build(source)
        .unwrap();

    let scene = manager.load_async::<Template, _>("scene", "scene.json").unwrap();
    pump_until(&manager, || manager.has("a") && manager.has("b"));

    gate.release("a.png");
    let a = manager.get("a").unwrap();
    pump_until(&manager, || a.is_ready());
    for _ in 0..5 {
        manager.update();
    }

    assert_eq!(scene.state(), AssetState::Loading);
    assert!(manager.is_loading("b"));
    assert!(!scene.get().all_dependencies_ready(&manager));

    gate.release("b.png");
    pump_until(&manager, || scene.is_ready());

    let expected: [AssetId; 2] = ["a".into(), "b".into()];
    assert_eq!(scene.get().references(), expected);
    assert!(scene.get().all_dependencies_ready(&manager));
}

#[test]
fn test_sync_load_blocks_until_ready() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "mesh", "kind": "model", "path": "tri.obj" },
            { "id": "albedo", "kind": "texture", "path": "b.png", "async": true },
        ])),
    );
    let manager = AssetManager::new(source).unwrap();

    let scene = manager.load::<Template, _>("scene", "scene.json").unwrap();

    assert!(scene.is_ready());
    assert!(manager.get("mesh").unwrap().is_ready());
    assert_eq!(
        manager.get_typed::<Texture>("albedo").unwrap().get().size(),
        (8, 8)
    );
    assert_eq!(scene.get().nested.len(), 2);
}

#[test]
fn test_sync_load_reports_failed_dependency() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "mesh", "kind": "model", "path": "tri.obj" },
            { "id": "gone", "kind": "texture", "path": "gone.png", "async": true },
        ])),
    );
    let manager = AssetManager::new(source).unwrap();

    let error = manager.load::<Template, _>("scene", "scene.json").unwrap_err();
    assert_eq!(
        error,
        AssetError::DependencyFailed {
            id: "scene".into(),
            dependency: "gone".into(),
        }
    );

    let scene = manager.get_typed::<Template>("scene").unwrap();
    assert!(scene.is_loading());
    assert_eq!(scene.get().failed_dependency(&manager), Some(AssetId::from("gone")));
}

#[test]
fn test_sync_load_waits_for_background_template() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "mesh", "kind": "model", "path": "tri.obj" },
            { "id": "albedo", "kind": "texture", "path": "b.png", "async": true },
        ])),
    );
    let manager = AssetManager::new(source).unwrap();

    let background = manager.load_async::<Template, _>("scene", "scene.json").unwrap();
    let scene = manager.load::<Template, _>("scene", "scene.json").unwrap();

    assert_eq!(scene, background);
    assert!(scene.is_ready());
    assert!(manager.get("albedo").unwrap().is_ready());
}

#[test]
fn test_sync_load_of_background_template_reports_failed_dependency() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "gone", "kind": "texture", "path": "gone.png", "async": true },
        ])),
    );
    let manager = AssetManager::new(source).unwrap();

    let background = manager.load_async::<Template, _>("scene", "scene.json").unwrap();
    let error = manager.load::<Template, _>("scene", "scene.json").unwrap_err();

    assert_eq!(
        error,
        AssetError::DependencyFailed {
            id: "scene".into(),
            dependency: "gone".into(),
        }
    );
    assert!(background.is_loading());
}

#[test]
fn test_sync_load_inside_update_is_rejected() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([{ "id": "mesh", "kind": "model", "path": "tri.obj" }])),
    );

    let result = Arc::new(Mutex::new(None));
    let slot = result.clone();
    let manager = hooked_manager(AssetManager::builder(), source, move |manager, _| {
        let mut slot = slot.lock();
        if slot.is_none() {
            *slot = Some(manager.load::<Template, _>("scene", "scene.json"));
        }
        Ok(DeviceHandle(1))
    });

    let texture = manager.load_async::<Texture, _>("tex", "a.png").unwrap();
    pump_until(&manager, || texture.is_ready());

    let result = result.lock().take().unwrap();
    assert_eq!(result.unwrap_err(), AssetError::ReentrantWait("scene".into()));

    // Outside of update the same template can be waited for.
    let scene = manager.load::<Template, _>("scene", "scene.json").unwrap();
    assert!(scene.is_ready());
}

#[test]
fn test_sync_load_on_another_thread() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "mesh", "kind": "model", "path": "tri.obj" },
            { "id": "albedo", "kind": "texture", "path": "b.png", "async": true },
        ])),
    );

    let gate = Gate::new();
    let manager = Arc::new(
        AssetManager::builder()
            .loader::<Texture, _>(GatedTextureLoader::new(&gate))
            .build(source)
            .unwrap(),
    );

    let worker = {
        let manager = manager.clone();
        thread::spawn(move || manager.load::<Template, _>("scene", "scene.json"))
    };

    wait_for(|| manager.has("albedo"));
    thread::sleep(Duration::from_millis(50));
    assert!(!worker.is_finished());
    assert_eq!(manager.get("scene").unwrap().state(), AssetState::Loading);

    gate.open();
    pump_until(&manager, || worker.is_finished());

    let scene = worker.join().unwrap().unwrap();
    assert!(scene.is_ready());
    assert!(manager.get("albedo").unwrap().is_ready());
}

#[test]
fn test_nested_kind_mismatch_fails_template() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([{ "id": "a", "kind": "model", "path": "tri.obj" }])),
    );
    let manager = AssetManager::new(source).unwrap();

    manager.load::<Texture, _>("a", "a.png").unwrap();
    let scene = manager.load::<Template, _>("scene", "scene.json").unwrap();

    assert!(scene.has_failed());
    assert!(matches!(
        scene.error(),
        Some(AssetError::KindMismatch { .. })
    ));
}

#[test]
fn test_self_reference_is_ignored() {
    let source = source();
    source.insert(
        "scene.json",
        template(json!([
            { "id": "scene", "kind": "template", "path": "scene.json" },
            { "id": "mesh", "kind": "model", "path": "tri.obj" },
        ])),
    );
    let manager = AssetManager::new(source).unwrap();

    let scene = manager.load::<Template, _>("scene", "scene.json").unwrap();

    assert!(scene.is_ready());
    assert_eq!(scene.get().references(), [AssetId::from("mesh")]);
}

#[test]
fn test_instantiate() {
    let source = source();
    source.insert("empty.json", template(json!([])));
    let manager = AssetManager::new(source).unwrap();

    let pending = manager.load_async::<Template, _>("pending", "empty.json").unwrap();
    let mut scene = RecordingScene::default();
    assert_eq!(
        pending.instantiate(&mut scene, EntityId(1)),
        Err(AssetError::NotReady("pending".into()))
    );
    assert!(scene.spawned.is_empty());

    let loaded = manager.load::<Template, _>("loaded", "empty.json").unwrap();
    assert_eq!(loaded.instantiate(&mut scene, EntityId(2)), Ok(true));
    assert_eq!(scene.spawned.len(), 1);
    assert_eq!(scene.spawned[0].0["name"], "crate");
    assert_eq!(scene.spawned[0].1, EntityId(2));

    pump_until(&manager, || pending.is_ready());
    assert_eq!(pending.instantiate(&mut scene, EntityId(3)), Ok(true));
    assert_eq!(scene.spawned.len(), 2);
}
