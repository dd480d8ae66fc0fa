use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tessera_common::{ComponentRecord, DirectoryStore, MemoryStore};
use tessera_evaluator::{LifecycleEvent, RenderOptions, RenderSession, RenderSource, Value};

fn component_dir(name: &str, files: &[(&str, serde_json::Value)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tessera-session-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    for (id, record) in files {
        std::fs::write(dir.join(format!("{}.json", id)), record.to_string()).unwrap();
    }
    dir
}

#[tokio::test]
async fn renders_components_stored_as_files() {
    let dir = component_dir(
        "files",
        &[
            (
                "home",
                json!({
                    "html": "<h1>{{title}}</h1><component-ref [id]=\"'counter'\"></component-ref>",
                    "css": "",
                    "js": "",
                    "data": "{\"title\": \"Home\"}"
                }),
            ),
            (
                "counter",
                json!({
                    "html": "<button (click)=\"add()\">{{n}}</button>",
                    "js": "n = 0;\nadd() {\n  this.n++;\n}"
                }),
            ),
        ],
    );

    let mut session = RenderSession::new(DirectoryStore::new(&dir));
    session.render(RenderSource::id("home")).await;

    let html = session.html();
    assert!(html.starts_with("<h1>Home</h1>"), "{}", html);
    assert!(html.contains(r#"<button data-event-click="add()">0</button>"#), "{}", html);

    let button = session.document().find_by_attr(session.view(), "data-event-click")[0];
    session.dispatch(button, "click", Value::Undefined);
    assert!(session.html().contains(r#"<button data-event-click="add()">1</button>"#));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn missing_file_becomes_placeholder() {
    let dir = component_dir(
        "missing",
        &[(
            "home",
            json!({"html": "<main><component-ref [id]=\"'gone'\"></component-ref></main>"}),
        )],
    );

    let mut session = RenderSession::new(DirectoryStore::new(&dir));
    session.render(RenderSource::id("home")).await;

    assert_eq!(
        session.html(),
        r#"<main><div class="tessera-placeholder" data-component-id="gone">Component 'gone' not found</div></main>"#
    );
    assert!(session.last_error().is_none());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn slow_store_still_renders_every_component() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new(
            "page",
            r#"<component-ref [id]="'a'"></component-ref><component-ref [id]="'b'"></component-ref>"#,
        ))
        .with(ComponentRecord::new("a", "<i>a</i>"))
        .with(ComponentRecord::new("b", "<i>b</i>"))
        .with_delay(Duration::from_millis(5));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    assert_eq!(session.instances().count(), 3);
    assert_eq!(session.store().total_fetches(), 3);
}

#[tokio::test]
async fn journal_serializes_as_tagged_events() {
    let mut session = RenderSession::new(MemoryStore::new()).with_options(RenderOptions {
        debug_comments: true,
        ..RenderOptions::default()
    });
    session
        .render(RenderSource::literal("<p>{{x}}</p>", "", "x = 1;\nngOnInit() { }"))
        .await;

    let root_id = session.root_instance().map(|i| i.id.clone()).unwrap();
    assert_eq!(
        session.journal()[..2],
        [
            LifecycleEvent::ContextCreated {
                instance_id: root_id.clone(),
                component_id: String::new(),
            },
            LifecycleEvent::InitHookRan {
                instance_id: root_id.clone(),
            },
        ]
    );

    let encoded = serde_json::to_value(&session.journal()[1]).unwrap();
    assert_eq!(encoded, json!({"event": "initHookRan", "instance_id": root_id}));
}
