/// End-to-end render tests: resolution, composition, mounting and the
/// lifecycle ordering of the instances behind a view.
use crate::lifecycle::{InstanceState, LifecycleEvent};
use crate::renderer::RenderSession;
use crate::value::Value;
use serde_json::json;
use tessera_bundle::RenderSource;
use tessera_common::{ComponentRecord, MemoryStore, StoreError};

fn position(journal: &[LifecycleEvent], wanted: &LifecycleEvent) -> usize {
    journal
        .iter()
        .position(|event| event == wanted)
        .unwrap_or_else(|| panic!("{:?} not in journal {:?}", wanted, journal))
}

fn instance_of<'a>(session: &'a RenderSession<MemoryStore>, component_id: &str) -> Vec<&'a str> {
    session
        .instances()
        .filter(|i| i.component_id == component_id)
        .map(|i| i.id.as_str())
        .collect()
}

#[tokio::test]
async fn test_render_nested_tree() {
    let store = MemoryStore::new()
        .with(
            ComponentRecord::new("page", r#"<h1>{{heading}}</h1><component-ref [id]="'card'"></component-ref>"#)
                .with_style("h1 { margin: 0; }")
                .with_data(json!({"heading": "Welcome"})),
        )
        .with(
            ComponentRecord::new("card", r#"<p class="card">{{title}}: {{count}}</p>"#)
                .with_script("title = 'Card';\ncount = 1;"),
        );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    let html = session.html();
    assert!(
        html.starts_with(r#"<style>h1 { margin: 0; }</style><h1>Welcome</h1><div data-nested-instance=""#),
        "{}",
        html
    );
    assert!(
        html.ends_with(r#"" data-component-id="card" class="tessera-nested"><p class="card">Card: 1</p></div>"#),
        "{}",
        html
    );

    assert_eq!(session.instances().count(), 2);
    assert!(session
        .instances()
        .all(|i| i.state == InstanceState::Initialized));
    assert_eq!(
        session.root_instance().map(|i| i.component_id.as_str()),
        Some("page")
    );
    assert!(session.diagnostics().is_empty());
    assert_eq!(session.pending_tasks(), 0);
}

#[tokio::test]
async fn test_root_init_runs_before_child_context_exists() {
    let store = MemoryStore::new()
        .with(
            ComponentRecord::new("page", r#"<component-ref [id]="'child'"></component-ref>"#)
                .with_script("ngOnInit() {\n  console.log('page init');\n}"),
        )
        .with(
            ComponentRecord::new("child", "<i>child</i>")
                .with_script("ngOnInit() {\n  console.log('child init');\n}"),
        );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    let root_id = session.root_instance().map(|i| i.id.clone()).unwrap();
    let child_id = instance_of(&session, "child")[0].to_string();
    let journal = session.journal();

    let root_init = position(journal, &LifecycleEvent::InitHookRan { instance_id: root_id });
    let child_created = position(
        journal,
        &LifecycleEvent::ContextCreated {
            instance_id: child_id.clone(),
            component_id: "child".into(),
        },
    );
    let child_init = position(journal, &LifecycleEvent::InitHookRan { instance_id: child_id });

    assert!(root_init < child_created);
    assert!(child_created < child_init);
    assert_eq!(session.host().console_lines(), vec!["page init", "child init"]);
}

#[tokio::test]
async fn test_nested_walk_is_idempotent() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new(
            "page",
            r#"<component-ref [id]="'a'"></component-ref><component-ref [id]="'a'"></component-ref>"#,
        ))
        .with(ComponentRecord::new("a", r#"<component-ref [id]="'b'"></component-ref>"#))
        .with(ComponentRecord::new("b", "<b>leaf</b>"));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;
    assert_eq!(session.instances().count(), 5);

    let journal_len = session.journal().len();
    assert_eq!(session.initialize_nested(), 0);
    assert_eq!(session.initialize_nested(), 0);
    assert_eq!(session.instances().count(), 5);
    assert_eq!(session.journal().len(), journal_len);

    // Shared components are fetched once, rendered per occurrence
    assert_eq!(session.store().fetch_count("a"), 1);
    assert_eq!(session.store().fetch_count("b"), 1);
    assert_eq!(instance_of(&session, "b").len(), 2);
}

#[tokio::test]
async fn test_partial_failure_isolated() {
    let mut store = MemoryStore::new()
        .with(ComponentRecord::new(
            "a",
            r#"<component-ref [id]="'b'"></component-ref><component-ref [id]="'c'"></component-ref>"#,
        ))
        .with(ComponentRecord::new("c", "<em>{{label}}</em>").with_data(json!({"label": "C here"})));
    store.fail(
        "b",
        StoreError::Unavailable {
            id: "b".into(),
            message: "timeout".into(),
        },
    );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("a")).await;

    let mut ids: Vec<_> = session.components().ids().collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "c"]);

    let html = session.html();
    assert!(html.starts_with(
        r#"<div class="tessera-placeholder" data-component-id="b">Component 'b' could not be fetched: timeout</div>"#
    ));
    assert!(html.contains("<em>C here</em>"));
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn test_cycle_terminates() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new("a", r#"A<component-ref [id]="'b'"></component-ref>"#))
        .with(ComponentRecord::new("b", r#"B<component-ref [id]="'a'"></component-ref>"#));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("a")).await;

    assert_eq!(session.store().fetch_count("a"), 1);
    assert_eq!(session.store().fetch_count("b"), 1);
    assert_eq!(session.components().len(), 2);
    assert!(session.html().contains("Circular reference to component 'a'"));
    assert_eq!(session.instances().count(), 2);
}

#[tokio::test]
async fn test_teardown_runs_every_destroy_hook_once() {
    let store = MemoryStore::new()
        .with(
            ComponentRecord::new(
                "page",
                concat!(
                    r#"<component-ref [id]="'ok'"></component-ref>"#,
                    r#"<component-ref [id]="'bad'"></component-ref>"#,
                    r#"<component-ref [id]="'ok'"></component-ref>"#
                ),
            )
            .with_script("ngOnDestroy() {\n  console.log('bye page');\n}"),
        )
        .with(ComponentRecord::new("ok", "ok").with_script("ngOnDestroy() {\n  console.log('bye ok');\n}"))
        .with(ComponentRecord::new("bad", "bad").with_script("ngOnDestroy() {\n  throw 'boom';\n}"));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;
    assert_eq!(session.instances().count(), 4);

    session.teardown();
    session.teardown();

    let journal = session.journal();
    let ran = journal
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::DestroyHookRan { .. }))
        .count();
    let failed: Vec<_> = journal
        .iter()
        .filter_map(|e| match e {
            LifecycleEvent::DestroyHookFailed { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    let destroyed = journal
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::Destroyed { .. }))
        .count();

    assert_eq!(ran, 3);
    assert_eq!(failed, vec!["uncaught boom"]);
    assert_eq!(destroyed, 4);
    assert_eq!(session.instances().count(), 0);

    // Children go before the page that contains them
    let lines = session.host().console_lines();
    assert_eq!(lines, vec!["bye ok", "bye ok", "bye page"]);
}

#[tokio::test]
async fn test_rerender_replaces_previous_tree() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new("one", "<p>one</p>").with_script("ngOnDestroy() {\n  console.log('one gone');\n}"))
        .with(ComponentRecord::new("two", "<p>two</p>"));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("one")).await;
    let first_root = session.root_instance().map(|i| i.id.clone()).unwrap();

    session.render(RenderSource::id("two")).await;
    assert_eq!(session.html(), "<p>two</p>");
    assert_eq!(session.instances().count(), 1);
    assert!(session.instance(&first_root).is_none());
    assert_eq!(session.host().console_lines(), vec!["one gone"]);
}

#[tokio::test]
async fn test_missing_root_replaces_view_with_error() {
    let mut session = RenderSession::new(MemoryStore::new());
    session.render(RenderSource::id("missing")).await;

    assert_eq!(
        session.html(),
        r#"<div class="tessera-error tessera-render-error">Render failed: Root component 'missing' not found</div>"#
    );
    assert!(session.last_error().is_some());
    assert_eq!(session.instances().count(), 0);
}

#[tokio::test]
async fn test_literal_source_resolves_nested_references() {
    let store = MemoryStore::new().with(ComponentRecord::new("badge", "<b>{{text}}</b>").with_data(json!("{\"text\": \"new\"}")));

    let mut session = RenderSession::new(store);
    session
        .render(RenderSource::literal(
            r#"<section>{{greeting}} <component-ref [id]="badge"></component-ref></section>"#,
            ".x { color: red; }",
            "greeting = 'Hello';",
        ))
        .await;

    let html = session.html();
    assert!(html.starts_with("<style>.x { color: red; }</style><section>Hello <div"), "{}", html);
    assert!(html.contains("<b>new</b>"));
    assert_eq!(
        session.root_instance().and_then(|i| i.context.get("greeting")),
        Some(&Value::string("Hello"))
    );
}
