/// Script behaviour seen through a render session: handlers, change
/// notifications and host side effects.
use crate::host::{ConsoleLevel, HostEffect, HostEnv};
use crate::lifecycle::LifecycleEvent;
use crate::renderer::RenderSession;
use crate::value::Value;
use serde_json::json;
use tessera_bundle::RenderSource;
use tessera_common::{ComponentRecord, MemoryStore};

async fn render_literal(html: &str, js: &str) -> RenderSession<MemoryStore> {
    let mut session = RenderSession::new(MemoryStore::new());
    session.render(RenderSource::literal(html, "", js)).await;
    session
}

fn first_with(session: &RenderSession<MemoryStore>, attr: &str) -> crate::dom::NodeId {
    session.document().find_by_attr(session.view(), attr)[0]
}

#[tokio::test]
async fn test_click_updates_view() {
    let mut session = render_literal(
        r#"<button (click)="increment(2)">+</button><span>{{count}}</span>"#,
        "count = 0;\nincrement(n) {\n  this.count += n;\n}",
    )
    .await;
    assert!(session.html().contains("<span>0</span>"));

    let button = first_with(&session, "data-event-click");
    assert_eq!(session.dispatch(button, "click", Value::Undefined), 1);
    assert!(session.html().contains("<span>2</span>"), "{}", session.html());

    session.dispatch(button, "click", Value::Undefined);
    assert!(session.html().contains("<span>4</span>"));
    assert!(session.diagnostics().is_empty());
}

#[tokio::test]
async fn test_single_line_script_handles_clicks() {
    let mut session = render_literal(
        r#"<button (click)="inc()">+</button><span>{{count}}</span>"#,
        "count = 0; inc() { this.count = this.count + 1; }",
    )
    .await;
    assert!(session.html().contains("<span>0</span>"), "{}", session.html());

    let button = first_with(&session, "data-event-click");
    assert_eq!(session.dispatch(button, "click", Value::Undefined), 1);
    assert!(session.html().contains("<span>1</span>"), "{}", session.html());
    assert!(session.diagnostics().is_empty());
}

#[tokio::test]
async fn test_script_names_in_attributes_are_interpolated() {
    let mut session = render_literal(
        r#"<a title="{{label}}" (click)="rename()">{{label}}</a>"#,
        "label = 'Hi';\nrename() {\n  this.label = 'Bye';\n}",
    )
    .await;
    assert!(
        session.html().contains(r#"<a title="Hi" data-event-click="rename()">Hi</a>"#),
        "{}",
        session.html()
    );

    let link = first_with(&session, "data-event-click");
    session.dispatch(link, "click", Value::Undefined);
    assert!(
        session.html().contains(r#"<a title="Bye" data-event-click="rename()">Bye</a>"#),
        "{}",
        session.html()
    );
}

#[tokio::test]
async fn test_event_payload_reaches_handler() {
    let mut session = render_literal(
        r#"<input (input)="setName($event.value)"><p>{{name}}</p>"#,
        "name = '';\nsetName(value) {\n  this.name = value;\n}",
    )
    .await;

    let input = first_with(&session, "data-event-input");
    session.dispatch(input, "input", Value::from(json!({"value": "Ada"})));

    assert!(session.html().ends_with("<p>Ada</p>"), "{}", session.html());
    assert_eq!(
        session.root_instance().and_then(|i| i.context.get("name")),
        Some(&Value::string("Ada"))
    );
}

#[tokio::test]
async fn test_events_bubble_across_instances() {
    let store = MemoryStore::new()
        .with(
            ComponentRecord::new(
                "page",
                r#"<div (click)="outer()"><component-ref [id]="'child'"></component-ref></div>"#,
            )
            .with_script("clicks = 0;\nouter() {\n  this.clicks++;\n}"),
        )
        .with(
            ComponentRecord::new("child", r#"<button (click)="inner()">x</button>"#)
                .with_script("inner() {\n  console.log('inner');\n}"),
        );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    let targets = session.document().find_by_attr(session.view(), "data-event-click");
    assert_eq!(targets.len(), 2);
    let button = targets[1];
    assert_eq!(session.document().tag(button), Some("button"));

    assert_eq!(session.dispatch(button, "click", Value::Undefined), 2);
    assert_eq!(session.host().console_lines(), vec!["inner"]);
    assert_eq!(
        session.root_instance().and_then(|i| i.context.get("clicks")),
        Some(&Value::Number(1.0))
    );

    // Clicking the outer element does not reach the child
    assert_eq!(session.dispatch(targets[0], "click", Value::Undefined), 1);
}

#[tokio::test]
async fn test_detect_changes_refreshes_before_children_exist() {
    let store = MemoryStore::new()
        .with(
            ComponentRecord::new("page", r#"<h1>{{title}}</h1><component-ref [id]="'child'"></component-ref>"#)
                .with_script("title = 'loading';\nngOnInit() {\n  this.title = 'ready';\n  this.cdr.detectChanges();\n}"),
        )
        .with(ComponentRecord::new("child", "<i>child</i>"));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    assert!(session.html().starts_with("<h1>ready</h1>"), "{}", session.html());

    let root_id = session.root_instance().map(|i| i.id.clone()).unwrap();
    let journal = session.journal();
    let refreshed = journal
        .iter()
        .position(|e| *e == LifecycleEvent::Refreshed { instance_id: root_id.clone() })
        .unwrap();
    let child_created = journal
        .iter()
        .position(|e| matches!(e, LifecycleEvent::ContextCreated { component_id, .. } if component_id == "child"))
        .unwrap();
    assert!(refreshed < child_created);
}

#[tokio::test]
async fn test_init_changes_reach_view_after_queue_drains() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new("page", r#"<component-ref [id]="'label'"></component-ref>"#))
        .with(
            ComponentRecord::new("label", "<b>{{text}}</b>")
                .with_script("text = 'unset';\nngOnInit() {\n  this.text = 'set';\n  this.cdr.markForCheck();\n}"),
        );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    assert!(session.html().contains("<b>set</b>"), "{}", session.html());

    let child_id = session
        .instances()
        .find(|i| i.component_id == "label")
        .map(|i| i.id.clone())
        .unwrap();
    let journal = session.journal();
    let init = journal
        .iter()
        .position(|e| *e == LifecycleEvent::InitHookRan { instance_id: child_id.clone() })
        .unwrap();
    let refreshed = journal
        .iter()
        .rposition(|e| *e == LifecycleEvent::Refreshed { instance_id: child_id.clone() })
        .unwrap();
    assert!(init < refreshed);
    assert_eq!(session.pending_tasks(), 0);
}

#[tokio::test]
async fn test_handler_side_effects_go_through_host() {
    let mut session = render_literal(
        r#"<button (click)="notify()">save</button>"#,
        "notify() {\n  alert('saved');\n  window.open('https://example.com/help');\n  console.warn('done');\n}",
    )
    .await;

    let button = first_with(&session, "data-event-click");
    session.dispatch(button, "click", Value::Undefined);

    assert_eq!(
        session.host().effects(),
        &[
            HostEffect::Alert {
                message: "saved".into()
            },
            HostEffect::Open {
                url: "https://example.com/help".into()
            },
            HostEffect::Console {
                level: ConsoleLevel::Warn,
                message: "done".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_class_binding_toggles() {
    let mut session = render_literal(
        r#"<div class="box" [class]="{active: on}" (click)="toggle()">x</div>"#,
        "on = false;\ntoggle() {\n  this.on = !this.on;\n}",
    )
    .await;

    let div = first_with(&session, "data-event-click");
    assert_eq!(session.document().attr(div, "class"), Some("box"));

    session.dispatch(div, "click", Value::Undefined);
    assert_eq!(session.document().attr(div, "class"), Some("box active"));

    session.dispatch(div, "click", Value::Undefined);
    assert_eq!(session.document().attr(div, "class"), Some("box"));
}

#[tokio::test]
async fn test_string_encoded_data_feeds_each_block() {
    let store = MemoryStore::new().with(
        ComponentRecord::new("list", "<ul>{{#each items}}<li>{{this}}</li>{{/each}}</ul>")
            .with_data(json!("{\"items\": [\"a\", \"b\"]}")),
    );

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("list")).await;

    assert_eq!(session.html(), "<ul><li>a</li><li>b</li></ul>");
}

#[derive(Default)]
struct CountingHost {
    alerts: usize,
    navigations: Vec<String>,
}

impl HostEnv for CountingHost {
    fn alert(&mut self, _message: &str) {
        self.alerts += 1;
    }

    fn console(&mut self, _level: ConsoleLevel, _message: &str) {}

    fn open(&mut self, _url: &str) {}

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }
}

#[tokio::test]
async fn test_custom_host_receives_effects() {
    let mut session = RenderSession::with_host(MemoryStore::new(), CountingHost::default());
    session
        .render(RenderSource::literal(
            "<p>x</p>",
            "",
            "ngOnInit() {\n  alert('one');\n  alert('two');\n  navigate('/next');\n}",
        ))
        .await;

    assert_eq!(session.host().alerts, 2);
    assert_eq!(session.host().navigations, vec!["/next"]);

    session.host_mut().alerts = 0;
    assert_eq!(session.host().alerts, 0);
}
