/// Failures stay where they happen: a broken component, script or
/// template leaves a visible marker and everything around it still renders.
use crate::config::RenderOptions;
use crate::lifecycle::{InstanceState, LifecycleEvent};
use crate::renderer::RenderSession;
use crate::value::Value;
use tessera_bundle::RenderSource;
use tessera_common::{ComponentRecord, MemoryStore};

async fn render_literal(html: &str, js: &str) -> RenderSession<MemoryStore> {
    let mut session = RenderSession::new(MemoryStore::new());
    session.render(RenderSource::literal(html, "", js)).await;
    session
}

#[tokio::test]
async fn test_init_failure_stays_in_its_instance() {
    let store = MemoryStore::new()
        .with(ComponentRecord::new(
            "page",
            r#"<component-ref [id]="'broken'"></component-ref><component-ref [id]="'fine'"></component-ref>"#,
        ))
        .with(ComponentRecord::new("broken", "<p>broken</p>").with_script("ngOnInit() {\n  this.nothing();\n}"))
        .with(ComponentRecord::new("fine", "<p>{{msg}}</p>").with_script("msg = 'fine';"));

    let mut session = RenderSession::new(store);
    session.render(RenderSource::id("page")).await;

    let html = session.html();
    assert!(
        html.contains(concat!(
            r#"<p>broken</p><div class="tessera-error" data-error-kind="script">"#,
            "Script error in component 'broken': method 'nothing' is not defined</div>"
        )),
        "{}",
        html
    );
    assert!(html.contains("<p>fine</p>"));

    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.diagnostics()[0].component_id, "broken");
    assert!(session
        .journal()
        .iter()
        .any(|e| matches!(e, LifecycleEvent::InitHookFailed { .. })));
    assert!(session
        .instances()
        .all(|i| i.state == InstanceState::Initialized));
}

#[tokio::test]
async fn test_uncompilable_method_falls_back() {
    let mut session = render_literal(
        r#"<button (click)="alertUser('hi')">go</button>"#,
        "alertUser(msg) {\n  const f = (x) => x;\n}",
    )
    .await;

    assert_eq!(session.diagnostics().len(), 1);
    assert!(session.html().contains("failed to compile 'alertUser'"));

    let button = session.document().find_by_attr(session.view(), "data-event-click")[0];
    assert_eq!(session.dispatch(button, "click", Value::Undefined), 1);
    assert_eq!(session.host().alerts(), vec!["hi"]);
}

#[tokio::test]
async fn test_template_error_left_as_comment() {
    let session = render_literal("<ul>{{#each items}}<li>{{this}}</li></ul>", "").await;
    let html = session.html();
    assert!(
        html.contains("template error: unclosed #each block 'items' at offset 4"),
        "{}",
        html
    );
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn test_binding_error_reported() {
    let session = render_literal(r#"<p [title]="broken(">x</p><p>{{ok}}</p>"#, "ok = 'still here';").await;

    assert_eq!(session.diagnostics().len(), 1);
    let html = session.html();
    assert!(html.contains(r#"<p data-bind-title="broken(">x</p><p>still here</p>"#), "{}", html);
    assert!(html.contains(r#"data-error-kind="script""#));
}

#[tokio::test]
async fn test_runaway_hook_hits_iteration_limit() {
    let mut session = RenderSession::new(MemoryStore::new()).with_options(RenderOptions {
        iteration_limit: 50,
        ..RenderOptions::default()
    });
    session
        .render(RenderSource::literal("<p>x</p>", "", "ngOnInit() {\n  while (true) { }\n}"))
        .await;

    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.diagnostics()[0].message, "iteration limit of 50 steps exceeded");
    assert!(session.html().starts_with("<p>x</p>"));
}

#[tokio::test]
async fn test_unknown_nested_container_reported() {
    let mut session = render_literal(
        r#"<div [innerHTML]="content"></div>"#,
        r#"content = '<div data-nested-instance="x1" data-component-id="ghost"></div>';"#,
    )
    .await;

    assert!(session.journal().iter().any(|e| matches!(
        e,
        LifecycleEvent::InstanceFailed { component_id, .. } if component_id == "ghost"
    )));
    assert!(session.html().contains(concat!(
        r#"<div data-nested-instance="x1" data-component-id="ghost">"#,
        r#"<div class="tessera-error" data-error-kind="script">Component 'ghost' is not part of this render</div>"#
    )));

    // Later walks do not report it again
    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.initialize_nested(), 0);
}
