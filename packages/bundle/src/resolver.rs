/// Component resolution
///
/// Fetches a root component and everything it references, transitively,
/// one tree level at a time. Siblings on a level are fetched concurrently
/// and joined before the next level starts. A failed branch is recorded
/// in the set and resolution carries on without it.
use crate::bundle::LoadedComponentSet;
use crate::scanner::scan_references;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tessera_common::{ComponentRecord, ComponentStore, StoreError};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Root component '{id}' not found")]
    RootNotFound { id: String },

    #[error("Root component could not be loaded: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => ResolveError::RootNotFound { id },
            other => ResolveError::Store(other),
        }
    }
}

/// What to render: a stored component or literal sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderSource {
    Id(String),
    Literal { html: String, css: String, js: String },
}

impl RenderSource {
    pub fn id(id: impl Into<String>) -> Self {
        RenderSource::Id(id.into())
    }

    pub fn literal(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        RenderSource::Literal {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }
}

/// A resolved render: the root record plus every record it reaches
#[derive(Debug, Clone)]
pub struct ResolvedTree {
    pub root: ComponentRecord,
    pub components: LoadedComponentSet,
}

/// Resolve a render source against a store
#[instrument(skip(store, source))]
pub async fn resolve_source<S: ComponentStore>(
    store: &S,
    source: &RenderSource,
) -> Result<ResolvedTree, ResolveError> {
    match source {
        RenderSource::Id(id) => {
            let components = resolve(store, id).await?;
            let root = components
                .root()
                .cloned()
                .ok_or_else(|| ResolveError::RootNotFound { id: id.clone() })?;
            Ok(ResolvedTree { root, components })
        }
        RenderSource::Literal { html, css, js } => {
            let root = ComponentRecord::new("", html.as_str())
                .with_style(css.as_str())
                .with_script(js.as_str());
            let components = resolve_markup(store, &root.markup).await;
            Ok(ResolvedTree { root, components })
        }
    }
}

/// Resolve a stored root component and everything it references
#[instrument(skip(store))]
pub async fn resolve<S: ComponentStore>(
    store: &S,
    root_id: &str,
) -> Result<LoadedComponentSet, ResolveError> {
    let mut record = store.fetch_component(root_id).await?;
    record.id = root_id.to_string();

    let mut set = LoadedComponentSet::new();
    set.set_root(root_id);
    let references = scan_references(&record.markup);
    set.set_references(root_id, references.clone());
    set.insert(record);

    let frontier = unknown_references(&set, &references);
    resolve_levels(store, &mut set, frontier).await;
    Ok(set)
}

/// Resolve the references of markup that is not itself stored
pub async fn resolve_markup<S: ComponentStore>(store: &S, markup: &str) -> LoadedComponentSet {
    let mut set = LoadedComponentSet::new();
    let frontier = unknown_references(&set, &scan_references(markup));
    resolve_levels(store, &mut set, frontier).await;
    set
}

async fn resolve_levels<S: ComponentStore>(
    store: &S,
    set: &mut LoadedComponentSet,
    mut frontier: Vec<String>,
) {
    let mut level = 1;

    while !frontier.is_empty() {
        debug!(level, count = frontier.len(), "fetching component level");

        let results = join_all(frontier.iter().map(|id| store.fetch_component(id))).await;

        // Settle the whole level before scanning so siblings referencing
        // each other are not queued again
        let mut loaded = Vec::new();
        for (id, result) in frontier.into_iter().zip(results) {
            match result {
                Ok(mut record) => {
                    record.id = id.clone();
                    set.insert(record);
                    loaded.push(id);
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "component fetch failed");
                    set.record_failure(id, err);
                }
            }
        }

        let mut next: Vec<String> = Vec::new();
        for id in loaded {
            let references = set
                .get(&id)
                .map(|record| scan_references(&record.markup))
                .unwrap_or_default();
            for reference in unknown_references(set, &references) {
                if !next.contains(&reference) {
                    next.push(reference);
                }
            }
            set.set_references(id, references);
        }

        frontier = next;
        level += 1;
    }
}

/// Distinct references not yet loaded or failed, in first-seen order
fn unknown_references(set: &LoadedComponentSet, references: &[String]) -> Vec<String> {
    let mut unknown: Vec<String> = Vec::new();
    for reference in references {
        if !set.is_known(reference) && !unknown.contains(reference) {
            unknown.push(reference.clone());
        }
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::MemoryStore;

    fn reference(id: &str) -> String {
        format!(r#"<component-ref [id]="'{}'"></component-ref>"#, id)
    }

    #[tokio::test]
    async fn test_cycle_terminates_and_fetches_once() {
        let store = MemoryStore::new()
            .with(ComponentRecord::new("A", format!("<div>{}</div>", reference("B"))))
            .with(ComponentRecord::new("B", format!("<div>{}</div>", reference("A"))));

        let set = resolve(&store, "A").await.unwrap();

        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(store.fetch_count("A"), 1);
        assert_eq!(store.fetch_count("B"), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let mut store = MemoryStore::new()
            .with(ComponentRecord::new(
                "A",
                format!("{}{}", reference("B"), reference("C")),
            ))
            .with(ComponentRecord::new("C", "<p>c</p>"));
        store.fail(
            "B",
            StoreError::Unavailable {
                id: "B".into(),
                message: "connection reset".into(),
            },
        );

        let set = resolve(&store, "A").await.unwrap();

        assert!(set.contains("A"));
        assert!(set.contains("C"));
        assert!(!set.contains("B"));
        assert!(set.failure("B").is_some());
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_deep_nesting_and_shared_children() {
        let store = MemoryStore::new()
            .with(ComponentRecord::new("root", format!("{}{}", reference("x"), reference("y"))))
            .with(ComponentRecord::new("x", reference("shared")))
            .with(ComponentRecord::new("y", format!("{}{}", reference("shared"), reference("x"))))
            .with(ComponentRecord::new("shared", reference("leaf")))
            .with(ComponentRecord::new("leaf", "<i>leaf</i>"));

        let set = resolve(&store, "root").await.unwrap();

        assert_eq!(set.len(), 5);
        for id in ["root", "x", "y", "shared", "leaf"] {
            assert_eq!(store.fetch_count(id), 1, "{} fetched more than once", id);
        }
        assert_eq!(set.references_of("y"), &["shared".to_string(), "x".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let store = MemoryStore::new();
        let err = resolve(&store, "nope").await.unwrap_err();
        assert_eq!(err, ResolveError::RootNotFound { id: "nope".into() });
    }

    #[tokio::test]
    async fn test_literal_source_resolves_nested_only() {
        let store = MemoryStore::new().with(ComponentRecord::new("child", "<b>c</b>"));
        let source = RenderSource::literal(format!("<main>{}</main>", reference("child")), "", "");

        let tree = resolve_source(&store, &source).await.unwrap();

        assert_eq!(tree.root.id, "");
        assert!(tree.components.contains("child"));
        assert!(tree.components.root_id().is_none());
    }

    #[tokio::test]
    async fn test_failed_id_not_refetched() {
        let store = MemoryStore::new()
            .with(ComponentRecord::new("a", format!("{}{}", reference("b"), reference("missing"))))
            .with(ComponentRecord::new("b", reference("missing")));

        let set = resolve(&store, "a").await.unwrap();

        assert!(set.failure("missing").is_some());
        assert_eq!(store.fetch_count("missing"), 1);
    }
}
