//! Shared fixtures: a small domain model over the engine.
#![allow(dead_code)]

use chronik_core::{Aggregate, DomainEvent, Result, StateMap, StoreError, Value};
use chronik_runtime::{Application, Settings};
use uuid::Uuid;

pub const WORLD_TOPIC: &str = "world";
pub const WORLD_CREATED: &str = "world.created";
pub const WORLD_SOMETHING_HAPPENED: &str = "world.something_happened";
pub const PAGE_TOPIC: &str = "page";
pub const PAGE_CREATED: &str = "page.created";
pub const INDEX_TOPIC: &str = "index";
pub const INDEX_CREATED: &str = "index.created";

/// Build an application with the fixture topics registered.
pub async fn app_with(settings: Settings) -> Application {
    Application::builder(settings)
        .register_topic(WORLD_TOPIC)
        .register_topic(WORLD_CREATED)
        .register_topic(WORLD_SOMETHING_HAPPENED)
        .register_topic(PAGE_TOPIC)
        .register_topic(PAGE_CREATED)
        .register_topic(INDEX_TOPIC)
        .register_topic(INDEX_CREATED)
        .build()
        .await
        .expect("application builds")
}

pub async fn app() -> Application {
    app_with(Settings::default()).await
}

//─────────────────────────────
//  World
//─────────────────────────────

/// An aggregate whose history is the list of things made so.
#[derive(Debug)]
pub struct World {
    id: Uuid,
    version: u64,
    pub history: Vec<String>,
    pending: Vec<DomainEvent>,
}

impl World {
    pub fn create() -> Self {
        let event = DomainEvent::new(Uuid::new_v4(), 1, WORLD_CREATED, StateMap::new());
        let mut world = Self::from_created_event(&event).expect("fresh created event");
        world.pending.push(event);
        world
    }

    pub fn make_it_so(&mut self, what: &str) {
        let mut state = StateMap::new();
        state.insert("what".into(), Value::from(what));
        let event = DomainEvent::new(
            self.id,
            self.version + 1,
            WORLD_SOMETHING_HAPPENED,
            state,
        );
        self.apply(&event).expect("own event applies");
        self.pending.push(event);
    }
}

impl Aggregate for World {
    const TOPIC: &'static str = WORLD_TOPIC;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn from_created_event(event: &DomainEvent) -> Result<Self> {
        if event.topic != WORLD_CREATED {
            return Err(StoreError::Integrity(format!(
                "expected `{WORLD_CREATED}` first, got `{}`",
                event.topic
            )));
        }
        Ok(Self {
            id: event.originator_id,
            version: event.originator_version,
            history: Vec::new(),
            pending: Vec::new(),
        })
    }

    fn apply(&mut self, event: &DomainEvent) -> Result<()> {
        if event.topic == WORLD_SOMETHING_HAPPENED {
            let what = event
                .state
                .get("what")
                .and_then(Value::as_str)
                .unwrap_or_default();
            self.history.push(what.to_owned());
        }
        self.version = event.originator_version;
        Ok(())
    }

    fn collect_pending_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending)
    }

    fn snapshot_state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert(
            "history".into(),
            Value::Seq(self.history.iter().map(|s| Value::from(s.as_str())).collect()),
        );
        state
    }

    fn from_snapshot(id: Uuid, version: u64, state: StateMap) -> Result<Self> {
        let history = match state.get("history") {
            Some(Value::Seq(items)) => items
                .iter()
                .map(|v| v.as_str().unwrap_or_default().to_owned())
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self {
            id,
            version,
            history,
            pending: Vec::new(),
        })
    }
}

//─────────────────────────────
//  Page and its name index
//─────────────────────────────

/// A wiki page with a freely chosen id.
pub struct Page {
    id: Uuid,
    version: u64,
    pub name: String,
    pending: Vec<DomainEvent>,
}

impl Page {
    pub fn create(name: &str) -> Self {
        let mut state = StateMap::new();
        state.insert("name".into(), Value::from(name));
        let event = DomainEvent::new(Uuid::new_v4(), 1, PAGE_CREATED, state);
        let mut page = Self::from_created_event(&event).expect("fresh created event");
        page.pending.push(event);
        page
    }
}

impl Aggregate for Page {
    const TOPIC: &'static str = PAGE_TOPIC;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn from_created_event(event: &DomainEvent) -> Result<Self> {
        Ok(Self {
            id: event.originator_id,
            version: event.originator_version,
            name: event
                .state
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            pending: Vec::new(),
        })
    }

    fn apply(&mut self, event: &DomainEvent) -> Result<()> {
        self.version = event.originator_version;
        Ok(())
    }

    fn collect_pending_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending)
    }

    fn snapshot_state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert("name".into(), Value::from(self.name.as_str()));
        state
    }

    fn from_snapshot(id: Uuid, version: u64, state: StateMap) -> Result<Self> {
        Ok(Self {
            id,
            version,
            name: state
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            pending: Vec::new(),
        })
    }
}

/// Maps a page name to its page id; the index id is derived from the name,
/// so creating the same name twice collides on version 1.
pub struct Index {
    id: Uuid,
    version: u64,
    pub page_id: Uuid,
    pending: Vec<DomainEvent>,
}

impl Index {
    pub fn id_for(name: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
    }

    pub fn create(name: &str, page_id: Uuid) -> Self {
        let mut state = StateMap::new();
        state.insert("page_id".into(), Value::Id(page_id));
        let event = DomainEvent::new(Self::id_for(name), 1, INDEX_CREATED, state);
        let mut index = Self::from_created_event(&event).expect("fresh created event");
        index.pending.push(event);
        index
    }
}

impl Aggregate for Index {
    const TOPIC: &'static str = INDEX_TOPIC;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn from_created_event(event: &DomainEvent) -> Result<Self> {
        Ok(Self {
            id: event.originator_id,
            version: event.originator_version,
            page_id: event
                .state
                .get("page_id")
                .and_then(Value::as_id)
                .unwrap_or_default(),
            pending: Vec::new(),
        })
    }

    fn apply(&mut self, event: &DomainEvent) -> Result<()> {
        self.version = event.originator_version;
        Ok(())
    }

    fn collect_pending_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending)
    }

    fn snapshot_state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert("page_id".into(), Value::Id(self.page_id));
        state
    }

    fn from_snapshot(id: Uuid, version: u64, state: StateMap) -> Result<Self> {
        Ok(Self {
            id,
            version,
            page_id: state
                .get("page_id")
                .and_then(Value::as_id)
                .unwrap_or_default(),
            pending: Vec::new(),
        })
    }
}

/// Create a page and its name index in one atomic save.
pub async fn create_page(app: &Application, name: &str) -> Result<Uuid> {
    let mut page = Page::create(name);
    let mut index = Index::create(name, page.id());
    let mut events = page.collect_pending_events();
    events.extend(index.collect_pending_events());
    app.save_events(&events).await?;
    Ok(page.id())
}
