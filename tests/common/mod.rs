//! Shared test fixtures for the dex-sync integration tests.
//!
//! Provides PokeAPI-shaped payloads, a store that records every call it
//! receives, and a scripted catalog source that decodes payloads in a given
//! completion order, plus a canned local HTTP server for the real client.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use dex_sync::{
    decoder, CatalogItem, CatalogSource, DexError, NetworkError, PersistedRecord, RecordFilter,
    Store, StoreError,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A detail payload in the shape the remote API returns.
pub fn payload(id: u32, name: &str, types: &[&str]) -> Value {
    let type_slots: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            json!({
                "slot": i + 1,
                "type": {"name": t, "url": format!("https://pokeapi.co/api/v2/type/{}/", t)}
            })
        })
        .collect();
    json!({
        "id": id,
        "name": name,
        "base_experience": 64,
        "types": type_slots,
        "stats": [
            {"base_stat": 45, "effort": 0, "stat": {"name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/"}},
            {"base_stat": 49, "effort": 0, "stat": {"name": "attack", "url": "https://pokeapi.co/api/v2/stat/2/"}},
            {"base_stat": 49, "effort": 0, "stat": {"name": "defense", "url": "https://pokeapi.co/api/v2/stat/3/"}},
            {"base_stat": 65, "effort": 1, "stat": {"name": "special-attack", "url": "https://pokeapi.co/api/v2/stat/4/"}},
            {"base_stat": 65, "effort": 0, "stat": {"name": "special-defense", "url": "https://pokeapi.co/api/v2/stat/5/"}},
            {"base_stat": 45, "effort": 0, "stat": {"name": "speed", "url": "https://pokeapi.co/api/v2/stat/6/"}}
        ],
        "sprites": {
            "back_default": null,
            "front_default": format!("https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/{}.png", id),
            "front_shiny": format!("https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/shiny/{}.png", id)
        }
    })
}

/// The canonical first entry of the catalog.
pub fn bulbasaur() -> Value {
    payload(1, "bulbasaur", &["grass", "poison"])
}

/// A decoded item with the fixture stats.
pub fn item(id: u32) -> CatalogItem {
    decoder::decode(&payload(id, &format!("creature-{}", id), &["water"])).unwrap()
}

pub fn record(id: u32) -> PersistedRecord {
    PersistedRecord::from_item(item(id))
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

/// In-memory [`Store`] that logs every call.
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<BTreeMap<u32, PersistedRecord>>,
    /// Ids passed to `create`, in call order (including rejected calls).
    pub creates: Mutex<Vec<u32>>,
    pub exists_calls: AtomicUsize,
    /// 1-based `create` call that fails with an opaque I/O error.
    pub fail_on_create: Option<usize>,
}

impl RecordingStore {
    pub fn with_ids(ids: &[u32]) -> Self {
        let store = Self::default();
        {
            let mut records = store.records.lock().unwrap();
            for id in ids {
                records.insert(*id, record(*id));
            }
        }
        store
    }

    pub fn failing_on_create(call: usize) -> Self {
        Self {
            fail_on_create: Some(call),
            ..Self::default()
        }
    }

    pub fn create_log(&self) -> Vec<u32> {
        self.creates.lock().unwrap().clone()
    }

    pub fn stored_ids(&self) -> Vec<u32> {
        self.records.lock().unwrap().keys().copied().collect()
    }
}

impl Store for RecordingStore {
    fn exists(&self, ids: &[u32]) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(ids.iter().all(|id| records.contains_key(id)))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }

    fn create(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let call = {
            let mut creates = self.creates.lock().unwrap();
            creates.push(record.id);
            creates.len()
        };
        if self.fail_on_create == Some(call) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn find(&self, id: u32) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    fn query_all(&self, filter: RecordFilter) -> Result<Vec<PersistedRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| filter == RecordFilter::All || r.favorite)
            .cloned()
            .collect())
    }

    fn update(&self, id: u32, favorite: bool) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(r) => {
                r.favorite = favorite;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }
}

// ---------------------------------------------------------------------------
// PayloadSource
// ---------------------------------------------------------------------------

/// Catalog source that "completes" detail calls in the order given.
pub struct PayloadSource {
    payloads: Vec<Value>,
    /// 0-based detail call that fails with HTTP 500.
    fail_at: Option<usize>,
    pub calls: AtomicUsize,
}

impl PayloadSource {
    pub fn new(payloads: Vec<Value>) -> Self {
        Self {
            payloads,
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source for `ids`, completing in the given order.
    pub fn for_ids(ids: &[u32]) -> Self {
        Self::new(
            ids.iter()
                .map(|id| payload(*id, &format!("creature-{}", id), &["water"]))
                .collect(),
        )
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CatalogSource for PayloadSource {
    fn fetch_catalog(&self) -> dex_sync::Result<Vec<CatalogItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut items = Vec::with_capacity(self.payloads.len());
        for (i, payload) in self.payloads.iter().enumerate() {
            if self.fail_at == Some(i) {
                return Err(DexError::Network(NetworkError::BadResponse {
                    url: format!("https://pokeapi.co/api/v2/pokemon/{}/", i + 1),
                    status: 500,
                }));
            }
            items.push(decoder::decode(payload)?);
        }
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// CannedServer
// ---------------------------------------------------------------------------

type Routes = Mutex<HashMap<String, (u16, Vec<u8>)>>;

/// Local HTTP/1.1 server answering each request target with a canned
/// status and body. Unknown targets get a 404.
pub struct CannedServer {
    addr: SocketAddr,
    routes: Arc<Routes>,
    pub hits: Arc<AtomicUsize>,
}

impl CannedServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<Routes> = Arc::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let shared_routes = Arc::clone(&routes);
        let shared_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let routes = Arc::clone(&shared_routes);
                let hits = Arc::clone(&shared_hits);
                thread::spawn(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    respond(stream, &routes);
                });
            }
        });

        Self { addr, routes, hits }
    }

    /// Catalog base URL served by this instance.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v2/pokemon/", self.addr)
    }

    pub fn detail_url(&self, id: u32) -> String {
        format!("{}{}/", self.base_url(), id)
    }

    /// Register a response for a request target such as `/api/v2/pokemon/1/`.
    pub fn route(&self, target: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(target.to_string(), (status, body.into()));
    }

    /// Register the index page for `limit` pointing at `ids`.
    pub fn index(&self, limit: u32, ids: &[u32]) {
        let results: Vec<Value> = ids
            .iter()
            .map(|id| json!({"name": format!("creature-{}", id), "url": self.detail_url(*id)}))
            .collect();
        self.index_with(limit, results);
    }

    pub fn index_with(&self, limit: u32, results: Vec<Value>) {
        let body = json!({"count": results.len(), "next": null, "previous": null, "results": results});
        self.route(
            &format!("/api/v2/pokemon/?limit={}", limit),
            200,
            body.to_string(),
        );
    }

    /// Register a 200 detail response for `id`.
    pub fn detail(&self, id: u32, body: &Value) {
        self.route(&format!("/api/v2/pokemon/{}/", id), 200, body.to_string());
    }
}

fn respond(mut stream: TcpStream, routes: &Routes) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&request);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let (status, body) = routes
        .lock()
        .unwrap()
        .get(&target)
        .cloned()
        .unwrap_or((404, b"not found".to_vec()));

    let header = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}
