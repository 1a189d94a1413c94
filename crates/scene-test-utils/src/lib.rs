//! Testing utilities for the scene migration workspace
//!
//! An in-process stand-in for the scene-management service. It serves the
//! three endpoints the migrator uses under `/api`, checks the bearer token,
//! records every request and keeps object positions in memory so repeated
//! runs observe earlier updates.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Token the mock accepts unless overridden
pub const TEST_TOKEN: &str = "test-token";

/// Fallback coordinate used throughout the test suites
pub const FALLBACK: [f64; 3] = [116.397128, 39.908802, 100.0];

#[derive(Debug, Clone, PartialEq)]
pub struct MockObject {
    pub id: String,
    pub name: String,
    pub position: Option<[f64; 3]>,
}

impl MockObject {
    pub fn new(id: &str, name: &str, position: [f64; 3]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position: Some(position),
        }
    }

    /// Object the service returns without a `position` field
    pub fn unplaced(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position: None,
        }
    }

    fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_string(), json!(self.id));
        object.insert("name".to_string(), json!(self.name));
        object.insert("modelPath".to_string(), json!(format!("/models/{}.glb", self.id)));
        if let Some(position) = self.position {
            object.insert("position".to_string(), json!(position));
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockScene {
    pub id: String,
    pub name: String,
    pub objects: Vec<MockObject>,
}

impl MockScene {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            objects: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: MockObject) -> Self {
        self.objects.push(object);
        self
    }
}

/// One request as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

/// One update call, whether or not the mock let it succeed
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub object_id: String,
    pub body: Value,
}

impl RecordedUpdate {
    /// The `position` the client sent, if it was three numbers
    pub fn position(&self) -> Option<[f64; 3]> {
        serde_json::from_value(self.body.get("position")?.clone()).ok()
    }
}

#[derive(Debug, Default)]
struct ServerState {
    token: String,
    scenes: Vec<MockScene>,
    fail_scene_listing: bool,
    failing_object_listings: HashSet<String>,
    failing_updates: HashSet<String>,
    raw_object_listings: HashMap<String, Value>,
    raw_update_replies: HashMap<String, Value>,
    requests: Vec<RecordedRequest>,
    updates: Vec<RecordedUpdate>,
}

impl ServerState {
    fn record(&mut self, method: &'static str, path: String, headers: &Headers) -> Option<Response> {
        self.requests.push(RecordedRequest {
            method,
            path,
            authorization: headers.authorization.clone(),
            content_type: headers.content_type.clone(),
        });

        let expected = format!("Bearer {}", self.token);
        if headers.authorization.as_deref() == Some(expected.as_str()) {
            None
        } else {
            Some(error_reply(StatusCode::UNAUTHORIZED, "missing or invalid bearer token"))
        }
    }

    fn find_object_mut(&mut self, object_id: &str) -> Option<&mut MockObject> {
        self.scenes
            .iter_mut()
            .flat_map(|scene| scene.objects.iter_mut())
            .find(|object| object.id == object_id)
    }
}

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Debug, Clone)]
struct Headers {
    authorization: Option<String>,
    content_type: Option<String>,
}

/// Builder for a mock scene service
#[derive(Debug, Default)]
pub struct MockSceneServer {
    state: ServerState,
}

impl MockSceneServer {
    pub fn new() -> Self {
        Self {
            state: ServerState {
                token: TEST_TOKEN.to_string(),
                ..ServerState::default()
            },
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.state.token = token.to_string();
        self
    }

    pub fn with_scene(mut self, scene: MockScene) -> Self {
        self.state.scenes.push(scene);
        self
    }

    /// `GET /api/scenes` answers 500
    pub fn fail_scene_listing(mut self) -> Self {
        self.state.fail_scene_listing = true;
        self
    }

    /// `GET /api/sceneobjects/scene/{scene_id}` answers 500
    pub fn fail_object_listing(mut self, scene_id: &str) -> Self {
        self.state.failing_object_listings.insert(scene_id.to_string());
        self
    }

    /// `PUT /api/sceneobjects/{object_id}` answers 500 and leaves the object unchanged
    pub fn fail_update(mut self, object_id: &str) -> Self {
        self.state.failing_updates.insert(object_id.to_string());
        self
    }

    /// `GET /api/sceneobjects/scene/{scene_id}` answers 200 with `body` verbatim
    pub fn with_raw_object_listing(mut self, scene_id: &str, body: Value) -> Self {
        self.state.raw_object_listings.insert(scene_id.to_string(), body);
        self
    }

    /// `PUT /api/sceneobjects/{object_id}` answers 200 with `body` verbatim and
    /// leaves the object unchanged
    pub fn with_raw_update_reply(mut self, object_id: &str, body: Value) -> Self {
        self.state.raw_update_replies.insert(object_id.to_string(), body);
        self
    }

    /// Bind to an ephemeral localhost port and serve until the handle drops
    pub async fn start(self) -> RunningMockServer {
        let state: SharedState = Arc::new(Mutex::new(self.state));
        let (shutdown, signal) = oneshot::channel::<()>();

        let (addr, server) = warp::serve(routes(state.clone())).bind_with_graceful_shutdown(
            ([127, 0, 0, 1], 0),
            async move {
                signal.await.ok();
            },
        );
        tokio::spawn(server);

        RunningMockServer {
            addr,
            state,
            shutdown: Some(shutdown),
        }
    }
}

/// A mock service that is accepting connections
#[derive(Debug)]
pub struct RunningMockServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RunningMockServer {
    /// Base URL including the `/api` prefix
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.lock().updates.clone()
    }

    /// Ids of updated objects, in request order
    pub fn updated_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .updates
            .iter()
            .map(|update| update.object_id.clone())
            .collect()
    }

    pub fn object_position(&self, object_id: &str) -> Option<[f64; 3]> {
        self.state.lock().find_object_mut(object_id)?.position
    }

    /// Forget recorded requests and updates, keeping scene state
    pub fn clear_history(&self) {
        let mut state = self.state.lock();
        state.requests.clear();
        state.updates.clear();
    }
}

impl Drop for RunningMockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
    }
}

/// Spec scenario: S1 holds A at the origin and B at `[1, 2, 3]`; S2 holds C at the origin
pub fn two_scene_fixture() -> MockSceneServer {
    MockSceneServer::new()
        .with_scene(
            MockScene::new("s1", "Plaza")
                .with_object(MockObject::new("a", "Flagpole", [0.0, 0.0, 0.0]))
                .with_object(MockObject::new("b", "Gate", [1.0, 2.0, 3.0])),
        )
        .with_scene(
            MockScene::new("s2", "Harbour").with_object(MockObject::new("c", "Crane", [0.0, 0.0, 0.0])),
        )
}

fn routes(state: SharedState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let with_state = warp::any().map(move || state.clone());
    let headers = warp::header::optional::<String>("authorization")
        .and(warp::header::optional::<String>("content-type"))
        .map(|authorization: Option<String>, content_type: Option<String>| Headers {
            authorization,
            content_type,
        });

    let scenes_route = warp::get()
        .and(warp::path!("api" / "scenes"))
        .and(headers.clone())
        .and(with_state.clone())
        .map(list_scenes);

    let objects_route = warp::get()
        .and(warp::path!("api" / "sceneobjects" / "scene" / String))
        .and(headers.clone())
        .and(with_state.clone())
        .map(list_scene_objects);

    let update_route = warp::put()
        .and(warp::path!("api" / "sceneobjects" / String))
        .and(headers)
        .and(warp::body::json::<Value>())
        .and(with_state)
        .map(update_object);

    scenes_route
        .or(objects_route)
        .unify()
        .or(update_route)
        .unify()
}

fn list_scenes(headers: Headers, state: SharedState) -> Response {
    let mut state = state.lock();
    if let Some(rejected) = state.record("GET", "/api/scenes".to_string(), &headers) {
        return rejected;
    }
    if state.fail_scene_listing {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "scene listing failed");
    }

    let scenes: Vec<Value> = state
        .scenes
        .iter()
        .map(|scene| json!({ "id": scene.id, "name": scene.name, "objectCount": scene.objects.len() }))
        .collect();
    warp::reply::json(&scenes).into_response()
}

fn list_scene_objects(scene_id: String, headers: Headers, state: SharedState) -> Response {
    let mut state = state.lock();
    let path = format!("/api/sceneobjects/scene/{scene_id}");
    if let Some(rejected) = state.record("GET", path, &headers) {
        return rejected;
    }
    if state.failing_object_listings.contains(&scene_id) {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "object listing failed");
    }
    if let Some(body) = state.raw_object_listings.get(&scene_id) {
        return warp::reply::json(body).into_response();
    }

    match state.scenes.iter().find(|scene| scene.id == scene_id) {
        Some(scene) => {
            let objects: Vec<Value> = scene.objects.iter().map(MockObject::to_json).collect();
            warp::reply::json(&objects).into_response()
        }
        None => error_reply(StatusCode::NOT_FOUND, "scene not found"),
    }
}

fn update_object(object_id: String, headers: Headers, body: Value, state: SharedState) -> Response {
    let mut state = state.lock();
    let path = format!("/api/sceneobjects/{object_id}");
    if let Some(rejected) = state.record("PUT", path, &headers) {
        return rejected;
    }

    let update = RecordedUpdate {
        object_id: object_id.clone(),
        body,
    };
    let position = update.position();
    state.updates.push(update);

    if state.failing_updates.contains(&object_id) {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "update failed");
    }
    if let Some(body) = state.raw_update_replies.get(&object_id) {
        return warp::reply::json(body).into_response();
    }
    let Some(position) = position else {
        return error_reply(StatusCode::BAD_REQUEST, "position must be three numbers");
    };

    match state.find_object_mut(&object_id) {
        Some(object) => {
            object.position = Some(position);
            warp::reply::json(&object.to_json()).into_response()
        }
        None => error_reply(StatusCode::NOT_FOUND, "object not found"),
    }
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "message": message })), status).into_response()
}
