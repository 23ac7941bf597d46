//! In-memory stand-in for the diagram engine, served over HTTP by wiremock.
//!
//! Behaves like the real engine where the harness cares: lifelines get a
//! view as a side effect, timing states must be anchored to a view id,
//! deleting a diagram cascades, and export returns a base64 PNG.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use timing_diagram_mcp::api::ApiClient;

/// Bytes returned by every export.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

/// Misbehaviours the fake can be asked to show.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Create lifelines without their view.
    pub skip_lifeline_views: bool,
    /// Create two views per lifeline.
    pub duplicate_lifeline_views: bool,
    /// Answer renames correctly but never store them.
    pub forget_renames: bool,
    /// Leave the newest time segment out of segment listings.
    pub drop_segments_from_listing: bool,
    /// Answer time segment reads with an empty object.
    pub empty_segment_reads: bool,
    /// Hold export responses for this long.
    pub export_delay: Option<Duration>,
}

type Reply = Result<(u16, Value), (u16, String)>;

#[derive(Debug, Default)]
struct State {
    faults: Faults,
    next_id: u64,
    /// (collection, element) in creation order.
    elements: Vec<(String, Value)>,
    views: Vec<Value>,
    requests: Vec<String>,
}

impl State {
    fn handle(&mut self, req: &Request) -> ResponseTemplate {
        let method = req.method.as_str().to_string();
        let path = req.url.path().to_string();
        self.requests.push(format!("{method} {path}"));

        let body: Value = serde_json::from_slice(&req.body).unwrap_or(Value::Null);
        let diagram_filter = req
            .url
            .query_pairs()
            .find(|(k, _)| k == "diagramId")
            .map(|(_, v)| v.into_owned());

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let mut delay = None;

        let reply = match (method.as_str(), segments.as_slice()) {
            ("POST", ["api", "timing", coll]) => self.create(coll, &body),
            ("GET", ["api", "timing", coll]) => Ok((200, self.list(coll, diagram_filter.as_deref()))),
            ("GET", ["api", "timing", "time-segments", id]) if self.faults.empty_segment_reads => self
                .get("time-segments", id)
                .map(|_| (200, json!({}))),
            ("GET", ["api", "timing", coll, id]) => self.get(coll, id).map(|e| (200, e)),
            ("PUT", ["api", "timing", coll, id]) => self.update(coll, id, &body),
            ("DELETE", ["api", "timing", coll, id]) => self.delete(coll, id),
            ("GET", ["api", "diagrams", id, "views"]) => self.diagram_views(id),
            ("POST", ["api", "diagrams", id, "layout"]) => self
                .get("diagrams", id)
                .map(|_| (200, json!({ "resized": true }))),
            ("POST", ["api", "diagrams", id, "export"]) => {
                delay = self.faults.export_delay;
                self.get("diagrams", id).map(|_| {
                    let format = body.get("format").cloned().unwrap_or_else(|| json!("png"));
                    (200, json!({ "format": format, "image": BASE64_STANDARD.encode(PNG_BYTES) }))
                })
            }
            _ => Err((404, format!("no route for {method} {path}"))),
        };

        let template = match reply {
            Ok((status, data)) => {
                ResponseTemplate::new(status).set_body_json(json!({ "success": true, "data": data }))
            }
            Err((status, message)) => ResponseTemplate::new(status)
                .set_body_json(json!({ "success": false, "error": message })),
        };
        match delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn find(&self, coll: &str, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|(c, e)| c == coll && e["_id"] == id)
    }

    fn require_diagram(&self, body: &Value) -> Result<String, (u16, String)> {
        let id = body["diagramId"].as_str().unwrap_or_default().to_string();
        if self.find("diagrams", &id).is_none() {
            return Err((400, format!("unknown diagramId '{id}'")));
        }
        Ok(id)
    }

    fn create(&mut self, coll: &str, body: &Value) -> Reply {
        let mut element = body.as_object().cloned().unwrap_or_else(Map::new);

        let (prefix, type_name) = match coll {
            "diagrams" => {
                if !body["name"].is_string() {
                    return Err((400, "name is required".to_string()));
                }
                ("D", "UMLTimingDiagram")
            }
            "lifelines" => {
                self.require_diagram(body)?;
                ("L", "UMLLifeline")
            }
            "timing-states" => {
                let diagram_id = self.require_diagram(body)?;
                let tail = body["tailViewId"].as_str().unwrap_or_default();
                let Some(view) = self
                    .views
                    .iter()
                    .find(|v| v["_id"] == tail && v["diagramId"] == diagram_id.as_str())
                else {
                    return Err((
                        400,
                        format!("tailViewId '{tail}' does not reference a view on this diagram"),
                    ));
                };
                element.insert("lifelineId".to_string(), view["modelId"].clone());
                ("S", "UMLTimingState")
            }
            "time-segments" => {
                self.require_diagram(body)?;
                for key in ["sourceId", "targetId"] {
                    let id = body[key].as_str().unwrap_or_default();
                    if self.find("timing-states", id).is_none() {
                        return Err((400, format!("{key} '{id}' is not a timing state")));
                    }
                }
                ("T", "UMLTimeSegment")
            }
            _ => return Err((404, format!("unknown collection '{coll}'"))),
        };

        let id = self.fresh_id(prefix);
        element.insert("_id".to_string(), json!(id));
        element.insert("_type".to_string(), json!(type_name));
        let element = Value::Object(element);

        if coll == "lifelines" && !self.faults.skip_lifeline_views {
            let copies = if self.faults.duplicate_lifeline_views { 2 } else { 1 };
            for _ in 0..copies {
                let view_id = self.fresh_id("V");
                self.views.push(json!({
                    "_id": view_id,
                    "_type": "UMLLifelineView",
                    "modelId": id,
                    "diagramId": body["diagramId"],
                }));
            }
        }

        self.elements.push((coll.to_string(), element.clone()));
        Ok((201, element))
    }

    fn list(&self, coll: &str, diagram_id: Option<&str>) -> Value {
        let mut items: Vec<Value> = self
            .elements
            .iter()
            .filter(|(c, e)| c == coll && diagram_id.map_or(true, |d| e["diagramId"] == d))
            .map(|(_, e)| e.clone())
            .collect();
        if coll == "time-segments" && self.faults.drop_segments_from_listing {
            items.pop();
        }
        Value::Array(items)
    }

    fn get(&self, coll: &str, id: &str) -> Result<Value, (u16, String)> {
        self.find(coll, id)
            .map(|i| self.elements[i].1.clone())
            .ok_or_else(|| (404, format!("{coll}/{id} not found")))
    }

    fn update(&mut self, coll: &str, id: &str, body: &Value) -> Reply {
        let index = self
            .find(coll, id)
            .ok_or_else(|| (404, format!("{coll}/{id} not found")))?;

        let mut updated = self.elements[index].1.clone();
        if let (Some(target), Some(fields)) = (updated.as_object_mut(), body.as_object()) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        if !self.faults.forget_renames {
            self.elements[index].1 = updated.clone();
        }
        Ok((200, updated))
    }

    fn delete(&mut self, coll: &str, id: &str) -> Reply {
        self.find(coll, id)
            .ok_or_else(|| (404, format!("{coll}/{id} not found")))?;

        if coll == "diagrams" {
            self.elements
                .retain(|(c, e)| !(c == "diagrams" && e["_id"] == id) && e["diagramId"] != id);
            self.views.retain(|v| v["diagramId"] != id);
        } else {
            self.elements.retain(|(c, e)| !(c == coll && e["_id"] == id));
            self.views.retain(|v| v["modelId"] != id);
        }
        Ok((200, Value::Null))
    }

    fn diagram_views(&self, diagram_id: &str) -> Reply {
        self.get("diagrams", diagram_id)?;
        let mut views = vec![json!({ "_id": format!("{diagram_id}-frame"), "_type": "UMLFrameView" })];
        views.extend(
            self.views
                .iter()
                .filter(|v| v["diagramId"] == diagram_id)
                .cloned(),
        );
        Ok((200, Value::Array(views)))
    }
}

/// A running fake engine.
pub struct FakeEngine {
    server: MockServer,
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    /// Starts a well-behaved engine.
    pub async fn start() -> Self {
        Self::with_faults(Faults::default()).await
    }

    /// Starts an engine with the given faults.
    pub async fn with_faults(faults: Faults) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(State {
            faults,
            ..State::default()
        }));

        let shared = Arc::clone(&state);
        Mock::given(any())
            .respond_with(move |req: &Request| shared.lock().unwrap().handle(req))
            .mount(&server)
            .await;

        Self { server, state }
    }

    /// Base URL of the engine.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// A client for this engine with a generous timeout.
    pub fn client(&self) -> ApiClient {
        self.client_with_timeout(Duration::from_secs(5))
    }

    /// A client for this engine.
    pub fn client_with_timeout(&self, timeout: Duration) -> ApiClient {
        ApiClient::new(self.uri(), timeout).unwrap()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Every request received, as "METHOD /path".
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Number of stored elements in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.state()
            .elements
            .iter()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Number of stored views.
    pub fn view_count(&self) -> usize {
        self.state().views.len()
    }
}
