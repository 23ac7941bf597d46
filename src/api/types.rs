//! Timing diagram entities and request bodies.
//!
//! Entities are owned by the diagram engine. Only `_id`, `name` and the few
//! fields the harness reasons about are typed; everything else is kept in
//! `extra` so it survives a round trip unchanged.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kinds of element reachable under `/api/timing/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A timing diagram.
    Diagram,
    /// A lifeline track.
    Lifeline,
    /// A named state on a lifeline.
    TimingState,
    /// A transition between two timing states.
    TimeSegment,
}

impl ElementKind {
    /// Kinds that can be listed per diagram, renamed and deleted individually.
    pub const CHILDREN: [Self; 3] = [Self::Lifeline, Self::TimingState, Self::TimeSegment];

    /// URL collection segment (`/api/timing/<collection>`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Diagram => "diagrams",
            Self::Lifeline => "lifelines",
            Self::TimingState => "timing-states",
            Self::TimeSegment => "time-segments",
        }
    }

    /// Singular human-readable name.
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Diagram => "timing diagram",
            Self::Lifeline => "lifeline",
            Self::TimingState => "timing state",
            Self::TimeSegment => "time segment",
        }
    }

    /// Plural human-readable name.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Diagram => "timing diagrams",
            Self::Lifeline => "lifelines",
            Self::TimingState => "timing states",
            Self::TimeSegment => "time segments",
        }
    }

    /// Server-relative path of the collection.
    #[must_use]
    pub fn collection_path(self) -> String {
        format!("/api/timing/{}", self.collection())
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// A model element returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Model identifier. Empty when the engine omitted it.
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Element name, when the element has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Every other field the engine returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    /// Name for display in assertion messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Returns `true` if the element carries exactly `name`.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// A view: the visual projection of a model element on a diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View identifier (distinct from the model identifier).
    #[serde(rename = "_id")]
    pub id: String,

    /// Identifier of the model element this view projects.
    #[serde(rename = "modelId", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Every other field the engine returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Index of a diagram's views by model identifier.
#[derive(Debug, Clone, Default)]
pub struct ViewIndex {
    by_model: HashMap<String, Vec<View>>,
}

impl ViewIndex {
    /// Builds an index from a view listing. Views without a `modelId` are
    /// skipped.
    #[must_use]
    pub fn new(views: impl IntoIterator<Item = View>) -> Self {
        let mut index = Self::default();
        for view in views {
            if let Some(model_id) = view.model_id.clone() {
                index.by_model.entry(model_id).or_default().push(view);
            }
        }
        index
    }

    /// Returns the first view of `model_id`, if any.
    #[must_use]
    pub fn view_for(&self, model_id: &str) -> Option<&View> {
        self.views_for(model_id).first()
    }

    /// Returns every view of `model_id`.
    #[must_use]
    pub fn views_for(&self, model_id: &str) -> &[View] {
        self.by_model.get(model_id).map_or(&[], Vec::as_slice)
    }

    /// Model identifiers that have more than one view.
    #[must_use]
    pub fn duplicates(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .by_model
            .iter()
            .filter(|(_, views)| views.len() > 1)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Bounding box or segment geometry in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left / start x.
    pub x1: i32,
    /// Top / start y.
    pub y1: i32,
    /// Right / end x.
    pub x2: i32,
    /// Bottom / end y.
    pub y2: i32,
}

impl Bounds {
    /// Creates bounds from two corner points.
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Body of `POST /api/timing/diagrams`.
#[derive(Debug, Serialize)]
pub struct NewDiagram<'a> {
    /// Diagram name.
    pub name: &'a str,
}

/// Body of `POST /api/timing/lifelines`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLifeline<'a> {
    /// Owning diagram.
    pub diagram_id: &'a str,
    /// Lifeline name.
    pub name: &'a str,
    /// Bounding box.
    #[serde(flatten)]
    pub bounds: Bounds,
}

/// Body of `POST /api/timing/timing-states`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimingState<'a> {
    /// Owning diagram.
    pub diagram_id: &'a str,
    /// State name.
    pub name: &'a str,
    /// View id of the lifeline the state belongs to. Not the model id.
    pub tail_view_id: &'a str,
}

/// Body of `POST /api/timing/time-segments`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeSegment<'a> {
    /// Owning diagram.
    pub diagram_id: &'a str,
    /// Timing state the transition leaves.
    pub source_id: &'a str,
    /// Timing state the transition enters.
    pub target_id: &'a str,
    /// Segment geometry.
    #[serde(flatten)]
    pub bounds: Bounds,
}

/// Payload of `POST /api/diagrams/{id}/export`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportedImage {
    /// Image format reported by the engine.
    #[serde(default)]
    pub format: Option<String>,

    /// Base64-encoded image bytes.
    #[serde(default)]
    pub image: Option<String>,
}
