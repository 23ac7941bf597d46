//! Timing diagram tools exposed over MCP.
//!
//! Each tool is a thin wrapper over one [`TimingApi`] call. Successful calls
//! return the engine's JSON pretty-printed as text; engine and argument
//! errors become `isError` results so the assistant can read and react to
//! them.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::api::{ApiError, Bounds, Element, ElementKind, TimingApi};
use crate::mcp::server::{ToolCallResult, ToolDefinition};

const DEFAULT_EXPORT_FORMAT: &str = "png";

/// Errors raised while running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required argument is absent.
    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    /// An argument has the wrong type or value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam {
        /// Argument name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The engine rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The export response carried no image.
    #[error("Export response has no image payload")]
    EmptyExport,
}

/// A tool the server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Create an element of the given kind.
    Create(ElementKind),
    /// List elements of the given kind.
    List(ElementKind),
    /// Fetch one element.
    Get(ElementKind),
    /// Partially update one element.
    Update(ElementKind),
    /// Delete one element.
    Delete(ElementKind),
    /// List the views on a diagram.
    ListViews,
    /// Run the engine's layout.
    Layout,
    /// Render a diagram to an image.
    Export,
}

impl Tool {
    /// Every tool, in the order `tools/list` reports them.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let diagram = ElementKind::Diagram;
        let mut tools = vec![
            Self::Create(diagram),
            Self::List(diagram),
            Self::Get(diagram),
            Self::Delete(diagram),
            Self::ListViews,
        ];
        for kind in ElementKind::CHILDREN {
            tools.extend([
                Self::Create(kind),
                Self::List(kind),
                Self::Get(kind),
                Self::Update(kind),
                Self::Delete(kind),
            ]);
        }
        tools.extend([Self::Layout, Self::Export]);
        tools
    }

    /// Looks a tool up by its wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|tool| tool.name() == name)
    }

    /// Wire name, e.g. `create_timing_state` or `list_lifelines`.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Create(kind) => format!("create_{}", stem(kind)),
            Self::List(kind) => format!("list_{}s", stem(kind)),
            Self::Get(kind) => format!("get_{}", stem(kind)),
            Self::Update(kind) => format!("update_{}", stem(kind)),
            Self::Delete(kind) => format!("delete_{}", stem(kind)),
            Self::ListViews => "list_diagram_views".to_string(),
            Self::Layout => "layout_diagram".to_string(),
            Self::Export => "export_diagram".to_string(),
        }
    }

    /// Definition for `tools/list`.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: Some(self.description()),
            input_schema: self.input_schema(),
        }
    }

    fn description(self) -> String {
        match self {
            Self::Create(ElementKind::Diagram) => "Create an empty timing diagram.".to_string(),
            Self::Create(ElementKind::Lifeline) => "Create a lifeline on a timing diagram. \
                The engine places a view for it; use list_diagram_views to find that view's ID."
                .to_string(),
            Self::Create(ElementKind::TimingState) => "Create a timing state on a lifeline. \
                tail_view_id must be the lifeline's VIEW ID from list_diagram_views, \
                not the lifeline's model ID."
                .to_string(),
            Self::Create(ElementKind::TimeSegment) => {
                "Create a time segment (state transition) between two timing states.".to_string()
            }
            Self::List(ElementKind::Diagram) => "List all timing diagrams.".to_string(),
            Self::List(kind) => format!("List the {} of a timing diagram.", kind.plural()),
            Self::Get(kind) => format!("Get one {kind} by ID."),
            Self::Update(kind) => format!(
                "Update fields of a {kind}. Only the given fields change; returns the updated {kind}."
            ),
            Self::Delete(ElementKind::Diagram) => {
                "Delete a timing diagram and everything it contains.".to_string()
            }
            Self::Delete(kind) => format!("Delete one {kind} by ID."),
            Self::ListViews => "List the views placed on a diagram. Each view has its own _id \
                and the modelId of the element it shows."
                .to_string(),
            Self::Layout => "Run the engine's automatic layout on a diagram. \
                For timing diagrams this resizes the frame around the lifelines."
                .to_string(),
            Self::Export => "Render a diagram to an image and return it.".to_string(),
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Self::Create(ElementKind::Diagram) => {
                schema(json!({ "name": string("Diagram name") }), &["name"])
            }
            Self::Create(ElementKind::Lifeline) => {
                let mut properties = Map::new();
                properties.insert("diagram_id".into(), string("Owning timing diagram ID"));
                properties.insert("name".into(), string("Lifeline name"));
                insert_bounds(&mut properties, "Lifeline bounding box");
                schema(
                    Value::Object(properties),
                    &["diagram_id", "name", "x1", "y1", "x2", "y2"],
                )
            }
            Self::Create(ElementKind::TimingState) => schema(
                json!({
                    "diagram_id": string("Owning timing diagram ID"),
                    "name": string("State name, e.g. High or Idle"),
                    "tail_view_id": string("View ID of the lifeline the state belongs to"),
                }),
                &["diagram_id", "name", "tail_view_id"],
            ),
            Self::Create(ElementKind::TimeSegment) => {
                let mut properties = Map::new();
                properties.insert("diagram_id".into(), string("Owning timing diagram ID"));
                properties.insert("source_id".into(), string("Timing state the transition leaves"));
                properties.insert("target_id".into(), string("Timing state the transition enters"));
                insert_bounds(&mut properties, "Segment geometry");
                schema(
                    Value::Object(properties),
                    &["diagram_id", "source_id", "target_id", "x1", "y1", "x2", "y2"],
                )
            }
            Self::List(ElementKind::Diagram) => schema(json!({}), &[]),
            Self::List(_) | Self::ListViews | Self::Layout => schema(
                json!({ "diagram_id": string("Timing diagram ID") }),
                &["diagram_id"],
            ),
            Self::Get(_) | Self::Delete(_) => {
                schema(json!({ "id": string("Element ID") }), &["id"])
            }
            Self::Update(_) => schema(
                json!({
                    "id": string("Element ID"),
                    "name": string("New name"),
                    "fields": {
                        "type": "object",
                        "description": "Other fields to change, sent as-is to the engine"
                    },
                }),
                &["id"],
            ),
            Self::Export => schema(
                json!({
                    "diagram_id": string("Timing diagram ID"),
                    "format": {
                        "type": "string",
                        "enum": ["png", "svg"],
                        "default": DEFAULT_EXPORT_FORMAT,
                        "description": "Image format"
                    },
                }),
                &["diagram_id"],
            ),
        }
    }

    async fn invoke(self, api: &TimingApi, args: Args<'_>) -> Result<ToolCallResult, ToolError> {
        let result = match self {
            Self::Create(kind) => ToolCallResult::json(&create(api, kind, args).await?),
            Self::List(ElementKind::Diagram) => ToolCallResult::json(&api.list_diagrams().await?),
            Self::List(kind) => {
                ToolCallResult::json(&api.list(kind, args.str("diagram_id")?).await?)
            }
            Self::Get(kind) => ToolCallResult::json(&api.get(kind, args.str("id")?).await?),
            Self::Update(kind) => {
                let id = args.str("id")?;
                let fields = args.update_fields()?;
                ToolCallResult::json(&api.update(kind, id, &fields).await?)
            }
            Self::Delete(kind) => {
                let id = args.str("id")?;
                api.delete(kind, id).await?;
                ToolCallResult::text(format!("Deleted {kind} {id}"))
            }
            Self::ListViews => {
                ToolCallResult::json(&api.diagram_views(args.str("diagram_id")?).await?)
            }
            Self::Layout => {
                let diagram_id = args.str("diagram_id")?;
                let response = api.layout(diagram_id).await?;
                if response.data.is_null() {
                    ToolCallResult::text(format!("Layout applied to diagram {diagram_id}"))
                } else {
                    ToolCallResult::json(&response.data)
                }
            }
            Self::Export => export(api, args).await?,
        };
        Ok(result)
    }
}

/// Definitions of every tool.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    Tool::all().into_iter().map(Tool::definition).collect()
}

/// Runs the tool called `name`. Never fails: problems become error results.
pub async fn call(api: &TimingApi, name: &str, arguments: &Value) -> ToolCallResult {
    let Some(tool) = Tool::parse(name) else {
        return ToolCallResult::error(format!("Unknown tool: {name}"));
    };

    tracing::debug!(tool = name, "Calling tool");
    match tool.invoke(api, Args(arguments)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            ToolCallResult::error(e.to_string())
        }
    }
}

async fn create(api: &TimingApi, kind: ElementKind, args: Args<'_>) -> Result<Element, ToolError> {
    let element = match kind {
        ElementKind::Diagram => api.create_diagram(args.str("name")?).await?,
        ElementKind::Lifeline => {
            api.create_lifeline(args.str("diagram_id")?, args.str("name")?, args.bounds()?)
                .await?
        }
        ElementKind::TimingState => {
            api.create_timing_state(
                args.str("diagram_id")?,
                args.str("name")?,
                args.str("tail_view_id")?,
            )
            .await?
        }
        ElementKind::TimeSegment => {
            api.create_time_segment(
                args.str("diagram_id")?,
                args.str("source_id")?,
                args.str("target_id")?,
                args.bounds()?,
            )
            .await?
        }
    };
    tracing::info!(kind = %kind, id = %element.id, "Created element");
    Ok(element)
}

async fn export(api: &TimingApi, args: Args<'_>) -> Result<ToolCallResult, ToolError> {
    let diagram_id = args.str("diagram_id")?;
    let requested = args.opt_str("format")?.unwrap_or(DEFAULT_EXPORT_FORMAT);

    let exported = api.export(diagram_id, requested).await?;
    let format = exported.format.as_deref().unwrap_or(requested);
    let image = exported
        .image
        .as_deref()
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .ok_or(ToolError::EmptyExport)?;

    Ok(ToolCallResult::image(
        format!("Exported diagram {diagram_id} as {format}"),
        image,
        mime_type(format),
    ))
}

fn mime_type(format: &str) -> String {
    match format {
        "svg" => "image/svg+xml".to_string(),
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

const fn stem(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Diagram => "timing_diagram",
        ElementKind::Lifeline => "lifeline",
        ElementKind::TimingState => "timing_state",
        ElementKind::TimeSegment => "time_segment",
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn insert_bounds(properties: &mut Map<String, Value>, what: &str) {
    for (key, axis) in [("x1", "start x"), ("y1", "start y"), ("x2", "end x"), ("y2", "end y")] {
        properties.insert(
            key.to_string(),
            json!({ "type": "integer", "description": format!("{what}: {axis}") }),
        );
    }
}

/// Borrowed view of a tool's `arguments` object.
#[derive(Debug, Clone, Copy)]
struct Args<'a>(&'a Value);

impl<'a> Args<'a> {
    fn str(self, key: &'static str) -> Result<&'a str, ToolError> {
        self.opt_str(key)?.ok_or(ToolError::MissingParam(key))
    }

    fn opt_str(self, key: &'static str) -> Result<Option<&'a str>, ToolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Err(ToolError::InvalidParam {
                name: key,
                reason: "must not be empty".to_string(),
            }),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ToolError::InvalidParam {
                name: key,
                reason: format!("expected a string, got {other}"),
            }),
        }
    }

    fn int(self, key: &'static str) -> Result<i32, ToolError> {
        let value = self.0.get(key).ok_or(ToolError::MissingParam(key))?;
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| ToolError::InvalidParam {
                name: key,
                reason: format!("expected a 32-bit integer, got {value}"),
            })
    }

    fn bounds(self) -> Result<Bounds, ToolError> {
        Ok(Bounds::new(
            self.int("x1")?,
            self.int("y1")?,
            self.int("x2")?,
            self.int("y2")?,
        ))
    }

    /// Body of an update: `fields` plus `name`, which wins on conflict.
    fn update_fields(self) -> Result<Value, ToolError> {
        let mut fields = match self.0.get("fields") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(ToolError::InvalidParam {
                    name: "fields",
                    reason: format!("expected an object, got {other}"),
                })
            }
        };

        if let Some(name) = self.opt_str("name")? {
            fields.insert("name".to_string(), Value::String(name.to_string()));
        }

        if fields.is_empty() {
            return Err(ToolError::InvalidParam {
                name: "fields",
                reason: "nothing to update".to_string(),
            });
        }
        Ok(Value::Object(fields))
    }
}
