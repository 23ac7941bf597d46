//! Typed wrappers over the timing diagram endpoints.

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::client::{enc_id, ApiClient, ApiResponse};
use crate::api::error::ApiResult;
use crate::api::types::{
    Bounds, Element, ElementKind, ExportedImage, NewDiagram, NewLifeline, NewTimeSegment,
    NewTimingState, View, ViewIndex,
};

/// Timing diagram operations on top of an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct TimingApi {
    client: ApiClient,
}

impl TimingApi {
    /// Wraps a client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying untyped client.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Creates a timing diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn create_diagram(&self, name: &str) -> ApiResult<Element> {
        self.create(ElementKind::Diagram, &NewDiagram { name }).await
    }

    /// Lists every timing diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a list.
    pub async fn list_diagrams(&self) -> ApiResult<Vec<Element>> {
        self.client
            .get(&ElementKind::Diagram.collection_path())
            .await?
            .into_typed("timing diagram list")
    }

    /// Deletes a diagram and, through the engine, everything it owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_diagram(&self, diagram_id: &str) -> ApiResult<()> {
        self.delete(ElementKind::Diagram, diagram_id).await
    }

    /// Lists the views placed on a diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a view list.
    pub async fn diagram_views(&self, diagram_id: &str) -> ApiResult<Vec<View>> {
        self.client
            .get(&format!("/api/diagrams/{}/views", enc_id(diagram_id)))
            .await?
            .into_typed("view list")
    }

    /// Lists a diagram's views indexed by model id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a view list.
    pub async fn view_index(&self, diagram_id: &str) -> ApiResult<ViewIndex> {
        Ok(ViewIndex::new(self.diagram_views(diagram_id).await?))
    }

    /// Creates a lifeline. The engine creates its view as a side effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn create_lifeline(
        &self,
        diagram_id: &str,
        name: &str,
        bounds: Bounds,
    ) -> ApiResult<Element> {
        let body = NewLifeline {
            diagram_id,
            name,
            bounds,
        };
        self.create(ElementKind::Lifeline, &body).await
    }

    /// Creates a timing state anchored to a lifeline *view*.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn create_timing_state(
        &self,
        diagram_id: &str,
        name: &str,
        lifeline_view_id: &str,
    ) -> ApiResult<Element> {
        let body = NewTimingState {
            diagram_id,
            name,
            tail_view_id: lifeline_view_id,
        };
        self.create(ElementKind::TimingState, &body).await
    }

    /// Creates a time segment from `source_id` to `target_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn create_time_segment(
        &self,
        diagram_id: &str,
        source_id: &str,
        target_id: &str,
        bounds: Bounds,
    ) -> ApiResult<Element> {
        let body = NewTimeSegment {
            diagram_id,
            source_id,
            target_id,
            bounds,
        };
        self.create(ElementKind::TimeSegment, &body).await
    }

    /// Lists elements of `kind` belonging to a diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a list.
    pub async fn list(&self, kind: ElementKind, diagram_id: &str) -> ApiResult<Vec<Element>> {
        let path = format!("{}?diagramId={}", kind.collection_path(), enc_id(diagram_id));
        self.client
            .get(&path)
            .await?
            .into_typed(&format!("{} list", kind.singular()))
    }

    /// Fetches one element by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn get(&self, kind: ElementKind, id: &str) -> ApiResult<Element> {
        self.client
            .get(&Self::element_path(kind, id))
            .await?
            .into_typed(kind.singular())
    }

    /// Partially updates an element and returns the engine's updated copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn update(&self, kind: ElementKind, id: &str, fields: &Value) -> ApiResult<Element> {
        self.client
            .put(&Self::element_path(kind, id), fields)
            .await?
            .into_typed(kind.singular())
    }

    /// Renames an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an element.
    pub async fn rename(&self, kind: ElementKind, id: &str, name: &str) -> ApiResult<Element> {
        self.update(kind, id, &json!({ "name": name })).await
    }

    /// Deletes one element.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, kind: ElementKind, id: &str) -> ApiResult<()> {
        self.client.delete(&Self::element_path(kind, id)).await?;
        Ok(())
    }

    /// Triggers the engine's layout for a diagram. Timing diagrams only get
    /// their frame resized.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn layout(&self, diagram_id: &str) -> ApiResult<ApiResponse> {
        self.client
            .post(
                &format!("/api/diagrams/{}/layout", enc_id(diagram_id)),
                &json!({}),
            )
            .await
    }

    /// Renders a diagram to an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an object.
    pub async fn export(&self, diagram_id: &str, format: &str) -> ApiResult<ExportedImage> {
        self.client
            .post(
                &format!("/api/diagrams/{}/export", enc_id(diagram_id)),
                &json!({ "format": format }),
            )
            .await?
            .into_typed("export")
    }

    async fn create<B: Serialize + Sync>(&self, kind: ElementKind, body: &B) -> ApiResult<Element> {
        self.client
            .post(&kind.collection_path(), body)
            .await?
            .into_typed(kind.singular())
    }

    fn element_path(kind: ElementKind, id: &str) -> String {
        format!("{}/{}", kind.collection_path(), enc_id(id))
    }
}
