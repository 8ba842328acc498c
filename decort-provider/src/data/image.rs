//! Image data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::DataSource;
use decort_models::image::{ImageListItem, ImageRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub image_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub id: u64,
    pub name: String,
    pub image_type: String,
    pub boot_type: String,
    pub architecture: String,
    pub drivers: Vec<String>,
    pub status: String,
}

/// Image data source.
#[derive(Debug, Clone)]
pub struct ImageDataSource {
    api: Api,
}

impl ImageDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for ImageDataSource {
    type Query = ImageQuery;
    type Output = ImageData;

    fn type_name(&self) -> &'static str {
        "decort_image"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &ImageQuery,
    ) -> ProviderResult<ImageData> {
        let record: ImageRecord = if let Some(id) = query.image_id.filter(|id| *id != 0) {
            self.api
                .fetch(ctx, "image", "get", &Form::new().uint("imageId", id))
                .await?
        } else {
            let name = query
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| ProviderError::validation("image lookup needs an id or a name"))?;
            let listed: Vec<ImageListItem> =
                self.api.fetch(ctx, "image", "list", &Form::new()).await?;
            let hit = listed
                .iter()
                .find(|i| i.name == name && !i.status.is_destroyed())
                .ok_or_else(|| ProviderError::not_found(format!("no image named `{name}`")))?;
            self.api
                .fetch(ctx, "image", "get", &Form::new().uint("imageId", hit.id))
                .await?
        };

        Ok(ImageData {
            id: record.id,
            name: record.name,
            image_type: record.image_type,
            boot_type: record.boot_type,
            architecture: record.architecture,
            drivers: record.drivers,
            status: record.status.to_string(),
        })
    }
}
