//! Image lifecycle
//!
//! Two flavors share this module: real images registered from a URL, and
//! virtual images that link to a real one and can be re-pointed atomically.
//! Renames and re-links go through dedicated endpoints.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::Status;
use decort_models::image::ImageRecord;
use serde::{Deserialize, Serialize};

use crate::api::Api;

/// Desired state of a registered image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub gid: Option<u64>,
    #[serde(default)]
    pub boot_type: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub drivers: Vec<String>,
    #[serde(default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub sep_id: Option<u64>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub permanently: bool,
}

/// Persisted image state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageState {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub gid: u64,
    #[serde(default)]
    pub boot_type: String,
    #[serde(default)]
    pub image_type: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub drivers: Vec<String>,
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub sep_id: u64,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub link_to: u64,
    #[serde(default)]
    pub status: Status,
}

fn state_from_record(record: &ImageRecord) -> ImageState {
    ImageState {
        id: record.id,
        name: record.name.clone(),
        url: record.url.clone(),
        gid: record.gid,
        boot_type: record.boot_type.clone(),
        image_type: record.image_type.clone(),
        architecture: record.architecture.clone(),
        drivers: record.drivers.clone(),
        account_id: record.account_id,
        sep_id: record.sep_id,
        pool: record.pool.clone(),
        link_to: record.link_to,
        status: record.status.clone(),
    }
}

async fn get_image(api: &Api, ctx: &ReconcileContext, id: u64) -> ProviderResult<ImageRecord> {
    api.fetch(ctx, "image", "get", &Form::new().uint("imageId", id))
        .await
}

async fn read_image(
    api: &Api,
    ctx: &ReconcileContext,
    id: u64,
) -> ProviderResult<Option<ImageState>> {
    match get_image(api, ctx, id).await {
        Ok(record) if record.status.is_destroyed() => Ok(None),
        Ok(record) => Ok(Some(state_from_record(&record))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

async fn delete_image(
    api: &Api,
    ctx: &ReconcileContext,
    id: u64,
    permanently: bool,
) -> ProviderResult<()> {
    if id == 0 {
        return Ok(());
    }
    let form = Form::new()
        .uint("imageId", id)
        .boolean("permanently", permanently);
    match api.call(ctx, "image", "delete", &form).await {
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Registered-image lifecycle handler.
#[derive(Debug, Clone)]
pub struct ImageResource {
    api: Api,
}

impl ImageResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Lifecycle for ImageResource {
    type Spec = ImageSpec;
    type State = ImageState;

    fn type_name(&self) -> &'static str {
        "decort_image"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &ImageSpec,
    ) -> ProviderResult<ImageState> {
        if spec.name.is_empty() || spec.url.is_empty() {
            return Err(ProviderError::validation("image needs a name and a url"));
        }
        let gid = spec
            .gid
            .or(ctx.default_grid_id())
            .ok_or_else(|| ProviderError::validation("no grid id declared and no default grid"))?;

        let form = Form::new()
            .text("name", spec.name.clone())
            .text("url", spec.url.clone())
            .uint("gid", gid)
            .opt_text("boottype", spec.boot_type.as_deref())
            .opt_text("imagetype", spec.image_type.as_deref())
            .opt_text("architecture", spec.architecture.as_deref())
            .json_list("drivers", &spec.drivers)
            .opt_uint("accountId", spec.account_id)
            .opt_uint("sepId", spec.sep_id)
            .opt_text("poolName", spec.pool.as_deref())
            .opt_text("username", spec.username.as_deref())
            .opt_text("password", spec.password.as_deref());
        let id = self.api.call_id(ctx, "image", "createImage", &form).await?;
        tracing::info!(image = id, name = %spec.name, "image registered");

        let record = get_image(&self.api, ctx, id).await?;
        Ok(state_from_record(&record))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ImageState,
    ) -> ProviderResult<Option<ImageState>> {
        read_image(&self.api, ctx, prior.id).await
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &ImageState,
        spec: &ImageSpec,
    ) -> ProviderResult<ImageState> {
        if spec.url != prior.url {
            diags.warn("image source url is immutable; change ignored");
        }
        if spec.name != prior.name {
            let form = Form::new()
                .uint("imageId", prior.id)
                .text("name", spec.name.clone());
            self.api.call(ctx, "image", "rename", &form).await?;
        }
        let record = get_image(&self.api, ctx, prior.id).await?;
        Ok(state_from_record(&record))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ImageState,
        spec: &ImageSpec,
    ) -> ProviderResult<()> {
        delete_image(&self.api, ctx, prior.id, spec.permanently).await
    }

    async fn import(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        id: &str,
    ) -> ProviderResult<ImageState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not an image id")))?;
        let record = get_image(&self.api, ctx, id).await?;
        Ok(state_from_record(&record))
    }
}

/// Desired state of a virtual image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualImageSpec {
    pub name: String,
    /// The real image this virtual image resolves to.
    pub link_to: u64,
    #[serde(default)]
    pub permanently: bool,
}

/// Virtual-image lifecycle handler: a name that can be re-pointed at
/// another real image without touching the computes that boot from it.
#[derive(Debug, Clone)]
pub struct VirtualImageResource {
    api: Api,
}

impl VirtualImageResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Lifecycle for VirtualImageResource {
    type Spec = VirtualImageSpec;
    type State = ImageState;

    fn type_name(&self) -> &'static str {
        "decort_virtual_image"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &VirtualImageSpec,
    ) -> ProviderResult<ImageState> {
        if spec.name.is_empty() || spec.link_to == 0 {
            return Err(ProviderError::validation(
                "virtual image needs a name and a target image",
            ));
        }
        let form = Form::new()
            .text("name", spec.name.clone())
            .uint("targetId", spec.link_to);
        let id = self
            .api
            .call_id(ctx, "image", "createVirtual", &form)
            .await?;
        tracing::info!(image = id, target = spec.link_to, "virtual image created");

        let record = get_image(&self.api, ctx, id).await?;
        Ok(state_from_record(&record))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ImageState,
    ) -> ProviderResult<Option<ImageState>> {
        read_image(&self.api, ctx, prior.id).await
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ImageState,
        spec: &VirtualImageSpec,
    ) -> ProviderResult<ImageState> {
        if spec.link_to != prior.link_to && spec.link_to != 0 {
            let form = Form::new()
                .uint("imageId", prior.id)
                .uint("targetId", spec.link_to);
            self.api.call(ctx, "image", "link", &form).await?;
        }
        if spec.name != prior.name {
            let form = Form::new()
                .uint("imageId", prior.id)
                .text("name", spec.name.clone());
            self.api.call(ctx, "image", "rename", &form).await?;
        }
        let record = get_image(&self.api, ctx, prior.id).await?;
        Ok(state_from_record(&record))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ImageState,
        spec: &VirtualImageSpec,
    ) -> ProviderResult<()> {
        delete_image(&self.api, ctx, prior.id, spec.permanently).await
    }
}
