//! The fetch-and-normalize pipeline.
//!
//! ```text
//! FetchRequest ─▶ candidates ─▶ probe/stream ─▶ decode ─▶ resize ─▶ raw RGB
//! ```
//!
//! The network half is async. Decode and resize are CPU-bound and run on the
//! blocking pool; their cost is bounded by the byte ceiling and the decoder
//! allocation limit.

use crate::fetch::{AllCandidatesExhausted, FetchedImage, Transport, fetch_image};
use crate::imaging::{BackendError, ImageBackend, ResizeParams, ResizePlan, apply_plan, decode_and_plan};
use crate::raw::{EncodeError, RawImage, encode_raw};
use crate::request::{FetchRequest, InputError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Failed to download image: {0}")]
    Fetch(#[from] AllCandidatesExhausted),
    #[error("Failed to open image: {0}")]
    Decode(#[source] BackendError),
    #[error("Failed to resize image: {0}")]
    Resize(#[source] BackendError),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] EncodeError),
    #[error("Unexpected error: {0}")]
    Internal(String),
}

/// Who is to blame for a failed render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusClass::ClientError => 400,
            StatusClass::ServerError => 500,
        }
    }
}

impl RenderError {
    pub fn status_class(&self) -> StatusClass {
        match self {
            RenderError::Input(_) | RenderError::Fetch(_) | RenderError::Decode(_) => {
                StatusClass::ClientError
            }
            RenderError::Resize(_) | RenderError::Encode(_) | RenderError::Internal(_) => {
                StatusClass::ServerError
            }
        }
    }
}

/// A finished render and how it was produced.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Candidate locator that delivered the bytes.
    pub source: String,
    pub fetched_bytes: usize,
    pub plan: ResizePlan,
    pub image: RawImage,
}

impl Rendered {
    pub fn original_size(&self) -> (u32, u32) {
        self.plan.original
    }
}

/// Run the whole pipeline for one request.
pub async fn render<T, B>(
    transport: &T,
    backend: Arc<B>,
    request: &FetchRequest,
    probe: bool,
) -> Result<Rendered, RenderError>
where
    T: Transport,
    B: ImageBackend + Send + 'static,
{
    let fetched = fetch_image(transport, request, probe).await?;
    let resize = request.resize;
    let FetchedImage { locator, bytes } = fetched;
    let fetched_bytes = bytes.len();

    let (plan, image) = tokio::task::spawn_blocking(move || process(backend.as_ref(), &bytes, &resize))
        .await
        .map_err(|e| RenderError::Internal(format!("image worker failed: {e}")))??;

    let (ow, oh) = plan.original;
    tracing::info!(
        source = %locator,
        bytes = fetched_bytes,
        "processed {} ({ow}x{oh} → {}x{})",
        request.locator.as_str(),
        image.width,
        image.height,
    );

    Ok(Rendered {
        source: locator,
        fetched_bytes,
        plan,
        image,
    })
}

/// Decode, resize and encode fetched bytes.
pub fn process(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &ResizeParams,
) -> Result<(ResizePlan, RawImage), RenderError> {
    let (decoded, plan) = decode_and_plan(backend, bytes, params).map_err(RenderError::Decode)?;
    let image = apply_plan(backend, decoded, &plan).map_err(RenderError::Resize)?;
    Ok((plan, encode_raw(image)?))
}
