use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use log::{debug, error};
use molpic::{
    batch::safe_label,
    render::{render_molecule, OutputFormat, RenderOptions},
    resolve::Lookup,
    to_smiles, InputKind, Structure,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    templates::{Generated, Index, Preview},
    AppState,
};

const MIN_SIZE: u32 = 300;
const MAX_SIZE: u32 = 1200;

/// the form fields, also used as the query string of `/image`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub(crate) struct ImageRequest {
    pub(crate) query: String,
    pub(crate) fmt: OutputFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) kind: InputKind,
    pub(crate) download: bool,
}

impl Default for ImageRequest {
    fn default() -> Self {
        Self {
            query: "aspirin".to_owned(),
            fmt: OutputFormat::Svg,
            width: 800,
            height: 600,
            kind: InputKind::Auto,
            download: false,
        }
    }
}

impl ImageRequest {
    fn clamped(mut self) -> Self {
        self.width = self.width.clamp(MIN_SIZE, MAX_SIZE);
        self.height = self.height.clamp(MIN_SIZE, MAX_SIZE);
        self
    }

    pub(crate) fn is_png(&self) -> bool {
        self.fmt == OutputFormat::Png
    }

    pub(crate) fn kind_is(&self, kind: &str) -> bool {
        self.kind.to_string() == kind
    }

    /// link to the same image from `/image`
    fn href(&self, download: bool) -> String {
        let width = self.width.to_string();
        let height = self.height.to_string();
        let kind = self.kind.to_string();
        let params = [
            ("query", self.query.as_str()),
            ("fmt", self.fmt.extension()),
            ("width", width.as_str()),
            ("height", height.as_str()),
            ("kind", kind.as_str()),
            ("download", if download { "true" } else { "false" }),
        ];
        match Url::parse_with_params("http://localhost/image", params) {
            Ok(url) => format!("/image?{}", url.query().unwrap_or_default()),
            Err(_) => "/image".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum AppError {
    #[error("failed to render page: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

struct Image {
    bytes: Vec<u8>,
    format: OutputFormat,
    structure: Structure,
    file_name: String,
}

fn mime(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Png => "image/png",
        OutputFormat::Svg => "image/svg+xml",
    }
}

/// render into a scratch directory that is removed once the bytes are read
fn render_bytes(
    smiles: &str,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<Vec<u8>, String> {
    let dir = tempfile::tempdir().map_err(|e| format!("Render error: {e}"))?;
    let out = dir.path().join(format!("molecule.{format}"));
    let res = render_molecule(smiles, &out, options);
    if !res.ok {
        return Err(res.message);
    }
    std::fs::read(&out).map_err(|e| format!("Render error: {e}"))
}

async fn make_image(lookup: &impl Lookup, req: &ImageRequest) -> Result<Image, String> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err("Please enter a name or SMILES.".to_owned());
    }
    let structure = to_smiles(lookup, query, req.kind)
        .await
        .map_err(|e| format!("Could not resolve: {e}"))?;
    debug!("{query} resolved to {}", structure.smiles);

    let options = RenderOptions {
        size: (req.width, req.height),
        legend: query.to_owned(),
        ..Default::default()
    };
    let format = req.fmt;
    let smiles = structure.smiles.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        render_bytes(&smiles, format, &options)
    })
    .await
    .map_err(|e| format!("Render error: {e}"))??;

    Ok(Image {
        bytes,
        format,
        structure,
        file_name: format!("{}.{format}", safe_label(query).replace('"', "")),
    })
}

pub(crate) async fn index() -> Result<Html<String>, AppError> {
    let page = Index {
        form: ImageRequest::default(),
        error: None,
    };
    Ok(page.render()?.into())
}

pub(crate) async fn generate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ImageRequest>,
) -> Result<Html<String>, AppError> {
    let form = form.clamped();
    let page = match make_image(&state.pubchem, &form).await {
        Err(error) => Index {
            form,
            error: Some(error),
        }
        .render()?,
        Ok(image) => {
            let preview = match image.format {
                OutputFormat::Svg => {
                    let svg = String::from_utf8_lossy(&image.bytes);
                    let start = svg.find("<svg").unwrap_or(0);
                    Preview::Svg(svg[start..].to_owned())
                }
                OutputFormat::Png => Preview::Png(form.href(false)),
            };
            Generated {
                download_href: form.href(true),
                smiles: image.structure.smiles,
                source: image.structure.source.to_string(),
                cid: image.structure.cid,
                preview,
                file_name: image.file_name,
                form,
            }
            .render()?
        }
    };
    Ok(page.into())
}

pub(crate) async fn image(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ImageRequest>,
) -> Response {
    let req = req.clamped();
    let image = match make_image(&state.pubchem, &req).await {
        Ok(image) => image,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(mime(image.format)),
    );
    if req.download {
        let value = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            image.file_name
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (headers, image.bytes).into_response()
}
