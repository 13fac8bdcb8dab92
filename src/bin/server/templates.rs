use askama::Template;

use crate::handlers::ImageRequest;

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct Index {
    pub(crate) form: ImageRequest,
    pub(crate) error: Option<String>,
}

pub(crate) enum Preview {
    /// markup to embed directly
    Svg(String),
    /// href of a PNG
    Png(String),
}

#[derive(Template)]
#[template(path = "result.html")]
pub(crate) struct Generated {
    pub(crate) form: ImageRequest,
    pub(crate) smiles: String,
    pub(crate) source: String,
    pub(crate) cid: Option<u64>,
    pub(crate) preview: Preview,
    pub(crate) download_href: String,
    pub(crate) file_name: String,
}
