use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("no points to render")]
    NoPoints,
    #[error("render backend failure: {0}")]
    Backend(String),
    #[error("png encoding failure: {0}")]
    PngEncoding(String),
}

impl ReportError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::NoPoints => "CHART_NO_POINTS",
            Self::Backend(_) => "CHART_BACKEND_ERROR",
            Self::PngEncoding(_) => "CHART_PNG_ENCODING_ERROR",
        }
    }
}
