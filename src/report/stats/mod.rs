mod downsample;
mod summary;

pub(crate) use downsample::{downsample_points, GraphPoint};
pub(crate) use summary::compute_metric_summary;
