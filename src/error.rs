use std::io;

use thiserror::Error;

/// What is wrong with a polygon declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolygonDefect {
    #[error("has fewer than three vertices")]
    TooFewVertices,

    #[error("has collinear vertices")]
    Collinear,

    #[error("is not planar and convex")]
    NotPlanarConvex,
}

/// Errors raised while loading a scene or building its world.
///
/// All of these are caught before rendering starts.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed scene: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("object {object} uses undeclared shape `{shape}`")]
    UnknownShape { object: usize, shape: String },

    #[error("object {object} uses undeclared material `{material}`")]
    UnknownMaterial { object: usize, material: String },

    #[error("object {object} scales shape `{shape}` non-uniformly, but the shape has spheres")]
    NonUniformSphereScale { object: usize, shape: String },

    #[error("polygon {polygon} of shape `{shape}` {defect}")]
    BadPolygon { shape: String, polygon: usize, defect: PolygonDefect },

    #[error("sphere {sphere} of shape `{shape}` has non-positive radius {radius}")]
    BadRadius { shape: String, sphere: usize, radius: f64 },

    #[error("scale takes one or three factors, got {0}")]
    ScaleArity(usize),
}

/// Errors raised while rendering or saving an image.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not start render worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode image: {0}")]
    Image(#[from] image::ImageError),
}
