pub mod consts;
pub mod error;
pub mod config;

pub mod tuple;
pub mod matrix;
pub mod ray;
pub mod color;
pub mod light;

pub mod surface;
pub mod intersect;
pub mod builder;
pub mod world;
pub mod task;

pub mod canvas;
pub mod parallel;
pub mod camera;
pub mod scene;

use consts::FEQ_EPSILON;

pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}
