use std::sync::Arc;

use crate::ray::Ray4D;
use crate::tuple::Tuple4D;
use crate::world::World;
use crate::canvas::{ Canvas, Framebuffer, FrameSink };
use crate::config::RenderConfig;
use crate::task::RayTask;
use crate::parallel;
use crate::error::RenderError;

/// A pinhole camera looking through a rectangle of integer pixel
/// coordinates.
///
/// `look_at` is the image plane's normal, pointing from the scene back
/// towards the viewer. The plane sits `focal_length` from the focal point on
/// the scene's side. Pixel `(x, y)` is the point `vrp + x*u + y*v` on that
/// plane, where `u` runs to the image's right and `v` runs up. Each primary
/// ray starts on the image plane and points away from the focal point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    pub focal_point: Tuple4D,
    pub focal_length: f64,

    /// Unit normal of the image plane, towards the viewer.
    pub n: Tuple4D,

    /// Unit horizontal and vertical axes of the image plane.
    pub u: Tuple4D,
    pub v: Tuple4D,

    /// Where the image plane meets its normal through the focal point;
    /// pixel `(0, 0)`.
    pub vrp: Tuple4D,

    pub umin: i64,
    pub umax: i64,
    pub vmin: i64,
    pub vmax: i64,
}

impl Camera {
    pub fn new(look_at: Tuple4D, up: Tuple4D, focal_point: Tuple4D,
        focal_length: f64, (umin, umax): (i64, i64), (vmin, vmax): (i64, i64))
        -> Camera {
        let n = look_at.xyz().normalize();
        let u = up.xyz().cross(&n).normalize();
        let v = n.cross(&u);

        let focal_point = Tuple4D { w: 1.0, ..focal_point };
        let vrp = focal_point - (n * focal_length);

        Camera {
            focal_point,
            focal_length,
            n,
            u,
            v,
            vrp,
            umin,
            umax,
            vmin,
            vmax,
        }
    }

    /// Width of the image, in pixels.
    pub fn width(&self) -> usize {
        (self.umax - self.umin + 1).max(0) as usize
    }

    /// Height of the image, in pixels.
    pub fn height(&self) -> usize {
        (self.vmax - self.vmin + 1).max(0) as usize
    }

    /// Every pixel coordinate in the viewport, column by column.
    pub fn pixels(&self) -> impl Iterator<Item = (i64, i64)> {
        let (vmin, vmax) = (self.vmin, self.vmax);
        (self.umin..=self.umax)
            .flat_map(move |x| (vmin..=vmax).map(move |y| (x, y)))
    }

    /// Where pixel `(x, y)` lands in the image, as `(column, row)`.
    ///
    /// Row zero is the top of the image, i.e. `y == vmax`.
    pub fn image_position(&self, x: i64, y: i64) -> (usize, usize) {
        ((x - self.umin) as usize, (self.vmax - y) as usize)
    }

    pub fn ray_for_pixel(&self, x: i64, y: i64) -> Ray4D {
        let on_plane = self.vrp + (self.u * x as f64) + (self.v * y as f64);

        Ray4D::new(on_plane, on_plane - self.focal_point)
    }

    /// Renders on a pool of worker threads, showing progress in `sink`.
    pub fn render(&self, world: Arc<World>, config: &RenderConfig,
        sink: &mut dyn FrameSink) -> Result<Canvas, RenderError> {
        parallel::render(world, self, config, sink)
    }

    /// Renders one pixel at a time on the calling thread.
    pub fn render_serial(&self, world: &World, config: &RenderConfig) -> Canvas {
        let framebuffer = Framebuffer::new(self.width(), self.height());

        for (x, y) in self.pixels() {
            let (col, row) = self.image_position(x, y);
            let task = RayTask::new(self.ray_for_pixel(x, y), framebuffer.index(col, row));
            task.run(world, &framebuffer, config);
        }

        framebuffer.snapshot()
    }
}

#[cfg(test)]
use std::time::Duration;
#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::light::{ Light, Material };
#[cfg(test)]
use crate::builder::{ WorldBuilder, ShapeTemplate, Placement, Transform };
#[cfg(test)]
use crate::canvas::NullSink;

/// Looking down the -y axis from y=40, with z up.
#[cfg(test)]
fn overhead_camera() -> Camera {
    Camera::new(
        Tuple4D::vector(0.0, 1.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
        Tuple4D::point(0.0, 40.0, 0.0),
        20.0,
        (-10, 10),
        (-10, 10),
    )
}

/// A matte grey ball of radius 8 at the origin, lit from straight above the
/// camera.
#[cfg(test)]
fn lit_ball() -> World {
    let mut b = WorldBuilder::new();
    b.material(Material {
            name: String::from("grey"),
            diffuse: Color::rgb(0.5, 0.5, 0.5),
            ..Default::default()
        })
        .light(Light::point(Color::white(), Tuple4D::point(0.0, 100.0, 0.0)))
        .shape(ShapeTemplate::new("ball").with_sphere(Tuple4D::point(0.0, 0.0, 0.0), 8.0))
        .place(Placement::new("ball", "grey"));

    b.build().unwrap()
}

#[cfg(test)]
fn mirror_room() -> World {
    let mut b = WorldBuilder::new();
    b.material(Material {
            name: String::from("chrome"),
            diffuse: Color::rgb(0.1, 0.1, 0.1),
            ks: 0.8,
            alpha: 20.0,
            ..Default::default()
        })
        .material(Material {
            name: String::from("clay"),
            diffuse: Color::rgb(0.8, 0.4, 0.2),
            ks: 0.3,
            alpha: 5.0,
            ..Default::default()
        })
        .light(Light::point(Color::rgb(200.0, 200.0, 200.0), Tuple4D::point(5.0, 30.0, 5.0)))
        .light(Light::directional(Color::rgb(40.0, 40.0, 60.0), Tuple4D::vector(-1.0, -1.0, 0.0)))
        .shape(ShapeTemplate::new("ball").with_sphere(Tuple4D::point(0.0, 0.0, 0.0), 1.0))
        .shape(ShapeTemplate::new("floor").with_polygon(vec![
            Tuple4D::point(-20.0, 0.0, -20.0),
            Tuple4D::point(20.0, 0.0, -20.0),
            Tuple4D::point(20.0, 0.0, 20.0),
            Tuple4D::point(-20.0, 0.0, 20.0),
        ]))
        .place(Placement::new("floor", "clay").then(Transform::Translate(0.0, -6.0, 0.0)))
        .place(Placement::new("ball", "chrome").then(Transform::uniform(4.0)))
        .place(Placement::new("ball", "clay")
            .then(Transform::uniform(2.0))
            .then(Transform::Translate(6.0, -4.0, 3.0)));

    b.build().unwrap()
}

#[test]
fn camera_basis() {
    let c = overhead_camera();

    assert_eq!(c.n, Tuple4D::vector(0.0, 1.0, 0.0));
    assert_eq!(c.u, Tuple4D::vector(-1.0, 0.0, 0.0));
    assert_eq!(c.v, Tuple4D::vector(0.0, 0.0, 1.0));
    assert_eq!(c.vrp, Tuple4D::point(0.0, 20.0, 0.0));
    assert_eq!((c.width(), c.height()), (21, 21));
}

#[test]
fn ray_through_center() {
    let c = overhead_camera();
    let r = c.ray_for_pixel(0, 0);

    assert_eq!(r.origin, Tuple4D::point(0.0, 20.0, 0.0));
    assert_eq!(r.direction, Tuple4D::vector(0.0, -1.0, 0.0));
}

#[test]
fn ray_through_corner() {
    let c = overhead_camera();
    let r = c.ray_for_pixel(-10, 10);

    assert_eq!(r.origin, Tuple4D::point(10.0, 20.0, 10.0));
    assert_eq!(r.direction, Tuple4D::vector(10.0, -20.0, 10.0).normalize());
}

#[test]
fn pixels_map_to_image_positions() {
    let c = overhead_camera();

    assert_eq!(c.image_position(-10, 10), (0, 0));
    assert_eq!(c.image_position(0, 0), (10, 10));
    assert_eq!(c.image_position(10, -10), (20, 20));
    assert_eq!(c.pixels().count(), 21 * 21);
    assert_eq!(c.pixels().next(), Some((-10, -10)));
}

#[test]
fn render_lit_ball() {
    let w = lit_ball();
    let c = overhead_camera();
    let image = c.render_serial(&w, &RenderConfig::default());

    // Lit head-on: half the light's intensity.
    let center = image.read_pixel(10, 10).unwrap();
    assert_eq!(center, Color::rgb(127.0, 127.0, 127.0));

    // Near the silhouette the surface turns away from the light.
    let (col, row) = c.image_position(4, 0);
    let edge = image.read_pixel(col, row).unwrap();
    assert!(edge.r > 0.0 && edge.r < center.r);

    // Rays past the silhouette miss everything.
    assert_eq!(image.read_pixel(0, 0).unwrap(), Color::black());
    assert_eq!(image.read_pixel(20, 20).unwrap(), Color::black());
}

#[test]
fn threaded_render_matches_serial() {
    let w = Arc::new(lit_ball());
    let c = overhead_camera();
    let config = RenderConfig {
        threads: Some(3),
        preview_interval: Duration::from_millis(1),
        ..Default::default()
    };

    let serial = c.render_serial(&w, &config);
    let threaded = c.render(Arc::clone(&w), &config, &mut NullSink).unwrap();

    assert_eq!(threaded, serial);
}

#[test]
fn worker_count_does_not_change_image() {
    let w = Arc::new(mirror_room());
    let c = Camera::new(
        Tuple4D::vector(0.0, 0.3, 1.0),
        Tuple4D::vector(0.0, 1.0, 0.0),
        Tuple4D::point(0.0, 4.0, 30.0),
        10.0,
        (-12, 12),
        (-9, 9),
    );

    let render_with = |threads| {
        let config = RenderConfig {
            threads: Some(threads),
            preview_interval: Duration::from_millis(1),
            ..Default::default()
        };
        c.render(Arc::clone(&w), &config, &mut NullSink).unwrap()
    };

    let one = render_with(1);
    assert_eq!(one, render_with(4));
    assert_eq!(one, c.render_serial(&w, &RenderConfig::default()));
}

/// Asks for a pause on the first refresh only.
#[cfg(test)]
struct PausingSink {
    frame: Canvas,
    pauses: usize,
}

#[cfg(test)]
impl FrameSink for PausingSink {
    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.frame.write_pixel(x, y, &color);
    }

    fn pause_requested(&mut self) -> bool {
        self.pauses == 0
    }

    fn hold(&mut self) {
        self.pauses += 1;
    }
}

#[test]
fn paused_render_still_completes() {
    let w = Arc::new(mirror_room());
    let c = overhead_camera();
    let config = RenderConfig {
        threads: Some(2),
        preview_interval: Duration::from_millis(1),
        ..Default::default()
    };

    let mut sink = PausingSink {
        frame: Canvas::new(c.width(), c.height()),
        pauses: 0,
    };

    let image = c.render(Arc::clone(&w), &config, &mut sink).unwrap();

    assert_eq!(image, c.render_serial(&w, &config));
    assert_eq!(sink.frame, image);
    assert!(sink.pauses <= 1);
}
