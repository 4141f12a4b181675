use crate::ray::Ray4D;
use crate::world::World;
use crate::canvas::Framebuffer;
use crate::config::RenderConfig;
use crate::surface::SurfaceId;

/// One pixel's ray, in flight.
///
/// A task starts as a primary ray from the camera. Every `step` traces it to
/// its next hit, adds the hit's contribution to the task's pixel, and leaves
/// the task holding the reflected ray. Tasks are independent of each other:
/// all a step needs is the (shared, read-only) world.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayTask {
    /// The ray to trace next.
    pub ray: Ray4D,

    /// The surface `ray` starts on, if any.
    pub from: Option<SurfaceId>,

    /// Fraction of light this ray still carries back to its pixel.
    pub energy: f64,

    /// Number of bounces traced so far.
    pub depth: u32,

    /// Index of the pixel this task contributes to.
    pub pixel: usize,
}

impl RayTask {
    /// Creates a primary ray task with full energy.
    pub fn new(ray: Ray4D, pixel: usize) -> RayTask {
        RayTask {
            ray,
            from: None,
            energy: 1.0,
            depth: 0,
            pixel,
        }
    }

    /// Traces one bounce and accumulates its color into the framebuffer.
    ///
    /// Returns whether the task should keep going. It stops once its energy
    /// falls below the threshold, it reaches the bounce limit, or its pixel
    /// has saturated to white.
    pub fn step(&mut self, world: &World, framebuffer: &Framebuffer,
        config: &RenderConfig) -> bool {
        let color = world.ray_color(self);
        let pixel = framebuffer.accumulate(self.pixel, color);

        let exhausted = self.energy < config.energy_threshold;
        let too_deep = self.depth >= config.max_depth;
        let saturated = pixel == [255, 255, 255];

        !(exhausted || too_deep || saturated)
    }

    /// Steps the task until it finishes. Returns the number of steps taken.
    pub fn run(mut self, world: &World, framebuffer: &Framebuffer,
        config: &RenderConfig) -> u32 {
        let mut steps = 1;
        while self.step(world, framebuffer, config) {
            steps += 1;
        }

        steps
    }
}

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use crate::tuple::Tuple4D;
#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::light::{ Light, Material };
#[cfg(test)]
use crate::surface::Surface;

#[cfg(test)]
fn square_at(id: SurfaceId, z: f64, material: Arc<Material>) -> Surface {
    Surface::polygon(id, vec![
        Tuple4D::point(-10.0, -10.0, z),
        Tuple4D::point(10.0, -10.0, z),
        Tuple4D::point(10.0, 10.0, z),
        Tuple4D::point(-10.0, 10.0, z),
    ], material)
}

/// Two perfect, black mirrors facing each other.
#[cfg(test)]
fn mirror_box() -> World {
    let mirror = Arc::new(Material {
        diffuse: Color::black(),
        ks: 1.0,
        ..Default::default()
    });

    let mut w = World::empty();
    w.surfaces.push(square_at(0, 0.0, mirror.clone()));
    w.surfaces.push(square_at(1, 10.0, mirror));
    w
}

#[test]
fn mirrors_stop_at_bounce_limit() {
    let w = mirror_box();
    let fb = Framebuffer::new(1, 1);
    let config = RenderConfig::default();

    let task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, 5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    assert_eq!(task.run(&w, &fb, &config), config.max_depth);
    assert_eq!(fb.load(0), [0, 0, 0]);
}

#[test]
fn bounce_limit_is_configurable() {
    let w = mirror_box();
    let fb = Framebuffer::new(1, 1);
    let config = RenderConfig { max_depth: 3, ..Default::default() };

    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, 5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    assert!(task.step(&w, &fb, &config));
    assert_eq!(task.from, Some(1));
    assert!(task.step(&w, &fb, &config));
    assert_eq!(task.from, Some(0));
    assert!(!task.step(&w, &fb, &config));
    assert_eq!(task.depth, 3);
}

#[test]
fn miss_stops_after_one_step() {
    let w = World::empty();
    let fb = Framebuffer::new(1, 1);

    let task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    assert_eq!(task.run(&w, &fb, &RenderConfig::default()), 1);
}

#[test]
fn saturated_pixel_stops_task() {
    // Lit mirrors: every bounce adds light, so the pixel saturates long
    // before the bounce limit.
    let mut w = World::empty();
    let mirror = Arc::new(Material {
        diffuse: Color::rgb(0.5, 0.5, 0.5),
        ks: 1.0,
        ..Default::default()
    });
    w.surfaces.push(square_at(0, 0.0, mirror.clone()));
    w.surfaces.push(square_at(1, 10.0, mirror));
    w.lights.push(Light::point(Color::white(), Tuple4D::point(0.0, 0.0, 5.0)));

    let fb = Framebuffer::new(1, 1);
    let task = RayTask::new(Ray4D::new(
        Tuple4D::point(1.0, 0.0, 5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    let steps = task.run(&w, &fb, &RenderConfig::default());
    assert!(steps < 10);
    assert_eq!(fb.load(0), [255, 255, 255]);
}
