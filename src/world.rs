use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ray::Ray4D;
use crate::tuple::Tuple4D;
use crate::color::Color;
use crate::light::{ Light, Material, lighting };
use crate::surface::{ Surface, SurfaceId };
use crate::intersect::{ Hit, intersect, nearest };
use crate::task::RayTask;

/// A world with surfaces and lights.
///
/// `surfaces` holds the roots of the acceleration structure: bounding
/// spheres (which own their polygons) and plain spheres. Worlds are
/// immutable once built, and are shared between render workers.
#[derive(Debug, Default)]
pub struct World {
    pub surfaces: Vec<Surface>,
    pub lights: Vec<Light>,
    pub materials: BTreeMap<String, Arc<Material>>,
}

impl World {
    /// Creates an empty world with no surfaces or lights.
    pub fn empty() -> World {
        Default::default()
    }

    /// Looks up a material by name.
    pub fn material(&self, name: &str) -> Option<&Arc<Material>> {
        self.materials.get(name)
    }

    /// Finds the closest surface hit in front of a ray.
    pub fn nearest_hit(&self, r: &Ray4D, skip: Option<SurfaceId>) -> Option<Hit> {
        nearest(&self.surfaces, r, skip)
    }

    /// Determines whether something blocks `light` as seen from `p`.
    ///
    /// For point lights, only hits closer than the light count. A
    /// directional light is blocked by anything in its direction.
    pub fn is_shadowed(&self, p: Tuple4D, light: &Light,
        skip: Option<SurfaceId>) -> bool {
        let v = light.direction_from(p);
        let distance = if light.is_directional() {
            std::f64::INFINITY
        } else {
            v.magnitude()
        };

        let r = Ray4D::new(p, v);
        self.surfaces.iter().any(|s| match intersect(s, &r, skip) {
            Some(hit) => hit.t > 0.0 && hit.t < distance,
            None => false,
        })
    }

    /// Calculates the local color for a hit, and bounces the ray.
    ///
    /// The normal is flipped to face the viewer, so both sides of a polygon
    /// are lit. Each light which faces the surface and isn't shadowed adds
    /// its diffuse and specular terms. The task then continues as the mirror
    /// reflection from the hit point, with its energy scaled by the
    /// material's `ks`.
    ///
    /// The returned color is clamped to the 0-255 range, but not yet scaled
    /// by the task's energy.
    pub fn shade(&self, task: &mut RayTask, hit: &Hit) -> Color {
        let fallback;
        let material = match hit.surface.material() {
            Some(m) => m,
            None => {
                fallback = Material::default();
                &fallback
            },
        };

        let eyev = -task.ray.direction.normalize();
        let mut normalv = hit.surface.normal_at(hit.point).normalize();
        if eyev.dot(&normalv) < 0.0 {
            normalv = -normalv;
        }

        let mut color = Color::black();
        for light in self.lights.iter() {
            let lightv = light.direction_from(hit.point).normalize();
            if lightv.dot(&normalv) < 0.0 {
                continue;
            }

            if self.is_shadowed(hit.point, light, Some(hit.surface.id())) {
                continue;
            }

            color = color + lighting(material, light, lightv, eyev, normalv);
        }

        task.ray = Ray4D::new(hit.point, eyev.mirror(&normalv));
        task.from = Some(hit.surface.id());
        task.energy *= material.ks;
        task.depth += 1;

        color.clamp_channels()
    }

    /// Advances a task by one bounce, returning the color it contributes.
    ///
    /// A ray which hits nothing contributes black and loses all its energy.
    pub fn ray_color(&self, task: &mut RayTask) -> Color {
        let energy = task.energy;

        match self.nearest_hit(&task.ray, task.from) {
            Some(hit) => self.shade(task, &hit) * energy,
            None => {
                task.energy = 0.0;
                Color::black()
            },
        }
    }
}

#[cfg(test)]
use crate::feq;

#[cfg(test)]
fn grey(ks: f64) -> Arc<Material> {
    Arc::new(Material {
        name: String::from("grey"),
        diffuse: Color::rgb(0.5, 0.5, 0.5),
        ks,
        ..Default::default()
    })
}

#[cfg(test)]
fn two_spheres() -> World {
    let mut w = World::empty();
    w.lights.push(Light::point(Color::white(), Tuple4D::point(0.0, 0.0, -10.0)));
    w.surfaces.push(Surface::sphere(0, Tuple4D::point(0.0, 0.0, 0.0), 1.0, grey(0.0)));
    w.surfaces.push(Surface::sphere(1, Tuple4D::point(0.0, 0.0, 10.0), 1.0, grey(0.5)));
    w
}

#[test]
fn shadow_nothing_between_point_and_light() {
    let w = two_spheres();
    let light = w.lights[0];

    assert!(!w.is_shadowed(Tuple4D::point(0.0, 10.0, 0.0), &light, None));
}

#[test]
fn shadow_object_between_point_and_light() {
    let w = two_spheres();
    let light = w.lights[0];

    assert!(w.is_shadowed(Tuple4D::point(0.0, 0.0, 5.0), &light, None));
}

#[test]
fn shadow_object_behind_light() {
    let w = two_spheres();
    let light = Light::point(Color::white(), Tuple4D::point(0.0, 0.0, 5.0));

    // The sphere at z=10 lies beyond the light.
    assert!(!w.is_shadowed(Tuple4D::point(0.0, 0.0, 3.0), &light, None));
}

#[test]
fn shadow_directional_light_has_no_range() {
    let w = two_spheres();
    let light = Light::directional(Color::white(), Tuple4D::vector(0.0, 0.0, -1.0));

    assert!(w.is_shadowed(Tuple4D::point(0.0, 0.0, 5.0), &light, None));
    assert!(!w.is_shadowed(Tuple4D::point(0.0, 5.0, 5.0), &light, None));
}

#[cfg(test)]
fn floor_seen_from_above(light: Light) -> (World, RayTask) {
    let mut w = World::empty();
    w.lights.push(light);
    w.surfaces.push(Surface::polygon(0, vec![
        Tuple4D::point(-1.0, 0.0, -1.0),
        Tuple4D::point(1.0, 0.0, -1.0),
        Tuple4D::point(1.0, 0.0, 1.0),
        Tuple4D::point(-1.0, 0.0, 1.0),
    ], grey(0.0)));

    let task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.3, 5.0, -0.4),
        Tuple4D::vector(0.0, -1.0, 0.0),
    ), 0);

    (w, task)
}

#[test]
fn directional_light_lights_the_side_it_shines_on() {
    let sun = Light::directional(Color::white(), Tuple4D::vector(0.0, -1.0, 0.0));
    let (w, mut task) = floor_seen_from_above(sun);

    assert_eq!(w.ray_color(&mut task), Color::rgb(127.0, 127.0, 127.0));
}

#[test]
fn directional_light_from_below_leaves_top_dark() {
    let light = Light::directional(Color::white(), Tuple4D::vector(0.0, 1.0, 0.0));
    let (w, mut task) = floor_seen_from_above(light);

    assert_eq!(w.ray_color(&mut task), Color::black());
}

#[test]
fn surface_does_not_shadow_itself() {
    let w = two_spheres();
    let light = w.lights[0];

    assert!(!w.is_shadowed(Tuple4D::point(0.0, 0.0, -1.0), &light, Some(0)));
}

#[test]
fn ray_color_miss_is_black_and_drains_energy() {
    let w = two_spheres();
    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 1.0, 0.0),
    ), 0);

    assert_eq!(w.ray_color(&mut task), Color::black());
    assert_eq!(task.energy, 0.0);
    assert_eq!(task.depth, 0);
}

#[test]
fn ray_color_hit_shades_and_bounces() {
    let w = two_spheres();
    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    // Lit head-on: full diffuse, no specular.
    assert_eq!(w.ray_color(&mut task), Color::rgb(127.0, 127.0, 127.0));
    assert_eq!(task.from, Some(0));
    assert_eq!(task.depth, 1);
    assert_eq!(task.energy, 0.0);
    assert_eq!(task.ray.origin, Tuple4D::point(0.0, 0.0, -1.0));
    assert_eq!(task.ray.direction, Tuple4D::vector(0.0, 0.0, -1.0));
}

#[test]
fn shade_scales_by_remaining_energy() {
    let w = two_spheres();
    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);
    task.energy = 0.5;

    let c = w.ray_color(&mut task);
    assert!(feq(c.r, 63.5));
}

#[test]
fn shade_lights_back_face_of_polygon() {
    let mut w = World::empty();
    w.lights.push(Light::point(Color::white(), Tuple4D::point(0.5, 0.5, -10.0)));
    w.surfaces.push(Surface::polygon(0, vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(1.0, 0.0, 0.0),
        Tuple4D::point(1.0, 1.0, 0.0),
        Tuple4D::point(0.0, 1.0, 0.0),
    ], grey(1.0)));

    // The polygon normal is +z; the viewer and light are both on -z.
    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.5, 0.5, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    let c = w.ray_color(&mut task);
    assert!(c.r > 0.0);
    assert_eq!(task.energy, 1.0);
    assert_eq!(task.ray.direction, Tuple4D::vector(0.0, 0.0, -1.0));
}

#[test]
fn shade_clamps_channels() {
    let mut w = two_spheres();
    w.lights.push(Light::point(Color::white(), Tuple4D::point(0.0, 0.0, -20.0)));
    w.lights.push(Light::point(Color::white(), Tuple4D::point(0.0, 0.0, -30.0)));

    let mut task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    assert_eq!(w.ray_color(&mut task), Color::white());
}
