use crate::tuple::Tuple4D;
use crate::ray::Ray4D;
use crate::surface::{ Surface, SurfaceId };

/// A hit.
///
/// Parameter `t` is analogous to `t` for a ray (the offset from the ray
/// origin), and `point` is the position the ray reaches at that offset.
///
/// `surface` refers to the primitive which was hit, never a bounding sphere.
#[derive(Copy, Clone, Debug)]
pub struct Hit<'a> {
    pub t: f64,
    pub point: Tuple4D,
    pub surface: &'a Surface,
}

/// Two hits are equal if their offsets are equal and the underlying
/// *pointers* of the surfaces are equal.
impl<'a> PartialEq for Hit<'a> {
    fn eq(&self, other: &Hit<'a>) -> bool {
        self.t == other.t && std::ptr::eq(self.surface, other.surface)
    }
}

impl<'a> Hit<'a> {
    pub fn new(t: f64, point: Tuple4D, surface: &'a Surface) -> Hit<'a> {
        Hit { t, point, surface }
    }
}

/// Intersects a ray with a surface (and, for bounding spheres, whatever the
/// surface contains).
///
/// `skip` names the surface the ray starts on. A polygon never hits a ray
/// leaving it, and a sphere only does when the ray heads back inside.
///
/// The returned offset may be zero or (for some sphere configurations)
/// negative; callers wanting a hit in front of the ray should use `nearest`.
pub fn intersect<'a>(s: &'a Surface, r: &Ray4D, skip: Option<SurfaceId>)
    -> Option<Hit<'a>> {
    s.local_intersect(r, skip)
}

/// Finds the closest hit in front of a ray among some surfaces.
///
/// Only hits with a strictly positive offset count. On a tie, the surface
/// which comes first wins.
pub fn nearest<'a, I>(surfaces: I, r: &Ray4D, skip: Option<SurfaceId>)
    -> Option<Hit<'a>>
    where I: IntoIterator<Item = &'a Surface> {
    let mut best: Option<Hit<'a>> = None;

    for s in surfaces {
        if let Some(hit) = intersect(s, r, skip) {
            if hit.t > 0.0 && best.as_ref().map_or(true, |b| hit.t < b.t) {
                best = Some(hit);
            }
        }
    }

    best
}

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use crate::light::Material;
#[cfg(test)]
use crate::feq;

#[cfg(test)]
fn unit_square(id: SurfaceId) -> Surface {
    Surface::polygon(id, vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(1.0, 0.0, 0.0),
        Tuple4D::point(1.0, 1.0, 0.0),
        Tuple4D::point(0.0, 1.0, 0.0),
    ], Arc::new(Material::default()))
}

#[test]
fn ray_intersects_sphere_at_analytic_distance() {
    let s = Surface::sphere(0, Tuple4D::point(0.0, 0.0, 0.0), 1.0,
        Arc::new(Material::default()));
    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    let hit = intersect(&s, &r, None).unwrap();
    assert!(feq(hit.t, 4.0));
    assert_eq!(hit.point, Tuple4D::point(0.0, 0.0, -1.0));
}

#[test]
fn ray_misses_sphere() {
    let s = Surface::sphere(0, Tuple4D::point(0.0, 0.0, 0.0), 1.0,
        Arc::new(Material::default()));

    let passing = Ray4D::new(
        Tuple4D::point(0.0, 2.0, -5.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );
    assert!(intersect(&s, &passing, None).is_none());

    let away = Ray4D::new(
        Tuple4D::point(0.0, 0.0, -5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );
    assert!(intersect(&s, &away, None).is_none());
}

#[test]
fn ray_inside_sphere_hits_far_side() {
    let s = Surface::sphere(0, Tuple4D::point(0.0, 0.0, 0.0), 2.0,
        Arc::new(Material::default()));
    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::vector(1.0, 0.0, 0.0),
    );

    let hit = intersect(&s, &r, None).unwrap();
    assert!(feq(hit.t, 2.0));
}

#[test]
fn ray_leaving_sphere_does_not_hit_it() {
    let s = Surface::sphere(3, Tuple4D::point(0.0, 0.0, 0.0), 1.0,
        Arc::new(Material::default()));
    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, -1.0),
        Tuple4D::vector(0.0, 1.0, -1.0),
    );

    assert!(intersect(&s, &r, Some(3)).is_none());
}

#[test]
fn ray_bounced_into_sphere_hits_far_side() {
    let s = Surface::sphere(3, Tuple4D::point(0.0, 0.0, 0.0), 1.0,
        Arc::new(Material::default()));
    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, -1.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    let hit = intersect(&s, &r, Some(3)).unwrap();
    assert!(feq(hit.t, 2.0));
    assert!(feq(hit.point.z, 1.0));
}

#[test]
fn ray_bounced_from_just_outside_sphere_skips_near_side() {
    let s = Surface::sphere(3, Tuple4D::point(0.0, 0.0, 0.0), 1.0,
        Arc::new(Material::default()));
    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, -1.0001),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    // Without the skip the near side is a hair away.
    assert!(feq(intersect(&s, &r, None).unwrap().t, 0.0001));

    let hit = intersect(&s, &r, Some(3)).unwrap();
    assert!(feq(hit.t, 2.0001));
}

#[test]
fn ray_hits_unit_square() {
    let square = unit_square(0);
    let r = Ray4D::new(
        Tuple4D::point(0.5, 0.5, 5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    let hit = intersect(&square, &r, None).unwrap();
    assert!(feq(hit.t, 5.0));
    assert_eq!(hit.point, Tuple4D::point(0.5, 0.5, 0.0));
}

#[test]
fn ray_hits_second_triangle_of_square() {
    let square = unit_square(0);
    let r = Ray4D::new(
        Tuple4D::point(0.1, 0.9, 2.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    let hit = intersect(&square, &r, None).unwrap();
    assert!(feq(hit.t, 2.0));
}

#[test]
fn ray_misses_unit_square() {
    let square = unit_square(0);
    let r = Ray4D::new(
        Tuple4D::point(1.5, 0.5, 5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    assert!(intersect(&square, &r, None).is_none());
}

#[test]
fn ray_parallel_to_square_misses() {
    let square = unit_square(0);
    let r = Ray4D::new(
        Tuple4D::point(-1.0, 0.5, 0.0),
        Tuple4D::vector(1.0, 0.0, 0.0),
    );

    assert!(intersect(&square, &r, None).is_none());
}

#[test]
fn polygon_ignores_ray_leaving_it() {
    let square = unit_square(7);
    let r = Ray4D::new(
        Tuple4D::point(0.5, 0.5, 5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    assert!(intersect(&square, &r, Some(7)).is_none());
    assert!(intersect(&square, &r, Some(8)).is_some());
}

#[test]
fn bounding_sphere_returns_child_hit() {
    let mut bounds = Surface::bounding(1, Tuple4D::point(0.5, 0.5, 0.0), 1.0);
    bounds.add_child(unit_square(0));

    let r = Ray4D::new(
        Tuple4D::point(0.5, 0.5, 5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    let hit = intersect(&bounds, &r, None).unwrap();
    assert_eq!(hit.surface.id(), 0);
    assert!(feq(hit.t, 5.0));
}

#[test]
fn missing_bounding_sphere_skips_children() {
    // The child sticks out of its (too small) bounding sphere; rays that
    // miss the sphere never reach it.
    let mut bounds = Surface::bounding(1, Tuple4D::point(0.0, 0.0, 0.0), 0.1);
    bounds.add_child(unit_square(0));

    let r = Ray4D::new(
        Tuple4D::point(0.5, 0.5, 5.0),
        Tuple4D::vector(0.0, 0.0, -1.0),
    );

    assert!(intersect(&unit_square(0), &r, None).is_some());
    assert!(intersect(&bounds, &r, None).is_none());
}

#[test]
fn nearest_picks_closest_positive_hit() {
    let material = Arc::new(Material::default());
    let surfaces = vec![
        Surface::sphere(0, Tuple4D::point(0.0, 0.0, 10.0), 1.0, material.clone()),
        Surface::sphere(1, Tuple4D::point(0.0, 0.0, 4.0), 1.0, material.clone()),
        Surface::sphere(2, Tuple4D::point(0.0, 0.0, -4.0), 1.0, material),
    ];

    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    let hit = nearest(&surfaces, &r, None).unwrap();
    assert_eq!(hit.surface.id(), 1);
    assert!(feq(hit.t, 3.0));
}

#[test]
fn nearest_prefers_first_surface_on_tie() {
    let material = Arc::new(Material::default());
    let surfaces = vec![
        Surface::sphere(0, Tuple4D::point(0.0, 0.0, 4.0), 1.0, material.clone()),
        Surface::sphere(1, Tuple4D::point(0.0, 0.0, 4.0), 1.0, material),
    ];

    let r = Ray4D::new(
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    assert_eq!(nearest(&surfaces, &r, None).unwrap().surface.id(), 0);
}
