use std::sync::Arc;

use crate::tuple::Tuple4D;
use crate::ray::Ray4D;
use crate::light::Material;
use crate::matrix::Matrix3x4;
use crate::intersect::{ Hit, nearest };

/// Identifies a surface within a world.
///
/// Ids are only used to keep a ray from immediately re-hitting the surface
/// it just bounced off of.
pub type SurfaceId = usize;

/// Hands out increasing surface ids for a single world.
#[derive(Debug, Default)]
pub struct SurfaceIds {
    next: SurfaceId,
}

impl SurfaceIds {
    pub fn new() -> SurfaceIds {
        SurfaceIds { next: 0 }
    }

    pub fn next(&mut self) -> SurfaceId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// The vertices and precomputed normal of a polygon.
///
/// Vertices are expected to be coplanar, convex and not all collinear; see
/// `builder::PolygonTemplate::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonInfo {
    pub vertices: Vec<Tuple4D>,
    pub normal: Tuple4D,
}

impl PolygonInfo {
    pub fn new(vertices: Vec<Tuple4D>) -> PolygonInfo {
        let normal = if vertices.len() >= 3 {
            (vertices[1] - vertices[0])
                .cross(&(vertices[2] - vertices[0]))
                .normalize()
        } else {
            Tuple4D::vector(0.0, 0.0, 0.0)
        };

        PolygonInfo { vertices, normal }
    }

    /// The centroid of the vertices.
    pub fn centroid(&self) -> Tuple4D {
        let sum = self.vertices.iter()
            .fold(Tuple4D::default(), |acc, v| acc + *v);

        sum / self.vertices.len() as f64
    }

    /// The largest distance from the centroid to a vertex.
    pub fn radius(&self) -> f64 {
        let center = self.centroid();

        self.vertices.iter()
            .map(|v| center.distance(v))
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone)]
pub enum SurfaceKind {
    /// A flat, convex polygon.
    Polygon(PolygonInfo),

    /// A sphere. With no children it is a renderable primitive; with
    /// children it only bounds them, and rays that miss it skip them all.
    Sphere {
        center: Tuple4D,
        radius: f64,
        children: Vec<Surface>,
    },
}

/// A surface in a world.
///
/// Bounding spheres own their children directly, so a world's root list is
/// the whole surface tree.
#[derive(Debug, Clone)]
pub struct Surface {
    pub kind: SurfaceKind,
    material: Option<Arc<Material>>,
    id: SurfaceId,
}

impl Surface {
    /// Creates a polygon from its vertices.
    pub fn polygon(id: SurfaceId, vertices: Vec<Tuple4D>,
        material: Arc<Material>) -> Surface {
        Surface {
            kind: SurfaceKind::Polygon(PolygonInfo::new(vertices)),
            material: Some(material),
            id,
        }
    }

    /// Creates a renderable sphere.
    pub fn sphere(id: SurfaceId, center: Tuple4D, radius: f64,
        material: Arc<Material>) -> Surface {
        Surface {
            kind: SurfaceKind::Sphere { center, radius, children: Vec::new() },
            material: Some(material),
            id,
        }
    }

    /// Creates an empty bounding sphere. Children are added with
    /// `add_child`.
    pub fn bounding(id: SurfaceId, center: Tuple4D, radius: f64) -> Surface {
        Surface {
            kind: SurfaceKind::Sphere { center, radius, children: Vec::new() },
            material: None,
            id,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn material(&self) -> Option<&Material> {
        self.material.as_deref()
    }

    /// Adds a child to a bounding sphere.
    ///
    /// The child must lie entirely inside the sphere; this is not checked.
    pub fn add_child(&mut self, child: Surface) {
        let children = match self.kind {
            SurfaceKind::Sphere { ref mut children, .. } => children,
            _ => panic!("Cannot add child to a polygon."),
        };

        children.push(child);
    }

    /// Returns the children of a bounding sphere, or an empty slice.
    pub fn children(&self) -> &[Surface] {
        match self.kind {
            SurfaceKind::Sphere { ref children, .. } => children,
            SurfaceKind::Polygon(_) => &[],
        }
    }

    /// Whether this surface only bounds other surfaces.
    pub fn is_bounding(&self) -> bool {
        !self.children().is_empty()
    }

    /// Returns a ref. to `PolygonInfo` if this is a polygon.
    pub fn polygon_info(&self) -> Option<&PolygonInfo> {
        if let SurfaceKind::Polygon(ref info) = self.kind {
            Some(info)
        } else {
            None
        }
    }

    /// The center of the surface's bounding sphere.
    pub fn center(&self) -> Tuple4D {
        match self.kind {
            SurfaceKind::Polygon(ref info) => info.centroid(),
            SurfaceKind::Sphere { center, .. } => center,
        }
    }

    /// The radius of the surface's bounding sphere.
    pub fn radius(&self) -> f64 {
        match self.kind {
            SurfaceKind::Polygon(ref info) => info.radius(),
            SurfaceKind::Sphere { radius, .. } => radius,
        }
    }

    /// Checks whether this is a sphere with exactly the given bounds.
    pub fn bounds_exactly(&self, center: &Tuple4D, radius: f64) -> bool {
        match self.kind {
            SurfaceKind::Sphere { center: ref c, radius: r, .. }
                => c.exact_eq(center) && r == radius,
            SurfaceKind::Polygon(_) => false,
        }
    }

    /// The (unnormalized) outward normal at a point on the surface.
    pub fn normal_at(&self, at: Tuple4D) -> Tuple4D {
        match self.kind {
            SurfaceKind::Polygon(ref info) => info.normal,
            SurfaceKind::Sphere { center, .. } => (at - center).xyz(),
        }
    }

    /// Intersects a ray with this surface.
    ///
    /// `skip` is the surface the ray is leaving, if any. The ray direction
    /// must be unit length.
    pub fn local_intersect<'a>(&'a self, ray: &Ray4D, skip: Option<SurfaceId>)
        -> Option<Hit<'a>> {
        match self.kind {
            SurfaceKind::Polygon(_) => self.intersect_polygon(ray, skip),
            SurfaceKind::Sphere { .. } => self.intersect_sphere(ray, skip),
        }
    }

    /// Intersects a ray with a sphere, descending into children when the
    /// sphere bounds other surfaces.
    fn intersect_sphere<'a>(&'a self, ray: &Ray4D, skip: Option<SurfaceId>)
        -> Option<Hit<'a>> {
        let (center, radius, children) = match self.kind {
            SurfaceKind::Sphere { center, radius, ref children }
                => (center, radius, children),
            _ => unreachable!(),
        };

        // Leaving a sphere we just bounced off of never hits it again.
        let skipped = skip == Some(self.id);
        let outward = ray.direction.dot(&(ray.origin - center).xyz());
        if skipped && outward > 0.0 {
            return None;
        }

        let to_center = (center - ray.origin).xyz();
        let s = to_center.dot(&ray.direction);
        let t_sq = to_center.dot(&to_center);
        let r_sq = radius * radius;

        // Pointing away from a sphere we're outside of.
        if s < 0.0 && t_sq > r_sq {
            return None;
        }

        // Passing the sphere by.
        let m_sq = t_sq - s * s;
        if m_sq > r_sq {
            return None;
        }

        if !children.is_empty() {
            let candidates = children.iter().filter(|c| Some(c.id) != skip);
            return nearest(candidates, ray, skip);
        }

        let q = (r_sq - m_sq).sqrt();
        let t = if t_sq > r_sq && (!skipped || outward >= 0.0) {
            s - q
        } else {
            s + q
        };

        Some(Hit::new(t, ray.position(t), self))
    }

    /// Intersects a ray with a polygon.
    ///
    /// The polygon is split into a fan of triangles around its first vertex.
    /// For each, the ray/plane intersection is solved for two edge
    /// coefficients and the ray offset; the hit is inside the triangle when
    /// both coefficients are non-negative and sum to less than one.
    fn intersect_polygon<'a>(&'a self, ray: &Ray4D, skip: Option<SurfaceId>)
        -> Option<Hit<'a>> {
        let info = match self.kind {
            SurfaceKind::Polygon(ref info) => info,
            _ => unreachable!(),
        };

        if skip == Some(self.id) || info.vertices.len() < 3 {
            return None;
        }

        let a = info.vertices[0];
        for edge in info.vertices[1..].windows(2) {
            let (b, c) = (edge[0], edge[1]);
            let system = Matrix3x4::from_columns(
                a - b, a - c, ray.direction, a - ray.origin
            );

            // Parallel rays and degenerate triangles have no solution.
            if let Some([beta, gamma, t]) = system.solve() {
                if beta >= 0.0 && gamma >= 0.0 && beta + gamma < 1.0
                    && t >= 0.0 {
                    return Some(Hit::new(t, ray.position(t), self));
                }
            }
        }

        None
    }
}

#[cfg(test)]
fn test_material() -> Arc<Material> {
    Arc::new(Material::default())
}

#[test]
fn polygon_center_and_radius() {
    let square = Surface::polygon(0, vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(2.0, 0.0, 0.0),
        Tuple4D::point(2.0, 2.0, 0.0),
        Tuple4D::point(0.0, 2.0, 0.0),
    ], test_material());

    assert_eq!(square.center(), Tuple4D::point(1.0, 1.0, 0.0));
    assert!(crate::feq(square.radius(), 2.0f64.sqrt()));
    assert_eq!(square.normal_at(Tuple4D::point(1.0, 1.0, 0.0)),
        Tuple4D::vector(0.0, 0.0, 1.0));
}

#[test]
fn sphere_normal_points_outward() {
    let s = Surface::sphere(0, Tuple4D::point(1.0, 0.0, 0.0), 2.0,
        test_material());

    assert_eq!(s.normal_at(Tuple4D::point(1.0, 2.0, 0.0)).normalize(),
        Tuple4D::vector(0.0, 1.0, 0.0));
}

#[test]
fn bounding_sphere_owns_children() {
    let mut ids = SurfaceIds::new();
    let mut bounds = Surface::bounding(ids.next(), Tuple4D::point(0.0, 0.0, 0.0), 1.0);
    assert!(!bounds.is_bounding());
    assert!(bounds.material().is_none());

    bounds.add_child(Surface::polygon(ids.next(), vec![
        Tuple4D::point(-0.5, 0.0, 0.0),
        Tuple4D::point(0.5, 0.0, 0.0),
        Tuple4D::point(0.0, 0.5, 0.0),
    ], test_material()));

    assert!(bounds.is_bounding());
    assert_eq!(bounds.children().len(), 1);
    assert_eq!(bounds.children()[0].id(), 1);
    assert!(bounds.bounds_exactly(&Tuple4D::point(0.0, 0.0, 0.0), 1.0));
    assert!(!bounds.bounds_exactly(&Tuple4D::point(0.0, 0.0, 0.0), 1.0000001));
}
