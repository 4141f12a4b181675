use std::collections::{ BTreeMap, HashMap };
use std::sync::Arc;

use log::{ debug, warn };

use crate::consts::SINGULAR_EPSILON;
use crate::tuple::Tuple4D;
use crate::matrix::Matrix4D;
use crate::light::{ Light, Material };
use crate::surface::{ Surface, SurfaceIds };
use crate::world::World;
use crate::error::{ SceneError, PolygonDefect };

/// A polygon in a shape's local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonTemplate {
    pub vertices: Vec<Tuple4D>,
}

impl PolygonTemplate {
    pub fn new(vertices: Vec<Tuple4D>) -> PolygonTemplate {
        PolygonTemplate { vertices }
    }

    /// Checks that the polygon is usable for intersection.
    ///
    /// Walking the vertices in order, every turn must go the same way as the
    /// first one. That rejects polygons which bend out of their plane as
    /// well as concave ones.
    pub fn validate(&self) -> Result<(), PolygonDefect> {
        let v = &self.vertices;
        if v.len() < 3 {
            return Err(PolygonDefect::TooFewVertices);
        }

        let normal = (v[1] - v[0]).cross(&(v[2] - v[0]));
        if normal.magnitude() <= SINGULAR_EPSILON {
            return Err(PolygonDefect::Collinear);
        }
        let normal = normal.normalize();

        for i in 2..v.len() {
            let next = v[(i + 1) % v.len()];
            let turn = (v[i] - v[i - 1]).cross(&(next - v[i - 1])).normalize();
            if turn != normal {
                return Err(PolygonDefect::NotPlanarConvex);
            }
        }

        Ok(())
    }
}

/// A sphere in a shape's local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereTemplate {
    pub center: Tuple4D,
    pub radius: f64,
}

/// A named, reusable piece of geometry.
///
/// Templates live in their own coordinates; objects place copies of them in
/// the world with a material and a list of transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeTemplate {
    pub name: String,
    pub polygons: Vec<PolygonTemplate>,
    pub spheres: Vec<SphereTemplate>,
}

impl ShapeTemplate {
    pub fn new(name: &str) -> ShapeTemplate {
        ShapeTemplate { name: name.to_string(), ..Default::default() }
    }

    pub fn with_polygon(mut self, vertices: Vec<Tuple4D>) -> ShapeTemplate {
        self.polygons.push(PolygonTemplate::new(vertices));
        self
    }

    pub fn with_sphere(mut self, center: Tuple4D, radius: f64) -> ShapeTemplate {
        self.spheres.push(SphereTemplate { center, radius });
        self
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        for (polygon, p) in self.polygons.iter().enumerate() {
            p.validate().map_err(|defect| SceneError::BadPolygon {
                shape: self.name.clone(),
                polygon,
                defect,
            })?;
        }

        for (sphere, s) in self.spheres.iter().enumerate() {
            if !(s.radius > 0.0) {
                return Err(SceneError::BadRadius {
                    shape: self.name.clone(),
                    sphere,
                    radius: s.radius,
                });
            }
        }

        Ok(())
    }
}

/// Bit patterns of a bounding sphere's center and radius. Two spheres share
/// a key exactly when their coordinates compare equal.
type BoundKey = [u64; 4];

fn bound_key(center: &Tuple4D, radius: f64) -> BoundKey {
    // Adding zero folds -0.0 into 0.0.
    let bits = |v: f64| (v + 0.0).to_bits();
    [bits(center.x), bits(center.y), bits(center.z), bits(radius)]
}

/// One step of placing a shape in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    Scale(f64, f64, f64),
    Translate(f64, f64, f64),

    /// Re-expresses a shape in the frame whose `z` axis is `look_at`, with
    /// `up` fixing the roll. The `look_at` direction ends up on the world `z`
    /// axis. See `Matrix4D::orientation`.
    Rotate { look_at: Tuple4D, up: Tuple4D },
}

impl Transform {
    /// A scale by the same factor on every axis.
    pub fn uniform(factor: f64) -> Transform {
        Transform::Scale(factor, factor, factor)
    }

    pub fn matrix(&self) -> Matrix4D {
        match *self {
            Transform::Scale(x, y, z) => Matrix4D::scaling(x, y, z),
            Transform::Translate(x, y, z) => Matrix4D::translation(x, y, z),
            Transform::Rotate { look_at, up } => Matrix4D::orientation(look_at, up),
        }
    }

    /// The factor this transform scales lengths by, or `None` if it
    /// stretches some axes more than others.
    pub fn length_scale(&self) -> Option<f64> {
        match *self {
            Transform::Scale(x, y, z) if x == y && y == z => Some(x.abs()),
            Transform::Scale(..) => None,
            _ => Some(1.0),
        }
    }
}

/// An object: a shape template placed in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub shape: String,
    pub material: String,

    /// Applied in order: the first transform is applied to the template
    /// first.
    pub transforms: Vec<Transform>,
}

impl Placement {
    pub fn new(shape: &str, material: &str) -> Placement {
        Placement {
            shape: shape.to_string(),
            material: material.to_string(),
            transforms: Vec::new(),
        }
    }

    pub fn then(mut self, transform: Transform) -> Placement {
        self.transforms.push(transform);
        self
    }

    /// The composite transform, `T_n * ... * T_1`.
    pub fn matrix(&self) -> Matrix4D {
        self.transforms.iter()
            .fold(Matrix4D::identity(), |m, t| t.matrix() * m)
    }

    /// The factor the composite transform scales lengths by, if it is
    /// uniform.
    pub fn length_scale(&self) -> Option<f64> {
        self.transforms.iter()
            .try_fold(1.0, |acc, t| t.length_scale().map(|s| acc * s))
    }
}

/// Collects scene declarations and turns them into a `World`.
///
/// Declaration order doesn't matter: names are only resolved by `build`.
#[derive(Debug, Default)]
pub struct WorldBuilder {
    shapes: BTreeMap<String, ShapeTemplate>,
    materials: BTreeMap<String, Arc<Material>>,
    lights: Vec<Light>,
    placements: Vec<Placement>,
}

impl WorldBuilder {
    pub fn new() -> WorldBuilder {
        Default::default()
    }

    pub fn material(&mut self, material: Material) -> &mut WorldBuilder {
        let name = material.name.clone();
        if self.materials.insert(name.clone(), Arc::new(material)).is_some() {
            warn!("Material `{}` declared twice; keeping the last one", name);
        }

        self
    }

    pub fn shape(&mut self, shape: ShapeTemplate) -> &mut WorldBuilder {
        let name = shape.name.clone();
        if self.shapes.insert(name.clone(), shape).is_some() {
            warn!("Shape `{}` declared twice; keeping the last one", name);
        }

        self
    }

    pub fn light(&mut self, light: Light) -> &mut WorldBuilder {
        self.lights.push(light);
        self
    }

    pub fn place(&mut self, placement: Placement) -> &mut WorldBuilder {
        self.placements.push(placement);
        self
    }

    /// Builds the world.
    ///
    /// Every placed polygon is transformed and wrapped in a bounding sphere
    /// (its centroid, out to its farthest vertex). Polygons whose spheres
    /// come out exactly equal share one. Spheres are transformed and become
    /// roots of their own, so shapes with spheres only accept uniform
    /// scales.
    pub fn build(self) -> Result<World, SceneError> {
        for shape in self.shapes.values() {
            shape.validate()?;
        }

        let mut ids = SurfaceIds::new();
        let mut surfaces: Vec<Surface> = Vec::new();

        // Indices into `surfaces` of the bounding spheres built here.
        let mut bounds: HashMap<BoundKey, usize> = HashMap::new();

        for (object, placement) in self.placements.iter().enumerate() {
            let shape = self.shapes.get(&placement.shape)
                .ok_or_else(|| SceneError::UnknownShape {
                    object,
                    shape: placement.shape.clone(),
                })?;

            let material = self.materials.get(&placement.material)
                .ok_or_else(|| SceneError::UnknownMaterial {
                    object,
                    material: placement.material.clone(),
                })?;

            let scale = match placement.length_scale() {
                Some(s) => s,
                None if shape.spheres.is_empty() => 1.0,
                None => return Err(SceneError::NonUniformSphereScale {
                    object,
                    shape: shape.name.clone(),
                }),
            };

            let m = placement.matrix();

            for template in shape.polygons.iter() {
                let vertices = template.vertices.iter().map(|v| m * *v).collect();
                let polygon = Surface::polygon(ids.next(), vertices, Arc::clone(material));
                let (center, radius) = (polygon.center(), polygon.radius());

                match bounds.get(&bound_key(&center, radius)) {
                    Some(&i) => {
                        debug_assert!(surfaces[i].bounds_exactly(&center, radius));
                        surfaces[i].add_child(polygon);
                    },
                    None => {
                        let mut sphere = Surface::bounding(ids.next(), center, radius);
                        sphere.add_child(polygon);
                        bounds.insert(bound_key(&center, radius), surfaces.len());
                        surfaces.push(sphere);
                    },
                }
            }

            for template in shape.spheres.iter() {
                surfaces.push(Surface::sphere(
                    ids.next(),
                    m * template.center,
                    template.radius * scale,
                    Arc::clone(material),
                ));
            }
        }

        debug!("Built {} root surfaces ({} bounding) from {} objects",
            surfaces.len(), bounds.len(), self.placements.len());

        Ok(World {
            surfaces,
            lights: self.lights,
            materials: self.materials,
        })
    }
}

#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::feq;

#[cfg(test)]
fn square() -> Vec<Tuple4D> {
    vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(2.0, 0.0, 0.0),
        Tuple4D::point(2.0, 2.0, 0.0),
        Tuple4D::point(0.0, 2.0, 0.0),
    ]
}

#[cfg(test)]
fn plain(name: &str) -> Material {
    Material { name: name.to_string(), ..Default::default() }
}

#[test]
fn transforms_apply_in_declared_order() {
    let p = Placement::new("s", "m")
        .then(Transform::uniform(2.0))
        .then(Transform::Translate(1.0, 0.0, 0.0));

    assert_eq!(p.matrix() * Tuple4D::point(1.0, 0.0, 0.0),
        Tuple4D::point(3.0, 0.0, 0.0));
    assert_eq!(p.length_scale(), Some(2.0));
}

#[test]
fn non_uniform_scale_has_no_length_scale() {
    let p = Placement::new("s", "m")
        .then(Transform::uniform(2.0))
        .then(Transform::Scale(1.0, 3.0, 1.0));

    assert_eq!(p.length_scale(), None);
}

#[test]
fn polygon_validation() {
    assert_eq!(PolygonTemplate::new(square()).validate(), Ok(()));

    let two = vec![Tuple4D::point(0.0, 0.0, 0.0), Tuple4D::point(1.0, 0.0, 0.0)];
    assert_eq!(PolygonTemplate::new(two).validate(),
        Err(PolygonDefect::TooFewVertices));

    let line = vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(1.0, 0.0, 0.0),
        Tuple4D::point(2.0, 0.0, 0.0),
    ];
    assert_eq!(PolygonTemplate::new(line).validate(),
        Err(PolygonDefect::Collinear));

    let dart = vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(4.0, 0.0, 0.0),
        Tuple4D::point(2.0, 1.0, 0.0),
        Tuple4D::point(2.0, 4.0, 0.0),
    ];
    assert_eq!(PolygonTemplate::new(dart).validate(),
        Err(PolygonDefect::NotPlanarConvex));

    let bent = vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(2.0, 0.0, 0.0),
        Tuple4D::point(2.0, 2.0, 1.0),
        Tuple4D::point(0.0, 2.0, 0.0),
    ];
    assert_eq!(PolygonTemplate::new(bent).validate(),
        Err(PolygonDefect::NotPlanarConvex));
}

#[test]
fn polygon_gets_its_own_bounding_sphere() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("sq").with_polygon(square()))
        .place(Placement::new("sq", "m").then(Transform::Translate(0.0, 0.0, 5.0)));
    let w = b.build().unwrap();

    assert_eq!(w.surfaces.len(), 1);
    let root = &w.surfaces[0];
    assert!(root.is_bounding());
    assert_eq!(root.center(), Tuple4D::point(1.0, 1.0, 5.0));
    assert!(feq(root.radius(), 2.0f64.sqrt()));

    let child = &root.children()[0];
    assert_eq!(child.polygon_info().unwrap().vertices[2], Tuple4D::point(2.0, 2.0, 5.0));
    assert_eq!(child.material().unwrap().name, "m");
}

#[test]
fn identical_bounds_are_merged() {
    let mut reversed = square();
    reversed.reverse();

    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("panel")
            .with_polygon(square())
            .with_polygon(reversed))
        .place(Placement::new("panel", "m"))
        .place(Placement::new("panel", "m"))
        .place(Placement::new("panel", "m").then(Transform::Translate(10.0, 0.0, 0.0)));
    let w = b.build().unwrap();

    assert_eq!(w.surfaces.len(), 2);
    assert_eq!(w.surfaces[0].children().len(), 4);
    assert_eq!(w.surfaces[1].children().len(), 2);
}

#[test]
fn bound_keys_compare_like_floats() {
    let center = Tuple4D::point(0.0, 1.5, -2.0);

    assert_eq!(bound_key(&center, 3.0), bound_key(&Tuple4D::point(-0.0, 1.5, -2.0), 3.0));
    assert_ne!(bound_key(&center, 3.0), bound_key(&center, 3.0000001));
    assert_ne!(bound_key(&center, 3.0), bound_key(&Tuple4D::point(0.0, 1.5, 2.0), 3.0));
}

#[test]
fn many_copies_share_one_bounding_sphere() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("panel").with_polygon(square()));
    for _ in 0..500 {
        b.place(Placement::new("panel", "m"));
    }
    for i in 0..500u32 {
        b.place(Placement::new("panel", "m")
            .then(Transform::Translate(f64::from(i) * 3.0 + 10.0, 0.0, 0.0)));
    }
    let w = b.build().unwrap();

    assert_eq!(w.surfaces.len(), 501);
    assert_eq!(w.surfaces[0].children().len(), 500);
    assert!(w.surfaces[1..].iter().all(|s| s.children().len() == 1));
}

#[test]
fn spheres_scale_uniformly() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("ball").with_sphere(Tuple4D::point(1.0, 0.0, 0.0), 1.5))
        .place(Placement::new("ball", "m")
            .then(Transform::uniform(2.0))
            .then(Transform::uniform(3.0))
            .then(Transform::Translate(0.0, 1.0, 0.0)));
    let w = b.build().unwrap();

    assert_eq!(w.surfaces.len(), 1);
    let ball = &w.surfaces[0];
    assert!(!ball.is_bounding());
    assert_eq!(ball.center(), Tuple4D::point(6.0, 1.0, 0.0));
    assert!(feq(ball.radius(), 9.0));
}

#[test]
fn rotation_along_z_is_identity() {
    let p = Placement::new("s", "m").then(Transform::Rotate {
        look_at: Tuple4D::vector(0.0, 0.0, 1.0),
        up: Tuple4D::vector(0.0, 1.0, 0.0),
    });

    assert_eq!(p.matrix(), Matrix4D::identity());
    assert_eq!(p.length_scale(), Some(1.0));
}

#[test]
fn rotation_carries_look_at_onto_z() {
    let p = Placement::new("s", "m").then(Transform::Rotate {
        look_at: Tuple4D::vector(1.0, 0.0, 1.0),
        up: Tuple4D::vector(0.0, 1.0, 0.0),
    });
    let m = p.matrix();

    assert_eq!(m * Tuple4D::vector(1.0, 0.0, 1.0),
        Tuple4D::vector(0.0, 0.0, 2.0f64.sqrt()));
    assert_eq!(m * Tuple4D::vector(0.0, 1.0, 0.0), Tuple4D::vector(0.0, 1.0, 0.0));
    assert_eq!(m * Tuple4D::point(1.0, 0.0, -1.0),
        Tuple4D::point(2.0f64.sqrt(), 0.0, 0.0));
    assert_eq!(p.length_scale(), Some(1.0));
}

#[test]
fn unknown_names_are_rejected() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("sq").with_polygon(square()))
        .place(Placement::new("sq", "m"))
        .place(Placement::new("cube", "m"));

    match b.build() {
        Err(SceneError::UnknownShape { object, shape }) => {
            assert_eq!(object, 1);
            assert_eq!(shape, "cube");
        },
        other => panic!("expected unknown shape, got {:?}", other),
    }

    let mut b = WorldBuilder::new();
    b.shape(ShapeTemplate::new("sq").with_polygon(square()))
        .place(Placement::new("sq", "chrome"));

    assert!(matches!(b.build(), Err(SceneError::UnknownMaterial { .. })));
}

#[test]
fn non_uniform_scale_on_spheres_is_rejected() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("ball").with_sphere(Tuple4D::point(0.0, 0.0, 0.0), 1.0))
        .place(Placement::new("ball", "m").then(Transform::Scale(1.0, 2.0, 1.0)));

    assert!(matches!(b.build(), Err(SceneError::NonUniformSphereScale { .. })));

    // Polygons stretch just fine.
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .shape(ShapeTemplate::new("sq").with_polygon(square()))
        .place(Placement::new("sq", "m").then(Transform::Scale(1.0, 2.0, 1.0)));

    assert!(b.build().is_ok());
}

#[test]
fn bad_templates_are_rejected() {
    let mut b = WorldBuilder::new();
    b.shape(ShapeTemplate::new("ball").with_sphere(Tuple4D::point(0.0, 0.0, 0.0), 0.0));
    assert!(matches!(b.build(), Err(SceneError::BadRadius { .. })));

    let mut b = WorldBuilder::new();
    b.shape(ShapeTemplate::new("sliver").with_polygon(vec![
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::point(1.0, 1.0, 1.0),
    ]));
    assert!(matches!(b.build(), Err(SceneError::BadPolygon {
        defect: PolygonDefect::TooFewVertices, ..
    })));
}

#[test]
fn lights_and_materials_carry_over() {
    let mut b = WorldBuilder::new();
    b.material(plain("m"))
        .light(Light::point(Color::white(), Tuple4D::point(0.0, 5.0, 0.0)));
    let w = b.build().unwrap();

    assert_eq!(w.lights.len(), 1);
    assert!(w.material("m").is_some());
    assert!(w.surfaces.is_empty());
}
