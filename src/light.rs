use crate::color::Color;
use crate::tuple::Tuple4D;

/// A light source.
///
/// The position is homogeneous. A `w` component of `0.0` marks a
/// directional light: the light travels along `xyz` everywhere in the
/// world. Any other `w` is a point light sitting at `xyz`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Light {
    /// Per-channel intensity, on the 0-255 scale.
    pub illumination: Color,
    pub position: Tuple4D,
}

impl Light {
    /// Creates a point light at `position`.
    pub fn point(illumination: Color, position: Tuple4D) -> Light {
        Light {
            illumination,
            position: Tuple4D { w: 1.0, ..position },
        }
    }

    /// Creates a directional light shining along `direction`.
    pub fn directional(illumination: Color, direction: Tuple4D) -> Light {
        Light {
            illumination,
            position: direction.xyz(),
        }
    }

    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    /// The (unnormalized) direction from `point` towards the light.
    ///
    /// For point lights the magnitude is the distance to the light.
    pub fn direction_from(&self, point: Tuple4D) -> Tuple4D {
        if self.is_directional() {
            -self.position.xyz()
        } else {
            self.position.xyz() - point.xyz()
        }
    }
}

/// A material record.
///
/// Materials use a Lambertian diffuse term and a Phong specular term. The
/// specular coefficient `ks` doubles as the mirror reflectance: each bounce
/// scales a ray's remaining energy by it.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,

    /// Diffuse reflectance per channel, between `0.0` and `1.0`.
    pub diffuse: Color,

    pub ks: f64,
    pub alpha: f64,

    // Translucence. Parsed and kept, but not used when shading.
    pub kt: f64,
    pub density: f64,
}

impl Default for Material {
    fn default() -> Material {
        Material {
            name: String::new(),
            diffuse: Color::rgb(1.0, 1.0, 1.0),
            ks: 0.0,
            alpha: 1.0,
            kt: 0.0,
            density: 1.0,
        }
    }
}

/// Calculates the light a single source contributes at a point.
///
/// `lightv` points from the surface towards the light, `eyev` points from
/// the surface towards the viewer and `normalv` faces the viewer; all three
/// must be unit length. The caller decides beforehand whether the light is
/// visible at all (back faces, shadows).
///
/// The result is `diffuse * illumination * (L.N)` plus the specular
/// highlight `illumination * ks * max(0, V.R)^alpha`, where `R` is `lightv`
/// mirrored about the normal.
pub fn lighting(m: &Material, light: &Light, lightv: Tuple4D, eyev: Tuple4D,
    normalv: Tuple4D) -> Color {
    let light_dot_normal = lightv.dot(&normalv);
    let diffuse = m.diffuse * light.illumination * light_dot_normal;

    let reflectv = lightv.mirror(&normalv).normalize();
    let reflect_dot_eye = eyev.dot(&reflectv).max(0.0);
    let specular = light.illumination * m.ks * reflect_dot_eye.powf(m.alpha);

    diffuse + specular
}

#[test]
fn directional_light_direction_is_constant() {
    let light = Light::directional(
        Color::white(),
        Tuple4D::vector(0.0, -1.0, 0.0),
    );

    assert!(light.is_directional());
    assert_eq!(light.direction_from(Tuple4D::point(5.0, 2.0, 1.0)),
        Tuple4D::vector(0.0, 1.0, 0.0));
    assert_eq!(light.direction_from(Tuple4D::point(-3.0, 0.0, 9.0)),
        Tuple4D::vector(0.0, 1.0, 0.0));
}

#[test]
fn point_light_direction_depends_on_point() {
    let light = Light::point(Color::white(), Tuple4D::point(0.0, 10.0, 0.0));

    assert!(!light.is_directional());
    assert_eq!(light.direction_from(Tuple4D::point(0.0, 4.0, 0.0)),
        Tuple4D::vector(0.0, 6.0, 0.0));
}

#[test]
fn eye_between_light_and_surface() {
    let m = Material {
        diffuse: Color::rgb(0.5, 0.5, 0.5),
        ks: 0.5,
        alpha: 10.0,
        ..Default::default()
    };
    let light = Light::point(Color::white(), Tuple4D::point(0.0, 0.0, -10.0));

    let lightv = Tuple4D::vector(0.0, 0.0, -1.0);
    let eyev = Tuple4D::vector(0.0, 0.0, -1.0);
    let normalv = Tuple4D::vector(0.0, 0.0, -1.0);

    // Full diffuse plus a full specular highlight.
    let res = lighting(&m, &light, lightv, eyev, normalv);
    assert_eq!(res, Color::rgb(255.0, 255.0, 255.0));
}

#[test]
fn eye_offset_from_reflection() {
    let m = Material {
        diffuse: Color::rgb(1.0, 0.0, 0.0),
        ks: 1.0,
        alpha: 1.0,
        ..Default::default()
    };
    let light = Light::point(Color::rgb(100.0, 100.0, 100.0),
        Tuple4D::point(0.0, 0.0, -10.0));

    let lightv = Tuple4D::vector(0.0, 0.0, -1.0);
    let eyev = Tuple4D::vector(0.0, 2.0f64.sqrt() / 2.0, -(2.0f64.sqrt() / 2.0));
    let normalv = Tuple4D::vector(0.0, 0.0, -1.0);

    let s = 100.0 * 2.0f64.sqrt() / 2.0;
    let res = lighting(&m, &light, lightv, eyev, normalv);
    assert_eq!(res, Color::rgb(100.0 + s, s, s));
}
