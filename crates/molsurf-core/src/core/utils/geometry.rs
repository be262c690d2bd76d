use nalgebra::{Point3, Unit, Vector3};

/// Signed torsion angle in degrees defined by four points, in `(-180, 180]`.
///
/// The magnitude comes from the angle between the normals of the planes `(p1, p2, p3)` and
/// `(p2, p3, p4)`; the sign is the sign of the first difference vector projected onto the
/// second plane normal. Returns `NaN` when three consecutive points are collinear.
pub fn torsion_degrees(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
) -> f64 {
    let b1 = p2 - p1;
    let b2 = p3 - p2;
    let b3 = p4 - p3;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm_squared() < 1e-12 || n2.norm_squared() < 1e-12 {
        return f64::NAN;
    }

    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    y.atan2(x).to_degrees()
}

/// Builds an orthonormal in-plane basis `(u, v)` for a plane with the given normal, such that
/// `u x v == normal`.
pub fn plane_basis(normal: &Unit<Vector3<f64>>) -> (Vector3<f64>, Vector3<f64>) {
    let seed = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = (seed - normal.into_inner() * normal.dot(&seed)).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Area of the triangle `(a, b, c)`.
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}
