use geo::{
    Area, BooleanOps, Buffer, Centroid, Coord, LineString, MultiPolygon, Polygon, Validation,
};

/// The shape of a closed way, after any repairs.
pub struct Footprint(MultiPolygon<f64>);

/// Builds a valid shape from a ring of `(lon, lat)` points. Self-intersections and similar
/// problems are repaired by buffering by zero, and failing that, by resolving the ring against
/// nothing with a union. Returns `None` if the shape is still invalid.
pub fn footprint(ring: Vec<(f64, f64)>) -> Option<Footprint> {
    let exterior: LineString<f64> = ring.into_iter().map(|(x, y)| Coord { x, y }).collect();
    let polygon = Polygon::new(exterior, Vec::new());
    if polygon.is_valid() {
        return Some(Footprint(MultiPolygon::new(vec![polygon])));
    }

    let buffered = polygon.buffer(0.0);
    if repaired(&buffered) {
        return Some(Footprint(buffered));
    }
    let unioned = MultiPolygon::new(vec![polygon]).union(&MultiPolygon::new(Vec::new()));
    if repaired(&unioned) {
        return Some(Footprint(unioned));
    }
    None
}

// An empty result is valid, but there's nothing left of the way
fn repaired(shape: &MultiPolygon<f64>) -> bool {
    !shape.0.is_empty() && shape.is_valid()
}

impl Footprint {
    /// In squared degrees
    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    /// `(lon, lat)`. `None` for an empty shape.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.0.centroid().map(|pt| (pt.x(), pt.y()))
    }
}
