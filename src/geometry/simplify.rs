use geo::{LineString, SimplifyIdx};
use serde_json::Value;

/// Indices of the positions Ramer-Douglas-Peucker keeps for a line of (lon, lat) pairs
fn simplify_indices(points: &[(f64, f64)], epsilon: f64) -> Vec<usize> {
    let line: LineString<f64> = points
        .iter()
        .map(|&(lon, lat)| geo::coord! { x: lon, y: lat })
        .collect();

    line.simplify_idx(&epsilon)
}

fn planar_points(positions: &[Value]) -> Option<Vec<(f64, f64)>> {
    positions
        .iter()
        .map(|p| {
            let p = p.as_array()?;
            Some((p.first()?.as_f64()?, p.get(1)?.as_f64()?))
        })
        .collect()
}

/// Simplify an open line; lines shorter than 4 positions are returned as-is.
///
/// Positions are selected by index, so elevation and other extra components
/// survive unchanged.
pub fn simplify_polyline(positions: &[Value], epsilon: f64) -> Vec<Value> {
    if positions.len() < 4 {
        return positions.to_vec();
    }
    let Some(points) = planar_points(positions) else {
        return positions.to_vec();
    };

    simplify_indices(&points, epsilon)
        .into_iter()
        .map(|i| positions[i].clone())
        .collect()
}

/// Simplify a closed ring, never producing fewer than 4 positions
pub fn simplify_ring(positions: &[Value], epsilon: f64) -> Vec<Value> {
    if positions.len() < 5 {
        return positions.to_vec();
    }

    let simplified = simplify_polyline(positions, epsilon);

    if simplified.len() < 4 {
        return positions.to_vec();
    }

    simplified
}

fn map_lines(value: &Value, depth: u8, simplify: &dyn Fn(&[Value]) -> Vec<Value>) -> Value {
    match value.as_array() {
        Some(items) if depth == 0 => Value::Array(simplify(items)),
        Some(items) => Value::Array(
            items
                .iter()
                .map(|item| map_lines(item, depth - 1, simplify))
                .collect(),
        ),
        None => value.clone(),
    }
}

/// Simplify every line and ring of a geometry with the given tolerance in degrees
///
/// Points and unknown types pass through untouched; a tolerance of zero or
/// less disables simplification.
pub fn simplify_geometry(geometry: &Value, epsilon: f64) -> Value {
    if epsilon <= 0.0 {
        return geometry.clone();
    }
    let Some(object) = geometry.as_object() else {
        return geometry.clone();
    };

    let (depth, closed) = match object.get("type").and_then(Value::as_str) {
        Some("LineString") => (0, false),
        Some("MultiLineString") => (1, false),
        Some("Polygon") => (1, true),
        Some("MultiPolygon") => (2, true),
        Some("GeometryCollection") => {
            let mut out = object.clone();
            if let Some(Value::Array(geometries)) = object.get("geometries") {
                let simplified = geometries
                    .iter()
                    .map(|g| simplify_geometry(g, epsilon))
                    .collect();
                out.insert("geometries".to_string(), Value::Array(simplified));
            }
            return Value::Object(out);
        }
        _ => return geometry.clone(),
    };
    let simplify = |items: &[Value]| {
        if closed {
            simplify_ring(items, epsilon)
        } else {
            simplify_polyline(items, epsilon)
        }
    };

    let mut out = object.clone();
    if let Some(coordinates) = object.get("coordinates") {
        out.insert(
            "coordinates".to_string(),
            map_lines(coordinates, depth, &simplify),
        );
    }
    Value::Object(out)
}
