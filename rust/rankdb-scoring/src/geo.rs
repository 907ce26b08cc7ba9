//! Geographic distance, composed from the primitive combinators.

use crate::{
    diff::DiffDocItr,
    doc_itr::BoxedDocItr,
    nary::NaryDocItr,
    pow::PowDocItr,
    scale::ScaleDocItr,
};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f32 = 6371.0;

/// Builds an iterator scoring the approximate distance in kilometres between
/// `(lat, lon)` (degrees) and the per-document coordinates produced by `lat_itr`
/// and `lon_itr`.
///
/// Uses the equirectangular approximation: longitude differences are scaled by
/// the cosine of the query latitude, and the Euclidean distance in degrees is
/// converted to kilometres. Accurate for the short ranges a ranking query cares
/// about; the approximation degrades near the poles.
pub fn geo_distance(lat: f32, lon: f32, lat_itr: BoxedDocItr, lon_itr: BoxedDocItr) -> BoxedDocItr {
    let lat_delta = DiffDocItr::new(lat, lat_itr);
    let lon_delta = DiffDocItr::new(lon, lon_itr);
    let lon_scale = lat.to_radians().cos();
    let lon_delta = ScaleDocItr::new(lon_scale, Box::new(lon_delta));

    let lat_squared = PowDocItr::new(Box::new(lat_delta), 2.0);
    let lon_squared = PowDocItr::new(Box::new(lon_delta), 2.0);
    let degrees = PowDocItr::new(
        Box::new(NaryDocItr::sum(vec![
            Box::new(lat_squared),
            Box::new(lon_squared),
        ])),
        0.5,
    );
    let km_per_degree = EARTH_RADIUS_KM * std::f32::consts::PI / 180.0;
    Box::new(ScaleDocItr::new(km_per_degree, Box::new(degrees)))
}
