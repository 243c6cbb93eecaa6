//! Types and functions for working with positions.

/// Geographical position with latitude and longitude.
pub type Position = geo_types::Point;

/// Construct `Position` from latitude and longitude.
pub fn lat_lon(lat: f64, lon: f64) -> Position {
    Position::new(lon, lat)
}

/// Construct `Position` from longitude and latitude. Note that it is common standard to write
/// coordinates starting with the latitude instead, while GeoJSON stores longitude first.
pub fn lon_lat(lon: f64, lat: f64) -> Position {
    Position::new(lon, lat)
}

/// Axis-aligned geographical bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Smallest box containing both corners, in any order.
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self {
            min_lon: a.x().min(b.x()),
            min_lat: a.y().min(b.y()),
            max_lon: a.x().max(b.x()),
            max_lat: a.y().max(b.y()),
        }
    }

    /// Bounding box of a set of (lon, lat) coordinates, `None` if there are none.
    pub fn of_coords<'a>(coords: impl IntoIterator<Item = &'a geo_types::Coord>) -> Option<Self> {
        coords.into_iter().fold(None, |bounds, coord| {
            Some(match bounds {
                None => Self {
                    min_lon: coord.x,
                    min_lat: coord.y,
                    max_lon: coord.x,
                    max_lat: coord.y,
                },
                Some(b) => Self {
                    min_lon: b.min_lon.min(coord.x),
                    min_lat: b.min_lat.min(coord.y),
                    max_lon: b.max_lon.max(coord.x),
                    max_lat: b.max_lat.max(coord.y),
                },
            })
        })
    }

    pub fn contains(&self, coord: &geo_types::Coord) -> bool {
        (self.min_lon..=self.max_lon).contains(&coord.x)
            && (self.min_lat..=self.max_lat).contains(&coord.y)
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        !(other.max_lat < self.min_lat
            || other.min_lat > self.max_lat
            || other.max_lon < self.min_lon
            || other.min_lon > self.max_lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn corners_are_normalized() {
        let bounds = GeoBounds::from_corners(lat_lon(52., 21.), lat_lon(51., 17.));
        assert_eq!(bounds.min_lat, 51.);
        assert_eq!(bounds.max_lat, 52.);
        assert_eq!(bounds.min_lon, 17.);
        assert_eq!(bounds.max_lon, 21.);
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = GeoBounds::from_corners(lat_lon(0., 0.), lat_lon(1., 1.));
        let b = GeoBounds::from_corners(lat_lon(2., 2.), lat_lon(3., 3.));
        let c = GeoBounds::from_corners(lat_lon(0.5, 0.5), lat_lon(3., 3.));

        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&b));
    }

    #[test]
    fn bounds_of_coordinates() {
        let coords = [coord! { x: 1., y: 5. }, coord! { x: -3., y: 2. }];
        let bounds = GeoBounds::of_coords(&coords).unwrap();
        assert_eq!(bounds, GeoBounds::from_corners(lon_lat(-3., 2.), lon_lat(1., 5.)));
        assert!(bounds.contains(&coord! { x: 0., y: 3. }));
        assert!(GeoBounds::of_coords(&Vec::<geo_types::Coord>::new()).is_none());
    }
}
