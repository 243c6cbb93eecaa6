#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid zoom level")]
pub struct InvalidZoom;

/// Highest zoom level tile servers commonly provide.
/// <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames#Zoom_levels>
pub const MAX_ZOOM: u8 = 19;

/// Integer zoom level, valid in `0..=19`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct Zoom(u8);

impl TryFrom<u8> for Zoom {
    type Error = InvalidZoom;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > MAX_ZOOM {
            Err(InvalidZoom)
        } else {
            Ok(Self(value))
        }
    }
}

impl TryFrom<i32> for Zoom {
    type Error = InvalidZoom;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidZoom)
            .and_then(Self::try_from)
    }
}

impl From<Zoom> for u8 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(16)
    }
}

impl std::fmt::Display for Zoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Zoom {
    /// Zoom at the given level, or the highest one if `level` is beyond it.
    pub const fn saturating(level: u8) -> Self {
        if level > MAX_ZOOM {
            Self(MAX_ZOOM)
        } else {
            Self(level)
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Zoom by a number of levels, staying within `min..=max`. Returns whether the level changed.
    pub fn step_clamped(&mut self, steps: i32, min: Zoom, max: Zoom) -> bool {
        let wanted = i32::from(self.0)
            .saturating_add(steps)
            .clamp(i32::from(min.0), i32::from(max.0));
        let changed = wanted != i32::from(self.0);
        if let Ok(zoom) = Self::try_from(wanted) {
            *self = zoom;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructing_zoom() {
        assert_eq!(16, Zoom::default().level());
        assert_eq!(19, Zoom::try_from(19u8).unwrap().level());
        assert_eq!(InvalidZoom, Zoom::try_from(20u8).unwrap_err());
        assert_eq!(InvalidZoom, Zoom::try_from(-1i32).unwrap_err());
        assert_eq!(19, Zoom::saturating(25).level());
    }

    #[test]
    fn stepping_is_clamped() {
        let min = Zoom::try_from(1u8).unwrap();
        let max = Zoom::try_from(19u8).unwrap();

        let mut zoom = Zoom::try_from(18u8).unwrap();
        assert!(zoom.step_clamped(1, min, max));
        assert_eq!(19, zoom.level());
        assert!(!zoom.step_clamped(1, min, max));
        assert_eq!(19, zoom.level());

        let mut zoom = Zoom::try_from(2u8).unwrap();
        assert!(zoom.step_clamped(-5, min, max));
        assert_eq!(1, zoom.level());
        assert!(!zoom.step_clamped(-1, min, max));
    }

    #[test]
    fn huge_steps_saturate() {
        let min = Zoom::try_from(1u8).unwrap();
        let max = Zoom::try_from(19u8).unwrap();

        let mut zoom = Zoom::try_from(10u8).unwrap();
        assert!(zoom.step_clamped(i32::MAX, min, max));
        assert_eq!(19, zoom.level());
        assert!(zoom.step_clamped(i32::MIN, min, max));
        assert_eq!(1, zoom.level());
    }
}
