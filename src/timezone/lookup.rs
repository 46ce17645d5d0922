use tzf_rs::DefaultFinder;

/// Geographic timezone index.
pub trait TimezoneLookup {
    /// IANA zone id covering the coordinates, if any.
    fn timezone_at(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Lookup backed by the polygons bundled with `tzf-rs`.
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl TzfLookup {
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneLookup for TzfLookup {
    fn timezone_at(&self, latitude: f64, longitude: f64) -> Option<String> {
        let name = self.finder.get_tz_name(longitude, latitude);
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}
