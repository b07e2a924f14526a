use crate::projection::Horizontal;
use chrono::{DateTime, Utc};
use crossterm::style::Color;

pub(crate) const AU_KM: f64 = 149_597_870.7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Equatorial {
    pub(crate) ra_hours: f64,
    pub(crate) dec_deg: f64,
}

/// Where a body appears from the observer at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Apparent {
    pub(crate) horizontal: Horizontal,
    pub(crate) equatorial: Equatorial,
    pub(crate) distance_au: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GeoPoint {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StarSighting {
    pub(crate) direction: Horizontal,
    pub(crate) magnitude: f64,
}

/// Positions of everything on the sky as a pure function of time.
///
/// `None` means the body is unknown to this provider or has no answer for
/// the question asked (a planet has no sub-point); the view skips it.
pub(crate) trait Ephemeris {
    fn apparent(&self, body: &str, t: DateTime<Utc>) -> Option<Apparent>;

    fn sub_point(&self, body: &str, t: DateTime<Utc>) -> Option<GeoPoint>;

    /// Lit fraction of the disc seen from the observer, `0..=1`.
    fn illuminated_fraction(&self, body: &str, t: DateTime<Utc>) -> Option<f64>;

    fn stars(&self, t: DateTime<Utc>) -> Vec<StarSighting>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DisplayClass {
    Planet,
    Moon,
    Sun,
    Satellite,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Body {
    pub(crate) id: &'static str,
    pub(crate) class: DisplayClass,
    pub(crate) color: Color,
    pub(crate) has_rings: bool,
    pub(crate) ring_color: Option<Color>,
}

impl Body {
    const fn new(id: &'static str, class: DisplayClass, color: Color) -> Self {
        Self {
            id,
            class,
            color,
            has_rings: false,
            ring_color: None,
        }
    }

    const fn ringed(self, ring_color: Color) -> Self {
        Self {
            has_rings: true,
            ring_color: Some(ring_color),
            ..self
        }
    }
}

/// Fixed, ordered set of focusable bodies.
///
/// Iteration order is the draw order and therefore the label priority:
/// when two labels collide, the body listed first keeps its label. Focus
/// cycling walks the same order.
pub(crate) struct BodyRegistry {
    bodies: Vec<Body>,
}

impl BodyRegistry {
    pub(crate) fn new(bodies: Vec<Body>) -> Self {
        Self { bodies }
    }

    pub(crate) fn default_sky() -> Self {
        use DisplayClass::*;
        Self::new(vec![
            Body::new("Sun", Sun, Color::Yellow),
            Body::new("Moon", Moon, Color::White),
            Body::new("Mercury", Planet, Color::Grey),
            Body::new("Venus", Planet, Color::Yellow),
            Body::new("Mars", Planet, Color::Red),
            Body::new("Jupiter", Planet, Color::DarkYellow),
            Body::new("Saturn", Planet, Color::Yellow).ringed(Color::DarkYellow),
            Body::new("ISS", Satellite, Color::Green),
            Body::new("Hubble", Satellite, Color::Magenta),
        ])
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id.eq_ignore_ascii_case(id))
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.id.eq_ignore_ascii_case(id))
    }

    pub(crate) fn at(&self, idx: usize) -> Option<&Body> {
        self.bodies.get(idx)
    }

    pub(crate) fn len(&self) -> usize {
        self.bodies.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub(crate) fn satellites(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.class == DisplayClass::Satellite)
    }
}

/// Scripted provider for tests: bodies sit wherever they were put.
#[cfg(test)]
pub(crate) struct FixedSky {
    pub(crate) positions: std::collections::HashMap<String, Apparent>,
    pub(crate) sub_points: std::collections::HashMap<String, GeoPoint>,
    pub(crate) phases: std::collections::HashMap<String, f64>,
    pub(crate) stars: Vec<StarSighting>,
}

#[cfg(test)]
impl FixedSky {
    pub(crate) fn new() -> Self {
        Self {
            positions: Default::default(),
            sub_points: Default::default(),
            phases: Default::default(),
            stars: Vec::new(),
        }
    }

    pub(crate) fn place(&mut self, id: &str, azimuth: f64, altitude: f64) -> &mut Self {
        self.positions.insert(
            id.to_string(),
            Apparent {
                horizontal: Horizontal::new(azimuth, altitude),
                equatorial: Equatorial {
                    ra_hours: azimuth / 15.0,
                    dec_deg: altitude,
                },
                distance_au: 1.0,
            },
        );
        self
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.positions.remove(id);
    }
}

#[cfg(test)]
impl Ephemeris for FixedSky {
    fn apparent(&self, body: &str, _t: DateTime<Utc>) -> Option<Apparent> {
        self.positions.get(body).copied()
    }

    fn sub_point(&self, body: &str, _t: DateTime<Utc>) -> Option<GeoPoint> {
        self.sub_points.get(body).copied()
    }

    fn illuminated_fraction(&self, body: &str, _t: DateTime<Utc>) -> Option<f64> {
        self.phases.get(body).copied()
    }

    fn stars(&self, _t: DateTime<Utc>) -> Vec<StarSighting> {
        self.stars.clone()
    }
}
