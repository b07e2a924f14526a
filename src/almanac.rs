use crate::catalog::CatalogStar;
use crate::ephemeris::{Apparent, Ephemeris, Equatorial, GeoPoint, StarSighting, AU_KM};
use crate::projection::Horizontal;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::TAU;

const J2000: f64 = 2451545.0;
const EARTH_RADIUS_KM: f64 = 6371.0;
const MU_EARTH: f64 = 398600.4418;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Observer {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

pub(crate) fn julian_date(t: DateTime<Utc>) -> f64 {
    let mut y = t.year();
    let mut m = t.month() as i32;
    let d = t.day() as f64;

    let sec = t.second() as f64 + t.nanosecond() as f64 * 1e-9;
    let day_fraction = (t.hour() as f64 + (t.minute() as f64 + sec / 60.0) / 60.0) / 24.0;

    if m <= 2 {
        y -= 1;
        m += 12;
    }
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    (365.25 * (y as f64 + 4716.0)).floor() + (30.6001 * (m + 1) as f64).floor() + d + b - 1524.5
        + day_fraction
}

/// Greenwich mean sidereal time in degrees, `[0, 360)`.
pub(crate) fn gmst_deg(jd: f64) -> f64 {
    let tc = (jd - J2000) / 36525.0;
    let secs = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * tc + 0.093104 * tc * tc
        - 6.2e-6 * tc * tc * tc;
    secs.rem_euclid(86400.0) / 240.0
}

fn obliquity_deg(d: f64) -> f64 {
    23.439 - 0.000_000_4 * d
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cos_angle(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    (d / (norm(a) * norm(b))).clamp(-1.0, 1.0)
}

fn ecliptic_to_equatorial(v: [f64; 3], eps_deg: f64) -> [f64; 3] {
    let (se, ce) = eps_deg.to_radians().sin_cos();
    [v[0], v[1] * ce - v[2] * se, v[1] * se + v[2] * ce]
}

fn equatorial_of(v: [f64; 3]) -> Equatorial {
    let r = norm(v);
    Equatorial {
        ra_hours: (v[1].atan2(v[0]).to_degrees() / 15.0).rem_euclid(24.0),
        dec_deg: (v[2] / r).clamp(-1.0, 1.0).asin().to_degrees(),
    }
}

/// Horizontal direction of an equatorial position for an observer at
/// `lat_deg` with local sidereal time `lst_deg`.
pub(crate) fn equatorial_to_horizontal(eq: Equatorial, lst_deg: f64, lat_deg: f64) -> Horizontal {
    let h = (lst_deg - eq.ra_hours * 15.0).to_radians();
    let (sd, cd) = eq.dec_deg.to_radians().sin_cos();
    let (sp, cp) = lat_deg.to_radians().sin_cos();
    let (sh, ch) = h.sin_cos();
    let east = -cd * sh;
    let north = sd * cp - cd * ch * sp;
    let up = sd * sp + cd * ch * cp;
    Horizontal::from_enu([east, north, up])
}

/// Geocentric ecliptic position of the Sun, AU.
fn sun_ecliptic(d: f64) -> [f64; 3] {
    let l = 280.460 + 0.985_647_4 * d;
    let g = (357.528 + 0.985_600_3 * d).to_radians();
    let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
    let r = 1.000_14 - 0.016_71 * g.cos() - 0.000_14 * (2.0 * g).cos();
    [r * lambda.cos(), r * lambda.sin(), 0.0]
}

/// Geocentric ecliptic position of the Moon, AU.
fn moon_ecliptic(d: f64) -> [f64; 3] {
    let l = 218.316 + 13.176_396 * d;
    let mm = (134.963 + 13.064_993 * d).to_radians();
    let f = (93.272 + 13.229_350 * d).to_radians();
    let dd = (297.850 + 12.190_749 * d).to_radians();
    let ms = (357.529 + 0.985_600_28 * d).to_radians();

    let lambda = l + 6.289 * mm.sin() + 1.274 * (2.0 * dd - mm).sin() + 0.658 * (2.0 * dd).sin()
        + 0.214 * (2.0 * mm).sin()
        - 0.186 * ms.sin()
        - 0.114 * (2.0 * f).sin();
    let beta = 5.128 * f.sin() + 0.281 * (mm + f).sin() + 0.278 * (mm - f).sin()
        + 0.173 * (2.0 * dd - f).sin();
    let dist_km =
        385_001.0 - 20_905.0 * mm.cos() - 3_699.0 * (2.0 * dd - mm).cos() - 2_956.0 * (2.0 * dd).cos();

    let (sl, cl) = lambda.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    let r = dist_km / AU_KM;
    [r * cb * cl, r * cb * sl, r * sb]
}

#[derive(Clone, Copy, Debug)]
struct OrbitalElements {
    a: f64, // AU
    e: f64,
    i: f64,         // deg
    omega: f64,     // argument of perihelion, deg
    big_omega: f64, // ascending node, deg
    m0: f64,        // mean anomaly at J2000, deg
    period_days: f64,
}

const PLANETS: &[(&str, OrbitalElements)] = &[
    (
        "Mercury",
        OrbitalElements { a: 0.387, e: 0.2056, i: 7.0, omega: 29.1, big_omega: 48.3, m0: 174.8, period_days: 87.969 },
    ),
    (
        "Venus",
        OrbitalElements { a: 0.723, e: 0.0068, i: 3.4, omega: 54.9, big_omega: 76.7, m0: 50.4, period_days: 224.701 },
    ),
    (
        "Mars",
        OrbitalElements { a: 1.524, e: 0.0934, i: 1.85, omega: 286.5, big_omega: 49.6, m0: 19.4, period_days: 686.98 },
    ),
    (
        "Jupiter",
        OrbitalElements { a: 5.203, e: 0.0484, i: 1.30, omega: 273.9, big_omega: 100.6, m0: 20.0, period_days: 4332.59 },
    ),
    (
        "Saturn",
        OrbitalElements { a: 9.537, e: 0.0542, i: 2.49, omega: 339.4, big_omega: 113.7, m0: 317.0, period_days: 10759.22 },
    ),
];

fn solve_kepler(m: f64, e: f64) -> f64 {
    let mut e_anom = m;
    for _ in 0..9 {
        let f = e_anom - e * e_anom.sin() - m;
        let fp = 1.0 - e * e_anom.cos();
        e_anom -= f / fp;
    }
    e_anom
}

/// Heliocentric ecliptic position, AU.
fn heliocentric(el: &OrbitalElements, d: f64) -> [f64; 3] {
    let n = TAU / el.period_days;
    let m = (el.m0.to_radians() + n * d).rem_euclid(TAU);
    let e_anom = solve_kepler(m, el.e);

    let (sin_e, cos_e) = e_anom.sin_cos();
    let r = el.a * (1.0 - el.e * cos_e);
    let nu = ((1.0 - el.e * el.e).sqrt() * sin_e).atan2(cos_e - el.e);
    let x_op = r * nu.cos();
    let y_op = r * nu.sin();

    let (sin_om, cos_om) = el.big_omega.to_radians().sin_cos();
    let (sin_w, cos_w) = el.omega.to_radians().sin_cos();
    let (sin_i, cos_i) = el.i.to_radians().sin_cos();

    [
        (cos_om * cos_w - sin_om * sin_w * cos_i) * x_op + (-cos_om * sin_w - sin_om * cos_w * cos_i) * y_op,
        (sin_om * cos_w + cos_om * sin_w * cos_i) * x_op + (-sin_om * sin_w + cos_om * cos_w * cos_i) * y_op,
        (sin_w * sin_i) * x_op + (cos_w * sin_i) * y_op,
    ]
}

/// Idealised circular orbit. Nodal precession and drag are ignored.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CircularOrbit {
    pub(crate) id: &'static str,
    pub(crate) inclination_deg: f64,
    pub(crate) altitude_km: f64,
    pub(crate) raan_deg: f64,
    /// Argument of latitude at `epoch_jd`.
    pub(crate) phase_deg: f64,
    pub(crate) epoch_jd: f64,
}

impl CircularOrbit {
    fn radius_km(&self) -> f64 {
        EARTH_RADIUS_KM + self.altitude_km
    }

    pub(crate) fn period_minutes(&self) -> f64 {
        TAU * (self.radius_km().powi(3) / MU_EARTH).sqrt() / 60.0
    }

    fn eci_km(&self, jd: f64) -> [f64; 3] {
        let n = TAU / (self.period_minutes() * 60.0);
        let u = self.phase_deg.to_radians() + n * (jd - self.epoch_jd) * 86400.0;
        let (su, cu) = u.sin_cos();
        let (so, co) = self.raan_deg.to_radians().sin_cos();
        let (si, ci) = self.inclination_deg.to_radians().sin_cos();
        let r = self.radius_km();
        [r * (co * cu - so * su * ci), r * (so * cu + co * su * ci), r * su * si]
    }
}

pub(crate) fn default_satellites() -> Vec<CircularOrbit> {
    vec![
        CircularOrbit {
            id: "ISS",
            inclination_deg: 51.64,
            altitude_km: 420.0,
            raan_deg: 0.0,
            phase_deg: 0.0,
            epoch_jd: J2000,
        },
        CircularOrbit {
            id: "Hubble",
            inclination_deg: 28.47,
            altitude_km: 535.0,
            raan_deg: 120.0,
            phase_deg: 90.0,
            epoch_jd: J2000,
        },
    ]
}

fn eci_to_ecef(v: [f64; 3], theta: f64) -> [f64; 3] {
    let (s, c) = theta.sin_cos();
    [c * v[0] + s * v[1], -s * v[0] + c * v[1], v[2]]
}

fn ecef_to_eci(v: [f64; 3], theta: f64) -> [f64; 3] {
    eci_to_ecef(v, -theta)
}

/// Built-in ephemeris: analytic Sun, Moon and planets, circular-orbit
/// satellites and a fixed star catalogue.
pub(crate) struct AnalyticSky {
    observer: Observer,
    stars: Vec<CatalogStar>,
    satellites: Vec<CircularOrbit>,
}

impl AnalyticSky {
    pub(crate) fn new(observer: Observer, stars: Vec<CatalogStar>) -> Self {
        Self {
            observer,
            stars,
            satellites: default_satellites(),
        }
    }

    pub(crate) fn star_count(&self) -> usize {
        self.stars.len()
    }

    fn lst_deg(&self, jd: f64) -> f64 {
        (gmst_deg(jd) + self.observer.longitude).rem_euclid(360.0)
    }

    fn satellite(&self, id: &str) -> Option<&CircularOrbit> {
        self.satellites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    fn planet(id: &str) -> Option<&'static OrbitalElements> {
        PLANETS.iter().find(|(name, _)| name.eq_ignore_ascii_case(id)).map(|(_, el)| el)
    }

    /// Geocentric ecliptic vector (AU) of a solar-system body.
    fn geocentric(&self, id: &str, d: f64) -> Option<[f64; 3]> {
        if id.eq_ignore_ascii_case("Sun") {
            return Some(sun_ecliptic(d));
        }
        if id.eq_ignore_ascii_case("Moon") {
            return Some(moon_ecliptic(d));
        }
        let el = Self::planet(id)?;
        let sun = sun_ecliptic(d);
        let earth = [-sun[0], -sun[1], -sun[2]];
        Some(sub(heliocentric(el, d), earth))
    }

    fn satellite_apparent(&self, sat: &CircularOrbit, jd: f64) -> Apparent {
        let theta = gmst_deg(jd).to_radians();
        let (sp, cp) = self.observer.latitude.to_radians().sin_cos();
        let (sl, cl) = self.observer.longitude.to_radians().sin_cos();
        let site_ecef = [EARTH_RADIUS_KM * cp * cl, EARTH_RADIUS_KM * cp * sl, EARTH_RADIUS_KM * sp];
        let rel = sub(sat.eci_km(jd), ecef_to_eci(site_ecef, theta));

        let equatorial = equatorial_of(rel);
        Apparent {
            horizontal: equatorial_to_horizontal(equatorial, self.lst_deg(jd), self.observer.latitude),
            equatorial,
            distance_au: norm(rel) / AU_KM,
        }
    }
}

impl Ephemeris for AnalyticSky {
    fn apparent(&self, body: &str, t: DateTime<Utc>) -> Option<Apparent> {
        let jd = julian_date(t);
        if let Some(sat) = self.satellite(body) {
            return Some(self.satellite_apparent(sat, jd));
        }

        let d = jd - J2000;
        let geo = self.geocentric(body, d)?;
        let equatorial = equatorial_of(ecliptic_to_equatorial(geo, obliquity_deg(d)));
        let distance_au = norm(geo);
        let mut horizontal = equatorial_to_horizontal(equatorial, self.lst_deg(jd), self.observer.latitude);

        if body.eq_ignore_ascii_case("Moon") {
            // topocentric parallax, about a degree at the horizon
            let dist_km = distance_au * AU_KM;
            let p = (EARTH_RADIUS_KM / dist_km * horizontal.altitude.to_radians().cos()).asin();
            horizontal.altitude -= p.to_degrees();
        }

        Some(Apparent {
            horizontal,
            equatorial,
            distance_au,
        })
    }

    fn sub_point(&self, body: &str, t: DateTime<Utc>) -> Option<GeoPoint> {
        let sat = self.satellite(body)?;
        let jd = julian_date(t);
        let ecef = eci_to_ecef(sat.eci_km(jd), gmst_deg(jd).to_radians());
        let horiz = (ecef[0] * ecef[0] + ecef[1] * ecef[1]).sqrt();
        Some(GeoPoint {
            latitude: ecef[2].atan2(horiz).to_degrees(),
            longitude: ecef[1].atan2(ecef[0]).to_degrees(),
        })
    }

    fn illuminated_fraction(&self, body: &str, t: DateTime<Utc>) -> Option<f64> {
        let d = julian_date(t) - J2000;
        if body.eq_ignore_ascii_case("Sun") {
            return Some(1.0);
        }
        if body.eq_ignore_ascii_case("Moon") {
            // elongation from the Sun stands in for the phase angle
            let cos_psi = cos_angle(moon_ecliptic(d), sun_ecliptic(d));
            return Some((1.0 - cos_psi) / 2.0);
        }
        let el = Self::planet(body)?;
        let sun = sun_ecliptic(d);
        let earth = [-sun[0], -sun[1], -sun[2]];
        let p = heliocentric(el, d);
        let to_sun = [-p[0], -p[1], -p[2]];
        let cos_alpha = cos_angle(to_sun, sub(earth, p));
        Some((1.0 + cos_alpha) / 2.0)
    }

    fn stars(&self, t: DateTime<Utc>) -> Vec<StarSighting> {
        let lst = self.lst_deg(julian_date(t));
        self.stars
            .iter()
            .map(|s| StarSighting {
                direction: equatorial_to_horizontal(
                    Equatorial {
                        ra_hours: s.ra_hours,
                        dec_deg: s.dec_deg,
                    },
                    lst,
                    self.observer.latitude,
                ),
                magnitude: s.magnitude,
            })
            .collect()
    }
}
