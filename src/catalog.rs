use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct CatalogStar {
    pub(crate) name: String,
    pub(crate) ra_hours: f64,
    pub(crate) dec_deg: f64,
    pub(crate) magnitude: f64,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CatalogError {
    #[error("cannot open star catalog {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed star catalog row: {0}")]
    Csv(#[from] csv::Error),

    #[error("star {name} is off the sky: ra {ra_hours}h, dec {dec_deg}°, mag {magnitude}")]
    OutOfRange {
        name: String,
        ra_hours: f64,
        dec_deg: f64,
        magnitude: f64,
    },
}

// name, RA (hours, J2000), Dec (degrees), visual magnitude
const BRIGHT_STARS: &[(&str, f64, f64, f64)] = &[
    ("Sirius", 6.7525, -16.716, -1.46),
    ("Canopus", 6.3992, -52.696, -0.74),
    ("Rigil Kentaurus", 14.6600, -60.834, -0.27),
    ("Arcturus", 14.2610, 19.182, -0.05),
    ("Vega", 18.6156, 38.784, 0.03),
    ("Capella", 5.2782, 45.998, 0.08),
    ("Rigel", 5.2423, -8.202, 0.13),
    ("Procyon", 7.6550, 5.225, 0.34),
    ("Achernar", 1.6286, -57.237, 0.46),
    ("Betelgeuse", 5.9195, 7.407, 0.50),
    ("Hadar", 14.0637, -60.373, 0.61),
    ("Altair", 19.8464, 8.868, 0.76),
    ("Acrux", 12.4433, -63.099, 0.77),
    ("Aldebaran", 4.5987, 16.509, 0.86),
    ("Antares", 16.4901, -26.432, 0.96),
    ("Spica", 13.4199, -11.161, 0.97),
    ("Pollux", 7.7553, 28.026, 1.14),
    ("Fomalhaut", 22.9608, -29.622, 1.16),
    ("Deneb", 20.6905, 45.280, 1.25),
    ("Mimosa", 12.7953, -59.689, 1.25),
    ("Regulus", 10.1395, 11.967, 1.35),
    ("Adhara", 6.9771, -28.972, 1.50),
    ("Castor", 7.5767, 31.888, 1.58),
    ("Shaula", 17.5601, -37.104, 1.62),
    ("Gacrux", 12.5194, -57.113, 1.63),
    ("Bellatrix", 5.4188, 6.350, 1.64),
    ("Elnath", 5.4382, 28.608, 1.65),
    ("Miaplacidus", 9.2200, -69.717, 1.67),
    ("Alnilam", 5.6036, -1.202, 1.69),
    ("Alnair", 22.1372, -46.961, 1.74),
    ("Alnitak", 5.6793, -1.943, 1.77),
    ("Alioth", 12.9005, 55.960, 1.77),
    ("Dubhe", 11.0621, 61.751, 1.79),
    ("Mirfak", 3.4054, 49.861, 1.79),
    ("Wezen", 7.1399, -26.393, 1.83),
    ("Kaus Australis", 18.4029, -34.385, 1.85),
    ("Alkaid", 13.7923, 49.313, 1.86),
    ("Menkalinan", 5.9921, 44.948, 1.90),
    ("Alhena", 6.6285, 16.399, 1.92),
    ("Peacock", 20.4275, -56.735, 1.94),
    ("Polaris", 2.5302, 89.264, 1.98),
    ("Mirzam", 6.3783, -17.956, 1.98),
    ("Alphard", 9.4598, -8.659, 1.99),
    ("Hamal", 2.1196, 23.462, 2.00),
    ("Nunki", 18.9211, -26.297, 2.05),
    ("Saiph", 5.7959, -9.670, 2.07),
    ("Mizar", 13.3988, 54.925, 2.23),
    ("Schedar", 0.6751, 56.537, 2.24),
    ("Caph", 0.1530, 59.150, 2.28),
    ("Merak", 11.0307, 56.382, 2.37),
    ("Enif", 21.7364, 9.875, 2.38),
    ("Phecda", 11.8972, 53.695, 2.44),
    ("Navi", 0.9451, 60.717, 2.47),
    ("Markab", 23.0794, 15.205, 2.48),
    ("Ruchbah", 1.4303, 60.235, 2.68),
    ("Megrez", 12.2571, 57.033, 3.31),
    ("Segin", 1.9066, 63.670, 3.35),
];

/// Naked-eye stars down to `mag_limit`.
pub(crate) fn builtin_stars(mag_limit: f64) -> Vec<CatalogStar> {
    BRIGHT_STARS
        .iter()
        .filter(|s| s.3 <= mag_limit)
        .map(|&(name, ra_hours, dec_deg, magnitude)| CatalogStar {
            name: name.to_string(),
            ra_hours,
            dec_deg,
            magnitude,
        })
        .collect()
}

fn validate(star: CatalogStar) -> Result<CatalogStar, CatalogError> {
    let ok = (0.0..24.0).contains(&star.ra_hours)
        && (-90.0..=90.0).contains(&star.dec_deg)
        && star.magnitude.is_finite();
    if ok {
        Ok(star)
    } else {
        Err(CatalogError::OutOfRange {
            name: star.name,
            ra_hours: star.ra_hours,
            dec_deg: star.dec_deg,
            magnitude: star.magnitude,
        })
    }
}

/// Reads `name,ra_hours,dec_deg,magnitude` rows (with header), keeping
/// stars at or brighter than `mag_limit`.
pub(crate) fn parse_catalog<R: Read>(reader: R, mag_limit: f64) -> Result<Vec<CatalogStar>, CatalogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut stars = Vec::new();
    for row in rdr.deserialize::<CatalogStar>() {
        let star = validate(row?)?;
        if star.magnitude <= mag_limit {
            stars.push(star);
        }
    }
    Ok(stars)
}

pub(crate) fn load_catalog(path: &Path, mag_limit: f64) -> Result<Vec<CatalogStar>, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(file, mag_limit)
}
