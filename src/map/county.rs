//! Counties and the read-only county atlas

use std::io::Read;
use std::path::Path;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::error::{GameError, Result};
use crate::core::types::{CountyId, GeoPoint};
use crate::map::metric::DistanceMetric;

/// Smallest unit of territory
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct County {
    pub id: CountyId,
    pub name: String,
    pub state: String,
    /// `None` when the source record had no usable coordinates
    pub centroid: Option<GeoPoint>,
}

impl County {
    pub fn new(
        id: CountyId,
        name: impl Into<String>,
        state: impl Into<String>,
        centroid: GeoPoint,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            state: state.into(),
            centroid: Some(centroid),
        }
    }

    /// The centroid, or `InvalidGeometry` if it is missing or out of range
    pub fn checked_centroid(&self) -> Result<GeoPoint> {
        match self.centroid {
            Some(point) if point.is_valid() => Ok(point),
            Some(point) => Err(GameError::InvalidGeometry {
                county: self.id.clone(),
                reason: format!("centroid ({}, {}) is outside lat/lon range", point.lat, point.lon),
            }),
            None => Err(GameError::InvalidGeometry {
                county: self.id.clone(),
                reason: "missing centroid".to_string(),
            }),
        }
    }

    pub fn label(&self) -> String {
        if self.state.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.state)
        }
    }
}

/// Raw CSV row: `fips,name,state,lat,lng`
#[derive(Debug, Deserialize)]
struct CountyRecord {
    fips: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    lat: Option<f64>,
    #[serde(default, alias = "lon", deserialize_with = "csv::invalid_option")]
    lng: Option<f64>,
}

impl From<CountyRecord> for County {
    fn from(record: CountyRecord) -> Self {
        let centroid = match (record.lat, record.lng) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        Self {
            id: CountyId::normalize(&record.fips),
            name: record.name.trim().to_string(),
            state: record.state.trim().to_string(),
            centroid,
        }
    }
}

/// Immutable set of counties indexed by id
#[derive(Clone, Debug, Default)]
pub struct CountyAtlas {
    counties: Vec<County>,
    index: AHashMap<CountyId, usize>,
}

impl CountyAtlas {
    /// Build an atlas; county ids must be unique
    pub fn new(counties: Vec<County>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(counties.len());
        for (i, county) in counties.iter().enumerate() {
            if index.insert(county.id.clone(), i).is_some() {
                return Err(GameError::InvalidSetup(format!(
                    "duplicate county id {}",
                    county.id
                )));
            }
        }
        Ok(Self { counties, index })
    }

    /// Load counties from CSV with a `fips,name,state,lat,lng` header
    ///
    /// Rows with missing or unparseable coordinates are kept with no centroid
    /// so the partitioner can report them.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut counties = Vec::new();
        for record in reader.deserialize::<CountyRecord>() {
            counties.push(County::from(record?));
        }
        tracing::debug!(count = counties.len(), "loaded county records");
        Self::new(counties)
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    pub fn get(&self, id: &CountyId) -> Option<&County> {
        self.index.get(id).map(|&i| &self.counties[i])
    }

    pub fn counties(&self) -> &[County] {
        &self.counties
    }

    /// Counties with a usable centroid
    pub fn located(&self) -> impl Iterator<Item = (&County, GeoPoint)> {
        self.counties
            .iter()
            .filter_map(|c| c.checked_centroid().ok().map(|p| (c, p)))
    }

    /// Closest located county to `target` among those accepted by `filter`
    ///
    /// Exact distance ties resolve to the smallest county id.
    pub fn nearest<F>(&self, target: GeoPoint, metric: DistanceMetric, filter: F) -> Option<&County>
    where
        F: Fn(&County) -> bool,
    {
        self.located()
            .filter(|(county, _)| filter(county))
            .map(|(county, point)| (OrderedFloat(metric.distance(point, target)), county))
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)))
            .map(|(_, county)| county)
    }

    /// (min, max) corners of all located centroids
    pub fn bounds(&self) -> Option<(GeoPoint, GeoPoint)> {
        self.located().fold(None, |acc, (_, p)| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((
                GeoPoint::new(lo.lat.min(p.lat), lo.lon.min(p.lon)),
                GeoPoint::new(hi.lat.max(p.lat), hi.lon.max(p.lon)),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
fips,name,state,lat,lng
1001,Autauga,AL,32.53,-86.64
17031,Cook,IL,41.84,-87.82
2999,Nowhere,AK,,
55009,Brown,WI,not-a-number,-88.0
";

    #[test]
    fn test_csv_loading_pads_fips_and_keeps_bad_rows() {
        let atlas = CountyAtlas::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(atlas.len(), 4);

        let autauga = atlas.get(&CountyId::new("01001")).unwrap();
        assert_eq!(autauga.label(), "Autauga, AL");
        assert_eq!(autauga.centroid, Some(GeoPoint::new(32.53, -86.64)));

        assert!(atlas.get(&CountyId::new("02999")).unwrap().centroid.is_none());
        assert!(atlas.get(&CountyId::new("55009")).unwrap().centroid.is_none());
        assert_eq!(atlas.located().count(), 2);
    }

    #[test]
    fn test_checked_centroid_reports_county() {
        let county = County {
            id: CountyId::new("99999"),
            name: "Broken".into(),
            state: String::new(),
            centroid: Some(GeoPoint::new(120.0, 0.0)),
        };
        match county.checked_centroid() {
            Err(GameError::InvalidGeometry { county, .. }) => assert_eq!(county.as_str(), "99999"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let a = County::new(CountyId::new("00001"), "A", "", GeoPoint::new(0.0, 0.0));
        let b = County::new(CountyId::new("00001"), "B", "", GeoPoint::new(1.0, 1.0));
        assert!(matches!(
            CountyAtlas::new(vec![a, b]),
            Err(GameError::InvalidSetup(_))
        ));
    }

    #[test]
    fn test_nearest_with_filter() {
        let atlas = CountyAtlas::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        let chicago = GeoPoint::new(41.88, -87.63);
        let nearest = atlas.nearest(chicago, DistanceMetric::Haversine, |_| true).unwrap();
        assert_eq!(nearest.id.as_str(), "17031");

        let not_cook = atlas
            .nearest(chicago, DistanceMetric::Haversine, |c| c.id.as_str() != "17031")
            .unwrap();
        assert_eq!(not_cook.id.as_str(), "01001");
    }
}
