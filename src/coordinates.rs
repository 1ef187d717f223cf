use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DELIMITER: char = ',';

/// A point in decimal degrees. On the wire and in storage it is written
/// as `"lat,lng"`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
        }
    }

    /// Distance in the (lat, lng) plane.
    ///
    /// This is a flat-plane approximation, not a great-circle distance,
    /// and the radius it is compared against is in the same degree units.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let latitude = self.latitude - other.latitude;
        let longitude = self.longitude - other.longitude;

        (latitude * latitude + longitude * longitude).sqrt()
    }

    /// Whether the point lies on the globe.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.latitude, DELIMITER, self.longitude)
    }
}

impl FromStr for Coordinates {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(DELIMITER);

        match (parts.next(), parts.next(), parts.next()) {
            (Some(latitude), Some(longitude), None) => Ok(Coordinates::new(
                parse_component(latitude)?,
                parse_component(longitude)?,
            )),
            _ => Err(ParseError::Format),
        }
    }
}

impl TryFrom<String> for Coordinates {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Coordinates> for String {
    fn from(c: Coordinates) -> Self {
        c.to_string()
    }
}

fn parse_component(raw: &str) -> Result<f64, ParseError> {
    let value: f64 = raw.trim().parse().map_err(|_| ParseError::Value)?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::Value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParseError {
    /// Not two comma-separated parts.
    Format,

    /// A part is not a finite number.
    Value,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Format => write!(f, "expected 'latitude,longitude'"),
            ParseError::Value => write!(f, "latitude and longitude must be numbers"),
        }
    }
}
