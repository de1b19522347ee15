//! Request validation
//!
//! Turns loosely typed request input (JSON bodies, form bodies, query
//! strings) into [`NewSchool`] and [`Coordinate`] values. The `Display` text
//! of every [`ValidationError`] is the message returned to the client.

use axum::http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::models::NewSchool;

/// Maximum stored length of a school name, in characters
pub const MAX_NAME_LEN: usize = 255;

/// Maximum stored length of a school address, in characters
pub const MAX_ADDRESS_LEN: usize = 500;

/// Client-caused input errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is not a JSON object or form
    #[error("Request body must be a JSON object")]
    MalformedBody,

    /// Body exceeds the configured limit
    #[error("Request body must be at most {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// One of the school fields is absent, null or blank
    #[error("All fields are required: name, address, latitude, longitude")]
    MissingFields,

    /// Query coordinates absent or blank
    #[error("User latitude and longitude are required as query parameters")]
    MissingQueryCoordinates,

    /// Name or address is not a string
    #[error("Name and address must be strings")]
    InvalidFieldType,

    /// Coordinate does not parse as a finite number
    #[error("Latitude and longitude must be valid numbers")]
    InvalidNumber,

    /// Coordinate outside the valid ranges
    #[error("Invalid coordinates. Latitude: -90 to 90, Longitude: -180 to 180")]
    OutOfRange,

    /// String longer than its column allows
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

impl ValidationError {
    /// HTTP status for this rejection
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

// ============================================================================
// Body parsing
// ============================================================================

/// Decode a request body into a JSON object
///
/// `application/x-www-form-urlencoded` bodies become an object of string
/// values; everything else is parsed as JSON.
pub fn body_to_object(content_type: Option<&str>, body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    let is_form = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        });

    if is_form {
        return Ok(url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ValidationError::MalformedBody),
    }
}

/// Validate an add-school payload
///
/// Checks run in a fixed order: presence, string types, numeric
/// coordinates, coordinate ranges, then column lengths. The first failing
/// check is reported. Only absent, null and blank values count as missing,
/// so `false` or `0` as a name is a type error.
pub fn parse_new_school(body: &Map<String, Value>) -> Result<NewSchool, ValidationError> {
    let name = body.get("name");
    let address = body.get("address");
    let latitude = body.get("latitude");
    let longitude = body.get("longitude");

    if [name, address, latitude, longitude].into_iter().any(is_blank) {
        return Err(ValidationError::MissingFields);
    }

    let (Some(Value::String(name)), Some(Value::String(address))) = (name, address) else {
        return Err(ValidationError::InvalidFieldType);
    };

    let lat = number_from_value(latitude)?;
    let lon = number_from_value(longitude)?;
    let location = Coordinate::new(lat, lon)?;

    let name = name.trim();
    let address = address.trim();
    check_len("Name", name, MAX_NAME_LEN)?;
    check_len("Address", address, MAX_ADDRESS_LEN)?;

    Ok(NewSchool {
        name: name.to_string(),
        address: address.to_string(),
        location,
    })
}

/// Validate the query coordinates of a listing request
pub fn parse_query_coordinate(
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<Coordinate, ValidationError> {
    let (Some(lat), Some(lon)) = (non_blank(latitude), non_blank(longitude)) else {
        return Err(ValidationError::MissingQueryCoordinates);
    };

    Coordinate::new(parse_number(lat)?, parse_number(lon)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn number_from_value(value: Option<&Value>) -> Result<f64, ValidationError> {
    match value {
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::InvalidNumber),
        Some(Value::String(s)) => parse_number(s),
        _ => Err(ValidationError::InvalidNumber),
    }
}

fn parse_number(s: &str) -> Result<f64, ValidationError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::InvalidNumber)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
