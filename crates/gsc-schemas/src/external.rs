//! External records as published by IndexHerbariorum.
//!
//! Field names mirror the IH JSON API (camelCase). Every field is optional:
//! IH data is sparse and the sync must never fail on missing values. IRNs
//! arrive as JSON numbers from the API but are kept as strings here.

use serde::{Deserialize, Deserializer, Serialize};

/// One IH institution (herbarium).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalInstitutionRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub irn: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "organization", alias = "organizationName")]
    pub organization_name: Option<String>,
    pub specimen_total: Option<i64>,
    pub address: Option<InstitutionAddress>,
    pub location: Option<Location>,
    pub contact: Option<InstitutionContact>,
    pub date_modified: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstitutionAddress {
    pub physical_street: Option<String>,
    pub physical_city: Option<String>,
    pub physical_state: Option<String>,
    pub physical_zip_code: Option<String>,
    pub physical_country: Option<String>,
    pub postal_street: Option<String>,
    pub postal_city: Option<String>,
    pub postal_state: Option<String>,
    pub postal_zip_code: Option<String>,
    pub postal_country: Option<String>,
}

/// IH publishes `null` or omits either coordinate for some institutions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Location {
    /// Both coordinates, or nothing.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstitutionContact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub web_url: Option<String>,
}

/// One IH staff member, listed under an institution code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalStaffRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub irn: Option<String>,
    pub code: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub address: Option<StaffAddress>,
    pub contact: Option<StaffContact>,
    pub date_modified: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Str(s)) => Some(s),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) if f.fract() == 0.0 => Some(format!("{f:.0}")),
        Some(Raw::Float(f)) => Some(f.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ih_api_shape() {
        let raw = r#"{
            "irn": 124921,
            "code": "UARK",
            "organization": "University of Arkansas",
            "specimenTotal": 1000,
            "address": { "physicalCity": "Fayetteville", "postalCountry": "U.S.A." },
            "location": { "lat": 36.06, "lon": -94.17 },
            "contact": { "email": "a@uark.edu\nb@uark.edu", "webUrl": "http://a.org" },
            "dateModified": "2019-03-01",
            "someFieldWeDoNotModel": true
        }"#;

        let rec: ExternalInstitutionRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.irn.as_deref(), Some("124921"));
        assert_eq!(rec.organization_name.as_deref(), Some("University of Arkansas"));
        assert_eq!(rec.specimen_total, Some(1000));
        let addr = rec.address.unwrap();
        assert_eq!(addr.physical_city.as_deref(), Some("Fayetteville"));
        assert_eq!(addr.postal_country.as_deref(), Some("U.S.A."));
        assert!(addr.physical_street.is_none());
        assert_eq!(rec.date_modified.as_deref(), Some("2019-03-01"));
    }

    #[test]
    fn partial_or_null_location_parses() {
        let rec: ExternalInstitutionRecord =
            serde_json::from_str(r#"{"code":"X","location":{"lat":null,"lon":-94.17}}"#).unwrap();
        let loc = rec.location.unwrap();
        assert_eq!(loc.lat, None);
        assert_eq!(loc.lon, Some(-94.17));
        assert_eq!(loc.coordinates(), None);

        let rec: ExternalInstitutionRecord =
            serde_json::from_str(r#"{"code":"X","location":{}}"#).unwrap();
        assert_eq!(rec.location, Some(Location::default()));
    }

    #[test]
    fn staff_irn_accepts_string() {
        let rec: ExternalStaffRecord =
            serde_json::from_str(r#"{"irn":"42","firstName":"Ana","lastName":"Ruiz"}"#).unwrap();
        assert_eq!(rec.irn.as_deref(), Some("42"));
        assert_eq!(rec.first_name.as_deref(), Some("Ana"));
        assert!(rec.contact.is_none());
    }

    #[test]
    fn missing_irn_is_none() {
        let rec: ExternalStaffRecord = serde_json::from_str(r#"{"code":"X"}"#).unwrap();
        assert!(rec.irn.is_none());
    }
}
