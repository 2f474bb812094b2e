//! External record -> registry value conversion.
//!
//! Fields IH models are always taken from the external record, even when it
//! leaves them empty. Everything else on an existing entity is carried over
//! untouched.

use gsc_config::SyncSettings;
use gsc_schemas::{
    Address, EntityKind, ExternalInstitutionRecord, ExternalStaffRecord, Identifier,
    IdentifierType, Person, RegistryEntity,
};

use crate::country::{CountryResolver, CountryTableError};
use crate::irn;

const MULTI_VALUE_SEPARATORS: &[char] = &['\n', '\r', ',', ';'];

#[derive(Clone, Debug)]
pub struct EntityConverter {
    countries: CountryResolver,
    creation_user: String,
}

impl EntityConverter {
    pub fn new(countries: CountryResolver, creation_user: impl Into<String>) -> Self {
        Self {
            countries,
            creation_user: creation_user.into(),
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self, CountryTableError> {
        Ok(Self::new(
            CountryResolver::new(&settings.countries)?,
            settings.creation_user(),
        ))
    }

    pub fn countries(&self) -> &CountryResolver {
        &self.countries
    }

    pub fn creation_user(&self) -> &str {
        &self.creation_user
    }

    pub fn to_institution(
        &self,
        ext: &ExternalInstitutionRecord,
        existing: Option<&RegistryEntity>,
    ) -> RegistryEntity {
        self.to_entity(EntityKind::Institution, ext, existing)
    }

    pub fn to_collection(
        &self,
        ext: &ExternalInstitutionRecord,
        existing: Option<&RegistryEntity>,
    ) -> RegistryEntity {
        self.to_entity(EntityKind::Collection, ext, existing)
    }

    /// Candidate registry entity for `ext`. With `existing`, the result keeps
    /// its key, system fields and every field IH does not model.
    pub fn to_entity(
        &self,
        kind: EntityKind,
        ext: &ExternalInstitutionRecord,
        existing: Option<&RegistryEntity>,
    ) -> RegistryEntity {
        let mut entity = match existing {
            Some(e) => e.clone(),
            None => {
                let mut fresh = RegistryEntity::new(kind);
                fresh.created_by = Some(self.creation_user.clone());
                fresh.modified_by = Some(self.creation_user.clone());
                fresh
            }
        };

        entity.code = clean(ext.code.as_deref());
        entity.name = clean(ext.organization_name.as_deref());
        entity.number_specimens = ext.specimen_total;
        entity.index_herbariorum_record = true;

        // registry collections carry no coordinates
        if entity.kind == EntityKind::Institution {
            let coordinates = ext.location.and_then(|l| l.coordinates());
            entity.latitude = coordinates.map(|(lat, _)| lat);
            entity.longitude = coordinates.map(|(_, lon)| lon);
        }

        let addr = ext.address.as_ref();
        entity.address = self.address(
            addr.and_then(|a| a.physical_street.as_deref()),
            addr.and_then(|a| a.physical_city.as_deref()),
            addr.and_then(|a| a.physical_state.as_deref()),
            addr.and_then(|a| a.physical_zip_code.as_deref()),
            addr.and_then(|a| a.physical_country.as_deref()),
        );
        entity.mailing_address = self.address(
            addr.and_then(|a| a.postal_street.as_deref()),
            addr.and_then(|a| a.postal_city.as_deref()),
            addr.and_then(|a| a.postal_state.as_deref()),
            addr.and_then(|a| a.postal_zip_code.as_deref()),
            addr.and_then(|a| a.postal_country.as_deref()),
        );

        let contact = ext.contact.as_ref();
        entity.email = split_multi(contact.and_then(|c| c.email.as_deref()));
        entity.phone = split_multi(contact.and_then(|c| c.phone.as_deref()));
        entity.homepage = split_multi(contact.and_then(|c| c.web_url.as_deref()))
            .into_iter()
            .next()
            .map(|url| url.chars().filter(|c| !c.is_whitespace()).collect());

        if let Some(irn) = irn::source_irn(ext.irn.as_deref()) {
            ensure_identifier(&mut entity.identifiers, irn);
        }

        entity
    }

    /// Candidate person for an IH staff record.
    pub fn to_person(&self, staff: &ExternalStaffRecord, existing: Option<&Person>) -> Person {
        let mut person = match existing {
            Some(p) => p.clone(),
            None => Person {
                created_by: Some(self.creation_user.clone()),
                modified_by: Some(self.creation_user.clone()),
                ..Person::default()
            },
        };

        person.first_name = first_name(staff);
        person.last_name = clean(staff.last_name.as_deref());
        person.position = clean(staff.position.as_deref());

        let contact = staff.contact.as_ref();
        person.email = first_value(contact.and_then(|c| c.email.as_deref()));
        person.phone = first_value(contact.and_then(|c| c.phone.as_deref()));
        person.fax = first_value(contact.and_then(|c| c.fax.as_deref()));

        let addr = staff.address.as_ref();
        person.mailing_address = self.address(
            addr.and_then(|a| a.street.as_deref()),
            addr.and_then(|a| a.city.as_deref()),
            addr.and_then(|a| a.state.as_deref()),
            addr.and_then(|a| a.zip_code.as_deref()),
            addr.and_then(|a| a.country.as_deref()),
        );

        if let Some(irn) = irn::source_irn(staff.irn.as_deref()) {
            ensure_identifier(&mut person.identifiers, irn);
        }

        person
    }

    fn address(
        &self,
        street: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
        country: Option<&str>,
    ) -> Option<Address> {
        let address = Address {
            address: clean(street),
            city: clean(city),
            province: clean(state),
            postal_code: clean(zip),
            country: self.countries.resolve_opt(country),
        };
        (!address.is_empty()).then_some(address)
    }
}

/// "first middle", or `None` when both are blank.
fn first_name(staff: &ExternalStaffRecord) -> Option<String> {
    let parts: Vec<String> = [staff.first_name.as_deref(), staff.middle_name.as_deref()]
        .into_iter()
        .filter_map(clean)
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn ensure_identifier(identifiers: &mut Vec<Identifier>, irn: &str) {
    let encoded = irn::encode(irn);
    let present = identifiers
        .iter()
        .any(|i| i.identifier_type == IdentifierType::IhIrn && i.identifier == encoded);
    if !present {
        identifiers.push(irn::identifier(irn));
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn split_multi(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(MULTI_VALUE_SEPARATORS)
                .filter_map(|s| clean(Some(s)))
                .collect()
        })
        .unwrap_or_default()
}

fn first_value(value: Option<&str>) -> Option<String> {
    split_multi(value).into_iter().next()
}
