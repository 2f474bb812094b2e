use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gsc_schemas::{
    EntityKind, ExternalInstitutionRecord, ExternalStaffRecord, Person, RegistryEntity,
};

/// Why a record could not be applied automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictReason {
    /// The internal record changed after the external source's last edit.
    OutdatedSource,
    /// More than one internal record (or more than one external record)
    /// claims the same IRN.
    MultipleMatches,
    /// A staff name match is not one-to-one.
    AmbiguousNameMatch,
    /// The external record has no usable `dateModified`.
    UnknownSourceFreshness,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Institution,
    Staff,
}

/// The external record a conflict is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub kind: SourceKind,
    pub irn: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
}

impl SourceRef {
    pub fn institution(rec: &ExternalInstitutionRecord) -> Self {
        Self {
            kind: SourceKind::Institution,
            irn: rec.irn.clone(),
            code: rec.code.clone(),
            name: rec.organization_name.clone(),
        }
    }

    pub fn staff(rec: &ExternalStaffRecord) -> Self {
        let name = [
            rec.first_name.as_deref(),
            rec.middle_name.as_deref(),
            rec.last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        Self {
            kind: SourceKind::Staff,
            irn: rec.irn.clone(),
            code: rec.code.clone(),
            name: (!name.is_empty()).then_some(name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Institution,
    Collection,
    Person,
}

impl From<EntityKind> for TargetKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Institution => TargetKind::Institution,
            EntityKind::Collection => TargetKind::Collection,
        }
    }
}

/// An internal record a conflict involves. `label` is the code for
/// institutions and collections and the full name for persons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRef {
    pub kind: TargetKind,
    pub key: Option<Uuid>,
    pub label: Option<String>,
}

impl MatchedRef {
    pub fn entity(e: &RegistryEntity) -> Self {
        Self {
            kind: e.kind.into(),
            key: e.key,
            label: e.code.clone(),
        }
    }

    pub fn person(p: &Person) -> Self {
        let name = [p.first_name.as_deref(), p.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            kind: TargetKind::Person,
            key: p.key,
            label: (!name.is_empty()).then_some(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessEvidence {
    pub internal_modified: Option<DateTime<Utc>>,
    pub source_date_modified: Option<String>,
}

/// A record that needs human review. Never applied automatically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub reason: ConflictReason,
    pub sources: Vec<SourceRef>,
    pub matches: Vec<MatchedRef>,
    pub evidence: Option<FreshnessEvidence>,
}

impl Conflict {
    pub fn new(reason: ConflictReason, sources: Vec<SourceRef>, matches: Vec<MatchedRef>) -> Self {
        Self {
            reason,
            sources,
            matches,
            evidence: None,
        }
    }

    pub fn with_evidence(
        mut self,
        internal_modified: Option<DateTime<Utc>>,
        source_date_modified: Option<&str>,
    ) -> Self {
        self.evidence = Some(FreshnessEvidence {
            internal_modified,
            source_date_modified: source_date_modified.map(str::to_string),
        });
        self
    }

    pub fn matched_keys(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.matches.iter().filter_map(|m| m.key)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Update<T> {
    pub old: T,
    pub new: T,
}

/// Classification of one matched or unmatched record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome<T> {
    Create(T),
    Update(Update<T>),
    NoChange(T),
    Conflict(Conflict),
}

/// Buckets for one internal kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindDiff<T> {
    pub to_create: Vec<T>,
    pub to_update: Vec<Update<T>>,
    pub no_change: Vec<T>,
    pub conflicts: Vec<Conflict>,
}

impl<T> Default for KindDiff<T> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            no_change: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}

impl<T> KindDiff<T> {
    pub fn record(&mut self, outcome: Outcome<T>) {
        match outcome {
            Outcome::Create(v) => self.to_create.push(v),
            Outcome::Update(u) => self.to_update.push(u),
            Outcome::NoChange(v) => self.no_change.push(v),
            Outcome::Conflict(c) => self.conflicts.push(c),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.no_change.is_empty()
            && self.conflicts.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDiffResult {
    pub persons_to_create: Vec<Person>,
    pub persons_to_update: Vec<Update<Person>>,
    pub persons_no_change: Vec<Person>,
    /// Report-only: in IH scope but absent from the external staff set.
    pub persons_to_delete: Vec<Person>,
    pub conflicts: Vec<Conflict>,
}

impl StaffDiffResult {
    pub fn record(&mut self, outcome: Outcome<Person>) {
        match outcome {
            Outcome::Create(p) => self.persons_to_create.push(p),
            Outcome::Update(u) => self.persons_to_update.push(u),
            Outcome::NoChange(p) => self.persons_no_change.push(p),
            Outcome::Conflict(c) => self.conflicts.push(c),
        }
    }

    pub fn record_orphan(&mut self, person: Person) {
        self.persons_to_delete.push(person);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSummary {
    pub to_create: usize,
    pub to_update: usize,
    pub no_change: usize,
    pub conflicts: usize,
}

impl<T> From<&KindDiff<T>> for KindSummary {
    fn from(d: &KindDiff<T>) -> Self {
        Self {
            to_create: d.to_create.len(),
            to_update: d.to_update.len(),
            no_change: d.no_change.len(),
            conflicts: d.conflicts.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub to_create: usize,
    pub to_update: usize,
    pub no_change: usize,
    pub to_delete: usize,
    pub conflicts: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub institutions: KindSummary,
    pub collections: KindSummary,
    pub staff: StaffSummary,
}

/// Staff of an institution that does not exist yet. Created entities carry
/// no key, so the link is by position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstitutionStaff {
    /// Position in `institutions.to_create`.
    pub institution: usize,
    /// Positions in `staff.persons_to_create`.
    pub persons: Vec<usize>,
}

/// Everything one run would change. Computed without touching the registry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub institutions: KindDiff<RegistryEntity>,
    pub collections: KindDiff<RegistryEntity>,
    pub staff: StaffDiffResult,
    /// Primary-institution links to fill in once the institutions are
    /// created and have keys.
    #[serde(default)]
    pub new_institution_staff: Vec<NewInstitutionStaff>,
}

impl DiffResult {
    /// Persons to create whose primary institution is the `institution`th
    /// entry of `institutions.to_create`.
    pub fn staff_of_new_institution(&self, institution: usize) -> Vec<&Person> {
        self.new_institution_staff
            .iter()
            .filter(|link| link.institution == institution)
            .flat_map(|link| &link.persons)
            .filter_map(|p| self.staff.persons_to_create.get(*p))
            .collect()
    }

    /// Institution conflicts then collection conflicts, in input order.
    pub fn conflicts(&self) -> Vec<&Conflict> {
        self.institutions
            .conflicts
            .iter()
            .chain(&self.collections.conflicts)
            .collect()
    }

    /// [`conflicts`](Self::conflicts) followed by staff conflicts.
    pub fn all_conflicts(&self) -> Vec<&Conflict> {
        let mut all = self.conflicts();
        all.extend(&self.staff.conflicts);
        all
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            institutions: (&self.institutions).into(),
            collections: (&self.collections).into(),
            staff: StaffSummary {
                to_create: self.staff.persons_to_create.len(),
                to_update: self.staff.persons_to_update.len(),
                no_change: self.staff.persons_no_change.len(),
                to_delete: self.staff.persons_to_delete.len(),
                conflicts: self.staff.conflicts.len(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_land_in_their_bucket() {
        let mut d: KindDiff<u8> = KindDiff::default();
        d.record(Outcome::Create(1));
        d.record(Outcome::Update(Update { old: 2, new: 3 }));
        d.record(Outcome::NoChange(4));
        d.record(Outcome::Conflict(Conflict::new(
            ConflictReason::MultipleMatches,
            vec![],
            vec![],
        )));
        assert_eq!(d.to_create, vec![1]);
        assert_eq!(d.to_update.len(), 1);
        assert_eq!(d.no_change, vec![4]);
        assert_eq!(d.conflicts.len(), 1);
    }

    #[test]
    fn reason_serializes_as_stable_code() {
        let s = serde_json::to_string(&ConflictReason::UnknownSourceFreshness).unwrap();
        assert_eq!(s, "\"UNKNOWN_SOURCE_FRESHNESS\"");
    }

    #[test]
    fn conflicts_are_institutions_first_then_staff() {
        let mut r = DiffResult::default();
        r.collections.conflicts.push(Conflict::new(
            ConflictReason::OutdatedSource,
            vec![],
            vec![],
        ));
        r.institutions.conflicts.push(Conflict::new(
            ConflictReason::MultipleMatches,
            vec![],
            vec![],
        ));
        r.staff.conflicts.push(Conflict::new(
            ConflictReason::AmbiguousNameMatch,
            vec![],
            vec![],
        ));

        let reasons: Vec<_> = r.all_conflicts().iter().map(|c| c.reason).collect();
        assert_eq!(
            reasons,
            vec![
                ConflictReason::MultipleMatches,
                ConflictReason::OutdatedSource,
                ConflictReason::AmbiguousNameMatch,
            ]
        );
        assert_eq!(r.conflicts().len(), 2);
        assert_eq!(r.summary().staff.conflicts, 1);
    }

    #[test]
    fn staff_source_ref_joins_name_parts() {
        let rec = ExternalStaffRecord {
            first_name: Some("Ana".to_string()),
            middle_name: Some(" ".to_string()),
            last_name: Some("Ruiz".to_string()),
            ..Default::default()
        };
        assert_eq!(SourceRef::staff(&rec).name.as_deref(), Some("Ana Ruiz"));
    }
}
