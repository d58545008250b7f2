//! Schools, identified by their numeric `schoolId`

use crate::core::error::FieldViolation;
use crate::core::resource::{ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{not_blank, positive, string_length};
use crate::impl_resource;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static SCHOOLS: ResourceDescriptor = ResourceDescriptor {
    name: "schools",
    table: "schools",
    natural_key: &["schoolId"],
    fields: &[
        "id",
        "schoolId",
        "nameOfInstitution",
        "shortNameOfInstitution",
        "localEducationAgencyId",
    ],
    default_limit: None,
};

impl_resource!(School, SCHOOLS, {
    school_id: i64,
    name_of_institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    short_name_of_institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local_education_agency_id: Option<i64>,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolInput {
    pub school_id: i64,
    pub name_of_institution: String,
    #[serde(default)]
    pub short_name_of_institution: Option<String>,
    #[serde(default)]
    pub local_education_agency_id: Option<i64>,
}

impl ResourceRules for School {
    type Input = SchoolInput;

    fn validate_input(input: &SchoolInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("schoolId", &json!(input.school_id), positive())
            .check("nameOfInstitution", &json!(input.name_of_institution), not_blank())
            .check(
                "nameOfInstitution",
                &json!(input.name_of_institution),
                string_length(1, 75),
            )
            .check(
                "shortNameOfInstitution",
                &json!(input.short_name_of_institution),
                string_length(1, 75),
            )
            .check(
                "localEducationAgencyId",
                &json!(input.local_education_agency_id),
                positive(),
            );
        report.into_violations()
    }

    fn from_input(id: Uuid, input: SchoolInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.school_id,
            input.name_of_institution,
            input.short_name_of_institution,
            input.local_education_agency_id,
        )
    }

    fn apply_input(&mut self, input: SchoolInput) {
        self.school_id = input.school_id;
        self.name_of_institution = input.name_of_institution;
        self.short_name_of_institution = input.short_name_of_institution;
        self.local_education_agency_id = input.local_education_agency_id;
    }
}
