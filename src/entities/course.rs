//! Courses offered by an education organization

use crate::core::error::FieldViolation;
use crate::core::field::FieldValue;
use crate::core::resource::{ForeignReference, ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{int_range, not_blank, positive, string_length};
use crate::entities::school::SCHOOLS;
use crate::impl_resource;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static COURSES: ResourceDescriptor = ResourceDescriptor {
    name: "courses",
    table: "courses",
    natural_key: &["courseCode", "educationOrganizationId"],
    fields: &[
        "id",
        "courseCode",
        "educationOrganizationId",
        "courseTitle",
        "numberOfParts",
    ],
    default_limit: None,
};

impl_resource!(Course, COURSES, {
    course_code: String,
    education_organization_id: i64,
    course_title: String,
    number_of_parts: i64,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub course_code: String,
    pub education_organization_id: i64,
    pub course_title: String,
    #[serde(default = "default_number_of_parts")]
    pub number_of_parts: i64,
}

fn default_number_of_parts() -> i64 {
    1
}

impl ResourceRules for Course {
    type Input = CourseInput;

    fn validate_input(input: &CourseInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("courseCode", &json!(input.course_code), not_blank())
            .check("courseCode", &json!(input.course_code), string_length(1, 60))
            .check(
                "educationOrganizationId",
                &json!(input.education_organization_id),
                positive(),
            )
            .check("courseTitle", &json!(input.course_title), not_blank())
            .check("courseTitle", &json!(input.course_title), string_length(1, 60))
            .check("numberOfParts", &json!(input.number_of_parts), int_range(1, 12));
        report.into_violations()
    }

    fn from_input(id: Uuid, input: CourseInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.course_code,
            input.education_organization_id,
            input.course_title,
            input.number_of_parts,
        )
    }

    fn apply_input(&mut self, input: CourseInput) {
        self.course_code = input.course_code;
        self.education_organization_id = input.education_organization_id;
        self.course_title = input.course_title;
        self.number_of_parts = input.number_of_parts;
    }

    fn references(&self) -> Vec<ForeignReference> {
        vec![ForeignReference::new(
            "educationOrganizationId",
            &SCHOOLS,
            vec![FieldValue::Integer(self.education_organization_id)],
        )]
    }
}
