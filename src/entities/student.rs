//! Students

use crate::core::error::{ApiError, ApiResult, FieldViolation};
use crate::core::resource::{ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{not_blank, string_length};
use crate::impl_resource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static STUDENTS: ResourceDescriptor = ResourceDescriptor {
    name: "students",
    table: "students",
    natural_key: &["studentUniqueId"],
    fields: &[
        "id",
        "studentUniqueId",
        "firstName",
        "middleName",
        "lastSurname",
        "birthDate",
    ],
    default_limit: None,
};

impl_resource!(Student, STUDENTS, {
    student_unique_id: String,
    first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    middle_name: Option<String>,
    last_surname: String,
    birth_date: NaiveDate,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub student_unique_id: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_surname: String,
    pub birth_date: NaiveDate,
}

impl ResourceRules for Student {
    type Input = StudentInput;

    fn validate_input(input: &StudentInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("studentUniqueId", &json!(input.student_unique_id), not_blank())
            .check(
                "studentUniqueId",
                &json!(input.student_unique_id),
                string_length(1, 32),
            )
            .check("firstName", &json!(input.first_name), not_blank())
            .check("firstName", &json!(input.first_name), string_length(1, 75))
            .check("middleName", &json!(input.middle_name), string_length(1, 75))
            .check("lastSurname", &json!(input.last_surname), not_blank())
            .check("lastSurname", &json!(input.last_surname), string_length(1, 75));
        report.into_violations()
    }

    fn from_input(id: Uuid, input: StudentInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.student_unique_id,
            input.first_name,
            input.middle_name,
            input.last_surname,
            input.birth_date,
        )
    }

    fn apply_input(&mut self, input: StudentInput) {
        self.student_unique_id = input.student_unique_id;
        self.first_name = input.first_name;
        self.middle_name = input.middle_name;
        self.last_surname = input.last_surname;
        self.birth_date = input.birth_date;
    }

    fn check_rules(&self) -> ApiResult<()> {
        if self.birth_date > self.last_modified_date.date_naive() {
            return Err(ApiError::bad_request("Birth date cannot be in the future"));
        }
        Ok(())
    }
}
