//! Staff members

use crate::core::error::FieldViolation;
use crate::core::field::FieldFormat;
use crate::core::resource::{ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{format, not_blank, string_length};
use crate::impl_resource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static STAFFS: ResourceDescriptor = ResourceDescriptor {
    name: "staffs",
    table: "staffs",
    natural_key: &["staffUniqueId"],
    fields: &[
        "id",
        "staffUniqueId",
        "firstName",
        "lastSurname",
        "electronicMailAddress",
        "hireDate",
    ],
    default_limit: None,
};

impl_resource!(Staff, STAFFS, {
    staff_unique_id: String,
    first_name: String,
    last_surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    electronic_mail_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hire_date: Option<NaiveDate>,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInput {
    pub staff_unique_id: String,
    pub first_name: String,
    pub last_surname: String,
    #[serde(default)]
    pub electronic_mail_address: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

impl ResourceRules for Staff {
    type Input = StaffInput;

    fn validate_input(input: &StaffInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("staffUniqueId", &json!(input.staff_unique_id), not_blank())
            .check("staffUniqueId", &json!(input.staff_unique_id), string_length(1, 32))
            .check("firstName", &json!(input.first_name), not_blank())
            .check("lastSurname", &json!(input.last_surname), not_blank())
            .check(
                "electronicMailAddress",
                &json!(input.electronic_mail_address),
                format(FieldFormat::Email),
            );
        report.into_violations()
    }

    fn from_input(id: Uuid, input: StaffInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.staff_unique_id,
            input.first_name,
            input.last_surname,
            input.electronic_mail_address,
            input.hire_date,
        )
    }

    fn apply_input(&mut self, input: StaffInput) {
        self.staff_unique_id = input.staff_unique_id;
        self.first_name = input.first_name;
        self.last_surname = input.last_surname;
        self.electronic_mail_address = input.electronic_mail_address;
        self.hire_date = input.hire_date;
    }
}
