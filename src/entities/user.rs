//! API users, optionally linked to a staff member

use crate::core::error::FieldViolation;
use crate::core::field::{FieldFormat, FieldValue};
use crate::core::resource::{ForeignReference, ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{format, not_blank, string_length};
use crate::entities::staff::STAFFS;
use crate::impl_resource;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static USERS: ResourceDescriptor = ResourceDescriptor {
    name: "users",
    table: "users",
    natural_key: &["username"],
    fields: &[
        "id",
        "username",
        "email",
        "firstName",
        "lastName",
        "staffUniqueId",
    ],
    default_limit: None,
};

impl_resource!(User, USERS, {
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    staff_unique_id: Option<String>,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub staff_unique_id: Option<String>,
}

impl ResourceRules for User {
    type Input = UserInput;

    fn validate_input(input: &UserInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("username", &json!(input.username), not_blank())
            .check("username", &json!(input.username), string_length(3, 60))
            .check("email", &json!(input.email), format(FieldFormat::Email))
            .check("firstName", &json!(input.first_name), not_blank())
            .check("lastName", &json!(input.last_name), not_blank());
        if input.username.chars().any(char::is_whitespace) {
            report.push("username", "'username' must not contain whitespace");
        }
        report.into_violations()
    }

    fn from_input(id: Uuid, input: UserInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.username,
            input.email,
            input.first_name,
            input.last_name,
            input.staff_unique_id,
        )
    }

    fn apply_input(&mut self, input: UserInput) {
        self.username = input.username;
        self.email = input.email;
        self.first_name = input.first_name;
        self.last_name = input.last_name;
        self.staff_unique_id = input.staff_unique_id;
    }

    fn references(&self) -> Vec<ForeignReference> {
        self.staff_unique_id
            .iter()
            .map(|staff| {
                ForeignReference::new("staffUniqueId", &STAFFS, vec![FieldValue::from(staff.as_str())])
            })
            .collect()
    }
}
