//! School calendars

use crate::core::error::FieldViolation;
use crate::core::field::FieldValue;
use crate::core::resource::{ForeignReference, ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{int_range, not_blank, positive, string_length};
use crate::entities::descriptor::{check_descriptor_uri, descriptor_reference};
use crate::entities::school::SCHOOLS;
use crate::impl_resource;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static CALENDARS: ResourceDescriptor = ResourceDescriptor {
    name: "calendars",
    table: "calendars",
    natural_key: &["calendarCode", "schoolId", "schoolYear"],
    fields: &[
        "id",
        "calendarCode",
        "schoolId",
        "schoolYear",
        "calendarTypeDescriptor",
    ],
    default_limit: None,
};

impl_resource!(Calendar, CALENDARS, {
    calendar_code: String,
    school_id: i64,
    school_year: i64,
    calendar_type_descriptor: String,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInput {
    pub calendar_code: String,
    pub school_id: i64,
    pub school_year: i64,
    pub calendar_type_descriptor: String,
}

impl ResourceRules for Calendar {
    type Input = CalendarInput;

    fn validate_input(input: &CalendarInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("calendarCode", &json!(input.calendar_code), not_blank())
            .check("calendarCode", &json!(input.calendar_code), string_length(1, 60))
            .check("schoolId", &json!(input.school_id), positive())
            .check("schoolYear", &json!(input.school_year), int_range(1900, 2100));
        check_descriptor_uri(
            &mut report,
            "calendarTypeDescriptor",
            &input.calendar_type_descriptor,
        );
        report.into_violations()
    }

    fn from_input(id: Uuid, input: CalendarInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.calendar_code,
            input.school_id,
            input.school_year,
            input.calendar_type_descriptor,
        )
    }

    fn apply_input(&mut self, input: CalendarInput) {
        self.calendar_code = input.calendar_code;
        self.school_id = input.school_id;
        self.school_year = input.school_year;
        self.calendar_type_descriptor = input.calendar_type_descriptor;
    }

    fn references(&self) -> Vec<ForeignReference> {
        vec![
            ForeignReference::new("schoolId", &SCHOOLS, vec![FieldValue::Integer(self.school_id)]),
            descriptor_reference("calendarTypeDescriptor", &self.calendar_type_descriptor),
        ]
    }
}
