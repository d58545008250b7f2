//! Grading periods of a school year
//!
//! A grading period belongs to a school and is classified by a
//! `GradingPeriodDescriptor`; both must exist and be live when the period is
//! written. The period must end strictly after it begins.

use crate::core::error::{ApiError, ApiResult, FieldViolation};
use crate::core::field::FieldValue;
use crate::core::resource::{ForeignReference, ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{int_range, positive};
use crate::entities::descriptor::{check_descriptor_uri, descriptor_reference};
use crate::entities::school::SCHOOLS;
use crate::impl_resource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static GRADING_PERIODS: ResourceDescriptor = ResourceDescriptor {
    name: "gradingPeriods",
    table: "grading_periods",
    natural_key: &[
        "gradingPeriodDescriptor",
        "periodSequence",
        "schoolId",
        "schoolYear",
    ],
    fields: &[
        "id",
        "gradingPeriodDescriptor",
        "periodSequence",
        "schoolId",
        "schoolYear",
        "beginDate",
        "endDate",
        "totalInstructionalDays",
    ],
    default_limit: None,
};

impl_resource!(GradingPeriod, GRADING_PERIODS, {
    grading_period_descriptor: String,
    period_sequence: i64,
    school_id: i64,
    school_year: i64,
    begin_date: NaiveDate,
    end_date: NaiveDate,
    total_instructional_days: i64,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingPeriodInput {
    pub grading_period_descriptor: String,
    pub period_sequence: i64,
    pub school_id: i64,
    pub school_year: i64,
    pub begin_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_instructional_days: i64,
}

impl ResourceRules for GradingPeriod {
    type Input = GradingPeriodInput;

    fn validate_input(input: &GradingPeriodInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        check_descriptor_uri(
            &mut report,
            "gradingPeriodDescriptor",
            &input.grading_period_descriptor,
        );
        report
            .check("periodSequence", &json!(input.period_sequence), positive())
            .check("schoolId", &json!(input.school_id), positive())
            .check("schoolYear", &json!(input.school_year), int_range(1900, 2100))
            .check(
                "totalInstructionalDays",
                &json!(input.total_instructional_days),
                int_range(0, 366),
            );
        report.into_violations()
    }

    fn from_input(id: Uuid, input: GradingPeriodInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.grading_period_descriptor,
            input.period_sequence,
            input.school_id,
            input.school_year,
            input.begin_date,
            input.end_date,
            input.total_instructional_days,
        )
    }

    fn apply_input(&mut self, input: GradingPeriodInput) {
        self.grading_period_descriptor = input.grading_period_descriptor;
        self.period_sequence = input.period_sequence;
        self.school_id = input.school_id;
        self.school_year = input.school_year;
        self.begin_date = input.begin_date;
        self.end_date = input.end_date;
        self.total_instructional_days = input.total_instructional_days;
    }

    fn references(&self) -> Vec<ForeignReference> {
        vec![
            ForeignReference::new("schoolId", &SCHOOLS, vec![FieldValue::Integer(self.school_id)]),
            descriptor_reference("gradingPeriodDescriptor", &self.grading_period_descriptor),
        ]
    }

    fn check_rules(&self) -> ApiResult<()> {
        if self.end_date <= self.begin_date {
            return Err(ApiError::bad_request("End date must be after begin date"));
        }
        Ok(())
    }
}
