//! Descriptors: namespaced code values referenced by other resources
//!
//! Other resources point at a descriptor with a URI of the form
//! `{namespace}#{codeValue}`, e.g.
//! `uri://ed-fi.org/GradingPeriodDescriptor#First Six Weeks`.

use crate::core::error::{ApiError, ApiResult, FieldViolation};
use crate::core::field::{FieldFormat, FieldValue};
use crate::core::resource::{ForeignReference, ResourceDescriptor, ResourceRules};
use crate::core::validation::ValidationReport;
use crate::core::validation::validators::{format, not_blank, required, string_length};
use crate::impl_resource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub static DESCRIPTORS: ResourceDescriptor = ResourceDescriptor {
    name: "descriptors",
    table: "descriptors",
    natural_key: &["namespace", "codeValue"],
    fields: &[
        "id",
        "namespace",
        "codeValue",
        "shortDescription",
        "description",
        "effectiveBeginDate",
        "effectiveEndDate",
    ],
    default_limit: Some(100),
};

impl_resource!(Descriptor, DESCRIPTORS, {
    namespace: String,
    code_value: String,
    short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effective_begin_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effective_end_date: Option<NaiveDate>,
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorInput {
    pub namespace: String,
    pub code_value: String,
    pub short_description: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub effective_begin_date: Option<NaiveDate>,
    #[serde(default)]
    pub effective_end_date: Option<NaiveDate>,
}

impl ResourceRules for Descriptor {
    type Input = DescriptorInput;

    fn validate_input(input: &DescriptorInput) -> Vec<FieldViolation> {
        let mut report = ValidationReport::new();
        report
            .check("namespace", &json!(input.namespace), not_blank())
            .check("namespace", &json!(input.namespace), string_length(1, 255))
            .check("namespace", &json!(input.namespace), format(FieldFormat::Namespace))
            .check("codeValue", &json!(input.code_value), not_blank())
            .check("codeValue", &json!(input.code_value), string_length(1, 50))
            .check("shortDescription", &json!(input.short_description), required())
            .check("shortDescription", &json!(input.short_description), string_length(1, 75));
        if input.code_value.contains('#') {
            report.push("codeValue", "'codeValue' must not contain '#'");
        }
        report.into_violations()
    }

    fn from_input(id: Uuid, input: DescriptorInput, now: DateTime<Utc>) -> Self {
        Self::new(
            id,
            now,
            input.namespace,
            input.code_value,
            input.short_description,
            input.description,
            input.effective_begin_date,
            input.effective_end_date,
        )
    }

    fn apply_input(&mut self, input: DescriptorInput) {
        self.namespace = input.namespace;
        self.code_value = input.code_value;
        self.short_description = input.short_description;
        self.description = input.description;
        self.effective_begin_date = input.effective_begin_date;
        self.effective_end_date = input.effective_end_date;
    }

    fn check_rules(&self) -> ApiResult<()> {
        if let (Some(begin), Some(end)) = (self.effective_begin_date, self.effective_end_date) {
            if end <= begin {
                return Err(ApiError::bad_request(
                    "Effective end date must be after effective begin date",
                ));
            }
        }
        Ok(())
    }
}

/// Split a descriptor URI into (namespace, codeValue)
pub fn split_descriptor_uri(uri: &str) -> Option<(&str, &str)> {
    let (namespace, code_value) = uri.rsplit_once('#')?;
    if namespace.is_empty() || code_value.is_empty() {
        return None;
    }
    Some((namespace, code_value))
}

/// Reference from `field` to the descriptor named by `uri`
pub fn descriptor_reference(field: &'static str, uri: &str) -> ForeignReference {
    let key = match split_descriptor_uri(uri) {
        Some((namespace, code_value)) => vec![
            FieldValue::from(namespace),
            FieldValue::from(code_value),
        ],
        None => vec![FieldValue::from(uri), FieldValue::Null],
    };
    ForeignReference::new(field, &DESCRIPTORS, key)
}

/// Validator for fields holding a descriptor URI
pub fn check_descriptor_uri(report: &mut ValidationReport, field: &str, uri: &str) {
    match split_descriptor_uri(uri) {
        Some((namespace, _)) if FieldFormat::Namespace.validate(&FieldValue::from(namespace)) => {}
        _ => {
            report.push(
                field,
                format!("'{}' must be a descriptor URI like 'uri://ed-fi.org/Name#Code'", field),
            );
        }
    }
}
