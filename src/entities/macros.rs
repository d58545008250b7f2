//! Macros for reducing boilerplate when defining resources
//!
//! Every resource struct carries the same bookkeeping fields and the same
//! [`Resource`](crate::core::resource::Resource) implementation; only the
//! domain fields and the descriptor differ.

/// Define a resource struct with the common bookkeeping fields
///
/// Injects: id, status, createDate, lastModifiedDate, deleteDate, and
/// implements `Resource` against the given descriptor static.
///
/// # Example
///
/// ```rust,ignore
/// pub static COURSES: ResourceDescriptor = ResourceDescriptor { /* ... */ };
///
/// impl_resource!(Course, COURSES, {
///     course_code: String,
///     education_organization_id: i64,
///     course_title: String,
/// });
///
/// let course = Course::new(Uuid::new_v4(), current_timestamp(),
///     "ALG-1".to_string(), 255901, "Algebra I".to_string());
/// ```
#[macro_export]
macro_rules! impl_resource {
    (
        $type:ident,
        $descriptor:path,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $type {
            /// Surrogate identifier
            pub id: ::uuid::Uuid,

            $( $(#[$field_meta])* pub $field : $field_type, )*

            /// Lifecycle status
            pub status: $crate::core::resource::RecordStatus,

            /// When this record was created
            pub create_date: ::chrono::DateTime<::chrono::Utc>,

            /// When this record was last written; source of its version token
            pub last_modified_date: ::chrono::DateTime<::chrono::Utc>,

            /// When this record was soft-deleted (if applicable)
            #[serde(default)]
            pub delete_date: Option<::chrono::DateTime<::chrono::Utc>>,
        }

        impl $crate::core::resource::Resource for $type {
            fn descriptor() -> &'static $crate::core::resource::ResourceDescriptor {
                &$descriptor
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn status(&self) -> $crate::core::resource::RecordStatus {
                self.status
            }

            fn create_date(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.create_date
            }

            fn last_modified_date(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.last_modified_date
            }

            fn delete_date(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.delete_date
            }

            fn mark_modified(&mut self, now: ::chrono::DateTime<::chrono::Utc>) {
                self.last_modified_date = now;
            }
        }

        impl $type {
            /// Create a new live record stamped at `now`
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                id: ::uuid::Uuid,
                now: ::chrono::DateTime<::chrono::Utc>,
                $( $field: $field_type ),*
            ) -> Self {
                Self {
                    id,
                    $( $field, )*
                    status: $crate::core::resource::RecordStatus::Active,
                    create_date: now,
                    last_modified_date: now,
                    delete_date: None,
                }
            }
        }
    };
}
