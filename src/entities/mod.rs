//! Resource catalogue
//!
//! Each module defines one resource type: its descriptor, its record struct
//! (through [`impl_resource!`](crate::impl_resource)), its input body and
//! its domain rules.

pub mod calendar;
pub mod course;
pub mod descriptor;
pub mod grading_period;
pub mod macros;
pub mod school;
pub mod staff;
pub mod student;
pub mod user;

pub use calendar::{CALENDARS, Calendar, CalendarInput};
pub use course::{COURSES, Course, CourseInput};
pub use descriptor::{DESCRIPTORS, Descriptor, DescriptorInput};
pub use grading_period::{GRADING_PERIODS, GradingPeriod, GradingPeriodInput};
pub use school::{SCHOOLS, School, SchoolInput};
pub use staff::{STAFFS, Staff, StaffInput};
pub use student::{STUDENTS, Student, StudentInput};
pub use user::{USERS, User, UserInput};

use crate::core::resource::ResourceDescriptor;
use crate::server::ServerBuilder;

/// Descriptors of every built-in resource type, referenced types first
pub fn catalogue() -> [&'static ResourceDescriptor; 8] {
    [
        &DESCRIPTORS,
        &SCHOOLS,
        &STUDENTS,
        &STAFFS,
        &COURSES,
        &GRADING_PERIODS,
        &CALENDARS,
        &USERS,
    ]
}

/// Register every built-in resource type on a builder
pub fn register_all(builder: ServerBuilder) -> ServerBuilder {
    builder
        .register::<Descriptor>()
        .register::<School>()
        .register::<Student>()
        .register::<Staff>()
        .register::<Course>()
        .register::<GradingPeriod>()
        .register::<Calendar>()
        .register::<User>()
}
