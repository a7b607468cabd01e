use bson::oid::ObjectId;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::resp::problem::{problems, Problem};
use crate::session::{self, SessionLabel};

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

const TIME_FORMAT: &str = "%H:%M";

/// Weekly meeting slot. `day_of_week` counts from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub day_of_week: u8,
    #[schema(example = "18:00")]
    pub start_time: String,
    #[schema(example = "19:30")]
    pub end_time: String,
}

impl ClassSession {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.day_of_week > 6 {
            return Err(problems::bad_request(
                "Bad session.",
                format!("Day of week must be within 0..=6, got {}.", self.day_of_week),
            ));
        }

        let start = parse_time(&self.start_time)?;
        let end = parse_time(&self.end_time)?;
        if start >= end {
            return Err(problems::bad_request(
                "Bad session.",
                format!("Session must end after it starts ({} - {}).", self.start_time, self.end_time),
            ));
        }
        Ok(())
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, Problem> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        problems::bad_request("Bad time.", "Times must be formatted as HH:MM.")
            .insert_str("value", value)
            .to_owned()
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub name: String,
    #[schema(value_type = String)]
    pub course_id: ObjectId,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub teacher_id: Option<ObjectId>,
    #[serde(default)]
    pub sessions: Vec<ClassSession>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub enrolled_students: Vec<ObjectId>,
    #[serde(default)]
    pub cancelled_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub session_cycle: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionInfo {
    pub week: i64,
    #[schema(value_type = String, example = "3/12")]
    pub label: SessionLabel,
}

impl Class {
    pub fn is_enrolled(&self, student_id: ObjectId) -> bool {
        self.enrolled_students.contains(&student_id)
    }

    pub fn is_cancelled(&self, date: NaiveDate) -> bool {
        self.cancelled_dates.contains(&date)
    }

    /// Whether one of the weekly sessions falls on the weekday of `date`.
    pub fn meets_on(&self, date: NaiveDate) -> bool {
        let day = date.weekday().num_days_from_sunday();
        self.sessions.iter().any(|it| it.day_of_week as u32 == day)
    }

    /// Week of `date` within the class and its label for a course of `total_sessions`.
    pub fn session_on(&self, date: NaiveDate, total_sessions: i64) -> SessionInfo {
        let week = self
            .start_date
            .map(|start| session::week_number(start, date))
            .unwrap_or(0);

        SessionInfo {
            week,
            label: session::session_label(week, self.session_cycle, total_sessions),
        }
    }
}
