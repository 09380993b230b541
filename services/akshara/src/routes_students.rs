use axum::{extract::{Query, State}, Json};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use cloudstore::{to_item, Item};
use practice::{lenient_string, StudentRecord};

use crate::error::{ApiError, ApiResult};
use crate::required;
use crate::state::SharedState;

const CREATE_FAILED: &str = "Failed to create student";
const LIST_FAILED: &str = "Failed to fetch students";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub teacher_user_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default, rename = "class", deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub roll_no: Option<String>,
}

#[derive(Serialize)]
pub struct StudentResponse {
    pub success: bool,
    pub student: StudentRecord,
}

pub async fn create_student(
    State(state): State<SharedState>,
    body: Bytes,
) -> ApiResult<Json<StudentResponse>> {
    let req: CreateStudentRequest =
        serde_json::from_slice(&body).map_err(ApiError::upstream(CREATE_FAILED))?;

    let (Some(teacher_user_id), Some(student_name)) =
        (required(req.teacher_user_id), required(req.student_name))
    else {
        return Err(ApiError::BadRequest(
            "teacherUserId and studentName are required".into(),
        ));
    };

    let student = StudentRecord {
        teacher_user_id,
        student_id: Uuid::new_v4().to_string(),
        student_name,
        class_name: required(req.class_name),
        section: required(req.section),
        roll_no: required(req.roll_no),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let item = to_item(&student).map_err(ApiError::upstream(CREATE_FAILED))?;
    state
        .kv
        .put_item(&state.students, item)
        .await
        .map_err(ApiError::upstream(CREATE_FAILED))?;

    info!(
        teacher = %student.teacher_user_id,
        student_id = %student.student_id,
        "students: created"
    );
    Ok(Json(StudentResponse { success: true, student }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStudentsQuery {
    pub teacher_user_id: Option<String>,
}

#[derive(Serialize)]
pub struct StudentsResponse {
    pub success: bool,
    pub students: Vec<Item>,
}

/// Rows come back as stored; one odd row from another writer must not
/// hide the rest of the class.
pub async fn list_students(
    State(state): State<SharedState>,
    Query(q): Query<ListStudentsQuery>,
) -> ApiResult<Json<StudentsResponse>> {
    let teacher_user_id = required(q.teacher_user_id)
        .ok_or_else(|| ApiError::BadRequest("teacherUserId is required".into()))?;

    let students = state
        .kv
        .query(&state.students, &teacher_user_id)
        .await
        .map_err(ApiError::upstream(LIST_FAILED))?;

    Ok(Json(StudentsResponse { success: true, students }))
}
