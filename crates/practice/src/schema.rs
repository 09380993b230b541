use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Primary key attribute of the profile table.
pub const PROFILE_KEY: &str = "userSub";
/// Partition key attribute of the students table.
pub const STUDENT_PARTITION_KEY: &str = "teacherUserId";
/// Sort key attribute of the students table.
pub const STUDENT_SORT_KEY: &str = "studentId";
/// Creation stamp on both tables.
pub const CREATED_AT: &str = "createdAt";

/// Demographic fields a user can fill in about themselves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub age: Option<u32>,
    #[serde(default)]
    pub school: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_sub: String,
    #[serde(flatten)]
    pub details: ProfileDetails,
    /// Kept verbatim across re-saves; older writers used epoch millis.
    #[serde(default)]
    pub created_at: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub teacher_user_id: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(default, rename = "class", deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub roll_no: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Num(serde_json::Number),
    Text(String),
}

// Older writers stored numbers as strings and vice versa.
pub fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    use serde::de::Error;

    match Option::<NumOrText>::deserialize(d)? {
        None => Ok(None),
        Some(NumOrText::Num(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("not a valid age: {n}"))),
        Some(NumOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumOrText::Text(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
    }
}

pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<NumOrText>::deserialize(d)? {
        None => None,
        Some(NumOrText::Num(n)) => Some(n.to_string()),
        Some(NumOrText::Text(s)) => Some(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_age_number_or_text() {
        let p: UserProfile = serde_json::from_value(json!({"userSub": "u1", "age": 7})).unwrap();
        assert_eq!(p.details.age, Some(7));

        let p: UserProfile = serde_json::from_value(json!({"userSub": "u1", "age": "8"})).unwrap();
        assert_eq!(p.details.age, Some(8));

        let p: UserProfile = serde_json::from_value(json!({"userSub": "u1"})).unwrap();
        assert_eq!(p.details.age, None);
        assert_eq!(p.details.email, None);

        assert!(serde_json::from_value::<UserProfile>(json!({"userSub": "u1", "age": "seven"})).is_err());
    }

    #[test]
    fn test_profile_serializes_flat() {
        let p = UserProfile {
            user_sub: "u1".into(),
            details: ProfileDetails {
                full_name: Some("Asha Rao".into()),
                age: Some(6),
                ..Default::default()
            },
            created_at: None,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["userSub"], "u1");
        assert_eq!(v["fullName"], "Asha Rao");
        assert_eq!(v["age"], 6);
        assert!(v["school"].is_null());
        assert!(v.get("details").is_none());
    }

    #[test]
    fn test_student_wire_names() {
        let s = StudentRecord {
            teacher_user_id: "t1".into(),
            student_id: "s1".into(),
            student_name: "Asha".into(),
            class_name: Some("2".into()),
            section: None,
            roll_no: Some("14".into()),
            created_at: "2024-05-01T00:00:00.000Z".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["teacherUserId"], "t1");
        assert_eq!(v["class"], "2");
        assert_eq!(v["rollNo"], "14");
        assert!(v["section"].is_null());
    }

    #[test]
    fn test_student_numeric_roll_no() {
        let s: StudentRecord = serde_json::from_value(json!({
            "teacherUserId": "t1",
            "studentId": "s1",
            "studentName": "Ravi",
            "rollNo": 3,
            "createdAt": "x"
        }))
        .unwrap();
        assert_eq!(s.roll_no.as_deref(), Some("3"));
        assert_eq!(s.class_name, None);

        let s: StudentRecord = serde_json::from_value(json!({
            "teacherUserId": "t1",
            "studentId": "s2",
            "studentName": "Meena",
            "class": 4,
            "createdAt": "x"
        }))
        .unwrap();
        assert_eq!(s.class_name.as_deref(), Some("4"));
    }

    #[test]
    fn test_profile_created_at_kept_verbatim() {
        let p: UserProfile =
            serde_json::from_value(json!({"userSub": "u1", "createdAt": 1_700_000_000_000_i64})).unwrap();
        assert_eq!(p.created_at, Some(json!(1_700_000_000_000_i64)));
        assert_eq!(serde_json::to_value(&p).unwrap()["createdAt"], 1_700_000_000_000_i64);
    }
}
