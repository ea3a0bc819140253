//! Reservation Model

use super::{DiningTable, UserResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Reservation of one table at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub table_id: i64,
    pub reservation_datetime: DateTime<Utc>,
    pub number_of_people: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation with its owner and table loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub user: UserResponse,
    pub table: DiningTable,
}

/// Create reservation payload
///
/// `user_id` is only honoured for admins booking on behalf of someone else.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservationCreate {
    pub table_id: i64,
    pub reservation_datetime: DateTime<Utc>,
    #[validate(range(min = 1, message = "number_of_people must be positive"))]
    pub number_of_people: i32,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Update reservation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReservationUpdate {
    #[serde(default)]
    pub table_id: Option<i64>,
    #[serde(default)]
    pub reservation_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(range(min = 1, message = "number_of_people must be positive"))]
    pub number_of_people: Option<i32>,
}

impl ReservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.table_id.is_none()
            && self.reservation_datetime.is_none()
            && self.number_of_people.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TableStatus};
    use chrono::TimeZone;

    #[test]
    fn test_create_parses_rfc3339() {
        let payload: ReservationCreate = serde_json::from_str(
            r#"{"table_id":1,"reservation_datetime":"2024-06-01T19:00:00Z","number_of_people":2}"#,
        )
        .unwrap();
        assert_eq!(
            payload.reservation_datetime,
            Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap()
        );
        assert!(payload.user_id.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_create_rejects_empty_party() {
        let payload = ReservationCreate {
            table_id: 1,
            reservation_datetime: Utc::now(),
            number_of_people: 0,
            user_id: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_detail_flattens_reservation() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();
        let detail = ReservationDetail {
            reservation: Reservation {
                id: 9,
                user_id: 2,
                table_id: 3,
                reservation_datetime: at,
                number_of_people: 2,
                created_at: at,
                updated_at: at,
            },
            user: UserResponse {
                id: 2,
                name: "alice".into(),
                email: "alice@example.com".into(),
                role: Role::Customer,
                created_at: at,
                updated_at: at,
            },
            table: DiningTable {
                id: 3,
                name: "T1".into(),
                capacity: 4,
                status: TableStatus::Reserved,
                created_at: at,
                updated_at: at,
            },
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["table_id"], 3);
        assert_eq!(json["table"]["status"], "reserved");
        assert_eq!(json["user"]["email"], "alice@example.com");
    }

    #[test]
    fn test_update_is_empty() {
        assert!(ReservationUpdate::default().is_empty());
        let update: ReservationUpdate = serde_json::from_str(r#"{"number_of_people":3}"#).unwrap();
        assert!(!update.is_empty());
    }
}
