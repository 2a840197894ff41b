use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A table reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: i64,
    pub name: String,
    pub number_of_guest: i32,
    pub booking_date: NaiveDate,
}

/// Request body for creating or fully replacing a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub name: String,
    pub number_of_guest: i32,
    pub booking_date: NaiveDate,
}

impl Booking {
    pub fn from_payload(id: i64, payload: BookingPayload) -> Self {
        Self {
            id,
            name: payload.name,
            number_of_guest: payload.number_of_guest,
            booking_date: payload.booking_date,
        }
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_booking_wire_format() {
        let booking = Booking::from_payload(
            7,
            BookingPayload {
                name: "John Doe".to_string(),
                number_of_guest: 5,
                booking_date: NaiveDate::from_ymd_opt(2023, 5, 10).unwrap(),
            },
        );

        assert_eq!(booking.to_string(), "John Doe");
        assert_eq!(
            serde_json::to_value(&booking).unwrap(),
            json!({
                "id": 7,
                "name": "John Doe",
                "number_of_guest": 5,
                "booking_date": "2023-05-10",
            })
        );
    }

    #[test]
    fn test_payload_rejects_malformed_date() {
        let result: Result<BookingPayload, _> = serde_json::from_value(json!({
            "name": "New booking",
            "number_of_guest": 4,
            "booking_date": "15/06/2022",
        }));
        assert!(result.is_err());

        let payload: BookingPayload = serde_json::from_value(json!({
            "name": "New booking",
            "number_of_guest": 4,
            "booking_date": "2022-06-15",
        }))
        .unwrap();
        assert_eq!(
            payload.booking_date,
            NaiveDate::from_ymd_opt(2022, 6, 15).unwrap()
        );
    }
}
