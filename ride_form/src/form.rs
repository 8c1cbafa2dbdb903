use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SELECT_VEHICLE: &str = "Select Vehicle";
pub const SELECT_PAYMENT: &str = "Select Payment";

pub const VEHICLE_TYPES: [&str; 8] = [
    SELECT_VEHICLE,
    "Prime Sedan",
    "Bike",
    "Prime SUV",
    "eBike",
    "Mini",
    "Prime Plus",
    "Auto",
];

pub const PAYMENT_METHODS: [&str; 6] = [
    SELECT_PAYMENT,
    "Cash",
    "UPI",
    "Credit Card",
    "Debit Card",
    "Not Applicable",
];

/// Upper bound of both turnaround inputs, in seconds.
pub const MAX_TAT_SECS: f64 = 300.0;
pub const MAX_RATING: f64 = 5.0;

const API_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Submitted form fields, kept as text so bad input can be reported per field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RideForm {
    pub vehicle_type: String,
    pub payment_method: String,
    pub pickup_location: String,
    pub drop_location: String,
    pub v_tat: String,
    pub c_tat: String,
    pub booking_value: String,
    pub ride_distance: String,
    pub driver_rating: String,
    pub customer_rating: String,
    pub ride_date: String,
    pub ride_time: String,
}

impl RideForm {
    /// Blank form stamped with the given date and time.
    pub fn blank(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            vehicle_type: SELECT_VEHICLE.to_string(),
            payment_method: SELECT_PAYMENT.to_string(),
            pickup_location: String::new(),
            drop_location: String::new(),
            v_tat: "0.0".to_string(),
            c_tat: "0.0".to_string(),
            booking_value: "0".to_string(),
            ride_distance: "0".to_string(),
            driver_rating: "0.0".to_string(),
            customer_rating: "0.0".to_string(),
            ride_date: date.format("%Y-%m-%d").to_string(),
            ride_time: time.format("%H:%M").to_string(),
        }
    }

    /// Checks the form and builds the API payload. Reports only the first problem found.
    pub fn validate(&self) -> Result<RidePayload, ValidationError> {
        if self.pickup_location.trim().is_empty() {
            return Err(ValidationError::PickupRequired);
        }
        if self.drop_location.trim().is_empty() {
            return Err(ValidationError::DropRequired);
        }
        if self.vehicle_type == SELECT_VEHICLE || !VEHICLE_TYPES.contains(&self.vehicle_type.as_str()) {
            return Err(ValidationError::VehicleRequired);
        }
        if self.payment_method == SELECT_PAYMENT
            || !PAYMENT_METHODS.contains(&self.payment_method.as_str())
        {
            return Err(ValidationError::PaymentRequired);
        }

        let v_tat = real_in("Vehicle TAT", &self.v_tat, 0.0, MAX_TAT_SECS)?;
        let c_tat = real_in("Customer TAT", &self.c_tat, 0.0, MAX_TAT_SECS)?;
        let booking_value = non_negative("Booking Value", &self.booking_value)?;
        let ride_distance = non_negative("Ride Distance", &self.ride_distance)?;
        let driver_ratings = real_in("Driver Rating", &self.driver_rating, 0.0, MAX_RATING)?;
        let customer_rating = real_in("Customer Rating", &self.customer_rating, 0.0, MAX_RATING)?;

        let date = NaiveDate::parse_from_str(self.ride_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::BadDate(self.ride_date.clone()))?;
        let time = parse_time(self.ride_time.trim())
            .ok_or_else(|| ValidationError::BadTime(self.ride_time.clone()))?;

        Ok(RidePayload {
            date: date.and_time(time).format(API_DATE_FORMAT).to_string(),
            vehicle_type: self.vehicle_type.clone(),
            pickup_location: self.pickup_location.clone(),
            drop_location: self.drop_location.clone(),
            v_tat,
            c_tat,
            booking_value,
            payment_method: self.payment_method.clone(),
            ride_distance,
            driver_ratings,
            customer_rating,
        })
    }
}

// Browsers send HH:MM, or HH:MM:SS when the input has a seconds step.
fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn real_in(field: &'static str, raw: &str, min: f64, max: f64) -> Result<f64, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v >= min && v <= max => Ok(v),
        _ => Err(ValidationError::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
        }),
    }
}

fn non_negative(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(ValidationError::Negative { field }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Pickup Location is required")]
    PickupRequired,
    #[error("Drop Location is required")]
    DropRequired,
    #[error("Select One Vehicle")]
    VehicleRequired,
    #[error("Select Payment Method")]
    PaymentRequired,
    #[error("{field} must be a number between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
    },
    #[error("{field} must be a whole number of at least 0")]
    Negative { field: &'static str },
    #[error("Ride Date {0:?} is not a valid date")]
    BadDate(String),
    #[error("Ride Time {0:?} is not a valid time")]
    BadTime(String),
}

/// Request body for the prediction API's `/predict` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RidePayload {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    #[serde(rename = "Pickup_Location")]
    pub pickup_location: String,
    #[serde(rename = "Drop_Location")]
    pub drop_location: String,
    #[serde(rename = "V_TAT")]
    pub v_tat: f64,
    #[serde(rename = "C_TAT")]
    pub c_tat: f64,
    #[serde(rename = "Booking_Value")]
    pub booking_value: i64,
    #[serde(rename = "Payment_Method")]
    pub payment_method: String,
    #[serde(rename = "Ride_Distance")]
    pub ride_distance: i64,
    #[serde(rename = "Driver_Ratings")]
    pub driver_ratings: f64,
    #[serde(rename = "Customer_Rating")]
    pub customer_rating: f64,
}
