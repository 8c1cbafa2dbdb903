use serde::{Deserialize, Serialize};

/// One ride as submitted by a client. Field names match the training data columns.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawRideRecord {
    #[serde(rename = "Date")]
    pub date: String, // "2024-08-25 14:30:00"
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    #[serde(rename = "Pickup_Location")]
    pub pickup_location: String,
    #[serde(rename = "Drop_Location")]
    pub drop_location: String,
    #[serde(rename = "V_TAT", default)]
    pub v_tat: Option<f64>, // vehicle turnaround (s)
    #[serde(rename = "C_TAT", default)]
    pub c_tat: Option<f64>, // customer turnaround (s)
    #[serde(rename = "Booking_Value")]
    pub booking_value: i64,
    #[serde(rename = "Payment_Method", default)]
    pub payment_method: Option<String>,
    #[serde(rename = "Ride_Distance")]
    pub ride_distance: i64,
    #[serde(rename = "Driver_Ratings", default)]
    pub driver_ratings: Option<f64>,
    #[serde(rename = "Customer_Rating", default)]
    pub customer_rating: Option<f64>,
}

/// Model-ready row. `Date` is gone; its parts live in the temporal columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
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

    #[serde(rename = "V_TAT_IND")]
    pub v_tat_ind: u8,
    #[serde(rename = "C_TAT_IND")]
    pub c_tat_ind: u8,
    #[serde(rename = "Payment_Method_Ind")]
    pub payment_method_ind: u8,
    #[serde(rename = "Driver_Ratings_Ind")]
    pub driver_ratings_ind: u8,
    #[serde(rename = "Customer_Rating_Ind")]
    pub customer_rating_ind: u8,

    #[serde(rename = "Month")]
    pub month: u32,
    pub weekday: u32, // Monday=0 .. Sunday=6
    pub date: u32,    // day of month
    pub booking_hour: u32,
    pub meridiem: Meridiem,
    pub day_type: DayType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Meridiem {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl Meridiem {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Meridiem::Am
        } else {
            Meridiem::Pm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// `weekday` uses Monday=0, so 5 and 6 are Saturday and Sunday.
    pub fn from_weekday(weekday: u32) -> Self {
        if weekday == 5 || weekday == 6 {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
        }
    }
}

/// Row-aligned output of the feature pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureTable {
    rows: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureRecord> {
        self.rows.iter()
    }
}

// ---------- Response bodies ----------

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictionOut {
    pub prediction: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchPredictionOut {
    pub predictions: Vec<String>,
}
