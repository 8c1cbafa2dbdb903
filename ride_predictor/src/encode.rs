//! Feature-table rows to the ordered numeric vectors the classifier expects.

use std::collections::HashMap;

use crate::types::FeatureRecord;

/// Flattens a row into named numeric values. Categorical columns become
/// one-hot keys of the form `<column>_<value>`.
pub fn flatten(row: &FeatureRecord) -> HashMap<String, f32> {
    let mut map = HashMap::with_capacity(24);

    let numeric: [(&str, f64); 15] = [
        ("V_TAT", row.v_tat),
        ("C_TAT", row.c_tat),
        ("Booking_Value", row.booking_value as f64),
        ("Ride_Distance", row.ride_distance as f64),
        ("Driver_Ratings", row.driver_ratings),
        ("Customer_Rating", row.customer_rating),
        ("V_TAT_IND", f64::from(row.v_tat_ind)),
        ("C_TAT_IND", f64::from(row.c_tat_ind)),
        ("Payment_Method_Ind", f64::from(row.payment_method_ind)),
        ("Driver_Ratings_Ind", f64::from(row.driver_ratings_ind)),
        ("Customer_Rating_Ind", f64::from(row.customer_rating_ind)),
        ("Month", f64::from(row.month)),
        ("weekday", f64::from(row.weekday)),
        ("date", f64::from(row.date)),
        ("booking_hour", f64::from(row.booking_hour)),
    ];
    for (name, value) in numeric {
        map.insert(name.to_string(), value as f32);
    }

    let categorical: [(&str, &str); 6] = [
        ("Vehicle_Type", row.vehicle_type.as_str()),
        ("Pickup_Location", row.pickup_location.as_str()),
        ("Drop_Location", row.drop_location.as_str()),
        ("Payment_Method", row.payment_method.as_str()),
        ("meridiem", row.meridiem.as_str()),
        ("day_type", row.day_type.as_str()),
    ];
    for (column, value) in categorical {
        map.insert(format!("{}_{}", column, value), 1.0);
    }

    map
}

/// Orders a flat map by `feat_list`. Names the row does not carry encode as 0.
pub fn order_from_flat(map: &HashMap<String, f32>, feat_list: &[String]) -> Vec<f32> {
    let mut v = Vec::with_capacity(feat_list.len());
    for k in feat_list {
        v.push(*map.get(k).unwrap_or(&0.0));
    }
    v
}

pub fn encode_row(row: &FeatureRecord, feat_list: &[String]) -> Vec<f32> {
    order_from_flat(&flatten(row), feat_list)
}
