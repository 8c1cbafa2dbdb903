//! Feature pipeline applied to raw rides before they reach the classifier.
//!
//! Three stateless stages run in a fixed order:
//! null filling ([`DataCleaner`]), indicator derivation ([`FlagVariableGenerator`])
//! and date decomposition ([`DateTimeExtractor`]). Every stage works on a whole
//! table, so a single ride and a batch go through the same code.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::PipelineError;
use crate::types::{DayType, FeatureRecord, FeatureTable, Meridiem, RawRideRecord};

/// Strict timestamp layout of the `Date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fill value for a missing payment method. Also the marker the flag stage tests against.
pub const NOT_APPLICABLE: &str = "Not Applicable";

// ---------- Stage 1: null normalization ----------

/// A ride with every nullable column filled.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRide {
    pub date: String,
    pub vehicle_type: String,
    pub pickup_location: String,
    pub drop_location: String,
    pub v_tat: f64,
    pub c_tat: f64,
    pub booking_value: i64,
    pub payment_method: String,
    pub ride_distance: i64,
    pub driver_ratings: f64,
    pub customer_rating: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    pub fn transform(&self, rows: &[RawRideRecord]) -> Vec<CleanRide> {
        rows.iter()
            .map(|r| CleanRide {
                date: r.date.clone(),
                vehicle_type: r.vehicle_type.clone(),
                pickup_location: r.pickup_location.clone(),
                drop_location: r.drop_location.clone(),
                v_tat: r.v_tat.unwrap_or(0.0),
                c_tat: r.c_tat.unwrap_or(0.0),
                booking_value: r.booking_value,
                payment_method: r
                    .payment_method
                    .clone()
                    .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                ride_distance: r.ride_distance,
                driver_ratings: r.driver_ratings.unwrap_or(0.0),
                customer_rating: r.customer_rating.unwrap_or(0.0),
            })
            .collect()
    }
}

// ---------- Stage 2: flag derivation ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub v_tat_ind: u8,
    pub c_tat_ind: u8,
    pub payment_method_ind: u8,
    pub driver_ratings_ind: u8,
    pub customer_rating_ind: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedRide {
    pub ride: CleanRide,
    pub flags: Flags,
}

/// Derives the 0/1 companions of the filled columns. Must see Stage 1 output:
/// a filled 0 has to produce indicator 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagVariableGenerator;

impl FlagVariableGenerator {
    pub fn transform(&self, rows: Vec<CleanRide>) -> Vec<FlaggedRide> {
        rows.into_iter()
            .map(|ride| {
                let flags = Flags {
                    v_tat_ind: indicator(ride.v_tat > 0.0),
                    c_tat_ind: indicator(ride.c_tat > 0.0),
                    payment_method_ind: indicator(ride.payment_method != NOT_APPLICABLE),
                    driver_ratings_ind: indicator(ride.driver_ratings > 0.0),
                    customer_rating_ind: indicator(ride.customer_rating > 0.0),
                };
                FlaggedRide { ride, flags }
            })
            .collect()
    }
}

fn indicator(cond: bool) -> u8 {
    u8::from(cond)
}

// ---------- Stage 3: temporal decomposition ----------

/// Splits `Date` into calendar columns and drops it. Parsing is strict and
/// fails the whole table on the first bad row.
#[derive(Debug, Clone)]
pub struct DateTimeExtractor {
    format: String,
}

impl Default for DateTimeExtractor {
    fn default() -> Self {
        Self::new(DATE_FORMAT)
    }
}

impl DateTimeExtractor {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn transform(&self, rows: Vec<FlaggedRide>) -> Result<Vec<FeatureRecord>, PipelineError> {
        rows.into_iter()
            .enumerate()
            .map(|(row, flagged)| self.extract(row, flagged))
            .collect()
    }

    fn extract(&self, row: usize, flagged: FlaggedRide) -> Result<FeatureRecord, PipelineError> {
        let FlaggedRide { ride, flags } = flagged;
        // Naive on purpose: the timestamp is local and never shifted.
        let dt = NaiveDateTime::parse_from_str(&ride.date, &self.format).map_err(|source| {
            PipelineError::Parse {
                row,
                value: ride.date.clone(),
                source,
            }
        })?;

        let weekday = dt.weekday().num_days_from_monday();
        let hour = dt.hour();

        Ok(FeatureRecord {
            vehicle_type: ride.vehicle_type,
            pickup_location: ride.pickup_location,
            drop_location: ride.drop_location,
            v_tat: ride.v_tat,
            c_tat: ride.c_tat,
            booking_value: ride.booking_value,
            payment_method: ride.payment_method,
            ride_distance: ride.ride_distance,
            driver_ratings: ride.driver_ratings,
            customer_rating: ride.customer_rating,
            v_tat_ind: flags.v_tat_ind,
            c_tat_ind: flags.c_tat_ind,
            payment_method_ind: flags.payment_method_ind,
            driver_ratings_ind: flags.driver_ratings_ind,
            customer_rating_ind: flags.customer_rating_ind,
            month: dt.month(),
            weekday,
            date: dt.day(),
            booking_hour: hour,
            meridiem: Meridiem::from_hour(hour),
            day_type: DayType::from_weekday(weekday),
        })
    }
}

// ---------- Pipeline ----------

/// The ordered stage chain. Holds configuration only, never per-call state,
/// so one instance can be shared across concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    cleaner: DataCleaner,
    flags: FlagVariableGenerator,
    datetime: DateTimeExtractor,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datetime(datetime: DateTimeExtractor) -> Self {
        Self {
            datetime,
            ..Self::default()
        }
    }

    pub fn transform(&self, records: &[RawRideRecord]) -> Result<FeatureTable, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::Empty);
        }
        let cleaned = self.cleaner.transform(records);
        let flagged = self.flags.transform(cleaned);
        let rows = self.datetime.transform(flagged)?;
        Ok(FeatureTable::new(rows))
    }
}

/// Runs the default pipeline over `records`.
pub fn transform(records: &[RawRideRecord]) -> Result<FeatureTable, PipelineError> {
    FeaturePipeline::new().transform(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str) -> RawRideRecord {
        RawRideRecord {
            date: date.to_string(),
            vehicle_type: "Mini".to_string(),
            pickup_location: "Koramangala".to_string(),
            drop_location: "Indiranagar".to_string(),
            v_tat: None,
            c_tat: None,
            booking_value: 250,
            payment_method: None,
            ride_distance: 12,
            driver_ratings: None,
            customer_rating: None,
        }
    }

    #[test]
    fn cleaner_fills_nulls_and_keeps_values() {
        let mut r = raw("2024-08-25 14:30:00");
        r.c_tat = Some(12.0);
        r.customer_rating = Some(4.0);

        let out = DataCleaner.transform(&[r]);
        assert_eq!(out[0].v_tat, 0.0);
        assert_eq!(out[0].c_tat, 12.0);
        assert_eq!(out[0].driver_ratings, 0.0);
        assert_eq!(out[0].customer_rating, 4.0);
        assert_eq!(out[0].payment_method, NOT_APPLICABLE);
    }

    #[test]
    fn cleaner_passes_negative_tat_through() {
        let mut r = raw("2024-08-25 14:30:00");
        r.v_tat = Some(-3.0);
        let out = DataCleaner.transform(&[r]);
        assert_eq!(out[0].v_tat, -3.0);
    }

    #[test]
    fn flags_follow_filled_values() {
        let mut r = raw("2024-08-25 14:30:00");
        r.v_tat = Some(-3.0);
        r.driver_ratings = Some(4.5);
        r.payment_method = Some("UPI".to_string());

        let flagged = FlagVariableGenerator.transform(DataCleaner.transform(&[r]));
        let f = flagged[0].flags;
        assert_eq!(f.v_tat_ind, 0, "negative TAT is not positive");
        assert_eq!(f.c_tat_ind, 0);
        assert_eq!(f.payment_method_ind, 1);
        assert_eq!(f.driver_ratings_ind, 1);
        assert_eq!(f.customer_rating_ind, 0);
    }

    #[test]
    fn explicit_not_applicable_payment_is_flagged_zero() {
        let mut r = raw("2024-08-25 14:30:00");
        r.payment_method = Some(NOT_APPLICABLE.to_string());
        let flagged = FlagVariableGenerator.transform(DataCleaner.transform(&[r]));
        assert_eq!(flagged[0].flags.payment_method_ind, 0);
    }

    #[test]
    fn extractor_reports_failing_row() {
        let rows = vec![raw("2024-08-25 14:30:00"), raw("2024-13-01 00:00:00")];
        let flagged = FlagVariableGenerator.transform(DataCleaner.transform(&rows));
        match DateTimeExtractor::default().transform(flagged) {
            Err(PipelineError::Parse { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "2024-13-01 00:00:00");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn extractor_rejects_date_without_time() {
        let flagged = FlagVariableGenerator.transform(DataCleaner.transform(&[raw("2024-08-25")]));
        assert!(DateTimeExtractor::default().transform(flagged).is_err());
    }

    #[test]
    fn custom_format_is_honoured() {
        let pipeline = FeaturePipeline::with_datetime(DateTimeExtractor::new("%d/%m/%Y %H:%M"));
        let table = pipeline.transform(&[raw("01/03/2024 09:05")]).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.month, 3);
        assert_eq!(row.date, 1);
        assert_eq!(row.booking_hour, 9);
        assert_eq!(row.weekday, 4); // Friday
        assert_eq!(row.meridiem, Meridiem::Am);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(transform(&[]), Err(PipelineError::Empty)));
    }
}
