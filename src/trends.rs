//! Indicator history reconstruction for chart views.
//!
//! Pure functions over already-loaded models. A disease-tracked series wins
//! over values scattered across record snapshots; otherwise the record key
//! indicators with a numeric value form the series.

use chrono::{Months, NaiveDate};

use crate::models::{ChronicDisease, MedicalRecord, TimeRange, TrendPoint};

/// Hospital label carried by points that come from disease tracking.
pub const DISEASE_TRACKING_LABEL: &str = "Chronic care";

/// Indicator names a disease view can chart: the disease's own indicators
/// first, then record key indicators, each name once in first-seen order.
pub fn available_indicator_names(disease: &ChronicDisease, records: &[MedicalRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let candidates = disease
        .indicators
        .iter()
        .map(|i| i.name.as_str())
        .chain(
            records
                .iter()
                .flat_map(|r| r.key_indicators.iter().map(|k| k.name.as_str())),
        );
    for name in candidates {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Series for `name` in a disease view, oldest first.
pub fn disease_indicator_series(
    disease: &ChronicDisease,
    records: &[MedicalRecord],
    name: &str,
) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = match disease.indicator(name) {
        Some(indicator) => indicator
            .values
            .iter()
            .map(|v| TrendPoint {
                date: v.date,
                value: v.value,
                source: format!("{} - {}", disease.name, name),
                hospital: DISEASE_TRACKING_LABEL.to_string(),
                is_abnormal: v.is_abnormal,
            })
            .collect(),
        None => record_points(records, name),
    };
    points.sort_by_key(|p| p.date);
    points
}

/// Numeric history of a record key indicator within `range` of `today`,
/// oldest first.
pub fn record_indicator_trend(
    records: &[MedicalRecord],
    name: &str,
    range: TimeRange,
    today: NaiveDate,
) -> Vec<TrendPoint> {
    let mut points = record_points(records, name);
    points.sort_by_key(|p| p.date);

    match cutoff(range, today) {
        Some(start) => points.into_iter().filter(|p| p.date >= start).collect(),
        None => points,
    }
}

/// First day still inside `range`. Month ends clamp (Mar 31 minus one
/// month is Feb 28/29).
pub fn cutoff(range: TimeRange, today: NaiveDate) -> Option<NaiveDate> {
    let months = range.months()?;
    today.checked_sub_months(Months::new(months))
}

fn record_points(records: &[MedicalRecord], name: &str) -> Vec<TrendPoint> {
    records
        .iter()
        .flat_map(|record| {
            record
                .key_indicators
                .iter()
                .filter(move |k| k.name == name)
                .filter_map(move |k| {
                    Some(TrendPoint {
                        date: record.date,
                        value: k.numeric_value()?,
                        source: record.title.clone(),
                        hospital: record.hospital.clone(),
                        is_abnormal: k.is_abnormal,
                    })
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_with(title: &str, day: NaiveDate, indicators: &[(&str, &str)]) -> MedicalRecord {
        MedicalRecord {
            id: new_id(),
            user_id: "u1".into(),
            title: title.into(),
            hospital: "City Hospital".into(),
            record_type: RecordType::Blood,
            date: day,
            image_uri: None,
            description: None,
            key_indicators: indicators
                .iter()
                .map(|(name, value)| KeyIndicator {
                    name: (*name).into(),
                    value: (*value).into(),
                    unit: "mmol/L".into(),
                    normal_range: None,
                    is_abnormal: false,
                })
                .collect(),
            is_abnormal: false,
            created_at: None,
            disease_id: Some("d1".into()),
        }
    }

    fn diabetes(values: Vec<IndicatorValue>) -> ChronicDisease {
        ChronicDisease {
            id: "d1".into(),
            user_id: "u1".into(),
            name: "Diabetes".into(),
            disease_type: DiseaseType::Diabetes,
            indicators: vec![DiseaseIndicator {
                name: "HbA1c".into(),
                unit: "%".into(),
                normal_range: "4-6".into(),
                values,
            }],
            reminders: Vec::new(),
        }
    }

    #[test]
    fn names_put_disease_indicators_first_without_duplicates() {
        let disease = diabetes(Vec::new());
        let records = vec![
            record_with("Lab 1", date(2024, 1, 1), &[("Glucose", "7.1"), ("HbA1c", "6.8")]),
            record_with("Lab 2", date(2024, 2, 1), &[("Glucose", "6.9"), ("LDL", "3.0")]),
        ];
        assert_eq!(
            available_indicator_names(&disease, &records),
            vec!["HbA1c", "Glucose", "LDL"]
        );
    }

    #[test]
    fn disease_values_take_precedence() {
        let disease = diabetes(vec![
            IndicatorValue { date: date(2024, 3, 1), value: 6.9, is_abnormal: true },
            IndicatorValue { date: date(2024, 1, 1), value: 7.4, is_abnormal: true },
        ]);
        let records = vec![record_with("Lab", date(2024, 2, 1), &[("HbA1c", "7.0")])];

        let series = disease_indicator_series(&disease, &records, "HbA1c");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(2024, 1, 1));
        assert_eq!(series[0].source, "Diabetes - HbA1c");
        assert_eq!(series[0].hospital, DISEASE_TRACKING_LABEL);
    }

    #[test]
    fn falls_back_to_record_indicators() {
        let disease = diabetes(Vec::new());
        let records = vec![
            record_with("Later", date(2024, 5, 1), &[("Glucose", "6.4")]),
            record_with("Earlier", date(2024, 2, 1), &[("Glucose", "7.2")]),
            record_with("Unreadable", date(2024, 3, 1), &[("Glucose", "pending")]),
        ];

        let series = disease_indicator_series(&disease, &records, "Glucose");
        let summary: Vec<_> = series.iter().map(|p| (p.source.as_str(), p.value)).collect();
        assert_eq!(summary, vec![("Earlier", 7.2), ("Later", 6.4)]);
        assert_eq!(series[0].hospital, "City Hospital");
    }

    #[test]
    fn time_range_filters_relative_to_today() {
        let today = date(2024, 6, 15);
        let records = vec![
            record_with("a", date(2023, 6, 14), &[("WBC", "6.0")]),
            record_with("b", date(2024, 1, 10), &[("WBC", "6.5")]),
            record_with("c", date(2024, 5, 20), &[("WBC", "7.0")]),
            record_with("d", date(2024, 6, 1), &[("WBC", "7.5")]),
        ];

        let count = |range| record_indicator_trend(&records, "WBC", range, today).len();
        assert_eq!(count(TimeRange::OneMonth), 2);
        assert_eq!(count(TimeRange::ThreeMonths), 2);
        assert_eq!(count(TimeRange::SixMonths), 3);
        assert_eq!(count(TimeRange::OneYear), 3);
        assert_eq!(count(TimeRange::All), 4);
    }

    #[test]
    fn trend_is_sorted_ascending() {
        let records = vec![
            record_with("new", date(2024, 6, 1), &[("WBC", "7.5")]),
            record_with("old", date(2024, 1, 1), &[("WBC", "6.5")]),
        ];
        let series = record_indicator_trend(&records, "WBC", TimeRange::All, date(2024, 6, 15));
        assert!(series.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn cutoff_clamps_month_end() {
        assert_eq!(
            cutoff(TimeRange::OneMonth, date(2024, 3, 31)),
            Some(date(2024, 2, 29))
        );
        assert_eq!(cutoff(TimeRange::OneYear, date(2024, 6, 15)), Some(date(2023, 6, 15)));
        assert_eq!(cutoff(TimeRange::All, date(2024, 6, 15)), None);
    }
}
