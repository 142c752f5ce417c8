//! Integration tests for Cafe Insights

use cafe_insights::report::{
    CUSTOMER_METRICS_FILE, DECOMPOSITION_FILE, OVERALL_METRICS_FILE, SALES_FORECAST_FILE,
};
use cafe_insights::{
    load_transactions, run_analysis, write_report, AnalysisConfig, AnalysisError, Metric,
    SchemaError, Segment,
};
use chrono::{Duration, NaiveDate};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str = "Date Time,Transaction ID,Total Price,Quantity,Category,Location";

/// Create a test CSV file with `days` days of sales starting 2024-01-01.
///
/// Customer L visits every other day until the end, R every fifth day
/// during the first two weeks, and O once on day 0.
fn create_test_csv(days: i64) -> NamedTempFile {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for offset in 0..days {
        let date = start + Duration::days(offset);
        let weekday_bump = (offset % 7) as f64 * 1.5;
        writeln!(
            file,
            "{} 08:10:00,W{},{:.2},2,Coffee,Downtown",
            date,
            offset,
            30.0 + weekday_bump
        )
        .unwrap();
        writeln!(file, "{} 12:45:00,W{},9.50,1,Sandwich,Airport", date, offset).unwrap();

        if offset % 2 == 0 {
            writeln!(file, "{} 17:30:00,L,6.25,1,Pastry,Downtown", date).unwrap();
        }
        if offset % 5 == 0 && offset < 14 {
            writeln!(file, "{} 09:00:00,R,4.00,1,Coffee,Airport", date).unwrap();
        }
    }
    writeln!(file, "{} 20:00:00,O,3.00,1,Tea,Airport", start).unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv(28);
    let transactions = load_transactions(test_file.path()).unwrap();
    let report = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.history.len(), 28);
    assert_eq!(report.overall.order_count, transactions.len());
    assert_eq!(report.overall.customer_count, report.customers.len());

    let forecast = report.forecast().unwrap();
    assert_eq!(forecast.points.len(), 30);
    assert_eq!(
        forecast.points[0].date,
        NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()
    );
    assert!(forecast.metrics.rmse >= 0.0);
    assert!(forecast.metrics.mae >= 0.0);

    let decomposition = report.decomposition().unwrap();
    for (i, rebuilt) in decomposition.reconstruct().iter().enumerate() {
        assert!((rebuilt - decomposition.observed[i]).abs() < 1e-9);
    }
}

#[test]
fn test_segments_from_csv() {
    let test_file = create_test_csv(28);
    let transactions = load_transactions(test_file.path()).unwrap();
    let report = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();

    let profile = |id: &str| {
        report
            .customers
            .iter()
            .find(|c| c.transaction_id == id)
            .unwrap()
    };

    // Day 0 to day 26 every other day: 14 visits over 26 days.
    let loyal = profile("L");
    assert_eq!(loyal.visit_count, 14);
    assert_eq!(loyal.customer_age_days, 26);
    assert_eq!(loyal.segment, Segment::Loyal);

    // Days 0, 5, 10: 3 visits over 10 days, last seen 17 days before the end.
    let regular = profile("R");
    assert_eq!(regular.purchase_frequency, Metric::Defined(0.3));
    assert_eq!(regular.segment, Segment::Regular);

    let once = profile("O");
    assert_eq!(once.purchase_frequency, Metric::Undefined);
    assert_eq!(once.segment, Segment::Recent);

    let counted: usize = report.segment_counts.iter().map(|&(_, n)| n).sum();
    assert_eq!(counted, report.customers.len());
}

#[test]
fn test_short_history_reports_insufficient_data() {
    let test_file = create_test_csv(10);
    let transactions = load_transactions(test_file.path()).unwrap();
    let report = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();

    assert!(!report.is_complete());
    assert!(matches!(
        report.forecast,
        Err(AnalysisError::InsufficientData {
            required: 14,
            actual: 10,
            ..
        })
    ));
    assert!(report.decomposition.is_err());
    assert!(!report.customers.is_empty());
    assert_eq!(report.overall.forecast_confidence_pct, None);
}

#[test]
fn test_missing_column_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date Time,Transaction ID,Total Price,Quantity,Location").unwrap();
    writeln!(file, "2024-01-01 08:00:00,T1,4.50,1,Downtown").unwrap();

    let err = load_transactions(file.path()).unwrap_err();
    match err.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::Schema(SchemaError::MissingColumn(column))) => {
            assert_eq!(column, "Category")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_unparseable_timestamp_aborts_analysis() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "2024-01-01 08:00:00,T1,4.50,1,Coffee,Downtown").unwrap();
    writeln!(file, "sometime,T2,3.00,1,Tea,Downtown").unwrap();

    let transactions = load_transactions(file.path()).unwrap();
    let err = run_analysis(&transactions, &AnalysisConfig::default()).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::Schema(SchemaError::Unparseable {
            row: 1,
            column: "Date Time".to_string(),
            value: "sometime".to_string(),
        })
    );
}

#[test]
fn test_zero_padded_ids_are_separate_customers() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "2024-01-01 08:00:00,007,4.50,1,Coffee,Downtown").unwrap();
    writeln!(file, "2024-01-02 08:00:00,7,3.00,1,Tea,Downtown").unwrap();
    writeln!(file, "2024-01-05 08:00:00,007,5.50,1,Coffee,Downtown").unwrap();

    let transactions = load_transactions(file.path()).unwrap();
    let report = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();

    let ids: Vec<&str> = report
        .customers
        .iter()
        .map(|c| c.transaction_id.as_str())
        .collect();
    assert_eq!(ids, vec!["007", "7"]);
    assert_eq!(report.customers[0].visit_count, 2);
    assert_eq!(report.customers[0].total_spent, 10.0);
    assert_eq!(report.overall.customer_count, 2);
}

#[test]
fn test_non_numeric_price_is_unparseable() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "2024-01-01 08:00:00,T1,$4.50,1,Coffee,Downtown").unwrap();

    let err = load_transactions(file.path()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AnalysisError>(),
        Some(&AnalysisError::Schema(SchemaError::Unparseable {
            row: 0,
            column: "Total Price".to_string(),
            value: "$4.50".to_string(),
        }))
    );
}

#[test]
fn test_calendar_gaps_are_filled() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    // No sales on every fourth day.
    for offset in (0..21).filter(|d| d % 4 != 3) {
        let date = start + Duration::days(offset);
        writeln!(file, "{} 10:00:00,T{},12.00,1,Coffee,Downtown", date, offset).unwrap();
    }

    let transactions = load_transactions(file.path()).unwrap();
    let dense = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();
    assert_eq!(dense.history.len(), 21);
    assert!(dense.is_complete());

    let mut config = AnalysisConfig::default();
    config.forecast.fill_missing_dates = false;
    let sparse = run_analysis(&transactions, &config).unwrap();
    assert_eq!(sparse.history.len(), 16);
}

#[test]
fn test_report_files_written() {
    let test_file = create_test_csv(21);
    let transactions = load_transactions(test_file.path()).unwrap();
    let report = run_analysis(&transactions, &AnalysisConfig::default()).unwrap();

    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("reports");
    let written = write_report(&report, &output_dir).unwrap();

    for name in [
        OVERALL_METRICS_FILE,
        CUSTOMER_METRICS_FILE,
        SALES_FORECAST_FILE,
        DECOMPOSITION_FILE,
        "sales_by_hour.csv",
        "sales_by_time_block.csv",
        "sales_by_seasonality.csv",
        "sales_by_month.csv",
        "sales_by_category.csv",
        "sales_by_location.csv",
    ] {
        let path = output_dir.join(name);
        assert!(path.exists(), "{} missing", name);
        assert!(written.contains(&path));
    }

    let forecast_csv = std::fs::read_to_string(output_dir.join(SALES_FORECAST_FILE)).unwrap();
    let mut lines = forecast_csv.lines();
    assert_eq!(lines.next(), Some("Date,Forecasted Sales"));
    assert!(lines.next().unwrap().starts_with("2024-01-22,"));
    assert_eq!(forecast_csv.lines().count(), 31);
}
