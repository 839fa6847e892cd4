//! Behaviour tests for week-over-week performance deltas.

use shelfsight_core::{
    list_options, performance_delta, Facet, FilterSelection, Metric, PerformanceRow,
    SelectionParams,
};
use shelfsight_tests::Fixture;

async fn performance(fixture: &Fixture, params: SelectionParams) -> Vec<PerformanceRow> {
    performance_delta(
        fixture.executor.as_ref(),
        &fixture.settings.tables,
        &FilterSelection::from(&params),
    )
    .await
    .expect("performance")
}

fn row<'a>(rows: &'a [PerformanceRow], keyword_id: &str) -> &'a PerformanceRow {
    rows.iter()
        .find(|row| row.key.keyword_id == keyword_id)
        .unwrap_or_else(|| panic!("no row for keyword {keyword_id}"))
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test]
async fn when_no_week_is_selected_then_latest_week_is_compared_with_the_one_before() {
    // Given: two weeks of data
    let fixture = Fixture::seeded();

    // When: performance is requested without a week filter
    let rows = performance(&fixture, SelectionParams::default()).await;

    // Then: the latest week's rows carry deltas against the previous week
    assert_eq!(rows.len(), 4);
    let shoes = row(&rows, "1001");
    assert_close(shoes.metrics.get(Metric::Impressions), 1100.0);
    assert_close(shoes.deltas.get(Metric::Impressions), 10.0);
    assert_close(shoes.deltas.get(Metric::Spend), 10.0);
    assert_close(shoes.deltas.get(Metric::Roas), 0.0);

    // And: ratios are reported as percentages
    assert_close(shoes.metrics.get(Metric::Ctr), 10.0);
    assert_close(shoes.metrics.get(Metric::ConversionRate), 10.0);
}

#[tokio::test]
async fn when_previous_week_has_no_data_then_deltas_are_null() {
    let fixture = Fixture::seeded();

    let rows = performance(&fixture, SelectionParams::default()).await;

    let tea = row(&rows, "3001");
    assert_eq!(tea.campaign_name, "Irish Week");
    for metric in Metric::ALL {
        assert_eq!(tea.deltas.get(metric), None, "{metric:?}");
    }
}

#[tokio::test]
async fn when_ratio_denominator_is_zero_then_metric_is_null_not_infinite() {
    let fixture = Fixture::seeded();

    let rows = performance(&fixture, SelectionParams::default()).await;

    // Keyword 1002 had impressions but no clicks or spend.
    let unnamed = row(&rows, "1002");
    assert_eq!(unnamed.keyword_name, "1002");
    assert_eq!(unnamed.metrics.get(Metric::Roas), None);
    assert_eq!(unnamed.metrics.get(Metric::Cpa), None);
    assert_eq!(unnamed.metrics.get(Metric::ConversionRate), None);
    assert_close(unnamed.metrics.get(Metric::Ctr), 0.0);
}

#[tokio::test]
async fn when_user_selects_a_week_then_it_is_compared_with_the_week_before_it() {
    // Given: the user picks the later week by its label
    let fixture = Fixture::seeded();
    let params = SelectionParams {
        retailers: Some(String::from("Bigmart")),
        weeks: Some(String::from("Wo Jan 08 2024")),
        ..SelectionParams::default()
    };

    // When: performance is requested
    let rows = performance(&fixture, params).await;

    // Then: only the retailer's row appears, compared with the week of Jan 01
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].campaign_name, "Winter Deals");
    assert_eq!(rows[0].keyword_name, "snow boots");
    assert_close(rows[0].deltas.get(Metric::Impressions), 100.0);
    assert_close(rows[0].deltas.get(Metric::SalesRev), 100.0);
    assert_close(rows[0].deltas.get(Metric::AvgRank), 0.0);
}

#[tokio::test]
async fn when_user_selects_the_earliest_week_then_nothing_precedes_it() {
    let fixture = Fixture::seeded();
    let params = SelectionParams {
        weeks: Some(String::from("2024-01-01")),
        ..SelectionParams::default()
    };

    let rows = performance(&fixture, params).await;

    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|row| row.deltas.get(Metric::Impressions).is_none()));
}

#[tokio::test]
async fn when_filters_match_nothing_then_result_is_empty() {
    let fixture = Fixture::seeded();
    let params = SelectionParams {
        retailers: Some(String::from("Nobody")),
        ..SelectionParams::default()
    };

    let rows = performance(&fixture, params).await;

    assert!(rows.is_empty());
}

#[tokio::test]
async fn when_dimension_row_belongs_to_another_retailer_then_names_fall_back_like_the_facets() {
    // Given: dimension rows for ids Acme uses, but filed under Bigmart
    let fixture = Fixture::seeded();
    fixture
        .executor
        .execute_batch(
            "INSERT INTO dim VALUES
                ('Bigmart', 999, 'Clearance', 1002, 'borrowed keyword'),
                ('Bigmart', 101, 'Zz Borrowed Campaign', 5555, 'unused');",
        )
        .expect("extra dimension rows");

    // When: performance and the keyword facet are listed for Acme
    let acme = SelectionParams {
        retailers: Some(String::from("Acme")),
        ..SelectionParams::default()
    };
    let rows = performance(&fixture, acme.clone()).await;
    let keywords = list_options(
        fixture.executor.as_ref(),
        &fixture.settings.tables,
        Facet::Keywords,
        &FilterSelection::from(&acme),
    )
    .await
    .expect("keyword options");

    // Then: both ignore the other retailer's names
    let unnamed = row(&rows, "1002");
    assert_eq!(unnamed.keyword_name, "1002");
    assert_eq!(unnamed.campaign_name, "Spring Sale");
    let facet_name = keywords
        .iter()
        .find(|option| option.id == "1002")
        .map(|option| option.name.as_str());
    assert_eq!(facet_name, Some(unnamed.keyword_name.as_str()));

    // And: the same holds without a retailer filter
    let all = performance(&fixture, SelectionParams::default()).await;
    assert_eq!(row(&all, "1002").keyword_name, "1002");
    assert_eq!(row(&all, "1001").campaign_name, "Spring Sale");
}
