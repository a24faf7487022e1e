use chrono::{Days, NaiveDate};
use epidash::data::aggregate::{
    age_pyramid, choropleth, kpi_summary, municipality_counts, resample, sex_distribution, top_n,
    AgeBand, GapFill, Granularity, RankField, RankOrder, TOP_N,
};
use epidash::data::filter::{filter_records, filtered_indices, init_filter_state, FilterState};
use epidash::data::geo::{normalize_name, parse_boundaries};
use epidash::data::model::{DateRange, VisitDataset, VisitRecord};
use epidash::data::view::{compute_view, ViewOptions};
use pretty_assertions::assert_eq;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn visit(date: Option<NaiveDate>, code: &str) -> VisitRecord {
    VisitRecord {
        date,
        code: code.to_string(),
        ..VisitRecord::default()
    }
}

fn person(patient: &str, age: Option<u32>, sex: Option<&str>) -> VisitRecord {
    VisitRecord {
        date: Some(d(2024, 1, 1)),
        patient_id: patient.to_string(),
        age: age.map(f64::from),
        sex: sex.map(str::to_string),
        ..VisitRecord::default()
    }
}

fn codes(labels: &[&str]) -> std::collections::BTreeSet<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

#[test]
fn january_code_a_scenario() {
    let records = vec![
        visit(Some(d(2024, 1, 5)), "A"),
        visit(Some(d(2024, 1, 5)), "B"),
        visit(Some(d(2024, 2, 10)), "A"),
    ];
    let filters = FilterState {
        date_range: DateRange::new(d(2024, 1, 1), d(2024, 1, 31)),
        codes: codes(&["A"]),
    };

    let out = filter_records(&records, &filters);
    assert_eq!(out, vec![&records[0]]);
}

#[test]
fn filter_output_is_an_ordered_subset() {
    let records: Vec<VisitRecord> = (0..40)
        .map(|i| {
            let date = (i % 7 != 0).then(|| d(2024, 1, 1) + Days::new(i as u64));
            visit(date, if i % 3 == 0 { "A" } else { "B" })
        })
        .collect();
    let filters = FilterState {
        date_range: DateRange::new(d(2024, 1, 5), d(2024, 1, 30)),
        codes: codes(&["B"]),
    };

    let out = filter_records(&records, &filters);
    let indices = filtered_indices(&VisitDataset::from_records(records.clone()), &filters);
    assert!(!out.is_empty());
    assert_eq!(out.len(), indices.len());

    // Every output row is the very row of the input at the matching index.
    for (row, &i) in out.iter().zip(&indices) {
        assert!(std::ptr::eq(*row, &records[i]));
    }
    assert!(indices.windows(2).all(|w| w[0] < w[1]));
    assert!(out.iter().all(|r| r.date.is_some() && r.code == "B"));
}

#[test]
fn empty_code_selection_only_filters_by_date() {
    let records = vec![
        visit(Some(d(2024, 1, 5)), "A"),
        visit(Some(d(2024, 1, 6)), "B"),
        visit(None, "A"),
        visit(Some(d(2024, 3, 1)), "C"),
    ];
    let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31));
    let out = filter_records(&records, &FilterState::new(range));

    let by_date: Vec<&VisitRecord> = records
        .iter()
        .filter(|r| r.date.is_some_and(|date| range.contains(date)))
        .collect();
    assert_eq!(out, by_date);
    assert_eq!(out.len(), 2);
}

#[test]
fn initial_filters_show_every_dated_row() {
    let dataset = VisitDataset::from_records(vec![
        visit(Some(d(2024, 1, 5)), "A"),
        visit(None, "A"),
        visit(Some(d(2025, 7, 31)), "B"),
    ]);
    let filters = init_filter_state(&dataset);
    assert_eq!(filters.date_range, DateRange::new(d(2024, 1, 5), d(2025, 7, 31)));
    assert_eq!(filtered_indices(&dataset, &filters), vec![0, 2]);
}

// ---------------------------------------------------------------------------
// KPIs and sex distribution
// ---------------------------------------------------------------------------

#[test]
fn kpis_on_empty_input_are_zero() {
    let kpis = kpi_summary(&[]);
    assert_eq!(kpis.total_visits, 0);
    assert_eq!(kpis.unique_patients, 0);
    assert_eq!(kpis.mean_age, 0);
    assert!(sex_distribution(&[]).is_empty());
}

#[test]
fn kpis_count_patients_and_floor_mean_age() {
    let records = vec![
        person("1", Some(30), Some("FEMININO")),
        person("1", Some(31), Some("FEMININO")),
        person("2", Some(40), Some("MASCULINO")),
        person("3", None, None),
    ];
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let kpis = kpi_summary(&rows);
    assert_eq!(kpis.total_visits, 4);
    assert_eq!(kpis.unique_patients, 3);
    // (30 + 31 + 40) / 3 = 33.67
    assert_eq!(kpis.mean_age, 33);

    let sexes = sex_distribution(&rows);
    assert_eq!(
        sexes.entries,
        vec![("FEMININO".to_string(), 2), ("MASCULINO".to_string(), 1)]
    );
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

fn specialty_rows() -> Vec<VisitRecord> {
    // Specialty "S{i}" appears i + 1 times, for 20 specialties.
    (0..20)
        .flat_map(|i| {
            (0..=i).map(move |_| VisitRecord {
                specialty: format!("S{i:02}"),
                insurer: if i % 2 == 0 { "SUS" } else { "UNIMED" }.to_string(),
                ..VisitRecord::default()
            })
        })
        .collect()
}

#[test]
fn top_n_keeps_largest_in_both_orders() {
    let records = specialty_rows();
    let rows: Vec<&VisitRecord> = records.iter().collect();

    let desc = top_n(&rows, RankField::Specialty, TOP_N, RankOrder::Descending);
    assert_eq!(desc.len(), TOP_N);
    assert_eq!(desc.entries[0], ("S19".to_string(), 20));
    assert_eq!(desc.entries[TOP_N - 1], ("S05".to_string(), 6));
    assert!(desc.entries.windows(2).all(|w| w[0].1 >= w[1].1));

    let asc = top_n(&rows, RankField::Specialty, TOP_N, RankOrder::Ascending);
    assert_eq!(asc.len(), TOP_N);
    assert!(asc.entries.windows(2).all(|w| w[0].1 <= w[1].1));
    let mut reversed = asc.entries.clone();
    reversed.reverse();
    assert_eq!(reversed, desc.entries);
}

#[test]
fn top_n_with_few_categories_returns_all() {
    let records = specialty_rows();
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let insurers = top_n(&rows, RankField::Insurer, TOP_N, RankOrder::Descending);
    assert_eq!(insurers.len(), 2);
    assert_eq!(insurers.total(), records.len());
    assert!(top_n(&[], RankField::Insurer, TOP_N, RankOrder::Ascending).is_empty());
}

// ---------------------------------------------------------------------------
// Age pyramid
// ---------------------------------------------------------------------------

#[test]
fn pyramid_counts_sum_to_rows_with_age_and_sex() {
    let records: Vec<VisitRecord> = (0..120u32)
        .map(|i| {
            let sex = match i % 5 {
                0 | 1 => Some("MASCULINO"),
                2 | 3 => Some("FEMININO"),
                _ => None,
            };
            person(&i.to_string(), Some(i), sex)
        })
        .collect();
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let pyramid = age_pyramid(&rows);

    let with_sex = records.iter().filter(|r| r.sex.is_some()).count();
    assert_eq!(pyramid.total(), with_sex);
    assert_eq!(pyramid.rows.len(), AgeBand::ALL.len());

    let under10 = &pyramid.rows[0];
    assert_eq!(under10.band, AgeBand::Under10);
    // Ages 0..=9: i % 5 in {0,1} -> 0,1,5,6 male; {2,3} -> 2,3,7,8 female.
    assert_eq!((under10.male, under10.female), (4, 4));
    assert_eq!(under10.male_bar(), -4.0);

    let eighty_plus = pyramid.rows.last().unwrap();
    assert_eq!(eighty_plus.band, AgeBand::EightyPlus);
    assert_eq!(eighty_plus.male + eighty_plus.female, 32);
    assert_eq!(pyramid.axis_max, 16.0);
}

#[test]
fn pyramid_skips_rows_without_age() {
    let records = vec![
        person("1", None, Some("MASCULINO")),
        person("2", Some(9), Some("FEMININO")),
        person("3", Some(10), Some("IGNORADO")),
    ];
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let pyramid = age_pyramid(&rows);
    assert_eq!(pyramid.total(), 2);
    assert_eq!(pyramid.rows[0].female, 1);
    assert_eq!(pyramid.rows[1].other, 1);
    assert_eq!(pyramid.axis_max, 1.0);
}

// ---------------------------------------------------------------------------
// Geographic join
// ---------------------------------------------------------------------------

const BOUNDARIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        { "type": "Feature", "properties": { "name": "São Mateus" },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] } },
        { "type": "Feature", "properties": { "name": "Vitória" },
          "geometry": { "type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,0]]] } },
        { "type": "Feature", "properties": { "name": "Serra" },
          "geometry": { "type": "Polygon", "coordinates": [[[4,0],[5,0],[5,1],[4,0]]] } }
    ]
}"#;

fn in_town(name: &str) -> VisitRecord {
    VisitRecord {
        municipality: name.to_string(),
        ..VisitRecord::default()
    }
}

#[test]
fn normalization_is_idempotent_and_accent_blind() {
    for name in ["São Mateus", "  conceição   da barra ", "VITÓRIA", "Serra"] {
        let once = normalize_name(name);
        assert_eq!(normalize_name(&once), once);
    }
    assert_eq!(normalize_name("São Mateus"), normalize_name("SAO MATEUS"));
    assert_eq!(normalize_name("  conceição   da barra "), "CONCEICAO DA BARRA");
}

#[test]
fn choropleth_matches_across_accents_and_case() {
    let boundaries = parse_boundaries(BOUNDARIES, "name").unwrap();
    let records = vec![
        in_town("SAO MATEUS"),
        in_town("São Mateus"),
        in_town("VITORIA"),
        in_town("OUTRO ESTADO"),
        in_town("OUTRO ESTADO"),
    ];
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let map = choropleth(&rows, &boundaries);

    let counts: Vec<(&str, usize)> = map.regions.iter().map(|r| (r.name.as_str(), r.count)).collect();
    assert_eq!(counts, vec![("São Mateus", 2), ("Vitória", 1), ("Serra", 0)]);
    assert_eq!(map.unmatched.entries, vec![("OUTRO ESTADO".to_string(), 2)]);
    assert_eq!(map.max_count(), 2);
    assert_eq!(municipality_counts(&rows).len(), 4);
}

#[test]
fn choropleth_without_rows_has_zero_regions() {
    let boundaries = parse_boundaries(BOUNDARIES, "name").unwrap();
    let map = choropleth(&[], &boundaries);
    assert_eq!(map.regions.len(), 3);
    assert!(map.regions.iter().all(|r| r.count == 0));
    assert!(map.unmatched.is_empty());
}

// ---------------------------------------------------------------------------
// Temporal resampling
// ---------------------------------------------------------------------------

fn ten_over_three_days() -> Vec<VisitRecord> {
    let days = [d(2024, 3, 4), d(2024, 3, 12), d(2024, 3, 20)];
    (0..10).map(|i| visit(Some(days[i % 3]), "A")).collect()
}

#[test]
fn day_and_month_buckets() {
    let records = ten_over_three_days();
    let rows: Vec<&VisitRecord> = records.iter().collect();

    let daily = resample(&rows, Granularity::Day, GapFill::Omit);
    assert_eq!(
        daily.entries,
        vec![(d(2024, 3, 4), 4), (d(2024, 3, 12), 3), (d(2024, 3, 20), 3)]
    );
    assert_eq!(daily.total(), 10);

    let monthly = resample(&rows, Granularity::Month, GapFill::Zeros);
    assert_eq!(monthly.entries, vec![(d(2024, 3, 1), 10)]);
}

#[test]
fn zero_fill_covers_every_period_in_the_span() {
    let records = ten_over_three_days();
    let rows: Vec<&VisitRecord> = records.iter().collect();

    let daily = resample(&rows, Granularity::Day, GapFill::Zeros);
    assert_eq!(daily.len(), 17);
    assert_eq!(daily.total(), 10);
    assert_eq!(daily.entries[1], (d(2024, 3, 5), 0));

    // Mondays 4, 11 and 18 March.
    let weekly = resample(&rows, Granularity::Week, GapFill::Zeros);
    assert_eq!(
        weekly.entries,
        vec![(d(2024, 3, 4), 4), (d(2024, 3, 11), 3), (d(2024, 3, 18), 3)]
    );
}

#[test]
fn months_fill_across_year_end() {
    let records = vec![visit(Some(d(2024, 11, 30)), "A"), visit(Some(d(2025, 2, 1)), "A")];
    let rows: Vec<&VisitRecord> = records.iter().collect();
    let monthly = resample(&rows, Granularity::Month, GapFill::Zeros);
    assert_eq!(
        monthly.entries,
        vec![
            (d(2024, 11, 1), 1),
            (d(2024, 12, 1), 0),
            (d(2025, 1, 1), 0),
            (d(2025, 2, 1), 1)
        ]
    );
    assert!(resample(&[], Granularity::Week, GapFill::Zeros).is_empty());
}

// ---------------------------------------------------------------------------
// Whole view
// ---------------------------------------------------------------------------

#[test]
fn view_over_empty_filter_result_is_well_defined() {
    let dataset = VisitDataset::from_records(vec![
        person("1", Some(20), Some("FEMININO")),
        person("2", Some(50), Some("MASCULINO")),
    ]);
    let boundaries = parse_boundaries(BOUNDARIES, "name").unwrap();
    let filters = FilterState::new(DateRange::new(d(2030, 1, 1), d(2030, 12, 31)));

    let view = compute_view(&dataset, Some(&boundaries), &filters, &ViewOptions::default());
    assert_eq!(view.visible, 0);
    assert_eq!(view.kpis.mean_age, 0);
    assert!(view.sexes.is_empty());
    assert!(view.specialties.is_empty());
    assert!(view.insurers.is_empty());
    assert!(view.pyramid.is_empty());
    assert_eq!(view.pyramid.axis_max, 10.0);
    assert!(view.timeline.is_empty());
    assert_eq!(view.map.map(|m| m.regions.len()), Some(3));
}

#[test]
fn view_without_boundaries_has_no_map() {
    let dataset = VisitDataset::from_records(vec![person("1", Some(20), Some("FEMININO"))]);
    let filters = init_filter_state(&dataset);
    let view = compute_view(&dataset, None, &filters, &ViewOptions::default());
    assert_eq!(view.visible, 1);
    assert!(view.map.is_none());
    assert_eq!(view.timeline.entries, vec![(d(2024, 1, 1), 1)]);
}
