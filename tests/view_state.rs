use std::fs;

use votv::votable::CellValue;
use votv::{Builder, GridView, Input, ReaderConfig, ResultStateDeserializer, SortDirection, ViewerOptions};

const BASE_URL: &str = "http://localhost/search?target=M31";

fn planets() -> votv::votable::VOTable {
    let json = fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/planets.json"))
        .unwrap();
    let mut builder = Builder::new(ReaderConfig::default(), Input::Json(json));
    builder.build().unwrap();
    builder.take_votable().unwrap()
}

fn names(view: &GridView) -> Vec<String> {
    view.rows()
        .map(|row| row.value("Name").map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

#[test]
fn json_fixture_is_read() {
    let votable = planets();
    let table = votable.first_table().unwrap();
    assert_eq!(table.rows().len(), 6);
    assert_eq!(table.rows()[5].id, "saturn");
    assert_eq!(table.rows()[5].value("dist"), Some(&CellValue::Float(9.54)));
    assert!(table.rows()[4].value("Moons").unwrap().is_nan());
}

#[test]
fn url_state_drives_the_view() {
    let votable = planets();
    let table = votable.first_table().unwrap();

    let url = format!("{BASE_URL}#sortCol=Moons&sortDir=dsc&col_2=Name;120;;&col_1=dist;;%3E%3D1;AU");
    let options = ResultStateDeserializer::new(url).viewer_options();
    assert_eq!(options.default_column_ids, vec!["dist", "Name"]);
    assert_eq!(options.column_filters["dist"], ">=1");

    let mut view = GridView::new(table);
    view.apply_options(&options);
    assert_eq!(names(&view), vec!["Saturn", "Mars", "Earth", "Jupiter"]);

    let state_url = view.result_state_url(BASE_URL);
    assert_eq!(
        state_url,
        format!("{BASE_URL}#sortCol=Moons&sortDir=dsc&col_1=dist;;%3E%3D1;AU&col_2=Name;120;;")
    );
    assert_eq!(ResultStateDeserializer::new(state_url).viewer_options(), options);
}

#[test]
fn defaults_merged_with_url_state() {
    let votable = planets();
    let table = votable.first_table().unwrap();

    let mut options = ViewerOptions {
        sort_column: Some("Name".into()),
        sort_dir: Some(SortDirection::Asc),
        ..Default::default()
    };
    options.merge(ResultStateDeserializer::new(format!("{BASE_URL}#col_1=Name;;!e")).viewer_options());

    let mut view = GridView::new(table);
    view.apply_options(&options);
    assert_eq!(names(&view), vec!["Mars", "Saturn"]);
    assert_eq!(view.columns().len(), 1);
    assert_eq!(view.sort_state(), Some(("Name", SortDirection::Asc)));
}
