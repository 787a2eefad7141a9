use std::fs;

use votv::votable::{Table, VOTable};
use votv::{Builder, GridView, Input, ReaderConfig, SortDirection};

fn load_jobs() -> VOTable {
    let xml = fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/jobs.xml"))
        .unwrap();
    let mut builder = Builder::new(ReaderConfig::default(), Input::Xml(xml));
    builder.build().unwrap();
    builder.take_votable().unwrap()
}

fn sorted_values(table: &Table, column: &str, direction: SortDirection) -> Vec<String> {
    let mut view = GridView::new(table);
    view.sort(column, direction).unwrap();
    view.rows()
        .map(|row| row.value(column).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

#[test]
fn jobs_table_is_read() {
    let votable = load_jobs();
    assert_eq!(votable.metadata.infos[0].value.as_deref(), Some("OK"));
    let table = votable.first_table().unwrap();
    assert_eq!(table.metadata.description.as_deref(), Some("TEST VOTABLE"));
    assert_eq!(table.fields().len(), 13);
    assert_eq!(table.rows().len(), 7);
    assert_eq!(table.data.longest_values.get("VM Type"), Some(24));
    assert_eq!(table.data.longest_values.get("Started"), None);
}

#[test]
fn sort_ascending_dec() {
    let votable = load_jobs();
    let table = votable.first_table().unwrap();
    assert_eq!(
        sorted_values(table, "Dec", SortDirection::Asc),
        vec![
            "",
            "",
            "-56.008253196459115",
            "-45.4232993571047",
            "-45.4232993571047",
            "0",
            "33.496328250076225"
        ]
    );
}

#[test]
fn sort_ascending_ra() {
    let votable = load_jobs();
    let table = votable.first_table().unwrap();
    assert_eq!(
        sorted_values(table, "RA", SortDirection::Asc),
        vec![
            "",
            "0",
            "41.63295047803702",
            "41.63295047803702",
            "76.76871277764876",
            "189.08577100000196",
            "350.8923046994408"
        ]
    );
}

#[test]
fn sort_descending_string() {
    let votable = load_jobs();
    let table = votable.first_table().unwrap();
    assert_eq!(
        sorted_values(table, "VM Type", SortDirection::Dsc),
        vec![
            "goods-s",
            "goods-s",
            "abell3112",
            "BLASTgoods-s2006-12-21",
            "BLASTabell31122006-12-21",
            "",
            ""
        ]
    );
}

#[test]
fn sort_descending_integers_with_blanks() {
    let votable = load_jobs();
    let table = votable.first_table().unwrap();
    assert_eq!(
        sorted_values(table, "Calibration Level", SortDirection::Dsc),
        vec!["3", "0", "0", "0", "0", "-1", ""]
    );
}
