use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use votv::votable::csv::{BuilderEvent, EventKind};
use votv::votable::{Metadata, VOTable};
use votv::{Builder, CsvInput, Input, ReaderConfig};

fn fixture(name: &str) -> Vec<u8> {
    fs::read(format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))).unwrap()
}

fn xml_votable() -> VOTable {
    let xml = String::from_utf8(fixture("jobs.xml")).unwrap();
    let mut builder = Builder::new(ReaderConfig::default(), Input::Xml(xml));
    builder.build().unwrap();
    builder.take_votable().unwrap()
}

fn csv_builder(config: ReaderConfig, table_metadata: Metadata) -> (Builder, Rc<RefCell<Vec<String>>>) {
    let mut builder = Builder::new(config, Input::Csv(CsvInput { table_metadata }));
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::RowAdd,
        EventKind::PageAddStart,
        EventKind::PageAddEnd,
        EventKind::DataLoadComplete,
    ] {
        let events = Rc::clone(&events);
        builder.subscribe(kind, move |event: &BuilderEvent<'_>| {
            events.borrow_mut().push(match event {
                BuilderEvent::RowAdd(row) => row.id.clone(),
                BuilderEvent::PageAddStart => "page-start".to_string(),
                BuilderEvent::PageAddEnd => "page-end".to_string(),
                BuilderEvent::DataLoadComplete(_) => "complete".to_string(),
            });
        });
    }
    (builder, events)
}

#[test]
fn chunked_csv_matches_xml() {
    let xml = xml_votable();
    let xml_table = xml.first_table().unwrap();

    let config = ReaderConfig::default().with_page_size(3);
    let (mut builder, events) = csv_builder(config, xml_table.metadata.clone());
    for chunk in fixture("jobs.csv").chunks(17) {
        builder.append(chunk).unwrap();
    }
    builder.load_end().unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "page-start", "vov_1", "vov_2", "vov_3", "page-end", "page-start", "vov_4", "vov_5",
            "vov_6", "page-end", "page-start", "vov_7", "page-end", "complete"
        ]
    );

    let csv = builder.take_votable().unwrap();
    let csv_table = csv.first_table().unwrap();
    assert_eq!(csv_table.rows().len(), xml_table.rows().len());
    for (csv_row, xml_row) in csv_table.rows().iter().zip(xml_table.rows()) {
        for field in xml_table.fields() {
            let (a, b) = (csv_row.value(&field.id).unwrap(), xml_row.value(&field.id).unwrap());
            assert!(a == b || (a.is_nan() && b.is_nan()), "{}: {a:?} != {b:?}", field.id);
        }
    }
    assert_eq!(csv_table.data.longest_values, xml_table.data.longest_values);
}

#[test]
fn csv_without_metadata_uses_the_header() {
    let (mut builder, events) = csv_builder(ReaderConfig::default().with_max_row_limit(2), Metadata::default());
    builder.append(&fixture("jobs.csv")).unwrap();
    builder.load_end().unwrap();

    assert_eq!(*events.borrow(), vec!["vov_1", "vov_2", "complete"]);
    let votable = builder.take_votable().unwrap();
    let table = votable.first_table().unwrap();
    assert_eq!(table.fields().len(), 13);
    assert_eq!(table.fields()[6].id, "VM Type");
    assert!(!table.fields()[10].is_numeric());
    assert_eq!(table.rows()[1].value("RA").unwrap().to_string(), "41.63295047803702");
}
