use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{
    Datatype, Field, Info, LongestValues, Metadata, Param, Resource, RowBuilder, Table, TableData,
    VOTable,
};
use crate::domain::{ROW_ID_PREFIX, VotvError};

#[derive(Debug, Deserialize)]
struct VOTableDoc {
    description: Option<String>,
    #[serde(default)]
    infos: Vec<InfoDoc>,
    #[serde(default)]
    params: Vec<ParamDoc>,
    #[serde(default)]
    resources: Vec<ResourceDoc>,
}

#[derive(Debug, Deserialize)]
struct InfoDoc {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParamDoc {
    #[serde(flatten)]
    field: FieldDoc,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ResourceDoc {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    #[serde(default)]
    infos: Vec<InfoDoc>,
    #[serde(default)]
    tables: Vec<TableDoc>,
}

#[derive(Debug, Deserialize)]
struct TableDoc {
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDoc>,
    #[serde(default)]
    rows: Vec<RowDoc>,
}

#[derive(Debug, Deserialize)]
struct FieldDoc {
    name: String,
    id: Option<String>,
    datatype: Option<String>,
    unit: Option<String>,
    ucd: Option<String>,
    utype: Option<String>,
    xtype: Option<String>,
    arraysize: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowDoc {
    Cells(Vec<Value>),
    WithId { id: Option<String>, cells: Vec<Value> },
}

impl From<FieldDoc> for Field {
    fn from(doc: FieldDoc) -> Self {
        let mut field = Field::new(doc.name, doc.id.as_deref());
        field.datatype = doc.datatype.and_then(|d| d.parse::<Datatype>().ok());
        field.unit = doc.unit;
        field.ucd = doc.ucd;
        field.utype = doc.utype;
        field.xtype = doc.xtype;
        field.arraysize = doc.arraysize;
        field.description = doc.description;
        field
    }
}

impl From<InfoDoc> for Info {
    fn from(doc: InfoDoc) -> Self {
        Info {
            name: doc.name,
            value: doc.value,
        }
    }
}

/// Reads a VOTable serialized as JSON.
#[derive(Debug)]
pub struct JsonBuilder {
    json: String,
    votable: Option<VOTable>,
}

impl JsonBuilder {
    pub fn new(json: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            votable: None,
        }
    }

    pub fn data(&self) -> &str {
        &self.json
    }

    pub fn votable(&self) -> Option<&VOTable> {
        self.votable.as_ref()
    }

    pub fn take_votable(&mut self) -> Option<VOTable> {
        self.votable.take()
    }

    pub fn build(&mut self, row_builder: &RowBuilder) -> Result<(), VotvError> {
        let start_time = Instant::now();
        let doc: VOTableDoc = serde_json::from_str(&self.json)?;

        let resources = doc
            .resources
            .into_iter()
            .map(|resource| Self::build_resource(resource, row_builder))
            .collect::<Vec<Resource>>();

        let metadata = Metadata {
            params: doc
                .params
                .into_iter()
                .map(|param| Param {
                    value: cell_text(&param.value),
                    field: param.field.into(),
                })
                .collect(),
            infos: doc.infos.into_iter().map(Info::from).collect(),
            description: doc.description,
            fields: Vec::new(),
        };

        let votable = VOTable::new(metadata, resources);
        info!(
            "Built VOTable from JSON with {} tables in {}ms",
            votable.tables().count(),
            start_time.elapsed().as_millis()
        );
        self.votable = Some(votable);
        Ok(())
    }

    fn build_resource(doc: ResourceDoc, row_builder: &RowBuilder) -> Resource {
        Resource {
            id: doc.id,
            name: doc.name,
            meta: doc.kind.as_deref() == Some("meta"),
            metadata: Metadata {
                infos: doc.infos.into_iter().map(Info::from).collect(),
                description: doc.description,
                ..Default::default()
            },
            tables: doc
                .tables
                .into_iter()
                .map(|table| Self::build_table(table, row_builder))
                .collect(),
        }
    }

    fn build_table(doc: TableDoc, row_builder: &RowBuilder) -> Table {
        let fields = doc.fields.into_iter().map(Field::from).collect::<Vec<Field>>();
        let mut longest_values = LongestValues::new();
        for field in &fields {
            longest_values.register(&field.id);
        }

        let rows = doc
            .rows
            .into_iter()
            .enumerate()
            .map(|(row_index, row)| {
                let (id, cells) = match row {
                    RowDoc::Cells(cells) => (None, cells),
                    RowDoc::WithId { id, cells } => (id, cells),
                };
                let row_id = id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("{ROW_ID_PREFIX}{row_index}"));
                row_builder.build_row_data(&fields, row_id, &cells, &mut longest_values, cell_text)
            })
            .collect::<Vec<_>>();
        debug!("Read JSON table with {} fields and {} rows", fields.len(), rows.len());

        Table::new(
            Metadata {
                description: doc.description,
                fields,
                ..Default::default()
            },
            TableData {
                rows,
                longest_values,
            },
        )
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
