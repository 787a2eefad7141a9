use std::time::Instant;

use roxmltree::{Document, Node};
use tracing::{debug, info};

use super::xpath::VOTableXPathEvaluator;
use super::{
    Datatype, Field, Info, LongestValues, Metadata, Param, Resource, RowBuilder, Table, TableData,
    VOTable,
};
use crate::domain::{ROW_ID_PREFIX, VotvError};

const DEFAULT_PREFIX: &str = "votable";

/// Reads an XML TABLEDATA VOTable.
#[derive(Debug)]
pub struct VOTableXmlBuilder {
    xml: String,
    votable: Option<VOTable>,
}

impl VOTableXmlBuilder {
    pub fn new(xml: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            votable: None,
        }
    }

    pub fn data(&self) -> &str {
        &self.xml
    }

    pub fn votable(&self) -> Option<&VOTable> {
        self.votable.as_ref()
    }

    pub fn take_votable(&mut self) -> Option<VOTable> {
        self.votable.take()
    }

    pub fn build(&mut self, row_builder: &RowBuilder) -> Result<(), VotvError> {
        let start_time = Instant::now();
        let document = Document::parse(&self.xml)?;
        let evaluator = VOTableXPathEvaluator::new(&document, DEFAULT_PREFIX);

        let votable_nodes = evaluator.evaluate("/VOTABLE")?;
        let Some(&votable_node) = votable_nodes.first() else {
            return Err(VotvError::LoadingFailed(
                "document element is not a VOTABLE".into(),
            ));
        };

        let mut resources = Vec::new();
        for resource_node in evaluator.evaluate_from(votable_node, "RESOURCE")? {
            resources.push(Self::build_resource(&evaluator, resource_node, row_builder)?);
        }

        let metadata = Metadata {
            params: Self::build_params(&evaluator, votable_node)?,
            infos: Self::build_infos(&evaluator, votable_node)?,
            description: Self::description(&evaluator, votable_node)?,
            fields: Vec::new(),
        };

        let votable = VOTable::new(metadata, resources);
        info!(
            "Built VOTable with {} tables in {}ms",
            votable.tables().count(),
            start_time.elapsed().as_millis()
        );
        self.votable = Some(votable);
        Ok(())
    }

    fn build_resource<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
        row_builder: &RowBuilder,
    ) -> Result<Resource, VotvError> {
        let metadata = Metadata {
            infos: Self::build_infos(evaluator, node)?,
            description: Self::description(evaluator, node)?,
            ..Default::default()
        };

        let mut tables = Vec::new();
        for table_node in evaluator.evaluate_from(node, "TABLE")? {
            tables.push(Self::build_table(evaluator, table_node, row_builder)?);
        }

        Ok(Resource {
            id: node.attribute("ID").or(node.attribute("id")).map(str::to_string),
            name: node.attribute("name").map(str::to_string),
            meta: node.attribute("type") == Some("meta"),
            metadata,
            tables,
        })
    }

    fn build_table<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
        row_builder: &RowBuilder,
    ) -> Result<Table, VotvError> {
        let mut longest_values = LongestValues::new();
        let mut fields = Vec::new();
        for field_node in evaluator.evaluate_from(node, "FIELD")? {
            let field = Self::build_field(evaluator, field_node)?;
            longest_values.register(&field.id);
            fields.push(field);
        }

        let mut rows = Vec::new();
        for (row_index, row_node) in evaluator
            .evaluate_from(node, "DATA/TABLEDATA/TR")?
            .into_iter()
            .enumerate()
        {
            let cells = evaluator.evaluate_from(row_node, "TD")?;
            let row_id = row_node
                .attribute("ID")
                .or(row_node.attribute("id"))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{ROW_ID_PREFIX}{row_index}"));

            rows.push(row_builder.build_row_data(
                &fields,
                row_id,
                &cells,
                &mut longest_values,
                Self::cell_text,
            ));
        }
        debug!("Read table with {} fields and {} rows", fields.len(), rows.len());

        let metadata = Metadata {
            description: Self::description(evaluator, node)?,
            fields,
            ..Default::default()
        };
        Ok(Table::new(metadata, TableData { rows, longest_values }))
    }

    fn build_field<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Field, VotvError> {
        let name = node.attribute("name").unwrap_or_default();
        let id = node.attribute("ID").or(node.attribute("id"));
        let mut field = Field::new(name, id);
        field.ucd = node.attribute("ucd").map(str::to_string);
        field.utype = node.attribute("utype").map(str::to_string);
        field.unit = node.attribute("unit").map(str::to_string);
        field.xtype = node.attribute("xtype").map(str::to_string);
        field.datatype = node
            .attribute("datatype")
            .and_then(|d| d.parse::<Datatype>().ok());
        field.arraysize = node.attribute("arraysize").map(str::to_string);
        field.description = Self::description(evaluator, node)?.unwrap_or_default();
        Ok(field)
    }

    fn build_infos<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Vec<Info>, VotvError> {
        Ok(evaluator
            .evaluate_from(node, "INFO")?
            .into_iter()
            .map(|info| Info {
                name: info.attribute("name").map(str::to_string),
                value: info.attribute("value").map(str::to_string),
            })
            .collect())
    }

    fn build_params<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Vec<Param>, VotvError> {
        evaluator
            .evaluate_from(node, "PARAM")?
            .into_iter()
            .map(|param| -> Result<Param, VotvError> {
                Ok(Param {
                    value: param.attribute("value").unwrap_or_default().to_string(),
                    field: Self::build_field(evaluator, param)?,
                })
            })
            .collect()
    }

    fn description<'a, 'input>(
        evaluator: &VOTableXPathEvaluator<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<Option<String>, VotvError> {
        Ok(evaluator
            .evaluate_from(node, "DESCRIPTION")?
            .first()
            .and_then(|d| d.text())
            .map(|t| t.trim().to_string()))
    }

    // First text child of a TD, empty when the cell has none.
    fn cell_text(node: &Node<'_, '_>) -> String {
        node.text().unwrap_or_default().to_string()
    }
}
