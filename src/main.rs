use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use votv::state::{ResultStateDeserializer, SortDirection, ViewerOptions};
use votv::votable::{Metadata, Table};
use votv::{Builder, CsvInput, GridView, Input, ReaderConfig, UrlInput, VotvError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    Xml,
    Json,
    Csv,
    Url,
}

#[derive(Parser, Debug)]
#[command(name = "votv", version, about = "Print a VOTable as CSV, sorted and filtered like a data grid.")]
struct Cli {
    /// VOTable file (.xml, .vot, .votable, .json, .csv) or http(s) URL of a CSV VOTable
    input: String,

    /// Apply the view state in the fragment of this URL
    #[arg(long, value_name = "URL")]
    state: Option<String>,

    /// Column id to sort on
    #[arg(long)]
    sort_col: Option<String>,

    /// asc or dsc
    #[arg(long)]
    sort_dir: Option<SortDirection>,

    /// Column filter, e.g. `--filter "Mag=<3"`
    #[arg(long = "filter", value_name = "ID=EXPR", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Maximum number of rows read from CSV input
    #[arg(long)]
    limit: Option<usize>,

    /// Rows per page when reading CSV input
    #[arg(long)]
    page_size: Option<usize>,

    /// Request the host-less form of the input URL
    #[arg(long)]
    relative_url: bool,

    /// Print the state URL of the resulting view on top of BASE to stderr
    #[arg(long, value_name = "BASE")]
    state_url: Option<String>,

    /// Print the field descriptions instead of the rows
    #[arg(long)]
    fields: bool,
}

fn parse_filter(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((id, expression)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), expression.to_string()))
        }
        _ => Err(format!("expected ID=EXPR, got '{arg}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

async fn run(cli: Cli) -> Result<(), VotvError> {
    let start_time = Instant::now();
    let mut config = ReaderConfig::default().with_use_relative_url(cli.relative_url);
    if let Some(limit) = cli.limit {
        config = config.with_max_row_limit(limit);
    }
    if let Some(page_size) = cli.page_size {
        config = config.with_page_size(page_size);
    }

    let (file_type, contents) = read_input(&cli.input)?;
    let (input, csv_data) = match file_type {
        FileType::Xml => (Input::Xml(into_text(contents)?), None),
        FileType::Json => (Input::Json(into_text(contents)?), None),
        FileType::Csv => (Input::Csv(CsvInput::default()), Some(contents)),
        FileType::Url => (
            Input::Url(UrlInput {
                url: cli.input.clone(),
                table_metadata: Metadata::default(),
            }),
            None,
        ),
    };

    let mut builder = Builder::new(config, input);
    builder
        .start(|_| debug!("Builder for {file_type:?} input is ready"))
        .await?;
    match (file_type, csv_data) {
        (FileType::Csv, Some(data)) => {
            builder.append(&data)?;
            builder.load_end()?;
        }
        (FileType::Url, _) => {}
        _ => builder.build()?,
    }

    let votable = builder
        .take_votable()
        .ok_or_else(|| VotvError::LoadingFailed("no VOTable was read".into()))?;
    let table = votable
        .first_table()
        .ok_or_else(|| VotvError::LoadingFailed("the VOTable holds no table".into()))?;
    info!(
        "Loaded {} rows from {} in {}ms",
        table.rows().len(),
        cli.input,
        start_time.elapsed().as_millis()
    );

    let mut out = BufWriter::new(std::io::stdout().lock());
    if cli.fields {
        write_fields(&mut out, table)?;
        out.flush()?;
        return Ok(());
    }

    let mut options = ViewerOptions::default();
    if let Some(state) = &cli.state {
        options.merge(ResultStateDeserializer::new(state.as_str()).viewer_options());
    }
    options.merge(ViewerOptions {
        sort_column: cli.sort_col.clone(),
        sort_dir: cli.sort_dir,
        column_filters: cli.filters.iter().cloned().collect(),
        ..Default::default()
    });

    let mut view = GridView::new(table);
    view.apply_options(&options);
    write_rows(&mut out, &view)?;
    out.flush()?;

    if let Some(base) = &cli.state_url {
        eprintln!("{}", view.result_state_url(base));
    }
    Ok(())
}

/// Decide the input type and read local files.
fn read_input(input: &str) -> Result<(FileType, Vec<u8>), VotvError> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok((FileType::Url, Vec::new()));
    }
    let path = expand_path(input)?;
    let file_type = get_file_type(&path)?;
    let contents = fs::read(&path)?;
    debug!("Read {} bytes from {}", contents.len(), path.display());
    Ok((file_type, contents))
}

fn into_text(contents: Vec<u8>) -> Result<String, VotvError> {
    String::from_utf8(contents).map_err(|e| VotvError::Utf8Error(e.utf8_error()))
}

fn expand_path(input: &str) -> Result<PathBuf, VotvError> {
    let expanded = shellexpand::full(input)
        .map_err(|e| VotvError::InputNotRecognized(e.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn get_file_type(path: &Path) -> Result<FileType, VotvError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => VotvError::FileNotFound,
        ErrorKind::PermissionDenied => VotvError::PermissionDenied,
        _ => VotvError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(VotvError::LoadingFailed("Not a file!".into()));
    }
    detect_file_type(path)
}

fn detect_file_type(path: &Path) -> Result<FileType, VotvError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("XML") | Some("VOT") | Some("VOTABLE") => Ok(FileType::Xml),
        Some("JSON") => Ok(FileType::Json),
        Some("CSV") => Ok(FileType::Csv),
        _ => Err(VotvError::UnknownFileType),
    }
}

fn write_fields(out: &mut impl Write, table: &Table) -> Result<(), VotvError> {
    writeln!(out, "id,name,datatype,unit,ucd,description")?;
    for field in table.fields() {
        let datatype = field.datatype.as_ref().map(|d| d.to_string()).unwrap_or_default();
        let line = [
            field.id.as_str(),
            field.name.as_str(),
            datatype.as_str(),
            field.unit.as_deref().unwrap_or_default(),
            field.ucd.as_deref().unwrap_or_default(),
            field.description.as_str(),
        ]
        .iter()
        .map(|c| wrap_cell_content(c))
        .collect::<Vec<_>>()
        .join(",");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_rows(out: &mut impl Write, view: &GridView) -> Result<(), VotvError> {
    let columns = view.columns();
    let header = columns
        .iter()
        .map(|f| wrap_cell_content(&f.id))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{header}")?;

    for row in view.rows() {
        let line = columns
            .iter()
            .map(|f| {
                let value = row.value(&f.id).map(|v| v.to_string()).unwrap_or_default();
                wrap_cell_content(&value)
            })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c
        .chars()
        .any(|c| matches!(c, ' ' | '\t' | ',' | '"' | '\n' | '\r'));
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
