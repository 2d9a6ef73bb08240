/// Catalog persistence as a `.ftbpreset` XML document.
///
/// Writing goes through `quick-xml`'s event writer; reading parses the whole
/// document with `roxmltree` before building any record, so a malformed
/// file never yields a partial catalog. Reading never touches plugin
/// binaries.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <FutureboardPlugins version="1.0">
///   <Plugin>
///     <Name>…</Name> <Version>…</Version> <Path>…</Path> <Vendor>…</Vendor>
///     <Architecture>x86_64</Architecture> <Format>CLAP</Format>
///     <UniqueId>…</UniqueId> <IsValid>true</IsValid> <Error>…</Error>
///     <Categories><Category>…</Category></Categories>
///     <Features><Feature>…</Feature></Features>
///     <IsSynth/> <IsEffect/> <AcceptsMidi/> <ProducesMidi/>
///     <NumInputs/> <NumOutputs/>
///   </Plugin>
/// </FutureboardPlugins>
/// ```
use crate::model::{sanitize_text, Architecture, PluginFormat, PluginId, PluginRecord};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::Node;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const ROOT_ELEMENT: &str = "FutureboardPlugins";
pub const PLUGIN_ELEMENT: &str = "Plugin";
pub const DOCUMENT_VERSION: &str = "1.0";
pub const PRESET_EXTENSION: &str = "ftbpreset";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to access preset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed preset document: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("unexpected root element <{0}>, expected <FutureboardPlugins>")]
    UnexpectedRoot(String),
    #[error("unsupported preset version {0}")]
    UnsupportedVersion(String),
    #[error("failed to encode preset: {0}")]
    Encode(String),
}

fn encode_error(err: impl Display) -> PresetError {
    PresetError::Encode(err.to_string())
}

/// Write `records` to `path`, replacing any existing file.
pub fn write_preset(path: &Path, records: &[PluginRecord]) -> Result<(), PresetError> {
    let xml = to_xml_string(records)?;
    std::fs::write(path, xml).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read every record from the preset at `path`.
pub fn read_preset(path: &Path) -> Result<Vec<PluginRecord>, PresetError> {
    let text = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_xml_str(&text)
}

/// Render `records` as a complete preset document.
pub fn to_xml_string(records: &[PluginRecord]) -> Result<String, PresetError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new(ROOT_ELEMENT).with_attributes([("version", DOCUMENT_VERSION)]),
        ))
        .map_err(encode_error)?;

    for record in records {
        write_record(&mut writer, record)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))
        .map_err(encode_error)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(encode_error)
}

fn write_record(writer: &mut Writer<Vec<u8>>, record: &PluginRecord) -> Result<(), PresetError> {
    writer
        .write_event(Event::Start(BytesStart::new(PLUGIN_ELEMENT)))
        .map_err(encode_error)?;

    text_element(writer, "Name", &record.name)?;
    text_element(writer, "Version", &record.version)?;
    text_element(writer, "Path", &record.path.to_string_lossy())?;
    text_element(writer, "Vendor", &record.vendor)?;
    text_element(writer, "Architecture", record.architecture.as_str())?;
    text_element(writer, "Format", record.format.as_str())?;
    if let Some(id) = &record.unique_id {
        text_element(writer, "UniqueId", &id.to_string())?;
    }
    text_element(writer, "IsValid", bool_text(record.is_valid))?;
    if let Some(error) = record.error.as_deref().filter(|e| !e.is_empty()) {
        text_element(writer, "Error", error)?;
    }
    list_element(writer, "Categories", "Category", &record.categories)?;
    list_element(writer, "Features", "Feature", &record.features)?;
    text_element(writer, "IsSynth", bool_text(record.is_synth))?;
    text_element(writer, "IsEffect", bool_text(record.is_effect))?;
    text_element(writer, "AcceptsMidi", bool_text(record.accepts_midi))?;
    text_element(writer, "ProducesMidi", bool_text(record.produces_midi))?;
    text_element(writer, "NumInputs", &record.num_inputs.to_string())?;
    text_element(writer, "NumOutputs", &record.num_outputs.to_string())?;

    writer
        .write_event(Event::End(BytesEnd::new(PLUGIN_ELEMENT)))
        .map_err(encode_error)?;
    Ok(())
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), PresetError> {
    writer
        .create_element(name)
        .write_text_content(BytesText::from_escaped(escape_text(text)))
        .map_err(encode_error)?;
    Ok(())
}

/// Escape element text. Characters XML cannot carry become U+FFFD and `\r`
/// is written as a character reference, which parsers keep as-is instead of
/// folding line endings.
fn escape_text(text: &str) -> String {
    let clean = sanitize_text(text);
    escape(clean.as_ref()).replace('\r', "&#13;")
}

/// Omitted entirely when `items` is empty.
fn list_element(
    writer: &mut Writer<Vec<u8>>,
    outer: &str,
    inner: &str,
    items: &[String],
) -> Result<(), PresetError> {
    if items.is_empty() {
        return Ok(());
    }
    writer
        .write_event(Event::Start(BytesStart::new(outer)))
        .map_err(encode_error)?;
    for item in items {
        text_element(writer, inner, item)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(outer)))
        .map_err(encode_error)?;
    Ok(())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parse a complete preset document.
pub fn from_xml_str(text: &str) -> Result<Vec<PluginRecord>, PresetError> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let root_name = root.tag_name().name();
    if root_name != ROOT_ELEMENT {
        return Err(PresetError::UnexpectedRoot(root_name.to_string()));
    }
    if let Some(version) = root.attribute("version") {
        if version != "1" && !version.starts_with("1.") {
            return Err(PresetError::UnsupportedVersion(version.to_string()));
        }
    }

    Ok(root
        .children()
        .filter(|n| n.has_tag_name(PLUGIN_ELEMENT))
        .map(read_record)
        .collect())
}

fn read_record(node: Node<'_, '_>) -> PluginRecord {
    let format = PluginFormat::from_tag(child_text(node, "Format"));
    let mut record = PluginRecord::new(
        child_text(node, "Path"),
        format,
        Architecture::from_tag(child_text(node, "Architecture")),
    );

    record.name = child_text(node, "Name").to_string();
    record.version = child_text(node, "Version").to_string();
    record.vendor = child_text(node, "Vendor").to_string();

    let id = child_text(node, "UniqueId");
    if !id.is_empty() {
        record.unique_id = Some(PluginId::parse(id, format));
    }

    record.is_valid = child_bool(node, "IsValid");
    let error = child_text(node, "Error");
    if !error.is_empty() {
        record.error = Some(error.to_string());
    }

    record.categories = child_list(node, "Categories", "Category");
    record.features = child_list(node, "Features", "Feature");

    record.is_synth = child_bool(node, "IsSynth");
    record.is_effect = child_bool(node, "IsEffect");
    record.accepts_midi = child_bool(node, "AcceptsMidi");
    record.produces_midi = child_bool(node, "ProducesMidi");
    record.num_inputs = child_count(node, "NumInputs");
    record.num_outputs = child_count(node, "NumOutputs");
    record
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Text of the first `name` child; empty when absent.
fn child_text<'a>(node: Node<'a, '_>, name: &str) -> &'a str {
    child(node, name).and_then(|n| n.text()).unwrap_or("")
}

fn child_list(node: Node<'_, '_>, outer: &str, inner: &str) -> Vec<String> {
    child(node, outer)
        .map(|list| {
            list.children()
                .filter(|n| n.has_tag_name(inner))
                .map(|n| n.text().unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn child_bool(node: Node<'_, '_>, name: &str) -> bool {
    let text = child_text(node, name).trim();
    match parse_bool(text) {
        Some(value) => value,
        None => {
            warn!("Unreadable <{name}> value {text:?}, using false");
            false
        }
    }
}

/// Truthy when the first character is `1`, `t` or `y` (any case). Empty
/// text is false.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.chars().next().map(|c| c.to_ascii_lowercase()) {
        None => Some(false),
        Some('1' | 't' | 'y') => Some(true),
        Some('0' | 'f' | 'n') => Some(false),
        Some(_) => None,
    }
}

fn child_count(node: Node<'_, '_>, name: &str) -> u32 {
    let text = child_text(node, name).trim();
    if text.is_empty() {
        return 0;
    }
    text.parse().unwrap_or_else(|_| {
        warn!("Unreadable <{name}> value {text:?}, using 0");
        0
    })
}
