//! Stylesheet upgrade from the pre-0.7.2 map XML schema.
//!
//! Older stylesheets carry symbolizer styling in `CssParameter` children, bare
//! field names in text labels and a handful of renamed attributes. This module
//! rewrites such a document to the newer schema:
//!
//! | where                                   | change                                          |
//! |-----------------------------------------|-------------------------------------------------|
//! | root `Map`                              | `bgcolor` → `background-color`, `minimum_version="0.7.2"` |
//! | `TextSymbolizer`, `ShieldSymbolizer`    | `name="field"` → `name="[field]"`               |
//! |                                         | `text_convert` → `text_transform` (`tolower` → `lowercase`, `toupper` → `uppercase`) |
//! |                                         | `min_distance` → `minimum_distance`, `min_padding` → `minimum_padding` |
//! | `PointSymbolizer`                       | `width`, `height`, `type` removed               |
//! | `Line`/`Polygon`/`Raster`/`BuildingSymbolizer` | `CssParameter` children folded into attributes |
//!
//! Only `Style/Rule/*Symbolizer` paths directly under the root are touched.
//! Everything else, including namespaced elements such as `xi:include`, is
//! written back unchanged. Internal DTD entities are expanded while parsing.
//! External (`SYSTEM`) entities are inlined by [`upgrade_file`] from files next
//! to the input; [`upgrade_str`] has no directory to look in and refuses them.
//!
//! # Example
//!
//! ```
//! use mapsheet::upgrade::{UpgradeOptions, upgrade_str};
//!
//! let old = r#"<Map bgcolor="white"><Style name="s"><Rule>
//!   <LineSymbolizer><CssParameter name="stroke">#000</CssParameter></LineSymbolizer>
//! </Rule></Style></Map>"#;
//!
//! let new = upgrade_str(old, &UpgradeOptions::default()).unwrap();
//! assert!(new.xml.contains(r##"<LineSymbolizer stroke="#000"/>"##));
//! assert!(new.xml.contains(r#"background-color="white""#));
//! ```

use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Schema version written to the root element.
pub const MINIMUM_VERSION: &str = "0.7.2";

/// Symbolizers whose `CssParameter` children become attributes.
const CSS_SYMBOLIZERS: &[&str] = &[
    "LineSymbolizer",
    "PolygonSymbolizer",
    "RasterSymbolizer",
    "BuildingSymbolizer",
];

/// Symbolizers with text labels.
const TEXT_SYMBOLIZERS: &[&str] = &["TextSymbolizer", "ShieldSymbolizer"];

/// Upgrade error.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    #[error("stylesheet is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Refusing to overwrite the input.
    #[error("output {0} is the input file; choose a different output name")]
    SamePath(PathBuf),
    /// An external entity needs a base directory to resolve against. Use
    /// [`upgrade_file`] or [`expand_external_entities`] first.
    #[error("external entity `{name}` ({system_id}) can only be resolved when upgrading a file")]
    ExternalEntity { name: String, system_id: String },
    /// The file behind an external entity could not be read.
    #[error("cannot read external entity `{name}` from {}", path.display())]
    EntityFile {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output formatting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Re-indent the document with two spaces per level. When off, the
    /// original whitespace is kept.
    pub indent: bool,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self { indent: true }
    }
}

/// What an upgrade changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    /// `Style` elements visited.
    pub styles: usize,
    /// Symbolizers rewritten.
    pub symbolizers: usize,
    /// Text symbolizer names wrapped into `[field]` expressions.
    pub fixed_names: Vec<String>,
    /// Problems that did not stop the upgrade.
    pub warnings: Vec<String>,
}

/// Upgraded document.
#[derive(Clone, Debug, PartialEq)]
pub struct Upgraded {
    pub xml: String,
    pub report: UpgradeReport,
}

// ============================================================================
// Owned element tree
// ============================================================================

/// An XML element with its attributes in document order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value when present and non-empty.
    fn attr_nonempty(&self, key: &str) -> Option<&str> {
        self.attr(key).filter(|v| !v.is_empty())
    }

    /// Set an attribute, in place when it exists, appended otherwise.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((String::from(key), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Move an attribute to a new name, appended at the end. Empty values are
    /// left alone.
    fn rename_attr(&mut self, from: &str, to: &str) -> bool {
        if self.attr_nonempty(from).is_none() {
            return false;
        }
        let value = self.remove_attr(from).unwrap_or_default();
        self.set_attr(to, value);
        true
    }

    /// Child elements named `name`.
    pub fn children_named_mut<'a>(&'a mut self, name: &'a str) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.children.iter_mut().filter_map(move |n| match n {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize. With `indent`, whitespace-only text is dropped and the tree
    /// is laid out two spaces per level.
    pub fn to_xml(&self, indent: bool) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        write_element(&mut out, self, 0, indent);
        out.push('\n');
        out
    }
}

/// Parse a stylesheet into an owned tree.
///
/// Element and attribute names keep their namespace prefixes, and namespace
/// declarations are kept as `xmlns` attributes on the element that declares
/// them. External entities are refused with [`UpgradeError::ExternalEntity`].
pub fn parse(input: &str) -> Result<Element, UpgradeError> {
    if let Some(decl) = scan_doctype(input).entities.into_iter().next() {
        return Err(UpgradeError::ExternalEntity {
            name: decl.name,
            system_id: decl.system_id,
        });
    }
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(input, options)?;
    Ok(from_node(doc.root_element()))
}

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// `prefix:local` for a name in `namespace`, as bound at `node`.
fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NS) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{local}"),
        _ => String::from(local),
    }
}

fn from_node(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(qualified_name(node, tag.namespace(), tag.name()));

    // Declarations new at this element; roxmltree reports inherited ones too.
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => String::from("xmlns"),
        };
        element.attributes.push((key, String::from(ns.uri())));
    }

    element.attributes.extend(node.attributes().map(|a| {
        (
            qualified_name(node, a.namespace(), a.name()),
            String::from(a.value()),
        )
    }));
    for child in node.children() {
        if child.is_element() {
            element.children.push(Node::Element(from_node(child)));
        } else if child.is_text() {
            element
                .children
                .push(Node::Text(String::from(child.text().unwrap_or_default())));
        } else if child.is_comment() {
            element
                .children
                .push(Node::Comment(String::from(child.text().unwrap_or_default())));
        }
    }
    element
}

// ============================================================================
// Rewrites
// ============================================================================

/// Upgrade a parsed stylesheet in place.
pub fn upgrade(root: &mut Element) -> UpgradeReport {
    let mut report = UpgradeReport::default();

    root.rename_attr("bgcolor", "background-color");
    root.set_attr("minimum_version", MINIMUM_VERSION);

    for style in root.children_named_mut("Style") {
        report.styles += 1;
        for rule in style.children_named_mut("Rule") {
            for node in rule.children.iter_mut() {
                let Node::Element(sym) = node else { continue };
                let name = sym.name.clone();
                let name = name.as_str();
                if TEXT_SYMBOLIZERS.contains(&name) {
                    if let Some(fixed) = name_to_expression(sym) {
                        log::info!("fixing text symbolizer name {fixed}");
                        report.fixed_names.push(fixed);
                    }
                    rename_text_attributes(sym);
                } else if name == "PointSymbolizer" {
                    for key in ["width", "height", "type"] {
                        if sym.attr_nonempty(key).is_some() {
                            sym.remove_attr(key);
                        }
                    }
                } else if CSS_SYMBOLIZERS.contains(&name) {
                    fold_css_parameters(sym, &mut report);
                } else {
                    continue;
                }
                report.symbolizers += 1;
            }
        }
    }

    if report.styles == 0 {
        log::warn!("no styles encountered, nothing to upgrade");
        report
            .warnings
            .push(String::from("no styles encountered and nothing able to be upgraded"));
    }
    report
}

/// Wrap a bare field name as `[name]`. Returns the original name when changed.
fn name_to_expression(sym: &mut Element) -> Option<String> {
    let name = sym.attr("name")?;
    let is_expression = name.starts_with('[') && name[1..].contains(']');
    if is_expression {
        return None;
    }
    let original = String::from(name);
    sym.set_attr("name", format!("[{original}]"));
    Some(original)
}

fn rename_text_attributes(sym: &mut Element) {
    if let Some(convert) = sym.attr_nonempty("text_convert") {
        let transform = match convert {
            "tolower" => "lowercase",
            "toupper" => "uppercase",
            "none" => "none",
            other => other,
        };
        let transform = String::from(transform);
        sym.set_attr("text_transform", transform);
        sym.remove_attr("text_convert");
    }
    sym.rename_attr("min_distance", "minimum_distance");
    sym.rename_attr("min_padding", "minimum_padding");
}

/// Replace `<CssParameter name="k">v</CssParameter>` children with `k="v"`.
/// All other children go too.
fn fold_css_parameters(sym: &mut Element, report: &mut UpgradeReport) {
    let children = std::mem::take(&mut sym.children);
    for node in children {
        let Node::Element(css) = node else { continue };
        if css.name != "CssParameter" {
            continue;
        }
        match css.attr("name") {
            Some(key) => {
                let key = String::from(key);
                sym.set_attr(&key, css.text());
            }
            None => {
                let msg = format!("{}: CssParameter without a name dropped", sym.name);
                log::warn!("{msg}");
                report.warnings.push(msg);
            }
        }
    }
}

// ============================================================================
// External entities
// ============================================================================

/// `<!ENTITY name SYSTEM "file">` or `<!ENTITY name PUBLIC "id" "file">`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ExternalDecl {
    name: String,
    system_id: String,
    /// Byte range of the whole declaration.
    span: Range<usize>,
}

#[derive(Debug, Default)]
struct Doctype {
    entities: Vec<ExternalDecl>,
    /// Offset just past the internal subset's `]>`.
    end: usize,
}

/// Find parsed external general entities in the internal DTD subset.
/// Parameter entities and unparsed (`NDATA`) entities are left alone.
fn scan_doctype(text: &str) -> Doctype {
    let mut doctype = Doctype::default();
    let Some(start) = text.find("<!DOCTYPE") else {
        return doctype;
    };
    let mut pos = start;
    loop {
        let rest = &text[pos..];
        match (rest.find("<!ENTITY"), rest.find("]>")) {
            (Some(decl), Some(close)) if decl < close => {
                let at = pos + decl;
                let Some((end, decl)) = parse_entity_decl(text, at) else {
                    return Doctype::default();
                };
                if let Some(decl) = decl {
                    doctype.entities.push(decl);
                }
                pos = end;
            }
            (_, Some(close)) => {
                doctype.end = pos + close + 2;
                return doctype;
            }
            _ => return Doctype::default(),
        }
    }
}

/// Parse the declaration starting at `at`. Returns the offset after its `>`
/// and the declaration when it is a parsed external general entity.
fn parse_entity_decl(text: &str, at: usize) -> Option<(usize, Option<ExternalDecl>)> {
    let bytes = text.as_bytes();
    let mut i = at + "<!ENTITY".len();

    skip_ws(bytes, &mut i);
    let parameter = bytes.get(i) == Some(&b'%');
    if parameter {
        i += 1;
        skip_ws(bytes, &mut i);
    }
    let name = word(text, &mut i);
    skip_ws(bytes, &mut i);

    let system_id = match bytes.get(i) {
        Some(b'"' | b'\'') => {
            literal(text, &mut i)?;
            None
        }
        _ => match word(text, &mut i) {
            "SYSTEM" => {
                skip_ws(bytes, &mut i);
                literal(text, &mut i)
            }
            "PUBLIC" => {
                skip_ws(bytes, &mut i);
                literal(text, &mut i)?;
                skip_ws(bytes, &mut i);
                literal(text, &mut i)
            }
            _ => None,
        },
    };

    skip_ws(bytes, &mut i);
    let unparsed = text[i..].starts_with("NDATA");
    let end = i + text[i..].find('>')? + 1;

    let decl = match system_id {
        Some(id) if !parameter && !unparsed => Some(ExternalDecl {
            name: String::from(name),
            system_id: String::from(id),
            span: at..end,
        }),
        _ => None,
    };
    Some((end, decl))
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn word<'a>(text: &'a str, i: &mut usize) -> &'a str {
    let bytes = text.as_bytes();
    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    &text[start..*i]
}

/// A quoted literal; `i` moves past the closing quote.
fn literal<'a>(text: &'a str, i: &mut usize) -> Option<&'a str> {
    let quote = *text.as_bytes().get(*i)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let len = text[*i + 1..].find(quote as char)?;
    let value = &text[*i + 1..*i + 1 + len];
    *i += len + 2;
    Some(value)
}

/// Inline external entities: each declaration is dropped from the DTD and
/// every `&name;` in the document body is replaced by the file's content.
/// Relative system identifiers resolve against `base_dir`.
pub fn expand_external_entities(text: &str, base_dir: &Path) -> Result<String, UpgradeError> {
    let doctype = scan_doctype(text);
    if doctype.entities.is_empty() {
        return Ok(String::from(text));
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for decl in &doctype.entities {
        out.push_str(&text[last..decl.span.start]);
        last = decl.span.end;
    }
    out.push_str(&text[last..doctype.end]);

    let mut body = String::from(&text[doctype.end..]);
    for decl in &doctype.entities {
        let path = base_dir.join(&decl.system_id);
        let content = fs::read_to_string(&path).map_err(|source| UpgradeError::EntityFile {
            name: decl.name.clone(),
            path: path.clone(),
            source,
        })?;
        log::info!("expanding entity {} from {}", decl.name, path.display());
        body = body.replace(&format!("&{};", decl.name), strip_text_decl(&content));
    }
    out.push_str(&body);
    Ok(out)
}

/// Drop a BOM and `<?xml ...?>` text declaration from an entity file.
fn strip_text_decl(content: &str) -> &str {
    let content = content.trim_start_matches('\u{feff}');
    if content.starts_with("<?xml")
        && let Some(end) = content.find("?>")
    {
        return &content[end + 2..];
    }
    content
}

// ============================================================================
// Entry points
// ============================================================================

/// Upgrade a stylesheet held in memory.
pub fn upgrade_str(input: &str, options: &UpgradeOptions) -> Result<Upgraded, UpgradeError> {
    let mut root = parse(input)?;
    let report = upgrade(&mut root);
    Ok(Upgraded {
        xml: root.to_xml(options.indent),
        report,
    })
}

/// Upgrade `input` into `output`. The two must be different files.
pub fn upgrade_file(
    input: &Path,
    output: &Path,
    options: &UpgradeOptions,
) -> Result<UpgradeReport, UpgradeError> {
    if same_file(input, output)? {
        return Err(UpgradeError::SamePath(output.to_path_buf()));
    }
    let text = fs::read_to_string(input)?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let text = expand_external_entities(&text, base_dir)?;
    let upgraded = upgrade_str(&text, options)?;
    fs::write(output, &upgraded.xml)?;
    log::info!(
        "upgraded {} -> {}: {} styles, {} symbolizers",
        input.display(),
        output.display(),
        upgraded.report.styles,
        upgraded.report.symbolizers
    );
    Ok(upgraded.report)
}

fn same_file(a: &Path, b: &Path) -> Result<bool, UpgradeError> {
    if a == b {
        return Ok(true);
    }
    if !b.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

// ============================================================================
// Serialization
// ============================================================================

fn write_element(out: &mut String, el: &Element, level: usize, indent: bool) {
    out.push('<');
    out.push_str(&el.name);
    for (k, v) in &el.attributes {
        let _ = write!(out, " {k}=\"{}\"", escape_attr(v));
    }

    let children: Vec<&Node> = if indent {
        el.children
            .iter()
            .filter(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()))
            .collect()
    } else {
        el.children.iter().collect()
    };

    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let text_only = children.iter().all(|n| matches!(n, Node::Text(_)));
    if !indent || text_only {
        for child in children {
            write_node(out, child, level + 1, false);
        }
    } else {
        for child in children {
            newline(out, level + 1);
            write_node(out, child, level + 1, true);
        }
        newline(out, level);
    }

    let _ = write!(out, "</{}>", el.name);
}

fn write_node(out: &mut String, node: &Node, level: usize, indent: bool) {
    match node {
        Node::Element(e) => write_element(out, e, level, indent),
        Node::Text(t) if indent => out.push_str(&escape_text(t.trim())),
        Node::Text(t) => out.push_str(&escape_text(t)),
        Node::Comment(c) => {
            let _ = write!(out, "<!--{c}-->");
        }
    }
}

fn newline(out: &mut String, level: usize) {
    out.push('\n');
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s)
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
}
