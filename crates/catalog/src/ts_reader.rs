//! Event-driven reader for Qt Linguist `.ts` documents.
//!
//! The reader validates while it parses: duplicate message keys within a
//! context and numerus form counts are checked against the plural rule of
//! the document's declared language, so errors carry the line they occur on.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{
    Context, ExtraField, Form, Location, Message, MessageStatus, PluralForms, Translation,
    TsDocument,
};
use crate::plural::{PluralRule, PluralRuleProvider};

/// A parsed document together with the plural rule it was validated against.
#[derive(Debug)]
pub struct ParsedDocument {
    pub document: TsDocument,
    pub plural_rule: Arc<dyn PluralRule>,
}

/// Parses and validates one TS document.
/// （解析並驗證單一 TS 文件。）
pub fn parse_ts(
    input: &str,
    plurals: &dyn PluralRuleProvider,
) -> Result<ParsedDocument, ParseError> {
    TsReader::new(input.as_bytes(), Reader::from_str(input)).read_document(plurals)
}

/// Parses raw file contents, decoding them per the XML declaration's
/// `encoding` (UTF-8 when absent).
/// （解析原始位元組，依 XML 宣告的編碼解碼。）
pub fn parse_ts_bytes(
    input: &[u8],
    plurals: &dyn PluralRuleProvider,
) -> Result<ParsedDocument, ParseError> {
    TsReader::new(input, Reader::from_reader(input)).read_document(plurals)
}

type SeenKeys = HashMap<String, HashSet<(String, Option<String>)>>;

enum Node<'a> {
    Open(BytesStart<'a>),
    Empty(BytesStart<'a>),
}

impl<'a> Node<'a> {
    fn start(&self) -> &BytesStart<'a> {
        match self {
            Node::Open(start) | Node::Empty(start) => start,
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, Node::Open(_))
    }

    fn display_name(&self) -> String {
        String::from_utf8_lossy(self.start().name().as_ref()).into_owned()
    }
}

struct TsReader<'a> {
    input: &'a [u8],
    reader: Reader<&'a [u8]>,
    /// Last scanned byte offset and the line it sits on.
    cursor: Cell<(usize, usize)>,
}

impl<'a> TsReader<'a> {
    fn new(input: &'a [u8], mut reader: Reader<&'a [u8]>) -> Self {
        reader.trim_text(false);
        reader.expand_empty_elements(false);
        reader.check_end_names(true);
        Self {
            input,
            reader,
            cursor: Cell::new((0, 1)),
        }
    }

    /// Line of the reader's position; only the bytes since the previous call are scanned.
    fn line(&self) -> usize {
        let position = self.reader.buffer_position().min(self.input.len());
        let (mut scanned, mut line) = self.cursor.get();
        if position < scanned {
            scanned = 0;
            line = 1;
        }
        line += self.input[scanned..position]
            .iter()
            .filter(|byte| **byte == b'\n')
            .count();
        self.cursor.set((position, line));
        line
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind).at_line(self.line())
    }

    fn next_event(&mut self) -> Result<Event<'a>, ParseError> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(event) => return Ok(event),
                Err(error) => return Err(self.error(ParseErrorKind::Xml(error))),
            }
        }
    }

    /// Next child element of a container, or `None` at its closing tag.
    fn next_child(&mut self, parent: &'static str) -> Result<Option<Node<'a>>, ParseError> {
        loop {
            match self.next_event()? {
                Event::Start(start) => return Ok(Some(Node::Open(start))),
                Event::Empty(start) => return Ok(Some(Node::Empty(start))),
                Event::End(_) => return Ok(None),
                Event::Text(text) if is_blank(&text) => {}
                Event::Text(_) | Event::CData(_) => {
                    return Err(self.error(ParseErrorKind::UnexpectedText(parent)))
                }
                Event::Eof => return Err(self.error(ParseErrorKind::UnexpectedEof(parent))),
                _ => {}
            }
        }
    }

    fn attribute(&self, start: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
        match start.try_get_attribute(name) {
            Ok(Some(attribute)) => attribute
                .decode_and_unescape_value(&self.reader)
                .map(|value| Some(value.into_owned()))
                .map_err(|error| self.error(ParseErrorKind::Xml(error))),
            Ok(None) => Ok(None),
            Err(error) => Err(self.error(ParseErrorKind::Xml(error.into()))),
        }
    }

    fn flag(&self, start: &BytesStart<'_>, name: &str) -> Result<bool, ParseError> {
        Ok(self.attribute(start, name)?.as_deref() == Some("yes"))
    }

    fn skip(&mut self, node: Node<'a>) -> Result<(), ParseError> {
        if let Node::Open(start) = node {
            let end = start.to_end().into_owned();
            self.reader
                .read_to_end(end.name())
                .map_err(|error| self.error(ParseErrorKind::Xml(error)))?;
        }
        Ok(())
    }

    /// Collects the text content of a leaf element, honoring `<byte>` escapes.
    fn read_text(&mut self, node: Node<'a>, element: &'static str) -> Result<String, ParseError> {
        let mut text = String::new();
        if !node.is_open() {
            return Ok(text);
        }
        loop {
            match self.next_event()? {
                Event::Text(chunk) => {
                    let unescaped = chunk
                        .unescape()
                        .map_err(|error| self.error(ParseErrorKind::Xml(error)))?;
                    text.push_str(&unescaped);
                }
                Event::CData(chunk) => {
                    let decoded = self
                        .reader
                        .decoder()
                        .decode(&chunk)
                        .map_err(|error| self.error(ParseErrorKind::Xml(error)))?;
                    text.push_str(&decoded);
                }
                Event::Empty(start) if start.name().as_ref() == b"byte" => {
                    let value = self.attribute(&start, "value")?.ok_or_else(|| {
                        self.error(ParseErrorKind::MissingAttribute {
                            attribute: "value",
                            element: "byte",
                        })
                    })?;
                    let decoded =
                        decode_byte(&value).ok_or_else(|| self.error(ParseErrorKind::InvalidByte(value)))?;
                    text.push(decoded);
                }
                Event::Start(start) | Event::Empty(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    return Err(self.error(ParseErrorKind::UnexpectedElement {
                        element: name,
                        parent: element,
                    }));
                }
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(self.error(ParseErrorKind::UnexpectedEof(element))),
                _ => {}
            }
        }
    }

    fn read_document(
        mut self,
        plurals: &dyn PluralRuleProvider,
    ) -> Result<ParsedDocument, ParseError> {
        let root = loop {
            match self.next_event()? {
                Event::Start(start) if start.name().as_ref() == b"TS" => break Node::Open(start),
                Event::Empty(start) if start.name().as_ref() == b"TS" => break Node::Empty(start),
                Event::Start(start) | Event::Empty(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    return Err(self.error(ParseErrorKind::UnexpectedElement {
                        element: name,
                        parent: "document",
                    }));
                }
                Event::Text(text) if is_blank(&text) => {}
                Event::Eof => {
                    return Err(self.error(ParseErrorKind::MissingElement {
                        element: "TS",
                        parent: "document",
                    }))
                }
                _ => return Err(self.error(ParseErrorKind::UnexpectedText("document"))),
            }
        };

        let language = self
            .attribute(root.start(), "language")?
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                self.error(ParseErrorKind::MissingAttribute {
                    attribute: "language",
                    element: "TS",
                })
            })?;
        let plural_rule = plurals.rule_for(&language).map_err(|kind| self.error(kind))?;

        let mut document = TsDocument::new(language);
        document.version = self.attribute(root.start(), "version")?;
        document.source_language = self.attribute(root.start(), "sourcelanguage")?;

        let mut seen = SeenKeys::new();
        if root.is_open() {
            while let Some(child) = self.next_child("TS")? {
                match child.display_name().as_str() {
                    "context" => {
                        let context = self.read_context(child, &*plural_rule, &document.language, &mut seen)?;
                        document.contexts.push(context);
                    }
                    "dependencies" => self.read_dependencies(child, &mut document.dependencies)?,
                    "defaultcodec" => self.skip(child)?,
                    _ => {
                        return Err(self.error(ParseErrorKind::UnexpectedElement {
                            element: child.display_name(),
                            parent: "TS",
                        }))
                    }
                }
            }
        }

        Ok(ParsedDocument {
            document,
            plural_rule,
        })
    }

    fn read_dependencies(
        &mut self,
        node: Node<'a>,
        dependencies: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        if !node.is_open() {
            return Ok(());
        }
        while let Some(child) = self.next_child("dependencies")? {
            if child.start().name().as_ref() != b"dependency" {
                return Err(self.error(ParseErrorKind::UnexpectedElement {
                    element: child.display_name(),
                    parent: "dependencies",
                }));
            }
            let catalog = self.attribute(child.start(), "catalog")?.ok_or_else(|| {
                self.error(ParseErrorKind::MissingAttribute {
                    attribute: "catalog",
                    element: "dependency",
                })
            })?;
            dependencies.push(catalog);
            self.skip(child)?;
        }
        Ok(())
    }

    fn read_context(
        &mut self,
        node: Node<'a>,
        rule: &dyn PluralRule,
        language: &str,
        seen: &mut SeenKeys,
    ) -> Result<Context, ParseError> {
        let mut name: Option<String> = None;
        let mut comment = None;
        let mut messages = Vec::new();

        if node.is_open() {
            while let Some(child) = self
                .next_child("context")
                .map_err(|error| error.in_context(name.as_deref()))?
            {
                match child.display_name().as_str() {
                    "name" => name = Some(self.read_text(child, "name")?),
                    "comment" => comment = Some(self.read_text(child, "comment")?),
                    "message" => {
                        let line = self.line();
                        let message = self
                            .read_message(child, rule, language)
                            .map_err(|error| error.in_context(name.as_deref()))?;
                        messages.push((line, message));
                    }
                    _ => {
                        return Err(self
                            .error(ParseErrorKind::UnexpectedElement {
                                element: child.display_name(),
                                parent: "context",
                            })
                            .in_context(name.as_deref()))
                    }
                }
            }
        }

        let name = name.ok_or_else(|| {
            self.error(ParseErrorKind::MissingElement {
                element: "name",
                parent: "context",
            })
        })?;

        let keys = seen.entry(name.clone()).or_default();
        for (line, message) in &messages {
            let key = (message.source.clone(), message.disambiguation.clone());
            if !keys.insert(key) {
                return Err(ParseError::new(ParseErrorKind::DuplicateMessage)
                    .at_line(*line)
                    .for_message(Some(&message.source))
                    .in_context(Some(&name)));
            }
        }

        Ok(Context {
            name,
            comment,
            messages: messages.into_iter().map(|(_, message)| message).collect(),
        })
    }

    fn read_message(
        &mut self,
        node: Node<'a>,
        rule: &dyn PluralRule,
        language: &str,
    ) -> Result<Message, ParseError> {
        let line = self.line();
        let numerus = self.flag(node.start(), "numerus")?;
        let id = self.attribute(node.start(), "id")?;

        let mut source: Option<String> = None;
        let mut disambiguation = None;
        let mut old_source = None;
        let mut old_disambiguation = None;
        let mut extra_comment = None;
        let mut translator_comment = None;
        let mut locations = Vec::new();
        let mut extras = Vec::new();
        let mut translation = None;

        if node.is_open() {
            loop {
                let child = self
                    .next_child("message")
                    .map_err(|error| error.for_message(source.as_deref()))?;
                let Some(child) = child else { break };
                let result = match child.display_name().as_str() {
                    "location" => self.read_location(child).map(|location| {
                        locations.push(location);
                    }),
                    "source" => self.read_text(child, "source").map(|text| {
                        source = Some(text);
                    }),
                    "oldsource" => self.read_text(child, "oldsource").map(|text| {
                        old_source = Some(text);
                    }),
                    "comment" => self.read_text(child, "comment").map(|text| {
                        disambiguation = Some(text).filter(|value| !value.is_empty());
                    }),
                    "oldcomment" => self.read_text(child, "oldcomment").map(|text| {
                        old_disambiguation = Some(text);
                    }),
                    "extracomment" => self.read_text(child, "extracomment").map(|text| {
                        extra_comment = Some(text);
                    }),
                    "translatorcomment" => {
                        self.read_text(child, "translatorcomment").map(|text| {
                            translator_comment = Some(text);
                        })
                    }
                    "translation" => self.read_translation(child, numerus).map(|parsed| {
                        translation = Some(parsed);
                    }),
                    "userdata" => self.skip(child),
                    name if name.starts_with("extra-") => {
                        let field = name["extra-".len()..].to_string();
                        self.read_text(child, "extra").map(|value| {
                            extras.push(ExtraField { name: field, value });
                        })
                    }
                    _ => Err(self.error(ParseErrorKind::UnexpectedElement {
                        element: child.display_name(),
                        parent: "message",
                    })),
                };
                result.map_err(|error| error.for_message(source.as_deref()))?;
            }
        }

        let source = source.ok_or_else(|| {
            ParseError::new(ParseErrorKind::MissingElement {
                element: "source",
                parent: "message",
            })
            .at_line(line)
        })?;
        let (status, translation) = translation.ok_or_else(|| {
            ParseError::new(ParseErrorKind::MissingElement {
                element: "translation",
                parent: "message",
            })
            .at_line(line)
            .for_message(Some(&source))
        })?;

        if let Translation::Plural(forms) = &translation {
            if forms.len() != rule.cardinality() {
                return Err(ParseError::new(ParseErrorKind::PluralFormCount {
                    locale: language.to_string(),
                    expected: rule.cardinality(),
                    found: forms.len(),
                })
                .at_line(line)
                .for_message(Some(&source)));
            }
        }

        Ok(Message {
            id,
            source,
            disambiguation,
            old_source,
            old_disambiguation,
            extra_comment,
            translator_comment,
            locations,
            extras,
            status,
            translation,
        })
    }

    fn read_location(&mut self, node: Node<'a>) -> Result<Location, ParseError> {
        let location = Location {
            filename: self.attribute(node.start(), "filename")?,
            line: self.attribute(node.start(), "line")?,
        };
        self.skip(node)?;
        Ok(location)
    }

    fn read_translation(
        &mut self,
        node: Node<'a>,
        numerus: bool,
    ) -> Result<(MessageStatus, Translation), ParseError> {
        let kind = self.attribute(node.start(), "type")?;
        let status = MessageStatus::from_type_attr(kind.as_deref()).map_err(|kind| self.error(kind))?;

        if !numerus {
            let form = self.read_form(node, "translation")?;
            return Ok((status, Translation::Single(form)));
        }

        let mut forms = Vec::new();
        if node.is_open() {
            while let Some(child) = self.next_child("translation")? {
                if child.start().name().as_ref() != b"numerusform" {
                    return Err(self.error(ParseErrorKind::UnexpectedElement {
                        element: child.display_name(),
                        parent: "translation",
                    }));
                }
                forms.push(self.read_form(child, "numerusform")?);
            }
        }
        Ok((status, Translation::Plural(PluralForms::new(forms))))
    }

    fn read_form(&mut self, node: Node<'a>, element: &'static str) -> Result<Form, ParseError> {
        if !self.flag(node.start(), "variants")? {
            return self.read_text(node, element).map(Form::new);
        }
        let mut variants = Vec::new();
        if node.is_open() {
            while let Some(child) = self.next_child(element)? {
                if child.start().name().as_ref() != b"lengthvariant" {
                    return Err(self.error(ParseErrorKind::UnexpectedElement {
                        element: child.display_name(),
                        parent: element,
                    }));
                }
                variants.push(self.read_text(child, "lengthvariant")?);
            }
        }
        Ok(Form::with_variants(variants))
    }
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Decodes a `<byte value="...">` escape: `x` prefix for hex, decimal otherwise.
fn decode_byte(value: &str) -> Option<char> {
    let code = match value.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => value.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plural::{FixedPluralRule, FixedPluralRules, LinguistPluralRules};
    use std::fmt::Write as _;
    use std::time::{Duration, Instant};

    fn parse(input: &str) -> Result<TsDocument, ParseError> {
        parse_ts(input, &LinguistPluralRules::new()).map(|parsed| parsed.document)
    }

    const DANISH: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="da" sourcelanguage="en">
<context>
    <name>QMessageBox</name>
    <message>
        <location filename="../src/widgets/dialogs/qmessagebox.cpp" line="+1923"/>
        <source>OK</source>
        <translation></translation>
    </message>
    <message>
        <source>Show Details...</source>
        <translation>Vis detaljer...</translation>
    </message>
</context>
<context>
    <name>QFileDialog</name>
    <message numerus="yes">
        <source>%n file(s)</source>
        <extracomment>status bar</extracomment>
        <translation>
            <numerusform>%n fil</numerusform>
            <numerusform>%n filer</numerusform>
        </translation>
    </message>
    <message>
        <source>Directory:</source>
        <comment>label</comment>
        <translation type="obsolete">Mappe:</translation>
    </message>
</context>
</TS>
"#;

    #[test]
    fn parses_contexts_messages_and_metadata() {
        let document = parse(DANISH).expect("parse");
        assert_eq!(document.language, "da");
        assert_eq!(document.version.as_deref(), Some("2.1"));
        assert_eq!(document.source_language.as_deref(), Some("en"));
        assert_eq!(document.contexts.len(), 2);

        let message_box = &document.contexts[0];
        assert_eq!(message_box.name, "QMessageBox");
        let ok = &message_box.messages[0];
        assert_eq!(ok.source, "OK");
        assert_eq!(ok.translation, Translation::Single(Form::new("")));
        assert_eq!(ok.locations[0].line.as_deref(), Some("+1923"));

        let file_dialog = &document.contexts[1];
        let files = &file_dialog.messages[0];
        assert!(files.is_numerus());
        assert_eq!(files.extra_comment.as_deref(), Some("status bar"));
        let directory = &file_dialog.messages[1];
        assert_eq!(directory.disambiguation.as_deref(), Some("label"));
        assert_eq!(directory.status, MessageStatus::Obsolete);
    }

    #[test]
    fn text_keeps_whitespace_entities_and_byte_escapes() {
        let input = r#"<TS language="da"><context><name>C</name>
<message><source>  a &amp; b&#x21;<byte value="x9"/>c </source><translation><![CDATA[<x>]]></translation></message>
</context></TS>"#;
        let document = parse(input).expect("parse");
        let message = &document.contexts[0].messages[0];
        assert_eq!(message.source, "  a & b!\tc ");
        assert_eq!(message.translation, Translation::Single(Form::new("<x>")));
    }

    #[test]
    fn length_variants_are_collected() {
        let input = r#"<TS language="da"><context><name>C</name>
<message><source>Preferences</source>
<translation variants="yes"><lengthvariant>Indstillinger</lengthvariant><lengthvariant>Indst.</lengthvariant></translation>
</message></context></TS>"#;
        let document = parse(input).expect("parse");
        match &document.contexts[0].messages[0].translation {
            Translation::Single(form) => {
                assert_eq!(form.text(), "Indstillinger");
                assert_eq!(form.length_variants().len(), 2);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn missing_language_is_rejected() {
        let error = parse("<TS version=\"2.1\"></TS>").unwrap_err();
        assert!(matches!(
            error.kind(),
            ParseErrorKind::MissingAttribute {
                attribute: "language",
                ..
            }
        ));
    }

    #[test]
    fn missing_source_reports_context() {
        let input = "<TS language=\"da\"><context><name>Ctx</name>\n<message><translation>x</translation></message></context></TS>";
        let error = parse(input).unwrap_err();
        assert!(matches!(
            error.kind(),
            ParseErrorKind::MissingElement {
                element: "source",
                ..
            }
        ));
        assert_eq!(error.context(), Some("Ctx"));
        assert_eq!(error.line(), Some(2));
    }

    #[test]
    fn duplicate_key_is_rejected_with_location() {
        let input = r#"<TS language="da">
<context><name>QMessageBox</name>
<message><source>OK</source><translation>A</translation></message>
<message><source>OK</source><translation>B</translation></message>
</context></TS>"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error.kind(), ParseErrorKind::DuplicateMessage));
        assert_eq!(error.context(), Some("QMessageBox"));
        assert_eq!(error.message(), Some("OK"));
        assert_eq!(error.line(), Some(4));
    }

    #[test]
    fn duplicate_detection_spans_repeated_context_blocks() {
        let input = r#"<TS language="da">
<context><name>A</name><message><source>OK</source><translation/></message></context>
<context><name>A</name><message><source>OK</source><translation/></message></context>
</TS>"#;
        assert!(matches!(
            parse(input).unwrap_err().kind(),
            ParseErrorKind::DuplicateMessage
        ));
    }

    #[test]
    fn same_source_with_different_disambiguation_is_allowed() {
        let input = r#"<TS language="da"><context><name>A</name>
<message><source>Open</source><comment>verb</comment><translation>Åbn</translation></message>
<message><source>Open</source><comment>adjective</comment><translation>Åben</translation></message>
</context></TS>"#;
        assert_eq!(parse(input).expect("parse").contexts[0].messages.len(), 2);
    }

    #[test]
    fn plural_form_count_must_match_locale() {
        let input = r#"<TS language="cs_CZ"><context><name>A</name>
<message numerus="yes"><source>%n file(s)</source>
<translation><numerusform>%n soubor</numerusform><numerusform>%n soubory</numerusform></translation>
</message></context></TS>"#;
        let error = parse(input).unwrap_err();
        match error.kind() {
            ParseErrorKind::PluralFormCount {
                expected, found, ..
            } => {
                assert_eq!(*expected, 3);
                assert_eq!(*found, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(error.message(), Some("%n file(s)"));
    }

    #[test]
    fn plural_rule_comes_from_provider() {
        let input = r#"<TS language="xx"><context><name>A</name>
<message numerus="yes"><source>%n item(s)</source>
<translation><numerusform>one</numerusform><numerusform>many</numerusform></translation>
</message></context></TS>"#;
        let provider = FixedPluralRules::new().with_rule("xx", FixedPluralRule::one_other());
        let parsed = parse_ts(input, &provider).expect("parse");
        assert_eq!(parsed.plural_rule.cardinality(), 2);
    }

    #[test]
    fn unknown_elements_and_status_are_rejected() {
        let unknown = "<TS language=\"da\"><context><name>A</name><bogus/></context></TS>";
        assert!(matches!(
            parse(unknown).unwrap_err().kind(),
            ParseErrorKind::UnexpectedElement { parent: "context", .. }
        ));

        let status = "<TS language=\"da\"><context><name>A</name><message><source>x</source><translation type=\"fuzzy\">y</translation></message></context></TS>";
        assert!(matches!(
            parse(status).unwrap_err().kind(),
            ParseErrorKind::InvalidStatus(_)
        ));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let input = "<TS language=\"da\"><context><name>A</name></TS>";
        assert!(matches!(
            parse(input).unwrap_err().kind(),
            ParseErrorKind::Xml(_)
        ));
    }

    #[test]
    fn dependencies_and_extras_are_kept() {
        let input = r#"<TS language="da">
<dependencies><dependency catalog="qtbase_da"/></dependencies>
<context><name>A</name><message id="msg.ok"><source>x</source><extra-po-flags>c-format</extra-po-flags><translation>y</translation></message></context>
</TS>"#;
        let document = parse(input).expect("parse");
        assert_eq!(document.dependencies, vec!["qtbase_da".to_string()]);
        let message = &document.contexts[0].messages[0];
        assert_eq!(message.id.as_deref(), Some("msg.ok"));
        assert_eq!(
            message.extras,
            vec![ExtraField {
                name: "po-flags".into(),
                value: "c-format".into()
            }]
        );
    }

    #[test]
    fn declared_encoding_is_honored() {
        let input: &[u8] = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>\n\
<TS language=\"da\"><context><name>C</name>\n\
<message><location filename=\"p\xE6.cpp\"/><source>Pears</source><translation>P\xE6rer</translation></message>\n\
<message><source>Cabbage</source><translation><![CDATA[R\xF8dk\xE5l]]></translation></message>\n\
</context></TS>\n";

        let parsed = parse_ts_bytes(input, &LinguistPluralRules::new()).expect("parse");
        let messages = &parsed.document.contexts[0].messages;
        assert_eq!(messages[0].locations[0].filename.as_deref(), Some("p\u{e6}.cpp"));
        assert_eq!(messages[0].translation, Translation::Single(Form::new("P\u{e6}rer")));
        assert_eq!(messages[1].translation, Translation::Single(Form::new("R\u{f8}dk\u{e5}l")));
    }

    #[test]
    fn error_lines_stay_correct_in_large_documents() {
        let count = 20_000;
        let mut input = String::from("<TS language=\"da\">\n<context><name>Big</name>\n");
        for index in 0..count {
            writeln!(
                input,
                "<message><source>Item {index}</source><translation>Emne {index}</translation></message>"
            )
            .expect("write");
        }
        input.push_str("<message><source>Item 0</source><translation>igen</translation></message>\n");
        input.push_str("</context></TS>\n");

        let started = Instant::now();
        let error = parse(&input).unwrap_err();
        assert!(matches!(error.kind(), ParseErrorKind::DuplicateMessage));
        assert_eq!(error.line(), Some(count + 3));
        assert!(
            started.elapsed() < Duration::from_secs(15),
            "parse took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn decodes_byte_values() {
        assert_eq!(decode_byte("x9"), Some('\t'));
        assert_eq!(decode_byte("27"), Some('\u{1b}'));
        assert_eq!(decode_byte("zz"), None);
    }
}
