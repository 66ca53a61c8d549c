use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io;
use thiserror::Error;

use crate::model::{Context, Form, Message, Translation, TsDocument};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to encode TS document: {0}")]
    XmlEncode(#[from] quick_xml::Error),
    #[error("encoded TS document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a document in the layout the Linguist tools produce.
/// （以 Linguist 工具的格式序列化文件。）
pub fn write_ts<W: io::Write>(document: &TsDocument, out: W) -> Result<(), WriteError> {
    let mut writer = Writer::new_with_indent(out, b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped("TS")))?;

    let mut root = BytesStart::new("TS");
    if let Some(version) = &document.version {
        root.push_attribute(("version", version.as_str()));
    }
    root.push_attribute(("language", document.language.as_str()));
    if let Some(source_language) = &document.source_language {
        root.push_attribute(("sourcelanguage", source_language.as_str()));
    }
    writer.write_event(Event::Start(root))?;

    if !document.dependencies.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("dependencies")))?;
        for catalog in &document.dependencies {
            let mut dependency = BytesStart::new("dependency");
            dependency.push_attribute(("catalog", catalog.as_str()));
            writer.write_event(Event::Empty(dependency))?;
        }
        writer.write_event(Event::End(BytesEnd::new("dependencies")))?;
    }

    for context in &document.contexts {
        write_context(&mut writer, context)?;
    }

    writer.write_event(Event::End(BytesEnd::new("TS")))?;
    writer.get_mut().write_all(b"\n").map_err(quick_xml::Error::from)?;
    Ok(())
}

pub fn to_ts_string(document: &TsDocument) -> Result<String, WriteError> {
    let mut buffer = Vec::new();
    write_ts(document, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn write_context<W: io::Write>(writer: &mut Writer<W>, context: &Context) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new("context")))?;
    write_text_element(writer, "name", &context.name)?;
    if let Some(comment) = &context.comment {
        write_text_element(writer, "comment", comment)?;
    }
    for message in &context.messages {
        write_message(writer, message)?;
    }
    writer.write_event(Event::End(BytesEnd::new("context")))?;
    Ok(())
}

fn write_message<W: io::Write>(writer: &mut Writer<W>, message: &Message) -> Result<(), WriteError> {
    let mut start = BytesStart::new("message");
    if let Some(id) = &message.id {
        start.push_attribute(("id", id.as_str()));
    }
    if message.is_numerus() {
        start.push_attribute(("numerus", "yes"));
    }
    writer.write_event(Event::Start(start))?;

    for location in &message.locations {
        let mut element = BytesStart::new("location");
        if let Some(filename) = &location.filename {
            element.push_attribute(("filename", filename.as_str()));
        }
        if let Some(line) = &location.line {
            element.push_attribute(("line", line.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
    }

    write_text_element(writer, "source", &message.source)?;
    let optional = [
        ("oldsource", &message.old_source),
        ("comment", &message.disambiguation),
        ("oldcomment", &message.old_disambiguation),
        ("extracomment", &message.extra_comment),
        ("translatorcomment", &message.translator_comment),
    ];
    for (element, value) in optional {
        if let Some(value) = value {
            write_text_element(writer, element, value)?;
        }
    }

    let mut translation = BytesStart::new("translation");
    if let Some(kind) = message.status.type_attr() {
        translation.push_attribute(("type", kind));
    }
    match &message.translation {
        Translation::Single(form) => write_form(writer, translation, "translation", form)?,
        Translation::Plural(forms) => {
            writer.write_event(Event::Start(translation))?;
            for form in forms.iter() {
                write_form(writer, BytesStart::new("numerusform"), "numerusform", form)?;
            }
            writer.write_event(Event::End(BytesEnd::new("translation")))?;
        }
    }

    for extra in &message.extras {
        let element = format!("extra-{}", extra.name);
        write_text_element(writer, &element, &extra.value)?;
    }

    writer.write_event(Event::End(BytesEnd::new("message")))?;
    Ok(())
}

fn write_form<W: io::Write>(
    writer: &mut Writer<W>,
    mut start: BytesStart<'_>,
    element: &str,
    form: &Form,
) -> Result<(), WriteError> {
    if !form.has_variants() {
        writer.write_event(Event::Start(start))?;
        write_inline_text(writer, form.text())?;
        writer.write_event(Event::End(BytesEnd::new(element)))?;
        return Ok(());
    }
    start.push_attribute(("variants", "yes"));
    writer.write_event(Event::Start(start))?;
    for variant in form.length_variants() {
        write_text_element(writer, "lengthvariant", variant)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    element: &str,
    text: &str,
) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new(element)))?;
    write_inline_text(writer, text)?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

/// Writes element content without indentation, escaping control characters as `<byte>`.
///
/// Every `<byte>` is followed by a (possibly empty) text event so the writer
/// does not indent the closing tag into the content.
fn write_inline_text<W: io::Write>(writer: &mut Writer<W>, text: &str) -> Result<(), WriteError> {
    let mut rest = text;
    while let Some(position) = rest.find(needs_byte_escape) {
        writer.write_event(Event::Text(BytesText::new(&rest[..position])))?;
        let Some(control) = rest[position..].chars().next() else {
            break;
        };
        let mut byte = BytesStart::new("byte");
        let value = format!("x{:x}", u32::from(control));
        byte.push_attribute(("value", value.as_str()));
        writer.write_event(Event::Empty(byte))?;
        rest = &rest[position + control.len_utf8()..];
    }
    writer.write_event(Event::Text(BytesText::new(rest)))?;
    Ok(())
}

fn needs_byte_escape(ch: char) -> bool {
    ch.is_control() && !matches!(ch, '\t' | '\n' | '\r') && u32::from(ch) < 0x20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, MessageStatus, PluralForms};

    fn sample() -> TsDocument {
        let mut document = TsDocument::new("cs_CZ");
        document.version = Some("2.1".into());
        let mut context = Context::new("QFileDialog");
        let mut single = Message::new("Hide %1", Translation::Single(Form::new("Skrýt %1")));
        single.locations.push(Location {
            filename: Some("qfiledialog.cpp".into()),
            line: Some("+12".into()),
        });
        context.messages.push(single);
        let mut plural = Message::new(
            "%n file(s)",
            Translation::Plural(PluralForms::new(vec![
                Form::new("%n soubor"),
                Form::new("%n soubory"),
                Form::new(""),
            ])),
        );
        plural.status = MessageStatus::Unfinished;
        context.messages.push(plural);
        document.contexts.push(context);
        document
    }

    #[test]
    fn writes_header_and_structure() {
        let xml = to_ts_string(&sample()).expect("serialize");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<!DOCTYPE TS>"));
        assert!(xml.contains("<TS version=\"2.1\" language=\"cs_CZ\">"));
        assert!(xml.contains("<location filename=\"qfiledialog.cpp\" line=\"+12\"/>"));
        assert!(xml.contains("<source>Hide %1</source>"));
        assert!(xml.contains("<message numerus=\"yes\">"));
        assert!(xml.contains("<translation type=\"unfinished\">"));
        assert!(xml.contains("<numerusform></numerusform>"));
        assert!(xml.ends_with("</TS>\n"));
    }

    #[test]
    fn empty_translation_stays_inline() {
        let mut document = TsDocument::new("da");
        let mut context = Context::new("QMessageBox");
        context
            .messages
            .push(Message::new("OK", Translation::Single(Form::new(""))));
        document.contexts.push(context);
        let xml = to_ts_string(&document).expect("serialize");
        assert!(xml.contains("<translation></translation>"));
    }

    #[test]
    fn control_characters_become_byte_elements() {
        let mut document = TsDocument::new("da");
        let mut context = Context::new("C");
        context
            .messages
            .push(Message::new("a\u{1}b", Translation::Single(Form::new("x"))));
        document.contexts.push(context);
        let xml = to_ts_string(&document).expect("serialize");
        assert!(xml.contains("<source>a<byte value=\"x1\"/>b</source>"));
    }

    #[test]
    fn markup_is_escaped() {
        let mut document = TsDocument::new("da");
        let mut context = Context::new("C");
        context.messages.push(Message::new(
            "<b>Bold</b> & more",
            Translation::Single(Form::new("<b>Fed</b> & mere")),
        ));
        document.contexts.push(context);
        let xml = to_ts_string(&document).expect("serialize");
        assert!(xml.contains("<source>&lt;b&gt;Bold&lt;/b&gt; &amp; more</source>"));
    }
}
