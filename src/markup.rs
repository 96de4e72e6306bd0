//! XML descriptor parsing into an order-preserving JSON tree.
//!
//! Elements become objects keyed by child tag and attribute name; a tag that
//! repeats among siblings collapses into an array. Leaf elements without
//! attributes become plain strings, and text next to attributes or children is
//! kept under [`TEXT_KEY`]. The root object holds a single key, the document
//! element's name, so `tree["RUN_SET"]["RUN"]` reads like the source document.

use std::io::{BufReader, Read};

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::EgaError;

pub const TEXT_KEY: &str = "$text";

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart, decoder: Decoder) -> Result<Self, EgaError> {
        let name = decode_name(decoder, start.name().as_ref())?;
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| markup_error(quick_xml::Error::from(err)))?;
            let key = decode_name(decoder, attr.key.as_ref())?;
            let value = attr
                .decode_and_unescape_value(decoder)
                .map_err(markup_error)?;
            insert_child(&mut fields, key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Element {
            name,
            mut fields,
            text,
        } = self;
        if fields.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        (name, Value::Object(fields))
    }
}

/// Parses one XML document. The reader is only read, never closed, so a
/// borrowed tar entry can be passed as `&mut entry`. Input is decoded with
/// the encoding named in the XML declaration, UTF-8 when there is none.
pub fn parse_markup<R: Read>(input: R) -> Result<Value, EgaError> {
    let mut reader = Reader::from_reader(BufReader::new(input));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Map<String, Value>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(Element::open(e, reader.decoder())?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = Element::open(e, reader.decoder())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(ref e)) => {
                let element = stack.pop().ok_or_else(|| {
                    malformed(format!(
                        "closing tag </{}> without an open element",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(markup_error)?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| malformed(err.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(markup_error(err)),
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.map(Value::Object)
        .ok_or_else(|| malformed("document has no root element"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Map<String, Value>>,
    element: Element,
) -> Result<(), EgaError> {
    let (name, value) = element.close();
    match stack.last_mut() {
        Some(parent) => {
            insert_child(&mut parent.fields, name, value);
            Ok(())
        }
        None if root.is_none() => {
            let mut document = Map::new();
            document.insert(name, value);
            *root = Some(document);
            Ok(())
        }
        None => Err(malformed(format!("second document element <{name}>"))),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), EgaError> {
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if is_blank(text) => Ok(()),
        None => Err(malformed(format!(
            "text outside the document element: {text:?}"
        ))),
    }
}

fn insert_child(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|ch| ch.is_whitespace() || ch == '\u{feff}')
}

fn decode_name(decoder: Decoder, raw: &[u8]) -> Result<String, EgaError> {
    decoder
        .decode(raw)
        .map(|name| name.into_owned())
        .map_err(|err| malformed(format!("cannot decode tag or attribute name: {err}")))
}

fn markup_error(err: quick_xml::Error) -> EgaError {
    EgaError::MalformedMarkup(err.to_string())
}

fn malformed(message: impl Into<String>) -> EgaError {
    EgaError::MalformedMarkup(message.into())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    const RUN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<RUN_SET xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <RUN alias="run-1" accession="ERR000001" run_date="2012-03-01T00:00:00">
    <TITLE>Paired &amp; sorted</TITLE>
    <EXPERIMENT_REF accession="ERX000001"/>
    <DATA_BLOCK>
      <FILES>
        <FILE filename="a.bam" filetype="bam" checksum="abc"/>
        <FILE filename="a.bai" filetype="bai" checksum="def"/>
      </FILES>
    </DATA_BLOCK>
  </RUN>
</RUN_SET>"#;

    #[test]
    fn parses_nested_descriptor() {
        let tree = parse_markup(RUN_XML.as_bytes()).unwrap();
        let run = &tree["RUN_SET"]["RUN"];

        assert_eq!(run["accession"], "ERR000001");
        assert_eq!(run["TITLE"], "Paired & sorted");
        assert_eq!(run["EXPERIMENT_REF"], json!({ "accession": "ERX000001" }));
        assert_eq!(run["DATA_BLOCK"]["FILES"]["FILE"].as_array().unwrap().len(), 2);
        assert_eq!(run["DATA_BLOCK"]["FILES"]["FILE"][1]["filetype"], "bai");
    }

    #[test]
    fn keeps_document_order() {
        let tree = parse_markup(RUN_XML.as_bytes()).unwrap();
        let keys: Vec<&str> = tree["RUN_SET"]["RUN"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["alias", "accession", "run_date", "TITLE", "EXPERIMENT_REF", "DATA_BLOCK"]
        );
    }

    #[test]
    fn text_next_to_attributes_uses_text_key() {
        let tree = parse_markup(r#"<A><B unit="s">60</B><C/><D><![CDATA[x < y]]></D></A>"#.as_bytes())
            .unwrap();
        assert_eq!(tree["A"]["B"], json!({ "unit": "s", "$text": "60" }));
        assert_eq!(tree["A"]["C"], "");
        assert_eq!(tree["A"]["D"], "x < y");
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = parse_markup("<A><B></A></B>".as_bytes()).unwrap_err();
        assert_matches!(err, EgaError::MalformedMarkup(_));
    }

    #[test]
    fn rejects_unclosed_document() {
        let err = parse_markup("<A><B>text</B>".as_bytes()).unwrap_err();
        assert_matches!(err, EgaError::MalformedMarkup(_));
    }

    #[test]
    fn rejects_invalid_utf8_text() {
        let mut bytes = b"<A>".to_vec();
        bytes.extend_from_slice(&[0xC3, 0x28, 0xA0]);
        bytes.extend_from_slice(b"</A>");
        let err = parse_markup(bytes.as_slice()).unwrap_err();
        assert_matches!(err, EgaError::MalformedMarkup(_));
    }

    #[test]
    fn decodes_declared_latin1() {
        let bytes: &[u8] =
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><SAMPLE title=\"gar\xe7on\"><TITLE>caf\xe9</TITLE></SAMPLE>";
        let tree = parse_markup(bytes).unwrap();
        assert_eq!(tree["SAMPLE"]["title"], "gar\u{e7}on");
        assert_eq!(tree["SAMPLE"]["TITLE"], "caf\u{e9}");
    }

    #[test]
    fn rejects_empty_and_multi_root_documents() {
        assert_matches!(
            parse_markup("   ".as_bytes()),
            Err(EgaError::MalformedMarkup(_))
        );
        assert_matches!(
            parse_markup("<A/><B/>".as_bytes()),
            Err(EgaError::MalformedMarkup(_))
        );
    }
}
