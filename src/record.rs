//! Tab-delimited alignment records (SAM text format).
//!
//! A record is eleven mandatory columns followed by any number of
//! `TAG:TYPE:VALUE` optional fields. Parsing keeps the original optional-field
//! text next to the decoded value, so [`AlignmentRecord::to_line`] reproduces
//! the input exactly.

use crate::error::ParseError;
use crate::types::{MappingQuality, Position};
use std::fmt;

/// Lines starting with this character are headers and never reach feature extraction.
pub const HEADER_SENTINEL: char = '@';

pub const MANDATORY_FIELDS: usize = 11;

/// Flag bit marking a record that was not placed on the reference.
pub const FLAG_UNMAPPED: u16 = 0x4;

pub fn is_header(line: &str) -> bool {
    line.starts_with(HEADER_SENTINEL)
}

/// Decoded payload of an optional field, selected by its type code.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `A` (single character) and `Z` (string).
    Text(String),
    /// `i`
    Integer(i64),
    /// `f`
    Float(f64),
    /// `H`, hex digits decoded to bytes.
    Bytes(Vec<u8>),
    /// `B`, a subtype letter followed by a comma-separated list.
    NumericArray { subtype: char, values: Vec<f64> },
}

impl FieldValue {
    fn decode(type_code: char, raw: &str) -> Option<Self> {
        match type_code {
            'A' | 'Z' => Some(Self::Text(raw.to_string())),
            'i' => raw.parse().ok().map(Self::Integer),
            'f' => raw.parse().ok().map(Self::Float),
            'H' => decode_hex(raw).map(Self::Bytes),
            'B' => decode_array(raw),
            _ => None,
        }
    }

    fn encode(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bytes(bytes) => bytes.iter().map(|b| format!("{b:02X}")).collect(),
            Self::NumericArray { subtype, values } => {
                let mut out = subtype.to_string();
                for v in values {
                    out.push(',');
                    out.push_str(&v.to_string());
                }
                out
            }
        }
    }
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| raw.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

fn decode_array(raw: &str) -> Option<FieldValue> {
    let mut pieces = raw.split(',');
    let mut subtype_chars = pieces.next()?.chars();
    let subtype = subtype_chars.next()?;
    if subtype_chars.next().is_some() || !subtype.is_ascii_alphabetic() {
        return None;
    }
    let values = pieces
        .map(|v| v.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some(FieldValue::NumericArray { subtype, values })
}

/// One `TAG:TYPE:VALUE` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionalField {
    pub tag: String,
    pub type_code: char,
    pub value: FieldValue,
    raw: String,
}

impl OptionalField {
    pub fn new(tag: impl Into<String>, type_code: char, value: FieldValue) -> Self {
        let raw = value.encode();
        Self {
            tag: tag.into(),
            type_code,
            value,
            raw,
        }
    }

    fn parse(field: &str) -> Result<Self, ParseError> {
        let mut parts = field.splitn(3, ':');
        let (Some(tag), Some(type_code), Some(raw)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::MalformedOptionalField(field.to_string()));
        };
        let mut code_chars = type_code.chars();
        let code = match (code_chars.next(), code_chars.next()) {
            (Some(c), None) if matches!(c, 'A' | 'Z' | 'i' | 'f' | 'H' | 'B') => c,
            _ => {
                return Err(ParseError::UnknownFieldType {
                    type_code: type_code.to_string(),
                    field: field.to_string(),
                });
            }
        };
        let value = FieldValue::decode(code, raw).ok_or_else(|| ParseError::InvalidFieldValue {
            type_code: code,
            field: field.to_string(),
        })?;
        Ok(Self {
            tag: tag.to_string(),
            type_code: code,
            value,
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for OptionalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tag, self.type_code, self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub qname: String,
    pub flag: u16,
    pub rname: String,
    pub pos: Position,
    pub mapq: MappingQuality,
    pub cigar: String,
    pub rnext: String,
    pub pnext: Position,
    pub tlen: i64,
    pub seq: String,
    pub qual: String,
    /// Kept in input order.
    pub optional: Vec<OptionalField>,
}

impl AlignmentRecord {
    /// Parse one line; a trailing `\n` or `\r\n` is ignored.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let pieces: Vec<&str> = line.split('\t').collect();
        if pieces.len() < MANDATORY_FIELDS {
            return Err(ParseError::TooFewFields {
                found: pieces.len(),
                expected: MANDATORY_FIELDS,
            });
        }

        let seq = pieces[9];
        let qual = pieces[10];
        if seq != "*" && qual != "*" && seq.len() != qual.len() {
            return Err(ParseError::LengthMismatch {
                sequence: seq.len(),
                quality: qual.len(),
            });
        }

        let optional = pieces[MANDATORY_FIELDS..]
            .iter()
            .map(|field| OptionalField::parse(field))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            qname: pieces[0].to_string(),
            flag: parse_number(pieces[1], "FLAG")?,
            rname: pieces[2].to_string(),
            pos: parse_number(pieces[3], "POS")?,
            mapq: parse_number(pieces[4], "MAPQ")?,
            cigar: pieces[5].to_string(),
            rnext: pieces[6].to_string(),
            pnext: parse_number(pieces[7], "PNEXT")?,
            tlen: parse_number(pieces[8], "TLEN")?,
            seq: seq.to_string(),
            qual: qual.to_string(),
            optional,
        })
    }

    pub fn is_unmapped(&self) -> bool {
        self.flag & FLAG_UNMAPPED != 0
    }

    pub fn optional_field(&self, tag: &str) -> Option<&FieldValue> {
        self.optional
            .iter()
            .find(|field| field.tag == tag)
            .map(|field| &field.value)
    }

    /// Serialize without a trailing newline.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AlignmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qname,
            self.flag,
            self.rname,
            self.pos,
            self.mapq,
            self.cigar,
            self.rnext,
            self.pnext,
            self.tlen,
            self.seq,
            self.qual
        )?;
        for field in &self.optional {
            write!(f, "\t{field}")?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &'static str) -> Result<T, ParseError> {
    raw.parse().map_err(|_| ParseError::InvalidField {
        field,
        value: raw.to_string(),
    })
}
