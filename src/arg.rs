//! Argument definitions - typed inputs and outputs of workflow nodes
//!
//! Every value a node consumes or produces is described by an [`ArgDef`].
//! Data types form a closed sum type:
//! - `Scalar`: String, Integer, Number, Boolean and the File family
//! - `Array`: homogeneous list of another data type
//! - `Object`: structured value whose fields live in `ArgDef::sub_args`
//!
//! The editor stores data types as string tags (`"Array_Object"`, `"File_Image"`, ...).
//! Tags are parsed once at the serde boundary; the rest of the crate only sees [`DataType`].

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

const ARRAY_PREFIX: &str = "Array_";
const FILE_PREFIX: &str = "File_";

/// Deserialize `null` as the type's default value.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Editor tags this crate does not know load as an untyped argument
pub(crate) fn lenient_data_type<'de, D>(deserializer: D) -> std::result::Result<Option<DataType>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(tag) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if tag.trim().is_empty() {
        return Ok(None);
    }
    match DataType::parse(&tag) {
        Ok(data_type) => Ok(Some(data_type)),
        Err(e) => {
            tracing::debug!("Treating argument as untyped: {}", e);
            Ok(None)
        }
    }
}

/// Sub-kinds of file values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Plain `File`
    Any,
    Default,
    Image,
    Ppt,
    Doc,
    Pdf,
    Txt,
    Zip,
    Excel,
    Video,
    Audio,
    Voice,
    Code,
    Svg,
}

impl FileKind {
    /// Tag suffix after `File_`, `None` for plain `File`
    fn suffix(&self) -> Option<&'static str> {
        match self {
            FileKind::Any => None,
            FileKind::Default => Some("Default"),
            FileKind::Image => Some("Image"),
            FileKind::Ppt => Some("PPT"),
            FileKind::Doc => Some("Doc"),
            FileKind::Pdf => Some("PDF"),
            FileKind::Txt => Some("Txt"),
            FileKind::Zip => Some("Zip"),
            FileKind::Excel => Some("Excel"),
            FileKind::Video => Some("Video"),
            FileKind::Audio => Some("Audio"),
            FileKind::Voice => Some("Voice"),
            FileKind::Code => Some("Code"),
            FileKind::Svg => Some("Svg"),
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        let kind = match suffix {
            "Default" => FileKind::Default,
            "Image" => FileKind::Image,
            "PPT" => FileKind::Ppt,
            "Doc" => FileKind::Doc,
            "PDF" => FileKind::Pdf,
            "Txt" => FileKind::Txt,
            "Zip" => FileKind::Zip,
            "Excel" => FileKind::Excel,
            "Video" => FileKind::Video,
            "Audio" => FileKind::Audio,
            "Voice" => FileKind::Voice,
            "Code" => FileKind::Code,
            "Svg" => FileKind::Svg,
            _ => return None,
        };
        Some(kind)
    }
}

/// Scalar value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    File(FileKind),
}

impl FromStr for ScalarKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "String" => Ok(ScalarKind::String),
            "Integer" => Ok(ScalarKind::Integer),
            "Number" => Ok(ScalarKind::Number),
            "Boolean" => Ok(ScalarKind::Boolean),
            "File" => Ok(ScalarKind::File(FileKind::Any)),
            other => other
                .strip_prefix(FILE_PREFIX)
                .and_then(FileKind::from_suffix)
                .map(ScalarKind::File)
                .ok_or_else(|| Error::InvalidDataType(s.to_string())),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => f.write_str("String"),
            ScalarKind::Integer => f.write_str("Integer"),
            ScalarKind::Number => f.write_str("Number"),
            ScalarKind::Boolean => f.write_str("Boolean"),
            ScalarKind::File(kind) => match kind.suffix() {
                Some(suffix) => write!(f, "{}{}", FILE_PREFIX, suffix),
                None => f.write_str("File"),
            },
        }
    }
}

/// Data type of an argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Scalar(ScalarKind),
    Array(Box<DataType>),
    /// Fields are carried by the owning `ArgDef::sub_args`
    Object,
}

impl DataType {
    pub fn string() -> Self {
        DataType::Scalar(ScalarKind::String)
    }

    pub fn integer() -> Self {
        DataType::Scalar(ScalarKind::Integer)
    }

    pub fn boolean() -> Self {
        DataType::Scalar(ScalarKind::Boolean)
    }

    pub fn array_of(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    /// Parse an editor tag such as `Array_File_Image`.
    ///
    /// A bare `Array_` prefix with nothing after it is an array of objects.
    pub fn parse(tag: &str) -> Result<Self> {
        if let Some(element) = tag.strip_prefix(ARRAY_PREFIX) {
            if element.is_empty() {
                return Ok(DataType::array_of(DataType::Object));
            }
            return Ok(DataType::array_of(DataType::parse(element)?));
        }
        if tag == "Object" {
            return Ok(DataType::Object);
        }
        Ok(DataType::Scalar(tag.parse()?))
    }

    /// Editor tag for this data type
    pub fn tag(&self) -> String {
        match self {
            DataType::Scalar(kind) => kind.to_string(),
            DataType::Array(element) => format!("{}{}", ARRAY_PREFIX, element.tag()),
            DataType::Object => "Object".to_string(),
        }
    }

    /// Element type when this is an array
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(_))
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataType::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// How an input obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindValueType {
    /// Literal typed by the user
    Input,
    /// Reference token pointing at an upstream output
    Reference,
}

/// Typed description of one input or output a node exposes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgDef {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_data_type")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "require", alias = "required", deserialize_with = "nullable")]
    pub required: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub system_variable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_value_type: Option<BindValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_value: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sub_args: Vec<ArgDef>,
    /// Type before the resolver rewrote it (aggregated loop outputs)
    #[serde(
        default,
        deserialize_with = "lenient_data_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_data_type: Option<DataType>,
}

impl ArgDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// A system-provided variable, never authored by the user
    pub fn system(name: impl Into<String>, data_type: DataType, description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            system_variable: true,
            ..Self::new(name, data_type)
        }
    }

    pub fn with_sub_args(mut self, sub_args: Vec<ArgDef>) -> Self {
        self.sub_args = sub_args;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Bind this arg to a reference token
    pub fn bound_to(mut self, token: impl Into<String>) -> Self {
        self.bind_value_type = Some(BindValueType::Reference);
        self.bind_value = Some(token.into());
        self
    }

    /// Bind this arg to a literal value
    pub fn with_literal(mut self, value: impl Into<String>) -> Self {
        self.bind_value_type = Some(BindValueType::Input);
        self.bind_value = Some(value.into());
        self
    }

    /// The bound reference token, if this arg is in Reference mode
    pub fn reference(&self) -> Option<&str> {
        match (self.bind_value_type, self.bind_value.as_deref()) {
            (Some(BindValueType::Reference), Some(token)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }

    /// Copy of this arg with its binding removed
    pub fn unbound(&self) -> Self {
        Self {
            bind_value_type: None,
            bind_value: None,
            ..self.clone()
        }
    }

    /// Look up a direct child by name
    pub fn sub_arg(&self, name: &str) -> Option<&ArgDef> {
        self.sub_args.iter().find(|a| a.name == name)
    }
}
