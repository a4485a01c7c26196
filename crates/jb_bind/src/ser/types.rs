//! Scalar leaf serializers.

use jb_json::JsonGenerator;
use time::OffsetDateTime;

use crate::bind::{AccessError, Bind};
use crate::desc::ScalarKind;
use crate::error::BindError;
use crate::format::{CompiledDateFormat, CompiledNumberFormat, DateOut};

use super::{ModelSerializer, SerializationContext};

fn scalar<'a, T: crate::bind::Described>(value: &'a dyn Bind) -> Result<&'a T, BindError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| AccessError::mismatch::<T>(value.type_path()).into())
}

// -----------------------------------------------------------------------------
// ScalarSerializer

/// Leaf step writing one scalar value.
///
/// The downcast performed is fixed by the [`ScalarKind`] at build time; a
/// mismatch at runtime means the descriptor lied about the object graph.
pub(super) struct ScalarSerializer {
    kind: ScalarKind,
    number_format: Option<CompiledNumberFormat>,
    date_format: CompiledDateFormat,
}

impl ScalarSerializer {
    pub(super) fn new(
        kind: ScalarKind,
        number_format: Option<CompiledNumberFormat>,
        date_format: CompiledDateFormat,
    ) -> Self {
        Self {
            kind,
            number_format,
            date_format,
        }
    }

    fn write_integer(
        &self,
        generator: &mut dyn JsonGenerator,
        signed: Option<i64>,
        unsigned: Option<u64>,
    ) -> Result<(), BindError> {
        if let Some(format) = &self.number_format {
            let as_float = signed
                .map(|v| v as f64)
                .or(unsigned.map(|v| v as f64))
                .unwrap_or_default();
            return Ok(generator.write_string(&format.format(as_float))?);
        }
        match (signed, unsigned) {
            (Some(value), _) => Ok(generator.write_i64(value)?),
            (_, Some(value)) => Ok(generator.write_u64(value)?),
            _ => Ok(()),
        }
    }

    fn write_float(
        &self,
        generator: &mut dyn JsonGenerator,
        value: f64,
    ) -> Result<(), BindError> {
        match &self.number_format {
            Some(format) => Ok(generator.write_string(&format.format(value))?),
            None => Ok(generator.write_f64(value)?),
        }
    }
}

impl ModelSerializer for ScalarSerializer {
    fn serialize(
        &self,
        value: &dyn Bind,
        generator: &mut dyn JsonGenerator,
        _ctx: &mut SerializationContext<'_>,
    ) -> Result<(), BindError> {
        match self.kind {
            ScalarKind::Bool => Ok(generator.write_bool(*scalar::<bool>(value)?)?),
            ScalarKind::I8 => {
                self.write_integer(generator, Some(i64::from(*scalar::<i8>(value)?)), None)
            }
            ScalarKind::I16 => {
                self.write_integer(generator, Some(i64::from(*scalar::<i16>(value)?)), None)
            }
            ScalarKind::I32 => {
                self.write_integer(generator, Some(i64::from(*scalar::<i32>(value)?)), None)
            }
            ScalarKind::I64 => self.write_integer(generator, Some(*scalar::<i64>(value)?), None),
            ScalarKind::I128 => Ok(generator.write_i128(*scalar::<i128>(value)?)?),
            ScalarKind::U8 => {
                self.write_integer(generator, None, Some(u64::from(*scalar::<u8>(value)?)))
            }
            ScalarKind::U16 => {
                self.write_integer(generator, None, Some(u64::from(*scalar::<u16>(value)?)))
            }
            ScalarKind::U32 => {
                self.write_integer(generator, None, Some(u64::from(*scalar::<u32>(value)?)))
            }
            ScalarKind::U64 => self.write_integer(generator, None, Some(*scalar::<u64>(value)?)),
            ScalarKind::U128 => Ok(generator.write_u128(*scalar::<u128>(value)?)?),
            ScalarKind::F32 => self.write_float(generator, f64::from(*scalar::<f32>(value)?)),
            ScalarKind::F64 => self.write_float(generator, *scalar::<f64>(value)?),
            ScalarKind::Char => {
                let mut buffer = [0_u8; 4];
                Ok(generator.write_string(scalar::<char>(value)?.encode_utf8(&mut buffer))?)
            }
            ScalarKind::String => Ok(generator.write_string(scalar::<String>(value)?)?),
            ScalarKind::DateTime => {
                match self.date_format.format(scalar::<OffsetDateTime>(value)?)? {
                    DateOut::Text(text) => Ok(generator.write_string(&text)?),
                    DateOut::Millis(millis) => Ok(generator.write_i64(millis)?),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Key rendering

/// Renders a scalar map key as an object member name.
pub(super) fn scalar_key_text(value: &dyn Bind, kind: ScalarKind) -> Result<String, BindError> {
    match kind {
        ScalarKind::Bool => Ok(scalar::<bool>(value)?.to_string()),
        ScalarKind::I8 => Ok(scalar::<i8>(value)?.to_string()),
        ScalarKind::I16 => Ok(scalar::<i16>(value)?.to_string()),
        ScalarKind::I32 => Ok(scalar::<i32>(value)?.to_string()),
        ScalarKind::I64 => Ok(scalar::<i64>(value)?.to_string()),
        ScalarKind::I128 => Ok(scalar::<i128>(value)?.to_string()),
        ScalarKind::U8 => Ok(scalar::<u8>(value)?.to_string()),
        ScalarKind::U16 => Ok(scalar::<u16>(value)?.to_string()),
        ScalarKind::U32 => Ok(scalar::<u32>(value)?.to_string()),
        ScalarKind::U64 => Ok(scalar::<u64>(value)?.to_string()),
        ScalarKind::U128 => Ok(scalar::<u128>(value)?.to_string()),
        ScalarKind::F32 => Ok(scalar::<f32>(value)?.to_string()),
        ScalarKind::F64 => Ok(scalar::<f64>(value)?.to_string()),
        ScalarKind::Char => Ok(scalar::<char>(value)?.to_string()),
        ScalarKind::String => Ok(scalar::<String>(value)?.clone()),
        ScalarKind::DateTime => Err(BindError::InvalidScalar {
            text: value.type_path().to_string(),
            target: "object member name",
        }),
    }
}
