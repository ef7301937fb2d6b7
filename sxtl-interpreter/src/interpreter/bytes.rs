use ordered_float::OrderedFloat;

use sxtl_ast::Span;

use crate::constant::Constant;
use crate::error::{Error, RenderResult};
use crate::function::Function;

use super::program::FORMAT_VERSION;
use super::Program;

const MAGIC: &[u8; 4] = b"SXTL";

const TAG_NONE: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_STR: u8 = 5;

impl Program {
    /// Serialize the program into its portable binary form.
    ///
    /// The layout is the magic `SXTL`, the u16 format version, the constant
    /// pool, the name table and the function table, all little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&self.version().to_le_bytes());

        write_len(&mut bytes, self.constants.len());
        for constant in &self.constants {
            match constant {
                Constant::None => bytes.push(TAG_NONE),
                Constant::Bool(false) => bytes.push(TAG_FALSE),
                Constant::Bool(true) => bytes.push(TAG_TRUE),
                Constant::Int(i) => {
                    bytes.push(TAG_INT);
                    bytes.extend_from_slice(&i.to_le_bytes());
                }
                Constant::Float(f) => {
                    bytes.push(TAG_FLOAT);
                    bytes.extend_from_slice(&f.0.to_bits().to_le_bytes());
                }
                Constant::Str(s) => {
                    bytes.push(TAG_STR);
                    write_str(&mut bytes, s);
                }
            }
        }

        write_len(&mut bytes, self.names.len());
        for name in &self.names {
            write_str(&mut bytes, name);
        }

        write_len(&mut bytes, self.functions.len());
        for function in &self.functions {
            write_str(&mut bytes, &function.name);
            bytes.extend_from_slice(&(function.params.len() as u16).to_le_bytes());
            for param in &function.params {
                bytes.extend_from_slice(&param.to_le_bytes());
            }
            write_len(&mut bytes, function.chunk.len());
            bytes.extend_from_slice(&function.chunk);
            for span in &function.spans {
                bytes.extend_from_slice(&(span.start as u32).to_le_bytes());
                bytes.extend_from_slice(&(span.end as u32).to_le_bytes());
            }
        }
        bytes
    }

    /// Load a program from its binary form and validate it.
    ///
    /// A program of another format version is rejected with
    /// `VersionMismatch`; anything malformed with `InvalidProgram`.
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Program> {
        let mut reader = Reader { bytes, position: 0 };
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(Error::InvalidProgram.into());
        }
        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                found: version,
                min: FORMAT_VERSION,
                max: FORMAT_VERSION,
            }
            .into());
        }
        let mut program = Program::with_version(version);

        let count = reader.len()?;
        for _ in 0..count {
            let constant = match reader.u8()? {
                TAG_NONE => Constant::None,
                TAG_FALSE => Constant::Bool(false),
                TAG_TRUE => Constant::Bool(true),
                TAG_INT => Constant::Int(i64::from_le_bytes(reader.array()?)),
                TAG_FLOAT => Constant::Float(OrderedFloat(f64::from_bits(u64::from_le_bytes(
                    reader.array()?,
                )))),
                TAG_STR => Constant::Str(reader.str()?),
                _ => return Err(Error::InvalidProgram.into()),
            };
            program.constants.push(constant);
        }

        let count = reader.len()?;
        for _ in 0..count {
            program.names.push(reader.str()?);
        }

        let count = reader.len()?;
        for _ in 0..count {
            let mut function = Function::new(reader.str()?);
            let params = reader.u16()?;
            for _ in 0..params {
                function.params.push(reader.u16()?);
            }
            let len = reader.len()?;
            function.chunk = reader.take(len)?.to_vec();
            for _ in 0..len {
                let start = reader.u32()? as usize;
                let end = reader.u32()? as usize;
                function.spans.push(Span::from(start..end));
            }
            program.functions.push(function);
        }

        if reader.position != bytes.len() {
            return Err(Error::InvalidProgram.into());
        }
        program.validate()?;
        Ok(program)
    }
}

fn write_len(bytes: &mut Vec<u8>, len: usize) {
    bytes.extend_from_slice(&(len as u32).to_le_bytes());
}

fn write_str(bytes: &mut Vec<u8>, s: &str) {
    write_len(bytes, s.len());
    bytes.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> RenderResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Error::InvalidProgram)?;
        let taken = &self.bytes[self.position..end];
        self.position = end;
        Ok(taken)
    }

    fn array<const N: usize>(&mut self) -> RenderResult<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn u8(&mut self) -> RenderResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> RenderResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> RenderResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn len(&mut self) -> RenderResult<usize> {
        Ok(self.u32()? as usize)
    }

    fn str(&mut self) -> RenderResult<String> {
        let len = self.len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidProgram.into())
    }
}
