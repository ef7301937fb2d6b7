use num_traits::FromPrimitive;

/// A decoded bytecode instruction.
///
/// Name operands index the program's name table, `Const` indexes the
/// constant pool and `Render` the function table. Jump displacements are
/// relative to the end of the jumping instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    Const(u16),
    LoadVar(u16),
    StoreVar(u16),
    DefaultVar(u16, i16),
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    // comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    // unary
    Not,
    Neg,
    List(u16),
    Attr(u16),
    Index,
    CallFn(u16, u8),
    Render(u16, u8),
    EmitText,
    EmitEscaped,
    Jump(i16),
    JumpIfFalse(i16),
    JumpIfTrue(i16),
    JumpIfFalseKeep(i16),
    JumpIfTrueKeep(i16),
    ScopeBegin,
    ScopeEnd,
    ForIterBegin,
    ForIterNext(u16, i16),
    ForIterEnd(i16),
    ForIterBreak(i16),
    Pop,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub(crate) enum EncodedInstruction {
    Const,
    LoadVar,
    StoreVar,
    DefaultVar,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Not,
    Neg,
    List,
    Attr,
    Index,
    CallFn,
    Render,
    EmitText,
    EmitEscaped,
    Jump,
    JumpIfFalse,
    JumpIfTrue,
    JumpIfFalseKeep,
    JumpIfTrueKeep,
    ScopeBegin,
    ScopeEnd,
    ForIterBegin,
    ForIterNext,
    ForIterEnd,
    ForIterBreak,
    Pop,
    Return,
}

impl Instruction {
    /// The encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Instruction::CallFn(..) | Instruction::Render(..) => 4,
            Instruction::DefaultVar(..) | Instruction::ForIterNext(..) => 5,
            Instruction::Const(_)
            | Instruction::LoadVar(_)
            | Instruction::StoreVar(_)
            | Instruction::List(_)
            | Instruction::Attr(_)
            | Instruction::Jump(_)
            | Instruction::JumpIfFalse(_)
            | Instruction::JumpIfTrue(_)
            | Instruction::JumpIfFalseKeep(_)
            | Instruction::JumpIfTrueKeep(_)
            | Instruction::ForIterEnd(_)
            | Instruction::ForIterBreak(_) => 3,
            _ => 1,
        }
    }

    /// The jump displacement of a jumping instruction.
    pub fn displacement(&self) -> Option<i16> {
        match self {
            Instruction::DefaultVar(_, displacement)
            | Instruction::Jump(displacement)
            | Instruction::JumpIfFalse(displacement)
            | Instruction::JumpIfTrue(displacement)
            | Instruction::JumpIfFalseKeep(displacement)
            | Instruction::JumpIfTrueKeep(displacement)
            | Instruction::ForIterNext(_, displacement)
            | Instruction::ForIterEnd(displacement)
            | Instruction::ForIterBreak(displacement) => Some(*displacement),
            _ => None,
        }
    }
}

/// The absolute target of a jump at `offset`, if it lands inside `0..len`.
pub fn jump_target(offset: usize, instruction: &Instruction, len: usize) -> Option<usize> {
    let displacement = instruction.displacement()?;
    let next = (offset + instruction.size()) as i64;
    let target = next + displacement as i64;
    if target < 0 || target as usize >= len {
        return None;
    }
    Some(target as usize)
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

fn read_i16(bytes: &[u8], at: usize) -> Option<i16> {
    Some(i16::from_le_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

/// Decode a single instruction from the start of the slice, with its size.
///
/// Returns `None` for an unknown opcode or truncated operands.
pub fn decode_instruction(bytes: &[u8]) -> Option<(Instruction, usize)> {
    let encoded_instruction = EncodedInstruction::from_u8(*bytes.first()?)?;
    let instruction = match encoded_instruction {
        EncodedInstruction::Const => Instruction::Const(read_u16(bytes, 1)?),
        EncodedInstruction::LoadVar => Instruction::LoadVar(read_u16(bytes, 1)?),
        EncodedInstruction::StoreVar => Instruction::StoreVar(read_u16(bytes, 1)?),
        EncodedInstruction::DefaultVar => {
            Instruction::DefaultVar(read_u16(bytes, 1)?, read_i16(bytes, 3)?)
        }
        EncodedInstruction::Add => Instruction::Add,
        EncodedInstruction::Sub => Instruction::Sub,
        EncodedInstruction::Mul => Instruction::Mul,
        EncodedInstruction::Div => Instruction::Div,
        EncodedInstruction::FloorDiv => Instruction::FloorDiv,
        EncodedInstruction::Mod => Instruction::Mod,
        EncodedInstruction::Eq => Instruction::Eq,
        EncodedInstruction::Ne => Instruction::Ne,
        EncodedInstruction::Lt => Instruction::Lt,
        EncodedInstruction::Le => Instruction::Le,
        EncodedInstruction::Gt => Instruction::Gt,
        EncodedInstruction::Ge => Instruction::Ge,
        EncodedInstruction::In => Instruction::In,
        EncodedInstruction::NotIn => Instruction::NotIn,
        EncodedInstruction::Not => Instruction::Not,
        EncodedInstruction::Neg => Instruction::Neg,
        EncodedInstruction::List => Instruction::List(read_u16(bytes, 1)?),
        EncodedInstruction::Attr => Instruction::Attr(read_u16(bytes, 1)?),
        EncodedInstruction::Index => Instruction::Index,
        EncodedInstruction::CallFn => Instruction::CallFn(read_u16(bytes, 1)?, *bytes.get(3)?),
        EncodedInstruction::Render => Instruction::Render(read_u16(bytes, 1)?, *bytes.get(3)?),
        EncodedInstruction::EmitText => Instruction::EmitText,
        EncodedInstruction::EmitEscaped => Instruction::EmitEscaped,
        EncodedInstruction::Jump => Instruction::Jump(read_i16(bytes, 1)?),
        EncodedInstruction::JumpIfFalse => Instruction::JumpIfFalse(read_i16(bytes, 1)?),
        EncodedInstruction::JumpIfTrue => Instruction::JumpIfTrue(read_i16(bytes, 1)?),
        EncodedInstruction::JumpIfFalseKeep => Instruction::JumpIfFalseKeep(read_i16(bytes, 1)?),
        EncodedInstruction::JumpIfTrueKeep => Instruction::JumpIfTrueKeep(read_i16(bytes, 1)?),
        EncodedInstruction::ScopeBegin => Instruction::ScopeBegin,
        EncodedInstruction::ScopeEnd => Instruction::ScopeEnd,
        EncodedInstruction::ForIterBegin => Instruction::ForIterBegin,
        EncodedInstruction::ForIterNext => {
            Instruction::ForIterNext(read_u16(bytes, 1)?, read_i16(bytes, 3)?)
        }
        EncodedInstruction::ForIterEnd => Instruction::ForIterEnd(read_i16(bytes, 1)?),
        EncodedInstruction::ForIterBreak => Instruction::ForIterBreak(read_i16(bytes, 1)?),
        EncodedInstruction::Pop => Instruction::Pop,
        EncodedInstruction::Return => Instruction::Return,
    };
    let size = instruction.size();
    Some((instruction, size))
}

/// Decode a whole chunk, with the offset of each instruction.
pub fn decode_instructions(bytes: &[u8]) -> Option<Vec<(usize, Instruction)>> {
    let mut instructions = Vec::new();
    let mut ip = 0;
    while ip < bytes.len() {
        let (instruction, instruction_size) = decode_instruction(&bytes[ip..])?;
        instructions.push((ip, instruction));
        ip += instruction_size;
    }
    Some(instructions)
}

pub fn encode_instruction(instruction: Instruction, bytes: &mut Vec<u8>) {
    let encoded = match &instruction {
        Instruction::Const(_) => EncodedInstruction::Const,
        Instruction::LoadVar(_) => EncodedInstruction::LoadVar,
        Instruction::StoreVar(_) => EncodedInstruction::StoreVar,
        Instruction::DefaultVar(..) => EncodedInstruction::DefaultVar,
        Instruction::Add => EncodedInstruction::Add,
        Instruction::Sub => EncodedInstruction::Sub,
        Instruction::Mul => EncodedInstruction::Mul,
        Instruction::Div => EncodedInstruction::Div,
        Instruction::FloorDiv => EncodedInstruction::FloorDiv,
        Instruction::Mod => EncodedInstruction::Mod,
        Instruction::Eq => EncodedInstruction::Eq,
        Instruction::Ne => EncodedInstruction::Ne,
        Instruction::Lt => EncodedInstruction::Lt,
        Instruction::Le => EncodedInstruction::Le,
        Instruction::Gt => EncodedInstruction::Gt,
        Instruction::Ge => EncodedInstruction::Ge,
        Instruction::In => EncodedInstruction::In,
        Instruction::NotIn => EncodedInstruction::NotIn,
        Instruction::Not => EncodedInstruction::Not,
        Instruction::Neg => EncodedInstruction::Neg,
        Instruction::List(_) => EncodedInstruction::List,
        Instruction::Attr(_) => EncodedInstruction::Attr,
        Instruction::Index => EncodedInstruction::Index,
        Instruction::CallFn(..) => EncodedInstruction::CallFn,
        Instruction::Render(..) => EncodedInstruction::Render,
        Instruction::EmitText => EncodedInstruction::EmitText,
        Instruction::EmitEscaped => EncodedInstruction::EmitEscaped,
        Instruction::Jump(_) => EncodedInstruction::Jump,
        Instruction::JumpIfFalse(_) => EncodedInstruction::JumpIfFalse,
        Instruction::JumpIfTrue(_) => EncodedInstruction::JumpIfTrue,
        Instruction::JumpIfFalseKeep(_) => EncodedInstruction::JumpIfFalseKeep,
        Instruction::JumpIfTrueKeep(_) => EncodedInstruction::JumpIfTrueKeep,
        Instruction::ScopeBegin => EncodedInstruction::ScopeBegin,
        Instruction::ScopeEnd => EncodedInstruction::ScopeEnd,
        Instruction::ForIterBegin => EncodedInstruction::ForIterBegin,
        Instruction::ForIterNext(..) => EncodedInstruction::ForIterNext,
        Instruction::ForIterEnd(_) => EncodedInstruction::ForIterEnd,
        Instruction::ForIterBreak(_) => EncodedInstruction::ForIterBreak,
        Instruction::Pop => EncodedInstruction::Pop,
        Instruction::Return => EncodedInstruction::Return,
    };
    bytes.push(encoded as u8);
    match instruction {
        Instruction::Const(index)
        | Instruction::LoadVar(index)
        | Instruction::StoreVar(index)
        | Instruction::List(index)
        | Instruction::Attr(index) => bytes.extend_from_slice(&index.to_le_bytes()),
        Instruction::DefaultVar(index, displacement)
        | Instruction::ForIterNext(index, displacement) => {
            bytes.extend_from_slice(&index.to_le_bytes());
            bytes.extend_from_slice(&displacement.to_le_bytes());
        }
        Instruction::CallFn(index, arity) | Instruction::Render(index, arity) => {
            bytes.extend_from_slice(&index.to_le_bytes());
            bytes.push(arity);
        }
        Instruction::Jump(displacement)
        | Instruction::JumpIfFalse(displacement)
        | Instruction::JumpIfTrue(displacement)
        | Instruction::JumpIfFalseKeep(displacement)
        | Instruction::JumpIfTrueKeep(displacement)
        | Instruction::ForIterEnd(displacement)
        | Instruction::ForIterBreak(displacement) => {
            bytes.extend_from_slice(&displacement.to_le_bytes())
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sizes_match() {
        let instructions = [
            Instruction::Const(300),
            Instruction::DefaultVar(2, -7),
            Instruction::CallFn(1, 2),
            Instruction::ForIterNext(4, 12),
            Instruction::Add,
            Instruction::Return,
        ];
        for instruction in instructions {
            let mut bytes = Vec::new();
            encode_instruction(instruction.clone(), &mut bytes);
            assert_eq!(bytes.len(), instruction.size());
            assert_eq!(
                decode_instruction(&bytes),
                Some((instruction.clone(), instruction.size()))
            );
        }
    }

    #[test]
    fn test_little_endian_operand() {
        let mut bytes = Vec::new();
        encode_instruction(Instruction::Jump(-3), &mut bytes);
        assert_eq!(&bytes[1..], &[0xfd, 0xff]);
    }

    #[test]
    fn test_decode_truncated() {
        let mut bytes = Vec::new();
        encode_instruction(Instruction::Const(1), &mut bytes);
        assert_eq!(decode_instruction(&bytes[..2]), None);
        assert_eq!(decode_instruction(&[0xff]), None);
        assert_eq!(decode_instruction(&[]), None);
    }

    #[test]
    fn test_jump_target() {
        // a jump at offset 4 lands 2 bytes after its own end
        assert_eq!(jump_target(4, &Instruction::Jump(2), 20), Some(9));
        assert_eq!(jump_target(4, &Instruction::Jump(-8), 20), None);
        assert_eq!(jump_target(4, &Instruction::Jump(20), 20), None);
        assert_eq!(jump_target(4, &Instruction::Add, 20), None);
    }
}
