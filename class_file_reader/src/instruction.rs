use crate::cesu8_byte_buffer::ByteBuffer;
use crate::class_file_error::{ClassFileError, Result};

/// Operands of `tableswitch`. Offsets are relative to the opcode's pc.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSwitch {
    pub default: i32,
    pub low: i32,
    pub high: i32,
    pub offsets: Vec<i32>,
}

/// Operands of `lookupswitch`, as `(match, offset)` pairs in class file order.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSwitch {
    pub default: i32,
    pub pairs: Vec<(i32, i32)>,
}

/// One decoded bytecode instruction. Local variable indexes are widened to
/// `u16` so `wide` forms decode into the same variants.
///
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Instruction {
    Nop,
    Aconst_null,
    Iconst_m1,
    Iconst_0,
    Iconst_1,
    Iconst_2,
    Iconst_3,
    Iconst_4,
    Iconst_5,
    Lconst_0,
    Lconst_1,
    Fconst_0,
    Fconst_1,
    Fconst_2,
    Dconst_0,
    Dconst_1,
    Bipush(i8),
    Sipush(i16),
    Ldc(u16),
    Ldc_w(u16),
    Ldc2_w(u16),
    Iload(u16),
    Lload(u16),
    Fload(u16),
    Dload(u16),
    Aload(u16),
    Iload_0,
    Iload_1,
    Iload_2,
    Iload_3,
    Lload_0,
    Lload_1,
    Lload_2,
    Lload_3,
    Fload_0,
    Fload_1,
    Fload_2,
    Fload_3,
    Dload_0,
    Dload_1,
    Dload_2,
    Dload_3,
    Aload_0,
    Aload_1,
    Aload_2,
    Aload_3,
    Iaload,
    Laload,
    Faload,
    Daload,
    Aaload,
    Baload,
    Caload,
    Saload,
    Istore(u16),
    Lstore(u16),
    Fstore(u16),
    Dstore(u16),
    Astore(u16),
    Istore_0,
    Istore_1,
    Istore_2,
    Istore_3,
    Lstore_0,
    Lstore_1,
    Lstore_2,
    Lstore_3,
    Fstore_0,
    Fstore_1,
    Fstore_2,
    Fstore_3,
    Dstore_0,
    Dstore_1,
    Dstore_2,
    Dstore_3,
    Astore_0,
    Astore_1,
    Astore_2,
    Astore_3,
    Iastore,
    Lastore,
    Fastore,
    Dastore,
    Aastore,
    Bastore,
    Castore,
    Sastore,
    Pop,
    Pop2,
    Dup,
    Dup_x1,
    Dup_x2,
    Dup2,
    Dup2_x1,
    Dup2_x2,
    Swap,
    Iadd,
    Ladd,
    Fadd,
    Dadd,
    Isub,
    Lsub,
    Fsub,
    Dsub,
    Imul,
    Lmul,
    Fmul,
    Dmul,
    Idiv,
    Ldiv,
    Fdiv,
    Ddiv,
    Irem,
    Lrem,
    Frem,
    Drem,
    Ineg,
    Lneg,
    Fneg,
    Dneg,
    Ishl,
    Lshl,
    Ishr,
    Lshr,
    Iushr,
    Lushr,
    Iand,
    Land,
    Ior,
    Lor,
    Ixor,
    Lxor,
    Iinc(u16, i16),
    I2l,
    I2f,
    I2d,
    L2i,
    L2f,
    L2d,
    F2i,
    F2l,
    F2d,
    D2i,
    D2l,
    D2f,
    I2b,
    I2c,
    I2s,
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,
    Ifeq(i16),
    Ifne(i16),
    Iflt(i16),
    Ifge(i16),
    Ifgt(i16),
    Ifle(i16),
    If_icmpeq(i16),
    If_icmpne(i16),
    If_icmplt(i16),
    If_icmpge(i16),
    If_icmpgt(i16),
    If_icmple(i16),
    If_acmpeq(i16),
    If_acmpne(i16),
    Goto(i16),
    Jsr(i16),
    Ret(u16),
    Tableswitch(TableSwitch),
    Lookupswitch(LookupSwitch),
    Ireturn,
    Lreturn,
    Freturn,
    Dreturn,
    Areturn,
    Return,
    Getstatic(u16),
    Putstatic(u16),
    Getfield(u16),
    Putfield(u16),
    Invokevirtual(u16),
    Invokespecial(u16),
    Invokestatic(u16),
    Invokeinterface(u16, u8),
    Invokedynamic(u16),
    New(u16),
    Newarray(u8),
    Anewarray(u16),
    Arraylength,
    Athrow,
    Checkcast(u16),
    Instanceof(u16),
    Monitorenter,
    Monitorexit,
    Multianewarray(u16, u8),
    Ifnull(i16),
    Ifnonnull(i16),
    Goto_w(i32),
    Jsr_w(i32),
}

/// Decodes the instruction starting at `pc` in `code`, returning it together
/// with its length in bytes.
pub fn read_one_instruction(code: &[u8], pc: usize) -> Result<(Instruction, usize)> {
    let mut buffer = ByteBuffer::new(code);
    buffer.jump_to(pc)?;
    let op_code = buffer.read_u8()?;
    let instruction = match op_code {
        0x00 => Instruction::Nop,
        0x01 => Instruction::Aconst_null,
        0x02 => Instruction::Iconst_m1,
        0x03 => Instruction::Iconst_0,
        0x04 => Instruction::Iconst_1,
        0x05 => Instruction::Iconst_2,
        0x06 => Instruction::Iconst_3,
        0x07 => Instruction::Iconst_4,
        0x08 => Instruction::Iconst_5,
        0x09 => Instruction::Lconst_0,
        0x0a => Instruction::Lconst_1,
        0x0b => Instruction::Fconst_0,
        0x0c => Instruction::Fconst_1,
        0x0d => Instruction::Fconst_2,
        0x0e => Instruction::Dconst_0,
        0x0f => Instruction::Dconst_1,
        0x10 => Instruction::Bipush(buffer.read_i8()?),
        0x11 => Instruction::Sipush(buffer.read_i16()?),
        0x12 => Instruction::Ldc(buffer.read_u8()? as u16),
        0x13 => Instruction::Ldc_w(buffer.read_u16()?),
        0x14 => Instruction::Ldc2_w(buffer.read_u16()?),
        0x15 => Instruction::Iload(buffer.read_u8()? as u16),
        0x16 => Instruction::Lload(buffer.read_u8()? as u16),
        0x17 => Instruction::Fload(buffer.read_u8()? as u16),
        0x18 => Instruction::Dload(buffer.read_u8()? as u16),
        0x19 => Instruction::Aload(buffer.read_u8()? as u16),
        0x1a => Instruction::Iload_0,
        0x1b => Instruction::Iload_1,
        0x1c => Instruction::Iload_2,
        0x1d => Instruction::Iload_3,
        0x1e => Instruction::Lload_0,
        0x1f => Instruction::Lload_1,
        0x20 => Instruction::Lload_2,
        0x21 => Instruction::Lload_3,
        0x22 => Instruction::Fload_0,
        0x23 => Instruction::Fload_1,
        0x24 => Instruction::Fload_2,
        0x25 => Instruction::Fload_3,
        0x26 => Instruction::Dload_0,
        0x27 => Instruction::Dload_1,
        0x28 => Instruction::Dload_2,
        0x29 => Instruction::Dload_3,
        0x2a => Instruction::Aload_0,
        0x2b => Instruction::Aload_1,
        0x2c => Instruction::Aload_2,
        0x2d => Instruction::Aload_3,
        0x2e => Instruction::Iaload,
        0x2f => Instruction::Laload,
        0x30 => Instruction::Faload,
        0x31 => Instruction::Daload,
        0x32 => Instruction::Aaload,
        0x33 => Instruction::Baload,
        0x34 => Instruction::Caload,
        0x35 => Instruction::Saload,
        0x36 => Instruction::Istore(buffer.read_u8()? as u16),
        0x37 => Instruction::Lstore(buffer.read_u8()? as u16),
        0x38 => Instruction::Fstore(buffer.read_u8()? as u16),
        0x39 => Instruction::Dstore(buffer.read_u8()? as u16),
        0x3a => Instruction::Astore(buffer.read_u8()? as u16),
        0x3b => Instruction::Istore_0,
        0x3c => Instruction::Istore_1,
        0x3d => Instruction::Istore_2,
        0x3e => Instruction::Istore_3,
        0x3f => Instruction::Lstore_0,
        0x40 => Instruction::Lstore_1,
        0x41 => Instruction::Lstore_2,
        0x42 => Instruction::Lstore_3,
        0x43 => Instruction::Fstore_0,
        0x44 => Instruction::Fstore_1,
        0x45 => Instruction::Fstore_2,
        0x46 => Instruction::Fstore_3,
        0x47 => Instruction::Dstore_0,
        0x48 => Instruction::Dstore_1,
        0x49 => Instruction::Dstore_2,
        0x4a => Instruction::Dstore_3,
        0x4b => Instruction::Astore_0,
        0x4c => Instruction::Astore_1,
        0x4d => Instruction::Astore_2,
        0x4e => Instruction::Astore_3,
        0x4f => Instruction::Iastore,
        0x50 => Instruction::Lastore,
        0x51 => Instruction::Fastore,
        0x52 => Instruction::Dastore,
        0x53 => Instruction::Aastore,
        0x54 => Instruction::Bastore,
        0x55 => Instruction::Castore,
        0x56 => Instruction::Sastore,
        0x57 => Instruction::Pop,
        0x58 => Instruction::Pop2,
        0x59 => Instruction::Dup,
        0x5a => Instruction::Dup_x1,
        0x5b => Instruction::Dup_x2,
        0x5c => Instruction::Dup2,
        0x5d => Instruction::Dup2_x1,
        0x5e => Instruction::Dup2_x2,
        0x5f => Instruction::Swap,
        0x60 => Instruction::Iadd,
        0x61 => Instruction::Ladd,
        0x62 => Instruction::Fadd,
        0x63 => Instruction::Dadd,
        0x64 => Instruction::Isub,
        0x65 => Instruction::Lsub,
        0x66 => Instruction::Fsub,
        0x67 => Instruction::Dsub,
        0x68 => Instruction::Imul,
        0x69 => Instruction::Lmul,
        0x6a => Instruction::Fmul,
        0x6b => Instruction::Dmul,
        0x6c => Instruction::Idiv,
        0x6d => Instruction::Ldiv,
        0x6e => Instruction::Fdiv,
        0x6f => Instruction::Ddiv,
        0x70 => Instruction::Irem,
        0x71 => Instruction::Lrem,
        0x72 => Instruction::Frem,
        0x73 => Instruction::Drem,
        0x74 => Instruction::Ineg,
        0x75 => Instruction::Lneg,
        0x76 => Instruction::Fneg,
        0x77 => Instruction::Dneg,
        0x78 => Instruction::Ishl,
        0x79 => Instruction::Lshl,
        0x7a => Instruction::Ishr,
        0x7b => Instruction::Lshr,
        0x7c => Instruction::Iushr,
        0x7d => Instruction::Lushr,
        0x7e => Instruction::Iand,
        0x7f => Instruction::Land,
        0x80 => Instruction::Ior,
        0x81 => Instruction::Lor,
        0x82 => Instruction::Ixor,
        0x83 => Instruction::Lxor,
        0x84 => {
            let index = buffer.read_u8()? as u16;
            let constant = buffer.read_i8()? as i16;
            Instruction::Iinc(index, constant)
        }
        0x85 => Instruction::I2l,
        0x86 => Instruction::I2f,
        0x87 => Instruction::I2d,
        0x88 => Instruction::L2i,
        0x89 => Instruction::L2f,
        0x8a => Instruction::L2d,
        0x8b => Instruction::F2i,
        0x8c => Instruction::F2l,
        0x8d => Instruction::F2d,
        0x8e => Instruction::D2i,
        0x8f => Instruction::D2l,
        0x90 => Instruction::D2f,
        0x91 => Instruction::I2b,
        0x92 => Instruction::I2c,
        0x93 => Instruction::I2s,
        0x94 => Instruction::Lcmp,
        0x95 => Instruction::Fcmpl,
        0x96 => Instruction::Fcmpg,
        0x97 => Instruction::Dcmpl,
        0x98 => Instruction::Dcmpg,
        0x99 => Instruction::Ifeq(buffer.read_i16()?),
        0x9a => Instruction::Ifne(buffer.read_i16()?),
        0x9b => Instruction::Iflt(buffer.read_i16()?),
        0x9c => Instruction::Ifge(buffer.read_i16()?),
        0x9d => Instruction::Ifgt(buffer.read_i16()?),
        0x9e => Instruction::Ifle(buffer.read_i16()?),
        0x9f => Instruction::If_icmpeq(buffer.read_i16()?),
        0xa0 => Instruction::If_icmpne(buffer.read_i16()?),
        0xa1 => Instruction::If_icmplt(buffer.read_i16()?),
        0xa2 => Instruction::If_icmpge(buffer.read_i16()?),
        0xa3 => Instruction::If_icmpgt(buffer.read_i16()?),
        0xa4 => Instruction::If_icmple(buffer.read_i16()?),
        0xa5 => Instruction::If_acmpeq(buffer.read_i16()?),
        0xa6 => Instruction::If_acmpne(buffer.read_i16()?),
        0xa7 => Instruction::Goto(buffer.read_i16()?),
        0xa8 => Instruction::Jsr(buffer.read_i16()?),
        0xa9 => Instruction::Ret(buffer.read_u8()? as u16),
        0xaa => Instruction::Tableswitch(read_table_switch(&mut buffer)?),
        0xab => Instruction::Lookupswitch(read_lookup_switch(&mut buffer)?),
        0xac => Instruction::Ireturn,
        0xad => Instruction::Lreturn,
        0xae => Instruction::Freturn,
        0xaf => Instruction::Dreturn,
        0xb0 => Instruction::Areturn,
        0xb1 => Instruction::Return,
        0xb2 => Instruction::Getstatic(buffer.read_u16()?),
        0xb3 => Instruction::Putstatic(buffer.read_u16()?),
        0xb4 => Instruction::Getfield(buffer.read_u16()?),
        0xb5 => Instruction::Putfield(buffer.read_u16()?),
        0xb6 => Instruction::Invokevirtual(buffer.read_u16()?),
        0xb7 => Instruction::Invokespecial(buffer.read_u16()?),
        0xb8 => Instruction::Invokestatic(buffer.read_u16()?),
        0xb9 => {
            let index = buffer.read_u16()?;
            let count = buffer.read_u8()?;
            // trailing zero byte
            buffer.read_u8()?;
            Instruction::Invokeinterface(index, count)
        }
        0xba => {
            let index = buffer.read_u16()?;
            buffer.read_u16()?;
            Instruction::Invokedynamic(index)
        }
        0xbb => Instruction::New(buffer.read_u16()?),
        0xbc => Instruction::Newarray(buffer.read_u8()?),
        0xbd => Instruction::Anewarray(buffer.read_u16()?),
        0xbe => Instruction::Arraylength,
        0xbf => Instruction::Athrow,
        0xc0 => Instruction::Checkcast(buffer.read_u16()?),
        0xc1 => Instruction::Instanceof(buffer.read_u16()?),
        0xc2 => Instruction::Monitorenter,
        0xc3 => Instruction::Monitorexit,
        0xc4 => read_wide(&mut buffer)?,
        0xc5 => {
            let (index, dimensions) = (buffer.read_u16()?, buffer.read_u8()?);
            Instruction::Multianewarray(index, dimensions)
        }
        0xc6 => Instruction::Ifnull(buffer.read_i16()?),
        0xc7 => Instruction::Ifnonnull(buffer.read_i16()?),
        0xc8 => Instruction::Goto_w(buffer.read_i32()?),
        0xc9 => Instruction::Jsr_w(buffer.read_i32()?),
        op_code => {
            return Err(ClassFileError::InvalidCode(format!(
                "invalid opcode {op_code:#04x} at pc {pc}"
            )));
        }
    };
    Ok((instruction, buffer.position - pc))
}

fn read_wide(buffer: &mut ByteBuffer) -> Result<Instruction> {
    let op_code = buffer.read_u8()?;
    let index = buffer.read_u16()?;
    let instruction = match op_code {
        0x15 => Instruction::Iload(index),
        0x16 => Instruction::Lload(index),
        0x17 => Instruction::Fload(index),
        0x18 => Instruction::Dload(index),
        0x19 => Instruction::Aload(index),
        0x36 => Instruction::Istore(index),
        0x37 => Instruction::Lstore(index),
        0x38 => Instruction::Fstore(index),
        0x39 => Instruction::Dstore(index),
        0x3a => Instruction::Astore(index),
        0x84 => Instruction::Iinc(index, buffer.read_i16()?),
        0xa9 => Instruction::Ret(index),
        op_code => {
            return Err(ClassFileError::InvalidCode(format!(
                "invalid opcode {op_code:#04x} after wide"
            )))
        }
    };
    Ok(instruction)
}

fn read_table_switch(buffer: &mut ByteBuffer) -> Result<TableSwitch> {
    buffer.align_to_4()?;
    let default = buffer.read_i32()?;
    let low = buffer.read_i32()?;
    let high = buffer.read_i32()?;
    if high < low {
        return Err(ClassFileError::InvalidCode(format!(
            "tableswitch: high {high} is lower than low {low}"
        )));
    }
    let count = (high as i64 - low as i64 + 1) as usize;
    let offsets = (0..count)
        .map(|_| buffer.read_i32())
        .collect::<Result<Vec<_>>>()?;
    Ok(TableSwitch {
        default,
        low,
        high,
        offsets,
    })
}

fn read_lookup_switch(buffer: &mut ByteBuffer) -> Result<LookupSwitch> {
    buffer.align_to_4()?;
    let default = buffer.read_i32()?;
    let npairs = buffer.read_i32()?;
    if npairs < 0 {
        return Err(ClassFileError::InvalidCode(format!(
            "lookupswitch: negative pair count {npairs}"
        )));
    }
    let pairs = (0..npairs)
        .map(|_| Ok((buffer.read_i32()?, buffer.read_i32()?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(LookupSwitch { default, pairs })
}

/// Checks that `code` is a sequence of well formed instructions.
pub fn check_code(code: &[u8]) -> Result<()> {
    let mut pc = 0;
    while pc < code.len() {
        let (_, length) = read_one_instruction(code, pc)?;
        pc += length;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::class_file_error::ClassFileError;
    use crate::instruction::{check_code, read_one_instruction, Instruction, LookupSwitch};

    #[test]
    fn decodes_simple_instructions() {
        let code = [0x03, 0x10, 0xFE, 0x11, 0x01, 0x00, 0xb1];
        assert_eq!((Instruction::Iconst_0, 1), read_one_instruction(&code, 0).unwrap());
        assert_eq!((Instruction::Bipush(-2), 2), read_one_instruction(&code, 1).unwrap());
        assert_eq!((Instruction::Sipush(256), 3), read_one_instruction(&code, 3).unwrap());
        assert_eq!((Instruction::Return, 1), read_one_instruction(&code, 6).unwrap());
    }

    #[test]
    fn mnemonics_are_lowercase() {
        assert_eq!("aconst_null", Instruction::Aconst_null.to_string());
        assert_eq!("if_icmplt", Instruction::If_icmplt(3).to_string());
        assert_eq!("invokevirtual", Instruction::Invokevirtual(1).to_string());
    }

    #[test]
    fn wide_widens_index() {
        let code = [0xc4, 0x84, 0x01, 0x00, 0xFF, 0xFE];
        assert_eq!(
            (Instruction::Iinc(256, -2), 6),
            read_one_instruction(&code, 0).unwrap()
        );
        let code = [0xc4, 0x15, 0x01, 0x02];
        assert_eq!(
            (Instruction::Iload(0x0102), 4),
            read_one_instruction(&code, 0).unwrap()
        );
    }

    #[test]
    fn lookupswitch_is_padded_from_method_start() {
        // nop, lookupswitch, 2 bytes padding, default 20, 1 pair (5 -> 12)
        let code = [
            0x00, 0xab, 0, 0, 0, 0, 0, 20, 0, 0, 0, 1, 0, 0, 0, 5, 0, 0, 0, 12,
        ];
        let (instruction, length) = read_one_instruction(&code, 1).unwrap();
        assert_eq!(
            Instruction::Lookupswitch(LookupSwitch {
                default: 20,
                pairs: vec![(5, 12)]
            }),
            instruction
        );
        assert_eq!(19, length);
    }

    #[test]
    fn tableswitch_reads_all_offsets() {
        let code = [
            0xaa, 0, 0, 0, 0, 0, 0, 9, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4,
        ];
        let (instruction, length) = read_one_instruction(&code, 0).unwrap();
        match instruction {
            Instruction::Tableswitch(table) => {
                assert_eq!(9, table.default);
                assert_eq!((1, 2), (table.low, table.high));
                assert_eq!(vec![3, 4], table.offsets);
            }
            other => panic!("unexpected {other}"),
        }
        assert_eq!(24, length);
    }

    #[test]
    fn unknown_opcode_is_invalid_code() {
        assert!(matches!(
            read_one_instruction(&[0xcb], 0),
            Err(ClassFileError::InvalidCode(_))
        ));
        assert!(check_code(&[0x00, 0xfe]).is_err());
    }

    #[test]
    fn truncated_operand_is_rejected() {
        assert_eq!(
            Err(ClassFileError::UnexpectedEndOfData),
            check_code(&[0x11, 0x01])
        );
        assert!(check_code(&[0x04, 0x3c, 0xb1]).is_ok());
    }
}
