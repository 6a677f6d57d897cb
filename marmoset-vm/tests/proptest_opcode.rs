// marmoset-vm - Property-based tests for instruction encoding
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the bytecode encoding contract:
//! `read_operands(lookup(op), make(op, operands)[1..]) == (operands, width)`
//! for every opcode and every operand in range, and disassembly offsets
//! that strictly increase.

use marmoset_vm::opcode::{lookup, make, read_operands, Instructions, Op};
use proptest::prelude::*;

const ALL_OPS: [Op; 30] = [
    Op::GetConstant,
    Op::Negate,
    Op::LogicalNot,
    Op::Add,
    Op::Subtract,
    Op::Multiply,
    Op::Divide,
    Op::Equals,
    Op::NotEquals,
    Op::GreaterThan,
    Op::PushTrue,
    Op::PushFalse,
    Op::PushNull,
    Op::Jump,
    Op::JumpNotTruthy,
    Op::GetGlobal,
    Op::SetGlobal,
    Op::GetLocal,
    Op::SetLocal,
    Op::GetFree,
    Op::Pop,
    Op::Array,
    Op::Hash,
    Op::Index,
    Op::Call,
    Op::ReturnValue,
    Op::Return,
    Op::GetBuiltin,
    Op::MakeClosure,
    Op::Recurse,
];

/// In-range operands for an opcode's width table.
fn operands_for(op: Op, seed_a: usize, seed_b: usize) -> Vec<usize> {
    lookup(op)
        .operand_widths
        .iter()
        .zip([seed_a, seed_b])
        .map(|(width, seed)| match *width {
            1 => seed % 256,
            _ => seed % 65536,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Encoding then decoding returns the original operands and the summed
    /// operand width, for every opcode.
    #[test]
    fn encode_decode_roundtrip(
        op in prop::sample::select(ALL_OPS.to_vec()),
        seed_a in any::<usize>(),
        seed_b in any::<usize>(),
    ) {
        let operands = operands_for(op, seed_a, seed_b);
        let instruction = make(op, &operands);
        let definition = lookup(op);

        prop_assert_eq!(instruction[0], op as u8);

        let (decoded, read) = read_operands(definition, &instruction[1..]);
        prop_assert_eq!(decoded, operands);
        prop_assert_eq!(read, definition.operand_widths.iter().sum::<usize>());
        prop_assert_eq!(instruction.len(), 1 + read);
    }

    /// Disassembly prints one line per instruction with strictly increasing
    /// offsets, starting at zero.
    #[test]
    fn disassembly_offsets_strictly_increase(
        ops in prop::collection::vec(
            (prop::sample::select(ALL_OPS.to_vec()), any::<usize>(), any::<usize>()),
            1..64,
        ),
    ) {
        let mut instructions = Instructions::new();
        for (op, seed_a, seed_b) in &ops {
            instructions.append(make(*op, &operands_for(*op, *seed_a, *seed_b)));
        }

        let rendered = instructions.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        prop_assert_eq!(lines.len(), ops.len());

        let mut previous: Option<usize> = None;
        for line in lines {
            let offset: usize = line[..4].parse().expect("4-digit offset prefix");
            if let Some(previous) = previous {
                prop_assert!(offset > previous);
            } else {
                prop_assert_eq!(offset, 0);
            }
            previous = Some(offset);
        }
    }
}
