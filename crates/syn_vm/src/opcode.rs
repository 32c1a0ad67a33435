//! Opcode catalogue.
//!
//! [`for_each_opcode!`](crate::for_each_opcode) holds the canonical list of
//! opcodes (number, mnemonic, arity) and hands it to a callback macro, so the
//! enum and its lookup tables are generated from a single definition.
//!
//! Arity counts every word the instruction occupies, the opcode included.

use crate::word::Word;

/// Number of defined opcodes. Opcode numbers are dense in `0..OPCODE_COUNT`.
pub const OPCODE_COUNT: usize = 22;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// halt ; stop execution
            Halt = 0, "halt", 1,
            /// set a b ; a = b
            Set = 1, "set", 3,
            /// push a ; push a onto the stack
            Push = 2, "push", 2,
            /// pop a ; a = stack.pop()
            Pop = 3, "pop", 2,
            /// eq a b c ; a = (b == c)
            Eq = 4, "eq", 4,
            /// gt a b c ; a = (b > c)
            Gt = 5, "gt", 4,
            /// jmp a ; pc = a
            Jmp = 6, "jmp", 2,
            /// jt a b ; if a != 0 then pc = b
            Jt = 7, "jt", 3,
            /// jf a b ; if a == 0 then pc = b
            Jf = 8, "jf", 3,
            /// add a b c ; a = (b + c) mod 32768
            Add = 9, "add", 4,
            /// mult a b c ; a = (b * c) mod 32768
            Mult = 10, "mult", 4,
            /// mod a b c ; a = b mod c
            Mod = 11, "mod", 4,
            /// and a b c ; a = b & c
            And = 12, "and", 4,
            /// or a b c ; a = b | c
            Or = 13, "or", 4,
            /// not a b ; a = 15-bit complement of b
            Not = 14, "not", 3,
            /// rmem a b ; a = memory[b]
            Rmem = 15, "rmem", 3,
            /// wmem a b ; memory[a] = b
            Wmem = 16, "wmem", 3,
            /// call a ; push next pc, pc = a
            Call = 17, "call", 2,
            /// ret ; pc = stack.pop()
            Ret = 18, "ret", 1,
            /// out a ; emit character a
            Out = 19, "out", 2,
            /// in a ; a = next input character
            In = 20, "in", 2,
            /// noop ; no effect
            Noop = 21, "noop", 1,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal, $arity:literal
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl Opcode {
            /// Every opcode, indexed by its number.
            pub const ALL: [Opcode; OPCODE_COUNT] = [ $( Opcode::$name, )* ];

            /// Looks up the opcode numbered `word`.
            pub const fn from_word(word: Word) -> Option<Self> {
                match word {
                    $( $code => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns the assembly mnemonic.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of words the instruction occupies.
            pub const fn arity(self) -> usize {
                match self {
                    $( Opcode::$name => $arity, )*
                }
            }
        }
    };
}

crate::for_each_opcode!(define_opcodes);

impl Opcode {
    pub const fn word(self) -> Word {
        self as Word
    }

    /// Number of operand words following the opcode.
    pub const fn operand_count(self) -> usize {
        self.arity() - 1
    }

    /// Whether the instruction may set pc to something other than the next instruction.
    pub const fn transfers_control(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Jt | Opcode::Jf | Opcode::Call | Opcode::Ret
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_and_ordered() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.word() as usize, i);
            assert_eq!(Opcode::from_word(i as Word), Some(*op));
        }
        assert_eq!(Opcode::from_word(OPCODE_COUNT as Word), None);
        assert_eq!(Opcode::from_word(u16::MAX), None);
    }

    #[test]
    fn arity_counts_opcode_word() {
        assert_eq!(Opcode::Halt.arity(), 1);
        assert_eq!(Opcode::Set.arity(), 3);
        assert_eq!(Opcode::Add.arity(), 4);
        assert_eq!(Opcode::Out.operand_count(), 1);
        assert_eq!(Opcode::Ret.operand_count(), 0);
    }

    #[test]
    fn mnemonics_match_names() {
        let names: Vec<&str> = Opcode::ALL.iter().map(|op| op.mnemonic()).collect();
        assert_eq!(
            names,
            [
                "halt", "set", "push", "pop", "eq", "gt", "jmp", "jt", "jf", "add", "mult", "mod",
                "and", "or", "not", "rmem", "wmem", "call", "ret", "out", "in", "noop"
            ]
        );
    }

    #[test]
    fn control_transfer_set() {
        let transfers: Vec<Opcode> = Opcode::ALL
            .into_iter()
            .filter(|op| op.transfers_control())
            .collect();
        assert_eq!(
            transfers,
            [Opcode::Jmp, Opcode::Jt, Opcode::Jf, Opcode::Call, Opcode::Ret]
        );
    }
}
