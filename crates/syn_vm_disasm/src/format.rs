use colored::Colorize;
use serde_json::{json, Value};
use syn_vm::{Listing, Operand};

/// Colored listing line: address dimmed, mnemonic bold, data words yellow.
pub fn listing_line(line: &Listing) -> String {
    match line {
        Listing::Instruction(d) => {
            let text = d.to_string();
            // "  addr: mnem rest"
            match text.split_once(": ") {
                Some((addr, rest)) => {
                    let (mnem, tail) = rest.split_once(' ').unwrap_or((rest, ""));
                    format!("{}: {} {}", addr.dimmed(), mnem.bold(), tail)
                        .trim_end()
                        .to_string()
                }
                None => text,
            }
        }
        Listing::Data { addr, word } => {
            format!("{}: {}", format!("{addr:5}").dimmed(), format!(".word {word}").yellow())
        }
    }
}

pub fn listing_json(line: &Listing) -> Value {
    match line {
        Listing::Instruction(d) => {
            let operands: Vec<Value> = d
                .operands()
                .iter()
                .map(|w| match Operand::classify(*w) {
                    Some(Operand::Literal(v)) => json!({ "literal": v }),
                    Some(Operand::Register(r)) => json!({ "register": r.index() }),
                    None => json!({ "invalid": w }),
                })
                .collect();
            json!({
                "addr": d.addr,
                "op": d.opcode.mnemonic(),
                "operands": operands,
            })
        }
        Listing::Data { addr, word } => json!({ "addr": addr, "word": word }),
    }
}
