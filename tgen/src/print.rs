use color_print::cprintln;

use tgen::{ConcreteCall, ConcreteSequence};

pub fn print_sequence(seq: &ConcreteSequence) {
    cprintln!(
        "<bold>// sequence {}</> <blue>0x{:04X}..0x{:04X}</>",
        seq.index,
        seq.start,
        seq.end
    );
    if !seq.prologue.is_empty() {
        cprintln!("<dim>// prologue</>");
        seq.prologue.iter().for_each(print_call);
    }
    seq.calls.iter().for_each(print_call);
    for check in &seq.self_checks {
        cprintln!("<dim>// check {} == 0x{:04X}</>", check.mode, check.expected);
        check.calls.iter().for_each(print_call);
    }
    println!();
}

fn print_call(call: &ConcreteCall) {
    for label in &call.labels {
        cprintln!("<yellow>{}</>:", label.unique_name());
    }
    if call.prim.is_some() {
        let count = match call.exec_count {
            0 => String::new(),
            n => format!("x{n}"),
        };
        cprintln!("  <blue>0x{:04X}</>  {:<28} <dim>{}</>", call.address, call.text, count);
    } else if !call.text.is_empty() {
        cprintln!("  <dim>{}</>", call.text);
    }
    for text in &call.outputs {
        cprintln!("  <green>// {}</>", text);
    }
}
