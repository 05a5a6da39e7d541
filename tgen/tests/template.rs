use std::path::PathBuf;

use tgen::rk16::{self, Rk16};
use tgen::{Generator, Options, Template};

fn demo(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "demos", name].iter().collect();
    path.to_string_lossy().into_owned()
}

fn quiet() -> Options {
    Options {
        default_test_data: false,
        ..Options::default()
    }
}

#[test]
fn demo_options() {
    let options = Options::load(&demo("options.yaml")).unwrap();
    assert_eq!(options.seed, 1228);
    assert_eq!(options.code_origin, 0x100);
    assert!(options.self_checks);
    assert!(options.presimulation);
}

#[test]
fn demo_template() {
    let mut ctx = rk16::context(quiet());
    let template = Template::load(&demo("countdown.yaml"), ctx.model.as_ref()).unwrap();
    template.install(&mut ctx);
    let mut generator = Generator::new(ctx);
    let seqs = generator.run_block(&template.root).unwrap();

    // One countdown sequence, then taken and fall-through branch traces.
    assert_eq!(seqs.len(), 3);

    let countdown = &seqs[0];
    assert_eq!(countdown.calls[0].text, "// countdown");
    // The template's byte preparator wins over the default load.
    assert_eq!(countdown.calls[1].text, "loadi t0, 0x0003");
    assert_eq!(countdown.calls[2].exec_count, 3);
    assert!(countdown.calls[2].text.starts_with("add t1, t1, "));
    // Overflow data for both sources, generated once.
    assert_eq!(countdown.prologue.len(), 2);
    assert_eq!(countdown.prologue[0].text, "loadi t1, 0x7FFF");
    assert!(countdown.prologue[1].text.ends_with(", 0x0001"));

    // Control code lands right before the branch it steers.
    let texts: Vec<&str> = seqs[1].calls.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts[1], "xor t3, t3, t3");
    assert!(texts[2].starts_with("if t3, skip"));
    assert_eq!(seqs[2].calls[1].text, "loadi t3, 0x0001");
    assert_eq!(seqs[1].calls[3].exec_count, 0);
    assert_eq!(seqs[2].calls[3].exec_count, 1);
}

const SKIPS: &str = r#"
preparators:
  - target: reg
    name: skip
    args: { i: [12, 13] }
    calls:
      - op: ifr
        args: { rs2: $target, imm: "@over" }
      - op: loadi
        label: over
        args: { rd: $target, imm: "$value[15:0]" }
nodes:
  - calls:
      - prepare: { target: { mode: reg, i: 12 }, value: 7, preparator: skip }
      - prepare: { target: { mode: reg, i: 13 }, value: 9, preparator: skip }
      - op: add
        args: { rd: { mode: reg, i: 8 }, rs1: { mode: reg, i: 12 }, rs2: { mode: reg, i: 13 } }
"#;

#[test]
fn preparator_labels_are_unique_per_inclusion() {
    let mut ctx = rk16::context(quiet());
    let template = Template::parse(SKIPS, &Rk16::new()).unwrap();
    template.install(&mut ctx);
    let mut generator = Generator::new(ctx);
    let seq = generator.run_block(&template.root).unwrap().remove(0);

    let labels: Vec<(usize, String)> = seq
        .calls
        .iter()
        .enumerate()
        .flat_map(|(i, c)| c.labels.iter().map(move |l| (i, l.unique_name())))
        .collect();
    assert_eq!(labels.len(), 2);
    assert_ne!(labels[0].1, labels[1].1);
    assert!(labels.iter().all(|(_, name)| name.starts_with("over_n")));

    // Each jump lands on the label of its own inclusion.
    for ((index, name), reg) in labels.iter().zip(["s0", "s1"]) {
        assert_eq!(seq.calls[index - 1].text, format!("ifr {reg}, {name}"));
    }
    assert_eq!(seq.calls[4].text, "add t0, s0, s1");
    assert_eq!(seq.calls[4].exec_count, 1);
}
