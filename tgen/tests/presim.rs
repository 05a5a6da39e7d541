use std::cell::Cell;
use std::rc::Rc;

use tgen::engine::BranchEngine;
use tgen::label::{Label, LabelRef};
use tgen::rk16::{self, op, reg};
use tgen::template::{Attr, Attrs, Call, Situation, Value};
use tgen::{Error, Generator, Options, Query, TestBase, TestData};

const T0: u64 = 8;
const T1: u64 = 9;
const T2: u64 = 10;

fn r(i: u64) -> Value {
    Value::Mode(reg(i))
}

/// Answers `addi.rs1 = 5` and counts the queries.
struct Counting(Rc<Cell<usize>>);

impl TestBase for Counting {
    fn execute(&mut self, query: &Query) -> tgen::Result<Vec<TestData>> {
        self.0.set(self.0.get() + 1);
        assert_eq!(query.situation, "count");
        Ok(vec![TestData::new("default").bind("addi.rs1", 5)])
    }
}

fn quiet() -> Options {
    Options {
        default_test_data: false,
        ..Options::default()
    }
}

/// `t0 = 2; L: t1 += 1; t0 -= 1; if t0 != 0 goto L`
fn countdown() -> (Vec<Call>, usize) {
    let mut body = op("addi", vec![("rd", r(T1)), ("rs1", r(T1)), ("imm", Value::Fixed(1))]);
    body.situation = Some(Situation::new("count"));
    let body = Call::op(body).label(Label::new("L"));
    let dec = Call::op(op("subi", vec![("rd", r(T0)), ("rs1", r(T0)), ("imm", Value::Fixed(1))]))
        .depends_on(&body);
    let calls = vec![
        Call::op(op("loadi", vec![("rd", r(T0)), ("imm", Value::Fixed(2))])),
        body,
        dec,
        Call::op(op("eqi", vec![("rd", r(T2)), ("rs1", r(T0)), ("imm", Value::Fixed(0))])),
        Call::op(op("if", vec![("rs2", r(T2)), ("imm", Value::Label(LabelRef::new("L")))])),
    ];
    (calls, 1)
}

#[test]
fn dependency_group_is_generated_once() {
    let count = Rc::new(Cell::new(0));
    let mut ctx = rk16::context(quiet());
    ctx.testbase = Box::new(Counting(Rc::clone(&count)));
    let mut generator = Generator::new(ctx);

    let (calls, body) = countdown();
    let seq = generator.run(&Attrs::new(), calls).unwrap().remove(0);

    assert_eq!(seq.calls[body].exec_count, 2);
    assert_eq!(seq.calls[body + 1].exec_count, 2);
    assert_eq!(count.get(), 1);

    // rs1 of the loop body is initialized once, before the loop.
    assert_eq!(seq.prologue.len(), 1);
    assert_eq!(seq.prologue[0].text, "loadi t1, 0x0005");
    assert_eq!(seq.calls[4].text, format!("if t2, {}", seq.calls[body].labels[0].unique_name()));
}

#[test]
fn runaway_loop_hits_execution_limit() {
    let options = Options {
        branch_exec_limit: 5,
        ..quiet()
    };
    let mut generator = Generator::new(rk16::context(options));
    let calls = vec![Call::op(op("jump", vec![("imm", Value::Label(LabelRef::new("spin")))]))
        .label(Label::new("spin"))];
    let err = generator.run(&Attrs::new(), calls).unwrap_err();
    match err {
        Error::Aborted { source, .. } => {
            assert!(matches!(*source, Error::ExecutionLimit(_, 5)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn branch_template() -> Vec<Call> {
    let mut branch = op("if", vec![("rs2", r(T2)), ("imm", Value::Label(LabelRef::new("end")))]);
    branch.situation = Some(Situation::new("branch").engine(BranchEngine::ID));
    vec![
        Call::op(branch),
        Call::op(op("addi", vec![("rd", r(T0)), ("rs1", r(T0)), ("imm", Value::Fixed(1))])),
        Call::op(op("nop", vec![])).label(Label::new("end")),
    ]
}

#[test]
fn branch_engine_enumerates_outcomes() {
    let mut generator = Generator::new(rk16::context(quiet()));
    let attrs: Attrs = serde_yaml::from_str("engines:\n  branch:\n    trace_count_limit: -1\n").unwrap();
    let seqs = generator.run(&attrs, branch_template()).unwrap();
    assert_eq!(seqs.len(), 2);

    // Taken: the condition register is cleared and the increment skipped.
    let taken = &seqs[0];
    assert_eq!(taken.calls[0].text, "xor t2, t2, t2");
    assert_eq!(taken.calls[2].exec_count, 0);
    assert_eq!(taken.calls[3].exec_count, 1);

    let fallthrough = &seqs[1];
    assert_eq!(fallthrough.calls[0].text, "loadi t2, 0x0001");
    assert_eq!(fallthrough.calls[2].exec_count, 1);
    assert_eq!(fallthrough.start, taken.end);

    let end = |seq: &tgen::ConcreteSequence| seq.calls[3].labels[0].unique_name();
    assert_ne!(end(taken), end(fallthrough));
}

#[test]
fn engines_can_be_disabled() {
    let mut generator = Generator::new(rk16::context(quiet()));
    let mut attrs = Attrs::new();
    attrs.insert("engines".into(), Attr::Bool(false));
    let seqs = generator.run(&attrs, branch_template()).unwrap();
    assert_eq!(seqs.len(), 1);
    let texts: Vec<&str> = seqs[0].calls.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts[1], "addi t0, t0, 0x0001");
    assert_eq!(seqs[0].calls.len(), 3);
}

struct Unavailable;

impl TestBase for Unavailable {
    fn execute(&mut self, _: &Query) -> tgen::Result<Vec<TestData>> {
        Err(Error::Model("solver unavailable".to_string()))
    }
}

#[test]
fn knowledge_base_failure_names_situation() {
    let mut ctx = rk16::context(quiet());
    ctx.testbase = Box::new(Unavailable);
    let mut addi = op("addi", vec![("rd", r(T0)), ("rs1", r(T1)), ("imm", Value::Fixed(1))]);
    addi.situation = Some(Situation::new("overflow"));

    let err = Generator::new(ctx)
        .run(&Attrs::new(), vec![Call::op(addi)])
        .unwrap_err();
    match err {
        Error::Aborted { source, .. } => match *source {
            Error::Query(situation, reason) => {
                assert_eq!(situation, "overflow");
                assert!(reason.contains("solver unavailable"));
            }
            other => panic!("unexpected {other}"),
        },
        other => panic!("unexpected {other}"),
    }
}
