//! Interpreter command line.
//!
//! `pyrite <input> <output>` interprets the program in `input` and writes
//! whatever it prints to `output`.  `pyrite --test` runs a small embedded
//! suite of scenario programs against the interpreter.

use std::env;
use std::fs::File;
use std::io::BufReader;

use anyhow::{bail, Context};

use pyrite::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [flag] if flag == "--test" || flag == "-t" => run_scenarios()?,
        [flag] if flag == "--help" || flag == "-h" => print_help(),
        [input, output] => run_file(input, output)?,
        _ => print_help(),
    }
    Ok(())
}

fn print_help() {
    println!("Usage:");
    println!("  pyrite <input-file> <output-file>   interpret input-file, write program output to output-file");
    println!("  pyrite --test | -t                  run the embedded scenario suite");
    println!("  pyrite --help | -h                  show this message");
}

fn run_file(input: &str, output: &str) -> Result<(), anyhow::Error> {
    let reader =
        BufReader::new(File::open(input).with_context(|| format!("failed to open {}", input))?);
    let mut writer =
        File::create(output).with_context(|| format!("failed to create {}", output))?;

    let mut interp = Interpreter::new(&mut writer);
    interp.eval(reader)?;

    println!("Program output was written to {}", output);
    Ok(())
}

struct Scenario {
    name: &'static str,
    program: &'static str,
    expected: &'static str,
}

const SCENARIOS: [Scenario; 6] = [
    Scenario {
        name: "simple prints",
        program: "print 57\nprint 10, 24, -8\nprint 'hello'\nprint \"world\"\nprint True, False\nprint\nprint None\n",
        expected: "57\n10 24 -8\nhello\nworld\nTrue False\n\nNone\n",
    },
    Scenario {
        name: "assignments",
        program: "x = 57\nprint x\nx = 'C++ black belt'\nprint x\ny = False\nx = y\nprint x\nx = None\nprint x, y\n",
        expected: "57\nC++ black belt\nFalse\nNone False\n",
    },
    Scenario {
        name: "arithmetic",
        program: "print 1+2+3+4+5, 1*2*3*4*5, 1-2-3-4-5, 36/4/3, 2*5+10/2\n",
        expected: "15 120 -13 3 15\n",
    },
    Scenario {
        name: "variables are pointers",
        program: "\
class Counter:
  def __init__():
    self.value = 0

  def add():
    self.value = self.value + 1

class Dummy:
  def do_add(counter):
    counter.add()

x = Counter()
y = x

x.add()
y.add()

print x.value

d = Dummy()
d.do_add(x)

print y.value
",
        expected: "2\n3\n",
    },
    Scenario {
        name: "custom comparisons",
        program: "\
class Rating:
  def __init__(value):
    self.value = value

  def __eq__(rhs):
    return self.value == rhs.value

  def __lt__(rhs):
    return self.value < rhs.value

a = Rating(1)
b = Rating(2)
print a == b, a != b, a < b, a > b, a <= b, a >= b
",
        expected: "False True True False True False\n",
    },
    Scenario {
        name: "return exits the enclosing method only",
        program: "\
class T:
  def f():
    if True: return 1
    print 666

t = T()
print t.f()
",
        expected: "1\n",
    },
];

fn run_scenarios() -> Result<(), anyhow::Error> {
    for scenario in &SCENARIOS {
        let mut output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut output);
        if let Err(e) = interp.eval(scenario.program.as_bytes()) {
            bail!("scenario '{}' failed: {}", scenario.name, e);
        }
        if output != scenario.expected.as_bytes() {
            bail!(
                "scenario '{}' produced wrong output:\n--- got ---\n{}\n--- expected ---\n{}",
                scenario.name,
                String::from_utf8_lossy(&output),
                scenario.expected
            );
        }
        println!("ok: {}", scenario.name);
    }
    println!("all {} scenarios passed", SCENARIOS.len());
    Ok(())
}
