//! Programs taken from source text all the way through to execution.
use assembler::assemble;
use cpu::{Alarm, BufferConsole, ExecutionMode, Machine, MachineState, RunState};
use linker::{link, load, LinkedImage, ObjectModule};

fn line(label: &str, op: &str, operands: &str) -> String {
    format!("{label:<9}{op:<8}{operands}").trim_end().to_string()
}

fn source(lines: &[(&str, &str, &str)]) -> String {
    lines
        .iter()
        .map(|(label, op, operands)| line(label, op, operands) + "\n")
        .collect()
}

/// Assemble, render and reload one module.
fn module(name: &str, lines: &[(&str, &str, &str)]) -> ObjectModule {
    let program = match assemble(name, &source(lines)) {
        Ok(program) => program,
        Err(e) => panic!("{name} should assemble:\n{e}"),
    };
    match load(&program.object_text()) {
        Ok(module) => module,
        Err(e) => panic!("object text of {name} should load:\n{e}"),
    }
}

fn link_ok(modules: Vec<ObjectModule>, base: Option<u16>) -> LinkedImage {
    match link(modules, base) {
        Ok(image) => image,
        Err(e) => panic!("modules should link: {e}"),
    }
}

fn run(image: LinkedImage, input: &[u8]) -> (Result<MachineState, Alarm>, BufferConsole) {
    let mut machine = Machine::new(image.memory, image.start_address).with_seed(7);
    machine.set_instruction_limit(Some(10_000));
    let mut console = BufferConsole::with_input(input);
    let result = machine.run(ExecutionMode::Quiet, &mut console);
    (result, console)
}

#[test]
fn countdown() {
    let m = module(
        "countdown",
        &[
            ("COUNT", ".ORIG", "x3000"),
            ("", "LD", "R1,=#3"),
            ("LOOP", "LD", "R0,ZERO"),
            ("", "ADD", "R0,R0,R1"),
            ("", "TRAP", "x21"),
            ("", "ADD", "R1,R1,#-1"),
            ("", "BRP", "LOOP"),
            ("", "LEA", "R0,MSG"),
            ("", "TRAP", "x22"),
            ("", "TRAP", "x25"),
            ("ZERO", ".FILL", "x30"),
            ("MSG", ".STRZ", "\"!\""),
            ("", ".END", "COUNT"),
        ],
    );
    let (result, console) = run(link_ok(vec![m], None), b"");
    let state = result.expect("countdown should halt");
    assert_eq!(console.output_text(), "321!");
    assert_eq!(state.registers[1], 0);
    assert!(!state.executing);
}

#[test]
fn add_registers_built_from_immediates() {
    let m = module(
        "sum",
        &[
            ("", ".ORIG", "x3000"),
            // R2 = 15 * 4 + 5 = 0x41
            ("", "ADD", "R2,R2,#15"),
            ("", "ADD", "R2,R2,#15"),
            ("", "ADD", "R2,R2,#15"),
            ("", "ADD", "R2,R2,#15"),
            ("", "ADD", "R2,R2,#5"),
            // R3 = 15 + 15 + 12 = 0x2A
            ("", "ADD", "R3,R3,#15"),
            ("", "ADD", "R3,R3,#15"),
            ("", "ADD", "R3,R3,#12"),
            ("", "ADD", "R1,R2,R3"),
            ("", "TRAP", "x25"),
            ("", ".END", ""),
        ],
    );
    let (result, _) = run(link_ok(vec![m], None), b"");
    let state = result.expect("program should halt");
    assert_eq!(state.registers[2], 0x41);
    assert_eq!(state.registers[3], 0x2A);
    assert_eq!(state.registers[1], 0x6B);
    let c = state.condition;
    assert!(c.positive() && !c.zero() && !c.negative());
}

#[test]
fn subroutine_in_another_module() {
    let main = module(
        "main",
        &[
            ("", ".ORIG", ""),
            ("", ".EXT", "PRINT"),
            ("", "LEA", "R0,MSG"),
            ("", "JSR", "PRINT"),
            ("", "TRAP", "x25"),
            ("MSG", ".STRZ", "\"ok\""),
            ("", ".END", ""),
        ],
    );
    let library = module(
        "lib",
        &[
            ("", ".ORIG", ""),
            ("", ".ENT", "PRINT"),
            ("PRINT", "TRAP", "x22"),
            ("", "RET", ""),
            ("", ".END", ""),
        ],
    );
    let image = link_ok(vec![main, library], Some(0x3000));
    assert_eq!(image.start_address, 0x3000);
    // JSR's page offset was filled in with PRINT's address.
    assert_eq!(image.memory.read(0x3001), 0x4806);

    // The linked image survives being written out and read back.
    let reloaded = match load(&image.render()) {
        Ok(module) => module,
        Err(e) => panic!("linked image should load:\n{e}"),
    };
    let image = link_ok(vec![reloaded], None);

    let (result, console) = run(image, b"");
    let state = result.expect("program should halt");
    assert_eq!(console.output_text(), "ok");
    assert_eq!(state.registers[7], 0x3002);
}

#[test]
fn read_and_double_a_number() {
    let m = module(
        "double",
        &[
            ("", ".ORIG", "x4000"),
            ("", "TRAP", "x33"),
            ("", "ADD", "R0,R0,R0"),
            ("", "TRAP", "x31"),
            ("", "TRAP", "x25"),
            ("", ".END", ""),
        ],
    );
    let (result, console) = run(link_ok(vec![m], None), b"21\n");
    let state = result.expect("program should halt");
    assert_eq!(console.output_text(), "d? 42");
    assert_eq!(state.registers[0], 42);
}

#[test]
fn program_that_never_halts() {
    let m = module(
        "spin",
        &[
            ("", ".ORIG", "x3000"),
            ("LOOP", "BRNZP", "LOOP"),
            ("", ".END", ""),
        ],
    );
    let image = link_ok(vec![m], None);
    let mut machine = Machine::new(image.memory, image.start_address);
    machine.set_instruction_limit(Some(50));
    let mut console = BufferConsole::new();
    match machine.run(ExecutionMode::Quiet, &mut console) {
        Err(Alarm::InstructionLimitReached(50)) => (),
        other => panic!("expected the instruction limit to stop the program, got {other:?}"),
    }
    assert_eq!(machine.run_state(), RunState::Faulted);
}
