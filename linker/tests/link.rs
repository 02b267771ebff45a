use std::fs;

use linker::{link, link_files, load, load_and_link_files, LinkFailure, LinkerFailure};

const MODULE_A: &str = "\
HA     30000006
T30002005
T30011021
T30020000
T30030000
T30040000
T3005002A
XA3005FOO
E3000
";

const MODULE_B: &str = "\
HB     MMMM0002
T00002000
T00010E00M0
I000080FOO
XR0001BENTRY
E0000
";

#[test]
fn relocatable_module_follows_absolute_module() {
    let a = load(MODULE_A).expect("module A is valid");
    let b = load(MODULE_B).expect("module B is valid");
    let image = link(vec![a, b], None).expect("modules should link");

    assert_eq!(image.start_address, 0x3000);
    assert_eq!(image.segment_name, "A     ");
    // Module B now starts just after module A, and its LD picks up
    // the page offset of FOO.
    assert_eq!(image.memory.read(0x3006), 0x2005);
    // The relocatable page offset moved with the module.
    assert_eq!(image.memory.read(0x3007), 0x0E06);
    // Module A is untouched.
    assert_eq!(image.memory.read(0x3000), 0x2005);
    assert_eq!(image.memory.read(0x3005), 0x002A);
    assert_eq!(image.memory.len(), 8);
}

#[test]
fn full_word_import_receives_whole_address() {
    let b = load("HB     MMMM0001\nT00000000\nI0000F0FOO\nE0000\n").expect("valid module");
    let a = load(MODULE_A).expect("module A is valid");
    let image = link(vec![a, b], None).expect("modules should link");
    assert_eq!(image.memory.read(0x3006), 0x3005);
}

#[test]
fn linked_program_must_stay_on_one_page() {
    let a = load("HA     31FE0002\nT31FE1021\nT31FF0000\nE31FE\n").expect("valid module");
    let b = load("HB     MMMM0002\nT00001021\nT00010000\nE0000\n").expect("valid module");
    assert_eq!(
        link(vec![a, b], None),
        Err(LinkFailure::CrossesPage {
            first: 0x31FE,
            last: 0x3201,
        })
    );
}

#[test]
fn next_module_follows_last_written_word() {
    // Module A's header covers four words but only the first is
    // written.
    let a = load("HA     30000004\nT30001021\nE3000\n").expect("valid module");
    let b = load("HB     MMMM0001\nT00001021\nE0000\n").expect("valid module");
    let image = link(vec![a, b], None).expect("modules should link");
    assert_eq!(image.memory.read(0x3001), 0x1021);
    assert!(!image.memory.contains(0x3004));
    assert_eq!(image.memory.len(), 2);
}

#[test]
fn relocatable_modules_chain_without_gaps() {
    let a = load("HA     MMMM0003\nT00001021\nE0000\n").expect("valid module");
    let b = load("HB     MMMM0002\nT00000E01M0\nT00011021\nE0000\n").expect("valid module");
    let c = load("HC     MMMM0001\nT0000F025\nE0000\n").expect("valid module");
    let image = link(vec![a, b, c], Some(0x3000)).expect("modules should link");
    assert_eq!(image.memory.read(0x3000), 0x1021);
    // B starts at 0x3001 and its page offset moved with it.
    assert_eq!(image.memory.read(0x3001), 0x0E02);
    assert_eq!(image.memory.read(0x3002), 0x1021);
    assert_eq!(image.memory.read(0x3003), 0xF025);
}

#[test]
fn link_files_writes_absolute_object_file() {
    let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
    let a_path = dir.path().join("a.obj");
    let b_path = dir.path().join("b.obj");
    let out_path = dir.path().join("linked.obj");
    fs::write(&a_path, MODULE_A).expect("should be able to write module A");
    fs::write(&b_path, MODULE_B).expect("should be able to write module B");

    link_files(&[a_path.clone(), b_path.clone()], &out_path, None).expect("link should succeed");

    let text = fs::read_to_string(&out_path).expect("output should be readable");
    assert!(text.starts_with("HA     30000008\n"));
    assert!(text.ends_with("E3000\n"));
    let reloaded = load(&text).expect("linked output should load");
    assert!(!reloaded.is_relocatable());
    assert_eq!(reloaded.memory().read(0x3006), 0x2005);
    assert!(reloaded.imports().is_empty());

    let image = load_and_link_files(&[a_path, b_path], None).expect("link should succeed");
    assert_eq!(reloaded.memory(), &image.memory);
}

#[test]
fn load_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
    let bad = dir.path().join("bad.obj");
    fs::write(&bad, "HA     30000001\nT4000FFFF\nE3000\n").expect("should be able to write");
    match load_and_link_files(&[bad], None) {
        Err(LinkerFailure::Load { errors, .. }) => {
            assert_eq!(errors.errors().len(), 1);
            assert_eq!(errors.errors()[0].line, Some(2));
        }
        other => panic!("expected a load failure, got {other:?}"),
    }
}

#[test]
fn missing_input_file() {
    let dir = tempfile::tempdir().expect("should be able to create a temporary directory");
    let missing = dir.path().join("missing.obj");
    assert!(matches!(
        load_and_link_files(&[missing], None),
        Err(LinkerFailure::IoErrorOnInput { .. })
    ));
}
