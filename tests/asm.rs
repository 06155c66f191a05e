// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use dtflat::model::{BootInfo, Node, Property};
use dtflat::{EncodeConfig, EncodeError, MemoryReservation};

fn sample_tree() -> BootInfo {
    let root = Node::builder("")
        .child(
            Node::builder("cpu@0")
                .label("cpu0")
                .property(Property::new("reg", [0u8; 4]).with_label("cpu0_reg"))
                .build(),
        )
        .child(
            Node::builder("memory")
                .property(Property::new("reg", [0x12u8; 16]))
                .build(),
        )
        .build();
    BootInfo::with_reservations(root, vec![MemoryReservation::new(0x1000, 0x100)])
}

#[test]
fn preamble_and_header() {
    let asm = sample_tree().to_asm(3).unwrap();
    assert!(asm.starts_with("/* autogenerated by dtc, do not edit */\n\n"));
    for define in [
        "#define OF_DT_HEADER 0xd00dfeed\n",
        "#define OF_DT_BEGIN_NODE 0x1\n",
        "#define OF_DT_END_NODE 0x2\n",
        "#define OF_DT_PROP 0x3\n",
        "#define OF_DT_END 0x9\n",
    ] {
        assert!(asm.contains(define), "{define}");
    }
    assert!(asm.contains(
        "\t.globl\tdt_blob_start\ndt_blob_start:\n_dt_blob_start:\n\
         \t.globl\tdt_header\ndt_header:\n_dt_header:\n\
         \t.long\tOF_DT_HEADER /* magic */\n\
         \t.long\t_dt_blob_end - _dt_blob_start /* totalsize */\n\
         \t.long\t_dt_struct_start - _dt_blob_start /* off_dt_struct */\n\
         \t.long\t_dt_strings_start - _dt_blob_start /* off_dt_strings */\n\
         \t.long\t_dt_reserve_map - _dt_blob_start /* off_mem_rsvmap */\n\
         \t.long\t3 /* version */\n\
         \t.long\t1 /* last_comp_version */\n\
         \t.long\t0xdeadbeef\t/* boot_cpuid_phys */\n\
         \t.long\t_dt_strings_end - _dt_strings_start\t/* size_dt_strings */\n\
         \t.balign\t8\n"
    ));
}

#[test]
fn header_fields_follow_version() {
    let boot_info = sample_tree();

    let v1 = boot_info.to_asm(1).unwrap();
    assert!(!v1.contains("boot_cpuid_phys"));
    assert!(!v1.contains("size_dt_strings"));

    let v2 = boot_info.to_asm(2).unwrap();
    assert!(v2.contains("\t.long\t0xdeadbeef\t/* boot_cpuid_phys */\n"));
    assert!(!v2.contains("size_dt_strings"));

    let v16 = boot_info.to_asm(16).unwrap();
    assert!(v16.contains("\t.long\t16 /* version */\n"));
    assert!(v16.contains("\t.long\t16 /* last_comp_version */\n"));
    assert!(v16.contains("/* size_dt_strings */"));
}

#[test]
fn reserve_map() {
    let asm = sample_tree().to_asm(16).unwrap();
    assert!(asm.contains(
        "dt_reserve_map:\n_dt_reserve_map:\n\
         \t.quad\t_dt_blob_start, _dt_blob_end - _dt_blob_start\n\
         /* Memory reserve map from source file */\n\
         \t.long\t0x0\n\t.long\t0x1000\n\t.long\t0x0\n\t.long\t0x100\n\
         \t.quad\t0\n\t.quad\t0\n"
    ));

    let empty = BootInfo::new(Node::new("")).to_asm(16).unwrap();
    assert!(empty.contains(
        "\t.quad\t_dt_blob_start, _dt_blob_end - _dt_blob_start\n\t.quad\t0\n\t.quad\t0\n"
    ));
    assert!(!empty.contains("from source file"));
}

#[test]
fn section_labels_are_ordered() {
    let asm = sample_tree().to_asm(16).unwrap();
    let positions: Vec<_> = [
        "dt_blob_start:",
        "dt_header:",
        "dt_reserve_map:",
        "dt_struct_start:",
        "\t.long\tOF_DT_END\n",
        "dt_struct_end:",
        "dt_strings_start:",
        "dt_strings_end:",
        "dt_blob_end:",
    ]
    .iter()
    .map(|label| asm.find(label).unwrap())
    .collect();
    assert!(positions.is_sorted());
    assert!(asm.ends_with("_dt_blob_end:\n"));
}

#[test]
fn labels() {
    let asm = sample_tree().to_asm(16).unwrap();
    assert!(asm.contains(
        "\t.globl\tcpu0\ncpu0:\n\t.long\tOF_DT_BEGIN_NODE\n\t.string\t\"cpu@0\"\n\t.balign\t4\n\
         \t.globl\tcpu0_reg\ncpu0_reg:\n\t.long\tOF_DT_PROP\n\t.long\t0x4\n\t.long\t0x0\n\
         \t.long\t0x0\n\t.balign\t4\n\
         \t.long\tOF_DT_END_NODE\n\t.globl\tcpu0_end\ncpu0_end:\n"
    ));
}

#[test]
fn legacy_structure() {
    let asm = sample_tree().to_asm(1).unwrap();
    assert!(asm.contains("\t.string\t\"/cpu@0\"\n"));
    assert!(asm.contains("\t.string\t\"/memory\"\n"));
    // The synthesized `name` property of cpu@0.
    assert!(asm.contains("\t.long\t0x4\n\t.long\t0x0\n\t.string\t\"cpu\"\n"));
    assert!(asm.contains(
        "dt_strings_start:\n_dt_strings_start:\n\
         \t.string\t\"name\"\n\t.string\t\"reg\"\n\
         \t.globl\tdt_strings_end\n"
    ));
}

#[test]
fn current_structure() {
    let asm = sample_tree().to_asm(16).unwrap();
    assert!(asm.contains("\t.string\t\"cpu@0\"\n"));
    assert!(!asm.contains("\"/cpu@0\""));
    assert!(!asm.contains("\t.string\t\"name\"\n"));
    assert!(asm.contains(
        "dt_strings_start:\n_dt_strings_start:\n\t.string\t\"reg\"\n\t.globl\tdt_strings_end\n"
    ));
}

#[test]
fn large_values_are_aligned_in_legacy_versions() {
    // One `.balign 8` always precedes the reserve map.
    let v3 = sample_tree().to_asm(3).unwrap();
    assert_eq!(v3.matches("\t.balign\t8\n").count(), 2);
    assert!(v3.contains("\t.long\t0x10\n\t.long\t0x5\n\t.balign\t8\n\t.long\t0x12121212\n"));

    let v16 = sample_tree().to_asm(16).unwrap();
    assert_eq!(v16.matches("\t.balign\t8\n").count(), 1);
}

#[test]
fn configured_prefix_and_boot_cpuid() {
    let config = EncodeConfig::new(2).symbol_prefix("fdt").boot_cpuid_phys(1);
    let asm = sample_tree().to_asm_with(&config).unwrap();
    assert!(asm.contains("\t.globl\tfdt_blob_start\nfdt_blob_start:\n_fdt_blob_start:\n"));
    assert!(asm.contains("\t.long\t_fdt_blob_end - _fdt_blob_start /* totalsize */\n"));
    assert!(asm.contains("\t.long\t0x1\t/* boot_cpuid_phys */\n"));
    assert!(!asm.contains("dt_blob_start:\n_dt_"));
}

#[test]
fn names_are_escaped() {
    let root = Node::builder("").child(Node::new("a\"b")).build();
    let asm = BootInfo::new(root).to_asm(16).unwrap();
    assert!(asm.contains("\t.string\t\"a\\\"b\"\n"));
}

#[test]
fn unknown_version() {
    assert_eq!(
        sample_tree().to_asm(0),
        Err(EncodeError::UnknownVersion(0))
    );
}
