// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use dtflat::header::BlobHeader;
use dtflat::model::{BootInfo, Node, Property};
use dtflat::version::{VersionFlags, VersionInfo};
use dtflat::{EncodeConfig, EncodeError, MemoryReservation};

fn sample_tree() -> BootInfo {
    let root = Node::builder("")
        .property(Property::new("model", "dtflat,sample\0"))
        .property(Property::new("#address-cells", 2u32.to_be_bytes()))
        .property(Property::new("#size-cells", 2u32.to_be_bytes()))
        .child(
            Node::builder("cpus")
                .child(
                    Node::builder("cpu@0")
                        .property(Property::new("reg", 0u32.to_be_bytes()))
                        .property(Property::new("enable-method", "psci\0"))
                        .build(),
                )
                .child(
                    Node::builder("cpu@1")
                        .property(Property::new("reg", 1u32.to_be_bytes()))
                        .build(),
                )
                .build(),
        )
        .child(
            Node::builder("memory@80000000")
                .property(Property::new("device_type", "memory\0"))
                .property(Property::new(
                    "reg",
                    [0x8000_0000u64.to_be_bytes(), 0x1000_0000u64.to_be_bytes()].concat(),
                ))
                .build(),
        )
        .child(
            Node::builder("chosen")
                .property(Property::new("bootargs", "console=ttyS0\0"))
                .property(Property::new("linux,initrd-start", ""))
                .build(),
        )
        .build();
    BootInfo::with_reservations(
        root,
        vec![
            MemoryReservation::new(0x1000, 0x100),
            MemoryReservation::new(0x4000_0000, 0x20_0000),
        ],
    )
}

/// Rebuilds `node` with the `name` property that legacy versions add to
/// every node lacking one.
fn with_name_properties(node: &Node) -> Node {
    let mut builder = Node::builder(node.name());
    for prop in node.properties() {
        builder = builder.property(prop.clone());
    }
    if node.property("name").is_none() {
        let mut value = node.base_name().as_bytes().to_vec();
        value.push(0);
        builder = builder.property(Property::new("name", value));
    }
    for child in node.children() {
        builder = builder.child(with_name_properties(child));
    }
    builder.build()
}

#[test]
fn round_trip_current_version() {
    let boot_info = sample_tree();
    let blob = boot_info.to_blob(16).unwrap();
    let decoded = BootInfo::from_blob(&blob).unwrap();
    assert_eq!(decoded, boot_info);
}

#[test]
fn round_trip_legacy_versions() {
    let boot_info = sample_tree();
    let expected = BootInfo::with_reservations(
        with_name_properties(boot_info.root()),
        boot_info.memory_reservations.clone(),
    );

    for version in [1, 2, 3] {
        let blob = boot_info.to_blob(version).unwrap();
        let decoded = BootInfo::from_blob(&blob).unwrap();
        assert_eq!(decoded, expected, "version {version}");

        // Decoding already carries the `name` properties, so a second pass
        // is stable.
        let again = BootInfo::from_blob(&decoded.to_blob(version).unwrap()).unwrap();
        assert_eq!(again, expected, "version {version}");
    }
}

#[test]
fn legacy_version_synthesizes_name() {
    let root = Node::builder("")
        .child(
            Node::builder("cpu@0")
                .property(Property::new("reg", [0u8; 4]))
                .build(),
        )
        .build();
    let blob = BootInfo::new(root).to_blob(3).unwrap();
    let decoded = BootInfo::from_blob(&blob).unwrap();

    let cpu = decoded.find_node("/cpu@0").unwrap();
    assert_eq!(cpu.name(), "cpu@0");
    assert_eq!(cpu.base_name_len(), 3);
    assert_eq!(cpu.full_path(), "/cpu@0");
    assert_eq!(cpu.properties().count(), 2);
    assert_eq!(cpu.property("reg").unwrap().value(), &[0, 0, 0, 0]);
    assert_eq!(cpu.property("name").unwrap().value(), b"cpu\0");

    assert!(contains(&blob, b"/cpu@0\0"));
}

#[test]
fn current_version_uses_bare_names() {
    let root = Node::builder("")
        .child(
            Node::builder("cpu@0")
                .property(Property::new("reg", [0u8; 4]))
                .build(),
        )
        .build();
    let blob = BootInfo::new(root).to_blob(16).unwrap();
    let decoded = BootInfo::from_blob(&blob).unwrap();

    let cpu = decoded.find_node("/cpu@0").unwrap();
    assert_eq!(cpu.full_path(), "/cpu@0");
    assert!(cpu.property("name").is_none());
    assert!(decoded.root().property("name").is_none());

    assert!(contains(&blob, b"cpu@0\0"));
    assert!(!contains(&blob, b"/cpu@0"));
    assert!(blob.ends_with(b"reg\0"));
}

#[test]
fn header_arithmetic() {
    let boot_info = sample_tree();
    for info in VersionInfo::all() {
        let blob = boot_info.to_blob(info.version()).unwrap();
        let header = BlobHeader::parse(&blob).unwrap();

        assert_eq!(header.version, info.version());
        assert_eq!(header.last_comp_version, info.last_comp_version());
        assert_eq!(header.totalsize as usize, blob.len());
        assert_eq!(
            header.off_mem_rsvmap as usize,
            info.header_size().next_multiple_of(8)
        );
        assert_eq!(
            header.off_dt_struct,
            header.off_mem_rsvmap + 16 * 3,
            "two reservations plus the terminator"
        );
        assert!(header.off_dt_strings > header.off_dt_struct);
        assert!(header.totalsize >= header.off_dt_strings);

        if info.flags().contains(VersionFlags::HAS_BOOT_CPUID) {
            assert_eq!(header.boot_cpuid_phys, Some(0xfeed_beef));
        } else {
            assert_eq!(header.boot_cpuid_phys, None);
        }
        if info.flags().contains(VersionFlags::HAS_STRING_TABLE_SIZE) {
            assert_eq!(
                header.size_dt_strings,
                Some(header.totalsize - header.off_dt_strings)
            );
        } else {
            assert_eq!(header.size_dt_strings, None);
        }
    }
}

#[test]
fn header_padding_is_zero() {
    let boot_info = sample_tree();

    let v1 = boot_info.to_blob(1).unwrap();
    assert_eq!(&v1[28..32], &[0; 4]);

    let v3 = boot_info.to_blob(3).unwrap();
    assert_eq!(&v3[36..40], &[0; 4]);
}

#[test]
fn minimal_current_blob() {
    let blob = BootInfo::new(Node::new("")).to_blob(16).unwrap();
    let words = |values: &[u32]| -> Vec<u8> {
        values.iter().flat_map(|value| value.to_be_bytes()).collect()
    };
    let expected = [
        words(&[0xd00d_feed, 72, 56, 72, 40, 16, 16, 0xfeed_beef, 0]),
        vec![0; 4],
        vec![0; 16],
        words(&[1, 0, 2, 9]),
    ]
    .concat();
    assert_eq!(blob, expected);
}

#[test]
fn minimal_legacy_blob() {
    let blob = BootInfo::new(Node::new("")).to_blob(1).unwrap();
    let words = |values: &[u32]| -> Vec<u8> {
        values.iter().flat_map(|value| value.to_be_bytes()).collect()
    };
    let expected = [
        words(&[0xd00d_feed, 85, 48, 80, 32, 1, 1]),
        vec![0; 4],
        vec![0; 16],
        words(&[1]),
        b"/\0\0\0".to_vec(),
        words(&[3, 1, 0]),
        vec![0; 4],
        words(&[2, 9]),
        b"name\0".to_vec(),
    ]
    .concat();
    assert_eq!(blob, expected);
}

#[test]
fn encoding_is_deterministic() {
    let boot_info = sample_tree();
    for info in VersionInfo::all() {
        assert_eq!(
            boot_info.to_blob(info.version()).unwrap(),
            boot_info.to_blob(info.version()).unwrap()
        );
    }
}

#[test]
fn shared_property_names_are_stored_once() {
    let blob = sample_tree().to_blob(16).unwrap();
    let header = BlobHeader::parse(&blob).unwrap();
    let strings = &blob[header.off_dt_strings as usize..];
    assert_eq!(
        strings,
        b"model\0#address-cells\0#size-cells\0reg\0enable-method\0\
          device_type\0bootargs\0linux,initrd-start\0"
    );
}

#[test]
fn configured_boot_cpuid() {
    let boot_info = sample_tree();
    let blob = boot_info
        .to_blob_with(&EncodeConfig::new(2).boot_cpuid_phys(3))
        .unwrap();
    assert_eq!(BlobHeader::parse(&blob).unwrap().boot_cpuid_phys, Some(3));

    let blob = boot_info
        .to_blob_with(&EncodeConfig::new(1).boot_cpuid_phys(3))
        .unwrap();
    assert_eq!(BlobHeader::parse(&blob).unwrap().boot_cpuid_phys, None);
}

#[test]
fn unknown_version() {
    let boot_info = sample_tree();
    for version in [0, 4, 15, 17] {
        assert_eq!(
            boot_info.to_blob(version),
            Err(EncodeError::UnknownVersion(version))
        );
    }
}

#[test]
fn names_that_cannot_round_trip_are_rejected() {
    let nul_property = Node::builder("")
        .property(Property::new("reg\0x", [0u8; 4]))
        .build();
    let nul_node = Node::builder("").child(Node::new("ab\0c")).build();
    let slash_node = Node::builder("").child(Node::new("a/b")).build();

    for version in [1, 16] {
        for (root, name) in [
            (nul_property.clone(), "reg\0x"),
            (nul_node.clone(), "ab\0c"),
            (slash_node.clone(), "a/b"),
        ] {
            let boot_info = BootInfo::new(root);
            let expected = EncodeError::InvalidName { name: name.into() };
            assert_eq!(boot_info.to_blob(version), Err(expected.clone()));
            assert_eq!(boot_info.to_asm(version), Err(expected));
        }
    }
}

#[test]
fn empty_reservation_is_rejected() {
    let boot_info = BootInfo::with_reservations(
        Node::new(""),
        vec![
            MemoryReservation::new(0x1000, 0),
            MemoryReservation::new(0x2000, 0x10),
        ],
    );
    for version in [1, 16] {
        assert_eq!(
            boot_info.to_blob(version),
            Err(EncodeError::EmptyReservation { address: 0x1000 })
        );
    }
    assert_eq!(
        boot_info.to_asm(16),
        Err(EncodeError::EmptyReservation { address: 0x1000 })
    );
}

#[test]
fn memreserve() {
    let boot_info = sample_tree();
    let blob = boot_info.to_blob(16).unwrap();
    assert_eq!(
        &blob[40..88],
        [
            0x1000u64.to_be_bytes(),
            0x100u64.to_be_bytes(),
            0x4000_0000u64.to_be_bytes(),
            0x20_0000u64.to_be_bytes(),
            [0; 8],
            [0; 8],
        ]
        .concat()
    );

    let decoded = BootInfo::from_blob(&blob).unwrap();
    assert_eq!(decoded.memory_reservations, boot_info.memory_reservations);

    let dts = decoded.to_string();
    assert!(dts.contains("/memreserve/ 0x1000 0x100;"));
    assert!(dts.contains("/memreserve/ 0x40000000 0x200000;"));
}

#[test]
fn trailing_bytes_are_ignored() {
    let boot_info = sample_tree();
    let mut blob = boot_info.to_blob(3).unwrap();
    blob.extend_from_slice(&[0xff; 13]);
    let decoded = BootInfo::from_blob(&blob).unwrap();
    assert_eq!(decoded.memory_reservations, boot_info.memory_reservations);
}

#[test]
fn display() {
    let boot_info = sample_tree();
    let dts = boot_info.to_string();
    assert!(dts.starts_with("/dts-v1/;\n"));
    assert!(dts.contains("/ {\n"));
    assert!(dts.contains("    model = \"dtflat,sample\";\n"));
    assert!(dts.contains("    #address-cells = <0x00000002>;\n"));
    assert!(dts.contains("        cpu@0 {\n"));
    assert!(dts.contains("            reg = <0x00000000>;\n"));
    assert!(dts.contains("        linux,initrd-start;\n"));
    assert!(dts.ends_with("};\n"));
}

#[cfg(feature = "std")]
#[test]
fn from_reader_consumes_exactly_totalsize() {
    let boot_info = sample_tree();
    let blob = boot_info.to_blob(2).unwrap();
    let mut input = blob.clone();
    input.extend_from_slice(b"trailer");

    let mut reader = std::io::Cursor::new(input);
    let decoded = BootInfo::from_reader(&mut reader).unwrap();
    assert_eq!(decoded.memory_reservations, boot_info.memory_reservations);
    assert_eq!(reader.position() as usize, blob.len());
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
