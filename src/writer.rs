// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::{
    EncodeConfig,
    emit::{
        AsmEmitter, BinaryEmitter, Emitter, FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_MAGIC,
        FDT_PROP, FDT_TAGSIZE,
    },
    error::EncodeError,
    header::{BlockSizes, FdtHeader, Layout},
    memreserve::ReserveEntry,
    model::{BootInfo, Node},
    strings::StringTable,
    version::{VersionFlags, VersionInfo},
};
use alloc::vec::Vec;
use core::fmt;
use log::trace;
use zerocopy::IntoBytes;

const NAME_PROPERTY: &str = "name";

pub(crate) fn to_blob(boot_info: &BootInfo, config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
    let info = VersionInfo::lookup(config.version())?;
    check_encodable(boot_info)?;

    let mut structure = BinaryEmitter::new();
    let mut strings = StringTable::new();
    flatten_tree(boot_info.root(), &mut structure, &mut strings, info)?;
    structure.cell(FDT_END)?;

    let sizes = BlockSizes {
        reservations: boot_info.memory_reservations.len(),
        structure: structure.len(),
        strings: strings.len(),
    };
    let layout = Layout::new(info, &sizes);
    let header = FdtHeader::build(info, &layout, &sizes, config.blob_boot_cpuid())?;
    trace!(
        "flattened tree as version {}: {} reservations, {} structure bytes, {} string bytes",
        info.version(),
        sizes.reservations,
        sizes.structure,
        sizes.strings
    );

    let mut blob = Vec::with_capacity(layout.totalsize);

    // Header, zero padded up to the 8-byte aligned reservation map.
    blob.extend_from_slice(&header.as_bytes()[..info.header_size()]);
    blob.resize(layout.off_mem_rsvmap, 0);

    for reservation in &boot_info.memory_reservations {
        blob.extend_from_slice(ReserveEntry::from(reservation).as_bytes());
    }
    blob.extend_from_slice(ReserveEntry::TERMINATOR.as_bytes());

    blob.extend_from_slice(&structure.into_bytes());
    blob.extend_from_slice(strings.as_bytes());

    assert_eq!(blob.len(), layout.totalsize, "blob size does not match header");
    Ok(blob)
}

pub(crate) fn write_asm<W: fmt::Write>(
    out: &mut W,
    boot_info: &BootInfo,
    config: &EncodeConfig,
) -> Result<(), EncodeError> {
    let info = VersionInfo::lookup(config.version())?;
    check_encodable(boot_info)?;
    let prefix = config.prefix();
    let mut emitter = AsmEmitter::new(out);

    emitter.line(format_args!("/* autogenerated by dtc, do not edit */"))?;
    emitter.line(format_args!(""))?;
    emitter.line(format_args!("#define OF_DT_HEADER {FDT_MAGIC:#x}"))?;
    emitter.line(format_args!("#define OF_DT_BEGIN_NODE {FDT_BEGIN_NODE:#x}"))?;
    emitter.line(format_args!("#define OF_DT_END_NODE {FDT_END_NODE:#x}"))?;
    emitter.line(format_args!("#define OF_DT_PROP {FDT_PROP:#x}"))?;
    emitter.line(format_args!("#define OF_DT_END {FDT_END:#x}"))?;
    emitter.line(format_args!(""))?;

    emitter.global_label(prefix, "blob_start")?;
    emitter.global_label(prefix, "header")?;
    emitter.line(format_args!("\t.long\tOF_DT_HEADER /* magic */"))?;
    emitter.line(format_args!(
        "\t.long\t_{prefix}_blob_end - _{prefix}_blob_start /* totalsize */"
    ))?;
    emitter.line(format_args!(
        "\t.long\t_{prefix}_struct_start - _{prefix}_blob_start /* off_dt_struct */"
    ))?;
    emitter.line(format_args!(
        "\t.long\t_{prefix}_strings_start - _{prefix}_blob_start /* off_dt_strings */"
    ))?;
    emitter.line(format_args!(
        "\t.long\t_{prefix}_reserve_map - _{prefix}_blob_start /* off_mem_rsvmap */"
    ))?;
    emitter.line(format_args!("\t.long\t{} /* version */", info.version()))?;
    emitter.line(format_args!(
        "\t.long\t{} /* last_comp_version */",
        info.last_comp_version()
    ))?;
    if info.has(VersionFlags::HAS_BOOT_CPUID) {
        emitter.line(format_args!(
            "\t.long\t{:#x}\t/* boot_cpuid_phys */",
            config.asm_boot_cpuid()
        ))?;
    }
    if info.has(VersionFlags::HAS_STRING_TABLE_SIZE) {
        emitter.line(format_args!(
            "\t.long\t_{prefix}_strings_end - _{prefix}_strings_start\t/* size_dt_strings */"
        ))?;
    }

    // Unlike a binary blob, the assembled blob knows where it lives, so it
    // reserves its own memory.
    emitter.align(8)?;
    emitter.global_label(prefix, "reserve_map")?;
    emitter.line(format_args!(
        "\t.quad\t_{prefix}_blob_start, _{prefix}_blob_end - _{prefix}_blob_start"
    ))?;
    if !boot_info.memory_reservations.is_empty() {
        emitter.line(format_args!("/* Memory reserve map from source file */"))?;
        for reservation in &boot_info.memory_reservations {
            emitter.data(ReserveEntry::from(reservation).as_bytes())?;
        }
    }
    emitter.line(format_args!("\t.quad\t0"))?;
    emitter.line(format_args!("\t.quad\t0"))?;

    let mut strings = StringTable::new();
    emitter.global_label(prefix, "struct_start")?;
    flatten_tree(boot_info.root(), &mut emitter, &mut strings, info)?;
    emitter.line(format_args!("\t.long\tOF_DT_END"))?;
    emitter.global_label(prefix, "struct_end")?;

    emitter.global_label(prefix, "strings_start")?;
    for name in strings.names() {
        emitter.string(name)?;
    }
    emitter.global_label(prefix, "strings_end")?;

    emitter.global_label(prefix, "blob_end")
}

/// Rejects trees that would not read back the way they were written.
fn check_encodable(boot_info: &BootInfo) -> Result<(), EncodeError> {
    if let Some(reservation) = boot_info.memory_reservations.iter().find(|r| r.size() == 0) {
        return Err(EncodeError::EmptyReservation {
            address: reservation.address(),
        });
    }
    check_names(boot_info.root())
}

fn check_names(node: &Node) -> Result<(), EncodeError> {
    if node.name().contains(['\0', '/']) {
        return Err(invalid_name(node.name()));
    }
    if let Some(prop) = node.properties().find(|prop| prop.name().contains('\0')) {
        return Err(invalid_name(prop.name()));
    }
    node.children().try_for_each(check_names)
}

fn invalid_name(name: &str) -> EncodeError {
    EncodeError::InvalidName { name: name.into() }
}

/// Emits `node` and its subtree depth-first, interning property names into
/// `strings`.
fn flatten_tree<E: Emitter>(
    node: &Node,
    emitter: &mut E,
    strings: &mut StringTable,
    info: &VersionInfo,
) -> Result<(), EncodeError> {
    emitter.begin_node(node.label())?;
    if info.has(VersionFlags::FULL_PATH) {
        emitter.string(node.full_path())?;
    } else {
        emitter.string(node.name())?;
    }
    emitter.align(FDT_TAGSIZE)?;

    let mut seen_name_property = false;
    for prop in node.properties() {
        seen_name_property |= prop.name() == NAME_PROPERTY;
        let name_offset = strings.insert(prop.name())?;

        emitter.begin_property(prop.label())?;
        emitter.cell(value_len(prop.value().len())?)?;
        emitter.cell(name_offset)?;
        align_value(emitter, info, prop.value().len())?;
        emitter.data(prop.value())?;
        emitter.align(FDT_TAGSIZE)?;
    }

    if info.has(VersionFlags::SYNTHESIZE_NAME_PROPERTY) && !seen_name_property {
        let base_name = node.base_name();
        // The base name is stored with its NUL terminator.
        let len = base_name.len() + 1;
        let name_offset = strings.insert(NAME_PROPERTY)?;

        emitter.begin_property(None)?;
        emitter.cell(value_len(len)?)?;
        emitter.cell(name_offset)?;
        align_value(emitter, info, len)?;
        emitter.string(base_name)?;
        emitter.align(FDT_TAGSIZE)?;
    }

    for child in node.children() {
        flatten_tree(child, emitter, strings, info)?;
    }

    emitter.end_node(node.label())
}

fn align_value<E: Emitter>(emitter: &mut E, info: &VersionInfo, len: usize) -> Result<(), EncodeError> {
    if info.has(VersionFlags::VARIABLE_ALIGN) && len >= 8 {
        emitter.align(8)?;
    }
    Ok(())
}

fn value_len(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::TooLarge {
        what: "property value length",
    })
}
