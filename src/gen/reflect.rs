use std::io::{self, Write};

use super::{banner, close_guard, includes, open_guard};
use crate::config::Config;
use crate::guard;
use crate::model::{MemberInfo, MemberShape, Model, StructInfo};

/// `VulkanStructToJson.hpp`: one `to_json` declaration per struct.
pub fn emit_header<W: Write>(model: &Model, config: &Config, out: &mut W) -> io::Result<()> {
    banner(out)?;
    writeln!(out, "#pragma once")?;
    includes(out, &config.layer.struct_header_includes)?;

    for info in model.structs.values() {
        let condition = guard::struct_guard(model, &info.name);
        open_guard(out, condition.as_deref())?;
        writeln!(out, "{};", prototype(info))?;
        close_guard(out, condition.as_deref())?;
        writeln!(out)?;
    }
    Ok(())
}

/// `VulkanStructToJson.cpp`: one `to_json` definition per struct, guarded
/// exactly like its declaration.
pub fn emit_source<W: Write>(model: &Model, config: &Config, out: &mut W) -> io::Result<()> {
    banner(out)?;
    includes(out, &config.layer.struct_source_includes)?;

    for info in model.structs.values() {
        let condition = guard::struct_guard(model, &info.name);
        open_guard(out, condition.as_deref())?;
        writeln!(out, "{} {{", prototype(info))?;
        for member in &info.members {
            emit_member(member, out)?;
        }
        writeln!(out, "}}")?;
        close_guard(out, condition.as_deref())?;
        writeln!(out)?;
    }
    Ok(())
}

fn prototype(info: &StructInfo) -> String {
    format!("void to_json(nlohmann::json& j, const {}& value)", info.name)
}

fn emit_member<W: Write>(member: &MemberInfo, out: &mut W) -> io::Result<()> {
    let name = &member.name;
    match &member.shape {
        MemberShape::FixedArray(len) => {
            writeln!(out, "\tj[\"{}\"] = nlohmann::json::array();", name)?;
            writeln!(out, "\tfor (size_t i = 0; i < {}; i++) {{", len)?;
            writeln!(out, "\t\tj[\"{0}\"].push_back(value.{0}[i]);", name)?;
            writeln!(out, "\t}}")
        }
        MemberShape::FunctionPointerRef | MemberShape::RawBytePointer => writeln!(
            out,
            "\tj[\"{0}\"] = value.{0} ? reinterpret_cast<intptr_t>(value.{0}) : 0;",
            name
        ),
        MemberShape::HandleRef => writeln!(
            out,
            "\tj[\"{0}\"] = value.{0} ? reinterpret_cast<uintptr_t>(value.{0}) : 0;",
            name
        ),
        MemberShape::CountedPointerView(count) => writeln!(
            out,
            "\tj[\"{0}\"] = std::span(value.{0}, value.{0} ? static_cast<size_t>(value.{1}) : 0);",
            name, count
        ),
        MemberShape::CStringPointer => writeln!(
            out,
            "\tj[\"{0}\"] = value.{0} ? std::string(value.{0}) : std::string();",
            name
        ),
        MemberShape::OptionalPointer => {
            writeln!(out, "\tif (value.{})", name)?;
            writeln!(out, "\t\tj[\"{0}\"] = *value.{0};", name)?;
            writeln!(out, "\telse")?;
            writeln!(out, "\t\tj[\"{}\"] = {}();", name, member.type_name)
        }
        MemberShape::EmbeddedStruct | MemberShape::Scalar => {
            writeln!(out, "\tj[\"{0}\"] = value.{0};", name)
        }
    }
}
