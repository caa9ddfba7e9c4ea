use std::io::{self, Write};

use super::{banner, close_guard, includes, open_guard};
use crate::config::Config;
use crate::guard::{self, Scope};
use crate::model::{CommandInfo, CommandKind, Model, ParamInfo};

/// `VulkanCommands.cpp`: wrappers for every claimed command, then the two
/// proc-address functions.
pub fn emit_source<W: Write>(model: &Model, config: &Config, out: &mut W) -> io::Result<()> {
    banner(out)?;
    includes(out, &config.layer.command_source_includes)?;

    let (features, extensions) = guard::command_scopes(model);

    writeln!(out, "// Core commands")?;
    writeln!(out)?;
    for scope in features {
        emit_wrapper_scope(model, config, scope, out)?;
    }

    writeln!(out, "// Extension commands")?;
    writeln!(out)?;
    for scope in extensions {
        emit_wrapper_scope(model, config, scope, out)?;
    }

    emit_proc_addr(model, config, CommandKind::Device, out)?;
    emit_proc_addr(model, config, CommandKind::Instance, out)
}

/// `VulkanCommands.hpp`: both dispatch tables, then the wrapper
/// declarations.
pub fn emit_header<W: Write>(model: &Model, config: &Config, out: &mut W) -> io::Result<()> {
    banner(out)?;
    writeln!(out, "#pragma once")?;
    includes(out, &config.layer.command_header_includes)?;

    emit_dispatch_table(model, config, CommandKind::Instance, out)?;
    emit_dispatch_table(model, config, CommandKind::Device, out)?;

    let (features, extensions) = guard::command_scopes(model);
    for scope in features.into_iter().chain(extensions) {
        let scope = scope.retain(|c| !config.is_excluded_command(&c.name));
        let condition = scope.condition();
        open_guard(out, condition.as_deref())?;
        for command in &scope.commands {
            writeln!(out, "{} {};", config.layer.export_macro, signature(command))?;
        }
        if condition.is_some() {
            close_guard(out, condition.as_deref())?;
            writeln!(out)?;
        }
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
fn emit_wrapper_scope<W: Write>(
    model: &Model,
    config: &Config,
    scope: Scope,
    out: &mut W,
) -> io::Result<()> {
    let scope = scope.retain(|c| !config.is_excluded_command(&c.name));
    let condition = scope.condition();
    open_guard(out, condition.as_deref())?;
    for command in &scope.commands {
        emit_wrapper(model, config, command, out)?;
    }
    if condition.is_some() {
        close_guard(out, condition.as_deref())?;
        writeln!(out)?;
    }
    Ok(())
}

fn emit_wrapper<W: Write>(
    model: &Model,
    config: &Config,
    command: &CommandInfo,
    out: &mut W,
) -> io::Result<()> {
    let layer = &config.layer;
    let args: Vec<&str> = command.params.iter().map(|p| p.name.as_str()).collect();
    let key = args.first().copied().unwrap_or("nullptr");
    let has_result = command.return_type.is_some();
    let result_code = match command.return_type.as_deref() {
        Some("VkResult") => "static_cast<cct::Int32>(result)",
        _ => "0",
    };

    writeln!(out, "{}", signature(command))?;
    writeln!(out, "{{")?;
    writeln!(
        out,
        "\tconst auto* dp = {}::GetInstance()->Get{}DispatchTable(GetKey({}));",
        layer.class,
        table_prefix(command.kind),
        key
    )?;
    writeln!(out, "\tif (!dp)")?;
    writeln!(out, "\t{{")?;
    writeln!(
        out,
        "\t\t{}(\"Could not get the {} dispatch table\");",
        layer.assert_macro,
        table_prefix(command.kind).to_lowercase()
    )?;
    writeln!(out, "\t\t{}", sentinel(config, command))?;
    writeln!(out, "\t}}")?;
    writeln!(
        out,
        "\t{}dp->{}({});",
        if has_result { "auto result = " } else { "" },
        table_member(&command.name),
        args.join(", ")
    )?;
    writeln!(out, "\t{} vmiEvent = {{", layer.event_type)?;
    writeln!(out, "\t\t.id = 0,")?;
    writeln!(out, "\t\t.timestamp = GetCurrentTimeStamp(),")?;
    writeln!(
        out,
        "\t\t.frameNumber = {}::GetInstance()->GetFrameIndex(),",
        layer.class
    )?;
    writeln!(out, "\t\t.functionName = \"{}\",", command.name)?;
    writeln!(out, "\t\t.parameters = {}.dump(),", parameters_json(model, command))?;
    writeln!(out, "\t\t.resultCode = {},", result_code)?;
    writeln!(out, "\t\t.threadId = GetCurrentThreadId(),")?;
    writeln!(out, "\t}};")?;
    writeln!(out, "\tauto buff = Serialize(vmiEvent);")?;
    writeln!(out, "\t{}::GetInstance()->Send(buff);", layer.class)?;
    if has_result {
        writeln!(out, "\treturn result;")?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_proc_addr<W: Write>(
    model: &Model,
    config: &Config,
    kind: CommandKind,
    out: &mut W,
) -> io::Result<()> {
    let (function, object_type, object) = match kind {
        CommandKind::Instance => ("vkGetInstanceProcAddr", "VkInstance", "instance"),
        CommandKind::Device => ("vkGetDeviceProcAddr", "VkDevice", "device"),
    };

    writeln!(
        out,
        "PFN_vkVoidFunction VKAPI_CALL {}({} {}, const char* pName)",
        function, object_type, object
    )?;
    writeln!(out, "{{")?;
    for scope in guard::proc_addr_scopes(model) {
        let condition = scope.condition();
        open_guard(out, condition.as_deref())?;
        for command in &scope.commands {
            writeln!(out, "\tif (strcmp(pName, \"{}\") == 0)", command.name)?;
            writeln!(
                out,
                "\t\treturn reinterpret_cast<PFN_vkVoidFunction>({});",
                command.name
            )?;
        }
        close_guard(out, condition.as_deref())?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "\tconst auto* dp = {}::GetInstance()->Get{}DispatchTable(GetKey({}));",
        config.layer.class,
        table_prefix(kind),
        object
    )?;
    writeln!(out, "\tif (!dp)")?;
    writeln!(out, "\t\treturn nullptr;")?;
    writeln!(out, "\treturn dp->{}({}, pName);", table_member(function), object)?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn emit_dispatch_table<W: Write>(
    model: &Model,
    config: &Config,
    kind: CommandKind,
    out: &mut W,
) -> io::Result<()> {
    let (class, object_type, object, proc_addr) = match kind {
        CommandKind::Instance => (
            "InstanceDispatchTable",
            "VkInstance",
            "instance",
            "vkGetInstanceProcAddr",
        ),
        CommandKind::Device => (
            "DeviceDispatchTable",
            "VkDevice",
            "device",
            "vkGetDeviceProcAddr",
        ),
    };

    let (features, extensions) = guard::command_scopes(model);
    let scopes: Vec<Scope> = features
        .into_iter()
        .chain(extensions)
        .map(|s| s.retain(|c| c.kind == kind && !config.is_excluded_command(&c.name)))
        .collect();

    writeln!(out, "class {}", class)?;
    writeln!(out, "{{")?;
    writeln!(out, "public:")?;
    writeln!(
        out,
        "\t{}({} {}, PFN_{} procAddr) {{",
        class, object_type, object, proc_addr
    )?;
    writeln!(out, "\t\tthis->{} = procAddr;", table_member(proc_addr))?;
    for scope in &scopes {
        let condition = scope.condition();
        open_guard(out, condition.as_deref())?;
        for command in &scope.commands {
            writeln!(
                out,
                "\t\tthis->{} = reinterpret_cast<PFN_{}>(procAddr({}, \"{}\"));",
                table_member(&command.name),
                command.name,
                object,
                command.name
            )?;
        }
        close_guard(out, condition.as_deref())?;
    }
    writeln!(out, "\t}}")?;
    writeln!(out)?;
    writeln!(out, "\tPFN_{} {};", proc_addr, table_member(proc_addr))?;
    for scope in &scopes {
        let condition = scope.condition();
        open_guard(out, condition.as_deref())?;
        for command in &scope.commands {
            writeln!(
                out,
                "\tPFN_{} {};",
                command.name,
                table_member(&command.name)
            )?;
        }
        close_guard(out, condition.as_deref())?;
    }
    writeln!(out, "}};")?;
    writeln!(out)
}

//--------------------------------------------------------------------------------------------------
fn signature(command: &CommandInfo) -> String {
    let params: Vec<&str> = command.params.iter().map(|p| p.decl.as_str()).collect();
    format!(
        "{} VKAPI_CALL {}({})",
        command.return_type.as_deref().unwrap_or("void"),
        command.name,
        params.join(", ")
    )
}

/// Dispatch table member for a command, `vkCreateBuffer` -> `CreateBuffer`.
fn table_member(name: &str) -> &str {
    name.strip_prefix("vk").unwrap_or(name)
}

fn table_prefix(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Instance => "Instance",
        CommandKind::Device => "Device",
    }
}

/// Statement leaving a wrapper that found no dispatch table.
fn sentinel(config: &Config, command: &CommandInfo) -> String {
    match command.return_type.as_deref() {
        Some("VkResult") => format!("return {};", config.layer.invalid_handle_result),
        Some(_) => String::from("return {};"),
        None => String::from("return;"),
    }
}

fn parameters_json(model: &Model, command: &CommandInfo) -> String {
    if command.params.is_empty() {
        return String::from("nlohmann::json::object()");
    }
    let entries: Vec<String> = command
        .params
        .iter()
        .map(|p| format!("{{\"{}\", {}}}", p.name, json_argument(model, p)))
        .collect();
    format!("nlohmann::json{{{}}}", entries.join(", "))
}

fn json_argument(model: &Model, param: &ParamInfo) -> String {
    let name = &param.name;
    let base_type = param.base_type.as_deref().unwrap_or("");
    if param.is_array {
        format!("reinterpret_cast<uintptr_t>({})", name)
    } else if param.is_pointer && model.is_struct(base_type) {
        format!("{0} ? nlohmann::json(*{0}) : nlohmann::json()", name)
    } else if param.is_pointer || model.is_handle(base_type) {
        format!("reinterpret_cast<uintptr_t>({})", name)
    } else {
        name.clone()
    }
}
