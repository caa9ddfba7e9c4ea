//! Entity model built from one or more parsed registry documents.
//!
//! Everything the emitters need is resolved here once: which feature or
//! extension claims each command, how every struct member is rendered, and
//! which guards apply to each struct. The model is read-only afterwards.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::config::Config;
use crate::depends::{self, Dependency};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Model {
    /// Platform name to protection macro.
    pub platforms: IndexMap<String, String>,

    pub commands: IndexMap<String, CommandInfo>,

    /// Feature name to the names of the commands it claimed.
    pub features: IndexMap<String, Vec<String>>,

    pub extensions: IndexMap<String, ExtensionInfo>,
    pub handles: IndexSet<String>,
    pub structs: IndexMap<String, StructInfo>,

    /// One `defined(FEATURE)` entry per feature naming the struct in any of
    /// its `<require>` blocks.
    pub struct_feature_guards: IndexMap<String, Vec<String>>,

    /// One entry per extension `<require>` block naming the struct.
    pub struct_extension_guards: IndexMap<String, Vec<ExtensionGuard>>,
}

impl Model {
    /// Commands claimed by `feature`, in claim order.
    pub fn feature_commands<'a>(&'a self, feature: &str) -> impl Iterator<Item = &'a CommandInfo> {
        self.features
            .get(feature)
            .map(|names| names.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }

    /// Commands claimed by `extension`, in claim order.
    pub fn extension_commands<'a>(
        &'a self,
        extension: &str,
    ) -> impl Iterator<Item = &'a CommandInfo> {
        self.extensions
            .get(extension)
            .map(|info| info.commands.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    pub fn is_handle(&self, name: &str) -> bool {
        self.handles.contains(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct CommandInfo {
    pub name: String,

    /// `None` for `void` commands.
    pub return_type: Option<String>,

    pub params: Vec<ParamInfo>,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParamInfo {
    /// Canonical declaration, e.g. `const VkBufferCreateInfo * pCreateInfo`.
    pub decl: String,

    /// Declaration without the name and any array suffix.
    pub type_text: String,

    /// Content of the `<type>` element.
    pub base_type: Option<String>,

    pub name: String,
    pub is_array: bool,
    pub is_pointer: bool,
}

/// Which dispatch table a command is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum CommandKind {
    Instance,
    Device,
}

impl CommandKind {
    /// Classifies by the name of the first parameter: names containing
    /// `instance` or `physicalDevice` are instance level, everything else
    /// (including commands without parameters) is device level.
    ///
    /// This is a naming heuristic, so `physicalDeviceCount` is instance level
    /// too.
    pub fn classify(first_param: Option<&str>) -> CommandKind {
        match first_param {
            Some(name) if name.contains("instance") || name.contains("physicalDevice") => {
                CommandKind::Instance
            }
            _ => CommandKind::Device,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ExtensionInfo {
    pub depends: Option<Dependency>,

    /// Protection macro of the extension's platform.
    pub platform: Option<String>,

    pub commands: Vec<String>,
}

/// Guard sources contributed by one extension `<require>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ExtensionGuard {
    pub extension: String,
    pub depends: Option<Dependency>,
    pub platform: Option<String>,

    /// `depends` of the `<require>` block itself.
    pub requirement: Option<Dependency>,
}

impl ExtensionGuard {
    pub fn fragments(&self) -> Vec<String> {
        let mut fragments = vec![format!("defined({})", self.extension)];
        if let Some(depends) = &self.depends {
            fragments.push(depends.to_string());
        }
        if let Some(platform) = &self.platform {
            fragments.push(platform.clone());
        }
        if let Some(requirement) = &self.requirement {
            fragments.push(requirement.to_string());
        }
        fragments
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StructInfo {
    pub name: String,
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MemberInfo {
    pub type_name: String,
    pub name: String,
    pub is_pointer: bool,
    pub array_len: Option<String>,
    pub shape: MemberShape,
}

/// How a struct member is converted to JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum MemberShape {
    /// Copied by value.
    Scalar,

    /// A struct held by value, converted through its own `to_json`.
    EmbeddedStruct,

    /// Fixed size array, with the length expression.
    FixedArray(String),

    HandleRef,
    FunctionPointerRef,

    /// `pp` pointer viewed as a span, counted by the named sibling member.
    CountedPointerView(String),

    /// Rendered as an opaque address.
    RawBytePointer,

    CStringPointer,

    /// Dereferenced when set, default constructed otherwise.
    OptionalPointer,
}

/// Commands already attributed to a feature or extension.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet(IndexSet<String>);

impl ClaimSet {
    /// Returns `true` if `name` was not claimed before.
    pub fn claim(&mut self, name: &str) -> bool {
        self.0.insert(name.to_owned())
    }
}

//--------------------------------------------------------------------------------------------------
/// Builds the model. Phases run in a fixed order: platforms, commands,
/// features, extensions, types.
pub fn build(registry: &Registry, config: &Config) -> Result<Model, Error> {
    let mut model = Model::default();
    let mut unmodeled = HashSet::new();
    let mut claims = ClaimSet::default();

    build_platforms(registry, &mut model);
    build_commands(registry, config, &mut model, &mut unmodeled)?;
    build_features(registry, config, &mut model, &unmodeled, &mut claims)?;
    build_extensions(registry, &mut model, &unmodeled, &mut claims)?;
    build_types(registry, config, &mut model);

    Ok(model)
}

fn build_platforms(registry: &Registry, model: &mut Model) {
    for platform in registry.platforms() {
        debug!(name = %platform.name, protect = %platform.protect, "platform");
        model
            .platforms
            .insert(platform.name.clone(), platform.protect.clone());
    }
}

fn build_commands(
    registry: &Registry,
    config: &Config,
    model: &mut Model,
    unmodeled: &mut HashSet<String>,
) -> Result<(), Error> {
    for command in registry.commands() {
        let definition = match command {
            Command::Alias { name, alias } => {
                trace!(%name, %alias, "skipping command alias");
                unmodeled.insert(name.clone());
                continue;
            }
            Command::Definition(definition) => definition,
        };

        let name = &definition.proto.name;
        if !config.accepts_api(definition.api.as_deref()) {
            trace!(%name, "skipping command for other API");
            unmodeled.insert(name.clone());
            continue;
        }
        if model.commands.contains_key(name) {
            return Err(Error::DuplicateCommand { name: name.clone() });
        }

        let params: Vec<ParamInfo> = definition
            .params
            .iter()
            .filter(|p| config.accepts_api(p.api.as_deref()))
            .map(param_info)
            .collect();

        let info = CommandInfo {
            name: name.clone(),
            return_type: definition
                .proto
                .type_name
                .clone()
                .filter(|t| t != "void"),
            kind: CommandKind::classify(params.first().map(|p| p.name.as_str())),
            params,
        };
        debug!(%name, kind = ?info.kind, "command");
        model.commands.insert(name.clone(), info);
    }
    Ok(())
}

fn param_info(param: &CommandParam) -> ParamInfo {
    let name = &param.definition.name;
    let tokens: Vec<&str> = param.code.split_whitespace().collect();
    let type_text = match tokens.iter().rposition(|t| *t == name.as_str()) {
        Some(index) => tokens[..index].join(" "),
        None => param.code.clone(),
    };

    ParamInfo {
        decl: param.code.clone(),
        is_pointer: type_text.contains('*'),
        type_text,
        base_type: param.definition.type_name.clone(),
        name: name.clone(),
        is_array: param.is_array,
    }
}

fn build_features(
    registry: &Registry,
    config: &Config,
    model: &mut Model,
    unmodeled: &HashSet<String>,
    claims: &mut ClaimSet,
) -> Result<(), Error> {
    for feature in registry.features() {
        match feature.api.as_deref() {
            Some(api) if config.accepts_api(Some(api)) => (),
            _ => {
                trace!(name = %feature.name, "skipping feature");
                continue;
            }
        }
        debug!(name = %feature.name, "feature");

        for require in &feature.children {
            for item in &require.items {
                match item {
                    InterfaceItem::Command { name } => {
                        if claim_command(&feature.name, name, model, unmodeled, claims)? {
                            model
                                .features
                                .entry(feature.name.clone())
                                .or_default()
                                .push(name.clone());
                        }
                    }
                    InterfaceItem::Type { name } => {
                        let guard = format!("defined({})", feature.name);
                        let guards = model.struct_feature_guards.entry(name.clone()).or_default();
                        if !guards.contains(&guard) {
                            guards.push(guard);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Returns `true` if `owner` is the first to claim `name`.
fn claim_command(
    owner: &str,
    name: &str,
    model: &Model,
    unmodeled: &HashSet<String>,
    claims: &mut ClaimSet,
) -> Result<bool, Error> {
    if unmodeled.contains(name) {
        trace!(%owner, %name, "skipping unmodeled command");
        return Ok(false);
    }
    if !model.commands.contains_key(name) {
        return Err(Error::UnknownCommand {
            owner: owner.to_owned(),
            name: name.to_owned(),
        });
    }
    Ok(claims.claim(name))
}

fn compile_depends(owner: &str, expression: Option<&str>) -> Result<Option<Dependency>, Error> {
    expression
        .map(|e| {
            depends::compile(e).map_err(|source| Error::DependencyExpression {
                owner: owner.to_owned(),
                source,
            })
        })
        .transpose()
}

fn build_extensions(
    registry: &Registry,
    model: &mut Model,
    unmodeled: &HashSet<String>,
    claims: &mut ClaimSet,
) -> Result<(), Error> {
    for extension in registry.extensions() {
        if let Some(supported) = &extension.supported {
            if supported.contains("disabled") {
                trace!(name = %extension.name, "skipping disabled extension");
                continue;
            }
        }

        let depends = compile_depends(&extension.name, extension.depends.as_deref())?;
        let platform = match &extension.platform {
            Some(platform) => match model.platforms.get(platform) {
                Some(protect) => Some(protect.clone()),
                None => {
                    return Err(Error::UnknownPlatform {
                        extension: extension.name.clone(),
                        platform: platform.clone(),
                    })
                }
            },
            None => None,
        };
        debug!(name = %extension.name, "extension");

        let mut commands = Vec::new();
        for require in &extension.children {
            let requirement = compile_depends(&extension.name, require.depends.as_deref())?;
            for item in &require.items {
                match item {
                    InterfaceItem::Command { name } => {
                        if claim_command(&extension.name, name, model, unmodeled, claims)? {
                            commands.push(name.clone());
                        }
                    }
                    InterfaceItem::Type { name } => model
                        .struct_extension_guards
                        .entry(name.clone())
                        .or_default()
                        .push(ExtensionGuard {
                            extension: extension.name.clone(),
                            depends: depends.clone(),
                            platform: platform.clone(),
                            requirement: requirement.clone(),
                        }),
                }
            }
        }

        model.extensions.insert(
            extension.name.clone(),
            ExtensionInfo {
                depends,
                platform,
                commands,
            },
        );
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
struct RawMember<'a> {
    type_name: &'a str,
    name: &'a str,
    is_pointer: bool,
    array_len: Option<String>,
}

fn build_types(registry: &Registry, config: &Config, model: &mut Model) {
    let mut candidates = Vec::new();

    for ty in registry.types() {
        let category = ty.category.as_deref();
        if category == Some("handle") {
            model.handles.insert(ty.name.clone());
            continue;
        }
        if category != Some("struct") && category != Some("union") {
            continue;
        }
        if ty.supported.as_deref().map_or(false, |s| s.contains("disabled"))
            || !config.accepts_api(ty.api.as_deref())
            || config.is_excluded_struct(&ty.name)
        {
            trace!(name = %ty.name, "skipping struct");
            continue;
        }

        let members: Vec<RawMember> = ty
            .members
            .iter()
            .filter(|m| config.accepts_api(m.api.as_deref()))
            .filter_map(|m| {
                Some(RawMember {
                    type_name: m.type_name.as_deref()?,
                    name: m.name.as_deref()?,
                    is_pointer: m.code.contains('*'),
                    array_len: array_length(&m.trailing),
                })
            })
            .collect();
        if members.is_empty() {
            trace!(name = %ty.name, "skipping struct without members");
            continue;
        }
        candidates.push((ty.name.as_str(), members));
    }

    let struct_names: HashSet<&str> = candidates.iter().map(|(name, _)| *name).collect();

    for (name, members) in &candidates {
        let mut infos = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            let previous = index.checked_sub(1).map(|i| members[i].name);
            let shape = classify_member(member, previous, &model.handles, &struct_names);
            infos.push(MemberInfo {
                type_name: member.type_name.to_owned(),
                name: member.name.to_owned(),
                is_pointer: member.is_pointer,
                array_len: member.array_len.clone(),
                shape,
            });
        }
        debug!(%name, members = infos.len(), "struct");
        model.structs.insert(
            name.to_string(),
            StructInfo {
                name: name.to_string(),
                members: infos,
            },
        );
    }

    let structs = &model.structs;
    model
        .struct_feature_guards
        .retain(|name, _| structs.contains_key(name));
    model
        .struct_extension_guards
        .retain(|name, _| structs.contains_key(name));
}

/// First bracketed expression of the text following a member name, e.g.
/// `VK_UUID_SIZE` for `[VK_UUID_SIZE]`.
fn array_length(trailing: &str) -> Option<String> {
    let open = trailing.find('[')?;
    let rest = &trailing[open + 1..];
    let close = rest.find(']')?;
    let len = rest[..close].trim();
    if len.is_empty() {
        None
    } else {
        Some(len.to_owned())
    }
}

fn classify_member(
    member: &RawMember,
    previous: Option<&str>,
    handles: &IndexSet<String>,
    struct_names: &HashSet<&str>,
) -> MemberShape {
    if let Some(len) = &member.array_len {
        return MemberShape::FixedArray(len.clone());
    }
    if member.type_name.starts_with("PFN_") {
        return MemberShape::FunctionPointerRef;
    }
    if handles.contains(member.type_name) {
        return MemberShape::HandleRef;
    }
    if member.is_pointer {
        if member.name.starts_with("pp") {
            return match previous {
                Some(count) => MemberShape::CountedPointerView(count.to_owned()),
                None => MemberShape::RawBytePointer,
            };
        }
        return match member.type_name {
            "void" => MemberShape::RawBytePointer,
            "char" => MemberShape::CStringPointer,
            _ => MemberShape::OptionalPointer,
        };
    }
    if struct_names.contains(member.type_name) {
        MemberShape::EmbeddedStruct
    } else {
        MemberShape::Scalar
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse_stream;

    fn build_str(text: &str) -> Result<Model, Error> {
        let registry = parse_stream(text.as_bytes()).unwrap();
        build(&registry, &Config::default())
    }

    const COMMANDS: &str = "<commands>\
        <command><proto><type>VkResult</type> <name>vkCreateBuffer</name></proto>\
          <param><type>VkDevice</type> <name>device</name></param>\
          <param>const <type>VkBufferCreateInfo</type>* <name>pCreateInfo</name></param>\
          <param api=\"vulkansc\"><type>uint32_t</type> <name>scOnly</name></param></command>\
        <command><proto><type>void</type> <name>vkDestroySurfaceKHR</name></proto>\
          <param><type>VkInstance</type> <name>instance</name></param></command>\
        <command name=\"vkCreateBufferKHR\" alias=\"vkCreateBuffer\"/>\
        <command api=\"vulkansc\"><proto><type>void</type> <name>vkScOnly</name></proto></command>\
        </commands>";

    #[test]
    fn test_classify() {
        assert_eq!(CommandKind::classify(Some("instance")), CommandKind::Instance);
        assert_eq!(CommandKind::classify(Some("physicalDevice")), CommandKind::Instance);
        assert_eq!(
            CommandKind::classify(Some("physicalDeviceCount")),
            CommandKind::Instance
        );
        assert_eq!(CommandKind::classify(Some("device")), CommandKind::Device);
        assert_eq!(CommandKind::classify(Some("commandBuffer")), CommandKind::Device);
        assert_eq!(CommandKind::classify(None), CommandKind::Device);
    }

    #[test]
    fn test_commands() {
        let model = build_str(&format!("<registry>{}</registry>", COMMANDS)).unwrap();
        assert_eq!(
            model.commands.keys().collect::<Vec<_>>(),
            vec!["vkCreateBuffer", "vkDestroySurfaceKHR"]
        );

        let create = &model.commands["vkCreateBuffer"];
        assert_eq!(create.return_type.as_deref(), Some("VkResult"));
        assert_eq!(create.kind, CommandKind::Device);
        assert_eq!(create.params.len(), 2);
        assert_eq!(
            create.params[1],
            ParamInfo {
                decl: String::from("const VkBufferCreateInfo * pCreateInfo"),
                type_text: String::from("const VkBufferCreateInfo *"),
                base_type: Some(String::from("VkBufferCreateInfo")),
                name: String::from("pCreateInfo"),
                is_array: false,
                is_pointer: true,
            }
        );

        let destroy = &model.commands["vkDestroySurfaceKHR"];
        assert_eq!(destroy.return_type, None);
        assert_eq!(destroy.kind, CommandKind::Instance);
    }

    #[test]
    fn test_enum_length_array_param() {
        let text = "<registry><commands>\
            <command><proto><type>void</type> <name>vkCmdSetValues</name></proto>\
              <param><type>VkCommandBuffer</type> <name>commandBuffer</name></param>\
              <param>const <type>float</type> <name>values</name>[<enum>VK_N</enum>]</param></command>\
            </commands></registry>";
        let model = build_str(text).unwrap();
        assert_eq!(
            model.commands["vkCmdSetValues"].params[1],
            ParamInfo {
                decl: String::from("const float values [ VK_N ]"),
                type_text: String::from("const float"),
                base_type: Some(String::from("float")),
                name: String::from("values"),
                is_array: true,
                is_pointer: false,
            }
        );
    }

    #[test]
    fn test_duplicate_command() {
        let text = "<registry><commands>\
            <command><proto><type>void</type> <name>vkA</name></proto></command>\
            <command><proto><type>void</type> <name>vkA</name></proto></command>\
            </commands></registry>";
        assert_eq!(
            build_str(text),
            Err(Error::DuplicateCommand {
                name: String::from("vkA")
            })
        );
    }

    #[test]
    fn test_first_claim_wins() {
        let text = format!(
            "<registry>{}\
             <feature api=\"vulkan\" name=\"VK_VERSION_1_0\"><require>\
               <command name=\"vkCreateBuffer\"/><command name=\"vkCreateBuffer\"/></require></feature>\
             <feature name=\"VK_BASE\"><require><command name=\"vkDestroySurfaceKHR\"/></require></feature>\
             <extensions><extension name=\"VK_KHR_surface\">\
               <require><command name=\"vkCreateBuffer\"/><command name=\"vkCreateBufferKHR\"/>\
               <command name=\"vkScOnly\"/><command name=\"vkDestroySurfaceKHR\"/></require>\
             </extension></extensions></registry>",
            COMMANDS
        );
        let model = build_str(&text).unwrap();
        assert_eq!(
            model.features.keys().collect::<Vec<_>>(),
            vec!["VK_VERSION_1_0"]
        );
        assert_eq!(model.features["VK_VERSION_1_0"], vec!["vkCreateBuffer"]);
        assert_eq!(
            model.extensions["VK_KHR_surface"].commands,
            vec!["vkDestroySurfaceKHR"]
        );
    }

    #[test]
    fn test_unknown_command() {
        let text = format!(
            "<registry>{}<extensions><extension name=\"VK_EXT_x\">\
             <require><command name=\"vkMissing\"/></require></extension>\
             <extension name=\"VK_EXT_y\" supported=\"disabled\">\
             <require><command name=\"vkOtherMissing\"/></require></extension></extensions></registry>",
            COMMANDS
        );
        assert_eq!(
            build_str(&text),
            Err(Error::UnknownCommand {
                owner: String::from("VK_EXT_x"),
                name: String::from("vkMissing"),
            })
        );
    }

    #[test]
    fn test_disabled_extension_is_skipped() {
        let text = "<registry><extensions>\
            <extension name=\"VK_EXT_y\" supported=\"disabled\">\
            <require><command name=\"vkOtherMissing\"/></require></extension>\
            </extensions></registry>";
        let model = build_str(text).unwrap();
        assert!(model.extensions.is_empty());
    }

    #[test]
    fn test_extension_platform_and_depends() {
        let text = "<registry><platforms><platform name=\"xlib\" protect=\"VK_USE_PLATFORM_XLIB_KHR\"/></platforms>\
            <extensions><extension name=\"VK_KHR_xlib_surface\" platform=\"xlib\" depends=\"VK_KHR_surface\"/>\
            </extensions></registry>";
        let model = build_str(text).unwrap();
        let info = &model.extensions["VK_KHR_xlib_surface"];
        assert_eq!(info.platform.as_deref(), Some("VK_USE_PLATFORM_XLIB_KHR"));
        assert_eq!(
            info.depends,
            Some(Dependency::Defined(String::from("VK_KHR_surface")))
        );
        assert!(info.commands.is_empty());
    }

    #[test]
    fn test_unknown_platform() {
        let text = "<registry><extensions><extension name=\"VK_KHR_wayland_surface\" platform=\"wayland\"/>\
            </extensions></registry>";
        assert_eq!(
            build_str(text),
            Err(Error::UnknownPlatform {
                extension: String::from("VK_KHR_wayland_surface"),
                platform: String::from("wayland"),
            })
        );
    }

    #[test]
    fn test_bad_depends() {
        let text = "<registry><extensions><extension name=\"VK_EXT_x\" depends=\"(VK_KHR_surface\"/>\
            </extensions></registry>";
        match build_str(text) {
            Err(Error::DependencyExpression { owner, source }) => {
                assert_eq!(owner, "VK_EXT_x");
                assert_eq!(source.expression, "(VK_KHR_surface");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_array_length() {
        assert_eq!(array_length("[4]").as_deref(), Some("4"));
        assert_eq!(
            array_length(" [ VK_UUID_SIZE ]").as_deref(),
            Some("VK_UUID_SIZE")
        );
        assert_eq!(array_length("[3][4]").as_deref(), Some("3"));
        assert_eq!(array_length(":8"), None);
        assert_eq!(array_length("[]"), None);
        assert_eq!(array_length(""), None);
    }

    #[test]
    fn test_member_shapes() {
        let text = "<registry><types>\
            <type category=\"handle\"><type>VK_DEFINE_HANDLE</type>(<name>VkDevice</name>)</type>\
            <type category=\"struct\" name=\"VkExtent2D\">\
              <member><type>uint32_t</type> <name>width</name></member></type>\
            <type category=\"struct\" name=\"VkSample\">\
              <member>const <type>void</type>* <name>pNext</name></member>\
              <member><type>VkExtent2D</type> <name>extent</name></member>\
              <member><type>float</type> <name>color</name>[4]</member>\
              <member><type>PFN_vkVoidFunction</type> <name>pfnCallback</name></member>\
              <member><type>VkDevice</type> <name>device</name></member>\
              <member><type>uint32_t</type> <name>layerCount</name></member>\
              <member>const <type>char</type>* const* <name>ppLayerNames</name></member>\
              <member>const <type>char</type>* <name>pName</name></member>\
              <member>const <type>VkExtent2D</type>* <name>pExtent</name></member>\
              <member><type>uint32_t</type></member>\
              <member api=\"vulkansc\"><type>uint32_t</type> <name>scOnly</name></member>\
            </type>\
            <type category=\"struct\" name=\"VkLeading\">\
              <member>const <type>void</type>* const* <name>ppData</name></member></type>\
            <type category=\"struct\" name=\"VkEmpty\"></type>\
            <type category=\"struct\" name=\"VkDisabled\" supported=\"disabled\">\
              <member><type>uint32_t</type> <name>x</name></member></type>\
            <type category=\"struct\" name=\"VkNativeBufferANDROID\">\
              <member><type>uint32_t</type> <name>x</name></member></type>\
            <type category=\"enum\" name=\"VkFormat\"/>\
            </types></registry>";
        let model = build_str(text).unwrap();
        assert_eq!(
            model.structs.keys().collect::<Vec<_>>(),
            vec!["VkExtent2D", "VkSample", "VkLeading"]
        );
        assert!(model.is_handle("VkDevice"));

        let shapes: Vec<(&str, &MemberShape)> = model.structs["VkSample"]
            .members
            .iter()
            .map(|m| (m.name.as_str(), &m.shape))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("pNext", &MemberShape::RawBytePointer),
                ("extent", &MemberShape::EmbeddedStruct),
                ("color", &MemberShape::FixedArray(String::from("4"))),
                ("pfnCallback", &MemberShape::FunctionPointerRef),
                ("device", &MemberShape::HandleRef),
                ("layerCount", &MemberShape::Scalar),
                (
                    "ppLayerNames",
                    &MemberShape::CountedPointerView(String::from("layerCount"))
                ),
                ("pName", &MemberShape::CStringPointer),
                ("pExtent", &MemberShape::OptionalPointer),
            ]
        );
        assert_eq!(
            model.structs["VkLeading"].members[0].shape,
            MemberShape::RawBytePointer
        );
    }

    #[test]
    fn test_feature_guard_once_per_feature() {
        let text = "<registry><types>\
            <type category=\"struct\" name=\"VkShared\">\
              <member><type>uint32_t</type> <name>x</name></member></type></types>\
            <feature api=\"vulkan\" name=\"VK_VERSION_1_0\">\
              <require><type name=\"VkShared\"/></require>\
              <require><type name=\"VkShared\"/></require></feature>\
            <feature api=\"vulkan\" name=\"VK_VERSION_1_1\">\
              <require><type name=\"VkShared\"/></require></feature></registry>";
        let model = build_str(text).unwrap();
        assert_eq!(
            model.struct_feature_guards["VkShared"],
            vec!["defined(VK_VERSION_1_0)", "defined(VK_VERSION_1_1)"]
        );
    }

    #[test]
    fn test_struct_guard_sources() {
        let text = "<registry><types>\
            <type category=\"struct\" name=\"VkShared\">\
              <member><type>uint32_t</type> <name>x</name></member></type></types>\
            <feature api=\"vulkan\" name=\"VK_VERSION_1_0\"><require><type name=\"VkShared\"/>\
              <type name=\"uint32_t\"/></require></feature>\
            <extensions><extension name=\"VK_KHR_a\" depends=\"VK_KHR_b\">\
              <require depends=\"VK_VERSION_1_1,VK_KHR_c\"><type name=\"VkShared\"/></require>\
              <require><type name=\"VkShared\"/></require></extension></extensions></registry>";
        let model = build_str(text).unwrap();
        assert_eq!(
            model.struct_feature_guards.keys().collect::<Vec<_>>(),
            vec!["VkShared"]
        );
        assert_eq!(
            model.struct_feature_guards["VkShared"],
            vec!["defined(VK_VERSION_1_0)"]
        );
        let guards = &model.struct_extension_guards["VkShared"];
        assert_eq!(guards.len(), 2);
        assert_eq!(
            guards[0].fragments(),
            vec![
                "defined(VK_KHR_a)",
                "defined(VK_KHR_b)",
                "(defined(VK_VERSION_1_1) || defined(VK_KHR_c))",
            ]
        );
        assert_eq!(
            guards[1].fragments(),
            vec!["defined(VK_KHR_a)", "defined(VK_KHR_b)"]
        );
    }
}
